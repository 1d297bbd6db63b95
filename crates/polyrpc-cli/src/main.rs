//! polyrpc CLI.
//!
//! Generates typed client SDKs from backend classes.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use tracing_subscriber::EnvFilter;

use polyrpc_compiler::{
    AstDispatcher, CompilerConfig, GenerationContext, GenerationOutput, GenerationReport, Pipeline,
    ProjectConfiguration, SdkDispatcher, PROJECT_FILE,
};

mod ui;

/// File the cron manifest is written to, inside the output directory.
const SCHEDULE_FILE: &str = "cron.json";

#[derive(Parser)]
#[command(name = "polyrpc")]
#[command(about = "polyrpc - generate typed client SDKs from backend classes")]
struct Cli {
    /// More logging (-v debug, -vv trace). RUST_LOG overrides this.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ProjectArgs {
    /// Project file
    #[arg(short, long, default_value = PROJECT_FILE)]
    config: PathBuf,

    /// Source directory scanned when the project file lists no classes
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Plugin manifest to load (repeatable)
    #[arg(long = "plugin")]
    plugins: Vec<PathBuf>,

    /// Maximum number of files parsed at once
    #[arg(short, long)]
    jobs: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate SDKs for the project
    Generate {
        #[command(flatten)]
        project: ProjectArgs,

        /// Target language (repeatable, e.g. -l ts -l python)
        #[arg(short, long = "language")]
        languages: Vec<String>,

        /// Output directory, one subdirectory per language
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Backend URL baked into the SDKs
        #[arg(long)]
        url: Option<String>,

        /// Regenerate whenever a source file changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Parse and classify the project without writing anything
    Check {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Print the AST of a single source file as JSON
    Parse {
        file: PathBuf,

        /// Plugin manifest to load (repeatable)
        #[arg(long = "plugin")]
        plugins: Vec<PathBuf>,
    },

    /// List the supported source extensions and SDK languages
    Languages {
        /// Plugin manifest to load (repeatable)
        #[arg(long = "plugin")]
        plugins: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate {
            project,
            languages,
            output,
            url,
            watch,
        } => {
            let (config, project_file) = load_config(&project, languages, output, url)?;
            let ok = generate(&config, &project_file).await?;
            if watch {
                run_watch_mode(&project, config).await?;
            } else if !ok {
                std::process::exit(1);
            }
        }

        Commands::Check { project } => {
            let (config, project_file) = load_config(&project, Vec::new(), None, None)?;
            let spinner = ui::spinner("Checking classes...");
            let report = Pipeline::new(config)?.check(&project_file).await?;
            spinner.finish_and_clear();

            print_report(&report);
            if report.is_success() {
                ui::looking_good();
            } else {
                ui::nope_header();
                std::process::exit(1);
            }
        }

        Commands::Parse { file, plugins } => {
            let config = CompilerConfig {
                plugins,
                ..CompilerConfig::default()
            };
            let pipeline = Pipeline::new(config)?;
            let ctx = GenerationContext::new();
            let program = pipeline.ast_dispatcher().dispatch(&file, &ctx)?;
            let json = serde_json::to_string_pretty(&program).map_err(|e| miette::miette!("{}", e))?;
            println!("{}", json);
            for warning in ctx.warnings.snapshot() {
                ui::warn(&warning.to_string());
            }
        }

        Commands::Languages { plugins } => {
            let config = CompilerConfig {
                plugins,
                ..CompilerConfig::default()
            };
            let pipeline = Pipeline::new(config)?;
            print_languages(pipeline.ast_dispatcher(), pipeline.sdk_dispatcher());
        }
    }

    Ok(())
}

/// Logs go to stderr so `parse` output stays valid JSON.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "polyrpc=warn,polyrpc_compiler=warn",
        1 => "polyrpc=debug,polyrpc_compiler=debug",
        _ => "polyrpc=trace,polyrpc_compiler=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Reads the project file (if any) and layers the command line over it.
fn load_config(
    args: &ProjectArgs,
    languages: Vec<String>,
    output: Option<PathBuf>,
    url: Option<String>,
) -> miette::Result<(CompilerConfig, ProjectConfiguration)> {
    let project = if args.config.is_file() {
        tracing::debug!(path = %args.config.display(), "loading project file");
        ProjectConfiguration::load(&args.config)?
    } else {
        if args.config != Path::new(PROJECT_FILE) {
            return Err(miette::miette!("Project file {} not found", args.config.display()));
        }
        ProjectConfiguration {
            root: args.source.clone().unwrap_or_else(|| PathBuf::from(".")),
            ..ProjectConfiguration::default()
        }
    };

    let mut config = CompilerConfig {
        languages,
        url,
        plugins: args.plugins.clone(),
        ..CompilerConfig::default()
    };
    if let Some(output) = output {
        config.out_dir = output;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs.max(1);
    }

    let mut config = config.merge_project(&project);
    if let Some(ref source) = args.source {
        config.source_dir = source.clone();
    }
    Ok((config, project))
}

/// One full generation. Returns whether every file succeeded.
async fn generate(config: &CompilerConfig, project: &ProjectConfiguration) -> miette::Result<bool> {
    let start = Instant::now();
    let spinner = ui::spinner("Generating SDKs...");

    let pipeline = Pipeline::new(config.clone())?;
    let output = pipeline.run(project).await?;
    let written = pipeline.write_output(&output)?;
    write_schedule(config, &output)?;
    spinner.finish_and_clear();

    print_report(&output.report);
    print_summary(config, &output, written.len());
    ui::timing("Done", start.elapsed().as_millis());
    Ok(output.report.is_success())
}

fn write_schedule(config: &CompilerConfig, output: &GenerationOutput) -> miette::Result<()> {
    if output.schedule.is_empty() {
        return Ok(());
    }
    let path = config.out_dir.join(SCHEDULE_FILE);
    std::fs::create_dir_all(&config.out_dir)
        .map_err(|e| miette::miette!("Failed to create {}: {}", config.out_dir.display(), e))?;
    let json = serde_json::to_string_pretty(&output.schedule).map_err(|e| miette::miette!("{}", e))?;
    std::fs::write(&path, json + "\n").map_err(|e| miette::miette!("Failed to write {}: {}", path.display(), e))?;
    tracing::info!(path = %path.display(), entries = output.schedule.entries.len(), "wrote cron manifest");
    Ok(())
}

fn print_report(report: &GenerationReport) {
    for success in &report.successes {
        ui::class_line(&success.class_name, &success.file, success.callable);
    }
    for warning in &report.warnings {
        ui::warn(&warning.to_string());
    }
    for failure in &report.failures {
        ui::error(&format!("{}: {}", failure.file, failure.message));
    }
}

fn print_summary(config: &CompilerConfig, output: &GenerationOutput, written: usize) {
    println!();
    if written == 0 {
        ui::info("No callable methods found, nothing to write.");
        return;
    }
    ui::tree_dir("", &config.out_dir.to_string_lossy());
    let count = output.sdks.len();
    for (i, (language, files)) in output.sdks.iter().enumerate() {
        let detail = format!("{} files", files.len());
        ui::tree_item("   ", &format!("{}/", language), Some(&detail), i + 1 == count);
    }
    if !output.schedule.is_empty() {
        ui::info(&format!(
            "{} cron method(s) listed in {}",
            output.schedule.entries.len(),
            SCHEDULE_FILE
        ));
    }
    println!();
}

fn print_languages(ast: &AstDispatcher, sdk: &SdkDispatcher) {
    ui::box_header("SOURCES");
    ui::box_line(&ast.supported_extensions().join(", "));
    ui::box_footer();
    ui::box_header("SDKS");
    ui::box_line(&sdk.supported_languages().join(", "));
    ui::box_footer();
}

async fn run_watch_mode(args: &ProjectArgs, config: CompilerConfig) -> miette::Result<()> {
    let watched = config.source_dir.clone();
    ui::info(&format!("Watching for changes in {}", watched.display()));

    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);
    let out_dir = config.out_dir.canonicalize().unwrap_or_else(|_| config.out_dir.clone());

    let mut debouncer = new_debouncer(Duration::from_millis(500), move |result: DebounceEventResult| {
        if let Ok(events) = result {
            // Our own output must not trigger another run.
            if events.iter().any(|e| !e.path.starts_with(&out_dir)) {
                let _ = tx.try_send(());
            }
        }
    })
    .map_err(|e| miette::miette!("Failed to create file watcher: {}", e))?;
    debouncer
        .watcher()
        .watch(&watched, RecursiveMode::Recursive)
        .map_err(|e| miette::miette!("Failed to watch {}: {}", watched.display(), e))?;

    ui::info("Ready! Waiting for changes...");
    loop {
        tokio::select! {
            _ = rx.recv() => {
                println!();
                // The project file may have changed too.
                let reloaded = load_config(args, config.languages.clone(), Some(config.out_dir.clone()), config.url.clone());
                let result = match reloaded {
                    Ok((config, project)) => generate(&config, &project).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    ui::error(&format!("{:?}", e));
                }
                ui::info("Ready! Waiting for changes...");
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                ui::dim("Stopping watch mode.");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate_args() {
        let cli = Cli::parse_from([
            "polyrpc", "generate", "-l", "ts", "-l", "python", "-o", "out", "--url", "https://x", "-j", "2",
        ]);
        match cli.command {
            Commands::Generate { project, languages, output, url, watch } => {
                assert_eq!(languages, vec!["ts", "python"]);
                assert_eq!(output, Some(PathBuf::from("out")));
                assert_eq!(url.as_deref(), Some("https://x"));
                assert_eq!(project.jobs, Some(2));
                assert_eq!(project.config, PathBuf::from(PROJECT_FILE));
                assert!(!watch);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_load_config_without_project_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = ProjectArgs {
            config: PathBuf::from(PROJECT_FILE),
            source: Some(dir.path().to_path_buf()),
            plugins: Vec::new(),
            jobs: Some(0),
        };
        let (config, project) = load_config(&args, Vec::new(), None, None).unwrap();
        assert_eq!(config.source_dir, dir.path());
        assert_eq!(config.languages, vec!["ts"]);
        assert_eq!(config.jobs, 1);
        assert!(project.classes.is_empty());
    }

    #[test]
    fn test_load_config_from_project_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(PROJECT_FILE);
        std::fs::write(
            &path,
            r#"{ "sdk": { "languages": ["go"], "outputDir": "client", "url": "https://api" } }"#,
        )
        .unwrap();
        let args = ProjectArgs {
            config: path,
            source: None,
            plugins: Vec::new(),
            jobs: None,
        };

        let (config, _) = load_config(&args, Vec::new(), None, None).unwrap();
        assert_eq!(config.languages, vec!["go"]);
        assert_eq!(config.out_dir, dir.path().join("client"));
        assert_eq!(config.url.as_deref(), Some("https://api"));

        let (config, _) = load_config(&args, vec!["swift".to_string()], None, None).unwrap();
        assert_eq!(config.languages, vec!["swift"]);
    }

    #[test]
    fn test_missing_explicit_project_file() {
        let args = ProjectArgs {
            config: PathBuf::from("does/not/exist.json"),
            source: None,
            plugins: Vec::new(),
            jobs: None,
        };
        assert!(load_config(&args, Vec::new(), None, None).is_err());
    }
}
