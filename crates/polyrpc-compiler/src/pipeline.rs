//! The generation run: discover, parse, classify, generate.
//!
//! Parsing runs on blocking threads, at most `jobs` at a time. Every program
//! is collected (in discovery order) before any SDK is generated, so output
//! never depends on which file finished first. A file that fails is reported
//! and skipped; the rest of the run continues.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use walkdir::WalkDir;

use crate::classify::{classify, ClassTriggers, ScheduleManifest};
use crate::codegen::dispatch::canonical_language;
use crate::codegen::{ClassInfo, SdkDispatcher, SdkFiles, SdkGeneratorInput, SdkOptions};
use crate::config::{CompilerConfig, ProjectConfiguration};
use crate::context::GenerationContext;
use crate::diagnostic::{CompilerError, TypeMappingWarning};
use crate::frontend::AstDispatcher;
use crate::ir::Program;
use crate::plugin::{load_plugin, Plugin};

/// A class that parsed and classified cleanly.
#[derive(Debug, Clone)]
pub struct ParsedClass {
    pub path: PathBuf,
    pub program: Arc<Program>,
    pub triggers: ClassTriggers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSuccess {
    pub file: String,
    pub class_name: String,
    /// Methods exposed to SDKs.
    pub callable: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub message: String,
}

/// What happened to every file of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub successes: Vec<FileSuccess>,
    pub failures: Vec<FileFailure>,
    pub warnings: Vec<TypeMappingWarning>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutput {
    /// Language to generated files.
    pub sdks: BTreeMap<String, SdkFiles>,
    pub schedule: ScheduleManifest,
    pub report: GenerationReport,
}

impl GenerationOutput {
    pub fn file_count(&self) -> usize {
        self.sdks.values().map(SdkFiles::len).sum()
    }
}

pub struct Pipeline {
    config: CompilerConfig,
    ast: Arc<AstDispatcher>,
    sdk: Arc<SdkDispatcher>,
}

impl Pipeline {
    /// Builds the dispatchers, loading every configured plugin.
    pub fn new(config: CompilerConfig) -> Result<Self, CompilerError> {
        let mut ast = AstDispatcher::with_builtins();
        let mut sdk = SdkDispatcher::with_builtins();
        for manifest in &config.plugins {
            match load_plugin(manifest)? {
                Plugin::Ast(generator) => ast.register(generator),
                Plugin::Sdk(generators) => generators.into_iter().for_each(|g| sdk.register(g)),
            }
        }
        Ok(Self::with_dispatchers(config, ast, sdk))
    }

    pub fn with_dispatchers(config: CompilerConfig, ast: AstDispatcher, sdk: SdkDispatcher) -> Self {
        Self {
            config,
            ast: Arc::new(ast),
            sdk: Arc::new(sdk),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn ast_dispatcher(&self) -> &AstDispatcher {
        &self.ast
    }

    pub fn sdk_dispatcher(&self) -> &SdkDispatcher {
        &self.sdk
    }

    /// The files to parse: the configured classes, or every supported file
    /// under the source directory.
    pub fn discover(&self, project: &ProjectConfiguration) -> Vec<PathBuf> {
        if !project.classes.is_empty() {
            return project.class_paths();
        }

        // `./sdk` and `sdk` are the same directory, so compare resolved paths.
        let out_dir = self.config.out_dir.canonicalize().ok();
        let is_out_dir = |path: &Path| {
            out_dir
                .as_deref()
                .is_some_and(|out| path.canonicalize().is_ok_and(|p| p == out))
        };
        let mut files: Vec<PathBuf> = WalkDir::new(&self.config.source_dir)
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                let hidden = entry.depth() > 0 && name.starts_with('.');
                let skipped_dir = entry.file_type().is_dir()
                    && (name == "node_modules" || name == "target" || is_out_dir(entry.path()));
                !hidden && !skipped_dir
            })
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| !path.to_string_lossy().ends_with(".d.ts") && self.ast.handles(path))
            .collect();
        files.sort();
        files
    }

    /// Parses and classifies every discovered file.
    pub async fn parse(
        &self,
        project: &ProjectConfiguration,
        ctx: Arc<GenerationContext>,
    ) -> (Vec<ParsedClass>, GenerationReport) {
        let explicit = !project.classes.is_empty();
        let files = self.discover(project);
        tracing::info!(files = files.len(), "parsing sources");

        let semaphore = Arc::new(Semaphore::new(self.config.jobs.max(1)));
        let mut tasks = Vec::with_capacity(files.len());
        for file in files {
            let semaphore = Arc::clone(&semaphore);
            let ast = Arc::clone(&self.ast);
            let ctx = Arc::clone(&ctx);
            let path = file.clone();
            let task = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| CompilerError::io(&path, e.to_string()))?;
                let failed = path.clone();
                tokio::task::spawn_blocking(move || ast.dispatch(&path, &ctx))
                    .await
                    .map_err(|e| CompilerError::io(failed, format!("parser task failed: {}", e)))?
            });
            tasks.push((file, task));
        }

        let mut parsed = Vec::new();
        let mut report = GenerationReport::default();
        for (file, task) in tasks {
            let shown = self.display_path(&file);
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(CompilerError::io(&file, format!("parser task failed: {}", e))),
            };
            let program = match result {
                Ok(program) => program,
                Err(CompilerError::NoClassFound { .. }) if !explicit => {
                    tracing::debug!(file = %shown, "no class, skipping");
                    continue;
                }
                Err(e) => {
                    tracing::error!(file = %shown, "{}", e);
                    report.failures.push(FileFailure { file: shown, message: e.to_string() });
                    continue;
                }
            };

            let Some(class) = program.class() else {
                report.failures.push(FileFailure {
                    file: shown,
                    message: "the program has no class".to_string(),
                });
                continue;
            };
            match classify(class, project.find_class(&file)) {
                Ok(triggers) => {
                    report.successes.push(FileSuccess {
                        file: shown,
                        class_name: class.name.clone(),
                        callable: triggers.methods.iter().filter(|m| m.trigger.is_callable()).count(),
                    });
                    parsed.push(ParsedClass {
                        path: file,
                        program: Arc::new(program),
                        triggers,
                    });
                }
                Err(e) => {
                    tracing::error!(file = %shown, "{}", e);
                    report.failures.push(FileFailure { file: shown, message: e.to_string() });
                }
            }
        }
        (parsed, report)
    }

    /// Runs the whole pipeline without touching the output directory.
    pub async fn run(&self, project: &ProjectConfiguration) -> Result<GenerationOutput, CompilerError> {
        self.sdk.check_languages(&self.config.languages)?;

        let ctx = Arc::new(GenerationContext::new());
        let (parsed, mut report) = self.parse(project, Arc::clone(&ctx)).await;

        let schedule = ScheduleManifest::from_classes(
            parsed
                .iter()
                .filter_map(|p| p.program.class().map(|class| (class, &p.triggers))),
        );

        let input = Arc::new(SdkGeneratorInput {
            classes: parsed
                .iter()
                .map(|p| ClassInfo {
                    program: Arc::clone(&p.program),
                    triggers: p.triggers.clone(),
                })
                .collect(),
            options: SdkOptions {
                url: self.config.url.clone().unwrap_or_else(|| SdkOptions::default().url),
            },
        });

        let semaphore = Arc::new(Semaphore::new(self.config.jobs.max(1)));
        let mut tasks = Vec::new();
        for language in &self.config.languages {
            let language = canonical_language(language);
            let semaphore = Arc::clone(&semaphore);
            let sdk = Arc::clone(&self.sdk);
            let input = Arc::clone(&input);
            let key = language.clone();
            let task = tokio::spawn(async move {
                let failed = |e: String| CompilerError::Render { language: key.clone(), message: e };
                let _permit = semaphore.acquire_owned().await.map_err(|e| failed(e.to_string()))?;
                let language = key.clone();
                tokio::task::spawn_blocking(move || sdk.generate_one(&language, &input))
                    .await
                    .map_err(|e| failed(e.to_string()))?
            });
            tasks.push((language, task));
        }

        let mut sdks = BTreeMap::new();
        for (language, task) in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(CompilerError::Render { language: language.clone(), message: e.to_string() }),
            };
            match result {
                Ok(files) => {
                    sdks.insert(language, files);
                }
                Err(e) => {
                    tracing::error!(language = %language, "{}", e);
                    report.failures.push(FileFailure {
                        file: format!("{} sdk", language),
                        message: e.to_string(),
                    });
                }
            }
        }

        report.warnings = ctx.warnings.snapshot();
        Ok(GenerationOutput { sdks, schedule, report })
    }

    /// Parses and classifies without generating anything.
    pub async fn check(&self, project: &ProjectConfiguration) -> Result<GenerationReport, CompilerError> {
        self.sdk.check_languages(&self.config.languages)?;
        let ctx = Arc::new(GenerationContext::new());
        let (_, mut report) = self.parse(project, Arc::clone(&ctx)).await;
        report.warnings = ctx.warnings.snapshot();
        Ok(report)
    }

    /// Writes every SDK under `out_dir/<language>/` and returns the paths.
    pub fn write_output(&self, output: &GenerationOutput) -> Result<Vec<PathBuf>, CompilerError> {
        let mut written = Vec::new();
        for (language, files) in &output.sdks {
            let dir = self.config.out_dir.join(language);
            for file in &files.files {
                let path = dir.join(&file.path);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| CompilerError::io(parent, e.to_string()))?;
                }
                std::fs::write(&path, &file.data).map_err(|e| CompilerError::io(&path, e.to_string()))?;
                written.push(path);
            }
        }
        Ok(written)
    }

    /// A path relative to the source directory, for messages.
    fn display_path(&self, file: &Path) -> String {
        let base = self.config.source_dir.canonicalize().unwrap_or_else(|_| self.config.source_dir.clone());
        let target = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
        pathdiff::diff_paths(&target, &base)
            .filter(|p| !p.starts_with(".."))
            .unwrap_or(target)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(dir: &Path, languages: &[&str]) -> CompilerConfig {
        CompilerConfig {
            source_dir: dir.to_path_buf(),
            out_dir: dir.join("sdk"),
            languages: languages.iter().map(|l| l.to_string()).collect(),
            jobs: 2,
            ..CompilerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_discover_skips_declarations() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("node_modules/lib")).unwrap();
        fs::write(temp.path().join("greeter.ts"), "export class Greeter {}").unwrap();
        fs::write(temp.path().join("types.d.ts"), "declare const x: number;").unwrap();
        fs::write(temp.path().join("notes.md"), "# notes").unwrap();
        fs::write(temp.path().join("node_modules/lib/index.js"), "class X {}").unwrap();

        let pipeline = Pipeline::new(config(temp.path(), &["ts"])).unwrap();
        let files = pipeline.discover(&ProjectConfiguration::default());
        assert_eq!(files, vec![temp.path().join("greeter.ts")]);
    }

    #[tokio::test]
    async fn test_discover_skips_output_spelled_differently() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("greeter.ts"),
            "export class Greeter {\n  hello(): string { return 'hi'; }\n}\n",
        )
        .unwrap();
        // Walking `<dir>/.` yields `<dir>/./sdk`, which is not textually `<dir>/sdk`.
        let config = CompilerConfig {
            source_dir: temp.path().join("."),
            ..config(temp.path(), &["ts", "python"])
        };
        let pipeline = Pipeline::new(config).unwrap();
        let first = pipeline.run(&ProjectConfiguration::default()).await.unwrap();
        pipeline.write_output(&first).unwrap();

        let files = pipeline.discover(&ProjectConfiguration::default());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("greeter.ts"));

        let second = pipeline.run(&ProjectConfiguration::default()).await.unwrap();
        assert_eq!(first.sdks, second.sdks);
    }

    #[tokio::test]
    async fn test_run_reports_failures_per_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("greeter.ts"),
            "export class Greeter {\n  async hello(name: string): Promise<string> { return name; }\n}\n",
        )
        .unwrap();
        fs::write(temp.path().join("broken.ts"), "export class Broken {\n  hello( {\n").unwrap();
        fs::write(temp.path().join("helpers.ts"), "export function helper() {}\n").unwrap();

        let pipeline = Pipeline::new(config(temp.path(), &["ts", "python"])).unwrap();
        let output = pipeline.run(&ProjectConfiguration::default()).await.unwrap();

        assert_eq!(output.report.successes.len(), 1);
        assert_eq!(output.report.successes[0].file, "greeter.ts");
        assert_eq!(output.report.failures.len(), 1);
        assert_eq!(output.report.failures[0].file, "broken.ts");
        assert!(!output.report.is_success());

        assert!(output.sdks["ts"].get("greeter.sdk.ts").is_some());
        assert!(output.sdks["python"].get("greeter.py").is_some());
    }

    #[tokio::test]
    async fn test_unknown_language_fails_before_parsing() {
        let temp = TempDir::new().unwrap();
        let pipeline = Pipeline::new(config(temp.path(), &["cobol"])).unwrap();
        let err = pipeline.run(&ProjectConfiguration::default()).await.unwrap_err();
        assert!(matches!(err, CompilerError::UnsupportedSdkLanguage { .. }));
    }

    #[tokio::test]
    async fn test_write_output() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("greeter.ts"),
            "export class Greeter {\n  hello(): string { return 'hi'; }\n}\n",
        )
        .unwrap();
        let pipeline = Pipeline::new(config(temp.path(), &["ts"])).unwrap();
        let output = pipeline.run(&ProjectConfiguration::default()).await.unwrap();
        let written = pipeline.write_output(&output).unwrap();

        assert_eq!(written.len(), output.file_count());
        assert!(temp.path().join("sdk/ts/greeter.sdk.ts").is_file());
        assert!(temp.path().join("sdk/ts/index.ts").is_file());
    }
}
