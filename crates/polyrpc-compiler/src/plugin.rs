//! External generators described by JSON manifests.
//!
//! ```json
//! { "name": "ruby", "kind": "ast", "command": "./bin/ruby-ast", "args": [],
//!   "supportedExtensions": ["rb"] }
//! ```
//!
//! An `ast` plugin is run as `command args... <file>` and prints a [`Program`]
//! as JSON. An `sdk` plugin reads [`SdkGeneratorInput`] JSON on stdin and
//! prints `{ "files": [...] }`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use serde::Deserialize;

use crate::codegen::{SdkFiles, SdkGenerator, SdkGeneratorInput};
use crate::context::GenerationContext;
use crate::diagnostic::CompilerError;
use crate::frontend::{AstGenerator, SourceFile};
use crate::ir::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Ast,
    Sdk,
}

/// A validated plugin manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    pub name: String,
    pub kind: PluginKind,
    /// Program to run, already resolved against the manifest directory.
    pub command: PathBuf,
    pub args: Vec<String>,
    /// File extensions for `ast` plugins, languages for `sdk` plugins.
    pub targets: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    name: String,
    kind: String,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    supported_extensions: Vec<String>,
    #[serde(default)]
    supported_languages: Vec<String>,
}

impl PluginManifest {
    /// Reads and validates a manifest file.
    pub fn load(path: &Path) -> Result<Self, CompilerError> {
        let label = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CompilerError::plugin(&label, format!("cannot read manifest: {}", e)))?;
        let raw: RawManifest = serde_json::from_str(&content)
            .map_err(|e| CompilerError::plugin(&label, format!("malformed manifest: {}", e)))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_raw(raw, base)
    }

    fn from_raw(raw: RawManifest, base: &Path) -> Result<Self, CompilerError> {
        let name = raw.name.trim().to_string();
        if name.is_empty() {
            return Err(CompilerError::plugin("<unnamed>", "the name is empty"));
        }
        let (kind, targets) = match raw.kind.as_str() {
            "ast" => (PluginKind::Ast, raw.supported_extensions),
            "sdk" => (PluginKind::Sdk, raw.supported_languages),
            other => {
                return Err(CompilerError::plugin(
                    &name,
                    format!("unknown kind '{}', expected 'ast' or 'sdk'", other),
                ))
            }
        };
        if raw.command.trim().is_empty() {
            return Err(CompilerError::plugin(&name, "the command is empty"));
        }

        let targets: Vec<String> = targets
            .iter()
            .map(|t| t.trim().trim_start_matches('.').to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if targets.is_empty() {
            let field = match kind {
                PluginKind::Ast => "supportedExtensions",
                PluginKind::Sdk => "supportedLanguages",
            };
            return Err(CompilerError::plugin(&name, format!("{} is missing or empty", field)));
        }

        Ok(Self {
            command: resolve_command(&raw.command, base),
            name,
            kind,
            args: raw.args,
            targets,
        })
    }

    /// Runs the plugin, optionally feeding stdin, and returns stdout.
    fn run(&self, extra_arg: Option<&Path>, stdin: Option<&[u8]>) -> Result<String, CompilerError> {
        let mut command = Command::new(&self.command);
        command.args(&self.args);
        if let Some(arg) = extra_arg {
            command.arg(arg);
        }
        command
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(plugin = %self.name, command = %self.command.display(), "running plugin");
        let mut child = command
            .spawn()
            .map_err(|e| CompilerError::plugin(&self.name, format!("cannot start {}: {}", self.command.display(), e)))?;
        // Input is fed from its own thread while stdout and stderr drain, so a
        // plugin that writes before it finishes reading cannot deadlock us.
        let pipe = child.stdin.take();
        let (fed, output) = std::thread::scope(|scope| {
            let feeder = scope.spawn(move || match (stdin, pipe) {
                (Some(input), Some(mut pipe)) => pipe.write_all(input),
                _ => Ok(()),
            });
            let output = child.wait_with_output();
            (feeder.join(), output)
        });
        let output = output.map_err(|e| CompilerError::plugin(&self.name, e.to_string()))?;
        match fed {
            Ok(Ok(())) => {}
            // A plugin may exit without reading its input; its exit status says more.
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(CompilerError::plugin(&self.name, format!("cannot write input: {}", e))),
            Err(_) => return Err(CompilerError::plugin(&self.name, "input writer panicked")),
        }

        if !output.status.success() {
            return Err(CompilerError::plugin(
                &self.name,
                format!("exited with {}: {}", output.status, String::from_utf8_lossy(&output.stderr).trim()),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Commands with a path component are relative to the manifest; bare names
/// are looked up on `PATH`.
fn resolve_command(command: &str, base: &Path) -> PathBuf {
    let path = Path::new(command.trim());
    if path.is_absolute() || path.components().count() == 1 {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// A loaded plugin, ready to be registered with a dispatcher.
pub enum Plugin {
    Ast(Box<dyn AstGenerator>),
    /// One generator per supported language.
    Sdk(Vec<Box<dyn SdkGenerator>>),
}

/// Loads a manifest and wraps it in the matching generator type.
pub fn load_plugin(path: &Path) -> Result<Plugin, CompilerError> {
    let manifest = Arc::new(PluginManifest::load(path)?);
    tracing::info!(plugin = %manifest.name, targets = ?manifest.targets, "loaded plugin");
    Ok(match manifest.kind {
        PluginKind::Ast => Plugin::Ast(Box::new(ExternalAstGenerator { manifest })),
        PluginKind::Sdk => Plugin::Sdk(
            manifest
                .targets
                .iter()
                .map(|language| {
                    Box::new(ExternalSdkGenerator {
                        manifest: Arc::clone(&manifest),
                        language: language.clone(),
                    }) as Box<dyn SdkGenerator>
                })
                .collect(),
        ),
    })
}

pub struct ExternalAstGenerator {
    manifest: Arc<PluginManifest>,
}

impl AstGenerator for ExternalAstGenerator {
    fn language(&self) -> &str {
        &self.manifest.name
    }

    fn extensions(&self) -> Vec<String> {
        self.manifest.targets.clone()
    }

    fn generate(&self, source: &SourceFile, _ctx: &GenerationContext) -> Result<Program, CompilerError> {
        let stdout = self.manifest.run(Some(&source.path), None)?;
        serde_json::from_str(&stdout).map_err(|e| {
            CompilerError::plugin(&self.manifest.name, format!("output is not a program: {}", e))
        })
    }
}

pub struct ExternalSdkGenerator {
    manifest: Arc<PluginManifest>,
    language: String,
}

impl SdkGenerator for ExternalSdkGenerator {
    fn language(&self) -> &str {
        &self.language
    }

    fn generate(&self, input: &SdkGeneratorInput) -> Result<SdkFiles, CompilerError> {
        let payload = serde_json::to_vec(input)
            .map_err(|e| CompilerError::plugin(&self.manifest.name, e.to_string()))?;
        let stdout = self.manifest.run(None, Some(&payload))?;
        serde_json::from_str(&stdout).map_err(|e| {
            CompilerError::plugin(&self.manifest.name, format!("output is not a file list: {}", e))
        })
    }
}
