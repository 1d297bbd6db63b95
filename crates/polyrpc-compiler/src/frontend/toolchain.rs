//! External helper toolchains for Kotlin and Dart.
//!
//! Neither language has a tree-sitter grammar we can rely on, so their
//! frontends shell out to a small helper that prints the class surface as
//! JSON. Preparing a helper (locating it, possibly compiling it) happens at
//! most once per [`ToolchainCache`], even under concurrent requests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::diagnostic::CompilerError;

/// Single-flight cache of prepared helper artifacts, keyed by language.
#[derive(Debug, Default)]
pub struct ToolchainCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<PathBuf>>>>,
}

impl ToolchainCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached artifact for `key`, running `prepare` if needed.
    ///
    /// Concurrent callers for the same key block until the first preparation
    /// finishes. A failed preparation is not cached.
    pub fn get_or_prepare<F>(&self, key: &str, prepare: F) -> Result<PathBuf, CompilerError>
    where
        F: FnOnce() -> Result<PathBuf, CompilerError>,
    {
        let cell = {
            let mut cells = self
                .cells
                .lock()
                .map_err(|_| CompilerError::toolchain(key, "toolchain cache lock poisoned"))?;
            cells.entry(key.to_string()).or_default().clone()
        };
        cell.get_or_try_init(prepare).cloned()
    }

    pub fn is_ready(&self, key: &str) -> bool {
        self.cells
            .lock()
            .map(|cells| cells.get(key).is_some_and(|cell| cell.get().is_some()))
            .unwrap_or(false)
    }
}

/// A command that produces the helper artifact when it is missing.
#[derive(Debug, Clone)]
pub struct BuildStep {
    /// Source file or directory whose presence enables the build.
    pub requires: PathBuf,
    pub program: String,
    pub args: Vec<String>,
}

/// How to find, build and run one helper.
#[derive(Debug, Clone)]
pub struct HelperToolchain {
    pub language: &'static str,
    /// Environment variable pointing straight at the artifact.
    pub env_override: &'static str,
    pub artifact: PathBuf,
    pub build: Option<BuildStep>,
    /// Program and leading arguments; the artifact and the source file follow.
    pub runner: Vec<String>,
}

impl HelperToolchain {
    /// `java -jar ~/.polyrpc/kotlin-ast/ast-generator.jar <file>`
    pub fn kotlin() -> Self {
        let dir = helper_home().join("kotlin-ast");
        Self {
            language: "kotlin",
            env_override: "POLYRPC_KOTLIN_AST_JAR",
            artifact: dir.join("ast-generator.jar"),
            build: None,
            runner: vec!["java".to_string(), "-jar".to_string()],
        }
    }

    /// `dartaotruntime ~/.polyrpc/dart-ast/ast_generator.aot <file>`
    ///
    /// The snapshot is compiled from `bin/main.dart` on first use.
    pub fn dart() -> Self {
        let dir = helper_home().join("dart-ast");
        let artifact = dir.join("ast_generator.aot");
        Self {
            language: "dart",
            env_override: "POLYRPC_DART_AST_SNAPSHOT",
            build: Some(BuildStep {
                requires: dir.join("bin").join("main.dart"),
                program: "dart".to_string(),
                args: vec![
                    "compile".to_string(),
                    "aot-snapshot".to_string(),
                    dir.join("bin").join("main.dart").to_string_lossy().to_string(),
                    "-o".to_string(),
                    artifact.to_string_lossy().to_string(),
                ],
            }),
            artifact,
            runner: vec!["dartaotruntime".to_string()],
        }
    }

    /// Locates the artifact, building it if a build step is available.
    pub fn prepare(&self) -> Result<PathBuf, CompilerError> {
        if let Some(path) = std::env::var_os(self.env_override).map(PathBuf::from) {
            if path.is_file() {
                return Ok(path);
            }
            return Err(CompilerError::toolchain(
                self.language,
                format!("{} points at missing file {}", self.env_override, path.display()),
            ));
        }

        if self.artifact.is_file() {
            return Ok(self.artifact.clone());
        }

        let Some(ref build) = self.build else {
            return Err(CompilerError::toolchain(
                self.language,
                format!("helper not found at {}", self.artifact.display()),
            ));
        };
        if !build.requires.exists() {
            return Err(CompilerError::toolchain(
                self.language,
                format!(
                    "helper not found at {} and no sources at {}",
                    self.artifact.display(),
                    build.requires.display()
                ),
            ));
        }

        tracing::info!(language = self.language, "compiling helper toolchain");
        let output = Command::new(&build.program)
            .args(&build.args)
            .output()
            .map_err(|e| CompilerError::toolchain(self.language, format!("{}: {}", build.program, e)))?;
        if !output.status.success() {
            return Err(CompilerError::toolchain(
                self.language,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        if !self.artifact.is_file() {
            return Err(CompilerError::toolchain(
                self.language,
                format!("build finished but {} is missing", self.artifact.display()),
            ));
        }
        Ok(self.artifact.clone())
    }

    /// Runs the helper on a source file and returns its stdout.
    pub fn run(&self, cache: &ToolchainCache, file: &Path) -> Result<String, CompilerError> {
        let artifact = cache.get_or_prepare(self.language, || self.prepare())?;
        let (program, leading) = self
            .runner
            .split_first()
            .ok_or_else(|| CompilerError::toolchain(self.language, "empty runner command"))?;

        tracing::debug!(language = self.language, file = %file.display(), "running helper");
        let output = Command::new(program)
            .args(leading)
            .arg(&artifact)
            .arg(file)
            .output()
            .map_err(|e| CompilerError::toolchain(self.language, format!("{}: {}", program, e)))?;

        if !output.status.success() {
            return Err(CompilerError::toolchain(
                self.language,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn helper_home() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".polyrpc")
}
