//! Compiler error types.
#![allow(unused_assignments)]

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while extracting classes or generating SDKs.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum CompilerError {
    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("Failed to read file '{path}': {message}")]
    #[diagnostic(code(polyrpc::io::read_error))]
    IoError {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Failed to initialize parser")]
    #[diagnostic(code(polyrpc::parse::init_failed))]
    ParserInitFailed,

    #[error("Syntax error in {}:{line}:{column}: {message}", file.display())]
    #[diagnostic(code(polyrpc::parse::syntax_error))]
    ParseError {
        message: String,
        file: PathBuf,
        line: usize,
        column: usize,
    },

    #[error("No class found in {}", file.display())]
    #[diagnostic(
        code(polyrpc::parse::no_class_found),
        help("Declare a class (or a struct with methods in Go) and make sure it is not private")
    )]
    NoClassFound {
        file: PathBuf,
    },

    // =========================================================================
    // Dispatch Errors
    // =========================================================================
    #[error("Class language ({extension}) not supported. Currently supporting: {}", join_supported(.supported))]
    #[diagnostic(
        code(polyrpc::dispatch::unsupported_language),
        help("Remove the class from polyrpc.json or register a plugin that handles this extension")
    )]
    UnsupportedLanguage {
        extension: String,
        supported: Vec<String>,
    },

    #[error("SDK language ({language}) not supported. Currently supporting: {}", join_supported(.supported))]
    #[diagnostic(
        code(polyrpc::dispatch::unsupported_sdk_language),
        help("Pick one of the supported languages or register an SDK plugin")
    )]
    UnsupportedSdkLanguage {
        language: String,
        supported: Vec<String>,
    },

    #[error("Plugin '{plugin}' is invalid: {reason}")]
    #[diagnostic(
        code(polyrpc::plugin::invalid),
        help("A plugin manifest needs a name, a kind (\"ast\" or \"sdk\"), a command and a non-empty supportedExtensions/supportedLanguages list")
    )]
    PluginError {
        plugin: String,
        reason: String,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid cron schedule '{cron}' on {class}.{method}: {reason}")]
    #[diagnostic(
        code(polyrpc::config::invalid_cron),
        help("Check https://crontab.guru/ for more information")
    )]
    InvalidCron {
        class: String,
        method: String,
        cron: String,
        reason: String,
    },

    #[error("Invalid configuration '{}': {message}", path.display())]
    #[diagnostic(code(polyrpc::config::invalid))]
    InvalidConfig {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Generation Errors
    // =========================================================================
    #[error("Failed to render the {language} SDK: {message}")]
    #[diagnostic(code(polyrpc::codegen::render_failed))]
    Render {
        language: String,
        message: String,
    },

    // =========================================================================
    // Toolchain Errors
    // =========================================================================
    #[error("The {language} helper toolchain failed: {message}")]
    #[diagnostic(
        code(polyrpc::toolchain::failed),
        help("Install the helper under ~/.polyrpc or point POLYRPC_KOTLIN_AST_JAR / POLYRPC_DART_AST_SNAPSHOT at it")
    )]
    Toolchain {
        language: String,
        message: String,
    },
}

impl CompilerError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IoError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a plugin error.
    pub fn plugin(plugin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PluginError {
            plugin: plugin.into(),
            reason: reason.into(),
        }
    }

    /// Creates a toolchain error.
    pub fn toolchain(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Toolchain {
            language: language.into(),
            message: message.into(),
        }
    }
}

/// Renders `["a", "b", "c"]` as `a, b and c`.
pub fn join_supported(values: &[String]) -> String {
    match values {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_supported() {
        assert_eq!(join_supported(&[]), "");
        assert_eq!(join_supported(&["ts".to_string()]), "ts");
        assert_eq!(
            join_supported(&["go".to_string(), "js".to_string(), "ts".to_string()]),
            "go, js and ts"
        );
    }

    #[test]
    fn test_unsupported_language_lists_extensions() {
        let err = CompilerError::UnsupportedLanguage {
            extension: "rb".to_string(),
            supported: vec!["js".to_string(), "ts".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("(rb)"));
        assert!(message.contains("js and ts"));
    }
}
