//! Non-fatal diagnostics.

use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

/// A type that could not be mapped faithfully and was degraded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeMappingWarning {
    pub file: PathBuf,
    /// Where the type appeared, e.g. `Greeter.hello(name)`.
    pub context: String,
    pub raw_type: String,
    /// Name of the IR node the type fell back to.
    pub fallback: String,
}

impl fmt::Display for TypeMappingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: type '{}' in {} is not supported, using {}",
            self.file.display(),
            self.raw_type,
            self.context,
            self.fallback
        )
    }
}

/// Collects warnings from concurrent generator runs.
#[derive(Debug, Default)]
pub struct WarningSink {
    warnings: Mutex<Vec<TypeMappingWarning>>,
}

impl WarningSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs the warning and keeps it for the final report.
    pub fn push(&self, warning: TypeMappingWarning) {
        tracing::warn!(
            file = %warning.file.display(),
            context = %warning.context,
            raw_type = %warning.raw_type,
            "type degraded to {}",
            warning.fallback
        );
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(warning);
        }
    }

    /// Returns the collected warnings sorted by file and context.
    pub fn snapshot(&self) -> Vec<TypeMappingWarning> {
        let mut warnings = self
            .warnings
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default();
        warnings.sort_by(|a, b| (&a.file, &a.context).cmp(&(&b.file, &b.context)));
        warnings
    }
}
