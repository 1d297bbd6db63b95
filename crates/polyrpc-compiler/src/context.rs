//! State shared by one generation run.

use crate::diagnostic::{TypeMappingWarning, WarningSink};
use crate::frontend::toolchain::ToolchainCache;

/// Passed explicitly through the pipeline instead of living in globals, so
/// two runs in the same process never share compiled helpers or warnings.
#[derive(Debug, Default)]
pub struct GenerationContext {
    pub toolchains: ToolchainCache,
    pub warnings: WarningSink,
}

impl GenerationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&self, warning: TypeMappingWarning) {
        self.warnings.push(warning);
    }
}
