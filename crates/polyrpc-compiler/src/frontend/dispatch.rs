//! Routes a source file to the generator that handles its extension.

use std::path::Path;

use crate::context::GenerationContext;
use crate::diagnostic::CompilerError;
use crate::ir::Program;
use super::{builtin_generators, extension_of, AstGenerator, SourceFile};

/// Plugins are consulted before the built-in generators; the first generator
/// claiming the extension wins.
pub struct AstDispatcher {
    plugins: Vec<Box<dyn AstGenerator>>,
    builtins: Vec<Box<dyn AstGenerator>>,
}

impl AstDispatcher {
    /// A dispatcher with no generators at all.
    pub fn empty() -> Self {
        Self {
            plugins: Vec::new(),
            builtins: Vec::new(),
        }
    }

    pub fn with_builtins() -> Self {
        Self {
            plugins: Vec::new(),
            builtins: builtin_generators(),
        }
    }

    pub fn register(&mut self, generator: Box<dyn AstGenerator>) {
        tracing::debug!(language = generator.language(), "registered ast plugin");
        self.plugins.push(generator);
    }

    fn generators(&self) -> impl Iterator<Item = &dyn AstGenerator> {
        self.plugins.iter().chain(self.builtins.iter()).map(|g| g.as_ref())
    }

    /// Finds the generator for an extension (without the dot).
    pub fn generator_for(&self, extension: &str) -> Option<&dyn AstGenerator> {
        let extension = extension.to_lowercase();
        self.generators()
            .find(|g| g.extensions().iter().any(|e| *e == extension))
    }

    /// Every extension some generator handles, sorted and deduplicated.
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.generators().flat_map(|g| g.extensions()).collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }

    /// Whether a path would be routed somewhere.
    pub fn handles(&self, path: &Path) -> bool {
        self.generator_for(&extension_of(path)).is_some()
    }

    /// Reads a file and parses it with the matching generator.
    pub fn dispatch(&self, path: &Path, ctx: &GenerationContext) -> Result<Program, CompilerError> {
        let extension = extension_of(path);
        let generator = self
            .generator_for(&extension)
            .ok_or_else(|| CompilerError::UnsupportedLanguage {
                extension: extension.clone(),
                supported: self.supported_extensions(),
            })?;

        let source = SourceFile::read(path)?;
        tracing::debug!(file = %path.display(), language = generator.language(), "generating ast");
        generator.generate(&source, ctx)
    }
}

impl Default for AstDispatcher {
    fn default() -> Self {
        Self::with_builtins()
    }
}
