//! Routes SDK requests to the generator for each target language.

use std::collections::BTreeMap;

use crate::diagnostic::CompilerError;
use super::{builtin_generators, SdkFiles, SdkGenerator, SdkGeneratorInput};

/// Accepts the usual spellings of a language name.
pub fn canonical_language(name: &str) -> String {
    let name = name.trim().to_lowercase();
    match name.as_str() {
        "typescript" => "ts".to_string(),
        "javascript" => "js".to_string(),
        "py" => "python".to_string(),
        "golang" => "go".to_string(),
        "kt" => "kotlin".to_string(),
        _ => name,
    }
}

/// Plugins are consulted before the built-in generators.
pub struct SdkDispatcher {
    plugins: Vec<Box<dyn SdkGenerator>>,
    builtins: Vec<Box<dyn SdkGenerator>>,
}

impl SdkDispatcher {
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

    pub fn register(&mut self, generator: Box<dyn SdkGenerator>) {
        tracing::debug!(language = generator.language(), "registered sdk plugin");
        self.plugins.push(generator);
    }

    fn generators(&self) -> impl Iterator<Item = &dyn SdkGenerator> {
        self.plugins.iter().chain(self.builtins.iter()).map(|g| g.as_ref())
    }

    pub fn generator_for(&self, language: &str) -> Option<&dyn SdkGenerator> {
        let language = canonical_language(language);
        self.generators().find(|g| g.language() == language)
    }

    /// Every language some generator handles, sorted and deduplicated.
    pub fn supported_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.generators().map(|g| g.language().to_string()).collect();
        languages.sort();
        languages.dedup();
        languages
    }

    /// Checks every requested language before any generation starts.
    pub fn check_languages(&self, languages: &[String]) -> Result<(), CompilerError> {
        for language in languages {
            if self.generator_for(language).is_none() {
                return Err(CompilerError::UnsupportedSdkLanguage {
                    language: language.clone(),
                    supported: self.supported_languages(),
                });
            }
        }
        Ok(())
    }

    /// Generates one SDK for a single language.
    pub fn generate_one(&self, language: &str, input: &SdkGeneratorInput) -> Result<SdkFiles, CompilerError> {
        let generator = self
            .generator_for(language)
            .ok_or_else(|| CompilerError::UnsupportedSdkLanguage {
                language: language.to_string(),
                supported: self.supported_languages(),
            })?;
        let files = generator.generate(input)?;
        tracing::debug!(language = generator.language(), files = files.len(), "generated sdk");
        Ok(files)
    }

    /// Generates every requested SDK, keyed by canonical language name.
    pub fn generate(
        &self,
        languages: &[String],
        input: &SdkGeneratorInput,
    ) -> Result<BTreeMap<String, SdkFiles>, CompilerError> {
        self.check_languages(languages)?;
        let mut output = BTreeMap::new();
        for language in languages {
            output.insert(canonical_language(language), self.generate_one(language, input)?);
        }
        Ok(output)
    }
}

impl Default for SdkDispatcher {
    fn default() -> Self {
        Self::with_builtins()
    }
}
