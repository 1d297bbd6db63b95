//! Compiler and project configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::{cron, TriggerType};
use crate::diagnostic::CompilerError;

/// Name of the project configuration file looked up by default.
pub const PROJECT_FILE: &str = "polyrpc.json";

/// Configuration for one generation run.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Directory class paths are resolved against and scanned when the
    /// project lists no classes.
    pub source_dir: PathBuf,

    /// Directory the SDKs are written to, one subdirectory per language.
    pub out_dir: PathBuf,

    /// Target SDK languages.
    pub languages: Vec<String>,

    /// Maximum number of files parsed concurrently.
    pub jobs: usize,

    /// Backend URL baked into the generated SDKs.
    pub url: Option<String>,

    /// Plugin manifests to load before dispatching.
    pub plugins: Vec<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            out_dir: PathBuf::from("sdk"),
            languages: vec!["ts".to_string()],
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            url: None,
            plugins: Vec::new(),
        }
    }
}

impl CompilerConfig {
    /// Fills unset fields from the project file. Values already set on `self`
    /// (from the command line) win.
    pub fn merge_project(mut self, project: &ProjectConfiguration) -> Self {
        if let Some(ref languages) = project.sdk.languages {
            if self.languages.is_empty() {
                self.languages = languages.clone();
            }
        }
        if let Some(ref out) = project.sdk.output_dir {
            if self.out_dir == CompilerConfig::default().out_dir {
                self.out_dir = project.root.join(out);
            }
        }
        if self.url.is_none() {
            self.url = project.sdk.url.clone();
        }
        for plugin in &project.plugins {
            let path = project.root.join(plugin);
            if !self.plugins.contains(&path) {
                self.plugins.push(path);
            }
        }
        if self.languages.is_empty() {
            self.languages = vec!["ts".to_string()];
        }
        self.source_dir = project.root.clone();
        self
    }
}

/// The `polyrpc.json` project file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfiguration {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sdk: SdkSection,
    #[serde(default)]
    pub plugins: Vec<PathBuf>,
    #[serde(default)]
    pub classes: Vec<ClassConfiguration>,

    /// Directory containing the project file.
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkSection {
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Per-class trigger overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassConfiguration {
    #[serde(default)]
    pub name: Option<String>,
    pub path: String,
    #[serde(rename = "type", default)]
    pub trigger: Option<TriggerType>,
    #[serde(default)]
    pub methods: Vec<MethodConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodConfiguration {
    pub name: String,
    #[serde(rename = "type", default)]
    pub trigger: Option<TriggerType>,
    #[serde(default)]
    pub cron_string: Option<String>,
}

impl ProjectConfiguration {
    /// Loads and validates a project file.
    pub fn load(path: &Path) -> Result<Self, CompilerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CompilerError::io(path, e.to_string()))?;
        let mut project: ProjectConfiguration =
            serde_json::from_str(&content).map_err(|e| CompilerError::InvalidConfig {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        project.root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        project.validate()?;
        Ok(project)
    }

    /// Checks every configured cron schedule.
    pub fn validate(&self) -> Result<(), CompilerError> {
        for class in &self.classes {
            let class_name = class.name.clone().unwrap_or_else(|| class.path.clone());
            for method in &class.methods {
                let trigger = method.trigger.or(class.trigger).unwrap_or_default();
                match (trigger, &method.cron_string) {
                    (TriggerType::Cron, Some(schedule)) => {
                        cron::validate_schedule(&class_name, &method.name, schedule)?;
                    }
                    (TriggerType::Cron, None) if method.trigger == Some(TriggerType::Cron) => {
                        return Err(CompilerError::InvalidCron {
                            class: class_name,
                            method: method.name.clone(),
                            cron: String::new(),
                            reason: "cron methods need a cronString".to_string(),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Absolute-or-root-relative paths of all configured classes, in file order.
    pub fn class_paths(&self) -> Vec<PathBuf> {
        self.classes.iter().map(|c| self.root.join(&c.path)).collect()
    }

    /// Finds the configuration entry for a source file.
    pub fn find_class(&self, file: &Path) -> Option<&ClassConfiguration> {
        let wanted = normalize(file);
        self.classes
            .iter()
            .find(|c| normalize(&self.root.join(&c.path)) == wanted)
    }
}

/// Normalizes separators and leading `./` so paths compare structurally.
fn normalize(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for part in text.split('/') {
        match part {
            "" | "." => {}
            ".." if parts.last().is_some_and(|p| *p != "..") => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if text.starts_with('/') {
        format!("/{}", joined)
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_project(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PROJECT_FILE);
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_project() {
        let (dir, path) = write_project(
            r#"{
                "name": "greeter",
                "sdk": { "languages": ["ts", "python"], "outputDir": "client" },
                "classes": [
                    { "path": "./src/greeter.ts", "type": "jsonrpc",
                      "methods": [{ "name": "tick", "type": "cron", "cronString": "*/5 * * * *" }] }
                ]
            }"#,
        );
        let project = ProjectConfiguration::load(&path).unwrap();
        assert_eq!(project.name.as_deref(), Some("greeter"));
        assert_eq!(project.root, dir.path());

        let class = project.find_class(&dir.path().join("src/greeter.ts")).unwrap();
        assert_eq!(class.trigger, Some(TriggerType::Jsonrpc));
        assert_eq!(class.methods[0].cron_string.as_deref(), Some("*/5 * * * *"));

        let config = CompilerConfig { languages: Vec::new(), ..CompilerConfig::default() }
            .merge_project(&project);
        assert_eq!(config.languages, vec!["ts", "python"]);
        assert_eq!(config.out_dir, dir.path().join("client"));
    }

    #[test]
    fn test_invalid_cron_rejected_at_load() {
        let (_dir, path) = write_project(
            r#"{ "classes": [{ "path": "a.ts",
                 "methods": [{ "name": "tick", "type": "cron", "cronString": "* * 15 * 3" }] }] }"#,
        );
        let err = ProjectConfiguration::load(&path).unwrap_err();
        assert!(matches!(err, CompilerError::InvalidCron { .. }));
    }

    #[test]
    fn test_malformed_json_is_invalid_config() {
        let (_dir, path) = write_project("{ not json");
        let err = ProjectConfiguration::load(&path).unwrap_err();
        assert!(matches!(err, CompilerError::InvalidConfig { .. }));
    }

    #[test]
    fn test_normalize_paths() {
        assert_eq!(normalize(Path::new("./src/../src/a.ts")), "src/a.ts");
        assert_eq!(normalize(Path::new("src\\a.ts")), "src/a.ts");
        assert_eq!(normalize(Path::new("/abs/./a.ts")), "/abs/a.ts");
    }
}
