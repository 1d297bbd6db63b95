//! Trigger classification.
//!
//! Every SDK-visible method ends up with exactly one trigger type:
//!
//! - `jsonrpc` (default): called through the JSON-RPC primitive with its
//!   arguments in declaration order.
//! - `http`: called with a single request object, outside JSON-RPC dispatch.
//! - `cron`: not callable, left out of every SDK and listed in the
//!   [`ScheduleManifest`] instead.
//!
//! Configuration wins over source annotations, and a method without its own
//! trigger inherits the class trigger.

pub mod annotation;
pub mod cron;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ClassConfiguration;
use crate::diagnostic::CompilerError;
use crate::ir::ClassDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    #[default]
    Jsonrpc,
    Http,
    Cron,
}

impl TriggerType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "jsonrpc" => Some(TriggerType::Jsonrpc),
            "http" => Some(TriggerType::Http),
            "cron" => Some(TriggerType::Cron),
            _ => None,
        }
    }

    /// Whether methods with this trigger appear in generated SDKs.
    pub fn is_callable(self) -> bool {
        !matches!(self, TriggerType::Cron)
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerType::Jsonrpc => "jsonrpc",
            TriggerType::Http => "http",
            TriggerType::Cron => "cron",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodTrigger {
    pub method: String,
    #[serde(rename = "type")]
    pub trigger: TriggerType,
    /// Rectified schedule, present for cron methods only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_string: Option<String>,
}

/// The classification of one class and its methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassTriggers {
    pub class_name: String,
    #[serde(rename = "type")]
    pub class_trigger: TriggerType,
    pub methods: Vec<MethodTrigger>,
}

impl ClassTriggers {
    /// The effective trigger of a method, falling back to the class trigger.
    pub fn trigger_of(&self, method: &str) -> TriggerType {
        self.methods
            .iter()
            .find(|m| m.method == method)
            .map(|m| m.trigger)
            .unwrap_or(self.class_trigger)
    }

    /// Whether at least one method is reachable from an SDK.
    pub fn has_callable(&self) -> bool {
        self.methods.iter().any(|m| m.trigger.is_callable())
    }
}

/// Assigns trigger types to a class and each of its methods.
pub fn classify(
    class: &ClassDefinition,
    config: Option<&ClassConfiguration>,
) -> Result<ClassTriggers, CompilerError> {
    let class_trigger = config
        .and_then(|c| c.trigger)
        .or_else(|| class.trigger.as_ref().map(|a| a.trigger))
        .unwrap_or_default();

    let mut methods = Vec::new();
    for method in class.callable_methods() {
        let configured = config.and_then(|c| c.methods.iter().find(|m| m.name == method.name));

        let trigger = configured
            .and_then(|m| m.trigger)
            .or_else(|| method.trigger.as_ref().map(|a| a.trigger))
            .unwrap_or(class_trigger);

        let cron_string = match trigger {
            TriggerType::Cron => {
                let schedule = configured
                    .and_then(|m| m.cron_string.clone())
                    .or_else(|| method.trigger.as_ref().and_then(|a| a.cron_string.clone()))
                    .ok_or_else(|| CompilerError::InvalidCron {
                        class: class.name.clone(),
                        method: method.name.clone(),
                        cron: String::new(),
                        reason: "cron methods need a schedule".to_string(),
                    })?;
                Some(cron::validate_schedule(&class.name, &method.name, &schedule)?)
            }
            TriggerType::Jsonrpc | TriggerType::Http => None,
        };

        methods.push(MethodTrigger {
            method: method.name.clone(),
            trigger,
            cron_string,
        });
    }

    Ok(ClassTriggers {
        class_name: class.name.clone(),
        class_trigger,
        methods,
    })
}

/// A cron method the scheduler has to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub class_name: String,
    pub method_name: String,
    pub cron_string: String,
    pub path: String,
}

/// All cron methods of a project, sorted by class then method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleManifest {
    pub entries: Vec<ScheduleEntry>,
}

impl ScheduleManifest {
    pub fn from_classes<'a>(
        classes: impl IntoIterator<Item = (&'a ClassDefinition, &'a ClassTriggers)>,
    ) -> Self {
        let mut entries: Vec<ScheduleEntry> = classes
            .into_iter()
            .flat_map(|(class, triggers)| {
                triggers.methods.iter().filter_map(move |m| {
                    m.cron_string.as_ref().map(|cron| ScheduleEntry {
                        class_name: class.name.clone(),
                        method_name: m.method.clone(),
                        cron_string: cron.clone(),
                        path: class.path.clone(),
                    })
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            (&a.class_name, &a.method_name).cmp(&(&b.class_name, &b.method_name))
        });
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MethodConfiguration;
    use crate::ir::{MethodDefinition, MethodKind, TriggerAnnotation, TypeNode};

    fn class_with(methods: Vec<MethodDefinition>) -> ClassDefinition {
        ClassDefinition {
            name: "Jobs".to_string(),
            path: "src/jobs.ts".to_string(),
            doc_string: None,
            methods,
            trigger: None,
        }
    }

    fn config(methods: Vec<MethodConfiguration>) -> ClassConfiguration {
        ClassConfiguration {
            name: None,
            path: "src/jobs.ts".to_string(),
            trigger: None,
            methods,
        }
    }

    #[test]
    fn test_defaults_to_jsonrpc() {
        let class = class_with(vec![MethodDefinition::new("run", TypeNode::VoidLiteral)]);
        let triggers = classify(&class, None).unwrap();
        assert_eq!(triggers.class_trigger, TriggerType::Jsonrpc);
        assert_eq!(triggers.trigger_of("run"), TriggerType::Jsonrpc);
        assert!(triggers.has_callable());
    }

    #[test]
    fn test_constructor_is_not_classified() {
        let mut ctor = MethodDefinition::new("constructor", TypeNode::VoidLiteral);
        ctor.kind = MethodKind::Constructor;
        let class = class_with(vec![ctor]);
        let triggers = classify(&class, None).unwrap();
        assert!(triggers.methods.is_empty());
        assert!(!triggers.has_callable());
    }

    #[test]
    fn test_configuration_overrides_annotation() {
        let mut method = MethodDefinition::new("hook", TypeNode::AnyLiteral);
        method.trigger = Some(TriggerAnnotation::new(TriggerType::Jsonrpc));
        let class = class_with(vec![method]);
        let cfg = config(vec![MethodConfiguration {
            name: "hook".to_string(),
            trigger: Some(TriggerType::Http),
            cron_string: None,
        }]);
        let triggers = classify(&class, Some(&cfg)).unwrap();
        assert_eq!(triggers.trigger_of("hook"), TriggerType::Http);
    }

    #[test]
    fn test_method_inherits_class_annotation() {
        let mut class = class_with(vec![MethodDefinition::new("hook", TypeNode::AnyLiteral)]);
        class.trigger = Some(TriggerAnnotation::new(TriggerType::Http));
        let triggers = classify(&class, None).unwrap();
        assert_eq!(triggers.class_trigger, TriggerType::Http);
        assert_eq!(triggers.trigger_of("hook"), TriggerType::Http);
    }

    #[test]
    fn test_cron_from_annotation_is_rectified() {
        let mut method = MethodDefinition::new("tick", TypeNode::VoidLiteral);
        method.trigger = Some(TriggerAnnotation::cron("5/10 * * * *"));
        let class = class_with(vec![method]);
        let triggers = classify(&class, None).unwrap();
        assert_eq!(triggers.methods[0].cron_string.as_deref(), Some("5-59/10 * * * *"));
        assert!(!triggers.has_callable());
    }

    #[test]
    fn test_cron_rejects_day_of_month_and_week() {
        let class = class_with(vec![MethodDefinition::new("tick", TypeNode::VoidLiteral)]);
        let cfg = config(vec![MethodConfiguration {
            name: "tick".to_string(),
            trigger: Some(TriggerType::Cron),
            cron_string: Some("* * 15 * 3".to_string()),
        }]);
        let err = classify(&class, Some(&cfg)).unwrap_err();
        assert!(matches!(err, CompilerError::InvalidCron { .. }));
    }

    #[test]
    fn test_cron_without_schedule_fails() {
        let mut class = class_with(vec![MethodDefinition::new("tick", TypeNode::VoidLiteral)]);
        class.trigger = Some(TriggerAnnotation::new(TriggerType::Cron));
        assert!(classify(&class, None).is_err());
    }

    #[test]
    fn test_schedule_manifest_is_sorted() {
        let mut b = MethodDefinition::new("b", TypeNode::VoidLiteral);
        b.trigger = Some(TriggerAnnotation::cron("0 * * * *"));
        let mut a = MethodDefinition::new("a", TypeNode::VoidLiteral);
        a.trigger = Some(TriggerAnnotation::cron("*/5 * * * *"));
        let class = class_with(vec![b, a, MethodDefinition::new("c", TypeNode::VoidLiteral)]);
        let triggers = classify(&class, None).unwrap();

        let manifest = ScheduleManifest::from_classes([(&class, &triggers)]);
        let names: Vec<_> = manifest.entries.iter().map(|e| e.method_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(manifest.entries[0].path, "src/jobs.ts");
    }
}
