//! # polyrpc compiler
//!
//! Turns server classes written in JavaScript, TypeScript, Go, Python, Kotlin
//! or Dart into one language-neutral AST and generates typed client SDKs for
//! TypeScript, JavaScript, Python, Go, Kotlin, Dart and Swift from it.
//!
//! ## Architecture
//!
//! ```text
//! Source files (.ts, .go, .py, ...)
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Frontend   │  One AST generator per extension (or a plugin)
//! │ (src → IR)   │
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Classify   │  jsonrpc / http / cron per method, cron validation
//! │    (IR)      │
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Codegen    │  One SDK generator per target language (or a plugin)
//! │ (IR → SDK)   │
//! └──────────────┘
//! ```
//!
//! Parsing and generation run on a bounded pool of blocking tasks; see
//! [`pipeline`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use polyrpc_compiler::{CompilerConfig, Pipeline, ProjectConfiguration};
//!
//! let project = ProjectConfiguration::load("polyrpc.json".as_ref())?;
//! let config = CompilerConfig::default().merge_project(&project);
//!
//! let pipeline = Pipeline::new(config)?;
//! let output = pipeline.run(&project).await?;
//! pipeline.write_output(&output)?;
//! ```

pub mod classify;
pub mod codegen;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod frontend;
pub mod ir;
pub mod pipeline;
pub mod plugin;

pub use classify::{classify, ClassTriggers, ScheduleManifest, TriggerType};
pub use codegen::{SdkDispatcher, SdkFile, SdkFiles, SdkGenerator, SdkGeneratorInput};
pub use config::{CompilerConfig, ProjectConfiguration, PROJECT_FILE};
pub use context::GenerationContext;
pub use diagnostic::{CompilerError, TypeMappingWarning};
pub use frontend::{AstDispatcher, AstGenerator, SourceFile};
pub use ir::{Program, TypeNode};
pub use pipeline::{GenerationOutput, GenerationReport, Pipeline};
