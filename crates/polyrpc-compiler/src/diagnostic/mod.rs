//! Diagnostic types for error reporting.

mod error;
mod span;
mod warning;

pub use error::{join_supported, CompilerError};
pub use span::Span;
pub use warning::{TypeMappingWarning, WarningSink};
