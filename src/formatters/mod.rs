//! Formatter implementations

pub mod json;
pub mod logfmt;
pub mod text;

pub use json::JsonFormatter;
pub use logfmt::LogfmtFormatter;
pub use text::{TextFormatter, DEFAULT_PATTERN};

pub use crate::core::Formatter;
