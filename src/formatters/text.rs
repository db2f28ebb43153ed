//! `%`-style pattern formatter
//!
//! Patterns use `%(key)s` placeholders with optional `-` alignment, width and
//! precision, e.g. `%(asctime)s %(levelname)-8s %(name)s: %(message)s`.

use crate::core::{
    FieldValue, Formatter, LogRecord, LoggerError, Result, TimestampFormat,
};
use std::fmt::Write as _;

pub const DEFAULT_PATTERN: &str = "%(levelname)s:%(name)s:%(message)s";

/// Rendered when a placeholder names a key the record does not carry
const MISSING: &str = "-";

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

#[derive(Debug, Clone, PartialEq)]
struct Placeholder {
    key: String,
    left_align: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

/// Compiled text pattern plus date format
#[derive(Debug, Clone)]
pub struct TextFormatter {
    pattern: String,
    segments: Vec<Segment>,
    timestamp_format: TimestampFormat,
    uses_asctime: bool,
}

impl TextFormatter {
    pub fn new(pattern: &str, datefmt: Option<&str>) -> Result<Self> {
        let segments = parse_pattern(pattern)?;
        let uses_asctime = segments
            .iter()
            .any(|s| matches!(s, Segment::Field(p) if p.key == "asctime"));
        Ok(Self {
            pattern: pattern.to_string(),
            segments,
            timestamp_format: TimestampFormat::from_datefmt(datefmt)?,
            uses_asctime,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn timestamp_format(&self) -> &TimestampFormat {
        &self.timestamp_format
    }

    fn attribute(&self, record: &LogRecord, key: &str) -> Option<FieldValue> {
        let value = match key {
            "message" => FieldValue::from(record.message.as_str()),
            "name" => FieldValue::from(record.name.as_str()),
            "levelname" => FieldValue::from(record.level.to_str()),
            "levelno" => FieldValue::Int(i64::from(record.level.as_number())),
            "asctime" => FieldValue::String(self.timestamp_format.format(&record.timestamp)),
            "created" => FieldValue::Float(record.timestamp.timestamp_micros() as f64 / 1e6),
            "msecs" => FieldValue::Int(i64::from(record.timestamp.timestamp_subsec_millis())),
            "thread" => FieldValue::from(record.thread_id.as_str()),
            "threadName" => FieldValue::from(record.thread_label()),
            "process" => FieldValue::Int(i64::from(std::process::id())),
            "module" => FieldValue::from(record.module()?),
            "filename" => FieldValue::from(record.filename()?),
            "pathname" => FieldValue::from(record.file.as_deref()?),
            "lineno" => FieldValue::Int(i64::from(record.line?)),
            "exc_text" => FieldValue::from(record.exc_text.as_deref()?),
            other => record.field(other)?.clone(),
        };
        Some(value)
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            segments: parse_pattern(DEFAULT_PATTERN).unwrap_or_default(),
            timestamp_format: TimestampFormat::Classic,
            uses_asctime: false,
        }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(self.pattern.len() + record.message.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(placeholder) => {
                    let value = self.attribute(record, &placeholder.key);
                    write_placeholder(&mut out, placeholder, value.as_ref());
                }
            }
        }
        if let Some(exc) = &record.exc_text {
            out.push('\n');
            out.push_str(exc);
        }
        out
    }

    fn kind(&self) -> &str {
        "text"
    }
}

impl TextFormatter {
    /// True when the pattern renders a timestamp
    pub fn uses_time(&self) -> bool {
        self.uses_asctime
    }
}

fn write_placeholder(out: &mut String, placeholder: &Placeholder, value: Option<&FieldValue>) {
    let rendered = match (value, placeholder.precision) {
        (Some(FieldValue::Float(f)), Some(precision)) => format!("{:.*}", precision, f),
        (Some(FieldValue::String(s)), Some(precision)) => s.chars().take(precision).collect(),
        (Some(value), _) => value.to_string(),
        (None, _) => MISSING.to_string(),
    };
    let _ = match (placeholder.width, placeholder.left_align) {
        (Some(width), true) => write!(out, "{:<width$}", rendered, width = width),
        (Some(width), false) => write!(out, "{:>width$}", rendered, width = width),
        (None, _) => write!(out, "{}", rendered),
    };
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        match chars.peek() {
            Some('%') => {
                chars.next();
                literal.push('%');
            }
            Some('(') => {
                chars.next();
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some(ch) => key.push(ch),
                        None => {
                            return Err(LoggerError::formatter(
                                "text",
                                format!("unterminated placeholder '%({}' in '{}'", key, pattern),
                            ))
                        }
                    }
                }
                if key.is_empty() {
                    return Err(LoggerError::formatter(
                        "text",
                        format!("empty placeholder in '{}'", pattern),
                    ));
                }

                let left_align = chars.next_if_eq(&'-').is_some();
                let width = take_number(&mut chars);
                let precision = if chars.next_if_eq(&'.').is_some() {
                    Some(take_number(&mut chars).unwrap_or(0))
                } else {
                    None
                };
                match chars.next() {
                    Some('s' | 'd' | 'f' | 'r' | 'i') => {}
                    other => {
                        return Err(LoggerError::formatter(
                            "text",
                            format!(
                                "placeholder '%({})' needs a conversion (s, d, f, r, i), found {:?}",
                                key, other
                            ),
                        ))
                    }
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field(Placeholder {
                    key,
                    left_align,
                    width,
                    precision,
                }));
            }
            _ => literal.push('%'),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(d) = chars.next_if(|c| c.is_ascii_digit()) {
        digits.push(d);
    }
    digits.parse().ok()
}
