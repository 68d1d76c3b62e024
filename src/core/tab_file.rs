//! core::tab_file
//!
//! Tab-delimited two column text files.
//!
//! # Format
//!
//! ```text
//! # name      	value
//! #
//! alpha       	first
//! much-longer 	second
//! ```
//!
//! - Empty lines and lines starting with `#` are ignored. A line holding
//!   only whitespace is not empty.
//! - Every other line is split on its first tab into a left and right
//!   column. A line without a tab is reported to a [`ValidationErrorSink`]
//!   and skipped; parsing continues with the next line.
//! - Rendering pads the left column (and the `# ` header) with trailing
//!   spaces to a common width, followed by a bare `#` separator line.
//!
//! # Example
//!
//! ```
//! use metaref::core::tab_file::{self, ValidationError, TRIM};
//!
//! let mut errors: Vec<ValidationError> = Vec::new();
//! let rows = tab_file::parse("a\t1\nbroken\n", "groups", TRIM, TRIM, &mut errors);
//! assert_eq!(rows.len(), 1);
//! assert_eq!(errors[0].line, 2);
//!
//! let text = tab_file::render_rows("key", "value", &rows).unwrap();
//! assert_eq!(text, "# key\tvalue\n#\na    \t1\n");
//! ```

use std::collections::BTreeMap;
use std::fmt;

/// One data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub left: String,
    pub right: String,
}

impl Row {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// A problem found in a stored file, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}

/// Receiver for per-line validation problems.
pub trait ValidationErrorSink {
    fn error(&mut self, error: ValidationError);
}

impl ValidationErrorSink for Vec<ValidationError> {
    fn error(&mut self, error: ValidationError) {
        self.push(error);
    }
}

impl<F: FnMut(ValidationError)> ValidationErrorSink for F {
    fn error(&mut self, error: ValidationError) {
        self(error)
    }
}

/// Transform applied to a column after splitting.
pub type Parser = fn(&str) -> String;

/// Keep the column as written.
pub const IDENTITY: Parser = |s| s.to_string();

/// Strip surrounding whitespace.
pub const TRIM: Parser = |s| s.trim().to_string();

/// Parse rows, reporting malformed lines to `sink`.
pub fn parse(
    text: &str,
    file: &str,
    left: Parser,
    right: Parser,
    sink: &mut dyn ValidationErrorSink,
) -> Vec<Row> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('\t') {
            Some((l, r)) => rows.push(Row::new(left(l), right(r))),
            None => sink.error(ValidationError {
                file: file.to_string(),
                line: idx + 1,
                message: "missing tab delimiter".to_string(),
            }),
        }
    }
    rows
}

/// Parse rows straight into a map. Later rows win on duplicate keys.
pub fn parse_map(
    text: &str,
    file: &str,
    left: Parser,
    right: Parser,
    sink: &mut dyn ValidationErrorSink,
) -> BTreeMap<String, String> {
    to_map(parse(text, file, left, right, sink))
}

pub fn to_map(rows: impl IntoIterator<Item = Row>) -> BTreeMap<String, String> {
    rows.into_iter().map(|row| (row.left, row.right)).collect()
}

/// Render rows in the given order.
///
/// Returns `None` when there are no rows, so callers can delete the file
/// instead of storing a header with no content.
pub fn render_rows(left_header: &str, right_header: &str, rows: &[Row]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }

    let header = format!("# {}", left_header);
    let width = rows
        .iter()
        .map(|row| row.left.chars().count())
        .fold(header.chars().count(), usize::max);

    let mut out = String::new();
    push_line(&mut out, &header, right_header, width);
    out.push_str("#\n");
    for row in rows {
        push_line(&mut out, &row.left, &row.right, width);
    }
    Some(out)
}

/// Render a mapping, sorted by key.
pub fn render_map<K, V>(
    left_header: &str,
    right_header: &str,
    entries: impl IntoIterator<Item = (K, V)>,
) -> Option<String>
where
    K: Into<String>,
    V: Into<String>,
{
    let mut rows: Vec<Row> = entries
        .into_iter()
        .map(|(k, v)| Row::new(k, v))
        .collect();
    rows.sort_by(|a, b| a.left.cmp(&b.left));
    render_rows(left_header, right_header, &rows)
}

fn push_line(out: &mut String, left: &str, right: &str, width: usize) {
    out.push_str(left);
    for _ in left.chars().count()..width {
        out.push(' ');
    }
    out.push('\t');
    out.push_str(right);
    out.push('\n');
}
