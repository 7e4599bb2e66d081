use std::fmt::Write as _;

use biblatex::{ChunksExt, Entry};

use crate::bibtex::{chunks_to_string, field_text};
use crate::config::INDENT;

/// Fields written back exactly as they were read, without LaTeX escaping.
const VERBATIM_FIELDS: &[&str] = &["doi", "eprint", "file", "pdf", "url", "urlraw"];

/// Month names the parser expands from the standard `jan`..`dec` macros.
const MONTHS: [(&str, &str); 12] = [
    ("January", "jan"),
    ("February", "feb"),
    ("March", "mar"),
    ("April", "apr"),
    ("May", "may"),
    ("June", "jun"),
    ("July", "jul"),
    ("August", "aug"),
    ("September", "sep"),
    ("October", "oct"),
    ("November", "nov"),
    ("December", "dec"),
];

/// Serialises entries as BibTeX text.
///
/// Entries are stably sorted by the plain-text values of `order_by`, compared as strings left to
/// right; an entry lacking a field sorts as if it were empty. `ID` and `ENTRYTYPE` sort by key
/// and entry type. Fields are written in alphabetical order, one per line.
#[derive(Debug, Clone)]
pub struct Writer {
    pub indent: usize,
    pub order_by: Vec<String>,
}

impl Default for Writer {
    fn default() -> Self {
        Writer {
            indent: INDENT,
            order_by: vec!["year".to_string()],
        }
    }
}

impl Writer {
    pub fn write(&self, entries: &[Entry]) -> String {
        let mut sorted: Vec<&Entry> = entries.iter().collect();
        sorted.sort_by_cached_key(|e| self.sort_key(e));

        let indent = " ".repeat(self.indent);
        let mut out = String::new();
        for entry in sorted {
            let _ = write!(out, "@{}{{{}", entry.entry_type, entry.key);
            for (field, value) in &entry.fields {
                let value = if VERBATIM_FIELDS.contains(&field.as_str()) {
                    format!("{{{}}}", chunks_to_string(value))
                } else if let Some(abbr) = month_macro(field, &chunks_to_string(value)) {
                    abbr.to_string()
                } else {
                    value.to_biblatex_string(false)
                };
                let _ = write!(out, ",\n{indent}{field} = {value}");
            }
            out.push_str("\n}\n\n");
        }
        out
    }

    fn sort_key(&self, entry: &Entry) -> Vec<String> {
        self.order_by
            .iter()
            .map(|field| match field.as_str() {
                "ID" => entry.key.clone(),
                "ENTRYTYPE" => entry.entry_type.to_string(),
                f => field_text(entry, f).unwrap_or_default(),
            })
            .collect()
    }
}

/// The bare `jan`..`dec` macro for a `month` field holding a full month name.
fn month_macro(field: &str, text: &str) -> Option<&'static str> {
    if !field.eq_ignore_ascii_case("month") {
        return None;
    }
    MONTHS
        .iter()
        .find(|(name, _)| *name == text)
        .map(|&(_, abbr)| abbr)
}
