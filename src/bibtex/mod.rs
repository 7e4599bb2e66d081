use std::{fs, path::Path};

use anyhow::{Context, anyhow};
use biblatex::{Bibliography, Chunk, Entry, Spanned};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::keywords::KeywordExtractor;

pub mod rekey;
pub mod writer;

pub use rekey::KeyRewriter;
pub use writer::Writer;

/// Write the raw citations one after another, replacing whatever was at `path`.
pub fn write_citations(path: &Path, citations: &[String]) -> anyhow::Result<()> {
    fs::write(path, citations.join("\n"))
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Parse a BibTeX database, keeping entries in file order.
///
/// A database with clashing keys (ORCID hands those out freely) fails as a whole, so it is
/// split at every `@type` line instead and each chunk is parsed on its own, with the `@string`
/// definitions seen so far in front of it.
pub fn load(text: &str) -> anyhow::Result<Vec<Entry>> {
    match Bibliography::parse(text) {
        Ok(bib) => Ok(bib.into_iter().collect()),
        Err(e) => {
            tracing::debug!(error = %e, "whole-file parse failed, parsing entries one by one");
            load_chunked(text)
        }
    }
}

fn load_chunked(text: &str) -> anyhow::Result<Vec<Entry>> {
    static ENTRY_START_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^[ \t]*@[A-Za-z]").unwrap());
    static STRING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*@string\s*[{(]").unwrap());

    let starts: Vec<usize> = ENTRY_START_RE.find_iter(text).map(|m| m.start()).collect();
    let mut strings = String::new();
    let mut entries = Vec::new();
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let chunk = &text[start..end];
        let bib = Bibliography::parse(&format!("{strings}{chunk}"))
            .map_err(|e| anyhow!("failed to parse BibTeX at byte {start}: {e}"))?;
        if STRING_RE.is_match(chunk) {
            strings.push_str(chunk);
            strings.push('\n');
        }
        entries.extend(bib);
    }
    Ok(entries)
}

/// Plain text of a field, LaTeX markup already decoded by the parser.
pub fn field_text(entry: &Entry, field: &str) -> Option<String> {
    entry.get(field).map(chunks_to_string)
}

pub fn title_text(entry: &Entry) -> anyhow::Result<String> {
    field_text(entry, "title").ok_or_else(|| anyhow!("entry {} has no title", entry.key))
}

pub(crate) fn chunks_to_string(chunks: &[Spanned<Chunk>]) -> String {
    chunks
        .iter()
        .map(|c| match &c.v {
            Chunk::Normal(s) => s.as_str(),
            Chunk::Verbatim(s) => s.as_str(),
            Chunk::Math(s) => s.as_str(),
        })
        .collect()
}

/// Read `input`, give every entry a unique descriptive key and write the result to `output`.
///
/// Returns the number of entries written.
pub fn format_file<E: KeywordExtractor>(
    input: &Path,
    output: &Path,
    extractor: E,
    writer: &Writer,
) -> anyhow::Result<usize> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let mut entries = load(&text)?;
    tracing::info!(entries = entries.len(), path = %input.display(), "loaded bibliography");

    KeyRewriter::new(extractor).rewrite(&mut entries)?;

    fs::write(output, writer.write(&entries))
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(entries.len())
}
