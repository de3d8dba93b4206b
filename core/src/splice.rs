//! Text reconstruction from recorded patches.
//!
//! Merges never re-serialize parsed nodes. They record `(start, end,
//! replacement)` patches against the original text and materialize them in
//! a single ascending pass, so untouched regions keep their exact bytes.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::ast::SourceFile;

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl Patch {
    pub fn delete(start: usize, end: usize) -> Self {
        Self { start, end, replacement: String::new() }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self { start: at, end: at, replacement: text.into() }
    }

    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self { start, end, replacement: text.into() }
    }
}

/// Apply `patches` to `text[base..]`, with patch offsets given relative to
/// the whole of `text`.
///
/// Patches are ordered by `(start, end)`; at a shared offset an insertion is
/// emitted before a removal starting there. A patch overlapping one already
/// applied is dropped.
pub fn apply(text: &str, base: usize, mut patches: Vec<Patch>) -> String {
    patches.sort_by_key(|p| (p.start, p.end));
    let mut out = String::with_capacity(text.len() - base);
    let mut cursor = base;
    for p in patches {
        if p.start < cursor || p.end < p.start || p.end > text.len() {
            warn!(start = p.start, end = p.end, "overlapping patch dropped");
            continue;
        }
        out.push_str(&text[cursor..p.start]);
        out.push_str(&p.replacement);
        cursor = p.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Collapse runs of two or more blank lines into one.
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUNS.replace_all(text, "\n\n").into_owned()
}

/// Materialize `file` with its imports swapped for the merged `imports` and
/// `patches` applied.
///
/// The merged block takes the place of the first import statement and the
/// other import statements are removed, so header comments, comments between
/// imports and any code interleaved with them keep their bytes. A file without
/// imports gets the block in front of its first statement.
pub fn rebuild(file: &SourceFile, imports: &[String], patches: Vec<Patch>) -> String {
    let block = imports.join("\n");
    let mut all = Vec::with_capacity(patches.len() + file.imports.len() + 1);
    match file.imports.split_first() {
        Some((first, rest)) => {
            all.push(Patch::replace(first.start, first.end, block));
            all.extend(rest.iter().map(|i| Patch::delete(i.start, i.end)));
        }
        None if !block.is_empty() => {
            all.push(Patch::insert(file.first_statement_start(), format!("{block}\n\n")));
        }
        None => {}
    }
    // import patches first so they precede merge insertions at the same offset
    all.extend(patches);

    let merged = collapse_blank_lines(&apply(&file.code, 0, all));
    let mut out = merged.trim().to_string();
    out.push('\n');
    out
}
