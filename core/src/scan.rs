//! Balanced-delimiter scanning and keyed span extraction.
//!
//! Sub-expressions (chained calls, test blocks, helper bodies) are located
//! with a regex for the opening token and a depth counter for the matching
//! close, rather than through the grammar.

use regex::Regex;
use serde::Serialize;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Quoted(u8),
    LineComment,
    BlockComment,
}

/// Return the offset just past the delimiter that closes the one at `open_offset`.
///
/// Delimiters inside string and template literals and inside comments are not
/// counted; template substitutions (`${ ... }`) are scanned as code.
///
/// Returns `open_offset` unchanged when `text[open_offset]` is not `open`
/// or the text ends before depth returns to zero; callers treat an unchanged
/// offset as a failed extraction.
pub fn find_balanced_end(text: &str, open_offset: usize, open: u8, close: u8) -> usize {
    let bytes = text.as_bytes();
    if bytes.get(open_offset) != Some(&open) {
        return open_offset;
    }
    let mut depth = 0usize;
    // code-level `{` depth, and the depth at which each open `${` was entered
    let mut braces = 0usize;
    let mut substitutions: Vec<usize> = Vec::new();
    let mut mode = Mode::Code;
    let mut i = open_offset;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match mode {
            Mode::Code => match b {
                b'\'' | b'"' | b'`' => mode = Mode::Quoted(b),
                b'/' if next == Some(b'/') => {
                    mode = Mode::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    mode = Mode::BlockComment;
                    i += 1;
                }
                b'}' if substitutions.last() == Some(&braces) => {
                    substitutions.pop();
                    mode = Mode::Quoted(b'`');
                }
                _ => {
                    if b == b'{' {
                        braces += 1;
                    } else if b == b'}' {
                        braces = braces.saturating_sub(1);
                    }
                    if b == open {
                        depth += 1;
                    } else if b == close {
                        depth -= 1;
                        if depth == 0 {
                            return i + 1;
                        }
                    }
                }
            },
            Mode::Quoted(quote) => match b {
                b'\\' => i += 1,
                b'\n' if quote != b'`' => mode = Mode::Code,
                b'$' if quote == b'`' && next == Some(b'{') => {
                    substitutions.push(braces);
                    mode = Mode::Code;
                    i += 1;
                }
                _ if b == quote => mode = Mode::Code,
                _ => {}
            },
            Mode::LineComment => {
                if b == b'\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    mode = Mode::Code;
                    i += 1;
                }
            }
        }
        i += 1;
    }
    open_offset
}

/// A region of text identified by a key derived from its own content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyedSpan {
    pub key: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Extract every `opener ... (balanced)` region of `text`.
///
/// `opener` must end on the opening delimiter. `key` is matched against the
/// text starting at that delimiter and its first capture group becomes the
/// span key. Scanning resumes after each extracted span, so nested matches
/// are not reported separately.
pub fn extract_keyed_spans(
    text: &str,
    opener: &Regex,
    key: &Regex,
    open: u8,
    close: u8,
) -> Vec<KeyedSpan> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(m) = opener.find_at(text, pos) {
        let open_offset = m.end() - 1;
        let end = find_balanced_end(text, open_offset, open, close);
        if end == open_offset {
            trace!(offset = open_offset, "unbalanced candidate skipped");
            pos = m.end();
            continue;
        }
        let Some(k) = key.captures(&text[open_offset..end]).and_then(|c| c.get(1)) else {
            trace!(offset = open_offset, "no key in candidate");
            pos = m.end();
            continue;
        };
        spans.push(KeyedSpan {
            key: k.as_str().to_string(),
            text: text[m.start()..end].to_string(),
            start: m.start(),
            end,
        });
        pos = end;
    }
    spans
}

/// Widen `[start, end)` to whole lines when only whitespace (and an optional
/// `;`) sits between the span and the line boundaries.
pub fn widen_to_lines(text: &str, start: usize, end: usize) -> (usize, usize) {
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    let new_start = if text[line_start..start].trim().is_empty() {
        line_start
    } else {
        start
    };

    let rest = &text[end..];
    let mut new_end = end;
    let after_semi = rest.strip_prefix(';').map_or(0, |_| 1);
    let tail = &rest[after_semi..];
    let line_len = tail.find('\n').map_or(tail.len(), |i| i + 1);
    if tail[..line_len].trim().is_empty() {
        new_end += after_semi + line_len;
    } else {
        new_end += after_semi;
    }
    (new_start, new_end)
}
