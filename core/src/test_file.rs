//! Merge for generated test suites.
//!
//! Route blocks are calls like `describe('GET /users', ...)`, keyed by their
//! title. Mock helpers are `function mockX(...) { ... }` declarations keyed by
//! name; generated helpers are only ever added, never removed.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::ast::SourceFile;
use crate::conventions::Conventions;
use crate::imports::merge_imports;
use crate::scan::{KeyedSpan, extract_keyed_spans, find_balanced_end, widen_to_lines};
use crate::splice::{self, Patch};

static SUITE_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\}\)[ \t]*;?[ \t]*$").unwrap());

struct Patterns {
    block_opener: Regex,
    block_title: Regex,
    helper: Regex,
}

impl Patterns {
    fn new(conventions: &Conventions) -> Self {
        let callees = alternation(&conventions.test_callees);
        let methods = alternation(&conventions.http_methods);
        let prefix = regex::escape(&conventions.helper_prefix);
        Self {
            block_opener: Regex::new(&format!(r"\b(?:{callees})(?:\.(?:only|skip|todo))?\s*\("))
                .expect("escaped callee names form a valid pattern"),
            block_title: Regex::new(&format!(r#"^\(\s*['"`]((?:{methods}) /[^\s'"`]*)['"`]"#))
                .expect("escaped method names form a valid pattern"),
            helper: Regex::new(&format!(
                r"(?m)^[ \t]*(?:export\s+)?(?:async\s+)?function\s*\*?\s*({prefix}[\w$]*)\s*(?:<[^>{{}}]*>)?\s*\("
            ))
            .expect("escaped helper prefix forms a valid pattern"),
        }
    }
}

fn alternation(words: &[String]) -> String {
    words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|")
}

/// Route blocks widened to whole lines.
fn route_blocks(code: &str, patterns: &Patterns) -> Vec<KeyedSpan> {
    extract_keyed_spans(code, &patterns.block_opener, &patterns.block_title, b'(', b')')
        .into_iter()
        .map(|s| widen(code, s))
        .collect()
}

/// `function <prefix>Name(...) { ... }` declarations, widened to whole lines.
fn helper_functions(code: &str, patterns: &Patterns) -> Vec<KeyedSpan> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(caps) = patterns.helper.captures_at(code, pos) {
        let (Some(m), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        pos = m.end();
        let params_open = m.end() - 1;
        let params_end = find_balanced_end(code, params_open, b'(', b')');
        if params_end == params_open {
            trace!(name = name.as_str(), "helper parameters unbalanced");
            continue;
        }
        let Some(body_open) = code[params_end..].find('{').map(|i| params_end + i) else {
            continue;
        };
        let end = find_balanced_end(code, body_open, b'{', b'}');
        if end == body_open {
            trace!(name = name.as_str(), "helper body unbalanced");
            continue;
        }
        spans.push(widen(
            code,
            KeyedSpan {
                key: name.as_str().to_string(),
                text: String::new(),
                start: m.start(),
                end,
            },
        ));
        pos = end;
    }
    spans
}

fn widen(code: &str, span: KeyedSpan) -> KeyedSpan {
    let (start, end) = widen_to_lines(code, span.start, span.end);
    KeyedSpan {
        key: span.key,
        text: code[start..end].to_string(),
        start,
        end,
    }
}

fn as_lines(text: &str) -> String {
    let mut s = text.trim_end_matches([' ', '\t']).to_string();
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

pub fn merge_test_file(existing: &SourceFile, generated: &SourceFile, conventions: &Conventions) -> String {
    let imports = merge_imports(existing, generated, conventions);
    if !existing.has_body() {
        return splice::rebuild(generated, &imports, Vec::new());
    }

    let patterns = Patterns::new(conventions);
    let body_start = existing.body_start();
    let code = existing.code.as_str();

    let existing_blocks = route_blocks(code, &patterns);
    let generated_blocks = route_blocks(&generated.code, &patterns);
    let existing_keys: HashSet<&str> = existing_blocks.iter().map(|s| s.key.as_str()).collect();
    let generated_keys: HashSet<&str> = generated_blocks.iter().map(|s| s.key.as_str()).collect();

    let mut patches = Vec::new();

    for block in &existing_blocks {
        if !generated_keys.contains(block.key.as_str()) {
            debug!(title = %block.key, "removing route block no longer generated");
            patches.push(Patch::delete(block.start, block.end));
        }
    }

    let last_block_end = existing_blocks.iter().map(|s| s.end).max().unwrap_or(body_start);
    let suite_close = SUITE_CLOSE
        .find_iter(code)
        .filter(|m| m.start() >= last_block_end.max(body_start))
        .last()
        .map(|m| m.start());
    for block in generated_blocks.iter().filter(|s| !existing_keys.contains(s.key.as_str())) {
        debug!(title = %block.key, "adding route block");
        let patch = match suite_close {
            Some(at) => Patch::insert(at, format!("\n{}", as_lines(&block.text))),
            None => Patch::insert(code.len(), format!("\n\n{}", as_lines(&block.text))),
        };
        patches.push(patch);
    }

    let existing_helpers: HashSet<String> = helper_functions(code, &patterns)
        .into_iter()
        .map(|s| s.key)
        .collect();
    // before the top-level statement holding the first route block, so a
    // helper never lands inside a suite wrapper
    let helper_at = existing_blocks
        .first()
        .map(|b| existing.statement_at(b.start).map_or(b.start, |(start, _)| start));
    for helper in helper_functions(&generated.code, &patterns) {
        if existing_helpers.contains(&helper.key) {
            continue;
        }
        debug!(name = %helper.key, "adding mock helper");
        let text = as_lines(&helper.text);
        patches.push(match helper_at {
            Some(at) => Patch::insert(at, format!("{text}\n")),
            None => Patch::insert(body_start, format!("\n\n{text}\n")),
        });
    }

    splice::rebuild(existing, &imports, patches)
}
