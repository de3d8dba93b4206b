//! Declaration-level merge for handler files.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::ast::{SourceFile, TopLevelDeclaration};
use crate::chain::merge_inline_handler;
use crate::conventions::{Conventions, HandlerKind};
use crate::imports::merge_imports;
use crate::splice::{self, Patch};

fn handlers<'a>(
    file: &'a SourceFile,
    conventions: &Conventions,
) -> Vec<(&'a TopLevelDeclaration, HandlerKind)> {
    file.declarations
        .iter()
        .filter(|d| d.is_exported)
        .filter_map(|d| conventions.classify(&d.name).map(|k| (d, k)))
        .collect()
}

/// Merge a regenerated handler file into its possibly hand-edited predecessor.
///
/// Route handlers that are no longer generated are removed, inline handlers
/// present on both sides are merged call by call, and generated handlers the
/// existing file lacks are appended. Everything else keeps its existing bytes.
pub fn merge_handler_file(existing: &SourceFile, generated: &SourceFile, conventions: &Conventions) -> String {
    let imports = merge_imports(existing, generated, conventions);

    if !existing.has_body() {
        return splice::rebuild(generated, &imports, Vec::new());
    }

    let existing_handlers = handlers(existing, conventions);
    let generated_handlers = handlers(generated, conventions);
    let generated_by_name: HashMap<&str, &TopLevelDeclaration> = generated_handlers
        .iter()
        .map(|(d, _)| (d.name.as_str(), *d))
        .collect();

    let mut patches = Vec::new();
    for (decl, kind) in &existing_handlers {
        match (kind, generated_by_name.get(decl.name.as_str())) {
            (HandlerKind::Route, None) => {
                debug!(name = %decl.name, "removing route handler no longer generated");
                patches.push(Patch::delete(decl.full_start, decl.end));
            }
            (HandlerKind::Inline, Some(gen_decl)) => {
                let merged = merge_inline_handler(&decl.text, &gen_decl.text, conventions);
                if merged != decl.text {
                    patches.push(Patch::replace(decl.start, decl.end, merged));
                }
            }
            _ => {}
        }
    }

    let existing_names: HashSet<&str> = existing_handlers.iter().map(|(d, _)| d.name.as_str()).collect();
    for (decl, _) in &generated_handlers {
        if existing_names.contains(decl.name.as_str()) {
            continue;
        }
        debug!(name = %decl.name, "appending generated handler");
        patches.push(Patch::insert(
            existing.code.len(),
            format!("\n\n{}", decl.full_text(&generated.code).trim()),
        ));
    }

    splice::rebuild(existing, &imports, patches)
}
