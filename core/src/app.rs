//! Merge for the app entry file, which owns the route registration chain.
//!
//! The aggregate declaration (`export const api = app.openapi(...)...`) is
//! replaced by its generated form. Calls the user chained between the root
//! identifier and the first registration call, such as `.use(auth)`, are
//! carried over into the new chain.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::ast::SourceFile;
use crate::chain::registration_call;
use crate::conventions::Conventions;
use crate::imports::merge_imports;
use crate::splice::{self, Patch};

static CHAIN_ROOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"=\s*[A-Za-z_$][\w$]*").unwrap());

/// Offsets of the chain root's end and of the first registration call.
fn chain_bounds(decl: &str, conventions: &Conventions) -> Option<(usize, usize)> {
    let root_end = CHAIN_ROOT.find(decl)?.end();
    let first_call = registration_call(conventions)
        .find_at(decl, root_end)
        .map_or_else(|| decl.trim_end().trim_end_matches(';').len(), |m| m.start());
    Some((root_end, first_call.max(root_end)))
}

/// Splice the existing chain's configuration segment into the generated chain.
pub fn preserve_chain_prefix(existing_decl: &str, generated_decl: &str, conventions: &Conventions) -> String {
    let Some((e_root, e_first)) = chain_bounds(existing_decl, conventions) else {
        return generated_decl.to_string();
    };
    let segment = &existing_decl[e_root..e_first];
    if segment.trim().is_empty() {
        return generated_decl.to_string();
    }
    let Some((g_root, g_first)) = chain_bounds(generated_decl, conventions) else {
        return generated_decl.to_string();
    };
    debug!(segment = segment.trim(), "preserving chain prefix");
    format!(
        "{}{}{}",
        &generated_decl[..g_root],
        segment,
        &generated_decl[g_first..]
    )
}

pub fn merge_app_file(existing: &SourceFile, generated: &SourceFile, conventions: &Conventions) -> String {
    let imports = merge_imports(existing, generated, conventions);
    if !existing.has_body() {
        return splice::rebuild(generated, &imports, Vec::new());
    }

    let name = conventions.aggregate_name.as_str();
    let Some(gen_decl) = generated.declaration(name) else {
        return splice::rebuild(existing, &imports, Vec::new());
    };

    let patch = match existing.declaration(name) {
        Some(decl) => Patch::replace(
            decl.start,
            decl.end,
            preserve_chain_prefix(&decl.text, &gen_decl.text, conventions),
        ),
        None => {
            debug!(name, "aggregate declaration missing, inserting generated one");
            Patch::insert(existing.body_start(), format!("\n\n{}\n\n", gen_decl.text))
        }
    };

    splice::rebuild(existing, &imports, vec![patch])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstLanguage, parse_source};
    use crate::error::Side;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn merge(existing: &str, generated: &str) -> String {
        let e = parse_source(existing, AstLanguage::TypeScript, Side::Existing).unwrap();
        let g = parse_source(generated, AstLanguage::TypeScript, Side::Generated).unwrap();
        merge_app_file(&e, &g, &Conventions::default())
    }

    #[rstest]
    #[case(
        "export const api = app.use(auth).openapi(R1).openapi(R2)",
        "export const api = app.openapi(R1).openapi(R2).openapi(R3)",
        "export const api = app.use(auth).openapi(R1).openapi(R2).openapi(R3)"
    )]
    #[case(
        "export const api = app\n  .use(auth)\n  .openapi(R1)",
        "export const api = app\n  .openapi(R2)",
        "export const api = app\n  .use(auth)\n  .openapi(R2)"
    )]
    #[case(
        "export const api = app.openapi(R1)",
        "export const api = app.openapi(R2)",
        "export const api = app.openapi(R2)"
    )]
    #[case(
        "export const api = app.use(auth)",
        "export const api = app.openapi(R1)",
        "export const api = app.use(auth).openapi(R1)"
    )]
    fn preserves_configuration_prefix(#[case] existing: &str, #[case] generated: &str, #[case] expected: &str) {
        assert_eq!(preserve_chain_prefix(existing, generated, &Conventions::default()), expected);
    }

    #[test]
    fn replaces_aggregate_and_keeps_everything_else() {
        let existing = "import { app } from './app'\n\napp.use(logger())\n\n// keep\nfunction helper() {}\n\nexport const api = app.use(auth).openapi(aRoute, a)\n\nexport default app\n";
        let generated = "import { app } from './app'\n\nexport const api = app.openapi(aRoute, a).openapi(bRoute, b)\n\nexport default app\n";
        assert_eq!(
            merge(existing, generated),
            "import { app } from './app'\n\napp.use(logger())\n\n// keep\nfunction helper() {}\n\nexport const api = app.use(auth).openapi(aRoute, a).openapi(bRoute, b)\n\nexport default app\n"
        );
    }

    #[test]
    fn missing_aggregate_is_inserted_after_imports() {
        let existing = "import { app } from './app'\n\nexport default app\n";
        let generated = "import { app } from './app'\n\nexport const api = app.openapi(aRoute, a)\n";
        assert_eq!(
            merge(existing, generated),
            "import { app } from './app'\n\nexport const api = app.openapi(aRoute, a)\n\nexport default app\n"
        );
    }

    #[test]
    fn empty_existing_falls_back_to_generated_body() {
        let generated = "import { app } from './app'\n\nexport const api = app.openapi(aRoute, a)\n";
        assert_eq!(merge("", generated), generated);
    }
}
