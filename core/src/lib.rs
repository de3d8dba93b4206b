//! remerge_core: reconciles freshly generated TypeScript files with earlier,
//! possibly hand-edited copies, so regeneration keeps manual edits while
//! still picking up routes that were added or removed.

mod app;
mod ast;
mod barrel;
mod chain;
mod conventions;
mod error;
mod handler;
mod imports;
mod scan;
mod splice;
mod test_file;

pub use ast::{
    AstLanguage, ImportStatement, NamedBinding, SourceFile, TopLevelDeclaration, parse_source,
};
pub use conventions::{Conventions, HandlerKind};
pub use error::{MergeError, Result, Side};
pub use scan::{KeyedSpan, extract_keyed_spans, find_balanced_end};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of generated artifact a file is, which selects its merge strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Handler,
    App,
    Test,
    Barrel,
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "handler" => Ok(Self::Handler),
            "app" => Ok(Self::App),
            "test" => Ok(Self::Test),
            "barrel" => Ok(Self::Barrel),
            other => Err(format!("unknown artifact kind '{other}' (expected handler, app, test or barrel)")),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Handler => "handler",
            Self::App => "app",
            Self::Test => "test",
            Self::Barrel => "barrel",
        })
    }
}

/// Merge entry points bound to one set of naming conventions and grammar.
///
/// Each call parses both inputs independently and returns the merged text;
/// a merger holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    pub conventions: Conventions,
    pub language: AstLanguage,
}

impl Merger {
    pub fn new(conventions: Conventions, language: AstLanguage) -> Self {
        Self { conventions, language }
    }

    fn parse_pair(&self, existing: &str, generated: &str) -> Result<(SourceFile, SourceFile)> {
        let e = parse_source(existing, self.language, Side::Existing)?;
        let g = parse_source(generated, self.language, Side::Generated)?;
        Ok((e, g))
    }

    pub fn merge(&self, kind: ArtifactKind, existing: &str, generated: &str) -> Result<String> {
        match kind {
            ArtifactKind::Handler => self.merge_handler_file(existing, generated),
            ArtifactKind::App => self.merge_app_file(existing, generated),
            ArtifactKind::Test => self.merge_test_file(existing, generated),
            ArtifactKind::Barrel => Ok(barrel::merge_barrel_file(existing, generated)),
        }
    }

    pub fn merge_handler_file(&self, existing: &str, generated: &str) -> Result<String> {
        let (e, g) = self.parse_pair(existing, generated)?;
        Ok(handler::merge_handler_file(&e, &g, &self.conventions))
    }

    pub fn merge_app_file(&self, existing: &str, generated: &str) -> Result<String> {
        let (e, g) = self.parse_pair(existing, generated)?;
        Ok(app::merge_app_file(&e, &g, &self.conventions))
    }

    pub fn merge_test_file(&self, existing: &str, generated: &str) -> Result<String> {
        let (e, g) = self.parse_pair(existing, generated)?;
        Ok(test_file::merge_test_file(&e, &g, &self.conventions))
    }

    pub fn merge_imports(&self, existing: &str, generated: &str) -> Result<Vec<String>> {
        let (e, g) = self.parse_pair(existing, generated)?;
        Ok(imports::merge_imports(&e, &g, &self.conventions))
    }

    pub fn merge_inline_handler(&self, existing_decl: &str, generated_decl: &str) -> String {
        chain::merge_inline_handler(existing_decl, generated_decl, &self.conventions)
    }
}

pub fn merge_handler_file(existing: &str, generated: &str) -> Result<String> {
    Merger::default().merge_handler_file(existing, generated)
}

pub fn merge_app_file(existing: &str, generated: &str) -> Result<String> {
    Merger::default().merge_app_file(existing, generated)
}

pub fn merge_test_file(existing: &str, generated: &str) -> Result<String> {
    Merger::default().merge_test_file(existing, generated)
}

pub fn merge_barrel_file(existing: &str, generated: &str) -> String {
    barrel::merge_barrel_file(existing, generated)
}

pub fn merge_imports(existing: &str, generated: &str) -> Result<Vec<String>> {
    Merger::default().merge_imports(existing, generated)
}

pub fn merge_inline_handler(existing_decl: &str, generated_decl: &str) -> String {
    Merger::default().merge_inline_handler(existing_decl, generated_decl)
}
