//! Import reconciliation between an existing file and its regenerated form.
//!
//! Generated imports are authoritative for identifiers the generator owns:
//! an owned name that the existing file imports from anywhere other than its
//! generated module is dropped. Everything else is unioned per module.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::{ImportStatement, NamedBinding, SourceFile};
use crate::conventions::Conventions;

#[derive(Debug)]
struct MergedBinding {
    binding: NamedBinding,
    is_type_only: bool,
}

#[derive(Debug)]
struct ModuleImports {
    specifier: String,
    quote: char,
    has_semicolon: bool,
    /// AND over every statement that contributed a binding; `None` until one does.
    is_type_only: Option<bool>,
    default_binding: Option<String>,
    namespace_binding: Option<String>,
    named: HashMap<String, MergedBinding>,
    side_effect: bool,
}

impl ModuleImports {
    fn new(imp: &ImportStatement) -> Self {
        Self {
            specifier: imp.module_specifier.clone(),
            quote: imp.quote,
            has_semicolon: imp.has_semicolon,
            is_type_only: None,
            default_binding: None,
            namespace_binding: None,
            named: HashMap::new(),
            side_effect: false,
        }
    }

    fn absorb(&mut self, imp: &ImportStatement, default: Option<&String>, named: &[&NamedBinding]) {
        if imp.is_side_effect {
            self.side_effect = true;
            return;
        }
        let namespace = imp.namespace_binding.as_ref();
        if default.is_none() && namespace.is_none() && named.is_empty() {
            return;
        }

        self.is_type_only = Some(self.is_type_only.unwrap_or(true) && imp.is_type_only);
        if self.default_binding.is_none() {
            self.default_binding = default.cloned();
        }
        if self.namespace_binding.is_none() {
            self.namespace_binding = namespace.cloned();
        }
        for b in named {
            let type_only = imp.is_type_only || b.is_type_only;
            self.named
                .entry(b.local().to_string())
                .and_modify(|m| m.is_type_only &= type_only)
                .or_insert_with(|| MergedBinding {
                    binding: (*b).clone(),
                    is_type_only: type_only,
                });
        }
    }

    fn has_bindings(&self) -> bool {
        self.default_binding.is_some() || self.namespace_binding.is_some() || !self.named.is_empty()
    }

    fn render(&self) -> Vec<String> {
        if !self.has_bindings() {
            return if self.side_effect {
                vec![self.line(None, "")]
            } else {
                Vec::new()
            };
        }

        let stmt_type = self.is_type_only.unwrap_or(false);
        let mut named: Vec<&MergedBinding> = self.named.values().collect();
        named.sort_by(|a, b| {
            let (a, b) = (a.binding.local(), b.binding.local());
            a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
        });
        let named_clause = (!named.is_empty()).then(|| {
            let items: Vec<String> = named
                .iter()
                .map(|m| {
                    let mut s = String::new();
                    if m.is_type_only && !stmt_type {
                        s.push_str("type ");
                    }
                    s.push_str(&m.binding.name);
                    if let Some(alias) = &m.binding.alias {
                        s.push_str(" as ");
                        s.push_str(alias);
                    }
                    s
                })
                .collect();
            format!("{{ {} }}", items.join(", "))
        });
        let default = self.default_binding.as_deref();

        let mut lines = Vec::new();
        if let Some(ns) = &self.namespace_binding {
            let head = match default {
                Some(d) => format!("{d}, * as {ns}"),
                None => format!("* as {ns}"),
            };
            lines.push(self.line(Some(stmt_type), &head));
            if let Some(clause) = &named_clause {
                lines.push(self.line(Some(stmt_type), clause));
            }
            return lines;
        }

        match (default, &named_clause) {
            // `import type D, { a }` is not valid TypeScript
            (Some(d), Some(clause)) if stmt_type => {
                lines.push(self.line(Some(true), d));
                lines.push(self.line(Some(true), clause));
            }
            (Some(d), Some(clause)) => lines.push(self.line(Some(false), &format!("{d}, {clause}"))),
            (Some(d), None) => lines.push(self.line(Some(stmt_type), d)),
            (None, Some(clause)) => lines.push(self.line(Some(stmt_type), clause)),
            (None, None) => {}
        }
        lines
    }

    /// `clause_type` is `None` for a bare side-effect import.
    fn line(&self, clause_type: Option<bool>, clause: &str) -> String {
        let q = self.quote;
        let semi = if self.has_semicolon { ";" } else { "" };
        match clause_type {
            None => format!("import {q}{}{q}{semi}", self.specifier),
            Some(t) => {
                let kw = if t { "import type" } else { "import" };
                format!("{kw} {clause} from {q}{}{q}{semi}", self.specifier)
            }
        }
    }
}

#[derive(Default)]
struct MergedImports {
    modules: Vec<ModuleImports>,
    index: HashMap<String, usize>,
}

impl MergedImports {
    fn module(&mut self, imp: &ImportStatement) -> &mut ModuleImports {
        let idx = match self.index.get(&imp.module_specifier) {
            Some(&i) => i,
            None => {
                self.modules.push(ModuleImports::new(imp));
                let i = self.modules.len() - 1;
                self.index.insert(imp.module_specifier.clone(), i);
                i
            }
        };
        &mut self.modules[idx]
    }
}

/// Merge the import statements of both files into rendered lines, one per
/// statement, modules in first-seen order (existing before generated).
pub fn merge_imports(existing: &SourceFile, generated: &SourceFile, conventions: &Conventions) -> Vec<String> {
    let mut canonical: HashMap<&str, &str> = HashMap::new();
    let mut default_modules: HashMap<&str, &str> = HashMap::new();
    for imp in &generated.imports {
        for b in &imp.named_bindings {
            if conventions.is_auto_generated(b.local()) {
                canonical.insert(b.local(), &imp.module_specifier);
            }
        }
        if let Some(d) = &imp.default_binding {
            default_modules.insert(d, &imp.module_specifier);
        }
    }

    let mut merged = MergedImports::default();

    for imp in &existing.imports {
        let module = imp.module_specifier.as_str();
        let named: Vec<&NamedBinding> = imp
            .named_bindings
            .iter()
            .filter(|b| {
                let local = b.local();
                let keep = !conventions.is_auto_generated(local) || canonical.get(local) == Some(&module);
                if !keep {
                    debug!(binding = local, module, "dropping stale generated import");
                }
                keep
            })
            .collect();
        let default = imp
            .default_binding
            .as_ref()
            .filter(|d| default_modules.get(d.as_str()).is_none_or(|m| *m == module));
        merged.module(imp).absorb(imp, default, &named);
    }

    for imp in &generated.imports {
        let named: Vec<&NamedBinding> = imp.named_bindings.iter().collect();
        merged
            .module(imp)
            .absorb(imp, imp.default_binding.as_ref(), &named);
    }

    merged.modules.iter().flat_map(ModuleImports::render).collect()
}
