//! Naming conventions shared by the template layer and the merge layer.
//!
//! Every merge decision is keyed off declaration names: a name ending in the
//! route-handler suffix is a route handler, otherwise a name ending in the
//! inline-handler suffix is an inline handler. Either of those suffixes, or
//! the route suffix, marks an identifier the generator owns, which makes its
//! imports safe to prune. Nothing outside this module should test suffixes.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conventions {
    pub route_handler_suffix: String,
    pub inline_handler_suffix: String,
    pub route_suffix: String,
    /// Method name of the chained registration call, e.g. `.openapi(route, ...)`.
    pub registration_method: String,
    /// Name of the declaration holding the app-wide registration chain.
    pub aggregate_name: String,
    pub helper_prefix: String,
    pub test_callees: Vec<String>,
    pub http_methods: Vec<String>,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            route_handler_suffix: "RouteHandler".into(),
            inline_handler_suffix: "Handler".into(),
            route_suffix: "Route".into(),
            registration_method: "openapi".into(),
            aggregate_name: "api".into(),
            helper_prefix: "mock".into(),
            test_callees: vec!["describe".into(), "it".into(), "test".into()],
            http_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// How a top-level declaration takes part in a handler-file merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HandlerKind {
    Route,
    Inline,
}

impl Conventions {
    /// Parse a (possibly partial) TOML document; absent keys keep their defaults.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        Ok(toml::from_str(src)?)
    }

    pub fn is_route_handler(&self, name: &str) -> bool {
        ends_with_nonempty(name, &self.route_handler_suffix)
    }

    pub fn is_inline_handler(&self, name: &str) -> bool {
        !self.is_route_handler(name) && ends_with_nonempty(name, &self.inline_handler_suffix)
    }

    pub fn classify(&self, name: &str) -> Option<HandlerKind> {
        if self.is_route_handler(name) {
            Some(HandlerKind::Route)
        } else if self.is_inline_handler(name) {
            Some(HandlerKind::Inline)
        } else {
            None
        }
    }

    pub fn is_auto_generated(&self, name: &str) -> bool {
        self.classify(name).is_some() || ends_with_nonempty(name, &self.route_suffix)
    }
}

// An empty suffix would otherwise match every name.
fn ends_with_nonempty(name: &str, suffix: &str) -> bool {
    !suffix.is_empty() && name.len() > suffix.len() && name.ends_with(suffix)
}
