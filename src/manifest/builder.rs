//! Manifest assembly.
//!
//! Rules arrive in scan order. The first enabled rule for a (method, template)
//! pair wins; later ones are reported and dropped. Templates are compared by
//! shape, so `/users/[id]` and `/users/[uid]` collide. The finished table is sorted
//! by method, then specificity, then template literal, so the first match at
//! serve time is always the most specific.

use std::collections::HashMap;

use axum::http::Method;

use crate::manifest::format::{ChainEntry, Manifest, RouteRule, MANIFEST_VERSION};
use crate::routing::Shape;
use crate::scan::diagnostics::{BuildError, Diagnostics};

#[derive(Debug, Default)]
pub struct ManifestBuilder {
    routes: Vec<RouteRule>,
    claimed: HashMap<(Method, Shape), String>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, reporting it instead when an enabled rule already owns its
    /// (method, template shape) pair.
    pub fn push(&mut self, rule: RouteRule, diagnostics: &mut Diagnostics) {
        if rule.enabled {
            let key = (rule.method.clone(), rule.template.shape());
            if let Some(first) = self.claimed.get(&key) {
                diagnostics.fail(
                    rule.source.clone(),
                    BuildError::DuplicateRoute {
                        method: rule.method,
                        template: rule.template.to_string(),
                        first: first.clone(),
                    },
                );
                return;
            }
            self.claimed.insert(key, rule.source.clone());
        }
        self.routes.push(rule);
    }

    pub fn finish(mut self, config_chain: Vec<ChainEntry>) -> Manifest {
        // Stable: equal keys (disabled variants) keep scan order.
        self.routes.sort_by_cached_key(|rule| {
            (
                rule.method.as_str().to_string(),
                rule.specificity(),
                rule.template.to_string(),
            )
        });
        Manifest {
            version: MANIFEST_VERSION,
            routes: self.routes,
            config_chain,
        }
    }
}
