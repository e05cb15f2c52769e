//! Route lookup.
//!
//! # Responsibilities
//! - Scan an ordered route table for the first enabled match
//! - Return the matched entry with its captured parameters, or explicit no-match
//!
//! # Design Decisions
//! - The table is already sorted most-specific-first; first match wins
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan (acceptable for mock-sized route tables)

use axum::http::Method;

use crate::routing::matcher::{match_path, PathParams};
use crate::routing::template::Template;

/// Anything that can sit in an ordered route table.
pub trait Routable {
    fn method(&self) -> &Method;
    fn template(&self) -> &Template;
    fn is_enabled(&self) -> bool;
}

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, R> {
    pub route: &'a R,
    pub params: PathParams,
}

/// Find the first enabled route whose method and template match.
pub fn find_route<'a, R: Routable>(
    routes: &'a [R],
    method: &Method,
    path: &str,
) -> Option<RouteMatch<'a, R>> {
    routes
        .iter()
        .filter(|r| r.is_enabled() && r.method() == method)
        .find_map(|route| {
            let params = match_path(route.template(), path)?;
            Some(RouteMatch { route, params })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Entry(Method, Template, bool);

    impl Routable for Entry {
        fn method(&self) -> &Method {
            &self.0
        }
        fn template(&self) -> &Template {
            &self.1
        }
        fn is_enabled(&self) -> bool {
            self.2
        }
    }

    fn entry(method: Method, url: &str, enabled: bool) -> Entry {
        Entry(method, Template::parse(url).unwrap(), enabled)
    }

    #[test]
    fn test_first_match_wins() {
        let table = vec![
            entry(Method::GET, "/users/profile", true),
            entry(Method::GET, "/users/[id]", true),
        ];

        let hit = find_route(&table, &Method::GET, "/users/42").unwrap();
        assert_eq!(hit.route.1.to_string(), "/users/[id]");
        assert_eq!(hit.params["id"], "42");

        let hit = find_route(&table, &Method::GET, "/users/profile").unwrap();
        assert_eq!(hit.route.1.to_string(), "/users/profile");
        assert!(hit.params.is_empty());
    }

    #[test]
    fn test_skips_disabled_and_other_methods() {
        let table = vec![
            entry(Method::GET, "/users", false),
            entry(Method::POST, "/users", true),
        ];
        assert!(find_route(&table, &Method::GET, "/users").is_none());
        assert!(find_route(&table, &Method::POST, "/users").is_some());
    }
}
