//! Route matching logic.
//!
//! # Responsibilities
//! - Match a request path against one template
//! - Capture parameter and catch-all values
//!
//! # Design Decisions
//! - Static segments compare after percent-decoding both sides
//! - Empty path segments are ignored (`/users//42/` equals `/users/42`)
//! - Catch-all captures join their segments with `/`
//! - No regex; one linear pass per template

use std::borrow::Cow;
use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;

use crate::routing::template::{Segment, Template};

/// Values captured from the request path, keyed by parameter name.
pub type PathParams = BTreeMap<String, String>;

fn decode(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8_lossy()
}

/// Match `path` against `template`, returning captured parameters on success.
pub fn match_path(template: &Template, path: &str) -> Option<PathParams> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let segments = template.segments();
    let mut params = PathParams::new();

    for (i, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Static(text) => {
                let part = parts.get(i)?;
                if decode(part) != decode(text) {
                    return None;
                }
            }
            Segment::Param(name) => {
                let part = parts.get(i)?;
                params.insert(name.clone(), decode(part).into_owned());
            }
            Segment::CatchAll { name, optional } => {
                let rest = parts.get(i..).unwrap_or_default();
                if rest.is_empty() {
                    return optional.then_some(params);
                }
                let joined = rest
                    .iter()
                    .map(|p| decode(p))
                    .collect::<Vec<_>>()
                    .join("/");
                params.insert(name.clone(), joined);
                return Some(params);
            }
        }
    }

    (parts.len() == segments.len()).then_some(params)
}
