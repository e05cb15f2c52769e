//! Export classification and rule normalization.
//!
//! A loaded module export becomes zero or more [`RouteRule`](crate::manifest::RouteRule)s
//! here. The export is resolved once into a tagged [`Export`]; nothing
//! downstream inspects raw shapes again.

pub mod export;
pub mod normalize;

pub use export::{classify, Export, RuleObject, Shape};
pub use normalize::{normalize, RuleContext, DEFAULT_STATUS};
