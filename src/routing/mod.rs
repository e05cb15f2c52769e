//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Build time:
//!     root-relative file path (users/[id].get.json)
//!     → template.rs (RouteFile: typed segments + method suffix)
//!     → Specificity (total order, most specific first)
//!
//! Request time:
//!     (method, path)
//!     → router.rs (ordered scan, first enabled match)
//!     → matcher.rs (segment match, parameter capture)
//!     → RouteMatch or no-match
//! ```
//!
//! # Design Decisions
//! - Literal paths beat parameterized paths, which beat catch-alls
//! - Deterministic: same table and request always match the same route

pub mod matcher;
pub mod router;
pub mod template;

pub use matcher::{match_path, PathParams};
pub use router::{find_route, Routable, RouteMatch};
pub use template::{RouteFile, Segment, Shape, Specificity, Template, TemplateError};
