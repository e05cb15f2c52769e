//! Route template parsing and specificity ordering.
//!
//! # Responsibilities
//! - Turn a root-relative route file path into a typed segment sequence
//! - Parse explicitly declared rule URLs with the same bracket grammar
//! - Rank templates so literal paths sort before parameterized and wildcard paths
//!
//! # Design Decisions
//! - Templates are typed segments; matching never relies on string heuristics
//! - The serialized form keeps bracket syntax (`/users/[id]`, `/docs/[[...slug]]`)
//! - Route groups `(name)` organize files on disk but never reach the URL
//! - A final `index` stem maps to its directory

use std::cmp::Ordering;
use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use axum::http::Method;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Characters escaped in the stored form of a static segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Methods recognized as a file-name suffix (`users.get.json`).
const METHOD_SUFFIXES: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

/// Errors produced while parsing a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("malformed segment `{0}`")]
    MalformedSegment(String),

    #[error("empty parameter name in segment `{0}`")]
    EmptyName(String),

    #[error("parameter `{0}` is declared more than once")]
    DuplicateParam(String),

    #[error("catch-all `{0}` must be the last segment")]
    CatchAllNotLast(String),

    #[error("route url must start with '/': `{0}`")]
    NotAbsolute(String),

    #[error("path component is not valid UTF-8")]
    NonUtf8,
}

/// One typed segment of a route template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal text, stored in one canonical URL-encoded spelling.
    Static(String),
    /// `[name]`: exactly one path segment.
    Param(String),
    /// `[...name]` (required) or `[[...name]]` (optional): the rest of the path.
    CatchAll { name: String, optional: bool },
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Static(text) => f.write_str(text),
            Segment::Param(name) => write!(f, "[{name}]"),
            Segment::CatchAll { name, optional: false } => write!(f, "[...{name}]"),
            Segment::CatchAll { name, optional: true } => write!(f, "[[...{name}]]"),
        }
    }
}

/// A parsed route template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// The root template `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a declared URL such as `/users/[id]`.
    ///
    /// Static text may arrive encoded or not; both spellings parse to the
    /// same segment.
    pub fn parse(url: &str) -> Result<Self, TemplateError> {
        if !url.starts_with('/') {
            return Err(TemplateError::NotAbsolute(url.to_string()));
        }
        Self::from_raw_segments(url.split('/'))
    }

    /// Build a template from a root-relative path whose extension and method
    /// suffix have already been removed (`users/[id]`).
    pub fn from_file_path(rel: &Path) -> Result<Self, TemplateError> {
        let mut raw = Vec::new();
        for component in rel.components() {
            if let Component::Normal(part) = component {
                raw.push(part.to_str().ok_or(TemplateError::NonUtf8)?);
            }
        }
        if raw.last() == Some(&"index") {
            raw.pop();
        }
        Self::from_raw_segments(raw.into_iter())
    }

    fn from_raw_segments<'a>(raw: impl Iterator<Item = &'a str>) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        for part in raw {
            if let Some(segment) = parse_segment(part)? {
                segments.push(segment);
            }
        }

        let mut seen = std::collections::HashSet::new();
        for (i, segment) in segments.iter().enumerate() {
            let name = match segment {
                Segment::Static(_) => continue,
                Segment::Param(name) => name,
                Segment::CatchAll { name, .. } => {
                    if i + 1 != segments.len() {
                        return Err(TemplateError::CatchAllNotLast(segment.to_string()));
                    }
                    name
                }
            };
            if !seen.insert(name.as_str()) {
                return Err(TemplateError::DuplicateParam(name.clone()));
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The paths this template accepts, independent of parameter names.
    ///
    /// `/users/[id]` and `/users/[uid]` share a shape; only the first of them
    /// can ever answer a request.
    pub fn shape(&self) -> Shape {
        Shape(
            self.segments
                .iter()
                .map(|segment| match segment {
                    Segment::Static(text) => SegmentShape::Static(
                        percent_decode_str(text).decode_utf8_lossy().into_owned(),
                    ),
                    Segment::Param(_) => SegmentShape::Param,
                    Segment::CatchAll { optional, .. } => SegmentShape::CatchAll {
                        optional: *optional,
                    },
                })
                .collect(),
        )
    }

    pub fn specificity(&self) -> Specificity {
        Specificity(self.segments.iter().map(Rank::of).collect())
    }
}

fn parse_segment(raw: &str) -> Result<Option<Segment>, TemplateError> {
    if raw.is_empty() {
        return Ok(None);
    }
    if raw.len() > 2 && raw.starts_with('(') && raw.ends_with(')') {
        return Ok(None);
    }

    if let Some(name) = raw.strip_prefix("[[...").and_then(|s| s.strip_suffix("]]")) {
        validate_name(name, raw)?;
        return Ok(Some(Segment::CatchAll {
            name: name.to_string(),
            optional: true,
        }));
    }
    if let Some(name) = raw.strip_prefix("[...").and_then(|s| s.strip_suffix(']')) {
        validate_name(name, raw)?;
        return Ok(Some(Segment::CatchAll {
            name: name.to_string(),
            optional: false,
        }));
    }
    if let Some(name) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        validate_name(name, raw)?;
        return Ok(Some(Segment::Param(name.to_string())));
    }
    if raw.contains(['[', ']']) {
        return Err(TemplateError::MalformedSegment(raw.to_string()));
    }

    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    let text = utf8_percent_encode(&decoded, SEGMENT).to_string();
    Ok(Some(Segment::Static(text)))
}

fn validate_name(name: &str, raw: &str) -> Result<(), TemplateError> {
    if name.is_empty() {
        return Err(TemplateError::EmptyName(raw.to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(TemplateError::MalformedSegment(raw.to_string()));
    }
    Ok(())
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Template::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Name-free key for a template; two templates with equal shapes match
/// exactly the same request paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<SegmentShape>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SegmentShape {
    /// Decoded literal text.
    Static(String),
    Param,
    CatchAll { optional: bool },
}

/// Per-segment rank; lower sorts first.
///
/// `End` stands for "this template has no segment here", which places an
/// exact path ahead of a longer template that only adds a catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Static,
    Param,
    End,
    CatchAll,
    OptionalCatchAll,
}

impl Rank {
    fn of(segment: &Segment) -> Self {
        match segment {
            Segment::Static(_) => Rank::Static,
            Segment::Param(_) => Rank::Param,
            Segment::CatchAll { optional: false, .. } => Rank::CatchAll,
            Segment::CatchAll { optional: true, .. } => Rank::OptionalCatchAll,
        }
    }
}

/// Comparable match priority. `Ordering::Less` means "more specific".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specificity(Vec<Rank>);

impl Ord for Specificity {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(Rank::End);
            let b = other.0.get(i).copied().unwrap_or(Rank::End);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                decided => return decided,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Specificity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A route file path split into its template and optional method suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFile {
    pub template: Template,
    pub method: Option<Method>,
}

impl RouteFile {
    /// Parse a root-relative route file path such as `users/[id].get.json`.
    pub fn parse(rel: &Path) -> Result<Self, TemplateError> {
        let stem = rel
            .file_stem()
            .map(|s| s.to_str().ok_or(TemplateError::NonUtf8))
            .transpose()?
            .unwrap_or_default();

        let (name, method) = match stem.rsplit_once('.') {
            Some((name, suffix)) => match method_from_suffix(suffix) {
                Some(method) => (name, Some(method)),
                None => (stem, None),
            },
            None => (stem, None),
        };

        let path = rel.with_file_name(name);
        Ok(Self {
            template: Template::from_file_path(&path)?,
            method,
        })
    }
}

/// Recognize a method suffix, case-insensitively.
pub fn method_from_suffix(suffix: &str) -> Option<Method> {
    METHOD_SUFFIXES
        .iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(suffix))
        .cloned()
}
