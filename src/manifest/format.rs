//! Serialized manifest format.
//!
//! The manifest is the only contract between build time and serve time. It is
//! plain data: every callable is referenced by registry name, so any host can
//! rebuild the dispatch pipeline from it without rescanning.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::middleware::Phase;
use crate::manifest::ManifestError;
use crate::routing::{Routable, Specificity, Template};
use crate::scan::chain::DirectoryConfig;

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// The compiled route table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: u32,
    /// Sorted by (method, specificity, template).
    pub routes: Vec<RouteRule>,
    /// Every directory config loaded during the scan, for diagnostics.
    pub config_chain: Vec<ChainEntry>,
}

impl Manifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            routes: Vec::new(),
            config_chain: Vec::new(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a manifest, rejecting any format version other than the current one.
    pub fn from_json(raw: &str) -> Result<Self, ManifestError> {
        #[derive(Deserialize)]
        struct Probe {
            version: u32,
        }

        let probe: Probe = serde_json::from_str(raw)?;
        if probe.version != MANIFEST_VERSION {
            return Err(ManifestError::VersionMismatch {
                found: probe.version,
                expected: MANIFEST_VERSION,
            });
        }
        Ok(serde_json::from_str(raw)?)
    }

    /// Read and version-check a manifest file.
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let raw = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn write(&self, path: &Path) -> Result<(), ManifestError> {
        let mut json = self.to_json_pretty()?;
        json.push('\n');
        fs::write(path, json).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Routes that can match requests.
    pub fn active_routes(&self) -> impl Iterator<Item = &RouteRule> {
        self.routes.iter().filter(|r| r.enabled)
    }
}

/// One canonical route record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRule {
    #[serde(with = "method_serde")]
    pub method: Method,
    pub template: Template,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Simulated latency in milliseconds.
    pub delay: u64,
    pub enabled: bool,
    pub handler: HandlerRef,
    /// Inherited from the config chain, in chain order.
    pub middleware: Vec<MiddlewareRef>,
    /// File the rule came from.
    pub source: String,
}

impl RouteRule {
    pub fn specificity(&self) -> Specificity {
        self.template.specificity()
    }
}

impl Routable for RouteRule {
    fn method(&self) -> &Method {
        &self.method
    }

    fn template(&self) -> &Template {
        &self.template
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// What answers a matched request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HandlerRef {
    /// A fixed body.
    Static { body: Value },
    /// A registered handler.
    Module {
        #[serde(rename = "moduleRef")]
        module_ref: String,
    },
}

/// A middleware entry carried by a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareRef {
    pub phase: Phase,
    pub module_ref: String,
}

/// A directory config that took part in the scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEntry {
    pub root: String,
    /// Directory relative to `root`; empty for the root itself.
    pub dir: String,
    pub source: String,
    pub config: DirectoryConfig,
}

mod method_serde {
    use axum::http::Method;
    use serde::de::{self, Deserialize, Deserializer};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(method.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Method, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule() -> RouteRule {
        RouteRule {
            method: Method::GET,
            template: Template::parse("/users/[id]").unwrap(),
            status: 200,
            headers: BTreeMap::from([("x-mock".to_string(), "1".to_string())]),
            delay: 0,
            enabled: true,
            handler: HandlerRef::Module {
                module_ref: "users.get".into(),
            },
            middleware: vec![MiddlewareRef {
                phase: Phase::Pre,
                module_ref: "timing".into(),
            }],
            source: "mock/users/[id].get.json".into(),
        }
    }

    #[test]
    fn test_wire_shape() {
        let mut manifest = Manifest::empty();
        manifest.routes.push(rule());
        let value = serde_json::to_value(&manifest).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["configChain"], json!([]));
        let route = &value["routes"][0];
        assert_eq!(route["method"], "GET");
        assert_eq!(route["template"], "/users/[id]");
        assert_eq!(route["handler"], json!({"kind": "module", "moduleRef": "users.get"}));
        assert_eq!(route["middleware"], json!([{"phase": "pre", "moduleRef": "timing"}]));
    }

    #[test]
    fn test_reads_back_written_manifest() {
        let mut manifest = Manifest::empty();
        manifest.routes.push(rule());
        let raw = manifest.to_json_pretty().unwrap();
        assert_eq!(Manifest::from_json(&raw).unwrap(), manifest);
    }

    #[test]
    fn test_rejects_other_versions() {
        let raw = r#"{"version": 7, "routes": [], "configChain": []}"#;
        assert!(matches!(
            Manifest::from_json(raw),
            Err(ManifestError::VersionMismatch { found: 7, expected: 1 })
        ));
    }
}
