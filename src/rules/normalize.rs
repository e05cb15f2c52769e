//! Rule normalization.
//!
//! # Responsibilities
//! - Turn one module export into zero or more canonical [`RouteRule`]s
//! - Apply precedence: rule field > merged config chain > default
//! - Report every malformed rule without dropping its siblings
//!
//! # Design Decisions
//! - An explicit `url` / `method` replaces the file-derived template / method
//! - A disabled directory cannot be re-enabled by a rule inside it
//! - Disabled rules are kept (marked `enabled: false`) so the manifest still
//!   lists them

use std::collections::BTreeMap;

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Method, StatusCode};

use crate::dispatch::registry::Registry;
use crate::manifest::format::{HandlerRef, RouteRule};
use crate::routing::{RouteFile, Template, TemplateError};
use crate::rules::export::{classify, Export, RuleObject, Shape};
use crate::scan::chain::ResolvedConfig;
use crate::scan::diagnostics::BuildError;

pub const DEFAULT_STATUS: u16 = 200;

/// Everything a rule inherits from where its file sits.
pub struct RuleContext<'a> {
    /// Template and method derived from the file path.
    pub derived: &'a Result<RouteFile, TemplateError>,
    pub chain: &'a ResolvedConfig,
    pub registry: &'a Registry,
    pub source: &'a str,
}

/// Normalize an export; one result per rule it declares.
pub fn normalize(export: Export, ctx: &RuleContext<'_>) -> Vec<Result<RouteRule, BuildError>> {
    let mut out = Vec::new();
    normalize_into(export, ctx, &mut out);
    out
}

fn normalize_into(
    export: Export,
    ctx: &RuleContext<'_>,
    out: &mut Vec<Result<RouteRule, BuildError>>,
) {
    match export {
        Export::Value(value) => match classify(value) {
            Shape::Bare(body) => out.push(resolve(
                RuleObject {
                    response: Some(body),
                    ..RuleObject::default()
                },
                ctx,
            )),
            Shape::Rule(value) => out.push(parse_rule(value).and_then(|rule| resolve(rule, ctx))),
            Shape::Rules(items) => {
                for item in items {
                    out.push(parse_rule(item).and_then(|rule| resolve(rule, ctx)));
                }
            }
        },
        Export::Callable(name) => out.push(resolve(
            RuleObject {
                handler: Some(name),
                ..RuleObject::default()
            },
            ctx,
        )),
        Export::Rule(rule) => out.push(resolve(rule, ctx)),
        Export::Rules(items) => {
            for item in items {
                normalize_into(item, ctx, out);
            }
        }
    }
}

fn parse_rule(value: serde_json::Value) -> Result<RuleObject, BuildError> {
    serde_json::from_value(value).map_err(|e| BuildError::RuleShape(e.to_string()))
}

fn resolve(rule: RuleObject, ctx: &RuleContext<'_>) -> Result<RouteRule, BuildError> {
    let handler = match (rule.handler, rule.response) {
        (Some(_), Some(_)) => {
            return Err(BuildError::RuleShape(
                "rule declares both `handler` and `response`".into(),
            ))
        }
        (None, None) => {
            return Err(BuildError::RuleShape(
                "rule declares neither `handler` nor `response`".into(),
            ))
        }
        (Some(name), None) => {
            if !ctx.registry.has_handler(&name) {
                return Err(BuildError::RuleShape(format!("unknown handler `{name}`")));
            }
            HandlerRef::Module { module_ref: name }
        }
        (None, Some(body)) => HandlerRef::Static { body },
    };

    let template = match &rule.url {
        Some(url) => Template::parse(url),
        None => ctx.derived.as_ref().map(|file| file.template.clone()).map_err(Clone::clone),
    }
    .map_err(|e| BuildError::InvalidTemplate(e.to_string()))?;

    let method = match &rule.method {
        Some(raw) => parse_method(raw)?,
        None => ctx
            .derived
            .as_ref()
            .ok()
            .and_then(|file| file.method.clone())
            .ok_or(BuildError::AmbiguousMethod)?,
    };

    let status = rule.status.or(ctx.chain.status).unwrap_or(DEFAULT_STATUS);
    validate_status(status).map_err(BuildError::RuleShape)?;
    validate_headers(&rule.headers).map_err(BuildError::RuleShape)?;

    let mut headers = ctx.chain.headers.clone();
    headers.extend(
        rule.headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v)),
    );

    Ok(RouteRule {
        method,
        template,
        status,
        headers,
        delay: rule.delay.or(ctx.chain.delay).unwrap_or(0),
        enabled: ctx.chain.enabled && rule.enabled.unwrap_or(true),
        handler,
        middleware: ctx.chain.middleware.clone(),
        source: ctx.source.to_string(),
    })
}

fn parse_method(raw: &str) -> Result<Method, BuildError> {
    Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| BuildError::RuleShape(format!("invalid method `{raw}`")))
}

pub(crate) fn validate_status(status: u16) -> Result<(), String> {
    StatusCode::from_u16(status)
        .map(|_| ())
        .map_err(|_| format!("invalid status code {status}"))
}

pub(crate) fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), String> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| format!("invalid header name `{name}`"))?;
        HeaderValue::from_str(value)
            .map_err(|_| format!("invalid value for header `{name}`"))?;
    }
    Ok(())
}
