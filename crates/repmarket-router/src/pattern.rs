//! Route patterns: literal segments, `:name` parameters and a trailing
//! `*rest` wildcard.

use crate::error::{Result, RouterError};
use std::collections::BTreeMap;
use std::fmt;

/// Captured path parameters, by name.
pub type Params = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard(String),
}

/// A parsed route pattern such as `/opportunities/:id` or `/docs/*path`.
///
/// Matching is segment-wise; empty segments are ignored, so `/a//b/` and
/// `/a/b` are the same path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a pattern.
    pub fn parse(pattern: &str) -> Result<Self> {
        if !pattern.starts_with('/') {
            return Err(RouterError::invalid_pattern(pattern, "must start with '/'"));
        }
        if pattern.contains(['?', '#']) {
            return Err(RouterError::invalid_pattern(
                pattern,
                "must not contain a query or fragment",
            ));
        }

        let raw: Vec<&str> = split_segments(pattern).collect();
        let mut segments = Vec::with_capacity(raw.len());
        let mut names: Vec<&str> = Vec::new();

        for (i, part) in raw.iter().enumerate() {
            let segment = if let Some(name) = part.strip_prefix(':') {
                Segment::Param(valid_name(pattern, name, &mut names)?)
            } else if let Some(name) = part.strip_prefix('*') {
                if i + 1 != raw.len() {
                    return Err(RouterError::invalid_pattern(
                        pattern,
                        "wildcard must be the last segment",
                    ));
                }
                Segment::Wildcard(valid_name(pattern, name, &mut names)?)
            } else {
                Segment::Literal((*part).to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            source: normalize_path(pattern),
            segments,
        })
    }

    /// Normalized pattern text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the pattern has no parameters or wildcard.
    pub fn is_exact(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Match `path` (without query), returning captured parameters.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = split_segments(path).collect();
        let mut params = Params::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    if parts.get(i) != Some(&literal.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(i)?;
                    params.insert(name.clone(), (*value).to_string());
                }
                Segment::Wildcard(name) => {
                    let rest = parts.get(i..).unwrap_or_default().join("/");
                    params.insert(name.clone(), rest);
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn valid_name<'a>(pattern: &str, name: &'a str, seen: &mut Vec<&'a str>) -> Result<String> {
    if name.is_empty() {
        return Err(RouterError::invalid_pattern(pattern, "parameter name is empty"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RouterError::invalid_pattern(
            pattern,
            format!("parameter name '{name}' has invalid characters"),
        ));
    }
    if seen.contains(&name) {
        return Err(RouterError::invalid_pattern(
            pattern,
            format!("duplicate parameter '{name}'"),
        ));
    }
    seen.push(name);
    Ok(name.to_string())
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Collapse repeated and trailing slashes: `/a//b/` becomes `/a/b`.
pub fn normalize_path(path: &str) -> String {
    let joined = split_segments(path).collect::<Vec<_>>().join("/");
    format!("/{joined}")
}
