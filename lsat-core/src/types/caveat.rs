//! Caveats and the request metadata they are checked against.

use std::{fmt::Display, str::FromStr};

use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// A first-party caveat in canonical `condition=value` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caveat {
    pub condition: String,
    pub value: String,
}

impl Caveat {
    pub fn new(condition: impl Into<String>, value: impl Into<String>) -> Self {
        Caveat {
            condition: condition.into(),
            value: value.into(),
        }
    }

    /// Restrict a token to a request path.
    pub fn path(path: impl Into<String>) -> Self {
        Caveat::new("path", path)
    }

    /// Restrict a token to a set of HTTP methods.
    pub fn methods<'a>(methods: impl IntoIterator<Item = &'a Method>) -> Self {
        let joined = methods
            .into_iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(",");
        Caveat::new("method", joined)
    }

    /// Restrict a token to requests made before `unix_secs`.
    pub fn expires_at(unix_secs: u64) -> Self {
        Caveat::new("expires", unix_secs.to_string())
    }
}

impl Display for Caveat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.condition, self.value)
    }
}

impl FromStr for Caveat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (condition, value) = s
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("caveat {s:?} is not in condition=value form")))?;
        let condition = condition.trim();
        if condition.is_empty() {
            return Err(Error::Config(format!("caveat {s:?} has an empty condition")));
        }
        Ok(Caveat::new(condition, value.trim()))
    }
}

impl Serialize for Caveat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Caveat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Request metadata visible to pricing, caveat functions and caveat satisfiers.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        RequestContext {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn from_parts(parts: &http::request::Parts) -> Self {
        RequestContext {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            headers: parts.headers.clone(),
        }
    }
}

impl<B> From<&http::Request<B>> for RequestContext {
    fn from(request: &http::Request<B>) -> Self {
        RequestContext {
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            headers: request.headers().clone(),
        }
    }
}
