//! Caveat engine.
//!
//! Caveats are attached to a macaroon at issuance and checked against the
//! inbound request at verification. Each condition name is dispatched to a
//! registered [`CaveatSatisfier`]; a condition without a satisfier fails.

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use macaroon::{ByteString, Macaroon};

use crate::{
    errors::{Error, Result},
    types::{Caveat, RequestContext},
};

/// A predicate for one caveat condition.
pub trait CaveatSatisfier: Send + Sync {
    /// The condition name this satisfier handles, e.g. `path`.
    fn condition(&self) -> &str;

    /// Whether the request satisfies the stored caveat value.
    fn evaluate(&self, value: &str, context: &RequestContext) -> bool;
}

/// Satisfies `path=<value>`.
///
/// A value ending in `/*` matches every path below the prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathSatisfier;

impl CaveatSatisfier for PathSatisfier {
    fn condition(&self) -> &str {
        "path"
    }

    fn evaluate(&self, value: &str, context: &RequestContext) -> bool {
        match value.strip_suffix("/*") {
            Some(prefix) => {
                context.path == prefix
                    || context
                        .path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            None => context.path == value,
        }
    }
}

/// Satisfies `method=GET,POST`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodSatisfier;

impl CaveatSatisfier for MethodSatisfier {
    fn condition(&self) -> &str {
        "method"
    }

    fn evaluate(&self, value: &str, context: &RequestContext) -> bool {
        value
            .split(',')
            .map(str::trim)
            .any(|m| m.eq_ignore_ascii_case(context.method.as_str()))
    }
}

/// Satisfies `expires=<unix seconds>` while the wall clock is before it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpirySatisfier;

impl CaveatSatisfier for ExpirySatisfier {
    fn condition(&self) -> &str {
        "expires"
    }

    fn evaluate(&self, value: &str, _context: &RequestContext) -> bool {
        let Ok(expires) = value.trim().parse::<u64>() else {
            return false;
        };
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .is_ok_and(|now| now.as_secs() < expires)
    }
}

/// Adapts a closure into a [`CaveatSatisfier`].
pub struct FnSatisfier<F> {
    condition: String,
    predicate: F,
}

impl<F> FnSatisfier<F>
where
    F: Fn(&str, &RequestContext) -> bool + Send + Sync,
{
    pub fn new(condition: impl Into<String>, predicate: F) -> Self {
        FnSatisfier {
            condition: condition.into(),
            predicate,
        }
    }
}

impl<F> CaveatSatisfier for FnSatisfier<F>
where
    F: Fn(&str, &RequestContext) -> bool + Send + Sync,
{
    fn condition(&self) -> &str {
        &self.condition
    }

    fn evaluate(&self, value: &str, context: &RequestContext) -> bool {
        (self.predicate)(value, context)
    }
}

/// Registry of caveat satisfiers keyed by condition name.
#[derive(Clone)]
pub struct Satisfiers {
    by_condition: HashMap<String, Arc<dyn CaveatSatisfier>>,
}

impl Debug for Satisfiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut conditions: Vec<_> = self.by_condition.keys().collect();
        conditions.sort();
        f.debug_struct("Satisfiers")
            .field("conditions", &conditions)
            .finish()
    }
}

impl Default for Satisfiers {
    /// `path`, `method` and `expires`.
    fn default() -> Self {
        Satisfiers::empty()
            .with(PathSatisfier)
            .with(MethodSatisfier)
            .with(ExpirySatisfier)
    }
}

impl Satisfiers {
    /// A registry that rejects every caveat.
    pub fn empty() -> Self {
        Satisfiers {
            by_condition: HashMap::new(),
        }
    }

    /// Register a satisfier, replacing any previous one for the same condition.
    pub fn with(mut self, satisfier: impl CaveatSatisfier + 'static) -> Self {
        self.register(Arc::new(satisfier));
        self
    }

    /// Register a closure for `condition`.
    pub fn with_fn<F>(self, condition: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str, &RequestContext) -> bool + Send + Sync + 'static,
    {
        self.with(FnSatisfier::new(condition, predicate))
    }

    pub fn register(&mut self, satisfier: Arc<dyn CaveatSatisfier>) {
        self.by_condition
            .insert(satisfier.condition().to_string(), satisfier);
    }

    pub fn get(&self, condition: &str) -> Option<&Arc<dyn CaveatSatisfier>> {
        self.by_condition.get(condition)
    }

    /// Check every caveat in order against the request.
    ///
    /// Stops at the first failure, which names the caveat. An empty list passes.
    pub fn satisfy(&self, caveats: &[Caveat], context: &RequestContext) -> Result<()> {
        caveats
            .iter()
            .try_for_each(|caveat| self.satisfy_one(caveat, context))
    }

    pub fn satisfy_one(&self, caveat: &Caveat, context: &RequestContext) -> Result<()> {
        let satisfier = self
            .get(&caveat.condition)
            .ok_or_else(|| Error::caveat_mismatch(caveat, "no satisfier for condition"))?;

        if satisfier.evaluate(&caveat.value, context) {
            Ok(())
        } else {
            Err(Error::caveat_mismatch(caveat, "not satisfied by request"))
        }
    }
}

/// Append caveats to a macaroon's caveat chain, in order.
pub fn attach(macaroon: &mut Macaroon, caveats: &[Caveat]) {
    for caveat in caveats {
        macaroon.add_first_party_caveat(ByteString::from(caveat.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::errors::ErrorKind;

    fn ctx(method: Method, path: &str) -> RequestContext {
        RequestContext::new(method, path)
    }

    #[test]
    fn test_path_satisfier() {
        let s = PathSatisfier;
        assert!(s.evaluate("/protected", &ctx(Method::GET, "/protected")));
        assert!(!s.evaluate("/protected", &ctx(Method::GET, "/other")));
        assert!(!s.evaluate("/protected", &ctx(Method::GET, "/protected/x")));

        assert!(s.evaluate("/api/*", &ctx(Method::GET, "/api")));
        assert!(s.evaluate("/api/*", &ctx(Method::GET, "/api/v1/items")));
        assert!(!s.evaluate("/api/*", &ctx(Method::GET, "/apix")));
    }

    #[test]
    fn test_method_satisfier() {
        let s = MethodSatisfier;
        assert!(s.evaluate("GET, post", &ctx(Method::POST, "/")));
        assert!(!s.evaluate("GET", &ctx(Method::DELETE, "/")));
    }

    #[test]
    fn test_expiry_satisfier() {
        let s = ExpirySatisfier;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert!(s.evaluate(&(now + 3600).to_string(), &ctx(Method::GET, "/")));
        assert!(!s.evaluate(&(now - 1).to_string(), &ctx(Method::GET, "/")));
        assert!(!s.evaluate("tomorrow", &ctx(Method::GET, "/")));
    }

    #[test]
    fn test_empty_caveats_pass() {
        Satisfiers::empty()
            .satisfy(&[], &ctx(Method::GET, "/"))
            .unwrap();
    }

    #[test]
    fn test_unknown_condition_fails_closed() {
        let err = Satisfiers::default()
            .satisfy(&[Caveat::new("tier", "gold")], &ctx(Method::GET, "/"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CaveatMismatch);
    }

    #[test]
    fn test_first_failure_is_named() {
        let caveats = [
            Caveat::path("/protected"),
            Caveat::new("method", "POST"),
            Caveat::new("tier", "gold"),
        ];
        let err = Satisfiers::default()
            .satisfy(&caveats, &ctx(Method::GET, "/protected"))
            .unwrap_err();

        match err {
            Error::CaveatMismatch { caveat, .. } => assert_eq!(caveat, "method=POST"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_custom_satisfier() {
        let satisfiers = Satisfiers::default().with_fn("tier", |value, ctx| {
            ctx.headers
                .get("x-tier")
                .is_some_and(|tier| tier.as_bytes() == value.as_bytes())
        });

        let mut headers = http::HeaderMap::new();
        headers.insert("x-tier", http::HeaderValue::from_static("gold"));
        let request = ctx(Method::GET, "/").with_headers(headers);

        satisfiers
            .satisfy(&[Caveat::new("tier", "gold")], &request)
            .unwrap();
        assert!(
            satisfiers
                .satisfy(&[Caveat::new("tier", "silver")], &request)
                .is_err()
        );
    }
}
