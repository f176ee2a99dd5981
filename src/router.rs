//! Longest-prefix routing over a static route table.

use std::sync::Arc;

use crate::error::CastorError;
use crate::handlers::Handler;
use crate::response::Response;

/// What a route prefix maps to: a handler computing a response per request,
/// or a pre-built response returned verbatim.
pub enum RouteTarget {
    Handler(Box<dyn Handler>),
    Fixed(Arc<Response>),
}

impl RouteTarget {
    pub fn handler(handler: impl Handler + 'static) -> Self {
        Self::Handler(Box::new(handler))
    }

    pub fn fixed(response: Response) -> Self {
        Self::Fixed(Arc::new(response))
    }
}

/// Immutable route table, built once at startup. The empty prefix is the
/// catch-all. Performs no I/O and never mutates.
pub struct Router {
    // Sorted by prefix length, longest first, so the first match wins.
    routes: Vec<(String, RouteTarget)>,
    catch_all: Option<RouteTarget>,
}

impl Router {
    pub fn new(entries: Vec<(String, RouteTarget)>) -> Result<Self, CastorError> {
        if entries.is_empty() {
            return Err(CastorError::ImproperlyConfigured(
                "route table is empty".to_string(),
            ));
        }

        let mut routes = Vec::new();
        let mut catch_all = None;
        for (prefix, target) in entries {
            if prefix.is_empty() {
                if catch_all.replace(target).is_some() {
                    return Err(CastorError::ImproperlyConfigured(
                        "duplicate catch-all route".to_string(),
                    ));
                }
            } else {
                if routes.iter().any(|(p, _)| *p == prefix) {
                    return Err(CastorError::ImproperlyConfigured(format!(
                        "duplicate route prefix `{prefix}`"
                    )));
                }
                routes.push((prefix, target));
            }
        }
        routes.sort_by_key(|(p, _)| std::cmp::Reverse(p.len()));
        Ok(Self { routes, catch_all })
    }

    /// The longest prefix the path starts with, the catch-all as fallback,
    /// or `None` (the worker reports that as status 51).
    pub fn route(&self, path: &str) -> Option<(&str, &RouteTarget)> {
        self.routes
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(prefix, target)| (prefix.as_str(), target))
            .or_else(|| self.catch_all.as_ref().map(|t| ("", t)))
    }
}
