//! Route targets that compute a [`Response`] per request.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{CastorError, HandlerError};
use crate::response::Response;

/// A polymorphic route target. Implementations receive the matched route
/// prefix and the full request path and materialize a response.
pub trait Handler: Send + Sync {
    fn handle(&self, route: &str, path: &str) -> Result<Response, HandlerError>;
}

/// Serves files and directory listings from a directory tree, refusing any
/// path that resolves outside of it.
pub struct StaticHandler {
    static_dir: PathBuf,
    directory_listing: bool,
    index_file: String,
}

impl StaticHandler {
    /// Fails fast when `static_dir` is not an existing directory.
    pub fn new(
        static_dir: impl Into<PathBuf>,
        directory_listing: bool,
        index_file: impl Into<String>,
    ) -> Result<Self, CastorError> {
        let static_dir: PathBuf = static_dir.into();
        let static_dir = static_dir.canonicalize().map_err(|_| {
            CastorError::ImproperlyConfigured(format!(
                "{} is not a directory",
                static_dir.display()
            ))
        })?;
        if !static_dir.is_dir() {
            return Err(CastorError::ImproperlyConfigured(format!(
                "{} is not a directory",
                static_dir.display()
            )));
        }
        Ok(Self {
            static_dir,
            directory_listing,
            index_file: index_file.into(),
        })
    }

    /// Listing enabled, `index.gmi` index.
    pub fn with_defaults(static_dir: impl Into<PathBuf>) -> Result<Self, CastorError> {
        Self::new(static_dir, true, "index.gmi")
    }

    fn resolve(&self, route: &str, path: &str) -> PathBuf {
        let mut remainder = path.strip_prefix(route).unwrap_or(path);
        remainder = remainder.strip_prefix('/').unwrap_or(remainder);
        self.static_dir.join(remainder)
    }
}

impl Handler for StaticHandler {
    fn handle(&self, route: &str, path: &str) -> Result<Response, HandlerError> {
        let full_path = self.resolve(route, path);

        if full_path.is_dir() {
            let index_path = full_path.join(&self.index_file);
            if index_path.is_file() {
                return Response::document(&index_path, &self.static_dir);
            }
            if self.directory_listing {
                return Response::directory_listing(&full_path, &self.static_dir);
            }
        } else if full_path.is_file() {
            return Response::document(&full_path, &self.static_dir);
        }
        // Symlinks and `..` segments are caught when the response constructor
        // canonicalizes; anything else that gets here simply does not exist.
        match full_path.canonicalize() {
            Ok(real) if !real.starts_with(&self.static_dir) => Err(HandlerError::ForbiddenPath),
            _ => Err(HandlerError::NotFound),
        }
    }
}

/// Renders a gemtext template against a per-request context map.
///
/// The context closure receives the matched route and the request path, so
/// dynamic pages can key off either.
pub struct TemplateHandler {
    template_file: PathBuf,
    context: Box<dyn Fn(&str, &str) -> HashMap<String, String> + Send + Sync>,
}

impl TemplateHandler {
    pub fn new(
        template_file: impl Into<PathBuf>,
        context: impl Fn(&str, &str) -> HashMap<String, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            template_file: template_file.into(),
            context: Box::new(context),
        }
    }
}

impl Handler for TemplateHandler {
    fn handle(&self, route: &str, path: &str) -> Result<Response, HandlerError> {
        let context = (self.context)(route, path);
        Ok(Response::template(&self.template_file, &context)?)
    }
}
