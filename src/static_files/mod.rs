// Static file module
//
// Resolves request paths against the source directory:
// - content: content type, Last-Modified, conditional and range handling
// - range: Range header parsing

pub mod content;
pub mod range;

use crate::utils::path::{clean_request_path, join_under_root, with_trailing_slash};
use crate::utils::response::redirect_response;
use anyhow::Result;
use hyper::{Body, Method, Request, Response, StatusCode};
use log::{debug, error, info};
use std::fs::Metadata;
use std::path::PathBuf;
use tokio::fs::File;

pub const INDEX_DOCUMENT: &str = "index.html";

/// An opened file under the root. Dropping it closes the handle.
#[derive(Debug)]
pub struct StaticResource {
    pub(crate) file: File,
    pub(crate) metadata: Metadata,
    pub(crate) path: PathBuf,
}

#[derive(Debug)]
pub enum Resolution {
    File(StaticResource),
    /// Directory requested without a trailing slash
    Redirect(String),
    NotFound,
}

/// Serves GET and HEAD requests from a directory on disk
#[derive(Debug, Clone)]
pub struct StaticHandler {
    root: PathBuf,
}

impl StaticHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Handle a request routed to the static side.
    ///
    /// Unsupported methods and unresolvable paths get the empty default response
    /// rather than a 404 page.
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let method = req.method().clone();
        if method != Method::GET && method != Method::HEAD {
            debug!("Ignoring {} {} on static route", method, req.uri());
            return Response::default();
        }

        match self.resolve(req.uri().path()).await {
            Resolution::File(resource) => match content::serve_content(&req, resource).await {
                Ok(response) => {
                    info!("Static {}, Method {}", req.uri(), method);
                    response
                }
                Err(e) => {
                    error!("Failed to serve {}: {}", req.uri(), e);
                    Response::default()
                }
            },
            Resolution::Redirect(location) => redirect_response(StatusCode::FOUND, &location, method == Method::HEAD),
            Resolution::NotFound => {
                debug!("Nothing to serve for {}", req.uri());
                Response::default()
            }
        }
    }

    /// Map a raw request path onto a servable file, an index document or a redirect
    pub async fn resolve(&self, raw_path: &str) -> Resolution {
        let Some(cleaned) = clean_request_path(raw_path) else {
            return Resolution::NotFound;
        };
        let fs_path = join_under_root(&self.root, &cleaned);

        let Ok(metadata) = tokio::fs::metadata(&fs_path).await else {
            return Resolution::NotFound;
        };
        if !metadata.is_dir() {
            return open_resource(fs_path).await.map_or(Resolution::NotFound, Resolution::File);
        }

        if !raw_path.ends_with('/') {
            return Resolution::Redirect(with_trailing_slash(raw_path));
        }
        match open_resource(fs_path.join(INDEX_DOCUMENT)).await {
            Ok(resource) if !resource.metadata.is_dir() => Resolution::File(resource),
            _ => Resolution::NotFound,
        }
    }
}

async fn open_resource(path: PathBuf) -> Result<StaticResource> {
    let file = File::open(&path).await?;
    let metadata = file.metadata().await?;
    Ok(StaticResource { file, metadata, path })
}
