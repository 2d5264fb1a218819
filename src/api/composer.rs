//! Mount table for independently authored domain routers.
//!
//! [`RouteComposer`] collects `(prefix, router)` pairs at startup and
//! freezes them into a [`MountTable`]. The table dispatches each request
//! to the router with the longest prefix that ends on a path-segment
//! boundary, strips that prefix, and answers with a JSON 404 when nothing
//! matches. Mounted routers never see each other's requests.

use std::sync::Arc;

use axum::Router;
use axum::extract::{OriginalUri, Request};
use axum::http::Uri;
use axum::http::uri::PathAndQuery;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;

use crate::error::{ApiError, ComposeError};

#[derive(Debug, Clone)]
struct Mount {
    prefix: String,
    router: Router,
}

/// Collects router mounts before the server starts.
#[derive(Debug, Default)]
pub struct RouteComposer {
    mounts: Vec<Mount>,
}

impl RouteComposer {
    /// Creates an empty composer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts `router` under `prefix`.
    ///
    /// # Errors
    ///
    /// - [`ComposeError::InvalidPrefix`] if the prefix does not start with
    ///   `/`, ends with `/`, is the root, or contains route syntax.
    /// - [`ComposeError::DuplicatePrefix`] if the prefix is already taken.
    ///   The existing mount is kept.
    pub fn mount(&mut self, prefix: &str, router: Router) -> Result<(), ComposeError> {
        validate_prefix(prefix)?;
        if self.mounts.iter().any(|m| m.prefix == prefix) {
            return Err(ComposeError::DuplicatePrefix(prefix.to_string()));
        }
        tracing::debug!(prefix, "router mounted");
        self.mounts.push(Mount {
            prefix: prefix.to_string(),
            router,
        });
        Ok(())
    }

    /// Returns the mounted prefixes in registration order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.mounts.iter().map(|m| m.prefix.as_str())
    }

    /// Freezes the mounts into an immutable [`MountTable`].
    #[must_use]
    pub fn build(self) -> MountTable {
        MountTable {
            mounts: self.mounts.into(),
        }
    }
}

/// Immutable prefix → router table. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MountTable {
    mounts: Arc<[Mount]>,
}

impl MountTable {
    /// Finds the mount owning `path`.
    ///
    /// Returns the matched prefix and the remainder of the path after it.
    /// The remainder is empty or starts with `/`.
    #[must_use]
    pub fn resolve<'p>(&self, path: &'p str) -> Option<(&str, &'p str)> {
        self.find(path).map(|(mount, rest)| (mount.prefix.as_str(), rest))
    }

    fn find<'p>(&self, path: &'p str) -> Option<(&Mount, &'p str)> {
        let mut best: Option<(&Mount, &'p str)> = None;
        for mount in self.mounts.iter() {
            let Some(rest) = strip_mount_prefix(path, &mount.prefix) else {
                continue;
            };
            if best.is_none_or(|(current, _)| mount.prefix.len() > current.prefix.len()) {
                best = Some((mount, rest));
            }
        }
        best
    }

    /// Routes `request` to the owning router with the prefix stripped, or
    /// answers 404.
    pub async fn dispatch(&self, mut request: Request) -> Response {
        let path = request.uri().path().to_string();
        let Some((mount, rest)) = self.find(&path) else {
            tracing::debug!(%path, "no router mounted for path");
            return ApiError::RouteNotFound(path).into_response();
        };

        let Some(uri) = rewrite_path(request.uri(), rest) else {
            return ApiError::Internal(format!("cannot rewrite request path {path}"))
                .into_response();
        };
        if request.extensions().get::<OriginalUri>().is_none() {
            let original = OriginalUri(request.uri().clone());
            request.extensions_mut().insert(original);
        }
        *request.uri_mut() = uri;

        let router = mount.router.clone();
        match router.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    /// Converts the table into a router whose fallback dispatches through
    /// the table. Explicit routes merged into the result take precedence.
    #[must_use]
    pub fn into_router(self) -> Router {
        Router::new().fallback(move |request: Request| async move { self.dispatch(request).await })
    }
}

fn validate_prefix(prefix: &str) -> Result<(), ComposeError> {
    let reason = if !prefix.starts_with('/') {
        Some("must start with '/'")
    } else if prefix == "/" {
        Some("cannot mount at the root")
    } else if prefix.ends_with('/') {
        Some("must not end with '/'")
    } else if prefix.contains(['{', '}', '*']) {
        Some("must not contain route parameters")
    } else if prefix.contains("//") {
        Some("must not contain empty segments")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ComposeError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// `/api/v1/sales` owns `/api/v1/sales` and `/api/v1/sales/..`, not
/// `/api/v1/salesforce`.
fn strip_mount_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    let rest = path.strip_prefix(prefix)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

fn rewrite_path(uri: &Uri, rest: &str) -> Option<Uri> {
    let path = if rest.is_empty() { "/" } else { rest };
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;

    use super::*;

    fn labelled(label: &'static str) -> Router {
        Router::new()
            .route("/", get(move || async move { label }))
            .route(
                "/{*rest}",
                get(move |uri: Uri| async move { format!("{label} {uri}") }),
            )
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String) {
        let Ok(request) = Request::builder().uri(uri).body(Body::empty()) else {
            panic!("valid request");
        };
        let Ok(response) = router.oneshot(request).await;
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body is in memory");
        };
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    fn table(prefixes: &[(&str, &'static str)]) -> MountTable {
        let mut composer = RouteComposer::new();
        for &(prefix, label) in prefixes {
            if let Err(err) = composer.mount(prefix, labelled(label)) {
                panic!("mount {prefix}: {err}");
            }
        }
        composer.build()
    }

    #[test]
    fn resolve_picks_longest_segment_prefix() {
        let table = table(&[("/api", "api"), ("/api/v1/sales", "sales")]);

        assert_eq!(
            table.resolve("/api/v1/sales/orders"),
            Some(("/api/v1/sales", "/orders"))
        );
        assert_eq!(table.resolve("/api/v1/sales"), Some(("/api/v1/sales", "")));
        assert_eq!(
            table.resolve("/api/v1/salesforce"),
            Some(("/api", "/v1/salesforce"))
        );
        assert_eq!(table.resolve("/apix"), None);
        assert_eq!(table.resolve("/"), None);
    }

    #[test]
    fn resolve_ignores_registration_order() {
        let table = table(&[("/api/v1/sales", "sales"), ("/api", "api")]);
        assert_eq!(
            table.resolve("/api/v1/sales/1"),
            Some(("/api/v1/sales", "/1"))
        );
    }

    #[test]
    fn duplicate_prefix_is_rejected_and_first_mount_kept() {
        let mut composer = RouteComposer::new();
        assert!(composer.mount("/api/v1/sales", labelled("first")).is_ok());

        let result = composer.mount("/api/v1/sales", labelled("second"));
        assert_eq!(
            result,
            Err(ComposeError::DuplicatePrefix("/api/v1/sales".to_string()))
        );
        assert_eq!(composer.prefixes().collect::<Vec<_>>(), ["/api/v1/sales"]);
    }

    #[tokio::test]
    async fn duplicate_mount_does_not_overwrite_dispatch() {
        let mut composer = RouteComposer::new();
        assert!(composer.mount("/a", labelled("first")).is_ok());
        assert!(composer.mount("/a", labelled("second")).is_err());

        let (status, body) = get_body(composer.build().into_router(), "/a").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "first");
    }

    #[test]
    fn malformed_prefixes_are_rejected() {
        for prefix in ["", "api", "/", "/api/", "/api/{id}", "/api/*rest", "/api//v1"] {
            let mut composer = RouteComposer::new();
            let result = composer.mount(prefix, Router::new());
            assert!(
                matches!(result, Err(ComposeError::InvalidPrefix { .. })),
                "{prefix:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn dispatch_strips_prefix_and_keeps_query() {
        let router = table(&[("/api/v1/sales", "sales")]).into_router();

        let (status, body) = get_body(router, "/api/v1/sales/orders/7?page=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "sales /orders/7?page=2");
    }

    #[tokio::test]
    async fn bare_prefix_reaches_router_root() {
        let router = table(&[("/api/v1/sales", "sales")]).into_router();

        let (status, body) = get_body(router, "/api/v1/sales").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "sales");
    }

    #[tokio::test]
    async fn each_request_reaches_only_its_owner() {
        let router = table(&[
            ("/api/v1/sales", "sales"),
            ("/api/v1/operations", "operations"),
            ("/api/v1/analytics", "analytics"),
        ])
        .into_router();

        for (uri, expected) in [
            ("/api/v1/sales/x", "sales /x"),
            ("/api/v1/operations/x", "operations /x"),
            ("/api/v1/analytics/x", "analytics /x"),
        ] {
            let (status, body) = get_body(router.clone(), uri).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, expected);
        }
    }

    #[tokio::test]
    async fn unmatched_path_is_json_not_found() {
        let router = table(&[("/api/v1/sales", "sales")]).into_router();

        let (status, body) = get_body(router, "/api/v1/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) else {
            panic!("not-found body is json");
        };
        assert_eq!(json["error"]["code"], 2001);
    }
}
