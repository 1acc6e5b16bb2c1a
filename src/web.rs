//! Companion web server that extensions attach routes to.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use anyhow::Result;
use axum::Router;
use axum::routing::MethodRouter;
use log::info;
use poise::serenity_prelude as serenity;

/// REST-only Discord handle for web hooks; it never connects to the gateway.
pub type WebBot = Arc<serenity::Http>;

pub fn rest_bot(token: &str) -> WebBot {
    Arc::new(serenity::Http::new(token))
}

/// Routes collected from `setup_webserver` hooks.
#[derive(Clone, Default)]
pub struct WebApp {
    router: Arc<Mutex<Router>>,
}

impl WebApp {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, f: impl FnOnce(Router) -> Router) {
        let mut guard = self.router.lock().unwrap_or_else(PoisonError::into_inner);
        let router = std::mem::take(&mut *guard);
        *guard = f(router);
    }

    pub fn route(&self, path: &str, method_router: MethodRouter) {
        self.update(|router| router.route(path, method_router));
    }

    pub fn merge(&self, other: Router) {
        self.update(|router| router.merge(other));
    }

    /// The routes registered so far.
    pub fn router(&self) -> Router {
        self.router
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Serves the app on `bind` until the server fails.
pub async fn serve(app: &WebApp, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Web server listening on {}", bind);
    axum::serve(listener, app.router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use axum::http::StatusCode;
    use axum::routing::get;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_routes_from_clones_are_shared() {
        let app = WebApp::new();
        let handle = app.clone();
        handle.route("/hello", get(|| async { "hi" }));
        app.merge(Router::new().route("/other", get(|| async { "other" })));

        let response = app
            .router()
            .oneshot(Request::builder().uri("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hi");

        let response = app
            .router()
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
