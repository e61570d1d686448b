//! Webhook HTTP server: Telegram's update endpoint plus a `GET /` health page.

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;

use axum::routing::get;
use teloxide::Bot;
use teloxide::update_listeners::{UpdateListener, webhooks};
use tracing::{error, info};

pub const HEALTH_TEXT: &str = "Bot is running";

/// Errors that can occur while starting the webhook server.
#[derive(Debug)]
pub enum ListenError {
    /// Registering the webhook with Telegram failed.
    SetWebhook(teloxide::RequestError),
    /// The listen address could not be bound.
    Bind { addr: SocketAddr, source: std::io::Error },
}

impl fmt::Display for ListenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetWebhook(e) => write!(f, "failed to register webhook: {e}"),
            Self::Bind { addr, source } => write!(f, "failed to bind {addr}: {source}"),
        }
    }
}

impl std::error::Error for ListenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SetWebhook(e) => Some(e),
            Self::Bind { source, .. } => Some(source),
        }
    }
}

/// Add the health page to an app. A webhook posted to `/` still works.
pub fn with_health_route(app: axum::Router) -> axum::Router {
    app.route("/", get(health))
}

async fn health() -> &'static str {
    HEALTH_TEXT
}

/// Register the webhook and serve it on `options.address` until the
/// dispatcher stops.
pub async fn listen(
    bot: Bot,
    options: webhooks::Options,
) -> Result<impl UpdateListener<Err = Infallible>, ListenError> {
    let addr = options.address;
    let (mut listener, stop_flag, app) = webhooks::axum_to_router(bot, options)
        .await
        .map_err(ListenError::SetWebhook)?;
    let tcp = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ListenError::Bind { addr, source })?;

    let stop_token = listener.stop_token();
    tokio::spawn(async move {
        info!("Webhook server listening on {addr}");
        if let Err(e) = axum::serve(tcp, with_health_route(app))
            .with_graceful_shutdown(stop_flag)
            .await
        {
            error!("Webhook server failed: {e}");
            stop_token.stop();
        }
    });

    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;

    async fn serve(app: axum::Router) -> String {
        let tcp = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = tcp.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(tcp, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_health_page() {
        let url = serve(with_health_route(axum::Router::new())).await;

        let resp = reqwest::get(&url).await.unwrap();
        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), HEALTH_TEXT);
    }

    #[tokio::test]
    async fn test_health_page_beside_root_webhook() {
        let app = axum::Router::new().route("/", post(|| async { "update" }));
        let url = serve(with_health_route(app)).await;
        let client = reqwest::Client::new();

        let get = client.get(&url).send().await.unwrap();
        assert_eq!(get.text().await.unwrap(), HEALTH_TEXT);
        let post = client.post(&url).body("{}").send().await.unwrap();
        assert_eq!(post.text().await.unwrap(), "update");
    }
}
