use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::routing::method_routing;
use axum_extra::routing::RouterExt as _;
use color_eyre::eyre::Context as _;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{blocklist::Blocklist, queue::QueueClient};

mod pubsub;

#[derive(Clone)]
pub struct WebState {
    pub database: DatabaseConnection,
    pub queue: QueueClient,
    pub blocklist: Blocklist,
    pub webhook_secret: Arc<str>,
    pub enrichment_enabled: bool,
}

pub async fn web_server(
    shutdown: CancellationToken,
    state: WebState,
    listen_addr: SocketAddr,
) -> color_eyre::Result<()> {
    let router = axum::Router::new()
        .route_with_tsr(
            "/pubsub",
            method_routing::get(pubsub::pubsub_verification).post(pubsub::pubsub_notification),
        )
        .with_state(state)
        .fallback(method_routing::any(|| async {
            axum::http::StatusCode::FORBIDDEN
        }))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(15))),
        );

    axum::serve(
        tokio::net::TcpListener::bind(listen_addr)
            .await
            .wrap_err_with(|| format!("unable to bind to {listen_addr}"))?,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .wrap_err("failed to run axum server")
}
