#![warn(missing_docs)]

//! Backend for organizing rap battles (cyphers): MCs and their records, battle schedules with
//! head-to-head matchups, and per-account storage behind a bearer-token auth gateway.
//!
//! Runs as a Cloudflare worker (D1 or Workers KV storage), or natively as `cypher_server` with
//! in-memory storage.

/// Re-exported for [`cypher_macro`].
pub use axum;

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
#[cfg(target_arch = "wasm32")]
pub mod entry;
pub mod error;
pub mod local_future;
pub mod matchup;
pub mod model;
pub mod routes;
pub mod state;
pub mod stats;
pub mod store;
pub mod util;

/// Serves the app on `addr` until ctrl-c.
#[cfg(not(target_arch = "wasm32"))]
pub async fn serve(state: state::AppState, addr: std::net::SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down.");
        })
        .await
}
