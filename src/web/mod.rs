//! Status and manual override interface over HTTP.

use std::net::SocketAddr;

use log::info;
use tokio::net::TcpListener;

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;

/// Serve the interface until the listener fails.
pub async fn serve(bind: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("Web interface listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(state)).await
}
