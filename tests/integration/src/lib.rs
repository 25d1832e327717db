//! Helpers for the end-to-end backchannel tests: spawn the full HTTP surface
//! on an ephemeral port and return its base URL.

use std::sync::Arc;

use backchannel_server::{api, BackchannelConfig, BackchannelState};

/// Spawn a backchannel with default configuration.
pub async fn spawn_backchannel() -> String {
    spawn_backchannel_with(BackchannelConfig::default()).await
}

/// Spawn a backchannel with the given configuration on an ephemeral port.
pub async fn spawn_backchannel_with(config: BackchannelConfig) -> String {
    let state = Arc::new(BackchannelState::new(&config));
    state.start();

    let router = api::build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });

    format!("http://{}", addr)
}
