use tokio::net::TcpListener;
use tracing::info;
use wabridge_common::{Error, Result};

use crate::router::build_router;
use crate::state::SharedState;

/// Binds the configured address and serves the bridge API.
pub struct GatewayServer {
    state: SharedState,
}

impl GatewayServer {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub async fn run(self) -> Result<()> {
        let gateway = &self.state.config.gateway;
        let addr = format!("{}:{}", gateway.host, gateway.port);

        let app = build_router(self.state.clone());

        let listener = TcpListener::bind(&addr).await?;
        info!("wabridge gateway listening on {}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Gateway(format!("server error: {e}")))?;

        Ok(())
    }
}
