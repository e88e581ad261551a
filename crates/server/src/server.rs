//! Sequential accept loop for the session protocol.

use crate::session::{handle_connection, SessionContext};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Accept and serve connections one at a time, forever.
///
/// Deliberately sequential: a connection is fully handled, including the
/// whole duration of a playback stream, before the next accept. A bad
/// connection is logged and skipped; the loop itself never exits.
pub async fn serve(listener: TcpListener, ctx: SessionContext) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "waiting for clients");
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        info!(%peer, "client connected");
        ctx.metrics.write().await.sessions_handled += 1;

        if let Err(e) = handle_connection(stream, &ctx).await {
            warn!(%peer, error = %e, "session abandoned");
        }
    }
}
