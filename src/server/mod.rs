//! TCP front end: accept loop, per-connection tasks, shutdown wiring.

pub mod service;
pub mod wire;

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::config::GatewayConfig;
use crate::server::service::GatewayService;
use crate::server::wire::{Request, Response, WireStatus};

/// Run the gateway until ctrl-c or a `shutdown` request.
pub async fn serve(config: &GatewayConfig, service: Arc<GatewayService>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.socket_addr()).await?;
    info!("gateway listening on {}", listener.local_addr()?);

    let mut stop = service.shutdown_signal();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                debug!("client connected from {peer}");
                let service = Arc::clone(&service);
                let stop = service.shutdown_signal();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, service, stop).await {
                        warn!("connection from {peer} ended with error: {err}");
                    }
                });
            }
            _ = stop.changed() => {
                info!("stop requested, no longer accepting clients");
                break;
            }
            _ = &mut ctrl_c => {
                info!("ctrl-c received, shutting down");
                break;
            }
        }
    }
    Ok(())
}

/// One request line in, one response line out, until the peer hangs up or the
/// stop signal fires.
async fn handle_connection(
    stream: TcpStream,
    service: Arc<GatewayService>,
    mut stop: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<Request>(&line) {
                    Ok(request) => service.handle(request).await,
                    Err(err) => Response::error(
                        WireStatus::InvalidArgument,
                        format!("malformed request: {err}"),
                    ),
                };
                let mut payload = serde_json::to_vec(&response)?;
                payload.push(b'\n');
                writer.write_all(&payload).await?;
            }
            _ = stop.changed() => break,
        }
    }
    Ok(())
}
