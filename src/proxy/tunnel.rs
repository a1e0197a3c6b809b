//! TCP-over-websocket tunnel.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::error::{Result, SparkConnectError};
use crate::session::SessionProbe;

/// Read chunk size for the TCP side of a tunnel.
const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Derive the websocket URL for a session endpoint host.
///
/// Endpoints are published as bare hosts or `https://` URLs; either way
/// the tunnel dials the secure websocket port on the same host.
pub fn websocket_url(endpoint: &str) -> String {
    let host = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint);
    format!("wss://{}", host.trim_end_matches('/'))
}

/// Pump bytes between a local byte stream and a websocket until either
/// side closes.
///
/// TCP reads become binary websocket messages; binary (or text) messages
/// become TCP writes. EOF on the TCP side sends a websocket close; a
/// close frame from the remote shuts the TCP write half down. The first
/// side to finish tears the tunnel down.
pub async fn pump<T, Si, St>(transport: T, mut ws_sink: Si, mut ws_stream: St) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    Si: Sink<Message, Error = WsError> + Unpin,
    St: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    let (mut read_half, mut write_half) = tokio::io::split(transport);

    let client_to_remote = async {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            let n = read_half.read(&mut buf).await.map_err(SparkConnectError::Io)?;
            if n == 0 {
                let _ = ws_sink.send(Message::Close(None)).await;
                return Ok::<_, SparkConnectError>(());
            }
            ws_sink
                .send(Message::Binary(buf[..n].to_vec()))
                .await
                .map_err(SparkConnectError::WebSocket)?;
        }
    };

    let remote_to_client = async {
        while let Some(message) = ws_stream.next().await {
            match message.map_err(SparkConnectError::WebSocket)? {
                Message::Binary(data) => write_half
                    .write_all(&data)
                    .await
                    .map_err(SparkConnectError::Io)?,
                Message::Text(text) => write_half
                    .write_all(text.as_bytes())
                    .await
                    .map_err(SparkConnectError::Io)?,
                Message::Close(_) => break,
                // Ping/pong are answered by the websocket layer.
                _ => {}
            }
        }
        let _ = write_half.shutdown().await;
        Ok::<_, SparkConnectError>(())
    };

    tokio::select! {
        result = client_to_remote => result,
        result = remote_to_client => result,
    }
}

/// Local proxy multiplexing driver connections to a remote session
/// endpoint over websockets.
///
/// Binds an ephemeral port on loopback; every accepted connection is
/// checked against the session probe and then tunneled independently.
/// Dropping the proxy stops the listener and all in-flight tunnels.
pub struct SessionProxy {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SessionProxy {
    /// Start a proxy tunneling to `endpoint` (a session endpoint host).
    pub async fn start(endpoint: &str, probe: Arc<dyn SessionProbe>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let local_addr = listener.local_addr()?;
        let remote_url = websocket_url(endpoint);
        let (shutdown, shutdown_rx) = watch::channel(false);

        debug!("proxy listening on {local_addr}, tunneling to {remote_url}");
        let task = tokio::spawn(accept_loop(listener, remote_url, probe, shutdown_rx));

        Ok(Self {
            local_addr,
            shutdown,
            task,
        })
    }

    /// The local port the driver should connect to.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// The Spark Connect URL of the proxied endpoint.
    pub fn connect_url(&self) -> String {
        format!("sc://localhost:{}", self.port())
    }

    /// Stop accepting connections and tear down in-flight tunnels.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Drop for SessionProxy {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    remote_url: String,
    probe: Arc<dyn SessionProbe>,
    mut shutdown: watch::Receiver<bool>,
) {
    // Tunnels live in a JoinSet so dropping the loop aborts them all.
    let mut tunnels = JoinSet::new();
    let mut next_conn: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("accept failed: {e}");
                        break;
                    }
                };
                let conn = next_conn;
                next_conn += 1;
                debug!("connection {conn} accepted from {peer}");

                let remote_url = remote_url.clone();
                let probe = Arc::clone(&probe);
                tunnels.spawn(handle_connection(conn, stream, remote_url, probe));
            }
        }
    }
}

async fn handle_connection(
    conn: u64,
    stream: TcpStream,
    remote_url: String,
    probe: Arc<dyn SessionProbe>,
) {
    if !probe.is_active().await {
        // Dropping the stream closes the driver's connection.
        warn!("session is no longer active, refusing connection {conn}; create a new session");
        return;
    }

    match tokio_tungstenite::connect_async(remote_url.as_str()).await {
        Ok((ws, _response)) => {
            let (ws_sink, ws_stream) = ws.split();
            match pump(stream, ws_sink, ws_stream).await {
                Ok(()) => debug!("connection {conn} closed"),
                Err(e) => debug!("connection {conn} closed: {e}"),
            }
        }
        Err(e) => warn!("connection {conn}: websocket connect failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_url_bare_host() {
        assert_eq!(
            websocket_url("sc-1.example.googleusercontent.com"),
            "wss://sc-1.example.googleusercontent.com"
        );
    }

    #[test]
    fn test_websocket_url_strips_scheme() {
        assert_eq!(
            websocket_url("https://sc-1.example.googleusercontent.com/"),
            "wss://sc-1.example.googleusercontent.com"
        );
    }
}
