//! Tunneling proxy integration tests.
//!
//! The websocket side is driven through in-memory channels so the pump
//! logic is exercised without a live remote; the listener tests use real
//! loopback sockets.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use dataproc_spark_connect::proxy::{pump, SessionProxy};
use dataproc_spark_connect::SessionProbe;

struct StaticProbe(bool);

#[async_trait]
impl SessionProbe for StaticProbe {
    async fn is_active(&self) -> bool {
        self.0
    }
}

/// A connected loopback TCP pair.
async fn tcp_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr);
    let server = listener.accept();
    let (client, server) = tokio::join!(client, server);
    (client.unwrap(), server.unwrap().0)
}

/// Fake websocket halves: a sink the pump writes to and a stream it
/// reads from, each backed by a channel the test controls.
fn fake_ws() -> (
    impl futures::Sink<Message, Error = WsError> + Unpin,
    mpsc::UnboundedReceiver<Message>,
    mpsc::UnboundedSender<Message>,
    impl futures::Stream<Item = Result<Message, WsError>> + Unpin,
) {
    let (out_tx, out_rx) = mpsc::unbounded::<Message>();
    let (in_tx, in_rx) = mpsc::unbounded::<Message>();
    (
        out_tx.sink_map_err(|_| WsError::ConnectionClosed),
        out_rx,
        in_tx,
        in_rx.map(Ok::<_, WsError>),
    )
}

#[tokio::test]
async fn test_pump_forwards_tcp_to_websocket() {
    let (mut client, server) = tcp_pair().await;
    let (ws_sink, mut ws_out, _ws_in, ws_stream) = fake_ws();

    let tunnel = tokio::spawn(pump(server, ws_sink, ws_stream));

    client.write_all(b"spark-connect-rpc-bytes").await.unwrap();
    let message = timeout(Duration::from_secs(5), ws_out.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message, Message::Binary(b"spark-connect-rpc-bytes".to_vec()));

    drop(client);
    tunnel.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_pump_forwards_websocket_to_tcp() {
    let (mut client, server) = tcp_pair().await;
    let (ws_sink, _ws_out, ws_in, ws_stream) = fake_ws();

    let _tunnel = tokio::spawn(pump(server, ws_sink, ws_stream));

    ws_in
        .unbounded_send(Message::Binary(b"response-frame".to_vec()))
        .unwrap();

    let mut buf = [0u8; 64];
    let n = timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..n], b"response-frame");
}

#[tokio::test]
async fn test_pump_text_frames_become_bytes() {
    let (mut client, server) = tcp_pair().await;
    let (ws_sink, _ws_out, ws_in, ws_stream) = fake_ws();

    let _tunnel = tokio::spawn(pump(server, ws_sink, ws_stream));

    ws_in
        .unbounded_send(Message::Text("textual".to_string()))
        .unwrap();

    let mut buf = [0u8; 64];
    let n = timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..n], b"textual");
}

#[tokio::test]
async fn test_pump_echo_roundtrip() {
    let (mut client, server) = tcp_pair().await;
    let (ws_sink, mut ws_out, ws_in, ws_stream) = fake_ws();

    let _tunnel = tokio::spawn(pump(server, ws_sink, ws_stream));

    // Echo every tunneled frame back, like a remote that mirrors input.
    let echo = tokio::spawn(async move {
        while let Some(message) = ws_out.next().await {
            if ws_in.unbounded_send(message).is_err() {
                break;
            }
        }
    });

    for line in ["ABCD", "EFG", "HIJK", "LMNOP", "QRS", "TUV", "WX", "Y", "Z"] {
        client.write_all(line.as_bytes()).await.unwrap();

        let mut buf = [0u8; 64];
        let n = timeout(Duration::from_secs(5), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], line.as_bytes());
    }

    drop(client);
    echo.await.unwrap();
}

#[tokio::test]
async fn test_pump_close_frame_ends_tunnel() {
    let (mut client, server) = tcp_pair().await;
    let (ws_sink, _ws_out, ws_in, ws_stream) = fake_ws();

    let tunnel = tokio::spawn(pump(server, ws_sink, ws_stream));

    ws_in.unbounded_send(Message::Close(None)).unwrap();
    tunnel.await.unwrap().unwrap();

    // The TCP write half was shut down; the client sees EOF.
    let mut buf = [0u8; 8];
    let n = timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_pump_tcp_eof_sends_close() {
    let (client, server) = tcp_pair().await;
    let (ws_sink, mut ws_out, _ws_in, ws_stream) = fake_ws();

    let tunnel = tokio::spawn(pump(server, ws_sink, ws_stream));

    drop(client);

    let message = timeout(Duration::from_secs(5), ws_out.next())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(message, Message::Close(_)));
    tunnel.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_proxy_assigns_ephemeral_port() {
    let proxy = SessionProxy::start("endpoint.example.com", Arc::new(StaticProbe(true)))
        .await
        .unwrap();

    assert_ne!(proxy.port(), 0);
    assert_eq!(proxy.connect_url(), format!("sc://localhost:{}", proxy.port()));
}

#[tokio::test]
async fn test_proxy_refuses_connection_for_inactive_session() {
    let proxy = SessionProxy::start("endpoint.example.com", Arc::new(StaticProbe(false)))
        .await
        .unwrap();

    let mut conn = TcpStream::connect(("127.0.0.1", proxy.port())).await.unwrap();

    // The proxy closes the connection without tunneling anything.
    let mut buf = [0u8; 8];
    let n = timeout(Duration::from_secs(5), conn.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_proxy_stop_releases_listener() {
    let proxy = SessionProxy::start("endpoint.example.com", Arc::new(StaticProbe(false)))
        .await
        .unwrap();
    let port = proxy.port();

    proxy.stop();
    // Give the accept loop a moment to observe shutdown.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let result = TcpStream::connect(("127.0.0.1", port)).await;
    match result {
        // Connection refused: the listener is gone.
        Err(_) => {}
        // A connect may still race the close; it must then see EOF.
        Ok(mut conn) => {
            let mut buf = [0u8; 8];
            let n = timeout(Duration::from_secs(5), conn.read(&mut buf))
                .await
                .unwrap()
                .unwrap_or(0);
            assert_eq!(n, 0);
        }
    }
}
