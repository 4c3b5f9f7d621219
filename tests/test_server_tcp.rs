mod common;
use common::*;

use p18_bridge::config;
use p18_bridge::server::{Server, Session, Shutdown};
use p18_bridge::transport::PseudoTransport;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<anyhow::Result<()>>,
}

async fn start_with(session: Session, shutdown: Shutdown) -> Running {
    common_setup();

    let listener = Server::bind(&Factory::server_settings()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Server::new(session, shutdown.clone());
    let handle = tokio::spawn(async move { server.serve(listener).await });

    Running {
        addr,
        shutdown,
        handle,
    }
}

async fn start() -> Running {
    let (session, _, shutdown) = Factory::session(Factory::server_settings());
    start_with(session, shutdown).await
}

async fn read_reply(stream: &mut TcpStream) -> String {
    let mut reply = Vec::new();
    let mut buf = [0u8; 1024];
    while !reply.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed mid-reply: {:?}", String::from_utf8_lossy(&reply));
        reply.extend_from_slice(&buf[..n]);
    }

    String::from_utf8(reply).unwrap()
}

async fn request(stream: &mut TcpStream, line: &str) -> String {
    stream.write_all(format!("{}\r\n", line).as_bytes()).await.unwrap();
    read_reply(stream).await
}

#[tokio::test]
async fn exec_defaults_to_json() {
    let server = start().await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    assert_eq!(request(&mut stream, "v 1").await, "ok\r\n\r\n");
    assert_eq!(
        request(&mut stream, "exec get-mode").await,
        "ok\r\n{\"result\":\"ok\",\"data\":{\"mode\":\"Hybrid mode\"}}\r\n\r\n"
    );

    server.shutdown.trigger();
}

#[tokio::test]
async fn format_switch_and_errors_keep_the_connection() {
    let server = start().await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    assert_eq!(request(&mut stream, "format table").await, "ok\r\n\r\n");
    assert_eq!(
        request(&mut stream, "exec get-month-generated 2024 13").await,
        "err\r\nerror: invalid month\r\n\r\n"
    );
    assert_eq!(
        request(&mut stream, "hello").await,
        "err\r\nerror: invalid token: hello\r\n\r\n"
    );
    assert_eq!(
        request(&mut stream, "format xml").await,
        "err\r\nerror: invalid format\r\n\r\n"
    );
    assert_eq!(
        request(&mut stream, "v 2").await,
        "err\r\nerror: invalid protocol version\r\n\r\n"
    );
    assert_eq!(
        request(&mut stream, "exec").await,
        "err\r\nerror: invalid arguments count: expected 1, got 0\r\n\r\n"
    );
    assert_eq!(
        request(&mut stream, "raw ^P005PI").await,
        "err\r\nerror: not implemented\r\n\r\n"
    );
    assert_eq!(
        request(&mut stream, "exec set-ac-output-freq 50").await,
        "ok\r\nok\r\n\r\n"
    );

    server.shutdown.trigger();
}

#[tokio::test]
async fn oversized_request_is_answered_and_skipped() {
    let server = start().await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    assert_eq!(request(&mut stream, "format table").await, "ok\r\n\r\n");

    let mut oversized = vec![b'a'; 3000];
    oversized.extend_from_slice(b"\r\n");
    stream.write_all(&oversized).await.unwrap();

    assert_eq!(
        read_reply(&mut stream).await,
        "err\r\nerror: request exceeds 2048 bytes\r\n\r\n"
    );
    assert_eq!(request(&mut stream, "v 1").await, "ok\r\n\r\n");

    server.shutdown.trigger();
}

#[tokio::test]
async fn end_of_transmission_closes() {
    let server = start().await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    stream.write_all(b"\x04").await.unwrap();

    let mut buf = [0u8; 16];
    assert_eq!(stream.read(&mut buf).await.unwrap(), 0);

    server.shutdown.trigger();
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let server = start().await;

    server.shutdown.trigger();

    tokio::time::timeout(Duration::from_secs(2), server.handle)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn shutdown_lets_paced_request_finish() {
    let (session, _, shutdown) = Factory::session(config::Server {
        delay: Duration::from_millis(500),
        ..Factory::server_settings()
    });
    let server = start_with(session, shutdown).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    assert!(request(&mut stream, "exec get-mode").await.starts_with("ok\r\n"));

    // the second execution has to sit out the pacing delay
    stream.write_all(b"exec get-flags\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    server.shutdown.trigger();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!server.handle.is_finished());

    let reply = read_reply(&mut stream).await;
    assert!(reply.starts_with("ok\r\n{\"result\":\"ok\""), "{}", reply);

    // no further requests are read after shutdown
    let mut buf = [0u8; 16];
    assert_eq!(stream.read(&mut buf).await.unwrap(), 0);

    tokio::time::timeout(Duration::from_secs(2), server.handle)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn device_error_limit_fails_the_server() {
    let mut pseudo = PseudoTransport::new().without_crc();
    pseudo.push_raw(b"^D00518\x00\x00\r".to_vec());

    let (session, _, shutdown) = Factory::session_with(
        pseudo,
        config::Server {
            device_error_limit: 1,
            ..Factory::server_settings()
        },
    );
    let server = start_with(session, shutdown).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    let reply = request(&mut stream, "exec get-protocol-id").await;
    assert!(reply.starts_with("err\r\n"), "{}", reply);
    assert!(reply.contains("data is invalid: crc is invalid"), "{}", reply);

    let result = tokio::time::timeout(Duration::from_secs(2), server.handle)
        .await
        .expect("server did not stop")
        .unwrap();
    let err = result.unwrap_err();
    assert!(err.to_string().contains("consecutive device errors"), "{}", err);
}
