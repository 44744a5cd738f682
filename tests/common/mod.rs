//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cgi_gateway::config::ListenAddr;
use cgi_gateway::exec::CompileOptions;
use cgi_gateway::net::GatewayListener;
use cgi_gateway::{GatewayServer, GatewayState, Shutdown};
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A gateway running on an ephemeral port with its own config file.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub gateway: Arc<GatewayState>,
    pub shutdown: Shutdown,
    config: NamedTempFile,
}

impl TestGateway {
    /// Write `yaml` to a temp file, load it and start serving.
    pub async fn start(yaml: &str) -> Self {
        let config = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::fs::write(config.path(), yaml).unwrap();

        let gateway = Arc::new(GatewayState::bootstrap(
            config.path(),
            CompileOptions::default(),
        ));

        let listener = GatewayListener::bind(&ListenAddr::Tcp("127.0.0.1:0".into()))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let server = GatewayServer::new(Arc::clone(&gateway));
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, rx).await;
        });

        Self {
            addr,
            gateway,
            shutdown,
            config,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Replace the config file contents (does not reload).
    pub fn rewrite_config(&self, yaml: &str) {
        std::fs::write(self.config.path(), yaml).unwrap();
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Send a raw upgrade request (plus any `trailing` bytes in the same write)
/// and return the stream, the response head and bytes read past it.
pub async fn upgrade(
    addr: SocketAddr,
    path: &str,
    extra_headers: &[(&str, &str)],
    trailing: &[u8],
) -> (TcpStream, String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nUpgrade: tcp\r\nConnection: Upgrade\r\n",
        path, addr
    );
    for (name, value) in extra_headers {
        request.push_str(&format!("{}: {}\r\n", name, value));
    }
    request.push_str("\r\n");

    let mut bytes = request.into_bytes();
    bytes.extend_from_slice(trailing);
    stream.write_all(&bytes).await.unwrap();

    let (head, rest) = read_head(&mut stream).await;
    (stream, head, rest)
}

/// Read until the end of an HTTP response head.
pub async fn read_head(stream: &mut TcpStream) -> (String, Vec<u8>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).into_owned();
            return (head, buf[pos + 4..].to_vec());
        }
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut chunk))
            .await
            .expect("timed out reading response head")
            .unwrap();
        assert!(n > 0, "connection closed before response head");
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Read exactly `len` more bytes after `already`.
pub async fn read_exact_after(stream: &mut TcpStream, mut already: Vec<u8>, len: usize) -> Vec<u8> {
    let mut chunk = [0u8; 1024];
    while already.len() < len {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut chunk))
            .await
            .expect("timed out reading bridged bytes")
            .unwrap();
        assert!(n > 0, "connection closed early");
        already.extend_from_slice(&chunk[..n]);
    }
    already
}

/// Read until EOF, failing after a timeout.
pub async fn read_to_eof(stream: &mut TcpStream, mut already: Vec<u8>) -> Vec<u8> {
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut already))
        .await
        .expect("connection was not closed")
        .unwrap();
    already
}
