//! A minimal HTTP/1.1 server for exercising the stream client in tests.

use crate::config::TwitterConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Client configuration pointing both endpoints at `addr`.
pub fn test_config(addr: std::net::SocketAddr) -> TwitterConfig {
    TwitterConfig {
        access_token: "token".to_string(),
        access_secret: "token-secret".to_string(),
        consumer_key: "consumer".to_string(),
        consumer_secret: "consumer-secret".to_string(),
        api_url: format!("http://{addr}/1.1"),
        stream_url: format!("http://{addr}/1.1"),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Accept one connection and read its full request (headers and body).
pub async fn accept_request(listener: &TcpListener) -> (TcpStream, String) {
    let (mut socket, _) = listener.accept().await.unwrap();
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
        if let Some(end) = find(&request, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= end + 4 + length {
                break;
            }
        }
    }

    (socket, String::from_utf8_lossy(&request).into_owned())
}

/// Accept one connection, read the request, send `response`, close.
pub async fn serve_once(listener: &TcpListener, response: String) -> String {
    let (mut socket, request) = accept_request(listener).await;
    socket.write_all(response.as_bytes()).await.unwrap();
    socket.shutdown().await.unwrap();
    request
}

pub fn json_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// A 200 streaming response whose body runs until the connection closes.
pub fn stream_response(body: &str) -> String {
    format!("HTTP/1.1 200 OK\r\ncontent-type: application/json\r\nconnection: close\r\n\r\n{body}")
}
