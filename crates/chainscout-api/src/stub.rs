// One-shot loopback HTTP server for exercising the real client stack in tests
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A canned response waiting for exactly one request
pub struct StubServer {
    pub base_url: String,
    request: JoinHandle<String>,
}

impl StubServer {
    /// Serve `status` (e.g. `"204 No Content"`) with extra header lines and a body
    pub async fn respond(status: &str, headers: &[&str], body: &str) -> Self {
        let mut response = format!("HTTP/1.1 {}\r\n", status);
        for header in headers {
            response.push_str(header);
            response.push_str("\r\n");
        }
        if !status.starts_with("204") {
            response.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        response.push_str("Connection: close\r\n\r\n");
        response.push_str(body);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let request = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut chunk = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&chunk[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&received).into_owned()
        });

        Self { base_url, request }
    }

    /// Raw request head the client sent, header names lower-cased
    pub async fn request(self) -> String {
        self.request.await.unwrap().to_lowercase()
    }
}
