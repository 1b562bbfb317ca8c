//! Tests for the remote synthesis engine against a local HTTP stub

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use voxdesk_spk::config::RemoteEngineConfig;
use voxdesk_spk::engines::remote::RemoteEngineFactory;
use voxdesk_spk::engines::EngineFactory;
use voxdesk_spk::error::FailureKind;

/// Serve one request with the given status line and body; yields the raw request
async fn serve_once(status: &'static str, body: Vec<u8>) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;

        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        socket.shutdown().await.unwrap();
        request
    });

    (endpoint, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

fn config(endpoint: String) -> RemoteEngineConfig {
    RemoteEngineConfig {
        endpoint,
        timeout_secs: 5,
        ..RemoteEngineConfig::default()
    }
}

fn pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[tokio::test]
async fn test_remote_returns_single_segment() {
    let (endpoint, server) = serve_once("200 OK", pcm(&[1, -1, 300, i16::MIN])).await;
    let engine = RemoteEngineFactory::new(config(endpoint))
        .initialize("a")
        .await
        .unwrap();
    assert_eq!(engine.sample_rate(), 16_000);

    let chunks: Vec<_> = engine
        .run("Hello from the service", "af_heart", 1.0)
        .unwrap()
        .collect()
        .await;
    assert_eq!(chunks.len(), 1);
    let chunk = chunks[0].as_ref().unwrap();
    assert_eq!(chunk.segment.samples(), &[1, -1, 300, i16::MIN]);
    assert_eq!(chunk.segment.sample_rate(), 16_000);
    assert!(chunk.phonemes.is_none());

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/synthesize "));
    assert!(request.contains("\"text\":\"Hello from the service\""));
    assert!(request.contains("\"voice_name\":\"English-US.Female-1\""));
    assert!(request.contains("\"encoding\":\"LINEAR_PCM\""));
    assert!(request.contains("\"sample_rate_hz\":16000"));
    assert!(request.contains("\"language_code\":\"en-US\""));
}

#[tokio::test]
async fn test_remote_error_status_is_synthesis_error() {
    let (endpoint, _server) = serve_once("500 Internal Server Error", b"model offline".to_vec()).await;
    let engine = RemoteEngineFactory::new(config(endpoint))
        .initialize("a")
        .await
        .unwrap();

    let chunks: Vec<_> = engine.run("Hello", "af_heart", 1.0).unwrap().collect().await;
    let err = chunks[0].as_ref().unwrap_err();
    assert_eq!(err.kind(), FailureKind::Synthesis);
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("model offline"));
}

#[tokio::test]
async fn test_remote_odd_payload_is_rejected() {
    let (endpoint, _server) = serve_once("200 OK", vec![1, 2, 3]).await;
    let engine = RemoteEngineFactory::new(config(endpoint))
        .initialize("a")
        .await
        .unwrap();

    let chunks: Vec<_> = engine.run("Hello", "af_heart", 1.0).unwrap().collect().await;
    assert!(chunks[0].is_err());
}

#[tokio::test]
async fn test_remote_unreachable_endpoint() {
    // Bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let engine = RemoteEngineFactory::new(config(endpoint))
        .initialize("a")
        .await
        .unwrap();
    let chunks: Vec<_> = engine.run("Hello", "af_heart", 1.0).unwrap().collect().await;
    let err = chunks[0].as_ref().unwrap_err();
    assert!(err.to_string().contains("Remote request failed"));
}

#[tokio::test]
async fn test_remote_lists_configured_voice() {
    let engine = RemoteEngineFactory::new(RemoteEngineConfig::default())
        .initialize("a")
        .await
        .unwrap();
    assert_eq!(engine.list_voices().await.unwrap(), vec!["English-US.Female-1"]);
}
