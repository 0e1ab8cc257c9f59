//! End-to-end tests of `CompletionClient` over HTTP against a raw TCP stub.
//!
//! The stub answers each incoming connection with the next canned response
//! and records the request line, so the tests see exactly which endpoint
//! and model were hit, fallback attempts included.
//!
//! Run with: `cargo test -p ai-api --test gateway_integration -- --ignored`

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_api::{BridgeConfig, CompletionClient, Endpoints, aggregate};
use ai_types::{ApiError, CompletionRequest, Message};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const NATIVE_SSE_BODY: &str = "\
event: message_start\n\
data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_test\",\"type\":\"message\",\"role\":\"assistant\",\"content\":[],\"model\":\"test\"}}\n\
\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello \"}}\n\
\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"from native\"}}\n\
\n\
event: message_stop\n\
data: {\"type\":\"message_stop\"}\n\
\n";

const CHAT_SSE_BODY: &str = "\
data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hello \"}}]}\n\
\n\
data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"from relay\"}}]}\n\
\n\
data: [DONE]\n\
\n";

fn http_response(status_line: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    )
}

fn sse_ok(body: &str) -> String {
    http_response("200 OK", "text/event-stream", body)
}

fn json_ok(body: &str) -> String {
    http_response("200 OK", "application/json", body)
}

fn not_found() -> String {
    http_response(
        "404 Not Found",
        "application/json",
        r#"{"error":{"type":"not_found_error","message":"model not found"}}"#,
    )
}

/// A recorded request: the request line and the JSON body's `model`.
#[derive(Debug, Clone)]
struct Seen {
    path: String,
    model: String,
}

/// Start a stub server. `responses` holds one HTTP response per connection.
async fn start_test_server(responses: Vec<String>) -> (String, Arc<Mutex<Vec<Seen>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);

    tokio::spawn(async move {
        let responses = Arc::new(responses);
        let mut idx = 0;
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let response = responses.get(idx).cloned();
            idx += 1;
            let seen = Arc::clone(&seen_clone);

            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                seen.lock().unwrap().push(request);
                if let Some(response) = response {
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.flush().await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), seen)
}

/// Read headers and a Content-Length body, then pull out path and model.
async fn read_request(socket: &mut tokio::net::TcpStream) -> Seen {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let length = text[..header_end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + length {
                break;
            }
        }
    }

    let text = String::from_utf8_lossy(&buf);
    let path = text
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();
    let model = text
        .split_once("\r\n\r\n")
        .and_then(|(_, body)| serde_json::from_str::<serde_json::Value>(body).ok())
        .and_then(|v| v["model"].as_str().map(str::to_string))
        .unwrap_or_default();
    Seen { path, model }
}

fn make_client(base_url: &str) -> CompletionClient {
    let endpoints = Endpoints {
        native: base_url.to_string(),
        direct: format!("{base_url}/openai/v1"),
        relay: format!("{base_url}/openrouter/v1"),
    };
    CompletionClient::from_endpoints("test-key", &endpoints, Duration::from_secs(5))
        .unwrap()
        .with_bridge_config(BridgeConfig {
            poll_interval: Duration::from_millis(10),
            join_timeout: Duration::from_secs(2),
        })
}

fn test_request(model: &str) -> CompletionRequest {
    CompletionRequest::new(model, vec![Message::system("be brief"), Message::user("hi")])
}

#[tokio::test]
#[ignore]
async fn test_native_streaming_over_http() {
    let (base_url, seen) = start_test_server(vec![sse_ok(NATIVE_SSE_BODY)]).await;
    let client = make_client(&base_url);

    let mut stream = client.complete(test_request("claude-opus-4-5-20251101").streaming(true));
    assert_eq!(aggregate(&mut stream).await.unwrap(), "Hello from native");

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/v1/messages");
}

#[tokio::test]
#[ignore]
async fn test_native_non_streaming_over_http() {
    let body = r#"{"id":"msg","type":"message","content":[{"type":"text","text":"single shot"}]}"#;
    let (base_url, _) = start_test_server(vec![json_ok(body)]).await;
    let client = make_client(&base_url);

    let text = client.complete_text(test_request("claude-x")).await.unwrap();
    assert_eq!(text, "single shot");
}

#[tokio::test]
#[ignore]
async fn test_native_fallback_over_http() {
    let (base_url, seen) = start_test_server(vec![
        not_found(),
        not_found(),
        sse_ok(NATIVE_SSE_BODY),
    ])
    .await;
    let client = make_client(&base_url);

    let mut stream = client.complete(test_request("claude-opus-4.5").streaming(true));
    assert_eq!(aggregate(&mut stream).await.unwrap(), "Hello from native");

    let models: Vec<String> = seen.lock().unwrap().iter().map(|s| s.model.clone()).collect();
    assert_eq!(
        models,
        vec!["claude-opus-4.5", "claude-opus-4.5", "claude-opus-4-5-20251101"]
    );
}

#[tokio::test]
#[ignore]
async fn test_relay_streaming_over_http() {
    let (base_url, seen) = start_test_server(vec![sse_ok(CHAT_SSE_BODY)]).await;
    let client = make_client(&base_url);

    let mut stream = client.complete(test_request("perplexity/sonar").streaming(true));
    assert_eq!(aggregate(&mut stream).await.unwrap(), "Hello from relay");

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen[0].path, "/openrouter/v1/chat/completions");
    assert_eq!(seen[0].model, "perplexity/sonar");
}

#[tokio::test]
#[ignore]
async fn test_direct_not_found_does_not_fall_back() {
    let (base_url, seen) = start_test_server(vec![not_found(), not_found()]).await;
    let client = make_client(&base_url);

    let err = client
        .complete_text(test_request("openai/gpt-4o"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 404, .. }));
    assert!(err.to_string().contains("404"));

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/openai/v1/chat/completions");
}

#[tokio::test]
#[ignore]
async fn test_relay_non_streaming_over_http() {
    let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Paris"}}]}"#;
    let (base_url, _) = start_test_server(vec![json_ok(body)]).await;
    let client = make_client(&base_url);

    let text = client
        .complete_text(test_request("deepseek/deepseek-v3.2"))
        .await
        .unwrap();
    assert_eq!(text, "Paris");
}
