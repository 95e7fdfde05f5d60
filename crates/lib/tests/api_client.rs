//! Integration test: run a canned HTTP responder on a free port and drive the
//! real `ApiClient` against it. Does not require the chat server.

use lib::api::{ApiClient, ChatTransport};
use lib::protocol::SendMessageRequest;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(headers: &str) -> usize {
    headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}

fn respond_to(request_line: &str) -> &'static str {
    if request_line.starts_with("GET /models") {
        r#"{"models": ["openai/gpt-4.1-mini", "meta/llama-3"]}"#
    } else if request_line.starts_with("GET /sessions") {
        r#"{"sessions": [{"session_id": "sess-1", "title": "First"}, {"session_id": "sess-2"}]}"#
    } else if request_line.starts_with("GET /session/sess-1") {
        r#"{"title": "First", "model": "meta/llama-3"}"#
    } else if request_line.starts_with("GET /history/sess-1") {
        r#"{"messages": [{"role": "user", "content": "hi"}, {"role": "assistant", "content": "hello"}]}"#
    } else if request_line.starts_with("POST /send-message") {
        r#"{"status": "ok"}"#
    } else {
        "{}"
    }
}

/// Accept connections forever, answer each request with a canned body, and
/// close. The listener task is left running when the test ends.
async fn spawn_stub_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind free port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let Ok(n) = stream.read(&mut chunk).await else {
                        return;
                    };
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(end) = headers_end(&buf) {
                        let headers = String::from_utf8_lossy(&buf[..end]).to_string();
                        if buf.len() >= end + 4 + content_length(&headers) {
                            break;
                        }
                    }
                }
                let request = String::from_utf8_lossy(&buf).to_string();
                let body = respond_to(request.lines().next().unwrap_or(""));
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn lists_models_and_sessions() {
    let client = ApiClient::new(spawn_stub_server().await);

    let models = client.list_models().await.expect("list models");
    assert_eq!(models, vec!["openai/gpt-4.1-mini", "meta/llama-3"]);

    let sessions = client.list_sessions().await.expect("list sessions");
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].session_id, "sess-1");
    assert_eq!(sessions[0].display_title(), "First");
    assert_eq!(sessions[1].display_title(), "Untitled");
}

#[tokio::test]
async fn loads_session_detail_and_history() {
    let client = ApiClient::new(spawn_stub_server().await);

    let detail = client.session_detail("sess-1").await.expect("detail");
    assert_eq!(detail.title.as_deref(), Some("First"));
    assert_eq!(detail.model.as_deref(), Some("meta/llama-3"));

    let history = client.history("sess-1").await.expect("history");
    assert_eq!(history.len(), 2);
    assert!(history[0].is_user());
    assert_eq!(history[1].content, "hello");
}

#[tokio::test]
async fn mutating_endpoints_accept_any_2xx() {
    let client = ApiClient::new(spawn_stub_server().await);

    client.delete_session("sess-1").await.expect("delete");
    client
        .change_model("sess-1", "meta/llama-3")
        .await
        .expect("change model");

    let response = client
        .send_message(&SendMessageRequest {
            session_id: "sess-1".to_string(),
            content: "hi".to_string(),
            model: "meta/llama-3".to_string(),
        })
        .await
        .expect("send");
    assert!(response.is_ok());
}
