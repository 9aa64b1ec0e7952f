use std::time::Duration;

use chatwidget_core::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

// ========================================================================
// Stub endpoint
// ========================================================================

struct CapturedRequest {
    head: String,
    body: String,
}

impl CapturedRequest {
    fn header_lines(&self) -> Vec<String> {
        self.head.lines().map(|l| l.to_lowercase()).collect()
    }
}

/// Accept one connection, record the request and answer with a canned response
async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{}/v1/chat/completions", addr), handle)
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);

            if buf.len() >= end + 4 + length {
                let body = String::from_utf8_lossy(&buf[end + 4..end + 4 + length]).to_string();
                return CapturedRequest { head, body };
            }
        }

        if n == 0 {
            panic!("connection closed before the request was complete");
        }
    }
}

fn transcript() -> Vec<ChatTurn> {
    vec![ChatTurn::system("system"), ChatTurn::user("Hi")]
}

// ========================================================================
// CompletionClient
// ========================================================================

#[tokio::test]
async fn test_request_wire_format() {
    let (url, server) = serve_once(
        "200 OK",
        r#"{"choices":[{"message":{"content":"Hello back","role":"assistant"}}]}"#,
    )
    .await;

    let client = CompletionClient::new(&url, "sk-test");
    let reply = client.complete(&transcript()).await.unwrap();
    assert_eq!(reply, "Hello back");

    let request = server.await.unwrap();
    let headers = request.header_lines();
    assert!(headers[0].starts_with("post /v1/chat/completions"));
    assert!(headers.iter().any(|h| h == "authorization: bearer sk-test"));
    assert!(headers.iter().any(|h| h == "content-type: application/json"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "model": "gpt-3.5-turbo",
            "messages": [
                {"role": "system", "content": "system"},
                {"role": "user", "content": "Hi"}
            ],
            "max_tokens": 150,
            "temperature": 0.7
        })
    );
}

#[tokio::test]
async fn test_empty_choices_is_soft_failure() {
    let (url, _server) = serve_once("200 OK", r#"{"choices": []}"#).await;
    let reply = CompletionClient::new(&url, "k")
        .complete(&transcript())
        .await
        .unwrap();
    assert_eq!(reply, FALLBACK_REPLY);
}

#[tokio::test]
async fn test_server_error_is_http_error() {
    let (url, _server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
    let err = CompletionClient::new(&url, "k")
        .complete(&transcript())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Http { status: 500 }));
}

#[tokio::test]
async fn test_unauthorized_is_http_error() {
    let (url, _server) = serve_once("401 Unauthorized", "{}").await;
    let err = CompletionClient::new(&url, "bad")
        .complete(&transcript())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Http { status: 401 }));
}

#[tokio::test]
async fn test_error_object_without_choices_is_malformed() {
    let (url, _server) = serve_once("200 OK", r#"{"error":{"message":"quota"}}"#).await;
    let err = CompletionClient::new(&url, "k")
        .complete(&transcript())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let (url, _server) = serve_once("200 OK", "not json at all").await;
    let err = CompletionClient::new(&url, "k")
        .complete(&transcript())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{}/v1/chat/completions", addr);
    let err = CompletionClient::new(&url, "k")
        .complete(&transcript())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Network(_)));
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        // Hold the connection open without answering
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(socket);
    });

    let url = format!("http://{}/v1/chat/completions", addr);
    let client = CompletionClient::with_timeout(&url, "k", Duration::from_millis(200)).unwrap();
    let err = client.complete(&transcript()).await.unwrap_err();
    assert!(matches!(err, ChatError::Network(_)));
}

// ========================================================================
// WidgetController over HTTP
// ========================================================================

#[tokio::test]
async fn test_widget_end_to_end() {
    let (url, server) = serve_once(
        "200 OK",
        r#"{"choices":[{"message":{"content":"Hello back"}}]}"#,
    )
    .await;

    let config = WidgetConfig::new("sk-test")
        .with_api_url(url)
        .with_welcome_message("Welcome");
    let mut widget = WidgetController::mount(&config).unwrap();

    assert_eq!(widget.submit("Hi"), SubmitOutcome::Accepted(1));
    assert!(widget.settle().await);

    let view = widget.view_model();
    assert!(!view.is_awaiting_reply);
    let shown: Vec<(&str, Sender)> = view
        .display_messages
        .iter()
        .map(|m| (m.text.as_str(), m.sender))
        .collect();
    assert_eq!(
        shown,
        vec![
            ("Welcome", Sender::Bot),
            ("Hi", Sender::User),
            ("Hello back", Sender::Bot),
        ]
    );

    // The welcome text never reaches the endpoint
    let request = server.await.unwrap();
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1]["content"], "Hi");
}

#[tokio::test]
async fn test_widget_missing_choices_shows_apology() {
    let (url, _server) = serve_once("200 OK", "{}").await;

    let config = WidgetConfig::new("sk-test").with_api_url(url);
    let mut widget = WidgetController::mount(&config).unwrap();

    widget.submit("Hi");
    widget.settle().await;

    let view = widget.view_model();
    assert_eq!(view.display_messages.len(), 3);
    assert_eq!(view.display_messages[2].text, APOLOGY_TEXT);
    assert_ne!(view.display_messages[2].text, FALLBACK_REPLY);
}

#[tokio::test]
async fn test_widget_server_error_shows_apology() {
    let (url, _server) = serve_once("500 Internal Server Error", "").await;

    let config = WidgetConfig::new("sk-test").with_api_url(url);
    let mut widget = WidgetController::mount(&config).unwrap();

    widget.submit("Hi");
    widget.settle().await;

    let view = widget.view_model();
    assert!(!view.is_awaiting_reply);
    assert_eq!(view.display_messages.len(), 3);
    let last = view.display_messages.last().unwrap();
    assert_eq!(last.sender, Sender::Bot);
    assert_eq!(last.text, APOLOGY_TEXT);
}
