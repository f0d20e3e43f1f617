use super::*;
use serde_json::json;
use tokio::task::spawn_blocking;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server_uri: &str) -> OllamaChat {
    let url = Url::parse(server_uri).expect("mock server uri should parse");
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: url.host_str().expect("mock server uri has host").to_string(),
        port: url.port().expect("mock server uri has port"),
        embedding_model: "all-minilm:latest".to_string(),
        chat_model: "llama3".to_string(),
        batch_size: 16,
        embedding_dimension: 384,
    };
    OllamaChat::new(&config).expect("should create chat client")
}

#[test]
fn grounded_prompt_lists_facts_before_the_query() {
    let facts = vec![
        "Splits divide work items.".to_string(),
        "  Estimates track cost.  ".to_string(),
    ];

    let prompt = build_grounded_prompt("How do splits work?", &facts);

    assert_eq!(
        prompt,
        "Here are some known facts:\n\
         - Splits divide work items.\n\
         - Estimates track cost.\n\n\
         User query: How do splits work?"
    );
}

#[test]
fn grounded_prompt_with_no_facts_keeps_the_query() {
    let prompt = build_grounded_prompt("How do splits work?", &[]);

    assert_eq!(
        prompt,
        "Here are some known facts:\n\n\nUser query: How do splits work?"
    );
}

#[test]
fn send_rejects_an_empty_conversation() {
    let client = test_client("http://localhost:11434");
    let result = client.send(Vec::new(), &[]);
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn send_grounds_the_last_user_turn() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Here are some known facts:"))
        .and(body_string_contains("- Splits divide work items."))
        .and(body_string_contains("User query: How do splits work?"))
        .and(body_string_contains("\"stream\":false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Splits divide work."}}]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let messages = vec![
        ChatMessage::user("earlier question"),
        ChatMessage::assistant("earlier answer"),
        ChatMessage::user("How do splits work?"),
    ];
    let facts = vec!["Splits divide work items.".to_string()];

    let answer = spawn_blocking(move || client.send(messages, &facts))
        .await
        .expect("task should not panic")
        .expect("chat should succeed");

    assert_eq!(answer, "Splits divide work.");
}

#[tokio::test(flavor = "multi_thread")]
async fn earlier_turns_keep_their_wording() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("earlier question"))
        .and(body_string_contains("earlier answer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "ok"}}]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let messages = vec![
        ChatMessage::user("earlier question"),
        ChatMessage::assistant("earlier answer"),
        ChatMessage::user("follow-up"),
    ];

    let answer = spawn_blocking(move || client.send(messages, &[]))
        .await
        .expect("task should not panic")
        .expect("chat should succeed");

    assert_eq!(answer, "ok");
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_choices_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = spawn_blocking(move || client.send(vec![ChatMessage::user("hi")], &[]))
        .await
        .expect("task should not panic");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn blank_answer_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "   "}}]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = spawn_blocking(move || client.send(vec![ChatMessage::user("hi")], &[]))
        .await
        .expect("task should not panic");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_a_chat_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = spawn_blocking(move || client.send(vec![ChatMessage::user("hi")], &[]))
        .await
        .expect("task should not panic");

    assert!(result.is_err());
}
