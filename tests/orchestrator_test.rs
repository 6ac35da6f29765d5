//! Chat orchestrator tests: one user turn from request to saved conversation.

mod common;

use std::time::Duration;

use bytes::Bytes;
use common::{api_url, Recorder, BASE_URL};
use ollama_chat::adapters::mock::{InMemoryStore, MockHttpClient, MockResponse};
use ollama_chat::api::ApiClient;
use ollama_chat::error::ChatError;
use ollama_chat::models::{ChatMessage, Conversation, GenerationSettings, Role};
use ollama_chat::orchestrator::ChatOrchestrator;
use ollama_chat::session::{CancelHandle, SessionState, StreamUpdate};
use ollama_chat::traits::ConversationStore;
use serde_json::json;

fn orchestrator(http: &MockHttpClient, store: &InMemoryStore) -> ChatOrchestrator<MockHttpClient, InMemoryStore> {
    ChatOrchestrator::new(ApiClient::new(BASE_URL, http.clone()), store.clone())
        .with_default_model(Some("llama3".to_string()))
}

fn streamed_reply(http: &MockHttpClient) {
    http.set_response(
        &api_url("chat"),
        MockResponse::ndjson_lines(&[
            r#"{"message":{"role":"assistant","content":"Paris"}}"#,
            r#"{"message":{"role":"assistant","content":"."}}"#,
            r#"{"done":true}"#,
        ]),
    );
}

#[tokio::test]
async fn test_streaming_turn_is_saved() {
    let http = MockHttpClient::new();
    let store = InMemoryStore::new();
    streamed_reply(&http);
    let chat = orchestrator(&http, &store);
    let mut conversation = Conversation::new();
    let mut recorder = Recorder::default();

    let outcome = chat
        .send(
            &mut conversation,
            "What is the capital of France?",
            &GenerationSettings::default(),
            &CancelHandle::new(),
            &mut recorder.observer(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(outcome.message.content, "Paris.");
    assert_eq!(recorder.deltas(), vec!["Paris", "."]);

    assert!(!conversation.id.is_empty());
    assert_eq!(conversation.title, "What is the capital of France?");
    assert!(conversation.created_at.is_some());
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[0].role, Role::User);
    assert_eq!(conversation.messages[1].role, Role::Assistant);
    assert_eq!(conversation.messages[1].content, "Paris.");
    assert_eq!(conversation.settings.model.as_deref(), Some("llama3"));

    let stored = store.get_conversation(&conversation.id).unwrap();
    assert_eq!(stored.messages, conversation.messages);
    assert_eq!(store.save_count(), 1);
    assert!(!chat.is_active(&conversation.id));
}

#[tokio::test]
async fn test_request_carries_system_and_history() {
    let http = MockHttpClient::new();
    let store = InMemoryStore::new();
    streamed_reply(&http);
    let chat = orchestrator(&http, &store);
    let mut conversation = Conversation::new()
        .with_id("c1")
        .with_title("Geography")
        .with_system("Answer in one word.");
    conversation.messages.push(ChatMessage::user("Capital of Italy?"));
    conversation.messages.push(ChatMessage {
        thinking: Some("Easy.".to_string()),
        ..ChatMessage::assistant("Rome.")
    });

    chat.send(
        &mut conversation,
        "And France?",
        &GenerationSettings::default().with_model("mistral").with_temperature(0.2),
        &CancelHandle::new(),
        &mut |_: &StreamUpdate, _: &ollama_chat::session::AssistantMessage| {},
    )
    .await
    .unwrap();

    let body = http.get_requests()[0].json_body().unwrap();
    assert_eq!(body["model"], "mistral");
    assert_eq!(body["stream"], true);
    let temperature = body["options"]["temperature"].as_f64().unwrap();
    assert!((temperature - 0.2).abs() < 1e-6);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0], json!({"role": "system", "content": "Answer in one word."}));
    assert_eq!(messages[2]["content"], "Rome.");
    assert!(messages[2].get("thinking").is_none());
    assert_eq!(messages[3], json!({"role": "user", "content": "And France?"}));

    assert_eq!(conversation.title, "Geography");
    assert_eq!(conversation.messages.len(), 4);
}

#[tokio::test]
async fn test_tool_call_turn_is_saved() {
    let http = MockHttpClient::new();
    let store = InMemoryStore::new();
    http.set_response(
        &api_url("chat"),
        MockResponse::ndjson_lines(&[
            r#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"get_weather","arguments":{"city":"Oslo"}}}]}}"#,
            r#"{"done":true}"#,
        ]),
    );
    let chat = orchestrator(&http, &store);
    let mut conversation = Conversation::new();
    let mut recorder = Recorder::default();

    let outcome = chat
        .send(
            &mut conversation,
            "Weather in Oslo?",
            &GenerationSettings::default(),
            &CancelHandle::new(),
            &mut recorder.observer(),
        )
        .await
        .unwrap();

    let call = json!({"function": {"name": "get_weather", "arguments": {"city": "Oslo"}}});
    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(outcome.message.tool_calls, vec![call.clone()]);
    assert_eq!(
        recorder.updates,
        vec![
            StreamUpdate::ToolCalls {
                calls: vec![call.clone()],
            },
            StreamUpdate::Finished(SessionState::Completed),
        ]
    );
    assert_eq!(conversation.messages[1].tool_calls, Some(vec![call.clone()]));

    let stored = store.get_conversation(&conversation.id).unwrap();
    assert_eq!(stored.messages[1].tool_calls, Some(vec![call]));
}

#[tokio::test]
async fn test_empty_replies_are_left_out_of_history() {
    let http = MockHttpClient::new();
    let store = InMemoryStore::new();
    streamed_reply(&http);
    let chat = orchestrator(&http, &store);
    let mut conversation = Conversation::new().with_id("c2");
    conversation.messages.push(ChatMessage::user("Hello?"));
    conversation.messages.push(ChatMessage::assistant(""));

    chat.send(
        &mut conversation,
        "Hello again",
        &GenerationSettings::default(),
        &CancelHandle::new(),
        &mut |_: &StreamUpdate, _: &ollama_chat::session::AssistantMessage| {},
    )
    .await
    .unwrap();

    let body = http.get_requests()[0].json_body().unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "Hello?");
    assert_eq!(messages[1]["content"], "Hello again");
    assert_eq!(conversation.messages.len(), 4);
}

#[tokio::test]
async fn test_non_streaming_turn() {
    let http = MockHttpClient::new();
    let store = InMemoryStore::new();
    http.set_response(
        &api_url("chat"),
        MockResponse::json(json!({
            "model": "llama3",
            "message": {"role": "assistant", "content": "Hello there", "thinking": "greet"},
            "done": true
        })),
    );
    let chat = orchestrator(&http, &store);
    let mut conversation = Conversation::new();
    let mut recorder = Recorder::default();

    let outcome = chat
        .send(
            &mut conversation,
            "Hi",
            &GenerationSettings::default().with_stream(false),
            &CancelHandle::new(),
            &mut recorder.observer(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(outcome.message.content, "Hello there");
    assert_eq!(conversation.messages[1].thinking.as_deref(), Some("greet"));
    assert_eq!(http.get_requests()[0].json_body().unwrap()["stream"], false);
    assert_eq!(recorder.finished_count(), 1);
}

#[tokio::test]
async fn test_blank_message_is_rejected() {
    let http = MockHttpClient::new();
    let store = InMemoryStore::new();
    let chat = orchestrator(&http, &store);
    let mut conversation = Conversation::new();

    let result = chat
        .send(
            &mut conversation,
            "  \n ",
            &GenerationSettings::default(),
            &CancelHandle::new(),
            &mut |_: &StreamUpdate, _: &ollama_chat::session::AssistantMessage| {},
        )
        .await;

    assert!(matches!(result, Err(ChatError::EmptyMessage)));
    assert!(conversation.messages.is_empty());
    assert!(http.get_requests().is_empty());
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn test_missing_model_is_rejected() {
    let http = MockHttpClient::new();
    let store = InMemoryStore::new();
    let chat = ChatOrchestrator::new(ApiClient::new(BASE_URL, http.clone()), store.clone());
    let mut conversation = Conversation::new();

    let result = chat
        .send(
            &mut conversation,
            "Hi",
            &GenerationSettings::default(),
            &CancelHandle::new(),
            &mut |_: &StreamUpdate, _: &ollama_chat::session::AssistantMessage| {},
        )
        .await;

    assert!(matches!(result, Err(ChatError::MissingModel)));
    assert!(http.get_requests().is_empty());
}

#[tokio::test]
async fn test_failed_stream_is_still_saved() {
    let http = MockHttpClient::new();
    let store = InMemoryStore::new();
    http.set_response(
        &api_url("chat"),
        MockResponse::ndjson_lines(&[r#"{"message":{"content":"Partial"}}"#]),
    );
    let chat = orchestrator(&http, &store);
    let mut conversation = Conversation::new();

    let outcome = chat
        .send(
            &mut conversation,
            "Hi",
            &GenerationSettings::default(),
            &CancelHandle::new(),
            &mut |_: &StreamUpdate, _: &ollama_chat::session::AssistantMessage| {},
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, SessionState::Failed);
    let stored = store.get_conversation(&conversation.id).unwrap();
    assert_eq!(stored.messages[1].content, "Partial");
    assert_eq!(stored.messages[1].errors.len(), 1);
    assert!(stored.messages[1].errors[0].contains("stream ended before completion"));
}

#[tokio::test]
async fn test_store_failure_keeps_reply() {
    let http = MockHttpClient::new();
    let store = InMemoryStore::new();
    store.set_save_should_fail(true);
    streamed_reply(&http);
    let chat = orchestrator(&http, &store);
    let mut conversation = Conversation::new();

    let result = chat
        .send(
            &mut conversation,
            "Capital of France?",
            &GenerationSettings::default(),
            &CancelHandle::new(),
            &mut |_: &StreamUpdate, _: &ollama_chat::session::AssistantMessage| {},
        )
        .await;

    assert!(matches!(result, Err(ChatError::Store(_))));
    assert_eq!(conversation.messages[1].content, "Paris.");
    assert!(!chat.is_active(&conversation.id));
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_send_on_same_conversation() {
    let http = MockHttpClient::new();
    let store = InMemoryStore::new();
    http.set_response(
        &api_url("chat"),
        MockResponse::StreamThenPending(vec![Bytes::from("{\"message\":{\"content\":\"thinking...\"}}\n")]),
    );
    let chat = orchestrator(&http, &store);
    let cancel = CancelHandle::new();
    let mut first = Conversation::new().with_id("shared");
    let mut second = Conversation::new().with_id("shared");

    let settings = GenerationSettings::default();
    let mut quiet = |_: &StreamUpdate, _: &ollama_chat::session::AssistantMessage| {};
    let running = chat.send(&mut first, "Long question", &settings, &cancel, &mut quiet);
    let competing = async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(chat.is_active("shared"));
        let result = chat
            .send(
                &mut second,
                "Another",
                &GenerationSettings::default(),
                &CancelHandle::new(),
                &mut |_: &StreamUpdate, _: &ollama_chat::session::AssistantMessage| {},
            )
            .await;
        cancel.abort();
        result
    };
    let (first_result, second_result) = tokio::join!(running, competing);

    assert!(matches!(second_result, Err(ChatError::SessionActive(id)) if id == "shared"));
    assert!(second.messages.is_empty());

    let outcome = first_result.unwrap();
    assert_eq!(outcome.state, SessionState::Aborted);
    assert_eq!(outcome.message.content, "thinking...");
    assert!(!chat.is_active("shared"));
    assert_eq!(
        store.get_conversation("shared").unwrap().messages[1].content,
        "thinking..."
    );
}

#[tokio::test]
async fn test_aborted_before_send_saves_empty_reply() {
    let http = MockHttpClient::new();
    let store = InMemoryStore::new();
    streamed_reply(&http);
    let chat = orchestrator(&http, &store);
    let cancel = CancelHandle::new();
    cancel.abort();
    let mut conversation = Conversation::new();

    let outcome = chat
        .send(
            &mut conversation,
            "Hi",
            &GenerationSettings::default(),
            &cancel,
            &mut |_: &StreamUpdate, _: &ollama_chat::session::AssistantMessage| {},
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, SessionState::Aborted);
    assert!(http.get_requests().is_empty());
    assert_eq!(conversation.messages[1].content, "");
    assert_eq!(store.save_count(), 1);
}
