use std::sync::Arc;

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::chat::RequestLogger;
use crate::message::{ChatRequest, GenerateOptions, Message};
use crate::provider::LlmProvider;
use crate::providers::ollama::OllamaProvider;
use crate::providers::openai::OpenAiProvider;

fn hello_request() -> ChatRequest {
    ChatRequest::new(
        "llama3.2",
        vec![
            Message::system("You are a fellow Rust developer."),
            Message::human("Provide 3 short bullet points explaining why Rust is awesome"),
        ],
    )
}

#[tokio::test]
async fn test_ollama_chat_basic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "stream": false,
            "messages": [
                {"role": "system", "content": "You are a fellow Rust developer."},
                {"role": "user", "content": "Provide 3 short bullet points explaining why Rust is awesome"}
            ],
            "options": {"temperature": 0.0, "top_k": 1, "seed": 42}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "created_at": "2025-03-03T12:46:55.177874Z",
            "message": {"role": "assistant", "content": "- memory safety"},
            "done_reason": "stop",
            "done": true,
            "prompt_eval_count": 26,
            "eval_count": 8
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(Some(server.uri()));
    let request = hello_request().with_options(GenerateOptions::new().temperature(0.0).top_k(1).seed(42));
    let completion = provider.chat(request).await.unwrap();

    assert_eq!(completion.model, "llama3.2");
    assert_eq!(completion.texts(), vec!["- memory safety"]);
    assert_eq!(completion.choices[0].stop_reason.as_deref(), Some("stop"));
    assert_eq!(completion.total_tokens(), 34);
}

#[tokio::test]
async fn test_ollama_chat_stream_ndjson() {
    let server = MockServer::start().await;
    let body = [
        r#"{"model":"llama3.2","message":{"role":"assistant","content":"How"},"done":false}"#,
        r#"{"model":"llama3.2","message":{"role":"assistant","content":" can"},"done":false}"#,
        r#"{"model":"llama3.2","message":{"role":"assistant","content":""},"done_reason":"stop","done":true,"prompt_eval_count":26,"eval_count":8}"#,
    ]
    .join("\n");

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "application/x-ndjson"))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(Some(server.uri()));
    let mut stream = provider.chat_stream(hello_request()).await.unwrap();

    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk.unwrap());
    }

    assert_eq!(chunks.len(), 3);
    let text: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(text, "How can");
    assert_eq!(chunks[2].stop_reason.as_deref(), Some("stop"));
    assert_eq!(chunks[2].generation_info.as_ref().and_then(|i| i.total_tokens), Some(34));
}

#[tokio::test]
async fn test_ollama_stream_error_line() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"error":"model 'llama3.2' not found"}"#.as_bytes().to_vec(),
            "application/x-ndjson",
        ))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(Some(server.uri()));
    let mut stream = provider.chat_stream(hello_request()).await.unwrap();
    let first = stream.next().await.unwrap();
    assert!(first.unwrap_err().to_string().contains("not found"));
}

#[tokio::test]
async fn test_ollama_sends_binary_images_as_base64() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "messages": [{
                "role": "user",
                "content": "Please tell me what you see in this image",
                "images": ["AQID"]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "moondream:1.8b",
            "message": {"role": "assistant", "content": "A cat."},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(Some(server.uri()));
    let message = Message::human("Please tell me what you see in this image").with_binary("image/jpg", vec![1, 2, 3]);
    let completion = provider
        .chat(ChatRequest::new("moondream:1.8b", vec![message]))
        .await
        .unwrap();
    assert_eq!(completion.content(), "A cat.");
}

#[tokio::test]
async fn test_ollama_rejects_remote_image_url() {
    let provider = OllamaProvider::new(Some("http://127.0.0.1:1".to_string()));
    let message = Message::human("what is this?").with_image_url("https://example.com/cat.jpeg");
    let result = provider.chat(ChatRequest::new("moondream:1.8b", vec![message])).await;
    assert!(result.unwrap_err().to_string().contains("remote images"));
}

#[tokio::test]
async fn test_ollama_embed_and_models() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"model": "all-minilm:22m", "input": ["a", "b"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "all-minilm:22m",
            "embeddings": [[0.1, 0.2], [0.3, 0.4]]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "all-minilm:22m"}, {"name": "llama3.2:1b"}]
        })))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(Some(server.uri()));
    let vectors = provider
        .embed("all-minilm:22m", &["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);

    assert_eq!(provider.models().await.unwrap().len(), 2);
    assert_eq!(provider.default_model().await.unwrap(), "llama3.2:1b");
}

#[tokio::test]
async fn test_ollama_http_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(Some(server.uri()));
    let err = provider.chat(hello_request()).await.unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_openai_chat_basic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-4o", "stream": false, "temperature": 0.5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello! How can I assist you today?"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 15, "total_tokens": 27}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::compatible("sk-test".to_string(), server.uri());
    let request = ChatRequest::new("gpt-4o", vec![Message::human("Hello?")])
        .with_options(GenerateOptions::new().temperature(0.5));
    let completion = provider.chat(request).await.unwrap();

    assert_eq!(completion.content(), "Hello! How can I assist you today?");
    assert_eq!(completion.choices[0].stop_reason.as_deref(), Some("stop"));
    assert_eq!(completion.total_tokens(), 27);
    assert_eq!(provider.name(), "openai_compatible");
}

#[tokio::test]
async fn test_openai_chat_stream_sse() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream"))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::compatible("sk-test".to_string(), server.uri());
    let mut stream = provider
        .chat_stream(ChatRequest::new("gpt-4o", vec![Message::human("Hello?")]))
        .await
        .unwrap();

    let mut text = String::new();
    let mut stop_reason = None;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.unwrap();
        text.push_str(&chunk.content);
        if chunk.stop_reason.is_some() {
            stop_reason = chunk.stop_reason;
        }
    }
    assert_eq!(text, "Hello");
    assert_eq!(stop_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn test_openai_image_parts_and_tool_role() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                {
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "describe"},
                        {"type": "image_url", "image_url": {"url": "data:image/png;base64,AQID"}}
                    ]
                },
                {"role": "user", "content": "ID: 94"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}, "finish_reason": "stop"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::compatible(String::new(), server.uri());
    let messages = vec![
        Message::human("describe").with_binary("image/png", vec![1, 2, 3]),
        Message::tool("ID: 94"),
    ];
    let completion = provider.chat(ChatRequest::new("gpt-4o", messages)).await.unwrap();
    assert_eq!(completion.model, "gpt-4o");
    assert_eq!(completion.content(), "ok");
}

#[tokio::test]
async fn test_openai_embeddings_sorted_by_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
            ]
        })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::compatible("sk-test".to_string(), server.uri());
    let vectors = provider
        .embed("text-embedding-3-small", &["first".to_string(), "second".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

async fn sent_chat_body(provider: &OpenAiProvider, server: &MockServer) -> serde_json::Value {
    let request = ChatRequest::new("gpt-4o", vec![Message::human("Hello?")])
        .with_options(GenerateOptions::new().temperature(0.0).top_k(1).seed(42));
    provider.chat(request).await.unwrap();

    let received = server.received_requests().await.unwrap();
    serde_json::from_slice(&received.last().unwrap().body).unwrap()
}

#[tokio::test]
async fn test_openai_leaves_out_top_k() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}, "finish_reason": "stop"}]
        })))
        .mount(&server)
        .await;

    let openai = OpenAiProvider::with_base_url("sk-test".to_string(), server.uri());
    let body = sent_chat_body(&openai, &server).await;
    assert!(body.get("top_k").is_none(), "{}", body);
    assert_eq!(body["temperature"], json!(0.0));
    assert_eq!(body["seed"], json!(42));
    assert_eq!(openai.name(), "openai");

    let compatible = OpenAiProvider::compatible("sk-test".to_string(), server.uri());
    let body = sent_chat_body(&compatible, &server).await;
    assert_eq!(body["top_k"], json!(1));
}

#[tokio::test]
async fn test_request_logger_keeps_payload_intact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "llama3.2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "logged"},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut provider = OllamaProvider::new(Some(server.uri()));
    provider.set_hooks(Arc::new(RequestLogger::new().with_responses(true)));
    let completion = provider.chat(hello_request()).await.unwrap();
    assert_eq!(completion.content(), "logged");
}

/// Live check against a real ollama serving all-minilm:22m
#[tokio::test]
async fn test_live_ollama_embedding_similarity() {
    let Ok(url) = std::env::var("GENAI_TEST_OLLAMA_URL") else {
        println!("Skipping live ollama embedding test: GENAI_TEST_OLLAMA_URL not set");
        return;
    };

    let provider = OllamaProvider::new(Some(url));
    let sentences: Vec<String> = [
        "A cat is a small domesticated carnivorous mammal",
        "A tiger is a large carnivorous feline mammal",
        "Testcontainers is a library providing throwaway instances of anything that can run in a Docker container",
        "Docker is a platform designed to help developers build, share, and run container applications",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let vectors = provider.embed("all-minilm:22m", &sentences).await.unwrap();
    let sim = |i: usize, j: usize| crate::similarity::cosine_similarity(&vectors[i], &vectors[j]).unwrap();

    assert!((sim(0, 0) - 1.0).abs() < 1e-4);
    assert!(sim(2, 3) > sim(0, 2));
    assert!(sim(2, 3) > sim(1, 3));
}
