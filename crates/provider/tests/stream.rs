//! Tests for the stream reader across the five dialects.

use bytes::Bytes;
use crabwire_provider::{Decoder, HttpResponse, Phase, StreamReader, StreamState};
use futures_util::{StreamExt, stream};
use tokio_util::sync::CancellationToken;
use wcore::{ChatEvent, Dialect, Error, FinishReason};

const OPENAI: &str = include_str!("fixtures/openai.sse");
const ANTHROPIC: &str = include_str!("fixtures/anthropic.sse");
const GOOGLE: &str = include_str!("fixtures/google.json");
const BAIDU: &str = include_str!("fixtures/baidu.txt");
const OLLAMA: &str = include_str!("fixtures/ollama.ndjson");

fn split(text: &str, size: usize) -> Vec<Vec<u8>> {
    text.as_bytes().chunks(size).map(<[u8]>::to_vec).collect()
}

fn reader(dialect: Dialect, status: u16, chunks: Vec<Vec<u8>>) -> StreamReader {
    let body = stream::iter(chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))));
    StreamReader::new(
        Decoder::new(dialect),
        HttpResponse::new(status, body),
        CancellationToken::new(),
    )
}

async fn decode(dialect: Dialect, chunks: Vec<Vec<u8>>) -> (Vec<ChatEvent>, StreamState) {
    let mut reader = reader(dialect, 200, chunks);
    let mut events = Vec::new();
    while let Some(event) = reader.next().await {
        events.push(event.expect("stream should not fail"));
    }
    assert_eq!(reader.phase(), Phase::Done);
    (events, reader.into_state())
}

fn start(index: u32, id: &str, name: &str) -> ChatEvent {
    ChatEvent::ToolCallStart {
        index,
        id: id.into(),
        name: name.into(),
    }
}

fn args(index: u32, fragment: &str) -> ChatEvent {
    ChatEvent::ToolCallArgsDelta {
        index,
        fragment: fragment.into(),
    }
}

fn finish(reason: FinishReason) -> ChatEvent {
    ChatEvent::Finish { reason }
}

#[tokio::test]
async fn event_stream_fixture() {
    let (events, state) = decode(Dialect::EventStream, vec![OPENAI.as_bytes().to_vec()]).await;
    assert_eq!(
        events,
        vec![
            ChatEvent::reasoning("Think"),
            ChatEvent::content("Hi"),
            ChatEvent::content(" there"),
            start(0, "call_abc", "calc--add"),
            args(0, "{\"a\": 1, "),
            args(0, "\"b\": 2}"),
            finish(FinishReason::ToolCalls),
            ChatEvent::usage(12, 9),
            ChatEvent::Done,
        ]
    );
    assert_eq!(state.reply, "Hi there");
    assert_eq!(state.reasoning, "Think");
    let calls = state.tool_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].parse_arguments().unwrap(),
        serde_json::json!({"a": 1, "b": 2})
    );
}

#[tokio::test]
async fn content_then_terminal_marker() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n\
                data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n\
                data: [DONE]\n\n";
    let (events, _) = decode(Dialect::EventStream, vec![body.as_bytes().to_vec()]).await;
    assert_eq!(
        events,
        vec![
            ChatEvent::content("Hi"),
            ChatEvent::content(" there"),
            ChatEvent::Done,
        ]
    );
}

#[tokio::test]
async fn split_document_decodes_once() {
    let chunks = vec![
        b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel".to_vec(),
        b"lo\"}}]}\n\n".to_vec(),
    ];
    let (events, _) = decode(Dialect::EventStream, chunks).await;
    assert_eq!(events, vec![ChatEvent::content("Hello"), ChatEvent::Done]);
}

#[tokio::test]
async fn every_split_frame_gets_its_own_retries() {
    let mut chunks = Vec::new();
    for i in 0..8 {
        chunks.push(format!("data: {{\"choices\":[{{\"delta\":{{\"con").into_bytes());
        chunks.push(format!("tent\":\"{i}\"}}}}]}}\n\n").into_bytes());
    }
    let (events, state) = decode(Dialect::EventStream, chunks).await;
    assert_eq!(state.reply, "01234567");
    assert_eq!(events.len(), 9);
}

#[tokio::test]
async fn fragment_dropped_after_retry_bound() {
    let mut chunks = vec![b"data: {\"choices\":[{\"delta\":".to_vec()];
    chunks.extend((0..6).map(|_| b" ".to_vec()));
    chunks.push(b"\ndata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n".to_vec());
    let (events, _) = decode(Dialect::EventStream, chunks).await;
    assert_eq!(events, vec![ChatEvent::content("ok"), ChatEvent::Done]);
}

#[tokio::test]
async fn decoding_is_deterministic() {
    for (dialect, fixture) in [
        (Dialect::EventStream, OPENAI),
        (Dialect::TypedEvent, ANTHROPIC),
        (Dialect::RawArray, GOOGLE),
        (Dialect::MarkedJson, BAIDU),
        (Dialect::NdJson, OLLAMA),
    ] {
        let first = decode(dialect, split(fixture, 97)).await.0;
        let second = decode(dialect, split(fixture, 97)).await.0;
        assert_eq!(first, second, "{dialect:?}");
        assert_eq!(first.last(), Some(&ChatEvent::Done), "{dialect:?}");
    }
}

#[tokio::test]
async fn line_dialects_survive_any_reasonable_split() {
    for (dialect, fixture) in [
        (Dialect::EventStream, OPENAI),
        (Dialect::TypedEvent, ANTHROPIC),
        (Dialect::MarkedJson, BAIDU),
        (Dialect::NdJson, OLLAMA),
    ] {
        let whole = decode(dialect, vec![fixture.as_bytes().to_vec()]).await.0;
        for size in [64, 97, 150] {
            let split = decode(dialect, split(fixture, size)).await.0;
            assert_eq!(whole, split, "{dialect:?} split every {size} bytes");
        }
    }
}

#[tokio::test]
async fn tool_arguments_concatenate_across_splits() {
    let fragments = ["{\"path\": \"/tmp/", "a b\", \"lines\"", ": [1, 2", "]}"];
    let mut body = String::from(
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"c\",\"function\":{\"name\":\"fs--read\"}}]}}]}\n",
    );
    for fragment in fragments {
        let frame = serde_json::json!({
            "choices": [{ "delta": { "tool_calls": [{ "index": 0, "function": { "arguments": fragment } }] } }]
        });
        body.push_str(&format!("data: {frame}\n"));
    }
    body.push_str("data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n");

    let expected = serde_json::json!({"path": "/tmp/a b", "lines": [1, 2]});
    for size in [40, 80, body.len()] {
        let (_, state) = decode(Dialect::EventStream, split(&body, size)).await;
        let calls = state.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].parse_arguments().unwrap(), expected);
    }
}

#[tokio::test]
async fn non_streamed_completion_document() {
    let body = r#"{
  "id": "chatcmpl-1",
  "object": "chat.completion",
  "choices": [
    {
      "index": 0,
      "message": { "role": "assistant", "content": "Hi" },
      "finish_reason": "stop"
    }
  ],
  "usage": { "prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4 }
}"#;
    let (events, state) = decode(Dialect::EventStream, split(body, 50)).await;
    assert_eq!(
        events,
        vec![
            ChatEvent::content("Hi"),
            finish(FinishReason::Stop),
            ChatEvent::usage(3, 1),
            ChatEvent::Done,
        ]
    );
    assert_eq!(state.reply, "Hi");
}

#[tokio::test]
async fn in_stream_error_frame() {
    let body = "data: {\"error\":{\"message\":\"overloaded\",\"type\":\"server_error\",\"code\":503}}\n\n";
    let mut reader = reader(Dialect::EventStream, 200, vec![body.as_bytes().to_vec()]);
    let event = reader.next().await.unwrap().unwrap();
    assert_eq!(
        event,
        ChatEvent::ProviderError {
            code: Some("503".into()),
            message: "overloaded".into(),
        }
    );
    assert!(reader.next().await.is_none());
    assert_eq!(reader.phase(), Phase::Failed);
    assert_eq!(reader.state().error.as_deref(), Some("overloaded"));
}

#[tokio::test]
async fn typed_event_fixture() {
    let (events, state) = decode(Dialect::TypedEvent, vec![ANTHROPIC.as_bytes().to_vec()]).await;
    assert_eq!(
        events,
        vec![
            ChatEvent::usage(10, 1),
            ChatEvent::reasoning("Adding."),
            ChatEvent::content("Hello"),
            start(2, "toolu_1", "calc--add"),
            args(2, "{\"a\":"),
            args(2, " 1}"),
            ChatEvent::usage(10, 16),
            finish(FinishReason::ToolCalls),
            ChatEvent::Done,
        ]
    );
    assert_eq!(state.reply, "Hello");
    assert_eq!(state.usage.input_tokens, 10);
    assert_eq!(state.tool_calls()[0].arguments, "{\"a\": 1}");
}

#[tokio::test]
async fn typed_event_turn_start_content_stop() {
    let body = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"usage\":{\"input_tokens\":10,\"output_tokens\":0}}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n",
    );
    let (_, state) = decode(Dialect::TypedEvent, vec![body.as_bytes().to_vec()]).await;
    assert_eq!(state.reply, "Hello");
    assert_eq!(state.usage.input_tokens, 10);
    assert!(state.done);
}

#[tokio::test]
async fn typed_event_final_usage_overrides() {
    let body = concat!(
        "data: {\"type\":\"message_start\",\"message\":{\"usage\":{\"input_tokens\":10,\"output_tokens\":1}}}\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":4}}\n",
        "data: {\"type\":\"message_stop\",\"usage\":{\"input_tokens\":11,\"output_tokens\":6}}\n",
    );
    let (events, state) = decode(Dialect::TypedEvent, vec![body.as_bytes().to_vec()]).await;
    assert_eq!(events[1], ChatEvent::usage(10, 5));
    assert_eq!(state.usage, wcore::Usage { input_tokens: 11, output_tokens: 6 });
}

#[tokio::test]
async fn raw_array_fixture() {
    let boundary = GOOGLE.find("\n,\n").expect("fixture has two elements");
    let chunks = vec![
        GOOGLE[..boundary].as_bytes().to_vec(),
        GOOGLE[boundary..].as_bytes().to_vec(),
    ];
    let (events, state) = decode(Dialect::RawArray, chunks).await;
    assert_eq!(
        events,
        vec![
            ChatEvent::content("Hello \"world\"\nline two"),
            ChatEvent::usage(8, 3),
            start(0, "call_0", "calc--add"),
            args(0, "{\"a\":1,\"b\":\"{2}\"}"),
            ChatEvent::usage(8, 7),
            finish(FinishReason::ToolCalls),
            ChatEvent::Done,
        ]
    );
    assert_eq!(state.tool_calls().len(), 1);
}

#[tokio::test]
async fn marked_json_fixture_with_split_characters() {
    let (events, state) = decode(Dialect::MarkedJson, split(BAIDU, 61)).await;
    assert_eq!(
        events,
        vec![
            ChatEvent::content("你好"),
            ChatEvent::content("，世界"),
            ChatEvent::usage(4, 6),
            finish(FinishReason::Stop),
            ChatEvent::Done,
        ]
    );
    assert_eq!(state.reply, "你好，世界");
}

#[tokio::test]
async fn marked_json_unmarked_error_line() {
    let body = "{\"error_code\":110,\"error_msg\":\"Access token invalid or no longer valid\"}\n";
    let mut reader = reader(Dialect::MarkedJson, 200, vec![body.as_bytes().to_vec()]);
    assert_eq!(
        reader.next().await.unwrap().unwrap(),
        ChatEvent::ProviderError {
            code: Some("110".into()),
            message: "Access token invalid or no longer valid".into(),
        }
    );
    assert!(reader.next().await.is_none());
}

#[tokio::test]
async fn ndjson_fixture_carries_continuation() {
    let (events, state) = decode(Dialect::NdJson, split(OLLAMA, 64)).await;
    assert_eq!(
        events,
        vec![
            ChatEvent::reasoning("hmm"),
            ChatEvent::content("Hel"),
            ChatEvent::content("lo"),
            ChatEvent::usage(5, 2),
            ChatEvent::Continuation {
                token: serde_json::json!([1, 2, 3])
            },
            finish(FinishReason::Stop),
            ChatEvent::Done,
        ]
    );
    assert_eq!(state.continuation, Some(serde_json::json!([1, 2, 3])));
}

#[tokio::test]
async fn utf8_split_inside_a_character() {
    let line = "{\"response\":\"é\",\"done\":false}\n".as_bytes();
    let cut = line.iter().position(|b| *b >= 0x80).unwrap() + 1;
    let mut decoder = Decoder::new(Dialect::NdJson);
    assert!(decoder.feed(&line[..cut]).is_empty());
    assert_eq!(decoder.feed(&line[cut..]), vec![ChatEvent::content("é")]);
}

#[tokio::test]
async fn error_status_prefers_structured_message() {
    let body = r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#;
    let mut reader = reader(Dialect::EventStream, 429, split(body, 16));
    let err = reader.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 429, .. }));
    assert_eq!(err.to_string(), "http 429: Rate limit reached");
    assert!(reader.next().await.is_none());
    assert_eq!(reader.phase(), Phase::Failed);
}

#[tokio::test]
async fn abort_halts_emission() {
    let cancel = CancellationToken::new();
    let first = b"data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n".to_vec();
    let body = stream::iter(vec![Ok(Bytes::from(first))]).chain(stream::pending());
    let mut reader = StreamReader::new(
        Decoder::new(Dialect::EventStream),
        HttpResponse::new(200, body),
        cancel.clone(),
    );

    assert_eq!(
        reader.next().await.unwrap().unwrap(),
        ChatEvent::content("partial")
    );
    let trigger = cancel.clone();
    tokio::spawn(async move { trigger.cancel() });
    assert!(reader.next().await.unwrap().unwrap_err().is_aborted());
    assert!(reader.next().await.is_none());
    assert_eq!(reader.phase(), Phase::Aborted);
    assert!(reader.state().aborted);
    assert_eq!(reader.state().reply, "partial");
}

#[tokio::test]
async fn into_stream_yields_the_same_events() {
    let events: Vec<_> = reader(Dialect::NdJson, 200, vec![OLLAMA.as_bytes().to_vec()])
        .into_stream()
        .map(|event| event.unwrap())
        .collect()
        .await;
    assert_eq!(events.len(), 7);
}
