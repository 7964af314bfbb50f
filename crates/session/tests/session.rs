//! Tests for the chat session and its tool chain.

use crabwire_session::{Callbacks, ChatSession, StaticRegistry, ToolOutput};
use provider::{
    catalog,
    testing::{Scripted, ScriptedTransport},
};
use serde_json::{Value, json};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Notify;
use wcore::{
    ConversationState, Credentials, Error, Field, InputSchema, Message, ProviderProfile, Tool,
    Usage,
};

type Session = ChatSession<ScriptedTransport, StaticRegistry>;

fn frame(value: Value) -> String {
    format!("data: {value}\n\n")
}

fn usage(input: u32, output: u32) -> String {
    frame(json!({
        "choices": [],
        "usage": { "prompt_tokens": input, "completion_tokens": output },
    }))
}

fn reply(text: &str, input: u32, output: u32) -> Scripted {
    Scripted::ok([
        frame(json!({ "choices": [{ "delta": { "content": text }, "finish_reason": "stop" }] })),
        usage(input, output),
        "data: [DONE]\n\n".to_owned(),
    ])
}

fn call(id: &str, name: &str, args: &str, input: u32, output: u32) -> Scripted {
    Scripted::ok([
        frame(json!({
            "choices": [{ "delta": { "tool_calls": [{
                "index": 0,
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": args },
            }] } }]
        })),
        frame(json!({ "choices": [{ "delta": {}, "finish_reason": "tool_calls" }] })),
        usage(input, output),
        "data: [DONE]\n\n".to_owned(),
    ])
}

fn adder(calls: Arc<AtomicUsize>) -> StaticRegistry {
    let registry = StaticRegistry::new();
    registry.register(
        Tool::new(
            "calc--add",
            "Add two numbers",
            InputSchema::default()
                .property("a", json!({ "type": "number" }), true)
                .property("b", json!({ "type": "number" }), true),
        ),
        move |args: Value| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let a = args["a"].as_i64().unwrap_or_default();
                let b = args["b"].as_i64().unwrap_or_default();
                ToolOutput::ok((a + b).to_string())
            }
        },
    );
    registry
}

fn session(
    profile: &'static ProviderProfile,
    transport: &Arc<ScriptedTransport>,
    registry: StaticRegistry,
) -> Session {
    ChatSession::new(
        profile,
        Credentials::key("sk-test"),
        ConversationState::new(profile.name),
        transport.clone(),
        Arc::new(registry),
    )
}

#[derive(Default)]
struct Counters {
    complete: AtomicUsize,
    error: AtomicUsize,
    aborted: AtomicUsize,
}

fn counting(counters: &Arc<Counters>) -> Callbacks {
    let (complete, error) = (counters.clone(), counters.clone());
    Callbacks::default()
        .on_complete(move |_| {
            complete.complete.fetch_add(1, Ordering::SeqCst);
        })
        .on_error(move |_, aborted| {
            error.error.fetch_add(1, Ordering::SeqCst);
            if aborted {
                error.aborted.fetch_add(1, Ordering::SeqCst);
            }
        })
}

fn body(transport: &ScriptedTransport, index: usize) -> Value {
    transport.requests()[index].body.clone().unwrap()
}

#[tokio::test]
async fn plain_reply_completes_once() {
    let transport = Arc::new(ScriptedTransport::new([reply("Hi", 5, 1)]));
    let counters = Arc::new(Counters::default());
    let text = Arc::new(parking_lot::Mutex::new(String::new()));
    let sink = text.clone();
    let session = session(&catalog::OPENAI, &transport, StaticRegistry::new()).with_callbacks(
        counting(&counters).on_reading(move |content, _| sink.lock().push_str(content)),
    );

    let result = session.chat(vec![Message::user("hello")]).await.unwrap();
    assert!(result.is_ok());
    assert_eq!(result.reply, "Hi");
    assert_eq!(*text.lock(), "Hi");
    assert_eq!(result.usage, Usage { input_tokens: 5, output_tokens: 1 });
    assert_eq!(result.requests, 1);
    assert_eq!(counters.complete.load(Ordering::SeqCst), 1);
    assert_eq!(counters.error.load(Ordering::SeqCst), 0);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn tool_chain_sums_usage_over_every_cycle() {
    let transport = Arc::new(ScriptedTransport::new([
        call("call_a", "calc--add", r#"{"a": 1, "b": 2}"#, 10, 5),
        call("call_b", "calc--add", r#"{"a": 3, "b": 4}"#, 20, 6),
        reply("7", 30, 7),
    ]));
    let invoked = Arc::new(AtomicUsize::new(0));
    let counters = Arc::new(Counters::default());
    let names = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));
    let seen = names.clone();
    let session = session(&catalog::OPENAI, &transport, adder(invoked.clone())).with_callbacks(
        counting(&counters).on_tool_calls(move |name| seen.lock().push(name.to_owned())),
    );

    let result = session.chat(vec![Message::user("add")]).await.unwrap();
    assert!(result.is_ok());
    assert_eq!(result.reply, "7");
    assert_eq!(result.requests, 3);
    assert_eq!(result.usage, Usage { input_tokens: 60, output_tokens: 18 });
    assert_eq!(invoked.load(Ordering::SeqCst), 2);
    assert_eq!(*names.lock(), ["calc--add", "calc--add"]);
    assert_eq!(counters.complete.load(Ordering::SeqCst), 1);

    let first = body(&transport, 0);
    assert_eq!(first["tools"][0]["function"]["name"], "calc--add");

    let last = body(&transport, 2);
    let messages = last["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[1]["tool_calls"][0]["id"], "call_a");
    assert_eq!(
        messages[2],
        json!({ "role": "tool", "tool_call_id": "call_a", "content": "3" })
    );
    assert_eq!(
        messages[4],
        json!({ "role": "tool", "tool_call_id": "call_b", "content": "7" })
    );
}

#[tokio::test]
async fn tool_failure_is_fed_back() {
    let transport = Arc::new(ScriptedTransport::new([
        call("call_a", "fs--read", r#"{"path": "/tmp/x"}"#, 1, 1),
        reply("cannot read it", 2, 2),
    ]));
    let counters = Arc::new(Counters::default());
    let session = session(&catalog::OPENAI, &transport, StaticRegistry::new())
        .with_callbacks(counting(&counters));

    let result = session.chat(vec![Message::user("read")]).await.unwrap();
    assert!(result.is_ok());
    assert_eq!(result.reply, "cannot read it");
    assert_eq!(counters.error.load(Ordering::SeqCst), 0);

    let fed = &body(&transport, 1)["messages"][2];
    assert_eq!(fed["role"], "tool");
    let content = fed["content"].as_str().unwrap();
    assert!(content.contains("fs--read"), "{content}");
    assert!(content.contains("not available"), "{content}");
}

#[tokio::test]
async fn invalid_arguments_are_fed_back() {
    let transport = Arc::new(ScriptedTransport::new([
        call("call_a", "calc--add", r#"{"a": 1,"#, 1, 1),
        reply("sorry", 1, 1),
    ]));
    let invoked = Arc::new(AtomicUsize::new(0));
    let session = session(&catalog::OPENAI, &transport, adder(invoked.clone()));

    let result = session.chat(vec![Message::user("add")]).await.unwrap();
    assert!(result.is_ok());
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
    let fed = body(&transport, 1)["messages"][2]["content"].clone();
    assert!(fed.as_str().unwrap().starts_with("invalid arguments for calc--add"));
}

#[tokio::test]
async fn chain_depth_is_bounded() {
    let transport = Arc::new(ScriptedTransport::new([
        call("call_a", "calc--add", r#"{"a": 1, "b": 1}"#, 1, 1),
        call("call_b", "calc--add", r#"{"a": 2, "b": 2}"#, 1, 1),
    ]));
    let invoked = Arc::new(AtomicUsize::new(0));
    let counters = Arc::new(Counters::default());
    let session = session(&catalog::OPENAI, &transport, adder(invoked.clone()))
        .with_max_depth(2)
        .with_callbacks(counting(&counters));

    let result = session.chat(vec![Message::user("loop")]).await.unwrap();
    assert!(matches!(result.error, Some(Error::ToolDepth(2))));
    assert!(!result.aborted);
    assert_eq!(result.requests, 2);
    assert_eq!(result.usage, Usage { input_tokens: 2, output_tokens: 2 });
    assert_eq!(invoked.load(Ordering::SeqCst), 1);
    assert_eq!(counters.error.load(Ordering::SeqCst), 1);
    assert_eq!(counters.complete.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn http_error_reports_then_completes() {
    let transport = Arc::new(ScriptedTransport::new([Scripted::status(
        500,
        r#"{"error":{"message":"upstream exploded"}}"#,
    )]));
    let counters = Arc::new(Counters::default());
    let session = session(&catalog::OPENAI, &transport, StaticRegistry::new())
        .with_callbacks(counting(&counters));

    let result = session.chat(vec![Message::user("hi")]).await.unwrap();
    let error = result.error.as_ref().unwrap();
    assert_eq!(error.status(), Some(500));
    assert_eq!(error.to_string(), "http 500: upstream exploded");
    assert!(!result.aborted);
    assert_eq!(counters.error.load(Ordering::SeqCst), 1);
    assert_eq!(counters.aborted.load(Ordering::SeqCst), 0);
    assert_eq!(counters.complete.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn provider_error_frame_ends_the_turn() {
    let transport = Arc::new(ScriptedTransport::new([Scripted::ok([
        frame(json!({ "choices": [{ "delta": { "content": "par" } }] })),
        frame(json!({ "error": { "message": "overloaded", "code": "busy" } })),
    ])]));
    let session = session(&catalog::OPENAI, &transport, StaticRegistry::new());

    let result = session.chat(vec![Message::user("hi")]).await.unwrap();
    assert_eq!(result.reply, "par");
    match result.error {
        Some(Error::Provider { code, message }) => {
            assert_eq!(code.as_deref(), Some("busy"));
            assert_eq!(message, "overloaded");
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn unsealed_calls_are_not_executed() {
    let transport = Arc::new(ScriptedTransport::new([Scripted::ok([
        frame(json!({
            "choices": [{ "delta": { "tool_calls": [{
                "index": 0,
                "id": "call_a",
                "function": { "name": "calc--add", "arguments": "{\"a\": 1" },
            }] } }]
        })),
        "data: [DONE]\n\n".to_owned(),
    ])]));
    let invoked = Arc::new(AtomicUsize::new(0));
    let session = session(&catalog::OPENAI, &transport, adder(invoked.clone()));

    let result = session.chat(vec![Message::user("add")]).await.unwrap();
    assert!(result.is_ok());
    assert_eq!(result.requests, 1);
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn abort_is_idempotent_and_busy_is_rejected() {
    let transport = Arc::new(ScriptedTransport::new([Scripted::ok([frame(
        json!({ "choices": [{ "delta": { "content": "partial" } }] }),
    )])
    .stalled()]));
    let counters = Arc::new(Counters::default());
    let reading = Arc::new(Notify::new());
    let notify = reading.clone();
    let session = Arc::new(
        session(&catalog::OPENAI, &transport, StaticRegistry::new()).with_callbacks(
            counting(&counters).on_reading(move |_, _| notify.notify_one()),
        ),
    );

    let running = session.clone();
    let turn = tokio::spawn(async move { running.chat(vec![Message::user("hi")]).await });
    reading.notified().await;

    assert!(session.is_busy());
    assert!(matches!(
        session.chat(vec![Message::user("again")]).await,
        Err(Error::Busy)
    ));

    session.abort();
    session.abort();
    let result = turn.await.unwrap().unwrap();
    session.abort();

    assert!(result.aborted);
    assert!(result.error.as_ref().unwrap().is_aborted());
    assert_eq!(result.reply, "partial");
    assert_eq!(counters.complete.load(Ordering::SeqCst), 1);
    assert_eq!(counters.error.load(Ordering::SeqCst), 1);
    assert_eq!(counters.aborted.load(Ordering::SeqCst), 1);
    assert!(!session.is_busy());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn abort_while_a_tool_runs() {
    let transport = Arc::new(ScriptedTransport::new([
        Scripted::ok([
            frame(json!({ "choices": [{ "delta": { "content": "checking" } }] })),
            frame(json!({
                "choices": [{ "delta": { "tool_calls": [{
                    "index": 0,
                    "id": "call_a",
                    "type": "function",
                    "function": { "name": "slow--wait", "arguments": "{}" },
                }] } }]
            })),
            frame(json!({ "choices": [{ "delta": {}, "finish_reason": "tool_calls" }] })),
            "data: [DONE]\n\n".to_owned(),
        ]),
        reply("never sent", 1, 1),
    ]));

    let entered = Arc::new(Notify::new());
    let signal = entered.clone();
    let registry = StaticRegistry::new();
    registry.register(
        Tool::new("slow--wait", "Never returns", InputSchema::default()),
        move |_| {
            signal.notify_one();
            async {
                std::future::pending::<()>().await;
                ToolOutput::ok("late")
            }
        },
    );

    let counters = Arc::new(Counters::default());
    let session = Arc::new(
        session(&catalog::OPENAI, &transport, registry).with_callbacks(counting(&counters)),
    );
    let running = session.clone();
    let turn = tokio::spawn(async move { running.chat(vec![Message::user("wait")]).await });

    entered.notified().await;
    session.abort();
    let result = turn.await.unwrap().unwrap();

    assert!(matches!(result.error, Some(Error::Aborted)));
    assert!(result.aborted);
    assert_eq!(result.reply, "checking");
    assert_eq!(result.requests, 1);
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(counters.complete.load(Ordering::SeqCst), 1);
    assert_eq!(counters.aborted.load(Ordering::SeqCst), 1);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn abort_between_turns_does_not_carry_over() {
    let transport = Arc::new(ScriptedTransport::new([reply("fresh", 1, 1)]));
    let session = session(&catalog::OPENAI, &transport, StaticRegistry::new());

    session.abort();
    let result = session.chat(vec![Message::user("hi")]).await.unwrap();
    assert!(result.is_ok());
    assert!(!result.aborted);
    assert_eq!(result.reply, "fresh");
}

#[tokio::test]
async fn continuation_is_replayed_on_the_next_turn() {
    let done = |context: Value| {
        format!(
            "{}\n",
            json!({ "response": "", "done": true, "context": context, "prompt_eval_count": 1, "eval_count": 1 })
        )
    };
    let transport = Arc::new(ScriptedTransport::new([
        Scripted::ok([
            "{\"response\":\"one\",\"done\":false}\n".to_owned(),
            done(json!([1, 2, 3])),
        ]),
        Scripted::ok([
            "{\"response\":\"two\",\"done\":false}\n".to_owned(),
            done(json!([4, 5])),
        ]),
    ]));
    let session = session(&catalog::OLLAMA, &transport, StaticRegistry::new());

    let first = session.chat(vec![Message::user("first")]).await.unwrap();
    assert_eq!(first.reply, "one");
    assert!(body(&transport, 0).get("context").is_none());
    assert_eq!(session.continuation(), Some(json!([1, 2, 3])));

    let second = session.chat(vec![Message::user("second")]).await.unwrap();
    assert_eq!(second.reply, "two");
    assert_eq!(body(&transport, 1)["context"], json!([1, 2, 3]));
    assert_eq!(session.continuation(), Some(json!([4, 5])));

    session.reset();
    assert!(session.continuation().is_none());
}

#[test]
fn readiness_follows_required_fields() {
    for profile in catalog::all() {
        let full = Credentials {
            base: "https://example.com".into(),
            key: "k".into(),
            secret: "s".into(),
            deployment: "d".into(),
            model: "m".into(),
            ..Default::default()
        };
        assert!(profile.is_ready(&full), "{}", profile.name);

        for field in profile.schema {
            let mut blank = full.clone();
            match field {
                Field::Base => blank.base = "  ".into(),
                Field::Key => blank.key.clear(),
                Field::Secret => blank.secret.clear(),
                Field::Deployment => blank.deployment.clear(),
                Field::Model => blank.model.clear(),
            }
            assert!(!profile.is_ready(&blank), "{} {field:?}", profile.name);
        }
    }
}

#[test]
fn session_readiness_checks_its_credentials() {
    let transport = Arc::new(ScriptedTransport::default());
    let ready = session(&catalog::OPENAI, &transport, StaticRegistry::new());
    assert!(ready.is_ready());

    let baidu = session(&catalog::BAIDU, &transport, StaticRegistry::new());
    assert!(!baidu.is_ready());
}

#[test]
fn unknown_provider_is_a_config_error() {
    let result = Session::from_catalog(
        Credentials::key("k"),
        ConversationState::new("Nowhere"),
        Arc::new(ScriptedTransport::default()),
        Arc::new(StaticRegistry::new()),
    );
    assert!(matches!(result, Err(Error::Config(_))));
}
