#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use converse_llm::{InvokeRequest, LlmError, Result, Transport, WireStream};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One canned reply for the next call
pub enum Script {
    Body(Value),
    Events(Vec<Result<Bytes>>),
    Fail(LlmError),
}

/// In-memory transport that replays scripts in order and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<InvokeRequest>>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<InvokeRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next(&self, request: InvokeRequest) -> Script {
        self.requests.lock().unwrap().push(request);
        self.scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport called more often than scripted")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn invoke(&self, request: InvokeRequest) -> Result<Bytes> {
        match self.next(request) {
            Script::Body(body) => Ok(Bytes::from(body.to_string())),
            Script::Fail(e) => Err(e),
            Script::Events(_) => panic!("scripted a stream for a one-shot call"),
        }
    }

    async fn invoke_stream(&self, request: InvokeRequest) -> Result<WireStream> {
        match self.next(request) {
            Script::Events(events) => Ok(Box::pin(futures::stream::iter(events))),
            Script::Fail(e) => Err(e),
            Script::Body(_) => panic!("scripted a body for a streaming call"),
        }
    }
}

pub fn event(value: Value) -> Result<Bytes> {
    Ok(Bytes::from(value.to_string()))
}

/// Claude event sequence: message_start, one text block, deltas, stop markers
pub fn claude_events(deltas: &[&str]) -> Vec<Result<Bytes>> {
    let mut events = vec![
        event(json!({
            "type": "message_start",
            "message": {"id": "msg_01", "role": "assistant", "content": []}
        })),
        event(json!({
            "type": "content_block_start",
            "index": 0,
            "content_block": {"type": "text", "text": ""}
        })),
    ];
    for delta in deltas {
        events.push(event(json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": delta}
        })));
    }
    events.push(event(json!({"type": "content_block_stop", "index": 0})));
    events.push(event(json!({
        "type": "message_delta",
        "delta": {"stop_reason": "end_turn"}
    })));
    events.push(event(json!({"type": "message_stop"})));
    events
}

pub fn mistral_events(deltas: &[&str]) -> Vec<Result<Bytes>> {
    deltas
        .iter()
        .map(|delta| event(json!({"outputs": [{"text": delta, "stop_reason": null}]})))
        .collect()
}

pub fn claude_reply(text: &str) -> Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn"
    })
}
