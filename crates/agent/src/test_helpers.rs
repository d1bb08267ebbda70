//! Scripted provider and toy tools shared by the agent tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use judgebot_core::error::{ProviderError, ToolError};
use judgebot_core::message::AssistantTurn;
use judgebot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use judgebot_core::schema::{InputSchema, ParamKind};
use judgebot_core::tool::{Tool, ToolCall};
use serde_json::Value;

/// Returns scripted responses in order and records every request.
///
/// Panics if called more times than it has responses.
pub struct ScriptedProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn turns(turns: Vec<AssistantTurn>) -> Self {
        Self::new(turns.into_iter().map(|t| Ok(response(t))).collect())
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| panic!("ScriptedProvider: no response scripted for call #{call}"))
    }
}

pub fn response(turn: AssistantTurn) -> ProviderResponse {
    ProviderResponse {
        turn,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments,
    }
}

/// Echoes `text`; the text `"fail"` makes it return an error.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes the text argument. Used in tests."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new().required("text", "Text to echo", ParamKind::string())
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let text = arguments["text"].as_str().unwrap_or_default();
        if text == "fail" {
            return Err(ToolError::ExecutionFailed {
                tool_name: "echo".into(),
                reason: "asked to fail".into(),
            });
        }
        Ok(text.to_string())
    }
}

pub struct SlowTool {
    pub delay_ms: u64,
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn description(&self) -> &str {
        "Sleeps, then answers."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new()
    }

    async fn execute(&self, _arguments: &Value) -> Result<String, ToolError> {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        Ok("slept".into())
    }
}

pub struct PanicTool;

#[async_trait]
impl Tool for PanicTool {
    fn name(&self) -> &str {
        "boom"
    }

    fn description(&self) -> &str {
        "Always panics."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new()
    }

    async fn execute(&self, _arguments: &Value) -> Result<String, ToolError> {
        panic!("kaboom")
    }
}
