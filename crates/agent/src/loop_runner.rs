//! The agent reasoning loop.
//!
//! Each step sends the system prompt, the whole transcript and every tool
//! declaration to the model. A turn that requests tools is executed and
//! appended with its results; a turn without tool calls ends the loop. The
//! number of model calls is capped by `max_iterations`.

use std::sync::Arc;

use chrono::Utc;
use judgebot_core::error::{ProviderError, TranscriptError};
use judgebot_core::event::{DomainEvent, EventBus};
use judgebot_core::message::Transcript;
use judgebot_core::provider::{Provider, ProviderRequest};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::executor::{DispatchMode, ToolExecutor};

pub const EXHAUSTED_TEXT: &str =
    "I got stuck in a loop trying to answer. Please try rephrasing your question.";
pub const EMPTY_RESPONSE_TEXT: &str = "I couldn't generate a response.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),
}

/// How a loop run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// The model answered without requesting tools
    Done { text: String, iterations: u32 },
    /// The iteration ceiling was reached first
    Exhausted { text: String, iterations: u32 },
}

impl LoopOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Done { text, .. } | Self::Exhausted { text, .. } => text,
        }
    }

    /// Number of model calls made.
    pub fn iterations(&self) -> u32 {
        match self {
            Self::Done { iterations, .. } | Self::Exhausted { iterations, .. } => *iterations,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Done { text, .. } | Self::Exhausted { text, .. } => text,
        }
    }
}

/// Drives one transcript to a final answer.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    executor: ToolExecutor,
    model: String,
    system_prompt: Option<String>,
    temperature: f32,
    max_tokens: u32,
    max_iterations: u32,
    dispatch_mode: DispatchMode,
    event_bus: Option<Arc<EventBus>>,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, executor: ToolExecutor, model: impl Into<String>) -> Self {
        Self {
            provider,
            executor,
            model: model.into(),
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 1024,
            max_iterations: 5,
            dispatch_mode: DispatchMode::Sequential,
            event_bus: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Maximum model calls per run.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// Answer one question in a fresh transcript.
    pub async fn run(&self, input: &str) -> Result<LoopOutcome, AgentError> {
        let mut transcript = Transcript::with_user(input);
        self.run_transcript(&mut transcript).await
    }

    /// Continue an existing transcript until the model stops calling tools.
    pub async fn run_transcript(&self, transcript: &mut Transcript) -> Result<LoopOutcome, AgentError> {
        let conversation_id = transcript.id.to_string();
        info!(
            conversation_id = %conversation_id,
            messages = transcript.len(),
            "Processing conversation"
        );

        let tools = self.executor.registry().definitions();
        let mut iterations: u32 = 0;
        let mut tokens_used: u32 = 0;

        loop {
            if iterations >= self.max_iterations {
                warn!(
                    conversation_id = %conversation_id,
                    max_iterations = self.max_iterations,
                    "Iteration limit reached without a final answer"
                );
                self.publish(DomainEvent::LoopExhausted {
                    conversation_id,
                    max_iterations: self.max_iterations,
                    timestamp: Utc::now(),
                });
                return Ok(LoopOutcome::Exhausted {
                    text: EXHAUSTED_TEXT.into(),
                    iterations,
                });
            }
            iterations += 1;

            debug!(conversation_id = %conversation_id, iteration = iterations, "Calling model");
            self.publish(DomainEvent::LoopStep {
                conversation_id: conversation_id.clone(),
                iteration: iterations,
                timestamp: Utc::now(),
            });

            let request = ProviderRequest {
                model: self.model.clone(),
                system: self.system_prompt.clone(),
                messages: transcript.messages().to_vec(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tools.clone(),
            };
            let response = self.provider.complete(request).await?;
            if let Some(usage) = &response.usage {
                tokens_used = tokens_used.saturating_add(usage.total_tokens);
            }

            let turn = response.turn;
            if turn.wants_tools() {
                debug!(
                    conversation_id = %conversation_id,
                    tools = turn.tool_calls.len(),
                    "Executing tool calls"
                );
                let results = self
                    .executor
                    .execute_all(&turn.tool_calls, self.dispatch_mode)
                    .await;
                transcript.push_tool_round(turn, results)?;
                continue;
            }

            let text = turn
                .final_text()
                .map_or_else(|| EMPTY_RESPONSE_TEXT.to_string(), str::to_string);
            transcript.push_assistant(turn);

            self.publish(DomainEvent::ResponseGenerated {
                conversation_id,
                model: response.model,
                tokens_used,
                iterations,
                timestamp: Utc::now(),
            });
            return Ok(LoopOutcome::Done { text, iterations });
        }
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{EchoTool, ScriptedProvider, call, response};
    use judgebot_core::message::{AssistantTurn, Message};
    use judgebot_core::tool::{ToolFailure, ToolRegistry};
    use serde_json::json;

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        Arc::new(registry)
    }

    fn agent(provider: Arc<ScriptedProvider>) -> AgentLoop {
        AgentLoop::new(provider, ToolExecutor::new(registry()), "mock-model")
    }

    fn echo_turn(id: &str, text: &str) -> AssistantTurn {
        AssistantTurn::tool_calls(vec![call(id, "echo", json!({"text": text}))])
    }

    #[tokio::test]
    async fn direct_answer_takes_one_step() {
        let provider = Arc::new(ScriptedProvider::turns(vec![AssistantTurn::text("Sol Ring costs {1}.")]));
        let outcome = agent(provider.clone()).run("What does Sol Ring cost?").await.unwrap();

        assert_eq!(
            outcome,
            LoopOutcome::Done {
                text: "Sol Ring costs {1}.".into(),
                iterations: 1
            }
        );
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn tool_round_then_answer() {
        let provider = Arc::new(ScriptedProvider::turns(vec![
            echo_turn("t1", "rule 702.19b"),
            AssistantTurn::text("Trample lets excess damage through."),
        ]));
        let agent = agent(provider.clone()).with_system_prompt("judge");
        let mut transcript = Transcript::with_user("How does trample work?");

        let outcome = agent.run_transcript(&mut transcript).await.unwrap();
        assert_eq!(outcome.text(), "Trample lets excess damage through.");
        assert_eq!(outcome.iterations(), 2);

        // user, assistant(tool call), tool results, assistant(final)
        assert_eq!(transcript.len(), 4);
        match &transcript.messages()[2] {
            Message::ToolResults { results } => {
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].call_id, "t1");
                assert_eq!(results[0].content, "rule 702.19b");
            }
            other => panic!("expected tool results, got {other:?}"),
        }

        let requests = provider.requests();
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[1].system.as_deref(), Some("judge"));
        assert_eq!(requests[1].tools.len(), 1);
        assert_eq!(requests[1].max_tokens, 1024);
    }

    #[tokio::test]
    async fn exhausts_after_max_iterations() {
        let provider = Arc::new(ScriptedProvider::turns(vec![
            echo_turn("a", "1"),
            echo_turn("b", "2"),
            echo_turn("c", "3"),
        ]));
        let outcome = agent(provider.clone())
            .with_max_iterations(3)
            .run("loop forever")
            .await
            .unwrap();

        assert!(outcome.is_exhausted());
        assert_eq!(outcome.text(), EXHAUSTED_TEXT);
        assert_eq!(outcome.iterations(), 3);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn unknown_tool_is_fed_back_to_model() {
        let provider = Arc::new(ScriptedProvider::turns(vec![
            AssistantTurn::tool_calls(vec![call("x1", "teleport", json!({}))]),
            AssistantTurn::text("That tool does not exist."),
        ]));
        let mut transcript = Transcript::with_user("teleport me");
        agent(provider).run_transcript(&mut transcript).await.unwrap();

        match &transcript.messages()[2] {
            Message::ToolResults { results } => {
                assert!(results[0].is_error);
                assert_eq!(results[0].failure, Some(ToolFailure::UnknownTool));
                assert_eq!(results[0].content, "Unknown tool: teleport");
            }
            other => panic!("expected tool results, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn multiple_calls_answered_in_order() {
        let provider = Arc::new(ScriptedProvider::turns(vec![
            AssistantTurn::tool_calls(vec![
                call("a", "echo", json!({"text": "first"})),
                call("b", "echo", json!({"text": "fail"})),
                call("c", "echo", json!({"text": "third"})),
            ]),
            AssistantTurn::text("done"),
        ]));
        let mut transcript = Transcript::with_user("three things");
        agent(provider)
            .with_dispatch_mode(DispatchMode::Concurrent)
            .run_transcript(&mut transcript)
            .await
            .unwrap();

        let Message::ToolResults { results } = &transcript.messages()[2] else {
            panic!("expected tool results");
        };
        let ids: Vec<&str> = results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(results[1].is_error);
        assert!(!results[2].is_error);
    }

    #[tokio::test]
    async fn empty_text_gets_fallback() {
        let mut blank = AssistantTurn::text("   ");
        blank.stop_reason = Some("end_turn".into());
        let provider = Arc::new(ScriptedProvider::turns(vec![blank]));

        let outcome = agent(provider).run("hello").await.unwrap();
        assert_eq!(outcome.text(), EMPTY_RESPONSE_TEXT);
    }

    #[tokio::test]
    async fn provider_error_propagates() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(response(echo_turn("a", "x"))),
            Err(ProviderError::RateLimited { retry_after_secs: 5 }),
        ]));
        let err = agent(provider.clone()).run("hello").await.unwrap_err();

        assert!(matches!(err, AgentError::Provider(ProviderError::RateLimited { .. })));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn publishes_step_and_response_events() {
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();
        let provider = Arc::new(ScriptedProvider::turns(vec![
            echo_turn("a", "x"),
            AssistantTurn::text("ok"),
        ]));
        agent(provider).with_event_bus(bus).run("hi").await.unwrap();

        let mut steps = 0;
        let mut tokens = None;
        while let Ok(event) = rx.try_recv() {
            match event.as_ref() {
                DomainEvent::LoopStep { .. } => steps += 1,
                DomainEvent::ResponseGenerated { tokens_used, iterations, .. } => {
                    tokens = Some((*tokens_used, *iterations));
                }
                _ => {}
            }
        }
        assert_eq!(steps, 2);
        assert_eq!(tokens, Some((30, 2)));
    }
}
