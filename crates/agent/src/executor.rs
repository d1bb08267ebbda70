//! Tool dispatch for one assistant turn.
//!
//! The executor turns every [`ToolCall`] into a [`ToolResult`]: unknown tools,
//! bad arguments, handler errors, timeouts and panics all come back as error
//! results the model can read, never as a failure of the loop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use judgebot_core::error::ToolError;
use judgebot_core::event::{DomainEvent, EventBus};
use judgebot_core::tool::{ToolCall, ToolFailure, ToolRegistry, ToolResult};
use tracing::{debug, warn};

/// How a turn's tool calls are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// One after another, in call order
    #[default]
    Sequential,
    /// All at once; results still come back in call order
    Concurrent,
}

pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Option<Duration>,
    event_bus: Option<Arc<EventBus>>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: None,
            event_bus: None,
        }
    }

    /// Per-call ceiling on handler run time.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one call. Never fails.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let start = Instant::now();
        let result = self.dispatch(call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        if result.is_error {
            warn!(
                tool = %call.name,
                call_id = %call.id,
                failure = ?result.failure,
                duration_ms,
                "Tool call failed"
            );
        } else {
            debug!(tool = %call.name, call_id = %call.id, duration_ms, "Tool call succeeded");
        }

        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success: !result.is_error,
                duration_ms,
                timestamp: Utc::now(),
            });
        }
        result
    }

    /// Run every call of a turn. Results are in call order whatever the mode.
    pub async fn execute_all(&self, calls: &[ToolCall], mode: DispatchMode) -> Vec<ToolResult> {
        match mode {
            DispatchMode::Sequential => {
                let mut results = Vec::with_capacity(calls.len());
                for call in calls {
                    results.push(self.execute(call).await);
                }
                results
            }
            DispatchMode::Concurrent => {
                futures::future::join_all(calls.iter().map(|call| self.execute(call))).await
            }
        }
    }

    async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.registry.get(&call.name) else {
            return ToolResult::unknown_tool(call);
        };

        if let Err(e) = tool.validate(&call.arguments) {
            return ToolResult::error(&call.id, ToolFailure::InvalidArguments, format!("Error: {e}"));
        }

        let run = AssertUnwindSafe(tool.execute(&call.arguments)).catch_unwind();
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let e = ToolError::Timeout {
                        tool_name: call.name.clone(),
                        timeout_secs: limit.as_secs(),
                    };
                    return ToolResult::error(&call.id, ToolFailure::Timeout, format!("Error: {e}"));
                }
            },
            None => run.await,
        };

        match outcome {
            Ok(Ok(content)) => ToolResult::ok(&call.id, content),
            Ok(Err(e)) => {
                let failure = match e {
                    ToolError::Timeout { .. } => ToolFailure::Timeout,
                    ToolError::InvalidArguments(_) => ToolFailure::InvalidArguments,
                    ToolError::NotFound(_) | ToolError::ExecutionFailed { .. } => {
                        ToolFailure::ExecutionFailed
                    }
                };
                ToolResult::error(&call.id, failure, format!("Error: {e}"))
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                ToolResult::error(
                    &call.id,
                    ToolFailure::Panicked,
                    format!("Error: {} panicked: {detail}", call.name),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{EchoTool, PanicTool, SlowTool, call};
    use serde_json::json;

    fn executor() -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        registry.register(Box::new(SlowTool { delay_ms: 50 }));
        registry.register(Box::new(PanicTool));
        ToolExecutor::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn runs_known_tool() {
        let result = executor().execute(&call("c1", "echo", json!({"text": "hi"}))).await;
        assert_eq!(result, ToolResult::ok("c1", "hi"));
    }

    #[tokio::test]
    async fn unknown_tool_is_error_result() {
        let result = executor().execute(&call("c1", "nope", json!({}))).await;
        assert!(result.is_error);
        assert_eq!(result.failure, Some(ToolFailure::UnknownTool));
        assert_eq!(result.content, "Unknown tool: nope");
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_handler() {
        let result = executor().execute(&call("c1", "echo", json!({"text": 7}))).await;
        assert_eq!(result.failure, Some(ToolFailure::InvalidArguments));
        assert!(result.content.starts_with("Error: Invalid tool arguments"));
    }

    #[tokio::test]
    async fn handler_error_is_prefixed() {
        let result = executor().execute(&call("c1", "echo", json!({"text": "fail"}))).await;
        assert_eq!(result.failure, Some(ToolFailure::ExecutionFailed));
        assert_eq!(result.content, "Error: echo failed: asked to fail");
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let result = executor().execute(&call("c1", "boom", json!({}))).await;
        assert_eq!(result.failure, Some(ToolFailure::Panicked));
        assert!(result.content.contains("boom panicked: kaboom"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_reported() {
        let executor = executor().with_timeout(Duration::from_millis(10));
        let result = executor.execute(&call("c1", "slow", json!({}))).await;
        assert_eq!(result.failure, Some(ToolFailure::Timeout));
        assert!(result.content.contains("timed out"));
    }

    #[tokio::test]
    async fn concurrent_results_keep_call_order() {
        let calls = vec![
            call("a", "slow", json!({})),
            call("b", "echo", json!({"text": "fast"})),
            call("c", "missing", json!({})),
        ];
        let results = executor().execute_all(&calls, DispatchMode::Concurrent).await;
        let ids: Vec<&str> = results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(results[0].content, "slept");
        assert_eq!(results[1].content, "fast");
        assert!(results[2].is_error);
    }

    #[tokio::test]
    async fn publishes_tool_events() {
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let executor = executor().with_event_bus(bus);

        executor.execute(&call("c1", "nope", json!({}))).await;
        match rx.recv().await.unwrap().as_ref() {
            DomainEvent::ToolExecuted { tool_name, success, .. } => {
                assert_eq!(tool_name, "nope");
                assert!(!success);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
