//! Message and Transcript domain types.
//!
//! A transcript is what flows between the agent loop and the provider:
//! the user's question, then alternating assistant turns and tool results,
//! ending in the assistant's final answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::TranscriptError;
use crate::tool::{ToolCall, ToolResult};

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single message in a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// Text typed by the end user
    User { content: String },

    /// A model turn: text, tool requests, or both
    Assistant(AssistantTurn),

    /// Results answering every tool call of the preceding assistant turn
    ToolResults { results: Vec<ToolResult> },
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create an assistant message carrying only text.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(AssistantTurn::text(content))
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }
}

/// One response from the reasoning model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantTurn {
    /// Provider-assigned message ID (or a generated one)
    pub id: String,

    /// Text content, if the model produced any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Tool calls requested in this turn, in the order the model emitted them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Raw stop reason reported by the provider ("end_turn", "tool_use", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

impl AssistantTurn {
    /// A turn with only text.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: Some(content.into()),
            tool_calls: Vec::new(),
            stop_reason: None,
        }
    }

    /// A turn that only requests tools.
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: None,
            tool_calls: calls,
            stop_reason: Some("tool_use".into()),
        }
    }

    /// Whether the model asked for at least one tool.
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The turn's text, if it has any non-blank text.
    pub fn final_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// The append-only message log of one conversation.
///
/// There is no API to remove or edit earlier messages. Tool rounds are pushed
/// as a unit so the call/result pairing can be checked before anything is
/// appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Unique conversation ID
    pub id: ConversationId,

    /// When this transcript was started
    pub created_at: DateTime<Utc>,

    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self {
            id: ConversationId::new(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// Start a transcript with the user's question.
    pub fn with_user(content: impl Into<String>) -> Self {
        let mut transcript = Self::new();
        transcript.push_user(content);
        transcript
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Append a final (tool-free) assistant turn.
    pub fn push_assistant(&mut self, turn: AssistantTurn) {
        self.messages.push(Message::Assistant(turn));
    }

    /// Append an assistant turn together with the results answering its calls.
    ///
    /// Results must pair one-to-one with the turn's calls by call id. On
    /// mismatch nothing is appended.
    pub fn push_tool_round(
        &mut self,
        turn: AssistantTurn,
        results: Vec<ToolResult>,
    ) -> Result<(), TranscriptError> {
        check_pairing(&turn.tool_calls, &results)?;
        self.messages.push(Message::Assistant(turn));
        self.messages.push(Message::ToolResults { results });
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Text of the most recent assistant turn, if any.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Assistant(turn) => turn.final_text(),
            _ => None,
        })
    }

    /// Number of completed tool rounds.
    pub fn tool_rounds(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, Message::ToolResults { .. }))
            .count()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

fn check_pairing(calls: &[ToolCall], results: &[ToolResult]) -> Result<(), TranscriptError> {
    if calls.is_empty() {
        return Err(TranscriptError::NoToolCalls);
    }
    if calls.len() != results.len() {
        return Err(TranscriptError::ResultCountMismatch {
            expected: calls.len(),
            actual: results.len(),
        });
    }

    let mut pending: HashSet<&str> = HashSet::with_capacity(calls.len());
    for call in calls {
        if !pending.insert(call.id.as_str()) {
            return Err(TranscriptError::DuplicateCallId(call.id.clone()));
        }
    }
    for result in results {
        if !pending.remove(result.call_id.as_str()) {
            return Err(TranscriptError::UnmatchedResult(result.call_id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: "mtg_rules_search".into(),
            arguments: json!({"query": "deathtouch"}),
        }
    }

    #[test]
    fn transcript_starts_with_user_message() {
        let transcript = Transcript::with_user("What does trample do?");
        assert_eq!(transcript.len(), 1);
        assert!(transcript.messages()[0].is_user());
    }

    #[test]
    fn tool_round_appends_turn_then_results() {
        let mut transcript = Transcript::with_user("q");
        let turn = AssistantTurn::tool_calls(vec![call("a"), call("b")]);
        let results = vec![ToolResult::ok("a", "one"), ToolResult::ok("b", "two")];

        transcript.push_tool_round(turn, results).unwrap();

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.tool_rounds(), 1);
        match &transcript.messages()[2] {
            Message::ToolResults { results } => assert_eq!(results.len(), 2),
            other => panic!("Expected ToolResults, got {other:?}"),
        }
    }

    #[test]
    fn tool_round_accepts_results_in_any_order() {
        let mut transcript = Transcript::with_user("q");
        let turn = AssistantTurn::tool_calls(vec![call("a"), call("b")]);
        let results = vec![ToolResult::ok("b", "two"), ToolResult::ok("a", "one")];
        assert!(transcript.push_tool_round(turn, results).is_ok());
    }

    #[test]
    fn tool_round_rejects_count_mismatch() {
        let mut transcript = Transcript::with_user("q");
        let turn = AssistantTurn::tool_calls(vec![call("a"), call("b")]);
        let err = transcript
            .push_tool_round(turn, vec![ToolResult::ok("a", "one")])
            .unwrap_err();
        assert_eq!(
            err,
            TranscriptError::ResultCountMismatch { expected: 2, actual: 1 }
        );
        assert_eq!(transcript.len(), 1, "nothing appended on mismatch");
    }

    #[test]
    fn tool_round_rejects_foreign_call_id() {
        let mut transcript = Transcript::with_user("q");
        let turn = AssistantTurn::tool_calls(vec![call("a")]);
        let err = transcript
            .push_tool_round(turn, vec![ToolResult::ok("zzz", "one")])
            .unwrap_err();
        assert_eq!(err, TranscriptError::UnmatchedResult("zzz".into()));
    }

    #[test]
    fn tool_round_rejects_duplicate_call_ids() {
        let mut transcript = Transcript::with_user("q");
        let turn = AssistantTurn::tool_calls(vec![call("a"), call("a")]);
        let results = vec![ToolResult::ok("a", "1"), ToolResult::ok("a", "2")];
        assert!(matches!(
            transcript.push_tool_round(turn, results),
            Err(TranscriptError::DuplicateCallId(_))
        ));
    }

    #[test]
    fn final_text_ignores_blank_text() {
        let mut turn = AssistantTurn::text("   ");
        assert_eq!(turn.final_text(), None);
        turn.text = Some(" Deathtouch applies. ".into());
        assert_eq!(turn.final_text(), Some("Deathtouch applies."));
    }

    #[test]
    fn message_serializes_with_role_tag() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
    }
}
