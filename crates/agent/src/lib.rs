//! The judge agent: a bounded tool-calling loop.
//!
//! 1. **Receive** the user's question as a fresh transcript
//! 2. **Ask the model** with the system prompt, transcript and tool declarations
//! 3. **If tool calls**: execute them, append the round, go back to step 2
//! 4. **If text**: that is the answer
//!
//! The loop stops with a fallback answer once `max_iterations` model calls
//! have been made without a final text.

pub mod executor;
pub mod loop_runner;
pub mod prompt;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use executor::{DispatchMode, ToolExecutor};
pub use loop_runner::{AgentError, AgentLoop, EMPTY_RESPONSE_TEXT, EXHAUSTED_TEXT, LoopOutcome};
pub use prompt::system_prompt;
