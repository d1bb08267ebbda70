//! `judgebot ask`: Answer one question and exit.

use judgebot_agent::AgentError;
use judgebot_config::AppConfig;

use crate::runtime::Runtime;

/// Shown instead of the raw error when the model cannot be reached.
pub const APOLOGY: &str = "Sorry, I couldn't reach the language model. Please try again in a moment.";

pub async fn run(config: AppConfig, question: &str) -> anyhow::Result<()> {
    let runtime = Runtime::new(config)?;
    let agent = runtime.agent()?;

    eprint!("  Thinking...");
    let outcome = agent.run(question).await;
    eprint!("\r              \r");

    match outcome {
        Ok(outcome) => {
            println!("{}", outcome.text());
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Agent run failed");
            eprintln!("{APOLOGY}");
            if let AgentError::Provider(provider_error) = &e {
                eprintln!("  ({provider_error})");
            }
            std::process::exit(1);
        }
    }
}
