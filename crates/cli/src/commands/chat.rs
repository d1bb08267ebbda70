//! `judgebot chat`: Interactive mode.
//!
//! Every line is answered in its own transcript; earlier questions are not
//! carried into later ones.

use std::io::Write;

use judgebot_config::AppConfig;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::ask::APOLOGY;
use crate::runtime::Runtime;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let runtime = Runtime::new(config)?;
    let agent = runtime.agent()?;

    println!();
    println!("  judgebot - Interactive Mode");
    println!();
    println!("  Provider:  {}", runtime.router.default_name());
    println!("  Model:     {}", runtime.config.default_model);
    println!("  Tools:     {}", runtime.tools.len());
    println!();
    println!("  Ask a card, combo or rules question and press Enter.");
    println!("  Type 'exit' or 'quit' to leave.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        let outcome = agent.run(line).await;
        eprint!("\r     \r");

        match outcome {
            Ok(outcome) => {
                println!();
                for text_line in outcome.text().lines() {
                    println!("  Judge > {text_line}");
                }
                println!();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Agent run failed");
                eprintln!("  {APOLOGY}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}
