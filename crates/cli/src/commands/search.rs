//! `judgebot search`: Query the rules index directly.

use judgebot_config::AppConfig;
use judgebot_core::error::IndexError;
use judgebot_tools::format::relevance_marks;

use crate::runtime::Runtime;

pub async fn run(config: AppConfig, query: &str, k: usize) -> anyhow::Result<()> {
    let runtime = Runtime::new(config)?;

    let index = match runtime.rules.get().await {
        Ok(index) => index,
        Err(IndexError::NotAvailable(reason)) => {
            eprintln!("  No rules index yet ({reason}).");
            eprintln!("  Run `judgebot ingest` first.");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let hits = index.query(query, k.max(1)).await?;
    if hits.is_empty() {
        println!("No relevant rules found for: {query}");
        return Ok(());
    }

    for hit in hits {
        println!(
            "{:<12} {} {:.3}",
            hit.chunk.rule_number,
            relevance_marks(hit.distance),
            hit.distance
        );
        println!("    {}\n", hit.chunk.text);
    }
    Ok(())
}
