//! `judgebot ingest`: Download the Comprehensive Rules and rebuild the index.

use std::path::PathBuf;

use judgebot_config::AppConfig;
use judgebot_providers::build_from_config;
use judgebot_rules::{SourceChoice, ingest};

use crate::runtime::embedder;

pub async fn run(config: AppConfig, source: Option<String>, file: Option<PathBuf>) -> anyhow::Result<()> {
    let choice = match (source, file) {
        (_, Some(path)) => SourceChoice::File(path),
        (Some(url), None) => SourceChoice::Url(url),
        (None, None) => SourceChoice::Configured,
    };

    let router = build_from_config(&config);
    let embedder = embedder(&config, &router)?;

    println!("📚 judgebot - Rules Ingestion");
    println!("=============================\n");
    println!("  Collection:  {}", config.rules.collection);
    println!("  Embedder:    {} ({} dims)", embedder.name(), embedder.dimensions());
    println!();

    let report = ingest::run(&choice, &config.rules, &config.apis.user_agent, embedder).await?;

    println!("  Source:      {}", report.source);
    println!("  Characters:  {}", report.characters);
    println!("  Rules:       {}", report.chunks);
    println!();
    println!("  Rules by section:");
    for (section, count) in &report.sections {
        println!("    {section:>9}  {count}");
    }
    println!();
    println!("✅ Index written to {}", report.path.display());

    Ok(())
}
