//! `judgebot doctor`: Diagnose configuration, providers and the rules index.

use std::path::Path;

use judgebot_config::AppConfig;
use judgebot_rules::IndexState;

use crate::runtime::Runtime;

pub async fn run(config: AppConfig, config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("🩺 judgebot Doctor - System Diagnostics");
    println!("=======================================\n");

    let mut issues = 0;

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if config_path.exists() {
        println!("  ✅ Config file valid: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file - using defaults (run `judgebot onboard` to create one)");
    }

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key - set ANTHROPIC_API_KEY or JUDGEBOT_API_KEY");
        issues += 1;
    }

    let runtime = Runtime::new(config)?;

    let provider_name = runtime.router.default_name().to_string();
    match runtime.router.default() {
        Some(provider) => match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{provider_name}' reachable"),
            Ok(false) => {
                println!("  ⚠️  Provider '{provider_name}' reported unhealthy");
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{provider_name}' unreachable: {e}");
                issues += 1;
            }
        },
        None => {
            println!("  ❌ Provider '{provider_name}' is not available");
            issues += 1;
        }
    }

    let _ = runtime.rules.get().await;
    match runtime.rules.state() {
        IndexState::Ready { entries } => {
            println!("  ✅ Rules index loaded ({entries} rules)");
        }
        IndexState::Unavailable(e) => {
            println!("  ⚠️  Rules index unavailable: {e}");
            println!("      Run `judgebot ingest` to build it.");
            issues += 1;
        }
        IndexState::Uninitialized => {
            println!("  ⚠️  Rules index not loaded");
            issues += 1;
        }
    }

    println!("  ✅ {} tools registered", runtime.tools.len());

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
