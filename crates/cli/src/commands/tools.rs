//! `judgebot tools`: List the tools the agent can call.

use judgebot_config::AppConfig;

use crate::runtime::Runtime;

pub fn run(config: AppConfig) -> anyhow::Result<()> {
    let runtime = Runtime::new(config)?;

    println!("🧰 {} tools\n", runtime.tools.len());
    for tool in runtime.tools.iter() {
        println!("  {}", tool.name());
        println!("    {}", tool.description());
        for param in tool.input_schema().params() {
            let required = if param.required { "required" } else { "optional" };
            println!("      - {} ({required}): {}", param.name, param.description);
        }
        println!();
    }
    Ok(())
}
