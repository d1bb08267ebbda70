//! Wiring shared by the commands: providers, tools, rules index and agent.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use judgebot_agent::{AgentLoop, DispatchMode, ToolExecutor, system_prompt};
use judgebot_config::AppConfig;
use judgebot_core::embedding::Embedder;
use judgebot_core::event::EventBus;
use judgebot_core::tool::ToolRegistry;
use judgebot_providers::{ProviderRouter, build_from_config};
use judgebot_rules::{CollectionStore, SharedRulesIndex, StoreLoader, embedding};
use judgebot_tools::{ToolContext, default_registry};

pub struct Runtime {
    pub config: AppConfig,
    pub router: ProviderRouter,
    pub event_bus: Arc<EventBus>,
    pub rules: Arc<SharedRulesIndex>,
    pub tools: Arc<ToolRegistry>,
}

impl Runtime {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let router = build_from_config(&config);
        let event_bus = Arc::new(EventBus::default());

        let embedder = embedder(&config, &router)?;
        let store = CollectionStore::new(config.rules.data_dir(), &config.rules.collection);
        let rules = Arc::new(
            SharedRulesIndex::new(StoreLoader::new(store, embedder)).with_event_bus(event_bus.clone()),
        );

        let ctx = ToolContext::from_config(&config.apis, rules.clone());
        let tools = Arc::new(default_registry(&ctx));

        Ok(Self {
            config,
            router,
            event_bus,
            rules,
            tools,
        })
    }

    /// The agent loop configured from `[agent]` and the top-level model settings.
    pub fn agent(&self) -> anyhow::Result<AgentLoop> {
        if !self.config.has_api_key() && self.config.default_provider != "ollama" {
            return Err(anyhow!(
                "No API key configured. Set ANTHROPIC_API_KEY or JUDGEBOT_API_KEY, \
                 or add api_key to {}",
                AppConfig::config_dir().join("config.toml").display()
            ));
        }

        let provider = self
            .router
            .default()
            .with_context(|| format!("Provider '{}' is not available", self.router.default_name()))?;

        let agent_config = &self.config.agent;
        let mut executor = ToolExecutor::new(self.tools.clone()).with_event_bus(self.event_bus.clone());
        if agent_config.tool_timeout_secs > 0 {
            executor = executor.with_timeout(Duration::from_secs(agent_config.tool_timeout_secs));
        }

        let prompt = agent_config
            .system_prompt_override
            .clone()
            .unwrap_or_else(|| system_prompt(&self.tools));
        let mode = if agent_config.parallel_tools {
            DispatchMode::Concurrent
        } else {
            DispatchMode::Sequential
        };

        Ok(AgentLoop::new(provider, executor, &self.config.default_model)
            .with_system_prompt(prompt)
            .with_max_iterations(agent_config.max_iterations)
            .with_max_tokens(self.config.default_max_tokens)
            .with_temperature(self.config.default_temperature)
            .with_dispatch_mode(mode)
            .with_event_bus(self.event_bus.clone()))
    }
}

/// The configured rules embedder.
pub fn embedder(config: &AppConfig, router: &ProviderRouter) -> anyhow::Result<Arc<dyn Embedder>> {
    let embedding = &config.rules.embedding;
    embedding::from_config(embedding, router.get(&embedding.provider))
        .context("Failed to set up the rules embedder")
}
