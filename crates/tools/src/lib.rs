//! Tools the judge agent can call.
//!
//! Card data comes from Scryfall, combos and bracket estimates from
//! Commander Spellbook, and rules text from the locally ingested
//! Comprehensive Rules collection.

pub mod args;
pub mod format;
pub mod http;
pub mod rules_search;
pub mod scryfall;
pub mod scryfall_tools;
pub mod spellbook;
pub mod spellbook_tools;

use std::sync::Arc;

use judgebot_config::ApiConfig;
use judgebot_core::tool::ToolRegistry;
use judgebot_rules::SharedRulesIndex;

pub use http::{ApiClient, ApiError};
pub use rules_search::{RULES_SETUP_TEXT, RulesSearchTool};
pub use scryfall::ScryfallClient;
pub use spellbook::SpellbookClient;

/// Shared clients handed to every tool.
#[derive(Clone)]
pub struct ToolContext {
    pub scryfall: Arc<ScryfallClient>,
    pub spellbook: Arc<SpellbookClient>,
    pub rules: Arc<SharedRulesIndex>,
}

impl ToolContext {
    pub fn from_config(apis: &ApiConfig, rules: Arc<SharedRulesIndex>) -> Self {
        Self {
            scryfall: Arc::new(ScryfallClient::new(apis)),
            spellbook: Arc::new(SpellbookClient::new(apis)),
            rules,
        }
    }
}

/// Registry with every built-in tool, in declaration order.
pub fn default_registry(ctx: &ToolContext) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(scryfall_tools::SearchCardsTool::new(ctx.scryfall.clone())));
    registry.register(Box::new(scryfall_tools::GetCardTool::new(ctx.scryfall.clone())));
    registry.register(Box::new(scryfall_tools::RandomCardTool::new(ctx.scryfall.clone())));
    registry.register(Box::new(scryfall_tools::GetRulingsTool::new(ctx.scryfall.clone())));
    registry.register(Box::new(spellbook_tools::SearchCombosTool::new(ctx.spellbook.clone())));
    registry.register(Box::new(spellbook_tools::FindCombosForCardsTool::new(ctx.spellbook.clone())));
    registry.register(Box::new(spellbook_tools::GetComboTool::new(ctx.spellbook.clone())));
    registry.register(Box::new(spellbook_tools::FindCombosInDecklistTool::new(ctx.spellbook.clone())));
    registry.register(Box::new(spellbook_tools::EstimateBracketTool::new(ctx.spellbook.clone())));
    registry.register(Box::new(rules_search::RulesSearchTool::new(ctx.rules.clone())));
    registry
}
