//! Combo and bracket tools backed by Commander Spellbook.

use std::sync::Arc;

use async_trait::async_trait;
use judgebot_core::error::ToolError;
use judgebot_core::schema::{InputSchema, ParamKind};
use judgebot_core::tool::Tool;
use serde_json::{Value, json};
use tracing::debug;

use crate::args;
use crate::format::{self, ResponseFormat, SEPARATOR};
use crate::spellbook::{Decklist, SpellbookClient, cards_query};

fn with_response_format(schema: InputSchema) -> InputSchema {
    schema.optional(
        "response_format",
        "Output format: 'markdown' for readable text, 'json' for raw data",
        ParamKind::Enum(ResponseFormat::VALUES.to_vec()),
        Some(json!("markdown")),
    )
}

fn with_decklist(schema: InputSchema) -> InputSchema {
    schema
        .optional(
            "decklist_url",
            "URL to a decklist (Moxfield, Archidekt, Deckstats, etc.)",
            ParamKind::string(),
            None,
        )
        .optional(
            "decklist_text",
            "Pasted decklist text, one card per line (e.g. '1 Sol Ring')",
            ParamKind::string(),
            None,
        )
}

/// Resolve a decklist argument into card names via Spellbook's list parsers.
async fn deck_card_names(
    client: &SpellbookClient,
    tool: &str,
    arguments: &Value,
) -> Result<Vec<String>, ToolError> {
    let deck = args::decklist(arguments)?;
    let cards = client.deck_cards(&deck).await.map_err(|e| match deck {
        Decklist::Url(_) => args::failed(
            tool,
            format!(
                "Could not fetch decklist from URL ({e}). Make sure it's a valid Moxfield, Archidekt, or similar link."
            ),
        ),
        Decklist::Text(_) => args::failed(tool, format!("Could not parse the decklist text ({e})")),
    })?;

    let names = cards.names();
    if names.is_empty() {
        return Err(args::failed(tool, "Couldn't extract any cards from that decklist."));
    }
    debug!(tool, cards = names.len(), "Decklist resolved");
    Ok(names)
}

pub struct SearchCombosTool {
    client: Arc<SpellbookClient>,
}

impl SearchCombosTool {
    pub fn new(client: Arc<SpellbookClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SearchCombosTool {
    fn name(&self) -> &str {
        "spellbook_search_combos"
    }

    fn description(&self) -> &str {
        "Search Commander Spellbook for Commander/EDH combos by card names, effects, or color identity."
    }

    fn input_schema(&self) -> InputSchema {
        with_response_format(
            InputSchema::new()
                .required(
                    "query",
                    "Search text: card names, effects like 'infinite mana', or Spellbook syntax",
                    ParamKind::string_len(1, 500),
                )
                .optional(
                    "color_identity",
                    "Restrict to a color identity, e.g. 'UB' or 'GUR'",
                    ParamKind::string(),
                    None,
                )
                .optional(
                    "limit",
                    "Maximum number of combos to return (1-50)",
                    ParamKind::int_range(1, 50),
                    Some(json!(10)),
                ),
        )
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let query = args::req_str(arguments, "query")?;
        let limit = args::int_or(arguments, "limit", 10);
        let identity = args::opt_str(arguments, "color_identity");

        let page = self
            .client
            .variants(query, limit, identity)
            .await
            .map_err(|e| args::failed(self.name(), e))?;
        let combos = &page.results[..page.results.len().min(limit as usize)];

        if combos.is_empty() {
            return Ok(
                "**No combos found.** Try a different search query or broader color identity.".into(),
            );
        }
        if ResponseFormat::from_args(arguments) == ResponseFormat::Json {
            return format::to_json(self.name(), combos);
        }
        Ok(format::combo_list(
            &format!("**Found {} combos**\n", combos.len()),
            combos,
        ))
    }
}

pub struct FindCombosForCardsTool {
    client: Arc<SpellbookClient>,
}

impl FindCombosForCardsTool {
    pub fn new(client: Arc<SpellbookClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for FindCombosForCardsTool {
    fn name(&self) -> &str {
        "spellbook_find_combos_for_cards"
    }

    fn description(&self) -> &str {
        "Find combos that include any of the given cards. Useful for checking what a card list can combo into."
    }

    fn input_schema(&self) -> InputSchema {
        with_response_format(
            InputSchema::new()
                .required(
                    "cards",
                    "Card names to search combos for, e.g. ['Thassa's Oracle', 'Demonic Consultation']",
                    ParamKind::string_array(1, 100),
                )
                .optional(
                    "limit",
                    "Maximum number of combos to return (1-50)",
                    ParamKind::int_range(1, 50),
                    Some(json!(10)),
                ),
        )
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let cards = args::str_list(arguments, "cards");
        if cards.is_empty() {
            return Err(ToolError::InvalidArguments(
                "'cards' must contain at least one non-blank card name".into(),
            ));
        }
        let limit = args::int_or(arguments, "limit", 10);
        let card_list = cards.join(", ");

        let page = self
            .client
            .variants(&cards_query(&cards), limit, None)
            .await
            .map_err(|e| args::failed(self.name(), e))?;
        let combos = &page.results[..page.results.len().min(limit as usize)];

        if combos.is_empty() {
            return Ok(format!(
                "**No combos found** containing these cards: {card_list}\n\n\
                 These cards may not have any documented combos, or try different card names."
            ));
        }
        if ResponseFormat::from_args(arguments) == ResponseFormat::Json {
            return format::to_json(self.name(), combos);
        }
        Ok(format::combo_list(
            &format!(
                "**Combos containing:** {card_list}\n\n**Found {} combos**\n",
                combos.len()
            ),
            combos,
        ))
    }
}

pub struct GetComboTool {
    client: Arc<SpellbookClient>,
}

impl GetComboTool {
    pub fn new(client: Arc<SpellbookClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetComboTool {
    fn name(&self) -> &str {
        "spellbook_get_combo"
    }

    fn description(&self) -> &str {
        "Get full details of a Commander Spellbook combo by its ID: prerequisites, steps, and results."
    }

    fn input_schema(&self) -> InputSchema {
        with_response_format(InputSchema::new().required(
            "combo_id",
            "Commander Spellbook combo ID, e.g. '1414-2730'",
            ParamKind::Str {
                min_len: Some(1),
                max_len: None,
            },
        ))
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let combo_id = args::req_str(arguments, "combo_id")?;

        let combo = self.client.variant(combo_id).await.map_err(|e| {
            args::failed(
                self.name(),
                format!("Could not find combo with ID '{combo_id}': {e}"),
            )
        })?;

        match ResponseFormat::from_args(arguments) {
            ResponseFormat::Json => format::to_json(self.name(), &combo),
            ResponseFormat::Markdown => Ok(format::combo_markdown(&combo)),
        }
    }
}

pub struct FindCombosInDecklistTool {
    client: Arc<SpellbookClient>,
}

impl FindCombosInDecklistTool {
    pub fn new(client: Arc<SpellbookClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for FindCombosInDecklistTool {
    fn name(&self) -> &str {
        "spellbook_find_combos_in_decklist"
    }

    fn description(&self) -> &str {
        "Find all combos present in a decklist, given a deck URL or a pasted card list. \
         Also lists combos that are one card away."
    }

    fn input_schema(&self) -> InputSchema {
        with_response_format(with_decklist(InputSchema::new()).optional(
            "limit",
            "Maximum number of combos to return (1-20)",
            ParamKind::int_range(1, 20),
            Some(json!(10)),
        ))
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let limit = args::int_or(arguments, "limit", 10) as usize;
        let cards = deck_card_names(&self.client, self.name(), arguments).await?;

        let found = self
            .client
            .find_my_combos(&cards)
            .await
            .map_err(|e| args::failed(self.name(), e))?;
        let included = &found.results.included;
        let almost = &found.results.almost_included;

        if ResponseFormat::from_args(arguments) == ResponseFormat::Json {
            return format::to_json(
                self.name(),
                &json!({
                    "cards_analyzed": cards.len(),
                    "complete_combos": &included[..included.len().min(limit)],
                    "almost_complete": &almost[..almost.len().min(limit)],
                }),
            );
        }

        if included.is_empty() && almost.is_empty() {
            return Ok(format!(
                "**No combos found** in this deck ({} cards analyzed).",
                cards.len()
            ));
        }

        let mut lines = vec![format!("**Analyzed {} cards**\n", cards.len())];
        if !included.is_empty() {
            lines.push(format!("## Complete Combos ({} found)\n", included.len()));
            for combo in included.iter().take(limit) {
                lines.push(format::combo_markdown(combo));
                lines.push(SEPARATOR.into());
            }
        }

        let remaining = limit.saturating_sub(included.len());
        if !almost.is_empty() && remaining > 0 {
            lines.push("\n## Almost Complete (missing 1 card)\n".into());
            for combo in almost.iter().take(remaining) {
                if let Some(missing) = combo.missing.first() {
                    let name = if missing.card.name.is_empty() {
                        "Unknown"
                    } else {
                        &missing.card.name
                    };
                    lines.push(format!("**Missing:** {name}\n"));
                }
                lines.push(format::combo_markdown(combo));
                lines.push(SEPARATOR.into());
            }
        }

        Ok(lines.join("\n"))
    }
}

pub struct EstimateBracketTool {
    client: Arc<SpellbookClient>,
}

impl EstimateBracketTool {
    pub fn new(client: Arc<SpellbookClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for EstimateBracketTool {
    fn name(&self) -> &str {
        "spellbook_estimate_bracket"
    }

    fn description(&self) -> &str {
        "Estimate the Commander bracket (power level 1-4) of a decklist: \
         1 Exhibition, 2 Core, 3 Upgraded, 4 Optimized/cEDH."
    }

    fn input_schema(&self) -> InputSchema {
        with_response_format(with_decklist(InputSchema::new()))
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let cards = deck_card_names(&self.client, self.name(), arguments).await?;

        let estimate = self
            .client
            .estimate_bracket(&cards)
            .await
            .map_err(|e| args::failed(self.name(), e))?;

        if ResponseFormat::from_args(arguments) == ResponseFormat::Json {
            return format::to_json(
                self.name(),
                &json!({
                    "bracket": estimate.bracket,
                    "cards_analyzed": cards.len(),
                    "two_card_combos": estimate.two_card_combos,
                    "combos_by_bracket": estimate.combos_by_bracket,
                }),
            );
        }
        Ok(format::bracket_markdown(&estimate, cards.len()))
    }
}
