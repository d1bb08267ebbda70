//! Card lookup tools backed by Scryfall.

use std::sync::Arc;

use async_trait::async_trait;
use judgebot_core::error::ToolError;
use judgebot_core::schema::{InputSchema, ParamKind};
use judgebot_core::tool::Tool;
use serde_json::{Value, json};

use crate::args;
use crate::format::{self, ResponseFormat, SEPARATOR};
use crate::scryfall::{NameMatch, ScryfallClient};

fn response_format_param(schema: InputSchema) -> InputSchema {
    schema.optional(
        "response_format",
        "Output format: 'markdown' for readable text, 'json' for raw data",
        ParamKind::Enum(ResponseFormat::VALUES.to_vec()),
        Some(json!("markdown")),
    )
}

pub struct SearchCardsTool {
    client: Arc<ScryfallClient>,
}

impl SearchCardsTool {
    pub fn new(client: Arc<ScryfallClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SearchCardsTool {
    fn name(&self) -> &str {
        "scryfall_search_cards"
    }

    fn description(&self) -> &str {
        "Search for Magic: The Gathering cards using Scryfall search syntax. \
         Operators: c: (color), id: (commander color identity), t: (type), o: (oracle text), \
         cmc:/mv: (mana value), pow:/tou:, r: (rarity), is:commander."
    }

    fn input_schema(&self) -> InputSchema {
        response_format_param(
            InputSchema::new()
                .required(
                    "query",
                    "Search query using Scryfall syntax, e.g. 'c:green t:creature pow>=5' or 't:legendary t:creature id:simic'",
                    ParamKind::string_len(1, 500),
                )
                .optional(
                    "limit",
                    "Maximum number of results to return (1-50)",
                    ParamKind::int_range(1, 50),
                    Some(json!(10)),
                )
                .optional(
                    "order",
                    "Sort order: name, released, set, rarity, color, usd, cmc, power, toughness, edhrec",
                    ParamKind::string(),
                    None,
                ),
        )
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let query = args::req_str(arguments, "query")?;
        let limit = args::int_or(arguments, "limit", 10) as usize;
        let order = args::opt_str(arguments, "order");

        let list = self
            .client
            .search(query, order)
            .await
            .map_err(|e| args::failed(self.name(), e))?;

        let total = list.total_cards.unwrap_or(list.data.len() as u64);
        let cards = &list.data[..list.data.len().min(limit)];

        if ResponseFormat::from_args(arguments) == ResponseFormat::Json {
            return format::to_json(self.name(), &json!({ "total": total, "cards": cards }));
        }

        let mut lines = vec![format!("**Found {total} cards** (showing {})\n", cards.len())];
        for card in cards {
            lines.push(format::card_markdown(card));
            lines.push(SEPARATOR.into());
        }
        Ok(lines.join("\n"))
    }
}

pub struct GetCardTool {
    client: Arc<ScryfallClient>,
}

impl GetCardTool {
    pub fn new(client: Arc<ScryfallClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetCardTool {
    fn name(&self) -> &str {
        "scryfall_get_card"
    }

    fn description(&self) -> &str {
        "Look up a specific Magic: The Gathering card by name. Supports fuzzy matching for typos or partial names."
    }

    fn input_schema(&self) -> InputSchema {
        response_format_param(
            InputSchema::new()
                .required(
                    "name",
                    "Card name to look up (e.g., 'Lightning Bolt', 'Rhystic Study')",
                    ParamKind::string_len(1, 200),
                )
                .optional(
                    "fuzzy",
                    "Allow fuzzy matching for typos/partial names; false requires an exact name",
                    ParamKind::Bool,
                    Some(json!(true)),
                )
                .optional(
                    "set_code",
                    "Set code for a specific printing (e.g., 'mh2', 'cmr')",
                    ParamKind::string(),
                    None,
                ),
        )
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let name = args::req_str(arguments, "name")?;
        let matching = if args::bool_or(arguments, "fuzzy", true) {
            NameMatch::Fuzzy
        } else {
            NameMatch::Exact
        };
        let set_code = args::opt_str(arguments, "set_code");

        let card = self
            .client
            .named(name, matching, set_code)
            .await
            .map_err(|e| args::failed(self.name(), e))?;

        match ResponseFormat::from_args(arguments) {
            ResponseFormat::Json => format::to_json(self.name(), &card),
            ResponseFormat::Markdown => Ok(format::card_markdown(&card)),
        }
    }
}

pub struct RandomCardTool {
    client: Arc<ScryfallClient>,
}

impl RandomCardTool {
    pub fn new(client: Arc<ScryfallClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for RandomCardTool {
    fn name(&self) -> &str {
        "scryfall_random_card"
    }

    fn description(&self) -> &str {
        "Get a random Magic: The Gathering card, optionally filtered by a Scryfall query."
    }

    fn input_schema(&self) -> InputSchema {
        response_format_param(InputSchema::new().optional(
            "query",
            "Scryfall query to filter the random selection, e.g. 't:creature c:red'",
            ParamKind::Str {
                min_len: None,
                max_len: Some(500),
            },
            None,
        ))
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let card = self
            .client
            .random(args::opt_str(arguments, "query"))
            .await
            .map_err(|e| args::failed(self.name(), e))?;

        match ResponseFormat::from_args(arguments) {
            ResponseFormat::Json => format::to_json(self.name(), &card),
            ResponseFormat::Markdown => Ok(format::card_markdown(&card)),
        }
    }
}

pub struct GetRulingsTool {
    client: Arc<ScryfallClient>,
}

impl GetRulingsTool {
    pub fn new(client: Arc<ScryfallClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetRulingsTool {
    fn name(&self) -> &str {
        "scryfall_get_rulings"
    }

    fn description(&self) -> &str {
        "Get official rulings (Wizards of the Coast clarifications) for a Magic: The Gathering card."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new().required(
            "card_name",
            "Name of the card to get rulings for",
            ParamKind::string_len(1, 200),
        )
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let card_name = args::req_str(arguments, "card_name")?;

        let card = self
            .client
            .named(card_name, NameMatch::Fuzzy, None)
            .await
            .map_err(|e| args::failed(self.name(), format!("Could not find card '{card_name}': {e}")))?;

        let rulings = self
            .client
            .rulings(&card.id)
            .await
            .map_err(|e| args::failed(self.name(), e))?;

        Ok(format::rulings_markdown(&card.name, &rulings))
    }
}
