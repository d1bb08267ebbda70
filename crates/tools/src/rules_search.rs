//! Comprehensive Rules search over the locally ingested collection.

use std::sync::Arc;

use async_trait::async_trait;
use judgebot_core::error::{IndexError, ToolError};
use judgebot_core::schema::{InputSchema, ParamKind};
use judgebot_core::tool::Tool;
use judgebot_rules::SharedRulesIndex;
use serde_json::{Value, json};

use crate::args;
use crate::format;

/// Returned as ordinary tool output so the model can relay setup steps.
pub const RULES_SETUP_TEXT: &str = "**Rules database not found.**\n\n\
    To use this tool, the Comprehensive Rules need to be ingested first:\n\
    ```\n\
    judgebot ingest\n\
    ```\n\
    This downloads the Comprehensive Rules and builds the search index.";

pub struct RulesSearchTool {
    index: Arc<SharedRulesIndex>,
}

impl RulesSearchTool {
    pub fn new(index: Arc<SharedRulesIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for RulesSearchTool {
    fn name(&self) -> &str {
        "mtg_rules_search"
    }

    fn description(&self) -> &str {
        "Search the Magic: The Gathering Comprehensive Rules for rules relevant to a natural-language question. \
         Returns rule numbers with their text, most relevant first."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new()
            .required(
                "query",
                "Rules question in natural language, e.g. 'how does trample work with deathtouch'",
                ParamKind::string_len(3, 500),
            )
            .optional(
                "num_results",
                "Number of rules to return (1-15)",
                ParamKind::int_range(1, 15),
                Some(json!(5)),
            )
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let query = args::req_str(arguments, "query")?;
        let k = args::int_or(arguments, "num_results", 5) as usize;

        let index = match self.index.get().await {
            Ok(index) => index,
            Err(IndexError::NotAvailable(_)) => return Ok(RULES_SETUP_TEXT.into()),
            Err(e) => return Err(args::failed(self.name(), e)),
        };

        let hits = index
            .query(query, k)
            .await
            .map_err(|e| args::failed(self.name(), e))?;
        Ok(format::rule_hits_markdown(query, &hits))
    }
}
