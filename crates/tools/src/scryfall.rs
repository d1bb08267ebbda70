//! Scryfall card database client and records.
//!
//! Scryfall asks for a User-Agent on every request and 50-100ms between
//! requests; both are handled by the underlying [`ApiClient`].

use std::collections::BTreeMap;
use std::time::Duration;

use judgebot_config::ApiConfig;
use serde::{Deserialize, Serialize};

use crate::http::{ApiClient, ApiError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usd_foil: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Card {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mana_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toughness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loyalty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    #[serde(default)]
    pub legalities: BTreeMap<String, String>,
    #[serde(default)]
    pub prices: Prices,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scryfall_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardList {
    #[serde(default)]
    pub total_cards: Option<u64>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub data: Vec<Card>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ruling {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published_at: String,
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RulingList {
    #[serde(default)]
    data: Vec<Ruling>,
}

/// How to match a card name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Fuzzy,
    Exact,
}

impl NameMatch {
    fn param(self) -> &'static str {
        match self {
            Self::Fuzzy => "fuzzy",
            Self::Exact => "exact",
        }
    }
}

pub struct ScryfallClient {
    api: ApiClient,
}

impl ScryfallClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self::with_base_url(&config.scryfall_url, config)
    }

    pub fn with_base_url(base_url: &str, config: &ApiConfig) -> Self {
        Self {
            api: ApiClient::new(base_url, config)
                .with_pause(Duration::from_millis(config.scryfall_delay_ms))
                .with_error_field("details"),
        }
    }

    pub async fn search(&self, query: &str, order: Option<&str>) -> Result<CardList, ApiError> {
        let mut params = vec![("q", query.to_string())];
        if let Some(order) = order {
            params.push(("order", order.to_string()));
        }
        self.api.get_json("/cards/search", &params).await
    }

    pub async fn named(&self, name: &str, matching: NameMatch, set_code: Option<&str>) -> Result<Card, ApiError> {
        let mut params = vec![(matching.param(), name.to_string())];
        if let Some(set) = set_code {
            params.push(("set", set.to_string()));
        }
        self.api.get_json("/cards/named", &params).await
    }

    pub async fn random(&self, query: Option<&str>) -> Result<Card, ApiError> {
        let params: Vec<(&str, String)> = query.map(|q| ("q", q.to_string())).into_iter().collect();
        self.api.get_json("/cards/random", &params).await
    }

    pub async fn rulings(&self, card_id: &str) -> Result<Vec<Ruling>, ApiError> {
        let list: RulingList = self
            .api
            .get_json(&format!("/cards/{card_id}/rulings"), &[])
            .await?;
        Ok(list.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_deserializes_with_missing_fields() {
        let card: Card = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "name": "Sol Ring",
            "mana_cost": "{1}",
            "type_line": "Artifact",
            "legalities": {"commander": "legal"},
            "prices": {"usd": "1.50", "usd_foil": null},
            "unknown_field": 7
        }))
        .unwrap();

        assert_eq!(card.name, "Sol Ring");
        assert_eq!(card.legalities["commander"], "legal");
        assert_eq!(card.prices.usd.as_deref(), Some("1.50"));
        assert!(card.prices.usd_foil.is_none());
        assert!(card.power.is_none());
    }

    #[test]
    fn card_list_defaults() {
        let list: CardList = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(list.total_cards.is_none());
        assert!(!list.has_more);
    }
}
