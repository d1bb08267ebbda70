//! Commander Spellbook combo database client and records.

use std::collections::BTreeMap;
use std::fmt;

use judgebot_config::ApiConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http::{ApiClient, ApiError};

/// `{"name": ...}` as nested inside combo records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComboCard {
    #[serde(default)]
    pub card: NamedRef,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub feature: NamedRef,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub template: NamedRef,
}

/// Spellbook reports brackets both as numbers and as labels like `"3"` or `"4 (Optimized)"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BracketLevel {
    Number(u64),
    Label(String),
}

impl BracketLevel {
    /// The leading bracket number, when there is one.
    pub fn number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Label(s) => s.split_whitespace().next()?.parse().ok(),
        }
    }
}

impl fmt::Display for BracketLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Label(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Combo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uses: Vec<ComboCard>,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub requires: Vec<Template>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub produces: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bracket: Option<BracketLevel>,
    /// Cards the deck lacks, on "almost included" results
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<ComboCard>,
}

impl Combo {
    pub fn card_names(&self) -> Vec<&str> {
        self.uses.iter().map(|u| u.card.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantPage {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub results: Vec<Combo>,
}

/// A decklist entry: a bare name or an object carrying one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeckEntry {
    Name(String),
    Entry {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        card: Option<String>,
    },
}

impl DeckEntry {
    pub fn name(&self) -> Option<&str> {
        let name = match self {
            Self::Name(n) => Some(n.as_str()),
            Self::Entry { name, card } => name.as_deref().or(card.as_deref()),
        };
        name.map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Cards extracted from a decklist URL or pasted text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckCards {
    #[serde(default)]
    pub commanders: Vec<DeckEntry>,
    #[serde(default)]
    pub main: Vec<DeckEntry>,
    #[serde(default)]
    pub cards: Vec<DeckEntry>,
}

impl DeckCards {
    /// Every named card, commanders first.
    pub fn names(&self) -> Vec<String> {
        self.commanders
            .iter()
            .chain(&self.main)
            .chain(&self.cards)
            .filter_map(DeckEntry::name)
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindMyCombosResults {
    #[serde(default)]
    pub included: Vec<Combo>,
    #[serde(default, alias = "almostIncluded")]
    pub almost_included: Vec<Combo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindMyCombos {
    #[serde(default)]
    pub results: FindMyCombosResults,
}

/// Combos per bracket come back as either the combos themselves or a count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BracketCombos {
    Count(u64),
    Listed(Vec<serde_json::Value>),
}

impl BracketCombos {
    pub fn count(&self) -> u64 {
        match self {
            Self::Count(n) => *n,
            Self::Listed(v) => v.len() as u64,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BracketEstimate {
    #[serde(default)]
    pub bracket: Option<BracketLevel>,
    #[serde(default)]
    pub combos_by_bracket: BTreeMap<String, BracketCombos>,
    #[serde(default)]
    pub two_card_combos: Vec<Combo>,
}

/// Where a decklist comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Decklist {
    Url(String),
    Text(String),
}

pub struct SpellbookClient {
    api: ApiClient,
}

impl SpellbookClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self::with_base_url(&config.spellbook_url, config)
    }

    pub fn with_base_url(base_url: &str, config: &ApiConfig) -> Self {
        Self {
            api: ApiClient::new(base_url, config),
        }
    }

    pub async fn variants(
        &self,
        query: &str,
        limit: u32,
        identity: Option<&str>,
    ) -> Result<VariantPage, ApiError> {
        let mut params = vec![("q", query.to_string()), ("limit", limit.to_string())];
        if let Some(identity) = identity {
            params.push(("id", identity.to_uppercase()));
        }
        self.api.get_json("/variants", &params).await
    }

    pub async fn variant(&self, id: &str) -> Result<Combo, ApiError> {
        self.api.get_json(&format!("/variants/{id}"), &[]).await
    }

    pub async fn deck_cards(&self, deck: &Decklist) -> Result<DeckCards, ApiError> {
        match deck {
            Decklist::Url(url) => {
                self.api
                    .post_json("/card-list-from-url/", &json!({ "url": url }))
                    .await
            }
            Decklist::Text(text) => {
                self.api
                    .post_json("/card-list-from-text/", &json!({ "text": text }))
                    .await
            }
        }
    }

    pub async fn find_my_combos(&self, cards: &[String]) -> Result<FindMyCombos, ApiError> {
        self.api
            .post_json("/find-my-combos/", &json!({ "cards": cards }))
            .await
    }

    pub async fn estimate_bracket(&self, cards: &[String]) -> Result<BracketEstimate, ApiError> {
        self.api
            .post_json("/estimate-bracket/", &json!({ "cards": cards }))
            .await
    }
}

/// `card:"A" OR card:"B"`, skipping blank names.
pub fn cards_query(cards: &[String]) -> String {
    cards
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| format!("card:\"{c}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_query_for_cards() {
        let cards = vec!["Thassa's Oracle".into(), "  ".into(), "Demonic Consultation".into()];
        assert_eq!(
            cards_query(&cards),
            r#"card:"Thassa's Oracle" OR card:"Demonic Consultation""#
        );
    }

    #[test]
    fn bracket_level_parses_numbers_and_labels() {
        let n: BracketLevel = serde_json::from_str("3").unwrap();
        let label: BracketLevel = serde_json::from_str(r#""4 (Optimized)""#).unwrap();
        assert_eq!(n.number(), Some(3));
        assert_eq!(label.number(), Some(4));
        assert_eq!(label.to_string(), "4 (Optimized)");
    }

    #[test]
    fn deck_cards_collects_names_from_every_shape() {
        let deck: DeckCards = serde_json::from_value(serde_json::json!({
            "commanders": [{"card": "Kinnan, Bonder Prodigy", "quantity": 1}],
            "main": [{"card": "Basalt Monolith", "quantity": 1}, {"card": " "}],
            "cards": ["Sol Ring", {"name": "Arcane Signet"}]
        }))
        .unwrap();
        assert_eq!(
            deck.names(),
            vec!["Kinnan, Bonder Prodigy", "Basalt Monolith", "Sol Ring", "Arcane Signet"]
        );
    }

    #[test]
    fn find_my_combos_accepts_camel_case() {
        let found: FindMyCombos = serde_json::from_value(serde_json::json!({
            "results": {"included": [], "almostIncluded": [{"id": "1-2"}]}
        }))
        .unwrap();
        assert_eq!(found.results.almost_included[0].id, "1-2");
    }

    #[test]
    fn bracket_combos_count_either_shape() {
        let estimate: BracketEstimate = serde_json::from_value(serde_json::json!({
            "bracket": "3",
            "combos_by_bracket": {"2": 4, "4": [{"id": "a"}, {"id": "b"}]}
        }))
        .unwrap();
        assert_eq!(estimate.combos_by_bracket["2"].count(), 4);
        assert_eq!(estimate.combos_by_bracket["4"].count(), 2);
    }
}
