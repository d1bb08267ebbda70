//! Markdown rendering for tool output.

use judgebot_core::error::ToolError;
use judgebot_rules::RuleHit;
use serde::Serialize;

use crate::scryfall::{Card, Ruling};
use crate::spellbook::{BracketEstimate, Combo};

const SPELLBOOK_COMBO_URL: &str = "https://commanderspellbook.com/combo";
const TWO_CARD_COMBO_LIMIT: usize = 8;
pub const SEPARATOR: &str = "\n---\n";

/// Requested output shape for tools that return records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Markdown,
    Json,
}

impl ResponseFormat {
    pub const VALUES: [&'static str; 2] = ["markdown", "json"];

    pub fn from_args(args: &serde_json::Value) -> Self {
        match args.get("response_format").and_then(|v| v.as_str()) {
            Some("json") => Self::Json,
            _ => Self::Markdown,
        }
    }
}

pub fn to_json<T: Serialize + ?Sized>(tool: &str, value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::ExecutionFailed {
        tool_name: tool.into(),
        reason: format!("Failed to serialize result: {e}"),
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn card_markdown(card: &Card) -> String {
    let mut lines = vec![format!(
        "## {} {}",
        card.name,
        card.mana_cost.as_deref().unwrap_or_default()
    )
    .trim_end()
    .to_string()];

    if let Some(type_line) = card.type_line.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("**{type_line}**"));
    }
    if let Some(text) = card.oracle_text.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("\n{text}"));
    }
    if let (Some(power), Some(toughness)) = (&card.power, &card.toughness) {
        lines.push(format!("\n**P/T:** {power}/{toughness}"));
    }
    if let Some(loyalty) = &card.loyalty {
        lines.push(format!("\n**Starting Loyalty:** {loyalty}"));
    }
    if let Some(set_name) = card.set_name.as_deref().filter(|s| !s.is_empty()) {
        let rarity = capitalize(card.rarity.as_deref().unwrap_or_default());
        lines.push(format!("\n*{set_name} ({rarity})*"));
    }

    let commander = card
        .legalities
        .get("commander")
        .map(String::as_str)
        .unwrap_or("unknown");
    lines.push(format!("\n**Commander Legal:** {commander}"));

    let mut prices = Vec::new();
    if let Some(usd) = &card.prices.usd {
        prices.push(format!("${usd}"));
    }
    if let Some(foil) = &card.prices.usd_foil {
        prices.push(format!("${foil} foil"));
    }
    if !prices.is_empty() {
        lines.push(format!("**Price:** {}", prices.join(" / ")));
    }

    if let Some(uri) = card.scryfall_uri.as_deref().filter(|u| !u.is_empty()) {
        lines.push(format!("\n[View on Scryfall]({uri})"));
    }

    lines.join("\n")
}

pub fn rulings_markdown(card_name: &str, rulings: &[Ruling]) -> String {
    if rulings.is_empty() {
        return format!(
            "**No rulings found for {card_name}.**\n\nThis card has no official rulings or clarifications."
        );
    }

    let mut lines = vec![format!("## Rulings for {card_name}\n")];
    for ruling in rulings {
        let date = if ruling.published_at.is_empty() {
            "Unknown date"
        } else {
            &ruling.published_at
        };
        let source = match ruling.source.as_str() {
            "wotc" | "" => "Wizards of the Coast".to_string(),
            other => other.to_uppercase(),
        };
        lines.push(format!("**{date}** ({source})"));
        lines.push(format!("> {}\n", ruling.comment));
    }
    lines.join("\n")
}

pub fn combo_markdown(combo: &Combo) -> String {
    let mut lines = vec![format!("## Combo #{}", combo.id)];

    let names = combo.card_names();
    if !names.is_empty() {
        lines.push(format!("\n**Cards:** {}", names.join(", ")));
    }
    if !combo.identity.is_empty() {
        lines.push(format!("**Color Identity:** {}", combo.identity));
    }

    let prerequisites: Vec<&str> = combo
        .requires
        .iter()
        .map(|r| r.template.name.as_str())
        .filter(|n| !n.is_empty())
        .collect();
    if !prerequisites.is_empty() {
        lines.push("\n**Prerequisites:**".into());
        lines.extend(prerequisites.iter().map(|p| format!("- {p}")));
    }

    if !combo.description.is_empty() {
        lines.push(format!("\n**Steps:**\n{}", combo.description));
    }

    let results: Vec<&str> = combo
        .produces
        .iter()
        .map(|p| p.feature.name.as_str())
        .filter(|n| !n.is_empty())
        .collect();
    if !results.is_empty() {
        lines.push("\n**Results:**".into());
        lines.extend(results.iter().map(|r| format!("- {r}")));
    }

    if let Some(bracket) = &combo.bracket {
        lines.push(format!("\n**Bracket:** {bracket}"));
    }

    lines.push(format!(
        "\n[View on Commander Spellbook]({SPELLBOOK_COMBO_URL}/{})",
        combo.id
    ));
    lines.join("\n")
}

/// A list of combos, each followed by a separator.
pub fn combo_list(header: &str, combos: &[Combo]) -> String {
    let mut lines = vec![header.to_string()];
    for combo in combos {
        lines.push(combo_markdown(combo));
        lines.push(SEPARATOR.into());
    }
    lines.join("\n")
}

pub fn bracket_description(bracket: u64) -> Option<&'static str> {
    match bracket {
        1 => Some("Exhibition - Thematic, creative, 9+ turns expected"),
        2 => Some("Core - Unoptimized, social, no two-card infinites"),
        3 => Some("Upgraded - Strong synergy, up to 3 game changers"),
        4 => Some("Optimized/cEDH - Lethal, consistent, anything goes"),
        _ => None,
    }
}

pub fn bracket_markdown(estimate: &BracketEstimate, cards_analyzed: usize) -> String {
    let label = estimate
        .bracket
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "Unknown".into());

    let mut lines = vec![
        format!("## Bracket Estimation: **{label}**"),
        format!("*Cards analyzed: {cards_analyzed}*\n"),
    ];

    if let Some(desc) = estimate
        .bracket
        .as_ref()
        .and_then(|b| b.number())
        .and_then(bracket_description)
    {
        lines.push(format!("**{desc}**\n"));
    }

    let two_card = &estimate.two_card_combos;
    if !two_card.is_empty() {
        lines.push(format!("### Two-Card Combos ({} found)", two_card.len()));
        lines.push("*These have the biggest impact on bracket level*\n".into());
        for combo in two_card.iter().take(TWO_CARD_COMBO_LIMIT) {
            let bracket = combo
                .bracket
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "?".into());
            let results: Vec<&str> = combo
                .produces
                .iter()
                .take(2)
                .map(|p| p.feature.name.as_str())
                .collect();
            let results = if results.is_empty() {
                String::new()
            } else {
                format!(" → {}", results.join(", "))
            };
            lines.push(format!(
                "- **{}** (B{bracket}){results}",
                combo.card_names().join(" + ")
            ));
        }
        if two_card.len() > TWO_CARD_COMBO_LIMIT {
            lines.push(format!(
                "\n*...and {} more two-card combos*",
                two_card.len() - TWO_CARD_COMBO_LIMIT
            ));
        }
    }

    if !estimate.combos_by_bracket.is_empty() {
        lines.push("\n### All Combos by Bracket Level".into());
        for (level, combos) in &estimate.combos_by_bracket {
            lines.push(format!("- Bracket {level}: {} combos", combos.count()));
        }
    }

    lines.join("\n")
}

/// `●●●` high, `●●○` medium, `●○○` lower; thresholds are L2 distances.
pub fn relevance_marks(distance: f32) -> &'static str {
    if distance < 0.5 {
        "●●●"
    } else if distance < 1.0 {
        "●●○"
    } else {
        "●○○"
    }
}

pub fn rule_hits_markdown(query: &str, hits: &[RuleHit]) -> String {
    if hits.is_empty() {
        return format!("**No relevant rules found for:** {query}\n\nTry rephrasing your question.");
    }

    let mut lines = vec![format!("**Relevant rules for:** {query}\n")];
    for hit in hits {
        lines.push(format!(
            "### {} {}",
            hit.chunk.rule_number,
            relevance_marks(hit.distance)
        ));
        lines.push(format!("{}\n", hit.chunk.text));
    }
    lines.push("---".into());
    lines.push("*Relevance: ●●● = High, ●●○ = Medium, ●○○ = Lower*".into());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scryfall::Prices;
    use crate::spellbook::{BracketCombos, BracketLevel, ComboCard, Feature, NamedRef, Template};
    use judgebot_rules::RuleChunk;

    fn sol_ring() -> Card {
        Card {
            id: "1".into(),
            name: "Sol Ring".into(),
            mana_cost: Some("{1}".into()),
            type_line: Some("Artifact".into()),
            oracle_text: Some("{T}: Add {C}{C}.".into()),
            set_name: Some("Commander Masters".into()),
            rarity: Some("uncommon".into()),
            legalities: [("commander".to_string(), "legal".to_string())].into(),
            prices: Prices {
                usd: Some("1.99".into()),
                usd_foil: Some("4.50".into()),
            },
            scryfall_uri: Some("https://scryfall.com/card/cmm/1".into()),
            ..Default::default()
        }
    }

    fn combo(id: &str, cards: &[&str], bracket: Option<u64>) -> Combo {
        Combo {
            id: id.into(),
            uses: cards
                .iter()
                .map(|c| ComboCard {
                    card: NamedRef { name: (*c).into() },
                })
                .collect(),
            identity: "UB".into(),
            requires: vec![Template {
                template: NamedRef {
                    name: "Library is empty".into(),
                },
            }],
            description: "Cast Demonic Consultation naming a card not in your deck.".into(),
            produces: vec![Feature {
                feature: NamedRef {
                    name: "Win the game".into(),
                },
            }],
            bracket: bracket.map(BracketLevel::Number),
            missing: vec![],
        }
    }

    #[test]
    fn card_markdown_includes_key_fields() {
        let md = card_markdown(&sol_ring());
        assert!(md.starts_with("## Sol Ring {1}\n**Artifact**"));
        assert!(md.contains("*Commander Masters (Uncommon)*"));
        assert!(md.contains("**Commander Legal:** legal"));
        assert!(md.contains("**Price:** $1.99 / $4.50 foil"));
        assert!(md.contains("[View on Scryfall](https://scryfall.com/card/cmm/1)"));
        assert!(!md.contains("P/T"));
    }

    #[test]
    fn card_markdown_creature_and_unknown_legality() {
        let card = Card {
            name: "Grizzly Bears".into(),
            power: Some("2".into()),
            toughness: Some("2".into()),
            ..Default::default()
        };
        let md = card_markdown(&card);
        assert!(md.starts_with("## Grizzly Bears\n"));
        assert!(md.contains("**P/T:** 2/2"));
        assert!(md.contains("**Commander Legal:** unknown"));
        assert!(!md.contains("Price"));
    }

    #[test]
    fn rulings_markdown_formats_sources() {
        let rulings = vec![
            Ruling {
                source: "wotc".into(),
                published_at: "2020-08-07".into(),
                comment: "It's a mana ability.".into(),
            },
            Ruling {
                source: "scryfall".into(),
                published_at: String::new(),
                comment: "Note.".into(),
            },
        ];
        let md = rulings_markdown("Sol Ring", &rulings);
        assert!(md.starts_with("## Rulings for Sol Ring"));
        assert!(md.contains("**2020-08-07** (Wizards of the Coast)\n> It's a mana ability."));
        assert!(md.contains("**Unknown date** (SCRYFALL)"));
        assert!(rulings_markdown("Island", &[]).starts_with("**No rulings found for Island.**"));
    }

    #[test]
    fn combo_markdown_sections() {
        let md = combo_markdown(&combo("1-2", &["Thassa's Oracle", "Demonic Consultation"], Some(4)));
        assert!(md.starts_with("## Combo #1-2"));
        assert!(md.contains("**Cards:** Thassa's Oracle, Demonic Consultation"));
        assert!(md.contains("**Color Identity:** UB"));
        assert!(md.contains("**Prerequisites:**\n- Library is empty"));
        assert!(md.contains("**Results:**\n- Win the game"));
        assert!(md.contains("**Bracket:** 4"));
        assert!(md.ends_with("[View on Commander Spellbook](https://commanderspellbook.com/combo/1-2)"));
    }

    #[test]
    fn bracket_markdown_caps_two_card_list() {
        let estimate = BracketEstimate {
            bracket: Some(BracketLevel::Label("4".into())),
            combos_by_bracket: [("4".to_string(), BracketCombos::Count(10))].into(),
            two_card_combos: (0..10).map(|i| combo(&i.to_string(), &["A", "B"], Some(4))).collect(),
        };
        let md = bracket_markdown(&estimate, 100);
        assert!(md.starts_with("## Bracket Estimation: **4**"));
        assert!(md.contains("*Cards analyzed: 100*"));
        assert!(md.contains("**Optimized/cEDH - Lethal, consistent, anything goes**"));
        assert!(md.contains("### Two-Card Combos (10 found)"));
        assert_eq!(md.matches("- **A + B** (B4) → Win the game").count(), 8);
        assert!(md.contains("*...and 2 more two-card combos*"));
        assert!(md.contains("- Bracket 4: 10 combos"));
    }

    #[test]
    fn relevance_thresholds() {
        assert_eq!(relevance_marks(0.2), "●●●");
        assert_eq!(relevance_marks(0.5), "●●○");
        assert_eq!(relevance_marks(0.99), "●●○");
        assert_eq!(relevance_marks(1.0), "●○○");
    }

    #[test]
    fn rule_hits_markdown_lists_rules() {
        let hits = vec![RuleHit {
            chunk: RuleChunk {
                id: "rule_0".into(),
                rule_number: "702.2b".into(),
                text: "Keyword Abilities (702): deathtouch text".into(),
                section: "702".into(),
                section_title: Some("Keyword Abilities".into()),
            },
            distance: 0.3,
        }];
        let md = rule_hits_markdown("deathtouch", &hits);
        assert!(md.starts_with("**Relevant rules for:** deathtouch"));
        assert!(md.contains("### 702.2b ●●●\nKeyword Abilities (702): deathtouch text"));
        assert!(md.ends_with("*Relevance: ●●● = High, ●●○ = Medium, ●○○ = Lower*"));
        assert!(rule_hits_markdown("x", &[]).contains("Try rephrasing"));
    }

    #[test]
    fn response_format_from_args() {
        assert_eq!(ResponseFormat::from_args(&serde_json::json!({})), ResponseFormat::Markdown);
        assert_eq!(
            ResponseFormat::from_args(&serde_json::json!({"response_format": "json"})),
            ResponseFormat::Json
        );
    }
}
