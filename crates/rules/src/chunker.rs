//! Comprehensive Rules chunker.
//!
//! Splits the plain-text rules document into one chunk per numbered rule
//! (`704.5k`) plus one chunk per glossary term. Each rule chunk carries its
//! section title as a prefix so that a chunk read in isolation still says
//! which part of the game it governs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

static SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{3})\.\s+([A-Z].*)$").expect("section header pattern"));

static RULE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{3}\.\d+[a-z]?)\.?(?:[ \t]+|$)").expect("rule marker pattern"));

static GLOSSARY_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z ,'-]*$").expect("glossary term pattern"));

const GLOSSARY_HEADING: &str = "Glossary";
const GLOSSARY_SECTION: &str = "glossary";

/// One retrievable unit of the rules corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleChunk {
    /// `rule_<n>`, assigned in parse order after filtering
    pub id: String,

    /// `704.5k` or `glossary:<Term>`; unique within a parse
    pub rule_number: String,

    /// Whitespace-collapsed text, prefixed with the section title when known
    pub text: String,

    /// The 3-digit group, or `glossary`
    pub section: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Bodies shorter than this (in characters, after collapsing) are dropped
    pub min_text_len: usize,

    /// Glossary headings that are not terms
    pub skip_terms: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_text_len: 20,
            skip_terms: vec!["Glossary".into(), "Credits".into()],
        }
    }
}

/// Deterministic, side-effect free parser for the rules document.
#[derive(Debug, Clone, Default)]
pub struct RuleChunker {
    config: ChunkerConfig,
}

/// A chunk before ids are assigned.
struct Draft {
    rule_number: String,
    text: String,
    section: String,
    section_title: Option<String>,
}

impl RuleChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Parse the whole document.
    ///
    /// Rule chunks come first in document order, then glossary chunks.
    /// Duplicate rule numbers keep their first occurrence.
    pub fn parse(&self, raw: &str) -> Vec<RuleChunk> {
        let normalized = raw.trim_start_matches('\u{feff}').replace("\r\n", "\n");
        let lines: Vec<&str> = normalized.split('\n').collect();

        // The contents listing names the glossary too; the body heading is the last one.
        let glossary_at = lines
            .iter()
            .rposition(|line| line.trim() == GLOSSARY_HEADING);
        let (rule_lines, glossary_lines) = match glossary_at {
            Some(at) => (&lines[..at], &lines[at + 1..]),
            None => (&lines[..], &[][..]),
        };

        let titles = section_titles(rule_lines);

        let mut drafts = self.parse_rules(rule_lines, &titles);
        drafts.extend(self.parse_glossary(glossary_lines));

        let mut seen = HashSet::new();
        drafts
            .into_iter()
            .filter(|d| {
                let fresh = seen.insert(d.rule_number.clone());
                if !fresh {
                    debug!(rule = %d.rule_number, "Dropping duplicate rule number");
                }
                fresh
            })
            .enumerate()
            .map(|(i, d)| RuleChunk {
                id: format!("rule_{i}"),
                rule_number: d.rule_number,
                text: d.text,
                section: d.section,
                section_title: d.section_title,
            })
            .collect()
    }

    fn parse_rules(&self, lines: &[&str], titles: &HashMap<String, String>) -> Vec<Draft> {
        let mut drafts = Vec::new();
        let mut current: Option<(String, Vec<&str>)> = None;

        for &line in lines {
            let trimmed = line.trim_start();
            // A marker may be alone on its line; the body then starts below it.
            if let Some(caps) = RULE_MARKER.captures(trimmed) {
                if let Some((number, body)) = current.take() {
                    drafts.extend(self.rule_draft(number, &body, titles));
                }
                let marker_end = caps.get(0).map_or(0, |m| m.end());
                current = Some((caps[1].to_string(), vec![&trimmed[marker_end..]]));
            } else if SECTION_HEADER.is_match(trimmed.trim_end()) {
                if let Some((number, body)) = current.take() {
                    drafts.extend(self.rule_draft(number, &body, titles));
                }
            } else if let Some((_, body)) = current.as_mut() {
                body.push(line);
            }
        }

        if let Some((number, body)) = current {
            drafts.extend(self.rule_draft(number, &body, titles));
        }

        drafts
    }

    fn rule_draft(
        &self,
        rule_number: String,
        body: &[&str],
        titles: &HashMap<String, String>,
    ) -> Option<Draft> {
        let text = collapse_whitespace(body);
        if text.chars().count() < self.config.min_text_len {
            return None;
        }

        let section = rule_number
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();
        let section_title = titles.get(&section).cloned();
        let text = match &section_title {
            Some(title) => format!("{title} ({section}): {text}"),
            None => text,
        };

        Some(Draft {
            rule_number,
            text,
            section,
            section_title,
        })
    }

    fn parse_glossary(&self, lines: &[&str]) -> Vec<Draft> {
        let is_blank = |i: usize| lines.get(i).is_none_or(|l| l.trim().is_empty());

        let is_skipped = |term: &str| self.config.skip_terms.iter().any(|s| s == term);

        // Skipped headings such as "Credits" still end the previous definition.
        let term_starts: Vec<usize> = (0..lines.len())
            .filter(|&i| {
                let line = lines[i].trim();
                is_skipped(line)
                    || (GLOSSARY_TERM.is_match(line)
                        && (i == 0 || is_blank(i - 1))
                        && !is_blank(i + 1))
            })
            .collect();

        term_starts
            .iter()
            .enumerate()
            .filter_map(|(n, &start)| {
                let end = term_starts.get(n + 1).copied().unwrap_or(lines.len());
                let term = lines[start].split_whitespace().collect::<Vec<_>>().join(" ");
                if is_skipped(&term) {
                    return None;
                }
                let body = collapse_whitespace(&lines[start + 1..end]);
                if body.chars().count() < self.config.min_text_len {
                    return None;
                }
                Some(Draft {
                    rule_number: format!("glossary:{term}"),
                    text: format!("{term}: {body}"),
                    section: GLOSSARY_SECTION.into(),
                    section_title: None,
                })
            })
            .collect()
    }
}

/// Section number to title; later headers win over the contents listing.
fn section_titles(lines: &[&str]) -> HashMap<String, String> {
    lines
        .iter()
        .filter_map(|line| SECTION_HEADER.captures(line.trim()))
        .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
        .collect()
}

fn collapse_whitespace(lines: &[&str]) -> String {
    lines
        .iter()
        .flat_map(|l| l.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Chunk count per section, for the ingestion report.
pub fn section_counts(chunks: &[RuleChunk]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for chunk in chunks {
        *counts.entry(chunk.section.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Magic: The Gathering Comprehensive Rules

Contents

7. Additional Rules
704. State-Based Actions
Glossary
Credits

704. State-Based Actions

704.1. State-based actions are game actions that happen automatically whenever certain conditions are met.

704.5. The state-based actions are as follows:

704.5a If a player has 0 or less life, that player loses the game.

704.5k If a player controls two or more legendary permanents with the same name,
that player chooses one of them, and the rest are put into their owners' graveyards.

705. Flipping a Coin

705.1. To flip a coin for an object that cares whether a player wins or loses the flip, the player flips a coin.

Glossary

Abandon
To turn a face-up ongoing scheme card face down and put it on the bottom of its owner's scheme deck.

Active Player, Nonactive Player
The active player is the player whose turn it is. All other players are nonactive players.

Tap
Turn sideways.

Credits

Magic: The Gathering Original Game Design: Richard Garfield
";

    fn parse(text: &str) -> Vec<RuleChunk> {
        RuleChunker::default().parse(text)
    }

    fn by_number<'a>(chunks: &'a [RuleChunk], n: &str) -> &'a RuleChunk {
        chunks.iter().find(|c| c.rule_number == n).unwrap()
    }

    #[test]
    fn parses_rules_with_section_prefix() {
        let chunks = parse(SAMPLE);
        let sba = by_number(&chunks, "704.5a");
        assert_eq!(sba.section, "704");
        assert_eq!(sba.section_title.as_deref(), Some("State-Based Actions"));
        assert_eq!(
            sba.text,
            "State-Based Actions (704): If a player has 0 or less life, that player loses the game."
        );
    }

    #[test]
    fn trailing_period_rule_numbers_are_markers() {
        let chunks = parse(SAMPLE);
        let first = by_number(&chunks, "704.1");
        assert!(first.text.contains("happen automatically"));
    }

    #[test]
    fn continuation_lines_are_collapsed() {
        let chunks = parse(SAMPLE);
        let legend = by_number(&chunks, "704.5k");
        assert!(legend.text.contains("same name, that player chooses"));
        assert!(!legend.text.contains('\n'));
    }

    #[test]
    fn body_stops_at_next_section_header() {
        let chunks = parse(SAMPLE);
        let legend = by_number(&chunks, "704.5k");
        assert!(!legend.text.contains("Flipping a Coin"));
        let coin = by_number(&chunks, "705.1");
        assert!(coin.text.starts_with("Flipping a Coin (705): "));
        assert!(!coin.text.contains("Abandon"));
    }

    #[test]
    fn short_bodies_are_dropped() {
        let text = "100. General\n\n100.1. Too short.\n\n100.2. This one is long enough to be kept around.\n";
        let chunks = parse(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].rule_number, "100.2");
    }

    #[test]
    fn min_length_is_configurable() {
        let chunker = RuleChunker::new(ChunkerConfig {
            min_text_len: 5,
            ..Default::default()
        });
        let chunks = chunker.parse("100.1. Too short.\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Too short.");
        assert!(chunks[0].section_title.is_none());
    }

    #[test]
    fn glossary_terms_become_chunks() {
        let chunks = parse(SAMPLE);
        let abandon = by_number(&chunks, "glossary:Abandon");
        assert_eq!(abandon.section, "glossary");
        assert!(abandon.text.starts_with("Abandon: To turn a face-up"));
        let active = by_number(&chunks, "glossary:Active Player, Nonactive Player");
        assert!(active.text.contains("whose turn it is"));
    }

    #[test]
    fn glossary_skips_short_and_listed_terms() {
        let chunks = parse(SAMPLE);
        assert!(chunks.iter().all(|c| c.rule_number != "glossary:Tap"));
        assert!(chunks.iter().all(|c| c.rule_number != "glossary:Credits"));
        assert!(chunks.iter().all(|c| c.rule_number != "glossary:Glossary"));
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let text = "100.1. The first version of this rule text.\n100.1. A second copy that should be ignored.\n";
        let chunks = parse(text);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.starts_with("The first version"));
    }

    #[test]
    fn ids_are_sequential_after_filtering() {
        let chunks = parse(SAMPLE);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, format!("rule_{i}"));
        }
        let numbers: HashSet<_> = chunks.iter().map(|c| &c.rule_number).collect();
        assert_eq!(numbers.len(), chunks.len());
    }

    #[test]
    fn crlf_and_bom_are_normalized() {
        let text = "\u{feff}704. State-Based Actions\r\n\r\n704.3. Whenever a player would get priority, the game checks.\r\n";
        let chunks = parse(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].rule_number, "704.3");
        assert!(chunks[0].text.ends_with("the game checks."));
    }

    #[test]
    fn parse_is_deterministic() {
        assert_eq!(parse(SAMPLE), parse(SAMPLE));
    }

    fn rule_numbers(text: &str) -> Vec<String> {
        let mut numbers: Vec<String> = parse(text).into_iter().map(|c| c.rule_number).collect();
        numbers.sort();
        numbers
    }

    #[test]
    fn whitespace_edits_keep_rule_numbers() {
        let expected = rule_numbers(SAMPLE);
        assert!(expected.contains(&"704.5a".to_string()));
        assert!(expected.contains(&"glossary:Active Player, Nonactive Player".to_string()));

        let broken_after_marker = SAMPLE
            .replace("704.5a If", "704.5a\nIf")
            .replace("705.1. To flip", "705.1.\n  To flip");
        let wider_spacing = SAMPLE.replace(' ', "  ");
        let extra_blank_lines = SAMPLE.replace("\n\n", "\n\n\n");
        let indented = SAMPLE
            .lines()
            .map(|l| {
                if l.starts_with(|c: char| c.is_ascii_digit()) {
                    format!("  {l}")
                } else {
                    format!("{l}   ")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        for variant in [broken_after_marker, wider_spacing, extra_blank_lines, indented] {
            assert_eq!(rule_numbers(&variant), expected, "variant:\n{variant}");
        }
    }

    #[test]
    fn marker_alone_on_its_line_takes_following_lines() {
        let text = "100. General\n\n100.1\nThese Magic rules apply to any Magic game with two or more players.\n\n100.2.\nTo play, each player needs their own deck of traditional Magic cards.\n";
        let chunks = parse(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].rule_number, "100.1");
        assert_eq!(
            chunks[0].text,
            "General (100): These Magic rules apply to any Magic game with two or more players."
        );
        assert_eq!(chunks[1].rule_number, "100.2");
    }

    #[test]
    fn general_section_rules_carry_prefix() {
        let text = "\
100. General

100.1. These Magic rules apply to any Magic game with two or more players.

100.2. To play, each player needs their own deck of traditional Magic cards.
";
        let chunks = parse(text);
        assert_eq!(chunks.len(), 2);
        for (i, (chunk, number)) in chunks.iter().zip(["100.1", "100.2"]).enumerate() {
            assert_eq!(chunk.id, format!("rule_{i}"));
            assert_eq!(chunk.rule_number, number);
            assert_eq!(chunk.section, "100");
            assert_eq!(chunk.section_title.as_deref(), Some("General"));
            assert!(chunk.text.starts_with("General (100): "));
        }
        assert_eq!(
            chunks[1].text,
            "General (100): To play, each player needs their own deck of traditional Magic cards."
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("just some prose\nwith no rules").is_empty());
    }

    #[test]
    fn counts_by_section() {
        let chunks = parse(SAMPLE);
        let counts = section_counts(&chunks);
        assert_eq!(counts["704"], 4);
        assert_eq!(counts["705"], 1);
        assert_eq!(counts["glossary"], 2);
    }
}
