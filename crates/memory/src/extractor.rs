//! Rule-based fact extraction from Russian chat messages.
//!
//! No model calls here — a handful of lexical triggers pull out the user's
//! name, city, and interests. Matching is done on the lower-cased message so
//! triggers fire regardless of capitalization; extracted values are
//! re-capitalized where a proper noun is expected.

use bumblebot_core::facts::{ExtractedFact, FactExtractor};

/// Verbs that introduce an interest or occupation.
const INTEREST_VERBS: [&str; 4] = ["люблю", "нравится", "увлекаюсь", "работаю"];

/// Lexical fact extractor tuned for casual Russian chat.
#[derive(Debug, Default, Clone)]
pub struct RussianHeuristics;

impl RussianHeuristics {
    pub fn new() -> Self {
        Self
    }

    fn extract_name(&self, lower: &str) -> Option<ExtractedFact> {
        if !lower.contains("меня зовут") {
            return None;
        }
        let words: Vec<&str> = lower.split_whitespace().collect();
        let trigger_at = words
            .windows(2)
            .position(|pair| pair[0] == "меня" && pair[1] == "зовут")?;
        let candidate = words.get(trigger_at + 2)?;
        Some(ExtractedFact::new("name", capitalize(candidate)))
    }

    /// One fact per matching preposition; persisted in order, so the last
    /// candidate wins in the store.
    fn extract_city(&self, lower: &str) -> Vec<ExtractedFact> {
        if !lower.contains("я из") && !lower.contains("живу в") {
            return Vec::new();
        }
        let mut facts = Vec::new();
        let mut words = lower.split_whitespace().peekable();
        while let Some(word) = words.next() {
            if word == "из" || word == "в" {
                if let Some(next) = words.peek() {
                    let city = next.trim_matches(['.', ',', '!', '?']);
                    if city.chars().count() > 2 {
                        facts.push(ExtractedFact::new("city", capitalize(city)));
                    }
                }
            }
        }
        facts
    }

    fn extract_interests(&self, lower: &str) -> Vec<ExtractedFact> {
        let mut facts = Vec::new();
        for verb in INTEREST_VERBS {
            if let Some(pos) = lower.find(verb) {
                let after = &lower[pos + verb.len()..];
                if let Some(topic) = after.split(['.', ',']).next() {
                    let topic = topic.trim();
                    if topic.chars().count() > 3 {
                        facts.push(ExtractedFact::new("interest", topic));
                    }
                }
            }
        }
        facts
    }
}

impl FactExtractor for RussianHeuristics {
    fn extract(&self, text: &str) -> Vec<ExtractedFact> {
        let lower = text.to_lowercase();
        let mut facts = Vec::new();

        if let Some(fact) = self.extract_name(&lower) {
            facts.push(fact);
        }
        facts.extend(self.extract_city(&lower));
        facts.extend(self.extract_interests(&lower));
        facts
    }
}

/// First letter uppercased, the rest lowercased.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<ExtractedFact> {
        RussianHeuristics::new().extract(text)
    }

    #[test]
    fn name_from_introduction() {
        let facts = extract("Привет! Меня зовут Алексей");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].key, "name");
        assert_eq!(facts[0].value, "Алексей");
    }

    #[test]
    fn name_case_is_normalized() {
        let facts = extract("меня зовут алексей");
        assert_eq!(facts[0].value, "Алексей");

        let shouted = extract("МЕНЯ ЗОВУТ АННА");
        assert_eq!(shouted[0].value, "Анна");
    }

    #[test]
    fn city_from_ya_iz() {
        let facts = extract("Я из Казани, кстати");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].key, "city");
        assert_eq!(facts[0].value, "Казани");
    }

    #[test]
    fn city_from_zhivu_v() {
        let facts = extract("Живу в Москве.");
        assert_eq!(facts[0].key, "city");
        assert_eq!(facts[0].value, "Москве");
    }

    #[test]
    fn later_preposition_candidate_wins_in_store_order() {
        // "в общем" also matches; the real city must come last so the
        // last-write-wins store keeps it
        let facts = extract("в общем, я из Казани");
        let cities: Vec<&str> = facts
            .iter()
            .filter(|f| f.key == "city")
            .map(|f| f.value.as_str())
            .collect();
        assert_eq!(cities, vec!["Общем", "Казани"]);
    }

    #[test]
    fn short_city_candidate_is_skipped() {
        // "ТЦ" after "в" is 2 chars, below the city threshold
        assert!(extract("живу в ТЦ").is_empty());
    }

    #[test]
    fn interest_from_verb() {
        let facts = extract("Я люблю играть в шахматы, а ещё читаю");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].key, "interest");
        assert_eq!(facts[0].value, "играть в шахматы");
    }

    #[test]
    fn interest_stops_at_sentence_boundary() {
        let facts = extract("Работаю программистом. Завтра выходной");
        assert_eq!(facts[0].key, "interest");
        assert_eq!(facts[0].value, "программистом");
    }

    #[test]
    fn short_interest_is_skipped() {
        assert!(extract("люблю её").is_empty());
    }

    #[test]
    fn multiple_facts_in_one_message() {
        let facts = extract("Меня зовут Ира, я из Твери, увлекаюсь фотографией");
        let keys: Vec<&str> = facts.iter().map(|f| f.key.as_str()).collect();
        assert!(keys.contains(&"name"));
        assert!(keys.contains(&"city"));
        assert!(keys.contains(&"interest"));
    }

    #[test]
    fn plain_message_yields_nothing() {
        assert!(extract("Какая сегодня погода?").is_empty());
    }
}
