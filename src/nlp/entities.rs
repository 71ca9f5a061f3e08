use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

use crate::types::EntityKind;

lazy_static! {
    static ref MONEY_RE: Regex = Regex::new(
        r"\$\d[\d,]*(?:\.\d+)?(?:\s*(?:million|billion|trillion))?|\b\d+(?:\.\d+)?\s+(?:dollars|euros)\b"
    )
    .unwrap();
    static ref PERCENT_RE: Regex = Regex::new(r"\b\d+(?:\.\d+)?\s*(?:%|percent)").unwrap();
    static ref DATE_RE: Regex = Regex::new(
        r"\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2}(?:,\s*\d{4})?\b|\bQ[1-4]\s+\d{4}\b"
    )
    .unwrap();
    static ref ORG_RE: Regex = Regex::new(
        r"\b(?:[A-Z][A-Za-z&.-]+\s+){0,3}[A-Z][A-Za-z&.-]*\s+(?:Inc\.?|Corp\.?|Corporation|Company|Ltd\.?|LLC|Plc|Group|Holdings|Bank|AB|ASA|Oyj|AG|NV|SA)\b"
    )
    .unwrap();
    static ref PERSON_RE: Regex = Regex::new(
        r"\b(?:Mr\.|Ms\.|Mrs\.|Dr\.|CEO|CFO|COO|Chairman|Chairwoman|President|[Aa]nalyst|[Ff]ounder)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)"
    )
    .unwrap();
}

/// A deliberately small gazetteer; enough to pin headlines to a market.
const PLACES: &[&str] = &[
    "United States",
    "U.S.",
    "Europe",
    "European Union",
    "China",
    "Japan",
    "Germany",
    "France",
    "United Kingdom",
    "Britain",
    "Sweden",
    "Norway",
    "Denmark",
    "Finland",
    "Estonia",
    "Latvia",
    "Lithuania",
    "New York",
    "London",
    "Frankfurt",
    "Paris",
    "Stockholm",
    "Helsinki",
    "Copenhagen",
    "Oslo",
    "Tallinn",
    "Riga",
    "Vilnius",
    "Washington",
    "California",
    "Texas",
];

/// Tags entities by fixed patterns and groups them by kind, first-seen
/// order within a kind, duplicates removed. Kinds with no hits are
/// absent from the map.
pub fn extract_named_entities(text: &str) -> BTreeMap<EntityKind, Vec<String>> {
    if text.is_empty() || text == crate::FULL_TEXT_NOT_FOUND {
        return BTreeMap::new();
    }

    let mut entities: BTreeMap<EntityKind, Vec<String>> = BTreeMap::new();
    let mut seen: HashSet<(EntityKind, String)> = HashSet::new();

    let mut push = |entities: &mut BTreeMap<EntityKind, Vec<String>>, kind, value: String| {
        let value = value.trim().to_string();
        if value.is_empty() || !seen.insert((kind, value.clone())) {
            return;
        }
        entities.entry(kind).or_default().push(value);
    };

    for m in ORG_RE.find_iter(text) {
        push(&mut entities, EntityKind::Organization, m.as_str().to_string());
    }
    for caps in PERSON_RE.captures_iter(text) {
        if let Some(name) = caps.get(1) {
            push(&mut entities, EntityKind::Person, name.as_str().to_string());
        }
    }
    for place in PLACES {
        if let Some(position) = text.find(place) {
            // Word-boundary check so "Britain" does not fire inside
            // "Britainica"-style tokens.
            let after = text[position + place.len()..].chars().next();
            if after.map_or(true, |c| !c.is_alphanumeric()) {
                push(&mut entities, EntityKind::Place, (*place).to_string());
            }
        }
    }
    for m in DATE_RE.find_iter(text) {
        push(&mut entities, EntityKind::Date, m.as_str().to_string());
    }
    for m in MONEY_RE.find_iter(text) {
        push(&mut entities, EntityKind::Money, m.as_str().to_string());
    }
    for m in PERCENT_RE.find_iter(text) {
        push(&mut entities, EntityKind::Percent, m.as_str().to_string());
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_each_kind() {
        let text = "Acme Corp said CEO Jane Smith will present in New York on July 14, 2026. \
            Revenue rose 12% to $450 million.";
        let entities = extract_named_entities(text);

        assert!(entities[&EntityKind::Organization]
            .iter()
            .any(|e| e.contains("Acme Corp")));
        assert_eq!(entities[&EntityKind::Person], vec!["Jane Smith"]);
        assert_eq!(entities[&EntityKind::Place], vec!["New York"]);
        assert_eq!(entities[&EntityKind::Date], vec!["July 14, 2026"]);
        assert_eq!(entities[&EntityKind::Money], vec!["$450 million"]);
        assert_eq!(entities[&EntityKind::Percent], vec!["12%"]);
    }

    #[test]
    fn duplicates_collapse_preserving_first_seen_order() {
        let text = "Acme Corp fell 5% today. Analysts said Acme Corp may recover. \
            Rival Beta Inc gained 3% on the news.";
        let entities = extract_named_entities(text);
        let orgs = &entities[&EntityKind::Organization];
        assert_eq!(orgs.iter().filter(|e| e.contains("Acme")).count(), 1);
        let acme = orgs.iter().position(|e| e.contains("Acme")).unwrap();
        let beta = orgs.iter().position(|e| e.contains("Beta")).unwrap();
        assert!(acme < beta);
    }

    #[test]
    fn sentinel_text_has_no_entities() {
        assert!(extract_named_entities(crate::FULL_TEXT_NOT_FOUND).is_empty());
        assert!(extract_named_entities("").is_empty());
    }

    #[test]
    fn empty_kinds_are_absent() {
        let entities = extract_named_entities("nothing notable happened today");
        assert!(entities.is_empty());
    }
}
