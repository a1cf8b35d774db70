//! Fact Processor (spec.md §4.4): normalizes raw oracle output into
//! storable [`Fact`]s and detects supersession against what a [`Store`]
//! already holds.
//!
//! Grounded in `rlm/facts.py`'s normalization loop (reject empty/short
//! text, coerce unknown fact types to `observation`, clamp confidence,
//! normalize entity casing) and its `store_facts` supersession loop
//! (look up existing non-superseded facts for the same `(entity,
//! fact_type)` key before inserting the new one).

use crate::constants;
use crate::error::Result;
use crate::store::{fact_from_raw, Store};
use crate::types::{Fact, FactType, RawFact};

/// Minimum fact text length (in chars) below which a raw fact is
/// discarded as too thin to be useful.
const MIN_FACT_TEXT_CHARS: usize = 10;

/// Validate and normalize one raw fact, or reject it. Matches
/// `rlm/facts.py`'s per-fact normalization: empty/short text is
/// dropped, fact_type is coerced into the closed set, confidence is
/// clamped to `[0, 1]` (defaulting to [`constants::DEFAULT_CONFIDENCE`]
/// for non-numeric/out-of-range input), and anything below
/// `min_confidence` (the engine's configured floor, [`constants::MIN_CONFIDENCE`]
/// by default) after clamping is dropped. The entity is lowercased and
/// trimmed; an entity that's empty or a stopword after normalization is
/// dropped (kept as `None`) rather than the whole fact.
#[must_use]
pub fn normalize_raw_fact(mut raw: RawFact, min_confidence: f64) -> Option<RawFact> {
    let trimmed_text = raw.fact_text.trim();
    if trimmed_text.chars().count() < MIN_FACT_TEXT_CHARS {
        return None;
    }
    raw.fact_text = trimmed_text.to_string();

    if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
        raw.confidence = constants::DEFAULT_CONFIDENCE;
    }
    if raw.confidence < min_confidence {
        return None;
    }

    raw.entity = raw.entity.and_then(|e| {
        let normalized = e.trim().to_lowercase();
        if normalized.chars().count() < 2 || constants::STOPWORDS.contains(&normalized.as_str()) {
            None
        } else {
            Some(normalized)
        }
    });

    Some(raw)
}

/// Normalize and store a batch of raw facts extracted from one episode,
/// detecting and applying supersession along the way. Returns the facts
/// actually stored (post-normalization, post-supersession).
///
/// # Errors
/// Propagates any storage error. A single fact's storage failure aborts
/// the remaining batch rather than partially committing it — callers
/// (the ingestion pipeline) treat fact-extraction failure as non-fatal
/// at a higher level by catching this and logging instead of
/// propagating to the caller of `smart_remember`.
pub fn store_facts(
    store: &dyn Store,
    source_entry_id: &str,
    raw_facts: Vec<RawFact>,
    min_confidence: f64,
) -> Result<Vec<Fact>> {
    let mut stored = Vec::new();
    for raw in raw_facts {
        let Some(raw) = normalize_raw_fact(raw, min_confidence) else {
            continue;
        };
        let fact_type = FactType::coerce(&raw.fact_type);
        let fact = fact_from_raw(raw, fact_type, source_entry_id.to_string());

        if let Some(entity) = fact.entity.as_deref() {
            let existing = store.find_facts_by_entity(entity, fact_type.as_str())?;
            for prior in existing {
                store.supersede_fact(&prior.id, &fact.id)?;
            }
        }

        store.insert_fact(&fact)?;
        stored.push(fact);
    }
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str, entity: Option<&str>, fact_type: &str, confidence: f64) -> RawFact {
        RawFact {
            fact_text: text.to_string(),
            entity: entity.map(str::to_string),
            fact_type: fact_type.to_string(),
            confidence,
        }
    }

    fn normalize_raw_fact_default(raw: RawFact) -> Option<RawFact> {
        normalize_raw_fact(raw, constants::MIN_CONFIDENCE)
    }

    #[test]
    fn short_fact_text_is_rejected() {
        assert!(normalize_raw_fact(raw("too short", Some("x"), "technical", 0.9), constants::MIN_CONFIDENCE).is_none());
    }

    #[test]
    fn low_confidence_fact_is_rejected() {
        let result = normalize_raw_fact_default(raw(
            "The user prefers dark mode in every editor they use",
            Some("user"),
            "preference",
            0.5,
        ));
        assert!(result.is_none());
    }

    #[test]
    fn non_numeric_confidence_defaults_and_survives() {
        let result = normalize_raw_fact_default(raw(
            "The team decided to use PostgreSQL for the new service",
            Some("team"),
            "decision",
            f64::NAN,
        ));
        let result = result.expect("should survive with default confidence");
        assert!((result.confidence - constants::DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn stopword_entity_is_dropped_but_fact_survives() {
        let result = normalize_raw_fact_default(raw(
            "The system uses SQLite for all local storage needs",
            Some("the"),
            "technical",
            0.9,
        ))
        .unwrap();
        assert!(result.entity.is_none());
    }

    #[test]
    fn single_char_entity_is_dropped_but_fact_survives() {
        let result = normalize_raw_fact_default(raw(
            "The team decided to use x as the build tool going forward",
            Some("x"),
            "decision",
            0.9,
        ))
        .unwrap();
        assert!(result.entity.is_none());
    }

    #[test]
    fn entity_is_lowercased_and_trimmed() {
        let result = normalize_raw_fact_default(raw(
            "Alice prefers tabs over spaces in all her projects",
            Some("  Alice  "),
            "preference",
            0.9,
        ))
        .unwrap();
        assert_eq!(result.entity.as_deref(), Some("alice"));
    }
}
