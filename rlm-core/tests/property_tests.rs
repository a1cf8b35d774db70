//! Property-based tests for rlm-core's domain types and pure functions.
//!
//! Uses proptest to check serialization roundtrips and the numeric/string
//! invariants the Fact Processor and size-category classifier rely on
//! across a wide range of generated inputs.

use proptest::prelude::*;
use rlm_core::facts::normalize_raw_fact;
use rlm_core::types::{Episode, Fact, FactType, RawFact, SizeCategory};

proptest! {
    /// Episode JSON roundtrips regardless of summary/content/tag contents.
    #[test]
    fn episode_json_roundtrip(
        summary in "[a-zA-Z0-9 ]{0,80}",
        content in "[a-zA-Z0-9 \n]{0,500}",
        tags in proptest::collection::vec("[a-z]{1,12}", 0..8),
    ) {
        let episode = Episode::new(summary, tags, "manual", None, content);
        let json = serde_json::to_string(&episode).expect("serialize episode");
        let deserialized: Episode = serde_json::from_str(&json).expect("deserialize episode");
        prop_assert_eq!(episode, deserialized);
    }

    /// `char_count` always matches the content's char length, never its
    /// byte length, so multi-byte content doesn't throw off size_category.
    #[test]
    fn episode_char_count_matches_content_chars(
        content in "[\\PC]{0,300}",
    ) {
        let episode = Episode::new("s".to_string(), vec![], "manual", None, content.clone());
        prop_assert_eq!(episode.char_count, content.chars().count());
    }

    /// Tags are deduplicated case-insensitively and never empty after
    /// normalization, no matter how they're cased or padded going in.
    #[test]
    fn tags_normalize_to_lowercase_with_no_duplicates(
        tags in proptest::collection::vec("[a-zA-Z]{1,10}", 0..10),
    ) {
        let episode = Episode::new("s".to_string(), tags.clone(), "manual", None, "c".to_string());
        for tag in &episode.tags {
            prop_assert_eq!(tag, &tag.to_lowercase());
        }
        let mut seen = std::collections::HashSet::new();
        for tag in &episode.tags {
            prop_assert!(seen.insert(tag.clone()), "duplicate tag survived normalization: {tag}");
        }
    }

    /// `SizeCategory::of` partitions char counts into exactly the four
    /// contiguous, non-overlapping bands spec.md §3.3 defines.
    #[test]
    fn size_category_is_a_total_contiguous_partition(char_count in 0usize..200_000usize) {
        let category = SizeCategory::of(char_count);
        match category {
            SizeCategory::Small => prop_assert!(char_count <= 2000),
            SizeCategory::Medium => prop_assert!((2001..=10_000).contains(&char_count)),
            SizeCategory::Large => prop_assert!((10_001..=50_000).contains(&char_count)),
            SizeCategory::Huge => prop_assert!(char_count > 50_000),
        }
    }

    /// A raw fact with confidence clamped below the floor is always
    /// rejected; at or above it, with enough text, it always survives.
    #[test]
    fn facts_below_min_confidence_are_always_dropped(
        text in "[a-zA-Z ]{20,80}",
        confidence in 0.0f64..rlm_core::constants::MIN_CONFIDENCE,
    ) {
        let raw = RawFact { fact_text: text, entity: None, fact_type: "observation".to_string(), confidence };
        prop_assert!(normalize_raw_fact(raw, rlm_core::constants::MIN_CONFIDENCE).is_none());
    }

    #[test]
    fn facts_at_or_above_min_confidence_with_enough_text_survive(
        text in "[a-zA-Z ]{20,80}",
        confidence in rlm_core::constants::MIN_CONFIDENCE..=1.0f64,
    ) {
        let raw = RawFact { fact_text: text.clone(), entity: None, fact_type: "observation".to_string(), confidence };
        let result = normalize_raw_fact(raw, rlm_core::constants::MIN_CONFIDENCE).expect("should survive at/above the confidence floor");
        prop_assert!((result.confidence - confidence).abs() < f64::EPSILON);
    }

    /// Fact text shorter than the minimum is rejected regardless of
    /// confidence, even at the maximum.
    #[test]
    fn short_fact_text_is_always_rejected_regardless_of_confidence(
        text in "[a-zA-Z]{0,9}",
    ) {
        let raw = RawFact { fact_text: text, entity: None, fact_type: "decision".to_string(), confidence: 1.0 };
        prop_assert!(normalize_raw_fact(raw, rlm_core::constants::MIN_CONFIDENCE).is_none());
    }

    /// `FactType::coerce` is total: every input string maps to some
    /// variant, and known spellings round-trip through `as_str`.
    #[test]
    fn fact_type_coerce_is_total_and_known_values_round_trip(
        raw in prop::sample::select(vec!["decision", "preference", "relationship", "technical", "observation"]),
    ) {
        let coerced = FactType::coerce(raw);
        prop_assert_eq!(coerced.as_str(), raw);
    }

    #[test]
    fn fact_type_coerce_is_case_insensitive(
        raw in prop::sample::select(vec!["Decision", "PREFERENCE", "Relationship", "TECHNICAL"]),
    ) {
        let coerced = FactType::coerce(raw);
        prop_assert_eq!(coerced.as_str(), raw.to_lowercase());
    }

    /// Entity normalization lowercases and trims regardless of input
    /// casing/padding, as long as what remains is long enough and not a
    /// stopword.
    #[test]
    fn surviving_entity_is_always_lowercase_and_trimmed(
        entity in "[ ]{0,3}[A-Za-z]{3,15}[ ]{0,3}",
    ) {
        let raw = RawFact {
            fact_text: "a fact with clearly more than ten characters of text".to_string(),
            entity: Some(entity.clone()),
            fact_type: "technical".to_string(),
            confidence: 0.9,
        };
        if let Some(result) = normalize_raw_fact(raw, rlm_core::constants::MIN_CONFIDENCE) {
            if let Some(normalized) = result.entity {
                prop_assert_eq!(&normalized, &entity.trim().to_lowercase());
            }
        }
    }

    /// `Fact` (the stored, normalized type) JSON roundtrips for any
    /// combination of the closed fact-type set and confidence value.
    #[test]
    fn fact_json_roundtrip(
        fact_text in "[a-zA-Z0-9 ]{10,100}",
        fact_type in prop::sample::select(vec![
            FactType::Decision,
            FactType::Preference,
            FactType::Relationship,
            FactType::Technical,
            FactType::Observation,
        ]),
        confidence in 0.0f64..=1.0f64,
        has_superseder in proptest::bool::ANY,
    ) {
        let fact = Fact {
            id: rlm_core::types::new_fact_id(),
            fact_text,
            source_entry_id: rlm_core::types::new_episode_id(),
            entity: Some("alice".to_string()),
            fact_type,
            confidence,
            created_at: rlm_core::types::unix_timestamp(),
            superseded_by: has_superseder.then(rlm_core::types::new_fact_id),
        };
        let json = serde_json::to_string(&fact).expect("serialize fact");
        let deserialized: Fact = serde_json::from_str(&json).expect("deserialize fact");
        prop_assert_eq!(fact, deserialized);
    }
}
