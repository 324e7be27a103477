//! Tag and metadata filtering against chunk snapshots

use crate::error::{Error, Result};

use super::types::{ChunkSnapshot, Metadata, MetadataValue, TagSet};

/// Whether a chunk snapshot passes both the tag and the metadata predicate.
///
/// A retired snapshot fails any non-empty filter but still passes when no
/// filter is set.
pub fn passes(snapshot: &ChunkSnapshot, tag_filter: &TagSet, metadata_filter: &Metadata) -> bool {
    let filtered = !tag_filter.is_empty() || !metadata_filter.is_empty();
    if filtered && snapshot.is_retired() {
        return false;
    }
    tags_match(&snapshot.tags, tag_filter) && metadata_matches(&snapshot.metadata, metadata_filter)
}

/// OR semantics: any one shared tag qualifies. An empty filter always passes.
pub fn tags_match(tags: &TagSet, tag_filter: &TagSet) -> bool {
    if tag_filter.is_empty() {
        return true;
    }
    // Iterate the smaller side
    if tags.len() <= tag_filter.len() {
        tags.iter().any(|t| tag_filter.contains(t))
    } else {
        tag_filter.iter().any(|t| tags.contains(t))
    }
}

/// AND semantics: every filter key must be present with an equal value of
/// the same scalar type. An empty filter always passes.
pub fn metadata_matches(metadata: &Metadata, metadata_filter: &Metadata) -> bool {
    metadata_filter
        .iter()
        .all(|(key, expected)| metadata.get(key).is_some_and(|v| v == expected))
}

/// Parse `key=value` (or `key:value`) conditions into a metadata filter.
///
/// Values parse as number, then bool, then string. Wrap a value in double
/// quotes to force a string: `year="2024"`.
pub fn parse_metadata_filter<S: AsRef<str>>(conditions: &[S]) -> Result<Metadata> {
    let mut filter = Metadata::new();
    for condition in conditions {
        let (key, value) = parse_condition(condition.as_ref())?;
        filter.insert(key, value);
    }
    Ok(filter)
}

/// Parse comma separated tags, dropping blanks
pub fn parse_tags(input: &str) -> TagSet {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_condition(condition: &str) -> Result<(String, MetadataValue)> {
    let condition = condition.trim();
    let split = condition
        .split_once('=')
        .or_else(|| condition.split_once(':'));

    let Some((key, value)) = split else {
        return Err(Error::Validation(format!(
            "invalid filter '{}': expected key=value",
            condition
        )));
    };

    let key = key.trim();
    if key.is_empty() {
        return Err(Error::Validation(format!(
            "invalid filter '{}': empty key",
            condition
        )));
    }

    Ok((key.to_string(), parse_value(value.trim())))
}

fn parse_value(s: &str) -> MetadataValue {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        return MetadataValue::String(s[1..s.len() - 1].to_string());
    }
    // Try to parse as number
    if let Ok(n) = s.parse::<i64>() {
        return MetadataValue::from(n);
    }
    if let Ok(n) = s.parse::<f64>() {
        if n.is_finite() {
            return MetadataValue::Number(n);
        }
    }
    // Try to parse as bool
    if s == "true" {
        return MetadataValue::Bool(true);
    }
    if s == "false" {
        return MetadataValue::Bool(false);
    }
    // Default to string
    MetadataValue::String(s.to_string())
}
