//! Filter specification validation and evaluation
//!
//! Filters are evaluated conjunctively: a player matches a pool only if every
//! filter passes. A player missing a referenced attribute, or carrying a
//! non-numeric value for it, is a non-match rather than an error — candidate
//! schemas are heterogeneous and a pool must be able to select over a field
//! only some players carry.

use crate::error::OrchestratorError;
use crate::types::{AttributeFilter, Player};
use std::collections::BTreeSet;

/// Validate a pool's filter specification before any scanning starts.
pub fn validate_filters(filters: &[AttributeFilter]) -> crate::error::Result<()> {
    for filter in filters {
        if filter.attribute.is_empty() {
            return Err(OrchestratorError::InvalidFilter {
                reason: format!("filter '{}' has an empty attribute name", filter.name),
            }
            .into());
        }
        if filter.min > filter.max {
            return Err(OrchestratorError::InvalidFilter {
                reason: format!(
                    "filter '{}' range is inverted: min {} > max {}",
                    filter.name, filter.min, filter.max
                ),
            }
            .into());
        }
    }
    Ok(())
}

/// Whether a player passes every filter in the specification.
///
/// An empty specification matches every player.
pub fn player_matches(player: &Player, filters: &[AttributeFilter]) -> bool {
    filters.iter().all(|filter| {
        player
            .attributes
            .get(&filter.attribute)
            .and_then(|value| value.as_number())
            .map(|value| value >= filter.min && value <= filter.max)
            .unwrap_or(false)
    })
}

/// The attribute names a pool's filters reference.
pub fn requested_attributes(filters: &[AttributeFilter]) -> BTreeSet<String> {
    filters.iter().map(|f| f.attribute.clone()).collect()
}

/// Copy of a player carrying only the requested attributes.
pub fn project_player(player: &Player, requested: &BTreeSet<String>) -> Player {
    Player {
        id: player.id.clone(),
        attributes: player
            .attributes
            .iter()
            .filter(|(name, _)| requested.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeValue;

    fn player(id: &str, attributes: &[(&str, AttributeValue)]) -> Player {
        let mut p = Player::with_id(id);
        for (name, value) in attributes {
            p.attributes.insert(name.to_string(), value.clone());
        }
        p
    }

    #[test]
    fn test_conjunctive_matching() {
        let filters = vec![
            AttributeFilter::new("level", 1, 100),
            AttributeFilter::new("ping", 0, 80),
        ];
        let candidate = player(
            "p1",
            &[
                ("level", AttributeValue::Number(50)),
                ("ping", AttributeValue::Number(40)),
            ],
        );
        assert!(player_matches(&candidate, &filters));

        // One failing filter fails the whole pool
        let laggy = player(
            "p2",
            &[
                ("level", AttributeValue::Number(50)),
                ("ping", AttributeValue::Number(200)),
            ],
        );
        assert!(!player_matches(&laggy, &filters));
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let filters = vec![AttributeFilter::new("level", 1, 100)];
        assert!(player_matches(
            &player("p1", &[("level", AttributeValue::Number(1))]),
            &filters
        ));
        assert!(player_matches(
            &player("p2", &[("level", AttributeValue::Number(100))]),
            &filters
        ));
        assert!(!player_matches(
            &player("p3", &[("level", AttributeValue::Number(101))]),
            &filters
        ));
    }

    #[test]
    fn test_missing_attribute_is_non_match() {
        // Heterogeneous schemas: absence is a non-match, never an error
        let filters = vec![AttributeFilter::new("level", 1, 100)];
        let no_level = player("p1", &[("ping", AttributeValue::Number(40))]);
        assert!(!player_matches(&no_level, &filters));
    }

    #[test]
    fn test_text_value_never_satisfies_range() {
        let filters = vec![AttributeFilter::new("level", 1, 100)];
        let text_level = player("p1", &[("level", AttributeValue::Text("50".into()))]);
        assert!(!player_matches(&text_level, &filters));
    }

    #[test]
    fn test_empty_filter_set_matches_everyone() {
        assert!(player_matches(&player("p1", &[]), &[]));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let filters = vec![AttributeFilter::new("level", 100, 1)];
        assert!(validate_filters(&filters).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_attribute() {
        let filters = vec![AttributeFilter {
            name: "broken".to_string(),
            attribute: String::new(),
            min: 0,
            max: 10,
        }];
        assert!(validate_filters(&filters).is_err());
    }

    #[test]
    fn test_projection_keeps_only_requested_attributes() {
        let candidate = player(
            "p1",
            &[
                ("level", AttributeValue::Number(50)),
                ("ping", AttributeValue::Number(40)),
                ("region", AttributeValue::Text("eu-west".into())),
            ],
        );
        let requested = requested_attributes(&[AttributeFilter::new("level", 1, 100)]);

        let projected = project_player(&candidate, &requested);
        assert_eq!(projected.id, "p1");
        assert_eq!(projected.attributes.len(), 1);
        assert!(projected.attributes.contains_key("level"));
    }
}
