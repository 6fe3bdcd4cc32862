//! Metadata filter predicates understood by memory backends.

use crate::metadata::ContentType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// High-level filter request. Every condition is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRequest {
    pub game_time_gte: Option<i64>,
    pub game_time_lte: Option<i64>,
    pub content_type: Option<ContentType>,
}

/// How a condition compares its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Exact equality on a metadata field.
    Metadata,
    /// Numeric comparison using `numeric_operator`.
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericOperator {
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
}

/// One condition of a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    pub key: String,
    pub value: Value,
    pub filter_type: FilterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_operator: Option<NumericOperator>,
}

impl FilterCondition {
    fn matches(&self, metadata: &Value) -> bool {
        let Some(actual) = metadata.get(&self.key) else {
            return false;
        };
        match (self.filter_type, self.numeric_operator) {
            (FilterType::Numeric, Some(operator)) => {
                let (Some(actual), Some(expected)) = (actual.as_f64(), self.value.as_f64()) else {
                    return false;
                };
                match operator {
                    NumericOperator::Gte => actual >= expected,
                    NumericOperator::Lte => actual <= expected,
                }
            }
            (FilterType::Numeric, None) => false,
            (FilterType::Metadata, _) => actual == &self.value,
        }
    }
}

/// Conjunction of conditions sent as the backend's `filter`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    #[serde(rename = "AND")]
    pub and: Vec<FilterCondition>,
}

impl FilterPredicate {
    pub fn is_empty(&self) -> bool {
        self.and.is_empty()
    }

    /// Evaluate against a record's metadata. An empty predicate matches all.
    pub fn matches(&self, metadata: &Value) -> bool {
        self.and.iter().all(|condition| condition.matches(metadata))
    }
}

/// Translate a request into a predicate; omitted conditions are left out.
pub fn build_filter(request: &FilterRequest) -> FilterPredicate {
    let mut and = Vec::new();
    if let Some(gte) = request.game_time_gte {
        and.push(FilterCondition {
            key: "gameTime".to_string(),
            value: Value::from(gte),
            filter_type: FilterType::Numeric,
            numeric_operator: Some(NumericOperator::Gte),
        });
    }
    if let Some(lte) = request.game_time_lte {
        and.push(FilterCondition {
            key: "gameTime".to_string(),
            value: Value::from(lte),
            filter_type: FilterType::Numeric,
            numeric_operator: Some(NumericOperator::Lte),
        });
    }
    if let Some(content_type) = request.content_type {
        and.push(FilterCondition {
            key: "type".to_string(),
            value: Value::from(content_type.as_str()),
            filter_type: FilterType::Metadata,
            numeric_operator: None,
        });
    }
    FilterPredicate { and }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_request_builds_empty_predicate() {
        let predicate = build_filter(&FilterRequest::default());
        assert!(predicate.is_empty());
        assert!(predicate.matches(&json!({})));
    }

    #[test]
    fn omitted_conditions_are_not_emitted() {
        let predicate = build_filter(&FilterRequest {
            game_time_gte: Some(0),
            ..FilterRequest::default()
        });
        assert_eq!(
            serde_json::to_value(&predicate).expect("json"),
            json!({
                "AND": [
                    { "key": "gameTime", "value": 0, "filterType": "numeric", "numericOperator": ">=" }
                ]
            })
        );
    }

    #[test]
    fn combines_all_conditions_with_and() {
        let predicate = build_filter(&FilterRequest {
            game_time_gte: Some(5),
            game_time_lte: Some(10),
            content_type: Some(ContentType::WorldStateUpdate),
        });
        assert_eq!(predicate.and.len(), 3);
        assert!(predicate.matches(&json!({ "gameTime": 7, "type": "world_state_update" })));
        assert!(!predicate.matches(&json!({ "gameTime": 11, "type": "world_state_update" })));
        assert!(!predicate.matches(&json!({ "gameTime": 7, "type": "message" })));
        assert!(!predicate.matches(&json!({ "type": "world_state_update" })));
    }

    #[test]
    fn predicate_round_trips_through_json() {
        let predicate = build_filter(&FilterRequest {
            game_time_lte: Some(3),
            content_type: Some(ContentType::Message),
            ..FilterRequest::default()
        });
        let json = serde_json::to_string(&predicate).expect("json");
        let decoded: FilterPredicate = serde_json::from_str(&json).expect("decode");
        assert_eq!(decoded, predicate);
    }
}
