//! Expression module: the declarative query description received over the wire.
//!
//! This module provides FilterCondition, SortCondition, the validated QuerySpec and the
//! raw QueryRequest it is decoded from.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::EngineConfig;
use crate::{QueryError, QueryResult};

/// Filter operators. Wire codes are stable and shared with clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "WireCode")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl FilterOperator {
    /// Every operator, in wire-code order.
    pub const ALL: [FilterOperator; 9] = [
        FilterOperator::Equals,
        FilterOperator::NotEquals,
        FilterOperator::Contains,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::GreaterThan,
        FilterOperator::GreaterThanOrEqual,
        FilterOperator::LessThan,
        FilterOperator::LessThanOrEqual,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Equals => "Equals",
            FilterOperator::NotEquals => "NotEquals",
            FilterOperator::Contains => "Contains",
            FilterOperator::StartsWith => "StartsWith",
            FilterOperator::EndsWith => "EndsWith",
            FilterOperator::GreaterThan => "GreaterThan",
            FilterOperator::GreaterThanOrEqual => "GreaterThanOrEqual",
            FilterOperator::LessThan => "LessThan",
            FilterOperator::LessThanOrEqual => "LessThanOrEqual",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FilterOperator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl TryFrom<WireCode> for FilterOperator {
    type Error = String;

    fn try_from(wire: WireCode) -> Result<Self, Self::Error> {
        match wire {
            WireCode::Code(code) => {
                Self::from_code(code).ok_or_else(|| format!("unknown filter operator code {code}"))
            }
            WireCode::Name(name) => {
                Self::from_name(&name).ok_or_else(|| format!("unknown filter operator '{name}'"))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "WireCode")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "Ascending",
            SortDirection::Descending => "Descending",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SortDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl TryFrom<WireCode> for SortDirection {
    type Error = String;

    fn try_from(wire: WireCode) -> Result<Self, Self::Error> {
        match wire {
            WireCode::Code(0) => Ok(SortDirection::Ascending),
            WireCode::Code(1) => Ok(SortDirection::Descending),
            WireCode::Code(code) => Err(format!("unknown sort direction code {code}")),
            WireCode::Name(name) if name.eq_ignore_ascii_case("Ascending") => Ok(SortDirection::Ascending),
            WireCode::Name(name) if name.eq_ignore_ascii_case("Descending") => Ok(SortDirection::Descending),
            WireCode::Name(name) => Err(format!("unknown sort direction '{name}'")),
        }
    }
}

/// An enumeration as it appears on the wire: integer code or symbolic name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireCode {
    Code(i64),
    Name(String),
}

/// One filter: `field <operator> value`, with the value still in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    #[serde(rename = "propertyName", alias = "fieldName")]
    field_name: String,
    // Older clients send the misspelled key.
    #[serde(alias = "opertator")]
    operator: FilterOperator,
    #[serde(rename = "value", alias = "rawValue", default, deserialize_with = "null_as_empty")]
    raw_value: String,
}

impl FilterCondition {
    pub fn new(field_name: impl Into<String>, operator: FilterOperator, raw_value: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            operator,
            raw_value: raw_value.into(),
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCondition {
    #[serde(rename = "propertyName", alias = "fieldName")]
    field_name: String,
    #[serde(default)]
    direction: SortDirection,
}

impl SortCondition {
    pub fn new(field_name: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field_name: field_name.into(),
            direction,
        }
    }

    pub fn asc(field_name: impl Into<String>) -> Self {
        Self::new(field_name, SortDirection::Ascending)
    }

    pub fn desc(field_name: impl Into<String>) -> Self {
        Self::new(field_name, SortDirection::Descending)
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

/// A validated query: page window, filters (ANDed) and sort keys (primary first).
///
/// Page parameters are checked on construction, so a `QuerySpec` always has
/// `page_number >= 1` and `page_size >= 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    page_number: u32,
    page_size: u32,
    filters: Vec<FilterCondition>,
    sorts: Vec<SortCondition>,
}

impl QuerySpec {
    pub fn new(page_number: u32, page_size: u32) -> QueryResult<Self> {
        if page_number == 0 || page_size == 0 {
            return Err(QueryError::InvalidPageRequest {
                page_number: i64::from(page_number),
                page_size: i64::from(page_size),
            });
        }
        Ok(Self {
            page_number,
            page_size,
            filters: Vec::new(),
            sorts: Vec::new(),
        })
    }

    pub fn filter(mut self, condition: FilterCondition) -> Self {
        self.filters.push(condition);
        self
    }

    pub fn sort(mut self, condition: SortCondition) -> Self {
        self.sorts.push(condition);
        self
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = FilterCondition>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn with_sorts(mut self, sorts: impl IntoIterator<Item = SortCondition>) -> Self {
        self.sorts.extend(sorts);
        self
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn filters(&self) -> &[FilterCondition] {
        &self.filters
    }

    pub fn sorts(&self) -> &[SortCondition] {
        &self.sorts
    }

    /// Number of records preceding the page window.
    pub fn skip(&self) -> usize {
        let preceding_pages = (self.page_number - 1) as usize;
        preceding_pages.saturating_mul(self.page_size as usize)
    }
}

/// A query request as decoded from the transport, before page validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub page_number: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub filters: Vec<FilterCondition>,
    #[serde(default)]
    pub sorts: Vec<SortCondition>,
}

impl QueryRequest {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Applies page defaults from `config` and validates the page window.
    pub fn into_spec(self, config: &EngineConfig) -> QueryResult<QuerySpec> {
        let page_number = self.page_number.unwrap_or(i64::from(config.default_page_number));
        let page_size = self.page_size.unwrap_or(i64::from(config.default_page_size));
        let invalid = || QueryError::InvalidPageRequest { page_number, page_size };

        if page_size > i64::from(config.max_page_size) {
            return Err(invalid());
        }
        let number = u32::try_from(page_number).map_err(|_| invalid())?;
        let size = u32::try_from(page_size).map_err(|_| invalid())?;
        let spec = QuerySpec::new(number, size).map_err(|_| invalid())?;
        Ok(spec.with_filters(self.filters).with_sorts(self.sorts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_codes_are_stable() {
        let codes: Vec<u8> = FilterOperator::ALL.iter().map(|op| op.code()).collect();
        assert_eq!(codes, (0..9).collect::<Vec<u8>>());
        assert_eq!(FilterOperator::from_code(2), Some(FilterOperator::Contains));
        assert_eq!(FilterOperator::from_code(8), Some(FilterOperator::LessThanOrEqual));
        assert_eq!(FilterOperator::from_code(9), None);
        assert_eq!(FilterOperator::from_code(-1), None);
    }

    #[test]
    fn test_filter_condition_from_client_json() {
        let json = r#"{"propertyName":"priority","operator":6,"value":"2"}"#;
        let cond: FilterCondition = serde_json::from_str(json).unwrap();
        assert_eq!(cond.field_name(), "priority");
        assert_eq!(cond.operator(), FilterOperator::GreaterThanOrEqual);
        assert_eq!(cond.raw_value(), "2");
    }

    #[test]
    fn test_filter_condition_accepts_symbolic_operator_and_misspelled_key() {
        let json = r#"{"propertyName":"title","opertator":"startswith","value":"Fix"}"#;
        let cond: FilterCondition = serde_json::from_str(json).unwrap();
        assert_eq!(cond.operator(), FilterOperator::StartsWith);
    }

    #[test]
    fn test_filter_condition_null_value_is_empty() {
        let json = r#"{"propertyName":"assigneeId","operator":0,"value":null}"#;
        let cond: FilterCondition = serde_json::from_str(json).unwrap();
        assert_eq!(cond.raw_value(), "");
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let json = r#"{"propertyName":"title","operator":42,"value":"x"}"#;
        assert!(serde_json::from_str::<FilterCondition>(json).is_err());
        let json = r#"{"propertyName":"title","operator":"Like","value":"x"}"#;
        assert!(serde_json::from_str::<FilterCondition>(json).is_err());
    }

    #[test]
    fn test_sort_condition_defaults_to_ascending() {
        let cond: SortCondition = serde_json::from_str(r#"{"propertyName":"dueDate"}"#).unwrap();
        assert_eq!(cond.direction(), SortDirection::Ascending);
        let cond: SortCondition = serde_json::from_str(r#"{"propertyName":"dueDate","direction":1}"#).unwrap();
        assert_eq!(cond.direction(), SortDirection::Descending);
        assert!(serde_json::from_str::<SortCondition>(r#"{"propertyName":"x","direction":2}"#).is_err());
    }

    #[test]
    fn test_operator_serializes_as_name() {
        let cond = FilterCondition::new("title", FilterOperator::EndsWith, "bug");
        let json = serde_json::to_string(&cond).unwrap();
        assert_eq!(json, r#"{"propertyName":"title","operator":"EndsWith","value":"bug"}"#);
        let back: FilterCondition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cond);
    }

    #[test]
    fn test_query_spec_rejects_zero_page_parameters() {
        assert!(matches!(
            QuerySpec::new(0, 10),
            Err(QueryError::InvalidPageRequest { page_number: 0, page_size: 10 })
        ));
        assert!(QuerySpec::new(1, 0).is_err());
        assert!(QuerySpec::new(1, 1).is_ok());
    }

    #[test]
    fn test_query_spec_skip() {
        assert_eq!(QuerySpec::new(1, 10).unwrap().skip(), 0);
        assert_eq!(QuerySpec::new(3, 10).unwrap().skip(), 20);
    }

    #[test]
    fn test_request_defaults() {
        let request = QueryRequest::from_json_str("{}").unwrap();
        let spec = request.into_spec(&EngineConfig::default()).unwrap();
        assert_eq!(spec.page_number(), 1);
        assert_eq!(spec.page_size(), 10);
        assert!(spec.filters().is_empty());
        assert!(spec.sorts().is_empty());
    }

    #[test]
    fn test_request_keeps_filter_and_sort_order() {
        let json = r#"{
            "pageNumber": 2,
            "pageSize": 5,
            "filters": [
                {"propertyName": "status", "operator": 0, "value": "1"},
                {"propertyName": "title", "operator": 2, "value": "api"}
            ],
            "sorts": [
                {"propertyName": "priority", "direction": 1},
                {"propertyName": "title", "direction": 0}
            ]
        }"#;
        let spec = QueryRequest::from_json_str(json)
            .unwrap()
            .into_spec(&EngineConfig::default())
            .unwrap();
        assert_eq!(spec.page_number(), 2);
        assert_eq!(spec.page_size(), 5);
        assert_eq!(spec.filters()[1].field_name(), "title");
        assert_eq!(spec.sorts()[0], SortCondition::desc("priority"));
        assert_eq!(spec.sorts()[1], SortCondition::asc("title"));
    }

    #[test]
    fn test_request_rejects_bad_pages() {
        let config = EngineConfig::default();
        for (number, size) in [(0, 10), (-1, 10), (1, 0), (1, -5), (1, i64::from(config.max_page_size) + 1)] {
            let request = QueryRequest {
                page_number: Some(number),
                page_size: Some(size),
                ..Default::default()
            };
            match request.into_spec(&config) {
                Err(QueryError::InvalidPageRequest { page_number, page_size }) => {
                    assert_eq!((page_number, page_size), (number, size));
                }
                other => panic!("expected InvalidPageRequest, got {other:?}"),
            }
        }
    }
}
