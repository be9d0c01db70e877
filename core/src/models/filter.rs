//! Filter predicates over record fields

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Condition of a filter predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    /// Field equals the filter value (coercion per column type)
    Equals,

    /// Negation of `Equals`
    NotEquals,

    /// Case-insensitive substring match
    Contains,

    /// Negation of `Contains`
    NotContains,

    /// Numerically greater than the filter value
    Greater,

    /// Numerically lower than the filter value
    Lower,

    /// Field is null, missing or empty
    IsNull,

    /// Field has a non-empty value
    IsNotNull,
}

impl FilterCondition {
    /// All conditions, in the order the console offers them
    pub const ALL: [FilterCondition; 8] = [
        FilterCondition::Equals,
        FilterCondition::NotEquals,
        FilterCondition::Contains,
        FilterCondition::NotContains,
        FilterCondition::Greater,
        FilterCondition::Lower,
        FilterCondition::IsNull,
        FilterCondition::IsNotNull,
    ];

    /// Whether the condition reads the filter value
    pub fn takes_value(&self) -> bool {
        !matches!(self, FilterCondition::IsNull | FilterCondition::IsNotNull)
    }

    /// Wire name of the condition
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterCondition::Equals => "equals",
            FilterCondition::NotEquals => "not_equals",
            FilterCondition::Contains => "contains",
            FilterCondition::NotContains => "not_contains",
            FilterCondition::Greater => "greater",
            FilterCondition::Lower => "lower",
            FilterCondition::IsNull => "is_null",
            FilterCondition::IsNotNull => "is_not_null",
        }
    }
}

impl Display for FilterCondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A filter over one column, addressed by column name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Column name the filter reads
    pub column: String,

    /// Predicate condition
    pub condition: FilterCondition,

    /// Filter value, unused by the null checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Filter {
    /// Create a filter with a value
    pub fn new(column: impl Into<String>, condition: FilterCondition, value: impl Into<String>) -> Self {
        Filter {
            column: column.into(),
            condition,
            value: Some(value.into()),
        }
    }

    /// `column IS NULL`
    pub fn is_null(column: impl Into<String>) -> Self {
        Filter {
            column: column.into(),
            condition: FilterCondition::IsNull,
            value: None,
        }
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Filter {
            column: column.into(),
            condition: FilterCondition::IsNotNull,
            value: None,
        }
    }
}
