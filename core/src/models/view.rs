//! Views, per-view column configuration and sort keys
//!
//! On the wire a single `view_columns` entity carries both the layout of a
//! column in a view (visibility, position, width) and the filters attached to
//! the view, told apart only by whether `filter_condition` is set. Inside the
//! engine that record is split into [`ColumnLayout`] and [`ColumnFilter`]
//! through [`ViewColumnEntry`]; the wire record only exists at the API
//! boundary.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::filter::FilterCondition;
use super::value;
use super::{ColumnId, SortId, TableId, ViewColumnId, ViewId};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    #[default]
    #[serde(alias = "ASC")]
    Asc,

    /// Descending
    #[serde(alias = "DESC")]
    Desc,
}

/// A named, persisted view over a logical table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    /// View identifier
    pub id: ViewId,

    /// Table the view belongs to
    pub table_id: TableId,

    /// Display name
    pub name: String,

    /// Legacy single-key sort column.
    ///
    /// Read only as a fallback when the view has no sort entries; the
    /// engine never writes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<ColumnId>,

    /// Legacy single-key sort direction, see `sort_by`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,

    /// Position of the view among the table's views
    #[serde(default)]
    pub position: i64,
}

/// Payload for creating a view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDraft {
    /// Owning table
    pub table_id: TableId,

    /// Display name
    pub name: String,

    /// Position among the table's views
    pub position: i64,
}

/// `view_columns` entity as exchanged with the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewColumnRecord {
    /// Entry identifier
    pub id: ViewColumnId,

    /// View the entry belongs to
    pub view_id: ViewId,

    /// Column the entry configures
    pub column_id: ColumnId,

    /// Whether the column is shown
    #[serde(default = "default_visible")]
    pub visible: bool,

    /// Column position within the view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_num: Option<i64>,

    /// Column width in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_px: Option<u32>,

    /// Filter condition; `None` marks a layout entry
    #[serde(default, deserialize_with = "condition_or_empty")]
    pub filter_condition: Option<FilterCondition>,

    /// Filter value
    #[serde(default, deserialize_with = "lenient_string")]
    pub filter_value: Option<String>,
}

/// Payload for creating a `view_columns` entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewColumnDraft {
    /// View the entry belongs to
    pub view_id: ViewId,

    /// Column the entry configures
    pub column_id: ColumnId,

    /// Whether the column is shown
    pub visible: bool,

    /// Column position within the view
    pub position_num: Option<i64>,

    /// Column width in pixels
    pub width_px: Option<u32>,

    /// Filter condition; `None` for layout entries
    pub filter_condition: Option<FilterCondition>,

    /// Filter value
    pub filter_value: Option<String>,
}

impl ViewColumnDraft {
    /// Draft of a layout entry
    pub fn layout(view_id: ViewId, column_id: ColumnId, visible: bool, position: Option<i64>, width_px: Option<u32>) -> Self {
        ViewColumnDraft {
            view_id,
            column_id,
            visible,
            position_num: position,
            width_px,
            filter_condition: None,
            filter_value: None,
        }
    }

    /// Draft of a filter entry
    pub fn filter(view_id: ViewId, column_id: ColumnId, condition: FilterCondition, value: Option<String>) -> Self {
        ViewColumnDraft {
            view_id,
            column_id,
            visible: true,
            position_num: None,
            width_px: None,
            filter_condition: Some(condition),
            filter_value: value,
        }
    }
}

/// Visibility, position and width of one column in one view
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    /// `view_columns` entity id
    pub id: ViewColumnId,

    /// Owning view
    pub view_id: ViewId,

    /// Schema column the layout applies to
    pub column_id: ColumnId,

    /// Whether the column is shown
    pub visible: bool,

    /// Display position, `None` keeps schema order
    pub position: Option<i64>,

    /// Column width in pixels
    pub width_px: Option<u32>,
}

impl ColumnLayout {
    /// Wire form of the layout
    pub fn to_record(&self) -> ViewColumnRecord {
        ViewColumnRecord {
            id: self.id,
            view_id: self.view_id,
            column_id: self.column_id,
            visible: self.visible,
            position_num: self.position,
            width_px: self.width_px,
            filter_condition: None,
            filter_value: None,
        }
    }
}

/// A persisted filter attached to a view
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    /// `view_columns` entity id
    pub id: ViewColumnId,

    /// Owning view
    pub view_id: ViewId,

    /// Filtered column
    pub column_id: ColumnId,

    /// Comparison applied to the column's values
    pub condition: FilterCondition,

    /// Operand as typed by the user, `None` for `IsNull` and `IsNotNull`
    pub value: Option<String>,
}

impl ColumnFilter {
    /// Wire form of the filter
    pub fn to_record(&self) -> ViewColumnRecord {
        ViewColumnRecord {
            id: self.id,
            view_id: self.view_id,
            column_id: self.column_id,
            visible: true,
            position_num: None,
            width_px: None,
            filter_condition: Some(self.condition),
            filter_value: self.value.clone(),
        }
    }
}

/// A `view_columns` entity split by its meaning
#[derive(Debug, Clone, PartialEq)]
pub enum ViewColumnEntry {
    /// Layout of a column
    Layout(ColumnLayout),

    /// Filter attached to the view
    Filter(ColumnFilter),
}

impl From<ViewColumnRecord> for ViewColumnEntry {
    fn from(record: ViewColumnRecord) -> Self {
        let has_value = record.filter_value.as_deref().map_or(false, |v| !v.is_empty());

        // A value without a condition is a filter saved before the condition
        // selector existed; it always meant equality.
        let condition = match (record.filter_condition, has_value) {
            (Some(condition), _) => Some(condition),
            (None, true) => Some(FilterCondition::Equals),
            (None, false) => None,
        };

        match condition {
            Some(condition) => ViewColumnEntry::Filter(ColumnFilter {
                id: record.id,
                view_id: record.view_id,
                column_id: record.column_id,
                condition,
                value: record.filter_value,
            }),
            None => ViewColumnEntry::Layout(ColumnLayout {
                id: record.id,
                view_id: record.view_id,
                column_id: record.column_id,
                visible: record.visible,
                position: record.position_num,
                width_px: record.width_px,
            }),
        }
    }
}

/// `sorts` entity: one key of a view's chained sort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortRecord {
    /// Sort entry identifier
    pub id: SortId,

    /// View the sort belongs to
    pub view_id: ViewId,

    /// Column sorted on
    pub column_id: ColumnId,

    /// Direction
    #[serde(default)]
    pub direction: SortDirection,

    /// Priority, lowest first
    #[serde(default)]
    pub position: i64,
}

/// Payload for creating a `sorts` entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortDraft {
    /// View the sort belongs to
    pub view_id: ViewId,

    /// Sorted column
    pub column_id: ColumnId,

    /// Sort direction
    pub direction: SortDirection,

    /// Rank in the sort chain, lowest first
    pub position: i64,
}

/// One resolved key of a sort chain, addressed by column name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Column name
    pub column: String,

    /// Direction
    pub direction: SortDirection,
}

impl SortKey {
    /// Ascending key
    pub fn asc(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Descending key
    pub fn desc(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

fn default_visible() -> bool {
    true
}

fn condition_or_empty<'de, D>(deserializer: D) -> Result<Option<FilterCondition>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => serde_json::from_value(Value::String(s.trim().to_string()))
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(v.filter(|v| !v.is_null()).map(|v| value::string_form(&v)))
}
