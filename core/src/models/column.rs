//! Logical table column definitions
//!
//! This module provides the column schema of a user-defined logical table,
//! including the fixed set of data types and edit-time value validation.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value;
use super::{ColumnId, TableId};

/// Data type of a logical table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Free text
    Text,

    /// Whole number
    Integer,

    /// Decimal number
    Decimal,

    /// True/false flag
    Boolean,

    /// Calendar date (`YYYY-MM-DD`)
    Date,

    /// Date and time
    Datetime,

    /// One value out of a fixed option list
    Select,

    /// Reference to a single system user
    User,

    /// Set of system users assigned to the record
    AssignedUsers,

    /// Single uploaded file
    File,

    /// List of uploaded files
    FileArray,

    /// Reference to a record of another logical table
    #[serde(alias = "foreign-key-select")]
    ForeignKeySelect,
}

impl DataType {
    /// Whether values of this type compare numerically
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Decimal)
    }

    /// Whether values of this type are calendar values
    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date | DataType::Datetime)
    }
}

/// Definition of a column in a logical table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column identifier
    pub id: ColumnId,

    /// Column name, used as the key in `record_data`
    pub name: String,

    /// Data type of the column
    pub data_type: DataType,

    /// Whether a value is required on create/update
    #[serde(default)]
    pub is_required: bool,

    /// Whether the column references another logical table
    #[serde(default)]
    pub is_foreign_key: bool,

    /// Referenced logical table (foreign key columns only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_table_id: Option<TableId>,

    /// Field of the referenced record shown as display text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_column_name: Option<String>,
}

impl Column {
    /// Create a plain (non foreign key) column
    pub fn new(id: ColumnId, name: impl Into<String>, data_type: DataType) -> Self {
        Column {
            id,
            name: name.into(),
            data_type,
            is_required: false,
            is_foreign_key: false,
            foreign_table_id: None,
            foreign_column_name: None,
        }
    }

    /// Mark the column as required
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Turn the column into a foreign key into `table_id`, displaying `display_column`
    pub fn foreign_key(mut self, table_id: TableId, display_column: Option<&str>) -> Self {
        self.is_foreign_key = true;
        self.foreign_table_id = Some(table_id);
        self.foreign_column_name = display_column.map(str::to_string);
        self
    }

    /// Table whose records this column references, if any
    pub fn referenced_table(&self) -> Option<TableId> {
        self.foreign_table_id
    }

    /// Validate a value for this column at edit time
    pub fn validate_value(&self, v: Option<&Value>) -> Result<(), String> {
        let v = match v {
            Some(v) if !value::is_null_like(v) => v,
            _ => {
                if self.is_required {
                    return Err(format!("column '{}' is required", self.name));
                }
                return Ok(());
            }
        };

        let valid = match self.data_type {
            DataType::Text | DataType::Select | DataType::User => {
                v.is_string() || v.is_number()
            }
            DataType::Integer => match v {
                Value::Number(n) => n.is_i64() || n.is_u64(),
                Value::String(s) => s.trim().parse::<i64>().is_ok(),
                _ => false,
            },
            DataType::Decimal => !value::numeric_form(v).is_nan(),
            DataType::Boolean => value::bool_form(v).is_some(),
            DataType::Date => v.as_str().map_or(false, |s| parse_date(s).is_some()),
            DataType::Datetime => v.as_str().map_or(false, |s| parse_datetime(s).is_some()),
            DataType::AssignedUsers | DataType::FileArray => v.is_array(),
            DataType::File => v.is_string() || v.is_object(),
            DataType::ForeignKeySelect => value::id_form(v).is_some(),
        };

        if valid {
            Ok(())
        } else {
            Err(format!(
                "value {} is not a valid {:?} for column '{}'",
                v, self.data_type, self.name
            ))
        }
    }
}

/// Payload for creating or updating a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDraft {
    /// Column name
    pub name: String,

    /// Data type
    pub data_type: DataType,

    /// Whether a value is required
    #[serde(default)]
    pub is_required: bool,

    /// Whether the column references another table
    #[serde(default)]
    pub is_foreign_key: bool,

    /// Referenced table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_table_id: Option<TableId>,

    /// Display field of the referenced table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_column_name: Option<String>,
}

impl From<&Column> for ColumnDraft {
    fn from(column: &Column) -> Self {
        ColumnDraft {
            name: column.name.clone(),
            data_type: column.data_type,
            is_required: column.is_required,
            is_foreign_key: column.is_foreign_key,
            foreign_table_id: column.foreign_table_id,
            foreign_column_name: column.foreign_column_name.clone(),
        }
    }
}

/// Parse a calendar date, accepting a full date-time and keeping its date part
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.date()))
}

/// Parse a date-time in RFC 3339 or the usual naive ISO-8601 layouts
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_type_wire_names() {
        let t: DataType = serde_json::from_str("\"assigned_users\"").unwrap();
        assert_eq!(t, DataType::AssignedUsers);

        let t: DataType = serde_json::from_str("\"foreign-key-select\"").unwrap();
        assert_eq!(t, DataType::ForeignKeySelect);

        assert_eq!(serde_json::to_string(&DataType::FileArray).unwrap(), "\"file_array\"");
    }

    #[test]
    fn test_column_defaults_on_deserialize() {
        let column: Column = serde_json::from_value(json!({
            "id": 4,
            "name": "client",
            "data_type": "foreign_key_select",
            "foreign_table_id": 9,
        }))
        .unwrap();

        assert!(!column.is_required);
        assert_eq!(column.referenced_table(), Some(9));
        assert_eq!(column.foreign_column_name, None);
    }

    #[test]
    fn test_required_validation() {
        let column = Column::new(1, "name", DataType::Text).required();

        assert!(column.validate_value(None).is_err());
        assert!(column.validate_value(Some(&json!(""))).is_err());
        assert!(column.validate_value(Some(&json!("Ana"))).is_ok());

        let optional = Column::new(2, "notes", DataType::Text);
        assert!(optional.validate_value(None).is_ok());
    }

    #[test]
    fn test_type_validation() {
        let integer = Column::new(1, "qty", DataType::Integer);
        assert!(integer.validate_value(Some(&json!(3))).is_ok());
        assert!(integer.validate_value(Some(&json!("12"))).is_ok());
        assert!(integer.validate_value(Some(&json!(1.5))).is_err());
        assert!(integer.validate_value(Some(&json!("abc"))).is_err());

        let date = Column::new(2, "due", DataType::Date);
        assert!(date.validate_value(Some(&json!("2024-03-01"))).is_ok());
        assert!(date.validate_value(Some(&json!("01/03/2024"))).is_err());

        let flag = Column::new(3, "active", DataType::Boolean);
        assert!(flag.validate_value(Some(&json!(true))).is_ok());
        assert!(flag.validate_value(Some(&json!("maybe"))).is_err());
    }

    #[test]
    fn test_parse_datetime_layouts() {
        assert!(parse_datetime("2024-03-01T10:15:00Z").is_some());
        assert!(parse_datetime("2024-03-01T10:15").is_some());
        assert!(parse_datetime("2024-03-01 10:15:30").is_some());
        assert_eq!(
            parse_date("2024-03-01T10:15:00Z"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }
}
