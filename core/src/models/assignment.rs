//! Assigned users and scheduled reminders attached to records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ColumnId, RecordId, TableId, UserId};

/// A system user assigned to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedUser {
    /// User identifier
    pub id: UserId,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Contact e-mail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AssignedUser {
    /// Label shown in the console, falling back to the user id
    pub fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| format!("#{}", self.id))
    }
}

/// Payload for scheduling a reminder on a record's date column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDraft {
    /// Logical table of the record
    pub table_id: TableId,

    /// Record the reminder is about
    pub record_id: RecordId,

    /// Date or datetime column holding the target date
    pub column_id: ColumnId,

    /// Date held by the record's column
    pub target_date: NaiveDate,

    /// How many days before `target_date` to notify
    pub notify_before_days: u32,

    /// Users to notify
    pub assigned_users: Vec<UserId>,
}

/// A scheduled reminder as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    /// Notification identifier
    pub id: i64,

    pub table_id: TableId,
    pub record_id: RecordId,
    pub column_id: ColumnId,
    pub target_date: NaiveDate,
    pub notify_before_days: u32,

    #[serde(default)]
    pub assigned_users: Vec<UserId>,
}

impl ScheduledNotification {
    /// Date on which the reminder fires
    pub fn notify_on(&self) -> Option<NaiveDate> {
        self.target_date
            .checked_sub_days(chrono::Days::new(u64::from(self.notify_before_days)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_wire_format() {
        let draft = NotificationDraft {
            table_id: 1,
            record_id: 2,
            column_id: 3,
            target_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            notify_before_days: 2,
            assigned_users: vec![7, 8],
        };

        let wire = serde_json::to_value(&draft).unwrap();
        assert_eq!(wire["target_date"], json!("2024-05-10"));
        assert_eq!(wire["assigned_users"], json!([7, 8]));
    }

    #[test]
    fn test_notify_on() {
        let notification: ScheduledNotification = serde_json::from_value(json!({
            "id": 1,
            "table_id": 1,
            "record_id": 2,
            "column_id": 3,
            "target_date": "2024-05-10",
            "notify_before_days": 3,
        }))
        .unwrap();

        assert_eq!(notification.notify_on(), NaiveDate::from_ymd_opt(2024, 5, 7));
        assert!(notification.assigned_users.is_empty());
    }

    #[test]
    fn test_user_label_fallbacks() {
        let user = AssignedUser { id: 4, name: None, email: Some("ana@example.com".into()) };
        assert_eq!(user.label(), "ana@example.com");

        let anonymous = AssignedUser { id: 4, name: None, email: None };
        assert_eq!(anonymous.label(), "#4");
    }
}
