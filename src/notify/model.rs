//! Notifications as delivered by the notifications API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    #[default]
    Toast,
    Briefing,
    Alert,
    ProductionCard,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    #[serde(default, deserialize_with = "string_or_null")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub body: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub data: Value,
}

impl Notification {
    pub fn new(id: impl Into<String>, kind: NotificationKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            body: String::new(),
            priority: Priority::Normal,
            data: Value::Null,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

// Row ids arrive as integers from some deployments and strings from others.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numeric_ids_become_strings() {
        let notification: Notification =
            serde_json::from_value(json!({"id": 42, "type": "alert", "title": "Scale offline"}))
                .expect("deserialize");

        assert_eq!(notification.id, "42");
        assert_eq!(notification.kind, NotificationKind::Alert);
        assert_eq!(notification.priority, Priority::Normal);
    }

    #[test]
    fn unknown_type_maps_to_other() {
        let notification: Notification =
            serde_json::from_value(json!({"id": "n1", "type": "holiday-banner"}))
                .expect("deserialize");

        assert_eq!(notification.kind, NotificationKind::Other);
    }

    #[test]
    fn production_card_uses_kebab_case() {
        let notification: Notification = serde_json::from_value(
            json!({"id": "n2", "type": "production-card", "priority": "high"}),
        )
        .expect("deserialize");

        assert_eq!(notification.kind, NotificationKind::ProductionCard);
        assert_eq!(notification.priority, Priority::High);
    }

    #[test]
    fn null_text_fields_read_as_empty() {
        let notification: Notification = serde_json::from_value(
            json!({"id": 7, "type": "alert", "title": null, "body": null}),
        )
        .expect("deserialize");

        assert_eq!(notification.title, "");
        assert_eq!(notification.body, "");
    }
}
