//! Dynamically-typed column values.
//!
//! Forms, events and history all move values by column name, so they share
//! one small value type instead of per-column payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::attributes::ValueKind;
use crate::status::AccountStatus;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
    Flag(bool),
    Id(i64),
    Ids(Vec<i64>),
    Time(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Null, empty text and an empty id list all count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Ids(ids) => ids.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<i64> {
        match self {
            FieldValue::Id(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_ids(&self) -> Option<&[i64]> {
        match self {
            FieldValue::Ids(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Whether this value can be stored in a column of `kind`.
    pub fn fits(&self, kind: ValueKind) -> bool {
        match (self, kind) {
            (FieldValue::Null, _) => true,
            (FieldValue::Text(s), ValueKind::Status) => s.parse::<AccountStatus>().is_ok(),
            (FieldValue::Text(_), ValueKind::Text)
            | (FieldValue::Number(_), ValueKind::Number)
            | (FieldValue::Flag(_), ValueKind::Flag)
            | (FieldValue::Id(_), ValueKind::Id)
            | (FieldValue::Ids(_), ValueKind::Ids)
            | (FieldValue::Time(_), ValueKind::Time) => true,
            _ => false,
        }
    }

    /// Plain JSON rendering for API responses.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Text(s) => JsonValue::from(s.as_str()),
            FieldValue::Number(n) => JsonValue::from(*n),
            FieldValue::Flag(b) => JsonValue::from(*b),
            FieldValue::Id(id) => JsonValue::from(*id),
            FieldValue::Ids(ids) => JsonValue::from(ids.clone()),
            FieldValue::Time(t) => JsonValue::from(t.to_rfc3339()),
        }
    }

    /// Parse a submitted JSON value for a column of `kind`.
    ///
    /// Strings are accepted for every kind, since list screens and batch
    /// uploads post cell text.
    pub fn parse_input(kind: ValueKind, raw: &JsonValue) -> Result<FieldValue, String> {
        if raw.is_null() {
            return Ok(match kind {
                ValueKind::Flag => FieldValue::Flag(false),
                _ => FieldValue::Null,
            });
        }
        if let Some(s) = raw.as_str() {
            if s.trim().is_empty() {
                return Ok(match kind {
                    ValueKind::Flag => FieldValue::Flag(false),
                    ValueKind::Ids => FieldValue::Ids(Vec::new()),
                    _ => FieldValue::Null,
                });
            }
        }
        match kind {
            ValueKind::Text => match raw {
                JsonValue::String(s) => Ok(FieldValue::Text(s.trim().to_string())),
                JsonValue::Number(n) => Ok(FieldValue::Text(n.to_string())),
                _ => Err("Not a valid string.".to_string()),
            },
            ValueKind::Status => {
                let text = raw.as_str().ok_or_else(|| "Not a valid choice.".to_string())?;
                text.parse::<AccountStatus>()
                    .map(|s| FieldValue::Text(s.as_str().to_string()))
                    .map_err(|_| "Not a valid choice.".to_string())
            }
            ValueKind::Number => match raw {
                JsonValue::Number(n) => n
                    .as_f64()
                    .map(FieldValue::Number)
                    .ok_or_else(|| "Not a valid float value.".to_string()),
                JsonValue::String(s) => s
                    .trim()
                    .replace(',', "")
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(FieldValue::Number)
                    .ok_or_else(|| "Not a valid float value.".to_string()),
                _ => Err("Not a valid float value.".to_string()),
            },
            ValueKind::Flag => match raw {
                JsonValue::Bool(b) => Ok(FieldValue::Flag(*b)),
                JsonValue::Number(n) => Ok(FieldValue::Flag(n.as_i64() != Some(0))),
                JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "y" | "yes" | "on" | "1" => Ok(FieldValue::Flag(true)),
                    "false" | "n" | "no" | "off" | "0" => Ok(FieldValue::Flag(false)),
                    _ => Err("Not a valid boolean.".to_string()),
                },
                _ => Err("Not a valid boolean.".to_string()),
            },
            ValueKind::Id => parse_id(raw).map(FieldValue::Id),
            ValueKind::Ids => {
                let mut ids = match raw {
                    JsonValue::Array(items) => items.iter().map(parse_id).collect::<Result<Vec<_>, _>>()?,
                    JsonValue::String(s) => s
                        .split(',')
                        .filter(|p| !p.trim().is_empty())
                        .map(|p| parse_id(&JsonValue::from(p.trim())))
                        .collect::<Result<Vec<_>, _>>()?,
                    other => vec![parse_id(other)?],
                };
                ids.sort_unstable();
                ids.dedup();
                Ok(FieldValue::Ids(ids))
            }
            ValueKind::Time => {
                let text = raw.as_str().ok_or_else(|| "Not a valid datetime value.".to_string())?;
                DateTime::parse_from_rfc3339(text.trim())
                    .map(|t| FieldValue::Time(t.with_timezone(&Utc)))
                    .map_err(|_| "Not a valid datetime value.".to_string())
            }
        }
    }
}

fn parse_id(raw: &JsonValue) -> Result<i64, String> {
    let id = match raw {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0).ok_or_else(|| "Not a valid choice.".to_string())
}

impl core::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FieldValue::Null => f.write_str("None"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Flag(b) => f.write_str(if *b { "True" } else { "False" }),
            FieldValue::Id(id) => write!(f, "{id}"),
            FieldValue::Ids(ids) => {
                let parts: Vec<String> = ids.iter().map(i64::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            FieldValue::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::Text).unwrap_or_default()
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map(FieldValue::Number).unwrap_or_default()
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl From<Option<DateTime<Utc>>> for FieldValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map(FieldValue::Time).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_accept_cell_text() {
        assert_eq!(
            FieldValue::parse_input(ValueKind::Number, &json!("1,200.5")),
            Ok(FieldValue::Number(1200.5))
        );
        assert_eq!(FieldValue::parse_input(ValueKind::Number, &json!(3)), Ok(FieldValue::Number(3.0)));
        assert_eq!(FieldValue::parse_input(ValueKind::Number, &json!("")), Ok(FieldValue::Null));
        assert!(FieldValue::parse_input(ValueKind::Number, &json!("abc")).is_err());
    }

    #[test]
    fn status_normalizes_labels() {
        assert_eq!(
            FieldValue::parse_input(ValueKind::Status, &json!("6_Active_现行")),
            Ok(FieldValue::Text("active".into()))
        );
        assert!(FieldValue::parse_input(ValueKind::Status, &json!("frozen")).is_err());
    }

    #[test]
    fn ids_are_sorted_and_deduplicated() {
        assert_eq!(
            FieldValue::parse_input(ValueKind::Ids, &json!([3, "1", 3])),
            Ok(FieldValue::Ids(vec![1, 3]))
        );
        assert_eq!(
            FieldValue::parse_input(ValueKind::Ids, &json!("4, 2")),
            Ok(FieldValue::Ids(vec![2, 4]))
        );
        assert!(FieldValue::parse_input(ValueKind::Id, &json!(0)).is_err());
    }

    #[test]
    fn flags_and_nulls() {
        assert_eq!(FieldValue::parse_input(ValueKind::Flag, &json!(null)), Ok(FieldValue::Flag(false)));
        assert_eq!(FieldValue::parse_input(ValueKind::Flag, &json!("Yes")), Ok(FieldValue::Flag(true)));
        assert_eq!(FieldValue::parse_input(ValueKind::Text, &json!("  ")), Ok(FieldValue::Null));
    }

    #[test]
    fn fits_checks_kind() {
        assert!(FieldValue::Null.fits(ValueKind::Number));
        assert!(FieldValue::Text("active".into()).fits(ValueKind::Status));
        assert!(!FieldValue::Text("nope".into()).fits(ValueKind::Status));
        assert!(!FieldValue::Number(1.0).fits(ValueKind::Text));
    }

    #[test]
    fn display_for_history() {
        assert_eq!(FieldValue::Null.to_string(), "None");
        assert_eq!(FieldValue::Number(12.5).to_string(), "12.5");
        assert_eq!(FieldValue::Flag(true).to_string(), "True");
        assert_eq!(FieldValue::Ids(vec![1, 2]).to_string(), "[1, 2]");
    }
}
