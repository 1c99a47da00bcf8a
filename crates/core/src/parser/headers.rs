//! Tag pair storage and header value normalisation
//!
//! Header values can arrive as plain strings (PGN text), as structured date
//! objects, or as arbitrary JSON (records handed back by the backend). They
//! are all normalised to strings at this boundary so the rest of the crate
//! only ever sees `String` values.

use serde::de::{MapAccess, Visitor as SerdeVisitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Tags whose values are dates in `YYYY.MM.DD` form
const DATE_TAGS: [&str; 3] = ["Date", "EventDate", "UTCDate"];

/// A raw header value before normalisation
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Text(String),
    Date {
        value: Option<String>,
        year: Option<u16>,
        month: Option<u8>,
        day: Option<u8>,
    },
    Unknown(serde_json::Value),
}

impl HeaderValue {
    /// Classifies a tag value read from PGN text
    pub fn from_tag(name: &str, raw: String) -> Self {
        if DATE_TAGS.contains(&name) {
            if let Some((year, month, day)) = split_pgn_date(&raw) {
                return HeaderValue::Date {
                    value: Some(raw),
                    year,
                    month,
                    day,
                };
            }
        }
        HeaderValue::Text(raw)
    }

    pub fn normalize(self) -> String {
        match self {
            HeaderValue::Text(s) => s,
            HeaderValue::Date {
                value,
                year,
                month,
                day,
            } => {
                if year.is_none() && month.is_none() && day.is_none() {
                    return value.unwrap_or_else(|| "????.??.??".to_string());
                }
                format!(
                    "{}.{}.{}",
                    year.map(|y| format!("{:04}", y))
                        .unwrap_or_else(|| "????".to_string()),
                    two_digits(month),
                    two_digits(day),
                )
            }
            HeaderValue::Unknown(serde_json::Value::String(s)) => s,
            HeaderValue::Unknown(other) => other.to_string(),
        }
    }
}

fn two_digits(part: Option<u8>) -> String {
    part.map(|p| format!("{:02}", p))
        .unwrap_or_else(|| "??".to_string())
}

/// Splits `YYYY.MM.DD`; `?` parts become `None`. Returns `None` if the shape is wrong.
fn split_pgn_date(raw: &str) -> Option<(Option<u16>, Option<u8>, Option<u8>)> {
    let mut parts = raw.trim().split('.');
    let year = parts.next()?;
    let month = parts.next()?;
    let day = parts.next()?;
    if parts.next().is_some() || year.len() != 4 || month.len() != 2 || day.len() != 2 {
        return None;
    }

    fn part<T: std::str::FromStr>(s: &str) -> Option<Option<T>> {
        if s.chars().all(|c| c == '?') {
            Some(None)
        } else if s.chars().all(|c| c.is_ascii_digit()) {
            s.parse().ok().map(Some)
        } else {
            None
        }
    }

    Some((part(year)?, part(month)?, part(day)?))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DateParts {
    value: Option<String>,
    year: Option<u16>,
    month: Option<u8>,
    day: Option<u8>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawHeaderValue {
    Text(String),
    Date(DateParts),
    Other(serde_json::Value),
}

impl<'de> Deserialize<'de> for HeaderValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawHeaderValue::deserialize(deserializer)? {
            RawHeaderValue::Text(s) => HeaderValue::Text(s),
            RawHeaderValue::Date(d) => HeaderValue::Date {
                value: d.value,
                year: d.year,
                month: d.month,
                day: d.day,
            },
            RawHeaderValue::Other(v) => HeaderValue::Unknown(v),
        })
    }
}

/// Insertion-ordered tag pairs with normalised string values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets a tag, keeping its original position when it already exists.
    /// Returns the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.0.push((name, value));
                None
            }
        }
    }

    pub fn insert_value(&mut self, name: impl Into<String>, value: HeaderValue) -> Option<String> {
        self.insert(name, value.normalize())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (key, value) in iter {
            headers.insert(key, value);
        }
        headers
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct HeadersVisitor;

impl<'de> SerdeVisitor<'de> for HeadersVisitor {
    type Value = Headers;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of header names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
        let mut headers = Headers::new();
        while let Some((key, value)) = access.next_entry::<String, HeaderValue>()? {
            headers.insert_value(key, value);
        }
        Ok(headers)
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(HeadersVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_tag_is_structured() {
        let value = HeaderValue::from_tag("Date", "2024.03.??".to_string());
        assert_eq!(
            value,
            HeaderValue::Date {
                value: Some("2024.03.??".to_string()),
                year: Some(2024),
                month: Some(3),
                day: None,
            }
        );
        assert_eq!(value.normalize(), "2024.03.??");
    }

    #[test]
    fn test_malformed_date_stays_text() {
        let value = HeaderValue::from_tag("Date", "March 2024".to_string());
        assert_eq!(value, HeaderValue::Text("March 2024".to_string()));
    }

    #[test]
    fn test_non_date_tag_is_text() {
        let value = HeaderValue::from_tag("Round", "2024.03.01".to_string());
        assert_eq!(value, HeaderValue::Text("2024.03.01".to_string()));
    }

    #[test]
    fn test_structured_date_object_is_normalized() {
        let headers: Headers = serde_json::from_str(
            r#"{"Event": "Club", "Date": {"year": 2023, "month": 7, "day": 4}}"#,
        )
        .unwrap();
        assert_eq!(headers.get("Date"), Some("2023.07.04"));
        assert_eq!(headers.get("Event"), Some("Club"));
    }

    #[test]
    fn test_date_object_with_only_value() {
        let headers: Headers =
            serde_json::from_str(r#"{"Date": {"value": "????.??.??"}}"#).unwrap();
        assert_eq!(headers.get("Date"), Some("????.??.??"));
    }

    #[test]
    fn test_unknown_shape_becomes_inline_json() {
        let headers: Headers =
            serde_json::from_str(r#"{"Round": 3, "Annotator": {"name": "Ann"}}"#).unwrap();
        assert_eq!(headers.get("Round"), Some("3"));
        assert_eq!(headers.get("Annotator"), Some(r#"{"name":"Ann"}"#));
    }

    #[test]
    fn test_insert_preserves_order_and_replaces() {
        let mut headers = Headers::new();
        headers.insert("Event", "A");
        headers.insert("White", "W");
        assert_eq!(headers.insert("Event", "B").as_deref(), Some("A"));
        let keys: Vec<_> = headers.keys().collect();
        assert_eq!(keys, vec!["Event", "White"]);
        assert_eq!(headers.get("Event"), Some("B"));
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let headers: Headers = [("White", "A"), ("Black", "B")].into_iter().collect();
        let json = serde_json::to_string(&headers).unwrap();
        assert_eq!(json, r#"{"White":"A","Black":"B"}"#);
    }
}
