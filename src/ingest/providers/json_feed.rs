// src/ingest/providers/json_feed.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;

use super::{clean_opt, Transport};
use crate::ingest::error::IngestError;
use crate::ingest::recency::DateFormat;
use crate::ingest::types::{FeedAdapter, FeedBatch, NormalizedItem, RawItem};

/// Field names of a bespoke JSON list payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFields {
    /// JSON pointer to the item array; empty means the payload itself.
    pub items_pointer: String,
    pub title: String,
    pub description: Option<String>,
    pub date: String,
}

impl Default for JsonFields {
    fn default() -> Self {
        Self {
            items_pointer: String::new(),
            title: "title".to_string(),
            description: Some("description".to_string()),
            date: "date".to_string(),
        }
    }
}

pub struct JsonFeedAdapter {
    name: String,
    transport: Transport,
    fields: JsonFields,
    date_format: DateFormat,
}

impl JsonFeedAdapter {
    pub fn new(name: &str, transport: Transport, fields: JsonFields) -> Self {
        Self {
            name: name.to_string(),
            transport,
            fields,
            date_format: DateFormat::Iso8601,
        }
    }

    pub fn from_fixture(name: &str, json: &str, fields: JsonFields) -> Self {
        Self::new(name, Transport::fixture(json), fields)
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }

    pub fn parse_items_from_str(&self, s: &str) -> Result<Vec<Value>, String> {
        let payload: Value = serde_json::from_str(s).map_err(|e| format!("parsing json: {e}"))?;
        let list = if self.fields.items_pointer.is_empty() {
            &payload
        } else {
            payload
                .pointer(&self.fields.items_pointer)
                .ok_or_else(|| format!("no value at {}", self.fields.items_pointer))?
        };
        match list {
            Value::Array(items) => Ok(items.clone()),
            other => Err(format!("expected an array of items, found {}", type_name(other))),
        }
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn str_field<'a>(item: &'a Value, field: &str) -> Option<&'a str> {
    item.get(field).and_then(Value::as_str)
}

#[async_trait]
impl FeedAdapter for JsonFeedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<FeedBatch, IngestError> {
        let body = self.transport.load(&self.name).await?;
        let t0 = std::time::Instant::now();
        let items = self
            .parse_items_from_str(&body)
            .map_err(|e| IngestError::fetch(&self.name, e))?;
        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_events_total").increment(items.len() as u64);
        Ok(items.into_iter().map(RawItem::Json).collect())
    }

    fn normalize(&self, raw: &RawItem) -> Result<NormalizedItem, IngestError> {
        let RawItem::Json(item) = raw else {
            return Err(IngestError::Parse(format!(
                "json adapter got a {} item",
                raw.kind()
            )));
        };
        let title = clean_opt(str_field(item, &self.fields.title))
            .ok_or_else(|| IngestError::missing_field(&self.fields.title))?;
        let published_raw = str_field(item, &self.fields.date)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| IngestError::missing_field(&self.fields.date))?;
        let description = self
            .fields
            .description
            .as_deref()
            .and_then(|f| clean_opt(str_field(item, f)));
        Ok(NormalizedItem {
            title,
            description,
            published_raw: published_raw.to_string(),
        })
    }

    fn date_format(&self) -> &DateFormat {
        &self.date_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> JsonFields {
        JsonFields {
            items_pointer: "/data/items".into(),
            title: "headline".into(),
            description: Some("lead".into()),
            date: "published".into(),
        }
    }

    #[tokio::test]
    async fn items_found_by_pointer_and_mapped() {
        let body = r#"{"data":{"items":[
            {"headline":"  Rates  up ","lead":"<i>Bank</i> moves","published":"06.05.2025 10:00"},
            {"headline":"No lead","published":"06.05.2025 11:00"},
            {"lead":"orphan","published":"06.05.2025 12:00"}
        ]}}"#;
        let a = JsonFeedAdapter::from_fixture("api", body, fields())
            .with_date_format(DateFormat::Pattern("%d.%m.%Y %H:%M".into()));
        let batch = a.fetch().await.unwrap();
        assert_eq!(batch.len(), 3);

        let first = a.normalize(&batch[0]).unwrap();
        assert_eq!(first.title, "Rates up");
        assert_eq!(first.description.as_deref(), Some("Bank moves"));

        assert_eq!(a.normalize(&batch[1]).unwrap().description, None);
        assert!(matches!(a.normalize(&batch[2]), Err(IngestError::Parse(_))));
    }

    #[tokio::test]
    async fn non_array_payload_is_a_fetch_error() {
        let a = JsonFeedAdapter::from_fixture("api", r#"{"data":{"items":{}}}"#, fields());
        let err = a.fetch().await.unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn top_level_array_by_default() {
        let a = JsonFeedAdapter::from_fixture("api", "", JsonFields::default());
        let items = a.parse_items_from_str(r#"[{"title":"a","date":"b"}]"#).unwrap();
        assert_eq!(items.len(), 1);
    }
}
