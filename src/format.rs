use crate::p18::response::Record;
use crate::prelude::*;

use serde_json::{json, Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum Format {
    #[default]
    Table,
    SimpleTable,
    Json,
    SimpleJson,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" => Ok(Self::Table),
            "simple-table" => Ok(Self::SimpleTable),
            "json" => Ok(Self::Json),
            "simple-json" => Ok(Self::SimpleJson),
            _ => Err(Error::InvalidArgument("invalid format".to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Table => "table",
            Self::SimpleTable => "simple-table",
            Self::Json => "json",
            Self::SimpleJson => "simple-json",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Unit {
    V,
    A,
    Wh,
    VA,
    Hz,
    Percentage,
    Celsius,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::V => "V",
            Self::A => "A",
            Self::Wh => "Wh",
            Self::VA => "VA",
            Self::Hz => "Hz",
            Self::Percentage => "%",
            Self::Celsius => "°C",
        };
        write!(f, "{}", s)
    }
}

/// A single rendered quantity. Scaled values keep their raw integer until
/// they are printed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    Unsigned(u32),
    Scaled { value: u32, scale: u32 },
    Bool(bool),
    Text(String),
    Enum { ordinal: u8, label: &'static str },
}

impl Value {
    pub fn tenths(value: u32) -> Self {
        Self::Scaled { value, scale: 10 }
    }

    pub fn label<T: p18::types::Labeled>(value: T) -> Self {
        Self::Enum {
            ordinal: value.ordinal(),
            label: value.label(),
        }
    }

    fn scaled(value: u32, scale: u32) -> f64 {
        f64::from(value) / f64::from(scale.max(1))
    }

    fn to_table(&self) -> String {
        match self {
            Self::Unsigned(v) => v.to_string(),
            Self::Scaled { value, scale } => Self::scaled(*value, *scale).to_string(),
            Self::Bool(true) => "Yes".to_string(),
            Self::Bool(false) => "No".to_string(),
            Self::Text(s) => s.clone(),
            Self::Enum { label, .. } => label.to_string(),
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Self::Unsigned(v) => json!(v),
            Self::Scaled { value, scale } => json!(Self::scaled(*value, *scale)),
            Self::Bool(b) => json!(b),
            Self::Text(s) => json!(s),
            Self::Enum { label, .. } => json!(label),
        }
    }

    fn to_simple_json(&self) -> JsonValue {
        match self {
            Self::Enum { ordinal, .. } => json!(ordinal),
            other => other.to_json(),
        }
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Unsigned(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Field {
    pub key: &'static str,
    pub title: &'static str,
    pub value: Value,
    pub unit: Option<Unit>,
}

impl Field {
    pub fn new(key: &'static str, title: &'static str, value: impl Into<Value>) -> Self {
        Self {
            key,
            title,
            value: value.into(),
            unit: None,
        }
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// The shape of one response as the formatter sees it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Content {
    Table(Vec<Field>),
    List(Vec<Value>),
    Status { ok: bool, message: String },
}

pub fn render(response: &Response, format: Format) -> String {
    render_content(&response.content(), format)
}

pub fn render_content(content: &Content, format: Format) -> String {
    match (content, format) {
        (Content::Table(fields), Format::Table) => table(fields),
        (Content::Table(fields), Format::SimpleTable) => simple_table(fields),
        (Content::Table(fields), Format::Json) => table_json(fields, false),
        (Content::Table(fields), Format::SimpleJson) => table_json(fields, true),

        (Content::List(values), Format::Table | Format::SimpleTable) => values
            .iter()
            .map(Value::to_table)
            .collect::<Vec<_>>()
            .join("\n"),
        (Content::List(values), Format::Json | Format::SimpleJson) => {
            let simple = format == Format::SimpleJson;
            let data: Vec<JsonValue> = values
                .iter()
                .map(|v| if simple { v.to_simple_json() } else { v.to_json() })
                .collect();
            json!({ "result": "ok", "data": data }).to_string()
        }

        (Content::Status { ok, message }, Format::Table | Format::SimpleTable) => {
            let mut s = String::from(if *ok { "ok" } else { "error" });
            if !message.is_empty() {
                s.push_str(": ");
                s.push_str(message);
            }
            s
        }
        (Content::Status { ok, message }, Format::Json | Format::SimpleJson) => {
            let mut map = Map::new();
            map.insert("result".to_string(), json!(if *ok { "ok" } else { "error" }));
            if !message.is_empty() {
                map.insert("message".to_string(), json!(message));
            }
            JsonValue::Object(map).to_string()
        }
    }
}

fn table(fields: &[Field]) -> String {
    let width = fields.iter().map(|f| f.title.chars().count() + 1).max().unwrap_or(0);

    fields
        .iter()
        .map(|field| {
            let mut line = format!(
                "{:<width$} {}",
                format!("{}:", field.title),
                field.value.to_table(),
                width = width
            );
            if let Some(unit) = field.unit {
                line.push_str(&format!(" {}", unit));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn simple_table(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| {
            let value = field.value.to_table();
            let mut line = if value.contains(' ') {
                format!("{} \"{}\"", field.key, value)
            } else {
                format!("{} {}", field.key, value)
            };
            if let Some(unit) = field.unit {
                line.push_str(&format!(" {}", unit));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn table_json(fields: &[Field], simple: bool) -> String {
    let mut data = Map::new();

    for field in fields {
        let value = match (simple, field.unit) {
            (true, _) => field.value.to_simple_json(),
            (false, Some(unit)) => json!({ "value": field.value.to_json(), "unit": unit.to_string() }),
            (false, None) => field.value.to_json(),
        };
        data.insert(field.key.to_string(), value);
    }

    json!({ "result": "ok", "data": data }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::p18::types::BatteryType;

    fn fields() -> Vec<Field> {
        vec![
            Field::new("grid_voltage", "Grid voltage", Value::tenths(2301)).unit(Unit::V),
            Field::new("battery_type", "Battery type", Value::label(BatteryType::Flooded)),
            Field::new("buzzer", "Buzzer", true),
        ]
    }

    #[test]
    fn format_names() {
        assert_eq!("simple-json".parse::<Format>().unwrap(), Format::SimpleJson);
        assert_eq!(Format::SimpleTable.to_string(), "simple-table");
        assert_eq!(
            "xml".parse::<Format>().unwrap_err(),
            Error::InvalidArgument("invalid format".to_string())
        );
    }

    #[test]
    fn table_aligns_titles() {
        let out = render_content(&Content::Table(fields()), Format::Table);
        assert_eq!(
            out,
            "Grid voltage: 230.1 V\nBattery type: Flooded\nBuzzer:       Yes"
        );
    }

    #[test]
    fn simple_table_quotes_spaces() {
        let content = Content::Table(vec![
            Field::new("mode", "Working mode", "Battery mode"),
            Field::new("battery_capacity", "Battery capacity", 78u32).unit(Unit::Percentage),
        ]);
        assert_eq!(
            render_content(&content, Format::SimpleTable),
            "mode \"Battery mode\"\nbattery_capacity 78 %"
        );
    }

    #[test]
    fn json_variants() {
        let content = Content::Table(fields());
        assert_eq!(
            render_content(&content, Format::Json),
            r#"{"result":"ok","data":{"grid_voltage":{"value":230.1,"unit":"V"},"battery_type":"Flooded","buzzer":true}}"#
        );
        assert_eq!(
            render_content(&content, Format::SimpleJson),
            r#"{"result":"ok","data":{"grid_voltage":230.1,"battery_type":1,"buzzer":true}}"#
        );
    }

    #[test]
    fn lists_and_statuses() {
        let list = Content::List(vec![Value::from(2u32), Value::from(10u32)]);
        assert_eq!(render_content(&list, Format::Table), "2\n10");
        assert_eq!(render_content(&list, Format::Json), r#"{"result":"ok","data":[2,10]}"#);

        let ok = Content::Status { ok: true, message: String::new() };
        assert_eq!(render_content(&ok, Format::Table), "ok");
        assert_eq!(render_content(&ok, Format::SimpleJson), r#"{"result":"ok"}"#);

        let err = Content::Status { ok: false, message: "timeout: no reply".to_string() };
        assert_eq!(render_content(&err, Format::SimpleTable), "error: timeout: no reply");
        assert_eq!(
            render_content(&err, Format::Json),
            r#"{"result":"error","message":"timeout: no reply"}"#
        );
    }
}
