//! Approval form parser.
//!
//! Parsing runs in two steps. The payload is first decoded into
//! [`RawOrderDetail`] with each control left as raw JSON. Every control is
//! then decoded on its own, first into a [`RawControl`] and then by its
//! declared kind into a [`FormValue`]. A control that fails either step is
//! logged and left out of the [`Form`]; the rest of the order still parses.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};

/// Order detail as returned by the approval service.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOrderDetail {
    #[serde(default)]
    pub order_id: String,
    pub template_code: String,
    /// Login of the person who filed the order.
    #[serde(default)]
    pub initiator: String,
    #[serde(default)]
    pub form: Vec<Value>,
}

/// One form control before decoding.
#[derive(Debug, Clone, Deserialize)]
pub struct RawControl {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
}

/// Control ids are strings in most templates and integers in some.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {other}"
        ))),
    }
}

impl RawControl {
    fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Declared control kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Text,
    Textarea,
    Number,
    Date,
    SingleSelect,
    MultiSelect,
    Member,
    Table,
}

impl FromStr for ControlKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ControlKind::Text),
            "textarea" => Ok(ControlKind::Textarea),
            "number" => Ok(ControlKind::Number),
            "date" => Ok(ControlKind::Date),
            "single_select" => Ok(ControlKind::SingleSelect),
            "multi_select" => Ok(ControlKind::MultiSelect),
            "member" => Ok(ControlKind::Member),
            "table" => Ok(ControlKind::Table),
            _ => Err(()),
        }
    }
}

/// A referenced person in a member control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Decoded control value.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Select(String),
    MultiSelect(Vec<String>),
    Members(Vec<Member>),
    /// Rows of a nested table, each row its own form.
    Table(Vec<Form>),
}

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("field '{field}' has unsupported control type '{kind}'")]
    UnsupportedControl { field: String, kind: String },

    #[error("field '{field}' has an invalid value: {message}")]
    InvalidValue { field: String, message: String },
}

impl FormError {
    fn invalid(control: &RawControl, message: impl Into<String>) -> Self {
        FormError::InvalidValue {
            field: control.label().to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FormField {
    id: String,
    name: String,
    value: FormValue,
}

/// Decoded controls of one form or table row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form {
    fields: Vec<FormField>,
}

impl Form {
    /// Value by control id or name (trimmed, case-insensitive).
    pub fn get(&self, key: &str) -> Option<&FormValue> {
        let key = key.trim();
        self.fields
            .iter()
            .find(|f| f.id.eq_ignore_ascii_case(key) || f.name.eq_ignore_ascii_case(key))
            .map(|f| &f.value)
    }

    /// First of `keys` that is present.
    pub fn get_any(&self, keys: &[&str]) -> Option<&FormValue> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Text or single-select value, trimmed. Empty values read as absent.
    pub fn text(&self, keys: &[&str]) -> Option<&str> {
        match self.get_any(keys)? {
            FormValue::Text(s) | FormValue::Select(s) => Some(s.trim()).filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    pub fn number(&self, keys: &[&str]) -> Option<f64> {
        match self.get_any(keys)? {
            FormValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn date(&self, keys: &[&str]) -> Option<NaiveDate> {
        match self.get_any(keys)? {
            FormValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Selected options. A single select or comma-separated text also counts.
    pub fn multi_select(&self, keys: &[&str]) -> Vec<String> {
        match self.get_any(keys) {
            Some(FormValue::MultiSelect(items)) => items.clone(),
            Some(FormValue::Select(s)) | Some(FormValue::Text(s)) => split_list(s),
            _ => Vec::new(),
        }
    }

    pub fn members(&self, keys: &[&str]) -> &[Member] {
        match self.get_any(keys) {
            Some(FormValue::Members(m)) => m,
            _ => &[],
        }
    }

    pub fn table(&self, keys: &[&str]) -> &[Form] {
        match self.get_any(keys) {
            Some(FormValue::Table(rows)) => rows,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A parsed order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetail {
    pub order_id: String,
    pub template_code: String,
    pub initiator: String,
    pub form: Form,
}

/// Parse an order detail payload.
///
/// Fails only when the envelope itself is malformed.
pub fn parse_order_detail(payload: Value) -> SyncResult<OrderDetail> {
    let raw: RawOrderDetail = serde_json::from_value(payload)
        .map_err(|e| SyncError::deserialization(format!("order detail: {e}")))?;

    Ok(OrderDetail {
        order_id: raw.order_id,
        template_code: raw.template_code.trim().to_string(),
        initiator: raw.initiator.trim().to_string(),
        form: decode_controls(raw.form),
    })
}

/// Decode raw JSON controls one by one. A control whose shape cannot be read
/// is logged and skipped without affecting its siblings.
pub fn decode_controls(raw: Vec<Value>) -> Form {
    let controls = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<RawControl>(value) {
            Ok(control) => Some(control),
            Err(e) => {
                warn!(index, error = %e, "Undecodable form control skipped");
                None
            }
        })
        .collect();
    parse_controls(controls)
}

/// Decode a list of controls, logging and skipping the ones that fail.
pub fn parse_controls(controls: Vec<RawControl>) -> Form {
    let mut fields = Vec::with_capacity(controls.len());

    for control in controls {
        match parse_control(&control) {
            Ok(Some(value)) => fields.push(FormField {
                id: control.id.trim().to_string(),
                name: control.name.trim().to_string(),
                value,
            }),
            Ok(None) => debug!(field = control.label(), "Empty form field skipped"),
            Err(e @ FormError::UnsupportedControl { .. }) => {
                warn!(error = %e, "Unsupported form control skipped");
            }
            Err(e) => warn!(error = %e, "Malformed form field dropped"),
        }
    }

    Form { fields }
}

/// Decode one control. `Ok(None)` for an empty value.
pub fn parse_control(control: &RawControl) -> Result<Option<FormValue>, FormError> {
    let kind = control
        .kind
        .parse::<ControlKind>()
        .map_err(|()| FormError::UnsupportedControl {
            field: control.label().to_string(),
            kind: control.kind.clone(),
        })?;

    if control.value.is_null() {
        return Ok(None);
    }

    let value = match kind {
        ControlKind::Text | ControlKind::Textarea => FormValue::Text(scalar_text(control)?),
        ControlKind::Number => FormValue::Number(number(control)?),
        ControlKind::Date => match date(control)? {
            Some(d) => FormValue::Date(d),
            None => return Ok(None),
        },
        ControlKind::SingleSelect => FormValue::Select(select(control)?),
        ControlKind::MultiSelect => FormValue::MultiSelect(multi_select(control)?),
        ControlKind::Member => FormValue::Members(members(control)?),
        ControlKind::Table => FormValue::Table(table(control)?),
    };
    Ok(Some(value))
}

fn split_list(s: &str) -> Vec<String> {
    s.split([',', '，'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn scalar_text(control: &RawControl) -> Result<String, FormError> {
    match &control.value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(FormError::invalid(control, format!("expected text, got {other}"))),
    }
}

fn number(control: &RawControl) -> Result<f64, FormError> {
    match &control.value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FormError::invalid(control, "number out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| FormError::invalid(control, e.to_string())),
        other => Err(FormError::invalid(control, format!("expected number, got {other}"))),
    }
}

fn date(control: &RawControl) -> Result<Option<NaiveDate>, FormError> {
    match &control.value {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            // "2026-05-20", "2026-05-20 18:00:00", "2026-05-20T18:00:00Z"
            let day = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .map(Some)
                .map_err(|e| FormError::invalid(control, format!("'{s}': {e}")))
        }
        // Millisecond timestamps
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|at| Some(at.date_naive()))
            .ok_or_else(|| FormError::invalid(control, format!("bad timestamp {n}"))),
        other => Err(FormError::invalid(control, format!("expected date, got {other}"))),
    }
}

fn option_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(map) => map
            .get("value")
            .or_else(|| map.get("label"))
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string()),
        _ => None,
    }
}

fn select(control: &RawControl) -> Result<String, FormError> {
    let label = match &control.value {
        Value::Array(items) if items.len() == 1 => option_label(&items[0]),
        other => option_label(other),
    };
    label.ok_or_else(|| FormError::invalid(control, "expected one option"))
}

fn multi_select(control: &RawControl) -> Result<Vec<String>, FormError> {
    match &control.value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                option_label(item)
                    .ok_or_else(|| FormError::invalid(control, format!("bad option {item}")))
            })
            .filter(|r| r.as_ref().map_or(true, |s| !s.is_empty()))
            .collect(),
        Value::String(s) => Ok(split_list(s)),
        other => Err(FormError::invalid(control, format!("expected options, got {other}"))),
    }
}

fn members(control: &RawControl) -> Result<Vec<Member>, FormError> {
    let items = match &control.value {
        Value::Array(items) => items.clone(),
        single @ Value::Object(_) => vec![single.clone()],
        other => {
            return Err(FormError::invalid(control, format!("expected members, got {other}")));
        }
    };
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<Member>(item)
                .map_err(|e| FormError::invalid(control, e.to_string()))
        })
        .collect()
}

fn table(control: &RawControl) -> Result<Vec<Form>, FormError> {
    let Value::Array(rows) = &control.value else {
        return Err(FormError::invalid(control, "expected table rows"));
    };
    rows.iter()
        .map(|row| match row {
            Value::Array(cells) => Ok(decode_controls(cells.clone())),
            other => Err(FormError::invalid(
                control,
                format!("table row: expected controls, got {other}"),
            )),
        })
        .collect()
}
