//! Answer payload and parsing of raw generator output.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const UNKNOWN_RISK: &str = "unknown";

/// A cited page as the generator wrote it. Models emit `1`, `1.0` or `"1"`
/// interchangeably; validation coerces all three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRef {
    Int(i64),
    Float(f64),
    Text(String),
}

impl PageRef {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PageRef::Int(n) => Some(*n),
            PageRef::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            PageRef::Float(_) => None,
            PageRef::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => n.as_i64().map(PageRef::Int).or_else(|| n.as_f64().map(PageRef::Float)),
            Value::String(s) => Some(PageRef::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRef::Int(n) => write!(f, "{}", n),
            PageRef::Float(x) => write!(f, "{}", x),
            PageRef::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: String,
    pub page: PageRef,
}

impl Citation {
    pub fn new(doc_id: impl Into<String>, page: i64) -> Self {
        Self { doc_id: doc_id.into(), page: PageRef::Int(page) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub risk_level: String,
    pub rationale: String,
    pub citations: Vec<Citation>,
    pub recommendations: Vec<String>,
}

impl AnswerPayload {
    pub fn fallback(rationale: impl Into<String>) -> Self {
        Self { risk_level: UNKNOWN_RISK.to_string(), rationale: rationale.into(), citations: vec![], recommendations: vec![] }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(AnswerPayload),
    /// No usable JSON object; the payload carries the raw output verbatim.
    Fallback(AnswerPayload),
}

impl ParseOutcome {
    pub fn into_payload(self) -> AnswerPayload {
        match self {
            ParseOutcome::Parsed(p) | ParseOutcome::Fallback(p) => p,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ParseOutcome::Fallback(_))
    }
}

/// Byte range of the first balanced `{...}` span, skipping braces that sit
/// inside JSON string literals.
pub fn first_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in raw[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn parse_answer(raw: &str) -> ParseOutcome {
    let parsed = first_json_object(raw)
        .and_then(|span| serde_json::from_str::<Value>(span).ok())
        .and_then(|v| payload_from_value(&v));
    match parsed {
        Some(p) => ParseOutcome::Parsed(p),
        None => ParseOutcome::Fallback(AnswerPayload::fallback(raw)),
    }
}

fn text_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Missing fields take empty defaults; malformed citation entries are skipped.
fn payload_from_value(v: &Value) -> Option<AnswerPayload> {
    let obj = v.as_object()?;
    let risk_level = obj.get("risk_level").map(text_of).filter(|s| !s.is_empty()).unwrap_or_else(|| UNKNOWN_RISK.to_string());
    let rationale = obj.get("rationale").map(text_of).unwrap_or_default();
    let citations = obj
        .get("citations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|c| {
                    let doc_id = c.get("doc_id")?.as_str()?.to_string();
                    let page = PageRef::from_value(c.get("page")?)?;
                    Some(Citation { doc_id, page })
                })
                .collect()
        })
        .unwrap_or_default();
    let recommendations = obj
        .get("recommendations")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(text_of).collect())
        .unwrap_or_default();
    Some(AnswerPayload { risk_level, rationale, citations, recommendations })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_object_inside_prose() {
        let raw = "Sure! {\"a\": {\"b\": 1}} trailing {\"c\": 2}";
        assert_eq!(first_json_object(raw), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn braces_in_strings_do_not_count() {
        let raw = r#"{"rationale": "use } and { freely \" quoted }", "x": 1} tail"#;
        assert_eq!(first_json_object(raw), Some(r#"{"rationale": "use } and { freely \" quoted }", "x": 1}"#));
    }

    #[test]
    fn unbalanced_is_none() {
        assert_eq!(first_json_object("{\"a\": 1"), None);
        assert_eq!(first_json_object("no json here"), None);
    }

    #[test]
    fn page_coercion() {
        assert_eq!(PageRef::Int(3).as_int(), Some(3));
        assert_eq!(PageRef::Float(3.0).as_int(), Some(3));
        assert_eq!(PageRef::Float(3.5).as_int(), None);
        assert_eq!(PageRef::Text(" 7 ".into()).as_int(), Some(7));
        assert_eq!(PageRef::Text("seven".into()).as_int(), None);
    }
}
