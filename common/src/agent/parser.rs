use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

static FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)```(?:sql|json)?\s*(.*?)```").unwrap()
});

static FENCE_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)```(?:sql)?").unwrap()
});

pub const INVALID_VERDICT_ISSUE: &str = "Validator returned invalid JSON.";

/// outcome of reading generator output
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Ok(T),
    Failed { raw: String, reason: String },
}

impl<T> Parsed<T> {
    fn failed(raw: &str, reason: impl Into<String>) -> Self {
        Parsed::Failed {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

/// the validator's judgment of one attempt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Verdict {
    pub valid: bool,
    pub issues: Vec<String>,
    pub regenerate: bool,
}

impl Verdict {
    /// forced verdict for a validator response that could not be read
    pub fn unreadable() -> Self {
        Self {
            valid: false,
            issues: vec![INVALID_VERDICT_ISSUE.to_string()],
            regenerate: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    valid: Option<bool>,
    issues: Option<Vec<String>>,
    regenerate_sql: Option<bool>,
    regenerate: Option<bool>,
}

/// content of the first fenced block, trimmed, or the whole text trimmed
///
/// applying this to its own output returns it unchanged.
pub fn extract_fenced_block(text: &str) -> &str {
    match FENCE_REGEX.captures(text).and_then(|c| c.get(1)) {
        Some(block) => block.as_str().trim(),
        None => text.trim(),
    }
}

/// remove any fence markers left in a sql string
pub fn strip_fence_markers(sql: &str) -> String {
    FENCE_MARKER_REGEX.replace_all(sql, "").trim().to_string()
}

pub fn parse_sql(text: &str) -> Parsed<String> {
    let sql = extract_fenced_block(text);

    if sql.is_empty() {
        return Parsed::failed(text, "generator output contained no sql");
    }

    Parsed::Ok(sql.to_string())
}

pub fn parse_verdict(text: &str) -> Parsed<Verdict> {
    let block = extract_fenced_block(text);

    let value: Value = match serde_json::from_str(block) {
        Ok(value) => value,
        Err(e) => return Parsed::failed(text, e.to_string()),
    };

    if !value.is_object() {
        return Parsed::failed(text, "verdict is not a json object");
    }

    let raw: RawVerdict = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => return Parsed::failed(text, e.to_string()),
    };

    // missing flags never approve a query
    Parsed::Ok(Verdict {
        valid: raw.valid.unwrap_or(false),
        issues: raw.issues.unwrap_or_default(),
        regenerate: raw.regenerate_sql.or(raw.regenerate).unwrap_or(false),
    })
}
