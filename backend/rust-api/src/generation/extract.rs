//! Pulls a single JSON object out of free-form model output.
//!
//! Each stage is a total `&str -> String` transformation; only the final
//! parse can fail. Stage order matters: fences are stripped before the
//! brace scan, and quotes are normalised before trailing commas are removed.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

const PREVIEW_CHARS: usize = 200;

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"```(?:json|JSON)?").unwrap();
    static ref TRAILING_COMMA: Regex = Regex::new(r",(\s*[}\]])").unwrap();
    static ref SINGLE_QUOTED_VALUE: Regex =
        Regex::new(r#"("[^"\n]*"\s*:\s*)'([^'\n]*)'"#).unwrap();
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("No JSON object found in generated content")]
    NoJsonFound,

    #[error("No end of JSON object found in generated content")]
    NoJsonEnd,

    #[error("Malformed JSON in generated content: {message}")]
    MalformedGeneratedJson { message: String, preview: String },
}

impl ExtractError {
    pub fn preview(&self) -> Option<&str> {
        match self {
            ExtractError::MalformedGeneratedJson { preview, .. } => Some(preview),
            _ => None,
        }
    }
}

/// Which parse attempt produced the value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairPass {
    Strict,
    EscapedNewlines,
    RequotedValues,
}

impl RepairPass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairPass::Strict => "strict",
            RepairPass::EscapedNewlines => "escaped_newlines",
            RepairPass::RequotedValues => "requoted_values",
        }
    }
}

pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").into_owned()
}

/// Returns the substring from the first `{` to its matching `}`.
///
/// Depth counting does not look inside string literals. When the depth
/// never returns to zero the last `}` in the text closes the object.
pub fn isolate_json_object(text: &str) -> Result<&str, ExtractError> {
    let start = text.find('{').ok_or(ExtractError::NoJsonFound)?;

    let mut depth: i64 = 0;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset;
                    return Ok(&text[start..=end]);
                }
            }
            _ => {}
        }
    }

    match text.rfind('}') {
        Some(end) if end > start => Ok(&text[start..=end]),
        _ => Err(ExtractError::NoJsonEnd),
    }
}

pub fn normalize_smart_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect()
}

pub fn remove_trailing_commas(text: &str) -> String {
    TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

/// Escapes raw line breaks that appear inside string literals.
pub fn escape_raw_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => {
                    escaped = false;
                    out.push(c);
                }
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }

    out
}

/// Rewrites `"key": 'value'` into `"key": "value"`.
pub fn requote_single_quoted_values(text: &str) -> String {
    SINGLE_QUOTED_VALUE
        .replace_all(text, r#"$1"$2""#)
        .into_owned()
}

/// Runs the full extraction and repair pipeline on raw model output.
pub fn extract_json(raw: &str) -> Result<(Value, RepairPass), ExtractError> {
    let unfenced = strip_code_fences(raw);
    let candidate = isolate_json_object(&unfenced)?;
    let candidate = remove_trailing_commas(&normalize_smart_quotes(candidate));

    let first_error = match serde_json::from_str::<Value>(&candidate) {
        Ok(value) => return Ok((value, RepairPass::Strict)),
        Err(err) => err,
    };
    tracing::debug!(error = %first_error, "Strict parse failed, escaping raw newlines");

    let escaped = escape_raw_newlines(&candidate);
    if let Ok(value) = serde_json::from_str::<Value>(&escaped) {
        return Ok((value, RepairPass::EscapedNewlines));
    }
    tracing::debug!("Newline repair failed, re-quoting single-quoted values");

    let requoted = requote_single_quoted_values(&escaped);
    if let Ok(value) = serde_json::from_str::<Value>(&requoted) {
        return Ok((value, RepairPass::RequotedValues));
    }

    Err(ExtractError::MalformedGeneratedJson {
        message: first_error.to_string(),
        preview: candidate.chars().take(PREVIEW_CHARS).collect(),
    })
}
