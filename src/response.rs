//! Parsing of model completions

use crate::prompt::{LABEL_CORRECTION, LABEL_ERROR, LABEL_ERROR_TYPE, LABEL_EXPLANATION};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// English fallback for the explanation label
const LABEL_EXPLANATION_EN: &str = "Explanation:";

/// The labelled sections of a correction answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionResponse {
    /// The sentence as the model quoted it
    pub error: Option<String>,
    /// Error category
    pub error_type: Option<String>,
    /// Corrected sentence
    pub correction: Option<String>,
    /// Explanation of the correction
    pub explanation: String,
}

impl CorrectionResponse {
    /// Parse a completion. Only the explanation is required.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self {
            error: line_value(text, LABEL_ERROR),
            error_type: line_value(text, LABEL_ERROR_TYPE),
            correction: line_value(text, LABEL_CORRECTION),
            explanation: extract_explanation(text)?,
        })
    }

    /// Correction and explanation joined by one space, the shape of a
    /// combined corpus reference
    pub fn correction_and_explanation(&self) -> Result<String> {
        let correction = self.correction.as_deref().ok_or_else(|| {
            Error::ResponseParse(format!("label `{LABEL_CORRECTION}` not found"))
        })?;
        Ok(format!("{correction} {}", self.explanation))
    }
}

/// Trimmed text following the first explanation label
pub fn extract_explanation(text: &str) -> Result<String> {
    let rest = [LABEL_EXPLANATION, LABEL_EXPLANATION_EN]
        .iter()
        .find_map(|label| text.split_once(label).map(|(_, rest)| rest))
        .ok_or_else(|| {
            Error::ResponseParse(format!("label `{LABEL_EXPLANATION}` not found"))
        })?;

    let explanation = rest.trim_start_matches('*').trim();
    if explanation.is_empty() {
        return Err(Error::ResponseParse(format!(
            "nothing follows `{LABEL_EXPLANATION}`"
        )));
    }
    Ok(explanation.to_string())
}

/// Value of the first line starting with `label`
fn line_value(text: &str, label: &str) -> Option<String> {
    text.lines()
        .map(|line| {
            line.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '-' | '•'))
        })
        .find_map(|line| line.strip_prefix(label))
        .map(|value| value.trim().trim_matches('*').trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Split a paraphrase completion into one sentence per line
///
/// List numbering (`1.`, `2)`, `٣-`) and bullets are removed; blank lines
/// are dropped.
#[must_use]
pub fn parse_paraphrases(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();

    let digits_end = line
        .char_indices()
        .find(|(_, c)| !is_digit(*c))
        .map_or(line.len(), |(i, _)| i);
    if digits_end == 0 {
        return line;
    }

    let rest = &line[digits_end..];
    match rest.chars().next() {
        Some(c @ ('.' | ')' | '-' | ':' | '٫')) => rest[c.len_utf8()..].trim(),
        _ => line,
    }
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || ('\u{0660}'..='\u{0669}').contains(&c)
}
