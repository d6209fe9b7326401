//! Parsing of structured (JSON) model output.
//!
//! Models often wrap JSON in markdown fences or surround it with a sentence
//! of prose. [`parse_structured`] strips both before deserializing.

use serde::de::DeserializeOwned;

use crate::error::AgentError;

/// Maximum bytes of raw output quoted in parse error messages.
const PREVIEW_LEN: usize = 200;

/// Returns the payload inside the first markdown code fence, or the trimmed
/// input when there is none.
#[must_use]
pub fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after_ticks = &trimmed[open + 3..];
    // Skip the info string (e.g. `json`) up to the end of the fence line.
    let body = after_ticks
        .find('\n')
        .map_or(after_ticks, |nl| &after_ticks[nl + 1..]);
    body.find("```")
        .map_or(body, |close| &body[..close])
        .trim()
}

/// The outermost `{ ... }` span, if any.
fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Deserializes model output into `T`.
///
/// Tries the fence-stripped text first, then the outermost JSON object
/// inside it.
///
/// # Errors
///
/// Returns [`AgentError::ResponseParse`] if the output is empty or neither
/// candidate deserializes.
pub fn parse_structured<T: DeserializeOwned>(content: &str) -> Result<T, AgentError> {
    let payload = strip_fences(content);
    if payload.is_empty() {
        return Err(AgentError::ResponseParse {
            message: "empty response".to_string(),
            content: content.to_string(),
        });
    }

    let first_err = match serde_json::from_str::<T>(payload) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(span) = object_span(payload).filter(|span| span.len() < payload.len()) {
        if let Ok(value) = serde_json::from_str::<T>(span) {
            return Ok(value);
        }
    }

    let preview: String = payload.chars().take(PREVIEW_LEN).collect();
    Err(AgentError::ResponseParse {
        message: format!(
            "{first_err}. Response length: {} bytes, preview: {preview:?}",
            payload.len()
        ),
        content: content.to_string(),
    })
}

/// Deserializes model output into `T` and runs `validate` on it.
///
/// # Errors
///
/// Returns [`AgentError::ResponseParse`] if parsing or validation fails.
pub fn parse_validated<T, F>(content: &str, validate: F) -> Result<T, AgentError>
where
    T: DeserializeOwned,
    F: FnOnce(T) -> Result<T, String>,
{
    let value = parse_structured::<T>(content)?;
    validate(value).map_err(|message| AgentError::ResponseParse {
        message,
        content: content.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use test_case::test_case;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test_case("{\"value\": 1}", "{\"value\": 1}" ; "bare")]
    #[test_case("```json\n{\"value\": 1}\n```", "{\"value\": 1}" ; "json fence")]
    #[test_case("```\n{\"value\": 1}\n```", "{\"value\": 1}" ; "plain fence")]
    #[test_case("Here you go:\n```json\n{\"value\": 1}\n```\nDone.", "{\"value\": 1}" ; "fence with prose")]
    #[test_case("  plain text  ", "plain text" ; "no fence")]
    fn test_strip_fences(input: &str, expected: &str) {
        assert_eq!(strip_fences(input), expected);
    }

    #[test]
    fn test_parse_fenced_json() {
        let sample: Sample =
            parse_structured("```json\n{\"value\": 7}\n```").unwrap_or_else(|_| unreachable!());
        assert_eq!(sample, Sample { value: 7 });
    }

    #[test]
    fn test_parse_object_inside_prose() {
        let sample: Sample = parse_structured("Sure! {\"value\": 3} Hope this helps.")
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(sample.value, 3);
    }

    #[test]
    fn test_truncated_json_fails() {
        let result = parse_structured::<Sample>("{\"value\": ");
        assert!(matches!(result, Err(AgentError::ResponseParse { .. })));
    }

    #[test]
    fn test_empty_fails() {
        let result = parse_structured::<Sample>("```json\n```");
        assert!(matches!(result, Err(AgentError::ResponseParse { .. })));
    }

    #[test]
    fn test_missing_field_fails() {
        let result = parse_structured::<Sample>("{\"other\": 1}");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_failure_is_parse_error() {
        let result = parse_validated::<Sample, _>("{\"value\": 0}", |p| {
            if p.value == 0 {
                Err("value must be positive".to_string())
            } else {
                Ok(p)
            }
        });
        match result {
            Err(AgentError::ResponseParse { message, .. }) => {
                assert_eq!(message, "value must be positive");
            }
            other => unreachable!("unexpected result: {other:?}"),
        }
    }
}
