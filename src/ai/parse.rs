use serde::de::DeserializeOwned;
use serde_json::Value;

use super::client::AiError;

/// Parses model output as a JSON object. Markdown code fences are tolerated.
pub fn parse_json_content(content: &str) -> Result<Value, AiError> {
    let trimmed = strip_code_fence(content.trim());
    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| AiError::InvalidResponse(format!("not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(AiError::InvalidResponse("expected a JSON object".into()));
    }
    Ok(value)
}

/// Deserializes a parsed completion into a typed payload.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, AiError> {
    serde_json::from_value(value).map_err(|e| AiError::InvalidResponse(e.to_string()))
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop the language tag line, e.g. ```json
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_object() {
        let v = parse_json_content(r#"{"items": []}"#).unwrap();
        assert!(v["items"].is_array());
    }

    #[test]
    fn strips_fenced_block() {
        let v = parse_json_content("```json\n{\"reply\": \"ok\"}\n```").unwrap();
        assert_eq!(v["reply"], "ok");
    }

    #[test]
    fn rejects_prose_and_arrays() {
        assert!(parse_json_content("Sure! Here is your plan").is_err());
        assert!(parse_json_content("[1, 2]").is_err());
    }
}
