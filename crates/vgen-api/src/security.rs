//! Request validation.
//!
//! Failures map to the provider-style `{error, base_resp}` envelope so
//! clients see the same codes whether a request was rejected here or
//! upstream.

use validator::Validate;

use crate::error::{ApiError, ApiResult};

/// Maximum text length for synchronous speech.
pub const MAX_SYNC_SPEECH_CHARS: usize = 10_000;

/// Maximum text length for asynchronous speech.
pub const MAX_ASYNC_SPEECH_CHARS: usize = 1_000_000;

/// Maximum length of an id taken from a path or query.
const MAX_ID_LENGTH: usize = 128;

/// Validate a request body, reporting every failed field.
pub fn validate_request<T: Validate>(req: &T) -> ApiResult<()> {
    let Err(errors) = req.validate() else {
        return Ok(());
    };

    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    let messages: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();

    Err(ApiError::invalid_params(messages.join("; ")))
}

/// Reject text longer than `max` characters.
pub fn check_text_length(text: &str, max: usize, message: &str) -> ApiResult<()> {
    if text.chars().count() > max {
        return Err(ApiError::text_too_long(message));
    }
    Ok(())
}

/// Whether `id` looks like a provider task or file id.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LENGTH
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Require a non-empty, well-formed id parameter.
pub fn require_id(id: Option<&str>, name: &str) -> ApiResult<String> {
    match id.map(str::trim) {
        Some(id) if is_valid_id(id) => Ok(id.to_string()),
        Some(id) if !id.is_empty() => Err(ApiError::invalid_params(format!("{name} is invalid"))),
        _ => Err(ApiError::invalid_params(format!("{name} is required"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgen_provider::{ImageRequest, TemplateRequest, TextToVideoRequest};

    fn message(err: ApiError) -> String {
        match err {
            ApiError::Validation { message, code, .. } => {
                assert_eq!(code, 2013);
                message
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_prompt() {
        let err = validate_request(&TextToVideoRequest::new("")).unwrap_err();
        assert_eq!(message(err), "prompt is required");
        assert!(validate_request(&TextToVideoRequest::new("a cat")).is_ok());
    }

    #[test]
    fn test_all_missing_fields_reported() {
        let req: TemplateRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        let msg = message(validate_request(&req).unwrap_err());
        assert!(msg.contains("template_id is required"));
        assert!(msg.contains("media_inputs is required"));
        assert!(msg.contains("text_inputs is required"));
    }

    #[test]
    fn test_range_without_message() {
        let mut req = ImageRequest::new("a garden");
        req.n = 12;
        assert_eq!(message(validate_request(&req).unwrap_err()), "n is invalid");
    }

    #[test]
    fn test_text_length_limits() {
        assert!(check_text_length("hello", 5, "too long").is_ok());
        let err = check_text_length("hello!", 5, "too long").unwrap_err();
        assert!(matches!(err, ApiError::Validation { code: 2014, .. }));
        // counted in characters, not bytes
        assert!(check_text_length("ééééé", 5, "too long").is_ok());
    }

    #[test]
    fn test_id_validation() {
        assert!(is_valid_id("106916112212032"));
        assert!(is_valid_id("abc_123-x"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("../etc"));
        assert!(!is_valid_id(&"a".repeat(200)));

        assert_eq!(require_id(Some(" T1 "), "task_id").unwrap(), "T1");
        assert!(require_id(None, "task_id").is_err());
        assert!(require_id(Some("a/b"), "task_id").is_err());
    }
}
