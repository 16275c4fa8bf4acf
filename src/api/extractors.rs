use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;

use crate::error::EngramError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(EngramError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for EngramError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

fn map_json_rejection(rejection: JsonRejection) -> EngramError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.to_string();
            if let Some(field) = extract_missing_field(&message) {
                EngramError::Validation(format!("Missing required field: {field}"))
            } else {
                EngramError::Validation(format!("Invalid JSON: {message}"))
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            EngramError::Validation(format!("JSON syntax error: {err}"))
        }
        JsonRejection::MissingJsonContentType(_) => {
            EngramError::Validation("Missing `Content-Type: application/json` header".to_string())
        }
        JsonRejection::BytesRejection(_) => {
            EngramError::Internal("Failed to read request body".to_string())
        }
        _ => EngramError::Validation(rejection.to_string()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_missing_field() {
        let message = "Failed to deserialize the JSON body into the target type: missing field `user_id` at line 1 column 2";
        assert_eq!(extract_missing_field(message), Some("user_id"));
    }

    #[test]
    fn test_extract_missing_field_absent() {
        assert_eq!(extract_missing_field("invalid type: string"), None);
    }
}
