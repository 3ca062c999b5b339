//! The `{data, error}` wrapper around every JSON API response, and the
//! status-to-error mapping built on top of it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::HttpResponse;

/// The `{ "data": ..., "error": ... }` wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

/// The `error` member of an envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: i64,
    pub message: String,
}

/// Unwrap `data` from a successful enveloped response.
///
/// A non-2xx status, or a 2xx whose envelope carries an `error`, takes the
/// error path.
pub(crate) fn parse_data<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    if !response.is_success() {
        return Err(error_from_response(response));
    }
    let envelope: Envelope<serde_json::Value> = serde_json::from_slice(&response.body)
        .map_err(|e| ApiError::Deserialization(e.to_string()))?;
    if let Some(error) = envelope.error {
        return Err(error_from_success(response.status, error));
    }
    match envelope.data {
        Some(data) if !data.is_null() => {
            serde_json::from_value(data).map_err(|e| ApiError::Deserialization(e.to_string()))
        }
        _ => Err(ApiError::Deserialization(
            "response envelope carries no data".to_string(),
        )),
    }
}

/// Accept a successful response whose body is irrelevant (204 on delete).
///
/// An empty body is never parsed. A non-empty body is only inspected for an
/// envelope `error`.
pub(crate) fn parse_empty(response: &HttpResponse) -> Result<(), ApiError> {
    if !response.is_success() {
        return Err(error_from_response(response));
    }
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }
    match serde_json::from_slice::<Envelope<serde::de::IgnoredAny>>(&response.body) {
        Ok(Envelope {
            error: Some(error), ..
        }) => Err(error_from_success(response.status, error)),
        _ => Ok(()),
    }
}

/// Map a failure response to an `ApiError`.
///
/// The status picks the variant. `code` and `message` come from the error
/// envelope when it parses, otherwise from the status and raw body.
pub(crate) fn error_from_response(response: &HttpResponse) -> ApiError {
    match serde_json::from_slice::<Envelope<serde::de::IgnoredAny>>(&response.body) {
        Ok(Envelope {
            error: Some(error), ..
        }) => ApiError::from_status(response.status, error.code, error.message),
        _ => ApiError::from_status(
            response.status,
            i64::from(response.status),
            raw_message(response),
        ),
    }
}

/// A 2xx carrying an error envelope has no meaningful HTTP status to
/// classify on, so the envelope code picks the variant instead.
fn error_from_success(status: u16, error: ErrorBody) -> ApiError {
    let ErrorBody { code, message } = error;
    // Codes outside the u16 range cannot name a status; they land in `Api`.
    let kind = u16::try_from(code).unwrap_or(0);
    ApiError::classified(kind, status, code, message)
}

fn raw_message(response: &HttpResponse) -> String {
    let body = String::from_utf8_lossy(&response.body);
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn unwraps_data() {
        let response = HttpResponse::new(200, r#"{"data":{"value":7},"error":null}"#);
        let payload: Payload = parse_data(&response).unwrap();
        assert_eq!(payload, Payload { value: 7 });
    }

    #[test]
    fn error_on_success_status_takes_error_path() {
        let response = HttpResponse::new(
            200,
            r#"{"data":null,"error":{"code":500,"message":"disk full"}}"#,
        );
        let err = parse_data::<Payload>(&response).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Api { status: 200, code: 500, ref message } if message == "disk full"
        ));
    }

    #[test]
    fn error_on_success_status_classifies_by_code() {
        let response = HttpResponse::new(
            200,
            r#"{"data":null,"error":{"code":404,"message":"gone"}}"#,
        );
        let err = parse_data::<Payload>(&response).unwrap_err();
        assert!(matches!(err, ApiError::NotFound { status: 200, code: 404, .. }));
    }

    #[test]
    fn error_on_success_status_with_out_of_range_code_is_generic() {
        for code in ["-404", "70409"] {
            let body = format!(r#"{{"data":null,"error":{{"code":{code},"message":"odd"}}}}"#);
            let err = parse_data::<Payload>(&HttpResponse::new(200, body)).unwrap_err();
            assert!(
                matches!(err, ApiError::Api { status: 200, .. }),
                "code {code}: {err:?}"
            );
        }
    }

    #[test]
    fn error_with_mismatched_data_shape_still_surfaces_error() {
        let response = HttpResponse::new(
            200,
            r#"{"data":"unexpected","error":{"code":400,"message":"bad"}}"#,
        );
        let err = parse_data::<Payload>(&response).unwrap_err();
        assert!(matches!(err, ApiError::Api { code: 400, .. }));
    }

    #[test]
    fn missing_data_is_deserialization_error() {
        let response = HttpResponse::new(200, r#"{"data":null,"error":null}"#);
        let err = parse_data::<Payload>(&response).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn not_found_envelope() {
        let response = HttpResponse::new(
            404,
            r#"{"data":null,"error":{"code":404,"message":"Repository x not found"}}"#,
        );
        let err = error_from_response(&response);
        assert!(matches!(
            err,
            ApiError::NotFound { status: 404, code: 404, ref message } if message == "Repository x not found"
        ));
    }

    #[test]
    fn conflict_envelope() {
        let response = HttpResponse::new(
            409,
            r#"{"data":null,"error":{"code":409,"message":"Destination already exists: b"}}"#,
        );
        assert!(error_from_response(&response).is_conflict());
    }

    #[test]
    fn unparseable_body_keeps_status_and_raw_body() {
        let response = HttpResponse::new(502, "Bad Gateway");
        let err = error_from_response(&response);
        assert!(matches!(
            err,
            ApiError::Api { status: 502, code: 502, ref message } if message == "Bad Gateway"
        ));
    }

    #[test]
    fn empty_error_body_gets_status_message() {
        let response = HttpResponse::new(404, Vec::new());
        let err = error_from_response(&response);
        assert!(matches!(
            err,
            ApiError::NotFound { code: 404, ref message, .. } if message == "HTTP 404"
        ));
    }

    #[test]
    fn empty_success_body_is_not_parsed() {
        assert!(parse_empty(&HttpResponse::new(204, Vec::new())).is_ok());
        assert!(parse_empty(&HttpResponse::new(200, "not json")).is_ok());
    }

    #[test]
    fn empty_response_with_error_envelope_fails() {
        let response = HttpResponse::new(
            200,
            r#"{"data":null,"error":{"code":500,"message":"partial delete"}}"#,
        );
        assert!(matches!(
            parse_empty(&response),
            Err(ApiError::Api { code: 500, .. })
        ));
    }
}
