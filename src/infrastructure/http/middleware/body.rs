use super::error::{ApiError, ApiResult};
use axum::{
    body::Bytes,
    http::{header, HeaderMap},
    Json,
};
use serde::de::DeserializeOwned;

/// Decode a request body that may be left out entirely.
///
/// An empty body yields `T::default()`. Anything else must be JSON with a JSON
/// content type; a body that fails to decode is rejected instead of being
/// treated as absent.
pub fn optional_json<T>(headers: &HeaderMap, body: &Bytes) -> ApiResult<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    if !has_json_content_type(headers) {
        return Err(ApiError::BadRequest(
            "Expected request with `Content-Type: application/json`".to_string(),
        ));
    }

    let Json(value) = Json::<T>::from_bytes(body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    Ok(value)
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Payload {
        name: Option<String>,
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers
    }

    #[test]
    fn test_empty_body_is_default() {
        let value: Payload = optional_json(&HeaderMap::new(), &Bytes::new()).unwrap();
        assert_eq!(value, Payload::default());
    }

    #[test]
    fn test_body_without_content_type_is_rejected() {
        let body = Bytes::from_static(br#"{"name":"sales"}"#);
        let result: ApiResult<Payload> = optional_json(&HeaderMap::new(), &body);
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let body = Bytes::from_static(br#"{"name":"sales""#);
        let result: ApiResult<Payload> = optional_json(&json_headers(), &body);
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_json_body_is_decoded() {
        let body = Bytes::from_static(br#"{"name":"sales"}"#);
        let value: Payload = optional_json(&json_headers(), &body).unwrap();
        assert_eq!(value.name.as_deref(), Some("sales"));
    }
}
