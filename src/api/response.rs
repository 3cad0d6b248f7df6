use reqwest::StatusCode;

/// Pull the user-facing message out of a failed response body.
///
/// The server answers errors with `{"error": "..."}`; anything else falls
/// back to a status-coded message.
pub fn error_detail(status: StatusCode, body: &str) -> String {
    let embedded = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    embedded.unwrap_or_else(|| format!("Request failed (Status: {})", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_error_text_wins() {
        let msg = error_detail(StatusCode::BAD_REQUEST, r#"{"error":"Invalid target(s) provided"}"#);
        assert_eq!(msg, "Invalid target(s) provided");
    }

    #[test]
    fn falls_back_to_status() {
        assert_eq!(
            error_detail(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>"),
            "Request failed (Status: 500)"
        );
        assert_eq!(
            error_detail(StatusCode::BAD_GATEWAY, r#"{"error":"  "}"#),
            "Request failed (Status: 502)"
        );
    }
}
