use axum::http::HeaderMap;
use response::Usage;
use tracing::info;

/// Credential from `x-api-key`, falling back to an `Authorization` bearer
/// token. The key is forwarded upstream, never validated here.
pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(key) = headers.get("x-api-key").and_then(|value| value.to_str().ok()) {
        return Some(key.to_string());
    }

    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Usage figures the upstream reports are logged for operators; the
/// translated responses carry locally computed counts instead.
pub fn usage_callback(usage: &Usage) {
    info!(
        "Upstream usage: prompt_tokens: {}, completion_tokens: {}, total_tokens: {}",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
    );
}
