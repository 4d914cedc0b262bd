use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct InfoRequest {
    /// YouTube watch or short link.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub title: String,
    /// Length in seconds, as reported by the extractor.
    #[schema(value_type = Option<f64>)]
    pub duration: Option<serde_json::Number>,
    pub thumbnail: Option<String>,
    pub video_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ConvertRequest {
    /// YouTube watch or short link.
    #[serde(default)]
    pub url: Option<String>,
    /// Requested audio bitrate in kbit/s (default `"320"`). Validated, but
    /// audio is always extracted at the best available quality.
    #[serde(default, deserialize_with = "string_or_number")]
    pub quality: Option<String>,
    /// Maximum video height for `mp4` (default `"720"`).
    #[serde(default, deserialize_with = "string_or_number")]
    pub resolution: Option<String>,
    /// `mp3` (default), `m4a`, `opus`, `wav`, `flac` or `mp4`.
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    /// `/download/{stored filename}`.
    pub download_url: String,
    /// Name to save the file under, without the internal id.
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Accepts `"720"` as well as `720`.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}
