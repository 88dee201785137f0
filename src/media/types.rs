use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMediaItem {
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPage {
    pub items: Vec<MediaItem>,
    pub total: usize,
}

/// Body returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaResponse {
    pub items: Vec<MediaItem>,
    pub has_more: bool,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Raw query parameters; kept as strings so malformed numbers fall back to defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MediaQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl MediaQuery {
    pub fn page(&self) -> usize {
        parse_positive(self.page.as_deref()).unwrap_or(1)
    }

    pub fn limit(&self, default_limit: usize, max_limit: usize) -> usize {
        parse_positive(self.limit.as_deref())
            .unwrap_or(default_limit)
            .min(max_limit.max(1))
    }
}

fn parse_positive(value: Option<&str>) -> Option<usize> {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
}

// On-disk layout of the metadata document
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct MediaDocument {
    pub items: Vec<MediaItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, limit: Option<&str>) -> MediaQuery {
        MediaQuery {
            page: page.map(String::from),
            limit: limit.map(String::from),
        }
    }

    #[test]
    fn test_query_defaults() {
        let q = query(None, None);
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(20, 100), 20);
    }

    #[test]
    fn test_query_malformed_values_default() {
        let q = query(Some("abc"), Some("-5"));
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(20, 100), 20);

        let q = query(Some("0"), Some("0"));
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(20, 100), 20);
    }

    #[test]
    fn test_query_limit_clamped() {
        let q = query(Some("3"), Some("500"));
        assert_eq!(q.page(), 3);
        assert_eq!(q.limit(20, 100), 100);
    }

    #[test]
    fn test_media_item_uses_camel_case() {
        let json = r#"{"id":"1","title":"Sunset","path":"/uploads/sunset.png","createdAt":"2024-05-01T12:00:00.123Z"}"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.title, "Sunset");

        let out = serde_json::to_value(&item).unwrap();
        assert_eq!(out["createdAt"], "2024-05-01T12:00:00.123Z");
    }

    #[test]
    fn test_upload_response_omits_empty_fields() {
        let response = UploadResponse {
            success: false,
            error: Some("No title provided".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("path").is_none());
        assert!(json.get("title").is_none());
    }
}
