use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Cover art reference: an external URL or a locally stored image id,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CoverImage {
    External(String),
    Stored(String),
}

impl CoverImage {
    /// Absolute http(s) URLs are external references; any other non-empty
    /// value is a stored image id.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if is_absolute_http_url(raw) {
            Some(CoverImage::External(raw.to_string()))
        } else {
            Some(CoverImage::Stored(raw.to_string()))
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            CoverImage::External(url) => url,
            CoverImage::Stored(id) => id,
        }
    }

    /// Address the image can be fetched from
    pub fn resolve(&self, api_base_url: &str) -> String {
        match self {
            CoverImage::External(url) => url.clone(),
            CoverImage::Stored(id) => {
                format!("{}/api/images/{}", api_base_url.trim_end_matches('/'), id)
            }
        }
    }
}

pub(crate) fn is_absolute_http_url(raw: &str) -> bool {
    (raw.starts_with("http://") || raw.starts_with("https://"))
        && Url::parse(raw).is_ok_and(|url| url.has_host())
}

/// One hit from the external metadata provider's title search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataCandidate {
    pub id: u64,
    /// Movie title
    #[serde(default)]
    pub title: Option<String>,
    /// Series name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
}

impl MetadataCandidate {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    /// Release year, taken from whichever date the provider filled in
    pub fn year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .or(self.first_air_date.as_deref())
            .and_then(|date| date.get(..4))
    }
}

/// Enriched details for a chosen provider entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMetadata {
    pub tmdb_id: Option<u64>,
    pub title: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
    /// Set when the provider poster was downloaded into the image store
    pub saved_image_id: Option<String>,
    pub total_seasons: Option<u32>,
    pub status: Option<String>,
    pub overview: Option<String>,
    /// Movie runtime, or average episode length for a series, in minutes
    pub length: Option<u32>,
}

/// Image saved in the remote image store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_image_parse_external() {
        assert_eq!(
            CoverImage::parse("https://image.tmdb.org/t/p/w500/a.jpg"),
            Some(CoverImage::External(
                "https://image.tmdb.org/t/p/w500/a.jpg".to_string()
            ))
        );
    }

    #[test]
    fn test_cover_image_parse_stored_and_empty() {
        assert_eq!(
            CoverImage::parse("65a1f0c2"),
            Some(CoverImage::Stored("65a1f0c2".to_string()))
        );
        // Relative or scheme-less values are ids, not URLs
        assert_eq!(
            CoverImage::parse("ftp://host/a.jpg"),
            Some(CoverImage::Stored("ftp://host/a.jpg".to_string()))
        );
        assert_eq!(CoverImage::parse("   "), None);
    }

    #[test]
    fn test_cover_image_resolve() {
        let stored = CoverImage::Stored("abc".to_string());
        assert_eq!(
            stored.resolve("http://localhost:8080/"),
            "http://localhost:8080/api/images/abc"
        );
        let external = CoverImage::External("https://x.test/p.png".to_string());
        assert_eq!(external.resolve("http://localhost:8080"), "https://x.test/p.png");
    }

    #[test]
    fn test_candidate_display_title_and_year() {
        let json = r#"{
            "id": 1396,
            "name": "Breaking Bad",
            "poster_path": "/ggFHVNu6YYI5L9pCfOacjizRGt.jpg",
            "first_air_date": "2008-01-20"
        }"#;
        let candidate: MetadataCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.display_title(), "Breaking Bad");
        assert_eq!(candidate.year(), Some("2008"));
    }
}
