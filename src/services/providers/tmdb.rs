//! TMDB catalog provider
//!
//! API Flow:
//! 1. Details: /{movie|tv}/{id} → full item including genres
//! 2. Popular: /{movie|tv}/popular → first page of popular items (genre ids only)

use crate::{
    error::{AppError, AppResult},
    models::{MediaItem, MediaType},
    services::providers::MediaCatalog,
};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::Deserialize;

#[derive(Clone)]
pub struct TmdbCatalog {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    media_type: MediaType,
}

#[derive(Deserialize)]
struct PopularResponse {
    #[serde(default)]
    results: Vec<MediaItem>,
}

impl TmdbCatalog {
    /// Creates a catalog for one TMDB media type. TMDB has no book catalog.
    pub fn new(api_key: String, api_url: String, media_type: MediaType) -> AppResult<Self> {
        match media_type {
            MediaType::Movie | MediaType::Tv => Ok(Self {
                http_client: HttpClient::new(),
                api_key,
                api_url: api_url.trim_end_matches('/').to_string(),
                media_type,
            }),
            other => Err(AppError::InvalidInput(format!(
                "TMDB has no catalog for media type {}",
                other
            ))),
        }
    }

    fn details_url(&self, id: u64) -> String {
        format!("{}/{}/{}", self.api_url, self.media_type, id)
    }

    fn popular_url(&self) -> String {
        format!("{}/{}/popular", self.api_url, self.media_type)
    }

    async fn get(&self, url: &str) -> AppResult<Response> {
        let response = self
            .http_client
            .get(url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("TMDB resource {}", url)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        Ok(response)
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> AppResult<T> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(error = %e, "Failed to deserialize TMDB response");
        AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
    })
}

/// Full artwork URL for a poster path, if there is one
pub fn poster_url(image_base: &str, poster_path: Option<&str>) -> Option<String> {
    poster_path
        .filter(|p| !p.is_empty())
        .map(|p| format!("{}/{}", image_base.trim_end_matches('/'), p.trim_start_matches('/')))
}

#[async_trait::async_trait]
impl MediaCatalog for TmdbCatalog {
    async fn fetch_by_id(&self, id: u64) -> AppResult<MediaItem> {
        let body = self.get(&self.details_url(id)).await?.text().await?;
        let item: MediaItem = parse_body(&body)?;

        tracing::info!(
            item_id = item.id,
            media_type = %self.media_type,
            provider = "tmdb",
            "Item details fetched"
        );

        Ok(item)
    }

    async fn fetch_popular(&self) -> AppResult<Vec<MediaItem>> {
        let body = self.get(&self.popular_url()).await?.text().await?;
        let popular: PopularResponse = parse_body(&body)?;

        tracing::info!(
            results = popular.results.len(),
            media_type = %self.media_type,
            provider = "tmdb",
            "Popular list fetched"
        );

        Ok(popular.results)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(media_type: MediaType) -> TmdbCatalog {
        TmdbCatalog::new(
            "test_key".to_string(),
            "http://test.local/3/".to_string(),
            media_type,
        )
        .unwrap()
    }

    #[test]
    fn test_movie_urls() {
        let tmdb = catalog(MediaType::Movie);
        assert_eq!(tmdb.details_url(27205), "http://test.local/3/movie/27205");
        assert_eq!(tmdb.popular_url(), "http://test.local/3/movie/popular");
    }

    #[test]
    fn test_tv_urls() {
        let tmdb = catalog(MediaType::Tv);
        assert_eq!(tmdb.details_url(1399), "http://test.local/3/tv/1399");
        assert_eq!(tmdb.popular_url(), "http://test.local/3/tv/popular");
    }

    #[test]
    fn test_book_catalog_rejected() {
        let result = TmdbCatalog::new(
            "test_key".to_string(),
            "http://test.local".to_string(),
            MediaType::Book,
        );
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_movie_details_deserialization() {
        let json = r#"{
            "id": 27205,
            "title": "Inception",
            "poster_path": "/oYuLEt3zVCKq57qu2F8dT7NIa6f.jpg",
            "release_date": "2010-07-15",
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "overview": "Cobb, a skilled thief...",
            "runtime": 148
        }"#;

        let item: MediaItem = parse_body(json).unwrap();
        assert_eq!(item.id, 27205);
        assert_eq!(item.title, "Inception");
        assert_eq!(item.genres.len(), 2);
        assert_eq!(item.release_year(), Some(2010));
    }

    #[test]
    fn test_popular_response_deserialization() {
        let json = r#"{
            "page": 1,
            "results": [
                {"id": 1, "title": "One", "genre_ids": [28], "poster_path": null},
                {"id": 2, "title": "Two", "genre_ids": [], "release_date": "2024-01-01"}
            ],
            "total_pages": 500
        }"#;

        let popular: PopularResponse = parse_body(json).unwrap();
        assert_eq!(popular.results.len(), 2);
        assert_eq!(popular.results[0].poster_path, None);
        assert!(popular.results[1].genres.is_empty());
    }

    #[test]
    fn test_malformed_body_is_external_api_error() {
        let result: AppResult<MediaItem> = parse_body(r#"{"status_code": 7}"#);
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[test]
    fn test_poster_url() {
        assert_eq!(
            poster_url("https://image.tmdb.org/t/p/w500/", Some("/x.jpg")),
            Some("https://image.tmdb.org/t/p/w500/x.jpg".to_string())
        );
        assert_eq!(poster_url("https://image.tmdb.org/t/p/w500", Some("")), None);
        assert_eq!(poster_url("https://image.tmdb.org/t/p/w500", None), None);
    }
}
