//! Media catalog abstraction
//!
//! The hero resolver needs two capabilities from a catalog: a full-detail
//! lookup for one id, and the current popular list.

use crate::{error::AppResult, models::MediaItem};

pub mod tmdb;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MediaCatalog: Send + Sync {
    /// Fetch full details for one item
    async fn fetch_by_id(&self, id: u64) -> AppResult<MediaItem>;

    /// Fetch the catalog's popular list, most popular first
    async fn fetch_popular(&self) -> AppResult<Vec<MediaItem>>;

    /// Catalog name for logging and debugging
    fn name(&self) -> &'static str;
}
