//! Search backends that return organic top-100 plus AIO data.

pub mod google;
pub mod yahoo;

use anyhow::Result;
use async_trait::async_trait;

use aio_common::{Device, Engine, Location, SearchResult};

pub use google::GoogleSearch;
pub use yahoo::YahooSearch;

/// One search backend. Implementations own their retry behavior: every
/// call goes through a [`crate::retry::RetryPolicy`], so an `Err` here means
/// retries are exhausted.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn engine(&self) -> Engine;

    async fn get_top100(
        &self,
        keyword: &str,
        lang: &str,
        location: &Location,
        device: Device,
    ) -> Result<SearchResult>;
}
