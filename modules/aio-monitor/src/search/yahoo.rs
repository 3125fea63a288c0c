use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use aio_common::{Device, Engine, Location, SearchResult, SerpItem};

use super::SearchProvider;
use crate::retry::RetryPolicy;

/// Yahoo! JAPAN results.
///
/// There is no live backend yet: every call returns the same three synthetic
/// results with no AIO, with or without a credential. A real client only has
/// to implement [`SearchProvider`]; nothing downstream changes.
pub struct YahooSearch {
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl YahooSearch {
    pub fn new(api_key: Option<String>, retry: RetryPolicy) -> Self {
        if api_key.is_none() {
            warn!("Yahoo! API key not provided - using synthetic results");
        }
        Self { api_key, retry }
    }
}

#[async_trait]
impl SearchProvider for YahooSearch {
    fn engine(&self) -> Engine {
        Engine::Yahoo
    }

    async fn get_top100(
        &self,
        keyword: &str,
        _lang: &str,
        _location: &Location,
        device: Device,
    ) -> Result<SearchResult> {
        let has_key = self.api_key.is_some();
        self.retry
            .run(&format!("Yahoo! SERP for \"{keyword}\""), move || async move {
                debug!(keyword, %device, has_key, "Using synthetic Yahoo! results");
                Ok(synthetic_results(keyword, device))
            })
            .await
    }
}

fn synthetic_results(keyword: &str, device: Device) -> SearchResult {
    let suffix = match device {
        Device::Mobile => " (モバイル版)",
        Device::Desktop => "",
    };

    let organic = [
        (1, "yahoo.co.jp", "https://yahoo.co.jp/search/example1", "Yahoo!検索結果1"),
        (2, "example.com", "https://example.com/page2", "検索結果2"),
        (3, "test.jp", "https://test.jp/article", "検索結果3"),
    ]
    .into_iter()
    .map(|(rank, domain, url, label)| SerpItem {
        rank,
        domain: domain.to_string(),
        url: url.to_string(),
        title: Some(format!("{keyword} - {label}{suffix}")),
    })
    .collect();

    SearchResult {
        engine: Engine::Yahoo,
        aio: None,
        organic,
    }
}
