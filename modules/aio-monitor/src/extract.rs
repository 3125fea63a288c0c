//! Pure fact extraction over provider output. No I/O.

use aio_common::{matches, AioInfo, ChangeReport, DailyResult, SearchResult};
use tracing::{debug, info};

/// AIO presence, its sources, and which of them point at `targets`.
pub fn extract_aio_info(result: &SearchResult, targets: &[String]) -> AioInfo {
    let aio = match result.aio {
        Some(ref aio) if aio.present => aio,
        _ => return AioInfo::default(),
    };

    let aio_sources: Vec<String> = aio.sources.iter().map(|s| s.url.clone()).collect();
    let own_cited_urls: Vec<String> = aio_sources
        .iter()
        .filter(|url| matches(url, targets))
        .cloned()
        .collect();

    debug!(
        engine = %result.engine,
        sources = aio_sources.len(),
        own_cited = !own_cited_urls.is_empty(),
        "AIO analysis"
    );

    AioInfo {
        aio_present: true,
        own_cited: !own_cited_urls.is_empty(),
        aio_sources,
        own_cited_urls,
    }
}

/// Best (lowest) organic rank whose URL belongs to `targets`.
pub fn find_own_rank(result: &SearchResult, targets: &[String]) -> Option<u32> {
    if targets.is_empty() {
        return None;
    }

    result
        .organic
        .iter()
        .filter(|item| matches(&item.url, targets))
        .map(|item| item.rank)
        .min()
}

/// Compare this run's result with the previous one for the same keyword.
pub fn detect_changes(current: &DailyResult, previous: Option<&DailyResult>) -> ChangeReport {
    let Some(previous) = previous else {
        return ChangeReport::default();
    };

    let rank_change_amount = match (previous.serp_rank, current.serp_rank) {
        (Some(prev), Some(cur)) => Some(i64::from(prev) - i64::from(cur)),
        _ => None,
    };

    let report = ChangeReport {
        aio_status_changed: current.aio_present != previous.aio_present,
        citation_status_changed: current.own_cited != previous.own_cited,
        rank_changed: current.serp_rank != previous.serp_rank,
        rank_change_amount,
    };

    if report.any() {
        info!(
            keyword = %current.keyword,
            engine = %current.engine,
            aio = report.aio_status_changed,
            citation = report.citation_status_changed,
            rank = report.rank_changed,
            rank_delta = ?report.rank_change_amount,
            "Changes detected"
        );
    }

    report
}
