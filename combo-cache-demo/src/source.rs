//! Simulated remote backend.

use std::time::Duration;

use async_trait::async_trait;
use combo_cache::fetch::AsyncDataSource;
use combo_cache::fetch::FetchRequest;
use combo_cache::fetch::FetchedPage;
use log::debug;

/// Answers page requests for `Item 0 .. Item n` after a fixed delay.
///
/// Filters match items whose label contains the filter text.
pub struct SimulatedBackend {
    labels: Vec<String>,
    latency: Duration,
}

impl SimulatedBackend {
    pub fn new(item_count: usize, latency: Duration) -> Self {
        Self {
            labels: (0..item_count).map(|i| format!("Item {i}")).collect(),
            latency,
        }
    }
}

#[async_trait]
impl AsyncDataSource<String> for SimulatedBackend {
    async fn fetch_page(&self, request: FetchRequest) -> FetchedPage<String> {
        debug!(
            "[backend] query {}",
            serde_json::to_string(&request).unwrap_or_default()
        );
        tokio::time::sleep(self.latency).await;

        let matching: Vec<&String> = self
            .labels
            .iter()
            .filter(|label| label.contains(&request.filter))
            .collect();
        let items = matching
            .iter()
            .skip(request.offset())
            .take(request.page_size)
            .map(|label| (*label).clone())
            .collect();
        FetchedPage::new(items, matching.len())
    }
}
