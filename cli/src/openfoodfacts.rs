use anyhow::{Context, Result};
use tracing::warn;

use stride_core::models::FoodItem;
use stride_core::openfoodfacts::{ProductResponse, SearchResponse, product_to_food_item};

const SEARCH_URL: &str = "https://world.openfoodfacts.org/cgi/search.pl";
const PRODUCT_URL: &str = "https://world.openfoodfacts.org/api/v2/product";

pub struct OpenFoodFactsClient {
    client: reqwest::Client,
    rt: tokio::runtime::Handle,
}

impl OpenFoodFactsClient {
    #[must_use]
    pub fn new(rt: tokio::runtime::Handle) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "stride-cli/{} (nutrition tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        Self { client, rt }
    }

    pub async fn search_async(&self, query: &str) -> Result<Vec<FoodItem>> {
        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&[("search_terms", query), ("json", "1"), ("page_size", "20")])
            .send()
            .await
            .context("Failed to reach OpenFoodFacts API")?;

        let data: SearchResponse = resp
            .json()
            .await
            .context("Failed to parse OpenFoodFacts search response")?;

        let items: Vec<FoodItem> = data
            .products
            .into_iter()
            .filter_map(product_to_food_item)
            .collect();

        Ok(items)
    }

    pub async fn lookup_barcode_async(&self, barcode: &str) -> Result<Option<FoodItem>> {
        let url = format!("{PRODUCT_URL}/{barcode}");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach OpenFoodFacts API")?;

        let data: ProductResponse = resp
            .json()
            .await
            .context("Failed to parse OpenFoodFacts barcode response")?;

        if data.status != 1 {
            return Ok(None);
        }

        Ok(data.product.and_then(product_to_food_item))
    }

    /// Search by name; network and parse failures collapse to an empty list,
    /// indistinguishable from no matches. The cause is only warn-logged.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<FoodItem> {
        match self.rt.block_on(self.search_async(query)) {
            Ok(items) => items,
            Err(e) => {
                warn!("food search failed: {e:#}");
                Vec::new()
            }
        }
    }

    /// Barcode lookup with the same collapse-to-`None` failure policy.
    #[must_use]
    pub fn lookup_barcode(&self, barcode: &str) -> Option<FoodItem> {
        match self.rt.block_on(self.lookup_barcode_async(barcode)) {
            Ok(item) => item,
            Err(e) => {
                warn!("barcode lookup failed: {e:#}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Integration tests (hit real OpenFoodFacts API) ---

    #[tokio::test]
    #[ignore = "hits OpenFoodFacts API"]
    async fn test_lookup_barcode_known_product() {
        let client = OpenFoodFactsClient::new(tokio::runtime::Handle::current());
        let result = client.lookup_barcode_async("3017620422003").await.unwrap();
        let item = result.expect("Nutella should exist in OpenFoodFacts");
        assert!(item.name.to_lowercase().contains("nutella"));
        assert!(item.calories > 0);
    }

    #[tokio::test]
    #[ignore = "hits OpenFoodFacts API"]
    async fn test_lookup_barcode_not_found() {
        let client = OpenFoodFactsClient::new(tokio::runtime::Handle::current());
        let result = client.lookup_barcode_async("0000000000000").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    #[ignore = "hits OpenFoodFacts API"]
    async fn test_search_returns_results() {
        let client = OpenFoodFactsClient::new(tokio::runtime::Handle::current());
        let results = client.search_async("nutella").await.unwrap();
        assert!(!results.is_empty());
        for item in &results {
            assert!(!item.name.is_empty());
        }
    }
}
