use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;

use stride_core::models::{ActivityRecord, FoodItem, MealType, UserGoals, UserProfile};
use stride_core::remote::RemoteStore;

/// Document-store client speaking the `stride serve` REST API.
///
/// Blocking facade over reqwest in the same shape as the OpenFoodFacts
/// client: async internals, `block_on` at the trait boundary. Errors
/// propagate from here; the sentinel collapse lives in `CloudRepository`.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    rt: tokio::runtime::Handle,
}

impl HttpRemoteStore {
    #[must_use]
    pub fn new(base_url: &str, token: Option<String>, rt: tokio::runtime::Handle) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "stride-cli/{} (nutrition tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(15))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            rt,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let resp = self
            .authorize(self.client.get(self.url(path)).query(query))
            .send()
            .await
            .with_context(|| format!("Failed to reach remote store at {path}"))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("remote store returned {status} for GET {path}");
        }
        resp.json()
            .await
            .with_context(|| format!("Failed to parse remote response for {path}"))
    }

    async fn get_one<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let resp = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await
            .with_context(|| format!("Failed to reach remote store at {path}"))?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            bail!("remote store returned {status} for GET {path}");
        }
        let value = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse remote response for {path}"))?;
        Ok(Some(value))
    }

    async fn put_one<T: Serialize>(&self, path: &str, body: &T) -> Result<()> {
        let resp = self
            .authorize(self.client.put(self.url(path)).json(body))
            .send()
            .await
            .with_context(|| format!("Failed to reach remote store at {path}"))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("remote store returned {status} for PUT {path}");
        }
        Ok(())
    }

    async fn delete_one(&self, path: &str) -> Result<()> {
        let resp = self
            .authorize(self.client.delete(self.url(path)))
            .send()
            .await
            .with_context(|| format!("Failed to reach remote store at {path}"))?;
        let status = resp.status();
        // Deleting an absent document is a success, as in the original store.
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            bail!("remote store returned {status} for DELETE {path}");
        }
        Ok(())
    }
}

impl RemoteStore for HttpRemoteStore {
    fn fetch_food_items(&self, user_id: &str) -> Result<Vec<FoodItem>> {
        self.rt.block_on(self.get_list(
            "/api/food_items",
            &[("user_id", user_id.to_string())],
        ))
    }

    fn fetch_food_item(&self, id: &str) -> Result<Option<FoodItem>> {
        self.rt.block_on(self.get_one(&format!("/api/food_items/{id}")))
    }

    fn fetch_favorite_food_items(&self, user_id: &str) -> Result<Vec<FoodItem>> {
        self.rt.block_on(self.get_list(
            "/api/food_items",
            &[
                ("user_id", user_id.to_string()),
                ("favorite", "true".to_string()),
            ],
        ))
    }

    fn fetch_food_items_by_meal_type(
        &self,
        user_id: &str,
        meal_type: MealType,
        start_millis: i64,
        end_millis: i64,
    ) -> Result<Vec<FoodItem>> {
        self.rt.block_on(self.get_list(
            "/api/food_items",
            &[
                ("user_id", user_id.to_string()),
                ("meal_type", meal_type.as_str().to_string()),
                ("start", start_millis.to_string()),
                ("end", end_millis.to_string()),
            ],
        ))
    }

    fn put_food_item(&self, item: &FoodItem) -> Result<()> {
        self.rt
            .block_on(self.put_one(&format!("/api/food_items/{}", item.id), item))
    }

    fn remove_food_item(&self, id: &str) -> Result<()> {
        self.rt
            .block_on(self.delete_one(&format!("/api/food_items/{id}")))
    }

    fn fetch_activity_records(&self, user_id: &str) -> Result<Vec<ActivityRecord>> {
        self.rt.block_on(self.get_list(
            "/api/activity_records",
            &[("user_id", user_id.to_string())],
        ))
    }

    fn put_activity_record(&self, record: &ActivityRecord) -> Result<()> {
        self.rt.block_on(
            self.put_one(&format!("/api/activity_records/{}", record.id), record),
        )
    }

    fn remove_activity_record(&self, id: &str) -> Result<()> {
        self.rt
            .block_on(self.delete_one(&format!("/api/activity_records/{id}")))
    }

    fn fetch_user_goals(&self, user_id: &str) -> Result<Option<UserGoals>> {
        self.rt
            .block_on(self.get_one(&format!("/api/user_goals/{user_id}")))
    }

    fn put_user_goals(&self, goals: &UserGoals) -> Result<()> {
        self.rt
            .block_on(self.put_one(&format!("/api/user_goals/{}", goals.user_id), goals))
    }

    fn fetch_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.rt
            .block_on(self.get_one(&format!("/api/user_profiles/{user_id}")))
    }

    fn put_user_profile(&self, profile: &UserProfile) -> Result<()> {
        self.rt.block_on(
            self.put_one(&format!("/api/user_profiles/{}", profile.user_id), profile),
        )
    }
}
