use anyhow::Result;
use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

use crate::models::{ActivityRecord, FoodItem, MealType, UserGoals, UserProfile, day_bounds};

/// Transport to the cloud document store.
///
/// One method per collection operation: get by key, get all for a user,
/// the simple equality/range filters, upsert by key, delete by key. The CLI
/// implements this with an HTTP client; tests with an in-memory map. Errors
/// propagate here — the sentinel collapse happens in [`CloudRepository`].
pub trait RemoteStore: Send + Sync {
    fn fetch_food_items(&self, user_id: &str) -> Result<Vec<FoodItem>>;
    fn fetch_food_item(&self, id: &str) -> Result<Option<FoodItem>>;
    fn fetch_favorite_food_items(&self, user_id: &str) -> Result<Vec<FoodItem>>;
    fn fetch_food_items_by_meal_type(
        &self,
        user_id: &str,
        meal_type: MealType,
        start_millis: i64,
        end_millis: i64,
    ) -> Result<Vec<FoodItem>>;
    fn put_food_item(&self, item: &FoodItem) -> Result<()>;
    fn remove_food_item(&self, id: &str) -> Result<()>;

    fn fetch_activity_records(&self, user_id: &str) -> Result<Vec<ActivityRecord>>;
    fn put_activity_record(&self, record: &ActivityRecord) -> Result<()>;
    fn remove_activity_record(&self, id: &str) -> Result<()>;

    fn fetch_user_goals(&self, user_id: &str) -> Result<Option<UserGoals>>;
    fn put_user_goals(&self, goals: &UserGoals) -> Result<()>;

    fn fetch_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
    fn put_user_profile(&self, profile: &UserProfile) -> Result<()>;
}

/// Per-collection wrappers over the remote store.
///
/// Failure policy: every operation swallows the underlying error and returns
/// a sentinel — empty list, `None`, or `false` — so callers cannot tell
/// "not found" from "network failure" from "permission denied". The cause is
/// only visible in the warn-level log. This mirrors the contract the rest of
/// the system is written against; do not tighten it without changing callers.
pub struct CloudRepository {
    store: Box<dyn RemoteStore>,
}

impl CloudRepository {
    #[must_use]
    pub fn new(store: Box<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Records saved with an empty id get a fresh store-assigned id first
    /// (copy-on-write id assignment); the caller's record is not mutated.
    fn with_assigned_id(item: &FoodItem) -> FoodItem {
        if item.id.is_empty() {
            let mut assigned = item.clone();
            assigned.id = Uuid::new_v4().to_string();
            assigned
        } else {
            item.clone()
        }
    }

    // --- Food items ---

    #[must_use]
    pub fn get_food_items(&self, user_id: &str) -> Vec<FoodItem> {
        match self.store.fetch_food_items(user_id) {
            Ok(items) => items,
            Err(e) => {
                warn!("remote food item fetch failed: {e:#}");
                Vec::new()
            }
        }
    }

    #[must_use]
    pub fn get_food_item_by_id(&self, id: &str) -> Option<FoodItem> {
        match self.store.fetch_food_item(id) {
            Ok(item) => item,
            Err(e) => {
                warn!("remote food item fetch failed: {e:#}");
                None
            }
        }
    }

    #[must_use]
    pub fn get_favorite_food_items(&self, user_id: &str) -> Vec<FoodItem> {
        match self.store.fetch_favorite_food_items(user_id) {
            Ok(items) => items,
            Err(e) => {
                warn!("remote favorites fetch failed: {e:#}");
                Vec::new()
            }
        }
    }

    #[must_use]
    pub fn get_food_items_by_meal_type_and_date(
        &self,
        user_id: &str,
        meal_type: MealType,
        date: NaiveDate,
    ) -> Vec<FoodItem> {
        let (start, end) = day_bounds(date);
        match self.store.fetch_food_items_by_meal_type(
            user_id,
            meal_type,
            start.timestamp_millis(),
            end.timestamp_millis(),
        ) {
            Ok(items) => items,
            Err(e) => {
                warn!("remote meal query failed: {e:#}");
                Vec::new()
            }
        }
    }

    pub fn save_food_item(&self, item: &FoodItem) -> bool {
        let doc = Self::with_assigned_id(item);
        match self.store.put_food_item(&doc) {
            Ok(()) => true,
            Err(e) => {
                warn!("remote food item save failed: {e:#}");
                false
            }
        }
    }

    pub fn delete_food_item(&self, id: &str) -> bool {
        match self.store.remove_food_item(id) {
            Ok(()) => true,
            Err(e) => {
                warn!("remote food item delete failed: {e:#}");
                false
            }
        }
    }

    // --- Activity records ---

    #[must_use]
    pub fn get_activity_records(&self, user_id: &str) -> Vec<ActivityRecord> {
        match self.store.fetch_activity_records(user_id) {
            Ok(records) => records,
            Err(e) => {
                warn!("remote activity fetch failed: {e:#}");
                Vec::new()
            }
        }
    }

    pub fn save_activity_record(&self, record: &ActivityRecord) -> bool {
        let doc = if record.id.is_empty() {
            let mut assigned = record.clone();
            assigned.id = Uuid::new_v4().to_string();
            assigned
        } else {
            record.clone()
        };
        match self.store.put_activity_record(&doc) {
            Ok(()) => true,
            Err(e) => {
                warn!("remote activity save failed: {e:#}");
                false
            }
        }
    }

    pub fn delete_activity_record(&self, id: &str) -> bool {
        match self.store.remove_activity_record(id) {
            Ok(()) => true,
            Err(e) => {
                warn!("remote activity delete failed: {e:#}");
                false
            }
        }
    }

    // --- User goals ---

    #[must_use]
    pub fn get_user_goals(&self, user_id: &str) -> Option<UserGoals> {
        match self.store.fetch_user_goals(user_id) {
            Ok(goals) => goals,
            Err(e) => {
                warn!("remote goals fetch failed: {e:#}");
                None
            }
        }
    }

    pub fn save_user_goals(&self, goals: &UserGoals) -> bool {
        match self.store.put_user_goals(goals) {
            Ok(()) => true,
            Err(e) => {
                warn!("remote goals save failed: {e:#}");
                false
            }
        }
    }

    // --- User profiles ---

    #[must_use]
    pub fn get_user_profile(&self, user_id: &str) -> Option<UserProfile> {
        match self.store.fetch_user_profile(user_id) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("remote profile fetch failed: {e:#}");
                None
            }
        }
    }

    pub fn save_user_profile(&self, profile: &UserProfile) -> bool {
        match self.store.put_user_profile(profile) {
            Ok(()) => true,
            Err(e) => {
                warn!("remote profile save failed: {e:#}");
                false
            }
        }
    }
}
