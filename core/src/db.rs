use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::watch;

use crate::models::{
    ActivityLevel, ActivityRecord, ActivityType, FoodItem, Gender, MealType, UserGoals,
    UserProfile, WeightGoalType,
};

/// On-device cache for the four entity tables.
///
/// Enum columns hold variant name strings; timestamp columns hold epoch
/// milliseconds. All writes are last-write-wins REPLACEs keyed on the string
/// primary key, with no validation beyond rejecting empty keys.
pub struct Database {
    conn: Connection,
    data_version: watch::Sender<u64>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database {
            conn,
            data_version: watch::channel(0).0,
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn,
            data_version: watch::channel(0).0,
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS food_items (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    brand TEXT,
                    calories INTEGER NOT NULL,
                    protein REAL NOT NULL,
                    carbs REAL NOT NULL,
                    fat REAL NOT NULL,
                    serving_size REAL NOT NULL,
                    serving_unit TEXT NOT NULL DEFAULT 'g',
                    is_favorite INTEGER NOT NULL DEFAULT 0,
                    consumption_count INTEGER NOT NULL DEFAULT 0,
                    meal_type TEXT NOT NULL,
                    date INTEGER NOT NULL,
                    date_added INTEGER NOT NULL,
                    is_public INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS activity_records (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    activity_type TEXT NOT NULL,
                    duration_minutes INTEGER NOT NULL,
                    calories_burned INTEGER NOT NULL,
                    date INTEGER NOT NULL,
                    distance_km REAL,
                    steps INTEGER
                );

                CREATE TABLE IF NOT EXISTS user_goals (
                    user_id TEXT PRIMARY KEY,
                    daily_calorie_target INTEGER NOT NULL,
                    daily_steps_target INTEGER NOT NULL,
                    daily_water_target_ml INTEGER NOT NULL,
                    weekly_workout_target INTEGER NOT NULL,
                    protein_percentage INTEGER NOT NULL,
                    carbs_percentage INTEGER NOT NULL,
                    fat_percentage INTEGER NOT NULL,
                    current_weight_kg REAL,
                    target_weight_kg REAL,
                    weight_goal_type TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS user_profiles (
                    user_id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL,
                    age INTEGER,
                    gender TEXT,
                    height_cm REAL,
                    activity_level TEXT NOT NULL,
                    join_date INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_food_items_user_date ON food_items(user_id, date);
                CREATE INDEX IF NOT EXISTS idx_activity_records_user_date ON activity_records(user_id, date);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// Receiver for the store's data version, bumped after every mutation.
    /// A live read is a loop: await a version change, re-run the query.
    #[must_use]
    pub fn watch_changes(&self) -> watch::Receiver<u64> {
        self.data_version.subscribe()
    }

    fn bump(&self) {
        self.data_version.send_modify(|v| *v += 1);
    }

    // --- Row mapping helpers ---

    fn parse_enum<T>(idx: usize, value: &str) -> rusqlite::Result<T>
    where
        T: FromStr<Err = anyhow::Error>,
    {
        T::from_str(value).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
        })
    }

    fn ts_from_millis(idx: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
        Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Integer,
                format!("timestamp out of range: {millis}").into(),
            )
        })
    }

    fn food_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<FoodItem> {
        let meal_type: String = row.get(12)?;
        Ok(FoodItem {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            brand: row.get(3)?,
            calories: row.get(4)?,
            protein: row.get(5)?,
            carbs: row.get(6)?,
            fat: row.get(7)?,
            serving_size: row.get(8)?,
            serving_unit: row.get(9)?,
            is_favorite: row.get(10)?,
            consumption_count: row.get(11)?,
            meal_type: Self::parse_enum(12, &meal_type)?,
            date: Self::ts_from_millis(13, row.get(13)?)?,
            date_added: Self::ts_from_millis(14, row.get(14)?)?,
            is_public: row.get(15)?,
        })
    }

    fn activity_record_from_row(row: &rusqlite::Row) -> rusqlite::Result<ActivityRecord> {
        let activity_type: String = row.get(3)?;
        Ok(ActivityRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            activity_type: Self::parse_enum(3, &activity_type)?,
            duration_minutes: row.get(4)?,
            calories_burned: row.get(5)?,
            date: Self::ts_from_millis(6, row.get(6)?)?,
            distance_km: row.get(7)?,
            steps: row.get(8)?,
        })
    }

    fn user_goals_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserGoals> {
        let goal_type: String = row.get(10)?;
        Ok(UserGoals {
            user_id: row.get(0)?,
            daily_calorie_target: row.get(1)?,
            daily_steps_target: row.get(2)?,
            daily_water_target_ml: row.get(3)?,
            weekly_workout_target: row.get(4)?,
            protein_percentage: row.get(5)?,
            carbs_percentage: row.get(6)?,
            fat_percentage: row.get(7)?,
            current_weight_kg: row.get(8)?,
            target_weight_kg: row.get(9)?,
            weight_goal_type: Self::parse_enum::<WeightGoalType>(10, &goal_type)?,
        })
    }

    fn user_profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
        let gender: Option<String> = row.get(4)?;
        let activity_level: String = row.get(6)?;
        Ok(UserProfile {
            user_id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            age: row.get(3)?,
            gender: gender
                .map(|g| Self::parse_enum::<Gender>(4, &g))
                .transpose()?,
            height_cm: row.get(5)?,
            activity_level: Self::parse_enum::<ActivityLevel>(6, &activity_level)?,
            join_date: Self::ts_from_millis(7, row.get(7)?)?,
        })
    }

    // --- Food items ---

    pub fn upsert_food_item(&self, item: &FoodItem) -> Result<()> {
        if item.id.is_empty() {
            bail!("Food item id must not be empty");
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO food_items
             (id, user_id, name, brand, calories, protein, carbs, fat, serving_size,
              serving_unit, is_favorite, consumption_count, meal_type, date, date_added, is_public)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                item.id,
                item.user_id,
                item.name,
                item.brand,
                item.calories,
                item.protein,
                item.carbs,
                item.fat,
                item.serving_size,
                item.serving_unit,
                item.is_favorite,
                item.consumption_count,
                item.meal_type.as_str(),
                item.date.timestamp_millis(),
                item.date_added.timestamp_millis(),
                item.is_public,
            ],
        )?;
        self.bump();
        Ok(())
    }

    pub fn get_food_item(&self, id: &str) -> Result<Option<FoodItem>> {
        let item = self
            .conn
            .query_row(
                "SELECT * FROM food_items WHERE id = ?1",
                params![id],
                Self::food_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn delete_food_item(&self, id: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM food_items WHERE id = ?1", params![id])?;
        if n > 0 {
            self.bump();
        }
        Ok(n > 0)
    }

    pub fn food_items_for_user(&self, user_id: &str) -> Result<Vec<FoodItem>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM food_items WHERE user_id = ?1 ORDER BY date DESC")?;
        let items = stmt
            .query_map(params![user_id], Self::food_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn food_items_by_date_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FoodItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM food_items
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date DESC",
        )?;
        let items = stmt
            .query_map(
                params![user_id, start.timestamp_millis(), end.timestamp_millis()],
                Self::food_item_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn food_items_by_meal_type(
        &self,
        user_id: &str,
        meal_type: MealType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FoodItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM food_items
             WHERE user_id = ?1 AND meal_type = ?2 AND date BETWEEN ?3 AND ?4
             ORDER BY date DESC",
        )?;
        let items = stmt
            .query_map(
                params![
                    user_id,
                    meal_type.as_str(),
                    start.timestamp_millis(),
                    end.timestamp_millis()
                ],
                Self::food_item_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn favorite_food_items(&self, user_id: &str) -> Result<Vec<FoodItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM food_items WHERE user_id = ?1 AND is_favorite = 1 ORDER BY name ASC",
        )?;
        let items = stmt
            .query_map(params![user_id], Self::food_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn food_items_matching(&self, user_id: &str, query: &str) -> Result<Vec<FoodItem>> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let mut stmt = self.conn.prepare(
            "SELECT * FROM food_items
             WHERE user_id = ?1 AND (name LIKE ?2 ESCAPE '\\' OR brand LIKE ?2 ESCAPE '\\')
             ORDER BY name LIMIT 50",
        )?;
        let items = stmt
            .query_map(params![user_id, pattern], Self::food_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Sum of calories over an inclusive date range; `None` when no rows.
    pub fn total_calories(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let sum = self.conn.query_row(
            "SELECT SUM(calories) FROM food_items WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3",
            params![user_id, start.timestamp_millis(), end.timestamp_millis()],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    /// Flip a food item's favorite flag, returning the new state.
    pub fn toggle_favorite(&self, id: &str) -> Result<bool> {
        let item = self
            .get_food_item(id)?
            .with_context(|| format!("No food item with id '{id}'"))?;
        let new_state = !item.is_favorite;
        self.conn.execute(
            "UPDATE food_items SET is_favorite = ?1 WHERE id = ?2",
            params![new_state, id],
        )?;
        self.bump();
        Ok(new_state)
    }

    /// Increment a food item's consumption counter. Not atomic with respect
    /// to other writers of the same row.
    pub fn bump_consumption(&self, id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE food_items SET consumption_count = consumption_count + 1 WHERE id = ?1",
            params![id],
        )?;
        self.bump();
        Ok(())
    }

    // --- Activity records ---

    pub fn upsert_activity_record(&self, record: &ActivityRecord) -> Result<()> {
        if record.id.is_empty() {
            bail!("Activity record id must not be empty");
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO activity_records
             (id, user_id, name, activity_type, duration_minutes, calories_burned, date, distance_km, steps)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.user_id,
                record.name,
                record.activity_type.as_str(),
                record.duration_minutes,
                record.calories_burned,
                record.date.timestamp_millis(),
                record.distance_km,
                record.steps,
            ],
        )?;
        self.bump();
        Ok(())
    }

    pub fn get_activity_record(&self, id: &str) -> Result<Option<ActivityRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT * FROM activity_records WHERE id = ?1",
                params![id],
                Self::activity_record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn delete_activity_record(&self, id: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM activity_records WHERE id = ?1", params![id])?;
        if n > 0 {
            self.bump();
        }
        Ok(n > 0)
    }

    pub fn activity_records_for_user(&self, user_id: &str) -> Result<Vec<ActivityRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM activity_records WHERE user_id = ?1 ORDER BY date DESC")?;
        let records = stmt
            .query_map(params![user_id], Self::activity_record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn activity_records_by_date_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM activity_records
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date DESC",
        )?;
        let records = stmt
            .query_map(
                params![user_id, start.timestamp_millis(), end.timestamp_millis()],
                Self::activity_record_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn activity_records_by_type(
        &self,
        user_id: &str,
        activity_type: ActivityType,
    ) -> Result<Vec<ActivityRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM activity_records
             WHERE user_id = ?1 AND activity_type = ?2
             ORDER BY date DESC",
        )?;
        let records = stmt
            .query_map(
                params![user_id, activity_type.as_str()],
                Self::activity_record_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Sum of calories burned over an inclusive date range; `None` when no rows.
    pub fn total_calories_burned(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let sum = self.conn.query_row(
            "SELECT SUM(calories_burned) FROM activity_records
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3",
            params![user_id, start.timestamp_millis(), end.timestamp_millis()],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    /// Sum of steps over an inclusive date range; `None` when no rows carry steps.
    pub fn total_steps(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let sum = self.conn.query_row(
            "SELECT SUM(steps) FROM activity_records
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3",
            params![user_id, start.timestamp_millis(), end.timestamp_millis()],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    // --- User goals ---

    pub fn upsert_user_goals(&self, goals: &UserGoals) -> Result<()> {
        if goals.user_id.is_empty() {
            bail!("User goals user_id must not be empty");
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO user_goals
             (user_id, daily_calorie_target, daily_steps_target, daily_water_target_ml,
              weekly_workout_target, protein_percentage, carbs_percentage, fat_percentage,
              current_weight_kg, target_weight_kg, weight_goal_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                goals.user_id,
                goals.daily_calorie_target,
                goals.daily_steps_target,
                goals.daily_water_target_ml,
                goals.weekly_workout_target,
                goals.protein_percentage,
                goals.carbs_percentage,
                goals.fat_percentage,
                goals.current_weight_kg,
                goals.target_weight_kg,
                goals.weight_goal_type.as_str(),
            ],
        )?;
        self.bump();
        Ok(())
    }

    pub fn get_user_goals(&self, user_id: &str) -> Result<Option<UserGoals>> {
        let goals = self
            .conn
            .query_row(
                "SELECT * FROM user_goals WHERE user_id = ?1",
                params![user_id],
                Self::user_goals_from_row,
            )
            .optional()?;
        Ok(goals)
    }

    // --- User profiles ---

    pub fn upsert_user_profile(&self, profile: &UserProfile) -> Result<()> {
        if profile.user_id.is_empty() {
            bail!("User profile user_id must not be empty");
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO user_profiles
             (user_id, name, email, age, gender, height_cm, activity_level, join_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                profile.user_id,
                profile.name,
                profile.email,
                profile.age,
                profile.gender.map(Gender::as_str),
                profile.height_cm,
                profile.activity_level.as_str(),
                profile.join_date.timestamp_millis(),
            ],
        )?;
        self.bump();
        Ok(())
    }

    pub fn get_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT * FROM user_profiles WHERE user_id = ?1",
                params![user_id],
                Self::user_profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::day_bounds;
    use chrono::NaiveDate;

    fn ts(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn sample_food(id: &str, user: &str, date_millis: i64) -> FoodItem {
        FoodItem {
            id: id.to_string(),
            user_id: user.to_string(),
            name: format!("Food {id}"),
            brand: Some("Acme".to_string()),
            calories: 250,
            protein: 10.0,
            carbs: 30.0,
            fat: 8.0,
            serving_size: 100.0,
            serving_unit: "g".to_string(),
            is_favorite: false,
            consumption_count: 0,
            meal_type: MealType::Lunch,
            date: ts(date_millis),
            date_added: ts(date_millis),
            is_public: false,
        }
    }

    fn sample_activity(id: &str, user: &str, date_millis: i64) -> ActivityRecord {
        ActivityRecord {
            id: id.to_string(),
            user_id: user.to_string(),
            name: "Morning run".to_string(),
            activity_type: ActivityType::Running,
            duration_minutes: 30,
            calories_burned: 300,
            date: ts(date_millis),
            distance_km: Some(5.2),
            steps: Some(6200),
        }
    }

    #[test]
    fn test_food_item_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let item = sample_food("f1", "u1", 1_700_000_000_000);
        db.upsert_food_item(&item).unwrap();
        assert_eq!(db.get_food_item("f1").unwrap().unwrap(), item);
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let db = Database::open_in_memory().unwrap();
        let mut item = sample_food("f1", "u1", 1_700_000_000_000);
        db.upsert_food_item(&item).unwrap();

        item.calories = 999;
        item.is_favorite = true;
        db.upsert_food_item(&item).unwrap();

        let stored = db.get_food_item("f1").unwrap().unwrap();
        assert_eq!(stored.calories, 999);
        assert!(stored.is_favorite);
        assert_eq!(db.food_items_for_user("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_empty_id_rejected() {
        let db = Database::open_in_memory().unwrap();
        let item = sample_food("", "u1", 0);
        assert!(db.upsert_food_item(&item).is_err());
        let record = ActivityRecord {
            id: String::new(),
            ..sample_activity("a1", "u1", 0)
        };
        assert!(db.upsert_activity_record(&record).is_err());
    }

    #[test]
    fn test_delete_food_item() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_food_item(&sample_food("f1", "u1", 0)).unwrap();
        assert!(db.delete_food_item("f1").unwrap());
        assert!(db.get_food_item("f1").unwrap().is_none());
        // Absent key deletes report false.
        assert!(!db.delete_food_item("f1").unwrap());
    }

    #[test]
    fn test_food_items_for_user_ordered_date_desc() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_food_item(&sample_food("old", "u1", 1_000)).unwrap();
        db.upsert_food_item(&sample_food("new", "u1", 3_000)).unwrap();
        db.upsert_food_item(&sample_food("mid", "u1", 2_000)).unwrap();
        db.upsert_food_item(&sample_food("other", "u2", 9_000)).unwrap();

        let items = db.food_items_for_user("u1").unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_date_range_bounds_inclusive() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_food_item(&sample_food("lo", "u1", 1_000)).unwrap();
        db.upsert_food_item(&sample_food("hi", "u1", 2_000)).unwrap();
        db.upsert_food_item(&sample_food("out", "u1", 2_001)).unwrap();

        let items = db
            .food_items_by_date_range("u1", ts(1_000), ts(2_000))
            .unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["hi", "lo"]);
    }

    #[test]
    fn test_food_items_by_meal_type() {
        let db = Database::open_in_memory().unwrap();
        let mut breakfast = sample_food("b1", "u1", 1_000);
        breakfast.meal_type = MealType::Breakfast;
        db.upsert_food_item(&breakfast).unwrap();
        db.upsert_food_item(&sample_food("l1", "u1", 1_500)).unwrap();

        let items = db
            .food_items_by_meal_type("u1", MealType::Breakfast, ts(0), ts(10_000))
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "b1");
    }

    #[test]
    fn test_favorites_ordered_by_name() {
        let db = Database::open_in_memory().unwrap();
        for (id, name) in [("f1", "Yogurt"), ("f2", "Apple"), ("f3", "Muesli")] {
            let mut item = sample_food(id, "u1", 0);
            item.name = name.to_string();
            item.is_favorite = true;
            db.upsert_food_item(&item).unwrap();
        }
        let mut plain = sample_food("f4", "u1", 0);
        plain.name = "Bread".to_string();
        db.upsert_food_item(&plain).unwrap();

        let favorites = db.favorite_food_items("u1").unwrap();
        let names: Vec<&str> = favorites.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Muesli", "Yogurt"]);
    }

    #[test]
    fn test_food_items_matching_escapes_like() {
        let db = Database::open_in_memory().unwrap();
        let mut item = sample_food("f1", "u1", 0);
        item.name = "100% Oats".to_string();
        db.upsert_food_item(&item).unwrap();
        db.upsert_food_item(&sample_food("f2", "u1", 0)).unwrap();

        let matches = db.food_items_matching("u1", "100%").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "f1");
    }

    #[test]
    fn test_total_calories_none_when_empty() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.total_calories("u1", ts(0), ts(10_000)).unwrap().is_none());

        db.upsert_food_item(&sample_food("f1", "u1", 1_000)).unwrap();
        db.upsert_food_item(&sample_food("f2", "u1", 2_000)).unwrap();
        assert_eq!(db.total_calories("u1", ts(0), ts(10_000)).unwrap(), Some(500));
    }

    #[test]
    fn test_toggle_favorite() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_food_item(&sample_food("f1", "u1", 0)).unwrap();
        assert!(db.toggle_favorite("f1").unwrap());
        assert!(!db.toggle_favorite("f1").unwrap());
        assert!(db.toggle_favorite("missing").is_err());
    }

    #[test]
    fn test_bump_consumption() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_food_item(&sample_food("f1", "u1", 0)).unwrap();
        db.bump_consumption("f1").unwrap();
        db.bump_consumption("f1").unwrap();
        assert_eq!(db.get_food_item("f1").unwrap().unwrap().consumption_count, 2);
    }

    #[test]
    fn test_activity_record_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let record = sample_activity("a1", "u1", 1_700_000_000_000);
        db.upsert_activity_record(&record).unwrap();
        assert_eq!(db.get_activity_record("a1").unwrap().unwrap(), record);
    }

    #[test]
    fn test_activity_records_by_type() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_activity_record(&sample_activity("a1", "u1", 1_000))
            .unwrap();
        let mut yoga = sample_activity("a2", "u1", 2_000);
        yoga.activity_type = ActivityType::Yoga;
        yoga.distance_km = None;
        yoga.steps = None;
        db.upsert_activity_record(&yoga).unwrap();

        let runs = db
            .activity_records_by_type("u1", ActivityType::Running)
            .unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, "a1");
    }

    #[test]
    fn test_activity_sums() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.total_steps("u1", ts(0), ts(10_000)).unwrap().is_none());

        db.upsert_activity_record(&sample_activity("a1", "u1", 1_000))
            .unwrap();
        let mut second = sample_activity("a2", "u1", 2_000);
        second.calories_burned = 150;
        second.steps = None;
        db.upsert_activity_record(&second).unwrap();

        assert_eq!(
            db.total_calories_burned("u1", ts(0), ts(10_000)).unwrap(),
            Some(450)
        );
        // SUM ignores NULL steps rows.
        assert_eq!(db.total_steps("u1", ts(0), ts(10_000)).unwrap(), Some(6200));
    }

    #[test]
    fn test_user_goals_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_user_goals("u1").unwrap().is_none());

        let mut goals = UserGoals::defaults_for("u1");
        goals.current_weight_kg = Some(80.5);
        goals.weight_goal_type = WeightGoalType::Lose;
        db.upsert_user_goals(&goals).unwrap();
        assert_eq!(db.get_user_goals("u1").unwrap().unwrap(), goals);

        // Macro splits that don't sum to 100 persist untouched.
        goals.protein_percentage = 90;
        db.upsert_user_goals(&goals).unwrap();
        assert_eq!(
            db.get_user_goals("u1").unwrap().unwrap().protein_percentage,
            90
        );
    }

    #[test]
    fn test_user_profile_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let profile = UserProfile {
            user_id: "u1".to_string(),
            name: "Jo".to_string(),
            email: "jo@example.com".to_string(),
            age: Some(34),
            gender: Some(Gender::Other),
            height_cm: Some(175.0),
            activity_level: ActivityLevel::VeryActive,
            join_date: ts(1_700_000_000_000),
        };
        db.upsert_user_profile(&profile).unwrap();
        assert_eq!(db.get_user_profile("u1").unwrap().unwrap(), profile);

        let minimal = UserProfile {
            age: None,
            gender: None,
            height_cm: None,
            ..profile
        };
        db.upsert_user_profile(&minimal).unwrap();
        assert_eq!(db.get_user_profile("u1").unwrap().unwrap(), minimal);
    }

    #[test]
    fn test_watch_changes_bumps_on_write() {
        let db = Database::open_in_memory().unwrap();
        let rx = db.watch_changes();
        let before = *rx.borrow();
        db.upsert_food_item(&sample_food("f1", "u1", 0)).unwrap();
        assert_eq!(*rx.borrow(), before + 1);
        db.delete_food_item("f1").unwrap();
        assert_eq!(*rx.borrow(), before + 2);
    }

    #[test]
    fn test_day_bounds_query() {
        let db = Database::open_in_memory().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let (start, end) = day_bounds(day);

        let mut inside = sample_food("in", "u1", 0);
        inside.date = start;
        db.upsert_food_item(&inside).unwrap();
        let mut outside = sample_food("out", "u1", 0);
        outside.date = end + chrono::Duration::milliseconds(1);
        db.upsert_food_item(&outside).unwrap();

        let items = db.food_items_by_date_range("u1", start, end).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "in");
    }
}
