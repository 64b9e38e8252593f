use anyhow::{Result, bail};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Meal slot a food entry is logged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: &[Self] = &[Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snack];

    /// Name string as stored in enum columns and documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "BREAKFAST",
            Self::Lunch => "LUNCH",
            Self::Dinner => "DINNER",
            Self::Snack => "SNACK",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::Snack => "Snack",
        }
    }
}

impl std::str::FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "BREAKFAST" => Ok(Self::Breakfast),
            "LUNCH" => Ok(Self::Lunch),
            "DINNER" => Ok(Self::Dinner),
            "SNACK" => Ok(Self::Snack),
            _ => bail!("Invalid meal type '{s}'. Must be one of: breakfast, lunch, dinner, snack"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Walking,
    Running,
    Cycling,
    Swimming,
    WeightTraining,
    Yoga,
    Other,
}

impl ActivityType {
    pub const ALL: &[Self] = &[
        Self::Walking,
        Self::Running,
        Self::Cycling,
        Self::Swimming,
        Self::WeightTraining,
        Self::Yoga,
        Self::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Walking => "WALKING",
            Self::Running => "RUNNING",
            Self::Cycling => "CYCLING",
            Self::Swimming => "SWIMMING",
            Self::WeightTraining => "WEIGHT_TRAINING",
            Self::Yoga => "YOGA",
            Self::Other => "OTHER",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Walking => "Walking",
            Self::Running => "Running",
            Self::Cycling => "Cycling",
            Self::Swimming => "Swimming",
            Self::WeightTraining => "Weight training",
            Self::Yoga => "Yoga",
            Self::Other => "Other",
        }
    }
}

impl std::str::FromStr for ActivityType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "WALKING" => Ok(Self::Walking),
            "RUNNING" => Ok(Self::Running),
            "CYCLING" => Ok(Self::Cycling),
            "SWIMMING" => Ok(Self::Swimming),
            "WEIGHT_TRAINING" => Ok(Self::WeightTraining),
            "YOGA" => Ok(Self::Yoga),
            "OTHER" => Ok(Self::Other),
            _ => bail!(
                "Invalid activity type '{s}'. Must be one of: walking, running, cycling, swimming, weight_training, yoga, other"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeightGoalType {
    Lose,
    Maintain,
    Gain,
}

impl WeightGoalType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lose => "LOSE",
            Self::Maintain => "MAINTAIN",
            Self::Gain => "GAIN",
        }
    }
}

impl std::str::FromStr for WeightGoalType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "LOSE" => Ok(Self::Lose),
            "MAINTAIN" => Ok(Self::Maintain),
            "GAIN" => Ok(Self::Gain),
            _ => bail!("Invalid weight goal '{s}'. Must be one of: lose, maintain, gain"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
            Self::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "MALE" => Ok(Self::Male),
            "FEMALE" => Ok(Self::Female),
            "OTHER" => Ok(Self::Other),
            _ => bail!("Invalid gender '{s}'. Must be one of: male, female, other"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    VeryActive,
    ExtremelyActive,
}

impl ActivityLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sedentary => "SEDENTARY",
            Self::Light => "LIGHT",
            Self::Moderate => "MODERATE",
            Self::VeryActive => "VERY_ACTIVE",
            Self::ExtremelyActive => "EXTREMELY_ACTIVE",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Sedentary => "Sedentary",
            Self::Light => "Lightly active",
            Self::Moderate => "Moderately active",
            Self::VeryActive => "Very active",
            Self::ExtremelyActive => "Extremely active",
        }
    }
}

impl std::str::FromStr for ActivityLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "SEDENTARY" => Ok(Self::Sedentary),
            "LIGHT" => Ok(Self::Light),
            "MODERATE" => Ok(Self::Moderate),
            "VERY_ACTIVE" => Ok(Self::VeryActive),
            "EXTREMELY_ACTIVE" => Ok(Self::ExtremelyActive),
            _ => bail!(
                "Invalid activity level '{s}'. Must be one of: sedentary, light, moderate, very_active, extremely_active"
            ),
        }
    }
}

// --- Entities ---

/// One logged (or catalog) food entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub brand: Option<String>,
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub serving_size: f64,
    pub serving_unit: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub consumption_count: i64,
    pub meal_type: MealType,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub is_public: bool,
}

/// One exercise session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub activity_type: ActivityType,
    pub duration_minutes: i64,
    pub calories_burned: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub steps: Option<i64>,
}

/// Per-user targets. One record per user, keyed by `user_id`.
///
/// The macro percentages are expected to sum to 100 but this is not enforced
/// anywhere in the storage or sync path; arbitrary splits persist and sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGoals {
    pub user_id: String,
    pub daily_calorie_target: i64,
    pub daily_steps_target: i64,
    pub daily_water_target_ml: i64,
    pub weekly_workout_target: i64,
    pub protein_percentage: i64,
    pub carbs_percentage: i64,
    pub fat_percentage: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_weight_kg: Option<f64>,
    pub weight_goal_type: WeightGoalType,
}

impl UserGoals {
    /// Stock goals for a user that has never set any.
    #[must_use]
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            daily_calorie_target: 2000,
            daily_steps_target: 10_000,
            daily_water_target_ml: 2000,
            weekly_workout_target: 3,
            protein_percentage: 30,
            carbs_percentage: 40,
            fat_percentage: 30,
            current_weight_kg: None,
            target_weight_kg: None,
            weight_goal_type: WeightGoalType::Maintain,
        }
    }
}

/// One record per user, keyed by `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub height_cm: Option<f64>,
    pub activity_level: ActivityLevel,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub join_date: DateTime<Utc>,
}

// --- Helpers ---

fn local_to_utc(naive: chrono::NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| Utc.from_utc_datetime(&naive), |dt| dt.with_timezone(&Utc))
}

/// Inclusive timestamp bounds for a calendar day in the local timezone:
/// 00:00:00.000 through 23:59:59.999.
#[must_use]
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN);
    let end =
        date.and_time(NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN));
    (local_to_utc(start), local_to_utc(end))
}

/// Whether a protein/carbs/fat percentage split adds up to a whole.
/// Splits that don't still persist and sync; callers may warn, never reject.
#[must_use]
pub fn macro_split_is_complete(protein: i64, carbs: i64, fat: i64) -> bool {
    protein >= 0 && carbs >= 0 && fat >= 0 && protein + carbs + fat == 100
}

/// Best-effort extraction of a gram amount from a free-form serving string
/// like `"30 g"`, `"2 biscuits (45g)"`, or `"250ml"`. Prefers the first
/// number immediately followed by a `g` unit; falls back to the first number;
/// defaults to 100 when nothing parses.
#[must_use]
pub fn extract_serving_grams(serving: &str) -> f64 {
    let mut first_number: Option<f64> = None;
    let bytes = serving.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if let Ok(value) = serving[start..i].parse::<f64>() {
                if first_number.is_none() {
                    first_number = Some(value);
                }
                let mut j = i;
                while j < bytes.len() && bytes[j] == b' ' {
                    j += 1;
                }
                let followed_by_g = serving[j..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.eq_ignore_ascii_case(&'g'));
                if followed_by_g {
                    return value;
                }
            }
        } else {
            i += 1;
        }
    }
    first_number.unwrap_or(100.0)
}
