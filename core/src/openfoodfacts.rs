use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{FoodItem, MealType, extract_serving_grams};

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub products: Vec<ProductData>,
}

#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    pub status: i32,
    pub product: Option<ProductData>,
}

#[derive(Debug, Deserialize)]
pub struct ProductData {
    pub product_name: Option<String>,
    pub brands: Option<String>,
    pub code: Option<String>,
    pub serving_size: Option<String>,
    pub nutriments: Option<Nutriments>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct Nutriments {
    #[serde(rename = "energy-kcal_100g")]
    pub energy_kcal_100g: Option<f64>,
    pub proteins_100g: Option<f64>,
    pub carbohydrates_100g: Option<f64>,
    pub fat_100g: Option<f64>,
}

/// Map an OpenFoodFacts product into a loggable catalog entry.
///
/// Missing nutrient fields default to zero and a missing or unparseable
/// serving size defaults to 100 g — lookup results must always be loggable,
/// however sparse the product data. Only a missing name drops the product.
/// The entry carries a fresh id and no user; callers fill in user, meal,
/// and date when the item is actually logged.
#[must_use]
pub fn product_to_food_item(p: ProductData) -> Option<FoodItem> {
    let name = p.product_name.filter(|n| !n.is_empty())?;
    let nutriments = p.nutriments;
    let now = Utc::now();

    Some(FoodItem {
        id: Uuid::new_v4().to_string(),
        user_id: String::new(),
        name,
        brand: p.brands.filter(|b| !b.is_empty()),
        calories: nutriments
            .as_ref()
            .and_then(|n| n.energy_kcal_100g)
            .unwrap_or(0.0) as i64,
        protein: nutriments
            .as_ref()
            .and_then(|n| n.proteins_100g)
            .unwrap_or(0.0),
        carbs: nutriments
            .as_ref()
            .and_then(|n| n.carbohydrates_100g)
            .unwrap_or(0.0),
        fat: nutriments.as_ref().and_then(|n| n.fat_100g).unwrap_or(0.0),
        serving_size: p.serving_size.as_deref().map_or(100.0, extract_serving_grams),
        serving_unit: "g".to_string(),
        is_favorite: false,
        consumption_count: 0,
        meal_type: MealType::Breakfast,
        date: now,
        date_added: now,
        is_public: false,
    })
}
