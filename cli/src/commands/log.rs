use anyhow::{Result, bail};
use chrono::Utc;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::Config;
use crate::openfoodfacts::OpenFoodFactsClient;
use stride_core::db::Database;
use stride_core::models::{FoodItem, MealType};
use stride_core::sync::Synchronizer;

use super::helpers::{
    cloud_repository, current_user_id, date_timestamp, json_error, parse_date, print_food_table,
    prompt_choice,
};

/// Turn a catalog entry (local history or OpenFoodFacts result) into a fresh
/// log entry for this user, meal, and day.
fn entry_from(
    source: &FoodItem,
    user_id: String,
    meal_type: MealType,
    date: chrono::NaiveDate,
    serving: Option<f64>,
) -> FoodItem {
    let mut entry = source.clone();
    entry.id = Uuid::new_v4().to_string();
    entry.user_id = user_id;
    entry.meal_type = meal_type;
    entry.date = date_timestamp(date);
    entry.date_added = Utc::now();
    entry.consumption_count = 1;
    entry.is_favorite = false;
    if let Some(serving) = serving {
        entry.serving_size = serving;
    }
    entry
}

/// Search the local history first, then OpenFoodFacts, and log the pick.
#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_log(
    config: &Config,
    db: &Database,
    off: &OpenFoodFactsClient,
    rt: &tokio::runtime::Handle,
    query: &str,
    meal: &str,
    date: Option<String>,
    serving: Option<f64>,
    json: bool,
) -> Result<()> {
    let user_id = current_user_id(config)?;
    let meal_type = MealType::from_str(meal)?;
    let date = parse_date(date)?;

    let local = db.food_items_matching(&user_id, query)?;
    let remote = off.search(query);

    let mut candidates = local;
    let local_count = candidates.len();
    candidates.extend(remote);

    if candidates.is_empty() {
        if json {
            println!("{}", json_error(&format!("No food found for '{query}'")));
            std::process::exit(2);
        }
        bail!("No food found for '{query}'");
    }

    let choice = if candidates.len() == 1 {
        0
    } else {
        let refs: Vec<&FoodItem> = candidates.iter().collect();
        print_food_table(&refs, true);
        prompt_choice(candidates.len())?
    };

    let source = &candidates[choice];
    // Re-logging an item from local history bumps its consumption counter.
    if choice < local_count {
        db.bump_consumption(&source.id)?;
    }

    let entry = entry_from(source, user_id, meal_type, date, serving);
    db.upsert_food_item(&entry)?;

    if let Some(repo) = cloud_repository(config, rt) {
        Synchronizer::new(db, &repo).push_food_item(&entry);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let name = &entry.name;
        let cal = entry.calories;
        let meal = entry.meal_type.label();
        println!("Logged {name} ({cal} kcal, {meal}) for {date}");
    }
    Ok(())
}

/// Look up a product by barcode; with `--log` the result is logged too.
#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_barcode(
    config: &Config,
    db: &Database,
    off: &OpenFoodFactsClient,
    rt: &tokio::runtime::Handle,
    code: &str,
    meal: &str,
    date: Option<String>,
    serving: Option<f64>,
    log: bool,
    json: bool,
) -> Result<()> {
    // A network failure looks exactly like an unknown barcode here.
    let Some(found) = off.lookup_barcode(code) else {
        if json {
            println!("{}", json_error(&format!("No product found for barcode '{code}'")));
            std::process::exit(2);
        }
        bail!("No product found for barcode '{code}'");
    };

    if !log {
        if json {
            println!("{}", serde_json::to_string_pretty(&found)?);
        } else {
            print_food_table(&[&found], false);
        }
        return Ok(());
    }

    let user_id = current_user_id(config)?;
    let meal_type = MealType::from_str(meal)?;
    let date = parse_date(date)?;

    let entry = entry_from(&found, user_id, meal_type, date, serving);
    db.upsert_food_item(&entry)?;

    if let Some(repo) = cloud_repository(config, rt) {
        Synchronizer::new(db, &repo).push_food_item(&entry);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let name = &entry.name;
        let cal = entry.calories;
        println!("Logged {name} ({cal} kcal) for {date}");
    }
    Ok(())
}
