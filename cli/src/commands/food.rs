use anyhow::Result;
use chrono::Utc;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::Config;
use stride_core::db::Database;
use stride_core::models::{FoodItem, MealType, day_bounds};
use stride_core::sync::Synchronizer;

use super::helpers::{
    cloud_repository, current_user_id, date_timestamp, find_by_id_prefix, parse_date,
    print_food_table, require_cloud_repository,
};

/// Push one record to the cloud when a signed-in session and a remote are
/// available; failures stay invisible here, as everywhere in the sync path.
fn push_food_best_effort(
    config: &Config,
    db: &Database,
    rt: &tokio::runtime::Handle,
    item: &FoodItem,
) {
    if let Some(repo) = cloud_repository(config, rt) {
        Synchronizer::new(db, &repo).push_food_item(item);
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_food_add(
    config: &Config,
    db: &Database,
    rt: &tokio::runtime::Handle,
    name: &str,
    calories: i64,
    protein: Option<f64>,
    carbs: Option<f64>,
    fat: Option<f64>,
    serving: Option<f64>,
    brand: Option<String>,
    meal: &str,
    date: Option<String>,
    favorite: bool,
    json: bool,
) -> Result<()> {
    let user_id = current_user_id(config)?;
    let meal_type = MealType::from_str(meal)?;
    let date = parse_date(date)?;

    let item = FoodItem {
        id: Uuid::new_v4().to_string(),
        user_id,
        name: name.to_string(),
        brand,
        calories,
        protein: protein.unwrap_or(0.0),
        carbs: carbs.unwrap_or(0.0),
        fat: fat.unwrap_or(0.0),
        serving_size: serving.unwrap_or(100.0),
        serving_unit: "g".to_string(),
        is_favorite: favorite,
        consumption_count: 1,
        meal_type,
        date: date_timestamp(date),
        date_added: Utc::now(),
        is_public: false,
    };
    db.upsert_food_item(&item)?;
    push_food_best_effort(config, db, rt, &item);

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        let name = &item.name;
        let cal = item.calories;
        let meal = item.meal_type.label();
        println!("Logged {name} ({cal} kcal, {meal}) for {date}");
    }
    Ok(())
}

#[allow(clippy::fn_params_excessive_bools, clippy::too_many_arguments)]
pub(crate) fn cmd_food_list(
    config: &Config,
    db: &Database,
    rt: &tokio::runtime::Handle,
    search: Option<&str>,
    favorites: bool,
    meal: Option<&str>,
    date: Option<String>,
    cloud: bool,
    json: bool,
) -> Result<()> {
    let user_id = current_user_id(config)?;

    if cloud {
        return list_cloud_food_items(config, rt, &user_id, favorites, meal, date, json);
    }

    let items = if favorites {
        db.favorite_food_items(&user_id)?
    } else if let Some(meal) = meal {
        let meal_type = MealType::from_str(meal)?;
        let (start, end) = day_bounds(parse_date(date)?);
        db.food_items_by_meal_type(&user_id, meal_type, start, end)?
    } else if let Some(query) = search {
        db.food_items_matching(&user_id, query)?
    } else if let Some(date) = date {
        let (start, end) = day_bounds(parse_date(Some(date))?);
        db.food_items_by_date_range(&user_id, start, end)?
    } else {
        db.food_items_for_user(&user_id)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        eprintln!("No food entries found");
        return Ok(());
    }
    let refs: Vec<&FoodItem> = items.iter().collect();
    print_food_table(&refs, false);
    Ok(())
}

/// Cloud reads go through the sentinel layer: a failure shows up as an
/// empty listing, same as having no data.
fn list_cloud_food_items(
    config: &Config,
    rt: &tokio::runtime::Handle,
    user_id: &str,
    favorites: bool,
    meal: Option<&str>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let repo = require_cloud_repository(config, rt)?;

    let items = if favorites {
        repo.get_favorite_food_items(user_id)
    } else if let Some(meal) = meal {
        let meal_type = MealType::from_str(meal)?;
        repo.get_food_items_by_meal_type_and_date(user_id, meal_type, parse_date(date)?)
    } else {
        repo.get_food_items(user_id)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        eprintln!("No cloud entries found (or the remote store was unreachable)");
        return Ok(());
    }
    let refs: Vec<&FoodItem> = items.iter().collect();
    print_food_table(&refs, false);
    Ok(())
}

pub(crate) fn cmd_food_today(config: &Config, db: &Database, json: bool) -> Result<()> {
    let user_id = current_user_id(config)?;
    let (start, end) = day_bounds(chrono::Local::now().date_naive());
    let items = db.food_items_by_date_range(&user_id, start, end)?;
    let total = db.total_calories(&user_id, start, end)?.unwrap_or(0);

    if json {
        let out = serde_json::json!({ "items": items, "total_calories": total });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if items.is_empty() {
        eprintln!("Nothing logged today");
        return Ok(());
    }
    let refs: Vec<&FoodItem> = items.iter().collect();
    print_food_table(&refs, false);
    println!("Total: {total} kcal");
    Ok(())
}

pub(crate) fn cmd_food_favorite(
    config: &Config,
    db: &Database,
    rt: &tokio::runtime::Handle,
    id_prefix: &str,
    json: bool,
) -> Result<()> {
    let user_id = current_user_id(config)?;
    let items = db.food_items_for_user(&user_id)?;
    let id = find_by_id_prefix(&items, |i| i.id.as_str(), id_prefix)?
        .id
        .clone();

    let is_favorite = db.toggle_favorite(&id)?;
    if let Some(item) = db.get_food_item(&id)? {
        push_food_best_effort(config, db, rt, &item);
    }

    if json {
        let out = serde_json::json!({ "id": id, "is_favorite": is_favorite });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if is_favorite {
        println!("Marked {id} as favorite");
    } else {
        println!("Removed favorite from {id}");
    }
    Ok(())
}

/// Delete from exactly one store: the local cache by default, the cloud
/// with `--cloud`. Nothing mirrors the delete to the other side; the next
/// sync pass restores the record from the surviving copy.
pub(crate) fn cmd_food_delete(
    config: &Config,
    db: &Database,
    rt: &tokio::runtime::Handle,
    id_prefix: &str,
    cloud: bool,
    json: bool,
) -> Result<()> {
    let user_id = current_user_id(config)?;

    if cloud {
        let repo = require_cloud_repository(config, rt)?;
        let items = repo.get_food_items(&user_id);
        let id = find_by_id_prefix(&items, |i| i.id.as_str(), id_prefix)?
            .id
            .clone();
        let ok = repo.delete_food_item(&id);
        if json {
            let out = serde_json::json!({ "deleted": id, "ok": ok });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else if ok {
            println!("Deleted {id} from the cloud store");
            eprintln!("Note: the local copy is kept and may be pushed back by a sync.");
        } else {
            println!("Cloud delete failed for {id}");
        }
        return Ok(());
    }

    let items = db.food_items_for_user(&user_id)?;
    let id = find_by_id_prefix(&items, |i| i.id.as_str(), id_prefix)?
        .id
        .clone();

    db.delete_food_item(&id)?;

    if json {
        let out = serde_json::json!({ "deleted": id });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Deleted {id} from the local store");
        eprintln!("Note: any cloud copy is kept and may reappear after a sync.");
    }
    Ok(())
}
