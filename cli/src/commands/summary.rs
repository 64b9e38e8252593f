use anyhow::Result;
use serde::Serialize;
use std::process;

use crate::config::Config;
use stride_core::db::Database;
use stride_core::models::{FoodItem, MealType, UserGoals, day_bounds};

use super::helpers::{current_user_id, parse_date, short_id};

#[derive(Serialize)]
struct MealGroup {
    meal_type: String,
    calories: i64,
    entries: Vec<FoodItem>,
}

#[derive(Serialize)]
struct DailySummary {
    date: String,
    calories_consumed: i64,
    calories_burned: i64,
    net_calories: i64,
    calorie_target: i64,
    calories_remaining: i64,
    steps: i64,
    steps_target: i64,
    workouts_this_week: i64,
    weekly_workout_target: i64,
    meals: Vec<MealGroup>,
}

pub(crate) fn cmd_summary(
    config: &Config,
    db: &Database,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let user_id = current_user_id(config)?;
    let date = parse_date(date)?;
    let (start, end) = day_bounds(date);

    let goals = db
        .get_user_goals(&user_id)?
        .unwrap_or_else(|| UserGoals::defaults_for(&user_id));

    let consumed = db.total_calories(&user_id, start, end)?.unwrap_or(0);
    let burned = db.total_calories_burned(&user_id, start, end)?.unwrap_or(0);
    let steps = db.total_steps(&user_id, start, end)?.unwrap_or(0);

    let (week_start, _) = day_bounds(date - chrono::Duration::days(6));
    let workouts = db.activity_records_by_date_range(&user_id, week_start, end)?;

    let mut meals = Vec::new();
    for meal_type in MealType::ALL {
        let entries = db.food_items_by_meal_type(&user_id, *meal_type, start, end)?;
        if entries.is_empty() {
            continue;
        }
        meals.push(MealGroup {
            meal_type: meal_type.as_str().to_string(),
            calories: entries.iter().map(|e| e.calories).sum(),
            entries,
        });
    }

    let summary = DailySummary {
        date: date.to_string(),
        calories_consumed: consumed,
        calories_burned: burned,
        net_calories: consumed - burned,
        calorie_target: goals.daily_calorie_target,
        calories_remaining: goals.daily_calorie_target - consumed + burned,
        steps,
        steps_target: goals.daily_steps_target,
        workouts_this_week: workouts.len() as i64,
        weekly_workout_target: goals.weekly_workout_target,
        meals,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.meals.is_empty() && summary.calories_burned == 0 {
        eprintln!("No entries for {date}");
        process::exit(2);
    }

    println!("=== {date} ===\n");

    for meal in &summary.meals {
        let meal_label = &meal.meal_type;
        let cal = meal.calories;
        println!("  {meal_label} ({cal} kcal)");
        for e in &meal.entries {
            let id = short_id(&e.id);
            let name = &e.name;
            let brand = e
                .brand
                .as_ref()
                .map(|b| format!(" ({b})"))
                .unwrap_or_default();
            let serving = e.serving_size;
            let unit = &e.serving_unit;
            let cal = e.calories;
            let protein = e.protein;
            let carbs = e.carbs;
            let fat = e.fat;
            println!(
                "    [{id}] {name}{brand} — {serving:.0}{unit} — {cal} kcal | P:{protein:.0}g C:{carbs:.0}g F:{fat:.0}g"
            );
        }
        println!();
    }

    let consumed = summary.calories_consumed;
    let burned = summary.calories_burned;
    let net = summary.net_calories;
    println!("  EATEN:  {consumed} kcal");
    println!("  BURNED: {burned} kcal ({} workouts this week)", summary.workouts_this_week);
    println!("  NET:    {net} kcal");

    let target = summary.calorie_target;
    let remaining = summary.calories_remaining;
    println!("  TARGET: {target} kcal | REMAINING: {remaining} kcal");

    let steps_target = summary.steps_target;
    println!("  STEPS:  {steps} / {steps_target}");

    Ok(())
}
