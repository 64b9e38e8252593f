use anyhow::Result;
use std::str::FromStr;

use crate::config::Config;
use stride_core::db::Database;
use stride_core::models::{UserGoals, WeightGoalType, macro_split_is_complete};
use stride_core::sync::Synchronizer;

use super::helpers::{cloud_repository, current_user_id};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_goals_set(
    config: &Config,
    db: &Database,
    rt: &tokio::runtime::Handle,
    calories: Option<i64>,
    steps: Option<i64>,
    water_ml: Option<i64>,
    workouts: Option<i64>,
    protein_pct: Option<i64>,
    carbs_pct: Option<i64>,
    fat_pct: Option<i64>,
    current_weight: Option<f64>,
    target_weight: Option<f64>,
    weight_goal: Option<String>,
    json: bool,
) -> Result<()> {
    let user_id = current_user_id(config)?;
    let mut goals = db
        .get_user_goals(&user_id)?
        .unwrap_or_else(|| UserGoals::defaults_for(&user_id));

    if let Some(v) = calories {
        goals.daily_calorie_target = v;
    }
    if let Some(v) = steps {
        goals.daily_steps_target = v;
    }
    if let Some(v) = water_ml {
        goals.daily_water_target_ml = v;
    }
    if let Some(v) = workouts {
        goals.weekly_workout_target = v;
    }
    if let Some(v) = protein_pct {
        goals.protein_percentage = v;
    }
    if let Some(v) = carbs_pct {
        goals.carbs_percentage = v;
    }
    if let Some(v) = fat_pct {
        goals.fat_percentage = v;
    }
    if let Some(v) = current_weight {
        goals.current_weight_kg = Some(v);
    }
    if let Some(v) = target_weight {
        goals.target_weight_kg = Some(v);
    }
    if let Some(ref v) = weight_goal {
        goals.weight_goal_type = WeightGoalType::from_str(v)?;
    }

    // Odd macro splits are stored as-is; the warning is all the user gets.
    if !macro_split_is_complete(
        goals.protein_percentage,
        goals.carbs_percentage,
        goals.fat_percentage,
    ) {
        let sum = goals.protein_percentage + goals.carbs_percentage + goals.fat_percentage;
        eprintln!("Warning: macro percentages sum to {sum}, not 100");
    }

    db.upsert_user_goals(&goals)?;
    if let Some(repo) = cloud_repository(config, rt) {
        Synchronizer::new(db, &repo).push_user_goals(&goals);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&goals)?);
    } else {
        print_goals(&goals, true);
    }
    Ok(())
}

pub(crate) fn cmd_goals_show(config: &Config, db: &Database, json: bool) -> Result<()> {
    let user_id = current_user_id(config)?;
    let stored = db.get_user_goals(&user_id)?;
    let using_defaults = stored.is_none();
    let goals = stored.unwrap_or_else(|| UserGoals::defaults_for(&user_id));

    if json {
        println!("{}", serde_json::to_string_pretty(&goals)?);
        return Ok(());
    }

    if using_defaults {
        eprintln!("No goals set; showing defaults. Use 'stride goals set' to change them.");
    }
    print_goals(&goals, false);
    Ok(())
}

fn print_goals(goals: &UserGoals, saved: bool) {
    if saved {
        println!("Goals updated:");
    }
    println!("  Daily calories:  {} kcal", goals.daily_calorie_target);
    println!("  Daily steps:     {}", goals.daily_steps_target);
    println!("  Daily water:     {} ml", goals.daily_water_target_ml);
    println!("  Weekly workouts: {}", goals.weekly_workout_target);
    println!(
        "  Macro split:     {}% protein / {}% carbs / {}% fat",
        goals.protein_percentage, goals.carbs_percentage, goals.fat_percentage
    );
    match (goals.current_weight_kg, goals.target_weight_kg) {
        (Some(current), Some(target)) => {
            println!("  Weight:          {current:.1} kg -> {target:.1} kg");
        }
        (Some(current), None) => println!("  Weight:          {current:.1} kg"),
        (None, Some(target)) => println!("  Target weight:   {target:.1} kg"),
        (None, None) => {}
    }
    println!("  Weight goal:     {}", goals.weight_goal_type.as_str());
}
