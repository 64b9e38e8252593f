use anyhow::{Result, bail};
use chrono::Utc;
use std::str::FromStr;

use crate::config::Config;
use stride_core::db::Database;
use stride_core::models::{ActivityLevel, Gender, UserProfile};
use stride_core::sync::Synchronizer;

use super::helpers::{cloud_repository, current_user_id, local_day};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_profile_set(
    config: &Config,
    db: &Database,
    rt: &tokio::runtime::Handle,
    name: Option<String>,
    email: Option<String>,
    age: Option<i64>,
    gender: Option<String>,
    height_cm: Option<f64>,
    activity_level: Option<String>,
    json: bool,
) -> Result<()> {
    let user_id = current_user_id(config)?;

    let mut profile = match db.get_user_profile(&user_id)? {
        Some(profile) => profile,
        None => {
            let (Some(name), Some(email)) = (name.clone(), email.clone()) else {
                bail!("First-time profile setup requires --name and --email");
            };
            UserProfile {
                user_id: user_id.clone(),
                name,
                email,
                age: None,
                gender: None,
                height_cm: None,
                activity_level: ActivityLevel::Moderate,
                join_date: Utc::now(),
            }
        }
    };

    if let Some(v) = name {
        profile.name = v;
    }
    if let Some(v) = email {
        profile.email = v;
    }
    if let Some(v) = age {
        profile.age = Some(v);
    }
    if let Some(ref v) = gender {
        profile.gender = Some(Gender::from_str(v)?);
    }
    if let Some(v) = height_cm {
        profile.height_cm = Some(v);
    }
    if let Some(ref v) = activity_level {
        profile.activity_level = ActivityLevel::from_str(v)?;
    }

    db.upsert_user_profile(&profile)?;
    if let Some(repo) = cloud_repository(config, rt) {
        Synchronizer::new(db, &repo).push_user_profile(&profile);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("Profile updated");
        print_profile(&profile);
    }
    Ok(())
}

pub(crate) fn cmd_profile_show(config: &Config, db: &Database, json: bool) -> Result<()> {
    let user_id = current_user_id(config)?;
    let Some(profile) = db.get_user_profile(&user_id)? else {
        bail!("No profile for {user_id}. Run 'stride profile set --name ... --email ...' first.");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }
    print_profile(&profile);
    Ok(())
}

fn print_profile(profile: &UserProfile) {
    println!("  User:           {}", profile.user_id);
    println!("  Name:           {}", profile.name);
    println!("  Email:          {}", profile.email);
    if let Some(age) = profile.age {
        println!("  Age:            {age}");
    }
    if let Some(gender) = profile.gender {
        println!("  Gender:         {}", gender.as_str());
    }
    if let Some(height) = profile.height_cm {
        println!("  Height:         {height:.0} cm");
    }
    println!("  Activity level: {}", profile.activity_level.label());
    println!("  Joined:         {}", local_day(profile.join_date));
}
