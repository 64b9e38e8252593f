use anyhow::Result;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::Config;
use stride_core::db::Database;
use stride_core::models::{ActivityRecord, ActivityType, day_bounds};
use stride_core::sync::Synchronizer;

use super::helpers::{
    cloud_repository, current_user_id, date_timestamp, find_by_id_prefix, parse_date,
    print_activity_table, require_cloud_repository,
};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_activity_log(
    config: &Config,
    db: &Database,
    rt: &tokio::runtime::Handle,
    name: &str,
    activity: &str,
    minutes: i64,
    calories: i64,
    date: Option<String>,
    distance: Option<f64>,
    steps: Option<i64>,
    json: bool,
) -> Result<()> {
    let user_id = current_user_id(config)?;
    let activity_type = ActivityType::from_str(activity)?;
    let date = parse_date(date)?;

    let record = ActivityRecord {
        id: Uuid::new_v4().to_string(),
        user_id,
        name: name.to_string(),
        activity_type,
        duration_minutes: minutes,
        calories_burned: calories,
        date: date_timestamp(date),
        distance_km: distance,
        steps,
    };
    db.upsert_activity_record(&record)?;

    if let Some(repo) = cloud_repository(config, rt) {
        Synchronizer::new(db, &repo).push_activity_record(&record);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        let label = record.activity_type.label();
        let cal = record.calories_burned;
        println!("Logged {label} \"{name}\" ({minutes} min, {cal} kcal) for {date}");
    }
    Ok(())
}

pub(crate) fn cmd_activity_list(
    config: &Config,
    db: &Database,
    activity: Option<&str>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let user_id = current_user_id(config)?;

    let records = if let Some(activity) = activity {
        let activity_type = ActivityType::from_str(activity)?;
        db.activity_records_by_type(&user_id, activity_type)?
    } else if let Some(date) = date {
        let (start, end) = day_bounds(parse_date(Some(date))?);
        db.activity_records_by_date_range(&user_id, start, end)?
    } else {
        db.activity_records_for_user(&user_id)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        eprintln!("No activity records found");
        return Ok(());
    }
    let refs: Vec<&ActivityRecord> = records.iter().collect();
    print_activity_table(&refs);
    Ok(())
}

/// Delete from exactly one store; the delete is never mirrored.
pub(crate) fn cmd_activity_delete(
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
        let records = repo.get_activity_records(&user_id);
        let id = find_by_id_prefix(&records, |r| r.id.as_str(), id_prefix)?
            .id
            .clone();
        let ok = repo.delete_activity_record(&id);
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

    let records = db.activity_records_for_user(&user_id)?;
    let id = find_by_id_prefix(&records, |r| r.id.as_str(), id_prefix)?
        .id
        .clone();

    db.delete_activity_record(&id)?;

    if json {
        let out = serde_json::json!({ "deleted": id });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Deleted {id} from the local store");
        eprintln!("Note: any cloud copy is kept and may reappear after a sync.");
    }
    Ok(())
}
