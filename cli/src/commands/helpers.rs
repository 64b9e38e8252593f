use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use crate::config::Config;
use crate::remote::HttpRemoteStore;
use stride_core::models::{ActivityRecord, FoodItem};
use stride_core::remote::CloudRepository;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// The identity local commands act as. Guests are fine here; only sync
/// requires a full sign-in.
pub(crate) fn current_user_id(config: &Config) -> Result<String> {
    match config.load_session()? {
        Some(session) => Ok(session.user_id),
        None => {
            bail!("Not signed in. Run 'stride auth login <user-id>' or 'stride auth guest' first.")
        }
    }
}

/// Build the cloud repository when this session may sync and a remote
/// endpoint is configured; `None` otherwise.
pub(crate) fn cloud_repository(
    config: &Config,
    rt: &tokio::runtime::Handle,
) -> Option<CloudRepository> {
    if !config.auth_state().allows_sync() {
        return None;
    }
    let remote = config.load_remote().ok().flatten()?;
    let store = HttpRemoteStore::new(&remote.url, remote.token, rt.clone());
    Some(CloudRepository::new(Box::new(store)))
}

/// Like [`cloud_repository`], but for commands where the user asked for the
/// cloud explicitly and deserves an error instead of silence.
pub(crate) fn require_cloud_repository(
    config: &Config,
    rt: &tokio::runtime::Handle,
) -> Result<CloudRepository> {
    if !config.auth_state().allows_sync() {
        bail!(
            "Cloud access requires a signed-in account (guest sessions are excluded). Run 'stride auth login <user-id>'."
        );
    }
    let Some(remote) = config.load_remote()? else {
        bail!("No remote endpoint configured. Run 'stride remote set <url>' first.");
    };
    let store = HttpRemoteStore::new(&remote.url, remote.token, rt.clone());
    Ok(CloudRepository::new(Box::new(store)))
}

/// Resolve a unique record by id prefix so tables can show short ids.
pub(crate) fn find_by_id_prefix<'a, T>(
    items: &'a [T],
    id_of: impl Fn(&T) -> &str,
    prefix: &str,
) -> Result<&'a T> {
    let matches: Vec<&T> = items
        .iter()
        .filter(|i| id_of(i).starts_with(prefix))
        .collect();
    match matches.len() {
        0 => bail!("No record matches id '{prefix}'"),
        1 => Ok(matches[0]),
        n => bail!("Id '{prefix}' is ambiguous ({n} matches); use more characters"),
    }
}

pub(crate) fn prompt_choice(count: usize) -> Result<usize> {
    eprint!("\nSelect a food (1-{count}): ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    let n: usize = line.trim().parse().context("Invalid number")?;
    if n < 1 || n > count {
        bail!("Selection out of range");
    }
    Ok(n - 1)
}

/// Timestamp for a record logged on a given day: the current instant when
/// logging for today, local noon for any other day.
pub(crate) fn date_timestamp(date: NaiveDate) -> DateTime<Utc> {
    if date == Local::now().date_naive() {
        Utc::now()
    } else {
        let (start, end) = stride_core::models::day_bounds(date);
        start + (end - start) / 2
    }
}

pub(crate) fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

pub(crate) fn local_day(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

pub(crate) fn print_food_table(items: &[&FoodItem], numbered: bool) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "#")]
        idx: String,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Brand")]
        brand: String,
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Cal")]
        calories: String,
        #[tabled(rename = "P")]
        protein: String,
        #[tabled(rename = "C")]
        carbs: String,
        #[tabled(rename = "F")]
        fat: String,
        #[tabled(rename = "Serving")]
        serving: String,
        #[tabled(rename = "Fav")]
        fav: String,
    }

    let rows: Vec<FoodRow> = items
        .iter()
        .enumerate()
        .map(|(i, f)| FoodRow {
            idx: if numbered {
                (i + 1).to_string()
            } else {
                String::new()
            },
            id: short_id(&f.id),
            name: truncate(&f.name, 32),
            brand: f
                .brand
                .as_deref()
                .map(|b| truncate(b, 18))
                .unwrap_or_default(),
            meal: f.meal_type.label().to_string(),
            date: local_day(f.date),
            calories: f.calories.to_string(),
            protein: format!("{:.1}", f.protein),
            carbs: format!("{:.1}", f.carbs),
            fat: format!("{:.1}", f.fat),
            serving: format!("{:.0}{}", f.serving_size, f.serving_unit),
            fav: if f.is_favorite {
                "*".to_string()
            } else {
                String::new()
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(6..10)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_activity_table(records: &[&ActivityRecord]) {
    #[derive(Tabled)]
    struct ActivityRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Type")]
        activity_type: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Min")]
        minutes: String,
        #[tabled(rename = "Cal")]
        calories: String,
        #[tabled(rename = "Km")]
        distance: String,
        #[tabled(rename = "Steps")]
        steps: String,
    }

    let rows: Vec<ActivityRow> = records
        .iter()
        .map(|r| ActivityRow {
            id: short_id(&r.id),
            name: truncate(&r.name, 28),
            activity_type: r.activity_type.label().to_string(),
            date: local_day(r.date),
            minutes: r.duration_minutes.to_string(),
            calories: r.calories_burned.to_string(),
            distance: r.distance_km.map_or("-".into(), |v| format!("{v:.1}")),
            steps: r.steps.map_or("-".into(), |v| v.to_string()),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..8)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        // Should not panic on multi-byte characters
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("Müsli", 10), "Müsli");
    }

    #[test]
    fn test_find_by_id_prefix() {
        let ids = vec![
            "abc-123".to_string(),
            "abd-456".to_string(),
            "xyz-789".to_string(),
        ];
        assert_eq!(
            find_by_id_prefix(&ids, |s| s.as_str(), "xyz").unwrap(),
            "xyz-789"
        );
        assert_eq!(
            find_by_id_prefix(&ids, |s| s.as_str(), "abc-123").unwrap(),
            "abc-123"
        );
        // Ambiguous and missing prefixes fail.
        assert!(find_by_id_prefix(&ids, |s| s.as_str(), "ab").is_err());
        assert!(find_by_id_prefix(&ids, |s| s.as_str(), "zzz").is_err());
    }
}
