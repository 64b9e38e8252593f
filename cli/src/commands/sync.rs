use anyhow::{Result, bail};
use std::time::Duration;

use crate::config::{Config, RemoteSettings};
use crate::scheduler::{SyncScheduler, probe_reachable};
use stride_core::auth::AuthState;
use stride_core::db::Database;
use stride_core::sync::Synchronizer;

use super::helpers::require_cloud_repository;

/// Manual sync commands require a full account; guests only get the local
/// store.
fn signed_in_user(config: &Config) -> Result<String> {
    match config.auth_state() {
        AuthState::SignedIn { user_id } => Ok(user_id),
        AuthState::Guest { .. } => {
            bail!(
                "Guest sessions are excluded from cloud sync. Sign in with 'stride auth login <user-id>'."
            )
        }
        AuthState::SignedOut | AuthState::Unknown => {
            bail!("Not signed in. Run 'stride auth login <user-id>' first.")
        }
    }
}

pub(crate) fn cmd_sync_now(
    config: &Config,
    db: &Database,
    rt: &tokio::runtime::Handle,
    json: bool,
) -> Result<()> {
    let user_id = signed_in_user(config)?;
    let repo = require_cloud_repository(config, rt)?;
    Synchronizer::new(db, &repo).perform_background_sync(&user_id)?;

    if json {
        println!("{}", serde_json::json!({ "status": "completed" }));
    } else {
        println!("Sync complete (push + pull for {user_id})");
        eprintln!("Note: individual record failures are not reported; check the logs.");
    }
    Ok(())
}

pub(crate) fn cmd_sync_push(
    config: &Config,
    db: &Database,
    rt: &tokio::runtime::Handle,
    json: bool,
) -> Result<()> {
    let user_id = signed_in_user(config)?;
    let repo = require_cloud_repository(config, rt)?;
    Synchronizer::new(db, &repo).sync_to_cloud(&user_id)?;

    if json {
        println!("{}", serde_json::json!({ "status": "pushed" }));
    } else {
        println!("Pushed local data to the cloud for {user_id}");
    }
    Ok(())
}

pub(crate) fn cmd_sync_pull(
    config: &Config,
    db: &Database,
    rt: &tokio::runtime::Handle,
    json: bool,
) -> Result<()> {
    let user_id = signed_in_user(config)?;
    let repo = require_cloud_repository(config, rt)?;
    Synchronizer::new(db, &repo).sync_from_cloud(&user_id)?;

    if json {
        println!("{}", serde_json::json!({ "status": "pulled" }));
    } else {
        println!("Pulled cloud data into the local store for {user_id}");
    }
    Ok(())
}

pub(crate) fn cmd_sync_status(config: &Config, json: bool) -> Result<()> {
    let auth = config.auth_state();
    let remote = config.load_remote()?;
    let reachable = remote.as_ref().map(|r| probe_reachable(&r.url));

    if json {
        let out = serde_json::json!({
            "session": auth.describe(),
            "sync_allowed": auth.allows_sync(),
            "remote_url": remote.as_ref().map(|r| r.url.clone()),
            "reachable": reachable,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Session: {}", auth.describe());
    match (&remote, reachable) {
        (Some(r), Some(true)) => println!("Remote:  {} (reachable)", r.url),
        (Some(r), _) => println!("Remote:  {} (unreachable)", r.url),
        (None, _) => println!("Remote:  not configured"),
    }
    if !auth.allows_sync() {
        println!("Sync:    disabled for this session");
    }
    Ok(())
}

/// Run the periodic sync job in the foreground until interrupted.
pub(crate) async fn cmd_sync_daemon(config: Config, interval_mins: u64) -> Result<()> {
    let interval = Duration::from_secs(interval_mins * 60);
    let scheduler = SyncScheduler::new();
    scheduler.schedule(config, interval);
    eprintln!("Sync daemon running (every {interval_mins} min). Ctrl-C to stop.");
    scheduler.park().await
}

pub(crate) fn cmd_remote_set(
    config: &Config,
    url: &str,
    token: Option<String>,
    json: bool,
) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        bail!("Remote URL must start with http:// or https://");
    }
    let settings = RemoteSettings {
        url: url.trim_end_matches('/').to_string(),
        token,
    };
    config.save_remote(&settings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        println!("Remote endpoint set to {}", settings.url);
    }
    Ok(())
}

pub(crate) fn cmd_remote_show(config: &Config, json: bool) -> Result<()> {
    let remote = config.load_remote()?;

    if json {
        let out = serde_json::json!({
            "remote_url": remote.as_ref().map(|r| r.url.clone()),
            "has_token": remote.as_ref().is_some_and(|r| r.token.is_some()),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match remote {
        Some(r) => {
            println!("Remote: {}", r.url);
            println!(
                "Token:  {}",
                if r.token.is_some() { "set" } else { "not set" }
            );
        }
        None => println!("No remote endpoint configured"),
    }
    Ok(())
}
