use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use crate::config::Config;
use stride_core::auth::Session;

pub(crate) fn cmd_auth_login(
    config: &Config,
    user_id: &str,
    email: Option<String>,
    json: bool,
) -> Result<()> {
    let session = Session {
        user_id: user_id.to_string(),
        email,
        guest: false,
        signed_in_at: Utc::now(),
    };
    config.save_session(&session)?;

    if json {
        println!("{}", serde_json::json!({ "status": "signed_in", "user_id": user_id }));
    } else {
        println!("Signed in as {user_id}");
    }
    Ok(())
}

/// Start an anonymous session: fully usable locally, excluded from sync.
pub(crate) fn cmd_auth_guest(config: &Config, json: bool) -> Result<()> {
    let user_id = format!("guest-{}", Uuid::new_v4());
    let session = Session {
        user_id: user_id.clone(),
        email: None,
        guest: true,
        signed_in_at: Utc::now(),
    };
    config.save_session(&session)?;

    if json {
        println!("{}", serde_json::json!({ "status": "guest", "user_id": user_id }));
    } else {
        println!("Started guest session {user_id}");
        eprintln!("Guest sessions are local-only; cloud sync stays disabled until you sign in.");
    }
    Ok(())
}

pub(crate) fn cmd_auth_logout(config: &Config, json: bool) -> Result<()> {
    let removed = config.clear_session()?;

    if json {
        println!("{}", serde_json::json!({ "status": "signed_out", "had_session": removed }));
    } else if removed {
        println!("Signed out");
    } else {
        println!("No active session");
    }
    Ok(())
}

pub(crate) fn cmd_auth_status(config: &Config, json: bool) -> Result<()> {
    let auth = config.auth_state();
    let session = config.load_session().unwrap_or(None);

    if json {
        let out = serde_json::json!({
            "session": auth.describe(),
            "user_id": auth.user_id(),
            "email": session.and_then(|s| s.email),
            "sync_allowed": auth.allows_sync(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Session: {}", auth.describe());
    if let Some(email) = session.and_then(|s| s.email) {
        println!("Email:   {email}");
    }
    Ok(())
}
