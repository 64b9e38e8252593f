use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::remote::HttpRemoteStore;
use stride_core::db::Database;
use stride_core::remote::CloudRepository;
use stride_core::sync::{SyncOutcome, Synchronizer};

/// How often a scheduled sync fires.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(15 * 60);
/// Delay before re-running a pass that reported `Retry`.
pub const RETRY_DELAY: Duration = Duration::from_secs(60);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Result codes a firing reports back to the scheduler, in the shape the
/// host job facility consumes: run again next interval, run again soon, or
/// nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    /// The pass failed or the network was unreachable; the WHOLE pass is
    /// retried after [`RETRY_DELAY`], never a single record.
    Retry,
    /// No signed-in non-guest session, or no remote endpoint configured.
    Skipped,
}

/// One scheduled sync firing: check the session, check connectivity, then
/// run a full bidirectional pass against the configured remote.
pub fn run_sync_pass(config: &Config, handle: &Handle) -> JobOutcome {
    let auth = config.auth_state();
    if !auth.allows_sync() {
        debug!("session is {}, skipping sync", auth.describe());
        return JobOutcome::Skipped;
    }

    let Ok(Some(remote)) = config.load_remote() else {
        info!("no remote endpoint configured, skipping sync");
        return JobOutcome::Skipped;
    };

    if !probe_reachable(&remote.url) {
        warn!("remote {} unreachable, will retry", remote.url);
        return JobOutcome::Retry;
    }

    let pass = || -> Result<()> {
        let db = Database::open(&config.db_path)?;
        let store = HttpRemoteStore::new(&remote.url, remote.token.clone(), handle.clone());
        let repo = CloudRepository::new(Box::new(store));
        let outcome = Synchronizer::new(&db, &repo).background_sync_if_signed_in(&auth)?;
        debug_assert_eq!(outcome, SyncOutcome::Completed);
        Ok(())
    };

    match pass() {
        Ok(()) => {
            info!("sync pass completed");
            JobOutcome::Success
        }
        Err(e) => {
            warn!("sync pass failed: {e:#}");
            JobOutcome::Retry
        }
    }
}

/// Extract the TCP endpoint from an http(s) URL for the connectivity probe.
fn host_port(url: &str) -> Option<(String, u16)> {
    let (default_port, rest) = if let Some(rest) = url.strip_prefix("https://") {
        (443, rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        (80, rest)
    } else {
        return None;
    };

    let authority = rest.split('/').next()?;
    if authority.is_empty() {
        return None;
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().ok()?;
            Some((host.to_string(), port))
        }
        None => Some((authority.to_string(), default_port)),
    }
}

/// Cheap network-connectivity precondition: can we open a TCP connection to
/// the remote endpoint at all.
pub(crate) fn probe_reachable(url: &str) -> bool {
    let Some((host, port)) = host_port(url) else {
        return false;
    };
    let Ok(addrs) = (host.as_str(), port).to_socket_addrs() else {
        return false;
    };
    for addr in addrs {
        if TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok() {
            return true;
        }
    }
    false
}

async fn sync_loop(config: Config, interval: Duration) {
    loop {
        let cfg = config.clone();
        let handle = Handle::current();
        let outcome = tokio::task::spawn_blocking(move || run_sync_pass(&cfg, &handle))
            .await
            .unwrap_or(JobOutcome::Retry);

        let delay = match outcome {
            JobOutcome::Retry => RETRY_DELAY,
            JobOutcome::Success | JobOutcome::Skipped => interval,
        };
        debug!("next sync in {}s", delay.as_secs());
        tokio::time::sleep(delay).await;
    }
}

/// In-process stand-in for the host's periodic job facility: one named job,
/// fired on an interval while the process lives.
pub struct SyncScheduler {
    scheduled: AtomicBool,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SyncScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scheduled: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Schedule the periodic sync job. Keep-existing policy: when a job is
    /// already pending this is a no-op and returns false.
    pub fn schedule(&self, config: Config, interval: Duration) -> bool {
        if self.scheduled.swap(true, Ordering::SeqCst) {
            debug!("sync job already scheduled, keeping it");
            return false;
        }
        info!("scheduling sync every {}s", interval.as_secs());
        let handle = tokio::spawn(sync_loop(config, interval));
        *self.task.lock().unwrap() = Some(handle);
        true
    }

    /// Cancel the pending job. Returns false when none was scheduled.
    pub fn cancel(&self) -> bool {
        if !self.scheduled.swap(false, Ordering::SeqCst) {
            return false;
        }
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
        true
    }

    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::SeqCst)
    }

    /// Wait on the scheduled job; it only returns when aborted or panicked.
    pub async fn park(&self) -> Result<()> {
        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            task.await?;
        }
        Ok(())
    }
}

impl Default for SyncScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stride_core::auth::Session;

    fn temp_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("stride.db"),
            data_dir: dir.path().to_path_buf(),
        };
        (dir, config)
    }

    #[test]
    fn test_host_port_defaults() {
        assert_eq!(
            host_port("http://example.com"),
            Some(("example.com".to_string(), 80))
        );
        assert_eq!(
            host_port("https://example.com"),
            Some(("example.com".to_string(), 443))
        );
        assert_eq!(
            host_port("http://example.com:8080/api"),
            Some(("example.com".to_string(), 8080))
        );
        assert_eq!(
            host_port("http://127.0.0.1:9000"),
            Some(("127.0.0.1".to_string(), 9000))
        );
    }

    #[test]
    fn test_host_port_rejects_non_http() {
        assert!(host_port("ftp://example.com").is_none());
        assert!(host_port("example.com").is_none());
        assert!(host_port("http://").is_none());
    }

    #[tokio::test]
    async fn test_pass_skipped_without_session() {
        let (_dir, config) = temp_config();
        let outcome = run_sync_pass(&config, &Handle::current());
        assert_eq!(outcome, JobOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_pass_skipped_for_guest() {
        let (_dir, config) = temp_config();
        config
            .save_session(&Session {
                user_id: "g1".to_string(),
                email: None,
                guest: true,
                signed_in_at: Utc::now(),
            })
            .unwrap();
        config
            .save_remote(&crate::config::RemoteSettings {
                url: "http://127.0.0.1:1".to_string(),
                token: None,
            })
            .unwrap();

        let outcome = run_sync_pass(&config, &Handle::current());
        assert_eq!(outcome, JobOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_pass_skipped_without_remote() {
        let (_dir, config) = temp_config();
        config
            .save_session(&Session {
                user_id: "u1".to_string(),
                email: None,
                guest: false,
                signed_in_at: Utc::now(),
            })
            .unwrap();

        let outcome = run_sync_pass(&config, &Handle::current());
        assert_eq!(outcome, JobOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_pass_retries_when_unreachable() {
        let (_dir, config) = temp_config();
        config
            .save_session(&Session {
                user_id: "u1".to_string(),
                email: None,
                guest: false,
                signed_in_at: Utc::now(),
            })
            .unwrap();
        // Port 1 on loopback: nothing listens there.
        config
            .save_remote(&crate::config::RemoteSettings {
                url: "http://127.0.0.1:1".to_string(),
                token: None,
            })
            .unwrap();

        let outcome = run_sync_pass(&config, &Handle::current());
        assert_eq!(outcome, JobOutcome::Retry);
    }

    #[tokio::test]
    async fn test_schedule_keeps_existing_job() {
        let (_dir, config) = temp_config();
        let scheduler = SyncScheduler::new();

        assert!(scheduler.schedule(config.clone(), Duration::from_secs(3600)));
        assert!(scheduler.is_scheduled());
        // Second request keeps the pending job.
        assert!(!scheduler.schedule(config.clone(), Duration::from_secs(3600)));

        assert!(scheduler.cancel());
        assert!(!scheduler.is_scheduled());
        assert!(!scheduler.cancel());

        // A cancelled job can be rescheduled.
        assert!(scheduler.schedule(config, Duration::from_secs(3600)));
        scheduler.cancel();
    }
}
