//! Periodic session housekeeping: expired session rows are deleted and
//! workspaces whose session is gone are evicted from the in-memory map.

use anyhow::{Context, Result};
use tokio::time::{Duration as TokioDuration, sleep};
use tracing::{error, info};
use uuid::Uuid;

use crate::AppState;

const SWEEP_INTERVAL_MINUTES: u64 = 15;

pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        let interval = TokioDuration::from_secs(SWEEP_INTERVAL_MINUTES * 60);
        loop {
            if let Err(err) = run_sweep_cycle(&state).await {
                error!(?err, "session sweep cycle failed");
            }
            sleep(interval).await;
        }
    });
}

async fn run_sweep_cycle(state: &AppState) -> Result<()> {
    let expired_sessions = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
        .execute(state.pool_ref())
        .await
        .context("failed to delete expired sessions")?
        .rows_affected();

    let live_sessions: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM sessions")
        .fetch_all(state.pool_ref())
        .await
        .context("failed to list live sessions")?;

    let evicted_workspaces = state.retain_workspaces(&live_sessions).await;

    if expired_sessions > 0 || evicted_workspaces > 0 {
        info!(expired_sessions, evicted_workspaces, "session sweep completed");
    }

    Ok(())
}
