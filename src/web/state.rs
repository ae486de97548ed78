use std::{
    collections::{HashMap, HashSet},
    env,
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::{history::PromptRecord, llm::GenerationClient};

/// One question/answer exchange from the pair-programming panel.
#[derive(Debug, Clone)]
pub struct PairExchange {
    pub question: String,
    pub answer: String,
}

/// Generation state scoped to one session. Each session gets its own
/// workspace, so concurrent users cannot clobber each other's artifacts.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub form: PromptRecord,
    pub generated_code: String,
    pub explanation: String,
    pub pair_history: Vec<PairExchange>,
    pub pdf: Option<Vec<u8>>,
}

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    llm: GenerationClient,
    workspaces: Arc<RwLock<HashMap<Uuid, Workspace>>>,
}

impl AppState {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL env var is missing")?;

        let llm = GenerationClient::from_env().context("failed to initialize generation client")?;

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&database_url)
            .await
            .context("failed to connect to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        Ok(Self {
            pool,
            llm,
            workspaces: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Insert the seed admin account when no admin exists yet. The admin is a
    /// regular user record with `is_admin` set, hashed the same way as every
    /// other account.
    pub async fn ensure_seed_admin(&self) -> Result<()> {
        let has_admin: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE is_admin = TRUE)")
                .fetch_one(&self.pool)
                .await
                .context("failed to verify admin presence")?;

        if !has_admin {
            let username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
            let password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

            let password_hash = crate::web::auth::hash_password(&password)
                .map_err(|err| anyhow!("failed to hash seed admin password: {err}"))?;

            sqlx::query(
                "INSERT INTO users (id, username, password_hash, is_admin, joined_on) VALUES ($1, $2, $3, TRUE, NOW())",
            )
            .bind(Uuid::new_v4())
            .bind(&username)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .context("failed to insert seed admin user")?;

            info!(%username, "Seeded default admin account. Update its password promptly.");
        }

        Ok(())
    }

    pub fn llm_client(&self) -> GenerationClient {
        self.llm.clone()
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    pub fn pool_ref(&self) -> &PgPool {
        &self.pool
    }

    /// Read a copy of the workspace for `session`, or a fresh one if the
    /// session has not generated anything yet.
    pub async fn workspace_snapshot(&self, session: Uuid) -> Workspace {
        let guard = self.workspaces.read().await;
        guard.get(&session).cloned().unwrap_or_default()
    }

    /// Mutate the workspace for `session` under the write lock, creating it
    /// on first use.
    pub async fn with_workspace<F, R>(&self, session: Uuid, apply: F) -> R
    where
        F: FnOnce(&mut Workspace) -> R,
    {
        let mut guard = self.workspaces.write().await;
        apply(guard.entry(session).or_default())
    }

    pub async fn drop_workspace(&self, session: Uuid) {
        let mut guard = self.workspaces.write().await;
        guard.remove(&session);
    }

    /// Evict workspaces whose session is no longer live, returning how many
    /// were dropped. Sessions expire without a request ever touching them
    /// again, so the map needs this sweep to not accumulate stale artifacts.
    pub async fn retain_workspaces(&self, live_sessions: &[Uuid]) -> usize {
        let live: HashSet<Uuid> = live_sessions.iter().copied().collect();
        let mut guard = self.workspaces.write().await;
        retain_live(&mut guard, &live)
    }
}

fn retain_live(workspaces: &mut HashMap<Uuid, Workspace>, live: &HashSet<Uuid>) -> usize {
    let before = workspaces.len();
    workspaces.retain(|token, _| live.contains(token));
    before - workspaces.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retain_drops_workspaces_without_a_live_session() {
        let live_token = Uuid::new_v4();
        let stale_token = Uuid::new_v4();

        let mut workspaces = HashMap::new();
        workspaces.insert(live_token, Workspace::default());
        workspaces.insert(
            stale_token,
            Workspace {
                generated_code: "fn main() {}".to_string(),
                pdf: Some(vec![0x25, 0x50, 0x44, 0x46]),
                ..Workspace::default()
            },
        );

        let live: HashSet<Uuid> = [live_token].into_iter().collect();
        let dropped = retain_live(&mut workspaces, &live);

        assert_eq!(dropped, 1);
        assert!(workspaces.contains_key(&live_token));
        assert!(!workspaces.contains_key(&stale_token));
    }

    #[test]
    fn retain_with_no_live_sessions_empties_the_map() {
        let mut workspaces = HashMap::new();
        workspaces.insert(Uuid::new_v4(), Workspace::default());
        workspaces.insert(Uuid::new_v4(), Workspace::default());

        let dropped = retain_live(&mut workspaces, &HashSet::new());

        assert_eq!(dropped, 2);
        assert!(workspaces.is_empty());
    }
}
