use std::sync::Arc;

use anyhow::anyhow;
use tracing::error;

use paphos_db::{Database, UnitOfWork};

use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::{ApiError, ApiResult};
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    pub credentials: Credentials,
}

impl AppStateInner {
    pub fn new(db: Database, config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            db,
            tokens: TokenService::new(&config.jwt_secret)?,
            credentials: Credentials::new(config.bcrypt_cost)?,
        })
    }

    /// Run `f` as one unit of work on the blocking pool.
    pub async fn transact<F, T>(self: &Arc<Self>, f: F) -> ApiResult<T>
    where
        F: FnOnce(&UnitOfWork<'_>) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        blocking(move || state.db.unit_of_work(f)).await
    }
}

/// Run CPU- or IO-bound work off the async runtime.
pub async fn blocking<F, T>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow!("blocking task failed"))
    })?
}
