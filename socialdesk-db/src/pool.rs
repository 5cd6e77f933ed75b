//! Database connection pool management
//!
//! Uses sqlx's `Any` pool so the backend is chosen by the configured driver.
//! One [`Db`] is created at startup, cloned into whatever needs it, and
//! closed once at shutdown. There is no global pool.
//!
//! sqlx has no idle cap and its reaper closes idle connections without
//! running the pool hooks. The pool's own lifetime limits are switched off
//! and `IdleGate` enforces the configured limits from the hooks instead. A
//! released connection is parked only if it is young enough and an idle slot
//! is free. A stale idle connection is closed when it is next checked out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::pool::PoolConnectionMetadata;
use sqlx::{AnyPool, Connection};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::DbConfig;
use crate::tx::Tx;
use crate::Result;

/// Transaction isolation level for [`TxOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Options for [`Db::begin`]. The default uses the server's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub isolation: Option<IsolationLevel>,
    pub read_only: bool,
}

impl TxOptions {
    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// `SET TRANSACTION ...` for non-default options, `None` otherwise.
    fn set_transaction_sql(&self) -> Option<String> {
        let mut modes = Vec::new();
        if let Some(level) = self.isolation {
            modes.push(format!("ISOLATION LEVEL {}", level.as_sql()));
        }
        if self.read_only {
            modes.push("READ ONLY".to_string());
        }
        (!modes.is_empty()).then(|| format!("SET TRANSACTION {}", modes.join(", ")))
    }
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Open connections, idle or in use
    pub size: u32,
    pub idle: usize,
    pub max_open: u32,
}

/// Idle-slot bookkeeping shared by the release and checkout hooks.
#[derive(Debug)]
struct IdleGate {
    max_idle: usize,
    parked: AtomicUsize,
    max_lifetime: Option<Duration>,
    max_idle_time: Option<Duration>,
}

impl IdleGate {
    fn new(config: &DbConfig) -> Self {
        Self {
            max_idle: config.effective_idle_conns() as usize,
            parked: AtomicUsize::new(0),
            max_lifetime: config.conn_max_lifetime(),
            max_idle_time: config.conn_max_idle_time(),
        }
    }

    fn expired(&self, meta: &PoolConnectionMetadata) -> bool {
        self.max_lifetime.is_some_and(|max| meta.age > max)
            || self.max_idle_time.is_some_and(|max| meta.idle_for > max)
    }

    /// Claim an idle slot. `false` when the cap is reached.
    fn try_park(&self) -> bool {
        self.parked
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_idle).then_some(n + 1)
            })
            .is_ok()
    }

    fn unpark(&self) {
        let _ = self
            .parked
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    fn pool_options(self: Arc<Self>, config: &DbConfig) -> AnyPoolOptions {
        let on_release = Arc::clone(&self);
        let on_acquire = self;

        AnyPoolOptions::new()
            .max_connections(config.max_open_conns)
            .min_connections(0)
            .max_lifetime(None::<Duration>)
            .idle_timeout(None::<Duration>)
            .test_before_acquire(false)
            .acquire_timeout(config.acquire_timeout())
            .after_release(move |conn, meta| {
                let gate = Arc::clone(&on_release);
                Box::pin(async move {
                    if gate.expired(&meta) || !gate.try_park() {
                        debug!(
                            age_ms = meta.age.as_millis() as u64,
                            "closing released connection"
                        );
                        return Ok(false);
                    }
                    if let Err(err) = conn.ping().await {
                        gate.unpark();
                        return Err(err);
                    }
                    Ok(true)
                })
            })
            .before_acquire(move |conn, meta| {
                let gate = Arc::clone(&on_acquire);
                Box::pin(async move {
                    gate.unpark();
                    if gate.expired(&meta) {
                        debug!(
                            idle_ms = meta.idle_for.as_millis() as u64,
                            "closing stale idle connection"
                        );
                        return Ok(false);
                    }
                    conn.ping().await?;
                    Ok::<_, sqlx::Error>(true)
                })
            })
    }
}

/// The live connection pool.
#[derive(Debug, Clone)]
pub struct Db {
    pool: AnyPool,
    max_open: u32,
}

impl Db {
    /// Open the pool and probe it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DbError::Config`] for invalid settings, or the
    /// driver's error if the liveness probe fails. In that case the pool is
    /// closed before returning and no handle exists.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let db = Db::init(&DbConfig::new("postgres", "postgres://localhost/socialdesk")).await?;
    /// ```
    pub async fn init(config: &DbConfig) -> Result<Self> {
        let driver = config.validate()?;
        install_default_drivers();

        let pool = Arc::new(IdleGate::new(config))
            .pool_options(config)
            .connect_lazy(&config.url)?;

        let db = Self {
            pool,
            max_open: config.max_open_conns,
        };

        if let Err(err) = db.ping().await {
            warn!(url = %config.redacted_url(), error = %err, "database liveness probe failed");
            db.close().await;
            return Err(err);
        }

        info!(
            driver = %driver,
            url = %config.redacted_url(),
            max_open = config.max_open_conns,
            max_idle = config.effective_idle_conns(),
            "database pool ready"
        );
        Ok(db)
    }

    /// Close the pool, waiting for checked-out connections to return.
    ///
    /// Closing cannot fail, so unlike the other lifecycle calls this returns
    /// nothing. A second call is a no-op.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Liveness probe on a pooled connection.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    /// A direct handle sharing this pool.
    pub fn get(&self) -> Client {
        Client::new(self.pool.clone())
    }

    /// Start a transaction.
    ///
    /// Waits for a free connection up to the configured acquire timeout.
    pub async fn begin(&self, options: TxOptions) -> Result<Tx> {
        let mut tx = self.pool.begin().await?;
        if let Some(sql) = options.set_transaction_sql() {
            // Dropping `tx` on error rolls it back.
            sqlx::query(&sql).execute(&mut *tx).await?;
        }
        Ok(Tx::new(tx))
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max_open: self.max_open,
        }
    }

    /// The underlying sqlx pool, for work outside the entity contract.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}
