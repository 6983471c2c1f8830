use std::sync::Arc;
use std::time::Duration;

use deadpool_redis::Pool;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use uuid::Uuid;

use crate::domain::repository::DispatchLease;
use crate::error::BackofficeError;

pub const DISPATCH_LEASE_KEY: &str = "catraca:dispatch_lease";

/// Deletes the key only while it still holds our token, so an expired lease that another
/// worker has since taken is left alone.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Extends the TTL only while the key still holds our token.
const RENEW_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("PEXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

// ── In-process lease ─────────────────────────────────────────────────────────

/// Single-permit semaphore. Enough when exactly one backoffice process runs.
#[derive(Clone)]
pub struct LocalDispatchLease {
    permits: Arc<Semaphore>,
}

impl LocalDispatchLease {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }
}

impl Default for LocalDispatchLease {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchLease for LocalDispatchLease {
    type Guard = OwnedSemaphorePermit;

    async fn try_acquire(&self) -> Result<Option<Self::Guard>, BackofficeError> {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => Ok(Some(permit)),
            Err(TryAcquireError::NoPermits) => Ok(None),
            Err(TryAcquireError::Closed) => {
                Err(anyhow::anyhow!("dispatch lease semaphore closed").into())
            }
        }
    }

    /// A held permit never expires.
    async fn renew(&self, _guard: &Self::Guard) -> Result<bool, BackofficeError> {
        Ok(true)
    }
}

// ── Redis lease ──────────────────────────────────────────────────────────────

/// Cross-process lease: `SET key token NX PX ttl`. The TTL bounds how long a crashed
/// holder can block dispatch; a live holder renews it before every send.
#[derive(Clone)]
pub struct RedisDispatchLease {
    pub pool: Pool,
    pub ttl: Duration,
}

pub struct RedisLeaseGuard {
    pool: Pool,
    token: String,
}

impl DispatchLease for RedisDispatchLease {
    type Guard = RedisLeaseGuard;

    async fn try_acquire(&self) -> Result<Option<Self::Guard>, BackofficeError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| BackofficeError::Internal(e.into()))?;
        let token = Uuid::new_v4().to_string();
        let ttl_ms = ttl_millis(self.ttl);
        let reply: Option<String> = deadpool_redis::redis::cmd("SET")
            .arg(DISPATCH_LEASE_KEY)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| BackofficeError::Internal(e.into()))?;
        Ok(reply.map(|_| RedisLeaseGuard {
            pool: self.pool.clone(),
            token,
        }))
    }

    async fn renew(&self, guard: &Self::Guard) -> Result<bool, BackofficeError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| BackofficeError::Internal(e.into()))?;
        let renewed: i64 = renew_command(&guard.token, self.ttl)
            .query_async(&mut conn)
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| BackofficeError::Internal(e.into()))?;
        Ok(renewed == 1)
    }
}

fn renew_command(token: &str, ttl: Duration) -> deadpool_redis::redis::Cmd {
    let mut cmd = deadpool_redis::redis::cmd("EVAL");
    cmd.arg(RENEW_SCRIPT)
        .arg(1)
        .arg(DISPATCH_LEASE_KEY)
        .arg(token)
        .arg(ttl_millis(ttl));
    cmd
}

async fn release(pool: &Pool, token: &str) -> anyhow::Result<()> {
    let mut conn = pool.get().await?;
    let _: i64 = deadpool_redis::redis::cmd("EVAL")
        .arg(RELEASE_SCRIPT)
        .arg(1)
        .arg(DISPATCH_LEASE_KEY)
        .arg(token)
        .query_async(&mut conn)
        .await?;
    Ok(())
}

impl Drop for RedisLeaseGuard {
    fn drop(&mut self) {
        let pool = self.pool.clone();
        let token = std::mem::take(&mut self.token);
        // Outside a runtime the TTL releases the key instead.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        handle.spawn(async move {
            if let Err(e) = release(&pool, &token).await {
                tracing::warn!(error = %e, "failed to release dispatch lease");
            }
        });
    }
}

// ── Runtime selection ────────────────────────────────────────────────────────

/// Lease picked at startup: Redis when `REDIS_URL` is configured, in-process otherwise.
#[derive(Clone)]
pub enum AppLease {
    Local(LocalDispatchLease),
    Redis(RedisDispatchLease),
}

pub enum AppLeaseGuard {
    Local { permit: OwnedSemaphorePermit },
    Redis { guard: RedisLeaseGuard },
}

impl DispatchLease for AppLease {
    type Guard = AppLeaseGuard;

    async fn try_acquire(&self) -> Result<Option<Self::Guard>, BackofficeError> {
        Ok(match self {
            Self::Local(lease) => lease
                .try_acquire()
                .await?
                .map(|permit| AppLeaseGuard::Local { permit }),
            Self::Redis(lease) => lease
                .try_acquire()
                .await?
                .map(|guard| AppLeaseGuard::Redis { guard }),
        })
    }

    async fn renew(&self, guard: &Self::Guard) -> Result<bool, BackofficeError> {
        match (self, guard) {
            (Self::Local(lease), AppLeaseGuard::Local { permit }) => lease.renew(permit).await,
            (Self::Redis(lease), AppLeaseGuard::Redis { guard }) => lease.renew(guard).await,
            _ => Err(anyhow::anyhow!("dispatch lease guard does not match the lease kind").into()),
        }
    }
}
