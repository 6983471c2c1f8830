use std::sync::Mutex;

use chrono::NaiveDate;

/// One outbound mailbox and what is left of its daily budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    pub id: String,
    pub remaining: u32,
}

#[derive(Debug)]
struct PoolState {
    senders: Vec<SenderIdentity>,
    cursor: usize,
    day: Option<NaiveDate>,
}

/// Process-wide pool of sender identities, rotated round-robin.
///
/// Every reservation takes the lock once, so the quota decrement and the decision to skip
/// an exhausted sender are consistent. The lock is never held across an await.
#[derive(Debug)]
pub struct SenderPool {
    daily_quota: u32,
    state: Mutex<PoolState>,
}

impl SenderPool {
    pub fn new<I, S>(ids: I, daily_quota: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let senders = ids
            .into_iter()
            .map(|id| SenderIdentity {
                id: id.into(),
                remaining: daily_quota,
            })
            .collect();
        Self {
            daily_quota,
            state: Mutex::new(PoolState {
                senders,
                cursor: 0,
                day: None,
            }),
        }
    }

    /// Reserve one send on the next sender that still has quota.
    ///
    /// Returns `None` once every sender is exhausted.
    pub fn reserve(&self) -> Option<SenderIdentity> {
        let mut state = self.lock();
        let len = state.senders.len();
        for offset in 0..len {
            let idx = (state.cursor + offset) % len;
            if state.senders[idx].remaining > 0 {
                state.senders[idx].remaining -= 1;
                state.cursor = (idx + 1) % len;
                return Some(state.senders[idx].clone());
            }
        }
        None
    }

    /// Reset quotas the first time this is called on a new calendar day.
    /// Returns `true` if a reset happened.
    pub fn reset_if_new_day(&self, today: NaiveDate) -> bool {
        let mut state = self.lock();
        if state.day == Some(today) {
            return false;
        }
        let first_day = state.day.is_none();
        state.day = Some(today);
        if first_day {
            return false;
        }
        for sender in &mut state.senders {
            sender.remaining = self.daily_quota;
        }
        state.cursor = 0;
        tracing::info!(%today, "sender quotas reset");
        true
    }

    pub fn snapshot(&self) -> Vec<SenderIdentity> {
        self.lock().senders.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        // A panic while holding the lock cannot leave counters half-updated.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
