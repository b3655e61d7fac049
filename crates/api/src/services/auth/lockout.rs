//! Account lockout policy.
//!
//! Pure decision logic for the failed-login counter. Persistence applies the
//! same transitions atomically inside a single conditional UPDATE (see
//! `UserRepository::record_failed_login`); the functions here exist so the
//! state machine can be reasoned about and tested without a database.

use chrono::{DateTime, Duration, Utc};

use crate::config::LockoutConfig;

/// Lockout thresholds.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    /// Consecutive failures before the account locks.
    pub max_attempts: u32,
    /// How long a lock lasts once triggered.
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lock_duration: Duration::hours(2),
        }
    }
}

/// Observable lockout state of an account at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Authentication may proceed; `attempts` failures since the last success.
    Unlocked {
        /// Current consecutive-failure count.
        attempts: u32,
    },
    /// Authentication is rejected until the expiry passes.
    Locked {
        /// When the lock expires.
        until: DateTime<Utc>,
    },
}

/// Field updates produced by a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureUpdate {
    /// New consecutive-failure count.
    pub attempts: i32,
    /// New lock expiry, if any.
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutPolicy {
    /// Build a policy from configuration.
    #[must_use]
    pub fn from_config(config: &LockoutConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            lock_duration: Duration::seconds(i64::try_from(config.lock_duration_secs).unwrap_or(0)),
        }
    }

    /// Classify the stored counter fields at `now`.
    ///
    /// A lock whose expiry has passed reads as unlocked; the stale counter is
    /// irrelevant because the next attempt either succeeds (full reset) or
    /// fails (restart at 1).
    #[must_use]
    pub fn state(
        &self,
        attempts: i32,
        locked_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> LockState {
        match locked_until {
            Some(until) if until > now => LockState::Locked { until },
            _ => LockState::Unlocked {
                attempts: u32::try_from(attempts.max(0)).unwrap_or(0),
            },
        }
    }

    /// Transition for a failed authentication attempt.
    ///
    /// - An expired lock clears, and the count restarts at 1: the attempt
    ///   that found the lock expired is itself a failure.
    /// - Otherwise the count increments; reaching `max_attempts` sets the
    ///   lock expiry.
    ///
    /// Callers must reject attempts against a live lock *before* invoking
    /// this (and before verifying the password).
    #[must_use]
    pub fn on_failure(
        &self,
        attempts: i32,
        locked_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> FailureUpdate {
        if let Some(until) = locked_until
            && until <= now
        {
            return FailureUpdate {
                attempts: 1,
                locked_until: None,
            };
        }

        let next = attempts.saturating_add(1);
        let threshold = i32::try_from(self.max_attempts).unwrap_or(i32::MAX);
        let locked_until = if locked_until.is_none() && next >= threshold {
            Some(now + self.lock_duration)
        } else {
            locked_until
        };

        FailureUpdate {
            attempts: next,
            locked_until,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::default()
    }

    #[test]
    fn test_state_unlocked_when_no_lock() {
        let now = Utc::now();
        assert_eq!(
            policy().state(3, None, now),
            LockState::Unlocked { attempts: 3 }
        );
    }

    #[test]
    fn test_state_locked_while_expiry_in_future() {
        let now = Utc::now();
        let until = now + Duration::minutes(30);
        assert_eq!(
            policy().state(5, Some(until), now),
            LockState::Locked { until }
        );
    }

    #[test]
    fn test_state_unlocked_once_expiry_passes() {
        let now = Utc::now();
        assert_eq!(
            policy().state(5, Some(now - Duration::seconds(1)), now),
            LockState::Unlocked { attempts: 5 }
        );
    }

    #[test]
    fn test_failure_increments_below_threshold() {
        let now = Utc::now();
        for attempts in 0..=3 {
            let update = policy().on_failure(attempts, None, now);
            assert_eq!(update.attempts, attempts + 1);
            assert_eq!(update.locked_until, None, "no lock at {} attempts", attempts + 1);
        }
    }

    #[test]
    fn test_fifth_failure_locks_for_two_hours() {
        let now = Utc::now();
        let update = policy().on_failure(4, None, now);
        assert_eq!(update.attempts, 5);
        assert_eq!(update.locked_until, Some(now + Duration::hours(2)));
    }

    #[test]
    fn test_expired_lock_restarts_count_at_one() {
        // The failure that discovers the expired lock counts; restarting at
        // zero would hand out a free attempt each lock cycle.
        let now = Utc::now();
        let update = policy().on_failure(5, Some(now - Duration::seconds(1)), now);
        assert_eq!(update.attempts, 1);
        assert_eq!(update.locked_until, None);
    }

    #[test]
    fn test_lock_boundary_expiry_exactly_now() {
        // A lock expiring exactly now is no longer live.
        let now = Utc::now();
        assert_eq!(
            policy().state(5, Some(now), now),
            LockState::Unlocked { attempts: 5 }
        );
        let update = policy().on_failure(5, Some(now), now);
        assert_eq!(update.attempts, 1);
    }

    #[test]
    fn test_custom_threshold_from_config() {
        let policy = LockoutPolicy::from_config(&LockoutConfig {
            max_attempts: 3,
            lock_duration_secs: 60,
        });
        let now = Utc::now();
        let update = policy.on_failure(2, None, now);
        assert_eq!(update.attempts, 3);
        assert_eq!(update.locked_until, Some(now + Duration::seconds(60)));
    }
}
