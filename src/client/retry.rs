//! A reusable retry policy, shared by the catalog and directory clients.
//!
//! Matches the Design Note in spec.md §9: retries are modeled as a policy
//! struct plus an error-classifier function, not a bespoke loop per call
//! site. The hypervisor client itself is built with `max_retries: 0` (its
//! transport failures are surfaced, per spec.md §7.2); catalog and directory
//! clients use non-zero budgets.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: std::time::Duration,
    pub max_delay: std::time::Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            base_delay: std::time::Duration::from_millis(0),
            max_delay: std::time::Duration::from_millis(0),
        }
    }

    /// The catalog's policy: 3 retries, 100ms fixed pause (spec.md §4.B).
    #[must_use]
    pub const fn catalog() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay: std::time::Duration::from_millis(100),
            max_delay: std::time::Duration::from_millis(100),
        }
    }

    /// The directory client's policy: 2 retries (spec.md §5).
    #[must_use]
    pub const fn directory() -> Self {
        RetryPolicy {
            max_retries: 2,
            base_delay: std::time::Duration::from_millis(100),
            max_delay: std::time::Duration::from_secs(2),
        }
    }

    /// Exponential backoff policy used by the hypervisor's own wait loops
    /// (`WaitForPoolEmpty`: 2s→30s; `AgentPing`: 1s→5min).
    #[must_use]
    pub const fn backoff(base: std::time::Duration, max: std::time::Duration) -> Self {
        RetryPolicy {
            max_retries: u32::MAX,
            base_delay: base,
            max_delay: max,
        }
    }

    /// The delay before retry attempt `attempt` (1-indexed), doubling from
    /// `base_delay` and capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> std::time::Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let scaled = self.base_delay.saturating_mul(factor as u32);
        std::cmp::min(scaled, self.max_delay)
    }
}
