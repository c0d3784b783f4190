//! Per-domain network admission state.
//!
//! One [`NetworkRegistry`] is built per pipeline and injected wherever
//! lookups happen; nothing here is process-global. Each domain tracks:
//!
//! - `pending`: requests currently in flight,
//! - `current_max`: the admission window, shrunk by one on every failure
//!   and floored at the configured minimum; it never grows back,
//! - `error_count`: lifetime failures; at the configured budget the
//!   domain's circuit opens permanently.

use dashmap::DashMap;

use crate::client::ClientConfig;

/// Outcome of asking to start a request against a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A slot was taken; caller owns one `release`.
    Admitted,
    /// Window full; poll again later.
    Saturated,
    /// Domain failed too often; no further I/O will be admitted.
    CircuitOpen,
}

#[derive(Debug)]
struct DomainState {
    pending: usize,
    current_max: usize,
    error_count: usize,
    circuit_open: bool,
}

/// Shared admission state for every domain the pipeline talks to.
#[derive(Debug)]
pub struct NetworkRegistry {
    domains: DashMap<String, DomainState>,
    max_pending: usize,
    min_pending: usize,
    max_errors: usize,
}

impl NetworkRegistry {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            domains: DashMap::new(),
            max_pending: config.max_pending,
            min_pending: config.min_pending,
            max_errors: config.max_errors,
        }
    }

    fn with_state<T>(&self, domain: &str, f: impl FnOnce(&mut DomainState) -> T) -> T {
        let mut state = self
            .domains
            .entry(domain.to_string())
            .or_insert_with(|| DomainState {
                pending: 0,
                current_max: self.max_pending,
                error_count: 0,
                circuit_open: false,
            });
        f(&mut state)
    }

    /// Try to take an admission slot for `domain`.
    pub fn try_admit(&self, domain: &str) -> Admission {
        self.with_state(domain, |s| {
            if s.circuit_open {
                Admission::CircuitOpen
            } else if s.pending >= s.current_max {
                Admission::Saturated
            } else {
                s.pending += 1;
                Admission::Admitted
            }
        })
    }

    /// Take a slot unconditionally. Retry attempts use this: the initial
    /// admission already covered the lookup, re-checking the window
    /// between attempts would let a shrinking window starve retries.
    pub fn enter(&self, domain: &str) {
        self.with_state(domain, |s| s.pending += 1);
    }

    /// Give back a slot taken by `try_admit` or `enter`.
    pub fn release(&self, domain: &str) {
        self.with_state(domain, |s| s.pending = s.pending.saturating_sub(1));
    }

    /// Record one failed attempt: shrink the window (floored), bump the
    /// error count, open the circuit at the budget. Returns whether the
    /// circuit is now open.
    pub fn record_failure(&self, domain: &str) -> bool {
        self.with_state(domain, |s| {
            s.current_max = s.current_max.saturating_sub(1).max(self.min_pending);
            s.error_count += 1;
            if s.error_count >= self.max_errors {
                s.circuit_open = true;
            }
            s.circuit_open
        })
    }

    pub fn is_circuit_open(&self, domain: &str) -> bool {
        self.domains
            .get(domain)
            .map(|s| s.circuit_open)
            .unwrap_or(false)
    }

    pub fn pending(&self, domain: &str) -> usize {
        self.domains.get(domain).map(|s| s.pending).unwrap_or(0)
    }

    pub fn current_max(&self, domain: &str) -> usize {
        self.domains
            .get(domain)
            .map(|s| s.current_max)
            .unwrap_or(self.max_pending)
    }

    pub fn error_count(&self, domain: &str) -> usize {
        self.domains.get(domain).map(|s| s.error_count).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> NetworkRegistry {
        NetworkRegistry::new(&ClientConfig::default())
    }

    #[test]
    fn test_admission_window_fills() {
        let reg = registry();
        for _ in 0..40 {
            assert_eq!(reg.try_admit("d.example"), Admission::Admitted);
        }
        assert_eq!(reg.try_admit("d.example"), Admission::Saturated);
        assert_eq!(reg.pending("d.example"), 40);

        reg.release("d.example");
        assert_eq!(reg.try_admit("d.example"), Admission::Admitted);
    }

    #[test]
    fn test_window_shrinks_monotonically_with_floor() {
        let reg = registry();
        let mut prev = reg.current_max("d.example");
        assert_eq!(prev, 40);
        for _ in 0..60 {
            reg.record_failure("d.example");
            let now = reg.current_max("d.example");
            assert!(now <= prev);
            assert!(now >= 5);
            prev = now;
        }
        assert_eq!(reg.current_max("d.example"), 5);
    }

    #[test]
    fn test_circuit_opens_at_error_budget() {
        let reg = registry();
        for i in 1..25 {
            assert!(!reg.record_failure("d.example"));
            assert_eq!(reg.error_count("d.example"), i);
        }
        assert!(reg.record_failure("d.example"));
        assert!(reg.is_circuit_open("d.example"));
        assert_eq!(reg.try_admit("d.example"), Admission::CircuitOpen);
    }

    #[test]
    fn test_domains_are_independent() {
        let reg = registry();
        for _ in 0..25 {
            reg.record_failure("bad.example");
        }
        assert!(reg.is_circuit_open("bad.example"));
        assert!(!reg.is_circuit_open("good.example"));
        assert_eq!(reg.try_admit("good.example"), Admission::Admitted);
    }
}
