//! Session configuration and the step gate shared with the observer

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How a session is observed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugMode {
    /// Run without publishing steps
    None,
    /// One opcode per granted permit
    #[default]
    Step,
    /// One opcode per fixed delay
    Auto,
}

impl DebugMode {
    /// Whether steps are published and acknowledged
    pub fn is_active(&self) -> bool {
        !matches!(self, DebugMode::None)
    }
}

/// Settings of a debugging session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Observation mode
    pub mode: DebugMode,
    /// Pause before each opcode in auto mode
    pub step_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: DebugMode::Step,
            step_delay_ms: 500,
        }
    }
}

impl SessionConfig {
    /// Unobserved session
    pub fn silent() -> Self {
        Self {
            mode: DebugMode::None,
            ..Default::default()
        }
    }

    /// Auto-mode delay
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

/// Step permits plus the abort flag
///
/// The executor takes one permit per opcode in step mode. Setting the abort
/// flag wakes every waiter; the flag is cleared when the next session starts.
#[derive(Debug, Default)]
pub struct StepGate {
    permits: Mutex<u64>,
    wake: Condvar,
    aborted: AtomicBool,
}

impl StepGate {
    /// Closed gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `count` more opcodes
    pub fn grant(&self, count: u64) {
        let mut permits = self.permits.lock();
        *permits = permits.saturating_add(count);
        self.wake.notify_all();
    }

    /// Block until a permit is available and take it
    ///
    /// Returns `false` without taking a permit once aborted.
    pub fn acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        loop {
            if self.is_aborted() {
                return false;
            }
            if *permits > 0 {
                *permits -= 1;
                return true;
            }
            self.wake.wait(&mut permits);
        }
    }

    /// Sleep for `delay` unless aborted first
    ///
    /// Returns `false` when woken by an abort.
    pub fn pause(&self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        let mut permits = self.permits.lock();
        while !self.is_aborted() {
            if self.wake.wait_until(&mut permits, deadline).timed_out() {
                break;
            }
        }
        !self.is_aborted()
    }

    /// Request cancellation of the running session
    pub fn abort(&self) {
        // hold the lock so a waiter cannot miss the wakeup
        let _permits = self.permits.lock();
        self.aborted.store(true, Ordering::SeqCst);
        self.wake.notify_all();
    }

    /// Whether cancellation was requested
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Unused permits
    pub fn available(&self) -> u64 {
        *self.permits.lock()
    }

    /// Clear permits and the abort flag for a new session
    pub fn reset(&self) {
        let mut permits = self.permits.lock();
        *permits = 0;
        self.aborted.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_config_defaults_and_toml() {
        let config = SessionConfig::default();
        assert_eq!(config.mode, DebugMode::Step);
        assert_eq!(config.step_delay(), Duration::from_millis(500));

        let parsed: SessionConfig = toml::from_str("mode = \"auto\"").unwrap();
        assert_eq!(parsed.mode, DebugMode::Auto);
        assert_eq!(parsed.step_delay_ms, 500);
        assert!(!SessionConfig::silent().mode.is_active());
    }

    #[test]
    fn test_permits() {
        let gate = StepGate::new();
        gate.grant(2);
        assert!(gate.acquire());
        assert!(gate.acquire());
        assert_eq!(gate.available(), 0);
    }

    #[test]
    fn test_abort_wakes_waiter() {
        let gate = Arc::new(StepGate::new());
        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || gate.acquire())
        };
        thread::sleep(Duration::from_millis(20));
        gate.abort();
        assert!(!waiter.join().unwrap());
    }

    #[test]
    fn test_grant_wakes_waiter() {
        let gate = Arc::new(StepGate::new());
        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || gate.acquire())
        };
        thread::sleep(Duration::from_millis(20));
        gate.grant(1);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_pause_interrupted_by_abort() {
        let gate = Arc::new(StepGate::new());
        let sleeper = {
            let gate = gate.clone();
            thread::spawn(move || gate.pause(Duration::from_secs(30)))
        };
        thread::sleep(Duration::from_millis(20));
        gate.abort();
        assert!(!sleeper.join().unwrap());
    }

    #[test]
    fn test_reset() {
        let gate = StepGate::new();
        gate.grant(3);
        gate.abort();
        assert!(!gate.acquire());
        gate.reset();
        assert!(!gate.is_aborted());
        assert_eq!(gate.available(), 0);
    }
}
