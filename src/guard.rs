// src/guard.rs
//
// Single-flight guard: each user-triggered action kind (analyze, price,
// try-on) allows at most one outstanding request. A second request of the
// same kind while one is in flight is rejected. There is no cancellation;
// an issued call runs to completion or failure.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::GarimpoError;

#[derive(Clone)]
pub struct ActionGuard {
    name: &'static str,
    in_flight: Arc<AtomicBool>,
}

impl ActionGuard {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Transitions Idle -> Running, or fails with `Busy` if already
    /// Running. The returned permit releases the slot on drop, so both the
    /// success and the error path return to Idle.
    pub fn acquire(&self) -> Result<FlightPermit, GarimpoError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(GarimpoError::Busy(self.name));
        }
        Ok(FlightPermit {
            in_flight: Arc::clone(&self.in_flight),
        })
    }
}

pub struct FlightPermit {
    in_flight: Arc<AtomicBool>,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected_while_permit_lives() {
        let guard = ActionGuard::new("analyze");
        let permit = guard.acquire().unwrap();
        assert!(matches!(guard.acquire(), Err(GarimpoError::Busy("analyze"))));
        drop(permit);
        assert!(guard.acquire().is_ok());
    }

    #[test]
    fn permit_releases_on_error_paths_too() {
        let guard = ActionGuard::new("tryon");
        {
            let _permit = guard.acquire().unwrap();
            // Simulated failure: permit dropped by unwinding scope.
        }
        assert!(guard.acquire().is_ok());
    }
}
