//! Trailing debounce for validation passes.
//!
//! Time is passed in by the caller (milliseconds, e.g. `performance.now()`
//! on the JS side) so the core never reads a clock.

#[derive(Debug, Clone, PartialEq)]
pub struct Debouncer {
    delay_ms: f64,
    due_at: Option<f64>,
}

impl Debouncer {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms: delay_ms.max(0.0),
            due_at: None,
        }
    }

    /// Record a request at `now_ms`. Each request pushes the deadline back.
    pub fn request(&mut self, now_ms: f64) {
        self.due_at = Some(now_ms + self.delay_ms);
    }

    pub fn is_pending(&self) -> bool {
        self.due_at.is_some()
    }

    /// True once the quiet period has elapsed; clears the pending request.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.due_at {
            Some(due) if now_ms >= due => {
                self.due_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.due_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_coalesces_into_one_fire() {
        let mut d = Debouncer::new(100.0);
        for t in [0.0, 30.0, 60.0, 90.0] {
            d.request(t);
            assert!(!d.poll(t + 1.0));
        }
        assert!(!d.poll(189.0));
        assert!(d.poll(190.0));
        assert!(!d.poll(400.0));
    }

    #[test]
    fn test_cancel_drops_pending_request() {
        let mut d = Debouncer::new(100.0);
        d.request(0.0);
        d.cancel();
        assert!(!d.is_pending());
        assert!(!d.poll(500.0));
    }
}
