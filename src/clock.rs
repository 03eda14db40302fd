//! Discrete tick counter

/// Tick counter for one attempt. Starts at 0 when the attempt goes active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clock {
    tick: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move forward by exactly one tick
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Current tick
    pub fn now(&self) -> u64 {
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_zero() {
        assert_eq!(Clock::new().now(), 0);
    }

    #[test]
    fn test_clock_advances_one_tick_at_a_time() {
        let mut clock = Clock::new();
        for expected in 1..=5 {
            clock.advance();
            assert_eq!(clock.now(), expected);
        }
    }
}
