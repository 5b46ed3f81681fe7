use std::time::{Duration, Instant};

/// Logs the time spent in a scope when dropped.
pub struct ScopedTimer {
    label: String,
    level: log::Level,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            level: log::Level::Info,
            start: Instant::now(),
        }
    }

    /// Timer for hot paths, only visible with debug logging.
    pub fn debug(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            level: log::Level::Debug,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::log!(self.level, "{} took {:?}", self.label, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_timer_keeps_its_label_and_level() {
        let timer = ScopedTimer::debug("connection");
        assert_eq!(timer.label, "connection");
        assert_eq!(timer.level, log::Level::Debug);
        assert!(timer.elapsed() < Duration::from_secs(60));
    }
}
