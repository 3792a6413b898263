use crate::options::EngineOptions;
use crate::util::random_duration;
use std::time::Instant;

/// When the auto-configuration of a unit is asserted again
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfigSchedule {
    next: Option<Instant>,
}

impl AutoConfigSchedule {
    /// Plans the next assertion a day or so from now. Every unit gets a different offset
    /// so they don't all fire at once.
    pub fn schedule(&mut self, now: Instant, options: &EngineOptions) {
        self.next = Some(now + options.auto_config_period + random_duration(options.auto_config_jitter));
    }

    pub fn cancel(&mut self) {
        self.next = None;
    }

    pub fn next(&self) -> Option<Instant> {
        self.next
    }

    pub fn due(&self, now: Instant) -> bool {
        self.next.is_some_and(|next| now >= next)
    }
}
