use crate::{ImmutableLogger, LogInfo, Loglevel};
use std::sync::{Mutex, RwLock};
use zwave_core::log::FlattenLog;

/// Keeps every record it receives in memory. Meant for tests.
pub struct CapturingLogger {
    level: RwLock<Loglevel>,
    records: Mutex<Vec<(LogInfo, Loglevel)>>,
}

impl Default for CapturingLogger {
    fn default() -> Self {
        Self::new(Loglevel::Silly)
    }
}

impl CapturingLogger {
    pub fn new(level: Loglevel) -> Self {
        Self {
            level: RwLock::new(level),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<(LogInfo, Loglevel)> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Every record as a single line: `LABEL [tag] [tag] text`
    pub fn lines(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .map(|(log, _)| {
                let mut ret = String::from(log.label);
                for tag in log.primary_tags.iter().flatten() {
                    ret.push_str(&format!(" [{}]", tag));
                }
                for line in log.payload.flatten_log() {
                    ret.push(' ');
                    ret.push_str(line.trim());
                }
                ret
            })
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}

impl ImmutableLogger for CapturingLogger {
    fn log(&self, log: LogInfo, level: Loglevel) {
        if !self.enabled(level) {
            return;
        }
        if let Ok(mut records) = self.records.lock() {
            records.push((log, level));
        }
    }

    fn log_level(&self) -> Loglevel {
        self.level.read().map(|l| *l).unwrap_or(Loglevel::Silly)
    }

    fn set_log_level(&self, level: Loglevel) {
        if let Ok(mut l) = self.level.write() {
            *l = level;
        }
    }
}
