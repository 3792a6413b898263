use crate::{LogFormatter, LogInfo, Logger, Loglevel, formatters::DefaultFormatter};
use std::io::Write;
use termcolor::{ColorChoice, StandardStream, WriteColor};

/// Formats log records and writes them to a (colored) output stream
pub struct BaseLogger {
    pub level: Loglevel,
    pub writer: Box<dyn WriteColor + Send>,
    pub formatter: Box<dyn LogFormatter + Send>,
}

impl BaseLogger {
    pub fn new(
        level: Loglevel,
        writer: Box<dyn WriteColor + Send>,
        formatter: Box<dyn LogFormatter + Send>,
    ) -> Self {
        Self {
            level,
            writer,
            formatter,
        }
    }

    /// Logs to stdout with the default formatter, using colors if the terminal supports them
    pub fn stdout(level: Loglevel) -> Self {
        Self::new(
            level,
            Box::new(StandardStream::stdout(ColorChoice::Auto)),
            Box::new(DefaultFormatter::new()),
        )
    }
}

impl Logger for BaseLogger {
    fn log(&mut self, log: LogInfo, level: Loglevel) {
        if level > self.level {
            return;
        }
        let formatted = self.formatter.format_log(&log, level);
        for str in formatted {
            if let Some(color) = str.color {
                let _ = self.writer.set_color(&color);
            }
            let _ = self.writer.write_all(str.string.as_bytes());
        }
        let _ = self.writer.reset();
        let _ = self.writer.flush();
    }

    fn log_level(&self) -> Loglevel {
        self.level
    }

    fn set_log_level(&mut self, level: Loglevel) {
        self.level = level;
    }
}
