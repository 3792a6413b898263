use crate::{ImmutableLogger, LogInfo, Logger, Loglevel};
use std::{
    sync::{
        Mutex, RwLock,
        mpsc::{self, Sender},
    },
    thread::JoinHandle,
};

enum LogTaskCommand {
    Log(LogInfo, Loglevel),
    UseLogLevel(Loglevel),
}

/// Forwards log records to a dedicated thread, which owns the actual [Logger].
/// Dropping the background logger flushes all pending records and stops the thread.
pub struct BackgroundLogger {
    cmd_tx: Mutex<Option<Sender<LogTaskCommand>>>,
    level: RwLock<Loglevel>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundLogger {
    pub fn spawn(mut logger: impl Logger + Send + 'static) -> std::io::Result<Self> {
        let level = logger.log_level();
        let (cmd_tx, cmd_rx) = mpsc::channel::<LogTaskCommand>();

        let handle = std::thread::Builder::new()
            .name("zwave-log".into())
            .spawn(move || {
                // Ends when all senders are gone
                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        LogTaskCommand::Log(log, level) => logger.log(log, level),
                        LogTaskCommand::UseLogLevel(level) => logger.set_log_level(level),
                    }
                }
            })?;

        Ok(Self {
            cmd_tx: Mutex::new(Some(cmd_tx)),
            level: RwLock::new(level),
            handle: Some(handle),
        })
    }

    fn send(&self, cmd: LogTaskCommand) {
        if let Ok(tx) = self.cmd_tx.lock() {
            if let Some(tx) = tx.as_ref() {
                let _ = tx.send(cmd);
            }
        }
    }
}

impl ImmutableLogger for BackgroundLogger {
    fn log(&self, log: LogInfo, level: Loglevel) {
        if !self.enabled(level) {
            return;
        }
        self.send(LogTaskCommand::Log(log, level));
    }

    fn log_level(&self) -> Loglevel {
        self.level.read().map(|l| *l).unwrap_or(Loglevel::Info)
    }

    fn set_log_level(&self, level: Loglevel) {
        if let Ok(mut l) = self.level.write() {
            *l = level;
        }
        self.send(LogTaskCommand::UseLogLevel(level));
    }
}

impl Drop for BackgroundLogger {
    fn drop(&mut self) {
        if let Ok(mut tx) = self.cmd_tx.lock() {
            tx.take();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
