use log::{set_max_level, Level, LevelFilter, Metadata, Record, SetLoggerError};

static LOGGER: Logger = Logger;

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    set_max_level(level);
    Ok(())
}

struct Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => " WARN",
            Level::Info => " INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let file = record.file().unwrap_or("?");
        let line = record.line().unwrap_or(0);
        // a single println! keeps lines from different threads intact
        println!("[{}]: {}@{}: {}", tag, file, line, record.args());
    }

    fn flush(&self) {}
}
