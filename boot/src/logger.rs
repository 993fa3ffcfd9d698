use core::fmt;

use log::{Level, LevelFilter, Metadata, Record};

const MAX_LEVEL: LevelFilter = if cfg!(feature = "verbose") {
    LevelFilter::Debug
} else {
    LevelFilter::Info
};

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

#[cfg(target_os = "none")]
fn emit(args: fmt::Arguments) {
    use core::fmt::Write;

    let _ = crate::uart::Uart.write_fmt(args);
}

#[cfg(not(target_os = "none"))]
fn emit(args: fmt::Arguments) {
    eprint!("{}", args);
}

pub fn init() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(MAX_LEVEL);
    }
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let color = match record.level() {
            Level::Error => "\x1b[1;31m",
            Level::Warn => "\x1b[1;33m",
            Level::Info => "\x1b[1;94m",
            Level::Debug => "\x1b[1;30m",
            Level::Trace => "\x1b[1;90m",
        };

        emit(format_args!(
            "{}{:5}\x1b[0m [{}] {}\n",
            color,
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}
