// kernel/src/logger.rs: `log` backend that forwards records to COM1.
use crate::serial;
use log::{LevelFilter, Log, Metadata, Record};

const LOG_LEVEL: &str = match option_env!("LASKAR_LOG") {
    Some(value) => value,
    None => "info",
};

struct SerialLogger;

static LOGGER: SerialLogger = SerialLogger;

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        serial::write_fmt(format_args!(
            "[{:<5} {}] {}\n",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

#[derive(Clone, Copy)]
pub struct LoggerInitReport {
    pub level: LevelFilter,
    pub installed: bool,
}

pub fn init() -> LoggerInitReport {
    let level = parse_level(LOG_LEVEL);
    let installed = log::set_logger(&LOGGER).is_ok();
    if installed {
        log::set_max_level(level);
    }
    LoggerInitReport { level, installed }
}

fn parse_level(raw: &str) -> LevelFilter {
    match raw.trim() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}
