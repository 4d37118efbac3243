// SPDX-License-Identifier: MPL-2.0

use std::{io::Write, sync::LazyLock, time::Instant};

use log::{LevelFilter, Metadata, Record};

/// The logger of `nlctl`, which writes to stderr.
struct NlctlLogger;

static LOGGER: NlctlLogger = NlctlLogger;

static START: LazyLock<Instant> = LazyLock::new(Instant::now);

impl log::Log for NlctlLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = START.elapsed().as_secs_f64();
        print_logs(record, timestamp);
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[cfg(feature = "log_color")]
fn print_logs(record: &Record, timestamp: f64) {
    use owo_colors::Style;

    let timestamp_style = Style::new().green();
    let record_style = Style::new().default_color();
    let level_style = match record.level() {
        log::Level::Error => Style::new().red(),
        log::Level::Warn => Style::new().bright_yellow(),
        log::Level::Info => Style::new().blue(),
        log::Level::Debug => Style::new().bright_green(),
        log::Level::Trace => Style::new().bright_black(),
    };

    // Holding the lock keeps concurrent records from interleaving.
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(
        stderr,
        "{} {:<5}: {}",
        timestamp_style.style(format_args!("[{:>10.3}]", timestamp)),
        level_style.style(record.level()),
        record_style.style(record.args())
    );
}

#[cfg(not(feature = "log_color"))]
fn print_logs(record: &Record, timestamp: f64) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(
        stderr,
        "{} {:<5}: {}",
        format_args!("[{:>10.3}]", timestamp),
        record.level(),
        record.args()
    );
}

/// Maps the number of `-v` flags to a level filter.
pub(crate) fn level_filter(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub(crate) fn init(level: LevelFilter) {
    LazyLock::force(&START);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
