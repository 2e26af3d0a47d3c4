use std::time::SystemTime;

use log::Level;
use nu_ansi_term::ansi::RESET;
use nu_ansi_term::{Color, Style};

/// A small ANSI log formatter, installed process-wide by [`init`].
///
/// Every subsystem in this workspace logs through the `log` facade rather
/// than `eprintln!`; this is the one place that actually writes to stderr.
struct Logger;

impl log::Log for Logger {
	fn enabled(&self, _: &log::Metadata) -> bool {
		true
	}

	fn log(&self, record: &log::Record) {
		let time = humantime::format_rfc3339_nanos(SystemTime::now());
		let dim = Style::new().dimmed().prefix();

		eprintln!(
			"{dim}{time}{RESET} {}{:5}{RESET} {}{}{RESET}{dim}:{RESET} {}",
			match record.level() {
				Level::Trace => Color::Purple,
				Level::Debug => Color::Blue,
				Level::Info => Color::Green,
				Level::Warn => Color::Yellow,
				Level::Error => Color::Red,
			}
			.bold()
			.prefix(),
			record.level(),
			Style::new().bold().prefix(),
			record.target(),
			record.args()
		);
	}

	fn flush(&self) {}
}

/// Installs [`Logger`] as the global `log` sink at the given max level.
///
/// Idempotent: a second call is reported (by `log::set_boxed_logger`) and
/// ignored rather than panicking, so a host embedding this crate alongside
/// another `log`-based component can call `init` defensively.
pub fn init(level: log::LevelFilter) {
	if log::set_boxed_logger(Box::new(Logger)).is_ok() {
		log::set_max_level(level);
	}
}
