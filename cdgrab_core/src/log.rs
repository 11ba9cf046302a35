/*!
# CDGrab: Event Log
*/

use fyi_msg::Msg;
use std::{
	fs::File,
	io::Write,
	path::Path,
};
use utc2k::FmtUtc2k;



#[derive(Debug, Default)]
/// # Event Log.
///
/// Every invocation resets `<name>.log` and appends the run's notable
/// events to it, timestamped. Console chatter goes through `fyi_msg` so
/// the progress bar can keep its footing.
pub struct EventLog {
	file: Option<File>,
}

impl EventLog {
	#[must_use]
	/// # New.
	///
	/// Truncate and open the log file. Logging is best-effort: if the file
	/// cannot be created, events simply go unrecorded.
	pub fn new(path: &Path) -> Self {
		let file = File::create(path);
		if file.is_err() {
			Msg::warning(format!(
				"Unable to reset the log ({}).",
				path.to_string_lossy(),
			)).eprint();
		}
		Self { file: file.ok() }
	}

	#[must_use]
	/// # Silent Log.
	///
	/// A sink that records nothing, for contexts with no image prefix.
	pub const fn sink() -> Self { Self { file: None } }

	/// # Record a Line.
	///
	/// File only; the console doesn't need to hear about every sector.
	pub fn line(&mut self, msg: &str) {
		if let Some(file) = &mut self.file {
			let _res = writeln!(file, "[{}] {msg}", FmtUtc2k::now());
		}
	}

	/// # Record and Print.
	pub fn echo(&mut self, msg: &str) {
		eprintln!("{msg}");
		self.line(msg);
	}

	/// # Record a Warning.
	///
	/// Printed with the usual warning prefix, and kept for posterity.
	pub fn warning(&mut self, msg: &str) {
		Msg::warning(msg).eprint();
		self.line(&format!("warning: {msg}"));
	}
}
