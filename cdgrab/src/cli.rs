/*!
# CDGrab: CLI
*/

use argyle::Argument;
use cdgrab_core::{
	DriveType,
	DumpOptions,
	GrabError,
	ReadMethod,
	ReadOffset,
	SectorOrder,
	SgTransport,
};
use dactyl::traits::{
	BytesToSigned,
	BytesToUnsigned,
};
use fyi_msg::Msg;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Work Mode.
///
/// Verbs execute left-to-right, in the order given.
pub(super) enum Verb {
	Dump,
	Refine,
	Protection,
	Split,
	Info,
	Rings,
	Subchannel,
	Debug,
}

impl Verb {
	/// # As Str.
	pub(super) const fn as_str(self) -> &'static str {
		match self {
			Self::Dump => "dump",
			Self::Refine => "refine",
			Self::Protection => "protection",
			Self::Split => "split",
			Self::Info => "info",
			Self::Rings => "rings",
			Self::Subchannel => "subchannel",
			Self::Debug => "debug",
		}
	}
}

/// # Parsed Invocation.
pub(super) struct Parsed {
	pub(super) verbs: Vec<Verb>,
	pub(super) drive: Option<String>,
	pub(super) opts: DumpOptions,
}



/// # Parse Options.
pub(super) fn parse() -> Result<Parsed, GrabError> {
	let args = argyle::args()
		.with_keywords(include!(concat!(env!("OUT_DIR"), "/argyle.rs")));

	let mut verbs = Vec::new();
	let mut drive = None;
	let mut opts = DumpOptions::default();

	for arg in args {
		match arg {
			Argument::Command("cd") => {
				verbs.extend([
					Verb::Dump,
					Verb::Protection,
					Verb::Refine,
					Verb::Split,
					Verb::Info,
				]);
			},
			Argument::Command("dump") => { verbs.push(Verb::Dump); },
			Argument::Command("refine") => { verbs.push(Verb::Refine); },
			Argument::Command("protection") => { verbs.push(Verb::Protection); },
			Argument::Command("split") => { verbs.push(Verb::Split); },
			Argument::Command("info") => { verbs.push(Verb::Info); },
			Argument::Command("rings") => { verbs.push(Verb::Rings); },
			Argument::Command("subchannel") => { verbs.push(Verb::Subchannel); },
			Argument::Command("debug") => { verbs.push(Verb::Debug); },

			Argument::Key("-h" | "--help") => return Err(GrabError::PrintHelp),
			Argument::Key("-V" | "--version") => return Err(GrabError::PrintVersion),
			Argument::Key("-v" | "--verbose") => { opts = opts.with_verbose(true); },
			Argument::Key("--overwrite") => { opts = opts.with_overwrite(true); },
			Argument::Key("--refine-subchannel") => { opts = opts.with_refine_subchannel(true); },
			Argument::Key("--disable-cdtext") => { opts = opts.with_disable_cdtext(true); },
			Argument::Key("--plextor-skip-leadin") => { opts = opts.with_plextor_skip_leadin(true); },
			Argument::Key("--asus-skip-leadout") => { opts = opts.with_asus_skip_leadout(true); },

			Argument::KeyWithValue("-d" | "--drive", s) => { drive.replace(s); },
			Argument::KeyWithValue("--speed", s) => {
				let s = u16::btou(s.trim().as_bytes())
					.ok_or(GrabError::CliParse("--speed"))?;
				opts = opts.with_speed(Some(s));
			},
			Argument::KeyWithValue("--retries", s) => {
				let s = u32::btou(s.trim().as_bytes())
					.ok_or(GrabError::CliParse("--retries"))?;
				opts = opts.with_retries(s);
			},
			Argument::KeyWithValue("--image-path", s) => { opts = opts.with_image_path(s); },
			Argument::KeyWithValue("--image-name", s) => { opts = opts.with_image_name(s); },
			Argument::KeyWithValue("--skip", s) => { opts = opts.with_skip(&s)?; },
			Argument::KeyWithValue("--lba-start", s) => {
				let s = i32::btoi(s.trim().as_bytes())
					.ok_or(GrabError::CliParse("--lba-start"))?;
				opts = opts.with_lba_start(Some(s));
			},
			Argument::KeyWithValue("--lba-end", s) => {
				let s = i32::btoi(s.trim().as_bytes())
					.ok_or(GrabError::CliParse("--lba-end"))?;
				opts = opts.with_lba_end(Some(s));
			},
			Argument::KeyWithValue("--drive-type", s) => {
				let s = DriveType::try_from(s.as_str())
					.map_err(|_| GrabError::CliParse("--drive-type"))?;
				opts = opts.with_drive_type(Some(s));
			},
			Argument::KeyWithValue("--drive-read-offset", s) => {
				let s = ReadOffset::try_from(s.as_str())
					.map_err(|_| GrabError::CliParse("--drive-read-offset"))?;
				opts = opts.with_drive_read_offset(Some(s));
			},
			Argument::KeyWithValue("--drive-c2-shift", s) => {
				let s = usize::btou(s.trim().as_bytes())
					.ok_or(GrabError::CliParse("--drive-c2-shift"))?;
				opts = opts.with_drive_c2_shift(Some(s));
			},
			Argument::KeyWithValue("--drive-pregap-start", s) => {
				let s = i32::btoi(s.trim().as_bytes())
					.ok_or(GrabError::CliParse("--drive-pregap-start"))?;
				opts = opts.with_drive_pregap_start(Some(s));
			},
			Argument::KeyWithValue("--drive-read-method", s) => {
				let s = ReadMethod::try_from(s.as_str())
					.map_err(|_| GrabError::CliParse("--drive-read-method"))?;
				opts = opts.with_drive_read_method(Some(s));
			},
			Argument::KeyWithValue("--drive-sector-order", s) => {
				let s = SectorOrder::try_from(s.as_str())
					.map_err(|_| GrabError::CliParse("--drive-sector-order"))?;
				opts = opts.with_drive_sector_order(Some(s));
			},

			Argument::Other(s) => {
				Msg::warning(format!("Unknown mode, skipping ({s}).")).eprint();
			},

			_ => {},
		}
	}

	// No verbs means the whole enchilada.
	if verbs.is_empty() {
		verbs.extend([
			Verb::Dump,
			Verb::Protection,
			Verb::Refine,
			Verb::Split,
			Verb::Info,
		]);
	}

	// Auto-detect the drive if a verb needs one.
	let drive_required = verbs.iter()
		.any(|v| matches!(v, Verb::Dump | Verb::Refine | Verb::Rings));
	if drive_required && drive.is_none() {
		let found = SgTransport::first_ready_drive().ok_or(GrabError::NoDrive)?;
		drive.replace(found.to_string_lossy().into_owned());
	}

	// Auto-generate the image name if a dump is on the menu.
	if verbs.contains(&Verb::Dump) && opts.image_name().is_empty() {
		let now = utc2k::Utc2k::now();
		let tag: String = drive.as_deref()
			.unwrap_or_default()
			.chars()
			.filter(|c| *c != ':' && *c != '/')
			.collect();
		opts = opts.with_image_name(format!(
			"dump_{:02}{:02}{:02}_{:02}{:02}{:02}_{tag}",
			now.year() % 100,
			now.month() as u8,
			now.day(),
			now.hour(),
			now.minute(),
			now.second(),
		));
	}

	Ok(Parsed { verbs, drive, opts })
}
