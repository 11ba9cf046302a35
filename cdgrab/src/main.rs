/*!
# CDGrab
*/

#![forbid(unsafe_code)]

#![warn(
	clippy::filetype_is_file,
	clippy::integer_division,
	clippy::needless_borrow,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::suboptimal_flops,
	clippy::unneeded_field_pattern,
	macro_use_extern_crate,
	missing_copy_implementations,
	missing_debug_implementations,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unreachable_pub,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

mod cli;

use cdgrab_core::{
	CD_DATA_SIZE_SAMPLES,
	CD_SUBCODE_SIZE,
	ChannelQ,
	DumpOptions,
	GrabError,
	KillSwitch,
	LBA_START,
	SgTransport,
	SystemPsx,
	dump,
};
use cli::{
	Parsed,
	Verb,
};
use dactyl::{
	NiceElapsed,
	NiceU32,
};
use fyi_msg::{
	Msg,
	Progless,
};
use std::sync::{
	Arc,
	atomic::{
		AtomicBool,
		Ordering::{
			Relaxed,
			SeqCst,
		},
	},
};



/// # Main.
///
/// This lets us bubble up startup errors so they can be pretty-printed.
fn main() {
	match _main() {
		Ok(()) => {},
		Err(GrabError::PrintVersion) => {
			println!(concat!("CDGrab v", env!("CARGO_PKG_VERSION")));
		},
		Err(GrabError::PrintHelp) => { helper(); },
		Err(e) => {
			Msg::from(e).eprint();
			std::process::exit(1);
		},
	}
}

#[inline]
/// # Actual Main.
///
/// This does all the stuff.
fn _main() -> Result<(), GrabError> {
	let Parsed { verbs, drive, opts } = cli::parse()?;

	// Hook up CTRL+C before anything long-running starts.
	let killed = KillSwitch::default();
	sigint(killed.inner());

	// The drive is exclusive; open it once and share.
	let mut transport = None;
	if verbs.iter().any(|v| matches!(v, Verb::Dump | Verb::Refine)) {
		let dev = drive.as_deref().ok_or(GrabError::NoDrive)?;
		transport.replace(SgTransport::open(dev)?);
	}

	let now = std::time::Instant::now();
	let mut skip_refine = false;
	for verb in verbs {
		if killed.killed() { break; }

		// Skip refine if a preceding dump came back clean.
		if skip_refine && matches!(verb, Verb::Refine) { continue; }

		eprintln!("\x1b[2m*** MODE: {}\x1b[0m", verb.as_str());

		match verb {
			Verb::Dump => {
				let Some(t) = transport.as_mut() else { return Err(GrabError::NoDrive); };
				let progress = progless()?;
				skip_refine = ! dump(t, &opts, false, &progress, &killed)?;
			},
			Verb::Refine => {
				let Some(t) = transport.as_mut() else { return Err(GrabError::NoDrive); };
				let progress = progless()?;
				dump(t, &opts, true, &progress, &killed)?;
			},
			Verb::Protection => {
				if opts.image_name().is_empty() { return Err(GrabError::ImageName); }
				match SystemPsx::new(opts.image_path(), opts.image_name()).report()? {
					Some(report) => { print!("{report}"); },
					None => {
						Msg::warning("Not a PlayStation data disc; nothing to report.").eprint();
					},
				}
			},
			Verb::Subchannel => { subchannel(&opts)?; },
			Verb::Debug => { debug_state(&opts)?; },
			Verb::Split | Verb::Info | Verb::Rings => {
				Msg::warning(format!("The {} mode is not supported by this build.", verb.as_str())).eprint();
			},
		}
	}

	if killed.killed() { Err(GrabError::Killed) }
	else {
		Msg::success(format!("Finished in {}.", NiceElapsed::from(now))).eprint();
		Ok(())
	}
}

/// # Decode a Subchannel Stream.
///
/// Print the Q contents of every non-empty sector of an existing
/// `.subcode`, collapsing silence into ellipses.
fn subchannel(opts: &DumpOptions) -> Result<(), GrabError> {
	if opts.image_name().is_empty() { return Err(GrabError::ImageName); }
	let path = opts.image_path().join(format!("{}.subcode", opts.image_name()));
	let raw = std::fs::read(&path)
		.map_err(|_| GrabError::FileOpen(path.to_string_lossy().into_owned()))?;

	let mut empty = false;
	for (lba_index, chunk) in raw.chunks_exact(CD_SUBCODE_SIZE).enumerate() {
		let q = ChannelQ::from_subcode(chunk);

		if q.is_empty() {
			if ! empty {
				println!("...");
				empty = true;
			}
			continue;
		}
		empty = false;

		println!(
			"[LBA: {:6}, LBAQ: {:6}] {}",
			LBA_START + lba_index as i32,
			q.a_lba(),
			q.decode(),
		);
	}

	Ok(())
}

/// # State Distribution.
///
/// Tally an existing `.state` by provenance; a quick health check without
/// firing up the drive.
fn debug_state(opts: &DumpOptions) -> Result<(), GrabError> {
	if opts.image_name().is_empty() { return Err(GrabError::ImageName); }
	let path = opts.image_path().join(format!("{}.state", opts.image_name()));
	let raw = std::fs::read(&path)
		.map_err(|_| GrabError::FileOpen(path.to_string_lossy().into_owned()))?;

	let mut counts = [0_u32; 5];
	for b in &raw {
		counts[usize::from(*b).min(4)] += 1;
	}

	println!("sectors: {}", NiceU32::from((raw.len().wrapping_div(CD_DATA_SIZE_SAMPLES)) as u32));
	for (label, count) in [
		("ERROR_SKIP", counts[0]),
		("ERROR_C2", counts[1]),
		("SUCCESS_C2_OFF", counts[2]),
		("SUCCESS_SCSI_OFF", counts[3]),
		("SUCCESS", counts[4]),
	] {
		println!("  {label}: {}", NiceU32::from(count));
	}

	Ok(())
}

/// # Fresh Progress Bar.
fn progless() -> Result<Progless, GrabError> {
	Progless::try_from(1_u32)
		.map_err(|_| GrabError::Bug("Unable to initialize the progress bar."))
}

/// # Hook Up CTRL+C.
fn sigint(killed: Arc<AtomicBool>) {
	let _res = ctrlc::set_handler(move || {
		let _res = killed.compare_exchange(false, true, SeqCst, Relaxed);
	});
}

#[cold]
/// # Print Help.
fn helper() {
	println!(concat!(
		"\x1b[38;5;199mCDGrab\x1b[0;38;5;69m v", env!("CARGO_PKG_VERSION"), "\x1b[0m", r#"
Bit-accurate CD-ROM dumping and recovery.

USAGE:
    cdgrab [MODE(s)] [OPTIONS]

MODES:
    Modes execute left-to-right in the order given.

    cd                Alias for: dump protection refine split info.
    dump              Dump the disc in the selected drive.
    refine            Re-read and merge any sectors that previously erred.
    protection        Analyze a PlayStation dump (serial, region, EDC,
                      anti-modchip, libcrypt).
    subchannel        Print the decoded Q subchannel of an existing dump.
    debug             Print the state distribution of an existing dump.

BASIC SETTINGS:
    -d, --drive <PATH>
                      The optical drive to read from, like /dev/sr0.
                      [default: the first ready drive]
        --image-name <NAME>
                      The shared file-name prefix for the dump streams.
                      [default: dump_<timestamp>_<drive>]
        --image-path <DIR>
                      Where the streams should live. [default: .]
        --retries <NUM>
                      Re-read attempts per bad sector and refine pass.
        --speed <NUM> Read speed as a CD multiplier (each unit is
                      150 kB/s). [default: as fast as possible]
        --overwrite   Allow dump to clobber an existing image.

FINE TUNING:
        --skip <RANGES>
                      Inclusive LBA ranges to skip, like 1000-2000, with
                      multiple ranges joined by colons.
        --lba-start <LBA>, --lba-end <LBA>
                      Restrict the dump window.
        --refine-subchannel
                      During refine, also re-read sectors whose stored Q
                      fails its CRC.
        --disable-cdtext
                      Skip the CD-TEXT capture.
        --plextor-skip-leadin, --asus-skip-leadout
                      Skip the vendor lead-in/lead-out tricks.

DRIVE OVERRIDES:
        --drive-type <GENERIC|PLEXTOR|LG_ASU8|LG_ASU8A|LG_ASU8B|LG_ASU3>
        --drive-read-offset <SAMPLES>
        --drive-c2-shift <BYTES>
        --drive-pregap-start <LBA>
        --drive-read-method <BE|BE_CDDA|D8>
        --drive-sector-order <DATA_C2_SUB|DATA_SUB_C2|DATA_SUB|DATA_C2>

MISCELLANEOUS:
    -h, --help        Print help information and exit.
    -v, --verbose     Log every per-sector error as it happens.
    -V, --version     Print version information and exit.
"#
	));
}
