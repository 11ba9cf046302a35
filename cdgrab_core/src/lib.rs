/*!
# CDGrab: Library
*/

#![deny(unsafe_code)]

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

#![allow(
	clippy::doc_markdown,
	clippy::module_name_repetitions,
	clippy::redundant_pub_crate,
)]

mod abort;
mod drive;
mod dump;
mod error;
mod iso9660;
mod log;
mod msf;
mod psx;
mod scrambler;
#[cfg(target_os = "linux")] mod sgio;
mod stream;
mod subcode;
mod toc;
mod transport;

pub use abort::KillSwitch;
pub use drive::{
	DriveConfig,
	DriveType,
	ReadMethod,
	ReadOffset,
	SectorLayout,
	SectorOrder,
	sector_order_layout,
};
pub use dump::{
	dump,
	opts::DumpOptions,
	state::State,
};
pub use error::GrabError;
pub use iso9660::ImageBrowser;
pub use log::EventLog;
pub use msf::{
	Msf,
	inside_range,
	parse_ranges,
};
pub use psx::SystemPsx;
pub use scrambler::Scrambler;
#[cfg(target_os = "linux")] pub use sgio::SgTransport;
pub use subcode::{
	ChannelQ,
	Subchannel,
	subcode_extract_channel,
};
pub use toc::{
	Session,
	Toc,
	Track,
};
pub use transport::{
	CddaSubCode,
	DriveTransport,
	ErrorField,
	ReadType,
	ScsiStatus,
	SubchannelMode,
};



/// # Size of the main-channel data block.
pub const CD_DATA_SIZE: usize = 2352;

/// # Size of the C2 error-pointer block.
///
/// One bit per data byte. Some drives support a 296-byte variation with two
/// extra block-summary bytes, but the 294-byte form is canonical.
pub const CD_C2_SIZE: usize = 294;

/// # Size of a raw interleaved subchannel block.
pub const CD_SUBCODE_SIZE: usize = 96;

/// # Size of one fully-raw sector: data + C2 + subchannel.
pub const CD_RAW_DATA_SIZE: usize = CD_DATA_SIZE + CD_C2_SIZE + CD_SUBCODE_SIZE;

/// # Bytes per 16-bit stereo sample.
pub const CD_SAMPLE_SIZE: usize = 4;

/// # Samples per sector.
pub const CD_DATA_SIZE_SAMPLES: usize = CD_DATA_SIZE.wrapping_div(CD_SAMPLE_SIZE);

/// # Sync pattern opening every data sector.
pub const CD_DATA_SYNC: [u8; 12] = [
	0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];

/// # MSF 00:00:00 sits this many sectors before LBA 0.
pub const MSF_LBA_SHIFT: i32 = 150;

/// # First addressable LBA.
///
/// The BCD MSF coordinate space wraps at 90:00:00, so the disc space —
/// lead-in included — begins at `90:00:00 - 00:02:00` relative to zero.
pub const LBA_START: i32 = 90 * 60 * 75 - 450_000 - MSF_LBA_SHIFT;

/// # Seconds before a successful read is considered "slow".
pub const SLOW_SECTOR_TIMEOUT: u64 = 5;

/// # Lead-out sectors to pull from an LG/ASUS cache dump.
pub(crate) const ASUS_LEADOUT_COUNT: usize = 100;

/// # Size of one Plextor lead-in table entry: status + data + C2 + subcode.
pub(crate) const PLEXTOR_LEADIN_ENTRY_SIZE: usize = 4 + CD_RAW_DATA_SIZE;



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_constants() {
		assert_eq!(CD_RAW_DATA_SIZE, 2742);
		assert_eq!(CD_DATA_SIZE_SAMPLES, 588);
		assert_eq!(LBA_START, -45_150);
	}
}
