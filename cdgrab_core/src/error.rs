/*!
# CDGrab: Errors
*/

use fyi_msg::Msg;
use std::{
	error::Error,
	fmt,
};



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Errors.
///
/// Only the fatal stuff lives here. Per-sector trouble — SCSI errors, C2
/// bits, bad Q CRCs — is recorded in counters and the state file so later
/// passes can chew on it; it never bubbles up as an error.
pub enum GrabError {
	/// # Bug!
	Bug(&'static str),

	/// # Invalid device path.
	Device(String),

	/// # Unable to open the device.
	DeviceOpen(String),

	/// # Drive not ready.
	DriveNotReady(String),

	/// # Dump already exists.
	ImageExists(String),

	/// # Missing image name.
	ImageName,

	/// # User abort.
	Killed,

	/// # Refine across read methods.
	MixedReadMethods,

	/// # No usable drive detected.
	NoDrive,

	/// # Unable to open a required file.
	FileOpen(String),

	/// # Unable to read from a file.
	FileRead(String),

	/// # Unable to write to a file.
	FileWrite(String),

	/// # Invalid read offset.
	ReadOffset,

	/// # SCSI plumbing failure.
	Scsi(String),

	/// # Invalid skip ranges.
	SkipRanges(String),

	/// # Unparseable TOC response.
	TocParse,

	/// # Disc/file TOC mismatch on refine.
	TocMismatch,

	/// # BE read method on a mixed data/audio disc.
	UnsupportedReadMethod,

	#[cfg(feature = "bin")]
	/// # CLI parsing failure.
	CliParse(&'static str),

	#[cfg(feature = "bin")]
	/// # Print Help (Not an Error).
	PrintHelp,

	#[cfg(feature = "bin")]
	/// # Print Version (Not an Error).
	PrintVersion,
}

impl Error for GrabError {}

impl From<GrabError> for Msg {
	#[inline]
	fn from(src: GrabError) -> Self { Self::error(src.to_string()) }
}

impl fmt::Display for GrabError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Bug(s) => write!(f, "Bug: {s}."),
			Self::Device(s) => write!(f, "Invalid device path {s}."),
			Self::DeviceOpen(s) => write!(f, "Unable to open connection with {s}."),
			Self::DriveNotReady(s) => write!(f, "Drive not ready, SCSI ({s})."),
			Self::ImageExists(s) => write!(f, "Dump already exists (name: {s}); pass --overwrite to start over."),
			Self::ImageName => f.write_str("Image name is not provided."),
			Self::Killed => f.write_str("User abort."),
			Self::MixedReadMethods => f.write_str("Refining using mixed read methods is unsupported."),
			Self::NoDrive => f.write_str("No ready drives detected on the system."),
			Self::FileOpen(s) => write!(f, "Unable to open file ({s})."),
			Self::FileRead(s) => write!(f, "Unable to read file ({s})."),
			Self::FileWrite(s) => write!(f, "Unable to write to {s}."),
			Self::ReadOffset => f.write_str("Invalid read offset."),
			Self::Scsi(s) => write!(f, "SCSI pass-through failure ({s})."),
			Self::SkipRanges(s) => write!(f, "Invalid skip ranges ({s})."),
			Self::TocParse => f.write_str("Unable to parse the disc TOC."),
			Self::TocMismatch => f.write_str("Disc / file TOC don't match; refining from a different disc?"),
			Self::UnsupportedReadMethod => f.write_str("Unsupported drive read method for mixed data/audio."),

			#[cfg(feature = "bin")]
			Self::CliParse(s) => write!(f, "Unable to parse {s}."),

			#[cfg(feature = "bin")]
			Self::PrintHelp => f.write_str("help"),

			#[cfg(feature = "bin")]
			Self::PrintVersion => f.write_str(concat!("CDGrab v", env!("CARGO_PKG_VERSION"))),
		}
	}
}
