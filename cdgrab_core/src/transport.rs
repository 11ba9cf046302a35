/*!
# CDGrab: Drive Transport
*/

use crate::GrabError;
use std::fmt;



/// # Sense Key Labels.
const SENSE_KEYS: [&str; 16] = [
	"NO SENSE", "RECOVERED ERROR", "NOT READY", "MEDIUM ERROR",
	"HARDWARE ERROR", "ILLEGAL REQUEST", "UNIT ATTENTION", "DATA PROTECT",
	"BLANK CHECK", "VENDOR SPECIFIC", "COPY ABORTED", "ABORTED COMMAND",
	"EQUAL", "VOLUME OVERFLOW", "MISCOMPARE", "COMPLETED",
];



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # SCSI Command Status.
///
/// The status byte plus the interesting parts of the sense data. All-zero
/// means the command went through.
pub struct ScsiStatus {
	pub status: u8,
	pub sense_key: u8,
	pub asc: u8,
	pub ascq: u8,
}

impl ScsiStatus {
	/// # Success.
	pub const GOOD: Self = Self { status: 0, sense_key: 0, asc: 0, ascq: 0 };

	#[must_use]
	/// # Good?
	pub const fn is_good(self) -> bool { self.status == 0 }

	#[must_use]
	/// # As Bytes.
	///
	/// Fixed four-byte form used by the Plextor lead-in entry table.
	pub const fn to_bytes(self) -> [u8; 4] {
		[self.status, self.sense_key, self.asc, self.ascq]
	}

	#[must_use]
	/// # From Bytes.
	pub const fn from_bytes(raw: [u8; 4]) -> Self {
		Self {
			status: raw[0],
			sense_key: raw[1],
			asc: raw[2],
			ascq: raw[3],
		}
	}
}

impl fmt::Display for ScsiStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_good() { f.write_str("GOOD") }
		else {
			write!(
				f,
				"{}, ASC {:02X}, ASCQ {:02X}",
				SENSE_KEYS[usize::from(self.sense_key & 0x0F)],
				self.asc,
				self.ascq,
			)
		}
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # READ CD Expected Sector Type.
pub enum ReadType {
	AllTypes,
	Cdda,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # READ CD Error Field.
pub enum ErrorField {
	None,
	C2,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # READ CD Subchannel Selection.
pub enum SubchannelMode {
	None,
	Raw,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Plextor `D8` Subcode Selection.
pub enum CddaSubCode {
	Data,
	DataSub,
	DataC2Sub,
}



/// # Drive Transport.
///
/// The SCSI pass-through boundary. The engine issues one command at a time
/// through this interface; everything below it — SG_IO, a remote bridge, a
/// synthetic disc in a test — is interchangeable.
///
/// Sector-read commands report failure in-band as [`ScsiStatus`]; only
/// plumbing breakage (a dead ioctl, say) surfaces as [`GrabError`].
pub trait DriveTransport {
	/// # Vendor/Product Identification.
	///
	/// ## Errors
	///
	/// Returns an error if INQUIRY itself cannot be delivered.
	fn inquiry(&mut self) -> Result<(String, String), GrabError>;

	/// # Test Unit Ready.
	fn drive_ready(&mut self) -> ScsiStatus;

	/// # Set Read Speed.
	///
	/// The value is in kB/s; `0xFFFF` means "as fast as possible".
	fn set_speed(&mut self, speed: u16) -> ScsiStatus;

	/// # Read TOC.
	///
	/// ## Errors
	///
	/// Returns an error if the response cannot be obtained at all.
	fn read_toc(&mut self) -> Result<Vec<u8>, GrabError>;

	/// # Read Full TOC.
	///
	/// ## Errors
	///
	/// Returns an error if the response cannot be obtained at all.
	fn read_full_toc(&mut self) -> Result<Vec<u8>, GrabError>;

	/// # Read CD-TEXT.
	///
	/// Appends the raw response to `out`; the status tells whether the
	/// drive had anything to say.
	fn read_cd_text(&mut self, out: &mut Vec<u8>) -> ScsiStatus;

	/// # READ CD (`BE`).
	fn read_cd(
		&mut self,
		dst: &mut [u8],
		lba: i32,
		count: u32,
		kind: ReadType,
		c2: ErrorField,
		sub: SubchannelMode,
	) -> ScsiStatus;

	/// # READ CD-DA (`D8`, Plextor).
	fn read_cdda(
		&mut self,
		dst: &mut [u8],
		lba: i32,
		count: u32,
		sub: CddaSubCode,
	) -> ScsiStatus;

	/// # Flush the Drive Cache.
	fn flush_cache(&mut self, lba: i32) -> ScsiStatus;

	/// # Plextor: Read Lead-In.
	///
	/// Returns a table of `sectors` entries, each `status ‖ data ‖ C2 ‖
	/// subcode`.
	///
	/// ## Errors
	///
	/// Returns an error if the vendor command cannot be delivered.
	fn plextor_read_leadin(&mut self, sectors: u32) -> Result<Vec<u8>, GrabError>;

	/// # LG/ASUS: Dump the DRAM Cache.
	///
	/// ## Errors
	///
	/// Returns an error if the vendor command cannot be delivered.
	fn asus_cache_read(&mut self) -> Result<Vec<u8>, GrabError>;
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_status() {
		assert!(ScsiStatus::GOOD.is_good());

		let bad = ScsiStatus { status: 2, sense_key: 3, asc: 0x11, ascq: 0x05 };
		assert!(! bad.is_good());
		assert_eq!(ScsiStatus::from_bytes(bad.to_bytes()), bad);
		assert!(bad.to_string().contains("MEDIUM ERROR"));
	}
}
