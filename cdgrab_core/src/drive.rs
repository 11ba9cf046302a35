/*!
# CDGrab: Drive Abstraction
*/

use crate::{
	CD_C2_SIZE,
	CD_DATA_SIZE,
	CD_RAW_DATA_SIZE,
	CD_SUBCODE_SIZE,
	ChannelQ,
	CddaSubCode,
	DriveTransport,
	ErrorField,
	GrabError,
	ReadType,
	ScsiStatus,
	SubchannelMode,
};
use dactyl::traits::BytesToSigned;
use std::fmt;



/// # Min Offset.
const MIN_OFFSET: i16 = -5880;

/// # Max Offset.
const MAX_OFFSET: i16 = 5880;

/// # Known Drives.
///
/// Vendor quirks are data: everything a drive needs other than the two
/// vendor cache strategies fits in a row here. Offsets are in samples, à la
/// AccurateRip.
const DRIVE_TABLE: &[(&str, &str, DriveType, i16, usize, i32)] = &[
	("PLEXTOR", "CD-R PX-W4824A",  DriveType::Plextor, 98, 294, -75),
	("PLEXTOR", "CD-R PX-W5224A",  DriveType::Plextor, 30, 294, -75),
	("PLEXTOR", "CD-R PREMIUM2",   DriveType::Plextor, 30, 294, -75),
	("PLEXTOR", "DVDR PX-708A",    DriveType::Plextor, 30, 294, -75),
	("PLEXTOR", "DVDR PX-712A",    DriveType::Plextor, 30, 294, -75),
	("PLEXTOR", "DVDR PX-716A",    DriveType::Plextor, 30, 294, -75),
	("PLEXTOR", "DVDR PX-755A",    DriveType::Plextor, 30, 294, -75),
	("PLEXTOR", "DVDR PX-760A",    DriveType::Plextor, 30, 294, -75),
	("ASUS",     "BW-16D1HT",      DriveType::LgAsu8,   6, 0, -135),
	("ASUS",     "BC-12D2HT",      DriveType::LgAsu8,   6, 0, -135),
	("HL-DT-ST", "BD-RE BH16NS40", DriveType::LgAsu8,   6, 0, -135),
	("HL-DT-ST", "BD-RE WH16NS40", DriveType::LgAsu8A,  6, 0, -135),
	("HL-DT-ST", "BD-RE WH16NS58", DriveType::LgAsu8B,  6, 0, -135),
	("HL-DT-ST", "DVDRAM GH24NSC0", DriveType::LgAsu3,  6, 0, -135),
];



#[derive(Debug, Clone, Copy, Default, Eq, Ord, PartialEq, PartialOrd)]
/// # Read Offset.
///
/// A drive's sample read offset. For historical reasons, values are
/// restricted to `-5880..=5880`.
pub struct ReadOffset(i16);

impl TryFrom<i16> for ReadOffset {
	type Error = GrabError;
	fn try_from(src: i16) -> Result<Self, Self::Error> {
		if (MIN_OFFSET..=MAX_OFFSET).contains(&src) { Ok(Self(src)) }
		else { Err(GrabError::ReadOffset) }
	}
}

impl TryFrom<&[u8]> for ReadOffset {
	type Error = GrabError;
	fn try_from(src: &[u8]) -> Result<Self, Self::Error> {
		if src.is_empty() { Ok(Self(0)) }
		else {
			i16::btoi(src)
				.ok_or(GrabError::ReadOffset)
				.and_then(Self::try_from)
		}
	}
}

impl TryFrom<&str> for ReadOffset {
	type Error = GrabError;
	#[inline]
	fn try_from(src: &str) -> Result<Self, Self::Error> {
		Self::try_from(src.trim().as_bytes())
	}
}

impl ReadOffset {
	#[must_use]
	/// # Samples.
	pub const fn samples(self) -> i32 { self.0 as i32 }

	#[must_use]
	/// # Is Negative?
	pub const fn is_negative(self) -> bool { self.0 < 0 }
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Drive Family.
///
/// `Generic` follows the plain SCSI book; the rest unlock a vendor trick
/// apiece (Plextor lead-in, LG/ASUS lead-out cache).
pub enum DriveType {
	#[default]
	Generic,
	Plextor,
	LgAsu8,
	LgAsu8A,
	LgAsu8B,
	LgAsu3,
}

impl DriveType {
	#[must_use]
	/// # LG/ASUS Family?
	pub const fn is_asus(self) -> bool {
		matches!(self, Self::LgAsu8 | Self::LgAsu8A | Self::LgAsu8B | Self::LgAsu3)
	}

	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Generic => "GENERIC",
			Self::Plextor => "PLEXTOR",
			Self::LgAsu8 => "LG_ASU8",
			Self::LgAsu8A => "LG_ASU8A",
			Self::LgAsu8B => "LG_ASU8B",
			Self::LgAsu3 => "LG_ASU3",
		}
	}
}

impl TryFrom<&str> for DriveType {
	type Error = GrabError;
	fn try_from(src: &str) -> Result<Self, Self::Error> {
		match src.trim().to_ascii_uppercase().as_str() {
			"GENERIC" => Ok(Self::Generic),
			"PLEXTOR" => Ok(Self::Plextor),
			"LG_ASU8" => Ok(Self::LgAsu8),
			"LG_ASU8A" => Ok(Self::LgAsu8A),
			"LG_ASU8B" => Ok(Self::LgAsu8B),
			"LG_ASU3" => Ok(Self::LgAsu3),
			_ => Err(GrabError::Bug("Unknown drive type.")),
		}
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Read Method.
pub enum ReadMethod {
	#[default]
	Be,
	BeCdda,
	D8,
}

impl ReadMethod {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Be => "BE",
			Self::BeCdda => "BE_CDDA",
			Self::D8 => "D8",
		}
	}
}

impl TryFrom<&str> for ReadMethod {
	type Error = GrabError;
	fn try_from(src: &str) -> Result<Self, Self::Error> {
		match src.trim().to_ascii_uppercase().as_str() {
			"BE" => Ok(Self::Be),
			"BE_CDDA" => Ok(Self::BeCdda),
			"D8" => Ok(Self::D8),
			_ => Err(GrabError::Bug("Unknown read method.")),
		}
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Raw Response Layout.
///
/// Where the drive puts data, C2, and subcode within each raw block.
pub enum SectorOrder {
	#[default]
	DataC2Sub,
	DataSubC2,
	DataSub,
	DataC2,
}

impl SectorOrder {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::DataC2Sub => "DATA_C2_SUB",
			Self::DataSubC2 => "DATA_SUB_C2",
			Self::DataSub => "DATA_SUB",
			Self::DataC2 => "DATA_C2",
		}
	}
}

impl TryFrom<&str> for SectorOrder {
	type Error = GrabError;
	fn try_from(src: &str) -> Result<Self, Self::Error> {
		match src.trim().to_ascii_uppercase().as_str() {
			"DATA_C2_SUB" => Ok(Self::DataC2Sub),
			"DATA_SUB_C2" => Ok(Self::DataSubC2),
			"DATA_SUB" => Ok(Self::DataSub),
			"DATA_C2" => Ok(Self::DataC2),
			_ => Err(GrabError::Bug("Unknown sector order.")),
		}
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Sector Layout.
///
/// Byte offsets of each piece within one raw block; an offset equal to
/// [`CD_RAW_DATA_SIZE`] means the piece is absent from the response.
pub struct SectorLayout {
	pub data_offset: usize,
	pub c2_offset: usize,
	pub subcode_offset: usize,
	pub size: usize,
}

#[must_use]
/// # Layout For an Order.
pub const fn sector_order_layout(order: SectorOrder) -> SectorLayout {
	match order {
		SectorOrder::DataC2Sub => SectorLayout {
			data_offset: 0,
			c2_offset: CD_DATA_SIZE,
			subcode_offset: CD_DATA_SIZE + CD_C2_SIZE,
			size: CD_DATA_SIZE + CD_C2_SIZE + CD_SUBCODE_SIZE,
		},
		SectorOrder::DataSubC2 => SectorLayout {
			data_offset: 0,
			c2_offset: CD_DATA_SIZE + CD_SUBCODE_SIZE,
			subcode_offset: CD_DATA_SIZE,
			size: CD_DATA_SIZE + CD_SUBCODE_SIZE + CD_C2_SIZE,
		},
		SectorOrder::DataSub => SectorLayout {
			data_offset: 0,
			c2_offset: CD_RAW_DATA_SIZE,
			subcode_offset: CD_DATA_SIZE,
			size: CD_DATA_SIZE + CD_SUBCODE_SIZE,
		},
		SectorOrder::DataC2 => SectorLayout {
			data_offset: 0,
			c2_offset: CD_DATA_SIZE,
			subcode_offset: CD_RAW_DATA_SIZE,
			size: CD_DATA_SIZE + CD_C2_SIZE,
		},
	}
}



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Drive Configuration.
pub struct DriveConfig {
	pub vendor: String,
	pub product: String,
	pub kind: DriveType,
	pub read_method: ReadMethod,
	pub sector_order: SectorOrder,
	pub read_offset: ReadOffset,
	pub c2_shift: usize,
	pub pregap_start: i32,
}

impl fmt::Display for DriveConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"type: {}, read method: {}, sector order: {}, read offset: {:+}, C2 shift: {}, pre-gap start: {}",
			self.kind.as_str(),
			self.read_method.as_str(),
			self.sector_order.as_str(),
			self.read_offset.samples(),
			self.c2_shift,
			self.pregap_start,
		)
	}
}

impl DriveConfig {
	#[must_use]
	/// # Detect From Identification.
	///
	/// Look the vendor/product pair up in the quirks table, falling back to
	/// a conservative generic profile.
	pub fn detect(vendor: &str, product: &str) -> Self {
		let vendor = vendor.trim();
		let product = product.trim();

		for &(v, p, kind, offset, c2_shift, pregap_start) in DRIVE_TABLE {
			if v == vendor && p == product {
				return Self {
					vendor: vendor.to_owned(),
					product: product.to_owned(),
					kind,
					read_method:
						if matches!(kind, DriveType::Plextor) { ReadMethod::D8 }
						else { ReadMethod::BeCdda },
					sector_order: SectorOrder::DataC2Sub,
					read_offset: ReadOffset(offset),
					c2_shift,
					pregap_start,
				};
			}
		}

		Self {
			vendor: vendor.to_owned(),
			product: product.to_owned(),
			kind: DriveType::Generic,
			read_method: ReadMethod::Be,
			sector_order: SectorOrder::DataC2Sub,
			read_offset: ReadOffset(0),
			c2_shift: 0,
			pregap_start: -150,
		}
	}

	/// # Apply User Overrides.
	pub fn override_with(
		&mut self,
		kind: Option<DriveType>,
		read_offset: Option<ReadOffset>,
		c2_shift: Option<usize>,
		pregap_start: Option<i32>,
		read_method: Option<ReadMethod>,
		sector_order: Option<SectorOrder>,
	) {
		if let Some(v) = kind { self.kind = v; }
		if let Some(v) = read_offset { self.read_offset = v; }
		if let Some(v) = c2_shift { self.c2_shift = v; }
		if let Some(v) = pregap_start { self.pregap_start = v; }
		if let Some(v) = read_method { self.read_method = v; }
		if let Some(v) = sector_order { self.sector_order = v; }
	}

	#[must_use]
	/// # LG/ASUS Family?
	pub const fn is_asus(&self) -> bool { self.kind.is_asus() }
}



/// # Read One Sector.
///
/// Issue the drive-appropriate read command and reassemble the response
/// into the canonical `data ‖ C2 ‖ subcode` layout at `dst`.
///
/// Drives whose C2 block lags the data — Plextor shifts it a whole block —
/// require reading extra sectors and re-concatenating the C2 stream at the
/// right offset. A consequence is that lead-out overread fails a few
/// sectors earlier on such drives.
pub(crate) fn read_sector<T: DriveTransport>(
	dst: &mut [u8],
	transport: &mut T,
	cfg: &DriveConfig,
	lba: i32,
) -> ScsiStatus {
	let layout = sector_order_layout(cfg.sector_order);
	let sectors_count = cfg.c2_shift.wrapping_div(CD_C2_SIZE)
		+ usize::from(cfg.c2_shift % CD_C2_SIZE != 0)
		+ 1;
	let mut buf = vec![0_u8; layout.size * sectors_count];

	let status =
		if matches!(cfg.read_method, ReadMethod::D8) {
			transport.read_cdda(
				&mut buf,
				lba,
				sectors_count as u32,
				if matches!(cfg.sector_order, SectorOrder::DataSub) { CddaSubCode::DataSub }
				else { CddaSubCode::DataC2Sub },
			)
		}
		else {
			transport.read_cd(
				&mut buf,
				lba,
				sectors_count as u32,
				if matches!(cfg.read_method, ReadMethod::BeCdda) { ReadType::Cdda }
				else { ReadType::AllTypes },
				if layout.c2_offset == CD_RAW_DATA_SIZE { ErrorField::None }
				else { ErrorField::C2 },
				if layout.subcode_offset == CD_RAW_DATA_SIZE { SubchannelMode::None }
				else { SubchannelMode::Raw },
			)
		};

	if status.is_good() {
		dst[..CD_RAW_DATA_SIZE].fill(0);

		if layout.data_offset != CD_RAW_DATA_SIZE {
			dst[..CD_DATA_SIZE]
				.copy_from_slice(&buf[layout.data_offset..layout.data_offset + CD_DATA_SIZE]);
		}

		if layout.c2_offset != CD_RAW_DATA_SIZE {
			// Compensate the C2 shift.
			let mut c2_buffer = vec![0_u8; CD_C2_SIZE * sectors_count];
			for i in 0..sectors_count {
				let src = layout.size * i + layout.c2_offset;
				c2_buffer[CD_C2_SIZE * i..CD_C2_SIZE * (i + 1)]
					.copy_from_slice(&buf[src..src + CD_C2_SIZE]);
			}
			dst[CD_DATA_SIZE..CD_DATA_SIZE + CD_C2_SIZE]
				.copy_from_slice(&c2_buffer[cfg.c2_shift..cfg.c2_shift + CD_C2_SIZE]);
		}

		if layout.subcode_offset != CD_RAW_DATA_SIZE {
			dst[CD_DATA_SIZE + CD_C2_SIZE..CD_RAW_DATA_SIZE]
				.copy_from_slice(&buf[layout.subcode_offset..layout.subcode_offset + CD_SUBCODE_SIZE]);
		}
	}

	status
}

/// # Extract a Lead-Out Run From an LG/ASUS Cache Dump.
///
/// The DRAM snapshot is a ring of raw blocks in canonical layout. Find the
/// entry whose Q timecode matches `lba`, then collect the consecutive run
/// that follows, wrapping around the ring if needed.
pub(crate) fn asus_cache_extract(cache: &[u8], lba: i32, count: usize) -> Vec<u8> {
	let entries = cache.len().wrapping_div(CD_RAW_DATA_SIZE);
	if entries == 0 { return Vec::new(); }

	let entry_q = |idx: usize| -> ChannelQ {
		let start = idx * CD_RAW_DATA_SIZE + CD_DATA_SIZE + CD_C2_SIZE;
		ChannelQ::from_subcode(&cache[start..start + CD_SUBCODE_SIZE])
	};

	// Find the starting entry.
	let Some(start) = (0..entries).find(|&i| {
		let q = entry_q(i);
		q.valid() && q.adr() == 1 && q.a_lba() == lba
	}) else { return Vec::new(); };

	// Collect the run.
	let mut out = Vec::with_capacity(CD_RAW_DATA_SIZE * count.min(entries));
	for n in 0..entries.min(count) {
		let idx = (start + n) % entries;
		let q = entry_q(idx);

		// A valid Q pointing somewhere else ends the run; an invalid one is
		// damage, not displacement.
		if q.valid() && q.adr() == 1 && q.a_lba() != lba + n as i32 { break; }

		out.extend_from_slice(&cache[idx * CD_RAW_DATA_SIZE..(idx + 1) * CD_RAW_DATA_SIZE]);
	}

	out
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::subcode::test::{
		interleave_q,
		mode1_q,
	};

	#[test]
	fn t_layout() {
		let layout = sector_order_layout(SectorOrder::DataC2Sub);
		assert_eq!(layout.data_offset, 0);
		assert_eq!(layout.c2_offset, 2352);
		assert_eq!(layout.subcode_offset, 2646);
		assert_eq!(layout.size, 2742);

		let layout = sector_order_layout(SectorOrder::DataSub);
		assert_eq!(layout.c2_offset, CD_RAW_DATA_SIZE, "C2 should be absent.");
		assert_eq!(layout.subcode_offset, 2352);
		assert_eq!(layout.size, 2448);
	}

	#[test]
	fn t_detect() {
		let cfg = DriveConfig::detect("PLEXTOR", "DVDR PX-760A");
		assert_eq!(cfg.kind, DriveType::Plextor);
		assert_eq!(cfg.read_method, ReadMethod::D8);
		assert_eq!(cfg.read_offset.samples(), 30);
		assert_eq!(cfg.c2_shift, 294);
		assert_eq!(cfg.pregap_start, -75);

		let mut cfg = DriveConfig::detect("NO-NAME", "WHATEVER 9000");
		assert_eq!(cfg.kind, DriveType::Generic);
		assert_eq!(cfg.read_method, ReadMethod::Be);
		assert_eq!(cfg.pregap_start, -150);

		cfg.override_with(
			Some(DriveType::LgAsu8),
			None,
			None,
			Some(-135),
			Some(ReadMethod::BeCdda),
			None,
		);
		assert!(cfg.is_asus());
		assert_eq!(cfg.read_method, ReadMethod::BeCdda);
		assert_eq!(cfg.pregap_start, -135);
	}

	#[test]
	fn t_asus_cache_extract() {
		// Six-entry ring holding lead-out sectors 1000..1006, rotated so
		// the run wraps.
		let base = 1000;
		let mut cache = vec![0_u8; CD_RAW_DATA_SIZE * 6];
		for slot in 0..6 {
			let lba = base + ((slot + 4) % 6) as i32;
			let q = mode1_q(0, 0xAA_u8, 1, lba, lba);
			let sub = interleave_q(&q);
			let start = slot * CD_RAW_DATA_SIZE;
			cache[start] = lba as u8; // marker
			cache[start + CD_DATA_SIZE + CD_C2_SIZE..start + CD_RAW_DATA_SIZE]
				.copy_from_slice(&sub);
		}

		let run = asus_cache_extract(&cache, base, 100);
		assert_eq!(run.len(), CD_RAW_DATA_SIZE * 6);
		for (i, entry) in run.chunks_exact(CD_RAW_DATA_SIZE).enumerate() {
			assert_eq!(entry[0], (base + i as i32) as u8);
		}

		// Missing target comes back empty.
		assert!(asus_cache_extract(&cache, 999, 100).is_empty());
	}
}
