/*!
# CDGrab: Disc Coordinates
*/

use crate::{
	GrabError,
	MSF_LBA_SHIFT,
};
use regex::Regex;
use std::{
	fmt,
	sync::LazyLock,
};



/// # Sectors in the 00:00:00-99:59:74 coordinate space.
const MSF_WRAP: i32 = 100 * 60 * 75;

/// # Binary MSF values at or above this minute are negative addresses.
const MSF_WRAP_MINUTE: u8 = 90;

/// # Skip-Range Chunk.
static RE_RANGE: LazyLock<Regex> = LazyLock::new(||
	Regex::new(r"^(\d+)-(\d+)$").expect("Invalid range regex.")
);



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Minute/Second/Frame.
///
/// The disc-native sector coordinate, 75 frames per second, stored here in
/// plain binary. (On-disc copies are BCD; see [`Msf::from_bcd`].)
pub struct Msf {
	pub m: u8,
	pub s: u8,
	pub f: u8,
}

impl fmt::Display for Msf {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:02}:{:02}:{:02}", self.m, self.s, self.f)
	}
}

impl Msf {
	#[allow(clippy::integer_division, clippy::cast_possible_truncation)]
	#[must_use]
	/// # From LBA.
	///
	/// Addresses below `-150` belong to the lead-in and wrap around the top
	/// of the coordinate space.
	pub const fn from_lba(lba: i32) -> Self {
		let mut sectors = lba + MSF_LBA_SHIFT;
		if sectors < 0 { sectors += MSF_WRAP; }

		Self {
			m: (sectors / (60 * 75)) as u8,
			s: (sectors / 75 % 60) as u8,
			f: (sectors % 75) as u8,
		}
	}

	#[must_use]
	/// # From BCD bytes.
	///
	/// Decode the digit pairs without validation; garbage in, garbage out,
	/// same as the disc itself.
	pub const fn from_bcd(raw: [u8; 3]) -> Self {
		Self {
			m: unbcd(raw[0]),
			s: unbcd(raw[1]),
			f: unbcd(raw[2]),
		}
	}

	#[must_use]
	/// # To LBA.
	pub const fn to_lba(self) -> i32 {
		(self.m as i32 * 60 + self.s as i32) * 75 + self.f as i32 - MSF_LBA_SHIFT
	}

	#[must_use]
	/// # To BCD bytes.
	pub const fn to_bcd(self) -> [u8; 3] { [bcd(self.m), bcd(self.s), bcd(self.f)] }
}



#[must_use]
/// # BCD-MSF to LBA.
///
/// Same as [`Msf::to_lba`], except the input bytes are BCD and minutes of
/// ninety or more — lead-in timecodes — map to negative addresses.
pub const fn bcd_msf_to_lba(raw: [u8; 3]) -> i32 {
	let msf = Msf::from_bcd(raw);
	let lba = msf.to_lba();
	if MSF_WRAP_MINUTE <= msf.m { lba - MSF_WRAP }
	else { lba }
}

#[must_use]
/// # First Range Containing `lba`.
///
/// Ranges are half-open `[start, end)`. Returns the first hit, if any;
/// disjoint ranges are not merged.
pub fn inside_range(lba: i32, ranges: &[(i32, i32)]) -> Option<&(i32, i32)> {
	ranges.iter().find(|(a, b)| *a <= lba && lba < *b)
}

/// # Parse Skip Ranges.
///
/// Ranges arrive as inclusive decimal pairs like `100-200`, several of them
/// joined with `:`. They come back half-open.
///
/// ## Errors
///
/// This will return an error if any chunk fails to parse.
pub fn parse_ranges(raw: &str) -> Result<Vec<(i32, i32)>, GrabError> {
	let raw = raw.trim();
	if raw.is_empty() { return Ok(Vec::new()); }

	let mut out = Vec::new();
	for chunk in raw.split(':') {
		let caps = RE_RANGE.captures(chunk)
			.ok_or_else(|| GrabError::SkipRanges(chunk.to_owned()))?;
		let a = caps[1].parse::<i32>()
			.map_err(|_| GrabError::SkipRanges(chunk.to_owned()))?;
		let b = caps[2].parse::<i32>()
			.map_err(|_| GrabError::SkipRanges(chunk.to_owned()))?;
		if b < a { return Err(GrabError::SkipRanges(chunk.to_owned())); }
		out.push((a, b + 1));
	}

	Ok(out)
}

#[must_use]
/// # BCD Encode.
pub(crate) const fn bcd(v: u8) -> u8 { ((v / 10) << 4) | (v % 10) }

#[must_use]
/// # BCD Decode.
pub(crate) const fn unbcd(v: u8) -> u8 { (v >> 4) * 10 + (v & 0x0F) }



#[cfg(test)]
mod test {
	use super::*;
	use crate::LBA_START;

	#[test]
	fn t_lba_msf_round_trip() {
		for lba in (-150..449_850).step_by(37) {
			assert_eq!(Msf::from_lba(lba).to_lba(), lba, "Round trip failed for {lba}.");
		}

		assert_eq!(Msf::from_lba(0), Msf { m: 0, s: 2, f: 0 });
		assert_eq!(Msf::from_lba(-150), Msf { m: 0, s: 0, f: 0 });
	}

	#[test]
	fn t_bcd() {
		assert_eq!(bcd_msf_to_lba([0x00, 0x02, 0x00]), 0);
		assert_eq!(bcd_msf_to_lba([0x90, 0x00, 0x00]), LBA_START);

		// Lead-in addresses wrap to the negative side.
		assert_eq!(
			bcd_msf_to_lba(Msf::from_lba(LBA_START).to_bcd()),
			LBA_START,
		);

		assert_eq!(bcd(74), 0x74);
		assert_eq!(unbcd(0x59), 59);
	}

	#[test]
	fn t_inside_range() {
		let ranges = vec![(10, 20), (30, 40)];
		assert_eq!(inside_range(9, &ranges), None);
		assert_eq!(inside_range(10, &ranges), Some(&(10, 20)));
		assert_eq!(inside_range(19, &ranges), Some(&(10, 20)));
		assert_eq!(inside_range(20, &ranges), None);
		assert_eq!(inside_range(35, &ranges), Some(&(30, 40)));
	}

	#[test]
	fn t_parse_ranges() {
		assert_eq!(
			parse_ranges("100-200:300-300").expect("Parse failed."),
			vec![(100, 201), (300, 301)],
		);
		assert!(parse_ranges("").expect("Empty should be fine.").is_empty());
		assert!(parse_ranges("200-100").is_err());
		assert!(parse_ranges("abc").is_err());
	}
}
