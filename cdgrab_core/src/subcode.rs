/*!
# CDGrab: Subchannel
*/

use crate::{
	CD_SUBCODE_SIZE,
	msf::{
		Msf,
		bcd_msf_to_lba,
	},
};
use std::fmt;



/// # CRC-16/GSM polynomial: x¹⁶ + x¹² + x⁵ + 1.
const CRC16_GSM_POLY: u16 = 0x1021;

/// # ISRC country/owner character alphabet, 6-bit codes.
const ISRC_ALPHABET: &[u8; 64] =
	b"0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_ !\"#$%&'()*+,-./";



#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
/// # Subchannel Designator.
///
/// The 96 interleaved bytes carry eight channels, one per bit position.
pub enum Subchannel {
	P = 0,
	Q = 1,
	R = 2,
	S = 3,
	T = 4,
	U = 5,
	V = 6,
	W = 7,
}

/// # Deinterleave One Channel.
///
/// Gather the channel's bit from each of the 96 interleaved bytes and pack
/// the results into 12 bytes, most significant bit first.
#[must_use]
pub fn subcode_extract_channel(sub: &[u8], channel: Subchannel) -> [u8; 12] {
	let shift = 7 - channel as u8;
	let mut out = [0_u8; 12];

	for (i, b) in sub.iter().take(CD_SUBCODE_SIZE).enumerate() {
		let bit = (*b >> shift) & 1;
		out[i >> 3] |= bit << (7 - (i & 7));
	}

	out
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Channel Q.
///
/// Twelve deinterleaved bytes: control/ADR, nine bytes of mode-dependent
/// payload, and a big-endian CRC over the rest.
pub struct ChannelQ([u8; 12]);

impl ChannelQ {
	/// # Control: Data Track.
	pub const CONTROL_DATA: u8 = 0x04;

	#[must_use]
	/// # From Raw Bytes.
	pub const fn new(raw: [u8; 12]) -> Self { Self(raw) }

	#[must_use]
	/// # From Interleaved Subcode.
	pub fn from_subcode(sub: &[u8]) -> Self {
		Self(subcode_extract_channel(sub, Subchannel::Q))
	}

	#[must_use]
	/// # Raw Bytes.
	pub const fn as_bytes(&self) -> &[u8; 12] { &self.0 }
}

/// ## Field Access.
impl ChannelQ {
	#[must_use]
	/// # Control/ADR Byte.
	pub const fn control_adr(&self) -> u8 { self.0[0] }

	#[must_use]
	/// # ADR (Mode).
	pub const fn adr(&self) -> u8 { self.0[0] & 0x0F }

	#[must_use]
	/// # Control Nibble.
	pub const fn control(&self) -> u8 { self.0[0] >> 4 }

	#[must_use]
	/// # Track Number (Mode 1, BCD).
	pub const fn tno(&self) -> u8 { self.0[1] }

	#[must_use]
	/// # Index (Mode 1, BCD).
	pub const fn index(&self) -> u8 { self.0[2] }

	#[must_use]
	/// # Relative MSF (Mode 1, BCD).
	pub const fn msf(&self) -> [u8; 3] { [self.0[3], self.0[4], self.0[5]] }

	#[must_use]
	/// # Absolute MSF (Mode 1, BCD).
	pub const fn a_msf(&self) -> [u8; 3] { [self.0[7], self.0[8], self.0[9]] }

	#[must_use]
	/// # Absolute LBA (Mode 1).
	pub const fn a_lba(&self) -> i32 { bcd_msf_to_lba(self.a_msf()) }

	#[must_use]
	/// # Stored CRC (Big-Endian).
	pub const fn crc(&self) -> u16 { u16::from_be_bytes([self.0[10], self.0[11]]) }
}

/// ## Validation and Decoding.
impl ChannelQ {
	#[must_use]
	/// # Valid?
	///
	/// Recompute CRC-16/GSM over the first ten bytes and compare it with
	/// the stored remainder.
	pub fn valid(&self) -> bool { crc16_gsm(&self.0[..10]) == self.crc() }

	#[must_use]
	/// # Empty?
	pub fn is_empty(&self) -> bool { self.0.iter().all(|b| 0.eq(b)) }

	#[must_use]
	/// # Human-Readable Summary.
	///
	/// Mode 1 carries positions, mode 2 the MCN, mode 3 the ISRC. Anything
	/// else gets a hex dump.
	pub fn decode(&self) -> String {
		match self.adr() {
			1 => format!(
				"tno: {:02X}, index: {:02X}, MSF: {}, A-MSF: {}",
				self.tno(),
				self.index(),
				Msf::from_bcd(self.msf()),
				Msf::from_bcd(self.a_msf()),
			),
			2 => format!("MCN: {}", self.mcn()),
			3 => format!("ISRC: {}", self.isrc()),
			_ => {
				let mut out = String::with_capacity(36);
				for b in &self.0 {
					if ! out.is_empty() { out.push(' '); }
					out.push_str(&format!("{b:02X}"));
				}
				out
			},
		}
	}

	/// # MCN Digits (Mode 2).
	fn mcn(&self) -> String {
		let mut out = String::with_capacity(13);
		for i in 0..13 {
			let b = self.0[1 + (i >> 1)];
			let digit = if i & 1 == 0 { b >> 4 } else { b & 0x0F };
			out.push(char::from(b'0' + (digit % 10)));
		}
		out
	}

	/// # ISRC (Mode 3).
	///
	/// Five 6-bit characters followed by BCD year and serial digits.
	fn isrc(&self) -> String {
		let q = &self.0;
		let chars = [
			q[1] >> 2,
			((q[1] & 0x03) << 4) | (q[2] >> 4),
			((q[2] & 0x0F) << 2) | (q[3] >> 6),
			q[3] & 0x3F,
			q[4] >> 2,
		];

		let mut out = String::with_capacity(12);
		for c in chars {
			out.push(char::from(ISRC_ALPHABET[usize::from(c)]));
		}
		out.push_str(&format!(
			"{:02X}{:02X}{:02X}{:X}",
			q[5], q[6], q[7], q[8] >> 4,
		));
		out
	}
}

impl fmt::Display for ChannelQ {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.decode())
	}
}



/// # CRC-16/GSM.
///
/// Init zero, no reflection, output XORed with `0xFFFF`.
pub(crate) const fn crc16_gsm(data: &[u8]) -> u16 {
	let mut crc: u16 = 0;

	let mut i = 0;
	while i < data.len() {
		crc ^= (data[i] as u16) << 8;
		let mut bit = 0;
		while bit < 8 {
			if crc & 0x8000 == 0 { crc <<= 1; }
			else { crc = (crc << 1) ^ CRC16_GSM_POLY; }
			bit += 1;
		}
		i += 1;
	}

	crc ^ 0xFFFF
}



#[cfg(test)]
pub(crate) mod test {
	use super::*;

	/// # Build a valid mode 1 Q and interleave it into a subcode block.
	pub(crate) fn interleave_q(q: &[u8; 12]) -> [u8; CD_SUBCODE_SIZE] {
		let mut sub = [0_u8; CD_SUBCODE_SIZE];
		for i in 0..CD_SUBCODE_SIZE {
			let bit = (q[i >> 3] >> (7 - (i & 7))) & 1;
			sub[i] |= bit << 6;
		}
		sub
	}

	/// # A valid positional Q for the given coordinates.
	///
	/// The track and index bytes are used verbatim: pass them pre-encoded
	/// (`0x99` max, or the literal `0xAA` for lead-out).
	pub(crate) fn mode1_q(control: u8, tno: u8, index: u8, rel: i32, lba: i32) -> [u8; 12] {
		let rel = Msf::from_lba(rel - crate::MSF_LBA_SHIFT).to_bcd();
		let abs = Msf::from_lba(lba).to_bcd();
		let mut q = [0_u8; 12];
		q[0] = (control << 4) | 1;
		q[1] = tno;
		q[2] = index;
		q[3..6].copy_from_slice(&rel);
		q[7..10].copy_from_slice(&abs);
		let crc = crc16_gsm(&q[..10]);
		q[10..].copy_from_slice(&crc.to_be_bytes());
		q
	}

	#[test]
	fn t_extract_round_trip() {
		let q = mode1_q(0, 1, 1, 0, 0);
		let sub = interleave_q(&q);

		let extracted = ChannelQ::from_subcode(&sub);
		assert_eq!(extracted.as_bytes(), &q);
		assert!(extracted.valid());

		// Absolute MSF 00:02:00 is LBA 0.
		assert_eq!(extracted.adr(), 1);
		assert_eq!(extracted.tno(), 0x01);
		assert_eq!(extracted.index(), 0x01);
		assert_eq!(extracted.a_msf(), [0x00, 0x02, 0x00]);
		assert_eq!(extracted.a_lba(), 0);
	}

	#[test]
	fn t_crc() {
		let mut q = mode1_q(0, 2, 1, 1000, 20_000);
		assert!(ChannelQ::new(q).valid());

		// Any flipped bit should sink it.
		q[4] ^= 0x10;
		assert!(! ChannelQ::new(q).valid());

		// As should a corrupt CRC.
		let mut q = mode1_q(0, 2, 1, 1000, 20_000);
		q[10] ^= 0x01;
		assert!(! ChannelQ::new(q).valid());
	}

	#[test]
	fn t_decode() {
		let q = ChannelQ::new(mode1_q(4, 1, 0, 0, 150));
		assert!(q.decode().contains("tno: 01"));
		assert!(q.decode().contains("A-MSF: 00:04:00"));
	}
}
