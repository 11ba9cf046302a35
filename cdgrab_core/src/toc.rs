/*!
# CDGrab: Table of Contents
*/

use crate::{
	ChannelQ,
	GrabError,
	Msf,
};
use std::fmt;



/// # Size of a READ TOC track descriptor.
const TOC_ENTRY_SIZE: usize = 8;

/// # Size of a READ FULL TOC descriptor.
const FULL_TOC_ENTRY_SIZE: usize = 11;

/// # Lead-out pseudo track number.
const LEADOUT_TRACK: u8 = 0xAA;



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Track.
///
/// Positions are LBAs. `indices` starts at the index 01 position reported
/// by the TOC; richer per-index data comes from subchannel analysis during
/// splitting, which is somebody else's job.
pub struct Track {
	pub number: u8,
	pub adr: u8,
	pub control: u8,
	pub indices: Vec<i32>,
	pub lba_start: i32,
	pub lba_end: i32,
}

impl Track {
	#[must_use]
	/// # Data Track?
	pub const fn is_data(&self) -> bool {
		self.control & ChannelQ::CONTROL_DATA != 0
	}
}

#[derive(Debug, Clone, Eq, PartialEq)]
/// # Session.
pub struct Session {
	pub number: u8,
	pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Table of Contents.
pub struct Toc {
	pub sessions: Vec<Session>,
	pub disc_type: Option<u8>,
}

impl Toc {
	/// # Parse a READ TOC Response.
	///
	/// The short form carries one descriptor per track (LBA addressing)
	/// plus a lead-out entry, all in a single session.
	///
	/// ## Errors
	///
	/// This will return an error if the response is truncated or trackless.
	pub fn parse(buf: &[u8]) -> Result<Self, GrabError> {
		if buf.len() < 4 + TOC_ENTRY_SIZE { return Err(GrabError::TocParse); }

		let mut tracks: Vec<Track> = Vec::new();
		let mut leadout: Option<i32> = None;

		for chunk in buf[4..].chunks_exact(TOC_ENTRY_SIZE) {
			let number = chunk[2];
			let lba = i32::from_be_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);

			if number == LEADOUT_TRACK { leadout.replace(lba); }
			else if (1..=99).contains(&number) {
				tracks.push(Track {
					number,
					adr: chunk[1] >> 4,
					control: chunk[1] & 0x0F,
					indices: vec![lba],
					lba_start: lba,
					lba_end: 0,
				});
			}
		}

		if tracks.is_empty() { return Err(GrabError::TocParse); }
		tracks.sort_unstable_by_key(|t| t.number);
		chain_ends(&mut tracks, leadout.unwrap_or_default());

		Ok(Self {
			sessions: vec![Session { number: 1, tracks }],
			disc_type: None,
		})
	}

	/// # Parse a READ FULL TOC Response.
	///
	/// The full form is session-aware: mode 5 descriptors with MSF
	/// addressing, A0/A1/A2 bookkeeping points included.
	///
	/// ## Errors
	///
	/// This will return an error if the response is truncated or trackless.
	pub fn parse_full(buf: &[u8]) -> Result<Self, GrabError> {
		if buf.len() < 4 + FULL_TOC_ENTRY_SIZE { return Err(GrabError::TocParse); }

		let mut sessions: Vec<(u8, Vec<Track>, Option<i32>)> = Vec::new();
		let mut disc_type: Option<u8> = None;

		for chunk in buf[4..].chunks_exact(FULL_TOC_ENTRY_SIZE) {
			let session = chunk[0];
			let adr = chunk[1] >> 4;
			let control = chunk[1] & 0x0F;
			let point = chunk[3];
			if adr != 1 { continue; }

			let pos = match sessions.iter().position(|(n, _, _)| *n == session) {
				Some(p) => p,
				None => {
					sessions.push((session, Vec::new(), None));
					sessions.len() - 1
				},
			};

			let lba = Msf { m: chunk[8], s: chunk[9], f: chunk[10] }.to_lba();
			match point {
				// First track number and disc type.
				0xA0 => { disc_type.get_or_insert(chunk[9]); },
				// Last track number; nothing we need.
				0xA1 => {},
				// Session lead-out.
				0xA2 => { sessions[pos].2.replace(lba); },
				1..=99 => sessions[pos].1.push(Track {
					number: point,
					adr,
					control,
					indices: vec![lba],
					lba_start: lba,
					lba_end: 0,
				}),
				_ => {},
			}
		}

		sessions.retain(|(_, tracks, _)| ! tracks.is_empty());
		if sessions.is_empty() { return Err(GrabError::TocParse); }
		sessions.sort_unstable_by_key(|(n, _, _)| *n);

		let sessions = sessions.into_iter()
			.map(|(number, mut tracks, leadout)| {
				tracks.sort_unstable_by_key(|t| t.number);
				chain_ends(&mut tracks, leadout.unwrap_or_default());
				Session { number, tracks }
			})
			.collect();

		Ok(Self { sessions, disc_type })
	}
}

impl Toc {
	/// # Derive Index Positions.
	///
	/// Some drives return broken per-track positions in their FULL TOC
	/// responses — PX-W5224TA, notoriously — so wherever the short TOC
	/// knows the same track, its index data wins.
	pub fn derive_index(&mut self, short: &Self) {
		for track in self.sessions.iter_mut().flat_map(|s| s.tracks.iter_mut()) {
			if let Some(src) = short.sessions.iter()
				.flat_map(|s| s.tracks.iter())
				.find(|t| t.number == track.number)
			{
				track.indices.clone_from(&src.indices);
				track.lba_start = src.lba_start;
			}
		}
	}

	#[must_use]
	/// # Last Track of the Last Session.
	pub fn last_track(&self) -> Option<&Track> {
		self.sessions.last().and_then(|s| s.tracks.last())
	}

	#[must_use]
	/// # First Track.
	pub fn first_track(&self) -> Option<&Track> {
		self.sessions.first().and_then(|s| s.tracks.first())
	}

	#[must_use]
	/// # Any Data Tracks?
	pub fn has_data(&self) -> bool {
		self.sessions.iter().flat_map(|s| s.tracks.iter()).any(Track::is_data)
	}

	#[must_use]
	/// # Any Audio Tracks?
	pub fn has_audio(&self) -> bool {
		self.sessions.iter().flat_map(|s| s.tracks.iter()).any(|t| ! t.is_data())
	}

	#[must_use]
	/// # Inter-Session Gap Ranges.
	///
	/// The unreadable stretches between one session's lead-out and the
	/// next session's program area, half-open, adjusted for how far before
	/// index 01 the drive can actually reach.
	pub fn session_gaps(&self, pregap_start: i32) -> Vec<(i32, i32)> {
		let mut out = Vec::new();
		for pair in self.sessions.windows(2) {
			let (Some(prev), Some(next)) = (pair[0].tracks.last(), pair[1].tracks.first())
				else { continue; };
			out.push((prev.lba_end, next.indices[0] + pregap_start));
		}
		out
	}
}

impl fmt::Display for Toc {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for session in &self.sessions {
			if 1 < self.sessions.len() {
				writeln!(f, "session {}", session.number)?;
			}
			for t in &session.tracks {
				writeln!(
					f,
					"  track {:02} {{ {} }} [{:6}..{:6}) {}",
					t.number,
					if t.is_data() { "DATA " } else { "AUDIO" },
					t.lba_start,
					t.lba_end,
					Msf::from_lba(t.lba_start),
				)?;
			}
		}
		Ok(())
	}
}



/// # Chain Track Ends.
///
/// Each track runs to the start of the next; the last one runs to the
/// lead-out.
fn chain_ends(tracks: &mut [Track], leadout: i32) {
	let mut iter = tracks.iter_mut().peekable();
	while let Some(t) = iter.next() {
		t.lba_end = iter.peek().map_or(leadout, |n| n.lba_start);
	}
}



#[cfg(test)]
pub(crate) mod test {
	use super::*;

	/// # Build a short READ TOC response.
	pub(crate) fn short_toc(tracks: &[(u8, u8, i32)], leadout: i32) -> Vec<u8> {
		let mut out = vec![0, 0, 1, tracks.len() as u8];
		for (number, control, lba) in tracks {
			out.extend_from_slice(&[0, 0x10 | control, *number, 0]);
			out.extend_from_slice(&lba.to_be_bytes());
		}
		out.extend_from_slice(&[0, 0x10, LEADOUT_TRACK, 0]);
		out.extend_from_slice(&leadout.to_be_bytes());
		let len = (out.len() - 2) as u16;
		out[..2].copy_from_slice(&len.to_be_bytes());
		out
	}

	/// # Build a full READ TOC response.
	pub(crate) fn full_toc(sessions: &[(u8, &[(u8, u8, i32)], i32)]) -> Vec<u8> {
		let mut out = vec![0, 0, 1, sessions.len() as u8];
		for (session, tracks, leadout) in sessions {
			let first = tracks.first().map_or(1, |t| t.0);
			let last = tracks.last().map_or(1, |t| t.0);
			out.extend_from_slice(&[*session, 0x10, 0, 0xA0, 0, 0, 0, 0, first, 0x20, 0]);
			out.extend_from_slice(&[*session, 0x10, 0, 0xA1, 0, 0, 0, 0, last, 0, 0]);
			let msf = Msf::from_lba(*leadout);
			out.extend_from_slice(&[*session, 0x10, 0, 0xA2, 0, 0, 0, 0, msf.m, msf.s, msf.f]);
			for (number, control, lba) in *tracks {
				let msf = Msf::from_lba(*lba);
				out.extend_from_slice(&[*session, 0x10 | control, 0, *number, 0, 0, 0, 0, msf.m, msf.s, msf.f]);
			}
		}
		let len = (out.len() - 2) as u16;
		out[..2].copy_from_slice(&len.to_be_bytes());
		out
	}

	#[test]
	fn t_parse_short() {
		let buf = short_toc(&[(1, 4, 0), (2, 0, 16_000)], 30_000);
		let toc = Toc::parse(&buf).expect("Short TOC parse failed.");

		assert_eq!(toc.sessions.len(), 1);
		let tracks = &toc.sessions[0].tracks;
		assert_eq!(tracks.len(), 2);
		assert!(tracks[0].is_data());
		assert!(! tracks[1].is_data());
		assert_eq!(tracks[0].lba_start, 0);
		assert_eq!(tracks[0].lba_end, 16_000);
		assert_eq!(tracks[1].lba_end, 30_000);
	}

	#[test]
	fn t_parse_full() {
		let buf = full_toc(&[
			(1, &[(1, 4, 0)], 16_000),
			(2, &[(2, 0, 28_000)], 40_000),
		]);
		let toc = Toc::parse_full(&buf).expect("Full TOC parse failed.");

		assert_eq!(toc.sessions.len(), 2);
		assert_eq!(toc.sessions[0].tracks[0].lba_end, 16_000);
		assert_eq!(toc.sessions[1].tracks[0].lba_start, 28_000);
		assert_eq!(toc.sessions[1].tracks[0].lba_end, 40_000);

		// Gap between sessions, with the usual -150 reach.
		assert_eq!(toc.session_gaps(-150), vec![(16_000, 27_850)]);
	}

	#[test]
	fn t_derive_index() {
		let mut toc = Toc::parse_full(&full_toc(&[(1, &[(1, 4, 5)], 16_000)]))
			.expect("Full TOC parse failed.");
		let short = Toc::parse(&short_toc(&[(1, 4, 0)], 16_000))
			.expect("Short TOC parse failed.");

		toc.derive_index(&short);
		assert_eq!(toc.sessions[0].tracks[0].lba_start, 0);
		assert_eq!(toc.sessions[0].tracks[0].indices, vec![0]);
	}
}
