/*!
# CDGrab: Plextor Lead-In
*/

use crate::{
	CD_C2_SIZE,
	CD_DATA_SIZE,
	CD_DATA_SIZE_SAMPLES,
	CD_SAMPLE_SIZE,
	CD_SUBCODE_SIZE,
	ChannelQ,
	DriveConfig,
	DriveTransport,
	EventLog,
	GrabError,
	LBA_START,
	MSF_LBA_SHIFT,
	PLEXTOR_LEADIN_ENTRY_SIZE,
	ScsiStatus,
	State,
	stream::{
		read_entry,
		write_entry,
	},
};
use std::fs::File;
use super::state::{
	states_from_bytes,
	states_to_bytes,
};



/// # Entry Status.
fn entry_status(entry: &[u8]) -> ScsiStatus {
	ScsiStatus::from_bytes([entry[0], entry[1], entry[2], entry[3]])
}

/// # Entry Q.
fn entry_q(entry: &[u8]) -> ChannelQ {
	let start = 4 + CD_DATA_SIZE + CD_C2_SIZE;
	ChannelQ::from_subcode(&entry[start..start + CD_SUBCODE_SIZE])
}

/// # Capture and Store Session Lead-Ins.
///
/// There is no direct control over which session's lead-in a multisession
/// drive returns, so the command is repeated once per session — flushing
/// the cache before the last attempt to nudge the drive toward the first
/// session — and each result is assigned to a session by the timecode of
/// its last valid Q. The longest buffer per session wins.
///
/// Captured sectors land in the streams as `SUCCESS_C2_OFF`; anything the
/// regular read loop already did better is left alone.
pub(super) fn store_sessions_leadin<T: DriveTransport>(
	fs_scm: &mut File,
	mut fs_sub: Option<&mut File>,
	fs_state: &mut File,
	transport: &mut T,
	session_lba_start: &[i32],
	cfg: &DriveConfig,
	verbose: bool,
	log: &mut EventLog,
) -> Result<(), GrabError> {
	let leadin_len = cfg.pregap_start + MSF_LBA_SHIFT;
	if leadin_len <= 0 || session_lba_start.is_empty() { return Ok(()); }
	let leadin_len_u = leadin_len.unsigned_abs() as usize;

	let mut leadin_buffers: Vec<Vec<u8>> = vec![Vec::new(); session_lba_start.len()];

	for i in 0..session_lba_start.len() {
		log.line("PLEXTOR: reading lead-in");

		// Helps with "choosing" the first session.
		if i + 1 == session_lba_start.len() { transport.flush_cache(-1); }

		let mut leadin_buffer = transport.plextor_read_leadin(leadin_len.unsigned_abs())?;
		let entries_count = leadin_buffer.len().wrapping_div(PLEXTOR_LEADIN_ENTRY_SIZE);
		if entries_count < leadin_len_u { continue; }

		// Assign the buffer to a session via its last valid Q.
		'entries: for j in (0..entries_count).rev() {
			let entry = &leadin_buffer[j * PLEXTOR_LEADIN_ENTRY_SIZE..(j + 1) * PLEXTOR_LEADIN_ENTRY_SIZE];
			if ! entry_status(entry).is_good() { continue; }

			let q = entry_q(entry);
			if ! q.valid() || q.adr() != 1 || q.tno() == 0 { continue; }

			let lba = q.a_lba();
			for (s, &session_start) in session_lba_start.iter().enumerate() {
				let pregap_end = session_start + leadin_len;
				if session_start <= lba && lba < pregap_end {
					let trim_count = j + (pregap_end - lba) as usize;

					if entries_count < trim_count {
						log.line(&format!("PLEXTOR: incomplete pre-gap, skipping (session index: {s})"));
					}
					else {
						log.line(&format!("PLEXTOR: lead-in found (session index: {s}, sectors: {trim_count})"));

						if trim_count < entries_count {
							leadin_buffer.truncate(trim_count * PLEXTOR_LEADIN_ENTRY_SIZE);
						}
						if leadin_buffers[s].len() < leadin_buffer.len() {
							std::mem::swap(&mut leadin_buffers[s], &mut leadin_buffer);
						}
					}

					break 'entries;
				}
			}
		}
	}

	// PX-760A: strip invalid entries from the lead-in start.
	for (s, leadin_buffer) in leadin_buffers.iter_mut().enumerate() {
		let n = leadin_buffer.len().wrapping_div(PLEXTOR_LEADIN_ENTRY_SIZE);
		for i in 0..n {
			if entry_q(&leadin_buffer[i * PLEXTOR_LEADIN_ENTRY_SIZE..(i + 1) * PLEXTOR_LEADIN_ENTRY_SIZE]).valid() {
				if i != 0 {
					leadin_buffer.drain(..i * PLEXTOR_LEADIN_ENTRY_SIZE);
					log.line(&format!("PLEXTOR: lead-in trimmed (session index: {s}, sectors: {i})"));
				}
				break;
			}
		}
	}

	// Store.
	for (s, leadin_buffer) in leadin_buffers.iter().enumerate() {
		let n = leadin_buffer.len().wrapping_div(PLEXTOR_LEADIN_ENTRY_SIZE);
		for i in 0..n {
			let lba = session_lba_start[s] + leadin_len - (n - i) as i32;
			let lba_index = lba - LBA_START;

			let entry = &leadin_buffer[i * PLEXTOR_LEADIN_ENTRY_SIZE..(i + 1) * PLEXTOR_LEADIN_ENTRY_SIZE];
			let status = entry_status(entry);
			if ! status.is_good() {
				if verbose {
					log.line(&format!("[LBA: {lba:6}] SCSI error ({status})"));
				}
				continue;
			}

			// Data, unless the loop already captured something at least as
			// good.
			let mut state_bytes = [0_u8; CD_DATA_SIZE_SAMPLES];
			read_entry(fs_state, &mut state_bytes, CD_DATA_SIZE_SAMPLES, lba_index, cfg.read_offset.samples(), 0)
				.map_err(|_| GrabError::FileRead("state stream".to_owned()))?;
			if states_from_bytes(&state_bytes).iter().any(|&v| v < State::SuccessC2Off) {
				let sector_data = &entry[4..4 + CD_DATA_SIZE];
				let sector_state = [State::SuccessC2Off; CD_DATA_SIZE_SAMPLES];

				write_entry(fs_scm, sector_data, CD_DATA_SIZE, lba_index, cfg.read_offset.samples() * CD_SAMPLE_SIZE as i32)
					.map_err(|_| GrabError::FileWrite("main stream".to_owned()))?;
				write_entry(fs_state, &states_to_bytes(&sector_state), CD_DATA_SIZE_SAMPLES, lba_index, cfg.read_offset.samples())
					.map_err(|_| GrabError::FileWrite("state stream".to_owned()))?;
			}

			// Subcode, unless the stored copy already validates.
			if let Some(f) = fs_sub.as_deref_mut() {
				let mut sub_file = [0_u8; CD_SUBCODE_SIZE];
				read_entry(f, &mut sub_file, CD_SUBCODE_SIZE, lba_index, 0, 0)
					.map_err(|_| GrabError::FileRead("subcode stream".to_owned()))?;
				if ! ChannelQ::from_subcode(&sub_file).valid() {
					let sub_start = 4 + CD_DATA_SIZE + CD_C2_SIZE;
					write_entry(f, &entry[sub_start..sub_start + CD_SUBCODE_SIZE], CD_SUBCODE_SIZE, lba_index, 0)
						.map_err(|_| GrabError::FileWrite("subcode stream".to_owned()))?;
				}
			}
		}
	}

	Ok(())
}
