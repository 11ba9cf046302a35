/*!
# CDGrab: Dump/Refine Engine
*/

mod leadin;
pub(crate) mod opts;
pub(crate) mod state;

use crate::{
	ASUS_LEADOUT_COUNT,
	CD_C2_SIZE,
	CD_DATA_SIZE,
	CD_DATA_SIZE_SAMPLES,
	CD_RAW_DATA_SIZE,
	CD_SAMPLE_SIZE,
	CD_SUBCODE_SIZE,
	ChannelQ,
	DriveConfig,
	DriveTransport,
	DriveType,
	EventLog,
	GrabError,
	KillSwitch,
	LBA_START,
	MSF_LBA_SHIFT,
	ReadMethod,
	SLOW_SECTOR_TIMEOUT,
	drive::{
		asus_cache_extract,
		read_sector,
	},
	inside_range,
	sector_order_layout,
	stream::{
		ImagePaths,
		create_trunc,
		open_rw,
		read_capture,
		read_entry,
		write_capture,
		write_entry,
	},
};
use fyi_msg::Progless;
use opts::DumpOptions;
use state::{
	SectorStates,
	State,
	merge_sector,
	state_from_c2,
	states_from_bytes,
	states_to_bytes,
};
use std::time::Instant;



/// # Consecutive Q errors tolerated before a defensive cache flush.
const Q_ERROR_FLUSH_THRESHOLD: u32 = 5;

/// # Default disc end when the TOC can't be trusted: 74 minutes.
const DEFAULT_LBA_END: i32 = (74 * 60) * 75 - MSF_LBA_SHIFT;



/// # Dump (or Refine) a Disc.
///
/// The one entry point: read every sector in the window, persist the four
/// parallel streams, and keep score. In refine mode, re-read only what the
/// state file says is still bad and merge improvements in monotonically.
///
/// Returns `true` if errors remain afterward — or unconditionally for the
/// LG/ASUS family, whose lead-out capture deserves another shot — so the
/// caller can schedule another pass.
///
/// ## Errors
///
/// Fatal conditions only: a drive that isn't ready, image collisions,
/// stream I/O failures, a TOC mismatch on refine. Per-sector trouble is
/// recorded, not raised.
pub fn dump<T: DriveTransport>(
	transport: &mut T,
	options: &DumpOptions,
	refine: bool,
	progress: &Progless,
	killed: &KillSwitch,
) -> Result<bool, GrabError> {
	if options.image_name().is_empty() { return Err(GrabError::ImageName); }

	// Drive up-front.
	let status = transport.drive_ready();
	if ! status.is_good() { return Err(GrabError::DriveNotReady(status.to_string())); }

	let (vendor, product) = transport.inquiry()?;
	let mut drive = DriveConfig::detect(&vendor, &product);
	drive.override_with(
		options.drive_type(),
		options.drive_read_offset(),
		options.drive_c2_shift(),
		options.drive_pregap_start(),
		options.drive_read_method(),
		options.drive_sector_order(),
	);

	let paths = ImagePaths::new(options.image_path(), options.image_name());
	let mut log = EventLog::new(&paths.log());
	log.line(&format!("drive: {} {}", drive.vendor, drive.product));
	log.line(&format!("drive configuration: {drive}"));
	log.line(&format!("image name: {}", options.image_name()));

	let status = transport.set_speed(options.speed().map_or(0xFFFF, |s| s.saturating_mul(150)));
	if ! status.is_good() {
		log.warning(&format!("drive set speed failed, SCSI ({status})"));
	}

	if ! refine && ! options.overwrite() && paths.state().exists() {
		return Err(GrabError::ImageExists(options.image_name().to_owned()));
	}

	let skip_ranges = options.skip().to_vec();

	let mut lba_start = drive.pregap_start;
	let mut lba_end = DEFAULT_LBA_END;

	// TOC, both flavors. Vendors botch the full TOC's index data often
	// enough that the short one is authoritative for positions; the full
	// one wins whenever it actually knows more sessions.
	let toc_buffer = transport.read_toc()?;
	let mut toc = crate::Toc::parse(&toc_buffer)?;
	let full_toc_buffer = transport.read_full_toc().unwrap_or_default();
	if ! full_toc_buffer.is_empty() {
		if let Ok(mut toc_full) = crate::Toc::parse_full(&full_toc_buffer) {
			toc_full.derive_index(&toc);
			if 1 < toc_full.sessions.len() { toc = toc_full; }
			else { toc.disc_type = toc_full.disc_type; }
		}
	}

	if ! refine {
		log.echo("disc TOC:");
		log.echo(&toc.to_string());
	}

	let layout = sector_order_layout(drive.sector_order);
	let subcode = layout.subcode_offset != CD_RAW_DATA_SIZE;
	if ! subcode {
		log.warning("drive doesn't support reading of subchannel data");
	}
	if layout.c2_offset == CD_RAW_DATA_SIZE {
		log.warning("drive doesn't support C2 error pointers");
	}

	// Plain BE descrambles data sectors drive-side, which is only
	// tolerable when the whole disc is data. Mixed discs need a real
	// drive profile.
	let mut scrap = false;
	if matches!(drive.read_method, ReadMethod::Be) && toc.has_data() {
		if options.drive_type().is_none() && toc.has_audio() {
			return Err(GrabError::UnsupportedReadMethod);
		}
		log.warning("unsupported drive read method");
		scrap = true;
	}

	if refine && ((paths.scram().exists() && scrap) || (paths.scrap().exists() && ! scrap)) {
		return Err(GrabError::MixedReadMethods);
	}

	if ! refine {
		std::fs::create_dir_all(options.image_path())
			.map_err(|_| GrabError::FileWrite(options.image_path().to_string_lossy().into_owned()))?;
	}

	// Delete remnants of the other dump mode.
	let remnant = if scrap { paths.scram() } else { paths.scrap() };
	if remnant.exists() { let _res = std::fs::remove_file(remnant); }

	let scm_path = if scrap { paths.scrap() } else { paths.scram() };
	let mut fs_scm =
		if refine { open_rw(&scm_path)? }
		else { create_trunc(&scm_path)? };
	let mut fs_sub =
		if subcode {
			Some(
				if refine { open_rw(&paths.subcode())? }
				else { create_trunc(&paths.subcode())? }
			)
		}
		else { None };
	let mut fs_state =
		if refine { open_rw(&paths.state())? }
		else { create_trunc(&paths.state())? };

	// Breaker Pro ships a fake TOC whose lead-out sits at zero; fall back
	// to a 74-minute disc and let overread find the true edge.
	match toc.last_track() {
		Some(t) if 0 < t.lba_end => { lba_end = t.lba_end; },
		_ => { log.warning("fake TOC detected, using default 74min disc size"); },
	}

	let error_ranges = toc.session_gaps(drive.pregap_start);

	if refine {
		// Same disc?
		let toc_buffer_file = read_capture(&paths.toc())?;
		if toc_buffer != toc_buffer_file { return Err(GrabError::TocMismatch); }
	}
	else {
		write_capture(&paths.toc(), &toc_buffer)?;
		if ! full_toc_buffer.is_empty() {
			write_capture(&paths.fulltoc(), &full_toc_buffer)?;
		}

		let mut read_cdtext = ! options.disable_cdtext();
		// PX-W4824A hangs indefinitely on multisession CD-TEXT.
		if 1 < toc.sessions.len() && drive.vendor == "PLEXTOR" && drive.product == "CD-R PX-W4824A" {
			read_cdtext = false;
		}

		if read_cdtext {
			let mut cd_text_buffer = Vec::new();
			let status = transport.read_cd_text(&mut cd_text_buffer);
			if ! status.is_good() {
				log.warning(&format!("unable to read CD-TEXT, SCSI ({status})"));
			}
			else if ! cd_text_buffer.is_empty() {
				write_capture(&paths.cdtext(), &cd_text_buffer)?;
			}
		}
		else { log.warning("CD-TEXT disabled"); }
	}

	// Read the lead-in early; it improves the chance of extracting both
	// sessions at once.
	if matches!(drive.kind, DriveType::Plextor) && ! options.plextor_skip_leadin() {
		let session_lba_start: Vec<i32> = toc.sessions.iter()
			.enumerate()
			.map(|(i, s)|
				(if i == 0 { 0 } else { s.tracks.first().map_or(0, |t| t.indices[0]) })
					- MSF_LBA_SHIFT
			)
			.collect();

		leadin::store_sessions_leadin(
			&mut fs_scm,
			fs_sub.as_mut(),
			&mut fs_state,
			transport,
			&session_lba_start,
			&drive,
			options.verbose(),
			&mut log,
		)?;
	}

	if let Some(v) = options.lba_start() { lba_start = v; }
	if let Some(v) = options.lba_end() { lba_end = v; }

	let mut errors_scsi: u32 = 0;
	let mut errors_c2: u32 = 0;
	let mut errors_q: u32 = 0;

	let mut sector_data = vec![0_u8; CD_DATA_SIZE];
	let mut sector_subcode = vec![0_u8; CD_SUBCODE_SIZE];
	let mut sector_state: SectorStates = [State::ErrorSkip; CD_DATA_SIZE_SAMPLES];

	let mut subcode_shift: i32 = 0;

	// Drive specific.
	let mut asus_leadout_buffer: Vec<u8> = Vec::new();
	let asus_leadout = drive.is_asus() && ! options.asus_skip_leadout();

	let mut lba_refine = LBA_START - 1;
	let mut refine_counter: u32 = 0;
	let mut refine_processed: u32 = 0;
	let mut refine_count: u32 = 0;
	let refine_retries = options.retries().max(1);

	let data_offset_bytes = drive.read_offset.samples() * CD_SAMPLE_SIZE as i32;
	let state_offset = drive.read_offset.samples();

	// Pre-pass: count the sectors that still need attention so the
	// progress denominator means something.
	if refine {
		for lba in lba_start..lba_end {
			let lba_index = lba - LBA_START;
			if inside_range(lba, &skip_ranges).is_some() || inside_range(lba, &error_ranges).is_some() {
				continue;
			}

			let mut refine_sector = false;

			let mut state_bytes = [0_u8; CD_DATA_SIZE_SAMPLES];
			read_entry(&mut fs_state, &mut state_bytes, CD_DATA_SIZE_SAMPLES, lba_index, state_offset, 0)
				.map_err(|_| GrabError::FileRead("state stream".to_owned()))?;
			let states = states_from_bytes(&state_bytes);

			let scsi_exists = states.iter().any(|&s| s == State::ErrorSkip);
			let c2_exists = states.iter().any(|&s| s == State::ErrorC2);
			if scsi_exists {
				errors_scsi += 1;
				refine_sector = true;
			}
			else if c2_exists {
				errors_c2 += 1;
				refine_sector = true;
			}

			if let Some(f) = fs_sub.as_mut() {
				read_entry(f, &mut sector_subcode, CD_SUBCODE_SIZE, lba_index, 0, 0)
					.map_err(|_| GrabError::FileRead("subcode stream".to_owned()))?;
				if ! ChannelQ::from_subcode(&sector_subcode).valid() {
					errors_q += 1;
					if options.refine_subchannel() { refine_sector = true; }
				}
			}

			if refine_sector { refine_count += 1; }
		}
	}

	let mut errors_q_last = errors_q;

	log.echo(&format!("{} started", if refine { "refine" } else { "dump" }));
	let dump_time_start = Instant::now();

	let mut lba_overread = lba_end;
	let mut progress_total = (lba_overread - lba_start).max(1).unsigned_abs();
	if refine { progress_total = (refine_count * refine_retries).max(1); }
	let _res = progress.try_reset(progress_total);

	let mut lba = lba_start;
	while lba < lba_overread {
		if let Some(r) = inside_range(lba, &skip_ranges) {
			lba = r.1;
			continue;
		}
		let mut lba_next = lba + 1;

		let lba_index = lba - LBA_START;

		let mut read = true;
		let mut flush = false;
		let mut store = false;

		// Mirror the lead-out from the drive's DRAM cache.
		if asus_leadout {
			let r = inside_range(lba, &error_ranges).copied();

			// First sector of a gap (or the lead-out proper): grab the
			// cache now.
			if r.is_some_and(|r| lba == r.0) || lba == lba_end {
				if refine {
					// Dummy read to (re)populate the cache.
					let mut warmup = vec![0_u8; CD_RAW_DATA_SIZE];
					let _status = read_sector(&mut warmup, transport, &drive, lba - 1);
				}

				log.line(&format!("LG/ASUS: searching lead-out in cache (LBA: {lba:6})"));
				match transport.asus_cache_read() {
					Ok(cache) => {
						write_capture(&paths.asus(), &cache)?;
						asus_leadout_buffer = asus_cache_extract(&cache, lba, ASUS_LEADOUT_COUNT);
					},
					Err(_) => {
						log.warning("LG/ASUS: cache read failed");
						asus_leadout_buffer.clear();
					},
				}

				let entries_count = asus_leadout_buffer.len().wrapping_div(CD_RAW_DATA_SIZE);
				if entries_count == 0 { log.line("LG/ASUS: lead-out not found"); }
				else {
					log.line(&format!("LG/ASUS: lead-out found (LBA: {lba:6}, sectors: {entries_count})"));
				}
			}

			// Serve sectors straight from the captured run for as long as
			// it covers them.
			if r.is_some_and(|r| r.0 <= lba) || lba_end <= lba {
				let leadout_index = (lba - r.map_or(lba_end, |r| r.0)).unsigned_abs() as usize;
				if leadout_index < asus_leadout_buffer.len().wrapping_div(CD_RAW_DATA_SIZE) {
					let entry = &asus_leadout_buffer[CD_RAW_DATA_SIZE * leadout_index..CD_RAW_DATA_SIZE * (leadout_index + 1)];

					sector_data.copy_from_slice(&entry[..CD_DATA_SIZE]);
					sector_subcode.copy_from_slice(&entry[CD_DATA_SIZE + CD_C2_SIZE..]);
					let sector_c2 = &entry[CD_DATA_SIZE..CD_DATA_SIZE + CD_C2_SIZE];

					sector_state = [State::SuccessScsiOff; CD_DATA_SIZE_SAMPLES];
					let c2_count = state_from_c2(&mut sector_state, sector_c2);
					if c2_count != 0 {
						if ! refine { errors_c2 += 1; }

						if options.verbose() {
							log.line(&format!(
								"[LBA: {lba:6}] C2 error (bits: {c2_count:4}, data crc: {:08X}, C2 crc: {:08X}{})",
								crc32fast::hash(&sector_data),
								crc32fast::hash(sector_c2),
								retry_suffix(refine, refine_counter),
							));
						}
					}

					store = true;
					read = false;
				}
			}
		}

		// In refine mode only sectors with something to gain get re-read.
		if refine && read {
			read = false;

			let mut state_bytes = [0_u8; CD_DATA_SIZE_SAMPLES];
			read_entry(&mut fs_state, &mut state_bytes, CD_DATA_SIZE_SAMPLES, lba_index, state_offset, 0)
				.map_err(|_| GrabError::FileRead("state stream".to_owned()))?;
			let states = states_from_bytes(&state_bytes);
			let skip_exists = states.iter().any(|&s| s == State::ErrorSkip);
			let c2_exists = states.iter().any(|&s| s == State::ErrorC2);

			if skip_exists || c2_exists { read = true; }
			if c2_exists { flush = true; }

			// Refine subchannel (based on the Q CRC).
			if options.refine_subchannel() && ! read {
				if let Some(f) = fs_sub.as_mut() {
					read_entry(f, &mut sector_subcode, CD_SUBCODE_SIZE, lba_index + subcode_shift, 0, 0)
						.map_err(|_| GrabError::FileRead("subcode stream".to_owned()))?;
					if ! ChannelQ::from_subcode(&sector_subcode).valid() { read = true; }
				}
			}

			if read {
				if lba_refine == lba {
					refine_counter += 1;
					if refine_counter < refine_retries { lba_next = lba; }
					// Maximum retries reached.
					else {
						if options.verbose() {
							log.line(&format!("[LBA: {lba:6}] correction failure"));
						}
						read = false;
						refine_processed += 1;
						refine_counter = 0;
					}
				}
				// Initial read.
				else {
					lba_refine = lba;
					lba_next = lba;
				}
			}
			// Sector is fixed.
			else if lba_refine == lba {
				if options.verbose() {
					log.line(&format!("[LBA: {lba:6}] correction success"));
				}
				refine_processed += 1;
				refine_counter = 0;
			}
		}

		if read {
			let mut sector_buffer = vec![0_u8; CD_RAW_DATA_SIZE];

			if flush { transport.flush_cache(lba); }

			let read_time_start = Instant::now();
			let status = read_sector(&mut sector_buffer, transport, &drive, lba);
			let slow = SLOW_SECTOR_TIMEOUT < read_time_start.elapsed().as_secs();

			// PLEXTOR: multisession lead-out overread. A couple of slow
			// sectors usually precede the SCSI error, and some models
			// (PX-708UF) die on the I/O semaphore timeout instead, so
			// don't push the point.
			if matches!(drive.kind, DriveType::Plextor) && slow && inside_range(lba, &error_ranges).is_some() {
			}
			else if ! status.is_good() {
				// Don't count lead-out overread errors.
				if inside_range(lba, &error_ranges).is_none() && lba < lba_end {
					if ! refine { errors_scsi += 1; }

					if options.verbose() {
						log.line(&format!(
							"[LBA: {lba:6}] SCSI error ({status}{})",
							retry_suffix(refine, refine_counter),
						));
					}
				}
			}
			else {
				sector_data.copy_from_slice(&sector_buffer[..CD_DATA_SIZE]);
				sector_subcode.copy_from_slice(&sector_buffer[CD_DATA_SIZE + CD_C2_SIZE..]);
				let sector_c2 = &sector_buffer[CD_DATA_SIZE..CD_DATA_SIZE + CD_C2_SIZE];

				sector_state = [State::Success; CD_DATA_SIZE_SAMPLES];
				let c2_count = state_from_c2(&mut sector_state, sector_c2);
				if c2_count != 0 {
					if ! refine { errors_c2 += 1; }

					if options.verbose() {
						log.line(&format!(
							"[LBA: {lba:6}] C2 error (bits: {c2_count:4}, data crc: {:08X}, C2 crc: {:08X}{})",
							crc32fast::hash(&sector_data),
							crc32fast::hash(sector_c2),
							retry_suffix(refine, refine_counter),
						));
					}
				}

				store = true;
			}
		}

		if store {
			// Some drives desync at a random sector; track the drift via
			// valid positional Qs and apply it to every subchannel write.
			if subcode {
				let q = ChannelQ::from_subcode(&sector_subcode);
				if q.valid() && q.adr() == 1 && q.tno() != 0 {
					let shift = q.a_lba() - lba;
					if shift != subcode_shift {
						subcode_shift = shift;
						log.line(&format!("[LBA: {lba:6}] subcode desync (shift: {subcode_shift:+})"));
					}
				}
			}

			if refine {
				let mut state_bytes = [0_u8; CD_DATA_SIZE_SAMPLES];
				read_entry(&mut fs_state, &mut state_bytes, CD_DATA_SIZE_SAMPLES, lba_index, state_offset, 0)
					.map_err(|_| GrabError::FileRead("state stream".to_owned()))?;
				let states_file = states_from_bytes(&state_bytes);

				let mut data_file = vec![0_u8; CD_DATA_SIZE];
				read_entry(&mut fs_scm, &mut data_file, CD_DATA_SIZE, lba_index, data_offset_bytes, 0)
					.map_err(|_| GrabError::FileRead("main stream".to_owned()))?;

				let merged = merge_sector(&mut sector_state, &mut sector_data, &states_file, &data_file);

				if merged.update {
					write_entry(&mut fs_scm, &sector_data, CD_DATA_SIZE, lba_index, data_offset_bytes)
						.map_err(|_| GrabError::FileWrite("main stream".to_owned()))?;
					write_entry(&mut fs_state, &states_to_bytes(&sector_state), CD_DATA_SIZE_SAMPLES, lba_index, state_offset)
						.map_err(|_| GrabError::FileWrite("state stream".to_owned()))?;

					if inside_range(lba, &error_ranges).is_none() && lba < lba_end {
						if merged.scsi_before && ! merged.scsi_after {
							errors_scsi -= 1;
							if merged.c2_after { errors_c2 += 1; }
						}
						else if merged.c2_before && ! merged.c2_after {
							errors_c2 -= 1;
						}
					}
				}

				// Overwrite the stored Q only if it was bad and the fresh
				// copy is good.
				if let Some(f) = fs_sub.as_mut() {
					let q = ChannelQ::from_subcode(&sector_subcode);
					if q.valid() {
						let mut sub_file = [0_u8; CD_SUBCODE_SIZE];
						read_entry(f, &mut sub_file, CD_SUBCODE_SIZE, lba_index + subcode_shift, 0, 0)
							.map_err(|_| GrabError::FileRead("subcode stream".to_owned()))?;
						if ! ChannelQ::from_subcode(&sub_file).valid() {
							write_entry(f, &sector_subcode, CD_SUBCODE_SIZE, lba_index + subcode_shift, 0)
								.map_err(|_| GrabError::FileWrite("subcode stream".to_owned()))?;
							if inside_range(lba, &error_ranges).is_none() {
								errors_q = errors_q.saturating_sub(1);
							}
						}
					}
				}
			}
			else {
				write_entry(&mut fs_scm, &sector_data, CD_DATA_SIZE, lba_index, data_offset_bytes)
					.map_err(|_| GrabError::FileWrite("main stream".to_owned()))?;

				if let Some(f) = fs_sub.as_mut() {
					write_entry(f, &sector_subcode, CD_SUBCODE_SIZE, lba_index + subcode_shift, 0)
						.map_err(|_| GrabError::FileWrite("subcode stream".to_owned()))?;

					if ChannelQ::from_subcode(&sector_subcode).valid() {
						errors_q_last = errors_q;
					}
					else {
						// PLEXTOR: some drives byte-desync the subchannel
						// after mass C2 errors at high speed. Flushing the
						// cache after a burst of Q errors recovers them.
						if Q_ERROR_FLUSH_THRESHOLD < errors_q - errors_q_last {
							transport.flush_cache(lba);
							errors_q_last = errors_q;
						}

						errors_q += 1;
					}
				}

				write_entry(&mut fs_state, &states_to_bytes(&sector_state), CD_DATA_SIZE_SAMPLES, lba_index, state_offset)
					.map_err(|_| GrabError::FileWrite("state stream".to_owned()))?;
			}

			// Grow the lead-out overread while the reads keep landing.
			if lba + 1 == lba_overread && options.lba_end().is_none() {
				lba_overread += 1;
			}
		}
		else {
			// Past the last session (disc) lead-out.
			if lba + 1 == lba_overread { lba_overread = lba; }
			// Between sessions.
			else if let Some(r) = inside_range(lba, &error_ranges) { lba_next = r.1; }
		}

		if killed.killed() {
			log.line(&format!("[LBA: {lba:6}] forced stop"));
			lba_overread = lba;
		}

		// Progress bookkeeping.
		if refine {
			if lba == lba_refine {
				progress.set_done(refine_processed * refine_retries + refine_counter);
			}
		}
		else {
			let total = (lba_overread - lba_start).max(1).unsigned_abs();
			if total != progress_total {
				progress_total = total;
				let _res = progress.try_reset(total);
			}
			progress.set_done((lba - lba_start).max(0).unsigned_abs());
		}

		lba = lba_next;
	}

	progress.finish();

	log.echo(&format!(
		"{} complete (time: {}s)",
		if refine { "refine" } else { "dump" },
		dump_time_start.elapsed().as_secs(),
	));
	log.echo("media errors:");
	log.echo(&format!("  SCSI: {errors_scsi}"));
	log.echo(&format!("  C2: {errors_c2}"));
	log.echo(&format!("  Q: {errors_q}"));

	// Always refine once more for LG/ASUS, to improve the odds of catching
	// enough lead-out sectors.
	Ok(errors_scsi != 0 || errors_c2 != 0 || asus_leadout)
}

/// # Retry Annotation.
///
/// Verbose error lines mention the retry number during refine.
fn retry_suffix(refine: bool, refine_counter: u32) -> String {
	if refine { format!(", retry: {}", refine_counter + 1) }
	else { String::new() }
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		CD_DATA_SYNC,
		CddaSubCode,
		ErrorField,
		Msf,
		ReadType,
		Scrambler,
		ScsiStatus,
		SubchannelMode,
		subcode::test::{
			interleave_q,
			mode1_q,
		},
		toc::test::{
			full_toc,
			short_toc,
		},
	};
	use std::{
		collections::HashMap,
		path::{
			Path,
			PathBuf,
		},
	};

	/// # Read a Slice of a File.
	///
	/// The streams cover the whole coordinate space and get big; spot
	/// checks should seek rather than slurp.
	fn read_at(path: &Path, pos: u64, len: usize) -> Vec<u8> {
		use std::io::{
			Read,
			Seek,
			SeekFrom,
		};

		let mut file = std::fs::File::open(path).expect("Missing stream.");
		file.seek(SeekFrom::Start(pos)).expect("Seek failed.");
		let mut out = vec![0_u8; len];
		file.read_exact(&mut out).expect("Short read.");
		out
	}

	/// # A synthetic two-session disc behind the transport interface.
	///
	/// Sector payloads are deterministic audio-style noise; C2 and SCSI
	/// failures can be injected per LBA.
	pub(crate) struct FakeDrive {
		pub(crate) vendor: &'static str,
		pub(crate) product: &'static str,
		pub(crate) toc: Vec<u8>,
		pub(crate) full_toc: Vec<u8>,
		pub(crate) leadout: i32,
		pub(crate) gap: Option<(i32, i32)>,
		pub(crate) scsi_errors: HashMap<i32, u32>,
		pub(crate) c2_errors: HashMap<i32, (usize, u8)>,
		pub(crate) asus_cache: Vec<u8>,
		pub(crate) kill_after: Option<(u32, std::sync::Arc<std::sync::atomic::AtomicBool>)>,
		pub(crate) reads: u32,
	}

	impl FakeDrive {
		/// # Single-session audio disc.
		pub(crate) fn new(leadout: i32) -> Self {
			Self {
				vendor: "FAKE",
				product: "TESTBED 9000",
				toc: short_toc(&[(1, 0, 0)], leadout),
				full_toc: full_toc(&[(1, &[(1, 0, 0)], leadout)]),
				leadout,
				gap: None,
				scsi_errors: HashMap::new(),
				c2_errors: HashMap::new(),
				asus_cache: Vec::new(),
				kill_after: None,
				reads: 0,
			}
		}

		/// # Two-session audio disc with an unreadable gap between.
		pub(crate) fn two_session() -> Self {
			Self {
				toc: short_toc(&[(1, 0, 0), (2, 0, 340)], 400),
				full_toc: full_toc(&[
					(1, &[(1, 0, 0)], 40),
					(2, &[(2, 0, 340)], 400),
				]),
				leadout: 400,
				gap: Some((40, 190)),
				..Self::new(400)
			}
		}

		/// # Deterministic sector payload.
		pub(crate) fn payload(lba: i32) -> Vec<u8> {
			let seed = lba.unsigned_abs().wrapping_mul(2_654_435_761);
			(0..CD_DATA_SIZE)
				.map(|i| (seed.wrapping_add(i as u32).wrapping_mul(0x9E37_79B9) >> 24) as u8)
				.collect()
		}

		fn fill(&mut self, dst: &mut [u8], lba: i32) -> ScsiStatus {
			const MEDIUM_ERROR: ScsiStatus = ScsiStatus { status: 2, sense_key: 3, asc: 0x11, ascq: 0 };

			// Readable window: pregap through lead-out plus a couple of
			// overreadable sectors, minus any inter-session gap.
			if lba < -150 || self.leadout + 2 <= lba {
				return MEDIUM_ERROR;
			}
			if self.gap.is_some_and(|(a, b)| a <= lba && lba < b) {
				return MEDIUM_ERROR;
			}
			if let Some(left) = self.scsi_errors.get_mut(&lba) {
				if *left != 0 {
					*left -= 1;
					return MEDIUM_ERROR;
				}
			}

			dst[..CD_DATA_SIZE].copy_from_slice(&Self::payload(lba));
			dst[CD_DATA_SIZE..CD_DATA_SIZE + CD_C2_SIZE].fill(0);
			if let Some(&(byte, bits)) = self.c2_errors.get(&lba) {
				dst[CD_DATA_SIZE + byte] = bits;
			}

			let tno = if self.leadout <= lba { 0xAA } else { 0x01 };
			let q = mode1_q(0, tno, 0x01, lba.max(0), lba);
			dst[CD_DATA_SIZE + CD_C2_SIZE..CD_RAW_DATA_SIZE].copy_from_slice(&interleave_q(&q));
			ScsiStatus::GOOD
		}

		/// # One Raw Block Holding a Given Lead-Out Sector.
		fn raw_entry(lba: i32) -> Vec<u8> {
			let mut out = vec![0_u8; CD_RAW_DATA_SIZE];
			out[..CD_DATA_SIZE].copy_from_slice(&Self::payload(lba));
			let q = mode1_q(0, 0xAA, 0x01, lba, lba);
			out[CD_DATA_SIZE + CD_C2_SIZE..].copy_from_slice(&interleave_q(&q));
			out
		}
	}

	impl DriveTransport for FakeDrive {
		fn inquiry(&mut self) -> Result<(String, String), GrabError> {
			Ok((self.vendor.to_owned(), self.product.to_owned()))
		}

		fn drive_ready(&mut self) -> ScsiStatus { ScsiStatus::GOOD }

		fn set_speed(&mut self, _speed: u16) -> ScsiStatus { ScsiStatus::GOOD }

		fn read_toc(&mut self) -> Result<Vec<u8>, GrabError> { Ok(self.toc.clone()) }

		fn read_full_toc(&mut self) -> Result<Vec<u8>, GrabError> { Ok(self.full_toc.clone()) }

		fn read_cd_text(&mut self, _out: &mut Vec<u8>) -> ScsiStatus {
			ScsiStatus { status: 2, sense_key: 5, asc: 0x24, ascq: 0 }
		}

		fn read_cd(
			&mut self,
			dst: &mut [u8],
			lba: i32,
			count: u32,
			_kind: ReadType,
			_c2: ErrorField,
			_sub: SubchannelMode,
		) -> ScsiStatus {
			self.reads += count;
			if let Some((after, flag)) = &self.kill_after {
				if *after <= self.reads {
					flag.store(true, std::sync::atomic::Ordering::SeqCst);
				}
			}
			for i in 0..count {
				let status = self.fill(
					&mut dst[CD_RAW_DATA_SIZE * i as usize..CD_RAW_DATA_SIZE * (i as usize + 1)],
					lba + i as i32,
				);
				if ! status.is_good() { return status; }
			}
			ScsiStatus::GOOD
		}

		fn read_cdda(
			&mut self,
			dst: &mut [u8],
			lba: i32,
			count: u32,
			_sub: CddaSubCode,
		) -> ScsiStatus {
			self.read_cd(dst, lba, count, ReadType::Cdda, ErrorField::C2, SubchannelMode::Raw)
		}

		fn flush_cache(&mut self, _lba: i32) -> ScsiStatus { ScsiStatus::GOOD }

		fn plextor_read_leadin(&mut self, sectors: u32) -> Result<Vec<u8>, GrabError> {
			// Entries ending right at the pre-gap reach, oldest first.
			let mut out = Vec::new();
			for i in 0..sectors as i32 {
				let lba = -150 + i;
				let mut entry = vec![0_u8; crate::PLEXTOR_LEADIN_ENTRY_SIZE];
				entry[..4].copy_from_slice(&ScsiStatus::GOOD.to_bytes());
				entry[4..4 + CD_DATA_SIZE].copy_from_slice(&Self::payload(lba));
				let q = mode1_q(0, 0x01, 0x00, lba + 150, lba);
				entry[4 + CD_DATA_SIZE + CD_C2_SIZE..].copy_from_slice(&interleave_q(&q));
				out.extend_from_slice(&entry);
			}
			Ok(out)
		}

		fn asus_cache_read(&mut self) -> Result<Vec<u8>, GrabError> {
			Ok(self.asus_cache.clone())
		}
	}

	/// # Scratch directory for a test run.
	pub(crate) fn scratch(name: &str) -> PathBuf {
		let dir = std::env::temp_dir().join("cdgrab-dump-test").join(name);
		let _res = std::fs::remove_dir_all(&dir);
		std::fs::create_dir_all(&dir).expect("No scratch dir.");
		dir
	}

	/// # Baseline options for a test dump.
	pub(crate) fn test_options(dir: &std::path::Path) -> DumpOptions {
		DumpOptions::default()
			.with_image_path(dir)
			.with_image_name("test".to_owned())
			// Keep the window tight so tests stay fast.
			.with_lba_start(Some(0))
			.with_lba_end(Some(64))
	}

	#[test]
	fn t_clean_dump() {
		let dir = scratch("clean");
		let mut fake = FakeDrive::new(64);
		let opts = test_options(&dir);
		let progress = Progless::try_from(1_u32).expect("Progless failed.");
		let killed = KillSwitch::default();

		let again = dump(&mut fake, &opts, false, &progress, &killed)
			.expect("Dump failed.");
		assert!(! again, "A clean non-ASUS dump shouldn't want a refine.");

		// All 64 sectors' samples should be SUCCESS.
		let start = (0 - LBA_START) as u64 * CD_DATA_SIZE_SAMPLES as u64;
		let raw = read_at(&dir.join("test.state"), start, 64 * CD_DATA_SIZE_SAMPLES);
		assert!(
			raw.iter().all(|&b| b == State::Success.as_u8()),
			"Every sample should be SUCCESS.",
		);

		// The main stream should hold the payloads, positioned by index.
		let pos = (10 - LBA_START) as u64 * CD_DATA_SIZE as u64;
		let data = read_at(&dir.join("test.scram"), pos, CD_DATA_SIZE);
		assert_eq!(data, FakeDrive::payload(10));

		// And the subcode should round-trip valid Qs.
		let pos = (10 - LBA_START) as u64 * CD_SUBCODE_SIZE as u64;
		let sub = read_at(&dir.join("test.subcode"), pos, CD_SUBCODE_SIZE);
		let q = ChannelQ::from_subcode(&sub);
		assert!(q.valid());
		assert_eq!(q.a_lba(), 10);
	}

	#[test]
	fn t_c2_then_refine() {
		let dir = scratch("c2-refine");
		let mut fake = FakeDrive::new(64);
		// One C2 bit at LBA 32, byte 0, bit 7: sample zero goes bad.
		fake.c2_errors.insert(32, (0, 0b1000_0000));

		let opts = test_options(&dir);
		let progress = Progless::try_from(1_u32).expect("Progless failed.");
		let killed = KillSwitch::default();

		let again = dump(&mut fake, &opts, false, &progress, &killed)
			.expect("Dump failed.");
		assert!(again, "C2 errors should schedule a refine.");

		let state_path = dir.join("test.state");
		let start = (32 - LBA_START) as u64 * CD_DATA_SIZE_SAMPLES as u64;
		let raw = read_at(&state_path, start, 2);
		assert_eq!(raw[0], State::ErrorC2.as_u8());
		assert_eq!(raw[1], State::Success.as_u8());

		// Clean second read: refine should promote the sample and report
		// no remaining errors.
		fake.c2_errors.clear();
		let again = dump(&mut fake, &opts, true, &progress, &killed)
			.expect("Refine failed.");
		assert!(! again, "All fixed; no more passes needed.");

		let raw = read_at(&state_path, start, 2);
		assert_eq!(raw[0], State::Success.as_u8());
	}

	#[test]
	fn t_scsi_error_skip_then_refine() {
		let dir = scratch("scsi-refine");
		let mut fake = FakeDrive::new(64);
		// LBA 40 fails twice before recovering.
		fake.scsi_errors.insert(40, 2);

		let opts = test_options(&dir).with_retries(5);
		let progress = Progless::try_from(1_u32).expect("Progless failed.");
		let killed = KillSwitch::default();

		let again = dump(&mut fake, &opts, false, &progress, &killed)
			.expect("Dump failed.");
		assert!(again);

		let start = (40 - LBA_START) as u64 * CD_DATA_SIZE_SAMPLES as u64;
		let raw = read_at(&dir.join("test.state"), start, CD_DATA_SIZE_SAMPLES);
		assert!(
			raw.iter().all(|&b| b == State::ErrorSkip.as_u8()),
			"A failed read should leave the whole sector skipped.",
		);

		// The refine pass retries until the injected failures run dry.
		let again = dump(&mut fake, &opts, true, &progress, &killed)
			.expect("Refine failed.");
		assert!(! again);

		let raw = read_at(&dir.join("test.state"), start, CD_DATA_SIZE_SAMPLES);
		assert!(raw.iter().all(|&b| b == State::Success.as_u8()));

		// And the data should have arrived.
		let pos = (40 - LBA_START) as u64 * CD_DATA_SIZE as u64;
		let data = read_at(&dir.join("test.scram"), pos, CD_DATA_SIZE);
		assert_eq!(data, FakeDrive::payload(40));
	}

	#[test]
	fn t_image_collision() {
		let dir = scratch("collision");
		let mut fake = FakeDrive::new(64);
		let opts = test_options(&dir);
		let progress = Progless::try_from(1_u32).expect("Progless failed.");
		let killed = KillSwitch::default();

		dump(&mut fake, &opts, false, &progress, &killed).expect("Dump failed.");

		// A second dump without overwrite must refuse.
		assert!(matches!(
			dump(&mut fake, &opts, false, &progress, &killed),
			Err(GrabError::ImageExists(_)),
		));

		// With overwrite it restarts.
		let opts = opts.with_overwrite(true);
		dump(&mut fake, &opts, false, &progress, &killed).expect("Overwrite dump failed.");
	}

	#[test]
	fn t_refine_toc_mismatch() {
		let dir = scratch("mismatch");
		let mut fake = FakeDrive::new(64);
		let opts = test_options(&dir);
		let progress = Progless::try_from(1_u32).expect("Progless failed.");
		let killed = KillSwitch::default();

		dump(&mut fake, &opts, false, &progress, &killed).expect("Dump failed.");

		// A different disc shows up for the refine.
		let mut other = FakeDrive::new(100);
		other.toc = short_toc(&[(1, 0, 0), (2, 0, 50)], 100);
		assert!(matches!(
			dump(&mut other, &opts, true, &progress, &killed),
			Err(GrabError::TocMismatch),
		));
	}

	#[test]
	fn t_overread_growth() {
		let dir = scratch("overread");
		let mut fake = FakeDrive::new(64);
		let opts = test_options(&dir).with_lba_end(None);
		let progress = Progless::try_from(1_u32).expect("Progless failed.");
		let killed = KillSwitch::default();

		dump(&mut fake, &opts, false, &progress, &killed).expect("Dump failed.");

		// The fake allows two sectors of overread past the lead-out; both
		// should have been captured before the SCSI wall stopped growth.
		let start = (64 - LBA_START) as u64 * CD_DATA_SIZE_SAMPLES as u64;
		let raw = read_at(&dir.join("test.state"), start, 2 * CD_DATA_SIZE_SAMPLES);
		assert!(
			raw.iter().all(|&b| b == State::Success.as_u8()),
			"Overread sectors should have been dumped.",
		);
	}

	#[test]
	fn t_two_session_clean() {
		let dir = scratch("two-session");
		let mut fake = FakeDrive::two_session();
		let opts = DumpOptions::default()
			.with_image_path(&dir)
			.with_image_name("test".to_owned())
			.with_lba_start(Some(0))
			.with_lba_end(Some(400));
		let progress = Progless::try_from(1_u32).expect("Progless failed.");
		let killed = KillSwitch::default();

		let again = dump(&mut fake, &opts, false, &progress, &killed)
			.expect("Dump failed.");
		assert!(! again, "A clean non-ASUS dump shouldn't want a refine.");

		// Both program areas should be SUCCESS...
		for lba in [0, 39, 190, 339, 399] {
			let start = (lba - LBA_START) as u64 * CD_DATA_SIZE_SAMPLES as u64;
			let raw = read_at(&dir.join("test.state"), start, CD_DATA_SIZE_SAMPLES);
			assert!(
				raw.iter().all(|&b| b == State::Success.as_u8()),
				"LBA {lba} should be SUCCESS.",
			);
		}

		// ...while the gap was jumped over entirely.
		let start = (100 - LBA_START) as u64 * CD_DATA_SIZE_SAMPLES as u64;
		let raw = read_at(&dir.join("test.state"), start, CD_DATA_SIZE_SAMPLES);
		assert!(
			raw.iter().all(|&b| b == State::ErrorSkip.as_u8()),
			"Gap sectors should never be touched.",
		);
	}

	#[test]
	fn t_asus_leadout() {
		let dir = scratch("asus");
		let mut fake = FakeDrive::new(64);
		fake.vendor = "ASUS";
		fake.product = "BW-16D1HT";
		// Six lead-out sectors waiting in the DRAM cache, beyond what the
		// SCSI path can reach.
		for lba in 64..70 {
			fake.asus_cache.extend_from_slice(&FakeDrive::raw_entry(lba));
		}

		let opts = DumpOptions::default()
			.with_image_path(&dir)
			.with_image_name("test".to_owned())
			.with_lba_start(Some(0));
		let progress = Progless::try_from(1_u32).expect("Progless failed.");
		let killed = KillSwitch::default();

		let again = dump(&mut fake, &opts, false, &progress, &killed)
			.expect("Dump failed.");
		assert!(again, "LG/ASUS dumps always request a follow-up pass.");

		// The cache snapshot should have been persisted raw.
		assert!(dir.join("test.asus").exists());

		// Sectors 64..70 come out of the cache, marked SUCCESS_SCSI_OFF.
		// (The BW-16D1HT profile reads +6 samples, shifting the streams.)
		let start = (64 - LBA_START) as u64 * CD_DATA_SIZE_SAMPLES as u64 - 6;
		let raw = read_at(&dir.join("test.state"), start, 6 * CD_DATA_SIZE_SAMPLES);
		assert!(
			raw.iter().all(|&b| b == State::SuccessScsiOff.as_u8()),
			"Cached lead-out samples should be SUCCESS_SCSI_OFF.",
		);

		let pos = (67 - LBA_START) as u64 * CD_DATA_SIZE as u64 - 24;
		let data = read_at(&dir.join("test.scram"), pos, CD_DATA_SIZE);
		assert_eq!(data, FakeDrive::payload(67));
	}

	#[test]
	fn t_plextor_leadin() {
		let dir = scratch("plextor");
		let mut fake = FakeDrive::new(64);
		fake.vendor = "PLEXTOR";
		fake.product = "DVDR PX-760A";

		// No window overrides: the loop starts at the drive's pre-gap
		// reach and the lead-in capture covers everything behind it.
		let opts = DumpOptions::default()
			.with_image_path(&dir)
			.with_image_name("test".to_owned())
			.with_lba_end(Some(64));
		let progress = Progless::try_from(1_u32).expect("Progless failed.");
		let killed = KillSwitch::default();

		let again = dump(&mut fake, &opts, false, &progress, &killed)
			.expect("Dump failed.");
		assert!(! again);

		// The PX-760A profile reads +30 samples; stream positions shift
		// accordingly.
		let offset_state = 30_u64;
		let offset_data = 120_u64;

		// Lead-in sectors (-150..-75) arrive via the vendor table with
		// C2 coverage off.
		let start = (-100 - LBA_START) as u64 * CD_DATA_SIZE_SAMPLES as u64 - offset_state;
		let raw = read_at(&dir.join("test.state"), start, CD_DATA_SIZE_SAMPLES);
		assert!(
			raw.iter().all(|&b| b == State::SuccessC2Off.as_u8()),
			"Lead-in samples should be SUCCESS_C2_OFF.",
		);

		let pos = (-100 - LBA_START) as u64 * CD_DATA_SIZE as u64 - offset_data;
		let data = read_at(&dir.join("test.scram"), pos, CD_DATA_SIZE);
		assert_eq!(data, FakeDrive::payload(-100));

		// The regular loop covered the pre-gap and program area.
		let start = (10 - LBA_START) as u64 * CD_DATA_SIZE_SAMPLES as u64 - offset_state;
		let raw = read_at(&dir.join("test.state"), start, CD_DATA_SIZE_SAMPLES);
		assert!(raw.iter().all(|&b| b == State::Success.as_u8()));
	}

	#[test]
	fn t_interrupt() {
		let dir = scratch("interrupt");
		let killed = KillSwitch::default();

		let mut fake = FakeDrive::new(2000);
		fake.kill_after = Some((500, killed.inner()));

		let opts = DumpOptions::default()
			.with_image_path(&dir)
			.with_image_name("test".to_owned())
			.with_lba_start(Some(0))
			.with_lba_end(Some(2000));
		let progress = Progless::try_from(1_u32).expect("Progless failed.");

		dump(&mut fake, &opts, false, &progress, &killed).expect("Dump failed.");
		assert!(killed.killed());

		// The prefix up to the stop point is complete and consistent.
		let start = (0 - LBA_START) as u64 * CD_DATA_SIZE_SAMPLES as u64;
		let raw = read_at(&dir.join("test.state"), start, 499 * CD_DATA_SIZE_SAMPLES);
		assert!(
			raw.iter().all(|&b| b == State::Success.as_u8()),
			"Sectors before the interrupt should be intact.",
		);

		// Starting over without --overwrite is refused; with it, fine.
		let fresh = KillSwitch::default();
		assert!(matches!(
			dump(&mut fake, &opts, false, &progress, &fresh),
			Err(GrabError::ImageExists(_)),
		));
		dump(&mut fake, &opts.clone().with_overwrite(true), false, &progress, &fresh)
			.expect("Overwrite dump failed.");
	}

	#[test]
	fn t_scrambled_data_disc() {
		// A data disc dumped over BE_CDDA arrives scrambled; make sure the
		// payload we fake survives a descramble round trip so downstream
		// analysis can rely on it.
		let scrambler = Scrambler::new();
		let mut sector = vec![0_u8; CD_DATA_SIZE];
		sector[..12].copy_from_slice(&CD_DATA_SYNC);
		sector[12..15].copy_from_slice(&Msf::from_lba(16).to_bcd());
		sector[15] = 2;
		scrambler.process(&mut sector);
		assert!(scrambler.descramble(&mut sector, Some(16)));
		assert_eq!(sector[15], 2);
	}
}
