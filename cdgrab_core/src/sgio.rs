/*!
# CDGrab: SG_IO Transport
*/

use crate::{
	CD_RAW_DATA_SIZE,
	CddaSubCode,
	DriveTransport,
	ErrorField,
	GrabError,
	LBA_START,
	ReadType,
	ScsiStatus,
	SubchannelMode,
};
use std::{
	fs::File,
	os::fd::AsRawFd,
	path::{
		Path,
		PathBuf,
	},
};



/// # `SG_IO` ioctl Number.
const SG_IO: libc::c_ulong = 0x2285;

/// # Data Transfer: From the Device.
const SG_DXFER_FROM_DEV: libc::c_int = -3;

/// # Data Transfer: None.
const SG_DXFER_NONE: libc::c_int = -1;

/// # Command Timeout (ms).
const SG_TIMEOUT: u32 = 60_000;

/// # Sense Buffer Size.
const SENSE_LEN: usize = 32;

/// # LG/ASUS Cache Ceiling (16 MiB).
const ASUS_CACHE_MAX: u32 = 16 * 1024 * 1024;

/// # LG/ASUS Cache Chunk (64 KiB).
const ASUS_CACHE_CHUNK: u32 = 64 * 1024;



#[derive(Debug)]
#[repr(C)]
#[allow(non_camel_case_types)]
/// # `struct sg_io_hdr`, verbatim.
struct sg_io_hdr {
	interface_id: libc::c_int,
	dxfer_direction: libc::c_int,
	cmd_len: libc::c_uchar,
	mx_sb_len: libc::c_uchar,
	iovec_count: libc::c_ushort,
	dxfer_len: libc::c_uint,
	dxferp: *mut libc::c_void,
	cmdp: *mut libc::c_uchar,
	sbp: *mut libc::c_uchar,
	timeout: libc::c_uint,
	flags: libc::c_uint,
	pack_id: libc::c_int,
	usr_ptr: *mut libc::c_void,
	status: libc::c_uchar,
	masked_status: libc::c_uchar,
	msg_status: libc::c_uchar,
	sb_len_wr: libc::c_uchar,
	host_status: libc::c_ushort,
	driver_status: libc::c_ushort,
	resid: libc::c_int,
	duration: libc::c_uint,
	info: libc::c_uint,
}



#[derive(Debug)]
/// # SG_IO Transport.
///
/// The real-hardware implementation of [`DriveTransport`], issuing raw
/// CDBs through the Linux SCSI generic driver, one at a time.
pub struct SgTransport {
	file: File,
	dev: PathBuf,
}

impl SgTransport {
	/// # Open a Device.
	///
	/// ## Errors
	///
	/// Returns an error if the path is missing or cannot be opened.
	pub fn open<P: AsRef<Path>>(dev: P) -> Result<Self, GrabError> {
		let dev = dev.as_ref();
		if ! dev.exists() {
			return Err(GrabError::Device(dev.to_string_lossy().into_owned()));
		}

		File::options()
			.read(true)
			.open(dev)
			.map(|file| Self { file, dev: dev.to_path_buf() })
			.map_err(|_| GrabError::DeviceOpen(dev.to_string_lossy().into_owned()))
	}

	#[must_use]
	/// # Device Path.
	pub fn dev(&self) -> &Path { &self.dev }

	/// # Candidate Optical Devices.
	#[must_use]
	pub fn list_drives() -> Vec<PathBuf> {
		(0..16)
			.map(|i| PathBuf::from(format!("/dev/sr{i}")))
			.filter(|p| p.exists())
			.collect()
	}

	/// # First Ready Drive.
	///
	/// Probe each candidate with TEST UNIT READY and return the first that
	/// answers.
	#[must_use]
	pub fn first_ready_drive() -> Option<PathBuf> {
		Self::list_drives().into_iter().find(|dev|
			Self::open(dev).is_ok_and(|mut t| t.drive_ready().is_good())
		)
	}

	#[allow(unsafe_code)]
	/// # Issue One Command.
	///
	/// SCSI failures come back in-band as a status; only a dead ioctl is
	/// an error.
	fn command(&mut self, cdb: &[u8], data: &mut [u8]) -> Result<ScsiStatus, GrabError> {
		let mut cdb = cdb.to_vec();
		let mut sense = [0_u8; SENSE_LEN];

		let mut hdr = sg_io_hdr {
			interface_id: i32::from(b'S'),
			dxfer_direction:
				if data.is_empty() { SG_DXFER_NONE }
				else { SG_DXFER_FROM_DEV },
			cmd_len: cdb.len() as libc::c_uchar,
			mx_sb_len: SENSE_LEN as libc::c_uchar,
			iovec_count: 0,
			dxfer_len: data.len() as libc::c_uint,
			dxferp: data.as_mut_ptr().cast(),
			cmdp: cdb.as_mut_ptr(),
			sbp: sense.as_mut_ptr(),
			timeout: SG_TIMEOUT,
			flags: 0,
			pack_id: 0,
			usr_ptr: std::ptr::null_mut(),
			status: 0,
			masked_status: 0,
			msg_status: 0,
			sb_len_wr: 0,
			host_status: 0,
			driver_status: 0,
			resid: 0,
			duration: 0,
			info: 0,
		};

		// SAFETY: the header and its buffers stay alive for the call.
		let res = unsafe { libc::ioctl(self.file.as_raw_fd(), SG_IO, &raw mut hdr) };
		if res < 0 {
			return Err(GrabError::Scsi(format!(
				"SG_IO failed on {}",
				self.dev.to_string_lossy(),
			)));
		}

		if hdr.status == 0 && hdr.host_status == 0 && hdr.driver_status == 0 {
			Ok(ScsiStatus::GOOD)
		}
		else {
			// Fixed-format sense, when present.
			Ok(ScsiStatus {
				status: if hdr.status == 0 { 2 } else { hdr.status },
				sense_key: sense[2] & 0x0F,
				asc: sense[12],
				ascq: sense[13],
			})
		}
	}

	/// # Read a TOC Flavor.
	///
	/// READ TOC/PMA/ATIP with the given format, trimmed to the response's
	/// own length field.
	fn read_toc_format(&mut self, format: u8) -> Result<Vec<u8>, GrabError> {
		let mut buf = vec![0_u8; 4096];
		let alloc = buf.len() as u16;
		let cdb = [
			0x43, 0x00, format, 0x00, 0x00, 0x00, 0x00,
			(alloc >> 8) as u8, alloc as u8,
			0x00,
		];

		let status = self.command(&cdb, &mut buf)?;
		if ! status.is_good() {
			return Err(GrabError::Scsi(format!("READ TOC (format {format:#04x}): {status}")));
		}

		let len = usize::from(u16::from_be_bytes([buf[0], buf[1]])) + 2;
		buf.truncate(len.min(4096));
		Ok(buf)
	}
}

impl DriveTransport for SgTransport {
	fn inquiry(&mut self) -> Result<(String, String), GrabError> {
		let mut buf = [0_u8; 36];
		let cdb = [0x12, 0x00, 0x00, 0x00, buf.len() as u8, 0x00];
		let status = self.command(&cdb, &mut buf)?;
		if ! status.is_good() {
			return Err(GrabError::Scsi(format!("INQUIRY: {status}")));
		}

		let vendor = String::from_utf8_lossy(&buf[8..16]).trim().to_owned();
		let product = String::from_utf8_lossy(&buf[16..32]).trim().to_owned();
		Ok((vendor, product))
	}

	fn drive_ready(&mut self) -> ScsiStatus {
		// TEST UNIT READY.
		self.command(&[0_u8; 6], &mut [])
			.unwrap_or(ScsiStatus { status: 0xFF, sense_key: 0, asc: 0, ascq: 0 })
	}

	fn set_speed(&mut self, speed: u16) -> ScsiStatus {
		let cdb = [
			0xBB, 0x00,
			(speed >> 8) as u8, speed as u8,
			0xFF, 0xFF, // Write speed: whatever.
			0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
		];
		self.command(&cdb, &mut [])
			.unwrap_or(ScsiStatus { status: 0xFF, sense_key: 0, asc: 0, ascq: 0 })
	}

	fn read_toc(&mut self) -> Result<Vec<u8>, GrabError> {
		self.read_toc_format(0x00)
	}

	fn read_full_toc(&mut self) -> Result<Vec<u8>, GrabError> {
		self.read_toc_format(0x02)
	}

	fn read_cd_text(&mut self, out: &mut Vec<u8>) -> ScsiStatus {
		match self.read_toc_format(0x05) {
			Ok(buf) => {
				out.extend_from_slice(&buf);
				ScsiStatus::GOOD
			},
			Err(_) => ScsiStatus { status: 2, sense_key: 5, asc: 0x24, ascq: 0 },
		}
	}

	fn read_cd(
		&mut self,
		dst: &mut [u8],
		lba: i32,
		count: u32,
		kind: ReadType,
		c2: ErrorField,
		sub: SubchannelMode,
	) -> ScsiStatus {
		let expected: u8 = match kind {
			ReadType::AllTypes => 0,
			ReadType::Cdda => 1,
		};

		// Sync + both headers + user data + EDC/ECC, i.e. the whole 2352.
		let mut flags: u8 = 0xF8;
		if matches!(c2, ErrorField::C2) { flags |= 0x02; }

		let subchannel: u8 = match sub {
			SubchannelMode::None => 0x00,
			SubchannelMode::Raw => 0x01,
		};

		let lba = lba.to_be_bytes();
		let cdb = [
			0xBE, expected << 2,
			lba[0], lba[1], lba[2], lba[3],
			(count >> 16) as u8, (count >> 8) as u8, count as u8,
			flags, subchannel, 0x00,
		];

		self.command(&cdb, dst)
			.unwrap_or(ScsiStatus { status: 0xFF, sense_key: 0, asc: 0, ascq: 0 })
	}

	fn read_cdda(
		&mut self,
		dst: &mut [u8],
		lba: i32,
		count: u32,
		sub: CddaSubCode,
	) -> ScsiStatus {
		let subcode: u8 = match sub {
			CddaSubCode::Data => 0x00,
			CddaSubCode::DataSub => 0x02,
			CddaSubCode::DataC2Sub => 0x03,
		};

		let lba = lba.to_be_bytes();
		let count = count.to_be_bytes();
		let cdb = [
			0xD8, 0x00,
			lba[0], lba[1], lba[2], lba[3],
			count[0], count[1], count[2], count[3],
			subcode, 0x00,
		];

		self.command(&cdb, dst)
			.unwrap_or(ScsiStatus { status: 0xFF, sense_key: 0, asc: 0, ascq: 0 })
	}

	fn flush_cache(&mut self, lba: i32) -> ScsiStatus {
		// READ(12) with FUA and a zero transfer forces the drive to look
		// at the medium again without moving any data.
		let lba = lba.to_be_bytes();
		let cdb = [
			0xA8, 0x08,
			lba[0], lba[1], lba[2], lba[3],
			0x00, 0x00, 0x00, 0x00,
			0x00, 0x00,
		];
		self.command(&cdb, &mut [])
			.unwrap_or(ScsiStatus { status: 0xFF, sense_key: 0, asc: 0, ascq: 0 })
	}

	fn plextor_read_leadin(&mut self, sectors: u32) -> Result<Vec<u8>, GrabError> {
		// One D8 read per lead-in sector, statuses recorded in-band so the
		// caller can sift the table afterward.
		let mut out = Vec::with_capacity(sectors as usize * (4 + CD_RAW_DATA_SIZE));
		let mut entry = vec![0_u8; CD_RAW_DATA_SIZE];

		for i in 0..sectors {
			let lba = LBA_START + i as i32;
			entry.fill(0);
			let status = self.read_cdda(&mut entry, lba, 1, CddaSubCode::DataC2Sub);
			out.extend_from_slice(&status.to_bytes());
			out.extend_from_slice(&entry);
		}

		Ok(out)
	}

	fn asus_cache_read(&mut self) -> Result<Vec<u8>, GrabError> {
		// Vendor F1: walk the DRAM in chunks until the drive stops
		// cooperating.
		let mut out = Vec::new();
		let mut offset: u32 = 0;

		while offset < ASUS_CACHE_MAX {
			let mut chunk = vec![0_u8; ASUS_CACHE_CHUNK as usize];
			let off = offset.to_be_bytes();
			let len = ASUS_CACHE_CHUNK.to_be_bytes();
			let cdb = [
				0xF1, 0x08,
				off[0], off[1], off[2], off[3],
				len[0], len[1], len[2], len[3],
				0x00, 0x00,
			];

			let status = self.command(&cdb, &mut chunk)?;
			if ! status.is_good() { break; }

			out.extend_from_slice(&chunk);
			offset += ASUS_CACHE_CHUNK;
		}

		if out.is_empty() {
			Err(GrabError::Scsi("LG/ASUS cache read returned nothing".to_owned()))
		}
		else { Ok(out) }
	}
}
