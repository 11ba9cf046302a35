/*!
# CDGrab: ISO-9660 Reader
*/

use crate::{
	CD_DATA_SIZE,
	GrabError,
};



/// # Sectors reserved ahead of the volume descriptors.
pub(crate) const SYSTEM_AREA_SIZE: u32 = 16;

/// # Logical block size.
const BLOCK_SIZE: usize = 2048;

/// # Standard identifier.
const CD001: &[u8; 5] = b"CD001";

/// # Offset of the root directory record within the PVD.
const PVD_ROOT_OFFSET: usize = 156;

/// # Directory walk recursion cap.
const MAX_DEPTH: usize = 16;



/// # Sector Source.
///
/// Where the filesystem's raw 2352-byte sectors come from: a dump stream,
/// a split track, a synthetic disc in a test. Sector zero is the start of
/// the track.
pub trait SectorRead {
	/// # Read One Raw Sector.
	///
	/// ## Errors
	///
	/// Returns an error if the sector cannot be fetched.
	fn sector(&mut self, idx: u32) -> Result<Vec<u8>, GrabError>;

	/// # Total Sectors.
	fn sector_count(&self) -> u32;
}

/// # User Data Within a Raw Sector.
///
/// Mode 1 keeps its 2048 bytes right after the header; mode 2 XA tucks an
/// eight-byte sub-header in first.
#[must_use]
pub fn user_data(raw: &[u8]) -> &[u8] {
	if raw.len() < CD_DATA_SIZE { return &[]; }
	match raw[15] {
		1 => &raw[16..16 + BLOCK_SIZE],
		2 => &raw[24..24 + BLOCK_SIZE],
		_ => &[],
	}
}



#[derive(Debug, Clone)]
/// # Directory Record.
pub struct DirEntry {
	pub name: String,
	pub extent: u32,
	pub size: u32,
	pub flags: u8,
	pub unit_size: u8,
	pub gap_size: u8,
	pub date: [u8; 7],
}

impl DirEntry {
	/// # Directory?
	#[must_use]
	pub const fn is_dir(&self) -> bool { self.flags & 0x02 != 0 }

	/// # Interleaved?
	#[must_use]
	pub const fn is_interleaved(&self) -> bool {
		self.unit_size != 0 || self.gap_size != 0
	}

	/// # Dummy?
	///
	/// Zero-length or extent-less records pad some discs out; there's
	/// nothing to read from them.
	#[must_use]
	pub const fn is_dummy(&self) -> bool { self.size == 0 || self.extent == 0 }

	/// # Name Without the Version Suffix.
	#[must_use]
	pub fn base_name(&self) -> &str {
		self.name.split_once(';').map_or(self.name.as_str(), |(a, _)| a)
	}

	/// # Recording Date, `YYYY-MM-DD`.
	#[must_use]
	pub fn date_string(&self) -> String {
		format!(
			"{}-{:02}-{:02}",
			1900 + u16::from(self.date[0]),
			self.date[1],
			self.date[2],
		)
	}

	/// # Parse a Raw Record.
	///
	/// Returns the record and its length, or `None` at a terminator or on
	/// garbage.
	fn parse(raw: &[u8]) -> Option<(Self, usize)> {
		let len = usize::from(*raw.first()?);
		if len < 34 || raw.len() < len { return None; }

		let name_len = usize::from(raw[32]);
		if len < 33 + name_len { return None; }
		let name = String::from_utf8_lossy(&raw[33..33 + name_len]).into_owned();

		Some((
			Self {
				name,
				extent: u32::from_le_bytes([raw[2], raw[3], raw[4], raw[5]]),
				size: u32::from_le_bytes([raw[10], raw[11], raw[12], raw[13]]),
				flags: raw[25],
				unit_size: raw[26],
				gap_size: raw[27],
				date: raw[18..25].try_into().ok()?,
			},
			len,
		))
	}
}



#[derive(Debug)]
/// # Image Browser.
///
/// A deliberately small ISO-9660 walk: primary volume descriptor, directory
/// records, file extents. Rock Ridge, Joliet, and the other extensions are
/// invisible at this altitude, which is fine; PlayStation discs never
/// strayed from the base spec.
pub struct ImageBrowser<R: SectorRead> {
	src: R,
}

impl<R: SectorRead> ImageBrowser<R> {
	/// # New.
	pub const fn new(src: R) -> Self { Self { src } }

	/// # Sector Source.
	pub const fn src_mut(&mut self) -> &mut R { &mut self.src }

	/// # Root Directory.
	///
	/// ## Errors
	///
	/// Returns an error if the volume descriptor is missing or malformed.
	pub fn root(&mut self) -> Result<Vec<DirEntry>, GrabError> {
		let pvd = self.src.sector(SYSTEM_AREA_SIZE)?;
		let ud = user_data(&pvd);
		if ud.len() < PVD_ROOT_OFFSET + 34 || ud[0] != 1 || ud[1..6] != *CD001 {
			return Err(GrabError::FileRead("primary volume descriptor".to_owned()));
		}

		let (root, _) = DirEntry::parse(&ud[PVD_ROOT_OFFSET..])
			.ok_or_else(|| GrabError::FileRead("root directory record".to_owned()))?;
		self.read_dir(&root)
	}

	/// # Read a Directory.
	///
	/// ## Errors
	///
	/// Returns an error if the extent cannot be read.
	pub fn read_dir(&mut self, dir: &DirEntry) -> Result<Vec<DirEntry>, GrabError> {
		let mut out = Vec::new();
		let sectors = (dir.size as usize).div_ceil(BLOCK_SIZE) as u32;

		for n in 0..sectors {
			let raw = self.src.sector(dir.extent + n)?;
			let ud = user_data(&raw);

			let mut pos = 0;
			while pos < ud.len() {
				match DirEntry::parse(&ud[pos..]) {
					Some((entry, len)) => {
						pos += len;
						// Skip the self/parent pseudo-entries.
						if entry.name.len() == 1 && entry.name.as_bytes()[0] < 2 {
							continue;
						}
						out.push(entry);
					},
					// Records never straddle sector boundaries; a zero
					// length means the rest of the block is padding.
					None => break,
				}
			}
		}

		Ok(out)
	}

	/// # Find an Entry by Path.
	///
	/// Components may be separated with `\` or `/`, matched without regard
	/// for case or version suffix.
	///
	/// ## Errors
	///
	/// Returns an error if a directory extent cannot be read.
	pub fn find(&mut self, path: &str) -> Result<Option<DirEntry>, GrabError> {
		let mut entries = self.root()?;
		let mut found = None;

		for part in path.split(['\\', '/']).filter(|p| ! p.is_empty()) {
			let Some(hit) = entries.iter()
				.find(|e| e.base_name().eq_ignore_ascii_case(part))
				.cloned()
				else { return Ok(None); };

			if hit.is_dir() { entries = self.read_dir(&hit)?; }
			found = Some(hit);
		}

		Ok(found)
	}

	/// # Read a File.
	///
	/// ## Errors
	///
	/// Returns an error if any sector of the extent cannot be read.
	pub fn read_file(&mut self, entry: &DirEntry) -> Result<Vec<u8>, GrabError> {
		let size = entry.size as usize;
		let sectors = size.div_ceil(BLOCK_SIZE) as u32;
		let mut out = Vec::with_capacity(sectors as usize * BLOCK_SIZE);

		for n in 0..sectors {
			let raw = self.src.sector(entry.extent + n)?;
			out.extend_from_slice(user_data(&raw));
		}

		out.truncate(size);
		Ok(out)
	}

	/// # Walk All Files.
	///
	/// Depth-first over the whole tree, invoking the callback with each
	/// file's full path (directories excluded).
	///
	/// ## Errors
	///
	/// Returns an error if a directory extent cannot be read.
	pub fn walk(&mut self, cb: &mut dyn FnMut(&str, &DirEntry)) -> Result<(), GrabError> {
		let root = self.root()?;
		self.walk_inner(&root, "", 0, cb)
	}

	/// # Walk (Recursive Bit).
	fn walk_inner(
		&mut self,
		entries: &[DirEntry],
		prefix: &str,
		depth: usize,
		cb: &mut dyn FnMut(&str, &DirEntry),
	) -> Result<(), GrabError> {
		if MAX_DEPTH < depth { return Ok(()); }

		for entry in entries {
			let path =
				if prefix.is_empty() { entry.name.clone() }
				else { format!("{prefix}/{}", entry.name) };

			if entry.is_dir() {
				let children = self.read_dir(entry)?;
				self.walk_inner(&children, &path, depth + 1, cb)?;
			}
			else { cb(&path, entry); }
		}

		Ok(())
	}
}
