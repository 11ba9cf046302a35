/*!
# CDGrab: Persisted Streams
*/

use crate::GrabError;
use std::{
	fs::File,
	io::{
		Read,
		Seek,
		SeekFrom,
		Write,
	},
	path::{
		Path,
		PathBuf,
	},
};



#[derive(Debug, Clone)]
/// # Image Paths.
///
/// Every stream belonging to a dump hangs off the same `path/name` prefix,
/// distinguished by extension. Extensions are glued on manually because
/// `set_extension` mangles names containing dots.
pub(crate) struct ImagePaths {
	prefix: PathBuf,
}

impl ImagePaths {
	/// # New.
	pub(crate) fn new<P: AsRef<Path>>(path: P, name: &str) -> Self {
		Self { prefix: path.as_ref().join(name) }
	}

	/// # Prefix With Extension.
	fn ext(&self, ext: &str) -> PathBuf {
		let mut raw = self.prefix.as_os_str().to_owned();
		raw.push(ext);
		PathBuf::from(raw)
	}

	/// # Scrambled Main Channel.
	pub(crate) fn scram(&self) -> PathBuf { self.ext(".scram") }

	/// # Descrambled Main Channel.
	pub(crate) fn scrap(&self) -> PathBuf { self.ext(".scrap") }

	/// # Subchannel.
	pub(crate) fn subcode(&self) -> PathBuf { self.ext(".subcode") }

	/// # Sample State.
	pub(crate) fn state(&self) -> PathBuf { self.ext(".state") }

	/// # Raw TOC.
	pub(crate) fn toc(&self) -> PathBuf { self.ext(".toc") }

	/// # Raw Full TOC.
	pub(crate) fn fulltoc(&self) -> PathBuf { self.ext(".fulltoc") }

	/// # Raw CD-TEXT.
	pub(crate) fn cdtext(&self) -> PathBuf { self.ext(".cdtext") }

	/// # Raw LG/ASUS Cache.
	pub(crate) fn asus(&self) -> PathBuf { self.ext(".asus") }

	/// # Log.
	pub(crate) fn log(&self) -> PathBuf { self.ext(".log") }
}



/// # Open a Stream For Refining.
///
/// Read/write, no truncation; the file has to exist already.
///
/// ## Errors
///
/// Returns an error if the file cannot be opened.
pub(crate) fn open_rw(path: &Path) -> Result<File, GrabError> {
	File::options()
		.read(true)
		.write(true)
		.open(path)
		.map_err(|_| GrabError::FileOpen(path.to_string_lossy().into_owned()))
}

/// # Create a Stream For Dumping.
///
/// Read/write, truncating anything already there.
///
/// ## Errors
///
/// Returns an error if the file cannot be created.
pub(crate) fn create_trunc(path: &Path) -> Result<File, GrabError> {
	File::options()
		.read(true)
		.write(true)
		.create(true)
		.truncate(true)
		.open(path)
		.map_err(|_| GrabError::FileOpen(path.to_string_lossy().into_owned()))
}

/// # Read One Entry.
///
/// Streams are flat arrays of fixed-size records indexed by
/// `lba - LBA_START`. Reads may be shifted backward by `byte_offset` to
/// compensate a drive read offset; any part of the span falling before the
/// start of the file or past its end is padded with `fill`.
///
/// ## Errors
///
/// Returns an error if seeking or reading fails outright.
pub(crate) fn read_entry(
	file: &mut File,
	dst: &mut [u8],
	entry_size: usize,
	index: i32,
	byte_offset: i32,
	fill: u8,
) -> std::io::Result<()> {
	let start = i64::from(index) * entry_size as i64 - i64::from(byte_offset);

	// The part of the span before position zero doesn't exist.
	let skip = usize::try_from(-start).unwrap_or(0).min(dst.len());
	dst[..skip].fill(fill);

	if skip == dst.len() { return Ok(()); }
	file.seek(SeekFrom::Start((start + skip as i64).unsigned_abs()))?;

	let mut filled = skip;
	while filled < dst.len() {
		let n = file.read(&mut dst[filled..])?;
		if n == 0 {
			// Past the end; pad it out.
			dst[filled..].fill(fill);
			break;
		}
		filled += n;
	}

	Ok(())
}

/// # Write One Entry.
///
/// The mirror of [`read_entry`]: the span may be shifted backward by
/// `byte_offset`, and any part of it falling before position zero is
/// quietly dropped.
///
/// ## Errors
///
/// Returns an error if seeking or writing fails.
pub(crate) fn write_entry(
	file: &mut File,
	src: &[u8],
	entry_size: usize,
	index: i32,
	byte_offset: i32,
) -> std::io::Result<()> {
	let start = i64::from(index) * entry_size as i64 - i64::from(byte_offset);

	let skip = usize::try_from(-start).unwrap_or(0).min(src.len());
	let src = &src[skip..];
	if src.is_empty() { return Ok(()); }

	file.seek(SeekFrom::Start((start + skip as i64).unsigned_abs()))?;
	file.write_all(src)
}

/// # Capture a Small File.
///
/// The one-shot captures — TOC, CD-TEXT, cache snapshots — are written
/// atomically so an interrupt can't leave a torn copy.
///
/// ## Errors
///
/// Returns an error if the write fails.
pub(crate) fn write_capture(path: &Path, data: &[u8]) -> Result<(), GrabError> {
	write_atomic::write_file(path, data)
		.map_err(|_| GrabError::FileWrite(path.to_string_lossy().into_owned()))
}

/// # Read a Small File.
///
/// ## Errors
///
/// Returns an error if the file cannot be read.
pub(crate) fn read_capture(path: &Path) -> Result<Vec<u8>, GrabError> {
	std::fs::read(path)
		.map_err(|_| GrabError::FileRead(path.to_string_lossy().into_owned()))
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_entry_round_trip() {
		let dir = std::env::temp_dir().join("cdgrab-stream-test");
		std::fs::create_dir_all(&dir).expect("No temp dir.");
		let path = dir.join("entries.bin");
		let mut file = create_trunc(&path).expect("Create failed.");

		// Three eight-byte entries.
		for i in 0..3 {
			let entry = [i as u8 + 1; 8];
			write_entry(&mut file, &entry, 8, i, 0).expect("Write failed.");
		}

		let mut buf = [0_u8; 8];
		read_entry(&mut file, &mut buf, 8, 1, 0, 0xFF).expect("Read failed.");
		assert_eq!(buf, [2; 8]);

		// Offset reads straddle entries.
		read_entry(&mut file, &mut buf, 8, 1, 4, 0xFF).expect("Read failed.");
		assert_eq!(buf, [1, 1, 1, 1, 2, 2, 2, 2]);

		// Before the beginning: filled.
		read_entry(&mut file, &mut buf, 8, 0, 4, 0xFF).expect("Read failed.");
		assert_eq!(buf, [0xFF, 0xFF, 0xFF, 0xFF, 1, 1, 1, 1]);

		// Past the end: filled.
		read_entry(&mut file, &mut buf, 8, 3, 0, 0xEE).expect("Read failed.");
		assert_eq!(buf, [0xEE; 8]);

		// Offset writes follow the same rules.
		write_entry(&mut file, &[9; 8], 8, 0, 4).expect("Write failed.");
		read_entry(&mut file, &mut buf, 8, 0, 0, 0).expect("Read failed.");
		assert_eq!(buf, [9, 9, 9, 9, 1, 1, 1, 1]);

		std::fs::remove_file(&path).ok();
	}

	#[test]
	fn t_paths() {
		let paths = ImagePaths::new("/tmp", "dump_240101.v2");
		assert_eq!(paths.scram(), PathBuf::from("/tmp/dump_240101.v2.scram"));
		assert_eq!(paths.state(), PathBuf::from("/tmp/dump_240101.v2.state"));
	}
}
