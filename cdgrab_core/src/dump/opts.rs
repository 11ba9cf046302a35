/*!
# CDGrab: Dump Options
*/

use crate::{
	DriveType,
	GrabError,
	ReadMethod,
	ReadOffset,
	SectorOrder,
	parse_ranges,
};
use std::path::{
	Path,
	PathBuf,
};



/// # FLAG: Overwrite an existing dump.
const FLAG_OVERWRITE: u8 =           0b0000_0001;

/// # FLAG: Re-read sectors with bad Q during refine.
const FLAG_REFINE_SUBCHANNEL: u8 =   0b0000_0010;

/// # FLAG: Skip the CD-TEXT capture.
const FLAG_DISABLE_CDTEXT: u8 =      0b0000_0100;

/// # FLAG: Skip the Plextor lead-in trick.
const FLAG_PLEXTOR_SKIP_LEADIN: u8 = 0b0000_1000;

/// # FLAG: Skip the LG/ASUS lead-out trick.
const FLAG_ASUS_SKIP_LEADOUT: u8 =   0b0001_0000;

/// # FLAG: Chatty per-sector logging.
const FLAG_VERBOSE: u8 =             0b0010_0000;



#[derive(Debug, Clone)]
/// # Dump Options.
///
/// Everything the engine needs to know beyond the drive itself, set
/// builder-style:
///
/// ```
/// use cdgrab_core::DumpOptions;
///
/// let opts = DumpOptions::default()
///     .with_image_name("my_disc".to_owned())
///     .with_retries(8)
///     .with_verbose(true);
///
/// assert_eq!(opts.image_name(), "my_disc");
/// assert_eq!(opts.retries(), 8);
/// ```
pub struct DumpOptions {
	image_path: PathBuf,
	image_name: String,
	speed: Option<u16>,
	retries: u32,
	skip: Vec<(i32, i32)>,
	lba_start: Option<i32>,
	lba_end: Option<i32>,
	drive_type: Option<DriveType>,
	drive_read_offset: Option<ReadOffset>,
	drive_c2_shift: Option<usize>,
	drive_pregap_start: Option<i32>,
	drive_read_method: Option<ReadMethod>,
	drive_sector_order: Option<SectorOrder>,
	flags: u8,
}

impl Default for DumpOptions {
	fn default() -> Self {
		Self {
			image_path: PathBuf::from("."),
			image_name: String::new(),
			speed: None,
			retries: 0,
			skip: Vec::new(),
			lba_start: None,
			lba_end: None,
			drive_type: None,
			drive_read_offset: None,
			drive_c2_shift: None,
			drive_pregap_start: None,
			drive_read_method: None,
			drive_sector_order: None,
			flags: 0,
		}
	}
}

macro_rules! with_flag {
	($fn:ident, $flag:ident, $($doc:literal),+ $(,)?) => (
		#[must_use]
		$(
			#[doc = $doc]
		)+
		pub const fn $fn(mut self, v: bool) -> Self {
			if v { self.flags |= $flag; }
			else { self.flags &= ! $flag; }
			self
		}
	)
}

/// ## Setters.
impl DumpOptions {
	#[must_use]
	/// # Image Path.
	///
	/// The directory the streams land in. Defaults to the current working
	/// directory.
	pub fn with_image_path<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.image_path = path.as_ref().to_path_buf();
		self
	}

	#[must_use]
	/// # Image Name.
	///
	/// The shared file-name prefix. The engine refuses to run without one.
	pub fn with_image_name(mut self, name: String) -> Self {
		self.image_name = name;
		self
	}

	#[must_use]
	/// # Read Speed.
	///
	/// A CD-speed multiplier (each unit is 150 kB/s). Unset means as fast
	/// as the drive will go.
	pub const fn with_speed(mut self, speed: Option<u16>) -> Self {
		self.speed = speed;
		self
	}

	#[must_use]
	/// # Refine Retries.
	///
	/// How many times a bad sector may be re-read per refine pass.
	pub const fn with_retries(mut self, retries: u32) -> Self {
		self.retries = retries;
		self
	}

	/// # Skip Ranges.
	///
	/// Inclusive `start-end` LBA pairs, `:`-joined. Sectors inside are
	/// never read.
	///
	/// ## Errors
	///
	/// Returns an error if the string doesn't parse.
	pub fn with_skip(mut self, raw: &str) -> Result<Self, GrabError> {
		self.skip = parse_ranges(raw)?;
		Ok(self)
	}

	#[must_use]
	/// # LBA Window Start.
	pub const fn with_lba_start(mut self, lba: Option<i32>) -> Self {
		self.lba_start = lba;
		self
	}

	#[must_use]
	/// # LBA Window End.
	///
	/// Setting an explicit end also disables lead-out overread growth.
	pub const fn with_lba_end(mut self, lba: Option<i32>) -> Self {
		self.lba_end = lba;
		self
	}

	#[must_use]
	/// # Drive Type Override.
	pub const fn with_drive_type(mut self, v: Option<DriveType>) -> Self {
		self.drive_type = v;
		self
	}

	#[must_use]
	/// # Read Offset Override.
	pub const fn with_drive_read_offset(mut self, v: Option<ReadOffset>) -> Self {
		self.drive_read_offset = v;
		self
	}

	#[must_use]
	/// # C2 Shift Override.
	pub const fn with_drive_c2_shift(mut self, v: Option<usize>) -> Self {
		self.drive_c2_shift = v;
		self
	}

	#[must_use]
	/// # Pre-Gap Start Override.
	pub const fn with_drive_pregap_start(mut self, v: Option<i32>) -> Self {
		self.drive_pregap_start = v;
		self
	}

	#[must_use]
	/// # Read Method Override.
	pub const fn with_drive_read_method(mut self, v: Option<ReadMethod>) -> Self {
		self.drive_read_method = v;
		self
	}

	#[must_use]
	/// # Sector Order Override.
	pub const fn with_drive_sector_order(mut self, v: Option<SectorOrder>) -> Self {
		self.drive_sector_order = v;
		self
	}

	with_flag!(
		with_overwrite,
		FLAG_OVERWRITE,
		"# Overwrite.",
		"",
		"Allow a fresh dump to clobber an existing image of the same name.",
	);

	with_flag!(
		with_refine_subchannel,
		FLAG_REFINE_SUBCHANNEL,
		"# Refine Subchannel.",
		"",
		"During refine, also re-read sectors whose stored Q fails its CRC.",
	);

	with_flag!(
		with_disable_cdtext,
		FLAG_DISABLE_CDTEXT,
		"# Disable CD-TEXT.",
	);

	with_flag!(
		with_plextor_skip_leadin,
		FLAG_PLEXTOR_SKIP_LEADIN,
		"# Skip the Plextor Lead-In Capture.",
	);

	with_flag!(
		with_asus_skip_leadout,
		FLAG_ASUS_SKIP_LEADOUT,
		"# Skip the LG/ASUS Lead-Out Capture.",
	);

	with_flag!(
		with_verbose,
		FLAG_VERBOSE,
		"# Verbose.",
		"",
		"Log each per-sector error as it happens.",
	);
}

/// ## Getters.
impl DumpOptions {
	#[must_use]
	/// # Image Path.
	pub fn image_path(&self) -> &Path { &self.image_path }

	#[must_use]
	/// # Image Name.
	pub fn image_name(&self) -> &str { &self.image_name }

	#[must_use]
	/// # Read Speed.
	pub const fn speed(&self) -> Option<u16> { self.speed }

	#[must_use]
	/// # Refine Retries.
	pub const fn retries(&self) -> u32 { self.retries }

	#[must_use]
	/// # Skip Ranges.
	pub fn skip(&self) -> &[(i32, i32)] { &self.skip }

	#[must_use]
	/// # LBA Window Start.
	pub const fn lba_start(&self) -> Option<i32> { self.lba_start }

	#[must_use]
	/// # LBA Window End.
	pub const fn lba_end(&self) -> Option<i32> { self.lba_end }

	#[must_use]
	/// # Drive Type Override.
	pub const fn drive_type(&self) -> Option<DriveType> { self.drive_type }

	#[must_use]
	/// # Read Offset Override.
	pub const fn drive_read_offset(&self) -> Option<ReadOffset> { self.drive_read_offset }

	#[must_use]
	/// # C2 Shift Override.
	pub const fn drive_c2_shift(&self) -> Option<usize> { self.drive_c2_shift }

	#[must_use]
	/// # Pre-Gap Start Override.
	pub const fn drive_pregap_start(&self) -> Option<i32> { self.drive_pregap_start }

	#[must_use]
	/// # Read Method Override.
	pub const fn drive_read_method(&self) -> Option<ReadMethod> { self.drive_read_method }

	#[must_use]
	/// # Sector Order Override.
	pub const fn drive_sector_order(&self) -> Option<SectorOrder> { self.drive_sector_order }

	#[must_use]
	/// # Overwrite?
	pub const fn overwrite(&self) -> bool { self.has_flag(FLAG_OVERWRITE) }

	#[must_use]
	/// # Refine Subchannel?
	pub const fn refine_subchannel(&self) -> bool { self.has_flag(FLAG_REFINE_SUBCHANNEL) }

	#[must_use]
	/// # CD-TEXT Disabled?
	pub const fn disable_cdtext(&self) -> bool { self.has_flag(FLAG_DISABLE_CDTEXT) }

	#[must_use]
	/// # Skip the Plextor Lead-In?
	pub const fn plextor_skip_leadin(&self) -> bool { self.has_flag(FLAG_PLEXTOR_SKIP_LEADIN) }

	#[must_use]
	/// # Skip the LG/ASUS Lead-Out?
	pub const fn asus_skip_leadout(&self) -> bool { self.has_flag(FLAG_ASUS_SKIP_LEADOUT) }

	#[must_use]
	/// # Verbose?
	pub const fn verbose(&self) -> bool { self.has_flag(FLAG_VERBOSE) }

	/// # Has Flag?
	const fn has_flag(&self, flag: u8) -> bool { flag == self.flags & flag }
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_flags() {
		let opts = DumpOptions::default();
		assert!(! opts.overwrite());
		assert!(! opts.verbose());

		let opts = opts.with_overwrite(true).with_verbose(true);
		assert!(opts.overwrite());
		assert!(opts.verbose());

		let opts = opts.with_overwrite(false);
		assert!(! opts.overwrite());
		assert!(opts.verbose(), "Unsetting one flag shouldn't touch another.");
	}

	#[test]
	fn t_skip() {
		let opts = DumpOptions::default()
			.with_skip("10-20:100-110")
			.expect("Skip parse failed.");
		assert_eq!(opts.skip(), &[(10, 21), (100, 111)]);
		assert!(DumpOptions::default().with_skip("nope").is_err());
	}
}
