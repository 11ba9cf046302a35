/*!
# CDGrab: PlayStation Analysis
*/

use crate::{
	CD_DATA_SIZE,
	CD_SUBCODE_SIZE,
	ChannelQ,
	GrabError,
	ImageBrowser,
	LBA_START,
	Msf,
	Scrambler,
	Toc,
	iso9660::{
		DirEntry,
		SYSTEM_AREA_SIZE,
		SectorRead,
	},
	stream::{
		ImagePaths,
		read_capture,
		read_entry,
	},
};
use regex::Regex;
use std::{
	fmt::Write,
	fs::File,
	path::{
		Path,
		PathBuf,
	},
	sync::LazyLock,
};



/// # Executable Magic.
const EXE_MAGIC: &[u8; 8] = b"PS-X EXE";

/// # Boot Line.
static RE_BOOT: LazyLock<Regex> = LazyLock::new(||
	Regex::new(r"^\s*BOOT.*=\s*cdrom.?:\\*(.*?)(?:;.*|\s*$)")
		.expect("Invalid boot regex.")
);

/// # Serial Parse.
static RE_SERIAL: LazyLock<Regex> = LazyLock::new(||
	Regex::new(r"^(.*\\)*([A-Z]*)(_|-)?([A-Z]?[0-9]+)\.([0-9]+[A-Z]?)$")
		.expect("Invalid serial regex.")
);

/// # Anti-Modchip Banner (English).
const ANTIMOD_MESSAGE_EN: &[u8] =
	b"     SOFTWARE TERMINATED\nCONSOLE MAY HAVE BEEN MODIFIED\n     CALL 1-888-780-7690";

/// # Anti-Modchip Banner (Japanese, Shift-JIS).
///
/// Stored as bytes; the comparison is byte-wise, never textual.
const ANTIMOD_MESSAGE_JP: &[u8] = &[
	0x8B, 0xAD, 0x90, 0xA7, 0x8F, 0x49, 0x97, 0xB9, 0x82, 0xB5, 0x82, 0xDC,
	0x82, 0xB5, 0x82, 0xBD, 0x81, 0x42, 0x0A, 0x96, 0x7B, 0x91, 0xCC, 0x82,
	0xAA, 0x89, 0xFC, 0x91, 0xA2, 0x82, 0xB3, 0x82, 0xEA, 0x82, 0xC4, 0x82,
	0xA2, 0x82, 0xE9, 0x0A, 0x82, 0xA8, 0x82, 0xBB, 0x82, 0xEA, 0x82, 0xAA,
	0x82, 0xA0, 0x82, 0xE8, 0x82, 0xDC, 0x82, 0xB7, 0x81, 0x42,
];

/// # LibCrypt Sector Table.
const LIBCRYPT_SECTORS_BASE: [i32; 32] = [
	13_955, 14_081, 14_335, 14_429, 14_499, 14_749, 14_906, 14_980,
	15_092, 15_162, 15_228, 15_478, 15_769, 15_881, 15_951, 16_017,
	41_895, 42_016, 42_282, 42_430, 42_521, 42_663, 42_862, 43_027,
	43_139, 43_204, 43_258, 43_484, 43_813, 43_904, 44_009, 44_162,
];

/// # LibCrypt Pair Shift.
const LIBCRYPT_SECTORS_SHIFT: i32 = 5;

/// # Region: Japan.
const REGION_J: [&str; 11] = [
	"ESPM", "PAPX", "PCPX", "PDPX", "SCPM", "SCPS", "SCZS", "SIPS", "SLKA",
	"SLPM", "SLPS",
];

/// # Region: USA.
const REGION_U: [&str; 5] = ["LSP", "PEPX", "SCUS", "SLUS", "SLUSP"];

/// # Region: Europe.
const REGION_E: [&str; 5] = ["PUPX", "SCED", "SCES", "SLED", "SLES"];



#[derive(Debug)]
/// # PlayStation Analyzer.
///
/// Post-dump identification for PSX discs: boot executable, serial and
/// region, EDC presence, anti-modchip banners, and the LibCrypt subchannel
/// fingerprint. Everything reads straight from the persisted streams; no
/// splitting required.
pub struct SystemPsx {
	image_path: PathBuf,
	image_name: String,
}

impl SystemPsx {
	#[must_use]
	/// # New.
	pub fn new<P: AsRef<Path>>(image_path: P, image_name: &str) -> Self {
		Self {
			image_path: image_path.as_ref().to_path_buf(),
			image_name: image_name.to_owned(),
		}
	}

	/// # Analyze and Report.
	///
	/// Returns the formatted report, or `None` if the image isn't a
	/// PlayStation data disc.
	///
	/// ## Errors
	///
	/// Returns an error if the streams are missing or unreadable.
	pub fn report(&self) -> Result<Option<String>, GrabError> {
		let paths = ImagePaths::new(&self.image_path, &self.image_name);

		// The first track has to be data.
		let toc = Toc::parse(&read_capture(&paths.toc())?)?;
		let Some(first) = toc.first_track() else { return Ok(None); };
		if ! first.is_data() { return Ok(None); }

		let (main, scrambled) =
			if paths.scram().exists() { (paths.scram(), true) }
			else if paths.scrap().exists() { (paths.scrap(), false) }
			else {
				return Err(GrabError::FileOpen(paths.scram().to_string_lossy().into_owned()));
			};

		let sectors = (first.lba_end - first.lba_start).max(0).unsigned_abs();
		let track = DumpTrack::open(&main, scrambled, first.lba_start, sectors)?;
		let mut browser = ImageBrowser::new(track);

		let sub_path = paths.subcode();
		let sub_path = sub_path.exists().then_some(sub_path);

		analyze_track(&mut browser, &self.image_name, sub_path.as_deref())
	}
}



#[derive(Debug)]
/// # Dump-Stream Track.
///
/// Serves a data track's raw sectors straight out of the dump's main
/// stream, descrambling on the fly when it's a `.scram`.
pub(crate) struct DumpTrack {
	file: File,
	scrambler: Option<Scrambler>,
	first_lba: i32,
	sectors: u32,
}

impl DumpTrack {
	/// # Open.
	pub(crate) fn open(
		path: &Path,
		scrambled: bool,
		first_lba: i32,
		sectors: u32,
	) -> Result<Self, GrabError> {
		let file = File::open(path)
			.map_err(|_| GrabError::FileOpen(path.to_string_lossy().into_owned()))?;
		Ok(Self {
			file,
			scrambler: scrambled.then(Scrambler::new),
			first_lba,
			sectors,
		})
	}
}

impl SectorRead for DumpTrack {
	fn sector(&mut self, idx: u32) -> Result<Vec<u8>, GrabError> {
		let lba = self.first_lba + idx as i32;
		let mut out = vec![0_u8; CD_DATA_SIZE];
		read_entry(&mut self.file, &mut out, CD_DATA_SIZE, lba - LBA_START, 0, 0)
			.map_err(|_| GrabError::FileRead("main stream".to_owned()))?;

		if let Some(s) = &self.scrambler { s.descramble(&mut out, Some(lba)); }
		Ok(out)
	}

	fn sector_count(&self) -> u32 { self.sectors }
}



/// # Analyze a Data Track.
///
/// The generic workhorse behind [`SystemPsx::report`].
fn analyze_track<R: SectorRead>(
	browser: &mut ImageBrowser<R>,
	label: &str,
	sub_path: Option<&Path>,
) -> Result<Option<String>, GrabError> {
	// Without a boot executable there's nothing to say.
	let Some(exe_path) = find_exe(browser)? else { return Ok(None); };
	let Some(exe_entry) = browser.find(&exe_path)? else { return Ok(None); };

	let exe = browser.read_file(&exe_entry)?;
	if exe.len() < EXE_MAGIC.len() || exe[..EXE_MAGIC.len()] != *EXE_MAGIC {
		return Ok(None);
	}

	let mut out = String::new();
	let _res = writeln!(&mut out, "PSX [{label}]:");
	let _res = writeln!(&mut out, "  EXE: {exe_path}");
	let _res = writeln!(&mut out, "  EXE date: {}", exe_entry.date_string());

	let (prefix, body) = deduce_serial(&exe_path);
	if ! prefix.is_empty() && ! body.is_empty() {
		let _res = writeln!(&mut out, "  serial: {prefix}-{body}");
	}

	if let Some(region) = detect_region(&prefix) {
		let _res = writeln!(&mut out, "  region: {region}");
	}

	let edc = detect_edc_fast(browser)?;
	let _res = writeln!(&mut out, "  EDC: {}", if edc { "yes" } else { "no" });

	let antimod = find_antimod_strings(browser)?;
	let _res = writeln!(&mut out, "  anti-modchip: {}", if antimod.is_empty() { "no" } else { "yes" });
	for line in antimod {
		let _res = writeln!(&mut out, "{line}");
	}

	if let Some(sub_path) = sub_path {
		let lba_end = browser.src_mut().sector_count() as i32;
		let hits = detect_libcrypt(sub_path, lba_end)?;
		let _res = writeln!(&mut out, "  libcrypt: {}", if hits.is_empty() { "no" } else { "yes" });
		for line in hits {
			let _res = writeln!(&mut out, "{line}");
		}
	}

	Ok(Some(out))
}

/// # Find the Boot Executable Path.
///
/// `SYSTEM.CNF` names it; discs without one boot `PSX.EXE`.
fn find_exe<R: SectorRead>(browser: &mut ImageBrowser<R>)
-> Result<Option<String>, GrabError> {
	if let Some(cnf) = browser.find("SYSTEM.CNF")? {
		let data = browser.read_file(&cnf)?;
		let data = String::from_utf8_lossy(&data);
		for line in data.lines() {
			if let Some(path) = boot_line_exe(line) {
				return Ok(Some(path));
			}
		}
		Ok(None)
	}
	else {
		Ok(browser.find("PSX.EXE")?.map(|e| e.name))
	}
}

/// # Extract the EXE Path From a Boot Line.
///
/// Examples from the wild:
/// ```text
/// BOOT = cdrom:\SCUS_945.03;1     1Xtreme (USA)
/// BOOT=cdrom:\\SCUS_944.23;1      Ape Escape (USA)
/// BOOT=cdrom:\SLPS_004.35         Megatudo 2096 (Japan)
/// BOOT = cdrom:\SLPM803.96;1      Chouzetsu Daigirin '99 (Japan)
/// BOOT = cdrom:\EXE\PCPX_961.61;1 Wild Arms 2 (Japan) (Demo)
/// ```
pub(crate) fn boot_line_exe(line: &str) -> Option<String> {
	RE_BOOT.captures(line)
		.and_then(|caps| caps.get(1))
		.map(|m| m.as_str().to_uppercase())
		.filter(|s| ! s.is_empty())
}

/// # Deduce the Serial From an EXE Path.
///
/// The path splits into a region prefix and a numeric body, with a couple
/// of known oddballs patched up by hand.
pub(crate) fn deduce_serial(exe_path: &str) -> (String, String) {
	let Some(caps) = RE_SERIAL.captures(exe_path) else {
		return (String::new(), String::new());
	};

	let mut prefix = caps.get(2).map_or(String::new(), |m| m.as_str().to_owned());
	let mut body = format!(
		"{}{}",
		caps.get(4).map_or("", |m| m.as_str()),
		caps.get(5).map_or("", |m| m.as_str()),
	);

	// Road Writer (USA).
	if prefix.is_empty() && body == "907127001" { prefix = "LSP".to_owned(); }
	// GameGenius Ver. 5.0 (Taiwan) (En,Zh) (Unl).
	else if prefix == "PAR" && body == "90001" {
		prefix.clear();
		body.clear();
	}

	(prefix, body)
}

/// # Region From a Serial Prefix.
pub(crate) fn detect_region(prefix: &str) -> Option<&'static str> {
	if REGION_J.contains(&prefix) { Some("Japan") }
	else if REGION_U.contains(&prefix) { Some("USA") }
	else if REGION_E.contains(&prefix) { Some("Europe") }
	else { None }
}

/// # Fast EDC Check.
///
/// The last system-area sector tells the tale: real PSX pressings are mode
/// 2 XA Form 2 with the optional EDC filled in.
fn detect_edc_fast<R: SectorRead>(browser: &mut ImageBrowser<R>)
-> Result<bool, GrabError> {
	if browser.src_mut().sector_count() < SYSTEM_AREA_SIZE { return Ok(false); }

	let raw = browser.src_mut().sector(SYSTEM_AREA_SIZE - 1)?;
	if raw.len() < CD_DATA_SIZE { return Ok(false); }

	// Mode 2, Form 2 sub-header, non-zero EDC at the tail.
	Ok(
		raw[15] == 2 &&
		raw[18] & 0x20 != 0 &&
		raw[CD_DATA_SIZE - 4..CD_DATA_SIZE] != [0, 0, 0, 0]
	)
}

/// # Scan For Anti-Modchip Banners.
///
/// Every plain file on the disc gets checked for the English banner and
/// the Shift-JIS one, byte for byte.
fn find_antimod_strings<R: SectorRead>(browser: &mut ImageBrowser<R>)
-> Result<Vec<String>, GrabError> {
	let mut files: Vec<(String, DirEntry)> = Vec::new();
	browser.walk(&mut |path, entry| {
		if ! entry.is_dummy() && ! entry.is_interleaved() {
			files.push((path.to_owned(), entry.clone()));
		}
	})?;

	let mut out = Vec::new();
	for (path, entry) in files {
		let data = browser.read_file(&entry)?;

		if let Some(pos) = find_needle(&data, ANTIMOD_MESSAGE_EN) {
			out.push(format!("{path} @ {pos:#x}: EN"));
		}
		if let Some(pos) = find_needle(&data, ANTIMOD_MESSAGE_JP) {
			out.push(format!("{path} @ {pos:#x}: JP"));
		}
	}

	Ok(out)
}

/// # Byte Search.
fn find_needle(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack.windows(needle.len()).position(|w| w == needle)
}

/// # LibCrypt Fingerprint.
///
/// The protection deliberately corrupts the Q CRC at sixteen sector pairs
/// drawn from a fixed table. If the subchannel shows the expected number
/// of dead pairs, that's a match; the hits are reported with their Q
/// contents for SBI-style consumption.
fn detect_libcrypt(sub_path: &Path, lba_end: i32) -> Result<Vec<String>, GrabError> {
	let mut file = File::open(sub_path)
		.map_err(|_| GrabError::FileOpen(sub_path.to_string_lossy().into_owned()))?;

	let mut read_q = |lba: i32| -> Result<ChannelQ, GrabError> {
		let mut sub = [0_u8; CD_SUBCODE_SIZE];
		read_entry(&mut file, &mut sub, CD_SUBCODE_SIZE, lba - LBA_START, 0, 0)
			.map_err(|_| GrabError::FileRead(sub_path.to_string_lossy().into_owned()))?;
		Ok(ChannelQ::from_subcode(&sub))
	};

	let mut candidates: Vec<(i32, ChannelQ)> = Vec::new();
	for lba1 in LIBCRYPT_SECTORS_BASE {
		let lba2 = lba1 + LIBCRYPT_SECTORS_SHIFT;
		if lba_end <= lba1 || lba_end <= lba2 { continue; }

		let q1 = read_q(lba1)?;
		let q2 = read_q(lba2)?;

		if ! q1.valid() && ! q2.valid() {
			candidates.push((lba1, q1));
			candidates.push((lba2, q2));
		}
	}

	if ! matches!(candidates.len(), 16 | 32) { return Ok(Vec::new()); }

	Ok(candidates.into_iter()
		.map(|(lba, q)| {
			let msf = Msf::from_lba(lba);
			let q = q.as_bytes();
			format!(
				"MSF: {:02}:{:02}:{:02} Q-Data: {:02X}{:02X}{:02X} {:02X}:{:02X}:{:02X} {:02X} {:02X}:{:02X}:{:02X} {:04X}",
				msf.m, msf.s, msf.f,
				q[0], q[1], q[2],
				q[3], q[4], q[5],
				q[6],
				q[7], q[8], q[9],
				u16::from_be_bytes([q[10], q[11]]),
			)
		})
		.collect())
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::subcode::test::{
		interleave_q,
		mode1_q,
	};
	use std::collections::HashMap;

	#[test]
	fn t_boot_line() {
		assert_eq!(
			boot_line_exe(r"BOOT = cdrom:\SCUS_945.03;1"),
			Some("SCUS_945.03".to_owned()),
		);
		assert_eq!(
			boot_line_exe(r"BOOT=cdrom:\\SLPS_004.35"),
			Some("SLPS_004.35".to_owned()),
		);
		assert_eq!(
			boot_line_exe(r"BOOT = cdrom:\SLPM803.96;1"),
			Some("SLPM803.96".to_owned()),
		);
		assert_eq!(
			boot_line_exe(r"BOOT = cdrom:\EXE\PCPX_961.61;1"),
			Some(r"EXE\PCPX_961.61".to_owned()),
		);
		assert_eq!(boot_line_exe("TCB = 4"), None);
	}

	#[test]
	fn t_serial() {
		assert_eq!(
			deduce_serial("SCUS_945.03"),
			("SCUS".to_owned(), "94503".to_owned()),
		);
		assert_eq!(
			deduce_serial("SLPS_004.35"),
			("SLPS".to_owned(), "00435".to_owned()),
		);
		assert_eq!(
			deduce_serial("SLPM803.96"),
			("SLPM".to_owned(), "80396".to_owned()),
		);
		assert_eq!(
			deduce_serial(r"EXE\PCPX_961.61"),
			("PCPX".to_owned(), "96161".to_owned()),
		);

		// Road Writer has no prefix at all.
		assert_eq!(
			deduce_serial("907127.001"),
			("LSP".to_owned(), "907127001".to_owned()),
		);

		// GameGenius isn't a serial in any meaningful sense.
		assert_eq!(
			deduce_serial("PAR_900.01"),
			(String::new(), String::new()),
		);
	}

	#[test]
	fn t_region() {
		assert_eq!(detect_region("SCUS"), Some("USA"));
		assert_eq!(detect_region("SLPS"), Some("Japan"));
		assert_eq!(detect_region("SLPM"), Some("Japan"));
		assert_eq!(detect_region("PCPX"), Some("Japan"));
		assert_eq!(detect_region("SLES"), Some("Europe"));
		assert_eq!(detect_region("LSP"), Some("USA"));
		assert_eq!(detect_region("XXXX"), None);
	}

	#[test]
	fn t_antimod_jp_literal() {
		// The Shift-JIS banner must match the known pressing exactly.
		assert_eq!(ANTIMOD_MESSAGE_JP.len(), 58);
		assert_eq!(&ANTIMOD_MESSAGE_JP[..4], &[0x8B, 0xAD, 0x90, 0xA7]);
		assert_eq!(&ANTIMOD_MESSAGE_JP[54..], &[0x82, 0xB7, 0x81, 0x42]);
		assert_eq!(ANTIMOD_MESSAGE_JP[18], 0x0A);
	}

	/// # Synthetic PSX Filesystem.
	struct TestFs {
		sectors: HashMap<u32, Vec<u8>>,
		count: u32,
	}

	impl SectorRead for TestFs {
		fn sector(&mut self, idx: u32) -> Result<Vec<u8>, GrabError> {
			Ok(self.sectors.get(&idx).cloned().unwrap_or_else(|| vec![0_u8; CD_DATA_SIZE]))
		}

		fn sector_count(&self) -> u32 { self.count }
	}

	/// # A Mode 2 Form 1 Sector Holding the Given User Data.
	fn data_sector(payload: &[u8]) -> Vec<u8> {
		let mut out = vec![0_u8; CD_DATA_SIZE];
		out[..12].copy_from_slice(&crate::CD_DATA_SYNC);
		out[15] = 2;
		out[18] = 0x08;
		out[22] = 0x08;
		out[24..24 + payload.len().min(2048)].copy_from_slice(&payload[..payload.len().min(2048)]);
		out
	}

	/// # A Directory Record.
	fn dir_record(name: &[u8], extent: u32, size: u32, flags: u8) -> Vec<u8> {
		let len = 33 + name.len() + (name.len() + 1) % 2;
		let mut out = vec![0_u8; len];
		out[0] = len as u8;
		out[2..6].copy_from_slice(&extent.to_le_bytes());
		out[10..14].copy_from_slice(&size.to_le_bytes());
		out[18..25].copy_from_slice(&[99, 9, 3, 12, 0, 0, 0]);
		out[25] = flags;
		out[32] = name.len() as u8;
		out[33..33 + name.len()].copy_from_slice(name);
		out
	}

	/// # Assemble the Disc.
	fn test_fs() -> TestFs {
		let mut sectors = HashMap::new();

		// Sector 15: mode 2 form 2 with a live EDC.
		let mut s15 = vec![0_u8; CD_DATA_SIZE];
		s15[15] = 2;
		s15[18] = 0x20;
		s15[22] = 0x20;
		s15[CD_DATA_SIZE - 4..].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);
		sectors.insert(15, s15);

		// Sector 16: primary volume descriptor.
		let mut pvd = vec![0_u8; 2048];
		pvd[0] = 1;
		pvd[1..6].copy_from_slice(b"CD001");
		let root = dir_record(&[0], 17, 2048, 0x02);
		pvd[156..156 + root.len()].copy_from_slice(&root);
		sectors.insert(16, data_sector(&pvd));

		// Sector 17: the root directory.
		let mut dir = Vec::new();
		dir.extend_from_slice(&dir_record(&[0], 17, 2048, 0x02));
		dir.extend_from_slice(&dir_record(&[1], 17, 2048, 0x02));
		let cnf = b"BOOT = cdrom:\\SCUS_945.03;1\r\nTCB = 4\r\n";
		dir.extend_from_slice(&dir_record(b"MODCHIP.DAT;1", 19, 256, 0));
		dir.extend_from_slice(&dir_record(b"SCUS_945.03;1", 20, 2048, 0));
		dir.extend_from_slice(&dir_record(b"SYSTEM.CNF;1", 18, cnf.len() as u32, 0));
		sectors.insert(17, data_sector(&dir));

		// Sector 18: SYSTEM.CNF.
		sectors.insert(18, data_sector(cnf));

		// Sector 19: a file carrying the English banner at 0x40.
		let mut evil = vec![0_u8; 256];
		evil[0x40..0x40 + ANTIMOD_MESSAGE_EN.len()].copy_from_slice(ANTIMOD_MESSAGE_EN);
		sectors.insert(19, data_sector(&evil));

		// Sector 20: the boot executable.
		let mut exe = vec![0_u8; 2048];
		exe[..8].copy_from_slice(EXE_MAGIC);
		sectors.insert(20, data_sector(&exe));

		TestFs { sectors, count: 45_000 }
	}

	/// # A Subcode Stream With the LibCrypt Pattern.
	///
	/// The first sixteen table entries carry valid Qs; the other sixteen
	/// pairs are left zeroed, i.e. CRC-dead.
	fn libcrypt_subcode(dir: &Path) -> PathBuf {
		use std::io::{
			Seek,
			SeekFrom,
			Write as _,
		};

		let path = dir.join("test.subcode");
		let mut file = File::create(&path).expect("Subcode create failed.");

		for &lba in &LIBCRYPT_SECTORS_BASE[..16] {
			for lba in [lba, lba + LIBCRYPT_SECTORS_SHIFT] {
				let q = mode1_q(4, 0x01, 0x01, lba, lba);
				let sub = interleave_q(&q);
				let pos = (lba - LBA_START) as u64 * CD_SUBCODE_SIZE as u64;
				file.seek(SeekFrom::Start(pos)).expect("Seek failed.");
				file.write_all(&sub).expect("Write failed.");
			}
		}

		// Make sure the zeroed tail exists too.
		let len = (45_000 - LBA_START) as u64 * CD_SUBCODE_SIZE as u64;
		file.set_len(len).expect("Resize failed.");

		path
	}

	#[test]
	fn t_report() {
		let dir = std::env::temp_dir().join("cdgrab-psx-test");
		std::fs::create_dir_all(&dir).expect("No temp dir.");
		let sub_path = libcrypt_subcode(&dir);

		let mut browser = ImageBrowser::new(test_fs());
		let report = analyze_track(&mut browser, "TEST", Some(&sub_path))
			.expect("Analysis failed.")
			.expect("Expected a report.");

		assert!(report.contains("PSX [TEST]:"));
		assert!(report.contains("  EXE: SCUS_945.03"));
		assert!(report.contains("  EXE date: 1999-09-03"));
		assert!(report.contains("  serial: SCUS-94503"));
		assert!(report.contains("  region: USA"));
		assert!(report.contains("  EDC: yes"));
		assert!(report.contains("  anti-modchip: yes"));
		assert!(report.contains("MODCHIP.DAT;1 @ 0x40: EN"));
		assert!(report.contains("  libcrypt: yes"));
		assert_eq!(
			report.lines().filter(|l| l.starts_with("MSF:")).count(),
			32,
			"All thirty-two dead sectors should be listed.",
		);

		std::fs::remove_file(&sub_path).ok();
	}
}
