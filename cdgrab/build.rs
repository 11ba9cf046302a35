/*!
# CDGrab: Build
*/

use argyle::KeyWordsBuilder;
use std::path::PathBuf;



/// # Set Up CLI Arguments.
fn main() {
	println!("cargo:rerun-if-env-changed=CARGO_PKG_VERSION");

	let mut builder = KeyWordsBuilder::default();
	builder.push_commands([
		"cd",
		"debug",
		"dump",
		"info",
		"protection",
		"refine",
		"rings",
		"split",
		"subchannel",
	]);
	builder.push_keys([
		"-h", "--help",
		"-V", "--version",
		"-v", "--verbose",
		"--overwrite",
		"--refine-subchannel",
		"--disable-cdtext",
		"--plextor-skip-leadin",
		"--asus-skip-leadout",
	]);
	builder.push_keys_with_values([
		"-d", "--drive",
		"--speed",
		"--retries",
		"--image-path",
		"--image-name",
		"--skip",
		"--lba-start",
		"--lba-end",
		"--drive-type",
		"--drive-read-offset",
		"--drive-c2-shift",
		"--drive-pregap-start",
		"--drive-read-method",
		"--drive-sector-order",
	]);
	builder.save(out_path("argyle.rs"));
}

/// # Output Path.
///
/// Append the sub-path to OUT_DIR and return it.
fn out_path(stub: &str) -> PathBuf {
	std::fs::canonicalize(std::env::var("OUT_DIR").expect("Missing OUT_DIR."))
		.expect("Missing OUT_DIR.")
		.join(stub)
}
