use std::path::{Path, PathBuf};

/// Allocates a path for `basename` under `dir`, uniquifying on collision by
/// appending " (n)" before the extension, per the wire-level design's
/// persisted-state rule.
///
/// This is the minimal slice of the out-of-scope "filesystem path
/// utilities" the receiver's `DecidingAccept` transition actually needs; it
/// does not implement a general path-utility API.
pub fn unique_path(dir: &Path, basename: &str) -> std::io::Result<PathBuf> {
	std::fs::create_dir_all(dir)?;

	let candidate = dir.join(basename);

	if !candidate.exists() {
		return Ok(candidate);
	}

	let (stem, ext) = split_stem_ext(basename);

	for n in 1u32.. {
		let name = match &ext {
			Some(ext) => format!("{stem} ({n}).{ext}"),
			None => format!("{stem} ({n})"),
		};

		let candidate = dir.join(&name);

		if !candidate.exists() {
			return Ok(candidate);
		}
	}

	unreachable!("u32 exhausted before finding a free name")
}

fn split_stem_ext(basename: &str) -> (&str, Option<&str>) {
	match basename.rsplit_once('.') {
		Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
		_ => (basename, None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn first_write_keeps_the_basename() {
		let dir = std::env::temp_dir().join(format!("gl-paths-test-{}-a", std::process::id()));
		let _ = std::fs::remove_dir_all(&dir);

		let path = unique_path(&dir, "a.bin").unwrap();
		assert_eq!(path, dir.join("a.bin"));

		let _ = std::fs::remove_dir_all(&dir);
	}

	#[test]
	fn collision_appends_counter_before_extension() {
		let dir = std::env::temp_dir().join(format!("gl-paths-test-{}-b", std::process::id()));
		let _ = std::fs::remove_dir_all(&dir);
		std::fs::create_dir_all(&dir).unwrap();
		std::fs::write(dir.join("a.bin"), b"x").unwrap();

		let path = unique_path(&dir, "a.bin").unwrap();
		assert_eq!(path, dir.join("a (1).bin"));

		std::fs::write(&path, b"y").unwrap();
		let path2 = unique_path(&dir, "a.bin").unwrap();
		assert_eq!(path2, dir.join("a (2).bin"));

		let _ = std::fs::remove_dir_all(&dir);
	}

	#[test]
	fn collision_with_no_extension_still_uniquifies() {
		let dir = std::env::temp_dir().join(format!("gl-paths-test-{}-c", std::process::id()));
		let _ = std::fs::remove_dir_all(&dir);
		std::fs::create_dir_all(&dir).unwrap();
		std::fs::write(dir.join("README"), b"x").unwrap();

		let path = unique_path(&dir, "README").unwrap();
		assert_eq!(path, dir.join("README (1)"));

		let _ = std::fs::remove_dir_all(&dir);
	}
}
