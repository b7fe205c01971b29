use std::path::PathBuf;

use anyhow::{Result, bail};

fn normalize_font_dir(dir: PathBuf, file_name: &str) -> PathBuf {
	// Allow the env var to point either to the app root (containing `fonts/`)
	// or directly to the `fonts/` folder.
	if dir.join(file_name).is_file() {
		dir
	} else {
		dir.join("fonts")
	}
}

/// Find the directory holding `<font_name>.fontdef.json`, both:
/// - when running from the repo (`cargo run`), and
/// - when running a packaged binary (assets next to the executable).
///
/// You can override discovery by setting `GLYPHWATCH_ASSETS_DIR`.
pub fn resolve_font_dir(font_name: &str) -> Result<PathBuf> {
	let file_name = format!("{font_name}.fontdef.json");

	let mut candidates: Vec<PathBuf> = Vec::new();
	if let Some(dir) = std::env::var_os("GLYPHWATCH_ASSETS_DIR") {
		candidates.push(PathBuf::from(dir));
	}
	if let Ok(exe) = std::env::current_exe()
		&& let Some(dir) = exe.parent()
	{
		candidates.push(dir.to_path_buf());
	}
	if let Ok(cwd) = std::env::current_dir() {
		candidates.push(cwd);
	}
	// Compile-time path to the workspace. Useful during local dev if the app is launched with a different CWD.
	#[cfg(debug_assertions)]
	candidates.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".."));

	let mut tried = Vec::new();
	for base in candidates {
		let font_dir = normalize_font_dir(base, &file_name);
		if font_dir.join(&file_name).is_file() {
			return Ok(font_dir);
		}
		tried.push(font_dir);
	}

	bail!(
		"chat font not found. Expected fonts/{file_name}\n\nSearched in:\n{}\n\nFix: copy the 'fonts/' folder next to the executable (or set GLYPHWATCH_ASSETS_DIR to the folder that contains it).",
		tried
			.into_iter()
			.map(|p| format!("  - {}", p.display()))
			.collect::<Vec<_>>()
			.join("\n")
	)
}
