use std::path::PathBuf;

use ie::{ChatboxOptions, Color, Ie, LineScan, OcrTuning, OwnedImage, Rectangle};

const RED: Color = Color::new(255, 0, 0);
const WHITE: Color = Color::WHITE;

/// ASCII bitmaps for a tiny font with baseline 9 and box height 10.
const GLYPHS: &[(char, u32, &[&str])] = &[
	('A', 6, &["", "", "", " ## ", "#  #", "#  #", "####", "#  #", "#  #", "#  #"]),
	('B', 6, &["", "", "", "### ", "#  #", "#  #", "### ", "#  #", "#  #", "### "]),
	('C', 5, &["", "", "", " ###", "#   ", "#   ", "#   ", "#   ", "#   ", " ###"]),
];

fn pixels(rows: &[&str]) -> Vec<(u32, u32)> {
	rows.iter()
		.enumerate()
		.flat_map(|(dy, row)| row.chars().enumerate().filter(|(_, c)| *c == '#').map(move |(dx, _)| (dx as u32, dy as u32)))
		.collect()
}

fn font_json() -> String {
	let chars = GLYPHS
		.iter()
		.map(|(c, width, rows)| {
			let px = pixels(rows);
			let flat = px.iter().flat_map(|(x, y)| [*x, *y, 255]).collect::<Vec<_>>();
			serde_json::json!({"chr": c.to_string(), "width": width, "bonus": px.len(), "pixels": flat})
		})
		.collect::<Vec<_>>();

	serde_json::json!({"spacewidth": 3, "basey": 9, "height": 10, "shadow": false, "chars": chars}).to_string()
}

fn font_dir(test: &str) -> PathBuf {
	let dir = std::env::temp_dir().join(format!("glyphwatch-{test}-{}", std::process::id()));
	std::fs::create_dir_all(&dir).unwrap();
	std::fs::write(dir.join("tiny.fontdef.json"), font_json()).unwrap();
	dir
}

fn draw(frame: &mut OwnedImage, text: &str, mut x: i32, y: i32, color: Color) -> i32 {
	for ch in text.chars() {
		if ch == ' ' {
			x += 3;
			continue;
		}
		let (_, width, rows) = GLYPHS.iter().find(|(c, _, _)| *c == ch).unwrap();
		for (dx, dy) in pixels(rows) {
			frame.put_pixel(x as u32 + dx, (y - 9) as u32 + dy, color);
		}
		x += *width as i32;
	}
	x
}

#[test]
fn test_reads_single_glyph_end_to_end() {
	let dir = font_dir("single");
	let ie = Ie::try_new(&dir, OcrTuning::default()).unwrap();

	let mut frame = OwnedImage::filled(60, 30, Color::BLACK);
	draw(&mut frame, "A", 10, 20, RED);

	let line = ie.read_chat_line(frame.as_image(), RED, 10, 20, "tiny", LineScan::default()).unwrap();
	assert_eq!(line.text, "A");
	assert_eq!(line.area, Rectangle::new(10, 11, 6, 10));

	std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_chatbox_fragments_partition_line() {
	let dir = font_dir("partition");
	let ie = Ie::try_new(&dir, OcrTuning::default()).unwrap();

	let mut frame = OwnedImage::filled(160, 30, Color::BLACK);
	let end = draw(&mut frame, "CAB ", 4, 20, WHITE);
	let end = draw(&mut frame, "BACA ", end, 20, RED);
	draw(&mut frame, "ABC", end, 20, WHITE);

	let line = ie
		.read_chatbox_line(frame.as_image(), 4, 20, &[WHITE, RED], "tiny", ChatboxOptions::default())
		.unwrap()
		.unwrap();
	assert_eq!(line.text, "CAB BACA ABC");
	assert_eq!(line.fragments.len(), 3);

	let mut offset = 0;
	for fragment in &line.fragments {
		assert_eq!(fragment.index, offset);
		assert_eq!(&line.text[offset..offset + fragment.text.len()], fragment.text);
		offset += fragment.text.chars().count();
	}
	assert_eq!(offset, line.text.chars().count());
	assert_eq!(line.fragments[1].color, 0xFF0000);

	std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_noise_is_not_text() {
	let dir = font_dir("noise");
	let ie = Ie::try_new(&dir, OcrTuning::default()).unwrap();

	let mut frame = OwnedImage::filled(100, 30, Color::BLACK);
	for y in 0..30 {
		for x in 0..100 {
			if (x * 31 + y * 17) % 5 < 2 {
				frame.put_pixel(x, y, Color::new(200, 200, 200));
			}
		}
	}

	let options = ChatboxOptions { allow_gap: true, ..ChatboxOptions::default() };
	for x in [0, 5, 20, 50] {
		let line = ie.read_chatbox_line(frame.as_image(), x, 20, &[WHITE, RED], "tiny", options).unwrap();
		assert_eq!(line, None, "read text from noise at x={x}");
	}

	std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_missing_font_is_an_error() {
	let dir = font_dir("missing");
	let ie = Ie::try_new(&dir, OcrTuning::default()).unwrap();
	let frame = OwnedImage::filled(10, 10, Color::BLACK);

	assert!(ie.read_chat_line(frame.as_image(), RED, 0, 9, "nope", LineScan::default()).is_err());
	assert!(ie.read_chat_line(frame.as_image(), RED, 0, 9, "../tiny", LineScan::default()).is_err());
	assert!(Ie::try_new(dir.join("not-a-dir"), OcrTuning::default()).is_err());

	std::fs::remove_dir_all(dir).ok();
}
