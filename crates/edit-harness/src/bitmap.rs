//! Bitmap capture and tolerance-based comparison.
//!
//! Rendered ratatui buffers are rasterised into RGBA images so that visual
//! checks can be phrased as "these two renderings are the same within a
//! tolerance" rather than as exact cell-by-cell equality.

use crate::{TestError, TestResult};
use image::{imageops, ImageFormat, ImageReader, Rgba, RgbaImage};
use ratatui::buffer::{Buffer, Cell};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Edge length, in pixels, of the block a single cell is rasterised to.
pub const GLYPH_CELL: u32 = 4;

const DEFAULT_FG: Rgba<u8> = Rgba([229, 229, 229, 255]);
const DEFAULT_BG: Rgba<u8> = Rgba([0, 0, 0, 255]);
const DIFF_MARK: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// An RGBA image captured from a rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    image: RgbaImage,
}

impl Bitmap {
    /// A bitmap filled with one colour.
    pub fn new(width: u32, height: u32, fill: Rgba<u8>) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, fill),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Rasterise a region of a rendered buffer.
    ///
    /// Every cell becomes a `GLYPH_CELL` x `GLYPH_CELL` block. Blank cells
    /// are filled with their background; cells showing a glyph are stamped
    /// with a pattern derived from the glyph's code points, drawn in the
    /// foreground colour. Different glyphs therefore produce different
    /// pixels, while equal glyphs in equal colours produce equal pixels.
    pub fn from_buffer(buffer: &Buffer, area: Rect) -> Self {
        let area = area.intersection(buffer.area);
        let mut image = RgbaImage::from_pixel(
            u32::from(area.width) * GLYPH_CELL,
            u32::from(area.height) * GLYPH_CELL,
            DEFAULT_BG,
        );

        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                let Some(cell) = buffer.cell((x, y)) else {
                    continue;
                };
                let ox = u32::from(x - area.x) * GLYPH_CELL;
                let oy = u32::from(y - area.y) * GLYPH_CELL;
                stamp_cell(&mut image, ox, oy, cell);
            }
        }

        Self { image }
    }

    /// Load a PNG file.
    pub fn load_png(path: impl AsRef<Path>) -> TestResult<Self> {
        let image = ImageReader::open(path.as_ref())?
            .with_guessed_format()?
            .decode()?
            .to_rgba8();
        Ok(Self { image })
    }

    /// Write as PNG, creating parent directories.
    pub fn save_png(&self, path: impl AsRef<Path>) -> TestResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel at `(x, y)`, if in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    /// Overwrite a pixel; out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        if let Some(p) = self.image.get_pixel_mut_checked(x, y) {
            *p = color;
        }
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Threshold luminance into pure black and white.
    pub fn to_black_white(&self, threshold: u8) -> Self {
        let mut image = self.image.clone();
        for p in image.pixels_mut() {
            let value = if luminance(*p) >= threshold { 255 } else { 0 };
            *p = Rgba([value, value, value, 255]);
        }
        Self { image }
    }

    /// Copy out a sub-rectangle.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> TestResult<Self> {
        let fits = x.checked_add(width).is_some_and(|r| r <= self.width())
            && y.checked_add(height).is_some_and(|b| b <= self.height());
        if !fits {
            return Err(TestError::InvalidArgument(format!(
                "Crop {}x{}+{}+{} exceeds bitmap {}x{}",
                width,
                height,
                x,
                y,
                self.width(),
                self.height()
            )));
        }
        Ok(Self {
            image: imageops::crop_imm(&self.image, x, y, width, height).to_image(),
        })
    }

    /// Compare `sample` against this bitmap as the master.
    pub fn compare(&self, sample: &Bitmap, criteria: &ComparisonCriteria) -> ComparisonResult {
        compare(self, sample, criteria)
    }
}

/// Tolerances for a bitmap comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonCriteria {
    /// Largest acceptable share of differing pixels, `0.0..=1.0`.
    pub max_error_proportion: f64,
    /// Largest colour distance at which two pixels still count as equal.
    pub max_color_distance: f64,
}

impl ComparisonCriteria {
    pub fn new(max_error_proportion: f64, max_color_distance: f64) -> Self {
        Self {
            max_error_proportion,
            max_color_distance,
        }
    }

    /// No differing pixels at all.
    pub fn exact() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Default for ComparisonCriteria {
    fn default() -> Self {
        Self::exact()
    }
}

/// Result of a bitmap comparison.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub differing_pixels: u64,
    pub total_pixels: u64,
    /// Share of differing pixels; 1.0 on a size mismatch.
    pub proportion: f64,
    /// Largest colour distance seen between corresponding pixels.
    pub max_distance: f64,
    pub size_mismatch: bool,
    pub criteria_met: bool,
    /// Master in greyscale with differing pixels marked red.
    pub difference: Option<Bitmap>,
}

impl ComparisonResult {
    pub fn describe(&self) -> String {
        if self.size_mismatch {
            return "bitmap sizes differ".to_string();
        }
        format!(
            "{} of {} pixels differ ({:.2}%), max colour distance {:.3}",
            self.differing_pixels,
            self.total_pixels,
            self.proportion * 100.0,
            self.max_distance
        )
    }
}

/// Euclidean distance over normalised RGBA channels, scaled to `0.0..=1.0`.
pub fn color_distance(a: Rgba<u8>, b: Rgba<u8>) -> f64 {
    let sum: f64 = a
        .0
        .iter()
        .zip(b.0.iter())
        .map(|(&x, &y)| {
            let d = (f64::from(x) - f64::from(y)) / 255.0;
            d * d
        })
        .sum();
    sum.sqrt() / 2.0
}

/// Compare `sample` against `master` under `criteria`.
pub fn compare(master: &Bitmap, sample: &Bitmap, criteria: &ComparisonCriteria) -> ComparisonResult {
    if master.width() != sample.width() || master.height() != sample.height() {
        let total = u64::from(master.width()) * u64::from(master.height());
        return ComparisonResult {
            differing_pixels: total,
            total_pixels: total,
            proportion: 1.0,
            max_distance: 1.0,
            size_mismatch: true,
            criteria_met: false,
            difference: None,
        };
    }

    let mut difference = master.to_greyscale();
    let mut differing = 0u64;
    let mut max_distance = 0.0f64;

    for (x, y, &m) in master.image.enumerate_pixels() {
        let s = *sample.image.get_pixel(x, y);
        let distance = color_distance(m, s);
        max_distance = max_distance.max(distance);
        if distance > criteria.max_color_distance {
            differing += 1;
            difference.set_pixel(x, y, DIFF_MARK);
        }
    }

    let total = u64::from(master.width()) * u64::from(master.height());
    let proportion = if total == 0 {
        0.0
    } else {
        differing as f64 / total as f64
    };

    ComparisonResult {
        differing_pixels: differing,
        total_pixels: total,
        proportion,
        max_distance,
        size_mismatch: false,
        criteria_met: proportion <= criteria.max_error_proportion,
        difference: Some(difference),
    }
}

impl Bitmap {
    fn to_greyscale(&self) -> Self {
        let mut image = self.image.clone();
        for p in image.pixels_mut() {
            let l = luminance(*p) / 2;
            *p = Rgba([l, l, l, 255]);
        }
        Self { image }
    }
}

fn luminance(p: Rgba<u8>) -> u8 {
    let [r, g, b, _] = p.0;
    let l = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
    l.round().clamp(0.0, 255.0) as u8
}

fn stamp_cell(image: &mut RgbaImage, ox: u32, oy: u32, cell: &Cell) {
    let mut fg = color_to_rgba(cell.fg, DEFAULT_FG);
    let mut bg = color_to_rgba(cell.bg, DEFAULT_BG);
    if cell.modifier.contains(Modifier::REVERSED) {
        std::mem::swap(&mut fg, &mut bg);
    }

    let symbol = cell.symbol();
    let pattern = if symbol.trim().is_empty() || cell.modifier.contains(Modifier::HIDDEN) {
        0
    } else {
        glyph_pattern(symbol)
    };

    for dy in 0..GLYPH_CELL {
        for dx in 0..GLYPH_CELL {
            let bit = dy * GLYPH_CELL + dx;
            let color = if pattern & (1 << bit) != 0 { fg } else { bg };
            image.put_pixel(ox + dx, oy + dy, color);
        }
    }
}

/// 16-bit stamp for a glyph; distinct BMP characters get distinct stamps.
fn glyph_pattern(symbol: &str) -> u16 {
    symbol.chars().fold(0u16, |acc, c| {
        let cp = u32::from(c);
        acc.rotate_left(5) ^ ((cp & 0xFFFF) as u16) ^ ((cp >> 16) as u16)
    })
}

/// Resolve a terminal colour to RGBA; `Reset` maps to `default`.
pub fn color_to_rgba(color: Color, default: Rgba<u8>) -> Rgba<u8> {
    let rgb = match color {
        Color::Reset => return default,
        Color::Black => (0, 0, 0),
        Color::Red => (205, 0, 0),
        Color::Green => (0, 205, 0),
        Color::Yellow => (205, 205, 0),
        Color::Blue => (0, 0, 238),
        Color::Magenta => (205, 0, 205),
        Color::Cyan => (0, 205, 205),
        Color::Gray => (229, 229, 229),
        Color::DarkGray => (127, 127, 127),
        Color::LightRed => (255, 0, 0),
        Color::LightGreen => (0, 255, 0),
        Color::LightYellow => (255, 255, 0),
        Color::LightBlue => (92, 92, 255),
        Color::LightMagenta => (255, 0, 255),
        Color::LightCyan => (0, 255, 255),
        Color::White => (255, 255, 255),
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Indexed(i) => indexed_rgb(i),
    };
    Rgba([rgb.0, rgb.1, rgb.2, 255])
}

fn indexed_rgb(i: u8) -> (u8, u8, u8) {
    const BASE: [Color; 16] = [
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Yellow,
        Color::Blue,
        Color::Magenta,
        Color::Cyan,
        Color::Gray,
        Color::DarkGray,
        Color::LightRed,
        Color::LightGreen,
        Color::LightYellow,
        Color::LightBlue,
        Color::LightMagenta,
        Color::LightCyan,
        Color::White,
    ];
    match i {
        0..=15 => {
            let [r, g, b, _] = color_to_rgba(BASE[usize::from(i)], DEFAULT_BG).0;
            (r, g, b)
        }
        16..=231 => {
            let n = i - 16;
            let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            (level(n / 36), level((n / 6) % 6), level(n % 6))
        }
        _ => {
            let v = 8 + (i - 232) * 10;
            (v, v, v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Style;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn test_identical_meets_any_criteria() {
        let a = Bitmap::new(10, 10, WHITE);
        let b = a.clone();
        let result = a.compare(&b, &ComparisonCriteria::exact());
        assert!(result.criteria_met);
        assert_eq!(result.differing_pixels, 0);
        assert_eq!(result.max_distance, 0.0);
    }

    #[test]
    fn test_one_percent_difference() {
        let master = Bitmap::new(10, 10, WHITE);
        let mut sample = master.clone();
        sample.set_pixel(3, 4, BLACK);

        let loose = master.compare(&sample, &ComparisonCriteria::new(0.05, 0.0));
        assert!(loose.criteria_met);
        assert_eq!(loose.differing_pixels, 1);
        assert!((loose.proportion - 0.01).abs() < 1e-9);

        let strict = master.compare(&sample, &ComparisonCriteria::exact());
        assert!(!strict.criteria_met);

        let difference = strict.difference.unwrap();
        assert_eq!(difference.pixel(3, 4), Some(DIFF_MARK));
        assert_ne!(difference.pixel(0, 0), Some(DIFF_MARK));
    }

    #[test]
    fn test_color_distance_tolerance() {
        let master = Bitmap::new(2, 2, Rgba([100, 100, 100, 255]));
        let sample = Bitmap::new(2, 2, Rgba([102, 100, 100, 255]));

        assert!(!master.compare(&sample, &ComparisonCriteria::exact()).criteria_met);
        assert!(master.compare(&sample, &ComparisonCriteria::new(0.0, 0.01)).criteria_met);
    }

    #[test]
    fn test_color_distance_range() {
        assert_eq!(color_distance(BLACK, BLACK), 0.0);
        let max = color_distance(Rgba([0, 0, 0, 0]), Rgba([255, 255, 255, 255]));
        assert!((max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_size_mismatch_never_meets() {
        let a = Bitmap::new(4, 4, WHITE);
        let b = Bitmap::new(4, 5, WHITE);
        let result = a.compare(&b, &ComparisonCriteria::new(1.0, 1.0));
        assert!(result.size_mismatch);
        assert!(!result.criteria_met);
        assert_eq!(result.describe(), "bitmap sizes differ");
    }

    #[test]
    fn test_black_white() {
        let mut b = Bitmap::new(2, 1, Rgba([200, 200, 200, 255]));
        b.set_pixel(1, 0, Rgba([20, 20, 20, 255]));
        let bw = b.to_black_white(128);
        assert_eq!(bw.pixel(0, 0), Some(WHITE));
        assert_eq!(bw.pixel(1, 0), Some(BLACK));
    }

    #[test]
    fn test_crop() {
        let mut b = Bitmap::new(6, 6, WHITE);
        b.set_pixel(4, 4, BLACK);
        let c = b.crop(3, 3, 3, 3).unwrap();
        assert_eq!((c.width(), c.height()), (3, 3));
        assert_eq!(c.pixel(1, 1), Some(BLACK));
        assert!(b.crop(4, 4, 3, 3).is_err());
    }

    #[test]
    fn test_from_buffer_blank_is_background() {
        let area = Rect::new(0, 0, 3, 1);
        let buffer = Buffer::empty(area);
        let bitmap = Bitmap::from_buffer(&buffer, area);
        assert_eq!(bitmap.width(), 3 * GLYPH_CELL);
        assert_eq!(bitmap.height(), GLYPH_CELL);
        assert!(bitmap.as_image().pixels().all(|p| *p == DEFAULT_BG));
    }

    #[test]
    fn test_from_buffer_distinguishes_glyphs() {
        let area = Rect::new(0, 0, 3, 1);
        let mut a = Buffer::empty(area);
        let mut b = Buffer::empty(area);
        let mut c = Buffer::empty(area);
        a.set_string(0, 0, "abc", Style::default());
        b.set_string(0, 0, "abc", Style::default());
        c.set_string(0, 0, "●●●", Style::default());

        let (a, b, c) = (
            Bitmap::from_buffer(&a, area),
            Bitmap::from_buffer(&b, area),
            Bitmap::from_buffer(&c, area),
        );
        assert!(a.compare(&b, &ComparisonCriteria::exact()).criteria_met);
        assert!(!a.compare(&c, &ComparisonCriteria::exact()).criteria_met);
    }

    #[test]
    fn test_from_buffer_sub_area() {
        let mut buffer = Buffer::empty(Rect::new(0, 0, 10, 2));
        buffer.set_string(5, 1, "x", Style::default());
        let bitmap = Bitmap::from_buffer(&buffer, Rect::new(5, 1, 20, 20));
        // Clipped to the buffer.
        assert_eq!(bitmap.width(), 5 * GLYPH_CELL);
        assert_eq!(bitmap.height(), GLYPH_CELL);
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/img.png");
        let mut b = Bitmap::new(3, 2, WHITE);
        b.set_pixel(2, 1, Rgba([1, 2, 3, 255]));
        b.save_png(&path).unwrap();

        let loaded = Bitmap::load_png(&path).unwrap();
        assert_eq!(loaded, b);
    }

    #[test]
    fn test_indexed_colors() {
        assert_eq!(color_to_rgba(Color::Indexed(1), BLACK), color_to_rgba(Color::Red, BLACK));
        assert_eq!(color_to_rgba(Color::Indexed(16), BLACK), BLACK);
        assert_eq!(color_to_rgba(Color::Indexed(231), BLACK), WHITE);
        assert_eq!(color_to_rgba(Color::Reset, WHITE), WHITE);
    }
}
