use super::render::{affine_map_pixel, bgr555_to_rgba, text_map_pixel, tile_pixel};
use super::{layer_kind, ColorMode, LayerKind, VideoMemory};

const SHEET_TILES_PER_ROW: usize = 4;
const SHEET_TILE_COUNT: usize = 16;
const PALETTE_ENTRIES: usize = 512;

/// An RGBA8 image produced for visualization tooling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct LayerImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 pixels.
    pub rgba: Vec<u8>,
}

impl LayerImage {
    fn blank(width: usize, height: usize) -> Self {
        Self {
            width: u32::try_from(width).unwrap_or(u32::MAX),
            height: u32::try_from(height).unwrap_or(u32::MAX),
            rgba: vec![0; width * height * 4],
        }
    }

    fn put(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        let offset = (y * self.width as usize + x) * 4;
        if let Some(slot) = self.rgba.get_mut(offset..offset + 4) {
            slot.copy_from_slice(&rgba);
        }
    }
}

/// Palette indices of one 8×8 tile, row-major.
#[must_use]
pub fn tile_dump(
    video: &VideoMemory<'_>,
    character_base_block: u8,
    tile: usize,
    color_mode: ColorMode,
) -> [u8; 64] {
    let base = usize::from(character_base_block) * 0x4000;
    std::array::from_fn(|i| tile_pixel(video, base, color_mode, tile, i % 8, i / 8))
}

/// Grayscale sheet of the first sixteen tiles of background `bg`'s
/// character block, four tiles per row.
#[must_use]
pub fn tilemap(video: &VideoMemory<'_>, bg: usize) -> Option<LayerImage> {
    let info = video.background(bg)?;
    let side = SHEET_TILES_PER_ROW * 8;
    let mut image = LayerImage::blank(side, side);
    for tile in 0..SHEET_TILE_COUNT {
        let indices = tile_dump(video, info.character_base_block, tile, info.color_mode);
        let (origin_x, origin_y) = (
            (tile % SHEET_TILES_PER_ROW) * 8,
            (tile / SHEET_TILES_PER_ROW) * 8,
        );
        for (i, index) in indices.into_iter().enumerate() {
            let level = match info.color_mode {
                ColorMode::Colors16 => index * 17,
                ColorMode::Colors256 => index,
            };
            image.put(origin_x + i % 8, origin_y + i / 8, [level, level, level, 0xFF]);
        }
    }
    Some(image)
}

/// Renders the whole map of background `bg` with its real palettes.
/// Transparent pixels have alpha zero. Returns `None` when `bg` is out of
/// range or the current mode does not draw it as a tiled layer.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn debug_bg_tilemap(video: &VideoMemory<'_>, bg: usize) -> Option<LayerImage> {
    let info = video.background(bg)?;
    match layer_kind(video.bg_mode(), bg)? {
        LayerKind::Text => {
            let (width, height) = info.screen_size.text_dimensions();
            let (width, height) = (width as usize, height as usize);
            let mut image = LayerImage::blank(width, height);
            for y in 0..height {
                for x in 0..width {
                    if let Some(color) = text_map_pixel(video, &info, width, x, y) {
                        image.put(x, y, bgr555_to_rgba(color));
                    }
                }
            }
            Some(image)
        }
        LayerKind::Affine => {
            let size = info.screen_size.affine_dimension();
            let mut image = LayerImage::blank(size as usize, size as usize);
            for y in 0..i64::from(size) {
                for x in 0..i64::from(size) {
                    if let Some(color) = affine_map_pixel(video, &info, x, y) {
                        image.put(x as usize, y as usize, bgr555_to_rgba(color));
                    }
                }
            }
            Some(image)
        }
        LayerKind::Bitmap => None,
    }
}

/// All 512 palette entries (256 background, then 256 object) as RGBA8.
#[must_use]
pub fn palette_dump(video: &VideoMemory<'_>) -> Vec<[u8; 4]> {
    (0..PALETTE_ENTRIES)
        .map(|index| bgr555_to_rgba(video.palette_color(index)))
        .collect()
}
