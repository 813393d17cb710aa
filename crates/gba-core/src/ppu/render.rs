#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use super::{
    layer_kind, BackgroundInfo, ColorMode, LayerKind, VideoMemory, BACKGROUND_COUNT,
    DISPCNT_FORCED_BLANK, DISPCNT_FRAME_SELECT, FRAME_BYTES, SCREEN_WIDTH,
};
use crate::memory::io::{REG_BG0HOFS, REG_BG2PA, REG_MOSAIC};

const BITMAP_PAGE_BYTES: usize = 0xA000;
const MODE5_WIDTH: usize = 160;
const MODE5_HEIGHT: usize = 128;

/// Expands a BGR555 colour to opaque RGBA8.
#[must_use]
pub const fn bgr555_to_rgba(color: u16) -> [u8; 4] {
    const fn expand(channel: u16) -> u8 {
        let c = (channel & 0x1F) as u8;
        (c << 3) | (c >> 2)
    }
    [expand(color), expand(color >> 5), expand(color >> 10), 0xFF]
}

/// A background that takes part in composition, ordered front to back.
#[derive(Debug, Clone, Copy)]
struct Layer {
    index: usize,
    kind: LayerKind,
    info: BackgroundInfo,
}

/// Composes the visible 240×160 frame as RGBA8 from the current video
/// state. Nothing is cached between calls.
#[must_use]
pub fn render_frame(video: &VideoMemory<'_>) -> Vec<u8> {
    let mut frame = vec![0; FRAME_BYTES];
    if video.dispcnt() & DISPCNT_FORCED_BLANK != 0 {
        frame.fill(0xFF);
        return frame;
    }

    let layers = visible_layers(video);
    let backdrop = video.palette_color(0);
    let mosaic = video.io.read_halfword(REG_MOSAIC);

    for (pixel, rgba) in frame.chunks_exact_mut(4).enumerate() {
        let x = pixel % SCREEN_WIDTH;
        let y = pixel / SCREEN_WIDTH;
        let color = layers
            .iter()
            .find_map(|layer| {
                let (sx, sy) = if layer.info.mosaic {
                    apply_mosaic(mosaic, x, y)
                } else {
                    (x, y)
                };
                sample_layer(video, layer, sx, sy)
            })
            .unwrap_or(backdrop);
        rgba.copy_from_slice(&bgr555_to_rgba(color));
    }
    frame
}

fn visible_layers(video: &VideoMemory<'_>) -> Vec<Layer> {
    let mode = video.bg_mode();
    let mut layers: Vec<Layer> = (0..BACKGROUND_COUNT)
        .filter_map(|index| {
            let kind = layer_kind(mode, index)?;
            let info = video.background(index)?;
            info.enabled.then_some(Layer { index, kind, info })
        })
        .collect();
    layers.sort_by_key(|layer| (layer.info.priority, layer.index));
    layers
}

const fn apply_mosaic(mosaic: u16, x: usize, y: usize) -> (usize, usize) {
    let width = (mosaic & 0xF) as usize + 1;
    let height = ((mosaic >> 4) & 0xF) as usize + 1;
    (x - x % width, y - y % height)
}

fn sample_layer(video: &VideoMemory<'_>, layer: &Layer, x: usize, y: usize) -> Option<u16> {
    match layer.kind {
        LayerKind::Text => sample_text(video, layer.index, &layer.info, x, y),
        LayerKind::Affine => sample_affine(video, layer.index, &layer.info, x, y),
        LayerKind::Bitmap => sample_bitmap(video, x, y),
    }
}

fn sample_text(
    video: &VideoMemory<'_>,
    index: usize,
    info: &BackgroundInfo,
    x: usize,
    y: usize,
) -> Option<u16> {
    let scroll = REG_BG0HOFS + index * 4;
    let hofs = usize::from(video.io.read_halfword(scroll) & 0x1FF);
    let vofs = usize::from(video.io.read_halfword(scroll + 2) & 0x1FF);
    let (width, height) = info.screen_size.text_dimensions();
    let px = (x + hofs) % width as usize;
    let py = (y + vofs) % height as usize;
    text_map_pixel(video, info, width as usize, px, py)
}

/// Resolves pixel (`px`, `py`) of a text map `map_width` pixels wide to a
/// palette colour, or `None` when transparent.
pub(super) fn text_map_pixel(
    video: &VideoMemory<'_>,
    info: &BackgroundInfo,
    map_width: usize,
    px: usize,
    py: usize,
) -> Option<u16> {
    let (tile_x, tile_y) = (px / 8, py / 8);
    let block = tile_x / 32 + (tile_y / 32) * (map_width / 256);
    let entry_offset =
        info.screen_base() + block * 0x800 + ((tile_y % 32) * 32 + tile_x % 32) * 2;
    let entry = video.vram16(entry_offset);

    let tile = usize::from(entry & 0x3FF);
    let mut fx = px % 8;
    let mut fy = py % 8;
    if entry & (1 << 10) != 0 {
        fx = 7 - fx;
    }
    if entry & (1 << 11) != 0 {
        fy = 7 - fy;
    }

    let color_index = tile_pixel(video, info.character_base(), info.color_mode, tile, fx, fy);
    if color_index == 0 {
        return None;
    }
    let palette_index = match info.color_mode {
        ColorMode::Colors16 => usize::from(entry >> 12) * 16 + usize::from(color_index),
        ColorMode::Colors256 => usize::from(color_index),
    };
    Some(video.palette_color(palette_index))
}

/// Palette index of pixel (`fx`, `fy`) of `tile`, before palette-bank
/// selection.
pub(super) fn tile_pixel(
    video: &VideoMemory<'_>,
    character_base: usize,
    color_mode: ColorMode,
    tile: usize,
    fx: usize,
    fy: usize,
) -> u8 {
    match color_mode {
        ColorMode::Colors16 => {
            let byte = video.vram8(character_base + tile * 32 + fy * 4 + fx / 2);
            if fx & 1 == 0 {
                byte & 0xF
            } else {
                byte >> 4
            }
        }
        ColorMode::Colors256 => video.vram8(character_base + tile * 64 + fy * 8 + fx),
    }
}

fn read_word(video: &VideoMemory<'_>, offset: usize) -> u32 {
    u32::from(video.io.read_halfword(offset)) | (u32::from(video.io.read_halfword(offset + 2)) << 16)
}

fn sample_affine(
    video: &VideoMemory<'_>,
    index: usize,
    info: &BackgroundInfo,
    x: usize,
    y: usize,
) -> Option<u16> {
    let params = REG_BG2PA + (index - 2) * 0x10;
    let pa = i64::from(video.io.read_halfword(params) as i16);
    let pb = i64::from(video.io.read_halfword(params + 2) as i16);
    let pc = i64::from(video.io.read_halfword(params + 4) as i16);
    let pd = i64::from(video.io.read_halfword(params + 6) as i16);
    // Reference point is 28-bit signed 20.8 fixed point.
    let ref_x = i64::from(((read_word(video, params + 8) << 4) as i32) >> 4);
    let ref_y = i64::from(((read_word(video, params + 12) << 4) as i32) >> 4);

    let (x, y) = (x as i64, y as i64);
    let tex_x = (ref_x + pa * x + pb * y) >> 8;
    let tex_y = (ref_y + pc * x + pd * y) >> 8;
    affine_map_pixel(video, info, tex_x, tex_y)
}

/// Resolves texture coordinate (`tex_x`, `tex_y`) of an affine map.
pub(super) fn affine_map_pixel(
    video: &VideoMemory<'_>,
    info: &BackgroundInfo,
    tex_x: i64,
    tex_y: i64,
) -> Option<u16> {
    let size = i64::from(info.screen_size.affine_dimension());
    let (tex_x, tex_y) = if info.wraparound {
        (tex_x.rem_euclid(size), tex_y.rem_euclid(size))
    } else if (0..size).contains(&tex_x) && (0..size).contains(&tex_y) {
        (tex_x, tex_y)
    } else {
        return None;
    };

    let (px, py, tiles_per_row) = (tex_x as usize, tex_y as usize, size as usize / 8);
    let tile = usize::from(video.vram8(info.screen_base() + (py / 8) * tiles_per_row + px / 8));
    let color_index = tile_pixel(
        video,
        info.character_base(),
        ColorMode::Colors256,
        tile,
        px % 8,
        py % 8,
    );
    (color_index != 0).then(|| video.palette_color(usize::from(color_index)))
}

fn sample_bitmap(video: &VideoMemory<'_>, x: usize, y: usize) -> Option<u16> {
    let dispcnt = video.dispcnt();
    let page = if dispcnt & DISPCNT_FRAME_SELECT != 0 {
        BITMAP_PAGE_BYTES
    } else {
        0
    };
    match video.bg_mode() {
        3 => Some(video.vram16((y * SCREEN_WIDTH + x) * 2)),
        4 => {
            let color_index = video.vram8(page + y * SCREEN_WIDTH + x);
            (color_index != 0).then(|| video.palette_color(usize::from(color_index)))
        }
        5 if x < MODE5_WIDTH && y < MODE5_HEIGHT => {
            Some(video.vram16(page + (y * MODE5_WIDTH + x) * 2))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{bgr555_to_rgba, render_frame};
    use crate::memory::io::{REG_BG0CNT, REG_BG0HOFS, REG_BG2PA, REG_DISPCNT, REG_MOSAIC};
    use crate::memory::IoRegisters;
    use crate::ppu::{VideoMemory, FRAME_BYTES, SCREEN_WIDTH};

    struct Fixture {
        io: IoRegisters,
        vram: Vec<u8>,
        palette: Vec<u8>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                io: IoRegisters::default(),
                vram: vec![0; 0x18000],
                palette: vec![0; 0x400],
            }
        }

        fn color(&mut self, index: usize, value: u16) {
            self.palette[index * 2..index * 2 + 2].copy_from_slice(&value.to_le_bytes());
        }

        fn vram16(&mut self, offset: usize, value: u16) {
            self.vram[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        }

        fn render(&self) -> Vec<u8> {
            render_frame(&VideoMemory {
                io: &self.io,
                vram: &self.vram,
                palette: &self.palette,
            })
        }
    }

    fn pixel(frame: &[u8], x: usize, y: usize) -> [u8; 4] {
        let offset = (y * SCREEN_WIDTH + x) * 4;
        [frame[offset], frame[offset + 1], frame[offset + 2], frame[offset + 3]]
    }

    #[rstest]
    #[case(0x001F, [255, 0, 0, 255])]
    #[case(0x03E0, [0, 255, 0, 255])]
    #[case(0x7C00, [0, 0, 255, 255])]
    #[case(0x7FFF, [255, 255, 255, 255])]
    #[case(0x0010, [132, 0, 0, 255])]
    fn expands_bgr555(#[case] color: u16, #[case] rgba: [u8; 4]) {
        assert_eq!(bgr555_to_rgba(color), rgba);
    }

    #[test]
    fn forced_blank_is_white() {
        let mut fixture = Fixture::new();
        fixture.io.write_halfword(REG_DISPCNT, 1 << 7);
        let frame = fixture.render();
        assert_eq!(frame.len(), FRAME_BYTES);
        assert!(frame.iter().all(|&byte| byte == 0xFF));
    }

    #[test]
    fn empty_mode_zero_shows_backdrop() {
        let mut fixture = Fixture::new();
        fixture.color(0, 0x03E0);
        let frame = fixture.render();
        assert_eq!(pixel(&frame, 17, 99), [0, 255, 0, 255]);
    }

    #[test]
    fn mode3_reads_direct_colour() {
        let mut fixture = Fixture::new();
        fixture.io.write_halfword(REG_DISPCNT, 0x0403);
        fixture.vram16((10 * SCREEN_WIDTH + 5) * 2, 0x7C00);
        let frame = fixture.render();
        assert_eq!(pixel(&frame, 5, 10), [0, 0, 255, 255]);
        assert_eq!(pixel(&frame, 6, 10), [0, 0, 0, 255]);
    }

    #[test]
    fn mode4_page_flip_selects_second_page() {
        let mut fixture = Fixture::new();
        fixture.color(3, 0x001F);
        fixture.vram[0xA000] = 3;
        fixture.io.write_halfword(REG_DISPCNT, 0x0404);
        assert_eq!(pixel(&fixture.render(), 0, 0), [0, 0, 0, 255]);
        fixture.io.write_halfword(REG_DISPCNT, 0x0414);
        assert_eq!(pixel(&fixture.render(), 0, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn mode5_outside_bitmap_is_backdrop() {
        let mut fixture = Fixture::new();
        fixture.color(0, 0x7FFF);
        fixture.vram16(0, 0x001F);
        fixture.io.write_halfword(REG_DISPCNT, 0x0405);
        let frame = fixture.render();
        assert_eq!(pixel(&frame, 0, 0), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 200, 0), [255, 255, 255, 255]);
        assert_eq!(pixel(&frame, 0, 150), [255, 255, 255, 255]);
    }

    /// BG `bg` uses char block 0 and screen block `block`; tile 1 is solid
    /// colour index 1 (4bpp) and every map entry points at it with bank
    /// `bank`.
    fn solid_text_layer(fixture: &mut Fixture, bg: usize, block: u16, bank: u16, priority: u16) {
        fixture.vram[32..64].fill(0x11);
        let base = usize::from(block) * 0x800;
        for entry in 0..1024 {
            fixture.vram16(base + entry * 2, 1 | (bank << 12));
        }
        fixture
            .io
            .write_halfword(REG_BG0CNT + bg * 2, (block << 8) | priority);
    }

    #[test]
    fn equal_priority_prefers_lower_background_index() {
        let mut fixture = Fixture::new();
        fixture.color(17, 0x001F);
        fixture.color(33, 0x03E0);
        solid_text_layer(&mut fixture, 0, 30, 1, 1);
        solid_text_layer(&mut fixture, 1, 31, 2, 1);
        fixture.io.write_halfword(REG_DISPCNT, 0x0300);
        assert_eq!(pixel(&fixture.render(), 0, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn lower_priority_value_wins() {
        let mut fixture = Fixture::new();
        fixture.color(17, 0x001F);
        fixture.color(33, 0x03E0);
        solid_text_layer(&mut fixture, 0, 30, 1, 2);
        solid_text_layer(&mut fixture, 1, 31, 2, 0);
        fixture.io.write_halfword(REG_DISPCNT, 0x0300);
        assert_eq!(pixel(&fixture.render(), 0, 0), [0, 255, 0, 255]);
    }

    #[test]
    fn text_scroll_and_horizontal_flip() {
        let mut fixture = Fixture::new();
        fixture.color(1, 0x001F);
        // Tile 1: only column 0 is opaque.
        for row in 0..8 {
            fixture.vram[32 + row * 4] = 0x01;
        }
        // Entry (1, 0) is tile 1 flipped horizontally.
        fixture.vram16(30 * 0x800 + 2, 1 | (1 << 10));
        fixture.io.write_halfword(REG_BG0CNT, 30 << 8);
        fixture.io.write_halfword(REG_DISPCNT, 0x0100);
        let frame = fixture.render();
        assert_eq!(pixel(&frame, 15, 0), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 8, 0), [0, 0, 0, 255]);

        fixture.io.write_halfword(REG_BG0HOFS, 8);
        let frame = fixture.render();
        assert_eq!(pixel(&frame, 7, 3), [255, 0, 0, 255]);
    }

    #[test]
    fn mosaic_repeats_the_block_origin() {
        let mut fixture = Fixture::new();
        fixture.io.write_halfword(REG_DISPCNT, 0x0403);
        fixture.vram16(0, 0x001F);
        fixture.io.write_halfword(REG_MOSAIC, 0x0033);
        fixture.io.write_halfword(REG_BG0CNT + 4, 1 << 6);
        let frame = fixture.render();
        assert_eq!(pixel(&frame, 3, 3), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 4, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn affine_identity_maps_screen_to_texture() {
        let mut fixture = Fixture::new();
        fixture.color(5, 0x7C00);
        // Map entry (1, 0) of a 128 px map points at tile 2; tile 2 is solid 5.
        fixture.vram[0x800 + 1] = 2;
        fixture.vram[128..192].fill(5);
        fixture.io.write_halfword(REG_BG0CNT + 4, 1 << 8);
        fixture.io.write_halfword(REG_BG2PA, 0x100);
        fixture.io.write_halfword(REG_BG2PA + 6, 0x100);
        fixture.io.write_halfword(REG_DISPCNT, 0x0402);
        let frame = fixture.render();
        assert_eq!(pixel(&frame, 9, 2), [0, 0, 255, 255]);
        assert_eq!(pixel(&frame, 0, 0), [0, 0, 0, 255]);
        // Outside the 128 px map without wraparound: backdrop.
        assert_eq!(pixel(&frame, 137, 2), [0, 0, 0, 255]);

        fixture.io.write_halfword(REG_BG0CNT + 4, (1 << 8) | (1 << 13));
        assert_eq!(pixel(&fixture.render(), 137, 2), [0, 0, 255, 255]);
    }

    #[test]
    fn modes_six_and_seven_show_backdrop() {
        let mut fixture = Fixture::new();
        fixture.color(0, 0x001F);
        fixture.vram16(0, 0x7C00);
        fixture.io.write_halfword(REG_DISPCNT, 0x0406);
        assert_eq!(pixel(&fixture.render(), 0, 0), [255, 0, 0, 255]);
    }
}
