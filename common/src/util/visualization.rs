use crate::db::core::{Board, ItemKind};
use crate::geom::{FloatPoint, TileShape};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

const LAYER_COLORS: [Rgba<u8>; 4] = [
    // front: red
    Rgba([255, 20, 80, 200]),
    // back: blue
    Rgba([0, 110, 255, 200]),
    Rgba([0, 255, 100, 170]),
    Rgba([255, 215, 0, 170]),
];

/// Renders the board items and, optionally, expansion room outlines to a PNG.
pub fn draw_board(
    board: &Board,
    rooms: &[(usize, TileShape)],
    filename: &str,
    size: u32,
) -> anyhow::Result<()> {
    let outline = board.bounding_box;
    if outline.width() <= 0 || outline.height() <= 0 {
        anyhow::bail!("board outline is empty");
    }
    let mut img = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 255]));

    let scale = size as f64 / outline.width().max(outline.height()) as f64;
    let map = |p: FloatPoint| {
        (
            ((p.x - outline.ll.x as f64) * scale) as f32,
            (size as f64 - (p.y - outline.ll.y as f64) * scale) as f32,
        )
    };

    let draw_outline = |img: &mut RgbaImage, shape: &TileShape, color: Rgba<u8>| {
        let corners = shape.corners();
        for i in 0..corners.len() {
            let a = map(corners[i]);
            let b = map(corners[(i + 1) % corners.len()]);
            draw_line_segment_mut(img, a, b, color);
        }
    };

    let fill_box = |img: &mut RgbaImage, shape: &TileShape, color: Rgba<u8>| {
        let b = shape.bounding_box();
        let (x, y_top) = map(b.corner(3).to_float());
        let w = (b.width() as f64 * scale).max(1.0) as u32;
        let h = (b.height() as f64 * scale).max(1.0) as u32;
        draw_filled_rect_mut(img, ImageRect::at(x as i32, y_top as i32).of_size(w, h), color);
    };

    let room_color = Rgba([90, 90, 90, 255]);
    for (_, shape) in rooms {
        draw_outline(&mut img, shape, room_color);
    }

    for item in board.items() {
        match &item.kind {
            ItemKind::Keepout { shape, .. } => fill_box(&mut img, shape, Rgba([70, 70, 80, 255])),
            ItemKind::Pin { shape, .. } => match shape {
                TileShape::Box(_) => fill_box(&mut img, shape, Rgba([200, 200, 200, 255])),
                _ => draw_outline(&mut img, shape, Rgba([200, 200, 200, 255])),
            },
            ItemKind::Trace {
                corners, layer, ..
            } => {
                let color = LAYER_COLORS[(*layer).min(LAYER_COLORS.len() - 1)];
                for w in corners.windows(2) {
                    draw_line_segment_mut(&mut img, map(w[0].to_float()), map(w[1].to_float()), color);
                }
            }
            ItemKind::Via { .. } => {
                draw_outline(&mut img, &item.tile_shape(0), Rgba([255, 255, 255, 255]));
            }
        }
    }

    img.save(Path::new(filename))
        .map_err(|e| anyhow::anyhow!("Failed to write image '{}': {}", filename, e))
}
