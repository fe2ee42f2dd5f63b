//! Растровое превью карты
//!
//! Не гексагональная отрисовка, а быстрый взгляд на результат: каждая клетка —
//! квадрат `cell_size × cell_size`, нечётные строки сдвинуты на полклетки,
//! цвет биома смешан с белым фоном по прозрачности, реки — линии между центрами.

use crate::error::Result;
use crate::grid::Coord;
use crate::world::World;
use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::path::Path;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const RIVER: Rgb<u8> = Rgb([0, 0, 255]);

fn blend(rgb: [u8; 3], alpha: f64) -> Rgb<u8> {
    let mix = |c: u8| (f64::from(c) * alpha + 255.0 * (1.0 - alpha)).round() as u8;
    Rgb([mix(rgb[0]), mix(rgb[1]), mix(rgb[2])])
}

fn cell_origin(c: Coord, cell_size: u32) -> (i32, i32) {
    let shift = if c.y % 2 == 1 { cell_size / 2 } else { 0 };
    (
        (c.x as u32 * cell_size + shift) as i32,
        (c.y as u32 * cell_size) as i32,
    )
}

fn cell_center(c: Coord, cell_size: u32) -> (f32, f32) {
    let (x, y) = cell_origin(c, cell_size);
    let half = cell_size as f32 / 2.0;
    (x as f32 + half, y as f32 + half)
}

/// Рисует превью в памяти
#[must_use]
pub fn render_preview(world: &World, cell_size: u32) -> RgbImage {
    let cell_size = cell_size.max(2);
    let grid = &world.grid;
    let width = grid.width() as u32 * cell_size + cell_size / 2;
    let height = grid.height() as u32 * cell_size;
    let mut img: RgbImage = ImageBuffer::from_pixel(width, height, BACKGROUND);

    for c in grid.coords() {
        let idx = c.y * grid.width() + c.x;
        let color = blend(grid.biomes()[idx].to_rgb(), grid.transparencies()[idx]);
        let (x, y) = cell_origin(c, cell_size);
        draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(cell_size, cell_size), color);
    }

    for &(from, to) in world.rivers.segments() {
        draw_line_segment_mut(
            &mut img,
            cell_center(from, cell_size),
            cell_center(to, cell_size),
            RIVER,
        );
    }

    img
}

/// Сохраняет превью в PNG
pub fn save_preview(world: &World, cell_size: u32, path: impl AsRef<Path>) -> Result<()> {
    render_preview(world, cell_size).save(path)?;
    Ok(())
}
