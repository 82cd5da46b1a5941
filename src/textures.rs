//! Procedural textures generated at startup.
//!
//! Color textures are painted onto RGBA images with a seeded RNG plus Perlin
//! grain; water normal maps are sums of sinusoid octaves encoded as
//! tangent-space normals (128 = flat).

use std::f32::consts::{PI, TAU};

use image::{Rgba, RgbaImage};
use noise::{NoiseFn, Perlin};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::scene::TextureKind;

/// One octave of a water normal map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalOctave {
    /// Repetitions across the texture
    pub frequency: f32,
    pub amplitude: f32,
}

/// Broad swell normals: 1024², repeated (4, 8) on the surface
pub const PRIMARY_NORMAL_OCTAVES: [NormalOctave; 3] = [
    NormalOctave { frequency: 4.0, amplitude: 0.6 },
    NormalOctave { frequency: 8.0, amplitude: 0.3 },
    NormalOctave { frequency: 16.0, amplitude: 0.1 },
];
pub const PRIMARY_NORMAL_SIZE: u32 = 1024;

/// Fine ripple normals: 512², repeated (10, 20) on the surface
pub const DETAIL_NORMAL_OCTAVES: [NormalOctave; 3] = [
    NormalOctave { frequency: 12.0, amplitude: 0.5 },
    NormalOctave { frequency: 24.0, amplitude: 0.3 },
    NormalOctave { frequency: 48.0, amplitude: 0.2 },
];
pub const DETAIL_NORMAL_SIZE: u32 = 512;

/// Every texture the scene samples
pub struct TextureSet {
    pub stone: RgbaImage,
    pub stone_wall: RgbaImage,
    pub grass: RgbaImage,
    pub wood: RgbaImage,
    pub water_primary: RgbaImage,
    pub water_detail: RgbaImage,
}

impl TextureSet {
    pub fn generate(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let stone = stone(&mut rng);
        let stone_wall = stone_wall(&mut rng);
        let grass = grass(&mut rng);
        let wood = wood(&mut rng);
        let water_primary = water_normal_map(PRIMARY_NORMAL_SIZE, &PRIMARY_NORMAL_OCTAVES, &mut rng);
        let water_detail = water_normal_map(DETAIL_NORMAL_SIZE, &DETAIL_NORMAL_OCTAVES, &mut rng);
        Self {
            stone,
            stone_wall,
            grass,
            wood,
            water_primary,
            water_detail,
        }
    }

    pub fn get(&self, kind: TextureKind) -> &RgbaImage {
        match kind {
            TextureKind::Stone => &self.stone,
            TextureKind::StoneWall => &self.stone_wall,
            TextureKind::Grass => &self.grass,
            TextureKind::Wood => &self.wood,
        }
    }
}

fn rgb(r: f32, g: f32, b: f32) -> [f32; 3] {
    [r, g, b]
}

/// Alpha-blend a color into one pixel; off-canvas writes are clipped
fn blend(img: &mut RgbaImage, x: i32, y: i32, color: [f32; 3], alpha: f32) {
    let (w, h) = img.dimensions();
    if x < 0 || y < 0 || x >= w as i32 || y >= h as i32 {
        return;
    }
    let Rgba(dst) = img.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let mixed = dst[c] as f32 * (1.0 - alpha) + color[c] * alpha;
        dst[c] = mixed.round().clamp(0.0, 255.0) as u8;
    }
}

fn fill_rect(img: &mut RgbaImage, x: f32, y: f32, w: f32, h: f32, color: [f32; 3], alpha: f32) {
    let (x0, y0) = (x.floor() as i32, y.floor() as i32);
    let (x1, y1) = ((x + w).ceil() as i32, (y + h).ceil() as i32);
    for py in y0..y1 {
        for px in x0..x1 {
            blend(img, px, py, color, alpha);
        }
    }
}

/// Radial gradient from `alpha` at the center to transparent at `radius`
fn stain(img: &mut RgbaImage, cx: f32, cy: f32, radius: f32, color: [f32; 3], alpha: f32) {
    let r = radius.ceil() as i32;
    for dy in -r..=r {
        for dx in -r..=r {
            let d = ((dx * dx + dy * dy) as f32).sqrt() / radius;
            if d < 1.0 {
                blend(img, cx as i32 + dx, cy as i32 + dy, color, alpha * (1.0 - d));
            }
        }
    }
}

fn ellipse(img: &mut RgbaImage, cx: f32, cy: f32, rx: f32, ry: f32, color: [f32; 3], alpha: f32) {
    let (ix, iy) = (rx.ceil() as i32, ry.ceil() as i32);
    for dy in -iy..=iy {
        for dx in -ix..=ix {
            let (u, v) = (dx as f32 / rx, dy as f32 / ry);
            if u * u + v * v <= 1.0 {
                blend(img, cx as i32 + dx, cy as i32 + dy, color, alpha);
            }
        }
    }
}

/// Thick line segment stamped every half pixel
fn stroke(img: &mut RgbaImage, from: (f32, f32), to: (f32, f32), width: f32, color: [f32; 3], alpha: f32) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = ((dx * dx + dy * dy).sqrt() * 2.0).ceil().max(1.0) as i32;
    let half = (width / 2.0).max(0.5);
    for i in 0..=steps {
        let s = i as f32 / steps as f32;
        let (x, y) = (from.0 + dx * s, from.1 + dy * s);
        fill_rect(img, x - half, y - half, half * 2.0, half * 2.0, color, alpha);
    }
}

/// Low-contrast Perlin grain so flat fills don't band
fn grain(img: &mut RgbaImage, perlin: &Perlin, scale: f64, strength: f32) {
    for (x, y, Rgba(px)) in img.enumerate_pixels_mut() {
        let n = perlin.get([x as f64 * scale, y as f64 * scale]) as f32;
        for c in px.iter_mut().take(3) {
            *c = (*c as f32 * (1.0 + n * strength)).round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn solid(width: u32, height: u32, hex: u32) -> RgbaImage {
    let [_, r, g, b] = hex.to_be_bytes();
    RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]))
}

/// Weathered arch stone: grain speckle, dark stains, moss and hairline cracks
pub fn stone(rng: &mut StdRng) -> RgbaImage {
    const SIZE: f32 = 512.0;
    let mut img = solid(512, 512, 0x7A7268);

    for _ in 0..8000 {
        let (x, y) = (rng.gen::<f32>() * SIZE, rng.gen::<f32>() * SIZE);
        let base = 90.0 + rng.gen::<f32>() * 60.0;
        let (w, h) = (1.0 + rng.gen::<f32>() * 2.0, 1.0 + rng.gen::<f32>() * 2.0);
        fill_rect(&mut img, x, y, w, h, rgb(base + 10.0, base + 5.0, base - 5.0), 1.0);
    }
    for _ in 0..15 {
        let (x, y) = (rng.gen::<f32>() * SIZE, rng.gen::<f32>() * SIZE);
        let radius = 15.0 + rng.gen::<f32>() * 40.0;
        stain(&mut img, x, y, radius, rgb(50.0, 40.0, 30.0), 0.25);
    }
    for _ in 0..8 {
        let (x, y) = (rng.gen::<f32>() * SIZE, rng.gen::<f32>() * SIZE);
        let radius = 10.0 + rng.gen::<f32>() * 25.0;
        stain(&mut img, x, y, radius, rgb(60.0, 80.0, 40.0), 0.2);
    }
    for _ in 0..20 {
        let mut at = (rng.gen::<f32>() * SIZE, rng.gen::<f32>() * SIZE);
        for _ in 0..5 {
            let next = (
                at.0 + (rng.gen::<f32>() - 0.5) * 40.0,
                at.1 + (rng.gen::<f32>() - 0.5) * 40.0,
            );
            stroke(&mut img, at, next, 0.5, rgb(40.0, 35.0, 25.0), 0.3);
            at = next;
        }
    }

    grain(&mut img, &Perlin::new(rng.gen()), 0.05, 0.08);
    img
}

/// Running-bond stone blocks with mortar joints
pub fn stone_wall(rng: &mut StdRng) -> RgbaImage {
    const SIZE: f32 = 512.0;
    const BLOCK_H: f32 = 40.0;
    const BLOCK_W: f32 = 80.0;
    let mortar = rgb(50.0, 45.0, 35.0);
    let mut img = solid(512, 512, 0x706860);

    let rows = (SIZE / BLOCK_H).ceil() as i32;
    let cols = (SIZE / BLOCK_W).ceil() as i32;
    for row in 0..rows {
        let offset = (row % 2) as f32 * BLOCK_W / 2.0;
        let y = row as f32 * BLOCK_H;
        for col in -1..=cols {
            let x = col as f32 * BLOCK_W + offset;
            let base = 85.0 + rng.gen::<f32>() * 40.0;
            fill_rect(&mut img, x + 2.0, y + 2.0, BLOCK_W - 4.0, BLOCK_H - 4.0, rgb(base + 15.0, base + 8.0, base), 1.0);

            for _ in 0..30 {
                let px = x + 2.0 + rng.gen::<f32>() * (BLOCK_W - 4.0);
                let py = y + 2.0 + rng.gen::<f32>() * (BLOCK_H - 4.0);
                let b = 70.0 + rng.gen::<f32>() * 50.0;
                fill_rect(&mut img, px, py, 2.0, 2.0, rgb(b + 10.0, b + 5.0, b), 1.0);
            }
        }
        fill_rect(&mut img, 0.0, y, SIZE, 3.0, mortar, 0.6);
    }

    for row in 0..rows {
        let offset = (row % 2) as f32 * BLOCK_W / 2.0;
        for col in 0..=cols {
            let x = col as f32 * BLOCK_W + offset;
            fill_rect(&mut img, x - 1.0, row as f32 * BLOCK_H, 3.0, BLOCK_H, mortar, 0.5);
        }
    }
    img
}

/// Grass blades over a rich green base, with darker soil patches
pub fn grass(rng: &mut StdRng) -> RgbaImage {
    const SIZE: f32 = 256.0;
    let mut img = solid(256, 256, 0x2A5518);

    for _ in 0..6000 {
        let (x, y) = (rng.gen::<f32>() * SIZE, rng.gen::<f32>() * SIZE);
        let green = 50.0 + rng.gen::<f32>() * 70.0;
        let color = rgb(15.0 + rng.gen::<f32>() * 25.0, green, 8.0 + rng.gen::<f32>() * 15.0);
        let h = 1.0 + rng.gen::<f32>() * 3.0;
        fill_rect(&mut img, x, y, 1.0, h, color, 1.0);
    }
    for _ in 0..25 {
        let (x, y) = (rng.gen::<f32>() * SIZE, rng.gen::<f32>() * SIZE);
        let alpha = 0.15 + rng.gen::<f32>() * 0.2;
        let r = 4.0 + rng.gen::<f32>() * 8.0;
        ellipse(&mut img, x, y, r, r, rgb(30.0, 40.0, 15.0), alpha);
    }
    img
}

/// Tree bark: wavy vertical ridges and a couple of knots
pub fn wood(rng: &mut StdRng) -> RgbaImage {
    let mut img = solid(128, 256, 0x3A2818);

    for _ in 0..35 {
        let x = rng.gen::<f32>() * 128.0;
        let brightness = 35.0 + rng.gen::<f32>() * 35.0;
        let color = rgb(brightness + 15.0, brightness, brightness - 10.0);
        let width = 1.0 + rng.gen::<f32>() * 4.0;

        let mut at = (x, 0.0);
        for y in (8..256).step_by(8) {
            let next = (x + (rng.gen::<f32>() - 0.5) * 6.0, y as f32);
            stroke(&mut img, at, next, width, color, 1.0);
            at = next;
        }
    }
    for _ in 0..2 {
        let (x, y) = (rng.gen::<f32>() * 128.0, rng.gen::<f32>() * 256.0);
        ellipse(&mut img, x, y, 4.0, 7.0, rgb(25.0, 15.0, 8.0), 0.7);
    }
    img
}

/// Tangent-space normal map from summed sinusoid octaves.
///
/// Each octave gets a random phase offset so the two water maps never line
/// up. Red and green carry the slope, blue is always 255.
pub fn water_normal_map(size: u32, octaves: &[NormalOctave], rng: &mut StdRng) -> RgbaImage {
    let offsets: Vec<(f32, f32)> = octaves
        .iter()
        .map(|_| (rng.gen::<f32>() * 1000.0, rng.gen::<f32>() * 1000.0))
        .collect();

    let mut img = RgbaImage::new(size, size);
    let row_bytes = size as usize * 4;
    img.par_chunks_mut(row_bytes).enumerate().for_each(|(y, row)| {
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let (nx, ny) = octaves.iter().zip(&offsets).fold((0.0, 0.0), |(nx, ny), (oct, &(ox, oy))| {
                let sx = (x as f32 + ox) * oct.frequency / size as f32;
                let sy = (y as f32 + oy) * oct.frequency / size as f32;
                let dx = (sx * TAU + sy * PI).sin() * 0.5
                    + (sx * PI * 1.7 - sy * TAU * 0.8).sin() * 0.3
                    + (sx * TAU * 2.3 + sy * TAU * 1.1).cos() * 0.2;
                let dy = (sy * TAU + sx * PI * 0.9).cos() * 0.5
                    + (sy * PI * 1.4 - sx * TAU * 1.2).cos() * 0.3
                    + (sy * TAU * 1.8 + sx * TAU * 0.7).sin() * 0.2;
                (nx + dx * oct.amplitude, ny + dy * oct.amplitude)
            });
            px[0] = (128.0 + nx * 127.0).clamp(0.0, 255.0) as u8;
            px[1] = (128.0 + ny * 127.0).clamp(0.0, 255.0) as u8;
            px[2] = 255;
            px[3] = 255;
        }
    });
    img
}
