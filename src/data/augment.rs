// ============================================================
// Layer 4 — Image Augmentor
// ============================================================
// Seeded random geometry applied to a whole batch of raw 8-bit
// images. Each image independently goes through:
//
//   1. vertical flip      with probability 0.25
//   2. horizontal flip    with probability 0.25
//   3. affine warp        scale     ∈ [0.8, 1.2]
//                         translate ∈ [-20%, 20%] of each extent
//                         rotate    ∈ [-45°, 45°]
//
// The warp is about the image centre, sampled bilinearly from
// the source, with zero fill outside it.
//
// A fresh StdRng is seeded from `seed` on every call, so the
// same seed and input batch always produce the same output.
// The output replaces the input pool; callers do not append it.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::domain::sample::ImageShape;
use crate::domain::traits::ImageAugment;

#[derive(Debug, Clone, PartialEq)]
pub struct AugmentConfig {
    pub vertical_flip_p:   f64,
    pub horizontal_flip_p: f64,
    pub scale:             (f64, f64),
    pub translate:         (f64, f64),
    pub rotate_degrees:    (f64, f64),
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            vertical_flip_p:   0.25,
            horizontal_flip_p: 0.25,
            scale:             (0.8, 1.2),
            translate:         (-0.2, 0.2),
            rotate_degrees:    (-45.0, 45.0),
        }
    }
}

/// Parameters drawn for one image.
#[derive(Debug, Clone, Copy)]
struct Draw {
    flip_v:  bool,
    flip_h:  bool,
    scale:   f64,
    shift_x: f64,
    shift_y: f64,
    /// Radians.
    rotate:  f64,
}

#[derive(Debug, Clone)]
pub struct Augmentor {
    config: AugmentConfig,
    seed:   u64,
}

impl Augmentor {
    pub fn new(seed: u64) -> Self {
        Self::with_config(AugmentConfig::default(), seed)
    }

    pub fn with_config(config: AugmentConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    fn draw(&self, rng: &mut StdRng, shape: ImageShape) -> Draw {
        let c = &self.config;
        Draw {
            flip_v:  rng.gen_bool(c.vertical_flip_p),
            flip_h:  rng.gen_bool(c.horizontal_flip_p),
            scale:   rng.gen_range(c.scale.0..=c.scale.1),
            shift_x: rng.gen_range(c.translate.0..=c.translate.1) * shape.width as f64,
            shift_y: rng.gen_range(c.translate.0..=c.translate.1) * shape.height as f64,
            rotate:  rng.gen_range(c.rotate_degrees.0..=c.rotate_degrees.1).to_radians(),
        }
    }
}

impl ImageAugment for Augmentor {
    fn augment(&self, images: &[Vec<u8>], shape: ImageShape) -> Vec<Vec<u8>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        images
            .iter()
            .map(|img| {
                let d = self.draw(&mut rng, shape);
                let mut out = img.clone();
                if d.flip_v {
                    out = flip_vertical(&out, shape);
                }
                if d.flip_h {
                    out = flip_horizontal(&out, shape);
                }
                warp(&out, shape, &d)
            })
            .collect()
    }
}

fn flip_vertical(img: &[u8], shape: ImageShape) -> Vec<u8> {
    let w = shape.width;
    img.chunks(w).rev().flatten().copied().collect()
}

fn flip_horizontal(img: &[u8], shape: ImageShape) -> Vec<u8> {
    let w = shape.width;
    img.chunks(w).flat_map(|row| row.iter().rev().copied()).collect()
}

/// Inverse-map every destination pixel back into the source.
fn warp(img: &[u8], shape: ImageShape, d: &Draw) -> Vec<u8> {
    let (h, w) = (shape.height, shape.width);
    let cx = (w as f64 - 1.0) / 2.0;
    let cy = (h as f64 - 1.0) / 2.0;
    let (sin, cos) = d.rotate.sin_cos();

    let mut out = vec![0u8; h * w];
    for y in 0..h {
        for x in 0..w {
            // undo translation, then rotation, then scale
            let dx = x as f64 - cx - d.shift_x;
            let dy = y as f64 - cy - d.shift_y;
            let sx = (cos * dx + sin * dy) / d.scale + cx;
            let sy = (-sin * dx + cos * dy) / d.scale + cy;
            out[y * w + x] = bilinear(img, shape, sx, sy);
        }
    }
    out
}

fn bilinear(img: &[u8], shape: ImageShape, x: f64, y: f64) -> u8 {
    let (h, w) = (shape.height as isize, shape.width as isize);
    let x0 = x.floor() as isize;
    let y0 = y.floor() as isize;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let at = |xi: isize, yi: isize| -> f64 {
        if xi < 0 || yi < 0 || xi >= w || yi >= h {
            0.0
        } else {
            img[(yi * w + xi) as usize] as f64
        }
    };

    let top    = at(x0, y0) * (1.0 - fx) + at(x0 + 1, y0) * fx;
    let bottom = at(x0, y0 + 1) * (1.0 - fx) + at(x0 + 1, y0 + 1) * fx;
    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(n: usize, shape: ImageShape) -> Vec<Vec<u8>> {
        (0..n)
            .map(|i| (0..shape.pixels()).map(|p| ((p * 7 + i * 13) % 256) as u8).collect())
            .collect()
    }

    #[test]
    fn test_same_seed_same_output() {
        let shape  = ImageShape::new(8, 8);
        let images = batch(6, shape);
        let a = Augmentor::new(42).augment(&images, shape);
        let b = Augmentor::new(42).augment(&images, shape);
        assert_eq!(a, b);
    }

    #[test]
    fn test_shape_preserved() {
        let shape  = ImageShape::new(5, 7);
        let images = batch(4, shape);
        let out = Augmentor::new(1).augment(&images, shape);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|img| img.len() == 35));
    }

    #[test]
    fn test_different_seed_changes_output() {
        let shape  = ImageShape::new(8, 8);
        let images = batch(6, shape);
        let a = Augmentor::new(1).augment(&images, shape);
        let b = Augmentor::new(2).augment(&images, shape);
        assert_ne!(a, b);
    }

    #[test]
    fn test_flips() {
        let shape = ImageShape::new(2, 3);
        let img   = vec![1, 2, 3, 4, 5, 6];
        assert_eq!(flip_vertical(&img, shape), vec![4, 5, 6, 1, 2, 3]);
        assert_eq!(flip_horizontal(&img, shape), vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_identity_warp_is_lossless() {
        let shape = ImageShape::new(4, 4);
        let img: Vec<u8> = (0..16).map(|v| v * 10).collect();
        let d = Draw { flip_v: false, flip_h: false, scale: 1.0, shift_x: 0.0, shift_y: 0.0, rotate: 0.0 };
        assert_eq!(warp(&img, shape, &d), img);
    }

    #[test]
    fn test_drawn_parameters_follow_default_ranges() {
        let shape   = ImageShape::new(32, 20);
        let aug     = Augmentor::new(42);
        let mut rng = StdRng::seed_from_u64(42);
        let n       = 4000;

        let draws: Vec<Draw> = (0..n).map(|_| aug.draw(&mut rng, shape)).collect();

        let rate = |hits: usize| hits as f64 / n as f64;
        let v = rate(draws.iter().filter(|d| d.flip_v).count());
        let h = rate(draws.iter().filter(|d| d.flip_h).count());
        assert!((v - 0.25).abs() < 0.03, "vertical flip rate {v}");
        assert!((h - 0.25).abs() < 0.03, "horizontal flip rate {h}");

        let max_rot = std::f64::consts::FRAC_PI_4;
        for d in &draws {
            assert!((0.8..=1.2).contains(&d.scale), "scale {}", d.scale);
            assert!(d.shift_x.abs() <= 0.2 * 20.0 + 1e-9, "shift_x {}", d.shift_x);
            assert!(d.shift_y.abs() <= 0.2 * 32.0 + 1e-9, "shift_y {}", d.shift_y);
            assert!(d.rotate.abs() <= max_rot + 1e-12, "rotate {}", d.rotate);
        }

        // the ranges are actually used, not collapsed to a point
        assert!(draws.iter().any(|d| d.scale < 0.85) && draws.iter().any(|d| d.scale > 1.15));
        assert!(draws.iter().any(|d| d.shift_y > 0.15 * 32.0) && draws.iter().any(|d| d.shift_y < -0.15 * 32.0));
        assert!(draws.iter().any(|d| d.rotate > 0.6) && draws.iter().any(|d| d.rotate < -0.6));
    }

    #[test]
    fn test_disabled_config_is_identity() {
        let shape = ImageShape::new(6, 6);
        let images = batch(3, shape);
        let config = AugmentConfig {
            vertical_flip_p:   0.0,
            horizontal_flip_p: 0.0,
            scale:             (1.0, 1.0),
            translate:         (0.0, 0.0),
            rotate_degrees:    (0.0, 0.0),
        };
        assert_eq!(Augmentor::with_config(config, 9).augment(&images, shape), images);
    }
}
