use std::f32::consts::TAU;

use rand::Rng;

/// Spiral rotation period in seconds.
pub const SPIRAL_PERIOD: f32 = 15.0;

/// CPU-side simulation state of one sprite, in logical px and px/s.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mover {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Mover {
    /// Random position inside `frame` (keeping `size` on screen) and a random
    /// velocity whose components are within `max_speed`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, frame: [f32; 2], size: [f32; 2], max_speed: f32) -> Self {
        let speed = max_speed * rng.gen_range(0.0..=1.0f32);
        Self {
            x: random_in(rng, frame[0] - size[0]),
            y: random_in(rng, frame[1] - size[1]),
            vx: rng.gen_range(-1.0..=1.0f32) * speed,
            vy: rng.gen_range(-1.0..=1.0f32) * speed,
        }
    }

    /// Advances by `dt` seconds and reflects off the frame edges.
    ///
    /// A sprite left outside the frame by a resize is pulled back in first.
    pub fn step(&mut self, dt: f32, frame: [f32; 2], size: [f32; 2]) {
        let max_x = (frame[0] - size[0]).max(0.0);
        let max_y = (frame[1] - size[1]).max(0.0);

        self.x = self.x.min(max_x);
        self.y = self.y.min(max_y);

        self.x += self.vx * dt;
        self.y += self.vy * dt;

        if (self.vx > 0.0 && self.x > max_x) || (self.vx < 0.0 && self.x <= 0.0) {
            self.vx = -self.vx;
        }
        if (self.vy < 0.0 && self.y <= 0.0) || (self.vy > 0.0 && self.y > max_y) {
            self.vy = -self.vy;
        }
    }

    /// Position snapped to whole pixels.
    #[inline]
    pub fn pixel(&self) -> [f32; 2] {
        [self.x.trunc(), self.y.trunc()]
    }
}

fn random_in<R: Rng + ?Sized>(rng: &mut R, extent: f32) -> f32 {
    if extent > 0.0 {
        rng.gen_range(0.0..extent)
    } else {
        0.0
    }
}

/// Position of sprite `i` of `count` on the spiral at `elapsed` seconds.
///
/// Sprite 0 sits at the rim; the last one at the centre.
pub fn spiral_position(i: usize, count: usize, elapsed: f32, frame: [f32; 2], size: [f32; 2]) -> [f32; 2] {
    let half_w = ((frame[0] - size[0]) / 2.0).max(0.0);
    let half_h = ((frame[1] - size[1]) / 2.0).max(0.0);
    if count == 0 {
        return [half_w, half_h];
    }

    let k = count - i - 1;
    let f = k as f32 / count as f32;
    let offset = (elapsed % SPIRAL_PERIOD) / SPIRAL_PERIOD * TAU;
    let angle = offset + k as f32 * (TAU / count as f32);
    let theta = -angle * 8.0 + f * TAU;

    [theta.sin() * f * half_w + half_w, theta.cos() * f * half_h + half_h]
}
