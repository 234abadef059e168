// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Navier-Stokes guided inpainting over a fast-marching front
//!
//! Masked pixels are filled in order of their distance to the mask boundary.
//! Each new pixel is a weighted average of already-known pixels within the
//! radius; pixels whose isophote (the gradient rotated by 90 degrees) points
//! at the target contribute the most, so edges are continued into the hole.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Arrival time of pixels the front has not reached yet
const UNREACHED: f32 = 1.0e6;

/// Floor for the direction term, keeps flat regions averaging by distance
const MIN_DIRECTION: f64 = 1.0e-6;

/// Keeps the weighted average defined when every weight underflows
const WEIGHT_EPSILON: f64 = 1.0e-20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    /// Outside the mask or already filled and finalized
    Known,
    /// On the advancing front, has a value, waiting to be finalized
    Band,
    /// Masked and not yet reached
    Inside,
}

/// Front entry ordered so that `BinaryHeap` pops the smallest time first
#[derive(Debug, Clone, Copy)]
struct FrontPixel {
    time: f32,
    index: usize,
}

impl PartialEq for FrontPixel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontPixel {}

impl PartialOrd for FrontPixel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontPixel {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Interleaved 8-bit pixel grid being inpainted in place
pub struct FastMarchingInpainter {
    width: usize,
    height: usize,
    channels: usize,
    radius: i64,
    values: Vec<f32>,
    flags: Vec<Flag>,
    times: Vec<f32>,
}

impl FastMarchingInpainter {
    /// `pixels` is row-major interleaved, `mask` holds one byte per pixel and
    /// any non-zero byte marks the pixel for reconstruction.
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        pixels: &[u8],
        mask: &[u8],
        radius: u32,
    ) -> Self {
        debug_assert_eq!(pixels.len(), width * height * channels);
        debug_assert_eq!(mask.len(), width * height);

        let flags: Vec<Flag> = mask
            .iter()
            .map(|&m| if m != 0 { Flag::Inside } else { Flag::Known })
            .collect();
        let times = flags
            .iter()
            .map(|f| if *f == Flag::Inside { UNREACHED } else { 0.0 })
            .collect();

        Self {
            width,
            height,
            channels,
            radius: radius.max(1) as i64,
            values: pixels.iter().map(|&p| p as f32).collect(),
            flags,
            times,
        }
    }

    /// Fill every masked pixel and return the interleaved result
    pub fn run(mut self) -> Vec<u8> {
        let mut front = self.initial_front();

        while let Some(FrontPixel { index, .. }) = front.pop() {
            if self.flags[index] == Flag::Known {
                continue;
            }
            self.flags[index] = Flag::Known;

            let (x, y) = self.coords(index);
            for (nx, ny) in self.neighbors4(x, y) {
                let n = self.index(nx, ny);
                if self.flags[n] != Flag::Inside {
                    continue;
                }

                let time = self.arrival_time(nx, ny);
                self.times[n] = time;
                self.fill_pixel(nx, ny);
                self.flags[n] = Flag::Band;
                front.push(FrontPixel { time, index: n });
            }
        }

        self.values
            .iter()
            .map(|v| v.round().clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Unmasked pixels 4-adjacent to the mask, all at time zero
    fn initial_front(&mut self) -> BinaryHeap<FrontPixel> {
        let mut front = BinaryHeap::new();

        for y in 0..self.height {
            for x in 0..self.width {
                let index = self.index(x, y);
                if self.flags[index] != Flag::Inside {
                    continue;
                }
                for (nx, ny) in self.neighbors4(x, y) {
                    let n = self.index(nx, ny);
                    if self.flags[n] == Flag::Known {
                        self.flags[n] = Flag::Band;
                        front.push(FrontPixel { time: 0.0, index: n });
                    }
                }
            }
        }

        front
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    fn neighbors4(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> {
        let (w, h) = (self.width as i64, self.height as i64);
        let (x, y) = (x as i64, y as i64);
        [(x, y - 1), (x - 1, y), (x + 1, y), (x, y + 1)]
            .into_iter()
            .filter(move |&(nx, ny)| nx >= 0 && ny >= 0 && nx < w && ny < h)
            .map(|(nx, ny)| (nx as usize, ny as usize))
    }

    /// Known-or-band test with out-of-range coordinates treated as unknown
    fn has_value(&self, x: i64, y: i64) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && self.flags[self.index(x as usize, y as usize)] != Flag::Inside
    }

    fn time_at(&self, x: i64, y: i64) -> f32 {
        self.times[self.index(x as usize, y as usize)]
    }

    /// Smallest eikonal solution over the four quadrant neighbor pairs
    fn arrival_time(&self, x: usize, y: usize) -> f32 {
        let (x, y) = (x as i64, y as i64);
        [
            self.solve((x, y - 1), (x - 1, y)),
            self.solve((x, y + 1), (x - 1, y)),
            self.solve((x, y - 1), (x + 1, y)),
            self.solve((x, y + 1), (x + 1, y)),
        ]
        .into_iter()
        .fold(UNREACHED, f32::min)
    }

    fn solve(&self, a: (i64, i64), b: (i64, i64)) -> f32 {
        match (self.has_value(a.0, a.1), self.has_value(b.0, b.1)) {
            (true, true) => {
                let ta = self.time_at(a.0, a.1);
                let tb = self.time_at(b.0, b.1);
                if (ta - tb).abs() >= 1.0 {
                    return 1.0 + ta.min(tb);
                }
                let r = (2.0 - (ta - tb) * (ta - tb)).sqrt();
                let s = (ta + tb - r) / 2.0;
                if s >= ta && s >= tb {
                    s
                } else {
                    let s = s + r;
                    if s >= ta && s >= tb {
                        s
                    } else {
                        UNREACHED
                    }
                }
            }
            (true, false) => 1.0 + self.time_at(a.0, a.1),
            (false, true) => 1.0 + self.time_at(b.0, b.1),
            (false, false) => UNREACHED,
        }
    }

    /// Central difference where both sides are known, one-sided otherwise
    fn gradient(&self, x: i64, y: i64, channel: usize) -> (f64, f64) {
        let value = |px: i64, py: i64| self.value(px as usize, py as usize, channel) as f64;

        let gx = match (self.has_value(x + 1, y), self.has_value(x - 1, y)) {
            (true, true) => (value(x + 1, y) - value(x - 1, y)) / 2.0,
            (true, false) => value(x + 1, y) - value(x, y),
            (false, true) => value(x, y) - value(x - 1, y),
            (false, false) => 0.0,
        };
        let gy = match (self.has_value(x, y + 1), self.has_value(x, y - 1)) {
            (true, true) => (value(x, y + 1) - value(x, y - 1)) / 2.0,
            (true, false) => value(x, y + 1) - value(x, y),
            (false, true) => value(x, y) - value(x, y - 1),
            (false, false) => 0.0,
        };

        (gx, gy)
    }

    fn value(&self, x: usize, y: usize, channel: usize) -> f32 {
        self.values[(y * self.width + x) * self.channels + channel]
    }

    fn fill_pixel(&mut self, x: usize, y: usize) {
        let (xi, yi) = (x as i64, y as i64);
        let radius_sq = self.radius * self.radius;

        for channel in 0..self.channels {
            let mut weighted_sum = 0.0f64;
            let mut weight_total = WEIGHT_EPSILON;

            for ny in (yi - self.radius)..=(yi + self.radius) {
                for nx in (xi - self.radius)..=(xi + self.radius) {
                    if !self.has_value(nx, ny) {
                        continue;
                    }
                    let (rx, ry) = ((xi - nx) as f64, (yi - ny) as f64);
                    let dist_sq = rx * rx + ry * ry;
                    if dist_sq == 0.0 || dist_sq > radius_sq as f64 {
                        continue;
                    }

                    let (gx, gy) = self.gradient(nx, ny, channel);
                    // isophote: gradient rotated by 90 degrees
                    let (ix, iy) = (-gy, gx);
                    let iso_sq = ix * ix + iy * iy;
                    let direction = if iso_sq > 0.0 {
                        ((rx * ix + ry * iy).abs() / (dist_sq * iso_sq).sqrt()).max(MIN_DIRECTION)
                    } else {
                        MIN_DIRECTION
                    };

                    let weight = direction / (dist_sq * dist_sq.sqrt());
                    weighted_sum += weight * self.value(nx as usize, ny as usize, channel) as f64;
                    weight_total += weight;
                }
            }

            let estimate = (weighted_sum / weight_total) as f32;
            self.values[(y * self.width + x) * self.channels + channel] = estimate;
        }
    }
}
