//! Scalar field synthesis.
//!
//! The default generator stamps randomly placed circular bumps whose contribution
//! falls off linearly with squared distance, producing smooth blob-like masses. Two
//! alternates are available: hard-edged flat bumps and a one-pass diffusion of
//! uniform random deltas.

use rand::Rng;
use serde::Deserialize;

use crate::{config::GeneratorConfig, grid::FieldGrid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorMode {
    #[default]
    FalloffBumps,
    FlatBumps,
    Diffusion,
}

/// Denominator of the linear falloff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FalloffEnvelope {
    /// `(radius + 1)²`: the outermost ring of the disc keeps a positive share.
    #[default]
    Padded,
    /// `radius²`: contribution reaches zero on the rim.
    Radius,
}

impl FalloffEnvelope {
    #[inline]
    fn squared(self, radius: i64) -> u64 {
        let extent = match self {
            FalloffEnvelope::Padded => radius + 1,
            FalloffEnvelope::Radius => radius,
        };
        (extent * extent) as u64
    }
}

/// How a bump's contribution varies across its disc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Falloff {
    Flat,
    Linear(FalloffEnvelope),
}

#[derive(Debug, Clone)]
pub struct FieldGenerator {
    mode: GeneratorMode,
    min_bumps: u32,
    max_bumps: u32,
    min_radius: u32,
    max_radius: u32,
    bump_amount: u32,
    envelope: FalloffEnvelope,
    value_range: u32,
}

impl FieldGenerator {
    pub fn new(config: &GeneratorConfig, value_range: u32) -> Self {
        Self {
            mode: config.mode,
            min_bumps: config.min_bumps.min(config.max_bumps),
            max_bumps: config.max_bumps,
            min_radius: config.min_radius.min(config.max_radius),
            max_radius: config.max_radius,
            bump_amount: config.bump_amount,
            envelope: config.envelope,
            value_range: value_range.max(1),
        }
    }

    pub fn mode(&self) -> GeneratorMode {
        self.mode
    }

    pub fn value_range(&self) -> u32 {
        self.value_range
    }

    /// Repopulate `grid` in place. Output depends only on the rng stream and the
    /// grid dimensions.
    pub fn generate<R: Rng + ?Sized>(&self, grid: &mut FieldGrid, rng: &mut R) {
        grid.clear();
        if grid.is_empty() {
            return;
        }

        match self.mode {
            GeneratorMode::FalloffBumps => {
                self.stamp_random_bumps(grid, rng, Falloff::Linear(self.envelope))
            }
            GeneratorMode::FlatBumps => self.stamp_random_bumps(grid, rng, Falloff::Flat),
            GeneratorMode::Diffusion => diffuse(grid, rng, self.value_range),
        }

        clamp_values(grid, self.value_range);
    }

    fn stamp_random_bumps<R: Rng + ?Sized>(
        &self,
        grid: &mut FieldGrid,
        rng: &mut R,
        falloff: Falloff,
    ) {
        let count = rng.gen_range(self.min_bumps..=self.max_bumps);
        for _ in 0..count {
            let center = rng.gen_range(0..grid.len());
            let (cx, cy) = grid.coords(center);
            let radius = rng.gen_range(self.min_radius..=self.max_radius);
            stamp_bump(
                grid,
                cx as i64,
                cy as i64,
                radius,
                self.bump_amount,
                falloff,
            );
        }

        tracing::trace!(
            target: "terrain::fieldgen",
            bumps = count,
            ?falloff,
            "field.bumps_stamped"
        );
    }
}

/// Add one bump centred on `(cx, cy)` to every in-bounds cell of its disc.
///
/// With [`Falloff::Linear`] a cell at squared distance `d²` receives
/// `amount * (E - d²) / E`, `E` taken from the [`FalloffEnvelope`]. The centre always
/// gets the full amount. Values accumulate with saturation and are not clamped here.
pub fn stamp_bump(
    grid: &mut FieldGrid,
    cx: i64,
    cy: i64,
    radius: u32,
    amount: u32,
    falloff: Falloff,
) {
    let r = radius as i64;
    let r_sq = r * r;

    for dy in -r..=r {
        for dx in -r..=r {
            let d_sq = dx * dx + dy * dy;
            if d_sq > r_sq {
                continue;
            }
            let Some(cell) = grid.get_mut(cx + dx, cy + dy) else {
                continue;
            };
            let contribution = match falloff {
                Falloff::Flat => amount,
                Falloff::Linear(envelope) => {
                    let e = envelope.squared(r);
                    if e == 0 {
                        amount
                    } else {
                        (amount as u64 * (e - d_sq as u64) / e) as u32
                    }
                }
            };
            cell.value = cell.value.saturating_add(contribution);
        }
    }
}

/// Saturate every value to `value_range - 1`.
pub fn clamp_values(grid: &mut FieldGrid, value_range: u32) {
    let max = value_range.saturating_sub(1);
    for cell in grid.cells_mut() {
        cell.value = cell.value.min(max);
    }
}

/// Assign uniform random deltas in `[-range/2, range/2)`, then replace each delta by
/// the truncated mean of itself and its in-bounds 8-connected neighbours.
///
/// The mean reads the unsmoothed deltas, so the result does not depend on visit order.
pub fn diffuse<R: Rng + ?Sized>(grid: &mut FieldGrid, rng: &mut R, value_range: u32) {
    let half = (value_range / 2).max(1) as i32;
    for cell in grid.cells_mut() {
        cell.delta = rng.gen_range(-half..half);
    }

    let raw: Vec<i32> = grid.cells().iter().map(|cell| cell.delta).collect();
    for idx in 0..raw.len() {
        let (x, y) = grid.coords(idx);
        let (sum, count) = grid
            .neighbours(x, y)
            .fold((raw[idx] as i64, 1i64), |(sum, count), n| {
                (sum + raw[n] as i64, count + 1)
            });
        let smoothed = (sum / count) as i32;

        let cell = &mut grid.cells_mut()[idx];
        cell.delta = smoothed;
        cell.value = (smoothed as i64 + half as i64).clamp(0, u32::MAX as i64) as u32;
    }
}
