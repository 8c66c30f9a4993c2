//! Проход поверхности: течение воды и льда, эрозия, осадки, нагрев
//!
//! Поток к соседу считается по разности уровней `elevation + water` и
//! ограничен четвертью воды отдающей ячейки. Скорость перетока не превышает
//! 1/4 за тик, поэтому явная схема не поднимает пик выше соседей.

use glam::Vec2;

use crate::config::HydrologyParams;
use crate::field::{FieldDecl, Texel};
use crate::fields::{self, channel};
use crate::pipeline::{CellOutput, Kernel, PassInputs};
use crate::sun::GridPoint;

use super::light::lit_fraction;
use super::thermal::{evaporation, insolation, step_surface};

pub const NAME: &str = "surface";

pub const INPUTS: [FieldDecl<'static>; 4] = [
    fields::SURFACE,
    fields::STATE_LOW,
    fields::MIXING,
    fields::LIGHT,
];

pub const OUTPUTS: [FieldDecl<'static>; 1] = [fields::SURFACE];

const SURFACE: usize = 0;
const STATE_LOW: usize = 1;
const MIXING: usize = 2;
const LIGHT: usize = 3;

/// Направления соседей в порядке [`crate::field::FieldView::neighbors`]
const DIRECTIONS: [Vec2; 4] = [Vec2::Y, Vec2::NEG_Y, Vec2::X, Vec2::NEG_X];

fn level(t: &Texel) -> f32 {
    t[channel::ELEVATION] + t[channel::WATER]
}

fn frozen(t: &Texel, params: &HydrologyParams) -> bool {
    t[channel::SURFACE_TEMPERATURE] < params.freezing_temperature
}

/// Переток из соседа в ячейку (положительный означает приток)
#[must_use]
pub fn exchange_flux(center: &Texel, neighbor: &Texel, params: &HydrologyParams, dt: f32) -> f32 {
    let rate = if frozen(center, params) && frozen(neighbor, params) {
        params.ice_flow_rate
    } else {
        params.water_flow_rate
    };
    let rate = (rate * dt).clamp(0.0, 0.25);
    let w_c = center[channel::WATER].max(0.0);
    let w_n = neighbor[channel::WATER].max(0.0);
    (level(neighbor) - level(center)).clamp(-w_c / 4.0, w_n / 4.0) * rate
}

/// Итог перетоков одной ячейки
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowBalance {
    pub water: f32,
    pub sediment: f32,
    /// Скорость воды в ячейке
    pub velocity: Vec2,
}

#[must_use]
pub fn flow_balance(
    center: &Texel,
    neighbors: &[Texel; 4],
    params: &HydrologyParams,
    dt: f32,
) -> FlowBalance {
    let depth = |t: &Texel| t[channel::WATER].max(params.min_water_depth);
    let mut balance = FlowBalance::default();
    let mut momentum = Vec2::ZERO;
    for (n, dir) in neighbors.iter().zip(DIRECTIONS) {
        let flux = exchange_flux(center, n, params, dt);
        let donor = if flux > 0.0 { n } else { center };
        let concentration = donor[channel::SEDIMENT].max(0.0) / depth(donor);
        balance.water += flux;
        balance.sediment += flux * concentration;
        // приток с севера течёт на юг
        momentum -= dir * flux;
    }
    balance.velocity = momentum / (center[channel::WATER].max(0.0) + params.min_water_depth);
    balance
}

/// Захват осадка водой; отрицательное значение означает отложение
#[must_use]
pub fn sediment_uptake(speed: f32, sediment: f32, params: &HydrologyParams, dt: f32) -> f32 {
    (params.k_uptake * speed * dt).min(params.k_saturation * speed - sediment)
}

pub struct SurfaceKernel;

impl Kernel for SurfaceKernel {
    fn cell(&self, x: usize, y: usize, src: &PassInputs<'_>, out: &mut CellOutput<'_, '_>) {
        let params = src.params;
        let hyd = &params.hydrology;
        let dt = params.dt;

        let surface = src.field(SURFACE);
        let cell = surface.at(x, y);
        let balance = flow_balance(&cell, &surface.neighbors(x, y), hyd, dt);

        let mut sediment = cell[channel::SEDIMENT] + balance.sediment;
        let mut elevation = cell[channel::ELEVATION];
        let uptake = sediment_uptake(balance.velocity.length(), sediment, hyd, dt)
            .clamp(-sediment.max(0.0), elevation.max(0.0));
        sediment += uptake;
        elevation -= uptake;

        let mixing = src.field(MIXING).at(x, y);
        let deposit = mixing[channel::PRECIP_LOW] + mixing[channel::PRECIP_HIGH];
        let mut water = cell[channel::WATER] + balance.water - evaporation(&cell, hyd, dt)
            + hyd.rain * dt
            + deposit;

        let elevation = elevation.max(0.0);
        if let Some(sea) = hyd.sea_level.filter(|&sea| elevation < sea) {
            water = water.max(sea - elevation);
        }

        // освещённость по карте прошлого тика
        let height = level(&cell);
        let lp = src.sun.to_light(GridPoint {
            cell: Vec2::new(x as f32, y as f32),
            altitude: height,
        });
        let light = src.field(LIGHT).sample(lp.texel);
        let lit = lit_fraction(light[channel::SURFACE_DEPTH], lp.depth, params.light.shadow_bias);
        let sun = insolation(
            src.sun.direction(),
            light[channel::TRANSMITTANCE],
            lit,
            &params.thermal,
        );
        let low_temperature = src.field(STATE_LOW).at(x, y)[channel::TEMPERATURE];
        let temperature = step_surface(
            cell[channel::SURFACE_TEMPERATURE],
            low_temperature,
            sun,
            &params.thermal,
            dt,
        );

        let mut next = [0.0; 4];
        next[channel::SEDIMENT] = sediment.max(0.0);
        next[channel::SURFACE_TEMPERATURE] = temperature;
        next[channel::ELEVATION] = elevation;
        next[channel::WATER] = water.max(0.0);
        out.set(0, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texel(elevation: f32, water: f32) -> Texel {
        let mut t = [0.0; 4];
        t[channel::ELEVATION] = elevation;
        t[channel::WATER] = water;
        t[channel::SURFACE_TEMPERATURE] = 1.0;
        t
    }

    #[test]
    fn flux_is_antisymmetric() {
        let params = HydrologyParams::default();
        let a = texel(1.0, 0.4);
        let b = texel(0.2, 0.1);
        let ab = exchange_flux(&a, &b, &params, 1.0);
        let ba = exchange_flux(&b, &a, &params, 1.0);
        assert!(ab < 0.0);
        assert!((ab + ba).abs() < 1e-7);
    }

    #[test]
    fn dry_cell_cannot_lose_water() {
        let params = HydrologyParams::default();
        let high = texel(2.0, 0.0);
        let low = texel(0.0, 0.0);
        assert_eq!(exchange_flux(&high, &low, &params, 1.0), 0.0);
    }

    #[test]
    fn frozen_cells_flow_slowly() {
        let params = HydrologyParams::default();
        let mut a = texel(1.0, 1.0);
        let mut b = texel(0.0, 1.0);
        let liquid = exchange_flux(&a, &b, &params, 1.0).abs();
        a[channel::SURFACE_TEMPERATURE] = -1.0;
        b[channel::SURFACE_TEMPERATURE] = -1.0;
        let ice = exchange_flux(&a, &b, &params, 1.0).abs();
        assert!(ice < liquid);
    }

    #[test]
    fn outflow_points_velocity_downhill() {
        let params = HydrologyParams::default();
        let center = texel(1.0, 1.0);
        let flat = texel(1.0, 1.0);
        let east = texel(0.0, 0.0);
        let balance = flow_balance(&center, &[flat, flat, east, flat], &params, 1.0);
        assert!(balance.water < 0.0);
        assert!(balance.velocity.x > 0.0);
        assert!(balance.velocity.y.abs() < 1e-7);
    }

    #[test]
    fn saturated_water_deposits() {
        let params = HydrologyParams::default();
        assert!(sediment_uptake(1.0, 1.0, &params, 1.0) < 0.0);
        assert!(sediment_uptake(1.0, 0.0, &params, 1.0) > 0.0);
        assert_eq!(sediment_uptake(0.0, 0.0, &params, 1.0), 0.0);
    }
}
