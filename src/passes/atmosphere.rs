//! Атмосферный проход
//!
//! За один вызов на ячейку: перенос обоих слоёв, обмен массой по подъёму,
//! релаксация давления, градиентная поправка скорости, трение, тепло,
//! испарение и осадки. Читает только состояние прошлого тика.

use glam::Vec2;

use crate::field::{FieldDecl, Texel};
use crate::fields::{self, channel};
use crate::pipeline::{CellOutput, Kernel, PassInputs};

use super::advection::back_trace;
use super::cloud::precipitation;
use super::exchange::ExchangeWeights;
use super::pressure::{accumulate, apply_gradient, couple_and_decay, divergence, gradient, smooth};
use super::thermal::{evaporation, step_high, step_low};

pub const NAME: &str = "atmosphere";

pub const INPUTS: [FieldDecl<'static>; 6] = [
    fields::VELOCITY_LOW,
    fields::VELOCITY_HIGH,
    fields::STATE_LOW,
    fields::STATE_HIGH,
    fields::MIXING,
    fields::SURFACE,
];

pub const OUTPUTS: [FieldDecl<'static>; 5] = [
    fields::VELOCITY_LOW,
    fields::VELOCITY_HIGH,
    fields::STATE_LOW,
    fields::STATE_HIGH,
    fields::MIXING,
];

const VEL_LOW: usize = 0;
const VEL_HIGH: usize = 1;
const STATE_LOW: usize = 2;
const STATE_HIGH: usize = 3;
const MIXING: usize = 4;
const SURFACE: usize = 5;

pub struct AtmosphereKernel;

fn vec2(t: Texel) -> Vec2 {
    Vec2::new(t[0], t[1])
}

impl Kernel for AtmosphereKernel {
    fn cell(&self, x: usize, y: usize, src: &PassInputs<'_>, out: &mut CellOutput<'_, '_>) {
        let params = src.params;
        let dt = params.dt;
        let atm = &params.atmosphere;

        let vel_low = src.field(VEL_LOW);
        let vel_high = src.field(VEL_HIGH);
        let state_low = src.field(STATE_LOW);
        let state_high = src.field(STATE_HIGH);
        let surface = src.field(SURFACE);

        let uplift = src.field(MIXING).at(x, y)[channel::UPLIFT];
        let weights = ExchangeWeights::new(uplift);

        // перенос: нижний выход берёт оба слоя в точке нижнего следа, верхний в точке верхнего
        let from_low = back_trace(vel_low, x, y, dt);
        let from_high = back_trace(vel_high, x, y, dt);

        let mut v_low = vec2(weights.low(vel_low.sample(from_low), vel_high.sample(from_low)));
        let mut v_high = vec2(weights.high(vel_low.sample(from_high), vel_high.sample(from_high)));
        let mut s_low = weights.low(state_low.sample(from_low), state_high.sample(from_low));
        let mut s_high = weights.high(state_low.sample(from_high), state_high.sample(from_high));

        // давление
        let prev_v_low = vec2(vel_low.at(x, y));
        let div_low = divergence(vel_low, x, y);
        let div_high = divergence(vel_high, x, y);
        let slope = gradient(surface, x, y, channel::ELEVATION);
        let terrain = params.pressure.terrain_coupling * prev_v_low.dot(slope);

        let p = channel::PRESSURE;
        let around = |n: [Texel; 4]| [n[0][p], n[1][p], n[2][p], n[3][p]];
        let p_low = smooth(
            accumulate(s_low[p], div_low, terrain, dt),
            around(state_low.neighbors(x, y)),
        );
        let p_high = smooth(
            accumulate(s_high[p], div_high, 0.0, dt),
            around(state_high.neighbors(x, y)),
        );
        s_low[p] = couple_and_decay(p_low, p_high, &params.pressure);
        s_high[p] = couple_and_decay(p_high, p_low, &params.pressure);
        s_low[channel::DIVERGENCE] = div_low;
        s_high[channel::DIVERGENCE] = div_high;

        // скорость стекает по градиенту сохранённого давления своего слоя
        v_low = apply_gradient(v_low, gradient(state_low, x, y, p), &params.pressure, dt);
        v_high = apply_gradient(v_high, gradient(state_high, x, y, p), &params.pressure, dt);
        v_low *= (1.0 - atm.friction_low * dt).clamp(0.0, 1.0);

        // тепло
        let ground = surface.at(x, y);
        let surface_temperature = ground[channel::SURFACE_TEMPERATURE];
        let t = channel::TEMPERATURE;
        s_low[t] = step_low(s_low[t], surface_temperature, &params.thermal, dt);
        s_high[t] = step_high(s_high[t], &params.thermal, dt);

        // влага: испарение снизу, осадки из обоих слоёв
        let h = channel::HUMIDITY;
        s_low[h] += evaporation(&ground, &params.hydrology, dt);
        let rain_low = precipitation(s_low[h], atm.low_altitude, atm);
        let rain_high = precipitation(s_high[h], atm.high_altitude, atm);
        s_low[h] = (s_low[h] - rain_low).max(0.0);
        s_high[h] = (s_high[h] - rain_high).max(0.0);

        let prev_high_pressure = state_high.at(x, y)[p];
        let prev_low_pressure = state_low.at(x, y)[p];
        let new_uplift = (-atm.uplift_convergence * div_low
            + terrain
            + atm.uplift_pressure * (prev_low_pressure - prev_high_pressure))
            .clamp(-1.0, 1.0);

        out.set(VEL_LOW, [v_low.x, v_low.y, 0.0, 0.0]);
        out.set(VEL_HIGH, [v_high.x, v_high.y, 0.0, 0.0]);
        out.set(STATE_LOW, s_low);
        out.set(STATE_HIGH, s_high);
        out.set(MIXING, [new_uplift, rain_low, rain_high, 0.0]);
    }
}
