//! Тепловая модель из трёх узлов: поверхность, нижний и верхний воздух
//!
//! Явный шаг Эйлера раз в тик. Множитель `dt / τ` ограничен единицей, чтобы
//! узел не перескакивал через равновесие.

use glam::Vec3;

use crate::config::{HydrologyParams, ThermalParams};
use crate::field::Texel;
use crate::fields::channel;

fn factor(dt: f32, time_constant: f32) -> f32 {
    (dt / time_constant).clamp(0.0, 1.0)
}

/// Поток тепла от поверхности в нижний воздух
#[must_use]
pub fn surface_air_flux(surface: f32, low: f32, params: &ThermalParams) -> f32 {
    params.convection * (surface - low)
}

/// Солнечная энергия, дошедшая до поверхности
#[must_use]
pub fn insolation(sun: Vec3, transmittance: f32, lit: f32, params: &ThermalParams) -> f32 {
    params.solar_constant * sun.z.max(0.0) * transmittance * lit
}

#[must_use]
pub fn step_surface(
    surface: f32,
    low: f32,
    insolation: f32,
    params: &ThermalParams,
    dt: f32,
) -> f32 {
    let rate = params.solar_gain * insolation
        - params.surface_radiation * surface
        - surface_air_flux(surface, low, params);
    surface + factor(dt, params.surface_time_constant) * rate
}

#[must_use]
pub fn step_low(low: f32, surface: f32, params: &ThermalParams, dt: f32) -> f32 {
    low + factor(dt, params.low_time_constant) * surface_air_flux(surface, low, params)
}

#[must_use]
pub fn step_high(high: f32, params: &ThermalParams, dt: f32) -> f32 {
    high - factor(dt, params.high_time_constant) * params.high_radiation * high
}

/// Вода, испаряющаяся с поверхности за тик
///
/// Считается по значению ячейки на прошлом тике: проход поверхности вычитает
/// её из воды, атмосферный проход добавляет к влажности нижнего слоя.
#[must_use]
pub fn evaporation(surface: &Texel, params: &HydrologyParams, dt: f32) -> f32 {
    let water = surface[channel::WATER].max(0.0);
    let warmth = surface[channel::SURFACE_TEMPERATURE].max(0.0);
    (params.evaporation_rate * warmth * water * dt).min(0.5 * water)
}
