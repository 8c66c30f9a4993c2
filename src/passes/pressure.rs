//! Релаксация давления и обратная связь градиента на скорость

use glam::Vec2;

use crate::config::PressureParams;
use crate::field::FieldView;

/// Дивергенция двухканального поля скорости центральными разностями
#[must_use]
pub fn divergence(velocity: &FieldView<'_>, x: usize, y: usize) -> f32 {
    let [n, s, e, w] = velocity.neighbors(x, y);
    0.5 * ((e[0] - w[0]) + (n[1] - s[1]))
}

/// Градиент одного канала центральными разностями
#[must_use]
pub fn gradient(field: &FieldView<'_>, x: usize, y: usize, channel: usize) -> Vec2 {
    let [n, s, e, w] = field.neighbors(x, y);
    0.5 * Vec2::new(e[channel] - w[channel], n[channel] - s[channel])
}

/// Давление после накопления: перенесённое значение минус сходимость потока
/// плюс вклад обтекания рельефа (только для нижнего слоя)
#[must_use]
pub fn accumulate(advected: f32, divergence: f32, terrain: f32, dt: f32) -> f32 {
    advected + dt * (terrain - divergence)
}

/// Пятиточечное сглаживание с давлением соседей на прошлом тике
#[must_use]
pub fn smooth(center: f32, neighbors: [f32; 4]) -> f32 {
    (center + neighbors.iter().sum::<f32>()) / 5.0
}

/// Смешивание слоёв и затухание
#[must_use]
pub fn couple_and_decay(own: f32, other: f32, params: &PressureParams) -> f32 {
    (own + (other - own) * params.vertical_coupling) * params.decay
}

/// Скорость после вычитания градиента давления
#[must_use]
pub fn apply_gradient(velocity: Vec2, gradient: Vec2, params: &PressureParams, dt: f32) -> Vec2 {
    velocity - params.k_pressure * dt * gradient
}
