//! Полулагранжев перенос
//!
//! Значение в ячейке берётся из точки, откуда его принёс ветер за `dt`.
//! Схема безусловно устойчива; при `dt = 0` перенос тождественный.

use glam::Vec2;

use crate::field::{FieldView, Texel};

/// Средняя скорость по ячейке и четырём соседям
#[must_use]
pub fn average_velocity(velocity: &FieldView<'_>, x: usize, y: usize) -> Vec2 {
    let c = velocity.at(x, y);
    let mut sum = Vec2::new(c[0], c[1]);
    for n in velocity.neighbors(x, y) {
        sum += Vec2::new(n[0], n[1]);
    }
    sum / 5.0
}

/// Точка, из которой приходит вещество в ячейку `(x, y)`
///
/// При нечисловой скорости вещество остаётся на месте.
#[must_use]
pub fn back_trace(velocity: &FieldView<'_>, x: usize, y: usize, dt: f32) -> Vec2 {
    let cell = Vec2::new(x as f32, y as f32);
    let from = cell - dt * average_velocity(velocity, x, y);
    if from.is_finite() { from } else { cell }
}

#[must_use]
pub fn advect(
    field: &FieldView<'_>,
    velocity: &FieldView<'_>,
    x: usize,
    y: usize,
    dt: f32,
) -> Texel {
    field.sample(back_trace(velocity, x, y, dt))
}
