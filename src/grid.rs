//! Расчётная сетка и адресация ячеек
//!
//! Сетка задаёт размер всех полей. Координаты ячеек целые, `(x, y)`, ось `y`
//! направлена «на север». Центры ячеек лежат в целых точках, поэтому
//! непрерывная позиция `Vec2::new(3.0, 5.0)` совпадает с ячейкой `(3, 5)`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Поведение выборки за пределами сетки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EdgeMode {
    /// Тайлящийся домен: поток, ушедший за край, возвращается с противоположной стороны
    #[default]
    Wrap,
    /// Значение на границе повторяется
    Clamp,
}

/// Двумерная решётка фиксированного размера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
}

/// Позиция в нормализованных координатах сетки `[0, 1]²`
///
/// В этих координатах хост передаёт курсор: одно преобразование экран → сетка
/// на тик, общее для всех проходов.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GridUv(pub Vec2);

impl Grid {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 || width.checked_mul(height).is_none() {
            return Err(SimError::InvalidGrid { width, height });
        }
        Ok(Self { width, height })
    }

    #[must_use]
    pub fn cells(&self) -> usize {
        self.width * self.height
    }

    #[must_use]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Приводит произвольные целые координаты к ячейке внутри сетки
    #[must_use]
    pub fn resolve(&self, x: isize, y: isize, edge: EdgeMode) -> (usize, usize) {
        let w = self.width as isize;
        let h = self.height as isize;
        match edge {
            EdgeMode::Wrap => (x.rem_euclid(w) as usize, y.rem_euclid(h) as usize),
            EdgeMode::Clamp => (x.clamp(0, w - 1) as usize, y.clamp(0, h - 1) as usize),
        }
    }

    #[must_use]
    pub fn uv_to_cell(&self, uv: GridUv) -> Vec2 {
        uv.0 * self.size()
    }

    #[must_use]
    pub fn cell_to_uv(&self, cell: Vec2) -> GridUv {
        GridUv(cell / self.size())
    }

    /// Смещение `to - from` в ячейках; для `Wrap` берётся кратчайший путь через край
    #[must_use]
    pub fn delta(&self, from: Vec2, to: Vec2, edge: EdgeMode) -> Vec2 {
        let d = to - from;
        match edge {
            EdgeMode::Clamp => d,
            EdgeMode::Wrap => {
                let size = self.size();
                d - size * (d / size).round()
            }
        }
    }
}
