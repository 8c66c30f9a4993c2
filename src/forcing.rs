//! Внешние воздействия (курсор, кисть)
//!
//! Хост один раз за тик переводит положение курсора в координаты сетки и
//! собирает [`Forcing`]. Режим кисти разбирается один раз на тик в
//! [`ForcingFrame`]: для каждого затрагиваемого поля получается [`Brush`],
//! который планировщик накладывает на выход прохода внутри диска. Ядра
//! проходов о кисти не знают.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::field::{FieldId, FieldStore};
use crate::fields::{self, channel};
use crate::grid::{EdgeMode, Grid, GridUv};

/// Инструмент, выбранный пользователем
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Tool {
    #[default]
    VelocityAll,
    VelocityLow,
    VelocityHigh,
    Elevation,
    Precipitation,
}

impl Tool {
    #[must_use]
    pub fn mode(self, velocity: Vec2) -> ForcingMode {
        match self {
            Tool::VelocityAll => ForcingMode::VelocityAll { velocity },
            Tool::VelocityLow => ForcingMode::VelocityLow { velocity },
            Tool::VelocityHigh => ForcingMode::VelocityHigh { velocity },
            Tool::Elevation => ForcingMode::Elevation,
            Tool::Precipitation => ForcingMode::Precipitation,
        }
    }
}

/// Режим кисти вместе с целевым значением
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForcingMode {
    /// Задать ветер на обеих высотах
    VelocityAll { velocity: Vec2 },
    VelocityLow { velocity: Vec2 },
    VelocityHigh { velocity: Vec2 },
    /// Поднять рельеф на `strength` в центре
    Elevation,
    /// Добавить `strength` воды в центре
    Precipitation,
}

/// Воздействие на один тик; не сохраняется между тиками
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forcing {
    pub position: GridUv,
    /// Радиус диска в долях ширины сетки
    pub radius: f32,
    pub strength: f32,
    pub mode: ForcingMode,
    pub active: bool,
}

impl Forcing {
    #[must_use]
    pub fn inactive() -> Self {
        Self {
            position: GridUv::default(),
            radius: 0.0,
            strength: 0.0,
            mode: ForcingMode::VelocityAll {
                velocity: Vec2::ZERO,
            },
            active: false,
        }
    }
}

impl Default for Forcing {
    fn default() -> Self {
        Self::inactive()
    }
}

/// Сглаженный край диска: 1 в центре, 0 на границе и снаружи
#[must_use]
pub fn feather(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 || distance >= radius {
        return 0.0;
    }
    let x = distance / radius;
    1.0 - x * x * (3.0 - 2.0 * x)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrushOp {
    /// Смешать каналы скорости с целевым вектором
    Blend { target: Vec2 },
    /// Прибавить величину к одному каналу
    Add { channel: usize, amount: f32 },
}

/// Разрешённое воздействие на одно поле
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    grid: Grid,
    edge: EdgeMode,
    center: Vec2,
    radius: f32,
    op: BrushOp,
}

impl Brush {
    #[must_use]
    pub fn weight(&self, x: usize, y: usize) -> f32 {
        let cell = Vec2::new(x as f32, y as f32);
        let d = self.grid.delta(self.center, cell, self.edge);
        feather(d.length(), self.radius)
    }

    /// Накладывает кисть на уже вычисленное значение ячейки
    pub fn apply(&self, x: usize, y: usize, texel: &mut [f32]) {
        let w = self.weight(x, y);
        if w <= 0.0 {
            return;
        }
        match self.op {
            BrushOp::Blend { target } => {
                texel[0] += (target.x - texel[0]) * w;
                texel[1] += (target.y - texel[1]) * w;
            }
            BrushOp::Add { channel, amount } => {
                texel[channel] += amount * w;
            }
        }
    }
}

/// Воздействия текущего тика, привязанные к полям
#[derive(Debug, Clone, Default)]
pub struct ForcingFrame {
    overrides: Vec<(FieldId, Brush)>,
}

impl ForcingFrame {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Разбирает режим кисти один раз за тик
    #[must_use]
    pub fn resolve(forcing: &Forcing, store: &FieldStore) -> Self {
        if !forcing.active {
            return Self::none();
        }

        let targets: Vec<(&str, BrushOp)> = match forcing.mode {
            ForcingMode::VelocityAll { velocity } => {
                let target = velocity * forcing.strength;
                vec![
                    (fields::VELOCITY_LOW.name, BrushOp::Blend { target }),
                    (fields::VELOCITY_HIGH.name, BrushOp::Blend { target }),
                ]
            }
            ForcingMode::VelocityLow { velocity } => vec![(
                fields::VELOCITY_LOW.name,
                BrushOp::Blend {
                    target: velocity * forcing.strength,
                },
            )],
            ForcingMode::VelocityHigh { velocity } => vec![(
                fields::VELOCITY_HIGH.name,
                BrushOp::Blend {
                    target: velocity * forcing.strength,
                },
            )],
            ForcingMode::Elevation => vec![(
                fields::SURFACE.name,
                BrushOp::Add {
                    channel: channel::ELEVATION,
                    amount: forcing.strength,
                },
            )],
            ForcingMode::Precipitation => vec![(
                fields::SURFACE.name,
                BrushOp::Add {
                    channel: channel::WATER,
                    amount: forcing.strength,
                },
            )],
        };

        let grid = store.grid();
        let center = grid.uv_to_cell(forcing.position);
        let radius = forcing.radius * grid.width as f32;

        let overrides = targets
            .into_iter()
            .filter_map(|(name, op)| {
                let Some(id) = store.id(name) else {
                    log::debug!("forcing target '{name}' is not allocated, skipped");
                    return None;
                };
                let brush = Brush {
                    grid,
                    edge: store.field(id).edge(),
                    center,
                    radius,
                    op,
                };
                Some((id, brush))
            })
            .collect();
        Self { overrides }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Кисти для выходов одного прохода: `(номер выхода, кисть)`
    pub(crate) fn for_outputs(&self, outputs: &[FieldId]) -> Vec<(usize, Brush)> {
        self.overrides
            .iter()
            .filter_map(|(id, brush)| {
                outputs
                    .iter()
                    .position(|out| out == id)
                    .map(|slot| (slot, *brush))
            })
            .collect()
    }
}

/// Размер области вывода в пикселях
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// Экранные координаты (y вниз) в координаты сетки (y вверх)
    #[must_use]
    pub fn to_grid_uv(&self, px: f32, py: f32) -> GridUv {
        GridUv(Vec2::new(px / self.width, 1.0 - py / self.height))
    }
}

/// Состояние указателя, снятое без блокировки в начале тика
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
    pub pressed: bool,
}

/// Переводит движения указателя в воздействие на тик
#[derive(Debug, Clone)]
pub struct CursorTracker {
    last: Option<GridUv>,
    /// Множитель скорости перетаскивания (ячеек за тик на единицу смещения)
    pub drag: f32,
    pub tool: Tool,
    pub radius: f32,
    pub strength: f32,
}

impl Default for CursorTracker {
    fn default() -> Self {
        Self {
            last: None,
            drag: 100.0,
            tool: Tool::VelocityAll,
            radius: 0.05,
            strength: 1.0,
        }
    }
}

impl CursorTracker {
    pub fn update(&mut self, viewport: Viewport, pointer: PointerState) -> Forcing {
        let position = viewport.to_grid_uv(pointer.x, pointer.y);
        let velocity = self
            .last
            .map_or(Vec2::ZERO, |last| (position.0 - last.0) * self.drag);
        self.last = Some(position);

        Forcing {
            position,
            radius: self.radius,
            strength: self.strength,
            mode: self.tool.mode(velocity),
            active: pointer.pressed,
        }
    }
}
