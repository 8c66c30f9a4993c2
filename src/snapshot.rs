//! Диагностические снимки полей в PNG
//!
//! Каждый режим раскрашивает одно поле. Ось `y` сетки направлена вверх,
//! поэтому строки изображения идут в обратном порядке.

use std::path::Path;

use clap::ValueEnum;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::{Result, SimError};
use crate::field::FieldView;
use crate::fields::{self, channel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Рельеф с водой
    Elevation,
    /// Глубина воды
    Water,
    /// Давление нижнего слоя
    Pressure,
    /// Ветер нижнего слоя
    Wind,
    /// Подъём воздуха
    Uplift,
    /// Облачность поверх рельефа
    Clouds,
    /// Температура поверхности
    Temperature,
}

impl ViewMode {
    pub const ALL: [ViewMode; 7] = [
        ViewMode::Elevation,
        ViewMode::Water,
        ViewMode::Pressure,
        ViewMode::Wind,
        ViewMode::Uplift,
        ViewMode::Clouds,
        ViewMode::Temperature,
    ];

    #[must_use]
    pub fn file_stem(self) -> &'static str {
        match self {
            ViewMode::Elevation => "elevation",
            ViewMode::Water => "water",
            ViewMode::Pressure => "pressure",
            ViewMode::Wind => "wind",
            ViewMode::Uplift => "uplift",
            ViewMode::Clouds => "clouds",
            ViewMode::Temperature => "temperature",
        }
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

fn rgb(r: f32, g: f32, b: f32) -> Rgb<u8> {
    Rgb([to_u8(r), to_u8(g), to_u8(b)])
}

/// Красный для положительных, синий для отрицательных значений
fn diverging(v: f32) -> Rgb<u8> {
    let v = v.clamp(-1.0, 1.0);
    if v >= 0.0 {
        rgb(1.0, 1.0 - v, 1.0 - v)
    } else {
        rgb(1.0 + v, 1.0 + v, 1.0)
    }
}

fn terrain_color(elevation: f32, water: f32, max_elevation: f32) -> Rgb<u8> {
    let h = if max_elevation > 0.0 {
        elevation / max_elevation
    } else {
        0.0
    };
    let land = [0.25 + 0.5 * h, 0.45 + 0.35 * h, 0.2 + 0.5 * h];
    let depth = water / (water + 0.05);
    let sea = [0.05, 0.2, 0.55];
    rgb(
        land[0] + (sea[0] - land[0]) * depth,
        land[1] + (sea[1] - land[1]) * depth,
        land[2] + (sea[2] - land[2]) * depth,
    )
}

fn max_abs(view: &FieldView<'_>, channel: usize) -> f32 {
    let stats = view.stats(channel);
    stats.min.abs().max(stats.max.abs()).max(f32::EPSILON)
}

fn field<'a>(engine: &'a Engine, name: &str) -> Result<FieldView<'a>> {
    engine.read_field(name).ok_or_else(|| SimError::UnknownField {
        pass: "snapshot".to_string(),
        field: name.to_string(),
    })
}

/// Раскрашивает текущее состояние в изображение размером с сетку
pub fn render_view(engine: &Engine, mode: ViewMode) -> Result<RgbImage> {
    let grid = engine.grid();
    let (width, height) = (grid.width as u32, grid.height as u32);
    let surface = field(engine, fields::SURFACE.name)?;
    let max_elevation = surface.stats(channel::ELEVATION).max;

    let paint: Box<dyn Fn(usize, usize) -> Rgb<u8> + '_> = match mode {
        ViewMode::Elevation => Box::new(move |x, y| {
            let s = surface.at(x, y);
            terrain_color(s[channel::ELEVATION], s[channel::WATER], max_elevation)
        }),
        ViewMode::Water => Box::new(move |x, y| {
            let w = surface.at(x, y)[channel::WATER].max(0.0);
            let d = w / (w + 0.1);
            rgb(1.0 - d, 1.0 - 0.6 * d, 1.0)
        }),
        ViewMode::Pressure => {
            let state = field(engine, fields::STATE_LOW.name)?;
            let scale = max_abs(&state, channel::PRESSURE);
            Box::new(move |x, y| diverging(state.at(x, y)[channel::PRESSURE] / scale))
        }
        ViewMode::Wind => {
            let velocity = field(engine, fields::VELOCITY_LOW.name)?;
            let scale = max_abs(&velocity, 0).max(max_abs(&velocity, 1));
            Box::new(move |x, y| {
                let v = velocity.at(x, y);
                rgb(0.5 + 0.5 * v[0] / scale, 0.5 + 0.5 * v[1] / scale, 0.5)
            })
        }
        ViewMode::Uplift => {
            let mixing = field(engine, fields::MIXING.name)?;
            Box::new(move |x, y| diverging(mixing.at(x, y)[channel::UPLIFT]))
        }
        ViewMode::Clouds => {
            let light = field(engine, fields::LIGHT.name)?;
            Box::new(move |x, y| {
                let s = surface.at(x, y);
                let Rgb([r, g, b]) =
                    terrain_color(s[channel::ELEVATION], s[channel::WATER], max_elevation);
                let cover = 1.0 - light.at(x, y)[channel::TRANSMITTANCE].clamp(0.0, 1.0);
                let blend = |c: u8| f32::from(c) / 255.0 * (1.0 - cover) + cover;
                rgb(blend(r), blend(g), blend(b))
            })
        }
        ViewMode::Temperature => {
            let stats = surface.stats(channel::SURFACE_TEMPERATURE);
            let mid = 0.5 * (stats.min + stats.max);
            let half = (0.5 * (stats.max - stats.min)).max(f32::EPSILON);
            Box::new(move |x, y| {
                diverging((surface.at(x, y)[channel::SURFACE_TEMPERATURE] - mid) / half)
            })
        }
    };

    Ok(RgbImage::from_fn(width, height, |px, py| {
        let x = px as usize;
        let y = grid.height - 1 - py as usize;
        paint(x, y)
    }))
}

/// Сохраняет снимок в PNG
pub fn save_view(engine: &Engine, mode: ViewMode, path: impl AsRef<Path>) -> Result<()> {
    let img = render_view(engine, mode)?;
    img.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diverging_palette_is_white_at_zero() {
        assert_eq!(diverging(0.0), Rgb([255, 255, 255]));
        assert_eq!(diverging(1.0), Rgb([255, 0, 0]));
        assert_eq!(diverging(-1.0), Rgb([0, 0, 255]));
    }

    #[test]
    fn deep_water_looks_like_sea() {
        let Rgb([r, _, b]) = terrain_color(0.0, 10.0, 1.0);
        assert!(b > r);
    }
}
