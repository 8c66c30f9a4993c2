//! Положение солнца и пространство света
//!
//! Солнце ортографическое: все лучи параллельны направлению `direction`.
//! Пространство света: плоскость земли, на которую точка сдвигается
//! вдоль луча до нулевой высоты. Преобразования между пространствами явные,
//! чтобы точки сетки и точки пространства света нельзя было перепутать.

use glam::{Mat3, Vec2, Vec3};

use crate::config::SunParams;

/// Точка над сеткой: координаты ячейки и высота
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub cell: Vec2,
    pub altitude: f32,
}

/// Точка в пространстве света: текстель карты освещённости и глубина вдоль луча
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightPoint {
    pub texel: Vec2,
    pub depth: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTransform {
    direction: Vec3,
    to_light: Mat3,
    to_grid: Mat3,
}

impl SunTransform {
    /// Углы в градусах; `cells_per_altitude` задаёт масштаб высоты в ячейках
    #[must_use]
    pub fn new(azimuth: f32, elevation: f32, cells_per_altitude: f32) -> Self {
        let (az, el) = (azimuth.to_radians(), elevation.to_radians());
        let direction = Vec3::new(el.cos() * az.cos(), el.cos() * az.sin(), el.sin());

        // сдвиг по горизонтали на единицу высоты вдоль луча
        let shear = if direction.z > f32::EPSILON {
            Vec2::new(direction.x, direction.y) / direction.z * cells_per_altitude
        } else {
            Vec2::ZERO
        };

        let to_light = Mat3::from_cols(Vec3::X, Vec3::Y, Vec3::new(-shear.x, -shear.y, 1.0));
        let to_grid = Mat3::from_cols(Vec3::X, Vec3::Y, Vec3::new(shear.x, shear.y, 1.0));
        Self {
            direction,
            to_light,
            to_grid,
        }
    }

    #[must_use]
    pub fn from_params(params: &SunParams) -> Self {
        Self::new(params.azimuth, params.elevation, params.cells_per_altitude)
    }

    /// Единичный вектор на солнце
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[must_use]
    pub fn to_light(&self, p: GridPoint) -> LightPoint {
        let v = self.to_light * p.cell.extend(p.altitude);
        LightPoint {
            texel: v.truncate(),
            depth: v.z,
        }
    }

    #[must_use]
    pub fn to_grid(&self, p: LightPoint) -> GridPoint {
        let v = self.to_grid * p.texel.extend(p.depth);
        GridPoint {
            cell: v.truncate(),
            altitude: v.z,
        }
    }
}

impl Default for SunTransform {
    fn default() -> Self {
        Self::from_params(&SunParams::default())
    }
}
