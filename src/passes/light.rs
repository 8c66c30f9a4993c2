//! Предварительный проход освещённости
//!
//! Для каждого текселя пространства света луч идёт вверх к солнцу с
//! фиксированным шагом по высоте. Пока луч под рельефом, столбец
//! сбрасывается: запоминается глубина поверхности, пропускание и границы
//! облака начинаются заново. Над поверхностью пропускание ослабляется
//! облачностью.
//!
//! Проход идёт последним, поэтому поверхность видит освещённость прошлого тика.

use glam::Vec2;

use crate::config::{AtmosphereParams, LightParams};
use crate::field::{FieldDecl, FieldView, Texel};
use crate::fields::{self, channel};
use crate::pipeline::{CellOutput, Kernel, PassInputs};
use crate::sun::{LightPoint, SunTransform};

use super::cloud::{HumidityProfile, cloud_density};

pub const NAME: &str = "light";

pub const INPUTS: [FieldDecl<'static>; 3] =
    [fields::SURFACE, fields::STATE_LOW, fields::STATE_HIGH];

pub const OUTPUTS: [FieldDecl<'static>; 1] = [fields::LIGHT];

/// Доля прямого света в точке с глубиной `depth`, если ближайшая к солнцу
/// поверхность в её столбце на глубине `occluder`
#[must_use]
pub fn lit_fraction(occluder: f32, depth: f32, bias: f32) -> f32 {
    if bias <= 0.0 {
        return if occluder > depth { 0.0 } else { 1.0 };
    }
    (1.0 - (occluder - depth) / bias).clamp(0.0, 1.0)
}

/// Столбец пространства света над одним текселем
pub struct LightColumn<'a> {
    pub surface: &'a FieldView<'a>,
    pub state_low: &'a FieldView<'a>,
    pub state_high: &'a FieldView<'a>,
    pub sun: &'a SunTransform,
    pub light: &'a LightParams,
    pub atmosphere: &'a AtmosphereParams,
}

impl LightColumn<'_> {
    /// Проходит лучом от земли до верхней границы: `[T, низ облака, верх облака, глубина]`
    #[must_use]
    pub fn march(&self, texel: Vec2) -> Texel {
        let top = self.light.top_altitude;
        let steps = self.light.steps.max(1);
        let step = top / steps as f32;

        let mut transmittance = 1.0f32;
        let mut lower = top;
        let mut upper = top;
        let mut depth = 0.0;
        let mut in_cloud = false;
        let mut cloud_done = false;

        for k in 0..steps {
            let z = (k as f32 + 0.5) * step;
            let p = self.sun.to_grid(LightPoint { texel, depth: z });
            let ground = self.surface.sample(p.cell);

            if ground[channel::ELEVATION] + ground[channel::WATER] >= z {
                transmittance = 1.0;
                lower = top;
                upper = top;
                depth = z;
                in_cloud = false;
                cloud_done = false;
                continue;
            }

            let profile = HumidityProfile::new(
                self.state_low.sample(p.cell)[channel::HUMIDITY],
                self.state_high.sample(p.cell)[channel::HUMIDITY],
            );
            let density = cloud_density(profile.at(z, self.atmosphere), z, self.atmosphere);
            transmittance *= (1.0 - self.light.extinction * density * step).max(0.0);

            if !in_cloud && !cloud_done && density >= self.light.dense_threshold {
                lower = z;
                in_cloud = true;
            } else if in_cloud && density < self.light.clear_threshold {
                upper = z;
                in_cloud = false;
                cloud_done = true;
            }
        }

        [transmittance, lower, upper, depth]
    }
}

pub struct LightKernel;

impl Kernel for LightKernel {
    fn cell(&self, x: usize, y: usize, src: &PassInputs<'_>, out: &mut CellOutput<'_, '_>) {
        let column = LightColumn {
            surface: src.field(0),
            state_low: src.field(1),
            state_high: src.field(2),
            sun: src.sun,
            light: &src.params.light,
            atmosphere: &src.params.atmosphere,
        };
        out.set(0, column.march(Vec2::new(x as f32, y as f32)));
    }
}
