//! Профиль влажности, облачность и осадки

use crate::config::AtmosphereParams;

/// Влажность по высоте: у земли, на нижнем и на верхнем слое
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HumidityProfile {
    pub ground: f32,
    pub low: f32,
    pub high: f32,
}

impl HumidityProfile {
    /// У земли влажность равна влажности нижнего слоя
    #[must_use]
    pub fn new(low: f32, high: f32) -> Self {
        Self {
            ground: low,
            low,
            high,
        }
    }

    /// Линейная интерполяция между узлами; выше верхнего слоя влага убывает до нуля
    #[must_use]
    pub fn at(&self, z: f32, params: &AtmosphereParams) -> f32 {
        let (la, ha) = (params.low_altitude, params.high_altitude);
        if z <= la {
            lerp(self.ground, self.low, (z / la).clamp(0.0, 1.0))
        } else if z <= ha {
            lerp(self.low, self.high, (z - la) / (ha - la))
        } else {
            lerp(self.high, 0.0, ((z - ha) / ha).clamp(0.0, 1.0))
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Порог конденсации, линейно снижающийся с высотой
#[must_use]
pub fn cloud_threshold(z: f32, params: &AtmosphereParams) -> f32 {
    (params.saturation_ground - params.saturation_lapse * z).max(params.saturation_min)
}

#[must_use]
pub fn cloud_density(humidity: f32, z: f32, params: &AtmosphereParams) -> f32 {
    (humidity - cloud_threshold(z, params)).max(0.0)
}

/// Влага, выпадающая за тик из слоя на высоте `z`
#[must_use]
pub fn precipitation(humidity: f32, z: f32, params: &AtmosphereParams) -> f32 {
    cloud_density(humidity, z, params) * params.precipitation_rate.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_falls_with_altitude_but_not_below_minimum() {
        let params = AtmosphereParams::default();
        assert!(cloud_threshold(1.0, &params) < cloud_threshold(0.0, &params));
        assert_eq!(cloud_threshold(100.0, &params), params.saturation_min);
    }

    #[test]
    fn profile_hits_layer_values() {
        let params = AtmosphereParams::default();
        let profile = HumidityProfile::new(0.4, 0.1);
        assert!((profile.at(0.0, &params) - 0.4).abs() < 1e-6);
        assert!((profile.at(params.low_altitude, &params) - 0.4).abs() < 1e-6);
        assert!((profile.at(params.high_altitude, &params) - 0.1).abs() < 1e-6);
        assert_eq!(profile.at(10.0, &params), 0.0);
    }

    #[test]
    fn dry_air_does_not_rain() {
        let params = AtmosphereParams::default();
        assert_eq!(precipitation(0.1, params.low_altitude, &params), 0.0);
        let wet = precipitation(0.9, params.low_altitude, &params);
        assert!(wet > 0.0 && wet < 0.9);
    }
}
