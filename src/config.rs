// src/config.rs
//! Конфигурация симуляции
//!
//! Этот модуль определяет все параметры, управляющие симуляцией:
//! - Размер сетки и сид начального рельефа
//! - Константы проходов (атмосфера, давление, гидрология, тепло, свет)
//! - Положение солнца
//! - Сценарий внешних воздействий для безоконного запуска
//!
//! Все структуры поддерживают сериализацию в TOML/JSON для удобной настройки через конфигурационные файлы.

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::forcing::{Forcing, Tool};
use crate::grid::GridUv;

/// Параметры двух слоёв атмосферы
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AtmosphereParams {
    /// Высота нижнего слоя (в единицах высоты рельефа)
    pub low_altitude: f32,
    /// Высота верхнего слоя
    pub high_altitude: f32,
    /// Трение нижнего слоя о поверхность (доля скорости за тик)
    pub friction_low: f32,
    /// Вклад сходимости нижнего потока в подъём воздуха
    pub uplift_convergence: f32,
    /// Подталкивание подъёма разностью давлений нижнего и верхнего слоёв
    pub uplift_pressure: f32,
    /// Порог облакообразования у земли
    pub saturation_ground: f32,
    /// Снижение порога на единицу высоты
    pub saturation_lapse: f32,
    /// Нижняя граница порога
    pub saturation_min: f32,
    /// Доля избытка влаги, выпадающая осадками за тик (1.0 = весь избыток)
    pub precipitation_rate: f32,
}

impl Default for AtmosphereParams {
    fn default() -> Self {
        Self {
            low_altitude: 1.0,
            high_altitude: 2.0,
            friction_low: 0.002,
            uplift_convergence: 0.5,
            uplift_pressure: 0.05,
            saturation_ground: 0.8,
            saturation_lapse: 0.25,
            saturation_min: 0.05,
            precipitation_rate: 0.5,
        }
    }
}

/// Релаксация давления
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PressureParams {
    /// Масштаб градиента давления при обновлении скорости
    pub k_pressure: f32,
    /// Множитель затухания за тик, строго меньше 1
    pub decay: f32,
    /// Доля смешивания с давлением другого слоя
    pub vertical_coupling: f32,
    /// Вклад обтекания рельефа (скорость · уклон)
    pub terrain_coupling: f32,
}

impl Default for PressureParams {
    fn default() -> Self {
        Self {
            k_pressure: 0.1,
            decay: 0.9,
            vertical_coupling: 0.05,
            terrain_coupling: 1.0,
        }
    }
}

/// Течение воды и льда по поверхности
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HydrologyParams {
    /// Скорость перетока жидкой воды
    pub water_flow_rate: f32,
    /// Скорость перетока, когда обе ячейки заморожены
    pub ice_flow_rate: f32,
    /// Температура поверхности, ниже которой вода считается льдом
    pub freezing_temperature: f32,
    pub min_water_depth: f32,
    /// Захват осадка на единицу скорости воды
    pub k_uptake: f32,
    /// Ёмкость переноса осадка на единицу скорости воды
    pub k_saturation: f32,
    /// Равномерный дождь за тик
    pub rain: f32,
    /// Испарение на единицу положительной температуры поверхности
    pub evaporation_rate: f32,
    /// Уровень моря: ячейки ниже него доливаются до уровня
    pub sea_level: Option<f32>,
}

impl Default for HydrologyParams {
    fn default() -> Self {
        Self {
            water_flow_rate: 0.2,
            ice_flow_rate: 0.005,
            freezing_temperature: 0.2,
            min_water_depth: 0.01,
            k_uptake: 0.0003,
            k_saturation: 0.01,
            rain: 0.0,
            evaporation_rate: 0.001,
            sea_level: None,
        }
    }
}

/// Трёхузловая тепловая модель: поверхность, нижний и верхний воздух
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThermalParams {
    pub surface_time_constant: f32,
    pub low_time_constant: f32,
    pub high_time_constant: f32,
    pub solar_constant: f32,
    pub solar_gain: f32,
    pub surface_radiation: f32,
    pub convection: f32,
    pub high_radiation: f32,
}

impl Default for ThermalParams {
    fn default() -> Self {
        Self {
            surface_time_constant: 20.0,
            low_time_constant: 40.0,
            high_time_constant: 80.0,
            solar_constant: 1.0,
            solar_gain: 1.0,
            surface_radiation: 1.0,
            convection: 0.5,
            high_radiation: 0.2,
        }
    }
}

/// Предварительный проход освещённости
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightParams {
    /// Число шагов по высоте
    pub steps: u32,
    /// Верхняя граница марша
    pub top_altitude: f32,
    /// Коэффициент ослабления света облачностью
    pub extinction: f32,
    /// Плотность, с которой начинается облачный слой
    pub dense_threshold: f32,
    /// Плотность, ниже которой облачный слой заканчивается
    pub clear_threshold: f32,
    /// Допуск сравнения глубины в карте теней
    pub shadow_bias: f32,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            steps: 16,
            top_altitude: 3.0,
            extinction: 4.0,
            dense_threshold: 0.02,
            clear_threshold: 0.01,
            shadow_bias: 0.05,
        }
    }
}

/// Положение солнца
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SunParams {
    /// Азимут в градусах
    pub azimuth: f32,
    /// Высота над горизонтом в градусах, `(0, 90]`
    pub elevation: f32,
    /// Сколько ячеек по горизонтали соответствует единице высоты
    pub cells_per_altitude: f32,
}

impl Default for SunParams {
    fn default() -> Self {
        Self {
            azimuth: 30.0,
            elevation: 35.0,
            cells_per_altitude: 16.0,
        }
    }
}

/// Общий набор параметров, доступный всем проходам на тике
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimParams {
    /// Шаг времени; может меняться от тика к тику
    pub dt: f32,
    pub atmosphere: AtmosphereParams,
    pub pressure: PressureParams,
    pub hydrology: HydrologyParams,
    pub thermal: ThermalParams,
    pub light: LightParams,
    pub sun: SunParams,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            dt: 1.0,
            atmosphere: AtmosphereParams::default(),
            pressure: PressureParams::default(),
            hydrology: HydrologyParams::default(),
            thermal: ThermalParams::default(),
            light: LightParams::default(),
            sun: SunParams::default(),
        }
    }
}

impl SimParams {
    /// Проверяет значения, при которых схема теряет смысл
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        let invalid = |msg: &str| Err(SimError::InvalidParams(msg.to_string()));

        if !self.dt.is_finite() || self.dt < 0.0 {
            return invalid("dt must be finite and non-negative");
        }
        if !(0.0..1.0).contains(&self.pressure.decay) {
            return invalid("pressure.decay must be in [0, 1)");
        }
        // сравнения записаны так, чтобы NaN их не проходил
        if !(self.sun.elevation > 0.0 && self.sun.elevation <= 90.0) {
            return invalid("sun.elevation must be in (0, 90]");
        }
        if !self.sun.azimuth.is_finite() {
            return invalid("sun.azimuth must be finite");
        }
        if self.light.steps == 0 {
            return invalid("light.steps must be positive");
        }
        if !positive(self.light.top_altitude) {
            return invalid("light.top_altitude must be positive");
        }
        let t = &self.thermal;
        let time_constants = [
            t.surface_time_constant,
            t.low_time_constant,
            t.high_time_constant,
        ];
        if !time_constants.into_iter().all(positive) {
            return invalid("thermal time constants must be positive");
        }
        if self.atmosphere.high_altitude <= self.atmosphere.low_altitude {
            return invalid("atmosphere.high_altitude must be above low_altitude");
        }
        Ok(())
    }
}

/// Настройки начального рельефа
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerrainSettings {
    /// Частота базового шума
    #[serde(default = "default_frequency")]
    pub frequency: f32,

    /// Число октав фрактального шума
    #[serde(default = "default_octaves")]
    pub octaves: i32,

    /// Степень нелинейности высоты:
    /// - `<1.0` → сглаживает рельеф (меньше гор, больше равнин),
    /// - `=1.0` → линейно,
    /// - `>1.0` → усиливает рельеф (более резкие горы и долины).
    #[serde(default = "default_elevation_power")]
    pub elevation_power: f32,

    /// Радиус сглаживания в ячейках (0 = без сглаживания)
    #[serde(default = "default_smooth_radius")]
    pub smooth_radius: usize,

    /// Высота самой высокой точки после нормализации
    #[serde(default = "default_max_elevation")]
    pub max_elevation: f32,
}

fn default_frequency() -> f32 {
    0.01
}
fn default_octaves() -> i32 {
    5
}
fn default_elevation_power() -> f32 {
    0.8
}
fn default_smooth_radius() -> usize {
    1
}
fn default_max_elevation() -> f32 {
    1.0
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            frequency: 0.01,
            octaves: 5,
            elevation_power: 0.8,
            smooth_radius: 1,
            max_elevation: 1.0,
        }
    }
}

/// Начальное заполнение полей
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InitialState {
    pub low_temperature: f32,
    pub low_humidity: f32,
    pub high_temperature: f32,
    pub high_humidity: f32,
    pub surface_temperature: f32,
    pub water_depth: f32,
}

impl Default for InitialState {
    fn default() -> Self {
        Self {
            low_temperature: 0.3,
            low_humidity: 0.2,
            high_temperature: 0.1,
            high_humidity: 0.1,
            surface_temperature: 0.3,
            water_depth: 0.0,
        }
    }
}

/// Запланированное воздействие «кистью» для запуска без окна
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForcingEvent {
    /// Первый тик действия (включительно)
    pub start: u64,
    /// Последний тик действия (не включительно)
    pub end: u64,
    /// Центр кисти в координатах сетки `[0, 1]`
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_brush_radius")]
    pub radius: f32,
    #[serde(default = "default_brush_strength")]
    pub strength: f32,
    pub tool: Tool,
    /// Скорость, задаваемая кистью ветра (ячеек за тик)
    #[serde(default)]
    pub velocity: [f32; 2],
}

fn default_brush_radius() -> f32 {
    0.05
}
fn default_brush_strength() -> f32 {
    1.0
}

impl ForcingEvent {
    #[must_use]
    pub fn forcing_at(&self, tick: u64) -> Option<Forcing> {
        if !(self.start..self.end).contains(&tick) {
            return None;
        }
        Some(Forcing {
            position: GridUv(Vec2::new(self.x, self.y)),
            radius: self.radius,
            strength: self.strength,
            mode: self.tool.mode(Vec2::from(self.velocity)),
            active: true,
        })
    }
}

/// Полная конфигурация одного запуска
///
/// Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Сид генератора рельефа (детерминированная генерация)
    #[serde(default)]
    pub seed: u64,

    /// Ширина сетки в ячейках (по умолчанию 256)
    #[serde(default = "default_width")]
    pub width: usize,

    /// Высота сетки в ячейках (по умолчанию 256)
    #[serde(default = "default_height")]
    pub height: usize,

    #[serde(default)]
    pub terrain: TerrainSettings,

    #[serde(default)]
    pub initial: InitialState,

    #[serde(default)]
    pub params: SimParams,

    /// Сценарий воздействий
    #[serde(default)]
    pub forcing: Vec<ForcingEvent>,
}

fn default_width() -> usize {
    256
}
fn default_height() -> usize {
    256
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            width: 256,
            height: 256,
            terrain: TerrainSettings::default(),
            initial: InitialState::default(),
            params: SimParams::default(),
            forcing: Vec::new(),
        }
    }
}

impl WorldConfig {
    /// Загружает конфигурацию из TOML-файла
    ///
    /// # Пример
    /// ```toml
    /// # world.toml
    /// seed = 42
    /// width = 128
    /// height = 128
    ///
    /// [params.sun]
    /// elevation = 20.0
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.params.validate()?;
        Ok(config)
    }

    /// Воздействие на данном тике: первое активное событие сценария
    #[must_use]
    pub fn forcing_at(&self, tick: u64) -> Forcing {
        self.forcing
            .iter()
            .find_map(|event| event.forcing_at(tick))
            .unwrap_or_else(Forcing::inactive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcing::ForcingMode;

    #[test]
    fn defaults_are_valid() {
        assert!(SimParams::default().validate().is_ok());
    }

    #[test]
    fn invalid_decay_is_rejected() {
        let mut params = SimParams::default();
        params.pressure.decay = 1.0;
        assert!(params.validate().is_err());
        params.pressure.decay = 0.5;
        params.sun.elevation = 0.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn nan_parameters_are_rejected() {
        let cases: [fn(&mut SimParams); 5] = [
            |p| p.sun.elevation = f32::NAN,
            |p| p.sun.azimuth = f32::INFINITY,
            |p| p.light.top_altitude = f32::NAN,
            |p| p.thermal.surface_time_constant = f32::NAN,
            |p| p.thermal.high_time_constant = f32::INFINITY,
        ];
        for (i, spoil) in cases.into_iter().enumerate() {
            let mut params = SimParams::default();
            spoil(&mut params);
            assert!(
                matches!(params.validate(), Err(SimError::InvalidParams(_))),
                "case {i}"
            );
        }
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: WorldConfig = toml::from_str(
            r#"
            seed = 7
            width = 64

            [params.pressure]
            decay = 0.8

            [[forcing]]
            start = 0
            end = 10
            x = 0.5
            y = 0.5
            tool = "Elevation"
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 256);
        assert_eq!(config.params.pressure.decay, 0.8);
        assert_eq!(config.params.pressure.k_pressure, 0.1);
        assert_eq!(config.params.hydrology, HydrologyParams::default());
        assert_eq!(config.forcing[0].radius, 0.05);
    }

    #[test]
    fn default_config_roundtrips_through_toml() {
        let config = WorldConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back: WorldConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.params, config.params);
        assert_eq!(back.terrain, config.terrain);
    }

    #[test]
    fn forcing_schedule_picks_active_event() {
        let mut config = WorldConfig::default();
        config.forcing.push(ForcingEvent {
            start: 5,
            end: 8,
            x: 0.25,
            y: 0.75,
            radius: 0.1,
            strength: 2.0,
            tool: Tool::Precipitation,
            velocity: [0.0, 0.0],
        });
        assert!(!config.forcing_at(4).active);
        let forcing = config.forcing_at(5);
        assert!(forcing.active);
        assert_eq!(forcing.mode, ForcingMode::Precipitation);
        assert!(!config.forcing_at(8).active);
    }
}
