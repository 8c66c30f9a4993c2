//! Стандартный набор полей погодной модели

use crate::config::{InitialState, LightParams};
use crate::error::Result;
use crate::field::{FieldDecl, FieldStore};
use crate::grid::EdgeMode;

pub const VELOCITY_LOW: FieldDecl<'static> = FieldDecl::new("velocity_low", 2);
pub const VELOCITY_HIGH: FieldDecl<'static> = FieldDecl::new("velocity_high", 2);
pub const STATE_LOW: FieldDecl<'static> = FieldDecl::new("state_low", 4);
pub const STATE_HIGH: FieldDecl<'static> = FieldDecl::new("state_high", 4);
pub const MIXING: FieldDecl<'static> = FieldDecl::new("mixing", 3);
pub const SURFACE: FieldDecl<'static> = FieldDecl::new("surface", 4);
pub const LIGHT: FieldDecl<'static> = FieldDecl::new("light", 4);

/// Номера каналов внутри стандартных полей
pub mod channel {
    // state_low / state_high
    pub const TEMPERATURE: usize = 0;
    pub const HUMIDITY: usize = 1;
    pub const PRESSURE: usize = 2;
    /// Дивергенция слоя на прошлом тике
    pub const DIVERGENCE: usize = 3;

    // mixing
    pub const UPLIFT: usize = 0;
    pub const PRECIP_LOW: usize = 1;
    pub const PRECIP_HIGH: usize = 2;

    // surface
    pub const SEDIMENT: usize = 0;
    pub const SURFACE_TEMPERATURE: usize = 1;
    pub const ELEVATION: usize = 2;
    pub const WATER: usize = 3;

    // light
    pub const TRANSMITTANCE: usize = 0;
    pub const CLOUD_LOWER: usize = 1;
    pub const CLOUD_UPPER: usize = 2;
    pub const SURFACE_DEPTH: usize = 3;
}

/// Выделяет все стандартные поля; рельеф заполняется отдельно
pub fn allocate_standard(
    store: &mut FieldStore,
    initial: &InitialState,
    light: &LightParams,
) -> Result<()> {
    let edge = EdgeMode::Wrap;
    store.allocate(VELOCITY_LOW.name, VELOCITY_LOW.channels, &[0.0, 0.0], edge)?;
    store.allocate(VELOCITY_HIGH.name, VELOCITY_HIGH.channels, &[0.0, 0.0], edge)?;
    store.allocate(
        STATE_LOW.name,
        STATE_LOW.channels,
        &[initial.low_temperature, initial.low_humidity, 0.0, 0.0],
        edge,
    )?;
    store.allocate(
        STATE_HIGH.name,
        STATE_HIGH.channels,
        &[initial.high_temperature, initial.high_humidity, 0.0, 0.0],
        edge,
    )?;
    store.allocate(MIXING.name, MIXING.channels, &[0.0; 3], edge)?;
    store.allocate(
        SURFACE.name,
        SURFACE.channels,
        &[0.0, initial.surface_temperature, 0.0, initial.water_depth],
        edge,
    )?;
    store.allocate(
        LIGHT.name,
        LIGHT.channels,
        &[1.0, light.top_altitude, light.top_altitude, 0.0],
        edge,
    )?;
    Ok(())
}
