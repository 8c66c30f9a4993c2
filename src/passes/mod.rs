//! Проходы погодной модели
//!
//! Порядок стандартного конвейера: атмосфера → поверхность → свет.
//! Упрощённые варианты модели получаются пропуском проходов.

pub mod advection;
pub mod atmosphere;
pub mod cloud;
pub mod exchange;
pub mod hydrology;
pub mod light;
pub mod pressure;
pub mod thermal;

pub use atmosphere::AtmosphereKernel;
pub use hydrology::SurfaceKernel;
pub use light::LightKernel;

use crate::error::Result;
use crate::field::FieldStore;
use crate::pipeline::Pipeline;

/// Регистрирует полный набор проходов над стандартными полями
pub fn register_standard(pipeline: &mut Pipeline, store: &FieldStore) -> Result<()> {
    pipeline.register(
        store,
        atmosphere::NAME,
        &atmosphere::INPUTS,
        &atmosphere::OUTPUTS,
        AtmosphereKernel,
    )?;
    pipeline.register(
        store,
        hydrology::NAME,
        &hydrology::INPUTS,
        &hydrology::OUTPUTS,
        SurfaceKernel,
    )?;
    pipeline.register(store, light::NAME, &light::INPUTS, &light::OUTPUTS, LightKernel)?;
    Ok(())
}
