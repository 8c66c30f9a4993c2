//! Движок: хранилище полей, конвейер и счётчик тиков
//!
//! Хост создаёт поля и проходы, затем вызывает [`Engine::tick`] с
//! параметрами и воздействием. Остановиться можно на любой границе тика.

use crate::config::{SimParams, WorldConfig};
use crate::error::Result;
use crate::field::{FieldDecl, FieldId, FieldStore, FieldView};
use crate::fields::{self, channel};
use crate::forcing::{Forcing, ForcingFrame};
use crate::grid::{EdgeMode, Grid};
use crate::passes;
use crate::pipeline::{Kernel, Pipeline, TickContext, TickReport};
use crate::sun::SunTransform;
use crate::terrain::generate_elevation;

pub struct Engine {
    store: FieldStore,
    pipeline: Pipeline,
    tick: u64,
}

impl Engine {
    /// Пустой движок без полей и проходов
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        let store = FieldStore::new(grid);
        let pipeline = Pipeline::new(&store);
        Self {
            store,
            pipeline,
            tick: 0,
        }
    }

    /// Полная модель: стандартные поля, рельеф из сида, все проходы
    pub fn from_config(config: &WorldConfig) -> Result<Self> {
        config.params.validate()?;
        let grid = Grid::new(config.width, config.height)?;
        let mut engine = Self::new(grid);

        fields::allocate_standard(&mut engine.store, &config.initial, &config.params.light)?;

        let elevation = generate_elevation(config.seed, grid, &config.terrain);
        let sea_level = config.params.hydrology.sea_level;
        let water_depth = config.initial.water_depth;
        if let Some(surface) = engine.store.id(fields::SURFACE.name) {
            engine.store.init_front(surface, |x, y, texel| {
                let h = elevation[grid.index(x, y)];
                texel[channel::ELEVATION] = h;
                // низины ниже уровня моря сразу заполнены водой
                texel[channel::WATER] =
                    sea_level.map_or(water_depth, |sea| water_depth.max(sea - h));
            });
        }

        passes::register_standard(&mut engine.pipeline, &engine.store)?;
        log::info!(
            "engine ready: {}x{} grid, {} fields, {} passes",
            grid.width,
            grid.height,
            engine.store.len(),
            engine.pipeline.len()
        );
        Ok(engine)
    }

    pub fn create_field(
        &mut self,
        name: &str,
        channels: usize,
        default: &[f32],
        edge: EdgeMode,
    ) -> Result<FieldId> {
        self.store.allocate(name, channels, default, edge)
    }

    pub fn register_pass<K>(
        &mut self,
        name: &str,
        inputs: &[FieldDecl<'_>],
        outputs: &[FieldDecl<'_>],
        kernel: K,
    ) -> Result<()>
    where
        K: Kernel + 'static,
    {
        self.pipeline
            .register(&self.store, name, inputs, outputs, kernel)
    }

    /// Один шаг симуляции
    pub fn tick(&mut self, params: &SimParams, forcing: &Forcing) -> Result<TickReport> {
        params.validate()?;
        let ctx = TickContext {
            params,
            sun: SunTransform::from_params(&params.sun),
            forcing: ForcingFrame::resolve(forcing, &self.store),
            tick: self.tick,
        };
        let report = self.pipeline.run_tick(&mut self.store, &ctx)?;
        log::debug!(
            "tick {} complete: {} fields swapped",
            self.tick,
            report.swapped.len()
        );
        self.tick += 1;
        Ok(report)
    }

    /// Текущее состояние поля по имени
    #[must_use]
    pub fn read_field(&self, name: &str) -> Option<FieldView<'_>> {
        self.store.view(name)
    }

    #[must_use]
    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    /// Доступ к хранилищу для начальной настройки полей
    pub fn store_mut(&mut self) -> &mut FieldStore {
        &mut self.store
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn grid(&self) -> Grid {
        self.store.grid()
    }

    /// Число выполненных тиков
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.tick
    }
}
