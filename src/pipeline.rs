//! Конвейер проходов и планировщик тика
//!
//! Проход читает только передние буферы (состояние прошлого тика) и пишет
//! только в задние буферы своих выходов. Проходы выполняются строго по
//! порядку, ячейки внутри прохода независимы и считаются параллельно по
//! строкам. После последнего прохода все записанные поля одновременно меняют
//! буферы ролями.
//!
//! Поскольку все проходы тика видят одно и то же прошлое состояние, у
//! каждого поля может быть только один писатель.

use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;

use crate::config::SimParams;
use crate::error::{Result, SimError};
use crate::field::{FieldDecl, FieldId, FieldStore, FieldView, Texel};
use crate::forcing::{Brush, ForcingFrame};
use crate::grid::Grid;
use crate::sun::SunTransform;

/// Вычисление одной ячейки прохода
pub trait Kernel: Send + Sync {
    fn cell(&self, x: usize, y: usize, src: &PassInputs<'_>, out: &mut CellOutput<'_, '_>);
}

/// Ядро из замыкания
pub struct FnKernel<F>(F);

impl<F> Kernel for FnKernel<F>
where
    F: Fn(usize, usize, &PassInputs<'_>, &mut CellOutput<'_, '_>) + Send + Sync,
{
    fn cell(&self, x: usize, y: usize, src: &PassInputs<'_>, out: &mut CellOutput<'_, '_>) {
        (self.0)(x, y, src, out);
    }
}

pub fn kernel_fn<F>(f: F) -> FnKernel<F>
where
    F: Fn(usize, usize, &PassInputs<'_>, &mut CellOutput<'_, '_>) + Send + Sync,
{
    FnKernel(f)
}

/// Входы прохода в порядке объявления и общие параметры тика
pub struct PassInputs<'a> {
    fields: &'a [FieldView<'a>],
    pub params: &'a SimParams,
    pub sun: &'a SunTransform,
    pub grid: Grid,
    pub tick: u64,
}

impl<'a> PassInputs<'a> {
    /// Передний буфер входа с номером `slot`
    #[must_use]
    pub fn field(&self, slot: usize) -> &FieldView<'a> {
        &self.fields[slot]
    }
}

/// Выходы прохода для одной ячейки
pub struct CellOutput<'r, 'a> {
    rows: &'r mut [&'a mut [f32]],
    channels: &'r [usize],
    x: usize,
}

impl CellOutput<'_, '_> {
    /// Записывает значение выхода `slot`; лишние каналы отбрасываются
    pub fn set(&mut self, slot: usize, value: Texel) {
        let c = self.channels[slot];
        self.texel_mut(slot).copy_from_slice(&value[..c]);
    }

    pub(crate) fn texel_mut(&mut self, slot: usize) -> &mut [f32] {
        let c = self.channels[slot];
        let start = self.x * c;
        &mut self.rows[slot][start..start + c]
    }
}

struct Pass {
    name: String,
    inputs: Vec<FieldId>,
    outputs: Vec<FieldId>,
    output_channels: Vec<usize>,
    kernel: Box<dyn Kernel>,
}

/// Параметры одного тика
pub struct TickContext<'a> {
    pub params: &'a SimParams,
    pub sun: SunTransform,
    pub forcing: ForcingFrame,
    pub tick: u64,
}

/// Итог тика
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub passes: usize,
    pub swapped: Vec<String>,
    /// Поля, в которых после тика есть NaN или бесконечности
    pub non_finite: Vec<String>,
}

/// Упорядоченный список проходов, привязанный к одному хранилищу
pub struct Pipeline {
    store_id: u64,
    passes: Vec<Pass>,
    writers: HashMap<FieldId, String>,
}

impl Pipeline {
    #[must_use]
    pub fn new(store: &FieldStore) -> Self {
        Self {
            store_id: store.store_id(),
            passes: Vec::new(),
            writers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn pass_names(&self) -> impl Iterator<Item = &str> {
        self.passes.iter().map(|p| p.name.as_str())
    }

    /// Добавляет проход в конец конвейера
    ///
    /// Имена полей разрешаются здесь, один раз. Ошибка, если поле не
    /// выделено, число каналов не совпадает или у выхода уже есть писатель.
    pub fn register<K>(
        &mut self,
        store: &FieldStore,
        name: &str,
        inputs: &[FieldDecl<'_>],
        outputs: &[FieldDecl<'_>],
        kernel: K,
    ) -> Result<()>
    where
        K: Kernel + 'static,
    {
        if store.store_id() != self.store_id {
            return Err(SimError::StoreMismatch);
        }

        let resolve = |decl: &FieldDecl<'_>| -> Result<FieldId> {
            let id = store.id(decl.name).ok_or_else(|| SimError::UnknownField {
                pass: name.to_string(),
                field: decl.name.to_string(),
            })?;
            let found = store.field(id).channels();
            if found != decl.channels {
                return Err(SimError::ChannelMismatch {
                    pass: name.to_string(),
                    field: decl.name.to_string(),
                    expected: decl.channels,
                    found,
                });
            }
            Ok(id)
        };

        let input_ids = inputs.iter().map(resolve).collect::<Result<Vec<_>>>()?;
        let output_ids = outputs.iter().map(resolve).collect::<Result<Vec<_>>>()?;

        for (i, id) in output_ids.iter().enumerate() {
            let field = outputs[i].name.to_string();
            if let Some(first) = self.writers.get(id) {
                return Err(SimError::OutputConflict {
                    field,
                    first: first.clone(),
                    second: name.to_string(),
                });
            }
            if output_ids[..i].contains(id) {
                return Err(SimError::OutputConflict {
                    field,
                    first: name.to_string(),
                    second: name.to_string(),
                });
            }
        }

        for id in &output_ids {
            self.writers.insert(*id, name.to_string());
        }
        let output_channels = outputs.iter().map(|d| d.channels).collect();
        self.passes.push(Pass {
            name: name.to_string(),
            inputs: input_ids,
            outputs: output_ids,
            output_channels,
            kernel: Box::new(kernel),
        });

        log::info!(
            "registered pass '{name}' ({} inputs, {} outputs)",
            inputs.len(),
            outputs.len()
        );
        Ok(())
    }

    /// Выполняет все проходы по порядку и меняет буферы записанных полей
    pub fn run_tick(&self, store: &mut FieldStore, ctx: &TickContext<'_>) -> Result<TickReport> {
        if store.store_id() != self.store_id {
            return Err(SimError::StoreMismatch);
        }
        let grid = store.grid();
        let mut written: Vec<FieldId> = Vec::new();

        {
            let (views, mut backs) = store.split_for_pass();
            for pass in &self.passes {
                let inputs: Vec<FieldView<'_>> =
                    pass.inputs.iter().map(|id| views[id.index()]).collect();
                let src = PassInputs {
                    fields: &inputs,
                    params: ctx.params,
                    sun: &ctx.sun,
                    grid,
                    tick: ctx.tick,
                };

                let mut outs = Vec::with_capacity(pass.outputs.len());
                for id in &pass.outputs {
                    let back = backs[id.index()]
                        .take()
                        .ok_or_else(|| SimError::OutputConflict {
                            field: id.index().to_string(),
                            first: "an earlier pass".to_string(),
                            second: pass.name.clone(),
                        })?;
                    outs.push(back);
                }

                let brushes = ctx.forcing.for_outputs(&pass.outputs);
                run_pass(pass, &src, outs, &brushes);
                written.extend_from_slice(&pass.outputs);
                log::debug!("tick {}: pass '{}' done", ctx.tick, pass.name);
            }
        }

        store.swap(&written, ctx.tick);

        let non_finite: Vec<String> = written
            .iter()
            .filter(|id| store.front(**id).data().iter().any(|v| !v.is_finite()))
            .map(|id| store.field(*id).name().to_string())
            .collect();
        for name in &non_finite {
            log::warn!("tick {}: field '{name}' contains non-finite values", ctx.tick);
        }

        Ok(TickReport {
            tick: ctx.tick,
            passes: self.passes.len(),
            swapped: written
                .iter()
                .map(|id| store.field(*id).name().to_string())
                .collect(),
            non_finite,
        })
    }
}

fn run_pass(pass: &Pass, src: &PassInputs<'_>, outs: Vec<&mut [f32]>, brushes: &[(usize, Brush)]) {
    let Grid { width, height } = src.grid;

    // выходы режутся на строки и транспонируются: в одной строке все выходы
    let mut rows: Vec<Vec<&mut [f32]>> = (0..height)
        .map(|_| Vec::with_capacity(outs.len()))
        .collect();
    for (out, &channels) in outs.into_iter().zip(&pass.output_channels) {
        for (y, row) in out.chunks_mut(width * channels).enumerate() {
            rows[y].push(row);
        }
    }

    let run_row = |(y, row): (usize, &mut Vec<&mut [f32]>)| {
        for x in 0..width {
            let mut cell = CellOutput {
                rows: row.as_mut_slice(),
                channels: &pass.output_channels,
                x,
            };
            pass.kernel.cell(x, y, src, &mut cell);
            for (slot, brush) in brushes {
                brush.apply(x, y, cell.texel_mut(*slot));
            }
        }
    };

    #[cfg(feature = "parallel")]
    rows.par_iter_mut().enumerate().for_each(run_row);

    #[cfg(not(feature = "parallel"))]
    rows.iter_mut().enumerate().for_each(run_row);
}
