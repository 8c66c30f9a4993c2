//! Хранилище полей с двойной буферизацией
//!
//! Каждое поле владеет двумя буферами одинаковой формы: передний читается
//! проходами, задний записывается. После тика роли меняются у всех полей,
//! записанных за этот тик, одновременно.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;
use serde::Serialize;

use crate::error::{Result, SimError};
use crate::grid::{EdgeMode, Grid};

pub const MAX_CHANNELS: usize = 4;

/// Значение одной ячейки; неиспользуемые каналы равны нулю
pub type Texel = [f32; MAX_CHANNELS];

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Дескриптор поля, полученный один раз при регистрации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

impl FieldId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Идентичность конкретного буфера (для проверки обмена ролей)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

/// Имя поля вместе с ожидаемым числом каналов
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl<'a> {
    pub name: &'a str,
    pub channels: usize,
}

impl<'a> FieldDecl<'a> {
    #[must_use]
    pub const fn new(name: &'a str, channels: usize) -> Self {
        Self { name, channels }
    }
}

#[derive(Debug)]
struct Buffer {
    id: BufferId,
    data: Vec<f32>,
}

#[derive(Debug)]
pub struct Field {
    name: String,
    channels: usize,
    edge: EdgeMode,
    default: Texel,
    buffers: [Buffer; 2],
    front: usize,
    last_written: Option<u64>,
}

impl Field {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[must_use]
    pub fn edge(&self) -> EdgeMode {
        self.edge
    }

    #[must_use]
    pub fn default_value(&self) -> Texel {
        self.default
    }

    #[must_use]
    pub fn front_id(&self) -> BufferId {
        self.buffers[self.front].id
    }

    #[must_use]
    pub fn back_id(&self) -> BufferId {
        self.buffers[1 - self.front].id
    }

    /// Номер тика, на котором поле было записано последним
    #[must_use]
    pub fn last_written(&self) -> Option<u64> {
        self.last_written
    }

    fn split_mut(&mut self) -> (&[f32], &mut [f32]) {
        let [a, b] = &mut self.buffers;
        if self.front == 0 {
            (a.data.as_slice(), b.data.as_mut_slice())
        } else {
            (b.data.as_slice(), a.data.as_mut_slice())
        }
    }
}

/// Реестр именованных полей одной сетки
#[derive(Debug)]
pub struct FieldStore {
    id: u64,
    grid: Grid,
    fields: Vec<Field>,
    by_name: HashMap<String, FieldId>,
    next_buffer: u64,
}

impl FieldStore {
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            grid,
            fields: Vec::new(),
            by_name: HashMap::new(),
            next_buffer: 0,
        }
    }

    #[must_use]
    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub(crate) fn store_id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Создаёт поле с двумя буферами, заполненными `default` по каналам
    ///
    /// Нехватка памяти обнаруживается здесь, а не во время тиков.
    pub fn allocate(
        &mut self,
        name: &str,
        channels: usize,
        default: &[f32],
        edge: EdgeMode,
    ) -> Result<FieldId> {
        if self.by_name.contains_key(name) {
            return Err(SimError::DuplicateField(name.to_string()));
        }
        if !(1..=MAX_CHANNELS).contains(&channels) {
            return Err(SimError::InvalidChannels {
                field: name.to_string(),
                channels,
            });
        }
        if default.len() != channels {
            return Err(SimError::DefaultMismatch {
                field: name.to_string(),
                expected: channels,
                found: default.len(),
            });
        }

        let mut fill = [0.0; MAX_CHANNELS];
        fill[..channels].copy_from_slice(default);

        let front = self.new_buffer(name, channels, &fill)?;
        let back = self.new_buffer(name, channels, &fill)?;

        let id = FieldId(self.fields.len());
        self.fields.push(Field {
            name: name.to_string(),
            channels,
            edge,
            default: fill,
            buffers: [front, back],
            front: 0,
            last_written: None,
        });
        self.by_name.insert(name.to_string(), id);

        log::info!(
            "allocated field '{name}' ({channels} ch, {}x{}, {edge:?})",
            self.grid.width,
            self.grid.height
        );
        Ok(id)
    }

    fn new_buffer(&mut self, name: &str, channels: usize, fill: &Texel) -> Result<Buffer> {
        let alloc_error = |reason: String| SimError::Allocation {
            field: name.to_string(),
            width: self.grid.width,
            height: self.grid.height,
            reason,
        };
        let len = self
            .grid
            .cells()
            .checked_mul(channels)
            .ok_or_else(|| alloc_error("size overflow".to_string()))?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| alloc_error(e.to_string()))?;
        for _ in 0..self.grid.cells() {
            data.extend_from_slice(&fill[..channels]);
        }

        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        Ok(Buffer { id, data })
    }

    #[must_use]
    pub fn id(&self, name: &str) -> Option<FieldId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &Field)> {
        self.fields.iter().enumerate().map(|(i, f)| (FieldId(i), f))
    }

    /// Текущее (переднее) состояние поля
    #[must_use]
    pub fn front(&self, id: FieldId) -> FieldView<'_> {
        let field = &self.fields[id.0];
        FieldView {
            grid: self.grid,
            channels: field.channels,
            edge: field.edge,
            data: &field.buffers[field.front].data,
        }
    }

    #[must_use]
    pub fn view(&self, name: &str) -> Option<FieldView<'_>> {
        self.id(name).map(|id| self.front(id))
    }

    /// Перезаписывает передний буфер поля; предназначено для начальной настройки
    pub fn init_front<F>(&mut self, id: FieldId, mut f: F)
    where
        F: FnMut(usize, usize, &mut [f32]),
    {
        let grid = self.grid;
        let field = &mut self.fields[id.0];
        let channels = field.channels;
        let front = field.front;
        let data = &mut field.buffers[front].data;
        for (i, texel) in data.chunks_exact_mut(channels).enumerate() {
            f(i % grid.width, i / grid.width, texel);
        }
    }

    /// Передние буферы всех полей для чтения, задние для записи
    pub(crate) fn split_for_pass(&mut self) -> (Vec<FieldView<'_>>, Vec<Option<&mut [f32]>>) {
        let grid = self.grid;
        let mut views = Vec::with_capacity(self.fields.len());
        let mut backs = Vec::with_capacity(self.fields.len());
        for field in &mut self.fields {
            let channels = field.channels;
            let edge = field.edge;
            let (front, back) = field.split_mut();
            views.push(FieldView {
                grid,
                channels,
                edge,
                data: front,
            });
            backs.push(Some(back));
        }
        (views, backs)
    }

    /// Глобальный обмен ролей буферов для полей, записанных за тик
    pub(crate) fn swap(&mut self, written: &[FieldId], tick: u64) {
        for id in written {
            let field = &mut self.fields[id.0];
            field.front = 1 - field.front;
            field.last_written = Some(tick);
        }
    }
}

/// Сводка по одному каналу поля
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub non_finite: usize,
}

/// Неизменяемый снимок буфера поля с выборкой по краевому режиму
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    grid: Grid,
    channels: usize,
    edge: EdgeMode,
    data: &'a [f32],
}

impl<'a> FieldView<'a> {
    #[must_use]
    pub fn grid(&self) -> Grid {
        self.grid
    }

    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[must_use]
    pub fn edge(&self) -> EdgeMode {
        self.edge
    }

    #[must_use]
    pub fn data(&self) -> &'a [f32] {
        self.data
    }

    #[must_use]
    pub fn at(&self, x: usize, y: usize) -> Texel {
        let start = self.grid.index(x, y) * self.channels;
        let mut texel = [0.0; MAX_CHANNELS];
        texel[..self.channels].copy_from_slice(&self.data[start..start + self.channels]);
        texel
    }

    #[must_use]
    pub fn fetch(&self, x: isize, y: isize) -> Texel {
        let (x, y) = self.grid.resolve(x, y, self.edge);
        self.at(x, y)
    }

    /// Соседи по четырём сторонам в порядке: север (+y), юг, восток (+x), запад
    #[must_use]
    pub fn neighbors(&self, x: usize, y: usize) -> [Texel; 4] {
        let (x, y) = (x as isize, y as isize);
        [
            self.fetch(x, y + 1),
            self.fetch(x, y - 1),
            self.fetch(x + 1, y),
            self.fetch(x - 1, y),
        ]
    }

    /// Билинейная выборка в непрерывных координатах ячеек
    ///
    /// Координата сначала приводится в пределы сетки, так что сколь угодно
    /// далёкая точка не переполняет индексы. Нечисловая координата читает край `0`.
    #[must_use]
    pub fn sample(&self, p: Vec2) -> Texel {
        let px = self.reduce(p.x, self.grid.width);
        let py = self.reduce(p.y, self.grid.height);
        let x0 = px.floor();
        let y0 = py.floor();
        let fx = px - x0;
        let fy = py - y0;
        let (xi, yi) = (x0 as isize, y0 as isize);

        let a = self.fetch(xi, yi);
        let b = self.fetch(xi + 1, yi);
        let c = self.fetch(xi, yi + 1);
        let d = self.fetch(xi + 1, yi + 1);

        let mut out = [0.0; MAX_CHANNELS];
        for k in 0..self.channels {
            let bottom = a[k] + (b[k] - a[k]) * fx;
            let top = c[k] + (d[k] - c[k]) * fx;
            out[k] = bottom + (top - bottom) * fy;
        }
        out
    }

    fn reduce(&self, v: f32, n: usize) -> f32 {
        if !v.is_finite() {
            return 0.0;
        }
        match self.edge {
            EdgeMode::Wrap => v.rem_euclid(n as f32),
            EdgeMode::Clamp => v.clamp(0.0, (n - 1) as f32),
        }
    }

    pub fn channel(&self, channel: usize) -> impl Iterator<Item = f32> + 'a {
        self.data
            .iter()
            .skip(channel)
            .step_by(self.channels)
            .copied()
    }

    #[must_use]
    pub fn stats(&self, channel: usize) -> ChannelStats {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        let mut non_finite = 0usize;
        for v in self.channel(channel) {
            if !v.is_finite() {
                non_finite += 1;
                continue;
            }
            min = min.min(v);
            max = max.max(v);
            sum += f64::from(v);
            count += 1;
        }
        let mean = if count > 0 { (sum / count as f64) as f32 } else { 0.0 };
        ChannelStats {
            min,
            max,
            mean,
            non_finite,
        }
    }
}
