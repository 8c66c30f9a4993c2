use std::f32::consts::PI;

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::TerrainSettings;
use crate::grid::Grid;

/// Генерирует начальный рельеф, бесшовный по обеим осям
///
/// По `x` шум берётся на цилиндре, по `y` зеркально относительно середины,
/// так что верхний и нижний края совпадают. Результат в `[0, max_elevation]`.
#[must_use]
pub fn generate_elevation(seed: u64, grid: Grid, terrain: &TerrainSettings) -> Vec<f32> {
    let Grid { width, height } = grid;
    let width_f = width as f32;
    let height_f = height as f32;

    // Параметры для цилиндрической проекции
    let radius = width_f / (2.0 * PI);

    let mut noise = FastNoiseLite::new();
    noise.set_seed(Some(seed as i32));
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_fractal_type(Some(FractalType::FBm));
    noise.set_fractal_octaves(Some(terrain.octaves));
    noise.set_frequency(Some(terrain.frequency));

    let sample = |i: usize| {
        let x = (i % width) as f32;
        let y = (i / width) as f32;

        let angle = (x / width_f) * 2.0 * PI;
        let nx = radius * angle.cos();
        let nz = radius * angle.sin();
        let ny = y.min(height_f - y);

        (noise.get_noise_3d(nx, ny, nz) + 1.0) * 0.5
    };

    #[cfg(feature = "parallel")]
    let mut data: Vec<f32> = (0..grid.cells()).into_par_iter().map(sample).collect();
    #[cfg(not(feature = "parallel"))]
    let mut data: Vec<f32> = (0..grid.cells()).map(sample).collect();

    if terrain.smooth_radius > 0 {
        smooth_elevation(&mut data, width, height, terrain.smooth_radius);
    }

    for h in &mut data {
        *h = h.max(0.0).powf(terrain.elevation_power);
    }

    // Нормализация
    let min_h = data.iter().fold(f32::INFINITY, |a, &b| a.min(b));
    let max_h = data.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    if max_h > min_h {
        for h in &mut data {
            *h = (*h - min_h) / (max_h - min_h) * terrain.max_elevation;
        }
    } else {
        data.fill(0.0);
    }

    data
}

/// Сглаживание скользящим средним, зацикленное по обеим осям
pub fn smooth_elevation(data: &mut [f32], width: usize, height: usize, radius: usize) {
    if radius == 0 || radius >= width || radius >= height {
        return;
    }

    let r = radius as isize;
    let count = (2 * r + 1) as f32;
    let wrap = |v: isize, n: usize| v.rem_euclid(n as isize) as usize;
    let mut temp = vec![0.0; data.len()];

    // 1. Горизонтальный проход
    for y in 0..height {
        let row = y * width;
        let mut window_sum: f32 = (-r..=r).map(|dx| data[row + wrap(dx, width)]).sum();

        for x in 0..width {
            temp[row + x] = window_sum / count;

            // Сдвигаем окно: убираем левый пиксель, добавляем правый
            let left = wrap(x as isize - r, width);
            let right = wrap(x as isize + r + 1, width);
            window_sum += data[row + right] - data[row + left];
        }
    }

    // 2. Вертикальный проход
    for x in 0..width {
        let mut window_sum: f32 = (-r..=r).map(|dy| temp[wrap(dy, height) * width + x]).sum();

        for y in 0..height {
            data[y * width + x] = window_sum / count;

            let top = wrap(y as isize - r, height);
            let bottom = wrap(y as isize + r + 1, height);
            window_sum += temp[bottom * width + x] - temp[top * width + x];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_is_deterministic_and_normalised() {
        let grid = Grid::new(64, 32).unwrap();
        let terrain = TerrainSettings {
            max_elevation: 2.0,
            ..TerrainSettings::default()
        };
        let a = generate_elevation(42, grid, &terrain);
        let b = generate_elevation(42, grid, &terrain);
        assert_eq!(a, b);
        assert_eq!(a.len(), grid.cells());

        let max = a.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let min = a.iter().copied().fold(f32::INFINITY, f32::min);
        assert!(min >= 0.0);
        assert!((max - 2.0).abs() < 1e-5);
    }

    #[test]
    fn mirrored_rows_match() {
        let grid = Grid::new(32, 32).unwrap();
        let terrain = TerrainSettings {
            smooth_radius: 0,
            ..TerrainSettings::default()
        };
        let data = generate_elevation(7, grid, &terrain);
        // строки y и height - y берут один и тот же шум
        for x in 0..32 {
            assert_eq!(data[grid.index(x, 1)], data[grid.index(x, 31)]);
        }
    }

    #[test]
    fn smoothing_spreads_spike_across_wrap() {
        let (w, h) = (6, 6);
        let mut data = vec![0.0; w * h];
        data[0] = 9.0;
        smooth_elevation(&mut data, w, h, 1);

        let total: f32 = data.iter().sum();
        assert!((total - 9.0).abs() < 1e-4);
        assert!((data[(h - 1) * w + (w - 1)] - 1.0).abs() < 1e-5);
        assert!(data[3 * w + 3].abs() < 1e-6);
    }
}
