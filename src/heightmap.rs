use crate::config::ElevationSettings;
use crate::grid::HexGrid;
use log::debug;
use rand::Rng;

/// Наибольшая степень двойки, не превосходящая `n` (0 для `n == 0`)
fn largest_power_of_two(n: usize) -> usize {
    if n == 0 { 0 } else { 1 << n.ilog2() }
}

fn perturbation<R: Rng + ?Sized>(rng: &mut R, magnitude: f64) -> f64 {
    if magnitude > 0.0 {
        rng.gen_range(-magnitude..=magnitude)
    } else {
        0.0
    }
}

/// Состояние одного прогона diamond-square
///
/// `assigned` отмечает клетки, которым уже записано значение: в фазе квадрата
/// только они участвуют в усреднении.
struct Synthesizer<'a> {
    data: &'a mut [f64],
    assigned: Vec<bool>,
    width: usize,
    height: usize,
    wrap: bool,
}

impl<'a> Synthesizer<'a> {
    fn new(data: &'a mut [f64], width: usize, height: usize, wrap: bool) -> Self {
        data.fill(0.0);
        let assigned = vec![false; data.len()];
        Self {
            data,
            assigned,
            width,
            height,
            wrap,
        }
    }

    /// Индекс клетки `(x + dx, y + dy)`: с зацикливанием по модулю или `None` за границей
    fn resolve(&self, x: usize, dx: isize, y: usize, dy: isize) -> Option<usize> {
        let (nx, ny) = if self.wrap {
            (
                (x as isize + dx).rem_euclid(self.width as isize) as usize,
                (y as isize + dy).rem_euclid(self.height as isize) as usize,
            )
        } else {
            let nx = x.checked_add_signed(dx).filter(|&v| v < self.width)?;
            let ny = y.checked_add_signed(dy).filter(|&v| v < self.height)?;
            (nx, ny)
        };
        Some(ny * self.width + nx)
    }

    fn write(&mut self, idx: usize, value: f64) {
        self.data[idx] = value;
        self.assigned[idx] = true;
    }

    fn seed_corners<R: Rng + ?Sized>(&mut self, settings: &ElevationSettings, rng: &mut R) {
        let (w, h) = (self.width, self.height);
        for (x, y) in [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)] {
            let value = rng.gen_range(settings.corner_min..=settings.corner_max);
            self.write(y * w + x, value);
        }
    }

    /// Фаза ромба: центр каждого квадрата со стороной `step` = среднее углов + шум
    fn diamond<R: Rng + ?Sized>(&mut self, step: usize, magnitude: f64, rng: &mut R) {
        let half = (step / 2) as isize;
        let s = step as isize;
        for x in (0..self.width).step_by(step) {
            for y in (0..self.height).step_by(step) {
                let Some(mid) = self.resolve(x, half, y, half) else {
                    continue;
                };
                let corners: Vec<f64> = [(0, 0), (s, 0), (0, s), (s, s)]
                    .iter()
                    .filter_map(|&(dx, dy)| self.resolve(x, dx, y, dy))
                    .map(|idx| self.data[idx])
                    .collect();
                if corners.is_empty() {
                    continue;
                }
                let avg = corners.iter().sum::<f64>() / corners.len() as f64;
                self.write(mid, avg + perturbation(rng, magnitude));
            }
        }
    }

    /// Фаза квадрата: середины рёбер = среднее уже заданных соседей на расстоянии `step / 2` + шум
    fn square<R: Rng + ?Sized>(&mut self, step: usize, magnitude: f64, rng: &mut R) {
        let half = step / 2;
        let h = half as isize;
        for x in (0..self.width).step_by(half) {
            for y in ((x + half) % step..self.height).step_by(step) {
                let neighbors: Vec<f64> = [(0, -h), (0, h), (-h, 0), (h, 0)]
                    .iter()
                    .filter_map(|&(dx, dy)| self.resolve(x, dx, y, dy))
                    .filter(|&idx| self.assigned[idx])
                    .map(|idx| self.data[idx])
                    .collect();
                // Ни одного заданного соседа — запись пропускаем
                if neighbors.is_empty() {
                    continue;
                }
                let avg = neighbors.iter().sum::<f64>() / neighbors.len() as f64;
                self.write(y * self.width + x, avg + perturbation(rng, magnitude));
            }
        }
    }

    fn run<R: Rng + ?Sized>(&mut self, settings: &ElevationSettings, rng: &mut R) {
        self.seed_corners(settings, rng);

        let mut step = largest_power_of_two(self.width.min(self.height) - 1);
        let mut magnitude = settings.noise_magnitude;

        while step > 0 {
            // step == 1 уже ничего не добавляет, иначе бесконечное деление
            if step / 2 == 0 {
                break;
            }
            debug!("diamond-square: шаг {step}, амплитуда шума {magnitude:.3}");
            self.diamond(step, magnitude, rng);
            self.square(step, magnitude, rng);

            magnitude *= settings.noise_decay;
            step /= 2;
        }
    }
}

/// Заполняет высоты сетки алгоритмом diamond-square
///
/// Сначала четыре угла получают случайные высоты из `[corner_min, corner_max]`,
/// затем на каждом масштабе (начиная с наибольшей степени двойки `≤ min(W, H) - 1`)
/// выполняются фазы ромба и квадрата, а амплитуда шума умножается на `noise_decay`.
///
/// При `wrap_synthesis` индексы берутся по модулю ширины/высоты: так углы всей
/// сетки участвуют в усреднении, даже если шаг не делит `W - 1`/`H - 1`.
/// На соседство клеток в остальных фазах это не влияет.
pub fn synthesize_elevation<R: Rng + ?Sized>(
    grid: &mut HexGrid,
    settings: &ElevationSettings,
    rng: &mut R,
) {
    let (width, height) = (grid.width(), grid.height());
    Synthesizer::new(grid.elevations_mut(), width, height, settings.wrap_synthesis)
        .run(settings, rng);
}

/// Сглаживание одиночных пиков
///
/// Каждая клетка становится средним своей высоты и средней высоты соседей
/// (без зацикливания). Все клетки прохода читают снимок предыдущего прохода,
/// поэтому порядок обхода не влияет на результат.
pub fn smooth_elevation(grid: &mut HexGrid, passes: usize) {
    for pass in 0..passes {
        let snapshot = grid.elevations().to_vec();
        let smoothed: Vec<f64> = (0..snapshot.len())
            .map(|idx| {
                let neighbors = grid.neighbors_unchecked(grid.coord_at(idx));
                if neighbors.is_empty() {
                    return snapshot[idx];
                }
                let sum: f64 = neighbors
                    .iter()
                    .map(|&n| snapshot[grid.index_unchecked(n)])
                    .sum();
                (snapshot[idx] + sum / neighbors.len() as f64) / 2.0
            })
            .collect();
        grid.elevations_mut().copy_from_slice(&smoothed);
        debug!("сглаживание: проход {} из {passes}", pass + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Coord;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn flat_corners(wrap: bool) -> ElevationSettings {
        ElevationSettings {
            noise_magnitude: 0.0,
            corner_min: 100.0,
            corner_max: 100.0,
            wrap_synthesis: wrap,
            ..ElevationSettings::default()
        }
    }

    #[test]
    fn test_largest_power_of_two() {
        assert_eq!(largest_power_of_two(0), 0);
        assert_eq!(largest_power_of_two(1), 1);
        assert_eq!(largest_power_of_two(8), 8);
        assert_eq!(largest_power_of_two(9), 8);
        assert_eq!(largest_power_of_two(32), 32);
        assert_eq!(largest_power_of_two(63), 32);
    }

    #[test]
    fn test_same_seed_gives_identical_elevations() {
        let settings = ElevationSettings::default();
        let run = |seed| {
            let mut grid = HexGrid::new(17, 13).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            synthesize_elevation(&mut grid, &settings, &mut rng);
            grid.elevations().to_vec()
        };

        let a = run(7);
        let b = run(7);
        assert!(a.iter().zip(&b).all(|(x, y)| x.to_bits() == y.to_bits()));
        assert_ne!(a, run(8));
    }

    #[test]
    fn test_corners_seeded_in_range() {
        let settings = ElevationSettings::default();
        let mut data = vec![0.0; 12 * 7];
        let mut synth = Synthesizer::new(&mut data, 12, 7, true);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        synth.seed_corners(&settings, &mut rng);

        for idx in [0, 11, 6 * 12, 6 * 12 + 11] {
            assert!(synth.assigned[idx]);
            assert!((50.0..=150.0).contains(&synth.data[idx]));
        }
        assert_eq!(synth.assigned.iter().filter(|&&a| a).count(), 4);
    }

    #[test]
    fn test_power_of_two_grid_is_fully_assigned() {
        for size in [5, 9, 17] {
            let mut data = vec![0.0; size * size];
            let mut synth = Synthesizer::new(&mut data, size, size, true);
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            synth.run(&ElevationSettings::default(), &mut rng);
            assert!(synth.assigned.iter().all(|&a| a), "{size}×{size}");
        }
    }

    #[test]
    fn test_wrapped_diamond_samples_opposite_edge() {
        // 5×5, шаг 4: угол (4, 0) «видит» через край столбец 3 (= 8 mod 5),
        // ещё пустой (0), поэтому центр (1, 2) = (100 + 0 + 100 + 0) / 4.
        let settings = flat_corners(true);
        let mut data = vec![0.0; 25];
        let mut synth = Synthesizer::new(&mut data, 5, 5, true);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        synth.seed_corners(&settings, &mut rng);
        synth.diamond(4, 0.0, &mut rng);

        assert_eq!(synth.data[2 * 5 + 2], 100.0);
        assert_eq!(synth.data[2 * 5 + 1], 50.0);
        assert_eq!(synth.data[5 + 2], 50.0);
        assert_eq!(synth.data[5 + 1], 25.0);
    }

    #[test]
    fn test_bounded_diamond_skips_outside_midpoints() {
        let settings = flat_corners(false);
        let mut data = vec![0.0; 25];
        let mut synth = Synthesizer::new(&mut data, 5, 5, false);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        synth.seed_corners(&settings, &mut rng);
        synth.diamond(4, 0.0, &mut rng);

        assert_eq!(synth.data[2 * 5 + 2], 100.0);
        // Углы + единственный центр
        assert_eq!(synth.assigned.iter().filter(|&&a| a).count(), 5);
    }

    #[test]
    fn test_square_ignores_unassigned_neighbors() {
        let settings = flat_corners(false);
        let mut data = vec![0.0; 25];
        let mut synth = Synthesizer::new(&mut data, 5, 5, false);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        synth.seed_corners(&settings, &mut rng);
        synth.diamond(4, 0.0, &mut rng);
        synth.square(4, 0.0, &mut rng);

        // Середины рёбер усредняют только заданные клетки — нули не подмешиваются
        for idx in [2, 2 * 5, 2 * 5 + 4, 4 * 5 + 2] {
            assert!(synth.assigned[idx]);
            assert_eq!(synth.data[idx], 100.0);
        }
    }

    #[test]
    fn test_bounded_square_skips_cells_without_assigned_neighbors() {
        // Задан только угол (0, 0): у (2, 4) и (4, 2) нет заданных соседей
        let mut data = vec![0.0; 25];
        let mut synth = Synthesizer::new(&mut data, 5, 5, false);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        synth.write(0, 100.0);
        synth.square(4, 0.0, &mut rng);

        assert_eq!(synth.data[2 * 5], 100.0);
        assert_eq!(synth.data[2], 100.0);
        for idx in [4 * 5 + 2, 2 * 5 + 4] {
            assert!(!synth.assigned[idx]);
            assert_eq!(synth.data[idx], 0.0);
        }
        assert_eq!(synth.assigned.iter().filter(|&&a| a).count(), 3);
    }

    #[test]
    fn test_wrap_changes_result() {
        let synth = |wrap| {
            let mut grid = HexGrid::new(9, 9).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(5);
            let settings = ElevationSettings {
                wrap_synthesis: wrap,
                ..ElevationSettings::default()
            };
            synthesize_elevation(&mut grid, &settings, &mut rng);
            grid.elevations().to_vec()
        };
        assert_ne!(synth(true), synth(false));
    }

    #[test]
    fn test_single_row_grid_only_seeds_corners() {
        let mut grid = HexGrid::new(6, 1).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        synthesize_elevation(&mut grid, &ElevationSettings::default(), &mut rng);

        let written = grid.elevations().iter().filter(|&&h| h != 0.0).count();
        assert_eq!(written, 2);
    }

    #[test]
    fn test_smoothing_never_creates_new_extrema() {
        let mut grid = HexGrid::new(9, 9).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        synthesize_elevation(&mut grid, &ElevationSettings::default(), &mut rng);

        let min = grid.elevations().iter().copied().fold(f64::INFINITY, f64::min);
        let max = grid
            .elevations()
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        for passes in [1, 3, 10] {
            let mut smoothed = grid.clone();
            smooth_elevation(&mut smoothed, passes);
            for &h in smoothed.elevations() {
                assert!(h <= max + 1e-9 && h >= min - 1e-9);
            }
        }
    }

    #[test]
    fn test_smoothing_reads_snapshot() {
        // Один пик в центре 3×3: результат не зависит от порядка обхода
        let mut grid = HexGrid::new(3, 3).unwrap();
        grid.set_elevation(Coord::new(1, 1), 12.0).unwrap();
        smooth_elevation(&mut grid, 1);

        // Пик: (12 + 0) / 2
        assert_eq!(grid.elevation(Coord::new(1, 1)).unwrap(), 6.0);
        // (0, 0): соседи (1, 0), (0, 1) — пик не среди них
        assert_eq!(grid.elevation(Coord::new(0, 0)).unwrap(), 0.0);
        // (1, 0): соседи (2, 0), (1, 1), (0, 1), (0, 0) → среднее 3, итог 1.5
        assert_eq!(grid.elevation(Coord::new(1, 0)).unwrap(), 1.5);
    }

    #[test]
    fn test_smoothing_keeps_isolated_cell() {
        let mut grid = HexGrid::new(1, 1).unwrap();
        grid.set_elevation(Coord::new(0, 0), 42.5).unwrap();
        smooth_elevation(&mut grid, 3);
        assert_eq!(grid.elevation(Coord::new(0, 0)).unwrap(), 42.5);
    }

    #[test]
    fn test_smoothing_reduces_spread() {
        let mut grid = HexGrid::new(9, 9).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        synthesize_elevation(&mut grid, &ElevationSettings::default(), &mut rng);

        let variance = |g: &HexGrid| {
            let data = g.elevations();
            let mean = data.iter().sum::<f64>() / data.len() as f64;
            data.iter().map(|h| (h - mean).powi(2)).sum::<f64>() / data.len() as f64
        };

        let before = variance(&grid);
        smooth_elevation(&mut grid, 3);
        let after = variance(&grid);
        assert!(after < before);
        assert!(after > 0.0);
    }
}
