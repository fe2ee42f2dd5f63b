use crate::grid::HexGrid;
use log::debug;
use serde::{Deserialize, Serialize};

/// Квантили, делящие высоты на пять полос (≈ 15/20/30/20/15 %)
pub const BIOME_QUANTILES: [f64; 4] = [0.15, 0.35, 0.65, 0.85];

/// Диапазон прозрачности внутри одного биома: от самой низкой клетки к самой высокой
const MIN_TRANSPARENCY: f64 = 0.4;
const TRANSPARENCY_SPAN: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Biome {
    Water,
    Sand,
    Grass,
    Forest,
    Mountain,
    Unknown,
}

impl Biome {
    /// Биомы в порядке возрастания высоты
    pub const ALL: [Biome; 5] = [
        Biome::Water,
        Biome::Sand,
        Biome::Grass,
        Biome::Forest,
        Biome::Mountain,
    ];

    pub fn to_rgb(&self) -> [u8; 3] {
        match self {
            Biome::Water => [30, 144, 255],     // dodgerblue
            Biome::Sand => [244, 164, 96],      // sandybrown
            Biome::Grass => [144, 238, 144],    // lightgreen
            Biome::Forest => [0, 100, 0],       // darkgreen
            Biome::Mountain => [211, 211, 211], // lightgray
            Biome::Unknown => [255, 255, 255],
        }
    }

    /// Высокие клетки — кандидаты в истоки рек
    #[must_use]
    pub fn is_highland(self) -> bool {
        matches!(self, Biome::Forest | Biome::Mountain)
    }

    /// Биом по высоте: первая полоса, чей порог строго выше высоты
    #[must_use]
    pub fn from_elevation(elevation: f64, thresholds: &QuantileThresholds) -> Self {
        let [water, sand, grass, forest] = thresholds.0;
        if elevation < water {
            Biome::Water
        } else if elevation < sand {
            Biome::Sand
        } else if elevation < grass {
            Biome::Grass
        } else if elevation < forest {
            Biome::Forest
        } else {
            Biome::Mountain
        }
    }
}

/// Пороговые высоты для квантилей [`BIOME_QUANTILES`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantileThresholds(pub [f64; 4]);

impl QuantileThresholds {
    #[must_use]
    pub fn from_elevations(elevations: &[f64]) -> Self {
        let mut sorted = elevations.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self(BIOME_QUANTILES.map(|q| quantile_sorted(&sorted, q)))
    }
}

/// Квантиль с линейной интерполяцией между соседними порядковыми статистиками
///
/// `sorted` должен быть отсортирован; для пустого среза возвращается `NaN`.
#[must_use]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// Перцентиль (0–100) несортированных значений
#[must_use]
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, p / 100.0)
}

/// Назначает биом каждой клетке по квантилям высот и нормирует прозрачность
///
/// Возвращает вычисленные пороги.
pub fn classify_terrain(grid: &mut HexGrid) -> QuantileThresholds {
    let thresholds = QuantileThresholds::from_elevations(grid.elevations());
    debug!("пороги биомов: {:?}", thresholds.0);

    let biomes: Vec<Biome> = grid
        .elevations()
        .iter()
        .map(|&h| Biome::from_elevation(h, &thresholds))
        .collect();
    grid.biomes_mut().copy_from_slice(&biomes);

    assign_transparency(grid);
    thresholds
}

/// Прозрачность внутри биома: `0.4 + 0.6 * (h - min) / range`
///
/// Более высокие клетки одного биома получают большую непрозрачность.
/// Если все клетки биома одной высоты, `range = 1`.
pub fn assign_transparency(grid: &mut HexGrid) {
    let mut bounds: [Option<(f64, f64)>; 6] = [None; 6];
    for (&h, &b) in grid.elevations().iter().zip(grid.biomes()) {
        let slot = &mut bounds[b as usize];
        *slot = Some(match *slot {
            Some((lo, hi)) => (lo.min(h), hi.max(h)),
            None => (h, h),
        });
    }

    let alphas: Vec<f64> = grid
        .elevations()
        .iter()
        .zip(grid.biomes())
        .map(|(&h, &b)| {
            let Some((lo, hi)) = bounds[b as usize] else {
                return 1.0;
            };
            let range = if hi > lo { hi - lo } else { 1.0 };
            let normalized = (h - lo) / range;
            (MIN_TRANSPARENCY + normalized * TRANSPARENCY_SPAN).clamp(0.0, 1.0)
        })
        .collect();
    grid.transparencies_mut().copy_from_slice(&alphas);
}
