use crate::biome::{Biome, QuantileThresholds, classify_terrain};
use crate::config::GenerationParams;
use crate::error::Result;
use crate::grid::{Coord, HexGrid};
use crate::heightmap::{smooth_elevation, synthesize_elevation};
use crate::rivers::{RiverNetwork, generate_rivers};
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Результат одного прогона генерации
#[derive(Debug, Clone)]
pub struct World {
    pub seed: u64,
    pub grid: HexGrid,
    pub thresholds: QuantileThresholds,
    pub rivers: RiverNetwork,
}

/// Краткая сводка по карте (для CLI и логов)
#[derive(Debug, Clone, Serialize)]
pub struct WorldSummary {
    pub seed: u64,
    pub width: usize,
    pub height: usize,
    pub thresholds: [f64; 4],
    pub biomes: BTreeMap<Biome, usize>,
    pub rivers: usize,
    pub segments: usize,
    pub river_cells: usize,
    pub highest: Coord,
    pub highest_elevation: f64,
}

impl World {
    #[must_use]
    pub fn summary(&self) -> WorldSummary {
        let mut biomes: BTreeMap<Biome, usize> = Biome::ALL.iter().map(|&b| (b, 0)).collect();
        for &b in self.grid.biomes() {
            *biomes.entry(b).or_insert(0) += 1;
        }
        let river_cells = self
            .grid
            .coords()
            .filter(|&c| self.grid.is_river(c).unwrap_or(false))
            .count();
        let (highest, highest_elevation) = self.grid.highest();

        WorldSummary {
            seed: self.seed,
            width: self.grid.width(),
            height: self.grid.height(),
            thresholds: self.thresholds.0,
            biomes,
            rivers: self.rivers.seeds().len(),
            segments: self.rivers.len(),
            river_cells,
            highest,
            highest_elevation,
        }
    }
}

/// Полная генерация одной карты
///
/// Фазы идут строго по порядку и владеют сеткой эксклюзивно: синтез высот,
/// сглаживание, классификация, реки. Все случайные решения берутся из одного
/// `ChaCha8Rng`, засеянного `params.seed`, поэтому результат детерминирован.
pub fn generate_world(params: &GenerationParams) -> Result<World> {
    params.validate()?;
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut grid = HexGrid::new(params.width, params.height)?;

    info!(
        "Генерация карты {}×{} (сид {})",
        params.width, params.height, params.seed
    );

    // === 1. Рельеф (diamond-square) ===
    synthesize_elevation(&mut grid, &params.elevation, &mut rng);

    // === 2. Сглаживание одиночных пиков ===
    smooth_elevation(&mut grid, params.smoothing.passes);

    // === 3. Биомы и прозрачность ===
    let thresholds = classify_terrain(&mut grid);

    // === 4. Реки ===
    let rivers = generate_rivers(&grid, &params.rivers, &mut rng)?;
    rivers.apply_to(&mut grid)?;

    info!(
        "Готово: {} рек, {} сегментов",
        rivers.seeds().len(),
        rivers.len()
    );

    Ok(World {
        seed: params.seed,
        grid,
        thresholds,
        rivers,
    })
}

/// Генерирует независимые карты для списка сидов
///
/// Каждый прогон владеет своей сеткой и генератором, поэтому с фичей
/// `parallel` карты строятся параллельно через rayon. Порядок результата
/// совпадает с порядком сидов.
pub fn generate_worlds(params: &GenerationParams, seeds: &[u64]) -> Result<Vec<World>> {
    params.validate()?;
    let run = |&seed: &u64| {
        generate_world(&GenerationParams {
            seed,
            ..params.clone()
        })
    };

    #[cfg(feature = "parallel")]
    let worlds: Result<Vec<World>> = seeds.par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let worlds: Result<Vec<World>> = seeds.iter().map(run).collect();

    worlds
}
