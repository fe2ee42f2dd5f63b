//! Гексагональная сетка со смещёнными строками
//!
//! Хранит высоты, биомы, прозрачность и отметки рек в плотных векторах
//! (индекс `y * width + x`). Любой доступ за пределами сетки — ошибка
//! [`MapError::OutOfBounds`], значение по умолчанию молча не возвращается.

use crate::biome::Biome;
use crate::error::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Координата клетки: `x` — столбец, `y` — строка
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    #[must_use]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Соседи в чётной строке
const EVEN_ROW: [(isize, isize); 6] = [(1, 0), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1)];
/// Соседи в нечётной строке (сдвинута вправо на полклетки)
const ODD_ROW: [(isize, isize); 6] = [(1, 0), (1, 1), (0, 1), (-1, 0), (0, -1), (1, -1)];

#[derive(Debug, Clone)]
pub struct HexGrid {
    width: usize,
    height: usize,
    elevation: Vec<f64>,
    biome: Vec<Biome>,
    transparency: Vec<f64>,
    river: Vec<bool>,
}

impl HexGrid {
    /// Создаёт сетку с нулевыми высотами, биомом `Unknown` и прозрачностью `1.0`
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MapError::InvalidConfiguration(format!(
                "размеры сетки должны быть положительными, получено {width}×{height}"
            )));
        }
        let len = width * height;
        Ok(Self {
            width,
            height,
            elevation: vec![0.0; len],
            biome: vec![Biome::Unknown; len],
            transparency: vec![1.0; len],
            river: vec![false; len],
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elevation.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elevation.is_empty()
    }

    #[must_use]
    pub fn contains(&self, c: Coord) -> bool {
        c.x < self.width && c.y < self.height
    }

    fn index(&self, c: Coord) -> Result<usize> {
        if self.contains(c) {
            Ok(c.y * self.width + c.x)
        } else {
            Err(MapError::OutOfBounds {
                x: c.x,
                y: c.y,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Индекс без проверки — только для координат, полученных от самой сетки
    pub(crate) fn index_unchecked(&self, c: Coord) -> usize {
        c.y * self.width + c.x
    }

    pub(crate) fn coord_at(&self, idx: usize) -> Coord {
        Coord::new(idx % self.width, idx / self.width)
    }

    pub fn elevation(&self, c: Coord) -> Result<f64> {
        Ok(self.elevation[self.index(c)?])
    }

    pub fn set_elevation(&mut self, c: Coord, value: f64) -> Result<()> {
        let idx = self.index(c)?;
        self.elevation[idx] = value;
        Ok(())
    }

    pub fn biome(&self, c: Coord) -> Result<Biome> {
        Ok(self.biome[self.index(c)?])
    }

    pub fn set_biome(&mut self, c: Coord, biome: Biome) -> Result<()> {
        let idx = self.index(c)?;
        self.biome[idx] = biome;
        Ok(())
    }

    pub fn transparency(&self, c: Coord) -> Result<f64> {
        Ok(self.transparency[self.index(c)?])
    }

    /// Прозрачность вне `[0, 1]` не принимается
    pub fn set_transparency(&mut self, c: Coord, value: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&value) {
            return Err(MapError::InvalidConfiguration(format!(
                "прозрачность должна лежать в [0, 1], получено {value}"
            )));
        }
        let idx = self.index(c)?;
        self.transparency[idx] = value;
        Ok(())
    }

    pub fn is_river(&self, c: Coord) -> Result<bool> {
        Ok(self.river[self.index(c)?])
    }

    pub fn mark_river(&mut self, c: Coord) -> Result<()> {
        let idx = self.index(c)?;
        self.river[idx] = true;
        Ok(())
    }

    /// Все высоты в порядке строк
    #[must_use]
    pub fn elevations(&self) -> &[f64] {
        &self.elevation
    }

    pub(crate) fn elevations_mut(&mut self) -> &mut [f64] {
        &mut self.elevation
    }

    #[must_use]
    pub fn biomes(&self) -> &[Biome] {
        &self.biome
    }

    pub(crate) fn biomes_mut(&mut self) -> &mut [Biome] {
        &mut self.biome
    }

    #[must_use]
    pub fn transparencies(&self) -> &[f64] {
        &self.transparency
    }

    pub(crate) fn transparencies_mut(&mut self) -> &mut [f64] {
        &mut self.transparency
    }

    /// Все координаты в порядке строк
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.len()).map(|idx| self.coord_at(idx))
    }

    /// Соседи клетки без зацикливания (не больше 6, порядок фиксирован и зависит от чётности строки)
    pub fn neighbors(&self, c: Coord) -> Result<Vec<Coord>> {
        self.index(c)?;
        Ok(self.neighbors_unchecked(c))
    }

    pub(crate) fn neighbors_unchecked(&self, c: Coord) -> Vec<Coord> {
        let offsets = if c.y % 2 == 0 { &EVEN_ROW } else { &ODD_ROW };
        offsets
            .iter()
            .filter_map(|&(dx, dy)| {
                let nx = c.x.checked_add_signed(dx)?;
                let ny = c.y.checked_add_signed(dy)?;
                (nx < self.width && ny < self.height).then(|| Coord::new(nx, ny))
            })
            .collect()
    }

    /// Самая высокая клетка (при равенстве — первая в порядке строк)
    #[must_use]
    pub fn highest(&self) -> (Coord, f64) {
        let mut best = 0;
        for (idx, &h) in self.elevation.iter().enumerate() {
            if h > self.elevation[best] {
                best = idx;
            }
        }
        (self.coord_at(best), self.elevation[best])
    }
}
