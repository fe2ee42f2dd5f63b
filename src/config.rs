// src/config.rs
//! Конфигурация генерации карты
//!
//! Этот модуль определяет все параметры, управляющие процедурной генерацией:
//! - Размеры гексагональной сетки и сид
//! - Параметры синтеза рельефа (diamond-square)
//! - Количество проходов сглаживания
//! - Параметры речной сети и выбора истоков
//! - Предел дистанции для BFS-запросов
//!
//! Все структуры поддерживают сериализацию в TOML/JSON для удобной настройки через конфигурационные файлы.
//! Квантили биомов (0.15/0.35/0.65/0.85) намеренно не вынесены в параметры — см. [`crate::biome::BIOME_QUANTILES`].

use crate::error::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Настройки синтеза высот
///
/// Управляет амплитудой шума, скоростью его затухания и начальными значениями углов.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElevationSettings {
    /// Начальная амплитуда шума `R0`: на первом шаге возмущение берётся из `[-R0, R0]`
    #[serde(default = "default_noise_magnitude")]
    pub noise_magnitude: f64,

    /// Множитель затухания шума после каждого шага:
    /// - ближе к `0.0` → гладкий рельеф (мелкие детали почти без шума),
    /// - ближе к `1.0` → рваный рельеф.
    #[serde(default = "default_noise_decay")]
    pub noise_decay: f64,

    /// Нижняя граница случайных высот четырёх углов сетки
    #[serde(default = "default_corner_min")]
    pub corner_min: f64,

    /// Верхняя граница случайных высот четырёх углов сетки
    #[serde(default = "default_corner_max")]
    pub corner_max: f64,

    /// Зацикливание выборки при синтезе:
    /// - `true` → крайние строки/столбцы считаются соседями противоположного края
    ///   (только для усреднения, мир при этом не тороидальный),
    /// - `false` → соседи за границей просто не участвуют.
    #[serde(default = "default_wrap_synthesis")]
    pub wrap_synthesis: bool,
}

fn default_noise_magnitude() -> f64 {
    120.0
}
fn default_noise_decay() -> f64 {
    0.6
}
fn default_corner_min() -> f64 {
    50.0
}
fn default_corner_max() -> f64 {
    150.0
}
fn default_wrap_synthesis() -> bool {
    true
}

impl Default for ElevationSettings {
    fn default() -> Self {
        Self {
            noise_magnitude: 120.0,
            noise_decay: 0.6,
            corner_min: 50.0,
            corner_max: 150.0,
            wrap_synthesis: true,
        }
    }
}

/// Настройки сглаживания одиночных пиков
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmoothingSettings {
    /// Количество проходов (каждый проход читает только снимок предыдущего)
    #[serde(default = "default_smoothing_passes")]
    pub passes: usize,
}

fn default_smoothing_passes() -> usize {
    3
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self { passes: 3 }
    }
}

/// Настройки речной сети
///
/// Управляет ветвлением рек и выбором истоков среди высоких клеток.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiverSettings {
    /// Вероятность ответвления в каждый дополнительный спуск (`0.0..=1.0`)
    #[serde(default = "default_branch_probability")]
    pub branch_probability: f64,

    /// Множитель вероятности для вложенных ответвлений:
    /// чем глубже ветка, тем реже она делится.
    #[serde(default = "default_branch_decay")]
    pub branch_decay: f64,

    /// Перцентиль высоты (0–100), выше которого клетка может стать истоком
    #[serde(default = "default_high_point_percentile")]
    pub high_point_percentile: f64,

    /// Делитель числа истоков: `N = max(min_rivers, high_points / seed_divisor)`
    #[serde(default = "default_seed_divisor")]
    pub seed_divisor: usize,

    /// Минимальное количество рек
    #[serde(default = "default_min_rivers")]
    pub min_rivers: usize,
}

fn default_branch_probability() -> f64 {
    0.25
}
fn default_branch_decay() -> f64 {
    0.7
}
fn default_high_point_percentile() -> f64 {
    70.0
}
fn default_seed_divisor() -> usize {
    40
}
fn default_min_rivers() -> usize {
    3
}

impl Default for RiverSettings {
    fn default() -> Self {
        Self {
            branch_probability: 0.25,
            branch_decay: 0.7,
            high_point_percentile: 70.0,
            seed_divisor: 40,
            min_rivers: 3,
        }
    }
}

/// Настройки запросов расстояния
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistanceSettings {
    /// Максимальное количество шагов для BFS по кольцам
    #[serde(default = "default_max_distance")]
    pub max_distance: usize,
}

fn default_max_distance() -> usize {
    3
}

impl Default for DistanceSettings {
    fn default() -> Self {
        Self { max_distance: 3 }
    }
}

/// Основные параметры генерации карты
///
/// Полная конфигурация для генерации одной карты. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Сид генератора случайных чисел (детерминированная генерация)
    #[serde(default)]
    pub seed: u64,

    /// Количество столбцов сетки (по умолчанию 33)
    #[serde(default = "default_width")]
    pub width: usize,

    /// Количество строк сетки (по умолчанию 33)
    #[serde(default = "default_height")]
    pub height: usize,

    /// Настройки синтеза высот
    #[serde(default)]
    pub elevation: ElevationSettings,

    /// Настройки сглаживания
    #[serde(default)]
    pub smoothing: SmoothingSettings,

    /// Настройки речной сети
    #[serde(default)]
    pub rivers: RiverSettings,

    /// Настройки BFS-запросов
    #[serde(default)]
    pub distance: DistanceSettings,
}

impl GenerationParams {
    /// Загружает параметры из TOML-файла
    ///
    /// # Аргументы
    /// * `path` - путь к файлу конфигурации в формате TOML
    ///
    /// # Ошибки
    /// Возвращает ошибку, если файл не найден, содержит недопустимый формат
    /// или значения не проходят [`GenerationParams::validate`].
    ///
    /// # Пример
    /// ```toml
    /// # map.toml
    /// seed = 42
    /// width = 17
    /// height = 17
    ///
    /// [rivers]
    /// branch_probability = 0.3
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Разбирает параметры из строки TOML и сразу проверяет их
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let params: Self = toml::from_str(contents)?;
        params.validate()?;
        Ok(params)
    }

    /// Проверяет параметры до начала генерации
    ///
    /// Ничего не исправляет молча: первое нарушение возвращается как
    /// [`MapError::InvalidConfiguration`].
    pub fn validate(&self) -> Result<()> {
        if self.width < 2 || self.height < 2 {
            return Err(invalid(format!(
                "размеры сетки должны быть не меньше 2×2, получено {}×{}",
                self.width, self.height
            )));
        }

        let elevation = &self.elevation;
        if !elevation.noise_magnitude.is_finite() || elevation.noise_magnitude < 0.0 {
            return Err(invalid(format!(
                "noise_magnitude должна быть конечной и неотрицательной, получено {}",
                elevation.noise_magnitude
            )));
        }
        if !(elevation.noise_decay > 0.0 && elevation.noise_decay <= 1.0) {
            return Err(invalid(format!(
                "noise_decay должен лежать в (0, 1], получено {}",
                elevation.noise_decay
            )));
        }
        if !elevation.corner_min.is_finite()
            || !elevation.corner_max.is_finite()
            || elevation.corner_min > elevation.corner_max
        {
            return Err(invalid(format!(
                "диапазон углов [{}, {}] некорректен",
                elevation.corner_min, elevation.corner_max
            )));
        }

        if self.smoothing.passes == 0 {
            return Err(invalid("количество проходов сглаживания должно быть положительным"));
        }

        let rivers = &self.rivers;
        if !(0.0..=1.0).contains(&rivers.branch_probability) {
            return Err(invalid(format!(
                "branch_probability должна лежать в [0, 1], получено {}",
                rivers.branch_probability
            )));
        }
        if !(0.0..=1.0).contains(&rivers.branch_decay) {
            return Err(invalid(format!(
                "branch_decay должен лежать в [0, 1], получено {}",
                rivers.branch_decay
            )));
        }
        if !(0.0..=100.0).contains(&rivers.high_point_percentile) {
            return Err(invalid(format!(
                "high_point_percentile должен лежать в [0, 100], получено {}",
                rivers.high_point_percentile
            )));
        }
        if rivers.seed_divisor == 0 {
            return Err(invalid("seed_divisor должен быть положительным"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> MapError {
    MapError::InvalidConfiguration(message.into())
}

fn default_width() -> usize {
    33
}
fn default_height() -> usize {
    33
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            seed: 0,
            width: 33,
            height: 33,
            elevation: ElevationSettings::default(),
            smoothing: SmoothingSettings::default(),
            rivers: RiverSettings::default(),
            distance: DistanceSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GenerationParams::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let params = GenerationParams::from_toml_str(
            r#"
            seed = 42
            width = 9

            [rivers]
            branch_probability = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(params.seed, 42);
        assert_eq!(params.width, 9);
        assert_eq!(params.height, 33);
        assert_eq!(params.rivers.branch_probability, 0.5);
        assert_eq!(params.rivers.branch_decay, 0.7);
        assert_eq!(params.elevation, ElevationSettings::default());
        assert_eq!(params.smoothing.passes, 3);
    }

    #[test]
    fn test_rejects_small_grid() {
        let params = GenerationParams {
            width: 1,
            ..GenerationParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(MapError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_probability_out_of_range() {
        let mut params = GenerationParams::default();
        params.rivers.branch_probability = 1.5;
        assert!(matches!(
            params.validate(),
            Err(MapError::InvalidConfiguration(_))
        ));

        params.rivers.branch_probability = -0.1;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_passes_and_divisor() {
        let mut params = GenerationParams::default();
        params.smoothing.passes = 0;
        assert!(params.validate().is_err());

        let mut params = GenerationParams::default();
        params.rivers.seed_divisor = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_corner_range() {
        let mut params = GenerationParams::default();
        params.elevation.corner_min = 200.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_value_is_rejected_on_load() {
        let result = GenerationParams::from_toml_str("width = 0");
        assert!(matches!(result, Err(MapError::InvalidConfiguration(_))));
    }
}
