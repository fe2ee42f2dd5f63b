//! Ошибки генератора карт

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    /// Обращение к клетке вне `[0, width) × [0, height)`
    #[error("координата ({x}, {y}) вне сетки {width}×{height}")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    /// Недопустимые параметры — отклоняются до начала генерации
    #[error("недопустимая конфигурация: {0}")]
    InvalidConfiguration(String),

    #[error("ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("ошибка разбора TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("ошибка изображения: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, MapError>;
