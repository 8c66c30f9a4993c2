//! Ошибки движка
//!
//! Все ошибки конфигурации обнаруживаются при сборке конвейера или выделении
//! полей. Во время тика ошибок не бывает: расходящиеся значения ограничиваются
//! в самих проходах.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("field '{0}' is already allocated")]
    DuplicateField(String),

    #[error("field '{field}' requests {channels} channels, supported range is 1..=4")]
    InvalidChannels { field: String, channels: usize },

    #[error("field '{field}' default value has {found} channels, expected {expected}")]
    DefaultMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("cannot allocate field '{field}' on a {width}x{height} grid: {reason}")]
    Allocation {
        field: String,
        width: usize,
        height: usize,
        reason: String,
    },

    #[error("pass '{pass}' references unallocated field '{field}'")]
    UnknownField { pass: String, field: String },

    #[error("pass '{pass}' expects field '{field}' with {expected} channels, found {found}")]
    ChannelMismatch {
        pass: String,
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("field '{field}' is written by both '{first}' and '{second}'")]
    OutputConflict {
        field: String,
        first: String,
        second: String,
    },

    #[error("pipeline was built against a different field store")]
    StoreMismatch,

    #[error("invalid grid size {width}x{height}")]
    InvalidGrid { width: usize, height: usize },

    #[error("invalid parameter: {0}")]
    InvalidParams(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("image export error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, SimError>;
