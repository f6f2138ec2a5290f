//! Ошибки sync-слоя
//!
//! Все ошибки — construction-time (ассет или код собран неправильно).
//! Retry/деградации нет: построение просто прерывается.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Нода не mesh и не group (свет, камера и т.п.)
    #[error("unsupported node kind `{kind}` (node `{node}`)")]
    UnsupportedNodeKind { kind: String, node: String },

    #[error("could not find descendant `{name}` in `{group}` (known: {})", known.join(", "))]
    DescendantNotFound {
        name: String,
        group: String,
        known: Vec<String>,
    },

    /// Имена частей должны быть уникальны во всём поддереве
    #[error("duplicate part name `{name}` under `{group}`")]
    DuplicatePartName { name: String, group: String },

    #[error("failed to load model at `{path}`: {reason}")]
    AssetLoad { path: String, reason: String },

    #[error("invalid settings: {0}")]
    Config(String),

    #[error("vehicle requested before a model was laid out")]
    MissingModel,

    /// Одна модель на session
    #[error("a model is already installed in this session")]
    ModelAlreadyLoaded,
}

pub type SyncResult<T> = Result<T, SyncError>;
