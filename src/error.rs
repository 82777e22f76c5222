use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeraldError {
    #[error("Invalid timestamp on task {task_id}: {value}")]
    InvalidTimestamp { task_id: String, value: String },

    #[error("Subject lookup failed: {0}")]
    SubjectLookup(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HeraldError>;
