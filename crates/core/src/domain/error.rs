// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Malformed task: {0}")]
    MalformedTask(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
