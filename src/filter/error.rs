use thiserror::Error;

/// Errors that can occur while turning filter text into tokens
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unterminated string literal starting at offset {start}")]
    UnterminatedStringLiteral { start: usize },
}
