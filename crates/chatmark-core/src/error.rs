use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown side {0:?} (expected \"left\" or \"right\")")]
    UnknownSide(String),
}
