use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    #[error("invalid range: to `{to}` must not precede from `{from}`")]
    InvalidRange { from: i64, to: i64 },
    #[error("timestamp not tracked: `{0}`")]
    TimestampNotFound(i64),
}

