use coa_types::CodeError;

#[derive(Debug, thiserror::Error)]
pub enum CoaError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to create data directory: {0}")]
    DataDirCreation(std::io::Error),
    #[error("failed to read store file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write store file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize store contents: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize store file: {0}")]
    Deserialization(serde_json::Error),
    #[error("invalid certificate code: {0}")]
    Code(#[from] CodeError),
    #[error("record not found: {0}")]
    RecordNotFound(String),
    #[error("record position {0} is out of range")]
    PositionOutOfRange(usize),
    #[error("username already exists: {0}")]
    DuplicateUsername(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
}

pub type CoaResult<T> = std::result::Result<T, CoaError>;
