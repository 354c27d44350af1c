use thiserror::Error;

#[derive(Error, Debug)]
pub enum SublineError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Unknown mapping target '{0}' (expected Client.*, Account.* or Subscriber.*)")]
    UnknownMappingTarget(String),

    #[error("Duplicate mapping target '{0}'")]
    DuplicateMappingTarget(String),

    #[error("Mapping file error: {0}")]
    MappingFile(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, SublineError>;
