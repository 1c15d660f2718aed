use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("generation service error: {0}")]
    Service(String),

    #[error("mail dispatch error: {0}")]
    Mail(String),

    #[error("static catalog exhausted: every catalog topic has already been learned")]
    ExhaustedCatalog,

    #[error("no novel topic after {attempts} generation attempts")]
    DuplicateTopic { attempts: u32 },
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Service(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Config(e.to_string())
    }
}
