/// Core error type for the bot.
///
/// Adapter crates (Telegram, carrier HTTP) map their specific errors into
/// this type so the command router and the poll worker can handle failures
/// consistently (user-facing message vs retry-next-cycle).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("provider '{0}' already exists")]
    DuplicateProvider(String),

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
