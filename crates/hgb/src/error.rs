pub type HgbResult<T> = Result<T, HgbError>;

macro_rules! bail {
    ($($arg:tt)*) => {{
        return Err($crate::error::HgbError::Other(format!($($arg)*)));
    }};
}

pub(crate) use bail;

#[derive(Debug, thiserror::Error)]
pub enum HgbError {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error("{0}")]
    Other(String),
}

impl HgbError {
    #[inline]
    pub fn other<T: ToString>(s: T) -> Self {
        Self::Other(s.to_string())
    }
}
