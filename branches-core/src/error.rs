use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no glyph shape for character {0:?}")]
    MissingGlyph(char),

    #[error("invalid shape for glyph {glyph:?}: {reason}")]
    InvalidShape { glyph: String, reason: String },

    #[error("failed to read catalogue: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalogue: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_shape(glyph: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            glyph: glyph.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
