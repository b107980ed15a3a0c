//! Error types for sqlupload-split

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Unterminated tag starting at byte {offset}")]
    UnterminatedTag { offset: usize },

    #[error("Unterminated attribute value in tag starting at byte {offset}")]
    UnterminatedAttribute { offset: usize },

    #[error("Unterminated comment starting at byte {offset}")]
    UnterminatedComment { offset: usize },

    #[error("Unterminated declaration starting at byte {offset}")]
    UnterminatedDeclaration { offset: usize },

    #[error("Unterminated raw text element <{tag}> starting at byte {offset}")]
    UnterminatedRawText { tag: String, offset: usize },

    #[error("Content is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },
}

impl Error {
    pub(crate) fn utf8(e: std::str::Utf8Error) -> Self {
        Self::InvalidUtf8 {
            valid_up_to: e.valid_up_to(),
        }
    }
}
