use std::fmt;

/// Errors produced by the region allocator, the atlas and the frame driver.
///
/// None of these are transient; callers get them synchronously from the
/// mutating call and nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A region (or dimensions table) operation would exceed its fixed capacity.
    ///
    /// The state of the allocator is exactly what it was before the call.
    OutOfMemory {
        /// Total bytes (or entries) the operation would have required.
        required: u64,
        /// Fixed capacity of the region (or table).
        capacity: u64,
    },

    /// A referenced image or font source does not exist or failed to decode.
    ///
    /// Raised before the packer or canvas is touched for the failing batch.
    InvalidSource {
        source: String,
        reason: String,
    },

    /// No encoding range of a font covers the requested codepoint.
    UnsupportedCharacter(u32),

    /// A blit was attempted outside the current canvas bounds.
    ///
    /// This indicates the packer and canvas went out of sync and is never an
    /// expected outcome.
    AtlasBoundsExceeded {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },
}

impl Error {
    pub(crate) fn invalid_source(source: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::InvalidSource {
            source: source.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfMemory { required, capacity } => {
                write!(f, "out of video memory: {required} required, capacity is {capacity}")
            }
            Error::InvalidSource { source, reason } => {
                write!(f, "invalid source '{source}': {reason}")
            }
            Error::UnsupportedCharacter(cp) => match char::from_u32(*cp) {
                Some(c) => write!(f, "unsupported character {c:?} (U+{cp:04X})"),
                None => write!(f, "unsupported character U+{cp:04X}"),
            },
            Error::AtlasBoundsExceeded { x, y, width, height, canvas_width, canvas_height } => {
                write!(
                    f,
                    "tried to write {width}x{height} at ({x}, {y}) out of atlas bounds \
                     ({canvas_width}x{canvas_height})"
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result alias used throughout the engine.
pub type Result<T, E = Error> = std::result::Result<T, E>;
