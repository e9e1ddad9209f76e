//! Errors surfaced by scheduling and memory image loading.

/// Scheduling failed because the combinational equations form a cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("combinational cycle through register `{register}`; break it with a REG")]
pub struct ScheduleError {
    /// Display name of one register on the cycle.
    pub register: String,
}

/// A memory image could not be parsed or does not fit its block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ImageError {
    /// The image names a register that owns no memory block.
    #[error("`{name}` does not name a memory block")]
    UnknownBlock {
        /// The unmatched name.
        name: String,
    },
    /// The image holds the wrong number of words for its block.
    #[error("memory block `{name}` holds {expected} words, the image provides {found}")]
    WrongLength {
        /// Block name.
        name: String,
        /// `2^addr_width`, the block's word count.
        expected: usize,
        /// Word count of the image.
        found: usize,
    },
    /// A word of the image does not fit the block's word width.
    #[error("word {index} of image `{name}` ({value:#b}) exceeds {width} bits")]
    WordTooWide {
        /// Block name.
        name: String,
        /// Position of the offending word.
        index: usize,
        /// The offending value.
        value: u64,
        /// Word width of the block.
        width: u32,
    },
    /// The image declares a geometry different from the block's.
    #[error(
        "image `{name}` declares geometry {found_addr}:{found_word}, \
         the block is {addr_width}:{word_width}"
    )]
    GeometryMismatch {
        /// Block name.
        name: String,
        /// Address width declared by the image header.
        found_addr: u32,
        /// Word width declared by the image header.
        found_word: u32,
        /// Address width of the block.
        addr_width: u32,
        /// Word width of the block.
        word_width: u32,
    },
    /// A ROM block has no image at simulation start.
    #[error("ROM block `{name}` has no memory image")]
    MissingRomImage {
        /// Block name.
        name: String,
    },
    /// A token of an image file is not a binary word.
    #[error("`{token}` is not a binary word")]
    MalformedWord {
        /// The rejected token.
        token: String,
    },
}
