//! Memory images: preloaded contents for ROM and RAM blocks.

use hashbrown::HashMap;
use netlist_ir::{MemoryBlock, MemoryKind, Program, Word};

use crate::error::ImageError;

/// The parsed contents of one image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImage {
    /// The optional `addr_width:word_width` header, checked against the
    /// block's geometry at load time.
    pub geometry: Option<(u32, u32)>,
    /// The image words, in address order.
    pub words: Vec<Word>,
}

/// Parses an image file: whitespace-separated binary words, optionally
/// preceded by an `addr_width:word_width` header. `#` starts a comment
/// running to the end of the line.
pub fn parse_image(source: &str) -> Result<ParsedImage, ImageError> {
    let mut geometry = None;
    let mut words = Vec::new();

    let tokens = source
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace);

    for (index, token) in tokens.enumerate() {
        if index == 0 {
            if let Some((addr, word)) = token.split_once(':') {
                let addr = addr.parse().map_err(|_| malformed(token))?;
                let word = word.parse().map_err(|_| malformed(token))?;
                geometry = Some((addr, word));
                continue;
            }
        }
        words.push(Word::from_str_radix(token, 2).map_err(|_| malformed(token))?);
    }

    Ok(ParsedImage { geometry, words })
}

fn malformed(token: &str) -> ImageError {
    ImageError::MalformedWord {
        token: token.to_owned(),
    }
}

/// A set of memory images, keyed by block name.
///
/// The name of a block is the name of the register its `ROM`/`RAM`
/// instruction writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    blocks: HashMap<String, ParsedImage>,
}

impl MemoryImage {
    /// Creates an empty image set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the image for a block, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, image: ParsedImage) {
        self.blocks.insert(name.into(), image);
    }

    /// Registers a plain word vector for a block.
    pub fn insert_words(&mut self, name: impl Into<String>, words: Vec<Word>) {
        self.insert(
            name,
            ParsedImage {
                geometry: None,
                words,
            },
        );
    }

    /// Materializes the word banks of every block of `program`, in block
    /// index order.
    ///
    /// Every image must name a block of the program and fit its geometry. A
    /// ROM block without an image is an error; a RAM block without one is
    /// zero-filled with a warning.
    pub(crate) fn banks_for(&self, program: &Program) -> Result<Vec<Vec<Word>>, ImageError> {
        for name in self.blocks.keys() {
            if program.memory_by_name(name).is_none() {
                return Err(ImageError::UnknownBlock { name: name.clone() });
            }
        }

        program
            .memories()
            .iter()
            .map(|block| {
                let name = program.register_name(block.output());
                match self.blocks.get(name.as_ref()) {
                    Some(image) => checked_bank(&name, block, image),
                    None if block.kind() == MemoryKind::Rom => Err(ImageError::MissingRomImage {
                        name: name.into_owned(),
                    }),
                    None => {
                        tracing::warn!(block = %name, "RAM block has no image, zero-filling");
                        Ok(vec![0; block.len()])
                    }
                }
            })
            .collect()
    }
}

fn checked_bank(
    name: &str,
    block: &MemoryBlock,
    image: &ParsedImage,
) -> Result<Vec<Word>, ImageError> {
    if let Some((addr, word)) = image.geometry {
        if (addr, word) != (block.addr_width().get(), block.word_width().get()) {
            return Err(ImageError::GeometryMismatch {
                name: name.to_owned(),
                found_addr: addr,
                found_word: word,
                addr_width: block.addr_width().get(),
                word_width: block.word_width().get(),
            });
        }
    }

    if image.words.len() != block.len() {
        return Err(ImageError::WrongLength {
            name: name.to_owned(),
            expected: block.len(),
            found: image.words.len(),
        });
    }

    if let Some((index, &value)) = image
        .words
        .iter()
        .enumerate()
        .find(|(_, &value)| value > block.word_width().mask())
    {
        return Err(ImageError::WordTooWide {
            name: name.to_owned(),
            index,
            value,
            width: block.word_width().get(),
        });
    }

    Ok(image.words.clone())
}
