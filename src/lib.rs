//! A parser for MediaWiki wikitext which never rejects its input and always
//! renders back to exactly the text it was given.
//!
//! Parsing produces a [`Wikicode`] tree of [`nodes`]. The tree can be
//! searched and edited, and edits keep every untouched byte of the original
//! text intact.
//!
//! ```
//! let code = wikiparse::parse("{{cleanup}} Some ''text''.").unwrap();
//! code.replace("{{cleanup}}", "{{stub}}", true).unwrap();
//! assert_eq!(code.to_string(), "{{stub}} Some ''text''.");
//! ```

pub mod nodes;
mod shared_list;
mod utils;
mod wikicode;
pub mod wikitext;

pub use nodes::HeadingRangeError;
pub use shared_list::{SharedList, StepView};
pub use utils::{Anything, parse_anything};
pub use wikicode::{Needle, SectionFilter, Wikicode};
pub use wikitext::{Context, Parser, ParserError, Token, build, tokenize};

/// A tree editing error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The tokenizer and the tree builder disagreed.
    #[error(transparent)]
    Parser(#[from] ParserError),
    /// A value could not be used for the requested operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The thing to edit is not there.
    #[error("not found: {0}")]
    NotFound(String),
    /// A heading level was out of range.
    #[error(transparent)]
    HeadingRange(#[from] HeadingRangeError),
    /// A search pattern was not a valid regular expression.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Parses `text` in the default context.
///
/// Use [`Parser`] to start in another context or to treat `''` and `'''` as
/// plain text.
pub fn parse(text: &str) -> Result<Wikicode, Error> {
    Ok(Parser::new().parse(text)?)
}
