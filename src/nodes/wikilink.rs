use crate::{Anything, Error, Wikicode, parse_anything};
use core::fmt;

/// An internal link.
///
/// ```wikitext
/// [[Title]] [[Title|text]]
/// ```
#[derive(Debug)]
pub struct Wikilink {
    /// The link target.
    pub(crate) title: Wikicode,
    /// The link text, if it differs from the target.
    pub(crate) text: Option<Wikicode>,
}

impl Wikilink {
    /// Creates a new link without text.
    pub fn new(title: impl Into<Anything>) -> Result<Self, Error> {
        Ok(Self {
            title: parse_anything(title)?,
            text: None,
        })
    }

    /// The link target.
    #[must_use]
    pub fn title(&self) -> &Wikicode {
        &self.title
    }

    /// Replaces the link target.
    pub fn set_title(&mut self, title: impl Into<Anything>) -> Result<(), Error> {
        self.title = parse_anything(title)?;
        Ok(())
    }

    /// The link text.
    #[must_use]
    pub fn text(&self) -> Option<&Wikicode> {
        self.text.as_ref()
    }

    /// Replaces the link text. [`Anything::Nothing`] removes it.
    pub fn set_text(&mut self, text: impl Into<Anything>) -> Result<(), Error> {
        self.text = match text.into() {
            Anything::Nothing => None,
            text => Some(parse_anything(text)?),
        };
        Ok(())
    }
}

impl fmt::Display for Wikilink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[{}", self.title)?;
        if let Some(text) = &self.text {
            write!(f, "|{text}")?;
        }
        f.write_str("]]")
    }
}
