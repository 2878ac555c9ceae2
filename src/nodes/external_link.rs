use super::StripOptions;
use crate::{Anything, Error, Wikicode, parse_anything};
use core::fmt;

/// An external link.
///
/// ```wikitext
/// [https://example.com title] [https://example.com] https://example.com
/// ```
#[derive(Debug)]
pub struct ExternalLink {
    /// The link target.
    pub(crate) url: Wikicode,
    /// The link title, for bracketed links.
    pub(crate) title: Option<Wikicode>,
    /// Whether the link is wrapped in brackets.
    pub(crate) brackets: bool,
    /// Whether the title starts right after the URL, without a space. This
    /// happens when the title starts with something which cannot be part of a
    /// URL, like a tag.
    pub(crate) suppress_space: bool,
}

impl ExternalLink {
    /// Creates a new link.
    pub fn new(url: impl Into<Anything>, brackets: bool) -> Result<Self, Error> {
        Ok(Self {
            url: parse_anything(url)?,
            title: None,
            brackets,
            suppress_space: false,
        })
    }

    /// The link target.
    #[must_use]
    pub fn url(&self) -> &Wikicode {
        &self.url
    }

    /// Replaces the link target.
    pub fn set_url(&mut self, url: impl Into<Anything>) -> Result<(), Error> {
        self.url = parse_anything(url)?;
        Ok(())
    }

    /// The link title.
    #[must_use]
    pub fn title(&self) -> Option<&Wikicode> {
        self.title.as_ref()
    }

    /// Replaces the link title. [`Anything::Nothing`] removes it.
    pub fn set_title(&mut self, title: impl Into<Anything>) -> Result<(), Error> {
        self.title = match title.into() {
            Anything::Nothing => None,
            title => Some(parse_anything(title)?),
        };
        self.suppress_space = false;
        Ok(())
    }

    /// Whether the link is wrapped in brackets.
    #[must_use]
    pub fn brackets(&self) -> bool {
        self.brackets
    }

    /// Sets whether the link is wrapped in brackets.
    pub fn set_brackets(&mut self, brackets: bool) {
        self.brackets = brackets;
    }

    /// Whether the title follows the URL without a space.
    #[must_use]
    pub fn suppress_space(&self) -> bool {
        self.suppress_space
    }

    /// Returns the printable text of the link.
    pub(super) fn strip(&self, options: StripOptions) -> Option<String> {
        if self.brackets {
            self.title
                .as_ref()
                .filter(|title| !title.is_empty())
                .map(|title| title.strip_code(options))
        } else {
            Some(self.url.strip_code(options))
        }
    }
}

impl fmt::Display for ExternalLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.brackets {
            return write!(f, "{}", self.url);
        }
        write!(f, "[{}", self.url)?;
        if let Some(title) = &self.title {
            if !self.suppress_space {
                f.write_str(" ")?;
            }
            write!(f, "{title}")?;
        }
        f.write_str("]")
    }
}
