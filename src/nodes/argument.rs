use crate::{Anything, Error, Wikicode, parse_anything};
use core::fmt;

/// A template argument.
///
/// ```wikitext
/// {{{name}}} {{{name|default}}}
/// ```
#[derive(Debug)]
pub struct Argument {
    /// The argument name.
    pub(crate) name: Wikicode,
    /// The value used when the argument is not given.
    pub(crate) default: Option<Wikicode>,
}

impl Argument {
    /// Creates a new argument without a default.
    pub fn new(name: impl Into<Anything>) -> Result<Self, Error> {
        Ok(Self {
            name: parse_anything(name)?,
            default: None,
        })
    }

    /// The argument name.
    #[must_use]
    pub fn name(&self) -> &Wikicode {
        &self.name
    }

    /// Replaces the argument name.
    pub fn set_name(&mut self, name: impl Into<Anything>) -> Result<(), Error> {
        self.name = parse_anything(name)?;
        Ok(())
    }

    /// The default value, if there is one.
    #[must_use]
    pub fn default(&self) -> Option<&Wikicode> {
        self.default.as_ref()
    }

    /// Replaces the default value. [`Anything::Nothing`] removes it.
    pub fn set_default(&mut self, default: impl Into<Anything>) -> Result<(), Error> {
        self.default = match default.into() {
            Anything::Nothing => None,
            default => Some(parse_anything(default)?),
        };
        Ok(())
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{{{}", self.name)?;
        if let Some(default) = &self.default {
            write!(f, "|{default}")?;
        }
        f.write_str("}}}")
    }
}
