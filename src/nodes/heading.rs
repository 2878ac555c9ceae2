use crate::{Anything, Error, Wikicode, parse_anything};
use core::fmt;

/// A conversion error for out-of-range heading levels.
#[derive(Debug, thiserror::Error)]
#[error("{0} is not a valid heading level")]
pub struct HeadingRangeError(usize);

/// A heading level.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct HeadingLevel(u8);

impl From<HeadingLevel> for u8 {
    fn from(value: HeadingLevel) -> Self {
        value.0
    }
}

impl From<HeadingLevel> for usize {
    fn from(value: HeadingLevel) -> Self {
        value.0.into()
    }
}

impl TryFrom<usize> for HeadingLevel {
    type Error = HeadingRangeError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(level @ 1..=6) => Ok(Self(level)),
            _ => Err(HeadingRangeError(value)),
        }
    }
}

/// A section heading.
///
/// ```wikitext
/// == Title ==
/// ```
#[derive(Debug)]
pub struct Heading {
    /// Everything between the runs of `=`.
    pub(crate) title: Wikicode,
    /// The number of `=` on each side.
    pub(crate) level: HeadingLevel,
}

impl Heading {
    /// Creates a new heading.
    pub fn new(title: impl Into<Anything>, level: usize) -> Result<Self, Error> {
        Ok(Self {
            title: parse_anything(title)?,
            level: level.try_into()?,
        })
    }

    /// The heading title.
    #[must_use]
    pub fn title(&self) -> &Wikicode {
        &self.title
    }

    /// Replaces the heading title.
    pub fn set_title(&mut self, title: impl Into<Anything>) -> Result<(), Error> {
        self.title = parse_anything(title)?;
        Ok(())
    }

    /// The heading level.
    #[must_use]
    pub fn level(&self) -> HeadingLevel {
        self.level
    }

    /// Changes the heading level, which must be between 1 and 6.
    pub fn set_level(&mut self, level: usize) -> Result<(), Error> {
        self.level = level.try_into()?;
        Ok(())
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marks = "=".repeat(self.level.into());
        write!(f, "{marks}{}{marks}", self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        assert!(HeadingLevel::try_from(0).is_err());
        assert!(HeadingLevel::try_from(7).is_err());
        assert!(HeadingLevel::try_from(300).is_err());
        let level = HeadingLevel::try_from(3).unwrap();
        assert_eq!(u8::from(level), 3);
    }

    #[test]
    fn set_level() {
        let mut heading = Heading::new(" Title ", 2).unwrap();
        assert_eq!(heading.to_string(), "== Title ==");
        assert!(matches!(heading.set_level(7), Err(Error::HeadingRange(_))));
        assert_eq!(heading.to_string(), "== Title ==");
        heading.set_level(4).unwrap();
        assert_eq!(heading.to_string(), "==== Title ====");
    }
}
