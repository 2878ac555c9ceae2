use crate::{Error, wikitext::config};
use core::fmt;

/// A character reference.
///
/// ```wikitext
/// &Sigma; &#931; &#x3a3;
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HtmlEntity {
    /// The entity name, or the digits of a numeric reference.
    pub(crate) value: String,
    /// Whether this is a named reference.
    pub(crate) named: bool,
    /// Whether this is a hexadecimal numeric reference.
    pub(crate) hexadecimal: bool,
    /// The case of the `x` in a hexadecimal reference.
    pub(crate) hex_char: char,
}

impl HtmlEntity {
    /// Creates a named reference like `&amp;`.
    pub fn named(name: &str) -> Result<Self, Error> {
        let mut entity = Self {
            value: String::new(),
            named: true,
            hexadecimal: false,
            hex_char: 'x',
        };
        entity.set_value(name)?;
        Ok(entity)
    }

    /// Creates a numeric reference like `&#38;` or `&#x26;` for `c`.
    #[must_use]
    pub fn numeric(c: char, hexadecimal: bool) -> Self {
        let value = if hexadecimal {
            format!("{:x}", u32::from(c))
        } else {
            u32::from(c).to_string()
        };
        Self {
            value,
            named: false,
            hexadecimal,
            hex_char: 'x',
        }
    }

    /// The entity name, or the digits of a numeric reference.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replaces the name or digits of the reference. The new value must
    /// still refer to a valid character.
    pub fn set_value(&mut self, value: &str) -> Result<(), Error> {
        let valid = if self.named {
            config::named_entity(value).is_some()
        } else {
            parse_code_point(value, self.hexadecimal).is_some()
        };
        if !valid {
            return Err(Error::InvalidArgument(format!(
                "{value:?} is not a valid character reference"
            )));
        }
        value.clone_into(&mut self.value);
        Ok(())
    }

    /// Whether this is a named reference.
    #[must_use]
    pub fn is_named(&self) -> bool {
        self.named
    }

    /// Whether this is a hexadecimal numeric reference.
    #[must_use]
    pub fn hexadecimal(&self) -> bool {
        self.hexadecimal
    }

    /// The `x` or `X` of a hexadecimal reference.
    #[must_use]
    pub fn hex_char(&self) -> char {
        self.hex_char
    }

    /// Returns the text which the reference stands for.
    #[must_use]
    pub fn normalize(&self) -> String {
        if self.named {
            config::named_entity(&self.value)
                .unwrap_or_default()
                .to_string()
        } else {
            parse_code_point(&self.value, self.hexadecimal)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
                .to_string()
        }
    }
}

/// Parses the digits of a numeric reference into a character.
fn parse_code_point(digits: &str, hexadecimal: bool) -> Option<char> {
    let radix = if hexadecimal { 16 } else { 10 };
    u32::from_str_radix(digits, radix)
        .ok()
        .filter(|&value| value != 0)
        .and_then(char::from_u32)
}

impl fmt::Display for HtmlEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.named {
            write!(f, "&{};", self.value)
        } else if self.hexadecimal {
            write!(f, "&#{}{};", self.hex_char, self.value)
        } else {
            write!(f, "&#{};", self.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize() {
        assert_eq!(HtmlEntity::named("Sigma").unwrap().normalize(), "Σ");
        assert_eq!(HtmlEntity::numeric('Σ', false).to_string(), "&#931;");
        assert_eq!(HtmlEntity::numeric('Σ', true).to_string(), "&#x3a3;");
        assert_eq!(HtmlEntity::numeric('|', false).normalize(), "|");
    }

    #[test]
    fn invalid_values() {
        assert!(HtmlEntity::named("bogus").is_err());
        let mut entity = HtmlEntity::numeric('a', false);
        assert!(entity.set_value("55296").is_err());
        assert!(entity.set_value("1114112").is_err());
        assert!(entity.set_value("0").is_err());
        assert_eq!(entity.value(), "97");
        entity.set_value("98").unwrap();
        assert_eq!(entity.normalize(), "b");
    }
}
