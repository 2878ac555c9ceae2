use super::{StripOptions, TreeWriter};
use crate::{Anything, Error, Wikicode, parse_anything, wikitext::config};
use core::fmt;

/// An HTML tag attribute.
///
/// ```wikitext
/// <tag name="value">
/// ```
#[derive(Debug)]
pub struct Attribute {
    /// The attribute name.
    pub(crate) name: Wikicode,
    /// The attribute value, if there is one.
    pub(crate) value: Option<Wikicode>,
    /// The quote character around the value, if any.
    pub(crate) quotes: Option<char>,
    /// Whitespace before the name.
    pub(crate) pad_first: String,
    /// Whitespace between the name and `=`.
    pub(crate) pad_before_eq: String,
    /// Whitespace between `=` and the value.
    pub(crate) pad_after_eq: String,
}

impl Attribute {
    /// Creates a new attribute, padded with one leading space.
    ///
    /// Quotes are added if the value needs them.
    pub fn new(name: impl Into<Anything>, value: impl Into<Anything>) -> Result<Self, Error> {
        let mut attr = Self {
            name: parse_anything(name)?,
            value: None,
            quotes: Some('"'),
            pad_first: " ".to_string(),
            pad_before_eq: String::new(),
            pad_after_eq: String::new(),
        };
        attr.set_value(value)?;
        Ok(attr)
    }

    /// The attribute name.
    #[must_use]
    pub fn name(&self) -> &Wikicode {
        &self.name
    }

    /// Replaces the attribute name.
    pub fn set_name(&mut self, name: impl Into<Anything>) -> Result<(), Error> {
        self.name = parse_anything(name)?;
        Ok(())
    }

    /// The attribute value, if there is one.
    #[must_use]
    pub fn value(&self) -> Option<&Wikicode> {
        self.value.as_ref()
    }

    /// Replaces the attribute value. [`Anything::Nothing`] removes it.
    ///
    /// If the new value contains quotes or whitespace, the quote character is
    /// changed to one which keeps the value intact.
    pub fn set_value(&mut self, value: impl Into<Anything>) -> Result<(), Error> {
        self.value = match value.into() {
            Anything::Nothing => None,
            value => {
                let value = parse_anything(value)?;
                if let Some(needed) = needs_quotes(&value)
                    && self.quotes.is_none_or(|quotes| !needed.contains(quotes))
                {
                    self.quotes = needed.chars().next();
                }
                Some(value)
            }
        };
        Ok(())
    }

    /// The quote character around the value, if any.
    #[must_use]
    pub fn quotes(&self) -> Option<char> {
        self.quotes
    }

    /// Sets the quote character, which must be `"` or `'`. Quotes can only be
    /// removed if the value does not need them.
    pub fn set_quotes(&mut self, quotes: Option<char>) -> Result<(), Error> {
        match quotes {
            Some('"' | '\'') => {}
            Some(quotes) => {
                return Err(Error::InvalidArgument(format!(
                    "{quotes:?} is not a valid quote character"
                )));
            }
            None => {
                if self.value.as_ref().and_then(needs_quotes).is_some() {
                    return Err(Error::InvalidArgument(
                        "attribute value requires quotes".to_string(),
                    ));
                }
            }
        }
        self.quotes = quotes;
        Ok(())
    }

    /// Whitespace before the name.
    #[must_use]
    pub fn pad_first(&self) -> &str {
        &self.pad_first
    }

    /// Whitespace between the name and `=`.
    #[must_use]
    pub fn pad_before_eq(&self) -> &str {
        &self.pad_before_eq
    }

    /// Whitespace between `=` and the value.
    #[must_use]
    pub fn pad_after_eq(&self) -> &str {
        &self.pad_after_eq
    }

    /// Sets the whitespace before the name.
    pub fn set_pad_first(&mut self, pad: impl Into<String>) -> Result<(), Error> {
        self.pad_first = whitespace(pad.into())?;
        Ok(())
    }

    /// Sets the whitespace between the name and `=`.
    pub fn set_pad_before_eq(&mut self, pad: impl Into<String>) -> Result<(), Error> {
        self.pad_before_eq = whitespace(pad.into())?;
        Ok(())
    }

    /// Sets the whitespace between `=` and the value.
    pub fn set_pad_after_eq(&mut self, pad: impl Into<String>) -> Result<(), Error> {
        self.pad_after_eq = whitespace(pad.into())?;
        Ok(())
    }

    /// Returns true if the trimmed name of this attribute is `name`.
    fn is_named(&self, name: &str) -> bool {
        self.name.to_string().trim() == name
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.pad_first, self.name, self.pad_before_eq)?;
        if let Some(value) = &self.value {
            write!(f, "={}", self.pad_after_eq)?;
            if let Some(quotes) = self.quotes {
                write!(f, "{quotes}{value}{quotes}")?;
            } else {
                write!(f, "{value}")?;
            }
        }
        Ok(())
    }
}

/// Returns the quote characters which could wrap `value`, or `None` if it can
/// go unquoted.
fn needs_quotes(value: &Wikicode) -> Option<&'static str> {
    let text = value
        .nodes()
        .iter()
        .filter_map(|node| node.borrow().as_text().map(|text| text.value().to_string()))
        .collect::<String>();
    if text.contains('"') {
        Some("'")
    } else if text.contains('\'') {
        Some("\"")
    } else if text.chars().any(char::is_whitespace) {
        Some("\"'")
    } else {
        None
    }
}

/// Validates that `pad` is only whitespace.
fn whitespace(pad: String) -> Result<String, Error> {
    if pad.chars().all(char::is_whitespace) {
        Ok(pad)
    } else {
        Err(Error::InvalidArgument(format!("padding {pad:?} must be whitespace")))
    }
}

/// An HTML tag, or wiki markup which stands for one.
///
/// ```wikitext
/// <ref name="a">contents</ref> <br/> ''italics'' * list item
/// ```
#[derive(Debug)]
pub struct Tag {
    /// The tag name.
    pub(crate) tag: Wikicode,
    /// The tag contents. `None` for a self-closing tag.
    pub(crate) contents: Option<Wikicode>,
    /// The tag attributes, in order.
    pub(crate) attributes: Vec<Attribute>,
    /// The wiki markup which stands for the tag, like `''` or `{|`.
    pub(crate) wiki_markup: Option<String>,
    /// Whether the tag has no closing tag.
    pub(crate) self_closing: bool,
    /// Whether the tag is a closing tag with no open tag, like `</br>`.
    pub(crate) invalid: bool,
    /// Whether a self-closing tag ends with `>` instead of `/>`.
    pub(crate) implicit: bool,
    /// Whitespace before the end of the open tag.
    pub(crate) padding: String,
    /// The name in the closing tag. Shares its nodes with `tag` unless the two
    /// were written differently.
    pub(crate) closing_tag: Wikicode,
    /// The wiki markup between the attributes and the contents of a table
    /// cell.
    pub(crate) wiki_style_separator: Option<String>,
    /// The wiki markup which closes the tag.
    pub(crate) closing_wiki_markup: Option<String>,
}

impl Tag {
    /// Creates a new empty tag, like `<tag></tag>`.
    pub fn new(tag: impl Into<Anything>) -> Result<Self, Error> {
        let tag = parse_anything(tag)?;
        Ok(Self {
            closing_tag: tag.share(),
            tag,
            contents: Some(Wikicode::default()),
            attributes: Vec::new(),
            wiki_markup: None,
            self_closing: false,
            invalid: false,
            implicit: false,
            padding: String::new(),
            wiki_style_separator: None,
            closing_wiki_markup: None,
        })
    }

    /// Creates a new self-closing tag, like `<tag/>`.
    pub fn new_self_closing(tag: impl Into<Anything>) -> Result<Self, Error> {
        let mut tag = Self::new(tag)?;
        tag.self_closing = true;
        tag.contents = None;
        Ok(tag)
    }

    /// Returns the markup which closes a tag written with `wiki_markup`, if no
    /// other closing markup was given.
    pub(crate) fn default_closing_markup(
        wiki_markup: Option<&str>,
        self_closing: bool,
    ) -> Option<String> {
        wiki_markup
            .filter(|markup| !markup.is_empty() && !self_closing)
            .map(str::to_string)
    }

    /// The tag name.
    #[must_use]
    pub fn tag(&self) -> &Wikicode {
        &self.tag
    }

    /// Replaces the tag name, and the closing tag name with it.
    pub fn set_tag(&mut self, tag: impl Into<Anything>) -> Result<(), Error> {
        self.tag = parse_anything(tag)?;
        self.closing_tag = self.tag.share();
        Ok(())
    }

    /// The name in the closing tag.
    #[must_use]
    pub fn closing_tag(&self) -> &Wikicode {
        &self.closing_tag
    }

    /// Replaces only the closing tag name.
    pub fn set_closing_tag(&mut self, tag: impl Into<Anything>) -> Result<(), Error> {
        self.closing_tag = parse_anything(tag)?;
        Ok(())
    }

    /// The tag contents. `None` for a self-closing tag.
    #[must_use]
    pub fn contents(&self) -> Option<&Wikicode> {
        self.contents.as_ref()
    }

    /// Replaces the tag contents.
    pub fn set_contents(&mut self, contents: impl Into<Anything>) -> Result<(), Error> {
        self.contents = Some(parse_anything(contents)?);
        Ok(())
    }

    /// The tag attributes, in order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns true if an attribute named `name` exists.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        let name = name.trim();
        self.attributes.iter().any(|attr| attr.is_named(name))
    }

    /// Returns the last attribute named `name`, which is the one that takes
    /// effect.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        let name = name.trim();
        self.attributes.iter().rev().find(|attr| attr.is_named(name))
    }

    /// Returns the last attribute named `name` mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        let name = name.trim();
        self.attributes.iter_mut().rev().find(|attr| attr.is_named(name))
    }

    /// Appends an attribute. [`Anything::Nothing`] as the value adds an
    /// attribute with no value.
    pub fn add(
        &mut self,
        name: impl Into<Anything>,
        value: impl Into<Anything>,
    ) -> Result<&mut Attribute, Error> {
        self.attributes.push(Attribute::new(name, value)?);
        let last = self.attributes.len() - 1;
        Ok(&mut self.attributes[last])
    }

    /// Removes every attribute named `name`.
    pub fn remove(&mut self, name: &str) -> Result<(), Error> {
        let name = name.trim();
        let before = self.attributes.len();
        self.attributes.retain(|attr| !attr.is_named(name));
        if self.attributes.len() == before {
            return Err(Error::NotFound(name.to_string()));
        }
        Ok(())
    }

    /// The wiki markup which stands for the tag, if any.
    #[must_use]
    pub fn wiki_markup(&self) -> Option<&str> {
        self.wiki_markup.as_deref()
    }

    /// Sets the wiki markup which stands for the tag. The closing markup
    /// follows unless it was set separately.
    pub fn set_wiki_markup(&mut self, markup: Option<&str>) {
        self.wiki_markup = markup.filter(|markup| !markup.is_empty()).map(str::to_string);
        if self.wiki_markup.is_none() || self.closing_wiki_markup.is_none() {
            self.closing_wiki_markup = self.wiki_markup.clone();
        }
    }

    /// The wiki markup which closes the tag, if any.
    #[must_use]
    pub fn closing_wiki_markup(&self) -> Option<&str> {
        self.closing_wiki_markup.as_deref()
    }

    /// Sets the wiki markup which closes the tag.
    pub fn set_closing_wiki_markup(&mut self, markup: Option<&str>) {
        self.closing_wiki_markup = markup.filter(|markup| !markup.is_empty()).map(str::to_string);
    }

    /// The wiki markup between the attributes and the contents of a table
    /// cell, if any.
    #[must_use]
    pub fn wiki_style_separator(&self) -> Option<&str> {
        self.wiki_style_separator.as_deref()
    }

    /// Sets the wiki markup between the attributes and the contents.
    pub fn set_wiki_style_separator(&mut self, separator: Option<&str>) {
        self.wiki_style_separator = separator.map(str::to_string);
    }

    /// Whether the tag has no closing tag.
    #[must_use]
    pub fn self_closing(&self) -> bool {
        self.self_closing
    }

    /// Sets whether the tag has no closing tag.
    pub fn set_self_closing(&mut self, self_closing: bool) {
        self.self_closing = self_closing;
        if !self_closing && self.contents.is_none() {
            self.contents = Some(Wikicode::default());
        }
    }

    /// Whether the tag is a closing tag with no open tag, like `</br>`.
    #[must_use]
    pub fn invalid(&self) -> bool {
        self.invalid
    }

    /// Sets whether the tag is written like a closing tag.
    pub fn set_invalid(&mut self, invalid: bool) {
        self.invalid = invalid;
    }

    /// Whether a self-closing tag ends with `>` instead of `/>`.
    #[must_use]
    pub fn implicit(&self) -> bool {
        self.implicit
    }

    /// Sets whether a self-closing tag ends with `>` instead of `/>`.
    pub fn set_implicit(&mut self, implicit: bool) {
        self.implicit = implicit;
    }

    /// Whitespace before the end of the open tag.
    #[must_use]
    pub fn padding(&self) -> &str {
        &self.padding
    }

    /// Sets the whitespace before the end of the open tag.
    pub fn set_padding(&mut self, padding: impl Into<String>) -> Result<(), Error> {
        self.padding = whitespace(padding.into())?;
        Ok(())
    }

    /// Returns the printable text of the tag.
    pub(super) fn strip(&self, options: StripOptions) -> Option<String> {
        let contents = self.contents.as_ref()?;
        (!contents.is_empty() && config::is_visible(&self.tag.to_string()))
            .then(|| contents.strip_code(options))
    }

    /// Writes the debug tree of the tag.
    pub(super) fn show_tree(&self, tree: &mut TreeWriter) {
        tree.write(if self.invalid { "</" } else { "<" });
        tree.get(&self.tag);
        for attr in &self.attributes {
            tree.get(&attr.name);
            if let Some(value) = &attr.value {
                tree.write("    = ");
                tree.mark();
                tree.get(value);
            }
        }
        if self.self_closing {
            tree.write(if self.implicit { ">" } else { "/>" });
        } else {
            tree.write(">");
            if let Some(contents) = &self.contents {
                tree.get(contents);
            }
            tree.write("</");
            tree.get(&self.closing_tag);
            tree.write(">");
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(markup) = &self.wiki_markup {
            f.write_str(markup)?;
            for attr in &self.attributes {
                write!(f, "{attr}")?;
            }
            f.write_str(&self.padding)?;
            if let Some(separator) = &self.wiki_style_separator {
                f.write_str(separator)?;
            }
            if !self.self_closing {
                if let Some(contents) = &self.contents {
                    write!(f, "{contents}")?;
                }
                if let Some(close) = &self.closing_wiki_markup {
                    f.write_str(close)?;
                }
            }
            return Ok(());
        }

        f.write_str(if self.invalid { "</" } else { "<" })?;
        write!(f, "{}", self.tag)?;
        for attr in &self.attributes {
            write!(f, "{attr}")?;
        }
        f.write_str(&self.padding)?;
        if self.self_closing {
            f.write_str(if self.implicit { ">" } else { "/>" })
        } else {
            f.write_str(">")?;
            if let Some(contents) = &self.contents {
                write!(f, "{contents}")?;
            }
            write!(f, "</{}>", self.closing_tag)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn html_and_wiki_forms() {
        let mut tag = Tag::new("ref").unwrap();
        tag.set_contents("cite").unwrap();
        tag.add("name", "a b").unwrap();
        assert_eq!(tag.to_string(), r#"<ref name="a b">cite</ref>"#);

        let mut br = Tag::new_self_closing("br").unwrap();
        assert_eq!(br.to_string(), "<br/>");
        br.set_implicit(true);
        br.set_padding(" ").unwrap();
        assert_eq!(br.to_string(), "<br >");
        assert!(br.set_padding("x").is_err());

        let mut bold = Tag::new("b").unwrap();
        bold.set_contents("x").unwrap();
        bold.set_wiki_markup(Some("'''"));
        assert_eq!(bold.to_string(), "'''x'''");
    }

    #[test]
    fn shared_closing_tag() {
        let code = parse("<span>x</span>").unwrap();
        let node = code.get(0).unwrap();
        node.borrow_mut()
            .as_tag_mut()
            .unwrap()
            .set_tag("div")
            .unwrap();
        assert_eq!(code.to_string(), "<div>x</div>");
        let node = node.borrow();
        let tag = node.as_tag().unwrap();
        tag.tag().append("s").unwrap();
        assert_eq!(tag.to_string(), "<divs>x</divs>");
    }

    #[test]
    fn shared_closing_tag_is_searched_once() {
        let code = parse("<span>x</span>").unwrap();
        code.get(0)
            .unwrap()
            .borrow_mut()
            .as_tag_mut()
            .unwrap()
            .set_tag("{{t}}")
            .unwrap();
        assert_eq!(code.to_string(), "<{{t}}>x</{{t}}>");
        assert_eq!(code.filter_templates(true).len(), 1);

        code.insert_before("{{t}}", "Q", true).unwrap();
        assert_eq!(code.to_string(), "<Q{{t}}>x</Q{{t}}>");
    }

    #[test]
    fn attribute_quotes() {
        let mut attr = Attribute::new("title", "plain").unwrap();
        attr.set_quotes(None).unwrap();
        assert_eq!(attr.to_string(), " title=plain");
        attr.set_value("has space").unwrap();
        assert_eq!(attr.quotes(), Some('"'));
        attr.set_value(r#"say "hi""#).unwrap();
        assert_eq!(attr.to_string(), r#" title='say "hi"'"#);
        assert!(attr.set_quotes(None).is_err());
        assert!(attr.set_quotes(Some('`')).is_err());
    }

    #[test]
    fn attribute_lookup() {
        let code = parse(r#"<div id="a" class=b id='c'>x</div>"#).unwrap();
        let node = code.get(0).unwrap();
        let mut node = node.borrow_mut();
        let tag = node.as_tag_mut().unwrap();
        assert!(tag.has(" id "));
        assert_eq!(tag.get("id").unwrap().value().unwrap().to_string(), "c");
        assert_eq!(tag.get("class").unwrap().quotes(), None);
        tag.remove("id").unwrap();
        assert!(matches!(tag.remove("id"), Err(Error::NotFound(_))));
        assert_eq!(tag.to_string(), "<div class=b>x</div>");
    }
}
