//! HTML and extension tags.

use super::{Chunk, Context, Halt, Route, Token, Tokenizer, config, is_marker_text};
use crate::wikitext::ParserError;
use bitflags::bitflags;
use std::mem;

bitflags! {
    /// The position of the cursor inside of an open tag.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub(super) struct TagState: u8 {
        /// Reading the tag name.
        const NAME        = 1 << 0;
        /// Between attributes.
        const ATTR_READY  = 1 << 1;
        /// Reading an attribute name.
        const ATTR_NAME   = 1 << 2;
        /// Reading an attribute value.
        const ATTR_VALUE  = 1 << 3;
        /// Inside of a quoted attribute value.
        const QUOTED      = 1 << 4;
        /// The next chunk must be whitespace or the end of the tag.
        const NOTE_SPACE  = 1 << 5;
        /// Whitespace followed the attribute name, so anything but `=` starts
        /// a new attribute.
        const NOTE_EQUALS = 1 << 6;
        /// The next chunk may open a quoted value.
        const NOTE_QUOTE  = 1 << 7;
    }
}

/// Parser state for an open tag, or for the style part of a table tag.
#[derive(Debug)]
pub(super) struct TagOpenData {
    /// The current state.
    pub state: TagState,
    /// Whitespace before the next attribute, or before the end of the tag.
    pub pad_first: String,
    /// Whitespace between the attribute name and `=`.
    pub pad_before_eq: String,
    /// Whitespace between `=` and the attribute value.
    pub pad_after_eq: String,
    /// The quote character of the current value.
    pub quoter: char,
    /// The position of the opening quote of the current value.
    pub reset: usize,
}

impl TagOpenData {
    /// Creates new tag state.
    pub fn new(state: TagState) -> Self {
        Self {
            state,
            pad_first: String::new(),
            pad_before_eq: String::new(),
            pad_after_eq: String::new(),
            quoter: '"',
            reset: 0,
        }
    }
}

/// Splits `text` into alternating runs of whitespace and other characters.
fn space_runs(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    core::iter::from_fn(move || {
        let space = rest.chars().next()?.is_whitespace();
        let end = rest
            .find(|c: char| c.is_whitespace() != space)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        rest = tail;
        Some(run)
    })
}

impl Tokenizer<'_> {
    /// Writes the pending attribute into the enclosing frame.
    pub(super) fn push_tag_buffer(&mut self, data: &mut TagOpenData) -> Route<()> {
        if data.state.contains(TagState::QUOTED) {
            self.emit_first(Token::TagAttrQuote { char: data.quoter });
            let value = self.pop()?;
            self.emit_all(value);
        }
        self.emit_first(Token::TagAttrStart {
            pad_first: mem::take(&mut data.pad_first),
            pad_before_eq: mem::take(&mut data.pad_before_eq),
            pad_after_eq: mem::take(&mut data.pad_after_eq),
        });
        let attr = self.pop()?;
        self.emit_all(attr);
        Ok(())
    }

    /// Handles whitespace inside of an open tag.
    fn handle_tag_space(&mut self, data: &mut TagOpenData, text: &str) -> Route<()> {
        let state = data.state;
        let end_of_value = state.contains(TagState::ATTR_VALUE)
            && !state.intersects(TagState::QUOTED | TagState::NOTE_QUOTE);
        if end_of_value || state.contains(TagState::QUOTED | TagState::NOTE_SPACE) {
            self.push_tag_buffer(data)?;
            data.state = TagState::ATTR_READY;
        } else if state.contains(TagState::NOTE_SPACE) {
            data.state = TagState::ATTR_READY;
        } else if state.contains(TagState::ATTR_NAME) {
            data.state |= TagState::NOTE_EQUALS;
            data.pad_before_eq.push_str(text);
        }

        if state.contains(TagState::QUOTED) && !state.contains(TagState::NOTE_SPACE) {
            self.emit_text(text);
        } else if data.state.contains(TagState::ATTR_READY) {
            data.pad_first.push_str(text);
        } else if data.state.contains(TagState::ATTR_VALUE) {
            data.pad_after_eq.push_str(text);
        }
        Ok(())
    }

    /// Handles text inside of an open tag, which may contain templates, links,
    /// or other tags.
    fn handle_tag_text(&mut self, text: &str) -> Route<()> {
        let next = self.read(1);
        if !is_marker_text(text) || !self.can_recurse() {
            self.emit_text(text);
        } else if text == "{" && next.is("{") {
            self.parse_template_or_argument()?;
        } else if text == "[" && next.is("[") {
            self.parse_wikilink()?;
        } else if text == "<" {
            self.parse_tag()?;
        } else {
            self.emit_text(text);
        }
        Ok(())
    }

    /// Handles a chunk inside of an open tag.
    pub(super) fn handle_tag_data(&mut self, data: &mut TagOpenData, text: &str) -> Route<()> {
        for run in space_runs(text) {
            let is_space = run.starts_with(char::is_whitespace);
            if data.state.contains(TagState::NAME) {
                if is_marker_text(run) || is_space {
                    return self.fail_route();
                }
                data.state = TagState::NOTE_SPACE;
            } else if is_space {
                self.handle_tag_space(data, run)?;
                continue;
            } else if data.state.contains(TagState::NOTE_SPACE) {
                if data.state.contains(TagState::QUOTED) {
                    // The quoted value ran into more text, so it was not
                    // really a quoted value
                    data.state = TagState::ATTR_VALUE;
                    self.memoize_bad_route();
                    self.pop()?;
                    self.head = data.reset - 1;
                    return Ok(());
                }
                return self.fail_route();
            } else if data.state.contains(TagState::ATTR_READY) {
                data.state = TagState::ATTR_NAME;
                self.push(Context::TAG_ATTR)?;
            } else if data.state.contains(TagState::ATTR_NAME) {
                if run == "=" {
                    data.state = TagState::ATTR_VALUE | TagState::NOTE_QUOTE;
                    self.emit(Token::TagAttrEquals);
                    continue;
                }
                if data.state.contains(TagState::NOTE_EQUALS) {
                    self.push_tag_buffer(data)?;
                    data.state = TagState::ATTR_NAME;
                    self.push(Context::TAG_ATTR)?;
                }
            } else {
                let escaped = self.read(-1).is("\\") && !self.read(-2).is("\\");
                if data.state.contains(TagState::NOTE_QUOTE) {
                    data.state.remove(TagState::NOTE_QUOTE);
                    if (run == "\"" || run == "'") && !escaped {
                        data.state |= TagState::QUOTED;
                        data.quoter = if run == "'" { '\'' } else { '"' };
                        data.reset = self.head;
                        match self.push(self.frame.context) {
                            Ok(()) => continue,
                            Err(Halt::BadRoute { .. }) => {
                                // This quote already failed to close once
                                data.state = TagState::ATTR_VALUE;
                                self.head -= 1;
                                return Ok(());
                            }
                            Err(error) => return Err(error),
                        }
                    }
                } else if data.state.contains(TagState::QUOTED)
                    && run.starts_with(data.quoter)
                    && run.len() == 1
                    && !escaped
                {
                    data.state |= TagState::NOTE_SPACE;
                    continue;
                }
            }
            self.handle_tag_text(run)?;
        }
        Ok(())
    }

    /// Emits the token which ends an open tag.
    fn handle_tag_close_open(&mut self, data: &mut TagOpenData, self_closing: bool) -> Route<()> {
        if data.state.intersects(TagState::ATTR_NAME | TagState::ATTR_VALUE) {
            self.push_tag_buffer(data)?;
        }
        let padding = mem::take(&mut data.pad_first);
        self.emit(if self_closing {
            Token::TagCloseSelfclose {
                wiki_markup: None,
                padding,
                implicit: false,
            }
        } else {
            Token::TagCloseOpen {
                wiki_markup: None,
                padding,
            }
        });
        self.head += 1;
        Ok(())
    }

    /// Parses a tag starting at its name.
    fn really_parse_tag(&mut self) -> Route<Vec<Token>> {
        let mut data = TagOpenData::new(TagState::NAME);
        self.push(Context::TAG_OPEN)?;
        self.emit(Token::TagOpenOpen {
            wiki_markup: None,
            invalid: false,
        });

        loop {
            let this = self.read(0);
            let can_exit = !data.state.intersects(TagState::QUOTED | TagState::NAME)
                || data.state.contains(TagState::NOTE_SPACE);
            match this {
                Chunk::Start | Chunk::End => {
                    if self.frame.context.contains(Context::TAG_ATTR) {
                        if data.state.contains(TagState::QUOTED) {
                            // Unclosed quote; try again treating the quote as
                            // text
                            data.state = TagState::ATTR_VALUE;
                            self.memoize_bad_route();
                            self.pop()?;
                            self.head = data.reset;
                            continue;
                        }
                        self.pop()?;
                    }
                    return self.fail_route();
                }
                Chunk::Text(">") if can_exit => {
                    self.handle_tag_close_open(&mut data, false)?;
                    self.frame.context = Context::TAG_BODY;
                    if config::is_single_only(self.tag_name()) {
                        return self.handle_single_only_tag_end();
                    }
                    if config::is_parsable(self.tag_name()) {
                        return self.parse(Context::empty(), false);
                    }
                    return self.handle_blacklisted_tag();
                }
                Chunk::Text("/") if self.read(1).is(">") && can_exit => {
                    self.handle_tag_close_open(&mut data, true)?;
                    return Ok(self.pop()?);
                }
                Chunk::Text(text) => self.handle_tag_data(&mut data, text)?,
            }
            self.head += 1;
        }
    }

    /// Finishes a tag which can never have contents, like `<br>`.
    fn handle_single_only_tag_end(&mut self) -> Route<Vec<Token>> {
        let Some(Token::TagCloseOpen { padding, .. }) = self.frame.tokens.pop() else {
            return Err(ParserError::new("single-only tag is missing its close-open token").into());
        };
        self.emit(Token::TagCloseSelfclose {
            wiki_markup: None,
            padding,
            implicit: true,
        });
        self.head -= 1;
        Ok(self.pop()?)
    }

    /// Finishes a tag which may omit its closing tag, like `<li>`, when the
    /// input ends inside of it.
    pub(super) fn handle_single_tag_end(&mut self) -> Route<Vec<Token>> {
        let mut depth = 1;
        let mut close_open = None;
        for (index, token) in self.frame.tokens.iter().enumerate().skip(2) {
            match token {
                Token::TagOpenOpen { .. } => depth += 1,
                Token::TagCloseOpen { .. } => {
                    depth -= 1;
                    if depth == 0 {
                        close_open = Some(index);
                        break;
                    }
                }
                Token::TagCloseSelfclose { .. } => {
                    depth -= 1;
                    if depth == 0 {
                        return Err(ParserError::new("single tag ended by a self-closing token").into());
                    }
                }
                _ => {}
            }
        }

        let index = close_open
            .ok_or_else(|| ParserError::new("single tag is missing its close-open token"))?;
        if let Token::TagCloseOpen { padding, .. } = &mut self.frame.tokens[index] {
            let padding = mem::take(padding);
            self.frame.tokens[index] = Token::TagCloseSelfclose {
                wiki_markup: None,
                padding,
                implicit: true,
            };
        }
        Ok(self.pop()?)
    }

    /// Reads the contents of a tag whose contents are not Wikitext, like
    /// `<nowiki>`, up to its closing tag.
    fn handle_blacklisted_tag(&mut self) -> Route<Vec<Token>> {
        loop {
            match self.read(0) {
                Chunk::Start | Chunk::End => return self.fail_route(),
                Chunk::Text("<") if self.read(1).is("/") => {
                    self.head += 3;
                    let name = self.read(-1).text();
                    if !self.read(0).is(">")
                        || config::normalize_tag(name) != config::normalize_tag(self.tag_name())
                    {
                        self.head -= 1;
                        self.emit_text("</");
                        continue;
                    }
                    self.emit(Token::TagOpenClose { wiki_markup: None });
                    self.emit_text(name);
                    self.emit(Token::TagCloseClose);
                    return Ok(self.pop()?);
                }
                Chunk::Text("&") => self.parse_entity()?,
                Chunk::Text(text) => self.emit_text(text),
            }
            self.head += 1;
        }
    }

    /// Handles `</` inside of a tag body.
    pub(super) fn handle_tag_open_close(&mut self) -> Route<()> {
        self.emit(Token::TagOpenClose { wiki_markup: None });
        self.push(Context::TAG_CLOSE)?;
        self.head += 1;
        Ok(())
    }

    /// Handles the `>` of a closing tag, which must match the open tag.
    pub(super) fn handle_tag_close_close(&mut self) -> Route<Vec<Token>> {
        let closing = self.pop()?;
        let matches = match closing.as_slice() {
            [Token::Text { text }] => {
                config::normalize_tag(text) == config::normalize_tag(self.tag_name())
            }
            _ => false,
        };
        if !matches {
            return self.fail_route();
        }
        self.emit_all(closing);
        self.emit(Token::TagCloseClose);
        Ok(self.pop()?)
    }

    /// Handles `</` outside of a tag body. Closing tags of single-only tags,
    /// like `</br>`, are parsed as tags. Anything else is text.
    pub(super) fn handle_invalid_tag_start(&mut self) -> Route<()> {
        let reset = self.head + 1;
        self.head += 2;
        let name = self
            .read(0)
            .text()
            .split(char::is_whitespace)
            .next()
            .unwrap_or_default();

        let tag = if config::is_single_only(name) {
            self.attempt(Self::really_parse_tag)?
        } else {
            Err(self.frame.context)
        };

        match tag {
            Ok(mut tag) => {
                if let Some(Token::TagOpenOpen { invalid, .. }) = tag.first_mut() {
                    *invalid = true;
                }
                self.emit_all(tag);
            }
            Err(_) => {
                self.head = reset;
                self.emit_text("</");
            }
        }
        Ok(())
    }

    /// Parses an HTML tag at the cursor.
    ///
    /// ```wikitext
    /// <ref name="a">text</ref> <br/>
    /// ```
    pub(super) fn parse_tag(&mut self) -> Route<()> {
        let reset = self.head;
        self.head += 1;
        match self.attempt(Self::really_parse_tag)? {
            Ok(tag) => self.emit_all(tag),
            Err(_) => {
                self.head = reset;
                self.emit_text("<");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_space_runs() {
        assert_eq!(
            space_runs("a  b\tc ").collect::<Vec<_>>(),
            ["a", "  ", "b", "\t", "c", " "]
        );
        assert_eq!(space_runs("").count(), 0);
    }
}
