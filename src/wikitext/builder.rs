//! Builds a node tree from a flat token stream.

// This code is loosely based on `mwparserfromhell`. The upstream copyright is:
//
// SPDX-License-Identifier: MIT
// SPDX-FileCopyright: Copyright 2012-2024 Ben Kurtovic <ben.kurtovic@gmail.com>

use super::{ParserError, Token};
use crate::{
    Wikicode,
    nodes::{
        Argument, Attribute, Comment, ExternalLink, Heading, HeadingLevel, HtmlEntity, NodeRef,
        Parameter, Tag, Template, Text, Wikilink,
    },
};

/// Builds a tree from `tokens`.
pub(crate) fn build(tokens: Vec<Token>) -> Result<Wikicode, ParserError> {
    let mut builder = Builder::new(tokens);
    builder.push();
    while let Some(token) = builder.tokens.pop() {
        let node = builder.handle_token(token)?;
        builder.write(node);
    }
    builder.pop()
}

/// A tree builder.
///
/// The builder reads tokens off the end of a reversed token list. Each open
/// construct pushes a new stack of nodes, and the matching close token pops
/// that stack into a [`Wikicode`].
struct Builder {
    /// The remaining tokens, in reverse order.
    tokens: Vec<Token>,
    /// The nodes of each construct under construction.
    stacks: Vec<Vec<NodeRef>>,
}

impl Builder {
    /// Creates a new builder for `tokens`.
    fn new(mut tokens: Vec<Token>) -> Self {
        tokens.reverse();
        Self {
            tokens,
            stacks: Vec::new(),
        }
    }

    /// Starts a new stack of nodes.
    fn push(&mut self) {
        self.stacks.push(Vec::new());
    }

    /// Finishes the current stack of nodes.
    fn pop(&mut self) -> Result<Wikicode, ParserError> {
        self.stacks
            .pop()
            .map(Wikicode::from_nodes)
            .ok_or_else(|| ParserError::new("popped an empty builder stack"))
    }

    /// Adds a node to the current stack.
    fn write(&mut self, node: NodeRef) {
        if let Some(stack) = self.stacks.last_mut() {
            stack.push(node);
        }
    }

    /// Returns the next token, which must exist.
    fn next(&mut self, construct: &str) -> Result<Token, ParserError> {
        self.tokens.pop().ok_or_else(|| missed_close(construct))
    }

    /// Builds the node which starts with `token`.
    fn handle_token(&mut self, token: Token) -> Result<NodeRef, ParserError> {
        Ok(match token {
            Token::Text { text } => NodeRef::new(Text::new(text)),
            Token::TemplateOpen => NodeRef::new(self.handle_template()?),
            Token::ArgumentOpen => NodeRef::new(self.handle_argument()?),
            Token::WikilinkOpen => NodeRef::new(self.handle_wikilink()?),
            Token::ExternalLinkOpen { brackets } => {
                NodeRef::new(self.handle_external_link(brackets)?)
            }
            Token::HtmlEntityStart => NodeRef::new(self.handle_entity()?),
            Token::HeadingStart { level } => NodeRef::new(self.handle_heading(level)?),
            Token::CommentStart => NodeRef::new(self.handle_comment()?),
            Token::TagOpenOpen {
                wiki_markup,
                invalid,
            } => NodeRef::new(self.handle_tag(wiki_markup, invalid)?),
            token => return Err(ParserError::new(format!("unexpected token {token:?}"))),
        })
    }

    /// Builds a template parameter. `default` is the name used if the
    /// parameter has no `=`.
    fn handle_parameter(&mut self, default: usize) -> Result<Parameter, ParserError> {
        let mut key = None;
        self.push();
        while let Some(token) = self.tokens.pop() {
            match token {
                Token::TemplateParamEquals if key.is_none() => {
                    key = Some(self.pop()?);
                    self.push();
                }
                Token::TemplateParamSeparator | Token::TemplateClose => {
                    self.tokens.push(token);
                    let value = self.pop()?;
                    let showkey = key.is_some();
                    let name = key.unwrap_or_else(|| {
                        Wikicode::from_nodes(vec![NodeRef::new(Text::new(default.to_string()))])
                    });
                    return Ok(Parameter {
                        name,
                        value,
                        showkey,
                    });
                }
                token => {
                    let node = self.handle_token(token)?;
                    self.write(node);
                }
            }
        }
        Err(missed_close("parameter"))
    }

    /// Builds a template.
    fn handle_template(&mut self) -> Result<Template, ParserError> {
        let mut name = None;
        let mut params = Vec::new();
        let mut default = 1;
        self.push();
        while let Some(token) = self.tokens.pop() {
            match token {
                Token::TemplateParamSeparator => {
                    if name.is_none() {
                        name = Some(self.pop()?);
                    }
                    let param = self.handle_parameter(default)?;
                    if !param.showkey {
                        default += 1;
                    }
                    params.push(param);
                }
                Token::TemplateClose => {
                    let name = match name {
                        Some(name) => name,
                        None => self.pop()?,
                    };
                    return Ok(Template { name, params });
                }
                token => {
                    let node = self.handle_token(token)?;
                    self.write(node);
                }
            }
        }
        Err(missed_close("template"))
    }

    /// Builds a template argument.
    fn handle_argument(&mut self) -> Result<Argument, ParserError> {
        let mut name = None;
        self.push();
        while let Some(token) = self.tokens.pop() {
            match token {
                Token::ArgumentSeparator if name.is_none() => {
                    name = Some(self.pop()?);
                    self.push();
                }
                Token::ArgumentClose => {
                    let last = self.pop()?;
                    return Ok(match name {
                        Some(name) => Argument {
                            name,
                            default: Some(last),
                        },
                        None => Argument {
                            name: last,
                            default: None,
                        },
                    });
                }
                token => {
                    let node = self.handle_token(token)?;
                    self.write(node);
                }
            }
        }
        Err(missed_close("argument"))
    }

    /// Builds a wikilink.
    fn handle_wikilink(&mut self) -> Result<Wikilink, ParserError> {
        let mut title = None;
        self.push();
        while let Some(token) = self.tokens.pop() {
            match token {
                Token::WikilinkSeparator if title.is_none() => {
                    title = Some(self.pop()?);
                    self.push();
                }
                Token::WikilinkClose => {
                    let last = self.pop()?;
                    return Ok(match title {
                        Some(title) => Wikilink {
                            title,
                            text: Some(last),
                        },
                        None => Wikilink {
                            title: last,
                            text: None,
                        },
                    });
                }
                token => {
                    let node = self.handle_token(token)?;
                    self.write(node);
                }
            }
        }
        Err(missed_close("wikilink"))
    }

    /// Builds an external link.
    fn handle_external_link(&mut self, brackets: bool) -> Result<ExternalLink, ParserError> {
        let mut url = None;
        let mut suppress_space = false;
        self.push();
        while let Some(token) = self.tokens.pop() {
            match token {
                Token::ExternalLinkSeparator {
                    suppress_space: suppress,
                } if url.is_none() => {
                    url = Some(self.pop()?);
                    suppress_space = suppress;
                    self.push();
                }
                Token::ExternalLinkClose => {
                    let last = self.pop()?;
                    return Ok(match url {
                        Some(url) => ExternalLink {
                            url,
                            title: Some(last),
                            brackets,
                            suppress_space,
                        },
                        None => ExternalLink {
                            url: last,
                            title: None,
                            brackets,
                            suppress_space: false,
                        },
                    });
                }
                token => {
                    let node = self.handle_token(token)?;
                    self.write(node);
                }
            }
        }
        Err(missed_close("external link"))
    }

    /// Builds a character reference.
    fn handle_entity(&mut self) -> Result<HtmlEntity, ParserError> {
        let mut named = true;
        let mut hexadecimal = false;
        let mut hex_char = 'x';
        let value = loop {
            match self.next("entity")? {
                Token::HtmlEntityNumeric => named = false,
                Token::HtmlEntityHex { char } => {
                    hexadecimal = true;
                    hex_char = char;
                }
                Token::Text { text } => break text,
                token => return Err(ParserError::new(format!("unexpected token {token:?} in entity"))),
            }
        };
        match self.next("entity")? {
            Token::HtmlEntityEnd => Ok(HtmlEntity {
                value,
                named,
                hexadecimal,
                hex_char,
            }),
            _ => Err(missed_close("entity")),
        }
    }

    /// Builds a heading.
    fn handle_heading(&mut self, level: usize) -> Result<Heading, ParserError> {
        let level = HeadingLevel::try_from(level).map_err(|err| ParserError::new(err.to_string()))?;
        self.push();
        while let Some(token) = self.tokens.pop() {
            if token == Token::HeadingEnd {
                let title = self.pop()?;
                return Ok(Heading { title, level });
            }
            let node = self.handle_token(token)?;
            self.write(node);
        }
        Err(missed_close("heading"))
    }

    /// Builds a comment.
    fn handle_comment(&mut self) -> Result<Comment, ParserError> {
        self.push();
        while let Some(token) = self.tokens.pop() {
            if token == Token::CommentEnd {
                let contents = self.pop()?;
                return Ok(Comment {
                    contents: contents.to_string(),
                });
            }
            let node = self.handle_token(token)?;
            self.write(node);
        }
        Err(missed_close("comment"))
    }

    /// Builds a tag attribute. The token which ends the attribute is left for
    /// the caller.
    fn handle_attribute(
        &mut self,
        pad_first: String,
        pad_before_eq: String,
        pad_after_eq: String,
    ) -> Result<Attribute, ParserError> {
        let mut name = None;
        let mut quotes = None;
        self.push();
        while let Some(token) = self.tokens.pop() {
            match token {
                Token::TagAttrEquals if name.is_none() => {
                    name = Some(self.pop()?);
                    self.push();
                }
                Token::TagAttrQuote { char } => quotes = Some(char),
                Token::TagAttrStart { .. }
                | Token::TagCloseOpen { .. }
                | Token::TagCloseSelfclose { .. } => {
                    self.tokens.push(token);
                    let last = self.pop()?;
                    let (name, value) = match name {
                        Some(name) => (name, Some(last)),
                        None => (last, None),
                    };
                    return Ok(Attribute {
                        name,
                        value,
                        quotes,
                        pad_first,
                        pad_before_eq,
                        pad_after_eq,
                    });
                }
                token => {
                    let node = self.handle_token(token)?;
                    self.write(node);
                }
            }
        }
        Err(missed_close("attribute"))
    }

    /// Builds an HTML tag or wiki markup tag.
    fn handle_tag(&mut self, wiki_markup: Option<String>, invalid: bool) -> Result<Tag, ParserError> {
        let mut attributes = Vec::new();
        let mut tag_name = None;
        let mut contents = None;
        let mut padding = String::new();
        let mut wiki_style_separator = None;
        let mut closing_wiki_markup = None;
        self.push();
        while let Some(token) = self.tokens.pop() {
            match token {
                Token::TagAttrStart {
                    pad_first,
                    pad_before_eq,
                    pad_after_eq,
                } => {
                    attributes.push(self.handle_attribute(pad_first, pad_before_eq, pad_after_eq)?);
                }
                Token::TagCloseOpen {
                    wiki_markup: separator,
                    padding: pad,
                } => {
                    wiki_style_separator = separator;
                    padding = pad;
                    tag_name = Some(self.pop()?);
                    self.push();
                }
                Token::TagOpenClose { wiki_markup: close } => {
                    closing_wiki_markup = close;
                    contents = Some(self.pop()?);
                    self.push();
                }
                Token::TagCloseSelfclose {
                    wiki_markup: close,
                    padding: pad,
                    implicit,
                } => {
                    let tag = self.pop()?;
                    return Ok(Tag {
                        closing_tag: tag.share(),
                        tag,
                        contents,
                        attributes,
                        closing_wiki_markup: close
                            .or_else(|| Tag::default_closing_markup(wiki_markup.as_deref(), true)),
                        wiki_markup,
                        self_closing: true,
                        invalid,
                        implicit,
                        padding: pad,
                        wiki_style_separator,
                    });
                }
                Token::TagCloseClose => {
                    let closing_tag = self.pop()?;
                    let tag = tag_name.ok_or_else(|| missed_close("open tag"))?;
                    return Ok(Tag {
                        tag,
                        contents: Some(contents.unwrap_or_default()),
                        attributes,
                        closing_wiki_markup: closing_wiki_markup
                            .or_else(|| Tag::default_closing_markup(wiki_markup.as_deref(), false)),
                        wiki_markup,
                        self_closing: false,
                        invalid,
                        implicit: false,
                        padding,
                        closing_tag,
                        wiki_style_separator,
                    });
                }
                token => {
                    let node = self.handle_token(token)?;
                    self.write(node);
                }
            }
        }
        Err(missed_close("tag"))
    }
}

/// The error for a construct which ran out of tokens.
fn missed_close(construct: &str) -> ParserError {
    ParserError::new(format!("{construct} missed a close token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_names() {
        let code = build(vec![
            Token::TemplateOpen,
            Token::text("a"),
            Token::TemplateParamSeparator,
            Token::text("b"),
            Token::TemplateParamSeparator,
            Token::text("k"),
            Token::TemplateParamEquals,
            Token::text("v"),
            Token::TemplateParamSeparator,
            Token::text("c"),
            Token::TemplateClose,
        ])
        .unwrap();
        assert_eq!(code.to_string(), "{{a|b|k=v|c}}");
        let node = code.get(0).unwrap();
        let node = node.borrow();
        let names = node
            .as_template()
            .unwrap()
            .params()
            .iter()
            .map(|param| param.name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, ["1", "k", "2"]);
    }

    #[test]
    fn unclosed() {
        let err = build(vec![Token::WikilinkOpen, Token::text("a")]).unwrap_err();
        assert_eq!(err.message(), "wikilink missed a close token");
    }

    #[test]
    fn stray_close() {
        assert!(build(vec![Token::TemplateClose]).is_err());
    }

    #[test]
    fn bad_heading_level() {
        let err = build(vec![
            Token::HeadingStart { level: 7 },
            Token::text("x"),
            Token::HeadingEnd,
        ])
        .unwrap_err();
        assert_eq!(err.message(), "7 is not a valid heading level");
    }

    #[test]
    fn self_closing_tag() {
        let code = build(vec![
            Token::TagOpenOpen {
                wiki_markup: None,
                invalid: false,
            },
            Token::text("br"),
            Token::TagAttrStart {
                pad_first: " ".into(),
                pad_before_eq: String::new(),
                pad_after_eq: String::new(),
            },
            Token::text("clear"),
            Token::TagAttrEquals,
            Token::TagAttrQuote { char: '"' },
            Token::text("all"),
            Token::TagCloseSelfclose {
                wiki_markup: None,
                padding: " ".into(),
                implicit: false,
            },
        ])
        .unwrap();
        assert_eq!(code.to_string(), r#"<br clear="all" />"#);
    }
}
