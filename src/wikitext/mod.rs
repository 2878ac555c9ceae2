//! Wikitext tokenizer and tree builder.

use crate::wikicode::Wikicode;
pub use context::Context;

pub(crate) mod builder;
pub(crate) mod config;
pub mod context;
#[cfg(test)]
mod tests;
mod tokenizer;

/// An internal parser error.
///
/// Wikitext has no invalid syntax, so this error only occurs if the tokenizer
/// and the builder disagree about the shape of a token stream.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("internal parser error: {message}")]
pub struct ParserError {
    /// A description of what went wrong.
    message: String,
}

impl ParserError {
    /// Creates a new parser error with the given message.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A flat Wikitext token.
///
/// Tokens never nest. Nesting is represented by matched open and close
/// tokens.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// Literal text.
    Text {
        /// The text.
        text: String,
    },

    /// `{{`
    TemplateOpen,
    /// `|` inside a template.
    TemplateParamSeparator,
    /// `=` inside a template parameter.
    TemplateParamEquals,
    /// `}}`
    TemplateClose,

    /// `{{{`
    ArgumentOpen,
    /// `|` inside an argument.
    ArgumentSeparator,
    /// `}}}`
    ArgumentClose,

    /// `[[`
    WikilinkOpen,
    /// `|` inside a wikilink.
    WikilinkSeparator,
    /// `]]`
    WikilinkClose,

    /// The start of an external link.
    ExternalLinkOpen {
        /// Whether the link is enclosed in `[` and `]`.
        brackets: bool,
    },
    /// The separator between an external link URL and its title.
    ExternalLinkSeparator {
        /// If true, the separator was not a space and is not rendered.
        suppress_space: bool,
    },
    /// The end of an external link.
    ExternalLinkClose,

    /// `&`
    HtmlEntityStart,
    /// `#` inside an entity.
    HtmlEntityNumeric,
    /// `x` inside a numeric entity.
    HtmlEntityHex {
        /// The `x` or `X` character used.
        char: char,
    },
    /// `;`
    HtmlEntityEnd,

    /// The opening `=` run of a heading.
    HeadingStart {
        /// The heading level.
        level: usize,
    },
    /// The closing `=` run of a heading.
    HeadingEnd,

    /// `<!--`
    CommentStart,
    /// `-->`
    CommentEnd,

    /// `<`, or the start of a wiki markup tag.
    TagOpenOpen {
        /// The wiki markup which stands in for the HTML tag, if any.
        wiki_markup: Option<String>,
        /// True for `</br>`-style tags.
        invalid: bool,
    },
    /// The start of a tag attribute.
    TagAttrStart {
        /// Whitespace before the attribute name.
        pad_first: String,
        /// Whitespace between the name and `=`.
        pad_before_eq: String,
        /// Whitespace between `=` and the value.
        pad_after_eq: String,
    },
    /// `=` inside a tag attribute.
    TagAttrEquals,
    /// An attribute value quote.
    TagAttrQuote {
        /// The quote character.
        char: char,
    },
    /// `>` at the end of an open tag.
    TagCloseOpen {
        /// The wiki markup which separates attributes from contents, if any.
        wiki_markup: Option<String>,
        /// Whitespace before the `>`.
        padding: String,
    },
    /// `/>`, or the end of a tag with no closing tag.
    TagCloseSelfclose {
        /// The wiki markup at the end of the tag, if any.
        wiki_markup: Option<String>,
        /// Whitespace before the `/>`.
        padding: String,
        /// True if the tag closed without a `/`.
        implicit: bool,
    },
    /// `</`, or the start of a wiki markup closing sequence.
    TagOpenClose {
        /// The wiki markup which closes the tag, if any.
        wiki_markup: Option<String>,
    },
    /// `>` at the end of a closing tag.
    TagCloseClose,
}

impl Token {
    /// Creates a new text token.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// A Wikitext parser.
#[derive(Clone, Copy, Debug, Default)]
pub struct Parser {
    /// The context in which parsing starts.
    context: Context,
    /// If true, `''` and `'''` are treated as plain text.
    skip_style_tags: bool,
}

impl Parser {
    /// Creates a new parser which starts in the default context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the context in which parsing starts.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Sets whether `''` and `'''` are treated as plain text.
    #[must_use]
    pub fn skip_style_tags(mut self, skip: bool) -> Self {
        self.skip_style_tags = skip;
        self
    }

    /// Tokenizes `text` into a flat token stream.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>, ParserError> {
        tokenizer::Tokenizer::tokenize(text, self.context, self.skip_style_tags)
    }

    /// Parses `text` into a tree.
    pub fn parse(&self, text: &str) -> Result<Wikicode, ParserError> {
        let tokens = self.tokenize(text)?;
        log::trace!("tokenized {} bytes into {} tokens", text.len(), tokens.len());
        builder::build(tokens)
    }
}

/// Tokenizes `text` into a flat token stream.
pub fn tokenize(text: &str, context: Context, skip_style_tags: bool) -> Result<Vec<Token>, ParserError> {
    Parser::new()
        .with_context(context)
        .skip_style_tags(skip_style_tags)
        .tokenize(text)
}

/// Builds a tree from a token stream.
pub fn build(tokens: Vec<Token>) -> Result<Wikicode, ParserError> {
    builder::build(tokens)
}
