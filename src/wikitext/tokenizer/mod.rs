//! A speculative, backtracking Wikitext tokenizer.
//!
//! The input is split into chunks at structural characters. A cursor walks
//! the chunks, and each construct which might start at the cursor is parsed
//! optimistically in a new frame. If the construct turns out to be malformed,
//! the attempt is abandoned with a bad route, the frame stack is unwound, and
//! the opening characters are emitted as plain text instead.

// This code is loosely based on `mwparserfromhell`. The upstream copyright is:
//
// SPDX-License-Identifier: MIT
// SPDX-FileCopyright: Copyright 2012-2024 Ben Kurtovic <ben.kurtovic@gmail.com>

use super::{Context, ParserError, Token, config};
use regex::Regex;
use std::{collections::HashSet, mem, sync::LazyLock};

mod link;
mod style;
mod table;
mod tag;
mod template;

/// The maximum number of nested frames before further constructs are treated
/// as plain text.
const MAX_DEPTH: usize = 40;

/// Characters which always form a chunk by themselves.
static DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r##"[{}\[\]<>|=&'"#*;:/\\\-!\n]"##).unwrap());

/// A chunk of input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Chunk<'a> {
    /// Before the first chunk.
    Start,
    /// A delimiter, or a run of non-delimiter characters.
    Text(&'a str),
    /// After the last chunk.
    End,
}

impl<'a> Chunk<'a> {
    /// Returns true if this chunk is exactly `text`.
    #[inline]
    fn is(self, text: &str) -> bool {
        matches!(self, Self::Text(this) if this == text)
    }

    /// Returns the chunk text, or an empty string for sentinels.
    #[inline]
    fn text(self) -> &'a str {
        match self {
            Self::Text(text) => text,
            Self::Start | Self::End => "",
        }
    }

    /// Returns true if this chunk is a delimiter or a sentinel.
    fn is_marker(self) -> bool {
        match self {
            Self::Text(text) => is_marker_text(text),
            Self::Start | Self::End => true,
        }
    }

    /// Returns true if a chunk after this one is at the start of a line.
    fn is_line_start(self) -> bool {
        self == Self::Start || self.is("\n")
    }

    /// Returns true if this chunk is entirely whitespace.
    fn is_space(self) -> bool {
        is_space_text(self.text())
    }

    /// Returns true if this chunk is a list item marker.
    fn is_list_marker(self) -> bool {
        matches!(self.text(), "#" | "*" | ";" | ":")
    }
}

/// Returns true if `text` is a delimiter chunk.
fn is_marker_text(text: &str) -> bool {
    text.len() == 1 && DELIMITER.is_match(text)
}

/// Returns true if `text` is non-empty and entirely whitespace.
fn is_space_text(text: &str) -> bool {
    !text.is_empty() && text.chars().all(char::is_whitespace)
}

/// Returns the index of the first chunk of the last run of `closer` chunks.
fn find_last(chunks: &[&str], closer: &[&str]) -> Option<usize> {
    chunks.windows(closer.len()).rposition(|window| window == closer)
}

/// Splits `text` into delimiter chunks and runs of other characters.
fn split(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut last = 0;
    for delimiter in DELIMITER.find_iter(text) {
        if delimiter.start() > last {
            chunks.push(&text[last..delimiter.start()]);
        }
        chunks.push(delimiter.as_str());
        last = delimiter.end();
    }
    if last < text.len() {
        chunks.push(&text[last..]);
    }
    chunks
}

/// The ways a route can stop early.
#[derive(Debug)]
enum Halt {
    /// The construct being attempted is not valid here. The context is the
    /// one that was active in the failing frame.
    BadRoute {
        /// The context of the failed frame.
        context: Context,
    },
    /// The tokenizer is in an inconsistent state.
    Internal(ParserError),
}

impl From<ParserError> for Halt {
    fn from(error: ParserError) -> Self {
        Self::Internal(error)
    }
}

/// The result of a speculative parse.
type Route<T> = Result<T, Halt>;

/// An in-progress construct.
#[derive(Debug)]
struct Frame {
    /// The tokens emitted in this frame.
    tokens: Vec<Token>,
    /// The active context.
    context: Context,
    /// Pending text which has not been turned into a token yet.
    textbuffer: String,
    /// The cursor and context at the time the frame was pushed, used to
    /// memoize failures.
    ident: (usize, Context),
}

impl Frame {
    /// Creates a new empty frame.
    fn new(context: Context, head: usize) -> Self {
        Self {
            tokens: Vec::new(),
            context,
            textbuffer: String::new(),
            ident: (head, context),
        }
    }
}

/// The Wikitext tokenizer.
pub(super) struct Tokenizer<'a> {
    /// The input chunks.
    text: Vec<&'a str>,
    /// The cursor, as an index into `text`.
    head: usize,
    /// The innermost frame.
    frame: Frame,
    /// All enclosing frames.
    parents: Vec<Frame>,
    /// Memoized failed routes.
    bad_routes: HashSet<(usize, Context)>,
    /// Whether a heading is being parsed anywhere in the frame stack.
    in_heading: bool,
    /// The level of the most recently closed heading.
    heading_level: usize,
    /// If true, `''` and `'''` are plain text.
    skip_style_tags: bool,
    /// The last `}}` in the input.
    last_braces_close: Option<usize>,
    /// The last `-->` in the input.
    last_comment_close: Option<usize>,
}

impl<'a> Tokenizer<'a> {
    /// Creates a tokenizer positioned at the start of `text`.
    fn new(text: &'a str, skip_style_tags: bool) -> Self {
        let text = split(text);
        Self {
            last_braces_close: find_last(&text, &["}", "}"]),
            last_comment_close: find_last(&text, &["-", "-", ">"]),
            text,
            head: 0,
            frame: Frame::new(Context::empty(), 0),
            parents: Vec::new(),
            bad_routes: HashSet::new(),
            in_heading: false,
            heading_level: 0,
            skip_style_tags,
        }
    }

    /// Tokenizes `text`, starting in `context`.
    pub fn tokenize(
        text: &'a str,
        context: Context,
        skip_style_tags: bool,
    ) -> Result<Vec<Token>, ParserError> {
        let mut tokenizer = Self::new(text, skip_style_tags);
        let tokens = match tokenizer.parse(context, true) {
            Ok(tokens) => tokens,
            Err(Halt::BadRoute { context }) => {
                return Err(ParserError::new(format!(
                    "tokenizer exited with a bad route in {context:?}"
                )));
            }
            Err(Halt::Internal(error)) => return Err(error),
        };

        if tokenizer.parents.is_empty() {
            Ok(tokens)
        } else {
            Err(ParserError::new(format!(
                "tokenizer exited with {} frames on the stack",
                tokenizer.parents.len()
            )))
        }
    }

    /// Returns the chunk at `delta` from the cursor.
    fn read(&self, delta: isize) -> Chunk<'a> {
        match self.head.checked_add_signed(delta) {
            None => Chunk::Start,
            Some(index) => self.text.get(index).map_or(Chunk::End, |&text| Chunk::Text(text)),
        }
    }

    /// Returns the chunk at `delta` from the cursor, failing the route if it
    /// is past the end of the input.
    fn read_strict(&mut self, delta: isize) -> Route<&'a str> {
        match self.read(delta) {
            Chunk::Text(text) => Ok(text),
            Chunk::Start | Chunk::End => self.fail_route(),
        }
    }

    /// Returns true if the cursor is at the start of a line, ignoring one
    /// chunk of leading whitespace.
    fn at_line_start(&self) -> bool {
        self.read(-1).is_line_start()
            || (self.read(-2).is_line_start() && self.read(-1).is_space())
    }

    /// Returns true if a closer recorded at `closer` is at or after the
    /// cursor. A route which needs that closer fails at the end of the input
    /// otherwise.
    fn can_close(&self, closer: Option<usize>) -> bool {
        closer.is_some_and(|index| index >= self.head)
    }

    /// Returns true if another frame can be pushed.
    fn can_recurse(&self) -> bool {
        let can = self.parents.len() < MAX_DEPTH;
        if !can {
            log::trace!("depth limit reached at chunk {}", self.head);
        }
        can
    }

    /// Pushes a new frame with the given context.
    fn push(&mut self, context: Context) -> Route<()> {
        if self.bad_routes.contains(&(self.head, context)) {
            log::trace!("memoized bad route at chunk {} in {context:?}", self.head);
            return Err(Halt::BadRoute { context });
        }
        let parent = mem::replace(&mut self.frame, Frame::new(context, self.head));
        self.parents.push(parent);
        Ok(())
    }

    /// Pops the innermost frame and returns its tokens.
    fn pop(&mut self) -> Result<Vec<Token>, ParserError> {
        self.push_textbuffer();
        let parent = self
            .parents
            .pop()
            .ok_or_else(|| ParserError::new("token stack underflow"))?;
        Ok(mem::replace(&mut self.frame, parent).tokens)
    }

    /// Pops the innermost frame, replacing the context of the parent frame
    /// with the context of the popped frame.
    fn pop_keep_context(&mut self) -> Result<Vec<Token>, ParserError> {
        let context = self.frame.context;
        let tokens = self.pop()?;
        self.frame.context = context;
        Ok(tokens)
    }

    /// Records the innermost frame as a failed route.
    fn memoize_bad_route(&mut self) {
        self.bad_routes.insert(self.frame.ident);
    }

    /// Fails the innermost frame.
    fn fail_route<T>(&mut self) -> Route<T> {
        let context = self.frame.context;
        self.memoize_bad_route();
        self.pop()?;
        Err(Halt::BadRoute { context })
    }

    /// Runs a speculative route.
    ///
    /// On a bad route, every frame pushed by the route which is still on the
    /// stack is memoized and discarded, the cursor is restored, and the
    /// context of the failure is returned in the inner `Err`.
    fn attempt<T>(
        &mut self,
        route: impl FnOnce(&mut Self) -> Route<T>,
    ) -> Result<Result<T, Context>, ParserError> {
        let depth = self.parents.len();
        let head = self.head;
        match route(self) {
            Ok(value) => Ok(Ok(value)),
            Err(Halt::BadRoute { context }) => {
                while self.parents.len() > depth {
                    self.memoize_bad_route();
                    self.pop()?;
                }
                self.head = head;
                Ok(Err(context))
            }
            Err(Halt::Internal(error)) => Err(error),
        }
    }

    /// Converts pending text into a text token.
    fn push_textbuffer(&mut self) {
        if !self.frame.textbuffer.is_empty() {
            let text = mem::take(&mut self.frame.textbuffer);
            self.frame.tokens.push(Token::Text { text });
        }
    }

    /// Appends a token to the innermost frame.
    fn emit(&mut self, token: Token) {
        self.push_textbuffer();
        self.frame.tokens.push(token);
    }

    /// Prepends a token to the innermost frame.
    fn emit_first(&mut self, token: Token) {
        self.push_textbuffer();
        self.frame.tokens.insert(0, token);
    }

    /// Appends text to the innermost frame.
    fn emit_text(&mut self, text: &str) {
        self.frame.textbuffer.push_str(text);
    }

    /// Appends tokens to the innermost frame, merging a leading text token with
    /// any pending text. Text stays pending if nothing else follows it.
    fn emit_all(&mut self, tokens: Vec<Token>) {
        let mut tokens = tokens.into_iter().peekable();
        if let Some(Token::Text { text }) = tokens.next_if(|token| matches!(token, Token::Text { .. })) {
            self.emit_text(&text);
        }
        if tokens.peek().is_some() {
            self.push_textbuffer();
            self.frame.tokens.extend(tokens);
        }
    }

    /// Pops the innermost frame, then emits `text` followed by the popped
    /// tokens.
    fn emit_text_then_stack(&mut self, text: &str) -> Route<()> {
        let stack = self.pop()?;
        self.emit_text(text);
        self.emit_all(stack);
        self.head -= 1;
        Ok(())
    }

    /// Returns the name of the tag whose frame is innermost.
    fn tag_name(&self) -> &str {
        match self.frame.tokens.get(1) {
            Some(Token::Text { text }) => text,
            _ => "",
        }
    }

    /// Parses chunks until the innermost construct ends, returning its tokens.
    fn parse(&mut self, context: Context, push: bool) -> Route<Vec<Token>> {
        if push {
            self.push(context)?;
        }

        loop {
            let chunk = self.read(0);
            if self.frame.context.intersects(Context::UNSAFE) && !self.verify_safe(chunk) {
                if self.frame.context.intersects(Context::DOUBLE) {
                    self.pop()?;
                }
                return self.fail_route();
            }

            let Chunk::Text(this) = chunk else {
                return self.handle_end();
            };

            if !chunk.is_marker() {
                self.emit_text(this);
                self.head += 1;
                continue;
            }

            let next = self.read(1);
            let ctx = self.frame.context;

            if this == "{" && next.is("{") {
                if self.can_recurse() {
                    self.parse_template_or_argument()?;
                } else {
                    self.emit_text("{");
                }
            } else if this == "|" && ctx.intersects(Context::TEMPLATE) {
                self.handle_template_param()?;
            } else if this == "=" && ctx.contains(Context::TEMPLATE_PARAM_KEY) {
                if !self.in_heading && self.read(-1).is_line_start() && next.is("=") {
                    self.parse_heading()?;
                } else {
                    self.handle_template_param_value()?;
                }
            } else if this == "}" && next.is("}") && ctx.intersects(Context::TEMPLATE) {
                return self.handle_template_end();
            } else if this == "|" && ctx.contains(Context::ARGUMENT_NAME) {
                self.handle_argument_separator();
            } else if this == "}" && next.is("}") && ctx.intersects(Context::ARGUMENT) {
                if self.read(2).is("}") {
                    return self.handle_argument_end();
                }
                self.emit_text("}");
            } else if this == "[" && next.is("[") && self.can_recurse() {
                if ctx.intersects(Context::NO_WIKILINKS) {
                    self.emit_text("[");
                } else {
                    self.parse_wikilink()?;
                }
            } else if this == "|" && ctx.contains(Context::WIKILINK_TITLE) {
                self.handle_wikilink_separator();
            } else if this == "]" && next.is("]") && ctx.intersects(Context::WIKILINK) {
                return self.handle_wikilink_end();
            } else if this == "[" {
                self.parse_external_link(true)?;
            } else if this == ":" && !self.read(-1).is_marker() {
                self.parse_external_link(false)?;
            } else if this == "]" && ctx.contains(Context::EXT_LINK_TITLE) {
                return Ok(self.pop()?);
            } else if this == "=" && !self.in_heading && !ctx.intersects(Context::TEMPLATE) {
                if self.read(-1).is_line_start() {
                    self.parse_heading()?;
                } else {
                    self.emit_text("=");
                }
            } else if this == "=" && ctx.intersects(Context::HEADING) {
                return self.handle_heading_end();
            } else if this == "\n" && ctx.intersects(Context::HEADING) {
                return self.fail_route();
            } else if this == "&" {
                self.parse_entity()?;
            } else if this == "<" && next.is("!") {
                if self.read(2).is("-") && self.read(3).is("-") {
                    self.parse_comment()?;
                } else {
                    self.emit_text(this);
                }
            } else if this == "<" && next.is("/") && self.read(2) != Chunk::End {
                if ctx.contains(Context::TAG_BODY) {
                    self.handle_tag_open_close()?;
                } else {
                    self.handle_invalid_tag_start()?;
                }
            } else if this == "<" && !ctx.contains(Context::TAG_CLOSE) {
                if self.can_recurse() {
                    self.parse_tag()?;
                } else {
                    self.emit_text("<");
                }
            } else if this == ">" && ctx.contains(Context::TAG_CLOSE) {
                return self.handle_tag_close_close();
            } else if this == "'" && next.is("'") && !self.skip_style_tags {
                if let Some(tokens) = self.parse_style()? {
                    return Ok(tokens);
                }
            } else if self.read(-1).is_line_start() && chunk.is_list_marker() {
                self.handle_list();
            } else if self.read(-1).is_line_start()
                && this == "-"
                && next.is("-")
                && self.read(2).is("-")
                && self.read(3).is("-")
            {
                self.handle_hr();
            } else if (this == "\n" || this == ":") && ctx.contains(Context::DL_TERM) {
                self.handle_dl_term();
                if this == "\n" {
                    self.frame.context.remove(Context::TABLE_CELL_LINE_CONTEXTS);
                }
            } else if this == "{" && next.is("|") && self.at_line_start() {
                if self.can_recurse() {
                    self.parse_table()?;
                } else {
                    self.emit_text("{");
                }
            } else if ctx.contains(Context::TABLE_OPEN) {
                if let Some(tokens) = self.handle_table_markup(this, next)? {
                    return Ok(tokens);
                }
            } else {
                self.emit_text(this);
            }

            self.head += 1;
        }
    }

    /// Handles the end of the input.
    fn handle_end(&mut self) -> Route<Vec<Token>> {
        if self.frame.context.intersects(Context::FAIL) {
            if self.frame.context.contains(Context::TAG_BODY)
                && config::is_single(self.tag_name())
            {
                return self.handle_single_tag_end();
            }
            if self.frame.context.contains(Context::TABLE_CELL_OPEN) {
                self.pop()?;
            }
            if self.frame.context.intersects(Context::DOUBLE) {
                self.pop()?;
            }
            return self.fail_route();
        }
        Ok(self.pop()?)
    }

    /// Checks whether `this` is allowed in an unsafe context like a template
    /// name, updating the safety bits of the context.
    fn verify_safe(&mut self, this: Chunk<'a>) -> bool {
        let ctx = self.frame.context;
        if ctx.contains(Context::FAIL_NEXT) {
            return false;
        }

        if ctx.contains(Context::WIKILINK_TITLE) {
            if this.is("]") || this.is("{") {
                self.frame.context |= Context::FAIL_NEXT;
            } else if this.is("\n") || this.is("[") || this.is("}") || this.is(">") {
                return false;
            } else if this.is("<") {
                if self.read(1).is("!") {
                    self.frame.context |= Context::FAIL_NEXT;
                } else {
                    return false;
                }
            }
            return true;
        }

        if ctx.contains(Context::EXT_LINK_TITLE) {
            return !this.is("\n");
        }

        if ctx.contains(Context::TEMPLATE_NAME) {
            if this.is("{") {
                self.frame.context |= Context::HAS_TEMPLATE | Context::FAIL_NEXT;
                return true;
            }
            if this.is("}") || (this.is("<") && self.read(1).is("!")) {
                self.frame.context |= Context::FAIL_NEXT;
                return true;
            }
            if this.is("[") || this.is("]") || this.is("<") || this.is(">") {
                return false;
            }
            if this.is("|") {
                return true;
            }
            if ctx.contains(Context::HAS_TEXT) {
                if ctx.contains(Context::FAIL_ON_TEXT) {
                    if this == Chunk::End || !this.is_space() {
                        return false;
                    }
                } else if this.is("\n") {
                    self.frame.context |= Context::FAIL_ON_TEXT;
                }
            } else if this == Chunk::End || !this.is_space() {
                self.frame.context |= Context::HAS_TEXT;
            }
            return true;
        }

        if ctx.contains(Context::TAG_CLOSE) {
            return !this.is("<");
        }

        if ctx.contains(Context::FAIL_ON_EQUALS) {
            if this.is("=") {
                return false;
            }
        } else if ctx.contains(Context::FAIL_ON_LBRACE) {
            if this.is("{") || (self.read(-1).is("{") && self.read(-2).is("{")) {
                if ctx.intersects(Context::TEMPLATE) {
                    self.frame.context |= Context::FAIL_ON_EQUALS;
                } else {
                    self.frame.context |= Context::FAIL_NEXT;
                }
                return true;
            }
            self.frame.context.remove(Context::FAIL_ON_LBRACE);
        } else if ctx.contains(Context::FAIL_ON_RBRACE) {
            if this.is("}") {
                self.frame.context |= Context::FAIL_NEXT;
                return true;
            }
            self.frame.context.remove(Context::FAIL_ON_RBRACE);
        } else if this.is("{") {
            self.frame.context |= Context::FAIL_ON_LBRACE;
        } else if this.is("}") {
            self.frame.context |= Context::FAIL_ON_RBRACE;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_delimiters() {
        assert_eq!(
            split("foo {{bar|baz}}\n"),
            ["foo ", "{", "{", "bar", "|", "baz", "}", "}", "\n"]
        );
        assert_eq!(split(""), Vec::<&str>::new());
        assert_eq!(split("a\\\"b"), ["a", "\\", "\"", "b"]);
    }

    #[test]
    fn chunk_classes() {
        assert!(Chunk::Start.is_marker());
        assert!(Chunk::Text("-").is_marker());
        assert!(!Chunk::Text("{}").is_marker());
        assert!(!Chunk::Text("abc").is_marker());
        assert!(Chunk::Text(" \t").is_space());
        assert!(!Chunk::End.is_space());
        assert!(Chunk::Start.is_line_start());
    }

    #[test]
    fn failed_route_is_memoized() {
        let mut tokenizer = Tokenizer::new("{{ }}", false);
        let tokens = tokenizer.parse(Context::empty(), true).unwrap();
        assert_eq!(tokens, [Token::text("{{ }}")]);
        assert!(tokenizer.bad_routes.contains(&(2, Context::TEMPLATE_NAME)));

        tokenizer.head = 2;
        assert!(matches!(
            tokenizer.push(Context::TEMPLATE_NAME),
            Err(Halt::BadRoute { context }) if context == Context::TEMPLATE_NAME
        ));
    }

    #[test]
    fn unclosable_routes_are_skipped() {
        let input = format!("{}<!-- x {}", "{{a|".repeat(500), "<!--".repeat(500));
        let mut tokenizer = Tokenizer::new(&input, false);
        let tokens = tokenizer.parse(Context::empty(), true).unwrap();
        assert_eq!(tokens, [Token::text(&input)]);
        assert!(tokenizer.bad_routes.is_empty());
        assert!(tokenizer.parents.is_empty());
    }

    #[test]
    fn closers_before_the_cursor_do_not_count() {
        let chunks = split("}} {{a");
        assert_eq!(find_last(&chunks, &["}", "}"]), Some(0));
        let mut tokenizer = Tokenizer::new("}} {{a", false);
        let tokens = tokenizer.parse(Context::empty(), true).unwrap();
        assert_eq!(tokens, [Token::text("}} {{a")]);
        assert!(tokenizer.bad_routes.is_empty());
    }
}
