//! Wikilinks and external links.

use super::{Chunk, Context, Halt, Route, Token, Tokenizer, config};

/// Characters allowed in a URI scheme.
fn is_scheme_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-')
}

impl<'a> Tokenizer<'a> {
    /// Parses a wikilink, or a bracketed external link that was written with
    /// double brackets.
    ///
    /// ```wikitext
    /// [[Title|text]] [[https://example.com title]]
    /// ```
    pub(super) fn parse_wikilink(&mut self) -> Route<()> {
        let reset = self.head + 1;
        self.head += 2;

        match self.attempt(|this| this.really_parse_external_link(true))? {
            Ok((link, _)) => {
                if self.frame.context.contains(Context::EXT_LINK_TITLE) {
                    // An external link inside of an external link title is
                    // just text
                    self.head = reset;
                    self.emit_text("[[");
                    return Ok(());
                }
                self.emit_text("[");
                self.emit(Token::ExternalLinkOpen { brackets: true });
                self.emit_all(link);
                self.emit(Token::ExternalLinkClose);
            }
            Err(_) => {
                self.head = reset + 1;
                match self.attempt(|this| this.parse(Context::WIKILINK_TITLE, true))? {
                    Ok(wikilink) => {
                        self.emit(Token::WikilinkOpen);
                        self.emit_all(wikilink);
                        self.emit(Token::WikilinkClose);
                    }
                    Err(_) => {
                        self.head = reset;
                        self.emit_text("[[");
                    }
                }
            }
        }
        Ok(())
    }

    /// Handles a `|` which separates a wikilink title from its text.
    pub(super) fn handle_wikilink_separator(&mut self) {
        self.frame.context.remove(Context::WIKILINK_TITLE);
        self.frame.context |= Context::WIKILINK_TEXT;
        self.emit(Token::WikilinkSeparator);
    }

    /// Handles `]]` at the end of a wikilink.
    pub(super) fn handle_wikilink_end(&mut self) -> Route<Vec<Token>> {
        self.head += 1;
        Ok(self.pop()?)
    }

    /// Parses the scheme of a bracketed external link.
    fn parse_bracketed_uri_scheme(&mut self) -> Route<()> {
        self.push(Context::EXT_LINK_URI)?;
        if self.read(0).is("/") && self.read(1).is("/") {
            self.emit_text("//");
            self.head += 2;
            return Ok(());
        }

        let mut scheme = String::new();
        while let Chunk::Text(text) = self.read(0)
            && text.chars().all(is_scheme_char)
        {
            scheme.push_str(text);
            self.emit_text(text);
            self.head += 1;
        }

        if !self.read(0).is(":") {
            return self.fail_route();
        }
        self.emit_text(":");
        self.head += 1;

        let slashes = self.read(0).is("/") && self.read(1).is("/");
        if slashes {
            self.emit_text("//");
            self.head += 2;
        }
        if !config::is_scheme(&scheme, slashes) {
            return self.fail_route();
        }
        Ok(())
    }

    /// Parses the scheme of a free external link.
    ///
    /// The scheme was already emitted as text by the time the `:` is seen, so
    /// it is recovered from the end of the text buffer.
    fn parse_free_uri_scheme(&mut self) -> Route<()> {
        let mut scheme = Vec::new();
        for c in self.frame.textbuffer.chars().rev() {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            if !is_scheme_char(c) {
                return Err(Halt::BadRoute {
                    context: self.frame.context,
                });
            }
            scheme.push(c);
        }
        let scheme = scheme.into_iter().rev().collect::<String>();

        let slashes = self.read(0).is("/") && self.read(1).is("/");
        if !config::is_scheme(&scheme, slashes) {
            return Err(Halt::BadRoute {
                context: self.frame.context,
            });
        }

        self.push(self.frame.context | Context::EXT_LINK_URI)?;
        self.emit_text(&scheme);
        self.emit_text(":");
        if slashes {
            self.emit_text("//");
            self.head += 2;
        }
        Ok(())
    }

    /// Emits the pending trailing punctuation of a free link.
    fn flush_tail(&mut self, tail: &mut String) {
        if !tail.is_empty() {
            self.emit_text(tail);
            tail.clear();
        }
    }

    /// Emits text inside a free link, holding back trailing punctuation in
    /// `tail` since it will not be part of the link if the link ends here.
    fn handle_free_link_text(&mut self, punct: &mut String, tail: &mut String, mut this: &str) {
        if this.contains('(') && punct.ends_with(')') {
            punct.pop();
        }

        if this.ends_with(|c| punct.contains(c)) {
            let split = this.trim_end_matches(|c| punct.contains(c)).len();
            let (stripped, trailing) = this.split_at(split);
            if !stripped.is_empty() {
                self.flush_tail(tail);
            }
            tail.push_str(trailing);
            this = stripped;
        } else {
            self.flush_tail(tail);
        }
        self.emit_text(this);
    }

    /// Returns true if `this` ends the URI part of an external link.
    fn is_uri_end(&self, this: Chunk<'a>, next: Chunk<'a>) -> bool {
        let after = self.read(2);
        let ctx = self.frame.context;
        this == Chunk::End
            || ["\n", "[", "]", "<", ">", "\""].into_iter().any(|end| this.is(end))
            || this.text().contains(' ')
            || (this.is("'") && next.is("'"))
            || (this.is("|") && ctx.intersects(Context::TEMPLATE))
            || (this.is("=") && ctx.intersects(Context::TEMPLATE_PARAM_KEY | Context::HEADING))
            || (this.is("}") && next.is("}") && ctx.intersects(Context::TEMPLATE))
            || (this.is("}") && next.is("}") && after.is("}") && ctx.intersects(Context::ARGUMENT))
    }

    /// Parses an external link in its own frame, returning the link tokens
    /// and any trailing text which turned out not to be part of a free link.
    fn really_parse_external_link(&mut self, brackets: bool) -> Route<(Vec<Token>, String)> {
        let (invalid, mut punct): (&[char], _) = if brackets {
            self.parse_bracketed_uri_scheme()?;
            (&['\n', ' ', ']'][..], String::new())
        } else {
            self.parse_free_uri_scheme()?;
            (&['\n', ' ', '[', ']'][..], String::from(",;\\.:!?)"))
        };

        match self.read(0) {
            Chunk::Text(text) if !text.starts_with(invalid) => {}
            _ => return self.fail_route(),
        }

        let mut tail = String::new();
        loop {
            let this = self.read(0);
            let next = self.read(1);
            if this.is("&") {
                self.flush_tail(&mut tail);
                self.parse_entity()?;
            } else if this.is("<") && next.is("!") && self.read(2).is("-") && self.read(3).is("-") {
                self.flush_tail(&mut tail);
                self.parse_comment()?;
            } else if this.is("{") && next.is("{") && self.can_recurse() {
                self.flush_tail(&mut tail);
                self.parse_template_or_argument()?;
            } else if brackets {
                if this == Chunk::End || this.is("\n") {
                    return self.fail_route();
                }
                if this.is("]") {
                    return Ok((self.pop()?, tail));
                }
                if self.is_uri_end(this, next) {
                    if let Some((before, after)) = this.text().split_once(' ') {
                        self.emit_text(before);
                        self.emit(Token::ExternalLinkSeparator {
                            suppress_space: false,
                        });
                        if !after.is_empty() {
                            self.emit_text(after);
                        }
                        self.head += 1;
                    } else {
                        self.emit(Token::ExternalLinkSeparator {
                            suppress_space: true,
                        });
                    }
                    self.frame.context.remove(Context::EXT_LINK_URI);
                    self.frame.context |= Context::EXT_LINK_TITLE;
                    return Ok((self.parse(Context::empty(), false)?, tail));
                }
                self.emit_text(this.text());
            } else {
                if self.is_uri_end(this, next) {
                    if let Chunk::Text(text) = this
                        && let Some((before, after)) = text.split_once(' ')
                    {
                        self.handle_free_link_text(&mut punct, &mut tail, before);
                        tail.push(' ');
                        tail.push_str(after);
                    } else {
                        self.head -= 1;
                    }
                    return Ok((self.pop()?, tail));
                }
                self.handle_free_link_text(&mut punct, &mut tail, this.text());
            }
            self.head += 1;
        }
    }

    /// Removes a free link scheme which was already emitted as text.
    fn remove_uri_scheme_from_textbuffer(&mut self, scheme: &str) {
        let buffer = &mut self.frame.textbuffer;
        buffer.truncate(buffer.len().saturating_sub(scheme.len()));
    }

    /// Parses an external link at the cursor.
    ///
    /// ```wikitext
    /// [https://example.com title] https://example.com
    /// ```
    pub(super) fn parse_external_link(&mut self, brackets: bool) -> Route<()> {
        let ctx = self.frame.context;
        if ctx.intersects(Context::NO_EXT_LINKS) || !self.can_recurse() {
            if !brackets && ctx.contains(Context::DL_TERM) {
                self.handle_dl_term();
            } else {
                let this = self.read(0).text();
                self.emit_text(this);
            }
            return Ok(());
        }

        let reset = self.head;
        self.head += 1;
        match self.attempt(move |this| this.really_parse_external_link(brackets))? {
            Ok((link, tail)) => {
                if !brackets
                    && let Some(Token::Text { text }) = link.first()
                {
                    let scheme = text.split(':').next().unwrap_or_default().to_string();
                    self.remove_uri_scheme_from_textbuffer(&scheme);
                }
                self.emit(Token::ExternalLinkOpen { brackets });
                self.emit_all(link);
                self.emit(Token::ExternalLinkClose);
                if !tail.is_empty() {
                    self.emit_text(&tail);
                }
            }
            Err(_) => {
                self.head = reset;
                if !brackets && self.frame.context.contains(Context::DL_TERM) {
                    self.handle_dl_term();
                } else {
                    let this = self.read(0).text();
                    self.emit_text(this);
                }
            }
        }
        Ok(())
    }
}
