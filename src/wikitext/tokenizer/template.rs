//! Templates, template arguments, headings, entities, and comments.

use super::{Chunk, Context, Route, Token, Tokenizer, config};

impl Tokenizer<'_> {
    /// Parses a run of `{`, which may be any combination of templates and
    /// arguments, or plain text.
    ///
    /// ```wikitext
    /// {{{{{arg}}}}}
    /// ```
    pub(super) fn parse_template_or_argument(&mut self) -> Route<()> {
        self.head += 2;
        let mut braces = 2;
        while self.read(0).is("{") {
            self.head += 1;
            braces += 1;
        }
        if !self.can_close(self.last_braces_close) {
            log::trace!("no closing braces after chunk {}", self.head);
            self.head -= 1;
            self.emit_text(&"{".repeat(braces));
            return Ok(());
        }
        let mut has_content = false;
        self.push(Context::empty())?;

        while braces > 0 {
            if braces == 1 {
                return self.emit_text_then_stack("{");
            }

            if braces == 2 {
                if self.attempt(move |this| this.parse_template(has_content))?.is_err() {
                    return self.emit_text_then_stack("{{");
                }
                break;
            }

            if self.attempt(Self::parse_argument)?.is_ok() {
                braces -= 3;
            } else if self.attempt(move |this| this.parse_template(has_content))?.is_ok() {
                braces -= 2;
            } else {
                return self.emit_text_then_stack(&"{".repeat(braces));
            }

            if braces > 0 {
                has_content = true;
                self.head += 1;
            }
        }

        let tokens = self.pop()?;
        self.emit_all(tokens);
        self.frame.context.remove(Context::FAIL_NEXT);
        Ok(())
    }

    /// Parses a template.
    fn parse_template(&mut self, has_content: bool) -> Route<()> {
        let mut context = Context::TEMPLATE_NAME;
        if has_content {
            context |= Context::HAS_TEMPLATE;
        }
        let template = self.parse(context, true)?;
        self.emit_first(Token::TemplateOpen);
        self.emit_all(template);
        self.emit(Token::TemplateClose);
        Ok(())
    }

    /// Parses a template argument.
    fn parse_argument(&mut self) -> Route<()> {
        let argument = self.parse(Context::ARGUMENT_NAME, true)?;
        self.emit_first(Token::ArgumentOpen);
        self.emit_all(argument);
        self.emit(Token::ArgumentClose);
        Ok(())
    }

    /// Handles a `|` which starts a template parameter.
    pub(super) fn handle_template_param(&mut self) -> Route<()> {
        let ctx = self.frame.context;
        if ctx.contains(Context::TEMPLATE_NAME) {
            if !ctx.intersects(Context::HAS_TEXT | Context::HAS_TEMPLATE) {
                return self.fail_route();
            }
            self.frame.context.remove(Context::TEMPLATE_NAME);
        } else if ctx.contains(Context::TEMPLATE_PARAM_VALUE) {
            self.frame.context.remove(Context::TEMPLATE_PARAM_VALUE);
        } else {
            let key = self.pop()?;
            self.emit_all(key);
        }
        self.frame.context |= Context::TEMPLATE_PARAM_KEY;
        self.emit(Token::TemplateParamSeparator);
        // The key gets its own frame so that it can be folded back into the
        // template frame if no `=` turns up.
        self.push(self.frame.context)
    }

    /// Handles a `=` which separates a parameter key from its value.
    pub(super) fn handle_template_param_value(&mut self) -> Route<()> {
        let key = self.pop()?;
        self.emit_all(key);
        self.frame.context.remove(Context::TEMPLATE_PARAM_KEY);
        self.frame.context |= Context::TEMPLATE_PARAM_VALUE;
        self.emit(Token::TemplateParamEquals);
        Ok(())
    }

    /// Handles `}}` at the end of a template.
    pub(super) fn handle_template_end(&mut self) -> Route<Vec<Token>> {
        let ctx = self.frame.context;
        if ctx.contains(Context::TEMPLATE_NAME) {
            if !ctx.intersects(Context::HAS_TEXT | Context::HAS_TEMPLATE) {
                return self.fail_route();
            }
        } else if ctx.contains(Context::TEMPLATE_PARAM_KEY) {
            let key = self.pop()?;
            self.emit_all(key);
        }
        self.head += 1;
        Ok(self.pop()?)
    }

    /// Handles a `|` which separates an argument name from its default.
    pub(super) fn handle_argument_separator(&mut self) {
        self.frame.context.remove(Context::ARGUMENT_NAME);
        self.frame.context |= Context::ARGUMENT_DEFAULT;
        self.emit(Token::ArgumentSeparator);
    }

    /// Handles `}}}` at the end of an argument.
    pub(super) fn handle_argument_end(&mut self) -> Route<Vec<Token>> {
        self.head += 2;
        Ok(self.pop()?)
    }

    /// Parses a section heading.
    ///
    /// ```wikitext
    /// == Heading ==
    /// ```
    pub(super) fn parse_heading(&mut self) -> Route<()> {
        self.in_heading = true;
        let result = self.really_parse_heading();
        self.in_heading = false;
        result
    }

    /// Parses a section heading while the heading flag is set.
    fn really_parse_heading(&mut self) -> Route<()> {
        let reset = self.head;
        self.head += 1;
        let mut best = 1;
        while self.read(0).is("=") {
            best += 1;
            self.head += 1;
        }

        let context = Context::heading(best);
        match self.attempt(move |this| this.parse(context, true))? {
            Ok(title) => {
                let level = self.heading_level;
                self.emit(Token::HeadingStart { level });
                if level < best {
                    self.emit_text(&"=".repeat(best - level));
                }
                self.emit_all(title);
                self.emit(Token::HeadingEnd);
            }
            Err(_) => {
                self.head = reset + best - 1;
                self.emit_text(&"=".repeat(best));
            }
        }
        Ok(())
    }

    /// Handles a run of `=` which may end a heading.
    ///
    /// The run only ends the heading if nothing but whitespace follows it on
    /// the line, so the rest of the line is tried as a continuation first.
    pub(super) fn handle_heading_end(&mut self) -> Route<Vec<Token>> {
        let reset = self.head;
        self.head += 1;
        let mut best = 1;
        while self.read(0).is("=") {
            best += 1;
            self.head += 1;
        }

        let context = self.frame.context;
        let current = context.heading_level().unwrap_or(1);
        let level = current.min(best.min(6));

        match self.attempt(move |this| this.parse(context, true))? {
            Ok(after) => {
                // `heading_level` now holds the level of the later closing run
                self.emit_text(&"=".repeat(best));
                self.emit_all(after);
            }
            Err(_) => {
                if level < best {
                    self.emit_text(&"=".repeat(best - level));
                }
                self.head = reset + best - 1;
                self.heading_level = level;
            }
        }
        Ok(self.pop()?)
    }

    /// Parses an HTML entity.
    ///
    /// ```wikitext
    /// &amp; &#123; &#x7b;
    /// ```
    pub(super) fn parse_entity(&mut self) -> Route<()> {
        let reset = self.head;
        let parsed = self.attempt(|this| {
            this.push(Context::HTML_ENTITY)?;
            this.really_parse_entity()
        })?;

        if parsed.is_ok() {
            let entity = self.pop()?;
            self.emit_all(entity);
        } else {
            self.head = reset;
            let this = self.read(0).text();
            self.emit_text(this);
        }
        Ok(())
    }

    /// Parses an HTML entity inside its own frame.
    fn really_parse_entity(&mut self) -> Route<()> {
        self.emit(Token::HtmlEntityStart);
        self.head += 1;

        let mut this = self.read_strict(0)?;
        let mut numeric = false;
        let mut hexadecimal = false;
        if this == "#" {
            numeric = true;
            self.emit(Token::HtmlEntityNumeric);
            self.head += 1;
            this = self.read_strict(0)?;
            if let Some(rest) = this.strip_prefix(['x', 'X']) {
                hexadecimal = true;
                let char = if this.starts_with('X') { 'X' } else { 'x' };
                self.emit(Token::HtmlEntityHex { char });
                this = rest;
                if this.is_empty() {
                    return self.fail_route();
                }
            }
        }

        let valid = this.chars().all(|c| {
            if hexadecimal {
                c.is_ascii_hexdigit()
            } else if numeric {
                c.is_ascii_digit()
            } else {
                c.is_ascii_alphanumeric()
            }
        });
        if !valid {
            return self.fail_route();
        }

        self.head += 1;
        if !self.read(0).is(";") {
            return self.fail_route();
        }

        let known = if numeric {
            let radix = if hexadecimal { 16 } else { 10 };
            u32::from_str_radix(this, radix)
                .ok()
                .is_some_and(|value| value >= 1 && char::from_u32(value).is_some())
        } else {
            config::named_entity(this).is_some()
        };
        if !known {
            return self.fail_route();
        }

        self.emit(Token::text(this));
        self.emit(Token::HtmlEntityEnd);
        Ok(())
    }

    /// Parses an HTML comment.
    ///
    /// ```wikitext
    /// <!-- comment -->
    /// ```
    pub(super) fn parse_comment(&mut self) -> Route<()> {
        self.head += 4;
        let reset = self.head - 1;
        if !self.can_close(self.last_comment_close) {
            self.head = reset;
            self.emit_text("<!--");
            return Ok(());
        }
        self.push(Context::empty())?;
        loop {
            let this = self.read(0);
            if this == Chunk::End {
                self.pop()?;
                self.head = reset;
                self.emit_text("<!--");
                return Ok(());
            }
            if this.is("-") && self.read(1).is("-") && self.read(2).is(">") {
                self.emit_first(Token::CommentStart);
                self.emit(Token::CommentEnd);
                let comment = self.pop()?;
                self.emit_all(comment);
                self.head += 2;
                // A comment may follow a `<` in a name, which flagged the next
                // chunk as a failure
                self.frame.context.remove(Context::FAIL_NEXT);
                return Ok(());
            }
            self.emit_text(this.text());
            self.head += 1;
        }
    }
}
