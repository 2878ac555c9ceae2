//! Bold and italic text, lists, and horizontal rules.

use super::{Context, Route, Token, Tokenizer, config};

impl Tokenizer<'_> {
    /// Emits a complete wiki markup style tag around `body`.
    fn emit_style_tag(&mut self, tag: &str, markup: &str, body: Vec<Token>) {
        self.emit(Token::TagOpenOpen {
            wiki_markup: Some(markup.to_string()),
            invalid: false,
        });
        self.emit_text(tag);
        self.emit(Token::TagCloseOpen {
            wiki_markup: None,
            padding: String::new(),
        });
        self.emit_all(body);
        self.emit(Token::TagOpenClose { wiki_markup: None });
        self.emit_text(tag);
        self.emit(Token::TagCloseClose);
    }

    /// Parses italic text after a `''`.
    fn parse_italics(&mut self) -> Route<()> {
        let reset = self.head;
        let body = match self.attempt(|this| this.parse(Context::STYLE_ITALICS, true))? {
            Ok(body) => body,
            Err(context) if context.contains(Context::STYLE_PASS_AGAIN) => {
                let context = Context::STYLE_ITALICS | Context::STYLE_SECOND_PASS;
                match self.attempt(move |this| this.parse(context, true))? {
                    Ok(body) => body,
                    Err(_) => {
                        self.head = reset;
                        self.emit_text("''");
                        return Ok(());
                    }
                }
            }
            Err(_) => {
                self.head = reset;
                self.emit_text("''");
                return Ok(());
            }
        };
        self.emit_style_tag("i", "''", body);
        Ok(())
    }

    /// Parses bold text after a `'''`. Returns true if the enclosing italics
    /// should end here instead.
    fn parse_bold(&mut self) -> Route<bool> {
        let reset = self.head;
        match self.attempt(|this| this.parse(Context::STYLE_BOLD, true))? {
            Ok(body) => self.emit_style_tag("b", "'''", body),
            Err(_) => {
                self.head = reset;
                let ctx = self.frame.context;
                if ctx.contains(Context::STYLE_SECOND_PASS) {
                    self.emit_text("'");
                    return Ok(true);
                }
                if ctx.contains(Context::STYLE_ITALICS) {
                    self.frame.context |= Context::STYLE_PASS_AGAIN;
                    self.emit_text("'''");
                } else {
                    self.emit_text("'");
                    self.parse_italics()?;
                }
            }
        }
        Ok(false)
    }

    /// Parses text after a `'''''`, which may be bold inside italics, italics
    /// inside bold, or some combination of the two which closes separately.
    fn parse_italics_and_bold(&mut self) -> Route<()> {
        let reset = self.head;
        match self.attempt(|this| this.parse(Context::STYLE_BOLD, true))? {
            Ok(bold) => {
                let reset = self.head;
                match self.attempt(|this| this.parse(Context::STYLE_ITALICS, true))? {
                    Ok(italics) => {
                        self.push(Context::empty())?;
                        self.emit_style_tag("b", "'''", bold);
                        self.emit_all(italics);
                        let body = self.pop()?;
                        self.emit_style_tag("i", "''", body);
                    }
                    Err(_) => {
                        self.head = reset;
                        self.emit_text("''");
                        self.emit_style_tag("b", "'''", bold);
                    }
                }
            }
            Err(_) => {
                self.head = reset;
                match self.attempt(|this| this.parse(Context::STYLE_ITALICS, true))? {
                    Ok(italics) => {
                        let reset = self.head;
                        match self.attempt(|this| this.parse(Context::STYLE_BOLD, true))? {
                            Ok(bold) => {
                                self.push(Context::empty())?;
                                self.emit_style_tag("i", "''", italics);
                                self.emit_all(bold);
                                let body = self.pop()?;
                                self.emit_style_tag("b", "'''", body);
                            }
                            Err(_) => {
                                self.head = reset;
                                self.emit_text("'''");
                                self.emit_style_tag("i", "''", italics);
                            }
                        }
                    }
                    Err(_) => {
                        self.head = reset;
                        self.emit_text("'''''");
                    }
                }
            }
        }
        Ok(())
    }

    /// Parses a run of apostrophes. Returns the tokens of the innermost frame
    /// if the run closed it.
    pub(super) fn parse_style(&mut self) -> Route<Option<Vec<Token>>> {
        self.head += 2;
        let mut ticks = 2;
        while self.read(0).is("'") {
            self.head += 1;
            ticks += 1;
        }

        let ctx = self.frame.context;
        let italics = ctx.contains(Context::STYLE_ITALICS);
        let bold = ctx.contains(Context::STYLE_BOLD);

        if ticks > 5 {
            self.emit_text(&"'".repeat(ticks - 5));
            ticks = 5;
        } else if ticks == 4 {
            self.emit_text("'");
            ticks = 3;
        }

        if (italics && matches!(ticks, 2 | 5)) || (bold && matches!(ticks, 3 | 5)) {
            if ticks == 5 {
                self.head -= if italics { 3 } else { 2 };
            }
            return Ok(Some(self.pop()?));
        }

        if !self.can_recurse() {
            if ticks == 3 {
                if ctx.contains(Context::STYLE_SECOND_PASS) {
                    self.emit_text("'");
                    return Ok(Some(self.pop()?));
                }
                if italics {
                    self.frame.context |= Context::STYLE_PASS_AGAIN;
                }
            }
            self.emit_text(&"'".repeat(ticks));
        } else if ticks == 2 {
            self.parse_italics()?;
        } else if ticks == 3 {
            if self.parse_bold()? {
                return Ok(Some(self.pop()?));
            }
        } else {
            self.parse_italics_and_bold()?;
        }
        self.head -= 1;
        Ok(None)
    }

    /// Emits a single list marker as a self-closing tag.
    fn handle_list_marker(&mut self) {
        let markup = self.read(0).text();
        if markup == ";" {
            self.frame.context |= Context::DL_TERM;
        }
        self.emit(Token::TagOpenOpen {
            wiki_markup: Some(markup.to_string()),
            invalid: false,
        });
        self.emit_text(config::html_tag_for(markup).unwrap_or_default());
        self.emit(Token::TagCloseSelfclose {
            wiki_markup: None,
            padding: String::new(),
            implicit: false,
        });
    }

    /// Parses a run of list markers at the start of a line.
    pub(super) fn handle_list(&mut self) {
        self.handle_list_marker();
        while self.read(1).is_list_marker() {
            self.head += 1;
            self.handle_list_marker();
        }
    }

    /// Parses a horizontal rule.
    pub(super) fn handle_hr(&mut self) {
        let mut length = 4;
        self.head += 3;
        while self.read(1).is("-") {
            length += 1;
            self.head += 1;
        }
        self.emit(Token::TagOpenOpen {
            wiki_markup: Some("-".repeat(length)),
            invalid: false,
        });
        self.emit_text("hr");
        self.emit(Token::TagCloseSelfclose {
            wiki_markup: None,
            padding: String::new(),
            implicit: false,
        });
    }

    /// Handles the end of a description list term.
    pub(super) fn handle_dl_term(&mut self) {
        self.frame.context.remove(Context::DL_TERM);
        if self.read(0).is(":") {
            self.handle_list_marker();
        } else {
            self.emit_text("\n");
        }
    }
}
