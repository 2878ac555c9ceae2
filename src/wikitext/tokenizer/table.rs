//! Wiki markup tables.

use super::{
    Chunk, Context, Route, Token, Tokenizer,
    tag::{TagOpenData, TagState},
};

/// The parts of a table tag.
struct TableTag<'t> {
    /// The markup which opens the tag, like `{|` or `|-`.
    open: &'t str,
    /// The HTML tag name.
    tag: &'t str,
    /// The attribute tokens.
    style: Vec<Token>,
    /// Whitespace after the attributes.
    padding: String,
    /// The markup which separates attributes from contents in a cell.
    separator: Option<&'t str>,
    /// The content tokens.
    contents: Vec<Token>,
    /// The markup which closes the tag.
    close: &'t str,
}

impl<'a> Tokenizer<'a> {
    /// Parses the attributes of a table, row, or cell up to `end`, returning
    /// the whitespace which follows them.
    fn handle_table_style(&mut self, end: &str) -> Route<String> {
        let mut data = TagOpenData::new(TagState::ATTR_READY);
        loop {
            let this = self.read(0);
            let can_exit = !data.state.contains(TagState::QUOTED)
                || data.state.contains(TagState::NOTE_SPACE);
            if this.is(end) && can_exit {
                if data.state.intersects(TagState::ATTR_NAME | TagState::ATTR_VALUE) {
                    self.push_tag_buffer(&mut data)?;
                }
                if this.is_space() {
                    data.pad_first.push_str(this.text());
                }
                return Ok(data.pad_first);
            }

            match this {
                Chunk::Text(text) if !this.is(end) => self.handle_tag_data(&mut data, text)?,
                _ => {
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
            }
            self.head += 1;
        }
    }

    /// Parses a table.
    ///
    /// ```wikitext
    /// {| class="wikitable"
    /// |-
    /// ! Header
    /// |-
    /// | Cell || Cell
    /// |}
    /// ```
    pub(super) fn parse_table(&mut self) -> Route<()> {
        let reset = self.head;
        self.head += 2;

        let style = self.attempt(|this| {
            this.push(Context::TABLE_OPEN)?;
            this.handle_table_style("\n")
        })?;
        let Ok(padding) = style else {
            self.head = reset;
            self.emit_text("{");
            return Ok(());
        };
        let style = self.pop()?;

        self.head += 1;
        let Ok(contents) = self.attempt(|this| this.parse(Context::TABLE_OPEN, true))? else {
            self.head = reset;
            self.emit_text("{");
            return Ok(());
        };

        self.emit_table_tag(TableTag {
            open: "{|",
            tag: "table",
            style,
            padding,
            separator: None,
            contents,
            close: "|}",
        });
        self.head -= 1;
        Ok(())
    }

    /// Parses a table row.
    fn handle_table_row(&mut self) -> Route<()> {
        self.head += 2;
        if !self.can_recurse() {
            self.emit_text("|-");
            self.head -= 1;
            return Ok(());
        }

        let context = Context::TABLE_OPEN | Context::TABLE_ROW_OPEN;
        self.push(context)?;
        let padding = self.handle_table_style("\n")?;
        let style = self.pop()?;
        self.head += 1;
        let contents = self.parse(context, true)?;

        self.emit_table_tag(TableTag {
            open: "|-",
            tag: "tr",
            style,
            padding,
            separator: None,
            contents,
            close: "",
        });
        self.head -= 1;
        Ok(())
    }

    /// Parses a table cell.
    ///
    /// A cell is parsed once assuming it has no attributes. If a `|` turns up
    /// which could separate attributes from contents, the cell is parsed again
    /// with attributes.
    fn handle_table_cell(&mut self, markup: &str, tag: &str, line_context: Context) -> Route<()> {
        let old_context = self.frame.context;
        self.head += markup.len();
        let reset = self.head;
        if !self.can_recurse() {
            self.emit_text(markup);
            self.head -= 1;
            return Ok(());
        }

        let cell_base = Context::TABLE_OPEN | Context::TABLE_CELL_OPEN | line_context;
        let mut contents = self.parse(cell_base | Context::TABLE_CELL_STYLE, true)?;
        let mut cell_context = self.frame.context;
        self.frame.context = old_context;

        let restyle = cell_context.contains(Context::TABLE_CELL_STYLE);
        let mut style = Vec::new();
        let mut padding = String::new();
        if restyle {
            self.head = reset;
            self.push(cell_base)?;
            padding = self.handle_table_style("|")?;
            style = self.pop()?;
            self.head += 1;
            contents = self.parse(cell_base, true)?;
            cell_context = self.frame.context;
            self.frame.context = old_context;
        }

        self.emit_table_tag(TableTag {
            open: markup,
            tag,
            style,
            padding,
            separator: restyle.then_some("|"),
            contents,
            close: "",
        });
        self.frame.context |= cell_context & (Context::TABLE_TH_LINE | Context::TABLE_TD_LINE);
        self.head -= 1;
        Ok(())
    }

    /// Ends a table cell, keeping its context for the caller to inspect.
    fn handle_table_cell_end(&mut self, reset_for_style: bool) -> Route<Vec<Token>> {
        self.frame
            .context
            .set(Context::TABLE_CELL_STYLE, reset_for_style);
        Ok(self.pop_keep_context()?)
    }

    /// Ends a table.
    fn handle_table_end(&mut self) -> Route<Vec<Token>> {
        self.head += 2;
        Ok(self.pop()?)
    }

    /// Emits a complete table tag.
    fn emit_table_tag(&mut self, table_tag: TableTag<'_>) {
        let TableTag {
            open,
            tag,
            style,
            padding,
            separator,
            contents,
            close,
        } = table_tag;
        self.emit(Token::TagOpenOpen {
            wiki_markup: Some(open.to_string()),
            invalid: false,
        });
        self.emit_text(tag);
        self.emit_all(style);
        self.emit(Token::TagCloseOpen {
            wiki_markup: separator.map(str::to_string),
            padding,
        });
        self.emit_all(contents);
        self.emit(Token::TagOpenClose {
            wiki_markup: Some(close.to_string()),
        });
        self.emit_text(tag);
        self.emit(Token::TagCloseClose);
    }

    /// Handles a delimiter inside of a table. Returns the tokens of the
    /// innermost frame if the delimiter ended it.
    pub(super) fn handle_table_markup(
        &mut self,
        this: &str,
        next: Chunk<'a>,
    ) -> Route<Option<Vec<Token>>> {
        let ctx = self.frame.context;
        let cell_open = ctx.contains(Context::TABLE_CELL_OPEN);

        if this == "|" && next.is("|") && ctx.contains(Context::TABLE_TD_LINE) {
            if cell_open {
                return self.handle_table_cell_end(false).map(Some);
            }
            self.handle_table_cell("||", "td", Context::TABLE_TD_LINE)?;
        } else if this == "|" && next.is("|") && ctx.contains(Context::TABLE_TH_LINE) {
            if cell_open {
                return self.handle_table_cell_end(false).map(Some);
            }
            self.handle_table_cell("||", "th", Context::TABLE_TH_LINE)?;
        } else if this == "!" && next.is("!") && ctx.contains(Context::TABLE_TH_LINE) {
            if cell_open {
                return self.handle_table_cell_end(false).map(Some);
            }
            self.handle_table_cell("!!", "th", Context::TABLE_TH_LINE)?;
        } else if this == "|" && ctx.contains(Context::TABLE_CELL_STYLE) {
            return self.handle_table_cell_end(true).map(Some);
        } else if this == "\n" && ctx.intersects(Context::TABLE_CELL_LINE_CONTEXTS) {
            self.frame
                .context
                .remove(Context::TABLE_CELL_LINE_CONTEXTS);
            self.emit_text(this);
        } else if self.at_line_start() {
            let row_open = ctx.contains(Context::TABLE_ROW_OPEN);
            if this == "|" && (next.is("}") || next.is("-")) {
                if cell_open {
                    return self.handle_table_cell_end(false).map(Some);
                }
                if row_open {
                    return Ok(Some(self.pop()?));
                }
                if next.is("}") {
                    return self.handle_table_end().map(Some);
                }
                self.handle_table_row()?;
            } else if this == "|" {
                if cell_open {
                    return self.handle_table_cell_end(false).map(Some);
                }
                self.handle_table_cell("|", "td", Context::TABLE_TD_LINE)?;
            } else if this == "!" {
                if cell_open {
                    return self.handle_table_cell_end(false).map(Some);
                }
                self.handle_table_cell("!", "th", Context::TABLE_TH_LINE)?;
            } else {
                self.emit_text(this);
            }
        } else {
            self.emit_text(this);
        }
        Ok(None)
    }
}
