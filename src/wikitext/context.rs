//! Tokenizer context flags.
//!
//! A context records which syntactic constructs are open in the current parse
//! frame, and which characters must end or invalidate the current attempt.
//! Each nested construct attempt gets a fresh context; failed attempts are
//! memoized by `(position, context)`.

bitflags::bitflags! {
    /// The set of syntactic scopes open in a tokenizer frame.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct Context: u64 {
        /// In a template name.
        const TEMPLATE_NAME = 1 << 0;
        /// In a template parameter key.
        const TEMPLATE_PARAM_KEY = 1 << 1;
        /// In a template parameter value.
        const TEMPLATE_PARAM_VALUE = 1 << 2;

        /// In a template argument name.
        const ARGUMENT_NAME = 1 << 3;
        /// In a template argument default.
        const ARGUMENT_DEFAULT = 1 << 4;

        /// In a wikilink title.
        const WIKILINK_TITLE = 1 << 5;
        /// In a wikilink text.
        const WIKILINK_TEXT = 1 << 6;

        /// In an external link URI.
        const EXT_LINK_URI = 1 << 7;
        /// In an external link title.
        const EXT_LINK_TITLE = 1 << 8;

        /// In a level 1 heading.
        const HEADING_LEVEL_1 = 1 << 9;
        /// In a level 2 heading.
        const HEADING_LEVEL_2 = 1 << 10;
        /// In a level 3 heading.
        const HEADING_LEVEL_3 = 1 << 11;
        /// In a level 4 heading.
        const HEADING_LEVEL_4 = 1 << 12;
        /// In a level 5 heading.
        const HEADING_LEVEL_5 = 1 << 13;
        /// In a level 6 heading.
        const HEADING_LEVEL_6 = 1 << 14;

        /// In an open tag.
        const TAG_OPEN = 1 << 15;
        /// In a tag attribute.
        const TAG_ATTR = 1 << 16;
        /// In a tag body.
        const TAG_BODY = 1 << 17;
        /// In a closing tag.
        const TAG_CLOSE = 1 << 18;

        /// In italic text.
        const STYLE_ITALICS = 1 << 19;
        /// In bold text.
        const STYLE_BOLD = 1 << 20;
        /// A bold run inside italics failed, so the italics should be
        /// retried with the bold treated as italics-closing.
        const STYLE_PASS_AGAIN = 1 << 21;
        /// The second attempt at an italic run.
        const STYLE_SECOND_PASS = 1 << 22;

        /// In a description list term.
        const DL_TERM = 1 << 23;

        /// Safety: non-whitespace text was seen.
        const HAS_TEXT = 1 << 24;
        /// Safety: further non-whitespace text fails the route.
        const FAIL_ON_TEXT = 1 << 25;
        /// Safety: the next chunk fails the route, unless a construct resets
        /// this flag.
        const FAIL_NEXT = 1 << 26;
        /// Safety: a `{` was just seen.
        const FAIL_ON_LBRACE = 1 << 27;
        /// Safety: a `}` was just seen.
        const FAIL_ON_RBRACE = 1 << 28;
        /// Safety: an `=` fails the route.
        const FAIL_ON_EQUALS = 1 << 29;
        /// Safety: a nested template was seen in a template name.
        const HAS_TEMPLATE = 1 << 30;

        /// In a table.
        const TABLE_OPEN = 1 << 31;
        /// In a table cell.
        const TABLE_CELL_OPEN = 1 << 32;
        /// In a table cell which may still turn out to have style attributes.
        const TABLE_CELL_STYLE = 1 << 33;
        /// In a table row.
        const TABLE_ROW_OPEN = 1 << 34;
        /// On a line of `||`-separated data cells.
        const TABLE_TD_LINE = 1 << 35;
        /// On a line of `!!`-separated heading cells.
        const TABLE_TH_LINE = 1 << 36;

        /// In an HTML entity.
        const HTML_ENTITY = 1 << 37;

        /// Any template scope.
        const TEMPLATE = Self::TEMPLATE_NAME.bits()
            | Self::TEMPLATE_PARAM_KEY.bits()
            | Self::TEMPLATE_PARAM_VALUE.bits();
        /// Any argument scope.
        const ARGUMENT = Self::ARGUMENT_NAME.bits() | Self::ARGUMENT_DEFAULT.bits();
        /// Any wikilink scope.
        const WIKILINK = Self::WIKILINK_TITLE.bits() | Self::WIKILINK_TEXT.bits();
        /// Any external link scope.
        const EXT_LINK = Self::EXT_LINK_URI.bits() | Self::EXT_LINK_TITLE.bits();
        /// Any heading level.
        const HEADING = Self::HEADING_LEVEL_1.bits()
            | Self::HEADING_LEVEL_2.bits()
            | Self::HEADING_LEVEL_3.bits()
            | Self::HEADING_LEVEL_4.bits()
            | Self::HEADING_LEVEL_5.bits()
            | Self::HEADING_LEVEL_6.bits();
        /// Any tag scope.
        const TAG = Self::TAG_OPEN.bits()
            | Self::TAG_ATTR.bits()
            | Self::TAG_BODY.bits()
            | Self::TAG_CLOSE.bits();
        /// Any style scope.
        const STYLE = Self::STYLE_ITALICS.bits()
            | Self::STYLE_BOLD.bits()
            | Self::STYLE_PASS_AGAIN.bits()
            | Self::STYLE_SECOND_PASS.bits();
        /// All safety bits.
        const SAFETY_CHECK = Self::HAS_TEXT.bits()
            | Self::FAIL_ON_TEXT.bits()
            | Self::FAIL_NEXT.bits()
            | Self::FAIL_ON_LBRACE.bits()
            | Self::FAIL_ON_RBRACE.bits()
            | Self::FAIL_ON_EQUALS.bits()
            | Self::HAS_TEMPLATE.bits();
        /// Line-scoped table cell state.
        const TABLE_CELL_LINE_CONTEXTS = Self::TABLE_TD_LINE.bits()
            | Self::TABLE_TH_LINE.bits()
            | Self::TABLE_CELL_STYLE.bits();
        /// Any table scope.
        const TABLE = Self::TABLE_OPEN.bits()
            | Self::TABLE_CELL_OPEN.bits()
            | Self::TABLE_CELL_STYLE.bits()
            | Self::TABLE_ROW_OPEN.bits()
            | Self::TABLE_TD_LINE.bits()
            | Self::TABLE_TH_LINE.bits();

        /// Scopes which fail the route when the input ends inside them.
        const FAIL = Self::TEMPLATE.bits()
            | Self::ARGUMENT.bits()
            | Self::WIKILINK.bits()
            | Self::EXT_LINK_TITLE.bits()
            | Self::HEADING.bits()
            | Self::TAG.bits()
            | Self::STYLE.bits()
            | Self::TABLE.bits();
        /// Scopes where every chunk goes through the safety check.
        const UNSAFE = Self::TEMPLATE_NAME.bits()
            | Self::WIKILINK_TITLE.bits()
            | Self::EXT_LINK_TITLE.bits()
            | Self::TEMPLATE_PARAM_KEY.bits()
            | Self::ARGUMENT_NAME.bits()
            | Self::TAG_CLOSE.bits();
        /// Scopes which own two parse frames.
        const DOUBLE = Self::TEMPLATE_PARAM_KEY.bits()
            | Self::TAG_CLOSE.bits()
            | Self::TABLE_ROW_OPEN.bits();
        /// Scopes where `[[` is not a wikilink.
        const NO_WIKILINKS = Self::TEMPLATE_NAME.bits()
            | Self::ARGUMENT_NAME.bits()
            | Self::WIKILINK_TITLE.bits()
            | Self::EXT_LINK_URI.bits();
        /// Scopes where `[` is not an external link.
        const NO_EXT_LINKS = Self::TEMPLATE_NAME.bits()
            | Self::ARGUMENT_NAME.bits()
            | Self::WIKILINK_TITLE.bits()
            | Self::EXT_LINK.bits();
    }
}

impl Context {
    /// Returns the heading context for a heading of `level` equals signs,
    /// capped at level 6.
    #[must_use]
    pub fn heading(level: usize) -> Self {
        Self::from_bits_retain(Self::HEADING_LEVEL_1.bits() << (level.clamp(1, 6) - 1))
    }

    /// Returns the level of the innermost heading scope, if any.
    #[must_use]
    pub fn heading_level(self) -> Option<usize> {
        let bits = (self & Self::HEADING).bits();
        (bits != 0).then(|| (bits.trailing_zeros() - Self::HEADING_LEVEL_1.bits().trailing_zeros()) as usize + 1)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_levels() {
        assert_eq!(Context::heading(1), Context::HEADING_LEVEL_1);
        assert_eq!(Context::heading(9), Context::HEADING_LEVEL_6);
        assert_eq!(Context::HEADING_LEVEL_4.heading_level(), Some(4));
        assert_eq!(Context::TEMPLATE.heading_level(), None);
    }

    #[test]
    fn composites_are_unions() {
        assert!(Context::FAIL.contains(Context::TEMPLATE_PARAM_VALUE));
        assert!(Context::UNSAFE.contains(Context::TAG_CLOSE));
        assert!(!Context::SAFETY_CHECK.intersects(Context::TEMPLATE));
        assert!(Context::TABLE.contains(Context::TABLE_CELL_LINE_CONTEXTS));
    }
}
