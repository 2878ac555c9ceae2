use core::fmt;

/// An HTML comment.
///
/// ```wikitext
/// <!-- contents -->
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Comment {
    /// Everything between `<!--` and `-->`.
    pub(crate) contents: String,
}

impl Comment {
    /// Creates a new comment.
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
        }
    }

    /// The text of the comment.
    #[must_use]
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Replaces the text of the comment.
    pub fn set_contents(&mut self, contents: impl Into<String>) {
        self.contents = contents.into();
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<!--{}-->", self.contents)
    }
}
