//! The nodes of a parsed document.
//!
//! Every node is held through a [`NodeRef`], a shared handle which gives the
//! node an identity. A caller can keep a handle to a node found by a search
//! and later pass it back to [`Wikicode`] to edit around exactly that node,
//! even if another node renders to the same text.

use crate::Wikicode;
use core::{
    cell::{Ref, RefCell, RefMut},
    fmt,
};
use std::rc::Rc;

mod argument;
mod comment;
mod external_link;
mod heading;
mod html_entity;
mod tag;
mod template;
mod text;
mod wikilink;

pub use argument::Argument;
pub use comment::Comment;
pub use external_link::ExternalLink;
pub use heading::{Heading, HeadingLevel, HeadingRangeError};
pub use html_entity::HtmlEntity;
pub use tag::{Attribute, Tag};
pub use template::{AddParam, Parameter, Template};
pub use text::Text;
pub use wikilink::Wikilink;

/// A parsed construct.
#[derive(Debug)]
pub enum Node {
    /// A template argument, like `{{{1|default}}}`.
    Argument(Argument),
    /// An HTML comment.
    Comment(Comment),
    /// A bracketed or free external link.
    ExternalLink(ExternalLink),
    /// A section heading.
    Heading(Heading),
    /// A character reference, like `&amp;`.
    HtmlEntity(HtmlEntity),
    /// An HTML tag, or wiki markup which stands for one.
    Tag(Tag),
    /// A template transclusion.
    Template(Template),
    /// Plain text.
    Text(Text),
    /// An internal link.
    Wikilink(Wikilink),
}

/// The kind of a [`Node`], for filtering.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NodeKind {
    /// [`Node::Argument`].
    Argument,
    /// [`Node::Comment`].
    Comment,
    /// [`Node::ExternalLink`].
    ExternalLink,
    /// [`Node::Heading`].
    Heading,
    /// [`Node::HtmlEntity`].
    HtmlEntity,
    /// [`Node::Tag`].
    Tag,
    /// [`Node::Template`].
    Template,
    /// [`Node::Text`].
    Text,
    /// [`Node::Wikilink`].
    Wikilink,
}

/// Options for rendering only the printable text of a document.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StripOptions {
    /// Replace character references with the characters they stand for.
    pub normalize: bool,
    /// Trim newlines from both ends and collapse runs of three or more
    /// newlines into two.
    pub collapse: bool,
    /// Keep the values of template parameters instead of dropping templates.
    pub keep_template_params: bool,
}

impl Default for StripOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            collapse: true,
            keep_template_params: false,
        }
    }
}

/// Generates conversions from each node type into [`Node`] and typed
/// accessors on [`Node`].
macro_rules! node_kinds {
    ($($kind:ident => $as_ref:ident, $as_mut:ident;)*) => {
        impl Node {
            /// Returns the kind of this node.
            #[must_use]
            pub fn kind(&self) -> NodeKind {
                match self {
                    $(Self::$kind(_) => NodeKind::$kind,)*
                }
            }

            $(
                #[doc = concat!("Returns the node as a [`", stringify!($kind), "`], if it is one.")]
                #[must_use]
                pub fn $as_ref(&self) -> Option<&$kind> {
                    if let Self::$kind(node) = self { Some(node) } else { None }
                }

                #[doc = concat!("Returns the node as a mutable [`", stringify!($kind), "`], if it is one.")]
                pub fn $as_mut(&mut self) -> Option<&mut $kind> {
                    if let Self::$kind(node) = self { Some(node) } else { None }
                }
            )*
        }

        impl fmt::Display for Node {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$kind(node) => fmt::Display::fmt(node, f),)*
                }
            }
        }

        $(
            impl From<$kind> for Node {
                fn from(node: $kind) -> Self {
                    Self::$kind(node)
                }
            }
        )*
    };
}

node_kinds! {
    Argument => as_argument, as_argument_mut;
    Comment => as_comment, as_comment_mut;
    ExternalLink => as_external_link, as_external_link_mut;
    Heading => as_heading, as_heading_mut;
    HtmlEntity => as_html_entity, as_html_entity_mut;
    Tag => as_tag, as_tag_mut;
    Template => as_template, as_template_mut;
    Text => as_text, as_text_mut;
    Wikilink => as_wikilink, as_wikilink_mut;
}

impl Node {
    /// Returns the child trees of this node, in rendering order.
    pub fn children(&self) -> impl Iterator<Item = &Wikicode> {
        let mut children = Vec::new();
        match self {
            Self::Argument(node) => {
                children.push(&node.name);
                children.extend(&node.default);
            }
            Self::ExternalLink(node) => {
                children.push(&node.url);
                children.extend(&node.title);
            }
            Self::Heading(node) => children.push(&node.title),
            Self::Tag(node) => {
                if node.wiki_markup.is_none() {
                    children.push(&node.tag);
                }
                for attr in &node.attributes {
                    children.push(&attr.name);
                    children.extend(&attr.value);
                }
                if let Some(contents) = &node.contents
                    && !contents.is_empty()
                {
                    children.push(contents);
                }
                // A closing tag which shares the open tag's nodes was already
                // visited
                if !node.self_closing
                    && node.wiki_markup.is_none()
                    && !node.closing_tag.shares_backing(&node.tag)
                {
                    children.push(&node.closing_tag);
                }
            }
            Self::Template(node) => {
                children.push(&node.name);
                for param in &node.params {
                    if param.showkey {
                        children.push(&param.name);
                    }
                    children.push(&param.value);
                }
            }
            Self::Wikilink(node) => {
                children.push(&node.title);
                children.extend(&node.text);
            }
            Self::Comment(_) | Self::HtmlEntity(_) | Self::Text(_) => {}
        }
        children.into_iter()
    }

    /// Returns the printable text of this node, or `None` if nothing of it is
    /// printable.
    pub(crate) fn strip(&self, options: StripOptions) -> Option<String> {
        match self {
            Self::Argument(node) => node.default.as_ref().map(|code| code.strip_code(options)),
            Self::Comment(_) => None,
            Self::ExternalLink(node) => node.strip(options),
            Self::Heading(node) => Some(node.title.strip_code(options)),
            Self::HtmlEntity(node) => Some(if options.normalize {
                node.normalize()
            } else {
                node.to_string()
            }),
            Self::Tag(node) => node.strip(options),
            Self::Template(node) => node.strip(options),
            Self::Text(node) => Some(node.value().to_string()),
            Self::Wikilink(node) => Some(
                node.text
                    .as_ref()
                    .unwrap_or(&node.title)
                    .strip_code(options),
            ),
        }
    }

    /// Writes the debug tree of this node.
    pub(crate) fn show_tree(&self, tree: &mut TreeWriter) {
        match self {
            Self::Argument(node) => {
                tree.write("{{{");
                tree.get(&node.name);
                if let Some(default) = &node.default {
                    tree.write("    | ");
                    tree.mark();
                    tree.get(default);
                }
                tree.write("}}}");
            }
            Self::ExternalLink(node) => {
                if node.brackets {
                    tree.write("[");
                }
                tree.get(&node.url);
                if let Some(title) = &node.title {
                    tree.get(title);
                }
                if node.brackets {
                    tree.write("]");
                }
            }
            Self::Heading(node) => {
                let marks = "=".repeat(node.level().into());
                tree.write(&marks);
                tree.get(&node.title);
                tree.write(&marks);
            }
            Self::Tag(node) => node.show_tree(tree),
            Self::Template(node) => {
                tree.write("{{");
                tree.get(&node.name);
                for param in &node.params {
                    tree.write("    | ");
                    tree.mark();
                    tree.get(&param.name);
                    tree.write("    = ");
                    tree.mark();
                    tree.get(&param.value);
                }
                tree.write("}}");
            }
            Self::Text(node) => tree.write(&node.value().escape_debug().to_string()),
            Self::Wikilink(node) => {
                tree.write("[[");
                tree.get(&node.title);
                if let Some(text) = &node.text {
                    tree.write("    | ");
                    tree.mark();
                    tree.get(text);
                }
                tree.write("]]");
            }
            Self::Comment(_) | Self::HtmlEntity(_) => tree.write(&self.to_string()),
        }
    }
}

/// A shared handle to a node.
///
/// Cloning a handle does not clone the node. Two handles are the same node if
/// [`NodeRef::ptr_eq`] says so.
#[derive(Clone)]
pub struct NodeRef(Rc<RefCell<Node>>);

impl NodeRef {
    /// Creates a handle to a new node.
    pub fn new(node: impl Into<Node>) -> Self {
        Self(Rc::new(RefCell::new(node.into())))
    }

    /// Borrows the node.
    ///
    /// # Panics
    ///
    /// If the node is currently mutably borrowed.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, Node> {
        self.0.borrow()
    }

    /// Mutably borrows the node.
    ///
    /// # Panics
    ///
    /// If the node is currently borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, Node> {
        self.0.borrow_mut()
    }

    /// Returns true if both handles refer to the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Returns the kind of the node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.borrow().kind()
    }

    /// Appends this node and every node nested inside of it to `out`, depth
    /// first.
    pub(crate) fn descendants_into(&self, out: &mut Vec<NodeRef>) {
        out.push(self.clone());
        for child in self.borrow().children() {
            for node in child.nodes() {
                node.descendants_into(out);
            }
        }
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.borrow(), f)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.borrow(), f)
    }
}

impl From<Node> for NodeRef {
    fn from(node: Node) -> Self {
        Self::new(node)
    }
}

/// Accumulates the lines of [`Wikicode::get_tree`].
#[derive(Debug, Default)]
pub(crate) struct TreeWriter {
    /// The finished lines.
    lines: Vec<String>,
    /// The current nesting depth.
    indent: usize,
    /// If true, the next write continues the last line.
    continue_line: bool,
}

impl TreeWriter {
    /// Writes `text` on a new line, or at the end of the last line if it was
    /// marked.
    pub fn write(&mut self, text: &str) {
        if self.continue_line
            && let Some(last) = self.lines.last_mut()
        {
            self.continue_line = false;
            last.push_str(text);
        } else {
            self.lines
                .push(format!("{:indent$}{text}", "", indent = self.indent * 6));
        }
    }

    /// Makes the next write continue the last line.
    pub fn mark(&mut self) {
        self.continue_line = true;
    }

    /// Writes the nodes of `code`, one level deeper.
    pub fn get(&mut self, code: &Wikicode) {
        self.indent += 1;
        for node in code.nodes() {
            node.borrow().show_tree(self);
        }
        self.indent -= 1;
    }

    /// Returns the finished tree.
    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}
