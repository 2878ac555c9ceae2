//! Coercion of arbitrary values into trees, and small string helpers.

use crate::{
    Error, Wikicode,
    nodes::{
        Argument, Comment, ExternalLink, Heading, HtmlEntity, Node, NodeRef, Tag, Template, Text,
        Wikilink,
    },
    wikitext::Parser,
};

/// Anything which can become a [`Wikicode`].
///
/// Most tree-editing operations accept `impl Into<Anything>`, so a caller can
/// pass markup as a string, an existing node or tree, or a list of those.
#[derive(Debug)]
pub enum Anything {
    /// An existing tree, used as-is.
    Code(Wikicode),
    /// A single node.
    Node(NodeRef),
    /// Markup to parse.
    Text(String),
    /// UTF-8 markup to parse.
    Bytes(Vec<u8>),
    /// A number, parsed as markup.
    Int(i64),
    /// An empty tree.
    Nothing,
    /// Values concatenated into one tree.
    List(Vec<Anything>),
}

/// Coerces `value` into a tree.
///
/// Strings are parsed with the default [`Parser`]. Lists are concatenated.
pub fn parse_anything(value: impl Into<Anything>) -> Result<Wikicode, Error> {
    Ok(match value.into() {
        Anything::Code(code) => code,
        Anything::Node(node) => Wikicode::from_nodes(vec![node]),
        Anything::Text(text) => Parser::new().parse(&text)?,
        Anything::Bytes(bytes) => {
            let text = String::from_utf8(bytes)
                .map_err(|err| Error::InvalidArgument(format!("markup is not UTF-8: {err}")))?;
            Parser::new().parse(&text)?
        }
        Anything::Int(value) => Parser::new().parse(&value.to_string())?,
        Anything::Nothing => Wikicode::default(),
        Anything::List(values) => {
            let mut nodes = Vec::new();
            for value in values {
                nodes.extend(parse_anything(value)?.nodes());
            }
            Wikicode::from_nodes(nodes)
        }
    })
}

impl From<Wikicode> for Anything {
    fn from(code: Wikicode) -> Self {
        Self::Code(code)
    }
}

impl From<&Wikicode> for Anything {
    fn from(code: &Wikicode) -> Self {
        Self::Code(code.share())
    }
}

impl From<NodeRef> for Anything {
    fn from(node: NodeRef) -> Self {
        Self::Node(node)
    }
}

impl From<&NodeRef> for Anything {
    fn from(node: &NodeRef) -> Self {
        Self::Node(node.clone())
    }
}

impl From<Node> for Anything {
    fn from(node: Node) -> Self {
        Self::Node(NodeRef::new(node))
    }
}

/// Generates conversions from each node type into [`Anything`].
macro_rules! from_node {
    ($($kind:ty),* $(,)?) => {
        $(
            impl From<$kind> for Anything {
                fn from(node: $kind) -> Self {
                    Self::Node(NodeRef::new(node))
                }
            }
        )*
    };
}

from_node!(
    Argument,
    Comment,
    ExternalLink,
    Heading,
    HtmlEntity,
    Tag,
    Template,
    Text,
    Wikilink,
);

impl From<&str> for Anything {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Anything {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&String> for Anything {
    fn from(text: &String) -> Self {
        Self::Text(text.clone())
    }
}

impl From<&[u8]> for Anything {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Anything {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Generates conversions from integer types into [`Anything`].
macro_rules! from_int {
    ($($int:ty),*) => {
        $(
            impl From<$int> for Anything {
                fn from(value: $int) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for Anything {
    fn from(value: usize) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<()> for Anything {
    fn from((): ()) -> Self {
        Self::Nothing
    }
}

impl<T: Into<Anything>> From<Option<T>> for Anything {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nothing, Into::into)
    }
}

impl From<Vec<Anything>> for Anything {
    fn from(values: Vec<Anything>) -> Self {
        Self::List(values)
    }
}

/// Returns the leading and trailing whitespace of `text`. A string of only
/// whitespace is all leading.
pub(crate) fn split_space(text: &str) -> (&str, &str) {
    let rest = text.trim_start();
    let before = &text[..text.len() - rest.len()];
    let after = &rest[rest.trim_end().len()..];
    (before, after)
}

/// Returns true if `needle` occurs in `haystack`.
pub(crate) fn contains(haystack: &str, needle: &str) -> bool {
    memchr::memmem::find(haystack.as_bytes(), needle.as_bytes()).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion() {
        assert_eq!(parse_anything("{{a}}").unwrap().to_string(), "{{a}}");
        assert_eq!(parse_anything(42_i64).unwrap().to_string(), "42");
        assert!(parse_anything(()).unwrap().is_empty());
        assert!(parse_anything(None::<&str>).unwrap().is_empty());
        assert_eq!(parse_anything(&b"[[x]]"[..]).unwrap().to_string(), "[[x]]");
        assert!(matches!(
            parse_anything(vec![0xff_u8, 0xfe]),
            Err(Error::InvalidArgument(_))
        ));

        let list = parse_anything(vec![
            Anything::from("a "),
            Anything::from(Text::new("b")),
            Anything::from(3_i64),
        ])
        .unwrap();
        assert_eq!(list.to_string(), "a b3");
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn shares_trees() {
        let code = parse_anything("x").unwrap();
        let same = parse_anything(&code).unwrap();
        same.append("y").unwrap();
        assert_eq!(code.to_string(), "xy");
    }

    #[test]
    fn spaces() {
        assert_eq!(split_space("  a b \n"), ("  ", " \n"));
        assert_eq!(split_space(" \n "), (" \n ", ""));
        assert_eq!(split_space("a"), ("", ""));
        assert!(contains("foo bar", "o b"));
        assert!(!contains("foo", "bar"));
    }
}
