//! A parsed document, or a piece of one.

// This code is loosely based on `mwparserfromhell`. The upstream copyright is:
//
// SPDX-License-Identifier: MIT
// SPDX-FileCopyright: Copyright 2012-2024 Ben Kurtovic <ben.kurtovic@gmail.com>

use crate::{
    Anything, Error,
    nodes::{Node, NodeKind, NodeRef, StripOptions, TreeWriter},
    parse_anything,
    shared_list::SharedList,
    utils,
};
use core::{fmt, ops::Range};
use regex::{Regex, RegexBuilder};

/// A sequence of nodes.
///
/// Every child tree of a node is also a `Wikicode`. A `Wikicode` returned by
/// [`Wikicode::get_sections`] is a live view of part of its parent: edits
/// through either one are visible through the other.
#[derive(Debug, Default)]
pub struct Wikicode {
    /// The nodes.
    nodes: SharedList<NodeRef>,
}

/// Something to find in a tree.
#[derive(Clone, Copy, Debug)]
pub enum Needle<'a> {
    /// This exact node.
    Node(&'a NodeRef),
    /// This exact tree, which must be a part of the searched tree.
    Code(&'a Wikicode),
    /// Any run of nodes which renders as this markup.
    Text(&'a str),
}

impl<'a> From<&'a NodeRef> for Needle<'a> {
    fn from(node: &'a NodeRef) -> Self {
        Self::Node(node)
    }
}

impl<'a> From<&'a Wikicode> for Needle<'a> {
    fn from(code: &'a Wikicode) -> Self {
        Self::Code(code)
    }
}

impl<'a> From<&'a str> for Needle<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a String> for Needle<'a> {
    fn from(text: &'a String) -> Self {
        Self::Text(text)
    }
}

/// A place where a [`Needle`] was found.
struct Found {
    /// Whether the match covers whole nodes.
    exact: bool,
    /// The tree holding the match.
    context: Wikicode,
    /// The nodes of `context` which hold the match.
    range: Range<usize>,
}

/// Which sections [`Wikicode::get_sections`] returns.
#[derive(Clone, Debug)]
pub struct SectionFilter {
    /// Only return sections with these heading levels. Empty means any level.
    pub levels: Vec<usize>,
    /// Only return sections whose heading title matches this
    /// case-insensitive regular expression.
    pub matches: Option<String>,
    /// Stop each section at the next heading of any level, instead of
    /// including its subsections.
    pub flat: bool,
    /// Whether to return the text before the first heading. If `None`, it is
    /// returned only when no other filter is given.
    pub include_lead: Option<bool>,
    /// Whether sections start with their heading.
    pub include_headings: bool,
}

impl Default for SectionFilter {
    fn default() -> Self {
        Self {
            levels: Vec::new(),
            matches: None,
            flat: false,
            include_lead: None,
            include_headings: true,
        }
    }
}

impl SectionFilter {
    /// Sets [`SectionFilter::levels`].
    #[must_use]
    pub fn levels(mut self, levels: impl IntoIterator<Item = usize>) -> Self {
        self.levels = levels.into_iter().collect();
        self
    }

    /// Sets [`SectionFilter::matches`].
    #[must_use]
    pub fn matches(mut self, pattern: impl Into<String>) -> Self {
        self.matches = Some(pattern.into());
        self
    }

    /// Sets [`SectionFilter::flat`].
    #[must_use]
    pub fn flat(mut self, flat: bool) -> Self {
        self.flat = flat;
        self
    }

    /// Sets [`SectionFilter::include_lead`].
    #[must_use]
    pub fn include_lead(mut self, include_lead: bool) -> Self {
        self.include_lead = Some(include_lead);
        self
    }

    /// Sets [`SectionFilter::include_headings`].
    #[must_use]
    pub fn include_headings(mut self, include_headings: bool) -> Self {
        self.include_headings = include_headings;
        self
    }
}

impl Wikicode {
    /// Creates a new tree from a list of nodes.
    pub(crate) fn from_nodes(nodes: Vec<NodeRef>) -> Self {
        Self {
            nodes: SharedList::from_vec(nodes),
        }
    }

    /// Returns another handle to this tree. Edits through either handle are
    /// visible through both.
    #[must_use]
    pub fn share(&self) -> Self {
        Self {
            nodes: self.nodes.share(),
        }
    }

    /// Returns true if both handles read and write the same nodes.
    pub(crate) fn shares_backing(&self, other: &Wikicode) -> bool {
        self.nodes.same_backing(&other.nodes)
    }

    /// Returns the nodes of this tree.
    #[must_use]
    pub fn nodes(&self) -> Vec<NodeRef> {
        self.nodes.to_vec()
    }

    /// Replaces every node of this tree.
    pub fn set_nodes(&self, nodes: Vec<NodeRef>) {
        self.nodes.splice(.., nodes);
    }

    /// Inserts one node at `index`.
    pub(crate) fn insert_node(&self, index: usize, node: NodeRef) {
        self.nodes.insert(index, node);
    }

    /// Appends one node.
    pub(crate) fn append_node(&self, node: NodeRef) {
        self.nodes.push(node);
    }

    /// Replaces the nodes in `range` with `nodes`.
    pub(crate) fn splice_nodes(
        &self,
        range: impl core::ops::RangeBounds<usize>,
        nodes: Vec<NodeRef>,
    ) {
        self.nodes.splice(range, nodes);
    }

    /// Returns the node at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<NodeRef> {
        self.nodes.get(index)
    }

    /// Replaces the node at `index` with `value`, which must be at most one
    /// node. An empty value removes the node.
    pub fn set(&self, index: usize, value: impl Into<Anything>) -> Result<(), Error> {
        let mut nodes = parse_anything(value)?.nodes();
        if nodes.len() > 1 {
            return Err(Error::InvalidArgument(
                "cannot set multiple nodes at one index".to_string(),
            ));
        }
        if index >= self.len() {
            return Err(Error::InvalidArgument(format!("index {index} out of range")));
        }
        if let Some(node) = nodes.pop() {
            self.nodes.set(index, node);
        } else {
            self.nodes.remove(index);
        }
        Ok(())
    }

    /// The number of nodes in this tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if this tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the index of the node which is, or (if `recursive` is true)
    /// which contains, `node`.
    pub fn index(&self, node: &NodeRef, recursive: bool) -> Result<usize, Error> {
        self.nodes
            .borrow()
            .iter()
            .position(|candidate| {
                if recursive {
                    let mut descendants = Vec::new();
                    candidate.descendants_into(&mut descendants);
                    descendants.iter().any(|child| child.ptr_eq(node))
                } else {
                    candidate.ptr_eq(node)
                }
            })
            .ok_or_else(|| not_found(node))
    }

    /// Returns true if the needle is somewhere inside this tree. A node or
    /// tree must be there exactly. Markup need only be a substring of the
    /// rendered tree.
    pub fn contains<'a>(&self, needle: impl Into<Needle<'a>>) -> bool {
        match needle.into() {
            Needle::Text(text) => utils::contains(&self.to_string(), text),
            needle => self.strong_search(needle, true).is_ok(),
        }
    }

    /// Inserts `value` before the node at `index`.
    pub fn insert(&self, index: usize, value: impl Into<Anything>) -> Result<(), Error> {
        if index > self.len() {
            return Err(Error::InvalidArgument(format!("index {index} out of range")));
        }
        let nodes = parse_anything(value)?.nodes();
        self.nodes.splice(index..index, nodes);
        Ok(())
    }

    /// Appends `value` to the end of this tree.
    pub fn append(&self, value: impl Into<Anything>) -> Result<(), Error> {
        let nodes = parse_anything(value)?.nodes();
        self.nodes.extend(nodes);
        Ok(())
    }

    /// Returns the nodes which contain `node`, outermost first.
    pub fn get_ancestors<'a>(&self, needle: impl Into<Needle<'a>>) -> Result<Vec<NodeRef>, Error> {
        let node = match needle.into() {
            Needle::Node(node) => node.clone(),
            Needle::Code(code) => code
                .get(0)
                .ok_or_else(|| Error::NotFound("empty tree".to_string()))?,
            Needle::Text(text) => {
                return Err(Error::InvalidArgument(format!(
                    "ancestors of markup {text:?} are ambiguous"
                )));
            }
        };
        self.ancestors_of(&node).ok_or_else(|| not_found(&node))
    }

    /// Returns the node which immediately contains `node`, or `None` if it is
    /// at the top level of this tree.
    pub fn get_parent<'a>(&self, needle: impl Into<Needle<'a>>) -> Result<Option<NodeRef>, Error> {
        Ok(self.get_ancestors(needle)?.pop())
    }

    /// Returns the ancestors of `target`, or `None` if it is not in this tree.
    fn ancestors_of(&self, target: &NodeRef) -> Option<Vec<NodeRef>> {
        for node in self.nodes() {
            if node.ptr_eq(target) {
                return Some(Vec::new());
            }
            for child in node.borrow().children() {
                if let Some(mut ancestors) = child.ancestors_of(target) {
                    ancestors.insert(0, node.clone());
                    return Some(ancestors);
                }
            }
        }
        None
    }

    /// Returns the tree which holds `target` and its index there.
    fn find_node(&self, target: &NodeRef) -> Option<(Wikicode, usize)> {
        for (index, node) in self.nodes().into_iter().enumerate() {
            if node.ptr_eq(target) {
                return Some((self.share(), index));
            }
            for child in node.borrow().children() {
                if let Some(found) = child.find_node(target) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Returns true if `code` is this tree or a part of it.
    fn holds_tree(&self, code: &Wikicode, recursive: bool) -> bool {
        if self.shares_backing(code) {
            return true;
        }
        recursive
            && self.nodes().iter().any(|node| {
                node.borrow()
                    .children()
                    .any(|child| child.holds_tree(code, true))
            })
    }

    /// Finds an exact node or tree.
    fn strong_search(&self, needle: Needle<'_>, recursive: bool) -> Result<Found, Error> {
        match needle {
            Needle::Code(code) => {
                if !self.holds_tree(code, recursive) {
                    return Err(Error::NotFound(code.to_string()));
                }
                Ok(Found {
                    exact: true,
                    context: code.share(),
                    range: 0..code.len(),
                })
            }
            Needle::Node(node) => {
                let (context, index) = if recursive {
                    self.find_node(node).ok_or_else(|| not_found(node))?
                } else {
                    (self.share(), self.index(node, false)?)
                };
                Ok(Found {
                    exact: true,
                    context,
                    range: index..index + 1,
                })
            }
            Needle::Text(text) => Err(Error::InvalidArgument(format!(
                "markup {text:?} has no identity"
            ))),
        }
    }

    /// Finds every run of nodes which renders as `needle`.
    ///
    /// Each tree is scanned from its end backward, so that editing one match
    /// does not move the ones found after it. If no run of whole nodes matches
    /// and `recursive` is true, the whole tree is returned as an inexact
    /// match.
    fn weak_search(&self, needle: &str, recursive: bool) -> Result<Vec<Found>, Error> {
        let target = parse_anything(needle)?;
        let target_text = target.to_string();
        if target_text.is_empty() || !utils::contains(&self.to_string(), &target_text) {
            return Err(Error::NotFound(needle.to_string()));
        }
        let target = target
            .nodes()
            .iter()
            .map(NodeRef::to_string)
            .collect::<Vec<_>>();
        let Some(last) = target.last() else {
            return Err(Error::NotFound(needle.to_string()));
        };

        let mut results = Vec::new();
        let mut contexts = vec![self.share()];
        while let Some(context) = contexts.pop() {
            let nodes = context.nodes();
            let rendered = nodes.iter().map(NodeRef::to_string).collect::<Vec<_>>();
            let mut index = nodes.len();
            while index > 0 {
                index -= 1;
                if rendered[index] == *last {
                    let count = target.len();
                    if index + 1 >= count
                        && target[..count - 1]
                            .iter()
                            .zip(&rendered[index + 1 - count..index])
                            .all(|(want, have)| want == have)
                    {
                        index = index + 1 - count;
                        results.push(Found {
                            exact: true,
                            context: context.share(),
                            range: index..index + count,
                        });
                    }
                } else if recursive && utils::contains(&rendered[index], &target_text) {
                    contexts.extend(nodes[index].borrow().children().map(Wikicode::share));
                }
            }
        }

        if results.is_empty() {
            if !recursive {
                return Err(Error::NotFound(needle.to_string()));
            }
            log::debug!("no node-aligned match for {needle:?}; editing rendered text");
            results.push(Found {
                exact: false,
                context: self.share(),
                range: 0..self.len(),
            });
        }
        Ok(results)
    }

    /// Finds every match of `needle`.
    fn search(&self, needle: Needle<'_>, recursive: bool) -> Result<Vec<Found>, Error> {
        match needle {
            Needle::Text(text) => self.weak_search(text, recursive),
            needle => Ok(vec![self.strong_search(needle, recursive)?]),
        }
    }

    /// Inserts `value` before the needle. If the needle is markup, the value
    /// is inserted before every match.
    pub fn insert_before<'a>(
        &self,
        needle: impl Into<Needle<'a>>,
        value: impl Into<Anything>,
        recursive: bool,
    ) -> Result<(), Error> {
        let needle = needle.into();
        let mut value = Replacement::new(value)?;
        for found in self.search(needle, recursive)? {
            if found.exact {
                let at = found.range.start;
                found.context.splice_nodes(at..at, value.nodes()?);
            } else {
                let old = needle_text(needle);
                let new = format!("{}{old}", value.text);
                slice_replace(&found, &old, &new)?;
            }
        }
        Ok(())
    }

    /// Inserts `value` after the needle. If the needle is markup, the value is
    /// inserted after every match.
    pub fn insert_after<'a>(
        &self,
        needle: impl Into<Needle<'a>>,
        value: impl Into<Anything>,
        recursive: bool,
    ) -> Result<(), Error> {
        let needle = needle.into();
        let mut value = Replacement::new(value)?;
        for found in self.search(needle, recursive)? {
            if found.exact {
                let at = found.range.end;
                found.context.splice_nodes(at..at, value.nodes()?);
            } else {
                let old = needle_text(needle);
                let new = format!("{old}{}", value.text);
                slice_replace(&found, &old, &new)?;
            }
        }
        Ok(())
    }

    /// Replaces the needle with `value`. If the needle is markup, every match
    /// is replaced.
    pub fn replace<'a>(
        &self,
        needle: impl Into<Needle<'a>>,
        value: impl Into<Anything>,
        recursive: bool,
    ) -> Result<(), Error> {
        let needle = needle.into();
        let mut value = Replacement::new(value)?;
        for found in self.search(needle, recursive)? {
            if found.exact {
                found.context.splice_nodes(found.range, value.nodes()?);
            } else {
                let old = needle_text(needle);
                slice_replace(&found, &old, &value.text)?;
            }
        }
        Ok(())
    }

    /// Removes the needle. If the needle is markup, every match is removed.
    pub fn remove<'a>(&self, needle: impl Into<Needle<'a>>, recursive: bool) -> Result<(), Error> {
        let needle = needle.into();
        for found in self.search(needle, recursive)? {
            if found.exact {
                found.context.splice_nodes(found.range, Vec::new());
            } else {
                slice_replace(&found, &needle_text(needle), "")?;
            }
        }
        Ok(())
    }

    /// Returns true if the printable text of this tree is `other`, ignoring
    /// the case of the first letter and treating `_` as a space, the way page
    /// titles compare.
    pub fn matches(&self, other: impl Into<Anything>) -> Result<bool, Error> {
        let this = normalize_title(self.strip_code(StripOptions::default()).trim());
        let that = parse_anything(other)?;
        Ok(this == normalize_title(that.strip_code(StripOptions::default()).trim()))
    }

    /// Returns the nodes of this tree, and if `recursive` is true every node
    /// nested inside of them, which are of `kind` and whose rendering matches
    /// the case-insensitive regular expression `pattern`.
    pub fn filter(
        &self,
        recursive: bool,
        pattern: Option<&str>,
        kind: Option<NodeKind>,
    ) -> Result<Vec<NodeRef>, Error> {
        let pattern = pattern.map(build_pattern).transpose()?;
        Ok(self
            .candidates(recursive)
            .into_iter()
            .filter(|node| kind.is_none_or(|kind| node.kind() == kind))
            .filter(|node| {
                pattern
                    .as_ref()
                    .is_none_or(|pattern| pattern.is_match(&node.to_string()))
            })
            .collect())
    }

    /// Returns the nodes to filter, in document order.
    fn candidates(&self, recursive: bool) -> Vec<NodeRef> {
        if recursive {
            let mut out = Vec::new();
            for node in self.nodes() {
                node.descendants_into(&mut out);
            }
            out
        } else {
            self.nodes()
        }
    }

    /// Returns the nodes of one kind.
    fn filter_kind(&self, recursive: bool, kind: NodeKind) -> Vec<NodeRef> {
        self.candidates(recursive)
            .into_iter()
            .filter(|node| node.kind() == kind)
            .collect()
    }

    /// Returns the template arguments.
    #[must_use]
    pub fn filter_arguments(&self, recursive: bool) -> Vec<NodeRef> {
        self.filter_kind(recursive, NodeKind::Argument)
    }

    /// Returns the comments.
    #[must_use]
    pub fn filter_comments(&self, recursive: bool) -> Vec<NodeRef> {
        self.filter_kind(recursive, NodeKind::Comment)
    }

    /// Returns the external links.
    #[must_use]
    pub fn filter_external_links(&self, recursive: bool) -> Vec<NodeRef> {
        self.filter_kind(recursive, NodeKind::ExternalLink)
    }

    /// Returns the headings.
    #[must_use]
    pub fn filter_headings(&self, recursive: bool) -> Vec<NodeRef> {
        self.filter_kind(recursive, NodeKind::Heading)
    }

    /// Returns the character references.
    #[must_use]
    pub fn filter_html_entities(&self, recursive: bool) -> Vec<NodeRef> {
        self.filter_kind(recursive, NodeKind::HtmlEntity)
    }

    /// Returns the tags.
    #[must_use]
    pub fn filter_tags(&self, recursive: bool) -> Vec<NodeRef> {
        self.filter_kind(recursive, NodeKind::Tag)
    }

    /// Returns the templates.
    #[must_use]
    pub fn filter_templates(&self, recursive: bool) -> Vec<NodeRef> {
        self.filter_kind(recursive, NodeKind::Template)
    }

    /// Returns the text nodes.
    #[must_use]
    pub fn filter_text(&self, recursive: bool) -> Vec<NodeRef> {
        self.filter_kind(recursive, NodeKind::Text)
    }

    /// Returns the wikilinks.
    #[must_use]
    pub fn filter_wikilinks(&self, recursive: bool) -> Vec<NodeRef> {
        self.filter_kind(recursive, NodeKind::Wikilink)
    }

    /// Splits this tree into sections at its top-level headings.
    ///
    /// A section runs from its heading to the next heading of the same or a
    /// higher level (or of any level, if [`SectionFilter::flat`] is set). The
    /// sections are live views of this tree, ordered by where they start.
    pub fn get_sections(&self, filter: &SectionFilter) -> Result<Vec<Wikicode>, Error> {
        let pattern = filter.matches.as_deref().map(build_pattern).transpose()?;
        let wanted = |heading: &NodeRef| {
            let heading = heading.borrow();
            let Some(heading) = heading.as_heading() else {
                return false;
            };
            pattern
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(&heading.title().to_string()))
                && (filter.levels.is_empty()
                    || filter.levels.contains(&usize::from(heading.level())))
        };

        let headings = self
            .nodes()
            .into_iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let level = node.borrow().as_heading().map(|heading| heading.level())?;
                Some((index, level, node))
            })
            .collect::<Vec<_>>();

        let mut sections = Vec::new();
        let include_lead = filter.include_lead.unwrap_or(
            filter.matches.is_none() && filter.levels.is_empty(),
        );
        if include_lead {
            let end = headings.first().map_or(self.len(), |(index, ..)| *index);
            sections.push((0, self.nodes.view(..end)));
        }

        let mut open = Vec::<(usize, _, &NodeRef)>::new();
        for (index, level, heading) in &headings {
            let closed_from = if filter.flat {
                0
            } else {
                open.iter()
                    .position(|(_, open_level, _)| level <= open_level)
                    .unwrap_or(open.len())
            };
            for (start, _, closed) in open.drain(closed_from..) {
                if wanted(closed) {
                    sections.push((start, self.nodes.view(start..*index)));
                }
            }
            let start = if filter.include_headings { *index } else { index + 1 };
            open.push((start, *level, heading));
        }
        for (start, _, heading) in open {
            if wanted(heading) {
                sections.push((start, self.nodes.view(start..)));
            }
        }

        sections.sort_by_key(|(start, _)| *start);
        Ok(sections
            .into_iter()
            .map(|(_, nodes)| Wikicode { nodes })
            .collect())
    }

    /// Returns the printable text of this tree.
    #[must_use]
    pub fn strip_code(&self, options: StripOptions) -> String {
        let stripped = self
            .nodes()
            .iter()
            .filter_map(|node| node.borrow().strip(options))
            .collect::<String>();
        if options.collapse {
            let mut stripped = stripped.trim_matches('\n').to_string();
            while stripped.contains("\n\n\n") {
                stripped = stripped.replace("\n\n\n", "\n\n");
            }
            stripped
        } else {
            stripped
        }
    }

    /// Returns a readable outline of the node structure, for debugging.
    #[must_use]
    pub fn get_tree(&self) -> String {
        let mut tree = TreeWriter::default();
        for node in self.nodes() {
            node.borrow().show_tree(&mut tree);
        }
        tree.finish()
    }
}

impl fmt::Display for Wikicode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.nodes.borrow().iter() {
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

/// A value being inserted at one or more places.
struct Replacement {
    /// The parsed nodes, until they are used once.
    first: Option<Vec<NodeRef>>,
    /// The rendered value.
    text: String,
}

impl Replacement {
    /// Parses `value`.
    fn new(value: impl Into<Anything>) -> Result<Self, Error> {
        let code = parse_anything(value)?;
        Ok(Self {
            text: code.to_string(),
            first: Some(code.nodes()),
        })
    }

    /// Returns nodes for the next place. Every place after the first gets a
    /// fresh copy.
    fn nodes(&mut self) -> Result<Vec<NodeRef>, Error> {
        match self.first.take() {
            Some(nodes) => Ok(nodes),
            None => Ok(parse_anything(self.text.as_str())?.nodes()),
        }
    }
}

/// Returns the markup of a needle.
fn needle_text(needle: Needle<'_>) -> String {
    match needle {
        Needle::Node(node) => node.to_string(),
        Needle::Code(code) => code.to_string(),
        Needle::Text(text) => text.to_string(),
    }
}

/// Replaces `old` with `new` in the rendered nodes of an inexact match and
/// reparses them.
fn slice_replace(found: &Found, old: &str, new: &str) -> Result<(), Error> {
    let text = found.context.nodes()[found.range.clone()]
        .iter()
        .map(NodeRef::to_string)
        .collect::<String>();
    let nodes = parse_anything(text.replace(old, new))?.nodes();
    found.context.splice_nodes(found.range.clone(), nodes);
    Ok(())
}

/// Compiles a user pattern the way filters use it.
fn build_pattern(pattern: &str) -> Result<Regex, Error> {
    Ok(RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()?)
}

/// Uppercases the first letter and turns underscores into spaces.
fn normalize_title(title: &str) -> String {
    let mut chars = title.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    first
        .to_uppercase()
        .chain(chars)
        .collect::<String>()
        .replace('_', " ")
}

/// The error for a node which is not in a tree.
fn not_found(node: &NodeRef) -> Error {
    Error::NotFound(node.to_string())
}

impl From<Node> for Wikicode {
    fn from(node: Node) -> Self {
        Self::from_nodes(vec![NodeRef::new(node)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn set_and_insert() {
        let code = parse("a{{b}}c").unwrap();
        code.set(1, "[[x]]").unwrap();
        assert_eq!(code.to_string(), "a[[x]]c");
        assert!(code.set(1, "[[x]][[y]]").is_err());
        code.set(1, "").unwrap();
        assert_eq!(code.to_string(), "ac");
        code.insert(1, "{{d}}").unwrap();
        assert_eq!(code.to_string(), "a{{d}}c");
        assert!(code.insert(9, "x").is_err());
    }

    #[test]
    fn identity_search() {
        let code = parse("{{a|{{b}}}}{{b}}").unwrap();
        let outer = code.get(0).unwrap();
        let inner = code.filter_templates(true)[1].clone();
        assert_eq!(inner.to_string(), "{{b}}");
        assert_eq!(code.index(&inner, true).unwrap(), 0);
        assert!(code.index(&inner, false).is_err());
        assert!(code.contains(&inner));
        assert!(code.contains("a|{"));
        assert!(!code.contains(&NodeRef::new(crate::nodes::Text::new("a"))));
        assert_eq!(code.get_parent(&inner).unwrap().unwrap().to_string(), outer.to_string());
        assert!(code.get_parent(&outer).unwrap().is_none());

        code.replace(&inner, "x", true).unwrap();
        assert_eq!(code.to_string(), "{{a|x}}{{b}}");
    }

    #[test]
    fn weak_search_edits_every_match() {
        let code = parse("{{a}} x {{a}}").unwrap();
        code.insert_before("{{a}}", "[[l]]", true).unwrap();
        assert_eq!(code.to_string(), "[[l]]{{a}} x [[l]]{{a}}");

        let links = code.filter_wikilinks(false);
        assert_eq!(links.len(), 2);
        assert!(!links[0].ptr_eq(&links[1]));
    }

    #[test]
    fn weak_search_falls_back_to_text() {
        let code = parse("foo {{a|bar baz}}").unwrap();
        code.replace("bar", "qux", true).unwrap();
        assert_eq!(code.to_string(), "foo {{a|qux baz}}");

        let code = parse("foo bar").unwrap();
        assert!(matches!(code.remove("bar", false), Err(Error::NotFound(_))));
        code.remove("bar", true).unwrap();
        assert_eq!(code.to_string(), "foo ");
        assert!(matches!(code.remove("nope", true), Err(Error::NotFound(_))));
    }

    #[test]
    fn insert_after_nested() {
        let code = parse("{{a|{{b}}}}").unwrap();
        code.insert_after("{{b}}", "c", true).unwrap();
        assert_eq!(code.to_string(), "{{a|{{b}}c}}");
    }

    #[test]
    fn title_matching() {
        let code = parse("foo_Bar").unwrap();
        assert!(code.matches("Foo Bar").unwrap());
        assert!(code.matches("[[foo Bar]]").unwrap());
        assert!(!code.matches("foo bar").unwrap());
    }

    #[test]
    fn filters() {
        let code = parse("{{a|[[b]]}} [[c]] <!-- d -->").unwrap();
        assert_eq!(code.filter_wikilinks(false).len(), 1);
        assert_eq!(code.filter_wikilinks(true).len(), 2);
        assert_eq!(code.filter_comments(true).len(), 1);
        let found = code
            .filter(true, Some("^\\[\\[C"), Some(NodeKind::Wikilink))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].to_string(), "[[c]]");
        assert!(matches!(code.filter(true, Some("("), None), Err(Error::Pattern(_))));
    }

    #[test]
    fn sections() {
        let code = parse("lead\n== A ==\na\n=== B ===\nb\n== C ==\nc").unwrap();
        let all = code.get_sections(&SectionFilter::default()).unwrap();
        let rendered = all.iter().map(Wikicode::to_string).collect::<Vec<_>>();
        assert_eq!(
            rendered,
            [
                "lead\n",
                "== A ==\na\n=== B ===\nb\n",
                "=== B ===\nb\n",
                "== C ==\nc"
            ]
        );

        let flat = code
            .get_sections(&SectionFilter::default().levels([2]).flat(true))
            .unwrap();
        let rendered = flat.iter().map(Wikicode::to_string).collect::<Vec<_>>();
        assert_eq!(rendered, ["== A ==\na\n", "== C ==\nc"]);

        let body = code
            .get_sections(&SectionFilter::default().matches("^ c").include_headings(false))
            .unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].to_string(), "\nc");
    }

    #[test]
    fn sections_are_live() {
        let code = parse("== A ==\na\n== B ==\nb").unwrap();
        let sections = code
            .get_sections(&SectionFilter::default().include_lead(false))
            .unwrap();
        sections[0].append("more\n").unwrap();
        assert_eq!(code.to_string(), "== A ==\na\nmore\n== B ==\nb");
        assert_eq!(sections[1].to_string(), "== B ==\nb");

        code.remove(&sections[0], true).unwrap();
        assert_eq!(code.to_string(), "== B ==\nb");
        assert!(sections[0].is_empty());
    }

    #[test]
    fn strip() {
        let code = parse("a\n\n\n\n<!-- x -->b &amp; <ref>c</ref><nowiki/>").unwrap();
        assert_eq!(code.strip_code(StripOptions::default()), "a\n\nb & c");
        let raw = StripOptions {
            normalize: false,
            collapse: false,
            ..StripOptions::default()
        };
        assert_eq!(code.strip_code(raw), "a\n\n\n\nb &amp; c");
    }

    #[test]
    fn tree() {
        let code = parse("{{a|b=c}}").unwrap();
        assert_eq!(
            code.get_tree(),
            "{{\n      a\n    | b\n    = c\n}}"
        );
    }
}
