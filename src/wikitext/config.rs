//! Static tag and URI scheme tables used by the tokenizer and node renderers.

// This code is loosely based on `mwparserfromhell`. The upstream copyright is:
//
// SPDX-License-Identifier: MIT
// SPDX-FileCopyright: Copyright 2012-2024 Ben Kurtovic <ben.kurtovic@gmail.com>

use html_escape::NAMED_ENTITIES;
use phf::{Map, Set};

/// Tags whose contents are not parsed as Wikitext.
pub(crate) static PARSER_BLACKLIST: Set<&str> = phf::phf_set! {
    "categorytree", "ce", "chem",
    "gallery", "graph",
    "hiero",
    "imagemap", "inputbox",
    "math",
    "nowiki",
    "pre",
    "score", "section", "source", "syntaxhighlight",
    "templatedata", "timeline",
};

/// Tags whose contents are not shown in stripped output.
pub(crate) static INVISIBLE_TAGS: Set<&str> = phf::phf_set! {
    "categorytree",
    "gallery", "graph",
    "imagemap", "inputbox",
    "math",
    "score", "section",
    "templatedata", "timeline",
};

/// Tags which can never have a closing tag.
pub(crate) static SINGLE_ONLY: Set<&str> = phf::phf_set! {
    "br", "hr", "img", "link", "meta", "wbr",
};

/// Tags which may omit their closing tag.
pub(crate) static SINGLE: Set<&str> = phf::phf_set! {
    "br", "dd", "dt", "hr", "img", "li", "link", "meta", "td", "th", "tr", "wbr",
};

/// List markup and the HTML tag it stands for.
pub(crate) static MARKUP_TO_HTML: Map<&str, &str> = phf::phf_map! {
    "#" => "li",
    "*" => "li",
    ";" => "dt",
    ":" => "dd",
};

/// Known URI schemes, and whether a link using the scheme requires `//` after
/// the colon.
pub(crate) static URI_SCHEMES: Map<&str, bool> = phf::phf_map! {
    "bitcoin" => false,
    "ftp" => true,
    "ftps" => true,
    "geo" => false,
    "git" => true,
    "gopher" => true,
    "http" => true,
    "https" => true,
    "irc" => true,
    "ircs" => true,
    "magnet" => false,
    "mailto" => false,
    "mms" => true,
    "news" => false,
    "nntp" => true,
    "redis" => true,
    "sftp" => true,
    "sip" => false,
    "sips" => false,
    "sms" => false,
    "ssh" => true,
    "svn" => true,
    "tel" => false,
    "telnet" => true,
    "urn" => false,
    "worldwind" => true,
    "xmpp" => false,
};

/// Returns the lowercased, right-trimmed form of a tag name for table lookups.
pub(crate) fn normalize_tag(tag: &str) -> String {
    tag.trim_end().to_lowercase()
}

/// Returns true if the contents of `tag` are shown in stripped output.
pub(crate) fn is_visible(tag: &str) -> bool {
    !INVISIBLE_TAGS.contains(normalize_tag(tag).as_str())
}

/// Returns true if the contents of `tag` are parsed as Wikitext.
pub(crate) fn is_parsable(tag: &str) -> bool {
    !PARSER_BLACKLIST.contains(normalize_tag(tag).as_str())
}

/// Returns true if `tag` may omit its closing tag.
pub(crate) fn is_single(tag: &str) -> bool {
    SINGLE.contains(normalize_tag(tag).as_str())
}

/// Returns true if `tag` can never have a closing tag.
pub(crate) fn is_single_only(tag: &str) -> bool {
    SINGLE_ONLY.contains(normalize_tag(tag).as_str())
}

/// Returns the HTML tag name for a list markup character.
pub(crate) fn html_tag_for(markup: &str) -> Option<&'static str> {
    MARKUP_TO_HTML.get(markup).copied()
}

/// Returns the character value of a named HTML entity, without its `&` and
/// `;`.
pub(crate) fn named_entity(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES
        .binary_search_by(|(t_name, _)| t_name.cmp(&name.as_bytes()))
        .ok()
        .map(|index| NAMED_ENTITIES[index].1)
}

/// Returns true if `scheme` is a known URI scheme. If `slashes` is false, the
/// scheme must also be usable without `//`.
pub(crate) fn is_scheme(scheme: &str, slashes: bool) -> bool {
    let scheme = scheme.to_ascii_lowercase();
    match URI_SCHEMES.get(scheme.as_str()) {
        Some(&requires_slashes) => slashes || !requires_slashes,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_classes() {
        assert!(is_single("BR "));
        assert!(is_single("li"));
        assert!(!is_single_only("li"));
        assert!(!is_parsable("NoWiki"));
        assert!(is_parsable("ref"));
        assert!(!is_visible("gallery"));
        assert!(is_visible("b"));
        assert_eq!(html_tag_for(";"), Some("dt"));
        assert_eq!(html_tag_for("-"), None);
    }

    #[test]
    fn schemes() {
        assert!(is_scheme("HTTP", true));
        assert!(!is_scheme("http", false));
        assert!(is_scheme("mailto", false));
        assert!(is_scheme("mailto", true));
        assert!(!is_scheme("javascript", true));
    }

    #[test]
    fn entities() {
        assert_eq!(named_entity("Sigma"), Some("Σ"));
        assert_eq!(named_entity("nbsp"), Some("\u{a0}"));
        assert_eq!(named_entity("bogus"), None);
    }
}
