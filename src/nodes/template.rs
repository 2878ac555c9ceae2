use super::{HtmlEntity, Node, NodeRef, StripOptions, Text};
use crate::{Anything, Error, Wikicode, parse_anything, utils::split_space};
use core::fmt;
use regex::Regex;
use std::sync::LazyLock;

/// Keys which can be written without `name=`.
static POSITIONAL_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[1-9][0-9]*$").unwrap());

/// A template parameter.
///
/// ```wikitext
/// {{name|positional|key=value}}
/// ```
#[derive(Debug)]
pub struct Parameter {
    /// The parameter name. For positional parameters this is the implied
    /// position.
    pub(crate) name: Wikicode,
    /// The parameter value.
    pub(crate) value: Wikicode,
    /// Whether the name is written out.
    pub(crate) showkey: bool,
}

impl Parameter {
    /// Creates a new parameter.
    pub fn new(
        name: impl Into<Anything>,
        value: impl Into<Anything>,
        showkey: bool,
    ) -> Result<Self, Error> {
        let name = parse_anything(name)?;
        if !showkey && !Self::can_hide_key(&name.to_string()) {
            return Err(hidden_key_error(&name));
        }
        Ok(Self {
            name,
            value: parse_anything(value)?,
            showkey,
        })
    }

    /// Returns true if a parameter named `key` can be written without its
    /// name.
    #[must_use]
    pub fn can_hide_key(key: &str) -> bool {
        POSITIONAL_KEY.is_match(key.trim())
    }

    /// The parameter name.
    #[must_use]
    pub fn name(&self) -> &Wikicode {
        &self.name
    }

    /// Replaces the parameter name.
    pub fn set_name(&mut self, name: impl Into<Anything>) -> Result<(), Error> {
        let name = parse_anything(name)?;
        if !self.showkey && !Self::can_hide_key(&name.to_string()) {
            return Err(hidden_key_error(&name));
        }
        self.name = name;
        Ok(())
    }

    /// The parameter value.
    #[must_use]
    pub fn value(&self) -> &Wikicode {
        &self.value
    }

    /// Replaces the parameter value.
    pub fn set_value(&mut self, value: impl Into<Anything>) -> Result<(), Error> {
        self.value = parse_anything(value)?;
        Ok(())
    }

    /// Whether the name is written out.
    #[must_use]
    pub fn showkey(&self) -> bool {
        self.showkey
    }

    /// Sets whether the name is written out. Only positional names can be
    /// hidden.
    pub fn set_showkey(&mut self, showkey: bool) -> Result<(), Error> {
        if !showkey && !Self::can_hide_key(&self.name.to_string()) {
            return Err(hidden_key_error(&self.name));
        }
        self.showkey = showkey;
        Ok(())
    }

    /// Returns true if the trimmed name of this parameter is `name`.
    fn is_named(&self, name: &str) -> bool {
        self.name.to_string().trim() == name
    }
}

/// The error for hiding a key which is not positional.
fn hidden_key_error(name: &Wikicode) -> Error {
    Error::InvalidArgument(format!("parameter key {:?} cannot be hidden", name.to_string()))
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.showkey {
            write!(f, "{}={}", self.name, self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// Options for [`Template::add`].
#[derive(Clone, Copy, Debug)]
pub struct AddParam<'a> {
    /// Whether to write out the parameter name. If `None`, the name is hidden
    /// only if it is the next free position.
    pub showkey: Option<bool>,
    /// Insert the new parameter before the last parameter with this name.
    pub before: Option<&'a str>,
    /// Insert the new parameter after the last parameter with this name.
    pub after: Option<&'a str>,
    /// Pad the new name and value with the whitespace the other parameters
    /// use.
    pub preserve_spacing: bool,
}

impl Default for AddParam<'_> {
    fn default() -> Self {
        Self {
            showkey: None,
            before: None,
            after: None,
            preserve_spacing: true,
        }
    }
}

impl<'a> AddParam<'a> {
    /// Sets [`AddParam::showkey`].
    #[must_use]
    pub fn showkey(mut self, showkey: bool) -> Self {
        self.showkey = Some(showkey);
        self
    }

    /// Sets [`AddParam::before`].
    #[must_use]
    pub fn before(mut self, name: &'a str) -> Self {
        self.before = Some(name);
        self
    }

    /// Sets [`AddParam::after`].
    #[must_use]
    pub fn after(mut self, name: &'a str) -> Self {
        self.after = Some(name);
        self
    }

    /// Sets [`AddParam::preserve_spacing`].
    #[must_use]
    pub fn preserve_spacing(mut self, preserve_spacing: bool) -> Self {
        self.preserve_spacing = preserve_spacing;
        self
    }
}

/// A template transclusion.
///
/// ```wikitext
/// {{name|positional|key=value}}
/// ```
#[derive(Debug)]
pub struct Template {
    /// The template name.
    pub(crate) name: Wikicode,
    /// The parameters, in order.
    pub(crate) params: Vec<Parameter>,
}

impl Template {
    /// Creates a new template without parameters.
    pub fn new(name: impl Into<Anything>) -> Result<Self, Error> {
        Ok(Self {
            name: parse_anything(name)?,
            params: Vec::new(),
        })
    }

    /// The template name.
    #[must_use]
    pub fn name(&self) -> &Wikicode {
        &self.name
    }

    /// Replaces the template name.
    pub fn set_name(&mut self, name: impl Into<Anything>) -> Result<(), Error> {
        self.name = parse_anything(name)?;
        Ok(())
    }

    /// The parameters, in order.
    #[must_use]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Returns true if a parameter named `name` exists. If `ignore_empty` is
    /// true, parameters with blank values do not count.
    #[must_use]
    pub fn has(&self, name: &str, ignore_empty: bool) -> bool {
        let name = name.trim();
        self.params.iter().any(|param| {
            param.is_named(name) && !(ignore_empty && param.value.to_string().trim().is_empty())
        })
    }

    /// Returns the last parameter named `name`, which is the one that takes
    /// effect.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        let name = name.trim();
        self.params.iter().rev().find(|param| param.is_named(name))
    }

    /// Returns the last parameter named `name` mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        let name = name.trim();
        self.params.iter_mut().rev().find(|param| param.is_named(name))
    }

    /// Returns the index of the last parameter named `name`.
    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.params.iter().rposition(|param| param.is_named(name))
    }

    /// Adds a parameter, or replaces the value of the parameter with the same
    /// name if one exists.
    ///
    /// `|` in the value is escaped so that it cannot split the parameter, and
    /// so is `=` if the name is hidden.
    pub fn add(
        &mut self,
        name: impl Into<Anything>,
        value: impl Into<Anything>,
        options: AddParam<'_>,
    ) -> Result<&mut Parameter, Error> {
        let name = parse_anything(name)?;
        let value = parse_anything(value)?;
        escape_surface(&value, '|')?;
        let key = name.to_string().trim().to_string();

        if self.has(&key, false) {
            if let Some(showkey) = options.showkey
                && !showkey
                && !Parameter::can_hide_key(&key)
            {
                return Err(hidden_key_error(&name));
            }
            self.remove(&key, true)?;
            let index = self.position(&key).ok_or_else(|| Error::NotFound(key.clone()))?;
            let existing = &mut self.params[index];
            if let Some(showkey) = options.showkey {
                existing.set_showkey(showkey)?;
            }
            if !existing.showkey {
                escape_surface(&value, '=')?;
            }
            if options.preserve_spacing {
                let space = existing.value.nodes();
                let before = space.first().map(NodeRef::to_string).unwrap_or_default();
                let after = space.get(1).map(NodeRef::to_string).unwrap_or_default();
                existing.value = pad(&before, value, &after);
            } else {
                existing.value = value;
            }
            return Ok(existing);
        }

        let index = if let Some(before) = options.before {
            self.position(before)
                .ok_or_else(|| Error::NotFound(before.to_string()))?
        } else if let Some(after) = options.after {
            self.position(after)
                .ok_or_else(|| Error::NotFound(after.to_string()))?
                + 1
        } else {
            self.params.len()
        };

        let showkey = match options.showkey {
            Some(showkey) => showkey,
            None => {
                !Parameter::can_hide_key(&key) || key.parse::<usize>().ok() != Some(self.next_position())
            }
        };
        if !showkey {
            if !Parameter::can_hide_key(&key) {
                return Err(hidden_key_error(&name));
            }
            escape_surface(&value, '=')?;
        }

        let (name, value) = if options.preserve_spacing {
            let (before_n, after_n) = self.spacing_conventions(true);
            let (before_v, after_v) = self.spacing_conventions(false);
            (
                pad(before_n.as_deref().unwrap_or_default(), name, after_n.as_deref().unwrap_or_default()),
                pad(before_v.as_deref().unwrap_or_default(), value, after_v.as_deref().unwrap_or_default()),
            )
        } else {
            (name, value)
        };

        self.params.insert(
            index,
            Parameter {
                name,
                value,
                showkey,
            },
        );
        Ok(&mut self.params[index])
    }

    /// Returns the lowest position not taken by a positional parameter.
    fn next_position(&self) -> usize {
        let taken = self
            .params
            .iter()
            .filter(|param| !param.showkey)
            .filter_map(|param| param.name.to_string().trim().parse::<usize>().ok())
            .collect::<Vec<_>>();
        (1..).find(|position| !taken.contains(position)).unwrap_or(1)
    }

    /// Guesses the whitespace that named parameters put around their names
    /// (or values), if a clear majority agrees.
    fn spacing_conventions(&self, use_names: bool) -> (Option<String>, Option<String>) {
        let mut before_theories = Vec::<(String, usize)>::new();
        let mut after_theories = Vec::<(String, usize)>::new();
        for param in self.params.iter().filter(|param| param.showkey) {
            let component = if use_names {
                param.name.to_string()
            } else {
                param.value.to_string()
            };
            let is_blank = !component.is_empty() && component.trim().is_empty();
            let (mut before, mut after) = if is_blank {
                (component.clone(), String::new())
            } else {
                let (before, after) = split_space(&component);
                (before.to_string(), after.to_string())
            };
            if !use_names && is_blank && let Some((head, tail)) = before.split_once('\n') {
                // A blank value puts its newline after the missing content
                after = format!("\n{tail}");
                before = head.to_string();
            }
            vote(&mut before_theories, before);
            vote(&mut after_theories, after);
        }
        (select_theory(before_theories), select_theory(after_theories))
    }

    /// Removes every parameter named `name`.
    ///
    /// Removing a positional parameter shifts the positions of the ones after
    /// it, so their names are written out to keep their meaning.
    ///
    /// If `keep_field` is true, one parameter is kept with a blank value. A
    /// hidden-name parameter is preferred over an earlier named one, since it
    /// is the one that takes effect.
    pub fn remove(&mut self, name: &str, keep_field: bool) -> Result<(), Error> {
        let name = name.trim();
        let mut keep_field = keep_field;
        let mut found = false;
        let mut doomed = Vec::new();
        for index in 0..self.params.len() {
            if !self.params[index].is_named(name) {
                continue;
            }
            found = true;
            if keep_field {
                if self.should_remove(index, name) {
                    doomed.push(index);
                } else {
                    blank_value(&self.params[index].value);
                    keep_field = false;
                }
            } else {
                self.fix_dependent_params(index);
                doomed.push(index);
            }
        }
        if !found {
            return Err(Error::NotFound(name.to_string()));
        }
        for index in doomed.into_iter().rev() {
            self.params.remove(index);
        }
        Ok(())
    }

    /// Removes the parameter at `index`, or blanks its value if `keep_field`
    /// is true.
    pub fn remove_at(&mut self, index: usize, keep_field: bool) -> Result<(), Error> {
        let Some(param) = self.params.get(index) else {
            return Err(Error::NotFound(format!("parameter {index}")));
        };
        if keep_field {
            blank_value(&param.value);
        } else {
            self.fix_dependent_params(index);
            self.params.remove(index);
        }
        Ok(())
    }

    /// Returns true if a later parameter with the same name and a hidden key
    /// exists, in which case the one at `index` should go.
    fn should_remove(&self, index: usize, name: &str) -> bool {
        self.params[index].showkey
            && self.params[index + 1..]
                .iter()
                .any(|after| after.is_named(name) && !after.showkey)
    }

    /// Writes out the names of positional parameters after `index` before it
    /// is removed.
    fn fix_dependent_params(&mut self, index: usize) {
        if !self.params[index].showkey {
            for param in &mut self.params[index + 1..] {
                param.showkey = true;
            }
        }
    }

    /// Returns the printable text of the template.
    pub(super) fn strip(&self, options: StripOptions) -> Option<String> {
        if !options.keep_template_params {
            return None;
        }
        let parts = self
            .params
            .iter()
            .map(|param| param.value.strip_code(options).trim_start().to_string())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>();
        Some(parts.join(" "))
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}", self.name)?;
        for param in &self.params {
            write!(f, "|{param}")?;
        }
        f.write_str("}}")
    }
}

/// Adds one vote for `theory`.
fn vote(theories: &mut Vec<(String, usize)>, theory: String) {
    if let Some((_, count)) = theories.iter_mut().find(|(known, _)| *known == theory) {
        *count += 1;
    } else {
        theories.push((theory, 1));
    }
}

/// Returns the theory with the most votes, if it has more than half of them.
fn select_theory(theories: Vec<(String, usize)>) -> Option<String> {
    let total = theories.iter().map(|(_, count)| count).sum::<usize>();
    let mut best: Option<(String, usize)> = None;
    for (theory, count) in theories {
        if best.as_ref().is_none_or(|(_, best)| count > *best) {
            best = Some((theory, count));
        }
    }
    best.filter(|(_, count)| count * 2 > total)
        .map(|(theory, _)| theory)
}

/// Returns `code` wrapped in the given whitespace.
fn pad(before: &str, code: Wikicode, after: &str) -> Wikicode {
    if !before.is_empty() {
        code.insert_node(0, NodeRef::new(Text::new(before)));
    }
    if !after.is_empty() {
        code.append_node(NodeRef::new(Text::new(after)));
    }
    code
}

/// Replaces the value with only its surrounding whitespace, as two text
/// nodes.
fn blank_value(value: &Wikicode) {
    let old = value.to_string();
    let (before, after) = if old.trim().is_empty() {
        ("", old.as_str())
    } else {
        split_space(&old)
    };
    value.set_nodes(vec![
        NodeRef::new(Text::new(before)),
        NodeRef::new(Text::new(after)),
    ]);
}

/// Replaces `c` in the top-level text of `code` with a character reference,
/// so it cannot be mistaken for markup.
fn escape_surface(code: &Wikicode, c: char) -> Result<(), Error> {
    let entity = HtmlEntity::numeric(c, false).to_string();
    for (index, node) in code.nodes().into_iter().enumerate().rev() {
        let escaped = match &*node.borrow() {
            Node::Text(text) if text.value().contains(c) => text.value().replace(c, &entity),
            _ => continue,
        };
        let nodes = parse_anything(escaped)?.nodes();
        code.splice_nodes(index..=index, nodes);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    /// Parses `text`, which must be a single template, and runs `f` on it.
    fn with_template(text: &str, f: impl FnOnce(&mut Template)) -> String {
        let code = parse(text).unwrap();
        let node = code.get(0).unwrap();
        f(node.borrow_mut().as_template_mut().unwrap());
        code.to_string()
    }

    #[test]
    fn positional_names() {
        let code = parse("{{foo|bar|x=y|baz}}").unwrap();
        let node = code.get(0).unwrap();
        let node = node.borrow();
        let template = node.as_template().unwrap();
        let names = template
            .params()
            .iter()
            .map(|param| (param.name().to_string(), param.showkey()))
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            [
                ("1".to_string(), false),
                ("x".to_string(), true),
                ("2".to_string(), false)
            ]
        );
        assert!(template.has("2", false));
        assert_eq!(template.get(" x ").unwrap().value().to_string(), "y");
    }

    #[test]
    fn remove_shifts_positions() {
        let out = with_template("{{foo|bar|baz}}", |template| {
            template.remove("1", false).unwrap();
        });
        assert_eq!(out, "{{foo|2=baz}}");
    }

    #[test]
    fn remove_missing() {
        with_template("{{foo|bar}}", |template| {
            assert!(matches!(template.remove("2", false), Err(Error::NotFound(_))));
        });
    }

    #[test]
    fn remove_keep_field() {
        let out = with_template("{{foo| a = b |c}}", |template| {
            template.remove("a", true).unwrap();
        });
        assert_eq!(out, "{{foo| a =  |c}}");
    }

    #[test]
    fn add_before() {
        let out = with_template("{{a|b=c|d}}", |template| {
            template
                .add("e", "f", AddParam::default().showkey(true).before("b"))
                .unwrap();
        });
        assert_eq!(out, "{{a|e=f|b=c|d}}");
    }

    #[test]
    fn add_positional() {
        let out = with_template("{{a|b}}", |template| {
            let param = template.add("2", "c", AddParam::default()).unwrap();
            assert!(!param.showkey());
        });
        assert_eq!(out, "{{a|b|c}}");

        let out = with_template("{{a|b}}", |template| {
            template.add("3", "c", AddParam::default()).unwrap();
        });
        assert_eq!(out, "{{a|b|3=c}}");
    }

    #[test]
    fn add_replaces_existing() {
        let out = with_template("{{a|\n b = old \n}}", |template| {
            template.add("b", "new", AddParam::default()).unwrap();
        });
        assert_eq!(out, "{{a|\n b = new \n}}");
    }

    #[test]
    fn add_follows_spacing() {
        let out = with_template("{{a\n| b = c\n| d = e\n}}", |template| {
            template.add("f", "g", AddParam::default()).unwrap();
        });
        assert_eq!(out, "{{a\n| b = c\n| d = e\n| f = g\n}}");
    }

    #[test]
    fn add_escapes() {
        let out = with_template("{{a}}", |template| {
            template.add("1", "x=y|z", AddParam::default()).unwrap();
        });
        assert_eq!(out, "{{a|x&#61;y&#124;z}}");
    }

    #[test]
    fn hidden_keys() {
        assert!(Parameter::can_hide_key(" 12 "));
        assert!(!Parameter::can_hide_key("01"));
        assert!(!Parameter::can_hide_key("a"));
        assert!(Parameter::new("a", "b", false).is_err());
        let mut param = Parameter::new("a", "b", true).unwrap();
        assert!(param.set_showkey(false).is_err());
        assert_eq!(param.to_string(), "a=b");
    }

    #[test]
    fn strip_params() {
        let code = parse("x {{a|b| c |d=}} y").unwrap();
        let options = StripOptions {
            keep_template_params: true,
            ..StripOptions::default()
        };
        assert_eq!(code.strip_code(options), "x b c  y");
        assert_eq!(code.strip_code(StripOptions::default()), "x  y");
    }
}
