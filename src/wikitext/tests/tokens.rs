use super::*;
use crate::nodes::NodeKind;

#[track_caller]
fn check(input: &str, expected: &[Token]) {
    let _ = env_logger::try_init();
    let tokens = tokenize(input, Context::empty(), false).unwrap();
    assert_eq!(tokens, expected, "tokens of {input:?}");
}

#[test]
fn plain_text() {
    check("foo bar", &[Token::text("foo bar")]);
    check("", &[]);
}

#[test]
fn template() {
    check(
        "{{foo|bar|k=v}}",
        &[
            Token::TemplateOpen,
            Token::text("foo"),
            Token::TemplateParamSeparator,
            Token::text("bar"),
            Token::TemplateParamSeparator,
            Token::text("k"),
            Token::TemplateParamEquals,
            Token::text("v"),
            Token::TemplateClose,
        ],
    );
}

#[test]
fn argument() {
    check(
        "{{{a|b}}}",
        &[
            Token::ArgumentOpen,
            Token::text("a"),
            Token::ArgumentSeparator,
            Token::text("b"),
            Token::ArgumentClose,
        ],
    );
}

#[test]
fn wikilink() {
    check(
        "[[a|b]]",
        &[
            Token::WikilinkOpen,
            Token::text("a"),
            Token::WikilinkSeparator,
            Token::text("b"),
            Token::WikilinkClose,
        ],
    );
}

#[test]
fn entities() {
    check(
        "&amp;",
        &[
            Token::HtmlEntityStart,
            Token::text("amp"),
            Token::HtmlEntityEnd,
        ],
    );
    check(
        "&#X3A3;",
        &[
            Token::HtmlEntityStart,
            Token::HtmlEntityNumeric,
            Token::HtmlEntityHex { char: 'X' },
            Token::text("3A3"),
            Token::HtmlEntityEnd,
        ],
    );
}

#[test]
fn comment() {
    check(
        "<!-- a -->",
        &[Token::CommentStart, Token::text(" a "), Token::CommentEnd],
    );
}

#[test]
fn heading() {
    check(
        "== a ==",
        &[
            Token::HeadingStart { level: 2 },
            Token::text(" a "),
            Token::HeadingEnd,
        ],
    );
}

#[test]
fn html_tag() {
    check(
        "<b>x</b>",
        &[
            Token::TagOpenOpen {
                wiki_markup: None,
                invalid: false,
            },
            Token::text("b"),
            Token::TagCloseOpen {
                wiki_markup: None,
                padding: String::new(),
            },
            Token::text("x"),
            Token::TagOpenClose { wiki_markup: None },
            Token::text("b"),
            Token::TagCloseClose,
        ],
    );
}

#[test]
fn italics() {
    check(
        "''a''",
        &[
            Token::TagOpenOpen {
                wiki_markup: Some("''".into()),
                invalid: false,
            },
            Token::text("i"),
            Token::TagCloseOpen {
                wiki_markup: None,
                padding: String::new(),
            },
            Token::text("a"),
            Token::TagOpenClose { wiki_markup: None },
            Token::text("i"),
            Token::TagCloseClose,
        ],
    );
}

#[test]
fn skip_style_tags() {
    let tokens = Parser::new()
        .skip_style_tags(true)
        .tokenize("''a''")
        .unwrap();
    let text = tokens
        .iter()
        .map(|token| match token {
            Token::Text { text } => text.as_str(),
            token => panic!("unexpected {token:?}"),
        })
        .collect::<String>();
    assert_eq!(text, "''a''");
}

/// The tokens of a wiki markup tag with no attributes, like a list item.
fn markup_open(markup: &str, tag: &str) -> [Token; 3] {
    [
        Token::TagOpenOpen {
            wiki_markup: Some(markup.into()),
            invalid: false,
        },
        Token::text(tag),
        Token::TagCloseSelfclose {
            wiki_markup: None,
            padding: String::new(),
            implicit: false,
        },
    ]
}

fn attr_start() -> Token {
    Token::TagAttrStart {
        pad_first: " ".into(),
        pad_before_eq: String::new(),
        pad_after_eq: String::new(),
    }
}

#[test]
fn multiline_template_name() {
    check(
        "{{a\n| b = c\n}}",
        &[
            Token::TemplateOpen,
            Token::text("a\n"),
            Token::TemplateParamSeparator,
            Token::text(" b "),
            Token::TemplateParamEquals,
            Token::text(" c\n"),
            Token::TemplateClose,
        ],
    );
    let code = parse("{{a\n| b = c\n}}").unwrap();
    assert_eq!(code.filter_templates(false).len(), 1);
}

#[test]
fn failed_template_is_one_text_token() {
    check("x {{a b", &[Token::text("x {{a b")]);
    check("x {{a\nb}}", &[Token::text("x {{a\nb}}")]);
    assert_eq!(parse("x {{a b").unwrap().len(), 1);
}

#[test]
fn lists() {
    let mut expected = Vec::new();
    expected.extend(markup_open("*", "li"));
    expected.push(Token::text(" a\n"));
    expected.extend(markup_open("#", "li"));
    expected.push(Token::text(" b"));
    check("* a\n# b", &expected);
}

#[test]
fn description_list() {
    let mut expected = Vec::new();
    expected.extend(markup_open(";", "dt"));
    expected.push(Token::text(" t "));
    expected.extend(markup_open(":", "dd"));
    expected.push(Token::text(" d"));
    check("; t : d", &expected);
}

#[test]
fn horizontal_rules() {
    let mut expected = Vec::new();
    expected.extend(markup_open("----", "hr"));
    expected.push(Token::text("\n"));
    expected.extend(markup_open("------", "hr"));
    check("----\n------", &expected);
}

#[test]
fn bracketed_external_link() {
    check(
        "[http://a.b c]",
        &[
            Token::ExternalLinkOpen { brackets: true },
            Token::text("http://a.b"),
            Token::ExternalLinkSeparator {
                suppress_space: false,
            },
            Token::text("c"),
            Token::ExternalLinkClose,
        ],
    );
}

#[test]
fn free_external_link_trailing_punctuation() {
    check(
        "see http://a.b/c. x",
        &[
            Token::text("see "),
            Token::ExternalLinkOpen { brackets: false },
            Token::text("http://a.b/c"),
            Token::ExternalLinkClose,
            Token::text(". x"),
        ],
    );
}

#[test]
fn double_bracketed_external_link() {
    check(
        "[[http://a.b]]",
        &[
            Token::text("["),
            Token::ExternalLinkOpen { brackets: true },
            Token::text("http://a.b"),
            Token::ExternalLinkClose,
            Token::text("]"),
        ],
    );
}

#[test]
fn tag_attribute_quotes() {
    check(
        r#"<span a="x y" b='z' c=w d>t</span>"#,
        &[
            Token::TagOpenOpen {
                wiki_markup: None,
                invalid: false,
            },
            Token::text("span"),
            attr_start(),
            Token::text("a"),
            Token::TagAttrEquals,
            Token::TagAttrQuote { char: '"' },
            Token::text("x y"),
            attr_start(),
            Token::text("b"),
            Token::TagAttrEquals,
            Token::TagAttrQuote { char: '\'' },
            Token::text("z"),
            attr_start(),
            Token::text("c"),
            Token::TagAttrEquals,
            Token::text("w"),
            attr_start(),
            Token::text("d"),
            Token::TagCloseOpen {
                wiki_markup: None,
                padding: String::new(),
            },
            Token::text("t"),
            Token::TagOpenClose { wiki_markup: None },
            Token::text("span"),
            Token::TagCloseClose,
        ],
    );
}

#[test]
fn escaped_quote_in_attribute() {
    let input = r#"<span a="x\" y">t</span>"#;
    let code = parse(input).unwrap();
    assert_eq!(code.to_string(), input);
    let node = code.get(0).unwrap();
    let node = node.borrow();
    let tag = node.as_tag().unwrap();
    let [attr] = tag.attributes() else {
        panic!("expected one attribute");
    };
    assert_eq!(attr.value().unwrap().to_string(), r#"x\" y"#);
}

#[test]
fn nowiki_body_is_text() {
    check(
        "<nowiki>[[a]] &amp;</nowiki>",
        &[
            Token::TagOpenOpen {
                wiki_markup: None,
                invalid: false,
            },
            Token::text("nowiki"),
            Token::TagCloseOpen {
                wiki_markup: None,
                padding: String::new(),
            },
            Token::text("[[a]] "),
            Token::HtmlEntityStart,
            Token::text("amp"),
            Token::HtmlEntityEnd,
            Token::TagOpenClose { wiki_markup: None },
            Token::text("nowiki"),
            Token::TagCloseClose,
        ],
    );
}

#[test]
fn implicitly_closed_tag() {
    check(
        "<li>a",
        &[
            Token::TagOpenOpen {
                wiki_markup: None,
                invalid: false,
            },
            Token::text("li"),
            Token::TagCloseSelfclose {
                wiki_markup: None,
                padding: String::new(),
                implicit: true,
            },
            Token::text("a"),
        ],
    );
}

#[test]
fn invalid_closing_br() {
    check(
        "</br>",
        &[
            Token::TagOpenOpen {
                wiki_markup: None,
                invalid: true,
            },
            Token::text("br"),
            Token::TagCloseSelfclose {
                wiki_markup: None,
                padding: String::new(),
                implicit: true,
            },
        ],
    );
}

#[test]
fn bold_inside_italics() {
    let style = |markup: &str, tag: &str, body: Vec<Token>| {
        let mut tokens = vec![
            Token::TagOpenOpen {
                wiki_markup: Some(markup.into()),
                invalid: false,
            },
            Token::text(tag),
            Token::TagCloseOpen {
                wiki_markup: None,
                padding: String::new(),
            },
        ];
        tokens.extend(body);
        tokens.extend([
            Token::TagOpenClose { wiki_markup: None },
            Token::text(tag),
            Token::TagCloseClose,
        ]);
        tokens
    };
    let bold = style("'''", "b", vec![Token::text("a")]);
    check("'''''a'''''", &style("''", "i", bold));
}

#[test]
fn bold_nested_in_italics_text() {
    let code = parse("''a'''b'''c''").unwrap();
    assert_eq!(code.len(), 1);
    let node = code.get(0).unwrap();
    let node = node.borrow();
    let tag = node.as_tag().unwrap();
    assert_eq!(tag.tag().to_string(), "i");
    let rendered = tag
        .contents()
        .unwrap()
        .nodes()
        .iter()
        .map(|node| node.to_string())
        .collect::<Vec<_>>();
    assert_eq!(rendered, ["a", "'''b'''", "c"]);
}

#[test]
fn apostrophe_before_italics() {
    let code = parse("l'''a''").unwrap();
    let rendered = code
        .nodes()
        .iter()
        .map(|node| (node.kind(), node.to_string()))
        .collect::<Vec<_>>();
    assert_eq!(
        rendered,
        [
            (NodeKind::Text, "l'".to_string()),
            (NodeKind::Tag, "''a''".to_string()),
        ]
    );
}

#[test]
fn table_cells() {
    let input = "{| class=x\n|-\n! h !! i\n|-\n| style=y | c || d\n|}";
    let code = parse(input).unwrap();
    assert_eq!(code.to_string(), input);
    let names = code
        .filter_tags(true)
        .iter()
        .map(|node| node.borrow().as_tag().unwrap().tag().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, ["table", "tr", "th", "th", "tr", "td", "td"]);

    let cells = code.filter_tags(true);
    let cell = cells[5].borrow();
    let cell = cell.as_tag().unwrap();
    assert_eq!(cell.wiki_markup(), Some("|"));
    assert_eq!(cell.contents().unwrap().to_string(), " c ");
    let [attr] = cell.attributes() else {
        panic!("expected one attribute");
    };
    assert_eq!(attr.name().to_string(), "style");
    assert_eq!(attr.value().unwrap().to_string(), "y");
    assert_eq!(cells[6].borrow().as_tag().unwrap().wiki_markup(), Some("||"));
}

#[test]
fn depth_limit_falls_back_to_text() {
    let input = format!("{}x{}", "{{a|".repeat(50), "}}".repeat(50));
    let code = parse(&input).unwrap();
    assert_eq!(code.to_string(), input);
    let templates = code.filter_templates(true).len();
    assert!(templates > 1 && templates < 50, "{templates} templates");
    assert!(
        code.filter_text(true)
            .iter()
            .any(|node| node.to_string().contains("{{a|{{a|"))
    );
}
