use super::*;
use crate::{
    SectionFilter, SharedList,
    nodes::{AddParam, NodeKind, StripOptions},
};

#[test]
fn text_around_template() {
    let code = parse("foo {{spam|eggs}} bar").unwrap();
    let kinds = code.nodes().iter().map(|node| node.kind()).collect::<Vec<_>>();
    assert_eq!(kinds, [NodeKind::Text, NodeKind::Template, NodeKind::Text]);
    assert_eq!(code.get(0).unwrap().to_string(), "foo ");
    assert_eq!(code.get(2).unwrap().to_string(), " bar");

    let node = code.get(1).unwrap();
    let node = node.borrow();
    let template = node.as_template().unwrap();
    assert_eq!(template.name().to_string(), "spam");
    let [param] = template.params() else {
        panic!("expected one parameter");
    };
    assert_eq!(param.name().to_string(), "1");
    assert_eq!(param.value().to_string(), "eggs");
    assert!(!param.showkey());
}

#[test]
fn add_parameter_before() {
    let code = parse("{{a|b=c|d}}").unwrap();
    let node = code.get(0).unwrap();
    node.borrow_mut()
        .as_template_mut()
        .unwrap()
        .add("e", "f", AddParam::default().showkey(true).before("b"))
        .unwrap();
    assert_eq!(code.to_string(), "{{a|e=f|b=c|d}}");
}

#[test]
fn remove_positional_parameter() {
    let code = parse("{{foo|bar|baz}}").unwrap();
    let node = code.get(0).unwrap();
    node.borrow_mut()
        .as_template_mut()
        .unwrap()
        .remove("1", false)
        .unwrap();
    assert_eq!(code.to_string(), "{{foo|2=baz}}");
}

#[test]
fn heading_sections() {
    let code = parse("== H1 ==\nBody\n=== H2 ===\nMore").unwrap();
    let sections = code.get_sections(&SectionFilter::default()).unwrap();
    let rendered = sections.iter().map(ToString::to_string).collect::<Vec<_>>();
    assert_eq!(
        rendered,
        ["", "== H1 ==\nBody\n=== H2 ===\nMore", "=== H2 ===\nMore"]
    );
}

#[test]
fn strip_and_normalize() {
    let code = parse("Foo [[bar]]\n\n{{baz|hello}}\n\n[[a|b]] &Sigma;").unwrap();
    assert_eq!(code.strip_code(StripOptions::default()), "Foo bar\n\nb Σ");
}

#[test]
fn strip_is_idempotent() {
    let code = parse("''a'' [[b|c]] <!-- d --> {{e}}\n\n\n\nf").unwrap();
    let once = code.strip_code(StripOptions::default());
    assert_eq!(once, "a c  \n\nf");
    let twice = parse(&once).unwrap().strip_code(StripOptions::default());
    assert_eq!(twice, once);
}

#[test]
fn deep_braces() {
    let _ = env_logger::try_init();
    let input = "{".repeat(10_000);
    let code = parse(&input).unwrap();
    assert_eq!(code.to_string(), input);
}

#[test]
fn deep_nesting() {
    let input = format!("{}x{}", "{{a|".repeat(50), "}}".repeat(50));
    let code = parse(&input).unwrap();
    assert_eq!(code.to_string(), input);
}

#[test]
fn view_consistency() {
    let list = SharedList::from_vec(vec![0, 1, 2, 3, 4, 5]);
    let child = list.view(1..3);
    let later = list.view(3..5);
    let inner = list.view(1..2);
    assert!(child.is_view() && !list.is_view());

    child.push(9);
    assert_eq!(list.to_vec(), [0, 1, 2, 9, 3, 4, 5]);
    assert_eq!(child.to_vec(), [1, 2, 9]);
    assert_eq!(later.to_vec(), [3, 4]);
    assert_eq!(inner.to_vec(), [1]);

    list.splice(2..4, []);
    assert_eq!(child.to_vec(), [1]);
    assert_eq!(later.to_vec(), [3, 4]);
}

#[test]
fn edits_keep_other_bytes() {
    let input = "{{cleanup|date=May}}\n'''Bold''' text with [[link]].\n\n== See also ==\n* [[Other]]\n";
    let code = parse(input).unwrap();
    code.replace("{{cleanup|date=May}}", "{{stub}}", true).unwrap();
    code.remove("[[link]]", true).unwrap();
    assert_eq!(
        code.to_string(),
        "{{stub}}\n'''Bold''' text with .\n\n== See also ==\n* [[Other]]\n"
    );
}

#[test]
fn parser_context() {
    let code = Parser::new()
        .with_context(Context::empty())
        .parse("{{a}}")
        .unwrap();
    assert_eq!(code.filter_templates(true).len(), 1);
}
