use super::*;
use crate::{Wikicode, nodes::NodeKind, parse};

mod scenarios;
mod tokens;

const BASE_DIR: &str = "./src/wikitext/tests";

macro_rules! run_tests {
    ($($name:ident),* $(,)?) => {
        $(#[test]
        fn $name() {
            run_test(
                stringify!($name),
                include_str!(concat!("./fixtures/", stringify!($name), ".txt"))
            );
        })*
    }
}

macro_rules! round_trip_tests {
    ($($name:ident),* $(,)?) => {
        $(#[test]
        fn $name() {
            round_trip(include_str!(concat!("./fixtures/", stringify!($name), ".txt")));
        })*
    }
}

/// Checks that the tree and the token stream of `input` both render back to
/// it, returning the tree.
#[track_caller]
fn round_trip(input: &str) -> Wikicode {
    let _ = env_logger::try_init();

    let code = parse(input).unwrap();
    assert_eq!(code.to_string(), input);

    let tokens = tokenize(input, Context::empty(), false).unwrap();
    assert_eq!(build(tokens).unwrap().to_string(), input);
    code
}

/// Lists every node other than text, outermost first, with its rendering.
fn outline(code: &Wikicode) -> String {
    code.filter(true, None, None)
        .unwrap()
        .iter()
        .filter(|node| node.kind() != NodeKind::Text)
        .map(|node| format!("{:?} {:?}\n", node.kind(), node.to_string()))
        .collect()
}

/// Round trips a fixture and writes the outline of its tree to the golden
/// file.
#[track_caller]
fn run_test(test_name: &str, input: &str) {
    use std::io::Write as _;

    let mut mint = goldenfile::Mint::new(format!("{BASE_DIR}/goldenfiles"));
    let mut file = mint.new_goldenfile(format!("{test_name}.txt")).unwrap();

    let code = round_trip(input);
    write!(file, "{}", outline(&code)).unwrap();
}

run_tests! {
    arguments,
    comments,
    entities,
    headings,
    templates,
    wikilinks,
}

round_trip_tests! {
    external_links,
    lists,
    malformed,
    styles,
    tables,
    tags,
}
