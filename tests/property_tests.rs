use proptest::prelude::*;
use tagscript::{parse, Element, ParseError, Value};

/// Escapes raw text the way a template author has to write it. A trailing
/// `{` is escaped too, since the next generated node may start with `$`.
fn escape_text(raw: &str) -> String {
    let mut out = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '{' if matches!(chars.peek(), Some('$') | None) => out.push_str("\\{"),
            _ => out.push(c),
        }
    }
    out
}

fn text() -> impl Strategy<Value = String> {
    "[a-z {}$\\\\\n]{1,12}".prop_map(|raw| escape_text(&raw))
}

fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,5}"
}

/// Anything that may appear as a FOR bound.
fn bound() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<i64>().prop_map(|n| n.to_string()),
        (-1.0e6..1.0e6f64).prop_map(|x| Element::ConstantDouble(x).to_string()),
        "[ -~\n\r\t]{0,8}".prop_map(|s| Element::String(s).to_string()),
        ident(),
    ]
}

fn echo_element() -> impl Strategy<Value = String> {
    prop_oneof![
        bound(),
        prop::sample::select(vec!["+", "-", "*", "/", "^"]).prop_map(str::to_string),
        "[a-z][a-zA-Z0-9]{0,6}".prop_map(|name| format!("@{name}")),
    ]
}

fn echo() -> impl Strategy<Value = String> {
    prop::collection::vec(echo_element(), 0..6).prop_map(|els| format!("{{$= {} $}}", els.join(" ")))
}

fn node() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![text(), echo()];
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            ident(),
            bound(),
            bound(),
            proptest::option::of(bound()),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(var, start, end, step, body)| {
                let step = step.map(|s| format!(" {s}")).unwrap_or_default();
                format!("{{$ FOR {var} {start} {end}{step} $}}{}{{$END$}}", body.concat())
            })
    })
}

fn template() -> impl Strategy<Value = String> {
    prop::collection::vec(node(), 0..6).prop_map(|nodes| nodes.concat())
}

fn is_balanced(ops: &[bool]) -> bool {
    let mut depth = 0i32;
    for open in ops {
        depth += if *open { 1 } else { -1 };
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

proptest! {
    /// Serializing a parsed document and parsing it again gives the same tree.
    #[test]
    fn serialized_documents_reparse_equal(src in template()) {
        let doc = parse(&src).unwrap();
        let again = parse(&doc.to_string()).unwrap();
        prop_assert_eq!(doc, again);
    }

    /// The parser accepts a FOR/END sequence iff it nests properly.
    #[test]
    fn nesting_accepted_iff_balanced(ops in prop::collection::vec(any::<bool>(), 0..12)) {
        let src: String = ops
            .iter()
            .map(|open| if *open { "{$FOR i 1 2$}x" } else { "{$END$}y" })
            .collect();
        let result = parse(&src);
        prop_assert_eq!(result.is_ok(), is_balanced(&ops));
        if let Err(err) = result {
            let structural = matches!(err, ParseError::UnmatchedEnd { .. } | ParseError::UnclosedFor { .. });
            prop_assert!(structural);
        }
    }

    /// Ensure the parser never panics on arbitrary input.
    #[test]
    fn parser_does_not_panic(s in "\\PC*") {
        let _ = parse(&s);
    }

    #[test]
    fn mixed_addition_promotes_symmetrically(a in any::<i32>(), b in -1.0e9..1.0e9f64) {
        let left = Value::from(a).add(&Value::from(b)).unwrap();
        let right = Value::from(b).add(&Value::from(a)).unwrap();
        prop_assert_eq!(&left, &right);
        prop_assert!(matches!(left, Value::Double(_)));
    }

    #[test]
    fn integer_addition_wraps_like_i32(a in any::<i32>(), b in any::<i32>()) {
        let sum = Value::from(a).add(&Value::from(b)).unwrap();
        prop_assert_eq!(sum, Value::Integer(i64::from(a.wrapping_add(b))));
    }
}
