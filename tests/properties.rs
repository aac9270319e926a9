
use fixtures::get_engine;
use proptest::prelude::*;
use unilate::{Context, Segment, TemplateKind, Value};

/// Segment structure without locations: escapes in rendered text shift
/// columns, not content.
fn shape(segments: &[Segment]) -> Vec<String> {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) => format!("literal {text:?}"),
            Segment::Immediate(expression) => format!("immediate {:?}", expression.source()),
            Segment::Deferred(deferred) => format!("deferred {:?}", shape(deferred.parts())),
        })
        .collect()
}

/// Template text made of words and `${...}` blocks only.
fn immediate_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-z $#.]{0,8}",
            "[a-z]{1,8}".prop_map(|name| format!("${{{name}}}")),
        ],
        0..6,
    )
    .prop_map(|pieces| pieces.concat())
}

proptest! {
    #[test]
    #[ntest::timeout(10000)]
    fn marker_free_text_is_constant(text in "[^$#\\\\]{0,64}") {
        let engine = get_engine();
        let template = engine.parse(text.as_str()).unwrap();

        prop_assert!(template.is_constant());
        prop_assert!(template.is_immediate());
        prop_assert_eq!(template.evaluate(None).unwrap(), Value::from(text.as_str()));
    }

    #[test]
    #[ntest::timeout(10000)]
    fn immediate_text_prepares_to_itself(text in immediate_text(), with_context in any::<bool>()) {
        let engine = get_engine();
        let template = engine.parse(text.as_str()).unwrap();
        prop_assert!(!template.is_deferred());

        let vars = Context::new();
        let context = with_context.then_some(&vars);
        let prepared = template.prepare(context).unwrap();
        prop_assert!(std::ptr::eq(&*prepared, &template));
    }

    #[test]
    #[ntest::timeout(10000)]
    fn integer_blocks_are_native(a in -1_000_000_i64..1_000_000, b in -1_000_000_i64..1_000_000) {
        let engine = get_engine();
        let template = engine.parse(format!("${{{a} + {b}}}")).unwrap();
        prop_assert_eq!(template.evaluate(None).unwrap(), Value::Int(a + b));
    }

    #[test]
    #[ntest::timeout(10000)]
    fn prepare_freezes_immediates(name in "[a-z]{1,12}", later in "[a-z]{1,12}") {
        let engine = get_engine();
        let template = engine.parse("#{later}: ${name}").unwrap();

        let mut first = Context::new();
        first.insert("name", name.as_str());
        let prepared = template.prepare(Some(&first)).unwrap();
        prop_assert_eq!(prepared.kind(), TemplateKind::Deferred);
        let expected_source = format!("#{{later}}: {name}");
        prop_assert_eq!(prepared.source(), expected_source.as_str());

        let mut second = Context::new();
        second.insert("later", later.as_str()).insert("name", "ignored");
        prop_assert_eq!(
            prepared.evaluate(Some(&second)).unwrap(),
            Value::from(format!("{later}: {name}"))
        );
    }

    #[test]
    #[ntest::timeout(10000)]
    fn prepared_source_reparses_identically(value in "[a-z ${}#'\"\\\\]{0,16}") {
        let engine = get_engine();
        let template = engine.parse("#{later} ${value}").unwrap();

        let mut vars = Context::new();
        vars.insert("value", value.as_str());
        let prepared = template.prepare(Some(&vars)).unwrap();
        let reparsed = engine.parse(prepared.source()).unwrap();
        prop_assert_eq!(reparsed.segments(), prepared.segments());
        prop_assert_eq!(&reparsed, &*prepared);

        let mut second = Context::new();
        second.insert("later", "L");
        prop_assert_eq!(
            reparsed.evaluate(Some(&second)).unwrap(),
            Value::from(format!("L {value}"))
        );
    }

    #[test]
    #[ntest::timeout(10000)]
    fn rendered_source_reparses_identically(text in "[a-z ${}#'\\\\]{0,32}") {
        let engine = get_engine();
        if let Ok(template) = engine.parse(text.as_str()) {
            let reparsed = engine.parse(template.render_source()).unwrap();
            prop_assert_eq!(reparsed.kind(), template.kind());
            prop_assert_eq!(shape(reparsed.segments()), shape(template.segments()));
        }
    }
}
