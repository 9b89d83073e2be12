use proptest::prelude::*;
use xform_grammar::{Expression, Operator, Scalar, Variable};

fn operand() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(Variable::ALL.to_vec()).prop_map(|v| v.as_str().to_string()),
        (0u32..100_000).prop_map(|n| n.to_string()),
        (0u32..1000, "[0-9]{1,4}").prop_map(|(i, frac)| format!("{i}.{frac}")),
    ]
}

fn expression() -> impl Strategy<Value = String> {
    (
        operand(),
        proptest::collection::vec(
            (proptest::sample::select(Operator::ALL.to_vec()), operand()),
            0..6,
        ),
    )
        .prop_map(|(head, tail)| {
            let mut text = head;
            for (op, operand) in tail {
                text.push('_');
                text.push_str(op.as_str());
                text.push('_');
                text.push_str(&operand);
            }
            text
        })
}

#[test]
fn known_expressions_parse() {
    for text in ["ih", "iw_div_2", "bh_mul_0.5_sub_10", "car_pow_2_add_idu", "0.50"] {
        let scalar = Scalar::parse(text).unwrap();
        assert_eq!(scalar.to_string(), text);
    }
}

proptest! {
    #[test]
    fn prop_expression_round_trips(text in expression()) {
        let parsed: Expression = text.parse().unwrap();
        prop_assert_eq!(parsed.to_string(), text.clone());

        let scalar = Scalar::parse(&text).unwrap();
        prop_assert_eq!(scalar.to_string(), text);
    }

    #[test]
    fn prop_negative_integers_use_marker(n in i64::MIN + 1..0) {
        let rendered = Scalar::Integer(n).to_string();
        prop_assert!(rendered.starts_with('N'));
        prop_assert!(!rendered.contains('-'));
        prop_assert_eq!(Scalar::parse(&rendered).unwrap(), Scalar::Integer(n));
    }

    #[test]
    fn prop_negative_floats_use_marker(v in -1.0e9f64..-1.0e-6) {
        let rendered = Scalar::float(v).unwrap().to_string();
        prop_assert!(rendered.starts_with('N'));
        prop_assert!(!rendered.contains('-'));
    }

    #[test]
    fn prop_floats_never_render_bare_minus(v in prop_oneof![Just(-0.0f64), -1.0e9f64..1.0e9]) {
        let rendered = Scalar::float(v).unwrap().to_string();
        prop_assert!(!rendered.contains('-'), "rendered {}", rendered);
    }

    #[test]
    fn prop_garbage_is_rejected(text in "[a-z]{1,3}_[a-z]{4,8}_[a-z]{1,3}") {
        // four-plus letter operators never occur in the grammar
        prop_assert!(Scalar::parse(&text).is_err());
    }
}
