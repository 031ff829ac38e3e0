//! Property-based checks of value algebra and literal memoization.

use jlang::{parse_program, run_source, Interpreter, SemanticErrorKind, Value};
use proptest::prelude::*;

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        any::<bool>().prop_map(Value::Boolean),
        "[a-z]{0,8}".prop_map(|s| Value::string(s.as_str())),
    ]
}

/// Two values whose variants differ.
fn arb_mixed_pair() -> impl Strategy<Value = (Value, Value)> {
    (arb_value(), arb_value()).prop_filter("variants must differ", |(a, b)| {
        a.variant() != b.variant()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn integer_add_then_subtract_is_identity(a in any::<i64>(), b in any::<i64>()) {
        let a = Value::Integer(a);
        let b = Value::Integer(b);
        let back = a.add(&b).and_then(|sum| sum.subtract(&b)).unwrap();
        prop_assert_eq!(back, a);
    }

    #[test]
    fn float_add_then_subtract_is_close(a in -1.0e9f64..1.0e9, b in -1.0e9f64..1.0e9) {
        let back = Value::Float(a)
            .add(&Value::Float(b))
            .and_then(|sum| sum.subtract(&Value::Float(b)))
            .unwrap();
        match back {
            Value::Float(x) => prop_assert!((x - a).abs() <= 1e-6 * (1.0 + a.abs().max(b.abs()))),
            other => prop_assert!(false, "expected float, found {:?}", other),
        }
    }

    #[test]
    fn mixed_variants_always_fail((lhs, rhs) in arb_mixed_pair()) {
        let results = [
            lhs.add(&rhs),
            lhs.subtract(&rhs),
            lhs.multiply(&rhs),
            lhs.divide(&rhs),
            lhs.eq(&rhs),
            lhs.neq(&rhs),
            lhs.lt(&rhs),
            lhs.lte(&rhs),
            lhs.gt(&rhs),
            lhs.gte(&rhs),
        ];
        for result in results {
            let err = result.unwrap_err();
            prop_assert_eq!(err.kind(), SemanticErrorKind::Type);
        }
    }

    #[test]
    fn comparisons_agree_with_each_other(a in any::<i64>(), b in any::<i64>()) {
        let (a, b) = (Value::Integer(a), Value::Integer(b));
        let lt = a.lt(&b).unwrap();
        let gte = a.gte(&b).unwrap();
        prop_assert_eq!(lt.not().unwrap(), gte);
        prop_assert_eq!(a.eq(&b).unwrap().not().unwrap(), a.neq(&b).unwrap());
    }

    #[test]
    fn repeated_literal_evaluation_is_stable(n in 0i64..=i64::MAX, times in 1usize..6) {
        let source = format!("i = 0; while (i < {times}) {{ write {n}; i = i + 1; }}");
        let out = run_source(&source, Vec::new()).unwrap();
        let expected = format!("{n}\n").repeat(times);
        prop_assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn rerunning_a_tree_reuses_cached_literals(x in -1000.0f64..1000.0) {
        let source = format!("write {x:?} * 2.0;");
        let ast = parse_program(&source).unwrap();
        let first = {
            let mut interpreter = Interpreter::new(&ast, Vec::new());
            interpreter.run().unwrap();
            interpreter.into_output()
        };
        let second = {
            let mut interpreter = Interpreter::new(&ast, Vec::new());
            interpreter.run().unwrap();
            interpreter.into_output()
        };
        prop_assert_eq!(first, second);
    }
}

