// tests/evaluator_tests.rs

use indexmap::IndexMap;
use udq_lang::parser::parse_expression;
use udq_lang::tables::{Interpolation, UserTable};
use udq_lang::{EvalContext, EvalError, SummaryState, UdqSet, VarType};

fn state() -> SummaryState {
    let mut st = SummaryState::new();
    st.update_well_var("PROD1", "WOPR", 100.0);
    st.update_well_var("PROD2", "WOPR", 200.0);
    st.update_well_var("INJ1", "WOPR", 0.0);
    st.update_well_var("PROD1", "WWPR", 10.0);
    st.update_well_var("PROD2", "WWPR", 20.0);
    st.update_well_var("INJ1", "WWPR", 30.0);
    st.update_group_var("G1", "GOPR", 300.0);
    st.update_group_var("FIELD", "GOPR", 300.0);
    st.update("FOPR", 300.0);
    st.update("FWPR", 60.0);
    st.update("FLPR", 360.0);
    st
}

fn eval(input: &str, target: VarType, st: &SummaryState) -> Result<UdqSet, EvalError> {
    let node = parse_expression(input).unwrap_or_else(|e| panic!("Failed to parse '{}': {}", input, e));
    node.eval(target, &EvalContext::new(st))
}

fn scalar(input: &str, st: &SummaryState) -> Option<f64> {
    eval(input, VarType::Field, st).unwrap().scalar_value()
}

// ============================================================================
// Arithmetic and precedence
// ============================================================================

#[test]
fn test_precedence_of_field_expressions() {
    let mut st = SummaryState::new();
    for (flpr, fopr, fwpr) in [(1.0, 2.0, 3.0), (10.0, 0.5, -2.0), (7.0, 3.0, 11.0)] {
        st.update("FLPR", flpr);
        st.update("FOPR", fopr);
        st.update("FWPR", fwpr);

        let cs13 = scalar("FLPR*FOPR + 3 + FWPR", &st);
        let cs14 = scalar("(FLPR*FOPR + 3) + FWPR", &st);
        let cs11 = scalar("FLPR*(FOPR*(3+FWPR))", &st);
        assert_eq!(cs13, Some(flpr * fopr + 3.0 + fwpr));
        assert_eq!(cs13, cs14);
        assert_eq!(cs11, Some(flpr * (fopr * (3.0 + fwpr))));
        assert_ne!(cs13, cs11);
    }
}

#[test]
fn test_sign_folding() {
    let mut st = SummaryState::new();
    for (fopr, fwpr) in [(1.0, 2.0), (-4.5, 3.0), (10.0, 0.0)] {
        st.update("FOPR", fopr);
        st.update("FWPR", fwpr);
        let expected = (fopr + 3.5) * fwpr;
        assert_eq!(scalar("-(-FOPR - 3.5) * FWPR", &st), Some(expected));
        assert_eq!(scalar("-(-(FOPR+3.5))*FWPR", &st), Some(expected));
        assert_eq!(scalar("-((FOPR+3.5))*FWPR", &st), Some(-expected));
    }
}

#[test]
fn test_power_and_minus() {
    let mut st = SummaryState::new();
    st.update("FOPR", 3.0);
    assert_eq!(scalar("-FOPR ^ 2", &st), Some(-9.0));
    assert_eq!(scalar("2 ^ 3 ^ 2", &st), Some(64.0));
    assert_eq!(scalar("FOPR ^ -1 * 6", &st), Some(2.0));
}

#[test]
fn test_division_by_zero_is_undefined() {
    let st = state();
    let result = eval("WWPR / WOPR", VarType::Well, &st).unwrap();
    assert_eq!(result.value_of("PROD1"), Some(0.1));
    assert_eq!(result.value_of("INJ1"), None);
}

#[test]
fn test_comparison_gives_zero_or_one() {
    let st = state();
    let result = eval("WOPR > 150", VarType::Well, &st).unwrap();
    assert_eq!(result.value_of("PROD1"), Some(0.0));
    assert_eq!(result.value_of("PROD2"), Some(1.0));
    assert_eq!(scalar("FOPR == 300", &st), Some(1.0));
}

// ============================================================================
// Sets and broadcasting
// ============================================================================

#[test]
fn test_sum_broadcast() {
    let mut st = SummaryState::new();
    st.update_well_var("PROD1", "WOPR", 100.0);
    st.update_well_var("PROD2", "WOPR", 200.0);
    assert_eq!(scalar("SUM(WOPR)", &st), Some(300.0));

    // the sum broadcasts over every well
    let result = eval("WOPR / SUM(WOPR)", VarType::Well, &st).unwrap();
    assert_eq!(result.value_of("PROD2"), Some(200.0 / 300.0));
}

#[test]
fn test_well_set_in_field_target_fails() {
    let st = state();
    assert!(matches!(
        eval("WOPR", VarType::Field, &st),
        Err(EvalError::UnsupportedTarget { found: VarType::Well, target: VarType::Field, .. })
    ));
}

#[test]
fn test_wildcard_selector() {
    let st = state();
    let result = eval("WOPR 'PROD*'", VarType::Well, &st).unwrap();
    assert_eq!(result.names(), vec!["PROD1", "PROD2"]);
    assert_eq!(scalar("SUM(WOPR 'P*')", &st), Some(300.0));
    assert_eq!(scalar("SUM(WOPR 'PROD?' 'INJ1')", &st), Some(300.0));
}

#[test]
fn test_single_well_is_scalar() {
    let st = state();
    assert_eq!(scalar("WOPR PROD2 - WOPR PROD1", &st), Some(100.0));
    let result = eval("WWPR + WOPR PROD1", VarType::Well, &st).unwrap();
    assert_eq!(result.value_of("INJ1"), Some(130.0));
}

#[test]
fn test_unknown_well() {
    let st = state();
    assert!(matches!(
        eval("WOPR NOPE", VarType::Field, &st),
        Err(EvalError::NoMatchingEntities { .. })
    ));
    assert!(matches!(
        eval("WOPR 'X*'", VarType::Well, &st),
        Err(EvalError::NoMatchingEntities { .. })
    ));
}

#[test]
fn test_unknown_keyword() {
    let st = state();
    assert_eq!(
        eval("FGPR + 1", VarType::Field, &st),
        Err(EvalError::UnknownKeyword {
            keyword: "FGPR".to_string()
        })
    );
}

#[test]
fn test_group_values() {
    let st = state();
    let result = eval("GOPR * 2", VarType::Group, &st).unwrap();
    assert_eq!(result.value_of("G1"), Some(600.0));
    assert_eq!(scalar("GOPR FIELD", &st), Some(300.0));
}

// ============================================================================
// Undefined values
// ============================================================================

fn partial_state() -> SummaryState {
    let mut st = SummaryState::new();
    st.update_well_var("P1", "WOPR", 1.0);
    st.update_well_var("P2", "WOPR", 2.0);
    st.update_well_var("P1", "WUA", 10.0);
    st.update_well_var("P2", "WUB", 5.0);
    st
}

#[test]
fn test_undefined_poisons_plus() {
    let st = partial_state();
    let result = eval("WOPR + WUA", VarType::Well, &st).unwrap();
    assert_eq!(result.value_of("P1"), Some(11.0));
    assert_eq!(result.value_of("P2"), None);
}

#[test]
fn test_uadd_passes_defined_side() {
    let st = partial_state();
    let result = eval("WUA UADD WUB", VarType::Well, &st).unwrap();
    assert_eq!(result.value_of("P1"), Some(10.0));
    assert_eq!(result.value_of("P2"), Some(5.0));

    let result = eval("WUA UMAX WOPR", VarType::Well, &st).unwrap();
    assert_eq!(result.value_of("P1"), Some(10.0));
    assert_eq!(result.value_of("P2"), Some(2.0));
}

#[test]
fn test_uadd_equals_plus_when_defined() {
    let st = state();
    let plus = eval("WOPR + WWPR", VarType::Well, &st).unwrap();
    let uadd = eval("WOPR UADD WWPR", VarType::Well, &st).unwrap();
    assert_eq!(plus, uadd);
}

#[test]
fn test_sum_ignores_undefined() {
    let st = partial_state();
    assert_eq!(scalar("SUM(WUA)", &st), Some(10.0));
    assert_eq!(scalar("SUM(WUC)", &st), Some(0.0));
    assert_eq!(scalar("AVEA(WUC)", &st), None);
}

#[test]
fn test_def_and_undef() {
    let st = partial_state();
    let result = eval("DEF(WUA)", VarType::Well, &st).unwrap();
    assert_eq!(result.value_of("P1"), Some(1.0));
    assert_eq!(result.value_of("P2"), None);

    let result = eval("UNDEF(WUA)", VarType::Well, &st).unwrap();
    assert_eq!(result.value_of("P1"), None);
    assert_eq!(result.value_of("P2"), Some(1.0));

    let result = eval("IDV(WUA)", VarType::Well, &st).unwrap();
    assert_eq!(result.value_of("P2"), Some(0.0));
}

#[test]
fn test_overflow_is_domain_error() {
    let mut st = SummaryState::new();
    st.update("FOPR", 1e308);
    match eval("FOPR * 10", VarType::Field, &st) {
        Err(EvalError::Domain { function, value, .. }) => {
            assert_eq!(function, "*");
            assert_eq!(value, 1e308);
        }
        other => panic!("Expected domain error, got {:?}", other),
    }
    assert!(matches!(
        eval("FOPR * 10 - FOPR * 10", VarType::Field, &st),
        Err(EvalError::Domain { .. })
    ));
    match eval("FOPR UADD FOPR", VarType::Field, &st) {
        Err(EvalError::Domain { function, .. }) => assert_eq!(function, "UADD"),
        other => panic!("Expected domain error, got {:?}", other),
    }
    assert!(scalar("FOPR / 10", &st).is_some_and(f64::is_finite));
}

#[test]
fn test_infinite_difference_is_domain_error() {
    let mut st = SummaryState::new();
    st.update("FOPR", f64::INFINITY);
    match eval("FOPR - FOPR", VarType::Field, &st) {
        Err(EvalError::Domain { function, .. }) => assert_eq!(function, "-"),
        other => panic!("Expected domain error, got {:?}", other),
    }

    let mut st = state();
    st.update_well_var("PROD2", "WOPR", 1e308);
    assert_eq!(
        eval("WOPR * 10", VarType::Well, &st).unwrap_err(),
        EvalError::Domain {
            function: "*".to_string(),
            entity: "PROD2".to_string(),
            value: 1e308,
        }
    );
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_log_domain_error() {
    let st = state();
    let err = eval("LOG(WOPR)", VarType::Well, &st).unwrap_err();
    assert_eq!(
        err,
        EvalError::Domain {
            function: "LOG".to_string(),
            entity: "INJ1".to_string(),
            value: 0.0,
        }
    );

    let mut st = SummaryState::new();
    st.update("FOPR", -1.0);
    assert!(matches!(
        eval("LOG(FOPR)", VarType::Field, &st),
        Err(EvalError::Domain { .. })
    ));
    assert!(matches!(
        eval("LN(FOPR)", VarType::Field, &st),
        Err(EvalError::Domain { .. })
    ));
    st.update("FOPR", 1000.0);
    assert!((scalar("LOG(FOPR)", &st).unwrap() - 3.0).abs() < 1e-12);
}

#[test]
fn test_scalar_functions() {
    let mut st = SummaryState::new();
    for (well, value) in [("A", 1.0), ("B", 4.0), ("C", -2.0)] {
        st.update_well_var(well, "WOPR", value);
    }
    assert_eq!(scalar("MAX(WOPR)", &st), Some(4.0));
    assert_eq!(scalar("MIN(WOPR)", &st), Some(-2.0));
    assert_eq!(scalar("AVEA(WOPR)", &st), Some(1.0));
    assert_eq!(scalar("PROD(WOPR)", &st), Some(-8.0));
    assert_eq!(scalar("NORM1(WOPR)", &st), Some(7.0));
    assert_eq!(scalar("NORMI(WOPR)", &st), Some(4.0));
    assert_eq!(scalar("NORM2(WOPR)", &st), Some(21.0_f64.sqrt()));
    assert!(matches!(
        eval("AVEG(WOPR)", VarType::Field, &st),
        Err(EvalError::Domain { .. })
    ));
    assert!((scalar("AVEG(WOPR 'A' 'B')", &st).unwrap() - 2.0).abs() < 1e-12);
    assert_eq!(scalar("AVEH(WOPR 'A' 'B')", &st), Some(1.6));
}

#[test]
fn test_elemental_functions() {
    let mut st = SummaryState::new();
    st.update("FOPR", -2.4);
    assert_eq!(scalar("ABS(FOPR)", &st), Some(2.4));
    assert_eq!(scalar("NINT(FOPR)", &st), Some(-2.0));
    assert_eq!(scalar("EXP(FOPR * 0)", &st), Some(1.0));
}

#[test]
fn test_sort() {
    let st = state();
    let result = eval("SORTA(WOPR)", VarType::Well, &st).unwrap();
    assert_eq!(result.value_of("INJ1"), Some(1.0));
    assert_eq!(result.value_of("PROD1"), Some(2.0));
    assert_eq!(result.value_of("PROD2"), Some(3.0));

    let result = eval("SORTD(WOPR)", VarType::Well, &st).unwrap();
    assert_eq!(result.value_of("PROD2"), Some(1.0));
}

// ============================================================================
// Regions, segments and tables
// ============================================================================

#[test]
fn test_region_lookup() {
    let mut st = SummaryState::new();
    st.update_region_var("RGPR", "RE2", 1, 50.0);
    st.update_region_var("RGPR", "RE2", 2, 70.0);
    st.update_region_var("ROIP", "NUM", 1, 1000.0);

    assert_eq!(scalar("RGPR_RE2 1 + RGPR_RE2 2", &st), Some(120.0));
    assert_eq!(scalar("SUM(RGPR_RE2)", &st), Some(120.0));
    assert_eq!(scalar("ROIP 1", &st), Some(1000.0));
    assert!(matches!(
        eval("RGPR_RE2 3", VarType::Field, &st),
        Err(EvalError::NoMatchingEntities { .. })
    ));
}

#[test]
fn test_segments() {
    let mut st = SummaryState::new();
    st.update_segment_var("PROD1", "SOFR", 1, 10.0);
    st.update_segment_var("PROD1", "SOFR", 2, 20.0);
    st.update_segment_var("PROD2", "SOFR", 1, 5.0);

    assert_eq!(scalar("SOFR 'PROD1' 2", &st), Some(20.0));
    assert_eq!(scalar("SUM(SOFR 'PROD1')", &st), Some(30.0));
    let result = eval("SOFR * 2", VarType::Segment, &st).unwrap();
    assert_eq!(result.value_at("PROD2", 1), Some(10.0));
}

#[test]
fn test_user_table() {
    let mut st = SummaryState::new();
    st.update("FOPR", 15.0);
    let mut tables = IndexMap::new();
    tables.insert(
        "TU_FBHP".to_string(),
        UserTable::new(Interpolation::Linear, vec![(10.0, 100.0), (20.0, 200.0)]).unwrap(),
    );

    let node = parse_expression("TU_FBHP[FOPR] + 1").unwrap();
    let context = EvalContext::new(&st).with_tables(&tables);
    let result = node.eval(VarType::Field, &context).unwrap();
    assert_eq!(result.scalar_value(), Some(151.0));

    assert!(matches!(
        node.eval(VarType::Field, &EvalContext::new(&st)),
        Err(EvalError::UnknownTable { .. })
    ));
}

#[test]
fn test_user_table_rejects_nan_argument() {
    let mut st = SummaryState::new();
    st.update("FOPR", f64::NAN);
    st.update("FWPR", 1e308);
    let mut tables = IndexMap::new();
    tables.insert(
        "TU_T".to_string(),
        UserTable::new(Interpolation::Nearest, vec![(0.0, 1.0), (1.0, 2.0)]).unwrap(),
    );
    let context = EvalContext::new(&st).with_tables(&tables);

    let node = parse_expression("TU_T[FOPR]").unwrap();
    match node.eval(VarType::Field, &context) {
        Err(EvalError::Domain { function, .. }) => assert_eq!(function, "TU_T"),
        other => panic!("Expected domain error, got {:?}", other),
    }

    let node = parse_expression("TU_T[FWPR*10 - FWPR*10]").unwrap();
    assert!(matches!(
        node.eval(VarType::Field, &context),
        Err(EvalError::Domain { .. })
    ));
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn test_serde_round_trip_preserves_results() {
    let st = state();
    for input in [
        "(WOPR - 150) * 0.90",
        "-(-FOPR - 3.5) * FWPR",
        "SUM(WOPR 'PROD*') UADD LOG(FOPR)",
        "WOPR > 100",
    ] {
        let node = parse_expression(input).unwrap();
        let json = serde_json::to_string(&node).unwrap();
        let restored: udq_lang::Node = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, node, "Failed for input: {}", input);

        let target = if node.var_type.is_scalar() { VarType::Field } else { node.var_type };
        assert_eq!(
            restored.eval(target, &EvalContext::new(&st)),
            node.eval(target, &EvalContext::new(&st))
        );
    }
}
