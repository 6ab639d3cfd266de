// tests/well_injection_tests.rs

use udq_lang::uda::{ConfigError, UdaControl, UdaValue};
use udq_lang::units::{Measure, UnitSystem, barsa};
use udq_lang::well_injection::{
    DEFAULT_HISTORICAL_BHP_LIMIT, InjectionHistory, InjectionRecord, InjectorCMode, InjectorType, WeltargCMode,
    WellInjectionProperties,
};
use udq_lang::{SummaryState, UdqActive, UdqConfig};

const UNDEFINED: f64 = -1.0e20;

fn rate_record(rate: UdaValue) -> InjectionRecord {
    InjectionRecord {
        injector_type: InjectorType::Water,
        cmode: "RATE".to_string(),
        rate: Some(rate),
        ..InjectionRecord::default()
    }
}

fn injector() -> WellInjectionProperties {
    let mut well = WellInjectionProperties::new(UnitSystem::Metric, "INJ1");
    well.handle_wconinje(&rate_record(UdaValue::Numeric(100.0)), 500.0, false)
        .unwrap();
    well
}

fn config() -> UdqConfig {
    let mut config = UdqConfig::default();
    config.add_define("WUIRATE", "FOPR / 2", None).unwrap();
    config.add_define("WUBHP", "WOPR", None).unwrap();
    config
}

// ============================================================================
// WCONINJE
// ============================================================================

#[test]
fn test_wconinje_controls() {
    let well = injector();
    assert!(well.has_injection_control(InjectorCMode::Rate));
    assert!(well.has_injection_control(InjectorCMode::Bhp));
    assert!(!well.has_injection_control(InjectorCMode::Resv));
    assert_eq!(well.control_mode, InjectorCMode::Rate);

    let controls = well.controls(&SummaryState::new(), UNDEFINED);
    let units = UnitSystem::Metric;
    assert_eq!(controls.surface_rate, units.to_si(Measure::LiquidSurfaceRate, 100.0));
    assert_eq!(controls.bhp_limit, barsa(500.0));
    assert!(controls.has_control(InjectorCMode::Rate));
    assert!(!controls.has_control(InjectorCMode::Grup));
    assert!(controls.prediction_mode);
}

#[test]
fn test_group_control_bit() {
    let mut well = WellInjectionProperties::new(UnitSystem::Metric, "INJ1");
    well.handle_wconinje(&rate_record(UdaValue::Numeric(1.0)), 500.0, true)
        .unwrap();
    assert_eq!(
        well.injection_controls(),
        InjectorCMode::Rate.bit() | InjectorCMode::Bhp.bit() | InjectorCMode::Grup.bit()
    );
    well.clear_controls();
    assert_eq!(well.injection_controls(), 0);
}

#[test]
fn test_control_mode_must_be_enabled() {
    let mut well = injector();
    assert_eq!(
        well.set_control_mode("RESV"),
        Err(ConfigError::InvalidControlMode {
            mode: "RESV".to_string(),
            well: "INJ1".to_string(),
        })
    );
    assert!(well.set_control_mode("BOGUS").is_err());
    well.set_control_mode("BHP").unwrap();
    assert_eq!(well.control_mode, InjectorCMode::Bhp);
}

#[test]
fn test_thp_needs_vfp_table() {
    let mut well = WellInjectionProperties::new(UnitSystem::Metric, "INJ1");
    let record = InjectionRecord {
        thp: Some(UdaValue::Numeric(100.0)),
        ..rate_record(UdaValue::Numeric(1.0))
    };
    assert!(matches!(
        well.handle_wconinje(&record, 500.0, false),
        Err(ConfigError::MissingVfpTable { .. })
    ));

    let record = InjectionRecord { vfp_table: 3, ..record };
    well.handle_wconinje(&record, 500.0, false).unwrap();
    assert!(well.has_injection_control(InjectorCMode::Thp));
}

#[test]
fn test_injector_type_names() {
    assert_eq!(InjectorType::from_name("WAT").unwrap(), InjectorType::Water);
    assert_eq!(InjectorType::from_name("gas").unwrap(), InjectorType::Gas);
    assert!(matches!(
        InjectorType::from_name("STEAM"),
        Err(ConfigError::UnknownInjectorType { .. })
    ));
}

// ============================================================================
// WCONINJH
// ============================================================================

#[test]
fn test_history_mode_resets_unsupported_control() {
    let mut well = WellInjectionProperties::new(UnitSystem::Metric, "INJ1");
    let record = InjectionHistory {
        cmode: "THP".to_string(),
        rate: Some(50.0),
        ..InjectionHistory::default()
    };
    let default_limit = barsa(DEFAULT_HISTORICAL_BHP_LIMIT);
    well.handle_wconinjh(&record, 0, default_limit, false).unwrap();

    assert_eq!(well.control_mode, InjectorCMode::Rate);
    assert!(!well.prediction_mode);
    assert_eq!(well.bhp_hist_limit, default_limit);

    let controls = well.controls(&SummaryState::new(), UNDEFINED);
    assert_eq!(controls.bhp_limit, default_limit);
    assert_eq!(controls.cmode, InjectorCMode::Rate);
    assert!(!controls.prediction_mode);
}

#[test]
fn test_history_bhp_control_uses_observed_bhp() {
    let mut well = WellInjectionProperties::new(UnitSystem::Metric, "INJ1");
    let record = InjectionHistory {
        cmode: "BHP".to_string(),
        bhp: Some(200.0),
        ..InjectionHistory::default()
    };
    well.handle_wconinjh(&record, 0, barsa(DEFAULT_HISTORICAL_BHP_LIMIT), false)
        .unwrap();
    assert_eq!(well.bhph, barsa(200.0));
    assert_eq!(well.bhp_hist_limit, barsa(200.0));
    assert_eq!(well.control_mode, InjectorCMode::Bhp);
}

#[test]
fn test_reset_historical_limits() {
    let mut well = injector();
    well.reset_default_historical_bhp_limit();
    assert_eq!(well.bhp_hist_limit, barsa(6891.2));
    well.reset_bhp_limit();
    assert_eq!(well.bhp_hist_limit, 0.0);
}

// ============================================================================
// WELTARG and WTMULT
// ============================================================================

#[test]
fn test_weltarg_rate_must_match_phase() {
    let mut well = injector();
    assert!(matches!(
        well.handle_weltarg(WeltargCMode::Grat, UdaValue::Numeric(10.0)),
        Err(ConfigError::InjectorTypeMismatch {
            required: InjectorType::Gas,
            ..
        })
    ));
    well.handle_weltarg(WeltargCMode::Wrat, UdaValue::Numeric(10.0)).unwrap();
    assert_eq!(well.surface_injection_rate, UdaValue::Numeric(10.0));
}

#[test]
fn test_weltarg_bhp_in_history_mode() {
    let mut well = WellInjectionProperties::new(UnitSystem::Metric, "INJ1");
    let record = InjectionHistory {
        cmode: "RATE".to_string(),
        ..InjectionHistory::default()
    };
    well.handle_wconinjh(&record, 0, 0.0, false).unwrap();

    well.handle_weltarg(WeltargCMode::Bhp, UdaValue::Numeric(300.0)).unwrap();
    assert_eq!(well.bhp_hist_limit, barsa(300.0));
    assert!(matches!(
        well.handle_weltarg(WeltargCMode::Bhp, UdaValue::from("WUBHP")),
        Err(ConfigError::InvalidTarget { .. })
    ));
}

#[test]
fn test_weltarg_vfp_table_must_be_a_table_number() {
    let mut well = injector();
    for bad in [-1.0, 2.5, f64::NAN] {
        assert!(
            matches!(
                well.handle_weltarg(WeltargCMode::Vfp, UdaValue::Numeric(bad)),
                Err(ConfigError::InvalidTarget { .. })
            ),
            "accepted {}",
            bad
        );
    }
    assert_eq!(well.vfp_table_number, 0);
    assert!(matches!(
        well.handle_weltarg(WeltargCMode::Vfp, UdaValue::from("WUVFP")),
        Err(ConfigError::InvalidTarget { .. })
    ));

    well.handle_weltarg(WeltargCMode::Vfp, UdaValue::Numeric(3.0)).unwrap();
    assert_eq!(well.vfp_table_number, 3);
}

#[test]
fn test_wtmult() {
    let mut well = injector();
    well.handle_wtmult(WeltargCMode::Wrat, 1.5).unwrap();
    assert_eq!(well.surface_injection_rate, UdaValue::Numeric(150.0));

    well.bhp_target = UdaValue::from("WUBHP");
    assert_eq!(
        well.handle_wtmult(WeltargCMode::Bhp, 2.0),
        Err(ConfigError::UdqTarget {
            well: "INJ1".to_string(),
            target: "BHP".to_string(),
        })
    );
    assert!(matches!(
        well.handle_wtmult(WeltargCMode::Lift, 2.0),
        Err(ConfigError::InvalidTarget { .. })
    ));
}

// ============================================================================
// User defined arguments
// ============================================================================

#[test]
fn test_rate_bound_to_quantity() {
    let mut config = config();
    let mut active = UdqActive::default();
    let mut well = injector();
    well.update_uda(&config, &mut active, UdaControl::WconinjeRate, "WUIRATE".into())
        .unwrap();

    assert_eq!(active.udq_for("INJ1", UdaControl::WconinjeRate), Some("WUIRATE"));
    assert_eq!(active.use_count("WUIRATE", UdaControl::WconinjeRate), 1);
    assert_eq!(active.controls_for("WUIRATE"), vec![("INJ1", UdaControl::WconinjeRate)]);

    let mut st = SummaryState::new();
    st.update("FOPR", 400.0);
    st.update_well_var("INJ1", "WOPR", 0.0);
    config.eval(&mut st).unwrap();

    let controls = well.controls(&st, UNDEFINED);
    assert_eq!(
        controls.surface_rate,
        UnitSystem::Metric.to_si(Measure::LiquidSurfaceRate, 200.0)
    );

    // a literal target releases the binding
    well.update_uda(&config, &mut active, UdaControl::WconinjeRate, 50.0.into())
        .unwrap();
    assert!(active.is_empty());
}

#[test]
fn test_undefined_quantity_target() {
    let config = config();
    let mut active = UdqActive::default();
    let mut well = injector();
    well.update_uda(&config, &mut active, UdaControl::WconinjeRate, "WUIRATE".into())
        .unwrap();

    // not evaluated yet: the rate falls back to the undefined value, clamped at zero
    let controls = well.controls(&SummaryState::new(), UNDEFINED);
    assert_eq!(controls.surface_rate, 0.0);
}

#[test]
fn test_unknown_quantity_is_rejected() {
    let config = config();
    let mut active = UdqActive::default();
    let mut well = injector();
    assert_eq!(
        well.update_uda(&config, &mut active, UdaControl::WconinjeBhp, "WUNONE".into()),
        Err(ConfigError::UnknownUdq {
            udq: "WUNONE".to_string(),
            entity: "INJ1".to_string(),
            control: UdaControl::WconinjeBhp,
        })
    );
    assert!(active.is_empty());
}

#[test]
fn test_other_phase_target_is_ignored() {
    let config = config();
    let mut active = UdqActive::default();
    let mut well = injector();
    well.update_uda(&config, &mut active, UdaControl::WeltargGrat, "WUIRATE".into())
        .unwrap();
    assert!(active.is_empty());
    assert_eq!(well.surface_injection_rate, UdaValue::Numeric(100.0));
}

#[test]
fn test_active_counts() {
    let config = config();
    let mut active = UdqActive::default();
    let mut well = WellInjectionProperties::new(UnitSystem::Metric, "INJ1");
    let record = InjectionRecord {
        bhp: Some(UdaValue::from("WUBHP")),
        ..rate_record(UdaValue::from("WUIRATE"))
    };
    well.handle_wconinje(&record, 500.0, false).unwrap();

    assert!(well.update_udq_active(&config, &mut active).unwrap());
    assert_eq!(active.records().len(), 2);
    assert!(!well.update_udq_active(&config, &mut active).unwrap());

    // both quantities keep their declaration positions
    assert_eq!(active.records()[0].input_index, 0);
    assert_eq!(active.records()[1].input_index, 1);

    well.handle_weltarg(WeltargCMode::Bhp, UdaValue::from("WUIRATE")).unwrap();
    assert!(well.update_weltarg_active(&config, WeltargCMode::Bhp, &mut active).unwrap());
    assert_eq!(active.udq_for("INJ1", UdaControl::WeltargBhp), Some("WUIRATE"));
    assert!(!well.update_weltarg_active(&config, WeltargCMode::Grat, &mut active).unwrap());
}

#[test]
fn test_bhp_bound_to_well_quantity() {
    let mut config = config();
    let mut active = UdqActive::default();
    let mut well = injector();
    well.update_uda(&config, &mut active, UdaControl::WconinjeBhp, "WUBHP".into())
        .unwrap();

    let mut st = SummaryState::new();
    st.update("FOPR", 0.0);
    st.update_well_var("INJ1", "WOPR", 250.0);
    config.eval(&mut st).unwrap();

    let controls = well.controls(&st, UNDEFINED);
    assert_eq!(controls.bhp_limit, barsa(250.0));
}
