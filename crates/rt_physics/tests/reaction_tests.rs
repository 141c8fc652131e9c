// crates/rt_physics/tests/reaction_tests.rs

//! 反应算子集成测试
//!
//! - 平衡态重复求解不改变状态
//! - 缩步在最小子步长处终止
//! - 驱动器按反应间隔与启动延迟调用反应
//! - 矿物溶解增加水相总浓度

use rt_config::{
    Capabilities, ChemistryConfig, KineticConfig, MineralConfig, PrimarySpeciesConfig,
    RateLawConfig, ReactionConfig, RtConfig, SecondarySpeciesConfig, SpeciesKindConfig,
    StoichTerm,
};
use rt_physics::mesh::{Element, SoilProps};
use rt_physics::{
    ChemState, ChemTables, ElementRestart, ElementWaterState, Mesh, ReactionOutcome,
    ReactionSolver, RtDriver, RtDriverBuilder, ZoneRestart,
};

// ============================================================================
// 测试辅助函数
// ============================================================================

fn rel_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * a.abs().max(b.abs())
}

/// A + B ⇌ AB (log K = −1)，矿物 M → A (log K = −2)
fn chemistry() -> ChemistryConfig {
    ChemistryConfig {
        primary: vec![
            PrimarySpeciesConfig::aqueous("A", 0.0),
            PrimarySpeciesConfig::aqueous("B", 0.0),
            PrimarySpeciesConfig::mineral("M", 100.0, 30.0),
        ],
        secondary: vec![SecondarySpeciesConfig {
            name: "AB".into(),
            kind: SpeciesKindConfig::Aqueous,
            charge: 0.0,
            size_factor: 0.0,
            stoichiometry: vec![StoichTerm::new("A", 1.0), StoichTerm::new("B", 1.0)],
            log_k: vec![-1.0],
        }],
        minerals: vec![MineralConfig {
            name: "M".into(),
            stoichiometry: vec![StoichTerm::new("A", 1.0)],
            log_k: vec![-2.0],
        }],
        kinetics: vec![KineticConfig {
            mineral: "M".into(),
            label: "M_tst".into(),
            rate_law: RateLawConfig::Tst,
            log_rate: -9.0,
            activation_energy: 0.0,
            dependence: vec![],
            monod: vec![],
            inhibition: vec![],
            biomass: None,
        }],
        ..Default::default()
    }
}

fn equilibrium_state(tables: &ChemTables) -> ChemState {
    let mut chms = ChemState::new(tables);
    let a = tables.find("A").unwrap();
    let b = tables.find("B").unwrap();
    for (k, p) in [(a, 1e-3), (b, 2e-3)] {
        chms.p_conc[k] = p;
        chms.p_actv[k] = p;
        chms.t_conc[k] = p + 2e-5;
    }
    chms.s_conc[0] = 2e-5;
    chms
}

fn run_config(reaction_delay: f64) -> RtConfig {
    let mut config = RtConfig::default();
    config.capabilities = Capabilities {
        transport: true,
        reaction: true,
        bedrock: false,
        nitrogen: false,
    };
    config.time.stepsize = 600.0;
    config.time.reaction_step = 3600.0;
    config.time.reaction_delay = reaction_delay;
    config.chemistry = chemistry();
    config
}

fn single_element_driver(reaction_delay: f64) -> RtDriver {
    let config = run_config(reaction_delay);
    let tables = ChemTables::build(&config.chemistry, &config.transport).unwrap();
    let zone = ZoneRestart::from_named(
        &tables,
        &[("A", 1e-3), ("B", 2e-3), ("M", 0.1)],
        &[("M", 1.0)],
    )
    .unwrap();
    let mesh = Mesh::new(vec![Element::new(500.0, SoilProps::new(2.0, 0.4, 0.05))], vec![]);
    let ws = ElementWaterState {
        unsat: 0.3,
        gw: 1.0,
        ..Default::default()
    };
    RtDriverBuilder::new(config)
        .mesh(mesh)
        .water_states(vec![ws], vec![])
        .restarts(vec![ElementRestart::uniform(zone)])
        .build()
        .unwrap()
}

// ============================================================================
// 测试
// ============================================================================

#[test]
fn test_equilibrium_zone_is_idempotent() {
    let tables = ChemTables::from_config(&chemistry()).unwrap();
    let solver = ReactionSolver::new(&ReactionConfig::default());
    let mut chms = equilibrium_state(&tables);
    let before = chms.clone();

    let outcome = solver.react_zone(&tables, &mut chms, 1.0, 3600.0);
    match outcome {
        ReactionOutcome::Converged { iterations } => assert!(iterations <= 2),
        other => panic!("unexpected outcome {:?}", other),
    }
    for k in 0..2 {
        assert!(rel_eq(chms.t_conc[k], before.t_conc[k], 1e-9));
        assert!(rel_eq(chms.p_conc[k], before.p_conc[k], 1e-9));
    }
}

#[test]
fn test_substep_floor_terminates() {
    let tables = ChemTables::from_config(&chemistry()).unwrap();
    let cfg = ReactionConfig {
        max_iterations: 0,
        min_substep: 100.0,
        ..Default::default()
    };
    let solver = ReactionSolver::new(&cfg);
    let mut chms = equilibrium_state(&tables);
    chms.t_conc[0] = 4e-3;
    let before = chms.clone();

    match solver.react_zone(&tables, &mut chms, 1.0, 3600.0) {
        ReactionOutcome::Failed { substep } => {
            assert!(substep < 100.0);
            assert!(substep >= 50.0);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(chms, before);
}

#[test]
fn test_reaction_cadence() {
    let mut driver = single_element_driver(0.0);
    let reports = driver.run_until(7200.0).unwrap();
    assert_eq!(reports.len(), 12);
    let reacted: Vec<usize> = reports
        .iter()
        .enumerate()
        .filter(|(_, r)| r.reaction.is_some())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(reacted, vec![0, 6]);

    let summary = reports[0].reaction.unwrap();
    assert_eq!(summary.converged + summary.substepped + summary.dry + summary.failed, 2);
}

#[test]
fn test_reaction_delay() {
    let mut driver = single_element_driver(1800.0);
    let reports = driver.run_until(3600.0).unwrap();
    let first = reports.iter().position(|r| r.reaction.is_some());
    assert_eq!(first, Some(3));
}

#[test]
fn test_dissolution_through_driver() {
    let mut driver = single_element_driver(0.0);
    let a = driver.model().tables().find("A").unwrap();
    let m = driver.model().tables().find("M").unwrap();
    let a0 = driver.model().chem().elements[0].gw.t_conc[a];
    let m0 = driver.model().chem().elements[0].gw.t_conc[m];

    let report = driver.advance(600.0).unwrap();
    assert_eq!(report.reaction.map(|s| s.failed), Some(0));

    let gw = &driver.model().chem().elements[0].gw;
    assert!(gw.t_conc[a] > a0);
    assert!(gw.t_conc[m] < m0);
    assert!(gw.react_flux[a] > 0.0);
}
