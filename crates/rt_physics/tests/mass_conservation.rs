// crates/rt_physics/tests/mass_conservation.rs

//! 无反应时的溶质质量守恒
//!
//! 三单元、两河段的小流域，出口下游通量为 0、降水浓度为 0。
//! 流域内部的对流/扩散/弥散交换只在控制体之间搬运摩尔数，
//! 各物种总摩尔数在多次推进后保持不变。打开降水、出口与基岩边界后，
//! 总摩尔数变化率等于边界净输入。

use rt_config::{Capabilities, PrimarySpeciesConfig, RtConfig};
use rt_physics::engine::OdeRhs;
use rt_physics::{
    BedrockBoundary, ElementRestart, ElementWaterFlux, ElementWaterState, Mesh,
    PrcpConcForcing, RiverFlux, RiverWaterFlux, RiverWaterState, RtDriver, RtDriverBuilder,
    SspRk2, StaticHydrology, ZoneRestart,
};
use rt_physics::mesh::{BankSide, Element, River, RiverMaterial, SoilProps};

// ============================================================================
// 测试辅助函数
// ============================================================================

/// e0 - e1 - e2 相邻；e2 为河段 r0 左岸，e0 为出口河段 r1 右岸
fn catchment() -> Mesh {
    let soil = SoilProps::new(2.0, 0.4, 0.05);
    let geol = SoilProps::new(5.0, 0.2, 0.02);
    let matl = RiverMaterial::new(1.0, 0.3, 0.05);
    Mesh::new(
        vec![
            Element::new(1000.0, soil)
                .with_geol(geol)
                .with_neighbor(0, 1, 20.0, 30.0)
                .with_bank(1, 1, 15.0, 30.0),
            Element::new(1000.0, soil)
                .with_geol(geol)
                .with_neighbor(0, 0, 20.0, 30.0)
                .with_neighbor(1, 2, 20.0, 30.0),
            Element::new(1000.0, soil)
                .with_geol(geol)
                .with_neighbor(0, 1, 20.0, 30.0)
                .with_bank(1, 0, 15.0, 30.0),
        ],
        vec![
            River::new(200.0, 4.0, matl)
                .with_down(1, 50.0)
                .with_banks(Some(2), None),
            River::new(200.0, 4.0, matl).with_banks(None, Some(0)),
        ],
    )
}

/// 互反的固定通量，出口下游通量为 0
fn closed_hydrology() -> StaticHydrology {
    let mut h = StaticHydrology::new(3, 2);
    let e = &mut h.elem_wf;
    for wf in e.iter_mut() {
        *wf = ElementWaterFlux {
            infil: 1e-8,
            rechg: 1e-8,
            fbr_infil: 1e-9,
            fbr_rechg: 1e-9,
            ..Default::default()
        };
    }
    e[0].subsurf[0] = 2e-4;
    e[1].subsurf[0] = -2e-4;
    e[1].subsurf[1] = 1e-4;
    e[2].subsurf[0] = -1e-4;
    e[0].fbrflow[0] = 1e-5;
    e[1].fbrflow[0] = -1e-5;

    // 河岸：单元河岸边通量 = −(A2C + A2A)
    e[2].subsurf[1] = 5e-5;
    e[0].subsurf[1] = 2e-5;

    let r = &mut h.river_wf;
    r[0] = RiverWaterFlux::default();
    r[0].set(RiverFlux::DownChanl2Chanl, 1e-3);
    r[0].set(RiverFlux::DownAquif2Aquif, 1e-6);
    r[0].set(RiverFlux::aquif2chanl(BankSide::Left), -1e-5);
    r[0].set(RiverFlux::aquif2aquif(BankSide::Left), -4e-5);
    r[0].set(RiverFlux::ChanlLkg, 1e-5);
    r[1].set(RiverFlux::aquif2chanl(BankSide::Right), -2e-5);
    r[1].set(RiverFlux::ChanlLkg, 1e-5);
    h
}

fn water_states() -> (Vec<ElementWaterState>, Vec<RiverWaterState>) {
    let elem = ElementWaterState {
        surf: 0.01,
        unsat: 0.3,
        gw: 1.0,
        fbr_unsat: 1.0,
        fbr_gw: 2.0,
    };
    let river = RiverWaterState { stage: 0.5, gw: 0.8 };
    (vec![elem; 3], vec![river; 2])
}

fn tracer_config(bedrock: bool) -> RtConfig {
    let mut config = RtConfig::default();
    config.capabilities = Capabilities {
        transport: true,
        reaction: false,
        bedrock,
        nitrogen: false,
    };
    config.time.stepsize = 600.0;
    config.chemistry.primary = vec![
        PrimarySpeciesConfig::aqueous("Cl-", -1.0),
        PrimarySpeciesConfig::aqueous("Na+", 1.0),
    ];
    config
}

fn restarts() -> Vec<ElementRestart> {
    [(1e-3, 2e-4), (5e-4, 5e-4), (1e-4, 8e-4)]
        .into_iter()
        .map(|(cl, na)| ElementRestart::uniform(ZoneRestart::new(vec![cl, na], vec![0.0, 0.0])))
        .collect()
}

fn build_driver(bedrock: bool) -> RtDriver {
    let (elem_ws, river_ws) = water_states();
    RtDriverBuilder::new(tracer_config(bedrock))
        .mesh(catchment())
        .hydrology(closed_hydrology())
        .water_states(elem_ws, river_ws)
        .restarts(restarts())
        .build()
        .unwrap()
}

const PRCP_CONC: [f64; 2] = [1e-3, 2e-3];

/// 出口流出，e0 基岩边界流出，e2 基岩边界按给定浓度流入
fn open_boundaries() -> (Mesh, StaticHydrology) {
    let mut mesh = catchment();
    mesh.elements[0].fbr_bc[2] = BedrockBoundary::Flux { conc: vec![0.0, 0.0] };
    mesh.elements[2].fbr_bc[2] = BedrockBoundary::Flux { conc: vec![5e-4, 1e-4] };

    let mut hydrology = closed_hydrology();
    hydrology.river_wf[1].set(RiverFlux::DownChanl2Chanl, 1e-3);
    hydrology.elem_wf[0].fbrflow[2] = 1e-6;
    hydrology.elem_wf[2].fbrflow[2] = -2e-6;
    (mesh, hydrology)
}

/// 推进一步后返回各物种的 (Σdy, 边界净输入)
fn boundary_balance(bedrock: bool) -> Vec<(f64, f64)> {
    let (mesh, hydrology) = open_boundaries();
    let (elem_ws, river_ws) = water_states();
    let mut driver = RtDriverBuilder::new(tracer_config(bedrock))
        .mesh(mesh)
        .hydrology(hydrology)
        .water_states(elem_ws, river_ws)
        .restarts(restarts())
        .prcp_conc(PrcpConcForcing::Constant(PRCP_CONC.to_vec()))
        .build()
        .unwrap();
    driver.advance(600.0).unwrap();

    let y = driver.state_vector().to_vec();
    let model = driver.model_mut();
    let mut dy = vec![0.0; y.len()];
    model.rhs(600.0, &y, &mut dy).unwrap();

    let flux = model.flux();
    (0..model.layout().num_species())
        .map(|k| {
            let infil: f64 = flux.elements.iter().map(|f| f.infil[k]).sum();
            assert!((infil - 3.0 * 1e-8 * 1000.0 * PRCP_CONC[k]).abs() <= 1e-12 * infil);

            let fbr_boundary: f64 = flux
                .elements
                .iter()
                .filter_map(|f| f.bedrock.as_ref())
                .map(|b| b.gw_flux[2][k])
                .sum();
            let outlet = flux.rivers[1].get(RiverFlux::DownChanl2Chanl)[k];
            assert!(outlet > 0.0);
            (model.total_moles(&dy, k), infil - outlet - fbr_boundary)
        })
        .collect()
}

fn assert_balanced(balance: &[(f64, f64)]) {
    for (k, (sum_dy, net)) in balance.iter().enumerate() {
        let scale = net.abs().max(sum_dy.abs());
        assert!(scale > 0.0);
        assert!(
            (sum_dy - net).abs() <= 1e-9 * scale,
            "物种 {}: Σdy = {:e}, 边界净输入 = {:e}",
            k,
            sum_dy,
            net
        );
    }
}

fn totals(driver: &RtDriver) -> Vec<f64> {
    let model = driver.model();
    (0..model.layout().num_species())
        .map(|k| model.total_moles(driver.state_vector(), k))
        .collect()
}

fn assert_conserved(before: &[f64], after: &[f64]) {
    for (k, (b, a)) in before.iter().zip(after).enumerate() {
        assert!(*b > 0.0);
        let rel = (a - b).abs() / b;
        assert!(rel < 1e-9, "物种 {} 总摩尔数相对变化 {:e}", k, rel);
    }
}

// ============================================================================
// 测试
// ============================================================================

#[test]
fn test_soil_only_conserves_moles() {
    let mut driver = build_driver(false);
    let before = totals(&driver);
    let reports = driver.run_until(7200.0).unwrap();
    assert_eq!(reports.len(), 12);
    assert!(reports.iter().all(|r| r.reaction.is_none()));
    assert_conserved(&before, &totals(&driver));
}

#[test]
fn test_bedrock_conserves_moles() {
    let mut driver = build_driver(true);
    let before = totals(&driver);
    driver.run_until(7200.0).unwrap();
    assert_conserved(&before, &totals(&driver));
}

#[test]
fn test_exchange_moves_mass() {
    let mut driver = build_driver(false);
    let y0 = driver.state_vector().to_vec();
    driver.advance(3600.0).unwrap();
    let changed = y0
        .iter()
        .zip(driver.state_vector())
        .filter(|(a, b)| a != b)
        .count();
    assert!(changed > 0);
}

#[test]
fn test_ssp_rk2_conserves_moles() {
    let (elem_ws, river_ws) = water_states();
    let mut driver = RtDriverBuilder::new(tracer_config(false))
        .mesh(catchment())
        .hydrology(closed_hydrology())
        .water_states(elem_ws, river_ws)
        .restarts(restarts())
        .integrator(SspRk2::new(120.0))
        .build()
        .unwrap();
    assert_eq!(driver.integrator_name(), "SSP-RK2");
    let before = totals(&driver);
    driver.run_until(3600.0).unwrap();
    assert_conserved(&before, &totals(&driver));
}

#[test]
fn test_outlet_export_reduces_moles() {
    let (elem_ws, river_ws) = water_states();
    let mut hydrology = closed_hydrology();
    hydrology.river_wf[1].set(RiverFlux::DownChanl2Chanl, 1e-3);
    let mut driver = RtDriverBuilder::new(tracer_config(false))
        .mesh(catchment())
        .hydrology(hydrology)
        .water_states(elem_ws, river_ws)
        .restarts(restarts())
        .build()
        .unwrap();
    let before = totals(&driver);
    driver.run_until(3600.0).unwrap();
    let after = totals(&driver);
    for (b, a) in before.iter().zip(&after) {
        assert!(a < b);
    }
}

#[test]
fn test_soil_only_boundary_balance() {
    assert_balanced(&boundary_balance(false));
}

#[test]
fn test_bedrock_boundary_balance() {
    assert_balanced(&boundary_balance(true));
}
