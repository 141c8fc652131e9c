// crates/rt_physics/tests/ode_tests.rs

//! ODE 组装与驱动器测试
//!
//! - 状态布局随能力开关变化
//! - 解包时负值截断
//! - NaN 哨兵报告控制体与物理量
//! - 氮输入、日统计边界与推进报告序列化

use rt_config::{Capabilities, PrimarySpeciesConfig, RtConfig};
use rt_foundation::{NonFiniteSource, RtError, RtResult};
use rt_physics::engine::OdeRhs;
use rt_physics::mesh::{Element, SoilProps};
use rt_physics::{
    ElementRestart, ElementWaterState, HydroState, Hydrology, LandSurfaceSample, Mesh,
    NitrogenField, RtDriver, RtDriverBuilder, StateLayout, StaticHydrology, ZoneRestart,
};

// ============================================================================
// 测试辅助函数
// ============================================================================

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn pair_mesh() -> Mesh {
    let soil = SoilProps::new(2.0, 0.4, 0.05);
    Mesh::new(
        vec![
            Element::new(400.0, soil).with_neighbor(0, 1, 10.0, 20.0),
            Element::new(400.0, soil).with_neighbor(0, 0, 10.0, 20.0),
        ],
        vec![],
    )
}

fn config(caps: Capabilities) -> RtConfig {
    let mut config = RtConfig::default();
    config.capabilities = caps;
    config.chemistry.primary = vec![PrimarySpeciesConfig::aqueous("NO3-", -1.0)];
    config
}

fn tracer_caps() -> Capabilities {
    Capabilities {
        transport: true,
        reaction: false,
        bedrock: false,
        nitrogen: false,
    }
}

fn wet_states() -> Vec<ElementWaterState> {
    vec![
        ElementWaterState {
            unsat: 0.3,
            gw: 1.0,
            ..Default::default()
        };
        2
    ]
}

fn restarts() -> Vec<ElementRestart> {
    vec![ElementRestart::uniform(ZoneRestart::new(vec![1e-4], vec![0.0])); 2]
}

fn driver_with(caps: Capabilities, hydrology: impl Hydrology + 'static) -> RtDriver {
    RtDriverBuilder::new(config(caps))
        .mesh(pair_mesh())
        .hydrology(hydrology)
        .water_states(wet_states(), vec![])
        .restarts(restarts())
        .build()
        .unwrap()
}

/// 在第二个单元写入 NaN 入渗
struct NanHydrology;

impl Hydrology for NanHydrology {
    fn update_fluxes(&mut self, _t: f64, _mesh: &Mesh, hydro: &mut HydroState) -> RtResult<()> {
        for wf in &mut hydro.elem_wf {
            *wf = Default::default();
        }
        hydro.elem_wf[1].infil = f64::NAN;
        Ok(())
    }
}

// ============================================================================
// 测试
// ============================================================================

#[test]
fn test_layout_follows_capabilities() {
    let water_only = StateLayout::new(
        3,
        2,
        2,
        &Capabilities {
            transport: false,
            ..tracer_caps()
        },
    );
    assert_eq!(water_only.len(), 3 * 3 + 2 * 2);

    let full = StateLayout::new(
        3,
        2,
        2,
        &Capabilities {
            transport: true,
            reaction: true,
            bedrock: true,
            nitrogen: true,
        },
    );
    // 单元: 3 水量 + 2 基岩 + 1 氮 + 4 区 × 2 物种
    assert_eq!(full.elem_stride(), 14);
    // 河段: 2 水量 + 1 氮 + 2 区 × 2 物种
    assert_eq!(full.river_stride(), 7);
    assert_eq!(full.len(), 3 * 14 + 2 * 7);
    assert_eq!(full.river_offset(), 42);
}

#[test]
fn test_unpack_clamps_negative_values() {
    let mut driver = driver_with(tracer_caps(), StaticHydrology::new(2, 0));
    let mut y = driver.state_vector().to_vec();
    let layout = driver.model().layout().clone();
    y[layout.elem(0, layout.elem_slots().gw)] = -0.5;

    let model = driver.model_mut();
    let mut dy = vec![0.0; y.len()];
    model.rhs(0.0, &y, &mut dy).unwrap();
    assert_eq!(model.hydro().elem_ws[0].gw, 0.0);
    assert_eq!(model.hydro().elem_ws[1].gw, 1.0);
    assert!(dy.iter().all(|v| v.is_finite()));
}

#[test]
fn test_nan_sentinel_reports_element_and_quantity() {
    let mut driver = driver_with(tracer_caps(), NanHydrology);
    let err = driver.advance(60.0).unwrap_err();
    match err {
        RtError::NonFiniteDerivative {
            source_kind,
            index,
            ref quantity,
            time,
        } => {
            assert_eq!(source_kind, NonFiniteSource::Element);
            assert_eq!(index, 2);
            assert_eq!(quantity, "surf");
            assert_eq!(time, 0.0);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_nitrogen_deposition() {
    let caps = Capabilities {
        nitrogen: true,
        ..tracer_caps()
    };
    let mut cfg = config(caps);
    cfg.nitrogen.ndep = 3.65;
    cfg.time.stepsize = 600.0;
    let mut field = NitrogenField::new(2, 0);
    field.sminn = vec![0.5, 0.5];

    let mut driver = RtDriverBuilder::new(cfg)
        .mesh(pair_mesh())
        .water_states(wet_states(), vec![])
        .restarts(restarts())
        .nitrogen_field(field)
        .build()
        .unwrap();
    driver.advance(8640.0).unwrap();

    // 3.65 / 365 d 即每天 0.01，0.1 d 后增加 1e-3
    let nitrogen = driver.model().nitrogen().unwrap();
    for s in &nitrogen.field.sminn {
        assert!(approx_eq(*s, 0.501, 1e-12));
    }
}

#[test]
fn test_daily_boundary_resets_accumulators() {
    let mut hydrology = StaticHydrology::new(2, 0);
    hydrology.samples = vec![
        LandSurfaceSample {
            sfctmp: 290.0,
            sfcspd: 2.0,
            ..Default::default()
        };
        2
    ];
    let mut driver = driver_with(tracer_caps(), hydrology);

    let mut daily = Vec::new();
    for step in 1..=4 {
        let report = driver.advance(step as f64 * 21_600.0).unwrap();
        daily.push(report.daily);
    }
    assert!(daily[..3].iter().all(Option::is_none));
    let averages = daily[3].as_ref().unwrap();
    assert_eq!(averages.len(), 2);
    assert!(approx_eq(averages[0].avg_sfctmp, 290.0, 1e-12));
    assert!(approx_eq(averages[1].avg_sfcspd, 2.0, 1e-12));
    assert_eq!(driver.daily()[0].count(), 0);
}

#[test]
fn test_step_across_midnight_counts_toward_finished_day() {
    let mut hydrology = StaticHydrology::new(2, 0);
    hydrology.samples = vec![
        LandSurfaceSample {
            sfctmp: 285.0,
            soldn: 300.0,
            ..Default::default()
        };
        2
    ];
    let mut driver = driver_with(tracer_caps(), hydrology);

    assert!(driver.advance(64_800.0).unwrap().daily.is_none());
    let report = driver.advance(108_000.0).unwrap();
    let averages = report.daily.unwrap();
    assert!(approx_eq(averages[0].daylength, 108_000.0, 1e-9));
    assert!(approx_eq(averages[0].solar_total, 300.0 * 108_000.0, 1e-3));
    assert_eq!(driver.daily()[0].count(), 0);

    assert!(driver.advance(172_800.0).unwrap().daily.is_some());
}

#[test]
fn test_advance_rejects_past_time() {
    let mut driver = driver_with(tracer_caps(), StaticHydrology::new(2, 0));
    driver.advance(600.0).unwrap();
    assert!(driver.advance(600.0).is_err());
    assert!(approx_eq(driver.time(), 600.0, 0.0));
}

#[test]
fn test_step_report_serializes() {
    let mut driver = driver_with(tracer_caps(), StaticHydrology::new(2, 0));
    let report = driver.advance(600.0).unwrap();
    assert_eq!(report.stats.steps, 10);
    let json = report.to_json().unwrap();
    assert!(json.contains("\"time\":600.0"));
    assert!(json.contains("\"rhs_evals\":10"));
}

#[test]
fn test_builder_requires_mesh() {
    let err = RtDriverBuilder::new(config(tracer_caps()))
        .restarts(restarts())
        .build()
        .unwrap_err();
    assert!(err.is_config_error());
}
