// crates/rt_physics/src/reaction/mod.rs

//! 化学反应求解
//!
//! 反应与输运按算子分裂交替推进：每个反应间隔内，各单元的非饱和区、
//! 地下水区（以及基岩两区）独立求解一次反应步。
//!
//! # 区状态
//!
//! ```text
//! 干燥 ──────────────────────────────> Dry
//! 求解 ─成功─> Converged
//!      ─失败─> 缩步重试 ─成功─> 完成剩余子步 ─> Substepped
//!                      ─子步低于下限─> Failed（告警，状态保持最后接受值）
//! ```
//!
//! 矿物总浓度在同一单元的上下两区之间按水量加权平均，保证固相质量守恒。

mod activity;
mod newton;
mod rates;
mod speciation;

pub use activity::{activity_coefficients, ionic_strength};
pub use newton::{react_step, NewtonFailure};
pub use rates::{kinetic_rate, reactive_area, species_rates};
pub use speciation::speciate_step;

use crate::chemistry::{ChemTables, SpeciesKind};
use crate::hydrology::{gw_storage, unsat_saturation, unsat_storage, ElementWaterState, HydroState};
use crate::mesh::{Element, Mesh, SoilProps};
use crate::state::{ChemField, ChemState, ElementChem};
use rayon::prelude::*;
use serde::Serialize;
use rt_config::ReactionConfig;
use rt_foundation::{RtError, RtResult};

// ============================================================================
// 结果类型
// ============================================================================

/// 单区反应结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReactionOutcome {
    /// 饱和度或地下水位过低，未反应
    Dry,
    /// 整步收敛
    Converged {
        /// Newton 迭代次数
        iterations: usize,
    },
    /// 缩步后完成
    Substepped {
        /// 子步长 [s]
        substep: f64,
        /// 子步数
        count: usize,
    },
    /// 子步低于下限仍未收敛
    Failed {
        /// 放弃时的子步长 [s]
        substep: f64,
    },
}

/// 反应结果计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReactionSummary {
    /// 干区
    pub dry: usize,
    /// 整步收敛
    pub converged: usize,
    /// 缩步完成
    pub substepped: usize,
    /// 失败
    pub failed: usize,
}

impl ReactionSummary {
    /// 计入一个区的结果
    pub fn record(&mut self, outcome: ReactionOutcome) {
        match outcome {
            ReactionOutcome::Dry => self.dry += 1,
            ReactionOutcome::Converged { .. } => self.converged += 1,
            ReactionOutcome::Substepped { .. } => self.substepped += 1,
            ReactionOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// 合并
    pub fn merge(self, other: Self) -> Self {
        Self {
            dry: self.dry + other.dry,
            converged: self.converged + other.converged,
            substepped: self.substepped + other.substepped,
            failed: self.failed + other.failed,
        }
    }
}

/// 单元反应结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementReaction {
    /// 非饱和区
    pub unsat: ReactionOutcome,
    /// 地下水区
    pub gw: ReactionOutcome,
    /// 基岩（非饱和区, 地下水区）
    pub bedrock: Option<(ReactionOutcome, ReactionOutcome)>,
}

impl ElementReaction {
    fn summary(&self) -> ReactionSummary {
        let mut s = ReactionSummary::default();
        s.record(self.unsat);
        s.record(self.gw);
        if let Some((u, g)) = self.bedrock {
            s.record(u);
            s.record(g);
        }
        s
    }
}

// ============================================================================
// 求解器
// ============================================================================

/// 反应求解器
#[derive(Debug, Clone, Default)]
pub struct ReactionSolver {
    config: ReactionConfig,
}

impl ReactionSolver {
    /// 创建求解器
    pub fn new(config: &ReactionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// 求解器参数
    pub fn config(&self) -> &ReactionConfig {
        &self.config
    }

    /// 单区反应，整步失败时逐次减半步长
    pub fn react_zone(
        &self,
        tables: &ChemTables,
        chms: &mut ChemState,
        saturation: f64,
        dt: f64,
    ) -> ReactionOutcome {
        if saturation < self.config.min_saturation {
            return ReactionOutcome::Dry;
        }

        let err = match react_step(tables, &self.config, chms, saturation, dt) {
            Ok(iterations) => return ReactionOutcome::Converged { iterations },
            Err(e) => e,
        };
        log::debug!("反应步失败 ({}), 缩步重试", err);

        let mut substep = 0.5 * dt;
        let mut count = 2;
        while let Err(e) = react_step(tables, &self.config, chms, saturation, substep) {
            substep *= 0.5;
            count *= 2;
            if substep < self.config.min_substep {
                log::warn!("反应在子步 {:.3} s 仍未收敛 ({}), 放弃本步", substep, e);
                return ReactionOutcome::Failed { substep };
            }
        }

        for _ in 1..count {
            if let Err(e) = react_step(tables, &self.config, chms, saturation, substep) {
                log::warn!("子步 {:.3} s 反应失败 ({}), 放弃剩余子步", substep, e);
                return ReactionOutcome::Failed { substep };
            }
        }
        log::debug!("反应以子步 {:.3} s (1/{}) 完成", substep, count);
        ReactionOutcome::Substepped { substep, count }
    }

    /// 一对上下区反应并平均矿物
    #[allow(clippy::too_many_arguments)]
    fn react_pair(
        &self,
        tables: &ChemTables,
        props: &SoilProps,
        gw: f64,
        unsat: f64,
        area: f64,
        upper: &mut ChemState,
        lower: &mut ChemState,
        dt: f64,
    ) -> (ReactionOutcome, ReactionOutcome) {
        let vol_unsat = unsat_storage(props.depth, props.smcmax, props.smcmin, gw, unsat) * area;
        let vol_gw = gw_storage(props.depth, props.smcmax, props.smcmin, gw) * area;
        let saturation = unsat_saturation(props.depth, unsat, gw);

        let c0_upper = upper.t_conc.clone();
        let c0_lower = lower.t_conc.clone();
        let outcome = if gw > self.config.min_groundwater {
            (
                self.react_zone(tables, upper, saturation, dt),
                self.react_zone(tables, lower, 1.0, dt),
            )
        } else {
            (ReactionOutcome::Dry, ReactionOutcome::Dry)
        };
        finish_zone(tables, upper, &c0_upper, vol_unsat, dt);
        finish_zone(tables, lower, &c0_lower, vol_gw, dt);
        average_minerals(tables, upper, vol_unsat, lower, vol_gw);
        outcome
    }

    /// 单元反应（非饱和区、地下水区与基岩两区）
    pub fn react_element(
        &self,
        tables: &ChemTables,
        elem: &Element,
        ws: &ElementWaterState,
        ec: &mut ElementChem,
        dt: f64,
    ) -> ElementReaction {
        let area = elem.topo.area;
        let (unsat, gw) = self.react_pair(
            tables,
            &elem.soil,
            ws.gw,
            ws.unsat,
            area,
            &mut ec.unsat,
            &mut ec.gw,
            dt,
        );
        let bedrock = ec.bedrock.as_mut().map(|fbr| {
            self.react_pair(
                tables,
                &elem.geol,
                ws.fbr_gw,
                ws.fbr_unsat,
                area,
                &mut fbr.unsat,
                &mut fbr.gw,
                dt,
            )
        });
        ElementReaction { unsat, gw, bedrock }
    }

    /// 全部单元并行反应
    pub fn react_all(
        &self,
        tables: &ChemTables,
        mesh: &Mesh,
        hydro: &HydroState,
        chem: &mut ChemField,
        dt: f64,
    ) -> RtResult<ReactionSummary> {
        RtError::check_size("chem.elements", mesh.num_elements(), chem.elements.len())?;
        RtError::check_size("elem_ws", mesh.num_elements(), hydro.elem_ws.len())?;

        let summary = chem
            .elements
            .par_iter_mut()
            .zip(mesh.elements.par_iter())
            .zip(hydro.elem_ws.par_iter())
            .map(|((ec, elem), ws)| self.react_element(tables, elem, ws, ec, dt).summary())
            .reduce(ReactionSummary::default, ReactionSummary::merge);

        log::debug!(
            "反应完成: 收敛 {}, 缩步 {}, 失败 {}, 干区 {}",
            summary.converged,
            summary.substepped,
            summary.failed,
            summary.dry
        );
        Ok(summary)
    }

    /// 单区平衡形态计算，失败时告警并保持原状态
    pub fn speciate(&self, tables: &ChemTables, chms: &mut ChemState, fix_proton: bool) -> bool {
        match speciate_step(tables, &self.config, chms, fix_proton) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("形态计算未收敛 ({}), 保持原状态", e);
                false
            }
        }
    }

    /// 全部河道形态计算
    pub fn speciate_rivers(&self, tables: &ChemTables, chem: &mut ChemField) -> usize {
        chem.rivers
            .par_iter_mut()
            .map(|rc| self.speciate(tables, &mut rc.stream, false))
            .filter(|converged| !converged)
            .count()
    }
}

/// 反应通量诊断并按反应量修正水相摩尔数
fn finish_zone(tables: &ChemTables, chms: &mut ChemState, c0: &[f64], vol: f64, dt: f64) {
    for k in 0..tables.num_primary() {
        let dc = chms.t_conc[k] - c0[k];
        chms.react_flux[k] = dc * vol / dt;
        if tables.species(k).kind == SpeciesKind::Aqueous {
            chms.t_mole[k] = (chms.t_mole[k] + dc * vol).max(0.0);
        }
    }
}

/// 矿物总浓度按水量加权平均，两区写入同一值
fn average_minerals(
    tables: &ChemTables,
    upper: &mut ChemState,
    vol_upper: f64,
    lower: &mut ChemState,
    vol_lower: f64,
) {
    let vol = vol_upper + vol_lower;
    if !(vol > 0.0) {
        return;
    }
    for k in tables.first_mineral()..tables.num_primary() {
        let avg = (lower.t_conc[k] * vol_lower + upper.t_conc[k] * vol_upper) / vol;
        lower.t_conc[k] = avg;
        upper.t_conc[k] = avg;
        lower.p_conc[k] = avg;
        upper.p_conc[k] = avg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rt_config::{
        ChemistryConfig, KineticConfig, MineralConfig, PrimarySpeciesConfig, RateLawConfig,
        SecondarySpeciesConfig, SpeciesKindConfig, StoichTerm,
    };

    fn rel_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * a.abs().max(b.abs())
    }

    /// A + B ⇌ C，log K = −1（解离方向）
    fn pair_config() -> ChemistryConfig {
        ChemistryConfig {
            primary: vec![
                PrimarySpeciesConfig::aqueous("A", 0.0),
                PrimarySpeciesConfig::aqueous("B", 0.0),
            ],
            secondary: vec![SecondarySpeciesConfig {
                name: "C".into(),
                kind: SpeciesKindConfig::Aqueous,
                charge: 0.0,
                size_factor: 0.0,
                stoichiometry: vec![StoichTerm::new("A", 1.0), StoichTerm::new("B", 1.0)],
                log_k: vec![-1.0],
            }],
            ..Default::default()
        }
    }

    fn equilibrium_state(tables: &ChemTables) -> ChemState {
        let mut chms = ChemState::new(tables);
        for (k, p) in [1e-3, 2e-3].into_iter().enumerate() {
            chms.p_conc[k] = p;
            chms.p_actv[k] = p;
            chms.t_conc[k] = p + 2e-5;
        }
        chms.s_conc[0] = 2e-5;
        chms
    }

    /// M → A，log K = −2
    fn dissolution_config() -> ChemistryConfig {
        let mut cfg = pair_config();
        cfg.primary.push(PrimarySpeciesConfig::mineral("M", 100.0, 30.0));
        cfg.minerals.push(MineralConfig {
            name: "M".into(),
            stoichiometry: vec![StoichTerm::new("A", 1.0)],
            log_k: vec![-2.0],
        });
        cfg.kinetics.push(KineticConfig {
            mineral: "M".into(),
            label: "M_dissolution".into(),
            rate_law: RateLawConfig::Tst,
            log_rate: -9.0,
            activation_energy: 0.0,
            dependence: vec![],
            monod: vec![],
            inhibition: vec![],
            biomass: None,
        });
        cfg
    }

    #[test]
    fn test_equilibrium_is_idempotent() {
        let tables = ChemTables::from_config(&pair_config()).unwrap();
        let cfg = ReactionConfig::default();
        let mut chms = equilibrium_state(&tables);
        let before = chms.clone();

        let iterations = react_step(&tables, &cfg, &mut chms, 1.0, 3600.0).unwrap();
        assert!(iterations <= 2);
        for k in 0..2 {
            assert!(rel_eq(chms.t_conc[k], before.t_conc[k], 1e-9));
            assert!(rel_eq(chms.p_conc[k], before.p_conc[k], 1e-9));
        }
        assert!(rel_eq(chms.s_conc[0], 2e-5, 1e-9));
    }

    #[test]
    fn test_dry_zone_is_untouched() {
        let tables = ChemTables::from_config(&pair_config()).unwrap();
        let solver = ReactionSolver::new(&ReactionConfig::default());
        let mut chms = equilibrium_state(&tables);
        let before = chms.clone();
        let outcome = solver.react_zone(&tables, &mut chms, 1e-3, 3600.0);
        assert_eq!(outcome, ReactionOutcome::Dry);
        assert_eq!(chms, before);
    }

    #[test]
    fn test_substep_floor_terminates() {
        let tables = ChemTables::from_config(&pair_config()).unwrap();
        let cfg = ReactionConfig {
            max_iterations: 0,
            ..Default::default()
        };
        let solver = ReactionSolver::new(&cfg);
        let mut chms = equilibrium_state(&tables);
        chms.t_conc[0] = 5e-3;
        let before = chms.clone();

        let outcome = solver.react_zone(&tables, &mut chms, 1.0, 3600.0);
        match outcome {
            ReactionOutcome::Failed { substep } => assert!(substep < cfg.min_substep),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(chms, before);
    }

    #[test]
    fn test_mineral_dissolution_conserves_mass() {
        let tables = ChemTables::from_config(&dissolution_config()).unwrap();
        let cfg = ReactionConfig::default();
        let m = tables.find("M").unwrap();
        let a = tables.find("A").unwrap();

        let mut chms = equilibrium_state(&tables);
        chms.t_conc[m] = 1.0;
        chms.p_conc[m] = 1.0;
        chms.p_actv[m] = 1.0;
        chms.ssa[m] = 1.0;
        let before = chms.clone();

        react_step(&tables, &cfg, &mut chms, 1.0, 100.0).unwrap();
        let d_a = chms.t_conc[a] - before.t_conc[a];
        let d_m = chms.t_conc[m] - before.t_conc[m];
        assert!(d_a > 0.0);
        assert!(d_m < 0.0);
        assert!((d_a + d_m).abs() < 1e-9);
        assert_eq!(chms.p_actv[m], 1.0);
    }

    #[test]
    fn test_mineral_averaging_is_bit_identical() {
        let tables = ChemTables::from_config(&dissolution_config()).unwrap();
        let solver = ReactionSolver::new(&ReactionConfig::default());
        let m = tables.find("M").unwrap();

        let soil = SoilProps::new(2.0, 0.4, 0.05);
        let elem = Element::new(100.0, soil);
        let ws = ElementWaterState {
            unsat: 0.3,
            gw: 1.0,
            ..Default::default()
        };
        let mut unsat = equilibrium_state(&tables);
        let mut gw = equilibrium_state(&tables);
        unsat.t_conc[m] = 0.5;
        unsat.p_conc[m] = 0.5;
        gw.t_conc[m] = 2.0;
        gw.p_conc[m] = 2.0;
        let mut ec = ElementChem {
            unsat,
            gw,
            bedrock: None,
            prcp_conc: vec![0.0; 2],
        };

        let result = solver.react_element(&tables, &elem, &ws, &mut ec, 60.0);
        assert!(result.bedrock.is_none());
        assert_eq!(ec.unsat.t_conc[m].to_bits(), ec.gw.t_conc[m].to_bits());
        assert_eq!(ec.unsat.p_conc[m].to_bits(), ec.gw.p_conc[m].to_bits());
    }

    #[test]
    fn test_speciation_fixed_proton() {
        let cfg = ChemistryConfig {
            primary: vec![
                PrimarySpeciesConfig::aqueous("H+", 1.0).with_size_factor(9.0),
                PrimarySpeciesConfig::aqueous("HCO3-", -1.0).with_size_factor(4.0),
            ],
            secondary: vec![SecondarySpeciesConfig {
                name: "CO2(aq)".into(),
                kind: SpeciesKindConfig::Aqueous,
                charge: 0.0,
                size_factor: 0.0,
                stoichiometry: vec![StoichTerm::new("H+", 1.0), StoichTerm::new("HCO3-", 1.0)],
                log_k: vec![-6.34],
            }],
            ..Default::default()
        };
        let tables = ChemTables::from_config(&cfg).unwrap();
        let solver = ReactionSolver::new(&ReactionConfig::default());
        let h = tables.find("H+").unwrap();

        let mut chms = ChemState::new(&tables);
        chms.t_conc[h] = 1e-6;
        chms.p_conc[h] = 1e-6;
        chms.p_actv[h] = 1e-6;
        let c = tables.find("HCO3-").unwrap();
        chms.t_conc[c] = 2e-3;
        chms.p_conc[c] = 1e-3;
        chms.p_actv[c] = 1e-3;

        assert!(solver.speciate(&tables, &mut chms, true));
        assert!(rel_eq(chms.p_actv[h], 1e-6, 1e-6));
        let total_c = chms.p_conc[c] + chms.s_conc[0];
        assert!(rel_eq(total_c, 2e-3, 1e-6));
        // H+ 总量包含 CO2(aq) 中的质子
        assert!(chms.t_conc[h] > 1e-6);
    }

    #[test]
    fn test_summary_merge() {
        let mut a = ReactionSummary::default();
        a.record(ReactionOutcome::Dry);
        a.record(ReactionOutcome::Converged { iterations: 1 });
        let mut b = ReactionSummary::default();
        b.record(ReactionOutcome::Failed { substep: 10.0 });
        let m = a.merge(b);
        assert_eq!((m.dry, m.converged, m.substepped, m.failed), (1, 1, 0, 1));
    }
}
