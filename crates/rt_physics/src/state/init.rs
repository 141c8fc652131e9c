// crates/rt_physics/src/state/init.rs

//! 由重启值初始化化学状态
//!
//! 重启值按物种类别换算：
//!
//! | 类别 | 总浓度 | 游离浓度 | 活度 |
//! |------|--------|----------|------|
//! | H+ | 输入 | 输入 | 输入 |
//! | 矿物 | 体积分数 × 1000 / 摩尔体积 / smcmax | 同总浓度 | 1 |
//! | 吸附/阳离子交换 | 输入 × (1 − smcmax) × 2650 | 同总浓度 | 输入 / 2 |
//! | 其他水相 | 输入 | 输入 / 2 | 输入 / 2 |
//!
//! 次级物种从 `ZERO_CONC` 开始；启用反应时先做一次形态分布计算，
//! 之后再按体积计算摩尔数。

use rayon::prelude::*;
use rt_config::MineralVolumeMode;
use rt_foundation::constants::{DEPTHR, SOIL_PARTICLE_DENSITY, ZERO_CONC};
use rt_foundation::{RtError, RtResult};

use super::{BedrockChem, ChemField, ChemState, ElementChem, RiverChem};
use crate::chemistry::{ChemTables, SpeciesKind};
use crate::hydrology::{gw_storage, river_bed_storage, unsat_storage, HydroState};
use crate::mesh::Mesh;

/// 单区重启值（按化学表物种顺序）
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRestart {
    /// 总浓度或矿物体积分数
    pub total_conc: Vec<f64>,
    /// 比表面积
    pub ssa: Vec<f64>,
}

impl ZoneRestart {
    /// 由数组创建
    pub fn new(total_conc: Vec<f64>, ssa: Vec<f64>) -> Self {
        Self { total_conc, ssa }
    }

    /// 按物种名创建，未列出的物种取 `ZERO_CONC`，比表面积取 0
    pub fn from_named(
        tables: &ChemTables,
        conc: &[(&str, f64)],
        ssa: &[(&str, f64)],
    ) -> RtResult<Self> {
        let np = tables.num_primary();
        let mut total_conc = vec![ZERO_CONC; np];
        let mut ssa_out = vec![0.0; np];
        for (dst, list) in [(&mut total_conc, conc), (&mut ssa_out, ssa)] {
            for (name, value) in list {
                let k = tables
                    .find(name)
                    .filter(|&k| k < np)
                    .ok_or_else(|| RtError::species_not_found(*name, "restart"))?;
                dst[k] = *value;
            }
        }
        Ok(Self {
            total_conc,
            ssa: ssa_out,
        })
    }
}

/// 单元重启值，基岩区缺省时沿用土壤地下水区
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRestart {
    /// 非饱和区
    pub unsat: ZoneRestart,
    /// 地下水
    pub gw: ZoneRestart,
    /// 基岩非饱和区
    pub fbr_unsat: Option<ZoneRestart>,
    /// 基岩地下水
    pub fbr_gw: Option<ZoneRestart>,
}

impl ElementRestart {
    /// 所有区使用同一重启值
    pub fn uniform(zone: ZoneRestart) -> Self {
        Self {
            unsat: zone.clone(),
            gw: zone,
            fbr_unsat: None,
            fbr_gw: None,
        }
    }
}

impl ChemState {
    /// 由重启值换算浓度，不计算摩尔数
    pub fn from_restart(tables: &ChemTables, restart: &ZoneRestart, smcmax: f64) -> RtResult<Self> {
        let np = tables.num_primary();
        RtError::check_size("restart.total_conc", np, restart.total_conc.len())?;
        RtError::check_size("restart.ssa", np, restart.ssa.len())?;

        let mut chms = ChemState::new(tables);
        let proton = tables.proton();
        for k in 0..np {
            let input = restart.total_conc[k];
            let species = tables.species(k);
            chms.ssa[k] = restart.ssa[k];
            if Some(k) == proton {
                chms.t_conc[k] = input;
                chms.p_conc[k] = input;
                chms.p_actv[k] = input;
                continue;
            }
            match species.kind {
                SpeciesKind::Mineral => {
                    let conversion = match tables.mineral_volume_mode() {
                        MineralVolumeMode::Absolute => 1000.0 / species.molar_volume / smcmax,
                        MineralVolumeMode::Relative => {
                            (1.0 - smcmax) * 1000.0 / species.molar_volume / smcmax
                        }
                    };
                    chms.t_conc[k] = input * conversion;
                    chms.p_conc[k] = chms.t_conc[k];
                    chms.p_actv[k] = 1.0;
                }
                SpeciesKind::Adsorption | SpeciesKind::CationExchange => {
                    chms.p_actv[k] = input * 0.5;
                    chms.t_conc[k] = input * (1.0 - smcmax) * SOIL_PARTICLE_DENSITY;
                    chms.p_conc[k] = chms.t_conc[k];
                }
                SpeciesKind::Aqueous => {
                    chms.t_conc[k] = input;
                    chms.p_conc[k] = input * 0.5;
                    chms.p_actv[k] = input * 0.5;
                }
            }
        }
        Ok(chms)
    }
}

fn init_zone<F>(
    tables: &ChemTables,
    restart: &ZoneRestart,
    smcmax: f64,
    vol: f64,
    speciate: &F,
) -> RtResult<ChemState>
where
    F: Fn(&mut ChemState) + Sync,
{
    let mut chms = ChemState::from_restart(tables, restart, smcmax)?;
    speciate(&mut chms);
    chms.sync_moles(tables, vol);
    Ok(chms)
}

impl ChemField {
    /// 初始化全流域化学状态
    ///
    /// `speciate` 在换算浓度之后、计算摩尔数之前调用；不需要形态分布时
    /// 传入空闭包。河段各区的水相浓度取两岸单元地下水浓度的均值。
    pub fn initialize<F>(
        tables: &ChemTables,
        mesh: &Mesh,
        hydro: &HydroState,
        restarts: &[ElementRestart],
        bedrock: bool,
        speciate: F,
    ) -> RtResult<Self>
    where
        F: Fn(&mut ChemState) + Sync,
    {
        RtError::check_size("restarts", mesh.num_elements(), restarts.len())?;
        RtError::check_size("elem_ws", mesh.num_elements(), hydro.elem_ws.len())?;
        RtError::check_size("river_ws", mesh.num_rivers(), hydro.river_ws.len())?;

        let n_mobile = tables.num_aqueous();
        let elements = mesh
            .elements
            .par_iter()
            .zip(restarts.par_iter())
            .zip(hydro.elem_ws.par_iter())
            .map(|((elem, restart), ws)| -> RtResult<ElementChem> {
                let area = elem.topo.area;
                let soil = &elem.soil;
                let vol_gw = gw_storage(soil.depth, soil.smcmax, soil.smcmin, ws.gw).max(DEPTHR) * area;
                let vol_unsat = unsat_storage(soil.depth, soil.smcmax, soil.smcmin, ws.gw, ws.unsat)
                    .max(DEPTHR)
                    * area;
                let unsat = init_zone(tables, &restart.unsat, soil.smcmax, vol_unsat, &speciate)?;
                let gw = init_zone(tables, &restart.gw, soil.smcmax, vol_gw, &speciate)?;

                let bedrock = if bedrock {
                    let geol = &elem.geol;
                    let vol_fbr_gw =
                        gw_storage(geol.depth, geol.smcmax, geol.smcmin, ws.fbr_gw).max(DEPTHR) * area;
                    let vol_fbr_unsat =
                        unsat_storage(geol.depth, geol.smcmax, geol.smcmin, ws.fbr_gw, ws.fbr_unsat)
                            .max(DEPTHR)
                            * area;
                    let r_unsat = restart.fbr_unsat.as_ref().unwrap_or(&restart.gw);
                    let r_gw = restart.fbr_gw.as_ref().unwrap_or(&restart.gw);
                    Some(BedrockChem {
                        unsat: init_zone(tables, r_unsat, geol.smcmax, vol_fbr_unsat, &speciate)?,
                        gw: init_zone(tables, r_gw, geol.smcmax, vol_fbr_gw, &speciate)?,
                    })
                } else {
                    None
                };

                Ok(ElementChem {
                    unsat,
                    gw,
                    bedrock,
                    prcp_conc: vec![0.0; n_mobile],
                })
            })
            .collect::<RtResult<Vec<_>>>()?;

        let rivers = mesh
            .rivers
            .iter()
            .zip(&hydro.river_ws)
            .map(|(river, ws)| {
                let area = river.topo.area;
                let vol_stream = area * ws.stage.max(DEPTHR);
                let m = &river.matl;
                let vol_bed =
                    river_bed_storage(m.bed_thickness, m.porosity, m.smcmin, ws.gw).max(DEPTHR) * area;

                let banks: Vec<&ChemState> = [river.topo.left, river.topo.right]
                    .into_iter()
                    .flatten()
                    .filter_map(|e| elements.get(e).map(|c| &c.gw))
                    .collect();

                let mut stream = ChemState::new(tables);
                for k in 0..n_mobile {
                    let c = if banks.is_empty() {
                        ZERO_CONC
                    } else {
                        banks.iter().map(|b| b.t_conc[k]).sum::<f64>() / banks.len() as f64
                    };
                    stream.t_conc[k] = c;
                    stream.p_conc[k] = c;
                    stream.p_actv[k] = c;
                }
                let mut bed = stream.clone();
                stream.sync_moles(tables, vol_stream);
                bed.sync_moles(tables, vol_bed);
                RiverChem { stream, bed }
            })
            .collect();

        log::debug!(
            "化学状态初始化完成: {} 个单元, {} 个河段, 基岩层 {}",
            elements.len(),
            mesh.num_rivers(),
            if bedrock { "启用" } else { "关闭" }
        );

        Ok(Self { elements, rivers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rt_config::{ChemistryConfig, PrimarySpeciesConfig, SpeciesKindConfig};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
    }

    fn tables() -> ChemTables {
        let cfg = ChemistryConfig {
            primary: vec![
                PrimarySpeciesConfig::aqueous("H+", 1.0),
                PrimarySpeciesConfig::aqueous("Ca++", 2.0),
                PrimarySpeciesConfig::aqueous("X-", -1.0).with_kind(SpeciesKindConfig::CationExchange),
                PrimarySpeciesConfig::mineral("Calcite", 100.09, 36.934),
            ],
            ..Default::default()
        };
        ChemTables::from_config(&cfg).unwrap()
    }

    #[test]
    fn test_conversion_by_kind() {
        let t = tables();
        let restart = ZoneRestart::from_named(
            &t,
            &[("H+", 1e-5), ("Ca++", 2e-4), ("X-", 0.01), ("Calcite", 0.1)],
            &[("Calcite", 2.0)],
        )
        .unwrap();
        let smcmax = 0.4;
        let c = ChemState::from_restart(&t, &restart, smcmax).unwrap();

        assert_eq!(c.t_conc[0], 1e-5);
        assert_eq!(c.p_actv[0], 1e-5);
        assert_eq!(c.p_conc[1], 1e-4);
        assert_eq!(c.t_conc[1], 2e-4);
        assert!(approx_eq(c.t_conc[2], 0.01 * 0.6 * 2650.0));
        assert_eq!(c.p_actv[2], 0.005);
        assert!(approx_eq(c.t_conc[3], 0.1 * 1000.0 / 36.934 / 0.4));
        assert_eq!(c.p_actv[3], 1.0);
        assert_eq!(c.ssa[3], 2.0);
        assert_eq!(c.s_conc.len(), 0);
    }

    #[test]
    fn test_moles_only_for_aqueous() {
        let t = tables();
        let restart = ZoneRestart::from_named(&t, &[("Ca++", 2e-4), ("X-", 0.01)], &[]).unwrap();
        let mut c = ChemState::from_restart(&t, &restart, 0.4).unwrap();
        c.sync_moles(&t, 50.0);
        assert!(approx_eq(c.t_mole[1], 1e-2));
        assert_eq!(c.t_mole[2], 0.0);
        assert_eq!(c.t_mole[3], 0.0);
    }

    #[test]
    fn test_unknown_restart_species() {
        let t = tables();
        assert!(ZoneRestart::from_named(&t, &[("Mg++", 1.0)], &[]).is_err());
    }
}
