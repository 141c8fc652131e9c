// crates/rt_physics/src/transport/mod.rs

//! 溶质输运组装
//!
//! 每次右端项求值时执行：
//!
//! 1. 由摩尔数与储量换算各区浓度（并行）
//! 2. 单元界面通量（并行，按单元写入各自的通量槽）
//! 3. 河段通量（并行，河岸含水层通量取岸单元河岸边通量的相反数）
//! 4. 河岸边通量扣除河道交换量、下游累加（串行）
//!
//! 通量只由单元自身写入，邻居状态只读，因此并行阶段无数据竞争。
//! 需要跨控制体写入的部分（河岸、下游）放在串行阶段完成。

mod element;
mod kernel;
mod nitrogen;
mod river;

pub use kernel::{adv_diff_disp, upwind};
pub use nitrogen::{NitrogenField, NitrogenFlux, NitrogenTransport};

use crate::chemistry::{ChemTables, Mobility, SpeciesKind};
use crate::hydrology::{gw_storage, river_bed_storage, unsat_storage, HydroState, RiverFlux};
use crate::mesh::{BankSide, Mesh, NUM_EDGE};
use crate::state::{ChemField, ChemState};
use rayon::prelude::*;
use rt_config::TransportConfig;
use rt_foundation::float::clamp_non_negative;
use rt_foundation::{RtError, RtResult};

// ============================================================================
// 通量存储
// ============================================================================

fn zeros_per_edge(n: usize) -> [Vec<f64>; NUM_EDGE] {
    std::array::from_fn(|_| vec![0.0; n])
}

/// 基岩层单元通量 [mol/s]
#[derive(Debug, Clone, PartialEq)]
pub struct BedrockChemFlux {
    /// 土壤地下水 → 基岩非饱和区
    pub infil: Vec<f64>,
    /// 基岩非饱和区 → 基岩地下水
    pub rechg: Vec<f64>,
    /// 基岩非饱和区侧向通量
    pub unsat_flux: [Vec<f64>; NUM_EDGE],
    /// 基岩地下水侧向通量
    pub gw_flux: [Vec<f64>; NUM_EDGE],
    /// 基岩排泄
    pub discharge: Vec<f64>,
}

impl BedrockChemFlux {
    fn new(n: usize) -> Self {
        Self {
            infil: vec![0.0; n],
            rechg: vec![0.0; n],
            unsat_flux: zeros_per_edge(n),
            gw_flux: zeros_per_edge(n),
            discharge: vec![0.0; n],
        }
    }

    fn zero(&mut self) {
        self.infil.fill(0.0);
        self.rechg.fill(0.0);
        self.discharge.fill(0.0);
        for j in 0..NUM_EDGE {
            self.unsat_flux[j].fill(0.0);
            self.gw_flux[j].fill(0.0);
        }
    }

    /// 基岩非饱和区摩尔变化率
    #[inline]
    pub fn unsat_derivative(&self, k: usize) -> f64 {
        self.infil[k] - self.rechg[k] - self.unsat_flux.iter().map(|f| f[k]).sum::<f64>()
    }

    /// 基岩地下水摩尔变化率
    #[inline]
    pub fn gw_derivative(&self, k: usize) -> f64 {
        self.rechg[k] - self.gw_flux.iter().map(|f| f[k]).sum::<f64>() - self.discharge[k]
    }
}

/// 单元通量 [mol/s]，正值为流出对应区
#[derive(Debug, Clone, PartialEq)]
pub struct ElementChemFlux {
    /// 入渗（地表 → 非饱和区）
    pub infil: Vec<f64>,
    /// 补给（非饱和区 → 地下水）
    pub rechg: Vec<f64>,
    /// 非饱和区侧向通量
    pub unsat_flux: [Vec<f64>; NUM_EDGE],
    /// 地下水侧向通量
    pub subflux: [Vec<f64>; NUM_EDGE],
    /// 基岩层
    pub bedrock: Option<BedrockChemFlux>,
}

impl ElementChemFlux {
    /// 创建 `n` 个输运物种的通量槽
    pub fn new(n: usize, bedrock: bool) -> Self {
        Self {
            infil: vec![0.0; n],
            rechg: vec![0.0; n],
            unsat_flux: zeros_per_edge(n),
            subflux: zeros_per_edge(n),
            bedrock: bedrock.then(|| BedrockChemFlux::new(n)),
        }
    }

    /// 清零
    pub fn zero(&mut self) {
        self.infil.fill(0.0);
        self.rechg.fill(0.0);
        for j in 0..NUM_EDGE {
            self.unsat_flux[j].fill(0.0);
            self.subflux[j].fill(0.0);
        }
        if let Some(b) = self.bedrock.as_mut() {
            b.zero();
        }
    }

    /// 非饱和区摩尔变化率
    #[inline]
    pub fn unsat_derivative(&self, k: usize) -> f64 {
        self.infil[k] - self.rechg[k] - self.unsat_flux.iter().map(|f| f[k]).sum::<f64>()
    }

    /// 地下水摩尔变化率
    #[inline]
    pub fn gw_derivative(&self, k: usize) -> f64 {
        let fbr_infil = self.bedrock.as_ref().map_or(0.0, |b| b.infil[k]);
        self.rechg[k] - self.subflux.iter().map(|f| f[k]).sum::<f64>() - fbr_infil
    }
}

/// 河段通量 [mol/s]，槽位与 [`RiverFlux`] 一致
#[derive(Debug, Clone, PartialEq)]
pub struct RiverChemFlux {
    /// 各槽位通量
    pub flux: [Vec<f64>; RiverFlux::NUM],
}

impl RiverChemFlux {
    /// 创建 `n` 个输运物种的通量槽
    pub fn new(n: usize) -> Self {
        Self {
            flux: std::array::from_fn(|_| vec![0.0; n]),
        }
    }

    /// 清零
    pub fn zero(&mut self) {
        for f in &mut self.flux {
            f.fill(0.0);
        }
    }

    /// 槽位通量
    #[inline]
    pub fn get(&self, slot: RiverFlux) -> &[f64] {
        &self.flux[slot.idx()]
    }

    /// 可变槽位通量
    #[inline]
    pub fn get_mut(&mut self, slot: RiverFlux) -> &mut [f64] {
        &mut self.flux[slot.idx()]
    }

    /// 河道摩尔变化率
    pub fn stream_derivative(&self, k: usize, bedrock: bool) -> f64 {
        let mut out: f64 = RiverFlux::CHANNEL.iter().map(|s| self.flux[s.idx()][k]).sum();
        if bedrock {
            out += RiverFlux::BEDROCK.iter().map(|s| self.flux[s.idx()][k]).sum::<f64>();
        }
        -out
    }

    /// 河床摩尔变化率
    pub fn bed_derivative(&self, k: usize) -> f64 {
        let lateral: f64 = RiverFlux::BED_LATERAL.iter().map(|s| self.flux[s.idx()][k]).sum();
        self.flux[RiverFlux::ChanlLkg.idx()][k] - lateral
    }
}

/// 全流域溶质通量
#[derive(Debug, Clone, Default)]
pub struct ChemFlux {
    /// 单元
    pub elements: Vec<ElementChemFlux>,
    /// 河段
    pub rivers: Vec<RiverChemFlux>,
}

impl ChemFlux {
    /// 按网格规模创建
    pub fn new(mesh: &Mesh, num_mobile: usize, bedrock: bool) -> Self {
        Self {
            elements: (0..mesh.num_elements())
                .map(|_| ElementChemFlux::new(num_mobile, bedrock))
                .collect(),
            rivers: (0..mesh.num_rivers()).map(|_| RiverChemFlux::new(num_mobile)).collect(),
        }
    }
}

// ============================================================================
// 输运组装器
// ============================================================================

/// 输运参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportParams {
    /// 储量阈值 [m]
    pub depth_threshold: f64,
    /// 降水浓缩系数
    pub condensation: f64,
    /// 胶结指数
    pub cementation: f64,
    /// 是否启用基岩层
    pub bedrock: bool,
}

/// 并行阶段共享的只读上下文
pub(crate) struct FluxContext<'a> {
    pub tables: &'a ChemTables,
    pub mesh: &'a Mesh,
    pub hydro: &'a HydroState,
    pub chem: &'a ChemField,
    pub params: &'a TransportParams,
}

impl FluxContext<'_> {
    /// 物种 `k` 的扩散系数与弥散度
    #[inline]
    pub fn coefficients(&self, k: usize) -> (f64, f64) {
        let sp = self.tables.species(k);
        (sp.diffusion, sp.dispersion)
    }

    #[allow(clippy::too_many_arguments)]
    #[inline]
    pub fn kernel(
        &self,
        k: usize,
        conc_up: f64,
        conc_down: f64,
        porosity: f64,
        distance: f64,
        area: f64,
        wflux: f64,
    ) -> f64 {
        let (d, a) = self.coefficients(k);
        adv_diff_disp(d, a, self.params.cementation, conc_up, conc_down, porosity, distance, area, wflux)
    }
}

/// 溶质输运组装器
#[derive(Debug, Clone)]
pub struct TransportAssembler {
    params: TransportParams,
}

impl TransportAssembler {
    /// 由输运配置创建
    pub fn new(config: &TransportConfig, bedrock: bool) -> Self {
        Self {
            params: TransportParams {
                depth_threshold: config.depth_threshold,
                condensation: config.condensation,
                cementation: config.cementation,
                bedrock,
            },
        }
    }

    /// 输运参数
    pub fn params(&self) -> &TransportParams {
        &self.params
    }

    /// 由摩尔数换算全部区的总浓度
    pub fn update_concentrations(
        &self,
        tables: &ChemTables,
        mesh: &Mesh,
        hydro: &HydroState,
        chem: &mut ChemField,
    ) -> RtResult<()> {
        RtError::check_size("chem.elements", mesh.num_elements(), chem.elements.len())?;
        RtError::check_size("chem.rivers", mesh.num_rivers(), chem.rivers.len())?;
        let threshold = self.params.depth_threshold;

        chem.elements
            .par_iter_mut()
            .zip(mesh.elements.par_iter())
            .zip(hydro.elem_ws.par_iter())
            .for_each(|((ec, elem), ws)| {
                let area = elem.topo.area;
                let soil = &elem.soil;
                let s_unsat = unsat_storage(soil.depth, soil.smcmax, soil.smcmin, ws.gw, ws.unsat);
                let s_gw = gw_storage(soil.depth, soil.smcmax, soil.smcmin, ws.gw);
                zone_concentration(tables, &mut ec.unsat, s_unsat, area, threshold);
                zone_concentration(tables, &mut ec.gw, s_gw, area, threshold);
                if let Some(fbr) = ec.bedrock.as_mut() {
                    let geol = &elem.geol;
                    let s_fu =
                        unsat_storage(geol.depth, geol.smcmax, geol.smcmin, ws.fbr_gw, ws.fbr_unsat);
                    let s_fg = gw_storage(geol.depth, geol.smcmax, geol.smcmin, ws.fbr_gw);
                    zone_concentration(tables, &mut fbr.unsat, s_fu, area, threshold);
                    zone_concentration(tables, &mut fbr.gw, s_fg, area, threshold);
                }
            });

        chem.rivers
            .par_iter_mut()
            .zip(mesh.rivers.par_iter())
            .zip(hydro.river_ws.par_iter())
            .for_each(|((rc, river), ws)| {
                let area = river.topo.area;
                let m = &river.matl;
                let s_bed = river_bed_storage(m.bed_thickness, m.porosity, m.smcmin, ws.gw);
                zone_concentration(tables, &mut rc.stream, ws.stage, area, threshold);
                zone_concentration(tables, &mut rc.bed, s_bed, area, threshold);
            });

        Ok(())
    }

    /// 计算全部溶质通量，调用前需先执行 [`Self::update_concentrations`]
    pub fn compute_fluxes(
        &self,
        tables: &ChemTables,
        mesh: &Mesh,
        hydro: &HydroState,
        chem: &ChemField,
        flux: &mut ChemFlux,
    ) -> RtResult<()> {
        RtError::check_size("flux.elements", mesh.num_elements(), flux.elements.len())?;
        RtError::check_size("flux.rivers", mesh.num_rivers(), flux.rivers.len())?;

        let ctx = FluxContext {
            tables,
            mesh,
            hydro,
            chem,
            params: &self.params,
        };
        let ChemFlux { elements, rivers } = flux;

        elements.par_iter_mut().enumerate().for_each(|(i, out)| {
            out.zero();
            element::element_fluxes(&ctx, i, out);
        });

        let elem_flux: &[ElementChemFlux] = &elements[..];
        rivers.par_iter_mut().enumerate().for_each(|(i, out)| {
            out.zero();
            river::river_fluxes(&ctx, elem_flux, i, out);
        });

        let n = tables.num_aqueous();
        for (i, river) in mesh.rivers.iter().enumerate() {
            for side in [BankSide::Left, BankSide::Right] {
                let Some(e) = river.bank(side) else {
                    continue;
                };
                let Some(j) = mesh.bank_edge(e, i) else {
                    continue;
                };
                let a2c = RiverFlux::aquif2chanl(side).idx();
                for k in 0..n {
                    elements[e].subflux[j][k] -= rivers[i].flux[a2c][k];
                }
            }
        }

        let up_chanl = RiverFlux::UpChanl2Chanl.idx();
        let up_aquif = RiverFlux::UpAquif2Aquif.idx();
        let down_chanl = RiverFlux::DownChanl2Chanl.idx();
        let down_aquif = RiverFlux::DownAquif2Aquif.idx();
        for (i, river) in mesh.rivers.iter().enumerate() {
            if let Some(d) = river.topo.down {
                for k in 0..n {
                    let dc = rivers[i].flux[down_chanl][k];
                    let da = rivers[i].flux[down_aquif][k];
                    rivers[d].flux[up_chanl][k] -= dc;
                    rivers[d].flux[up_aquif][k] -= da;
                }
            }
        }

        Ok(())
    }

    /// 浓度换算与通量计算
    pub fn run(
        &self,
        tables: &ChemTables,
        mesh: &Mesh,
        hydro: &HydroState,
        chem: &mut ChemField,
        flux: &mut ChemFlux,
    ) -> RtResult<()> {
        self.update_concentrations(tables, mesh, hydro, chem)?;
        self.compute_fluxes(tables, mesh, hydro, chem, flux)
    }
}

/// 单区浓度换算
///
/// 储量不足阈值时浓度精确为 0。混合态物种先扣除非水相次级物种中的
/// 固定部分，所有物种结果截断为非负。
pub fn zone_concentration(
    tables: &ChemTables,
    chms: &mut ChemState,
    storage: f64,
    area: f64,
    threshold: f64,
) {
    let n = tables.num_aqueous();
    if storage <= threshold {
        chms.t_conc[..n].fill(0.0);
        return;
    }
    let vol = storage * area;
    let np = tables.num_primary();
    let total = tables.total_conc();
    for k in 0..n {
        let mut c = chms.t_mole[k] / vol;
        if tables.species(k).mobility == Mobility::Mixed {
            for sec in 0..tables.num_secondary() {
                if tables.species(np + sec).kind != SpeciesKind::Aqueous {
                    c -= total[(k, np + sec)] * chms.s_conc[sec];
                }
            }
        }
        chms.t_conc[k] = clamp_non_negative(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Element, River, RiverMaterial, SoilProps};
    use rt_config::{ChemistryConfig, PrimarySpeciesConfig};

    fn tracer_tables() -> ChemTables {
        let cfg = ChemistryConfig {
            primary: vec![
                PrimarySpeciesConfig::aqueous("Cl-", -1.0),
                PrimarySpeciesConfig::aqueous("Na+", 1.0),
            ],
            ..Default::default()
        };
        ChemTables::from_config(&cfg).unwrap()
    }

    fn two_element_mesh() -> Mesh {
        let soil = SoilProps::new(2.0, 0.4, 0.05);
        Mesh::new(
            vec![
                Element::new(100.0, soil).with_neighbor(0, 1, 10.0, 5.0),
                Element::new(100.0, soil).with_neighbor(1, 0, 10.0, 5.0),
            ],
            vec![],
        )
    }

    #[test]
    fn test_dry_zone_concentration_is_zero() {
        let tables = tracer_tables();
        let mut chms = ChemState::new(&tables);
        chms.t_mole[0] = 5.0;
        zone_concentration(&tables, &mut chms, 1e-6, 100.0, 1e-4);
        assert_eq!(chms.t_conc[0], 0.0);
        zone_concentration(&tables, &mut chms, 0.5, 100.0, 1e-4);
        assert!((chms.t_conc[0] - 0.1).abs() < 1e-15);
    }

    #[test]
    fn test_negative_moles_give_zero_concentration() {
        let tables = tracer_tables();
        let mut chms = ChemState::new(&tables);
        chms.t_mole[0] = -5.0;
        chms.t_mole[1] = 5.0;
        zone_concentration(&tables, &mut chms, 0.5, 100.0, 1e-4);
        assert_eq!(chms.t_conc[0], 0.0);
        assert!((chms.t_conc[1] - 0.1).abs() < 1e-15);
    }

    #[test]
    fn test_neighbor_fluxes_cancel() {
        let tables = tracer_tables();
        let mesh = two_element_mesh();
        let mut hydro = HydroState::new(2, 0);
        hydro.elem_ws[0].gw = 1.0;
        hydro.elem_ws[1].gw = 1.3;
        hydro.elem_ws[0].unsat = 0.2;
        hydro.elem_ws[1].unsat = 0.1;
        hydro.elem_wf[0].subsurf[0] = 3e-4;
        hydro.elem_wf[1].subsurf[1] = -3e-4;

        let mut chem = ChemField {
            elements: (0..2)
                .map(|_| crate::state::ElementChem {
                    unsat: ChemState::new(&tables),
                    gw: ChemState::new(&tables),
                    bedrock: None,
                    prcp_conc: vec![0.0; 2],
                })
                .collect(),
            rivers: vec![],
        };
        chem.elements[0].gw.t_mole = vec![40.0, 4.0];
        chem.elements[1].gw.t_mole = vec![10.0, 9.0];
        chem.elements[0].unsat.t_mole = vec![1.0, 2.0];
        chem.elements[1].unsat.t_mole = vec![3.0, 0.5];

        let assembler = TransportAssembler::new(&TransportConfig::default(), false);
        let mut flux = ChemFlux::new(&mesh, 2, false);
        assembler.run(&tables, &mesh, &hydro, &mut chem, &mut flux).unwrap();

        for k in 0..2 {
            let a = flux.elements[0].subflux[0][k];
            let b = flux.elements[1].subflux[1][k];
            assert_eq!(a + b, 0.0);
            assert!(a != 0.0);
            let ua = flux.elements[0].unsat_flux[0][k];
            let ub = flux.elements[1].unsat_flux[1][k];
            assert_eq!(ua + ub, 0.0);
        }
    }

    #[test]
    fn test_river_downstream_accumulation() {
        let tables = tracer_tables();
        let matl = RiverMaterial::new(1.0, 0.3, 0.05);
        let mesh = Mesh::new(
            vec![],
            vec![River::new(50.0, 2.0, matl).with_down(1, 25.0), River::new(50.0, 2.0, matl)],
        );
        let mut hydro = HydroState::new(0, 2);
        for ws in &mut hydro.river_ws {
            ws.stage = 0.5;
            ws.gw = 0.8;
        }
        hydro.river_wf[0].set(RiverFlux::DownChanl2Chanl, 2.0);
        hydro.river_wf[0].set(RiverFlux::DownAquif2Aquif, 0.01);
        hydro.river_wf[1].set(RiverFlux::DownChanl2Chanl, 2.0);

        let mut chem = ChemField {
            elements: vec![],
            rivers: (0..2)
                .map(|_| crate::state::RiverChem {
                    stream: ChemState::new(&tables),
                    bed: ChemState::new(&tables),
                })
                .collect(),
        };
        chem.rivers[0].stream.t_mole = vec![25.0, 0.0];
        chem.rivers[0].bed.t_mole = vec![3.0, 0.0];

        let assembler = TransportAssembler::new(&TransportConfig::default(), false);
        let mut flux = ChemFlux::new(&mesh, 2, false);
        assembler.run(&tables, &mesh, &hydro, &mut chem, &mut flux).unwrap();

        let down = flux.rivers[0].get(RiverFlux::DownChanl2Chanl)[0];
        assert!((down - 2.0).abs() < 1e-12);
        assert_eq!(flux.rivers[1].get(RiverFlux::UpChanl2Chanl)[0], -down);
        let down_aq = flux.rivers[0].get(RiverFlux::DownAquif2Aquif)[0];
        assert_eq!(flux.rivers[1].get(RiverFlux::UpAquif2Aquif)[0], -down_aq);
        // 出口河段取自身浓度
        assert_eq!(flux.rivers[1].get(RiverFlux::DownChanl2Chanl)[0], 0.0);
    }
}
