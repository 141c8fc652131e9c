// crates/rt_physics/src/ode/assembler.rs

//! ODE 右端项组装
//!
//! 每次求值：
//!
//! 1. 解包状态向量，负值截断为 0
//! 2. 清零河段上游槽位，调用水文模型刷新水通量
//! 3. 溶质输运与矿质氮迁移
//! 4. 各控制体水量与摩尔数平衡（并行，按控制体分块写入 `dy`）
//! 5. 逐分量检查非有限值

use rayon::prelude::*;
use rt_config::{Capabilities, RtConfig};
use rt_foundation::float::clamp_non_negative;
use rt_foundation::{KahanSum, NonFiniteSource, RtError, RtResult};

use super::layout::StateLayout;
use crate::chemistry::ChemTables;
use crate::engine::OdeRhs;
use crate::hydrology::{HydroState, Hydrology, RiverFlux};
use crate::mesh::Mesh;
use crate::reaction::{ReactionSolver, ReactionSummary};
use crate::state::{ChemField, ZoneKind};
use crate::transport::{ChemFlux, NitrogenField, NitrogenFlux, NitrogenTransport, TransportAssembler};

/// 矿质氮模型
#[derive(Debug, Clone)]
pub struct NitrogenModel {
    /// 迁移计算
    pub transport: NitrogenTransport,
    /// 状态
    pub field: NitrogenField,
    /// 通量
    pub flux: NitrogenFlux,
}

/// ODE 右端项组装器，持有耦合系统的全部状态
pub struct OdeAssembler {
    tables: ChemTables,
    mesh: Mesh,
    layout: StateLayout,
    caps: Capabilities,
    hydrology: Box<dyn Hydrology>,
    hydro: HydroState,
    chem: ChemField,
    flux: ChemFlux,
    transport: TransportAssembler,
    nitrogen: Option<NitrogenModel>,
    rhs_evals: usize,
}

impl std::fmt::Debug for OdeAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdeAssembler")
            .field("layout", &self.layout)
            .field("caps", &self.caps)
            .field("rhs_evals", &self.rhs_evals)
            .finish_non_exhaustive()
    }
}

impl OdeAssembler {
    /// 组装耦合系统
    pub fn new(
        tables: ChemTables,
        mesh: Mesh,
        hydrology: Box<dyn Hydrology>,
        hydro: HydroState,
        chem: ChemField,
        config: &RtConfig,
    ) -> RtResult<Self> {
        let caps = config.capabilities.clone();
        RtError::check_size("elem_ws", mesh.num_elements(), hydro.elem_ws.len())?;
        RtError::check_size("elem_wf", mesh.num_elements(), hydro.elem_wf.len())?;
        RtError::check_size("river_ws", mesh.num_rivers(), hydro.river_ws.len())?;
        RtError::check_size("river_wf", mesh.num_rivers(), hydro.river_wf.len())?;
        RtError::check_size("chem.elements", mesh.num_elements(), chem.elements.len())?;
        RtError::check_size("chem.rivers", mesh.num_rivers(), chem.rivers.len())?;

        let n = tables.num_aqueous();
        let layout = StateLayout::new(mesh.num_elements(), mesh.num_rivers(), n, &caps);
        let flux = ChemFlux::new(&mesh, n, caps.bedrock);
        let transport = TransportAssembler::new(&config.transport, caps.bedrock);
        let nitrogen = caps.nitrogen.then(|| NitrogenModel {
            transport: NitrogenTransport::new(&config.nitrogen, config.transport.depth_threshold),
            field: NitrogenField::new(mesh.num_elements(), mesh.num_rivers()),
            flux: NitrogenFlux::new(&mesh),
        });

        log::info!(
            "ODE 组装: 单元 {}, 河段 {}, 输运物种 {}, 状态维数 {}",
            mesh.num_elements(),
            mesh.num_rivers(),
            n,
            layout.len()
        );

        Ok(Self {
            tables,
            mesh,
            layout,
            caps,
            hydrology,
            hydro,
            chem,
            flux,
            transport,
            nitrogen,
            rhs_evals: 0,
        })
    }

    /// 设置初始氮状态（需启用氮能力）
    pub fn set_nitrogen_field(&mut self, field: NitrogenField) -> RtResult<()> {
        let Some(model) = self.nitrogen.as_mut() else {
            return Err(RtError::config("未启用氮迁移能力"));
        };
        RtError::check_size("sminn", self.mesh.num_elements(), field.sminn.len())?;
        RtError::check_size("snksrc", self.mesh.num_elements(), field.snksrc.len())?;
        RtError::check_size("rivern", self.mesh.num_rivers(), field.rivern.len())?;
        model.field = field;
        Ok(())
    }

    // =========================================================================
    // 访问器
    // =========================================================================

    /// 化学表
    pub fn tables(&self) -> &ChemTables {
        &self.tables
    }

    /// 网格
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// 状态布局
    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    /// 能力开关
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// 水文状态
    pub fn hydro(&self) -> &HydroState {
        &self.hydro
    }

    /// 可变水文状态
    pub fn hydro_mut(&mut self) -> &mut HydroState {
        &mut self.hydro
    }

    /// 化学状态
    pub fn chem(&self) -> &ChemField {
        &self.chem
    }

    /// 可变化学状态
    pub fn chem_mut(&mut self) -> &mut ChemField {
        &mut self.chem
    }

    /// 最近一次求值的溶质通量
    pub fn flux(&self) -> &ChemFlux {
        &self.flux
    }

    /// 氮模型
    pub fn nitrogen(&self) -> Option<&NitrogenModel> {
        self.nitrogen.as_ref()
    }

    /// 水文模型
    pub fn hydrology(&self) -> &dyn Hydrology {
        self.hydrology.as_ref()
    }

    /// 右端项累计求值次数
    pub fn rhs_evals(&self) -> usize {
        self.rhs_evals
    }

    // =========================================================================
    // 状态打包
    // =========================================================================

    /// 当前状态写入状态向量
    pub fn pack(&self, y: &mut [f64]) -> RtResult<()> {
        RtError::check_size("y", self.layout.len(), y.len())?;
        let n = self.layout.num_species();
        let es = *self.layout.elem_slots();
        let rs = *self.layout.river_slots();

        for (i, ws) in self.hydro.elem_ws.iter().enumerate() {
            let at = |local| self.layout.elem(i, local);
            y[at(es.surf)] = ws.surf;
            y[at(es.unsat)] = ws.unsat;
            y[at(es.gw)] = ws.gw;
            if let Some((fu, fg)) = es.bedrock {
                y[at(fu)] = ws.fbr_unsat;
                y[at(fg)] = ws.fbr_gw;
            }
            if let (Some(o), Some(nm)) = (es.sminn, self.nitrogen.as_ref()) {
                y[at(o)] = nm.field.sminn[i];
            }
            if let Some(base) = es.species {
                let ec = &self.chem.elements[i];
                for k in 0..n {
                    y[at(base + k)] = ec.unsat.t_mole[k];
                    y[at(base + n + k)] = ec.gw.t_mole[k];
                    if let (Some(fbr), Some(_)) = (ec.bedrock.as_ref(), es.bedrock) {
                        y[at(base + 2 * n + k)] = fbr.unsat.t_mole[k];
                        y[at(base + 3 * n + k)] = fbr.gw.t_mole[k];
                    }
                }
            }
        }

        for (i, ws) in self.hydro.river_ws.iter().enumerate() {
            let at = |local| self.layout.river(i, local);
            y[at(rs.stage)] = ws.stage;
            y[at(rs.gw)] = ws.gw;
            if let (Some(o), Some(nm)) = (rs.rivern, self.nitrogen.as_ref()) {
                y[at(o)] = nm.field.rivern[i];
            }
            if let Some(base) = rs.species {
                let rc = &self.chem.rivers[i];
                for k in 0..n {
                    y[at(base + k)] = rc.stream.t_mole[k];
                    y[at(base + n + k)] = rc.bed.t_mole[k];
                }
            }
        }
        Ok(())
    }

    /// 由状态向量恢复状态，负值截断为 0
    pub fn unpack(&mut self, y: &[f64]) -> RtResult<()> {
        RtError::check_size("y", self.layout.len(), y.len())?;
        let n = self.layout.num_species();
        let es = *self.layout.elem_slots();
        let rs = *self.layout.river_slots();
        let layout = &self.layout;

        for (i, ws) in self.hydro.elem_ws.iter_mut().enumerate() {
            let get = |local| clamp_non_negative(y[layout.elem(i, local)]);
            ws.surf = get(es.surf);
            ws.unsat = get(es.unsat);
            ws.gw = get(es.gw);
            if let Some((fu, fg)) = es.bedrock {
                ws.fbr_unsat = get(fu);
                ws.fbr_gw = get(fg);
            }
            if let (Some(o), Some(nm)) = (es.sminn, self.nitrogen.as_mut()) {
                nm.field.sminn[i] = get(o);
            }
            if let Some(base) = es.species {
                let ec = &mut self.chem.elements[i];
                for k in 0..n {
                    ec.unsat.t_mole[k] = get(base + k);
                    ec.gw.t_mole[k] = get(base + n + k);
                    if let (Some(fbr), Some(_)) = (ec.bedrock.as_mut(), es.bedrock) {
                        fbr.unsat.t_mole[k] = get(base + 2 * n + k);
                        fbr.gw.t_mole[k] = get(base + 3 * n + k);
                    }
                }
            }
        }

        for (i, ws) in self.hydro.river_ws.iter_mut().enumerate() {
            let get = |local| clamp_non_negative(y[layout.river(i, local)]);
            ws.stage = get(rs.stage);
            ws.gw = get(rs.gw);
            if let (Some(o), Some(nm)) = (rs.rivern, self.nitrogen.as_mut()) {
                nm.field.rivern[i] = get(o);
            }
            if let Some(base) = rs.species {
                let rc = &mut self.chem.rivers[i];
                for k in 0..n {
                    rc.stream.t_mole[k] = get(base + k);
                    rc.bed.t_mole[k] = get(base + n + k);
                }
            }
        }
        Ok(())
    }

    /// 物种 `k` 在状态向量中的总摩尔数
    pub fn total_moles(&self, y: &[f64], k: usize) -> f64 {
        let zones = [
            ZoneKind::Unsat,
            ZoneKind::Gw,
            ZoneKind::FbrUnsat,
            ZoneKind::FbrGw,
        ];
        let mut sum = KahanSum::new();
        for i in 0..self.mesh.num_elements() {
            for zone in zones {
                if let Some(local) = self.layout.species_local(zone, k) {
                    sum.add(y[self.layout.elem(i, local)]);
                }
            }
        }
        for i in 0..self.mesh.num_rivers() {
            for zone in [ZoneKind::Stream, ZoneKind::Bed] {
                if let Some(local) = self.layout.species_local(zone, k) {
                    sum.add(y[self.layout.river(i, local)]);
                }
            }
        }
        sum.value()
    }

    // =========================================================================
    // 算子
    // =========================================================================

    /// 由当前摩尔数刷新各区浓度
    pub fn refresh_concentrations(&mut self) -> RtResult<()> {
        if self.caps.transport {
            self.transport
                .update_concentrations(&self.tables, &self.mesh, &self.hydro, &mut self.chem)?;
        }
        Ok(())
    }

    /// 全部单元反应
    pub fn react(&mut self, solver: &ReactionSolver, dt: f64) -> RtResult<ReactionSummary> {
        solver.react_all(&self.tables, &self.mesh, &self.hydro, &mut self.chem, dt)
    }

    /// 河道形态计算，返回未收敛的河段数
    pub fn speciate_rivers(&mut self, solver: &ReactionSolver) -> usize {
        solver.speciate_rivers(&self.tables, &mut self.chem)
    }

    /// 设置全部单元的降水浓度
    pub fn set_prcp_conc(&mut self, conc: &[f64]) {
        for ec in &mut self.chem.elements {
            let n = ec.prcp_conc.len().min(conc.len());
            ec.prcp_conc[..n].copy_from_slice(&conc[..n]);
        }
    }
}

// ============================================================================
// 平衡方程
// ============================================================================

struct Balance<'a> {
    tables: &'a ChemTables,
    mesh: &'a Mesh,
    layout: &'a StateLayout,
    caps: &'a Capabilities,
    hydro: &'a HydroState,
    flux: &'a ChemFlux,
    nitrogen: Option<&'a NitrogenModel>,
}

/// 首个非有限分量的块内偏移
fn first_non_finite(out: &[f64]) -> Option<usize> {
    out.iter().position(|v| !v.is_finite())
}

impl Balance<'_> {
    fn species_name(&self, k: usize) -> String {
        self.tables.species(k).name.clone()
    }

    fn element(&self, i: usize, out: &mut [f64], t: f64) -> RtResult<()> {
        let elem = &self.mesh.elements[i];
        let wf = &self.hydro.elem_wf[i];
        let area = elem.topo.area;
        let s = self.layout.elem_slots();

        let ovl: f64 = wf.ovlflow.iter().sum();
        let sub: f64 = wf.subsurf.iter().sum();
        let fbr_infil = if self.caps.bedrock { wf.fbr_infil } else { 0.0 };
        let porosity = elem.soil.porosity();

        out[s.surf] = wf.pcpdrp - wf.infil - wf.edir_surf - ovl / area;
        out[s.unsat] = (wf.infil - wf.rechg - wf.edir_unsat - wf.ett_unsat) / porosity;
        out[s.gw] = (wf.rechg - wf.edir_gw - wf.ett_gw - sub / area - fbr_infil) / porosity;
        if let Some((fu, fg)) = s.bedrock {
            let geol_porosity = elem.geol.porosity();
            let fbrflow: f64 = wf.fbrflow.iter().sum();
            out[fu] = (wf.fbr_infil - wf.fbr_rechg) / geol_porosity;
            out[fg] = (wf.fbr_rechg - fbrflow / area - wf.fbr_discharge) / geol_porosity;
        }
        if let (Some(o), Some(nm)) = (s.sminn, self.nitrogen) {
            out[o] = nm.transport.element_derivative(self.mesh, &nm.field, &nm.flux, i);
        }
        if let Some(base) = s.species {
            let n = self.layout.num_species();
            let f = &self.flux.elements[i];
            for k in 0..n {
                out[base + k] = f.unsat_derivative(k);
                out[base + n + k] = f.gw_derivative(k);
            }
            if let (Some(b), Some(_)) = (f.bedrock.as_ref(), s.bedrock) {
                for k in 0..n {
                    out[base + 2 * n + k] = b.unsat_derivative(k);
                    out[base + 3 * n + k] = b.gw_derivative(k);
                }
            }
        }

        match first_non_finite(out) {
            None => Ok(()),
            Some(local) => {
                let quantity = self.layout.elem_quantity(local, |k| self.species_name(k));
                log::error!("单元 {} 的 {} 导数为 NaN (t = {} s)", i + 1, quantity, t);
                Err(RtError::non_finite(NonFiniteSource::Element, i, quantity, t))
            }
        }
    }

    fn river(&self, i: usize, out: &mut [f64], t: f64) -> RtResult<()> {
        let river = &self.mesh.rivers[i];
        let wf = &self.hydro.river_wf[i];
        let area = river.topo.area;
        let s = self.layout.river_slots();

        let mut channel: f64 = RiverFlux::CHANNEL.iter().map(|slot| wf.get(*slot)).sum();
        if self.caps.bedrock {
            channel += RiverFlux::BEDROCK.iter().map(|slot| wf.get(*slot)).sum::<f64>();
        }
        let lateral: f64 = RiverFlux::BED_LATERAL.iter().map(|slot| wf.get(*slot)).sum();
        out[s.stage] = -channel / area;
        out[s.gw] = (wf.get(RiverFlux::ChanlLkg) - lateral) / (river.matl.porosity * area);

        if let (Some(o), Some(nm)) = (s.rivern, self.nitrogen) {
            out[o] = nm.transport.river_derivative(self.mesh, &nm.flux, i);
        }
        if let Some(base) = s.species {
            let n = self.layout.num_species();
            let f = &self.flux.rivers[i];
            for k in 0..n {
                out[base + k] = f.stream_derivative(k, self.caps.bedrock);
                out[base + n + k] = f.bed_derivative(k);
            }
        }

        match first_non_finite(out) {
            None => Ok(()),
            Some(local) => {
                let quantity = self.layout.river_quantity(local, |k| self.species_name(k));
                log::error!("河段 {} 的 {} 导数为 NaN (t = {} s)", i + 1, quantity, t);
                Err(RtError::non_finite(NonFiniteSource::River, i, quantity, t))
            }
        }
    }
}

impl OdeRhs for OdeAssembler {
    fn rhs(&mut self, t: f64, y: &[f64], dy: &mut [f64]) -> RtResult<()> {
        RtError::check_size("dy", self.layout.len(), dy.len())?;
        self.rhs_evals += 1;
        dy.fill(0.0);
        self.unpack(y)?;

        self.hydro.reset_upstream_slots();
        self.hydrology.update_fluxes(t, &self.mesh, &mut self.hydro)?;
        if self.caps.transport {
            self.transport
                .run(&self.tables, &self.mesh, &self.hydro, &mut self.chem, &mut self.flux)?;
        }
        if let Some(nm) = self.nitrogen.as_mut() {
            nm.transport
                .compute_fluxes(&self.mesh, &self.hydro, &nm.field, &mut nm.flux)?;
        }

        let balance = Balance {
            tables: &self.tables,
            mesh: &self.mesh,
            layout: &self.layout,
            caps: &self.caps,
            hydro: &self.hydro,
            flux: &self.flux,
            nitrogen: self.nitrogen.as_ref(),
        };
        let (elem_dy, river_dy) = dy.split_at_mut(self.layout.river_offset());
        elem_dy
            .par_chunks_mut(self.layout.elem_stride())
            .enumerate()
            .try_for_each(|(i, out)| balance.element(i, out, t))?;
        river_dy
            .par_chunks_mut(self.layout.river_stride())
            .enumerate()
            .try_for_each(|(i, out)| balance.river(i, out, t))?;
        Ok(())
    }
}
