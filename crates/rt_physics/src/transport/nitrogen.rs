// crates/rt_physics/src/transport/nitrogen.rs

//! 矿质氮迁移
//!
//! 土壤矿质氮 `sminn` [kgN/m²] 中 `mobile_fraction` 部分溶于土壤水，随地下水
//! 侧向通量迎风迁移；河道氮 `rivern` [kgN/m²] 随河道流量迁移。河岸边的
//! 交换对象为河道，下游河段的上游通量在串行阶段累加。

use super::upwind;
use crate::hydrology::{gw_storage, unsat_storage, HydroState, RiverFlux};
use crate::mesh::{BankSide, Mesh, NUM_EDGE};
use rayon::prelude::*;
use rt_config::NitrogenConfig;
use rt_foundation::constants::{DAYS_PER_YEAR, DAY_IN_SEC};
use rt_foundation::{RtError, RtResult};

/// 氮状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NitrogenField {
    /// 单元土壤矿质氮 [kgN/m²]
    pub sminn: Vec<f64>,
    /// 河道氮 [kgN/m²]
    pub rivern: Vec<f64>,
    /// 单元生物地球化学源汇项 [kgN/m²/s]
    pub snksrc: Vec<f64>,
}

impl NitrogenField {
    /// 全零状态
    pub fn new(num_elements: usize, num_rivers: usize) -> Self {
        Self {
            sminn: vec![0.0; num_elements],
            rivern: vec![0.0; num_rivers],
            snksrc: vec![0.0; num_elements],
        }
    }
}

/// 氮通量 [kgN/s]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NitrogenFlux {
    /// 单元各边通量，正值为流出
    pub elements: Vec<[f64; NUM_EDGE]>,
    /// 河段各槽位通量
    pub rivers: Vec<[f64; RiverFlux::NUM]>,
}

impl NitrogenFlux {
    /// 按网格规模创建
    pub fn new(mesh: &Mesh) -> Self {
        Self {
            elements: vec![[0.0; NUM_EDGE]; mesh.num_elements()],
            rivers: vec![[0.0; RiverFlux::NUM]; mesh.num_rivers()],
        }
    }
}

/// 矿质氮迁移计算
#[derive(Debug, Clone)]
pub struct NitrogenTransport {
    config: NitrogenConfig,
    depth_threshold: f64,
}

impl NitrogenTransport {
    /// 创建
    pub fn new(config: &NitrogenConfig, depth_threshold: f64) -> Self {
        Self {
            config: config.clone(),
            depth_threshold,
        }
    }

    fn element_conc(&self, mesh: &Mesh, hydro: &HydroState, field: &NitrogenField, i: usize) -> f64 {
        let soil = &mesh.elements[i].soil;
        let ws = &hydro.elem_ws[i];
        let storage = gw_storage(soil.depth, soil.smcmax, soil.smcmin, ws.gw)
            + unsat_storage(soil.depth, soil.smcmax, soil.smcmin, ws.gw, ws.unsat);
        if storage > self.depth_threshold {
            self.config.mobile_fraction * field.sminn[i].max(0.0) / storage
        } else {
            0.0
        }
    }

    fn river_conc(&self, hydro: &HydroState, field: &NitrogenField, i: usize) -> f64 {
        let stage = hydro.river_ws[i].stage;
        if stage > self.depth_threshold {
            field.rivern[i].max(0.0) / stage
        } else {
            0.0
        }
    }

    /// 计算全部氮通量
    pub fn compute_fluxes(
        &self,
        mesh: &Mesh,
        hydro: &HydroState,
        field: &NitrogenField,
        flux: &mut NitrogenFlux,
    ) -> RtResult<()> {
        RtError::check_size("sminn", mesh.num_elements(), field.sminn.len())?;
        RtError::check_size("rivern", mesh.num_rivers(), field.rivern.len())?;
        RtError::check_size("nitrogen.elements", mesh.num_elements(), flux.elements.len())?;
        RtError::check_size("nitrogen.rivers", mesh.num_rivers(), flux.rivers.len())?;

        let elem_conc: Vec<f64> = (0..mesh.num_elements())
            .into_par_iter()
            .map(|i| self.element_conc(mesh, hydro, field, i))
            .collect();
        let river_conc: Vec<f64> = (0..mesh.num_rivers())
            .into_par_iter()
            .map(|i| self.river_conc(hydro, field, i))
            .collect();

        flux.elements.par_iter_mut().enumerate().for_each(|(i, out)| {
            let topo = &mesh.elements[i].topo;
            let wf = &hydro.elem_wf[i];
            for j in 0..NUM_EDGE {
                let partner = match (topo.nabr_river[j], topo.nabr[j]) {
                    (Some(r), _) => Some(river_conc[r]),
                    (None, Some(nb)) => Some(elem_conc[nb]),
                    (None, None) => None,
                };
                out[j] = partner.map_or(0.0, |c| upwind(wf.subsurf[j], elem_conc[i], c));
            }
        });

        let elem_flux = &flux.elements;
        flux.rivers.par_iter_mut().enumerate().for_each(|(i, out)| {
            out.fill(0.0);
            let river = &mesh.rivers[i];
            let w = hydro.river_wf[i].get(RiverFlux::DownChanl2Chanl);
            out[RiverFlux::DownChanl2Chanl.idx()] = match river.topo.down {
                Some(d) => upwind(w, river_conc[i], river_conc[d]),
                None => w * river_conc[i],
            };
            for side in [BankSide::Left, BankSide::Right] {
                if let Some(e) = river.bank(side) {
                    if let Some(j) = mesh.bank_edge(e, i) {
                        out[RiverFlux::aquif2chanl(side).idx()] = -elem_flux[e][j];
                    }
                }
            }
        });

        for (i, river) in mesh.rivers.iter().enumerate() {
            if let Some(d) = river.topo.down {
                let down = flux.rivers[i][RiverFlux::DownChanl2Chanl.idx()];
                flux.rivers[d][RiverFlux::UpChanl2Chanl.idx()] -= down;
            }
        }

        Ok(())
    }

    /// 单元矿质氮变化率 [kgN/m²/s]
    pub fn element_derivative(&self, mesh: &Mesh, field: &NitrogenField, flux: &NitrogenFlux, i: usize) -> f64 {
        let input = (self.config.ndep + self.config.nfix) / DAYS_PER_YEAR / DAY_IN_SEC;
        let lateral: f64 = flux.elements[i].iter().sum();
        input + field.snksrc[i] - lateral / mesh.elements[i].topo.area
    }

    /// 河道氮变化率 [kgN/m²/s]
    pub fn river_derivative(&self, mesh: &Mesh, flux: &NitrogenFlux, i: usize) -> f64 {
        let f = &flux.rivers[i];
        let out = f[RiverFlux::UpChanl2Chanl.idx()]
            + f[RiverFlux::DownChanl2Chanl.idx()]
            + f[RiverFlux::LeftAquif2Chanl.idx()]
            + f[RiverFlux::RightAquif2Chanl.idx()];
        -out / mesh.rivers[i].topo.area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Element, River, RiverMaterial, SoilProps};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1e-30)
    }

    #[test]
    fn test_bank_exchange_conserves_mass() {
        let soil = SoilProps::new(2.0, 0.4, 0.05);
        let matl = RiverMaterial::new(1.0, 0.3, 0.05);
        let mesh = Mesh::new(
            vec![
                Element::new(200.0, soil).with_bank(0, 0, 5.0, 10.0).with_neighbor(1, 1, 8.0, 6.0),
                Element::new(150.0, soil).with_neighbor(2, 0, 8.0, 6.0),
            ],
            vec![River::new(40.0, 2.0, matl).with_banks(Some(0), None)],
        );
        let mut hydro = HydroState::new(2, 1);
        hydro.elem_ws[0].gw = 1.2;
        hydro.elem_ws[1].gw = 1.5;
        hydro.river_ws[0].stage = 0.4;
        hydro.elem_wf[0].subsurf = [2e-3, -1e-3, 0.0];
        hydro.elem_wf[1].subsurf = [0.0, 0.0, 1e-3];
        hydro.river_wf[0].set(RiverFlux::DownChanl2Chanl, 0.0);

        let mut field = NitrogenField::new(2, 1);
        field.sminn = vec![0.02, 0.05];
        field.rivern = vec![0.001];

        let cfg = NitrogenConfig::default();
        let model = NitrogenTransport::new(&cfg, 1e-4);
        let mut flux = NitrogenFlux::new(&mesh);
        model.compute_fluxes(&mesh, &hydro, &field, &mut flux).unwrap();

        let total: f64 = model.element_derivative(&mesh, &field, &flux, 0) * 200.0
            + model.element_derivative(&mesh, &field, &flux, 1) * 150.0
            + model.river_derivative(&mesh, &flux, 0) * 40.0;
        assert!(total.abs() < 1e-18);

        let gained = model.river_derivative(&mesh, &flux, 0) * 40.0;
        assert!(approx_eq(gained, flux.elements[0][0]));
        assert!(gained > 0.0);
    }
}
