// crates/rt_physics/src/transport/river.rs

//! 河段溶质通量

use super::{upwind, ElementChemFlux, FluxContext, RiverChemFlux};
use crate::hydrology::RiverFlux;
use crate::mesh::BankSide;

/// 计算河段 `i` 的通量
///
/// 河岸含水层通量直接取岸单元河岸边地下水通量的相反数，须在单元通量
/// 计算完成、河道交换扣除之前调用。
pub(super) fn river_fluxes(
    ctx: &FluxContext<'_>,
    elem_flux: &[ElementChemFlux],
    i: usize,
    out: &mut RiverChemFlux,
) {
    let n = ctx.tables.num_aqueous();
    let river = &ctx.mesh.rivers[i];
    let wf = &ctx.hydro.river_wf[i];
    let chem = &ctx.chem.rivers[i];
    let stream = &chem.stream.t_conc;
    let bed = &chem.bed.t_conc;
    let down = river.topo.down.map(|d| (&ctx.mesh.rivers[d], &ctx.chem.rivers[d]));

    // 下游河道
    let w = wf.get(RiverFlux::DownChanl2Chanl);
    let slot = &mut out.flux[RiverFlux::DownChanl2Chanl.idx()];
    for k in 0..n {
        slot[k] = match down {
            Some((_, dchem)) => upwind(w, stream[k], dchem.stream.t_conc[k]),
            None => w * stream[k],
        };
    }

    // 两岸
    for side in [BankSide::Left, BankSide::Right] {
        let Some(e) = river.bank(side) else {
            continue;
        };
        let echem = &ctx.chem.elements[e];

        let w = wf.get(RiverFlux::surf(side));
        for k in 0..n {
            let prcp = echem.prcp_conc.get(k).copied().unwrap_or(0.0) * ctx.params.condensation;
            out.flux[RiverFlux::surf(side).idx()][k] = upwind(w, stream[k], prcp);
        }

        let w = wf.get(RiverFlux::aquif2chanl(side));
        for k in 0..n {
            out.flux[RiverFlux::aquif2chanl(side).idx()][k] = upwind(w, stream[k], echem.gw.t_conc[k]);
        }

        if ctx.params.bedrock {
            if let Some(fbr) = echem.bedrock.as_ref() {
                let w = wf.get(RiverFlux::fbr2chanl(side));
                for k in 0..n {
                    out.flux[RiverFlux::fbr2chanl(side).idx()][k] = w * fbr.gw.t_conc[k];
                }
            }
        }

        if let Some(j) = ctx.mesh.bank_edge(e, i) {
            let subflux = &elem_flux[e].subflux[j];
            for k in 0..n {
                out.flux[RiverFlux::aquif2aquif(side).idx()][k] = -subflux[k];
            }
        }
    }

    // 渗漏
    let w = wf.get(RiverFlux::ChanlLkg);
    for k in 0..n {
        out.flux[RiverFlux::ChanlLkg.idx()][k] = upwind(w, stream[k], bed[k]);
    }

    // 下游河床
    let w = wf.get(RiverFlux::DownAquif2Aquif);
    let matl = &river.matl;
    for k in 0..n {
        out.flux[RiverFlux::DownAquif2Aquif.idx()][k] = match down {
            Some((down_river, dchem)) => ctx.kernel(
                k,
                bed[k],
                dchem.bed.t_conc[k],
                0.5 * (matl.smcmax() + down_river.matl.smcmax()),
                river.topo.dist_down,
                0.5 * (matl.bed_thickness + down_river.matl.bed_thickness) * river.topo.width,
                w,
            ),
            None => w * bed[k],
        };
    }
}
