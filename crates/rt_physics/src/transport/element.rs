// crates/rt_physics/src/transport/element.rs

//! 单元界面溶质通量

use super::{upwind, ElementChemFlux, FluxContext};
use crate::hydrology::RiverFlux;
use crate::mesh::{BedrockBoundary, NUM_EDGE};

/// 计算单元 `i` 的全部通量
///
/// 相邻单元之间的参数均以 `0.5 * (a + b)` 形式取平均，两侧求值输入逐位相同。
pub(super) fn element_fluxes(ctx: &FluxContext<'_>, i: usize, out: &mut ElementChemFlux) {
    let n = ctx.tables.num_aqueous();
    let elem = &ctx.mesh.elements[i];
    let wf = &ctx.hydro.elem_wf[i];
    let ws = &ctx.hydro.elem_ws[i];
    let chem = &ctx.chem.elements[i];
    let area = elem.topo.area;
    let soil = &elem.soil;

    // 入渗与补给
    for k in 0..n {
        out.infil[k] = wf.infil
            * area
            * if wf.infil > 0.0 {
                chem.prcp_conc.get(k).copied().unwrap_or(0.0) * ctx.params.condensation
            } else {
                0.0
            };
        out.rechg[k] = ctx.kernel(
            k,
            chem.unsat.t_conc[k],
            chem.gw.t_conc[k],
            soil.smcmax,
            0.5 * soil.depth,
            area,
            wf.rechg * area,
        );
    }

    // 侧向通量
    for j in 0..NUM_EDGE {
        let len = elem.topo.edge_length[j];
        let dist = elem.topo.nabr_dist[j];

        if let Some(r) = elem.topo.nabr_river[j] {
            let Some(side) = ctx.mesh.bank_side(r, i) else {
                continue;
            };
            let river = &ctx.mesh.rivers[r];
            let bed = &ctx.chem.rivers[r].bed;
            let wflux = wf.subsurf[j] + ctx.hydro.river_wf[r].get(RiverFlux::aquif2chanl(side));
            let porosity = 0.5 * (soil.smcmax + river.matl.smcmax());
            let iface = 0.5 * (soil.depth + river.matl.bed_thickness) * len;
            for k in 0..n {
                out.subflux[j][k] = ctx.kernel(
                    k,
                    chem.gw.t_conc[k],
                    bed.t_conc[k],
                    porosity,
                    dist,
                    iface,
                    wflux,
                );
            }
        } else if let Some(nb) = elem.topo.nabr[j] {
            let nelem = &ctx.mesh.elements[nb];
            let nws = &ctx.hydro.elem_ws[nb];
            let nchem = &ctx.chem.elements[nb];
            let porosity = 0.5 * (soil.smcmax + nelem.soil.smcmax);
            let gw_iface = 0.5 * (soil.depth + nelem.soil.depth) * len;
            let unsat_iface =
                0.5 * ((soil.depth - ws.gw).max(0.0) + (nelem.soil.depth - nws.gw).max(0.0)) * len;
            for k in 0..n {
                out.subflux[j][k] = ctx.kernel(
                    k,
                    chem.gw.t_conc[k],
                    nchem.gw.t_conc[k],
                    porosity,
                    dist,
                    gw_iface,
                    wf.subsurf[j],
                );
                out.unsat_flux[j][k] = ctx.kernel(
                    k,
                    chem.unsat.t_conc[k],
                    nchem.unsat.t_conc[k],
                    porosity,
                    dist,
                    unsat_iface,
                    0.0,
                );
            }
        }
    }

    if ctx.params.bedrock {
        bedrock_fluxes(ctx, i, out);
    }
}

/// 基岩层通量
fn bedrock_fluxes(ctx: &FluxContext<'_>, i: usize, out: &mut ElementChemFlux) {
    let n = ctx.tables.num_aqueous();
    let elem = &ctx.mesh.elements[i];
    let wf = &ctx.hydro.elem_wf[i];
    let ws = &ctx.hydro.elem_ws[i];
    let chem = &ctx.chem.elements[i];
    let (Some(fbr), Some(fout)) = (chem.bedrock.as_ref(), out.bedrock.as_mut()) else {
        return;
    };
    let area = elem.topo.area;
    let geol = &elem.geol;

    for k in 0..n {
        // 回流取基岩非饱和区浓度
        fout.infil[k] = wf.fbr_infil
            * area
            * if wf.fbr_infil > 0.0 {
                chem.gw.t_conc[k]
            } else {
                fbr.unsat.t_conc[k]
            };
        fout.rechg[k] = ctx.kernel(
            k,
            fbr.unsat.t_conc[k],
            fbr.gw.t_conc[k],
            geol.smcmax,
            0.5 * geol.depth,
            area,
            wf.fbr_rechg * area,
        );
        fout.discharge[k] = wf.fbr_discharge * area * fbr.gw.t_conc[k];
    }

    for j in 0..NUM_EDGE {
        let neighbor = elem.topo.nabr[j].and_then(|nb| {
            ctx.chem.elements[nb]
                .bedrock
                .as_ref()
                .map(|nfbr| (nb, nfbr))
        });

        match neighbor {
            Some((nb, nfbr)) => {
                let ngeol = &ctx.mesh.elements[nb].geol;
                let nws = &ctx.hydro.elem_ws[nb];
                let len = elem.topo.edge_length[j];
                let dist = elem.topo.nabr_dist[j];
                let porosity = 0.5 * (geol.smcmax + ngeol.smcmax);
                let unsat_iface = 0.5
                    * ((geol.depth - ws.fbr_gw).max(0.0) + (ngeol.depth - nws.fbr_gw).max(0.0))
                    * len;
                let gw_iface = 0.5 * (ws.fbr_gw.max(0.0) + nws.fbr_gw.max(0.0)) * len;
                for k in 0..n {
                    fout.unsat_flux[j][k] = ctx.kernel(
                        k,
                        fbr.unsat.t_conc[k],
                        nfbr.unsat.t_conc[k],
                        porosity,
                        dist,
                        unsat_iface,
                        0.0,
                    );
                    fout.gw_flux[j][k] = ctx.kernel(
                        k,
                        fbr.gw.t_conc[k],
                        nfbr.gw.t_conc[k],
                        porosity,
                        dist,
                        gw_iface,
                        wf.fbrflow[j],
                    );
                }
            }
            None => {
                for k in 0..n {
                    fout.unsat_flux[j][k] = 0.0;
                    fout.gw_flux[j][k] = match &elem.fbr_bc[j] {
                        BedrockBoundary::NoFlow => 0.0,
                        BedrockBoundary::Flux { conc } => upwind(
                            wf.fbrflow[j],
                            fbr.gw.t_conc[k],
                            conc.get(k).copied().unwrap_or(0.0),
                        ),
                    };
                }
            }
        }
    }
}
