// crates/rt_physics/src/reaction/rates.rs

//! 动力学速率

use crate::chemistry::{ChemTables, RateLaw, SpeciesKind};
use crate::state::ChemState;

/// 各矿物的反应比表面积 [m²/L]，按 `mineral - first_mineral` 索引
///
/// 非饱和时按 `e^S − 1` 折减暴露面积。
pub fn reactive_area(tables: &ChemTables, chms: &ChemState, saturation: f64, surface_exposure: bool) -> Vec<f64> {
    let first = tables.first_mineral();
    let ratio = if surface_exposure && saturation < 1.0 {
        saturation.exp() - 1.0
    } else {
        1.0
    };
    (first..tables.num_primary())
        .map(|m| chms.ssa[m] * chms.p_conc[m] * tables.species(m).molar_mass * ratio)
        .collect()
}

/// 单个动力学反应速率 [mol/L/s]，正值为矿物溶解
///
/// `log_actv(j)` 返回初级物种 `j` 的 log10 活度，`conc` 为游离浓度（Monod 项使用）。
#[allow(clippy::too_many_arguments)]
pub fn kinetic_rate<F>(
    tables: &ChemTables,
    kin: usize,
    area: &[f64],
    log_actv: F,
    conc: &[f64],
    temperature: f64,
    apply_inhibition: bool,
) -> f64
where
    F: Fn(usize) -> f64,
{
    let reaction = &tables.kinetics()[kin];
    let a = area[reaction.mineral - tables.first_mineral()];
    let base = a * 10f64.powf(reaction.log_rate) * tables.rate_factor(kin, temperature);

    if reaction.rate_law.is_tst() {
        let stoich = tables.kinetic_stoich();
        let log_iap: f64 = (0..tables.num_primary())
            .filter(|&j| stoich[(kin, j)] != 0.0)
            .map(|j| stoich[(kin, j)] * log_actv(j))
            .sum();
        let log_dep: f64 = reaction.dependence.iter().map(|&(p, power)| power * log_actv(p)).sum();
        let log_k = tables.kinetic_log_k(kin, temperature);
        let rate = base * 10f64.powf(log_dep) * (1.0 - 10f64.powf(log_iap - log_k));
        reaction.rate_law.clip(rate)
    } else {
        debug_assert_eq!(reaction.rate_law, RateLaw::Monod);
        let monod: f64 = reaction
            .monod
            .iter()
            .map(|&(p, ks)| conc[p] / (conc[p] + ks))
            .product();
        let inhib: f64 = reaction
            .inhibition
            .iter()
            .map(|&(p, ki)| ki / (ki + conc[p]))
            .product();
        if apply_inhibition {
            base * monod * inhib
        } else {
            log::trace!("{} 抑制项 {:.3e} 未计入", reaction.label, inhib);
            base * monod
        }
    }
}

/// 将反应速率换算为各初级物种的净源项
///
/// 水相物种除以饱和度，由每升孔隙介质换算为每升水。
pub fn species_rates(tables: &ChemTables, rates: &[f64], saturation: f64, out: &mut [f64]) {
    let stoich = tables.kinetic_stoich();
    out.fill(0.0);
    for (kin, rate) in rates.iter().enumerate() {
        for (j, o) in out.iter_mut().enumerate() {
            *o += rate * stoich[(kin, j)];
        }
    }
    let inv_sat = 1.0 / saturation;
    for (j, o) in out.iter_mut().enumerate() {
        if tables.species(j).kind == SpeciesKind::Aqueous {
            *o *= inv_sat;
        }
    }
}
