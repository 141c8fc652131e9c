// crates/rt_physics/src/reaction/activity.rs

//! 活度系数（log10）
//!
//! | 类别 | 活度系数 |
//! |------|----------|
//! | 水相 | `−A z² √I / (1 + B·size·√I) + ḃ·I` |
//! | 吸附 | `log10 S` |
//! | 阳离子交换 | `−log10 Σ c_cex` |
//! | 矿物 | `−log10 c`（活度恒为 1） |

use crate::chemistry::{ChemTables, SpeciesKind};

/// 离子强度 `I = ½ Σ c z²`，对全部物种求和
pub fn ionic_strength(tables: &ChemTables, log_conc: &[f64]) -> f64 {
    tables
        .all_species()
        .iter()
        .zip(log_conc)
        .map(|(sp, x)| 0.5 * 10f64.powf(*x) * sp.charge * sp.charge)
        .sum()
}

/// 计算全部物种的 log10 活度系数
///
/// `log_conc` 与 `gamma` 长度为初级与次级物种总数。
pub fn activity_coefficients(
    tables: &ChemTables,
    log_conc: &[f64],
    saturation: f64,
    temperature: f64,
    gamma: &mut [f64],
) {
    let (adh, bdh, bdot) = tables.debye_huckel(temperature);
    let species = tables.all_species();

    let tot_cec: f64 = species
        .iter()
        .zip(log_conc)
        .filter(|(sp, _)| sp.kind == SpeciesKind::CationExchange)
        .map(|(_, x)| 10f64.powf(*x))
        .sum();
    let log_cec = if tot_cec > 0.0 { -tot_cec.log10() } else { 0.0 };

    let ionic = ionic_strength(tables, log_conc);
    let root = ionic.sqrt();

    for (i, sp) in species.iter().enumerate() {
        gamma[i] = match sp.kind {
            SpeciesKind::Aqueous => {
                let z2 = sp.charge * sp.charge;
                -adh * z2 * root / (1.0 + bdh * sp.size_factor * root) + bdot * ionic
            }
            SpeciesKind::Adsorption => saturation.log10(),
            SpeciesKind::CationExchange => log_cec,
            SpeciesKind::Mineral => -log_conc[i],
        };
    }
}
