// crates/rt_physics/src/reaction/newton.rs

//! 单区单步反应 Newton 求解
//!
//! 未知量为非矿物初级物种的 log10 游离浓度 `x`。残差
//!
//! ```text
//! r_i = Σ_j T_ij · 10^x_j − (c_i + (R0_i + R_i) · dt / 2)
//! ```
//!
//! 其中 `R0` 为步初速率，`R` 为迭代点速率（梯形格式）。Jacobian 由对数空间
//! 前向差分得到，差分时速率保持不变。失败时区状态不变，由调用方缩步重试。

use nalgebra::{DMatrix, DVector};
use rt_config::ReactionConfig;
use rt_foundation::constants::{MINERAL_CUTOFF, ZERO_CONC};
use thiserror::Error;

use super::activity::activity_coefficients;
use super::rates::{kinetic_rate, reactive_area, species_rates};
use crate::chemistry::ChemTables;
use crate::state::ChemState;

/// Newton 迭代失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NewtonFailure {
    /// Jacobian 奇异
    #[error("Jacobian 矩阵奇异")]
    Singular,
    /// 超过最大迭代次数
    #[error("超过最大迭代次数")]
    MaxIterations,
    /// 残差出现非有限值
    #[error("残差出现非有限值")]
    NonFinite,
}

// ============================================================================
// 公共步骤
// ============================================================================

/// 由初级物种 log 浓度计算次级物种 log 浓度
pub(crate) fn update_secondaries(tables: &ChemTables, x: &mut [f64], gamma: &[f64], log_k: &[f64]) {
    let np = tables.num_primary();
    let nsdc = tables.num_sdc();
    let dep = tables.dependency();
    for (sec, lk) in log_k.iter().enumerate() {
        let mut v = 0.0;
        for j in 0..nsdc {
            let d = dep[(sec, j)];
            if d != 0.0 {
                v += d * (x[j] + gamma[j]);
            }
        }
        x[np + sec] = v - lk - gamma[np + sec];
    }
}

/// 非矿物初级物种总浓度 `Σ_j T_ij · 10^x_j`
pub(crate) fn totals(tables: &ChemTables, x: &[f64], out: &mut [f64]) {
    let total = tables.total_conc();
    for (i, o) in out.iter_mut().enumerate() {
        *o = x
            .iter()
            .enumerate()
            .filter(|(j, _)| total[(i, *j)] != 0.0)
            .map(|(j, xj)| total[(i, j)] * 10f64.powf(*xj))
            .sum();
    }
}

/// 求解 `J Δ = −r` 并将步长截断到 `±max_step`
pub(crate) fn solve_clamped(
    jac: &DMatrix<f64>,
    residual: &[f64],
    max_step: f64,
) -> Result<DVector<f64>, NewtonFailure> {
    let rhs = DVector::from_iterator(residual.len(), residual.iter().map(|r| -r));
    let mut step = jac.clone().lu().solve(&rhs).ok_or(NewtonFailure::Singular)?;
    step.apply(|v| *v = v.clamp(-max_step, max_step));
    Ok(step)
}

/// 初始 log 浓度（初级在前，次级在后）
pub(crate) fn initial_log_conc(chms: &ChemState) -> Vec<f64> {
    chms.p_conc
        .iter()
        .chain(&chms.s_conc)
        .map(|c| c.max(ZERO_CONC).log10())
        .collect()
}

// ============================================================================
// 反应步
// ============================================================================

/// 以步长 `dt` 推进单区反应，返回迭代次数
///
/// 成功时写回总浓度、游离浓度、活度与次级浓度；失败时 `chms` 不变。
pub fn react_step(
    tables: &ChemTables,
    config: &ReactionConfig,
    chms: &mut ChemState,
    saturation: f64,
    dt: f64,
) -> Result<usize, NewtonFailure> {
    let np = tables.num_primary();
    let nsec = tables.num_secondary();
    let nsdc = tables.num_sdc();
    let nkin = tables.num_kinetic();
    let first_mineral = tables.first_mineral();
    let temperature = chms.temperature;
    let apply_inhibition = config.apply_monod_inhibition;

    let mut x = initial_log_conc(chms);
    let mut gamma = vec![0.0; np + nsec];
    activity_coefficients(tables, &x, saturation, temperature, &mut gamma);
    let log_k: Vec<f64> = (0..nsec).map(|s| tables.secondary_log_k(s, temperature)).collect();

    // 步初速率
    let mut area = reactive_area(tables, chms, saturation, config.surface_exposure);
    let log_actv0: Vec<f64> = chms.p_actv.iter().map(|a| a.max(ZERO_CONC).log10()).collect();
    let rates0: Vec<f64> = (0..nkin)
        .map(|k| {
            kinetic_rate(
                tables,
                k,
                &area,
                |j| log_actv0[j],
                &chms.p_conc,
                temperature,
                apply_inhibition,
            )
        })
        .collect();
    let mut r0 = vec![0.0; np];
    species_rates(tables, &rates0, saturation, &mut r0);

    // 矿物浓度低于截断值且速率为负时，后续迭代的反应面积取 0
    for (k, rate) in rates0.iter().enumerate() {
        let m = tables.kinetics()[k].mineral;
        if *rate < 0.0 && chms.p_conc[m] < MINERAL_CUTOFF {
            area[m - first_mineral] = 0.0;
        }
    }

    let half_dt = 0.5 * dt;
    let mut rates = vec![0.0; nkin];
    let mut rt = vec![0.0; np];
    let mut iterations = 0;

    if nsdc > 0 {
        let mut totconc = vec![0.0; nsdc];
        let mut trial = vec![0.0; nsdc];
        let mut residual = vec![0.0; nsdc];
        let mut jac: DMatrix<f64> = DMatrix::zeros(nsdc, nsdc);
        let refresh = config.jacobian_refresh.max(1);
        let delta = config.perturbation;

        loop {
            update_secondaries(tables, &mut x, &gamma, &log_k);
            for (k, r) in rates.iter_mut().enumerate() {
                *r = kinetic_rate(
                    tables,
                    k,
                    &area,
                    |j| {
                        if tables.species(j).is_mineral() {
                            0.0
                        } else {
                            x[j] + gamma[j]
                        }
                    },
                    &chms.p_conc,
                    temperature,
                    apply_inhibition,
                );
            }
            species_rates(tables, &rates, saturation, &mut rt);

            totals(tables, &x, &mut totconc);
            for i in 0..nsdc {
                residual[i] = totconc[i] - (chms.t_conc[i] + (r0[i] + rt[i]) * half_dt);
            }

            if iterations % refresh == 0 {
                for k in 0..nsdc {
                    x[k] += delta;
                    update_secondaries(tables, &mut x, &gamma, &log_k);
                    totals(tables, &x, &mut trial);
                    for i in 0..nsdc {
                        let r_t = trial[i] - (chms.t_conc[i] + (r0[i] + rt[i]) * half_dt);
                        jac[(i, k)] = (r_t - residual[i]) / delta;
                    }
                    x[k] -= delta;
                }
            }

            let step = solve_clamped(&jac, &residual, config.max_log_step)?;
            let mut max_error: f64 = 0.0;
            for i in 0..nsdc {
                x[i] += step[i];
                let err = (residual[i] / totconc[i]).abs();
                if !err.is_finite() {
                    return Err(NewtonFailure::NonFinite);
                }
                max_error = max_error.max(err);
            }

            iterations += 1;
            if iterations > config.max_iterations {
                return Err(NewtonFailure::MaxIterations);
            }
            if max_error <= config.tolerance {
                break;
            }
        }
    }

    // 收敛后写回
    update_secondaries(tables, &mut x, &gamma, &log_k);
    let mut totconc = vec![0.0; nsdc];
    totals(tables, &x, &mut totconc);

    for i in 0..np {
        if tables.species(i).is_mineral() {
            chms.t_conc[i] += (r0[i] + rt[i]) * half_dt;
            chms.p_actv[i] = 1.0;
            chms.p_conc[i] = chms.t_conc[i];
        } else {
            chms.p_conc[i] = 10f64.powf(x[i]);
            chms.p_actv[i] = 10f64.powf(x[i] + gamma[i]);
            chms.t_conc[i] = totconc[i];
        }
    }
    for sec in 0..nsec {
        chms.s_conc[sec] = 10f64.powf(x[np + sec]);
    }

    Ok(iterations)
}
