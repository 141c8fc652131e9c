// crates/rt_physics/src/reaction/speciation.rs

//! 平衡形态计算
//!
//! 不含动力学、步长为零的纯平衡求解：给定总浓度求游离浓度、活度与次级
//! 浓度。活度系数每次迭代按当前离子强度重算。
//!
//! 固定 pH 模式下 H+ 行约束其活度等于输入值，求解后 H+ 总浓度取平衡总量。

use nalgebra::DMatrix;
use rt_config::ReactionConfig;

use super::activity::activity_coefficients;
use super::newton::{initial_log_conc, solve_clamped, totals, update_secondaries, NewtonFailure};
use crate::chemistry::ChemTables;
use crate::state::ChemState;

/// 平衡形态求解的最大迭代次数下限，初值可能远离平衡
const MIN_SPECIATION_ITERATIONS: usize = 50;

struct Residual<'a> {
    tables: &'a ChemTables,
    log_k: &'a [f64],
    target: &'a [f64],
    /// (H+ 位置, log10 目标活度)
    fixed: Option<(usize, f64)>,
}

impl Residual<'_> {
    /// 更新次级浓度并计算残差，`tot` 返回总浓度
    fn eval(&self, x: &mut [f64], gamma: &[f64], tot: &mut [f64], res: &mut [f64]) {
        update_secondaries(self.tables, x, gamma, self.log_k);
        totals(self.tables, x, tot);
        for i in 0..res.len() {
            res[i] = match self.fixed {
                Some((h, log_a)) if h == i => x[h] + gamma[h] - log_a,
                _ => tot[i] - self.target[i],
            };
        }
    }

    fn relative_error(&self, i: usize, res: f64, tot: f64) -> f64 {
        match self.fixed {
            Some((h, _)) if h == i => res.abs(),
            _ => (res / tot).abs(),
        }
    }
}

/// 求解单区平衡形态，返回迭代次数
///
/// 失败时 `chms` 不变。
pub fn speciate_step(
    tables: &ChemTables,
    config: &ReactionConfig,
    chms: &mut ChemState,
    fix_proton: bool,
) -> Result<usize, NewtonFailure> {
    let np = tables.num_primary();
    let nsec = tables.num_secondary();
    let nsdc = tables.num_sdc();
    let temperature = chms.temperature;

    let mut x = initial_log_conc(chms);
    let mut gamma = vec![0.0; np + nsec];
    let log_k: Vec<f64> = (0..nsec).map(|s| tables.secondary_log_k(s, temperature)).collect();
    let fixed = if fix_proton {
        tables
            .proton()
            .filter(|&h| h < nsdc && chms.t_conc[h] > 0.0)
            .map(|h| (h, chms.t_conc[h].log10()))
    } else {
        None
    };
    let target = chms.t_conc[..nsdc].to_vec();
    let system = Residual {
        tables,
        log_k: &log_k,
        target: &target,
        fixed,
    };

    let mut tot = vec![0.0; nsdc];
    let mut trial_tot = vec![0.0; nsdc];
    let mut res = vec![0.0; nsdc];
    let mut trial = vec![0.0; nsdc];
    let mut jac: DMatrix<f64> = DMatrix::zeros(nsdc, nsdc);
    let delta = config.perturbation;
    let max_iterations = config.max_iterations.max(MIN_SPECIATION_ITERATIONS);
    let mut iterations = 0;

    while nsdc > 0 {
        activity_coefficients(tables, &x, 1.0, temperature, &mut gamma);
        system.eval(&mut x, &gamma, &mut tot, &mut res);

        for k in 0..nsdc {
            x[k] += delta;
            system.eval(&mut x, &gamma, &mut trial_tot, &mut trial);
            for i in 0..nsdc {
                jac[(i, k)] = (trial[i] - res[i]) / delta;
            }
            x[k] -= delta;
        }

        let step = solve_clamped(&jac, &res, config.max_log_step)?;
        let mut max_error: f64 = 0.0;
        for i in 0..nsdc {
            x[i] += step[i];
            let err = system.relative_error(i, res[i], tot[i]);
            if !err.is_finite() {
                return Err(NewtonFailure::NonFinite);
            }
            max_error = max_error.max(err);
        }

        iterations += 1;
        if iterations > max_iterations {
            return Err(NewtonFailure::MaxIterations);
        }
        if max_error <= config.tolerance {
            break;
        }
    }

    activity_coefficients(tables, &x, 1.0, temperature, &mut gamma);
    system.eval(&mut x, &gamma, &mut tot, &mut res);

    for i in 0..np {
        if tables.species(i).is_mineral() {
            chms.p_conc[i] = chms.t_conc[i];
            chms.p_actv[i] = 1.0;
        } else {
            chms.p_conc[i] = 10f64.powf(x[i]);
            chms.p_actv[i] = 10f64.powf(x[i] + gamma[i]);
        }
    }
    if let Some((h, _)) = fixed {
        chms.t_conc[h] = tot[h];
    }
    for sec in 0..nsec {
        chms.s_conc[sec] = 10f64.powf(x[np + sec]);
    }

    Ok(iterations)
}
