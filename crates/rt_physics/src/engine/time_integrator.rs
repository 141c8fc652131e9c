// crates/rt_physics/src/engine/time_integrator.rs

//! 时间积分器接口
//!
//! 耦合系统为刚性 ODE，生产环境由外部刚性积分器推进，本模块只定义接口：
//!
//! - [`OdeRhs`]: 右端项回调 `dy/dt = f(t, y)`
//! - [`StiffIntegrator`]: 在 `[t0, t1]` 上推进状态向量
//!
//! 另提供两个显式参考实现，步长受 `max_step` 限制，用于测试与小算例：
//!
//! ### 前向欧拉
//!
//! ```text
//! y^{n+1} = y^n + h f(t^n, y^n)
//! ```
//!
//! ### SSP-RK2 (Heun 方法)
//!
//! ```text
//! y* = y^n + h f(t^n, y^n)
//! y^{n+1} = 0.5 y^n + 0.5 (y* + h f(t^n + h, y*))
//! ```
//!
//! 两者都是守恒通量的线性组合，流域内部交换不改变总摩尔数。

use rt_config::IntegratorConfig;
use rt_foundation::{RtError, RtResult};
use serde::Serialize;

/// 右端项回调
pub trait OdeRhs {
    /// 计算 `dy = f(t, y)`
    fn rhs(&mut self, t: f64, y: &[f64], dy: &mut [f64]) -> RtResult<()>;
}

/// 积分统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationStats {
    /// 内部步数
    pub steps: usize,
    /// 右端项求值次数
    pub rhs_evals: usize,
}

impl IntegrationStats {
    /// 合并统计
    pub fn merge(&mut self, other: IntegrationStats) {
        self.steps += other.steps;
        self.rhs_evals += other.rhs_evals;
    }
}

/// 刚性积分器接口
pub trait StiffIntegrator: Send {
    /// 积分器名称
    fn name(&self) -> &'static str;

    /// 从 `t0` 推进到 `t1`，原地更新 `y`
    fn integrate(
        &mut self,
        rhs: &mut dyn OdeRhs,
        y: &mut [f64],
        t0: f64,
        t1: f64,
    ) -> RtResult<IntegrationStats>;
}

/// 校验区间并给出内部步数
fn substeps(max_step: f64, t0: f64, t1: f64) -> RtResult<usize> {
    if !(max_step > 0.0) || !max_step.is_finite() {
        return Err(RtError::integrator(format!("最大步长必须为正: {}", max_step)));
    }
    if !(t1 >= t0) {
        return Err(RtError::integrator(format!("积分区间无效: [{}, {}]", t0, t1)));
    }
    Ok(((t1 - t0) / max_step).ceil() as usize)
}

// ============================================================================
// 前向欧拉
// ============================================================================

/// 一阶前向欧拉（参考实现）
#[derive(Debug, Clone)]
pub struct ForwardEuler {
    max_step: f64,
    dy: Vec<f64>,
}

impl ForwardEuler {
    /// 创建前向欧拉积分器
    pub fn new(max_step: f64) -> Self {
        Self {
            max_step,
            dy: Vec::new(),
        }
    }

    /// 由积分器参数创建，步长上限取 `maxstep`
    pub fn from_config(config: &IntegratorConfig) -> Self {
        Self::new(config.maxstep)
    }

    /// 最大步长
    pub fn max_step(&self) -> f64 {
        self.max_step
    }
}

impl StiffIntegrator for ForwardEuler {
    fn name(&self) -> &'static str {
        "ForwardEuler"
    }

    fn integrate(
        &mut self,
        rhs: &mut dyn OdeRhs,
        y: &mut [f64],
        t0: f64,
        t1: f64,
    ) -> RtResult<IntegrationStats> {
        let n_steps = substeps(self.max_step, t0, t1)?;
        let h = if n_steps > 0 { (t1 - t0) / n_steps as f64 } else { 0.0 };
        self.dy.resize(y.len(), 0.0);

        let mut stats = IntegrationStats::default();
        for step in 0..n_steps {
            let t = t0 + step as f64 * h;
            rhs.rhs(t, y, &mut self.dy)?;
            stats.rhs_evals += 1;

            // y^{n+1} = y^n + h f(y^n)
            for (yi, di) in y.iter_mut().zip(&self.dy) {
                *yi += h * di;
            }
            stats.steps += 1;
        }
        Ok(stats)
    }
}

// ============================================================================
// SSP-RK2
// ============================================================================

/// SSP-RK2 (二阶 Heun 方法，参考实现)
#[derive(Debug, Clone)]
pub struct SspRk2 {
    max_step: f64,
    y_1: Vec<f64>,
    rhs_1: Vec<f64>,
    rhs_2: Vec<f64>,
}

impl SspRk2 {
    /// 创建 SSP-RK2 积分器
    pub fn new(max_step: f64) -> Self {
        Self {
            max_step,
            y_1: Vec::new(),
            rhs_1: Vec::new(),
            rhs_2: Vec::new(),
        }
    }

    /// 由积分器参数创建
    pub fn from_config(config: &IntegratorConfig) -> Self {
        Self::new(config.maxstep)
    }
}

impl StiffIntegrator for SspRk2 {
    fn name(&self) -> &'static str {
        "SSP-RK2"
    }

    fn integrate(
        &mut self,
        rhs: &mut dyn OdeRhs,
        y: &mut [f64],
        t0: f64,
        t1: f64,
    ) -> RtResult<IntegrationStats> {
        let n_steps = substeps(self.max_step, t0, t1)?;
        let h = if n_steps > 0 { (t1 - t0) / n_steps as f64 } else { 0.0 };
        let n = y.len();
        self.y_1.resize(n, 0.0);
        self.rhs_1.resize(n, 0.0);
        self.rhs_2.resize(n, 0.0);

        let mut stats = IntegrationStats::default();
        for step in 0..n_steps {
            let t = t0 + step as f64 * h;

            // Stage 1: y* = y^n + h f(y^n)
            rhs.rhs(t, y, &mut self.rhs_1)?;
            for ((y1, yi), di) in self.y_1.iter_mut().zip(y.iter()).zip(&self.rhs_1) {
                *y1 = yi + h * di;
            }

            // Stage 2: y^{n+1} = 0.5 y^n + 0.5 (y* + h f(y*))
            rhs.rhs(t + h, &self.y_1, &mut self.rhs_2)?;
            for ((yi, y1), di) in y.iter_mut().zip(&self.y_1).zip(&self.rhs_2) {
                *yi = 0.5 * *yi + 0.5 * (y1 + h * di);
            }

            stats.rhs_evals += 2;
            stats.steps += 1;
        }
        Ok(stats)
    }
}
