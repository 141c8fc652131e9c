// crates/rt_config/src/run_config.rs

//! RtConfig - 反应输运运行配置
//!
//! 定义时间控制、积分器容差、反应求解器参数、输运系数、氮输入
//! 以及能力开关。配置以 JSON 存储，所有字段均有默认值。

use serde::{Deserialize, Serialize};
use std::path::Path;

use rt_foundation::constants::{DEPTHR, SPECIATION_STEP};

use crate::chemistry::ChemistryConfig;
use crate::error::ConfigError;

/// 反应输运运行配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RtConfig {
    /// 能力开关
    #[serde(default)]
    pub capabilities: Capabilities,

    /// 时间控制
    #[serde(default)]
    pub time: TimeConfig,

    /// 外部积分器参数
    #[serde(default)]
    pub integrator: IntegratorConfig,

    /// 反应求解器参数
    #[serde(default)]
    pub reaction: ReactionConfig,

    /// 输运参数
    #[serde(default)]
    pub transport: TransportConfig,

    /// 氮输入
    #[serde(default)]
    pub nitrogen: NitrogenConfig,

    /// 化学体系
    #[serde(default)]
    pub chemistry: ChemistryConfig,
}

// ============================================================
// 能力开关
// ============================================================

/// 能力开关
///
/// 在启动时选择区集合与计算分支。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// 溶质输运
    #[serde(default = "default_true")]
    pub transport: bool,

    /// 动力学反应
    #[serde(default)]
    pub reaction: bool,

    /// 裂隙基岩层
    #[serde(default)]
    pub bedrock: bool,

    /// 矿质氮输运
    #[serde(default)]
    pub nitrogen: bool,
}

fn default_true() -> bool { true }

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            transport: true,
            reaction: false,
            bedrock: false,
            nitrogen: false,
        }
    }
}

// ============================================================
// 时间控制
// ============================================================

/// 时间控制参数，单位均为秒
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// 起始时间
    #[serde(default)]
    pub start: f64,

    /// 报告间隔（一次驱动推进的长度）
    #[serde(default = "default_stepsize")]
    pub stepsize: f64,

    /// 反应算子分裂间隔
    #[serde(default = "default_reaction_step")]
    pub reaction_step: f64,

    /// 反应启动延迟
    #[serde(default)]
    pub reaction_delay: f64,

    /// 河流形态计算间隔
    #[serde(default = "default_speciation_step")]
    pub speciation_step: f64,
}

fn default_stepsize() -> f64 { 60.0 }
fn default_reaction_step() -> f64 { 3600.0 }
fn default_speciation_step() -> f64 { SPECIATION_STEP }

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            start: 0.0,
            stepsize: default_stepsize(),
            reaction_step: default_reaction_step(),
            reaction_delay: 0.0,
            speciation_step: default_speciation_step(),
        }
    }
}

// ============================================================
// 积分器
// ============================================================

/// 外部刚性积分器参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegratorConfig {
    /// 绝对容差
    #[serde(default = "default_abstol")]
    pub abstol: f64,

    /// 相对容差
    #[serde(default = "default_reltol")]
    pub reltol: f64,

    /// 初始步长 [s]
    #[serde(default = "default_initstep")]
    pub initstep: f64,

    /// 最大步长 [s]
    #[serde(default = "default_maxstep")]
    pub maxstep: f64,
}

fn default_abstol() -> f64 { 1e-4 }
fn default_reltol() -> f64 { 1e-3 }
fn default_initstep() -> f64 { 1.0 }
fn default_maxstep() -> f64 { 60.0 }

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            abstol: default_abstol(),
            reltol: default_reltol(),
            initstep: default_initstep(),
            maxstep: default_maxstep(),
        }
    }
}

// ============================================================
// 反应求解器
// ============================================================

/// 反应求解器参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionConfig {
    /// Newton 最大迭代次数
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// 相对残差收敛容差
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// 有限差分 Jacobian 的对数空间扰动
    #[serde(default = "default_perturbation")]
    pub perturbation: f64,

    /// 单步对数浓度更新上限
    #[serde(default = "default_max_log_step")]
    pub max_log_step: f64,

    /// 子步长下限 [s]
    #[serde(default = "default_min_substep")]
    pub min_substep: f64,

    /// 最小饱和度，低于该值视为干区
    #[serde(default = "default_min_saturation")]
    pub min_saturation: f64,

    /// 最小地下水位 [m]，低于该值跳过单元反应
    #[serde(default = "default_min_groundwater")]
    pub min_groundwater: f64,

    /// Jacobian 刷新间隔（迭代数）
    #[serde(default = "default_jacobian_refresh")]
    pub jacobian_refresh: usize,

    /// 非饱和时按 exp(S)-1 缩放反应面积
    #[serde(default = "default_true")]
    pub surface_exposure: bool,

    /// Monod 速率是否乘以抑制项
    #[serde(default)]
    pub apply_monod_inhibition: bool,
}

fn default_max_iterations() -> usize { 10 }
fn default_tolerance() -> f64 { 1e-7 }
fn default_perturbation() -> f64 { 1e-2 }
fn default_max_log_step() -> f64 { 0.3 }
fn default_min_substep() -> f64 { 30.0 }
fn default_min_saturation() -> f64 { 1e-2 }
fn default_min_groundwater() -> f64 { 1e-3 }
fn default_jacobian_refresh() -> usize { 1 }

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            perturbation: default_perturbation(),
            max_log_step: default_max_log_step(),
            min_substep: default_min_substep(),
            min_saturation: default_min_saturation(),
            min_groundwater: default_min_groundwater(),
            jacobian_refresh: default_jacobian_refresh(),
            surface_exposure: true,
            apply_monod_inhibition: false,
        }
    }
}

// ============================================================
// 输运
// ============================================================

/// 输运参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// 干区储水阈值 [m]
    #[serde(default = "default_depth_threshold")]
    pub depth_threshold: f64,

    /// 降水浓缩因子
    #[serde(default = "default_condensation")]
    pub condensation: f64,

    /// 胶结指数（孔隙度幂次）
    #[serde(default = "default_cementation")]
    pub cementation: f64,

    /// 默认扩散系数 [m²/s]
    #[serde(default = "default_diffusion")]
    pub diffusion: f64,

    /// 默认弥散度 [m]
    #[serde(default)]
    pub dispersion: f64,
}

fn default_depth_threshold() -> f64 { DEPTHR }
fn default_condensation() -> f64 { 1.0 }
fn default_cementation() -> f64 { 1.0 }
fn default_diffusion() -> f64 { 1e-9 }

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            depth_threshold: default_depth_threshold(),
            condensation: default_condensation(),
            cementation: default_cementation(),
            diffusion: default_diffusion(),
            dispersion: 0.0,
        }
    }
}

// ============================================================
// 氮输入
// ============================================================

/// 矿质氮输入与迁移
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NitrogenConfig {
    /// 大气沉降 [kgN/m²/yr]
    #[serde(default)]
    pub ndep: f64,

    /// 生物固氮 [kgN/m²/yr]
    #[serde(default)]
    pub nfix: f64,

    /// 可随土壤水迁移的矿质氮比例
    #[serde(default = "default_mobile_fraction")]
    pub mobile_fraction: f64,
}

fn default_mobile_fraction() -> f64 { 0.1 }

impl Default for NitrogenConfig {
    fn default() -> Self {
        Self {
            ndep: 0.0,
            nfix: 0.0,
            mobile_fraction: default_mobile_fraction(),
        }
    }
}

// ============================================================
// 加载与校验
// ============================================================

fn check_positive(key: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, value, "必须为正的有限值"))
    }
}

fn check_non_negative(key: &str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, value, "不能为负"))
    }
}

impl RtConfig {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// 从 JSON 字符串加载配置
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: RtConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("time.stepsize", self.time.stepsize)?;
        check_positive("time.reaction_step", self.time.reaction_step)?;
        check_positive("time.speciation_step", self.time.speciation_step)?;
        check_non_negative("time.reaction_delay", self.time.reaction_delay)?;

        check_positive("integrator.abstol", self.integrator.abstol)?;
        check_positive("integrator.reltol", self.integrator.reltol)?;
        check_positive("integrator.initstep", self.integrator.initstep)?;
        check_positive("integrator.maxstep", self.integrator.maxstep)?;
        if self.integrator.initstep > self.integrator.maxstep {
            return Err(ConfigError::invalid(
                "integrator.initstep",
                self.integrator.initstep,
                "初始步长不能超过最大步长",
            ));
        }

        let r = &self.reaction;
        if r.max_iterations == 0 {
            return Err(ConfigError::invalid("reaction.max_iterations", 0, "至少为 1"));
        }
        if r.jacobian_refresh == 0 {
            return Err(ConfigError::invalid("reaction.jacobian_refresh", 0, "至少为 1"));
        }
        check_positive("reaction.tolerance", r.tolerance)?;
        check_positive("reaction.perturbation", r.perturbation)?;
        check_positive("reaction.max_log_step", r.max_log_step)?;
        check_positive("reaction.min_substep", r.min_substep)?;
        check_non_negative("reaction.min_saturation", r.min_saturation)?;
        check_non_negative("reaction.min_groundwater", r.min_groundwater)?;

        let t = &self.transport;
        check_positive("transport.depth_threshold", t.depth_threshold)?;
        check_non_negative("transport.condensation", t.condensation)?;
        check_non_negative("transport.cementation", t.cementation)?;
        check_non_negative("transport.diffusion", t.diffusion)?;
        check_non_negative("transport.dispersion", t.dispersion)?;

        check_non_negative("nitrogen.ndep", self.nitrogen.ndep)?;
        check_non_negative("nitrogen.nfix", self.nitrogen.nfix)?;
        if !(0.0..=1.0).contains(&self.nitrogen.mobile_fraction) {
            return Err(ConfigError::invalid(
                "nitrogen.mobile_fraction",
                self.nitrogen.mobile_fraction,
                "必须在 [0, 1] 内",
            ));
        }

        if self.capabilities.reaction && !self.capabilities.transport {
            return Err(ConfigError::invalid(
                "capabilities.reaction",
                true,
                "启用反应时必须启用输运",
            ));
        }
        if self.capabilities.transport && self.chemistry.is_empty() {
            return Err(ConfigError::Missing("chemistry.primary".to_string()));
        }

        self.chemistry.validate()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }
}
