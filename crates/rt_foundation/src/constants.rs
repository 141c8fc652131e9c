// crates/rt_foundation/src/constants.rs

//! 物理常量
//!
//! 水文、输运与化学模块共享的数值常量。所有时间单位为秒，长度单位为米。

/// 最小有效水深 [m]
///
/// 储水量不超过该值的控制体视为干涸，派生浓度严格为 0。
pub const DEPTHR: f64 = 1e-6;

/// 浓度下限 [mol/L]
///
/// 次级物种与非水相物种的初始浓度。
pub const ZERO_CONC: f64 = 1e-20;

/// 一天的秒数
pub const DAY_IN_SEC: f64 = 86_400.0;

/// 一年的天数
pub const DAYS_PER_YEAR: f64 = 365.0;

/// 河流形态计算默认步长 [s]
pub const SPECIATION_STEP: f64 = 3_600.0;

/// 理想气体常数 [J/(mol·K)]
pub const GAS_CONSTANT: f64 = 8.314;

/// 摄氏度到开尔文的偏移
pub const KELVIN_OFFSET: f64 = 273.15;

/// 土壤颗粒密度 [kg/m³]，用于吸附与阳离子交换容量换算
pub const SOIL_PARTICLE_DENSITY: f64 = 2_650.0;

/// 矿物浓度截断阈值 [mol/L]
///
/// 低于该浓度的矿物在溶解方向上反应面积置零。
pub const MINERAL_CUTOFF: f64 = 1e-8;
