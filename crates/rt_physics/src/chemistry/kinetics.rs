// crates/rt_physics/src/chemistry/kinetics.rs

//! 动力学反应表

use rt_config::RateLawConfig;

/// 速率律
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLaw {
    /// 过渡态理论: `area·10^k·Π a^p·(1 − IAP/K)`
    Tst,
    /// 只保留 TST 速率的负值（沉淀）
    PrecipitationOnly,
    /// 只保留 TST 速率的正值（溶解）
    DissolutionOnly,
    /// Monod: `area·10^k·Π c/(c + Ks)`
    Monod,
}

impl From<RateLawConfig> for RateLaw {
    fn from(law: RateLawConfig) -> Self {
        match law {
            RateLawConfig::Tst => Self::Tst,
            RateLawConfig::PrecipitationOnly => Self::PrecipitationOnly,
            RateLawConfig::DissolutionOnly => Self::DissolutionOnly,
            RateLawConfig::Monod => Self::Monod,
        }
    }
}

impl RateLaw {
    /// 是否使用 TST 形式
    #[inline]
    pub fn is_tst(self) -> bool {
        !matches!(self, Self::Monod)
    }

    /// 按速率律方向截断 TST 速率
    #[inline]
    pub fn clip(self, rate: f64) -> f64 {
        match self {
            Self::PrecipitationOnly => rate.min(0.0),
            Self::DissolutionOnly => rate.max(0.0),
            _ => rate,
        }
    }
}

/// 动力学反应
///
/// 所有位置均为物种表中的初级物种索引。
#[derive(Debug, Clone)]
pub struct KineticReaction {
    /// 反应标签
    pub label: String,
    /// 目标矿物（初级物种索引）
    pub mineral: usize,
    /// 速率律
    pub rate_law: RateLaw,
    /// log10 基准速率（已含标定偏移）
    pub log_rate: f64,
    /// 活化能 [kJ/mol]
    pub activation_energy: f64,
    /// 幂律依赖项 (位置, 幂次)
    pub dependence: Vec<(usize, f64)>,
    /// Monod 项 (位置, 半饱和常数)
    pub monod: Vec<(usize, f64)>,
    /// 抑制项 (位置, 抑制常数)
    pub inhibition: Vec<(usize, f64)>,
    /// 生物量物种
    pub biomass: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_direction() {
        assert_eq!(RateLaw::PrecipitationOnly.clip(2.0), 0.0);
        assert_eq!(RateLaw::PrecipitationOnly.clip(-2.0), -2.0);
        assert_eq!(RateLaw::DissolutionOnly.clip(-2.0), 0.0);
        assert_eq!(RateLaw::Tst.clip(-2.0), -2.0);
        assert!(!RateLaw::Monod.is_tst());
    }
}
