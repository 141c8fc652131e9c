// crates/rt_physics/src/forcing/precip.rs

//! 降水浓度驱动

use rt_foundation::{RtError, RtResult};

use super::timeseries::TimeSeries;

/// 降水浓度（按输运物种）
#[derive(Debug, Clone)]
pub enum PrcpConcForcing {
    /// 恒定浓度
    Constant(Vec<f64>),
    /// 逐物种时间序列
    Series(Vec<TimeSeries>),
}

impl PrcpConcForcing {
    /// 物种数
    pub fn num_species(&self) -> usize {
        match self {
            Self::Constant(c) => c.len(),
            Self::Series(s) => s.len(),
        }
    }

    /// 检查物种数
    pub fn check(&self, num_mobile: usize) -> RtResult<()> {
        RtError::check_size("prcp_conc", num_mobile, self.num_species())
    }

    /// 将时刻 `t` 的浓度写入 `out`
    pub fn sample_into(&self, t: f64, out: &mut [f64]) {
        match self {
            Self::Constant(c) => {
                for (o, v) in out.iter_mut().zip(c) {
                    *o = *v;
                }
            }
            Self::Series(series) => {
                for (o, s) in out.iter_mut().zip(series) {
                    *o = s.get_value(t);
                }
            }
        }
    }

    /// 是否随时间变化
    pub fn is_time_varying(&self) -> bool {
        matches!(self, Self::Series(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_sampling() {
        let f = PrcpConcForcing::Series(vec![
            TimeSeries::constant(1e-3),
            TimeSeries::new(vec![0.0, 100.0], vec![0.0, 2e-4]).unwrap(),
        ]);
        assert!(f.check(2).is_ok());
        assert!(f.check(3).is_err());
        let mut out = [0.0; 2];
        f.sample_into(50.0, &mut out);
        assert_eq!(out[0], 1e-3);
        assert!((out[1] - 1e-4).abs() < 1e-18);
        assert!(f.is_time_varying());
    }
}
