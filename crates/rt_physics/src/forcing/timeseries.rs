// crates/rt_physics/src/forcing/timeseries.rs

//! 时间序列与线性插值

use rt_foundation::{RtError, RtResult};
use serde::{Deserialize, Serialize};

/// 外推模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrapolationMode {
    /// 超出范围时取端点值
    #[default]
    Clamp,
    /// 周期重复
    Cyclic,
}

/// 时间序列
///
/// 时间严格单调递增，时间与值数组等长且非空。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    times: Vec<f64>,
    values: Vec<f64>,
    #[serde(default)]
    extrap_mode: ExtrapolationMode,
}

impl TimeSeries {
    /// 从时间与值数组创建
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> RtResult<Self> {
        RtError::check_size("TimeSeries.values", times.len(), values.len())?;
        if times.is_empty() {
            return Err(RtError::invalid_config("TimeSeries", "[]", "时间序列不能为空"));
        }
        if let Some(i) = (1..times.len()).find(|&i| times[i] <= times[i - 1]) {
            return Err(RtError::invalid_config(
                "TimeSeries.times",
                format!("times[{}]={}", i, times[i]),
                "时间必须严格单调递增",
            ));
        }
        Ok(Self {
            times,
            values,
            extrap_mode: ExtrapolationMode::Clamp,
        })
    }

    /// 恒定值序列
    pub fn constant(value: f64) -> Self {
        Self {
            times: vec![0.0],
            values: vec![value],
            extrap_mode: ExtrapolationMode::Clamp,
        }
    }

    /// 设置外推模式
    pub fn with_extrapolation(mut self, mode: ExtrapolationMode) -> Self {
        self.extrap_mode = mode;
        self
    }

    /// 数据点数量
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// 时间范围
    pub fn time_range(&self) -> (f64, f64) {
        (self.times[0], self.times[self.times.len() - 1])
    }

    /// 时刻 `t` 的插值
    pub fn get_value(&self, t: f64) -> f64 {
        if self.times.is_empty() || self.values.len() != self.times.len() {
            return 0.0;
        }
        let (t_start, t_end) = self.time_range();
        let n = self.times.len();
        if t < t_start || t > t_end {
            match self.extrap_mode {
                ExtrapolationMode::Clamp => {
                    return if t < t_start { self.values[0] } else { self.values[n - 1] };
                }
                ExtrapolationMode::Cyclic => {
                    let duration = t_end - t_start;
                    if duration < 1e-12 {
                        return self.values[0];
                    }
                    return self.interpolate(t_start + (t - t_start).rem_euclid(duration));
                }
            }
        }
        self.interpolate(t)
    }

    fn interpolate(&self, t: f64) -> f64 {
        let n = self.times.len();
        // 第一个大于 t 的位置
        let hi = self.times.partition_point(|&x| x <= t);
        if hi == 0 {
            return self.values[0];
        }
        if hi >= n {
            return self.values[n - 1];
        }
        let (t0, t1) = (self.times[hi - 1], self.times[hi]);
        let (v0, v1) = (self.values[hi - 1], self.values[hi]);
        v0 + (t - t0) / (t1 - t0) * (v1 - v0)
    }
}
