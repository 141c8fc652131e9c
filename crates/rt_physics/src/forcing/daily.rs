// crates/rt_physics/src/forcing/daily.rs

//! 陆面变量日统计
//!
//! 每个报告步向累加器写入一次陆面采样，日边界处求平均并显式清零。
//! 白天量（有太阳辐射时）按白天计数平均，夜间气温按夜间计数平均。

use rt_foundation::safe_div;
use serde::Serialize;

/// 单次陆面采样
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandSurfaceSample {
    /// 气温 [K]
    pub sfctmp: f64,
    /// 风速 [m/s]
    pub sfcspd: f64,
    /// 入射短波辐射 [W/m²]
    pub soldn: f64,
    /// 比湿
    pub q2d: f64,
    /// 地表交换系数
    pub ch: f64,
    /// 冠层阻抗
    pub rc: f64,
    /// 地表气压 [Pa]
    pub sfcprs: f64,
    /// 反照率
    pub albedo: f64,
    /// 各层土温 [K]
    pub stc: Vec<f64>,
    /// 各层液态含水率
    pub sh2o: Vec<f64>,
    /// 各层总含水率
    pub smc: Vec<f64>,
}

/// 日平均结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyAverages {
    /// 日均气温
    pub avg_sfctmp: f64,
    /// 日最高气温
    pub tmax: f64,
    /// 日最低气温
    pub tmin: f64,
    /// 白天平均气温
    pub tday: f64,
    /// 夜间平均气温
    pub tnight: f64,
    /// 日均风速
    pub avg_sfcspd: f64,
    /// 白天平均比湿
    pub avg_q2d: f64,
    /// 白天平均交换系数
    pub avg_ch: f64,
    /// 白天平均冠层阻抗
    pub avg_rc: f64,
    /// 白天平均气压
    pub avg_sfcprs: f64,
    /// 白天平均反照率
    pub avg_albedo: f64,
    /// 白天平均辐射
    pub avg_soldn: f64,
    /// 日累计辐射 [J/m²]
    pub solar_total: f64,
    /// 白天长度 [s]
    pub daylength: f64,
    /// 各层日均土温
    pub avg_stc: Vec<f64>,
    /// 各层日均液态含水率
    pub avg_sh2o: Vec<f64>,
    /// 各层日均总含水率
    pub avg_smc: Vec<f64>,
}

/// 日统计累加器
///
/// 以报告步为单位累加，不在午夜拆分时间步：跨越日边界的一步整体计入
/// 边界前的一天，随该日一并输出。报告间隔整除一天时与逐日统计一致。
#[derive(Debug, Clone)]
pub struct DailyAccumulator {
    sfctmp: f64,
    tmax: f64,
    tmin: f64,
    tday: f64,
    tnight: f64,
    sfcspd: f64,
    q2d: f64,
    ch: f64,
    rc: f64,
    sfcprs: f64,
    albedo: f64,
    soldn: f64,
    solar_total: f64,
    stc: Vec<f64>,
    sh2o: Vec<f64>,
    smc: Vec<f64>,
    counter: usize,
    daylight_counter: usize,
    daylength: f64,
}

impl Default for DailyAccumulator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DailyAccumulator {
    /// 创建累加器，`num_layers` 为土层数
    pub fn new(num_layers: usize) -> Self {
        Self {
            sfctmp: 0.0,
            tmax: -999.0,
            tmin: 999.0,
            tday: 0.0,
            tnight: 0.0,
            sfcspd: 0.0,
            q2d: 0.0,
            ch: 0.0,
            rc: 0.0,
            sfcprs: 0.0,
            albedo: 0.0,
            soldn: 0.0,
            solar_total: 0.0,
            stc: vec![0.0; num_layers],
            sh2o: vec![0.0; num_layers],
            smc: vec![0.0; num_layers],
            counter: 0,
            daylight_counter: 0,
            daylength: 0.0,
        }
    }

    /// 当日已累加的采样数
    pub fn count(&self) -> usize {
        self.counter
    }

    /// 累加一次采样，`dt` 为采样代表的时长 [s]
    pub fn accumulate(&mut self, sample: &LandSurfaceSample, dt: f64) {
        self.sfctmp += sample.sfctmp;
        self.tmax = self.tmax.max(sample.sfctmp);
        self.tmin = self.tmin.min(sample.sfctmp);
        self.sfcspd += sample.sfcspd;

        let n = self.stc.len();
        for k in 0..n {
            self.stc[k] += sample.stc.get(k).copied().unwrap_or(0.0);
            self.sh2o[k] += sample.sh2o.get(k).copied().unwrap_or(0.0);
            self.smc[k] += sample.smc.get(k).copied().unwrap_or(0.0);
        }

        if sample.soldn > 0.0 {
            self.tday += sample.sfctmp;
            self.q2d += sample.q2d;
            self.ch += sample.ch;
            self.rc += sample.rc;
            self.sfcprs += sample.sfcprs;
            self.albedo += sample.albedo;
            self.soldn += sample.soldn;
            self.solar_total += sample.soldn * dt;
            self.daylength += dt;
            self.daylight_counter += 1;
        } else {
            self.tnight += sample.sfctmp;
        }

        self.counter += 1;
    }

    /// 求当日平均值
    pub fn finalize(&self) -> DailyAverages {
        let all = self.counter as f64;
        let day = self.daylight_counter as f64;
        let night = (self.counter - self.daylight_counter) as f64;
        let avg = |sum: f64, n: f64| safe_div(sum, n, 0.0);

        DailyAverages {
            avg_sfctmp: avg(self.sfctmp, all),
            tmax: self.tmax,
            tmin: self.tmin,
            tday: avg(self.tday, day),
            tnight: avg(self.tnight, night),
            avg_sfcspd: avg(self.sfcspd, all),
            avg_q2d: avg(self.q2d, day),
            avg_ch: avg(self.ch, day),
            avg_rc: avg(self.rc, day),
            avg_sfcprs: avg(self.sfcprs, day),
            avg_albedo: avg(self.albedo, day),
            avg_soldn: avg(self.soldn, day),
            solar_total: self.solar_total,
            daylength: self.daylength,
            avg_stc: self.stc.iter().map(|&s| avg(s, all)).collect(),
            avg_sh2o: self.sh2o.iter().map(|&s| avg(s, all)).collect(),
            avg_smc: self.smc.iter().map(|&s| avg(s, all)).collect(),
        }
    }

    /// 清零，开始新的一天
    pub fn reset(&mut self) {
        *self = Self::new(self.stc.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sample(sfctmp: f64, soldn: f64) -> LandSurfaceSample {
        LandSurfaceSample {
            sfctmp,
            sfcspd: 2.0,
            soldn,
            q2d: 0.01,
            stc: vec![280.0, 281.0],
            sh2o: vec![0.2, 0.3],
            smc: vec![0.25, 0.35],
            ..Default::default()
        }
    }

    #[test]
    fn test_day_night_split() {
        let mut acc = DailyAccumulator::new(2);
        acc.accumulate(&sample(280.0, 0.0), 3600.0);
        acc.accumulate(&sample(290.0, 400.0), 3600.0);
        acc.accumulate(&sample(294.0, 600.0), 3600.0);
        acc.accumulate(&sample(276.0, 0.0), 3600.0);
        let d = acc.finalize();
        assert!(approx_eq(d.avg_sfctmp, 285.0));
        assert_eq!(d.tmax, 294.0);
        assert_eq!(d.tmin, 276.0);
        assert!(approx_eq(d.tday, 292.0));
        assert!(approx_eq(d.tnight, 278.0));
        assert!(approx_eq(d.avg_soldn, 500.0));
        assert!(approx_eq(d.solar_total, 1000.0 * 3600.0));
        assert!(approx_eq(d.daylength, 7200.0));
        assert!(approx_eq(d.avg_stc[1], 281.0));
        assert!(approx_eq(d.avg_q2d, 0.01));
    }

    #[test]
    fn test_reset() {
        let mut acc = DailyAccumulator::new(1);
        acc.accumulate(&sample(290.0, 100.0), 60.0);
        acc.reset();
        assert_eq!(acc.count(), 0);
        let d = acc.finalize();
        assert_eq!(d.tmax, -999.0);
        assert_eq!(d.tmin, 999.0);
        assert_eq!(d.avg_sfctmp, 0.0);
        assert_eq!(d.avg_stc.len(), 1);
    }
}
