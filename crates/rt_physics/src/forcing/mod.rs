// crates/rt_physics/src/forcing/mod.rs

//! 外部驱动数据
//!
//! - [`TimeSeries`]: 线性插值时间序列
//! - [`PrcpConcForcing`]: 降水浓度（恒定或逐物种时间序列）
//! - [`DailyAccumulator`]: 陆面变量日统计，供日尺度生物地球化学模块使用

mod daily;
mod precip;
mod timeseries;

pub use daily::{DailyAccumulator, DailyAverages, LandSurfaceSample};
pub use precip::PrcpConcForcing;
pub use timeseries::{ExtrapolationMode, TimeSeries};
