// crates/rt_physics/src/engine/mod.rs

//! 时间推进模块
//!
//! # 模块结构
//!
//! - `time_integrator` - 积分器接口与显式参考实现 (ForwardEuler, SSP-RK2)
//! - `driver` - 算子分裂驱动器

pub mod driver;
pub mod time_integrator;

// 重导出常用类型
pub use driver::{RtDriver, RtDriverBuilder, StepReport};
pub use time_integrator::{ForwardEuler, IntegrationStats, OdeRhs, SspRk2, StiffIntegrator};
