// crates/rt_foundation/src/lib.rs

//! RT-Hydro Foundation Layer
//!
//! 基础层，为配置层和物理层提供公共抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `RtError` / `RtResult`
//! - [`float`]: 安全浮点运算与补偿求和
//! - [`constants`]: 水文与化学计算共享的物理常量
//!
//! # 设计原则
//!
//! 1. **最小依赖**: 仅依赖 thiserror
//! 2. **可追溯**: 数值故障携带控制体、物理量与模拟时间
//!
//! # 示例
//!
//! ```
//! use rt_foundation::{RtError, RtResult};
//!
//! fn lookup(name: &str) -> RtResult<usize> {
//!     Err(RtError::species_not_found(name, "primary"))
//! }
//!
//! assert!(lookup("Ca++").is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod error;
pub mod float;

// 重导出常用类型
pub use error::{NonFiniteSource, RtError, RtResult};
pub use float::{safe_div, KahanSum};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::constants::*;
    pub use crate::error::{NonFiniteSource, RtError, RtResult};
    pub use crate::float::{clamp_non_negative, safe_div, KahanSum};
}
