// crates/rt_physics/src/ode/mod.rs

//! ODE 系统
//!
//! - [`StateLayout`]: 控制体状态到一维向量的偏移映射
//! - [`OdeAssembler`]: 右端项组装，实现 [`crate::engine::OdeRhs`]

mod assembler;
mod layout;

pub use assembler::{NitrogenModel, OdeAssembler};
pub use layout::{ElementSlots, RiverSlots, StateLayout};
