// crates/rt_physics/src/chemistry/mod.rs

//! 化学物种与反应查找表
//!
//! 由 [`rt_config::ChemistryConfig`] 一次性构建不可变表，运行期所有并行
//! 工作线程共享只读引用，无需加锁。
//!
//! # 物种排序
//!
//! 初级物种按 水相 → 吸附 → 阳离子交换 → 矿物 排序，次级物种紧随其后。
//! 依赖矩阵的列只覆盖非矿物初级物种，即 `0..num_primary - num_mineral`。
//!
//! # 主要类型
//!
//! - [`Species`]: 物种属性与分类
//! - [`ChemTables`]: 依赖矩阵、总浓度矩阵、动力学计量矩阵与平衡常数
//! - [`KineticReaction`]: 速率律与依赖项

mod kinetics;
mod species;
mod tables;
mod thermo;

pub use kinetics::{KineticReaction, RateLaw};
pub use species::{Mobility, Species, SpeciesKind, PROTON};
pub use tables::ChemTables;
pub use thermo::{arrhenius_factor, interpolate_grid};

use rt_config::ConfigError;
use rt_foundation::RtError;

/// 化学表构建错误
#[derive(Debug, thiserror::Error)]
pub enum ChemError {
    /// 引用的物种不存在
    #[error("物种未找到: '{name}' (引用位置: {context})")]
    SpeciesNotFound {
        /// 物种名
        name: String,
        /// 引用位置
        context: String,
    },

    /// 引用了不允许的物种类别
    #[error("非法引用: '{name}' 在 {context} 中 ({reason})")]
    InvalidReference {
        /// 物种名
        name: String,
        /// 引用位置
        context: String,
        /// 原因
        reason: String,
    },

    /// 配置校验失败
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ChemError> for RtError {
    fn from(err: ChemError) -> Self {
        match err {
            ChemError::SpeciesNotFound { name, context } => {
                RtError::species_not_found(name, context)
            }
            ChemError::InvalidReference {
                name,
                context,
                reason,
            } => RtError::invalid_table(context, format!("{}: {}", name, reason)),
            ChemError::Config(e) => e.into(),
        }
    }
}
