// crates/rt_config/src/lib.rs

//! RT-Hydro Config Layer (Layer 2)
//!
//! 配置层，提供运行控制参数、能力开关与化学体系定义。
//! 化学定义为已解析的结构化数据，由物理层构建为不可变查找表。
//!
//! # 模块概览
//!
//! - [`run_config`]: RtConfig 运行配置（时间、积分器、反应、输运、氮）
//! - [`chemistry`]: ChemistryConfig 物种、矿物与动力学定义
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! Layer 3: rt_physics    ─> ChemTables::build, RtDriver
//! Layer 2: rt_config     ─> RtConfig, ChemistryConfig (本层)
//! Layer 1: rt_foundation ─> RtError, 常量
//! ```
//!
//! # 设计原则
//!
//! 1. **运行时能力开关**: 基岩层、氮输运等分支由 [`Capabilities`] 在启动时选择
//! 2. **全默认值**: 所有字段可省略，省略时取经验默认值
//! 3. **一次性校验**: `validate` 在加载时检查全部数值与引用

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chemistry;
pub mod error;
pub mod run_config;

/// 层级标识
pub const LAYER: u8 = 2;

// 重导出核心类型
pub use chemistry::{
    CalibrationConfig, ChemistryConfig, DebyeHuckelConfig, DependenceTerm, InhibitionTerm, KineticConfig,
    MineralConfig, MineralVolumeMode, MonodTerm, PrimarySpeciesConfig, RateLawConfig,
    SecondarySpeciesConfig, SpeciesKindConfig, StoichTerm,
};
pub use error::ConfigError;
pub use run_config::{
    Capabilities, IntegratorConfig, NitrogenConfig, ReactionConfig, RtConfig, TimeConfig,
    TransportConfig,
};
