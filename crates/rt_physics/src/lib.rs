// crates/rt_physics/src/lib.rs

//! RT-Hydro 物理层
//!
//! 流域地表/地下水文耦合的反应输运求解，包括：
//! - 化学表 (chemistry) - 物种表、化学计量矩阵、热力学插值
//! - 网格与水文 (mesh, hydrology) - 三角单元、河段、水文接口与储量
//! - 状态管理 (state) - 各区化学状态与初始化
//! - 溶质输运 (transport) - 对流/扩散/弥散通量、矿质氮迁移
//! - 反应求解 (reaction) - 活度、动力学速率、Newton 迭代与缩步
//! - ODE 组装 (ode) - 状态布局与右端项
//! - 时间推进 (engine) - 积分器接口与算子分裂驱动器
//! - 外部驱动 (forcing) - 降水浓度、日统计
//!
//! # 层级
//!
//! 第 3 层，依赖 `rt_foundation`（第 1 层）与 `rt_config`（第 2 层）。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chemistry;
pub mod engine;
pub mod forcing;
pub mod hydrology;
pub mod mesh;
pub mod ode;
pub mod reaction;
pub mod state;
pub mod transport;

/// 层级编号
pub const LAYER: u8 = 3;

// 重导出常用类型
pub use chemistry::{ChemError, ChemTables, Mobility, Species, SpeciesKind};
pub use engine::{
    ForwardEuler, IntegrationStats, OdeRhs, RtDriver, RtDriverBuilder, SspRk2, StepReport,
    StiffIntegrator,
};
pub use forcing::{DailyAccumulator, DailyAverages, LandSurfaceSample, PrcpConcForcing, TimeSeries};
pub use hydrology::{
    ElementWaterFlux, ElementWaterState, HydroState, Hydrology, RiverFlux, RiverWaterFlux,
    RiverWaterState, StaticHydrology,
};
pub use mesh::{BankSide, BedrockBoundary, Element, Mesh, River, RiverMaterial, SoilProps};
pub use ode::{OdeAssembler, StateLayout};
pub use reaction::{ReactionOutcome, ReactionSolver, ReactionSummary};
pub use state::{ChemField, ChemState, ElementRestart, ZoneKind, ZoneRestart};
pub use transport::{ChemFlux, NitrogenField, TransportAssembler};
