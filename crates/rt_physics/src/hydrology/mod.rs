// crates/rt_physics/src/hydrology/mod.rs

//! 水文状态与通量接口
//!
//! 水文模型本身（产流、蒸散发、地下水运动）不在本 crate 内。引擎通过
//! [`Hydrology`] trait 在每次右端项求值时获取水通量，再据此计算溶质通量。
//!
//! # 符号约定
//!
//! - 单元通量：正值表示流出本单元（`infil`、`rechg` 为向下为正）
//! - 河段通量：`rivflow[k]` 正值表示流出河道或河床

mod storage;

pub use storage::{gw_storage, river_bed_storage, unsat_saturation, unsat_storage};

use crate::forcing::LandSurfaceSample;
use crate::mesh::{BankSide, Mesh, NUM_EDGE};
use rt_foundation::RtResult;

// ============================================================================
// 河段通量槽位
// ============================================================================

/// 河段通量槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum RiverFlux {
    /// 上游来水（由下游累加得到）
    UpChanl2Chanl = 0,
    /// 流向下游
    DownChanl2Chanl = 1,
    /// 左岸地表
    LeftSurf2Chanl = 2,
    /// 右岸地表
    RightSurf2Chanl = 3,
    /// 左岸含水层 → 河道
    LeftAquif2Chanl = 4,
    /// 右岸含水层 → 河道
    RightAquif2Chanl = 5,
    /// 河道渗漏到河床
    ChanlLkg = 6,
    /// 河床 ↔ 左岸含水层
    LeftAquif2Aquif = 7,
    /// 河床 ↔ 右岸含水层
    RightAquif2Aquif = 8,
    /// 河床 → 下游河床
    DownAquif2Aquif = 9,
    /// 上游河床来水
    UpAquif2Aquif = 10,
    /// 左岸基岩 → 河道
    LeftFbr2Chanl = 11,
    /// 右岸基岩 → 河道
    RightFbr2Chanl = 12,
}

impl RiverFlux {
    /// 槽位总数
    pub const NUM: usize = 13;

    /// 河道水量平衡涉及的槽位（不含基岩）
    pub const CHANNEL: [RiverFlux; 7] = [
        Self::UpChanl2Chanl,
        Self::DownChanl2Chanl,
        Self::LeftSurf2Chanl,
        Self::RightSurf2Chanl,
        Self::LeftAquif2Chanl,
        Self::RightAquif2Chanl,
        Self::ChanlLkg,
    ];

    /// 河床侧向交换槽位
    pub const BED_LATERAL: [RiverFlux; 4] = [
        Self::LeftAquif2Aquif,
        Self::RightAquif2Aquif,
        Self::DownAquif2Aquif,
        Self::UpAquif2Aquif,
    ];

    /// 基岩入河槽位
    pub const BEDROCK: [RiverFlux; 2] = [Self::LeftFbr2Chanl, Self::RightFbr2Chanl];

    /// 数组下标
    #[inline]
    pub const fn idx(self) -> usize {
        self as usize
    }

    /// 地表入河槽位
    pub fn surf(side: BankSide) -> Self {
        match side {
            BankSide::Left => Self::LeftSurf2Chanl,
            BankSide::Right => Self::RightSurf2Chanl,
        }
    }

    /// 含水层入河道槽位
    pub fn aquif2chanl(side: BankSide) -> Self {
        match side {
            BankSide::Left => Self::LeftAquif2Chanl,
            BankSide::Right => Self::RightAquif2Chanl,
        }
    }

    /// 河床与岸含水层交换槽位
    pub fn aquif2aquif(side: BankSide) -> Self {
        match side {
            BankSide::Left => Self::LeftAquif2Aquif,
            BankSide::Right => Self::RightAquif2Aquif,
        }
    }

    /// 基岩入河槽位
    pub fn fbr2chanl(side: BankSide) -> Self {
        match side {
            BankSide::Left => Self::LeftFbr2Chanl,
            BankSide::Right => Self::RightFbr2Chanl,
        }
    }
}

// ============================================================================
// 水文状态与通量
// ============================================================================

/// 单元水分状态 [m]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementWaterState {
    /// 地表水深
    pub surf: f64,
    /// 非饱和区可动水
    pub unsat: f64,
    /// 地下水位（相对土层底）
    pub gw: f64,
    /// 基岩非饱和区
    pub fbr_unsat: f64,
    /// 基岩地下水
    pub fbr_gw: f64,
}

/// 单元水通量 [m/s]，侧向通量为体积通量 [m³/s]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementWaterFlux {
    /// 净雨（到达地表）
    pub pcpdrp: f64,
    /// 入渗
    pub infil: f64,
    /// 补给（非饱和 → 地下水）
    pub rechg: f64,
    /// 地表蒸发
    pub edir_surf: f64,
    /// 非饱和区蒸发
    pub edir_unsat: f64,
    /// 地下水蒸发
    pub edir_gw: f64,
    /// 非饱和区蒸腾
    pub ett_unsat: f64,
    /// 地下水蒸腾
    pub ett_gw: f64,
    /// 地表侧向流
    pub ovlflow: [f64; NUM_EDGE],
    /// 地下水侧向流
    pub subsurf: [f64; NUM_EDGE],
    /// 基岩入渗（土壤地下水 → 基岩非饱和区）
    pub fbr_infil: f64,
    /// 基岩补给
    pub fbr_rechg: f64,
    /// 基岩侧向流
    pub fbrflow: [f64; NUM_EDGE],
    /// 基岩向河道排泄
    pub fbr_discharge: f64,
}

/// 河段水分状态 [m]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiverWaterState {
    /// 河道水深
    pub stage: f64,
    /// 河床地下水位
    pub gw: f64,
}

/// 河段水通量 [m³/s]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiverWaterFlux {
    /// 各槽位通量
    pub rivflow: [f64; RiverFlux::NUM],
}

impl Default for RiverWaterFlux {
    fn default() -> Self {
        Self {
            rivflow: [0.0; RiverFlux::NUM],
        }
    }
}

impl RiverWaterFlux {
    /// 读取槽位
    #[inline]
    pub fn get(&self, slot: RiverFlux) -> f64 {
        self.rivflow[slot.idx()]
    }

    /// 写入槽位
    #[inline]
    pub fn set(&mut self, slot: RiverFlux, value: f64) {
        self.rivflow[slot.idx()] = value;
    }
}

/// 全流域水文状态与通量
#[derive(Debug, Clone, Default)]
pub struct HydroState {
    /// 单元状态
    pub elem_ws: Vec<ElementWaterState>,
    /// 单元通量
    pub elem_wf: Vec<ElementWaterFlux>,
    /// 河段状态
    pub river_ws: Vec<RiverWaterState>,
    /// 河段通量
    pub river_wf: Vec<RiverWaterFlux>,
}

impl HydroState {
    /// 按网格规模创建零状态
    pub fn new(num_elements: usize, num_rivers: usize) -> Self {
        Self {
            elem_ws: vec![ElementWaterState::default(); num_elements],
            elem_wf: vec![ElementWaterFlux::default(); num_elements],
            river_ws: vec![RiverWaterState::default(); num_rivers],
            river_wf: vec![RiverWaterFlux::default(); num_rivers],
        }
    }

    /// 清零河段上游累加槽位
    pub fn reset_upstream_slots(&mut self) {
        for wf in &mut self.river_wf {
            wf.set(RiverFlux::UpChanl2Chanl, 0.0);
            wf.set(RiverFlux::UpAquif2Aquif, 0.0);
        }
    }
}

// ============================================================================
// 水文接口
// ============================================================================

/// 水文模型接口
///
/// 实现方根据 `hydro` 中的状态填写全部通量。河段上游槽位在调用前已清零，
/// 实现方负责 `down.UP −= self.DOWN` 的累加，且河岸两侧的通量必须互反。
pub trait Hydrology: Send {
    /// 由当前状态计算水通量
    fn update_fluxes(&mut self, t: f64, mesh: &Mesh, hydro: &mut HydroState) -> RtResult<()>;

    /// 单元 `elem` 的陆面采样，用于日平均统计
    fn daily_sample(&self, _elem: usize) -> Option<LandSurfaceSample> {
        None
    }
}

/// 固定通量水文模型
///
/// 每次求值时写入预设通量并执行上游累加，主要用于测试与示踪剂实验。
#[derive(Debug, Clone, Default)]
pub struct StaticHydrology {
    /// 单元通量
    pub elem_wf: Vec<ElementWaterFlux>,
    /// 河段通量（上游槽位忽略）
    pub river_wf: Vec<RiverWaterFlux>,
    /// 陆面采样
    pub samples: Vec<LandSurfaceSample>,
}

impl StaticHydrology {
    /// 按网格规模创建零通量模型
    pub fn new(num_elements: usize, num_rivers: usize) -> Self {
        Self {
            elem_wf: vec![ElementWaterFlux::default(); num_elements],
            river_wf: vec![RiverWaterFlux::default(); num_rivers],
            samples: Vec::new(),
        }
    }
}

impl Hydrology for StaticHydrology {
    fn update_fluxes(&mut self, _t: f64, mesh: &Mesh, hydro: &mut HydroState) -> RtResult<()> {
        rt_foundation::RtError::check_size("elem_wf", hydro.elem_wf.len(), self.elem_wf.len())?;
        rt_foundation::RtError::check_size("river_wf", hydro.river_wf.len(), self.river_wf.len())?;

        hydro.elem_wf.copy_from_slice(&self.elem_wf);
        for (dst, src) in hydro.river_wf.iter_mut().zip(&self.river_wf) {
            let up_chanl = dst.get(RiverFlux::UpChanl2Chanl);
            let up_aquif = dst.get(RiverFlux::UpAquif2Aquif);
            *dst = *src;
            dst.set(RiverFlux::UpChanl2Chanl, up_chanl);
            dst.set(RiverFlux::UpAquif2Aquif, up_aquif);
        }
        for (i, river) in mesh.rivers.iter().enumerate() {
            if let Some(d) = river.topo.down {
                let down_chanl = self.river_wf[i].get(RiverFlux::DownChanl2Chanl);
                let down_aquif = self.river_wf[i].get(RiverFlux::DownAquif2Aquif);
                let wf = &mut hydro.river_wf[d];
                wf.set(RiverFlux::UpChanl2Chanl, wf.get(RiverFlux::UpChanl2Chanl) - down_chanl);
                wf.set(RiverFlux::UpAquif2Aquif, wf.get(RiverFlux::UpAquif2Aquif) - down_aquif);
            }
        }
        Ok(())
    }

    fn daily_sample(&self, elem: usize) -> Option<LandSurfaceSample> {
        self.samples.get(elem).cloned()
    }
}
