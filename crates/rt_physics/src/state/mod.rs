// crates/rt_physics/src/state/mod.rs

//! 化学状态
//!
//! 每个控制体区（非饱和区、地下水、基岩两区、河道、河床）持有一份
//! [`ChemState`]。摩尔数只对水相物种有意义，是输运的守恒量；
//! 浓度由摩尔数与储量换算得到。

mod init;

pub use init::{ElementRestart, ZoneRestart};

use crate::chemistry::{ChemTables, SpeciesKind};
use rt_foundation::constants::ZERO_CONC;

// ============================================================================
// 区类别
// ============================================================================

/// 控制体区类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneKind {
    /// 土壤非饱和区
    Unsat,
    /// 土壤地下水
    Gw,
    /// 基岩非饱和区
    FbrUnsat,
    /// 基岩地下水
    FbrGw,
    /// 河道
    Stream,
    /// 河床
    Bed,
}

impl ZoneKind {
    /// 名称（用于日志与错误信息）
    pub fn name(self) -> &'static str {
        match self {
            Self::Unsat => "unsat",
            Self::Gw => "gw",
            Self::FbrUnsat => "fbr_unsat",
            Self::FbrGw => "fbr_gw",
            Self::Stream => "stream",
            Self::Bed => "bed",
        }
    }
}

// ============================================================================
// 单区化学状态
// ============================================================================

/// 单区化学状态
#[derive(Debug, Clone, PartialEq)]
pub struct ChemState {
    /// 总浓度（每个初级物种）
    pub t_conc: Vec<f64>,
    /// 总摩尔数（仅水相物种有效）
    pub t_mole: Vec<f64>,
    /// 游离浓度
    pub p_conc: Vec<f64>,
    /// 活度
    pub p_actv: Vec<f64>,
    /// 次级物种浓度
    pub s_conc: Vec<f64>,
    /// 比表面积（矿物）
    pub ssa: Vec<f64>,
    /// 温度 [°C]
    pub temperature: f64,
    /// 反应通量诊断 [mol/s]
    pub react_flux: Vec<f64>,
}

impl ChemState {
    /// 按化学表规模创建
    pub fn new(tables: &ChemTables) -> Self {
        let np = tables.num_primary();
        Self {
            t_conc: vec![ZERO_CONC; np],
            t_mole: vec![0.0; np],
            p_conc: vec![ZERO_CONC; np],
            p_actv: vec![ZERO_CONC; np],
            s_conc: vec![ZERO_CONC; tables.num_secondary()],
            ssa: vec![0.0; np],
            temperature: 25.0,
            react_flux: vec![0.0; np],
        }
    }

    /// 由水相总浓度重算摩尔数，非水相为 0
    pub fn sync_moles(&mut self, tables: &ChemTables, vol: f64) {
        for k in 0..tables.num_primary() {
            self.t_mole[k] = if tables.species(k).kind == SpeciesKind::Aqueous {
                self.t_conc[k] * vol
            } else {
                0.0
            };
        }
    }

    /// 无反应时游离浓度取总浓度
    pub fn update_free_conc(&mut self, num_aqueous: usize) {
        for k in 0..num_aqueous {
            self.p_conc[k] = self.t_conc[k];
        }
    }
}

// ============================================================================
// 控制体化学状态
// ============================================================================

/// 基岩两区
#[derive(Debug, Clone, PartialEq)]
pub struct BedrockChem {
    /// 基岩非饱和区
    pub unsat: ChemState,
    /// 基岩地下水
    pub gw: ChemState,
}

/// 单元化学状态
#[derive(Debug, Clone, PartialEq)]
pub struct ElementChem {
    /// 非饱和区
    pub unsat: ChemState,
    /// 地下水
    pub gw: ChemState,
    /// 基岩（启用基岩层时存在）
    pub bedrock: Option<BedrockChem>,
    /// 降水浓度（每个输运物种）
    pub prcp_conc: Vec<f64>,
}

/// 河段化学状态
#[derive(Debug, Clone, PartialEq)]
pub struct RiverChem {
    /// 河道
    pub stream: ChemState,
    /// 河床
    pub bed: ChemState,
}

/// 全流域化学状态
#[derive(Debug, Clone, Default)]
pub struct ChemField {
    /// 单元
    pub elements: Vec<ElementChem>,
    /// 河段
    pub rivers: Vec<RiverChem>,
}

impl ElementChem {
    /// 按区类别取状态
    pub fn zone(&self, kind: ZoneKind) -> Option<&ChemState> {
        match kind {
            ZoneKind::Unsat => Some(&self.unsat),
            ZoneKind::Gw => Some(&self.gw),
            ZoneKind::FbrUnsat => self.bedrock.as_ref().map(|b| &b.unsat),
            ZoneKind::FbrGw => self.bedrock.as_ref().map(|b| &b.gw),
            ZoneKind::Stream | ZoneKind::Bed => None,
        }
    }
}

impl ChemField {
    /// 全部区的游离浓度取总浓度（关闭反应时使用）
    pub fn update_free_conc(&mut self, num_aqueous: usize) {
        for ec in &mut self.elements {
            ec.unsat.update_free_conc(num_aqueous);
            ec.gw.update_free_conc(num_aqueous);
            if let Some(fbr) = ec.bedrock.as_mut() {
                fbr.unsat.update_free_conc(num_aqueous);
                fbr.gw.update_free_conc(num_aqueous);
            }
        }
        for rc in &mut self.rivers {
            rc.stream.update_free_conc(num_aqueous);
            rc.bed.update_free_conc(num_aqueous);
        }
    }
}

impl RiverChem {
    /// 按区类别取状态
    pub fn zone(&self, kind: ZoneKind) -> Option<&ChemState> {
        match kind {
            ZoneKind::Stream => Some(&self.stream),
            ZoneKind::Bed => Some(&self.bed),
            _ => None,
        }
    }
}
