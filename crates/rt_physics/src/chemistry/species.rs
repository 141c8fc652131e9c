// crates/rt_physics/src/chemistry/species.rs

//! 物种属性

use rt_config::SpeciesKindConfig;

/// 质子物种名，初始化时总浓度、游离浓度与活度取相同输入值
pub const PROTON: &str = "H+";

/// 物种分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeciesKind {
    /// 水相
    Aqueous,
    /// 表面吸附
    Adsorption,
    /// 阳离子交换
    CationExchange,
    /// 矿物
    Mineral,
}

impl SpeciesKind {
    /// 初级物种排序权重
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Aqueous => 0,
            Self::Adsorption => 1,
            Self::CationExchange => 2,
            Self::Mineral => 3,
        }
    }

    /// 该类别的基础迁移性
    pub fn base_mobility(self) -> Mobility {
        match self {
            Self::Aqueous => Mobility::Mobile,
            _ => Mobility::Immobile,
        }
    }
}

impl From<SpeciesKindConfig> for SpeciesKind {
    fn from(kind: SpeciesKindConfig) -> Self {
        match kind {
            SpeciesKindConfig::Aqueous => Self::Aqueous,
            SpeciesKindConfig::Mineral => Self::Mineral,
            SpeciesKindConfig::Adsorption => Self::Adsorption,
            SpeciesKindConfig::CationExchange => Self::CationExchange,
        }
    }
}

/// 迁移性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mobility {
    /// 可随水流迁移
    Mobile,
    /// 固定
    Immobile,
    /// 总量同时包含可迁移与固定形态
    Mixed,
}

/// 物种属性
#[derive(Debug, Clone)]
pub struct Species {
    /// 名称
    pub name: String,
    /// 分类
    pub kind: SpeciesKind,
    /// 迁移性
    pub mobility: Mobility,
    /// 摩尔质量 [g/mol]
    pub molar_mass: f64,
    /// 摩尔体积 [cm³/mol]
    pub molar_volume: f64,
    /// 电荷数
    pub charge: f64,
    /// 离子尺寸参数
    pub size_factor: f64,
    /// 扩散系数 [m²/s]
    pub diffusion: f64,
    /// 弥散度 [m]
    pub dispersion: f64,
}

impl Species {
    /// 是否为水相物种
    #[inline]
    pub fn is_aqueous(&self) -> bool {
        self.kind == SpeciesKind::Aqueous
    }

    /// 是否为矿物
    #[inline]
    pub fn is_mineral(&self) -> bool {
        self.kind == SpeciesKind::Mineral
    }
}
