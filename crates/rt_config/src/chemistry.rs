// crates/rt_config/src/chemistry.rs

//! 化学体系定义
//!
//! 描述初级物种、次级物种、矿物溶解反应、动力学反应与 Debye-Hückel 参数。
//! 本模块只保存名称引用形式的定义，名称解析与矩阵构建在物理层进行。
//!
//! 平衡常数按温度网格给出：长度为 1 的数组对所有温度通用，
//! 否则长度必须与 `temperatures` 一致。

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ============================================================
// 物种定义
// ============================================================

/// 物种分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeciesKindConfig {
    /// 水相
    #[default]
    Aqueous,
    /// 矿物
    Mineral,
    /// 表面吸附
    Adsorption,
    /// 阳离子交换
    CationExchange,
}

/// 初级物种
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimarySpeciesConfig {
    /// 物种名
    pub name: String,

    /// 分类
    #[serde(default)]
    pub kind: SpeciesKindConfig,

    /// 电荷数
    #[serde(default)]
    pub charge: f64,

    /// Debye-Hückel 离子尺寸参数
    #[serde(default)]
    pub size_factor: f64,

    /// 摩尔质量 [g/mol]
    #[serde(default)]
    pub molar_mass: f64,

    /// 摩尔体积 [cm³/mol]，仅矿物使用
    #[serde(default)]
    pub molar_volume: f64,

    /// 扩散系数覆盖值 [m²/s]
    #[serde(default)]
    pub diffusion: Option<f64>,

    /// 弥散度覆盖值 [m]
    #[serde(default)]
    pub dispersion: Option<f64>,
}

impl PrimarySpeciesConfig {
    /// 创建水相物种
    pub fn aqueous(name: impl Into<String>, charge: f64) -> Self {
        Self {
            name: name.into(),
            kind: SpeciesKindConfig::Aqueous,
            charge,
            size_factor: 0.0,
            molar_mass: 0.0,
            molar_volume: 0.0,
            diffusion: None,
            dispersion: None,
        }
    }

    /// 创建矿物物种
    pub fn mineral(name: impl Into<String>, molar_mass: f64, molar_volume: f64) -> Self {
        Self {
            kind: SpeciesKindConfig::Mineral,
            molar_mass,
            molar_volume,
            ..Self::aqueous(name, 0.0)
        }
    }

    /// 设置分类
    pub fn with_kind(mut self, kind: SpeciesKindConfig) -> Self {
        self.kind = kind;
        self
    }

    /// 设置离子尺寸参数
    pub fn with_size_factor(mut self, size_factor: f64) -> Self {
        self.size_factor = size_factor;
        self
    }
}

/// 化学计量项
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoichTerm {
    /// 物种名
    pub species: String,
    /// 化学计量系数
    pub coefficient: f64,
}

impl StoichTerm {
    /// 创建计量项
    pub fn new(species: impl Into<String>, coefficient: f64) -> Self {
        Self {
            species: species.into(),
            coefficient,
        }
    }
}

/// 次级物种（由初级物种平衡反应生成）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondarySpeciesConfig {
    /// 物种名
    pub name: String,

    /// 分类（不可为矿物）
    #[serde(default)]
    pub kind: SpeciesKindConfig,

    /// 电荷数
    #[serde(default)]
    pub charge: f64,

    /// Debye-Hückel 离子尺寸参数
    #[serde(default)]
    pub size_factor: f64,

    /// 对初级物种的化学计量
    pub stoichiometry: Vec<StoichTerm>,

    /// log10 平衡常数（按温度网格）
    pub log_k: Vec<f64>,
}

// ============================================================
// 矿物与动力学
// ============================================================

/// 矿物溶解反应
///
/// 计量项可以引用初级物种或次级物种，引用次级物种时经依赖矩阵展开。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MineralConfig {
    /// 矿物名（必须是矿物类初级物种）
    pub name: String,

    /// 溶解产物的化学计量
    pub stoichiometry: Vec<StoichTerm>,

    /// log10 平衡常数（按温度网格）
    pub log_k: Vec<f64>,
}

/// 速率律
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLawConfig {
    /// 过渡态理论
    #[default]
    Tst,
    /// 仅沉淀
    PrecipitationOnly,
    /// 仅溶解
    DissolutionOnly,
    /// Monod 动力学
    Monod,
}

/// 幂律依赖项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependenceTerm {
    /// 物种名
    pub species: String,
    /// 活度幂次
    pub power: f64,
}

/// Monod 项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonodTerm {
    /// 物种名
    pub species: String,
    /// 半饱和常数 [mol/L]
    pub half_saturation: f64,
}

/// 抑制项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InhibitionTerm {
    /// 物种名
    pub species: String,
    /// 抑制常数 [mol/L]
    pub constant: f64,
}

/// 动力学反应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KineticConfig {
    /// 目标矿物名
    pub mineral: String,

    /// 反应标签
    #[serde(default)]
    pub label: String,

    /// 速率律
    #[serde(default)]
    pub rate_law: RateLawConfig,

    /// log10 基准速率 [mol/m²/s]
    pub log_rate: f64,

    /// 活化能 [kJ/mol]
    #[serde(default)]
    pub activation_energy: f64,

    /// 幂律依赖项
    #[serde(default)]
    pub dependence: Vec<DependenceTerm>,

    /// Monod 项
    #[serde(default)]
    pub monod: Vec<MonodTerm>,

    /// 抑制项
    #[serde(default)]
    pub inhibition: Vec<InhibitionTerm>,

    /// 生物量物种
    #[serde(default)]
    pub biomass: Option<String>,
}

// ============================================================
// 活度系数与温度
// ============================================================

/// Debye-Hückel 参数（按温度网格）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebyeHuckelConfig {
    /// A 参数
    #[serde(default = "default_dh_a")]
    pub a: Vec<f64>,
    /// B 参数
    #[serde(default = "default_dh_b")]
    pub b: Vec<f64>,
    /// b-dot 参数
    #[serde(default = "default_dh_bdot")]
    pub bdot: Vec<f64>,
}

fn default_dh_a() -> Vec<f64> { vec![0.5114] }
fn default_dh_b() -> Vec<f64> { vec![0.3288] }
fn default_dh_bdot() -> Vec<f64> { vec![0.041] }

impl Default for DebyeHuckelConfig {
    fn default() -> Self {
        Self {
            a: default_dh_a(),
            b: default_dh_b(),
            bdot: default_dh_bdot(),
        }
    }
}

/// 标定偏移量
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct CalibrationConfig {
    /// 阳离子交换平衡常数偏移（log10）
    #[serde(default)]
    pub xsorption: f64,

    /// 动力学基准速率偏移（log10）
    #[serde(default)]
    pub rate: f64,
}

/// 矿物初始体积分数的解释方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MineralVolumeMode {
    /// 相对总体积
    #[default]
    Absolute,
    /// 相对固相体积
    Relative,
}

// ============================================================
// 化学体系
// ============================================================

/// 化学体系配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChemistryConfig {
    /// 初级物种
    #[serde(default)]
    pub primary: Vec<PrimarySpeciesConfig>,

    /// 次级物种
    #[serde(default)]
    pub secondary: Vec<SecondarySpeciesConfig>,

    /// 矿物溶解反应
    #[serde(default)]
    pub minerals: Vec<MineralConfig>,

    /// 动力学反应
    #[serde(default)]
    pub kinetics: Vec<KineticConfig>,

    /// Debye-Hückel 参数
    #[serde(default)]
    pub debye_huckel: DebyeHuckelConfig,

    /// 温度网格 [°C]
    #[serde(default = "default_temperatures")]
    pub temperatures: Vec<f64>,

    /// 参考温度 [°C]
    #[serde(default = "default_reference_temperature")]
    pub reference_temperature: f64,

    /// 是否按区温度插值平衡常数并施加 Arrhenius 修正
    #[serde(default)]
    pub temperature_coupling: bool,

    /// 矿物体积分数模式
    #[serde(default)]
    pub mineral_volume_mode: MineralVolumeMode,

    /// 标定偏移量
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

fn default_temperatures() -> Vec<f64> { vec![25.0] }
fn default_reference_temperature() -> f64 { 25.0 }

impl Default for ChemistryConfig {
    fn default() -> Self {
        Self {
            primary: Vec::new(),
            secondary: Vec::new(),
            minerals: Vec::new(),
            kinetics: Vec::new(),
            debye_huckel: DebyeHuckelConfig::default(),
            temperatures: default_temperatures(),
            reference_temperature: default_reference_temperature(),
            temperature_coupling: false,
            mineral_volume_mode: MineralVolumeMode::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl ChemistryConfig {
    /// 是否定义了任何物种
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    fn has_primary(&self, name: &str) -> bool {
        self.primary.iter().any(|p| p.name == name)
    }

    fn has_species(&self, name: &str) -> bool {
        self.has_primary(name) || self.secondary.iter().any(|s| s.name == name)
    }

    fn check_grid(&self, key: String, values: &[f64]) -> Result<(), ConfigError> {
        if values.len() != 1 && values.len() != self.temperatures.len() {
            return Err(ConfigError::invalid(
                key,
                values.len(),
                format!("长度必须为 1 或温度网格长度 {}", self.temperatures.len()),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid(key, "NaN/Inf", "必须为有限值"));
        }
        Ok(())
    }

    fn check_reference(&self, name: &str, context: String, secondary_ok: bool) -> Result<(), ConfigError> {
        let found = if secondary_ok {
            self.has_species(name)
        } else {
            self.has_primary(name)
        };
        if found {
            Ok(())
        } else {
            Err(ConfigError::UnknownSpecies {
                name: name.to_string(),
                context,
            })
        }
    }

    /// 验证化学体系
    ///
    /// 检查名称唯一性、名称引用、温度网格长度与数值范围。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperatures.is_empty() {
            return Err(ConfigError::Missing("chemistry.temperatures".to_string()));
        }
        if self.temperatures.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ConfigError::invalid(
                "chemistry.temperatures",
                format!("{:?}", self.temperatures),
                "温度网格必须严格递增",
            ));
        }

        let mut names: Vec<&str> = self
            .primary
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.secondary.iter().map(|s| s.name.as_str()))
            .collect();
        names.sort_unstable();
        if let Some(dup) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConfigError::invalid("chemistry.species", dup[0], "物种名重复"));
        }

        for (i, p) in self.primary.iter().enumerate() {
            if p.kind == SpeciesKindConfig::Mineral && p.molar_volume <= 0.0 {
                return Err(ConfigError::invalid(
                    format!("chemistry.primary[{}].molar_volume", i),
                    p.molar_volume,
                    "矿物摩尔体积必须为正",
                ));
            }
        }

        for (i, s) in self.secondary.iter().enumerate() {
            if s.kind == SpeciesKindConfig::Mineral {
                return Err(ConfigError::invalid(
                    format!("chemistry.secondary[{}].kind", i),
                    "mineral",
                    "次级物种不能为矿物",
                ));
            }
            for term in &s.stoichiometry {
                self.check_reference(&term.species, format!("secondary[{}]", i), false)?;
            }
            self.check_grid(format!("chemistry.secondary[{}].log_k", i), &s.log_k)?;
        }

        for (i, m) in self.minerals.iter().enumerate() {
            let is_mineral = self
                .primary
                .iter()
                .any(|p| p.name == m.name && p.kind == SpeciesKindConfig::Mineral);
            if !is_mineral {
                return Err(ConfigError::UnknownSpecies {
                    name: m.name.clone(),
                    context: format!("minerals[{}] (需要矿物类初级物种)", i),
                });
            }
            for term in &m.stoichiometry {
                self.check_reference(&term.species, format!("minerals[{}]", i), true)?;
            }
            self.check_grid(format!("chemistry.minerals[{}].log_k", i), &m.log_k)?;
        }

        for (i, k) in self.kinetics.iter().enumerate() {
            if !self.minerals.iter().any(|m| m.name == k.mineral) {
                return Err(ConfigError::UnknownSpecies {
                    name: k.mineral.clone(),
                    context: format!("kinetics[{}].mineral", i),
                });
            }
            for d in &k.dependence {
                self.check_reference(&d.species, format!("kinetics[{}].dependence", i), false)?;
            }
            for m in &k.monod {
                self.check_reference(&m.species, format!("kinetics[{}].monod", i), false)?;
                if m.half_saturation <= 0.0 {
                    return Err(ConfigError::invalid(
                        format!("chemistry.kinetics[{}].monod", i),
                        m.half_saturation,
                        "半饱和常数必须为正",
                    ));
                }
            }
            for inh in &k.inhibition {
                self.check_reference(&inh.species, format!("kinetics[{}].inhibition", i), false)?;
            }
            if let Some(biomass) = &k.biomass {
                self.check_reference(biomass, format!("kinetics[{}].biomass", i), false)?;
            }
        }

        self.check_grid("chemistry.debye_huckel.a".to_string(), &self.debye_huckel.a)?;
        self.check_grid("chemistry.debye_huckel.b".to_string(), &self.debye_huckel.b)?;
        self.check_grid("chemistry.debye_huckel.bdot".to_string(), &self.debye_huckel.bdot)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calcite_system() -> ChemistryConfig {
        ChemistryConfig {
            primary: vec![
                PrimarySpeciesConfig::aqueous("Ca++", 2.0),
                PrimarySpeciesConfig::aqueous("H+", 1.0),
                PrimarySpeciesConfig::aqueous("HCO3-", -1.0),
                PrimarySpeciesConfig::mineral("Calcite", 100.09, 36.934),
            ],
            secondary: vec![SecondarySpeciesConfig {
                name: "CO2(aq)".to_string(),
                kind: SpeciesKindConfig::Aqueous,
                charge: 0.0,
                size_factor: 0.0,
                stoichiometry: vec![StoichTerm::new("H+", 1.0), StoichTerm::new("HCO3-", 1.0)],
                log_k: vec![-6.34],
            }],
            minerals: vec![MineralConfig {
                name: "Calcite".to_string(),
                stoichiometry: vec![
                    StoichTerm::new("Ca++", 1.0),
                    StoichTerm::new("H+", -1.0),
                    StoichTerm::new("HCO3-", 1.0),
                ],
                log_k: vec![1.85],
            }],
            kinetics: vec![KineticConfig {
                mineral: "Calcite".to_string(),
                label: "h+".to_string(),
                rate_law: RateLawConfig::Tst,
                log_rate: -5.81,
                activation_energy: 14.4,
                dependence: vec![DependenceTerm { species: "H+".to_string(), power: 1.0 }],
                monod: Vec::new(),
                inhibition: Vec::new(),
                biomass: None,
            }],
            ..ChemistryConfig::default()
        }
    }

    #[test]
    fn test_valid_system() {
        assert!(calcite_system().validate().is_ok());
    }

    #[test]
    fn test_unknown_dependence_species() {
        let mut chem = calcite_system();
        chem.kinetics[0].dependence[0].species = "OH-".to_string();
        match chem.validate() {
            Err(ConfigError::UnknownSpecies { name, .. }) => assert_eq!(name, "OH-"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_name() {
        let mut chem = calcite_system();
        chem.primary.push(PrimarySpeciesConfig::aqueous("Ca++", 2.0));
        assert!(chem.validate().is_err());
    }

    #[test]
    fn test_log_k_grid_length() {
        let mut chem = calcite_system();
        chem.temperatures = vec![0.0, 25.0, 60.0];
        chem.minerals[0].log_k = vec![2.0, 1.85];
        assert!(chem.validate().is_err());
        chem.minerals[0].log_k = vec![2.0, 1.85, 1.3];
        chem.debye_huckel.a = vec![0.49, 0.51, 0.54];
        assert!(chem.validate().is_ok());
    }

    #[test]
    fn test_mineral_may_reference_secondary() {
        let mut chem = calcite_system();
        chem.minerals[0].stoichiometry = vec![
            StoichTerm::new("Ca++", 1.0),
            StoichTerm::new("H+", -2.0),
            StoichTerm::new("CO2(aq)", 1.0),
        ];
        assert!(chem.validate().is_ok());
    }
}
