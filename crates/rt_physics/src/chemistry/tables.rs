// crates/rt_physics/src/chemistry/tables.rs

//! 不可变化学查找表
//!
//! 构建步骤：
//!
//! 1. 初级物种稳定排序（水相 → 吸附 → 阳离子交换 → 矿物），次级物种追加其后
//! 2. 依赖矩阵 `dependency[sec][j]`，列覆盖非矿物初级物种
//! 3. 总浓度矩阵：初级块为单位阵，次级块为依赖系数
//! 4. 矿物溶解计量展开到初级物种，引用次级物种时叠加其平衡常数
//! 5. 根据总浓度矩阵判定 MIXED 迁移性
//!
//! 平衡常数均按解离方向书写：次级物种满足
//! `log s = Σ ν (log p + γ) − log K − γ_s`。

use std::collections::HashMap;

use nalgebra::DMatrix;
use rt_config::{ChemistryConfig, MineralVolumeMode, SpeciesKindConfig, TransportConfig};

use super::kinetics::{KineticReaction, RateLaw};
use super::species::{Mobility, Species, SpeciesKind, PROTON};
use super::thermo::{arrhenius_factor, interpolate_grid};
use super::ChemError;

/// 化学查找表
#[derive(Debug, Clone)]
pub struct ChemTables {
    /// 全部物种（初级在前，次级在后）
    species: Vec<Species>,
    /// 名称 → 索引
    index: HashMap<String, usize>,

    num_primary: usize,
    num_secondary: usize,
    num_mineral: usize,
    num_aqueous: usize,

    /// 依赖矩阵 [num_secondary × num_sdc]
    dependency: DMatrix<f64>,
    /// 总浓度矩阵 [num_primary × (num_primary + num_secondary)]
    total_conc: DMatrix<f64>,
    /// 动力学计量矩阵 [num_kinetic × num_primary]
    kinetic_stoich: DMatrix<f64>,

    /// 次级物种 log K（温度网格）
    secondary_log_k: Vec<Vec<f64>>,
    /// 动力学反应对应矿物的 log K（温度网格）
    kinetic_log_k: Vec<Vec<f64>>,
    kinetics: Vec<KineticReaction>,

    temperatures: Vec<f64>,
    reference_temperature: f64,
    temperature_coupling: bool,
    dh_a: Vec<f64>,
    dh_b: Vec<f64>,
    dh_bdot: Vec<f64>,
    mineral_volume_mode: MineralVolumeMode,
    proton: Option<usize>,
}

/// 按温度网格广播相加 `acc += coef · values`
fn add_grid(acc: &mut Vec<f64>, values: &[f64], coef: f64) {
    if values.len() > acc.len() && acc.len() == 1 {
        let base = acc[0];
        *acc = vec![base; values.len()];
    }
    for (i, a) in acc.iter_mut().enumerate() {
        let v = if values.len() == 1 { values[0] } else { values[i] };
        *a += coef * v;
    }
}

impl ChemTables {
    /// 由化学配置构建，扩散与弥散缺省值取 [`TransportConfig::default`]
    pub fn from_config(config: &ChemistryConfig) -> Result<Self, ChemError> {
        Self::build(config, &TransportConfig::default())
    }

    /// 由化学配置与输运配置构建
    pub fn build(config: &ChemistryConfig, transport: &TransportConfig) -> Result<Self, ChemError> {
        config.validate()?;

        // 初级物种稳定排序
        let mut primaries: Vec<&rt_config::PrimarySpeciesConfig> = config.primary.iter().collect();
        primaries.sort_by_key(|p| SpeciesKind::from(p.kind).rank());

        let num_primary = primaries.len();
        let num_secondary = config.secondary.len();

        let mut species = Vec::with_capacity(num_primary + num_secondary);
        for p in &primaries {
            let kind = SpeciesKind::from(p.kind);
            species.push(Species {
                name: p.name.clone(),
                kind,
                mobility: kind.base_mobility(),
                molar_mass: p.molar_mass,
                molar_volume: p.molar_volume,
                charge: p.charge,
                size_factor: p.size_factor,
                diffusion: p.diffusion.unwrap_or(transport.diffusion),
                dispersion: p.dispersion.unwrap_or(transport.dispersion),
            });
        }
        for s in &config.secondary {
            let kind = SpeciesKind::from(s.kind);
            species.push(Species {
                name: s.name.clone(),
                kind,
                mobility: kind.base_mobility(),
                molar_mass: 0.0,
                molar_volume: 0.0,
                charge: s.charge,
                size_factor: s.size_factor,
                diffusion: transport.diffusion,
                dispersion: transport.dispersion,
            });
        }

        let index: HashMap<String, usize> = species
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();

        let num_mineral = species[..num_primary].iter().filter(|s| s.is_mineral()).count();
        let num_aqueous = species[..num_primary].iter().filter(|s| s.is_aqueous()).count();
        let num_sdc = num_primary - num_mineral;

        let lookup = |name: &str, context: &str| -> Result<usize, ChemError> {
            index.get(name).copied().ok_or_else(|| ChemError::SpeciesNotFound {
                name: name.to_string(),
                context: context.to_string(),
            })
        };

        // 依赖矩阵与次级 log K
        let mut dependency: DMatrix<f64> = DMatrix::zeros(num_secondary, num_sdc);
        let mut secondary_log_k = Vec::with_capacity(num_secondary);
        for (i, sec) in config.secondary.iter().enumerate() {
            let context = format!("secondary.{}", sec.name);
            for term in &sec.stoichiometry {
                let j = lookup(&term.species, &context)?;
                if j >= num_sdc {
                    return Err(ChemError::InvalidReference {
                        name: term.species.clone(),
                        context,
                        reason: "次级物种只能依赖非矿物初级物种".into(),
                    });
                }
                dependency[(i, j)] += term.coefficient;
            }
            let mut log_k = sec.log_k.clone();
            if sec.kind == SpeciesKindConfig::CationExchange && config.calibration.xsorption != 0.0 {
                add_grid(&mut log_k, &[config.calibration.xsorption], 1.0);
            }
            secondary_log_k.push(log_k);
        }

        // 总浓度矩阵
        let mut total_conc: DMatrix<f64> = DMatrix::zeros(num_primary, num_primary + num_secondary);
        for i in 0..num_primary {
            total_conc[(i, i)] = 1.0;
        }
        for sec in 0..num_secondary {
            for j in 0..num_sdc {
                total_conc[(j, num_primary + sec)] += dependency[(sec, j)];
            }
        }

        // 矿物溶解计量展开
        let mut mineral_stoich: HashMap<usize, (Vec<f64>, Vec<f64>)> = HashMap::new();
        for mineral in &config.minerals {
            let context = format!("minerals.{}", mineral.name);
            let pos = lookup(&mineral.name, &context)?;
            if pos >= num_primary || !species[pos].is_mineral() {
                return Err(ChemError::InvalidReference {
                    name: mineral.name.clone(),
                    context,
                    reason: "必须是矿物类初级物种".into(),
                });
            }
            let mut row = vec![0.0; num_primary];
            let mut log_k = mineral.log_k.clone();
            for term in &mineral.stoichiometry {
                let k = lookup(&term.species, &context)?;
                if k < num_primary {
                    row[k] += term.coefficient;
                } else {
                    let sec = k - num_primary;
                    for (l, r) in row.iter_mut().enumerate().take(num_sdc) {
                        *r += term.coefficient * dependency[(sec, l)];
                    }
                    add_grid(&mut log_k, &secondary_log_k[sec], term.coefficient);
                }
            }
            row[pos] = -1.0;
            mineral_stoich.insert(pos, (row, log_k));
        }

        // 动力学表
        let position = |name: &str, context: &str| -> Result<usize, ChemError> {
            let p = lookup(name, context)?;
            if p >= num_primary {
                return Err(ChemError::InvalidReference {
                    name: name.to_string(),
                    context: context.to_string(),
                    reason: "只能引用初级物种".into(),
                });
            }
            Ok(p)
        };

        let num_kinetic = config.kinetics.len();
        let mut kinetic_stoich: DMatrix<f64> = DMatrix::zeros(num_kinetic, num_primary);
        let mut kinetic_log_k = Vec::with_capacity(num_kinetic);
        let mut kinetics = Vec::with_capacity(num_kinetic);
        for (i, kin) in config.kinetics.iter().enumerate() {
            let context = format!("kinetics.{}", kin.mineral);
            let mineral = position(&kin.mineral, &context)?;
            let (row, log_k) = mineral_stoich.get(&mineral).ok_or_else(|| {
                ChemError::InvalidReference {
                    name: kin.mineral.clone(),
                    context: context.clone(),
                    reason: "缺少矿物溶解反应定义".into(),
                }
            })?;
            for (j, v) in row.iter().enumerate() {
                kinetic_stoich[(i, j)] = *v;
            }
            kinetic_log_k.push(log_k.clone());

            let dependence = kin
                .dependence
                .iter()
                .map(|d| position(&d.species, &context).map(|p| (p, d.power)))
                .collect::<Result<Vec<_>, ChemError>>()?;
            let monod = kin
                .monod
                .iter()
                .map(|m| position(&m.species, &context).map(|p| (p, m.half_saturation)))
                .collect::<Result<Vec<_>, ChemError>>()?;
            let inhibition = kin
                .inhibition
                .iter()
                .map(|m| position(&m.species, &context).map(|p| (p, m.constant)))
                .collect::<Result<Vec<_>, ChemError>>()?;
            let biomass = kin
                .biomass
                .as_deref()
                .map(|b| position(b, &context))
                .transpose()?;

            kinetics.push(KineticReaction {
                label: kin.label.clone(),
                mineral,
                rate_law: RateLaw::from(kin.rate_law),
                log_rate: kin.log_rate + config.calibration.rate,
                activation_energy: kin.activation_energy,
                dependence,
                monod,
                inhibition,
                biomass,
            });
        }

        // MIXED 判定
        for i in 0..num_primary {
            let own = species[i].mobility;
            let mixed = (0..num_primary + num_secondary).any(|j| {
                j != i && total_conc[(i, j)] != 0.0 && species[j].mobility != own
            });
            if mixed {
                species[i].mobility = Mobility::Mixed;
            }
        }

        let proton = index.get(PROTON).copied().filter(|&p| p < num_primary);

        let tables = Self {
            species,
            index,
            num_primary,
            num_secondary,
            num_mineral,
            num_aqueous,
            dependency,
            total_conc,
            kinetic_stoich,
            secondary_log_k,
            kinetic_log_k,
            kinetics,
            temperatures: config.temperatures.clone(),
            reference_temperature: config.reference_temperature,
            temperature_coupling: config.temperature_coupling,
            dh_a: config.debye_huckel.a.clone(),
            dh_b: config.debye_huckel.b.clone(),
            dh_bdot: config.debye_huckel.bdot.clone(),
            mineral_volume_mode: config.mineral_volume_mode,
            proton,
        };

        log::debug!(
            "化学表构建完成: 初级 {} (水相 {}, 矿物 {}), 次级 {}, 动力学 {}",
            tables.num_primary,
            tables.num_aqueous,
            tables.num_mineral,
            tables.num_secondary,
            tables.kinetics.len()
        );
        for (i, s) in tables.species.iter().enumerate() {
            log::trace!("  [{}] {} {:?} {:?}", i, s.name, s.kind, s.mobility);
        }
        if tables.num_secondary > 0 {
            log::debug!("依赖矩阵: {}", tables.dependency);
        }

        Ok(tables)
    }

    // =========================================================================
    // 计数与索引
    // =========================================================================

    /// 初级物种数
    #[inline]
    pub fn num_primary(&self) -> usize {
        self.num_primary
    }

    /// 次级物种数
    #[inline]
    pub fn num_secondary(&self) -> usize {
        self.num_secondary
    }

    /// 矿物数
    #[inline]
    pub fn num_mineral(&self) -> usize {
        self.num_mineral
    }

    /// 水相初级物种数，即随水流输运的物种数
    #[inline]
    pub fn num_aqueous(&self) -> usize {
        self.num_aqueous
    }

    /// 非矿物初级物种数（Newton 未知量个数）
    #[inline]
    pub fn num_sdc(&self) -> usize {
        self.num_primary - self.num_mineral
    }

    /// 动力学反应数
    #[inline]
    pub fn num_kinetic(&self) -> usize {
        self.kinetics.len()
    }

    /// 全部物种数
    #[inline]
    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    /// 物种属性
    #[inline]
    pub fn species(&self, i: usize) -> &Species {
        &self.species[i]
    }

    /// 全部物种
    pub fn all_species(&self) -> &[Species] {
        &self.species
    }

    /// 按名称查找物种索引
    pub fn find(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// 质子索引
    #[inline]
    pub fn proton(&self) -> Option<usize> {
        self.proton
    }

    /// 第一个矿物的初级索引
    #[inline]
    pub fn first_mineral(&self) -> usize {
        self.num_primary - self.num_mineral
    }

    /// 矿物体积分数模式
    pub fn mineral_volume_mode(&self) -> MineralVolumeMode {
        self.mineral_volume_mode
    }

    // =========================================================================
    // 矩阵
    // =========================================================================

    /// 依赖矩阵
    #[inline]
    pub fn dependency(&self) -> &DMatrix<f64> {
        &self.dependency
    }

    /// 总浓度矩阵
    #[inline]
    pub fn total_conc(&self) -> &DMatrix<f64> {
        &self.total_conc
    }

    /// 动力学计量矩阵
    #[inline]
    pub fn kinetic_stoich(&self) -> &DMatrix<f64> {
        &self.kinetic_stoich
    }

    /// 动力学反应
    pub fn kinetics(&self) -> &[KineticReaction] {
        &self.kinetics
    }

    // =========================================================================
    // 温度相关参数
    // =========================================================================

    fn effective_temperature(&self, temperature: f64) -> f64 {
        if self.temperature_coupling {
            temperature
        } else {
            self.reference_temperature
        }
    }

    /// 次级物种 log K
    pub fn secondary_log_k(&self, sec: usize, temperature: f64) -> f64 {
        interpolate_grid(
            &self.temperatures,
            &self.secondary_log_k[sec],
            self.effective_temperature(temperature),
        )
    }

    /// 动力学反应 log K
    pub fn kinetic_log_k(&self, kin: usize, temperature: f64) -> f64 {
        interpolate_grid(
            &self.temperatures,
            &self.kinetic_log_k[kin],
            self.effective_temperature(temperature),
        )
    }

    /// Debye-Hückel (A, B, b-dot)
    pub fn debye_huckel(&self, temperature: f64) -> (f64, f64, f64) {
        let t = self.effective_temperature(temperature);
        (
            interpolate_grid(&self.temperatures, &self.dh_a, t),
            interpolate_grid(&self.temperatures, &self.dh_b, t),
            interpolate_grid(&self.temperatures, &self.dh_bdot, t),
        )
    }

    /// 动力学速率温度修正因子，关闭温度耦合时为 1
    pub fn rate_factor(&self, kin: usize, temperature: f64) -> f64 {
        if self.temperature_coupling {
            arrhenius_factor(
                self.kinetics[kin].activation_energy,
                temperature,
                self.reference_temperature,
            )
        } else {
            1.0
        }
    }
}
