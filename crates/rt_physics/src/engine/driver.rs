// crates/rt_physics/src/engine/driver.rs

//! 反应输运驱动器
//!
//! 算子分裂推进：
//!
//! ```text
//! advance(t_next):
//!   降水浓度采样
//!   [到达反应间隔] 全流域反应 -> 摩尔数写回 y
//!   积分器推进 [t, t_next]
//!   解包状态，刷新浓度
//!   [到达形态计算间隔] 河道形态计算
//!   日统计累加，跨日时输出并清零
//! ```

use rt_config::RtConfig;
use rt_foundation::constants::DAY_IN_SEC;
use rt_foundation::{RtError, RtResult};
use serde::Serialize;

use super::time_integrator::{ForwardEuler, IntegrationStats, StiffIntegrator};
use crate::chemistry::ChemTables;
use crate::forcing::{DailyAccumulator, DailyAverages, PrcpConcForcing};
use crate::hydrology::{ElementWaterState, HydroState, Hydrology, RiverWaterState, StaticHydrology};
use crate::mesh::Mesh;
use crate::ode::OdeAssembler;
use crate::reaction::{ReactionSolver, ReactionSummary};
use crate::state::{ChemField, ElementRestart};
use crate::transport::NitrogenField;

/// 间隔比较容差 [s]
const CADENCE_TOLERANCE: f64 = 1e-6;

/// 单次推进报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct StepReport {
    /// 推进后的时间 [s]
    pub time: f64,
    /// 积分统计
    pub stats: IntegrationStats,
    /// 本次执行的反应统计
    pub reaction: Option<ReactionSummary>,
    /// 本次河道形态计算未收敛的河段数
    pub speciation_failures: Option<usize>,
    /// 跨日时各单元的日平均值
    pub daily: Option<Vec<DailyAverages>>,
}

impl StepReport {
    /// 序列化为 JSON
    pub fn to_json(&self) -> RtResult<String> {
        serde_json::to_string(self).map_err(|e| RtError::parse(e.to_string()))
    }
}

// ============================================================================
// 构建器
// ============================================================================

/// 驱动器构建器
pub struct RtDriverBuilder {
    config: RtConfig,
    mesh: Option<Mesh>,
    hydrology: Option<Box<dyn Hydrology>>,
    water: Option<(Vec<ElementWaterState>, Vec<RiverWaterState>)>,
    restarts: Option<Vec<ElementRestart>>,
    prcp: Option<PrcpConcForcing>,
    integrator: Option<Box<dyn StiffIntegrator>>,
    nitrogen: Option<NitrogenField>,
    soil_layers: usize,
}

impl RtDriverBuilder {
    /// 由运行配置创建
    pub fn new(config: RtConfig) -> Self {
        Self {
            config,
            mesh: None,
            hydrology: None,
            water: None,
            restarts: None,
            prcp: None,
            integrator: None,
            nitrogen: None,
            soil_layers: 0,
        }
    }

    /// 网格（必需）
    pub fn mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// 水文模型，缺省为零通量的 [`StaticHydrology`]
    pub fn hydrology(mut self, hydrology: impl Hydrology + 'static) -> Self {
        self.hydrology = Some(Box::new(hydrology));
        self
    }

    /// 初始水量状态，缺省全为 0
    pub fn water_states(
        mut self,
        elements: Vec<ElementWaterState>,
        rivers: Vec<RiverWaterState>,
    ) -> Self {
        self.water = Some((elements, rivers));
        self
    }

    /// 各单元重启值（必需）
    pub fn restarts(mut self, restarts: Vec<ElementRestart>) -> Self {
        self.restarts = Some(restarts);
        self
    }

    /// 降水浓度，缺省为 0
    pub fn prcp_conc(mut self, prcp: PrcpConcForcing) -> Self {
        self.prcp = Some(prcp);
        self
    }

    /// 积分器，缺省为按 `maxstep` 推进的 [`ForwardEuler`]
    pub fn integrator(mut self, integrator: impl StiffIntegrator + 'static) -> Self {
        self.integrator = Some(Box::new(integrator));
        self
    }

    /// 初始氮状态
    pub fn nitrogen_field(mut self, field: NitrogenField) -> Self {
        self.nitrogen = Some(field);
        self
    }

    /// 日统计的土层数
    pub fn soil_layers(mut self, n: usize) -> Self {
        self.soil_layers = n;
        self
    }

    /// 构建驱动器
    pub fn build(self) -> RtResult<RtDriver> {
        let config = self.config;
        config.validate()?;
        let caps = config.capabilities;

        let mesh = self.mesh.ok_or_else(|| RtError::missing_config("mesh"))?;
        mesh.validate()?;
        let (ne, nr) = (mesh.num_elements(), mesh.num_rivers());
        let restarts = self.restarts.ok_or_else(|| RtError::missing_config("restarts"))?;

        let tables = ChemTables::build(&config.chemistry, &config.transport)?;
        let n = tables.num_aqueous();

        let mut hydro = HydroState::new(ne, nr);
        if let Some((elem_ws, river_ws)) = self.water {
            RtError::check_size("elem_ws", ne, elem_ws.len())?;
            RtError::check_size("river_ws", nr, river_ws.len())?;
            hydro.elem_ws = elem_ws;
            hydro.river_ws = river_ws;
        }

        let solver = ReactionSolver::new(&config.reaction);
        let chem = ChemField::initialize(&tables, &mesh, &hydro, &restarts, caps.bedrock, |chms| {
            if caps.reaction {
                solver.speciate(&tables, chms, true);
            } else {
                chms.update_free_conc(n);
            }
        })?;

        let prcp = self
            .prcp
            .unwrap_or_else(|| PrcpConcForcing::Constant(vec![0.0; n]));
        prcp.check(n)?;

        let hydrology = self
            .hydrology
            .unwrap_or_else(|| Box::new(StaticHydrology::new(ne, nr)));
        let integrator = self
            .integrator
            .unwrap_or_else(|| Box::new(ForwardEuler::from_config(&config.integrator)));

        let mut model = OdeAssembler::new(tables, mesh, hydrology, hydro, chem, &config)?;
        if let Some(field) = self.nitrogen {
            model.set_nitrogen_field(field)?;
        }
        model.refresh_concentrations()?;

        let mut y = vec![0.0; model.layout().len()];
        model.pack(&mut y)?;

        log::info!(
            "驱动器构建完成: 积分器 {}, 输运 {}, 反应 {}, 基岩 {}, 氮 {}",
            integrator.name(),
            caps.transport,
            caps.reaction,
            caps.bedrock,
            caps.nitrogen
        );

        Ok(RtDriver {
            time: config.time.start,
            prcp_buf: vec![0.0; n],
            daily: vec![DailyAccumulator::new(self.soil_layers); ne],
            solver,
            config,
            model,
            integrator,
            prcp,
            y,
            last_reaction: None,
            last_speciation: None,
        })
    }
}

// ============================================================================
// 驱动器
// ============================================================================

/// 反应输运驱动器
pub struct RtDriver {
    config: RtConfig,
    model: OdeAssembler,
    integrator: Box<dyn StiffIntegrator>,
    solver: ReactionSolver,
    prcp: PrcpConcForcing,
    prcp_buf: Vec<f64>,
    daily: Vec<DailyAccumulator>,
    y: Vec<f64>,
    time: f64,
    last_reaction: Option<f64>,
    last_speciation: Option<f64>,
}

impl std::fmt::Debug for RtDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtDriver")
            .field("time", &self.time)
            .field("integrator", &self.integrator.name())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// 距上次执行是否已满一个间隔
fn cadence_due(last: Option<f64>, now: f64, interval: f64) -> bool {
    last.map_or(true, |l| now - l >= interval - CADENCE_TOLERANCE)
}

impl RtDriver {
    /// 当前时间 [s]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// 运行配置
    pub fn config(&self) -> &RtConfig {
        &self.config
    }

    /// 耦合模型
    pub fn model(&self) -> &OdeAssembler {
        &self.model
    }

    /// 可变耦合模型
    pub fn model_mut(&mut self) -> &mut OdeAssembler {
        &mut self.model
    }

    /// 状态向量
    pub fn state_vector(&self) -> &[f64] {
        &self.y
    }

    /// 各单元日统计
    pub fn daily(&self) -> &[DailyAccumulator] {
        &self.daily
    }

    /// 积分器名称
    pub fn integrator_name(&self) -> &'static str {
        self.integrator.name()
    }

    fn reaction_due(&self, t: f64) -> bool {
        let tc = &self.config.time;
        t >= tc.start + tc.reaction_delay - CADENCE_TOLERANCE
            && cadence_due(self.last_reaction, t, tc.reaction_step)
    }

    /// 推进到 `t_next`
    pub fn advance(&mut self, t_next: f64) -> RtResult<StepReport> {
        let t = self.time;
        if !(t_next > t) {
            return Err(RtError::integrator(format!(
                "目标时间 {} 不晚于当前时间 {}",
                t_next, t
            )));
        }
        let caps = self.config.capabilities;

        self.prcp.sample_into(t, &mut self.prcp_buf);
        self.model.set_prcp_conc(&self.prcp_buf);

        let reaction = if caps.reaction && self.reaction_due(t) {
            let summary = self.model.react(&self.solver, self.config.time.reaction_step)?;
            self.last_reaction = Some(t);
            self.model.pack(&mut self.y)?;
            if summary.failed > 0 {
                log::warn!("t = {} s: {} 个区反应未收敛", t, summary.failed);
            }
            Some(summary)
        } else {
            None
        };

        let stats = self
            .integrator
            .integrate(&mut self.model, &mut self.y, t, t_next)?;
        self.model.unpack(&self.y)?;
        self.model.refresh_concentrations()?;
        self.time = t_next;

        let speciation_failures = if caps.reaction {
            if cadence_due(self.last_speciation, t_next, self.config.time.speciation_step) {
                self.last_speciation = Some(t_next);
                Some(self.model.speciate_rivers(&self.solver))
            } else {
                None
            }
        } else {
            let n = self.model.tables().num_aqueous();
            self.model.chem_mut().update_free_conc(n);
            None
        };

        let daily = self.accumulate_daily(t, t_next);

        log::debug!(
            "推进至 t = {} s: {} 步, {} 次右端项求值",
            t_next,
            stats.steps,
            stats.rhs_evals
        );

        Ok(StepReport {
            time: t_next,
            stats,
            reaction,
            speciation_failures,
            daily,
        })
    }

    /// 以 `stepsize` 为输出间隔推进到 `t_end`
    pub fn run_until(&mut self, t_end: f64) -> RtResult<Vec<StepReport>> {
        let step = self.config.time.stepsize;
        let mut reports = Vec::new();
        while self.time < t_end - CADENCE_TOLERANCE {
            let t_next = (self.time + step).min(t_end);
            reports.push(self.advance(t_next)?);
        }
        Ok(reports)
    }

    fn accumulate_daily(&mut self, t: f64, t_next: f64) -> Option<Vec<DailyAverages>> {
        let dt = t_next - t;
        let hydrology = self.model.hydrology();
        for (i, acc) in self.daily.iter_mut().enumerate() {
            if let Some(sample) = hydrology.daily_sample(i) {
                acc.accumulate(&sample, dt);
            }
        }

        if (t_next / DAY_IN_SEC).floor() > (t / DAY_IN_SEC).floor() {
            let averages = self.daily.iter().map(DailyAccumulator::finalize).collect();
            for acc in &mut self.daily {
                acc.reset();
            }
            Some(averages)
        } else {
            None
        }
    }
}
