// crates/rt_physics/src/mesh/element.rs

//! 陆面三角单元

/// 三角单元边数
pub const NUM_EDGE: usize = 3;

/// 土壤或基岩材料
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilProps {
    /// 层厚 [m]
    pub depth: f64,
    /// 饱和含水率
    pub smcmax: f64,
    /// 残余含水率
    pub smcmin: f64,
}

impl SoilProps {
    /// 创建材料
    pub fn new(depth: f64, smcmax: f64, smcmin: f64) -> Self {
        Self {
            depth,
            smcmax,
            smcmin,
        }
    }

    /// 有效孔隙度 `smcmax − smcmin`
    #[inline]
    pub fn porosity(&self) -> f64 {
        self.smcmax - self.smcmin
    }
}

/// 单元拓扑与几何
#[derive(Debug, Clone, PartialEq)]
pub struct ElementTopology {
    /// 面积 [m²]
    pub area: f64,
    /// 每条边的相邻单元
    pub nabr: [Option<usize>; NUM_EDGE],
    /// 每条边的相邻河段（河岸边）
    pub nabr_river: [Option<usize>; NUM_EDGE],
    /// 到相邻控制体的中心距离 [m]
    pub nabr_dist: [f64; NUM_EDGE],
    /// 边长 [m]
    pub edge_length: [f64; NUM_EDGE],
}

/// 基岩侧边界条件
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BedrockBoundary {
    /// 无通量
    #[default]
    NoFlow,
    /// 给定浓度的通量边界，流入时使用 `conc`
    Flux {
        /// 边界浓度（每个输运物种）
        conc: Vec<f64>,
    },
}

/// 陆面单元
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// 拓扑
    pub topo: ElementTopology,
    /// 土壤层
    pub soil: SoilProps,
    /// 基岩层
    pub geol: SoilProps,
    /// 每条边的基岩边界条件（仅无邻居的边生效）
    pub fbr_bc: [BedrockBoundary; NUM_EDGE],
}

impl Element {
    /// 创建孤立单元，基岩层默认与土壤层相同
    pub fn new(area: f64, soil: SoilProps) -> Self {
        Self {
            topo: ElementTopology {
                area,
                nabr: [None; NUM_EDGE],
                nabr_river: [None; NUM_EDGE],
                nabr_dist: [0.0; NUM_EDGE],
                edge_length: [0.0; NUM_EDGE],
            },
            soil,
            geol: soil,
            fbr_bc: Default::default(),
        }
    }

    /// 设置基岩层
    pub fn with_geol(mut self, geol: SoilProps) -> Self {
        self.geol = geol;
        self
    }

    /// 设置边 `j` 的相邻单元
    pub fn with_neighbor(mut self, j: usize, nabr: usize, dist: f64, edge_length: f64) -> Self {
        self.topo.nabr[j] = Some(nabr);
        self.topo.nabr_dist[j] = dist;
        self.topo.edge_length[j] = edge_length;
        self
    }

    /// 设置边 `j` 为河岸边
    pub fn with_bank(mut self, j: usize, river: usize, dist: f64, edge_length: f64) -> Self {
        self.topo.nabr_river[j] = Some(river);
        self.topo.nabr_dist[j] = dist;
        self.topo.edge_length[j] = edge_length;
        self
    }
}
