// crates/rt_physics/src/mesh/river.rs

//! 河段

/// 河段一侧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankSide {
    /// 左岸
    Left,
    /// 右岸
    Right,
}

/// 河床材料
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiverMaterial {
    /// 河床厚度 [m]
    pub bed_thickness: f64,
    /// 有效孔隙度
    pub porosity: f64,
    /// 残余含水率
    pub smcmin: f64,
}

impl RiverMaterial {
    /// 创建河床材料
    pub fn new(bed_thickness: f64, porosity: f64, smcmin: f64) -> Self {
        Self {
            bed_thickness,
            porosity,
            smcmin,
        }
    }

    /// 饱和含水率 `porosity + smcmin`
    #[inline]
    pub fn smcmax(&self) -> f64 {
        self.porosity + self.smcmin
    }
}

/// 河段拓扑
#[derive(Debug, Clone, PartialEq)]
pub struct RiverTopology {
    /// 水面面积 [m²]
    pub area: f64,
    /// 河宽 [m]
    pub width: f64,
    /// 左岸单元
    pub left: Option<usize>,
    /// 右岸单元
    pub right: Option<usize>,
    /// 下游河段，`None` 为出口
    pub down: Option<usize>,
    /// 到下游河段的距离 [m]
    pub dist_down: f64,
}

/// 河段
#[derive(Debug, Clone, PartialEq)]
pub struct River {
    /// 拓扑
    pub topo: RiverTopology,
    /// 河床
    pub matl: RiverMaterial,
}

impl River {
    /// 创建孤立河段
    pub fn new(area: f64, width: f64, matl: RiverMaterial) -> Self {
        Self {
            topo: RiverTopology {
                area,
                width,
                left: None,
                right: None,
                down: None,
                dist_down: 0.0,
            },
            matl,
        }
    }

    /// 设置下游河段
    pub fn with_down(mut self, down: usize, dist: f64) -> Self {
        self.topo.down = Some(down);
        self.topo.dist_down = dist;
        self
    }

    /// 设置两岸单元
    pub fn with_banks(mut self, left: Option<usize>, right: Option<usize>) -> Self {
        self.topo.left = left;
        self.topo.right = right;
        self
    }

    /// 指定一侧的岸单元
    #[inline]
    pub fn bank(&self, side: BankSide) -> Option<usize> {
        match side {
            BankSide::Left => self.topo.left,
            BankSide::Right => self.topo.right,
        }
    }
}
