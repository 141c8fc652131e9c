// crates/rt_physics/src/mesh/mod.rs

//! 控制体网格
//!
//! 陆面三角单元、河段与可选基岩层的拓扑与材料属性。网格在运行期只读。
//!
//! # 河岸边
//!
//! 单元边 `j` 若 `nabr_river[j]` 有值，则该边为河岸边：地下水通量的交换
//! 对象是对应河段的河床区，而非相邻单元。河段的 `left`/`right` 必须反向
//! 指回该单元。

mod element;
mod river;

pub use element::{BedrockBoundary, Element, ElementTopology, SoilProps, NUM_EDGE};
pub use river::{BankSide, River, RiverMaterial, RiverTopology};

use rt_foundation::{RtError, RtResult};

/// 流域网格
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// 陆面单元
    pub elements: Vec<Element>,
    /// 河段
    pub rivers: Vec<River>,
}

impl Mesh {
    /// 创建网格
    pub fn new(elements: Vec<Element>, rivers: Vec<River>) -> Self {
        Self { elements, rivers }
    }

    /// 单元数
    #[inline]
    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// 河段数
    #[inline]
    pub fn num_rivers(&self) -> usize {
        self.rivers.len()
    }

    /// 单元 `elem` 中与河段 `river` 相邻的边
    pub fn bank_edge(&self, elem: usize, river: usize) -> Option<usize> {
        self.elements
            .get(elem)?
            .topo
            .nabr_river
            .iter()
            .position(|r| *r == Some(river))
    }

    /// 单元 `elem` 位于河段 `river` 的哪一侧
    pub fn bank_side(&self, river: usize, elem: usize) -> Option<BankSide> {
        let r = self.rivers.get(river)?;
        if r.topo.left == Some(elem) {
            Some(BankSide::Left)
        } else if r.topo.right == Some(elem) {
            Some(BankSide::Right)
        } else {
            None
        }
    }

    /// 检查索引范围、相邻关系互反与河岸一致性
    pub fn validate(&self) -> RtResult<()> {
        let ne = self.num_elements();
        let nr = self.num_rivers();

        for (i, elem) in self.elements.iter().enumerate() {
            if !(elem.topo.area > 0.0) {
                return Err(RtError::invalid_mesh(format!("单元 {} 面积必须为正", i + 1)));
            }
            if !(elem.soil.depth > 0.0) || elem.soil.porosity() <= 0.0 {
                return Err(RtError::invalid_mesh(format!("单元 {} 土壤参数无效", i + 1)));
            }
            for j in 0..NUM_EDGE {
                if let Some(n) = elem.topo.nabr[j] {
                    RtError::check_index("Element", n, ne)?;
                    let back = self.elements[n].topo.nabr.iter().any(|&b| b == Some(i));
                    if !back {
                        return Err(RtError::invalid_mesh(format!(
                            "单元 {} 边 {} 的邻居 {} 未反向引用",
                            i + 1,
                            j,
                            n + 1
                        )));
                    }
                    if !(elem.topo.nabr_dist[j] > 0.0) {
                        return Err(RtError::invalid_mesh(format!(
                            "单元 {} 边 {} 距离必须为正",
                            i + 1,
                            j
                        )));
                    }
                }
                if let Some(r) = elem.topo.nabr_river[j] {
                    RtError::check_index("River", r, nr)?;
                    if self.bank_side(r, i).is_none() {
                        return Err(RtError::invalid_mesh(format!(
                            "单元 {} 边 {} 的河段 {} 两岸均未指向该单元",
                            i + 1,
                            j,
                            r + 1
                        )));
                    }
                    if !(elem.topo.nabr_dist[j] > 0.0) {
                        return Err(RtError::invalid_mesh(format!(
                            "单元 {} 河岸边 {} 距离必须为正",
                            i + 1,
                            j
                        )));
                    }
                }
            }
        }

        for (i, river) in self.rivers.iter().enumerate() {
            if !(river.topo.area > 0.0) {
                return Err(RtError::invalid_mesh(format!("河段 {} 面积必须为正", i + 1)));
            }
            for bank in [river.topo.left, river.topo.right].into_iter().flatten() {
                RtError::check_index("Element", bank, ne)?;
                if self.bank_edge(bank, i).is_none() {
                    return Err(RtError::invalid_mesh(format!(
                        "河段 {} 的岸单元 {} 没有对应的河岸边",
                        i + 1,
                        bank + 1
                    )));
                }
            }
            if let Some(d) = river.topo.down {
                RtError::check_index("River", d, nr)?;
                if d == i || !(river.topo.dist_down > 0.0) {
                    return Err(RtError::invalid_mesh(format!("河段 {} 下游连接无效", i + 1)));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_elements_one_river() -> Mesh {
        let mut a = Element::new(100.0, SoilProps::new(2.0, 0.4, 0.05));
        let mut b = Element::new(100.0, SoilProps::new(2.0, 0.4, 0.05));
        a.topo.nabr_river[0] = Some(0);
        a.topo.nabr_dist[0] = 5.0;
        b.topo.nabr_river[1] = Some(0);
        b.topo.nabr_dist[1] = 5.0;
        let mut r = River::new(20.0, 2.0, RiverMaterial::new(1.0, 0.3, 0.05));
        r.topo.left = Some(0);
        r.topo.right = Some(1);
        Mesh::new(vec![a, b], vec![r])
    }

    #[test]
    fn test_valid_bank_topology() {
        let mesh = two_elements_one_river();
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.bank_edge(1, 0), Some(1));
        assert_eq!(mesh.bank_side(0, 0), Some(BankSide::Left));
        assert_eq!(mesh.bank_side(0, 1), Some(BankSide::Right));
    }

    #[test]
    fn test_missing_back_reference() {
        let mut mesh = two_elements_one_river();
        mesh.elements[0].topo.nabr[1] = Some(1);
        mesh.elements[0].topo.nabr_dist[1] = 3.0;
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_bank_mismatch() {
        let mut mesh = two_elements_one_river();
        mesh.rivers[0].topo.right = None;
        assert!(mesh.validate().is_err());
    }
}
