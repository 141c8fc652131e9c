// crates/rt_physics/src/ode/layout.rs

//! ODE 状态向量布局
//!
//! 单元块在前、河段块在后，每个控制体占用连续的一段：
//!
//! ```text
//! 单元: [surf, unsat, gw, (fbr_unsat, fbr_gw), (sminn), (unsat[n], gw[n], (fbr_unsat[n], fbr_gw[n]))]
//! 河段: [stage, gw, (rivern), (stream[n], bed[n])]
//! ```
//!
//! 括号内的分量由能力开关决定是否存在。

use crate::state::ZoneKind;
use rt_config::Capabilities;

/// 单元块内偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementSlots {
    /// 地表水
    pub surf: usize,
    /// 非饱和区水
    pub unsat: usize,
    /// 地下水
    pub gw: usize,
    /// 基岩 (非饱和区, 地下水)
    pub bedrock: Option<(usize, usize)>,
    /// 矿质氮
    pub sminn: Option<usize>,
    /// 溶质块起点
    pub species: Option<usize>,
}

/// 河段块内偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiverSlots {
    /// 河道水位
    pub stage: usize,
    /// 河床地下水
    pub gw: usize,
    /// 河道氮
    pub rivern: Option<usize>,
    /// 溶质块起点
    pub species: Option<usize>,
}

/// 状态向量布局
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    num_elements: usize,
    num_rivers: usize,
    num_species: usize,
    elem: ElementSlots,
    river: RiverSlots,
    elem_stride: usize,
    river_stride: usize,
}

impl StateLayout {
    /// 由能力开关构建布局，`num_species` 为水相输运物种数
    pub fn new(num_elements: usize, num_rivers: usize, num_species: usize, caps: &Capabilities) -> Self {
        let mut next = 3;
        let bedrock = caps.bedrock.then(|| {
            next += 2;
            (next - 2, next - 1)
        });
        let sminn = caps.nitrogen.then(|| {
            next += 1;
            next - 1
        });
        let elem_zones = if caps.bedrock { 4 } else { 2 };
        let species = (caps.transport && num_species > 0).then(|| {
            next += elem_zones * num_species;
            next - elem_zones * num_species
        });
        let elem = ElementSlots {
            surf: 0,
            unsat: 1,
            gw: 2,
            bedrock,
            sminn,
            species,
        };
        let elem_stride = next;

        let mut next = 2;
        let rivern = caps.nitrogen.then(|| {
            next += 1;
            next - 1
        });
        let species = (caps.transport && num_species > 0).then(|| {
            next += 2 * num_species;
            next - 2 * num_species
        });
        let river = RiverSlots {
            stage: 0,
            gw: 1,
            rivern,
            species,
        };

        Self {
            num_elements,
            num_rivers,
            num_species,
            elem,
            river,
            elem_stride,
            river_stride: next,
        }
    }

    /// 状态向量长度
    #[inline]
    pub fn len(&self) -> usize {
        self.num_elements * self.elem_stride + self.num_rivers * self.river_stride
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 输运物种数
    #[inline]
    pub fn num_species(&self) -> usize {
        self.num_species
    }

    /// 单元块长度
    #[inline]
    pub fn elem_stride(&self) -> usize {
        self.elem_stride
    }

    /// 河段块长度
    #[inline]
    pub fn river_stride(&self) -> usize {
        self.river_stride
    }

    /// 单元块内偏移
    #[inline]
    pub fn elem_slots(&self) -> &ElementSlots {
        &self.elem
    }

    /// 河段块内偏移
    #[inline]
    pub fn river_slots(&self) -> &RiverSlots {
        &self.river
    }

    /// 单元部分的总长度（河段块起点）
    #[inline]
    pub fn river_offset(&self) -> usize {
        self.num_elements * self.elem_stride
    }

    /// 单元 `i` 的全局偏移
    #[inline]
    pub fn elem(&self, i: usize, local: usize) -> usize {
        i * self.elem_stride + local
    }

    /// 河段 `i` 的全局偏移
    #[inline]
    pub fn river(&self, i: usize, local: usize) -> usize {
        self.river_offset() + i * self.river_stride + local
    }

    /// 区 `zone` 中物种 `k` 的块内偏移
    pub fn species_local(&self, zone: ZoneKind, k: usize) -> Option<usize> {
        let n = self.num_species;
        if k >= n {
            return None;
        }
        match zone {
            ZoneKind::Unsat => self.elem.species.map(|s| s + k),
            ZoneKind::Gw => self.elem.species.map(|s| s + n + k),
            ZoneKind::FbrUnsat => self.elem.bedrock.and(self.elem.species).map(|s| s + 2 * n + k),
            ZoneKind::FbrGw => self.elem.bedrock.and(self.elem.species).map(|s| s + 3 * n + k),
            ZoneKind::Stream => self.river.species.map(|s| s + k),
            ZoneKind::Bed => self.river.species.map(|s| s + n + k),
        }
    }

    /// 单元块内偏移对应的物理量名称
    pub fn elem_quantity(&self, local: usize, species_name: impl Fn(usize) -> String) -> String {
        let e = &self.elem;
        if local == e.surf {
            return "surf".into();
        }
        if local == e.unsat {
            return "unsat".into();
        }
        if local == e.gw {
            return "gw".into();
        }
        if let Some((fu, fg)) = e.bedrock {
            if local == fu {
                return "fbr_unsat".into();
            }
            if local == fg {
                return "fbr_gw".into();
            }
        }
        if e.sminn == Some(local) {
            return "sminn".into();
        }
        if let Some(s) = e.species {
            let n = self.num_species.max(1);
            let zones = [ZoneKind::Unsat, ZoneKind::Gw, ZoneKind::FbrUnsat, ZoneKind::FbrGw];
            let rel = local - s;
            return format!("{} ({})", species_name(rel % n), zones[(rel / n).min(3)].name());
        }
        format!("slot {}", local)
    }

    /// 河段块内偏移对应的物理量名称
    pub fn river_quantity(&self, local: usize, species_name: impl Fn(usize) -> String) -> String {
        let r = &self.river;
        if local == r.stage {
            return "stage".into();
        }
        if local == r.gw {
            return "river gw".into();
        }
        if r.rivern == Some(local) {
            return "rivern".into();
        }
        if let Some(s) = r.species {
            let n = self.num_species.max(1);
            let rel = local - s;
            let zone = if rel / n == 0 { ZoneKind::Stream } else { ZoneKind::Bed };
            return format!("{} ({})", species_name(rel % n), zone.name());
        }
        format!("slot {}", local)
    }
}
