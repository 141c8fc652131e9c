// crates/rt_physics/src/hydrology/storage.rs

//! 水分储量换算
//!
//! 储量单位为等效水深 [m]，乘以面积即为体积。

/// 地下水区储量
///
/// 水位高于土层时，土层内按 `smcmax` 计，超出部分按有效孔隙度计。
#[inline]
pub fn gw_storage(depth: f64, smcmax: f64, smcmin: f64, gw: f64) -> f64 {
    if gw < 0.0 {
        0.0
    } else if gw > depth {
        depth * smcmax + (gw - depth) * (smcmax - smcmin)
    } else {
        gw * smcmax
    }
}

/// 非饱和区储量
///
/// 残余水分布于整个非饱和厚度，可动水 `unsat` 按有效孔隙度计。
#[inline]
pub fn unsat_storage(depth: f64, smcmax: f64, smcmin: f64, gw: f64, unsat: f64) -> f64 {
    (depth - gw).clamp(0.0, depth) * smcmin + unsat.max(0.0) * (smcmax - smcmin)
}

/// 非饱和区饱和度
#[inline]
pub fn unsat_saturation(depth: f64, unsat: f64, gw: f64) -> f64 {
    if unsat < 0.0 {
        0.0
    } else if gw > depth {
        1.0
    } else {
        unsat / (depth - gw)
    }
}

/// 河床储量
#[inline]
pub fn river_bed_storage(bed_thickness: f64, porosity: f64, smcmin: f64, gw: f64) -> f64 {
    gw_storage(bed_thickness, porosity + smcmin, smcmin, gw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_gw_storage_branches() {
        assert_eq!(gw_storage(2.0, 0.4, 0.05, -0.1), 0.0);
        assert!(approx_eq(gw_storage(2.0, 0.4, 0.05, 1.0), 0.4));
        assert!(approx_eq(gw_storage(2.0, 0.4, 0.05, 3.0), 0.8 + 0.35));
    }

    #[test]
    fn test_unsat_storage() {
        assert!(approx_eq(unsat_storage(2.0, 0.4, 0.05, 1.0, 0.5), 0.05 + 0.175));
        assert!(approx_eq(unsat_storage(2.0, 0.4, 0.05, 3.0, -1.0), 0.0));
    }

    #[test]
    fn test_sum_matches_single_soil_storage() {
        // (unsat + gw)·porosity + depth·smcmin
        let (depth, smcmax, smcmin, gw, unsat) = (2.0, 0.4, 0.05, 1.2, 0.3);
        let total = gw_storage(depth, smcmax, smcmin, gw) + unsat_storage(depth, smcmax, smcmin, gw, unsat);
        assert!(approx_eq(total, (unsat + gw) * (smcmax - smcmin) + depth * smcmin));
    }

    #[test]
    fn test_saturation() {
        assert_eq!(unsat_saturation(2.0, -0.1, 1.0), 0.0);
        assert_eq!(unsat_saturation(2.0, 0.1, 2.5), 1.0);
        assert!(approx_eq(unsat_saturation(2.0, 0.5, 1.0), 0.5));
    }
}
