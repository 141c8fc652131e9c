// crates/rt_physics/src/transport/kernel.rs

//! 对流-扩散-弥散通量核
//!
//! ```text
//! F = w·(c_up if w > 0 else c_down)
//!   + D·A·φ^m / L · (c_up − c_down)
//!   + |w|·α / L · (c_up − c_down)
//! ```
//!
//! 交换上下游并取反 `w` 时三项分别精确取反，两侧以相同输入求值时
//! 通量在 IEEE 算术下逐位抵消。

/// 计算界面溶质通量 [mol/s]，正值为由上游流向下游
///
/// # 参数
/// - `diffusion`: 分子扩散系数 D [m²/s]
/// - `dispersion`: 弥散度 α [m]
/// - `cementation`: 胶结指数 m
/// - `conc_up` / `conc_down`: 两侧浓度 [mol/m³]
/// - `porosity`: 界面平均孔隙度 φ
/// - `distance`: 中心距离 L [m]
/// - `area`: 界面面积 A [m²]
/// - `wflux`: 体积水通量 w [m³/s]
#[allow(clippy::too_many_arguments)]
#[inline]
pub fn adv_diff_disp(
    diffusion: f64,
    dispersion: f64,
    cementation: f64,
    conc_up: f64,
    conc_down: f64,
    porosity: f64,
    distance: f64,
    area: f64,
    wflux: f64,
) -> f64 {
    let inv_dist = 1.0 / distance;
    let diff_conc = conc_up - conc_down;
    let diff_flux = diffusion * area * porosity.powf(cementation) * inv_dist * diff_conc;
    let disp_flux = wflux.abs() * dispersion * inv_dist * diff_conc;
    let adv_flux = wflux * if wflux > 0.0 { conc_up } else { conc_down };
    adv_flux + diff_flux + disp_flux
}

/// 迎风对流通量
#[inline]
pub fn upwind(wflux: f64, conc_own: f64, conc_other: f64) -> f64 {
    wflux * if wflux > 0.0 { conc_own } else { conc_other }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_values() {
        let f = adv_diff_disp(1e-9, 0.0, 1.5, 1e-3, 5e-4, 0.3, 10.0, 5.0, 2e-4);
        assert!((f - 2.000_000_410_792e-7).abs() < 1e-18);
    }

    #[test]
    fn test_exact_antisymmetry() {
        let cases = [
            (1e-9, 0.5, 1.3, 2.1e-3, 7.7e-4, 0.37, 12.5, 3.3, 4.4e-5),
            (2e-9, 0.0, 1.0, 1e-6, 3e-2, 0.21, 4.0, 9.0, -1.2e-3),
            (0.0, 1.5, 2.0, 0.0, 1e-4, 0.45, 1.0, 1.0, 0.0),
        ];
        for (d, a, m, cu, cd, phi, l, area, w) in cases {
            let fwd = adv_diff_disp(d, a, m, cu, cd, phi, l, area, w);
            let bwd = adv_diff_disp(d, a, m, cd, cu, phi, l, area, -w);
            assert_eq!(fwd + bwd, 0.0);
        }
    }

    #[test]
    fn test_literal_values_reverse_flow() {
        // w < 0 时对流项取下游浓度
        let f = adv_diff_disp(1e-9, 0.5, 1.0, 2e-3, 1e-3, 0.4, 10.0, 5.0, -1e-4);
        let expected = -1e-4 * 1e-3 + 1e-4 * 0.5 * 0.1 * 1e-3 + 1e-9 * 5.0 * 0.4 * 0.1 * 1e-3;
        assert!((f - expected).abs() < 1e-20);
        assert!((f - (-9.499_98e-8)).abs() < 1e-18);
    }

    #[test]
    fn test_pure_diffusion_direction() {
        let f = adv_diff_disp(1e-9, 0.0, 1.0, 2e-3, 1e-3, 0.4, 2.0, 10.0, 0.0);
        assert!(f > 0.0);
    }

    #[test]
    fn test_zero_flux_is_diffusion_only() {
        let (d, alpha, m, cu, cd, phi, l, area) = (1e-9, 0.7, 1.3, 2e-3, 1e-3, 0.4_f64, 2.0, 10.0);
        let f = adv_diff_disp(d, alpha, m, cu, cd, phi, l, area, 0.0);
        let diffusion_only = d * area * phi.powf(m) * (1.0 / l) * (cu - cd);
        assert_eq!(f, diffusion_only);

        let f = adv_diff_disp(d, alpha, 1.0, cu, cd, phi, l, area, 0.0);
        assert!((f - 2e-12).abs() < 1e-24);
    }

    #[test]
    fn test_upwind() {
        assert_eq!(upwind(2.0, 3.0, 5.0), 6.0);
        assert_eq!(upwind(-2.0, 3.0, 5.0), -10.0);
    }
}
