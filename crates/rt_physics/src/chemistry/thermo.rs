// crates/rt_physics/src/chemistry/thermo.rs

//! 温度网格插值与 Arrhenius 修正

use rt_foundation::constants::{GAS_CONSTANT, KELVIN_OFFSET};

/// 在温度网格上线性插值
///
/// `values` 长度为 1 时视为常数；超出网格范围时取端点值。
pub fn interpolate_grid(grid: &[f64], values: &[f64], temperature: f64) -> f64 {
    match values.len() {
        0 => 0.0,
        1 => values[0],
        _ => {
            let n = grid.len().min(values.len());
            if n < 2 || temperature <= grid[0] {
                return values[0];
            }
            if temperature >= grid[n - 1] {
                return values[n - 1];
            }
            for i in 1..n {
                if temperature <= grid[i] {
                    let w = (temperature - grid[i - 1]) / (grid[i] - grid[i - 1]);
                    return values[i - 1] + w * (values[i] - values[i - 1]);
                }
            }
            values[n - 1]
        }
    }
}

/// Arrhenius 速率修正因子
///
/// `activation_energy` 单位 kJ/mol，温度单位 °C。
#[inline]
pub fn arrhenius_factor(activation_energy: f64, temperature: f64, reference: f64) -> f64 {
    let t = temperature + KELVIN_OFFSET;
    let t_ref = reference + KELVIN_OFFSET;
    (-activation_energy * 1000.0 / GAS_CONSTANT * (1.0 / t - 1.0 / t_ref)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_constant_values() {
        assert_eq!(interpolate_grid(&[0.0, 25.0], &[1.85], 60.0), 1.85);
    }

    #[test]
    fn test_linear_interpolation() {
        let grid = [0.0, 25.0, 60.0];
        let values = [2.0, 1.0, 0.3];
        assert!(approx_eq(interpolate_grid(&grid, &values, 12.5), 1.5));
        assert!(approx_eq(interpolate_grid(&grid, &values, 25.0), 1.0));
        assert_eq!(interpolate_grid(&grid, &values, -5.0), 2.0);
        assert_eq!(interpolate_grid(&grid, &values, 90.0), 0.3);
    }

    #[test]
    fn test_arrhenius_reference_is_unity() {
        assert!(approx_eq(arrhenius_factor(40.0, 25.0, 25.0), 1.0));
        assert!(arrhenius_factor(40.0, 35.0, 25.0) > 1.0);
        assert!(arrhenius_factor(40.0, 5.0, 25.0) < 1.0);
    }
}
