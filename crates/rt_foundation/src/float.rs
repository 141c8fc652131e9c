// crates/rt_foundation/src/float.rs

//! 安全浮点运算
//!
//! 提供安全除法、非负截断和 Kahan 补偿求和。质量守恒检查中大量量级差异
//! 悬殊的摩尔数求和使用 [`KahanSum`]。

// ============================================================================
// 数值常量
// ============================================================================

/// 安全除法的最小分母阈值
pub const SAFE_DIV_EPSILON: f64 = 1e-14;

// ============================================================================
// 安全运算
// ============================================================================

/// 安全除法
///
/// 分母绝对值小于 [`SAFE_DIV_EPSILON`] 或结果非有限时返回 `fallback`。
#[inline]
pub fn safe_div(a: f64, b: f64, fallback: f64) -> f64 {
    if b.abs() < SAFE_DIV_EPSILON {
        fallback
    } else {
        let result = a / b;
        if result.is_finite() {
            result
        } else {
            fallback
        }
    }
}

/// 截断为非负值，NaN 保持不变以便后续哨兵检测
#[inline]
pub fn clamp_non_negative(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else {
        x
    }
}

// ============================================================================
// Kahan 求和
// ============================================================================

/// Kahan 补偿求和器
#[derive(Debug, Clone, Copy, Default)]
pub struct KahanSum {
    /// 累加和
    sum: f64,
    /// 补偿项（低位精度损失）
    compensation: f64,
}

impl KahanSum {
    /// 创建新的 Kahan 求和器
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个值
    #[inline]
    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        // (t - sum) 是 y 的高位部分，减去 y 得到丢失的低位部分
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    /// 获取当前求和值
    #[inline]
    pub fn value(&self) -> f64 {
        self.sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(1.0, 2.0, 0.0), 0.5);
        assert_eq!(safe_div(1.0, 0.0, -1.0), -1.0);
        assert_eq!(safe_div(1.0, 1e-300, 7.0), 7.0);
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(clamp_non_negative(-3.0), 0.0);
        assert_eq!(clamp_non_negative(2.5), 2.5);
        assert!(clamp_non_negative(f64::NAN).is_nan());
    }

    #[test]
    fn test_kahan_sum() {
        let mut acc = KahanSum::new();
        acc.add(1.0);
        for _ in 0..10_000 {
            acc.add(1e-16);
        }
        assert!((acc.value() - (1.0 + 1e-12)).abs() < 1e-15);
    }
}
