// crates/rt_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `RtError` 枚举和 `RtResult` 类型别名，用于整个项目的错误处理。
//!
//! # 错误分类
//!
//! 1. **配置错误**: 物种未找到、化学表格式错误，不可恢复
//! 2. **数值故障**: 导数出现 NaN，携带控制体、物理量与时间后终止
//! 3. **数据错误**: 数组大小、索引越界、网格拓扑
//!
//! # 示例
//!
//! ```
//! use rt_foundation::error::{RtError, RtResult};
//!
//! fn read_config() -> RtResult<()> {
//!     Err(RtError::config("配置文件格式错误"))
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// 统一结果类型
pub type RtResult<T> = Result<T, RtError>;

/// 出现非有限值的控制体类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonFiniteSource {
    /// 陆面三角单元
    Element,
    /// 河段
    River,
}

impl fmt::Display for NonFiniteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element => write!(f, "单元"),
            Self::River => write!(f, "河段"),
        }
    }
}

/// RT-Hydro 错误类型
#[derive(Error, Debug)]
pub enum RtError {
    // ========================================================================
    // IO 相关错误
    // ========================================================================

    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 解析错误
    #[error("解析错误: {message}")]
    Parse {
        /// 错误信息
        message: String,
    },

    // ========================================================================
    // 配置错误
    // ========================================================================

    /// 配置错误
    #[error("配置错误: {message}")]
    Config {
        /// 具体错误信息
        message: String,
    },

    /// 缺少配置项
    #[error("缺少必需的配置项: {key}")]
    MissingConfig {
        /// 配置键名
        key: String,
    },

    /// 配置值无效
    #[error("配置值无效: {key}={value}, 原因: {reason}")]
    InvalidConfig {
        /// 配置键名
        key: String,
        /// 配置值
        value: String,
        /// 无效原因说明
        reason: String,
    },

    /// 化学物种未找到
    #[error("化学物种未找到: '{name}' (查找表: {table})")]
    SpeciesNotFound {
        /// 物种名称
        name: String,
        /// 查找所在的表
        table: String,
    },

    /// 化学表错误
    #[error("化学表错误 [{table}]: {message}")]
    InvalidTable {
        /// 表名
        table: String,
        /// 错误信息
        message: String,
    },

    // ========================================================================
    // 数据错误
    // ========================================================================

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 索引越界
    #[error("索引越界: {index_type} 索引 {index} 超出范围 0..{len}")]
    IndexOutOfBounds {
        /// 索引类别描述
        index_type: &'static str,
        /// 访问的索引
        index: usize,
        /// 上界（长度）
        len: usize,
    },

    /// 无效网格拓扑
    #[error("无效的网格拓扑: {message}")]
    InvalidMesh {
        /// 具体错误信息
        message: String,
    },

    // ========================================================================
    // 数值错误
    // ========================================================================

    /// 导数出现非有限值
    ///
    /// 耦合系统数值崩溃，不可恢复。`index` 为 1 起始编号。
    #[error("{source_kind} {index} 的 {quantity} 导数为 NaN (t = {time} s)")]
    NonFiniteDerivative {
        /// 控制体类别
        source_kind: NonFiniteSource,
        /// 控制体编号（1 起始）
        index: usize,
        /// 物理量名称
        quantity: String,
        /// 模拟时间 [s]
        time: f64,
    },

    /// 外部积分器失败
    #[error("积分器错误: {message}")]
    Integrator {
        /// 错误信息
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl RtError {
    /// 从IO错误创建
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 解析错误
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 缺少配置
    pub fn missing_config(key: impl Into<String>) -> Self {
        Self::MissingConfig { key: key.into() }
    }

    /// 配置值无效
    pub fn invalid_config(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// 物种未找到
    pub fn species_not_found(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self::SpeciesNotFound {
            name: name.into(),
            table: table.into(),
        }
    }

    /// 化学表错误
    pub fn invalid_table(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTable {
            table: table.into(),
            message: message.into(),
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 索引越界
    pub fn index_out_of_bounds(index_type: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index_type,
            index,
            len,
        }
    }

    /// 无效网格
    pub fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh {
            message: message.into(),
        }
    }

    /// 非有限导数，`index` 为 0 起始索引，内部转换为 1 起始编号
    pub fn non_finite(
        source_kind: NonFiniteSource,
        index: usize,
        quantity: impl Into<String>,
        time: f64,
    ) -> Self {
        Self::NonFiniteDerivative {
            source_kind,
            index: index + 1,
            quantity: quantity.into(),
            time,
        }
    }

    /// 积分器错误
    pub fn integrator(message: impl Into<String>) -> Self {
        Self::Integrator {
            message: message.into(),
        }
    }

    /// 是否为配置类错误
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::MissingConfig { .. }
                | Self::InvalidConfig { .. }
                | Self::SpeciesNotFound { .. }
                | Self::InvalidTable { .. }
        )
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl RtError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> RtResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查索引是否在范围内
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> RtResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(index_type, index, len))
        } else {
            Ok(())
        }
    }
}

// ========================================================================
// 标准库错误转换
// ========================================================================

impl From<std::io::Error> for RtError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// ========================================================================
// 测试
// ========================================================================
