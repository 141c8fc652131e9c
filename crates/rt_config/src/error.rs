// crates/rt_config/src/error.rs

//! 配置层错误类型

use rt_foundation::RtError;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },

    /// 缺失配置
    #[error("缺失配置: {0}")]
    Missing(String),

    /// 化学定义引用了不存在的物种
    #[error("未知物种 '{name}' (引用位置: {context})")]
    UnknownSpecies {
        /// 物种名
        name: String,
        /// 引用位置
        context: String,
    },
}

impl ConfigError {
    /// 构造无效值错误
    pub fn invalid(key: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for RtError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => RtError::from(e),
            ConfigError::Parse(msg) => RtError::parse(msg),
            ConfigError::InvalidValue { key, value, reason } => {
                RtError::invalid_config(key, value, reason)
            }
            ConfigError::Missing(key) => RtError::missing_config(key),
            ConfigError::UnknownSpecies { name, context } => {
                RtError::species_not_found(name, context)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("time.stepsize", -1.0, "必须为正");
        assert!(err.to_string().contains("time.stepsize"));
    }

    #[test]
    fn test_conversion_keeps_species_context() {
        let err = ConfigError::UnknownSpecies {
            name: "Fe+++".to_string(),
            context: "kinetics[0].dependence".to_string(),
        };
        let rt: RtError = err.into();
        assert!(matches!(rt, RtError::SpeciesNotFound { .. }));
        assert!(rt.to_string().contains("Fe+++"));
    }
}
