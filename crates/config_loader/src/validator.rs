//! 配置校验模块
//!
//! 校验规则：
//! - 配置类型上声明的字段约束 (`validator` derive)
//! - 数据集版本唯一
//! - 至少一个 sink；sink 名称非空且唯一
//! - scene 过滤条目非空

use std::collections::HashSet;

use contracts::{ContractError, ConversionConfig};
use validator::{Validate, ValidationErrors};

/// 校验 ConversionConfig
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ConversionConfig) -> Result<(), ContractError> {
    config.validate().map_err(|e| first_violation("", &e))?;
    validate_versions(config)?;
    validate_sinks(config)?;
    validate_scene_filter(config)?;
    Ok(())
}

/// Flatten nested `validator` errors to the first `(field path, message)`
fn first_violation(prefix: &str, errors: &ValidationErrors) -> ContractError {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(violations) => {
                let message = violations
                    .first()
                    .and_then(|v| v.message.as_ref())
                    .map_or_else(|| "invalid value".to_string(), ToString::to_string);
                return ContractError::config_validation(path, message);
            }
            ValidationErrorsKind::Struct(nested) => return first_violation(&path, nested),
            ValidationErrorsKind::List(items) => {
                if let Some((index, nested)) = items.iter().next() {
                    return first_violation(&format!("{path}[{index}]"), nested);
                }
            }
        }
    }
    ContractError::config_validation(prefix, "invalid configuration")
}

fn validate_versions(config: &ConversionConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for version in &config.dataset.versions {
        if version.trim().is_empty() {
            return Err(ContractError::config_validation(
                "dataset.versions",
                "version cannot be empty",
            ));
        }
        if !seen.insert(version) {
            return Err(ContractError::config_validation(
                format!("dataset.versions[{version}]"),
                "duplicate version",
            ));
        }
    }
    Ok(())
}

fn validate_sinks(config: &ConversionConfig) -> Result<(), ContractError> {
    if config.sinks.is_empty() {
        return Err(ContractError::config_validation(
            "sinks",
            "at least one sink is required",
        ));
    }
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

fn validate_scene_filter(config: &ConversionConfig) -> Result<(), ContractError> {
    if let Some(idx) = config.sync.scenes.iter().position(|s| s.trim().is_empty()) {
        return Err(ContractError::config_validation(
            format!("sync.scenes[{idx}]"),
            "scene name cannot be empty",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkConfig, SinkType};

    fn assert_rejected(config: &ConversionConfig, needle: &str) {
        let err = validate(config).unwrap_err().to_string();
        assert!(err.contains(needle), "got: {err}");
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&ConversionConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_versions() {
        let mut config = ConversionConfig::default();
        config.dataset.versions.clear();
        assert_rejected(&config, "at least one dataset version");
    }

    #[test]
    fn test_duplicate_version() {
        let mut config = ConversionConfig::default();
        config.dataset.versions.push("v1.0-mini".into());
        assert_rejected(&config, "duplicate version");
    }

    #[test]
    fn test_empty_reference_channel() {
        let mut config = ConversionConfig::default();
        config.sync.reference_channel.clear();
        assert_rejected(&config, "reference channel must not be empty");
        assert_rejected(&config, "sync.reference_channel");
    }

    #[test]
    fn test_small_chunk_size() {
        let mut config = ConversionConfig::default();
        config.output.chunk_size = Some(16);
        assert_rejected(&config, "chunk size");
    }

    #[test]
    fn test_duplicate_sink_name() {
        let mut config = ConversionConfig::default();
        config.sinks.push(config.sinks[0].clone());
        assert_rejected(&config, "duplicate sink name");
    }

    #[test]
    fn test_empty_sink_name() {
        let mut config = ConversionConfig::default();
        config.sinks = vec![SinkConfig {
            name: String::new(),
            sink_type: SinkType::Log,
            params: Default::default(),
        }];
        assert_rejected(&config, "cannot be empty");
    }

    #[test]
    fn test_no_sinks() {
        let mut config = ConversionConfig::default();
        config.sinks.clear();
        assert_rejected(&config, "at least one sink");
    }

    #[test]
    fn test_blank_scene_filter_entry() {
        let mut config = ConversionConfig::default();
        config.sync.scenes = vec!["scene-0061".into(), " ".into()];
        assert_rejected(&config, "sync.scenes[1]");
    }
}
