// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/config.rs - 流水线配置
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
  aggregate::PlateSelection, filter::FilterThresholds, ocr::DEFAULT_LINE_TOLERANCE,
  preprocess::{DEFAULT_UPSCALE, MAX_UPSCALE},
};

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("invalid config {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: serde_json::Error,
  },
  #[error("invalid config value: {0}")]
  Invalid(String),
}

/// 单张图像处理流程的全部可调参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
  #[serde(default)]
  pub filter: FilterThresholds,

  /// OCR 行聚类的纵向容差（像素）
  #[serde(default = "default_line_tolerance")]
  pub line_tolerance: f32,

  /// 车牌裁剪放大倍数
  #[serde(default = "default_upscale")]
  pub upscale: u32,

  #[serde(default)]
  pub plate_selection: PlateSelection,
}

fn default_line_tolerance() -> f32 {
  DEFAULT_LINE_TOLERANCE
}

fn default_upscale() -> u32 {
  DEFAULT_UPSCALE
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      filter: FilterThresholds::default(),
      line_tolerance: default_line_tolerance(),
      upscale: default_upscale(),
      plate_selection: PlateSelection::default(),
    }
  }
}

impl PipelineConfig {
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    info!("读取配置文件: {}", path.display());

    let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: display.clone(),
      source,
    })?;
    let config: PipelineConfig =
      serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
        path: display,
        source,
      })?;

    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let thresholds = [
      ("helmet_confidence", self.filter.helmet_confidence),
      ("conflict_iou", self.filter.conflict_iou),
      ("violation_confidence", self.filter.violation_confidence),
    ];
    for (name, value) in thresholds {
      if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid(format!(
          "{} must be within [0, 1], got {}",
          name, value
        )));
      }
    }
    if self.line_tolerance.is_nan() || self.line_tolerance <= 0.0 {
      return Err(ConfigError::Invalid(format!(
        "line_tolerance must be positive, got {}",
        self.line_tolerance
      )));
    }
    if !(1..=MAX_UPSCALE).contains(&self.upscale) {
      return Err(ConfigError::Invalid(format!(
        "upscale must be within [1, {}], got {}",
        MAX_UPSCALE, self.upscale
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn missing_fields_take_defaults() {
    let config: PipelineConfig =
      serde_json::from_str(r#"{"filter": {"violation_confidence": 0.6}}"#).unwrap();
    assert_eq!(config.filter.violation_confidence, 0.6);
    assert_eq!(config.filter.conflict_iou, 0.25);
    assert_eq!(config.line_tolerance, 20.0);
    assert_eq!(config.upscale, 3);
    assert_eq!(config.plate_selection, PlateSelection::HighestConfidence);
  }

  #[test]
  fn plate_selection_is_kebab_case() {
    let config: PipelineConfig =
      serde_json::from_str(r#"{"plate_selection": "last-processed"}"#).unwrap();
    assert_eq!(config.plate_selection, PlateSelection::LastProcessed);
  }

  #[test]
  fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"upscale": 2, "line_tolerance": 12.5}}"#).unwrap();
    let config = PipelineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.upscale, 2);
    assert_eq!(config.line_tolerance, 12.5);
  }

  #[test]
  fn rejects_out_of_range_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"filter": {{"conflict_iou": 1.5}}}}"#).unwrap();
    assert!(matches!(
      PipelineConfig::from_file(file.path()),
      Err(ConfigError::Invalid(_))
    ));

    let config = PipelineConfig {
      upscale: 0,
      ..PipelineConfig::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn huge_upscale_is_rejected() {
    let config = PipelineConfig {
      upscale: 2_147_483_647,
      ..PipelineConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let config = PipelineConfig {
      upscale: MAX_UPSCALE,
      ..PipelineConfig::default()
    };
    assert!(config.validate().is_ok());
  }

  #[test]
  fn unreadable_file_is_io_error() {
    assert!(matches!(
      PipelineConfig::from_file("/definitely/not/here.json"),
      Err(ConfigError::Io { .. })
    ));
  }
}
