// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/aggregate.rs - 违章结果汇总与车牌选择
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  detection::{BBox, Detection},
  ocr::OcrError,
  plate::PlateFields,
  preprocess::RegionError,
  report::{DetectionView, ViolationEntry, ViolationReport},
};

/// 一张图像含多块车牌时的取舍规则
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PlateSelection {
  /// 识别成功的车牌中置信度最高者，相同时取靠前的检测
  #[default]
  HighestConfidence,
  /// 识别成功的车牌中最后处理的一块
  LastProcessed,
}

/// 单块车牌的读取失败原因
#[derive(Error, Debug)]
pub enum PlateError {
  #[error("plate region extraction failed: {0}")]
  Region(#[from] RegionError),
  #[error("plate OCR failed: {0}")]
  Ocr(#[from] OcrError),
}

/// 单块车牌的读取结果
#[derive(Debug, Clone, PartialEq)]
pub struct PlateReading {
  /// OCR 引擎原始输出顺序，未按坐标排序
  pub tokens: Vec<String>,
  /// 聚类后的阅读顺序
  pub ordered: Vec<String>,
  pub fields: PlateFields,
  pub text: String,
}

impl PlateReading {
  pub fn new(tokens: Vec<String>, ordered: Vec<String>, fields: PlateFields) -> Self {
    let text = fields.to_string();
    Self {
      tokens,
      ordered,
      fields,
      text,
    }
  }
}

#[derive(Debug)]
pub struct PlateOutcome {
  /// 对应检测在全部检测中的下标
  pub detection_index: usize,
  pub confidence: f32,
  pub bbox: BBox,
  pub result: Result<PlateReading, PlateError>,
}

impl PlateOutcome {
  pub fn reading(&self) -> Option<&PlateReading> {
    self.result.as_ref().ok()
  }
}

/// 按规则选出用于报告的车牌，失败的结果不参与选择
pub fn select_plate(outcomes: &[PlateOutcome], selection: PlateSelection) -> Option<&PlateOutcome> {
  let mut successful = outcomes.iter().filter(|o| o.result.is_ok());

  match selection {
    PlateSelection::HighestConfidence => successful.fold(None, |best: Option<&PlateOutcome>, cur| {
      match best {
        Some(b) if b.confidence >= cur.confidence => Some(b),
        _ => Some(cur),
      }
    }),
    PlateSelection::LastProcessed => successful.next_back(),
  }
}

/// 汇总违章、车牌与全部检测，生成最终报告
pub fn aggregate(
  violations: Vec<ViolationEntry>,
  detections: &[Detection],
  plates: &[PlateOutcome],
  selection: PlateSelection,
) -> ViolationReport {
  for outcome in plates {
    if let Err(e) = &outcome.result {
      warn!("车牌检测 {} 读取失败: {}", outcome.detection_index, e);
    }
  }

  let (license_plate, raw_ocr) = match select_plate(plates, selection).and_then(|o| o.reading()) {
    Some(reading) => {
      debug!("选用车牌 '{}' ({:?})", reading.text, selection);
      (reading.text.clone(), reading.tokens.clone())
    }
    None => {
      debug!("没有可用的车牌读取结果");
      (String::new(), Vec::new())
    }
  };

  ViolationReport::new(
    violations,
    license_plate,
    detections.iter().map(DetectionView::from).collect(),
    raw_ocr,
  )
}
