// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/filter.rs - 未戴头盔检测过滤
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
use tracing::debug;

use crate::{
  detection::{Detection, DetectionClass},
  report::ViolationEntry,
};

/// 过滤阈值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterThresholds {
  /// 参与冲突判定的“戴头盔”检测最低置信度（严格大于）
  pub helmet_confidence: f32,
  /// 判定为冲突的 IoU 下限（严格大于）
  pub conflict_iou: f32,
  /// 计为违章的最低置信度（严格大于）
  pub violation_confidence: f32,
}

impl Default for FilterThresholds {
  fn default() -> Self {
    Self {
      helmet_confidence: 0.25,
      conflict_iou: 0.25,
      violation_confidence: 0.5,
    }
  }
}

/// 从全部检测中筛选出未戴头盔违章，保持输入顺序
///
/// 与某个“戴头盔”框高度重叠的“未戴头盔”框视为检测器歧义，直接丢弃。
pub fn filter_violations(
  detections: &[Detection],
  thresholds: &FilterThresholds,
) -> Vec<ViolationEntry> {
  let mut violations = Vec::new();

  for (idx, candidate) in detections.iter().enumerate() {
    if !candidate.is(DetectionClass::WithoutHelmet) {
      continue;
    }

    let conflict = detections.iter().enumerate().find(|(other_idx, other)| {
      *other_idx != idx
        && other.is(DetectionClass::WithHelmet)
        && other.confidence > thresholds.helmet_confidence
        && candidate.bbox.iou(&other.bbox) > thresholds.conflict_iou
    });

    if let Some((other_idx, _)) = conflict {
      debug!("检测 {} 与戴头盔检测 {} 冲突，已丢弃", idx, other_idx);
      continue;
    }

    if candidate.confidence > thresholds.violation_confidence {
      violations.push(ViolationEntry::no_helmet(candidate));
    } else {
      debug!(
        "检测 {} 置信度 {:.2} 未超过阈值 {:.2}，已丢弃",
        idx, candidate.confidence, thresholds.violation_confidence
      );
    }
  }

  violations
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detection::BBox;

  fn without(confidence: f32, bbox: BBox) -> Detection {
    Detection::of_class(DetectionClass::WithoutHelmet, confidence, bbox)
  }

  fn with(confidence: f32, bbox: BBox) -> Detection {
    Detection::of_class(DetectionClass::WithHelmet, confidence, bbox)
  }

  #[test]
  fn empty_input_yields_no_violations() {
    assert!(filter_violations(&[], &FilterThresholds::default()).is_empty());
  }

  #[test]
  fn overlapping_helmet_box_suppresses_violation() {
    let head = BBox::new(0.0, 0.0, 10.0, 10.0);
    // IoU = 40 / 100 = 0.4
    let helmet = BBox::new(0.0, 0.0, 10.0, 4.0);
    let detections = [without(0.8, head), with(0.9, helmet)];
    assert!(filter_violations(&detections, &FilterThresholds::default()).is_empty());
  }

  #[test]
  fn weakly_overlapping_helmet_box_keeps_violation() {
    let head = BBox::new(0.0, 0.0, 10.0, 10.0);
    // IoU = 10 / 100 = 0.1
    let helmet = BBox::new(0.0, 0.0, 10.0, 1.0);
    let detections = [without(0.8, head), with(0.9, helmet)];
    let violations = filter_violations(&detections, &FilterThresholds::default());
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].confidence, 0.8);
    assert_eq!(violations[0].bbox, head);
  }

  #[test]
  fn overlap_exactly_at_threshold_keeps_violation() {
    let head = BBox::new(0.0, 0.0, 10.0, 10.0);
    // IoU = 25 / 100 = 0.25
    let helmet = BBox::new(0.0, 0.0, 10.0, 2.5);
    assert_eq!(head.iou(&helmet), 0.25);
    let detections = [without(0.8, head), with(0.9, helmet)];
    assert_eq!(
      filter_violations(&detections, &FilterThresholds::default()).len(),
      1
    );
  }

  #[test]
  fn low_confidence_helmet_box_does_not_conflict() {
    let head = BBox::new(0.0, 0.0, 10.0, 10.0);
    let detections = [without(0.8, head), with(0.25, head)];
    assert_eq!(
      filter_violations(&detections, &FilterThresholds::default()).len(),
      1
    );
  }

  #[test]
  fn confidence_at_or_below_threshold_never_reported() {
    let detections = [
      without(0.5, BBox::new(0.0, 0.0, 10.0, 10.0)),
      without(0.3, BBox::new(50.0, 50.0, 60.0, 60.0)),
      without(0.51, BBox::new(100.0, 100.0, 110.0, 110.0)),
    ];
    let violations = filter_violations(&detections, &FilterThresholds::default());
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].confidence, 0.51);
  }

  #[test]
  fn output_preserves_input_order() {
    let detections = [
      without(0.7, BBox::new(100.0, 0.0, 110.0, 10.0)),
      Detection::of_class(DetectionClass::Rider, 0.9, BBox::new(0.0, 0.0, 200.0, 200.0)),
      without(0.9, BBox::new(0.0, 0.0, 10.0, 10.0)),
    ];
    let violations = filter_violations(&detections, &FilterThresholds::default());
    let confidences: Vec<f32> = violations.iter().map(|v| v.confidence).collect();
    assert_eq!(confidences, vec![0.7, 0.9]);
  }
}
