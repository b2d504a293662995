// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/report.rs - 违章报告与 JSON 输出约定
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

use serde::{Serialize, Serializer, ser::SerializeStruct};

use crate::detection::{BBox, Detection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
  #[serde(rename = "No Helmet")]
  NoHelmet,
}

/// 单条违章记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationEntry {
  #[serde(rename = "type")]
  pub kind: ViolationKind,
  pub confidence: f32,
  pub bbox: BBox,
}

impl ViolationEntry {
  pub fn no_helmet(detection: &Detection) -> Self {
    Self {
      kind: ViolationKind::NoHelmet,
      confidence: detection.confidence,
      bbox: detection.bbox,
    }
  }
}

/// 去掉类别编号后的检测视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionView {
  pub label: String,
  pub confidence: f32,
  pub bbox: BBox,
}

impl From<&Detection> for DetectionView {
  fn from(detection: &Detection) -> Self {
    Self {
      label: detection.label.clone(),
      confidence: detection.confidence,
      bbox: detection.bbox,
    }
  }
}

/// 单张图像的最终报告
///
/// `violation_detected` 不单独存储，序列化时由 `violations` 计算得出。
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationReport {
  violations: Vec<ViolationEntry>,
  license_plate: String,
  all_detections: Vec<DetectionView>,
  raw_ocr: Vec<String>,
}

impl ViolationReport {
  pub fn new(
    violations: Vec<ViolationEntry>,
    license_plate: String,
    all_detections: Vec<DetectionView>,
    raw_ocr: Vec<String>,
  ) -> Self {
    Self {
      violations,
      license_plate,
      all_detections,
      raw_ocr,
    }
  }

  pub fn violation_detected(&self) -> bool {
    !self.violations.is_empty()
  }

  pub fn violations(&self) -> &[ViolationEntry] {
    &self.violations
  }

  pub fn license_plate(&self) -> &str {
    &self.license_plate
  }

  pub fn all_detections(&self) -> &[DetectionView] {
    &self.all_detections
  }

  pub fn raw_ocr(&self) -> &[String] {
    &self.raw_ocr
  }
}

impl Serialize for ViolationReport {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("ViolationReport", 5)?;
    state.serialize_field("violation_detected", &self.violation_detected())?;
    state.serialize_field("violations", &self.violations)?;
    state.serialize_field("license_plate", &self.license_plate)?;
    state.serialize_field("all_detections", &self.all_detections)?;
    state.serialize_field("raw_ocr", &self.raw_ocr)?;
    state.end()
  }
}

/// 一次调用的对外结果：报告或错误对象，二者不会同时出现
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Invocation {
  Report(ViolationReport),
  Error { error: String },
}

impl Invocation {
  pub fn from_result<E: std::fmt::Display>(result: Result<ViolationReport, E>) -> Self {
    match result {
      Ok(report) => Invocation::Report(report),
      Err(e) => Invocation::Error {
        error: e.to_string(),
      },
    }
  }

  pub fn is_error(&self) -> bool {
    matches!(self, Invocation::Error { .. })
  }

  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string(self)
  }
}
