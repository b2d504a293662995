// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/detection.rs - 检测结果定义
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

/// 边界框，源图像像素坐标 [x1, y1, x2, y2]
///
/// JSON 中序列化为四元数组。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
}

impl From<[f32; 4]> for BBox {
  fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
    Self { x1, y1, x2, y2 }
  }
}

impl From<BBox> for [f32; 4] {
  fn from(bbox: BBox) -> Self {
    [bbox.x1, bbox.y1, bbox.x2, bbox.y2]
  }
}

impl BBox {
  pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
    Self { x1, y1, x2, y2 }
  }

  pub fn width(&self) -> f32 {
    self.x2 - self.x1
  }

  pub fn height(&self) -> f32 {
    self.y2 - self.y1
  }

  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  /// 计算与另一个边界框的 IoU，分母非正时返回 0
  pub fn iou(&self, other: &BBox) -> f32 {
    let x1 = self.x1.max(other.x1);
    let y1 = self.y1.max(other.y1);
    let x2 = self.x2.min(other.x2);
    let y2 = self.y2.min(other.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = self.area() + other.area() - intersection;

    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> u32;
  fn from_label_id(id: u32) -> Self;
}

/// 头盔检测模型的固定类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionClass {
  WithHelmet,
  WithoutHelmet,
  Rider,
  NumberPlate,
  Other(u32),
}

impl DetectionClass {
  pub const KNOWN: [DetectionClass; 4] = [
    DetectionClass::WithHelmet,
    DetectionClass::WithoutHelmet,
    DetectionClass::Rider,
    DetectionClass::NumberPlate,
  ];
}

impl WithLabel for DetectionClass {
  fn to_label_str(&self) -> String {
    match self {
      DetectionClass::WithHelmet => "with helmet".to_string(),
      DetectionClass::WithoutHelmet => "without helmet".to_string(),
      DetectionClass::Rider => "rider".to_string(),
      DetectionClass::NumberPlate => "number plate".to_string(),
      DetectionClass::Other(id) => format!("class_{}", id),
    }
  }

  fn to_label_id(&self) -> u32 {
    match self {
      DetectionClass::WithHelmet => 0,
      DetectionClass::WithoutHelmet => 1,
      DetectionClass::Rider => 2,
      DetectionClass::NumberPlate => 3,
      DetectionClass::Other(id) => *id,
    }
  }

  fn from_label_id(id: u32) -> Self {
    match id {
      0 => DetectionClass::WithHelmet,
      1 => DetectionClass::WithoutHelmet,
      2 => DetectionClass::Rider,
      3 => DetectionClass::NumberPlate,
      other => DetectionClass::Other(other),
    }
  }
}

/// 检测器输出的一个目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub class_id: u32,
  pub label: String,
  pub confidence: f32,
  pub bbox: BBox,
}

impl Detection {
  pub fn new(class_id: u32, label: impl Into<String>, confidence: f32, bbox: BBox) -> Self {
    Self {
      class_id,
      label: label.into(),
      confidence,
      bbox,
    }
  }

  pub fn of_class(class: DetectionClass, confidence: f32, bbox: BBox) -> Self {
    Self::new(class.to_label_id(), class.to_label_str(), confidence, bbox)
  }

  /// 标签或类别编号任一匹配即视为属于该类别
  pub fn is(&self, class: DetectionClass) -> bool {
    match class {
      DetectionClass::Other(id) => self.class_id == id,
      known => self.label == known.to_label_str() || self.class_id == known.to_label_id(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn iou_of_identical_boxes_is_one() {
    let a = BBox::new(10.0, 20.0, 60.0, 90.0);
    assert!((a.iou(&a) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn iou_of_disjoint_boxes_is_zero() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(20.0, 20.0, 30.0, 30.0);
    assert_eq!(a.iou(&b), 0.0);

    // 仅共享一条边
    let c = BBox::new(10.0, 0.0, 20.0, 10.0);
    assert_eq!(a.iou(&c), 0.0);
  }

  #[test]
  fn iou_is_symmetric() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(5.0, 2.0, 17.0, 9.0);
    assert_eq!(a.iou(&b), b.iou(&a));
    assert!(a.iou(&b) > 0.0 && a.iou(&b) < 1.0);
  }

  #[test]
  fn degenerate_boxes_do_not_divide_by_zero() {
    let point = BBox::new(5.0, 5.0, 5.0, 5.0);
    assert_eq!(point.iou(&point), 0.0);
  }

  #[test]
  fn class_matches_by_label_or_id() {
    let bbox = BBox::new(0.0, 0.0, 1.0, 1.0);
    let by_label = Detection::new(7, "without helmet", 0.9, bbox);
    let by_id = Detection::new(1, "no-helmet", 0.9, bbox);
    assert!(by_label.is(DetectionClass::WithoutHelmet));
    assert!(by_id.is(DetectionClass::WithoutHelmet));
    assert!(!by_id.is(DetectionClass::WithHelmet));
  }

  #[test]
  fn bbox_serializes_as_array() {
    let bbox = BBox::new(1.0, 2.5, 3.0, 4.0);
    let json = serde_json::to_string(&bbox).unwrap();
    assert_eq!(json, "[1.0,2.5,3.0,4.0]");
    let back: BBox = serde_json::from_str(&json).unwrap();
    assert_eq!(back, bbox);
  }
}
