// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/model/yolo.rs - YOLOv8 输出解码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::{debug, error};

use crate::{
  detection::{BBox, Detection, DetectionClass, WithLabel},
  model::DetectorError,
};

const YOLO_BOX_ATTRS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct YoloDecodeParams {
  /// 模型输入边长
  pub input_size: u32,
  pub confidence_threshold: f32,
  /// 同类别 NMS 的 IoU 阈值
  pub iou_threshold: f32,
  pub max_detections: usize,
}

impl Default for YoloDecodeParams {
  fn default() -> Self {
    Self {
      input_size: 640,
      confidence_threshold: 0.25,
      iou_threshold: 0.45,
      max_detections: 100,
    }
  }
}

/// 解码 YOLOv8 输出 `[1, 4 + nc, N]`，结果缩放回源图像坐标
///
/// `data` 为按行主序展开的输出张量。形状或长度不符时返回错误。
pub fn decode_yolov8(
  data: &[f32],
  shape: &[usize],
  class_names: &[String],
  params: &YoloDecodeParams,
  original_width: u32,
  original_height: u32,
) -> Result<Vec<Detection>, DetectorError> {
  let (num_attrs, num_preds) = match shape {
    [1, attrs, preds] if *attrs > YOLO_BOX_ATTRS => (*attrs, *preds),
    _ => {
      error!("不支持的输出形状: {:?}", shape);
      return Err(DetectorError::Inference(format!(
        "unsupported output shape {:?}",
        shape
      )));
    }
  };
  let expected = num_attrs
    .checked_mul(num_preds)
    .ok_or_else(|| DetectorError::Inference(format!("output shape {:?} overflows", shape)))?;
  if data.len() < expected {
    error!("输出数据长度不足: 期望 {}, 实际 {}", expected, data.len());
    return Err(DetectorError::Inference(format!(
      "output holds {} values, shape {:?} needs {}",
      data.len(),
      shape,
      expected
    )));
  }

  let num_classes = num_attrs - YOLO_BOX_ATTRS;
  let at = |attr: usize, i: usize| data[attr * num_preds + i];

  let scale_x = original_width as f32 / params.input_size as f32;
  let scale_y = original_height as f32 / params.input_size as f32;
  let (max_x, max_y) = (original_width as f32, original_height as f32);

  let mut detections = Vec::new();
  for i in 0..num_preds {
    let (class_idx, score) = (0..num_classes)
      .map(|c| (c, at(YOLO_BOX_ATTRS + c, i)))
      .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    if score < params.confidence_threshold {
      continue;
    }

    let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
    let bbox = BBox::new(
      ((cx - w / 2.0) * scale_x).clamp(0.0, max_x),
      ((cy - h / 2.0) * scale_y).clamp(0.0, max_y),
      ((cx + w / 2.0) * scale_x).clamp(0.0, max_x),
      ((cy + h / 2.0) * scale_y).clamp(0.0, max_y),
    );

    let label = class_names
      .get(class_idx)
      .cloned()
      .unwrap_or_else(|| DetectionClass::from_label_id(class_idx as u32).to_label_str());
    detections.push(Detection::new(class_idx as u32, label, score, bbox));
  }

  debug!("NMS 前候选框 {} 个", detections.len());
  let mut kept = nms(detections, params.iou_threshold);
  kept.truncate(params.max_detections);
  debug!("检测到 {} 个物体", kept.len());
  Ok(kept)
}

/// 同类别非极大值抑制，结果按置信度降序
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut result: Vec<Detection> = Vec::new();
  for det in detections {
    let suppressed = result
      .iter()
      .any(|kept| kept.class_id == det.class_id && kept.bbox.iou(&det.bbox) >= iou_threshold);
    if !suppressed {
      result.push(det);
    }
  }

  result
}
