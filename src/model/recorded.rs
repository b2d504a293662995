// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/model/recorded.rs - 回放已记录的检测结果
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

use image::RgbImage;
use serde::Deserialize;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::{BBox, Detection, DetectionClass, WithLabel},
  model::{Detector, DetectorError},
};

#[derive(Debug, Deserialize)]
struct RecordedEntry {
  class_id: u32,
  #[serde(default)]
  label: Option<String>,
  confidence: f32,
  bbox: BBox,
}

/// 从 JSON 文件读取上游检测器的输出，对每张图像返回同一组结果
#[derive(Debug, Clone)]
pub struct RecordedDetector {
  path: String,
  detections: Vec<Detection>,
}

impl FromUrlWithScheme for RecordedDetector {
  const SCHEME: &'static str = "json";
}

impl FromUrl for RecordedDetector {
  type Error = DetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DetectorError::UnsupportedScheme(url.scheme().to_string()));
    }

    let path = url.path().to_string();
    if !Path::new(&path).exists() {
      error!("检测记录文件不存在: {}", path);
      return Err(DetectorError::NotFound(path));
    }

    info!("加载检测记录: {}", path);
    let data = std::fs::read_to_string(&path).map_err(|source| DetectorError::Io {
      path: path.clone(),
      source,
    })?;
    let detections = Self::parse(&path, &data)?;
    debug!("检测记录共 {} 条", detections.len());

    Ok(RecordedDetector { path, detections })
  }
}

impl RecordedDetector {
  pub fn new(detections: Vec<Detection>) -> Self {
    Self {
      path: String::new(),
      detections,
    }
  }

  pub fn path(&self) -> &str {
    &self.path
  }

  fn parse(path: &str, data: &str) -> Result<Vec<Detection>, DetectorError> {
    let entries: Vec<RecordedEntry> =
      serde_json::from_str(data).map_err(|e| DetectorError::invalid(path, e))?;

    entries
      .into_iter()
      .enumerate()
      .map(|(idx, entry)| {
        if !(0.0..=1.0).contains(&entry.confidence) {
          return Err(DetectorError::invalid(
            path,
            format!("entry {} confidence {} outside [0, 1]", idx, entry.confidence),
          ));
        }
        if entry.bbox.x1 > entry.bbox.x2 || entry.bbox.y1 > entry.bbox.y2 {
          return Err(DetectorError::invalid(
            path,
            format!("entry {} has inverted bbox {:?}", idx, entry.bbox),
          ));
        }

        let label = entry
          .label
          .unwrap_or_else(|| DetectionClass::from_label_id(entry.class_id).to_label_str());
        Ok(Detection::new(entry.class_id, label, entry.confidence, entry.bbox))
      })
      .collect()
  }
}

impl Detector for RecordedDetector {
  fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
    Ok(self.detections.clone())
  }
}
