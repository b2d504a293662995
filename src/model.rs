// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/model.rs - 检测模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, detection::Detection};

mod recorded;
pub use self::recorded::RecordedDetector;

mod yolo;
pub use self::yolo::{YoloDecodeParams, decode_yolov8, nms};

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxDetector, OnnxDetectorBuilder};

/// 检测器：输入解码后的源图像，返回源图像像素坐标下的检测结果
pub trait Detector: Send + Sync {
  fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectorError>;
}

impl<T: Detector + ?Sized> Detector for Box<T> {
  fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
    (**self).detect(image)
  }
}

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("model artifact not found: {0}")]
  NotFound(String),
  #[error("failed to read model artifact {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("invalid model artifact {path}: {reason}")]
  Invalid { path: String, reason: String },
  #[error("unsupported model scheme '{0}'")]
  UnsupportedScheme(String),
  #[error("invalid model option {key}={value}")]
  InvalidOption { key: String, value: String },
  #[error("inference failed: {0}")]
  Inference(String),
}

impl DetectorError {
  pub fn invalid(path: &str, reason: impl std::fmt::Display) -> Self {
    DetectorError::Invalid {
      path: path.to_string(),
      reason: reason.to_string(),
    }
  }
}

/// 按 URL 方案选择的检测器后端
pub enum DetectorWrapper {
  #[cfg(feature = "onnx")]
  Onnx(OnnxDetector),
  Recorded(RecordedDetector),
}

impl FromUrl for DetectorWrapper {
  type Error = DetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "onnx")]
    {
      if url.scheme() == OnnxDetectorBuilder::SCHEME {
        let detector = OnnxDetectorBuilder::from_url(url)?.build()?;
        return Ok(DetectorWrapper::Onnx(detector));
      }
    }

    if url.scheme() == RecordedDetector::SCHEME {
      let detector = RecordedDetector::from_url(url)?;
      return Ok(DetectorWrapper::Recorded(detector));
    }

    Err(DetectorError::UnsupportedScheme(url.scheme().to_string()))
  }
}

impl Detector for DetectorWrapper {
  fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
    match self {
      #[cfg(feature = "onnx")]
      DetectorWrapper::Onnx(detector) => detector.detect(image),
      DetectorWrapper::Recorded(detector) => detector.detect(image),
    }
  }
}
