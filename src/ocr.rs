// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/ocr.rs - 文字识别边界定义
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

use image::GrayImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod cluster;
pub use self::cluster::{DEFAULT_LINE_TOLERANCE, group_lines, reading_order};

mod tesseract;
pub use self::tesseract::TesseractOcr;

/// OCR 引擎返回的一个文本片段，坐标为车牌裁剪图内的左上角
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrToken {
  pub text: String,
  pub x: f32,
  pub y: f32,
}

impl OcrToken {
  pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
    Self {
      text: text.into(),
      x,
      y,
    }
  }
}

#[derive(Error, Debug)]
pub enum OcrError {
  #[error("URI scheme mismatch: expected '{expected}', found '{found}'")]
  SchemeMismatch { expected: String, found: String },
  #[error("invalid OCR option {key}={value}")]
  InvalidOption { key: String, value: String },
  #[error("failed to encode OCR region: {0}")]
  Encode(#[from] image::ImageError),
  #[error("failed to run OCR engine: {0}")]
  Io(#[from] std::io::Error),
  #[error("OCR engine exited with {status}: {stderr}")]
  Exit { status: String, stderr: String },
  #[error("unexpected OCR engine output: {0}")]
  InvalidOutput(String),
}

/// OCR 引擎：输入已裁剪、放大、灰度化并增强对比度的车牌区域，返回无序文本片段
pub trait OcrEngine: Send + Sync {
  fn read_text(&self, region: &GrayImage) -> Result<Vec<OcrToken>, OcrError>;
}

impl<T: OcrEngine + ?Sized> OcrEngine for Box<T> {
  fn read_text(&self, region: &GrayImage) -> Result<Vec<OcrToken>, OcrError> {
    (**self).read_text(region)
  }
}
