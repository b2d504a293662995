// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/preprocess.rs - 车牌区域裁剪与 OCR 预处理
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

use image::{DynamicImage, GrayImage, RgbImage, imageops::FilterType};
use imageproc::contrast::equalize_histogram;
use thiserror::Error;
use tracing::debug;

use crate::detection::BBox;

/// 默认放大倍数
pub const DEFAULT_UPSCALE: u32 = 3;
/// 允许的最大放大倍数
pub const MAX_UPSCALE: u32 = 8;

#[derive(Error, Debug, PartialEq)]
pub enum RegionError {
  #[error("degenerate crop {width}x{height} at ({x}, {y})")]
  Degenerate {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
  },
  #[error("invalid upscale factor {0}")]
  InvalidScale(u32),
}

/// 像素裁剪窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

/// 将浮点边界框截断为整数并限制在图像范围内
pub fn crop_window(bbox: &BBox, image_width: u32, image_height: u32) -> Result<CropWindow, RegionError> {
  let clamp = |v: f32, max: u32| (v.max(0.0) as u32).min(max);

  let x1 = clamp(bbox.x1, image_width);
  let y1 = clamp(bbox.y1, image_height);
  let x2 = clamp(bbox.x2, image_width);
  let y2 = clamp(bbox.y2, image_height);

  let width = x2.saturating_sub(x1);
  let height = y2.saturating_sub(y1);
  if width == 0 || height == 0 {
    return Err(RegionError::Degenerate {
      x: x1,
      y: y1,
      width,
      height,
    });
  }

  Ok(CropWindow {
    x: x1,
    y: y1,
    width,
    height,
  })
}

/// 裁剪车牌区域，放大、灰度化并做直方图均衡
pub fn plate_region(image: &RgbImage, bbox: &BBox, upscale: u32) -> Result<GrayImage, RegionError> {
  if !(1..=MAX_UPSCALE).contains(&upscale) {
    return Err(RegionError::InvalidScale(upscale));
  }

  let window = crop_window(bbox, image.width(), image.height())?;
  let (Some(width), Some(height)) = (
    window.width.checked_mul(upscale),
    window.height.checked_mul(upscale),
  ) else {
    return Err(RegionError::InvalidScale(upscale));
  };

  let crop = image::imageops::crop_imm(image, window.x, window.y, window.width, window.height)
    .to_image();
  let upscaled = image::imageops::resize(&crop, width, height, FilterType::CatmullRom);
  let gray = DynamicImage::ImageRgb8(upscaled).to_luma8();
  debug!(
    "车牌区域 {:?} 放大 {} 倍后为 {}x{}",
    window,
    upscale,
    gray.width(),
    gray.height()
  );

  Ok(equalize_histogram(&gray))
}
