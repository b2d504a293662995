// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/output.rs - 检测结果标注输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use thiserror::Error;
use tracing::info;

use crate::{
  detection::{BBox, Detection, DetectionClass},
  report::ViolationEntry,
};

const BORDER_THICKNESS: u32 = 2;
const VIOLATION_COLOR: [u8; 3] = [255, 0, 0];

pub trait Render {
  type Error;
  fn render_result(
    &self,
    image: &RgbImage,
    detections: &[Detection],
    violations: &[ViolationEntry],
  ) -> Result<(), Self::Error>;
}

/// 按类别着色的边框绘制
pub struct Draw {
  thickness: u32,
  violation_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      thickness: BORDER_THICKNESS,
      violation_color: VIOLATION_COLOR,
    }
  }
}

impl Draw {
  pub fn class_color(detection: &Detection) -> [u8; 3] {
    if detection.is(DetectionClass::WithHelmet) {
      [0, 200, 0]
    } else if detection.is(DetectionClass::WithoutHelmet) {
      [255, 140, 0]
    } else if detection.is(DetectionClass::Rider) {
      [0, 120, 255]
    } else if detection.is(DetectionClass::NumberPlate) {
      [255, 255, 0]
    } else {
      [200, 200, 200]
    }
  }

  // bbox 为源图像像素坐标
  fn draw_bbox(&self, image: &mut RgbImage, bbox: &BBox, color: [u8; 3]) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (bbox.x1.floor() as i32).clamp(0, w - 1);
    let y_min = (bbox.y1.floor() as i32).clamp(0, h - 1);
    let x_max = (bbox.x2.ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox.y2.ceil() as i32).clamp(0, h - 1);

    for t in 0..self.thickness as i32 {
      let (x0, y0) = (x_min + t, y_min + t);
      let (x1, y1) = (x_max - t, y_max - t);
      if x0 >= x1 || y0 >= y1 {
        break;
      }
      let rect = Rect::at(x0, y0).of_size((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32);
      draw_hollow_rect_mut(image, rect, Rgb(color));
    }
  }

  /// 先画全部检测，再用违章色覆盖违章框
  pub fn draw_detections(
    &self,
    image: &mut RgbImage,
    detections: &[Detection],
    violations: &[ViolationEntry],
  ) {
    for det in detections {
      self.draw_bbox(image, &det.bbox, Self::class_color(det));
    }
    for violation in violations {
      self.draw_bbox(image, &violation.bbox, self.violation_color);
    }
  }
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 将标注后的图像保存到文件，格式由扩展名决定
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      draw: Draw::default(),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn save_image(&self, image: &RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;
    info!("保存标注图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(
    &self,
    image: &RgbImage,
    detections: &[Detection],
    violations: &[ViolationEntry],
  ) -> Result<(), Self::Error> {
    let mut canvas = image.clone();
    self.draw.draw_detections(&mut canvas, detections, violations);
    self.save_image(&canvas)
  }
}
