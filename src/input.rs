// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/input.rs - 图像输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::Cursor;
use std::path::PathBuf;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Invalid base64 image data: {0}")]
  Base64Error(#[from] base64::DecodeError),
}

/// 待处理的图像来源
#[derive(Debug, Clone)]
pub enum ImageSource {
  Path(PathBuf),
  /// 已编码的图像字节（PNG、JPEG 等）
  Bytes(Vec<u8>),
}

impl ImageSource {
  /// 解析 base64 文本，允许带 `data:image/...;base64,` 前缀
  pub fn from_base64(text: &str) -> Result<Self, InputError> {
    let payload = match text.find(',') {
      Some(idx) => &text[idx + 1..],
      None => text,
    };
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(payload)?;
    debug!("base64 图像数据 {} 字节", bytes.len());
    Ok(ImageSource::Bytes(bytes))
  }

  pub fn decode(&self) -> Result<RgbImage, InputError> {
    let image = match self {
      ImageSource::Path(path) => {
        debug!("读取图像文件: {}", path.display());
        ImageReader::open(path)
          .inspect_err(|e| error!("无法打开图像文件 {}: {}", path.display(), e))?
          .with_guessed_format()?
          .decode()?
      }
      ImageSource::Bytes(bytes) => ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?,
    };

    Ok(image.into_rgb8())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{ImageFormat, Rgb};

  fn png_bytes() -> Vec<u8> {
    let image = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
  }

  #[test]
  fn decodes_raw_bytes() {
    let image = ImageSource::Bytes(png_bytes()).decode().unwrap();
    assert_eq!(image.dimensions(), (4, 3));
    assert_eq!(image.get_pixel(0, 0), &Rgb([10, 20, 30]));
  }

  #[test]
  fn data_url_prefix_is_stripped() {
    let encoded = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes()));
    let image = ImageSource::from_base64(&encoded).unwrap().decode().unwrap();
    assert_eq!(image.dimensions(), (4, 3));
  }

  #[test]
  fn plain_base64_is_accepted() {
    let encoded = format!("{}\n", STANDARD.encode(png_bytes()));
    assert!(ImageSource::from_base64(&encoded).unwrap().decode().is_ok());
  }

  #[test]
  fn invalid_inputs_are_errors() {
    assert!(matches!(
      ImageSource::from_base64("data:image/png;base64,@@@"),
      Err(InputError::Base64Error(_))
    ));
    assert!(matches!(
      ImageSource::Bytes(b"not an image".to_vec()).decode(),
      Err(InputError::ImageLoadError(_))
    ));
  }

  #[test]
  fn reads_image_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.png");
    std::fs::write(&path, png_bytes()).unwrap();
    assert!(ImageSource::Path(path).decode().is_ok());
    assert!(matches!(
      ImageSource::Path(dir.path().join("missing.png")).decode(),
      Err(InputError::IoError(_))
    ));
  }
}
