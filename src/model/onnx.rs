// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime YOLOv8 检测器
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;
use std::sync::Mutex;

use image::{RgbImage, imageops::FilterType};
use ndarray::{Array, IxDyn};
use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::Value,
};
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::{Detection, DetectionClass, WithLabel},
  model::{Detector, DetectorError, YoloDecodeParams, decode_yolov8},
};

const ONNX_DEFAULT_THREADS: usize = 4;

pub struct OnnxDetectorBuilder {
  model_path: String,
  params: YoloDecodeParams,
  class_names: Vec<String>,
  intra_threads: usize,
}

impl FromUrlWithScheme for OnnxDetectorBuilder {
  const SCHEME: &'static str = "onnx";
}

fn option_error(key: &str, value: &str) -> DetectorError {
  DetectorError::InvalidOption {
    key: key.to_string(),
    value: value.to_string(),
  }
}

impl FromUrl for OnnxDetectorBuilder {
  type Error = DetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DetectorError::UnsupportedScheme(url.scheme().to_string()));
    }

    let mut builder = OnnxDetectorBuilder {
      model_path: url.path().to_string(),
      params: YoloDecodeParams::default(),
      class_names: DetectionClass::KNOWN
        .iter()
        .map(|c| c.to_label_str())
        .collect(),
      intra_threads: ONNX_DEFAULT_THREADS,
    };

    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "size" => {
          builder.params.input_size = value.parse().map_err(|_| option_error(&key, &value))?
        }
        "conf" => {
          builder.params.confidence_threshold =
            value.parse().map_err(|_| option_error(&key, &value))?
        }
        "iou" => {
          builder.params.iou_threshold = value.parse().map_err(|_| option_error(&key, &value))?
        }
        "max" => {
          builder.params.max_detections = value.parse().map_err(|_| option_error(&key, &value))?
        }
        "threads" => {
          builder.intra_threads = value.parse().map_err(|_| option_error(&key, &value))?
        }
        "names" => builder.class_names = value.split(',').map(|s| s.trim().to_string()).collect(),
        other => debug!("忽略未知模型参数: {}", other),
      }
    }

    Ok(builder)
  }
}

impl OnnxDetectorBuilder {
  pub fn params(mut self, params: YoloDecodeParams) -> Self {
    self.params = params;
    self
  }

  pub fn build(self) -> Result<OnnxDetector, DetectorError> {
    if !Path::new(&self.model_path).exists() {
      error!("模型文件不存在: {}", self.model_path);
      return Err(DetectorError::NotFound(self.model_path));
    }

    info!("加载模型文件: {}", self.model_path);
    let session = load_session(&self.model_path, self.intra_threads)
      .map_err(|e| DetectorError::invalid(&self.model_path, e))?;
    info!("模型加载完成");
    debug!("类别: {:?}", self.class_names);

    Ok(OnnxDetector {
      session: Mutex::new(session),
      params: self.params,
      class_names: self.class_names,
    })
  }
}

fn load_session(path: &str, intra_threads: usize) -> ort::Result<Session> {
  Session::builder()?
    .with_optimization_level(GraphOptimizationLevel::Level3)?
    .with_intra_threads(intra_threads)?
    .commit_from_file(path)
}

pub struct OnnxDetector {
  session: Mutex<Session>,
  params: YoloDecodeParams,
  class_names: Vec<String>,
}

impl OnnxDetector {
  /// 缩放到模型输入尺寸，转为归一化的 NCHW 张量
  fn preprocess(&self, image: &RgbImage) -> Array<f32, IxDyn> {
    let size = self.params.input_size;
    let resized = image::imageops::resize(image, size, size, FilterType::Triangle);

    let mut input = Array::zeros(IxDyn(&[1, 3, size as usize, size as usize]));
    for (x, y, pixel) in resized.enumerate_pixels() {
      for c in 0..3 {
        input[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
      }
    }
    input
  }
}

fn inference_error(e: impl std::fmt::Display) -> DetectorError {
  DetectorError::Inference(e.to_string())
}

impl Detector for OnnxDetector {
  fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
    debug!("设置模型输入");
    let input_tensor = Value::from_array(self.preprocess(image)).map_err(inference_error)?;

    let mut session = self
      .session
      .lock()
      .map_err(|e| inference_error(format!("会话锁失败: {}", e)))?;

    debug!("执行模型推理");
    let outputs = session
      .run(ort::inputs![input_tensor])
      .map_err(inference_error)?;

    let output_value = outputs
      .get("output0")
      .or_else(|| outputs.get("output"))
      .ok_or_else(|| inference_error("未找到检测输出张量 (output0, output)"))?;
    let (shape, data) = output_value
      .try_extract_tensor::<f32>()
      .map_err(inference_error)?;
    let shape: Vec<usize> = shape.as_ref().iter().map(|&x| x as usize).collect();
    debug!("模型输出形状: {:?}", shape);

    decode_yolov8(
      data,
      &shape,
      &self.class_names,
      &self.params,
      image.width(),
      image.height(),
    )
  }
}
