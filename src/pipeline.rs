// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/pipeline.rs - 单张图像处理流程
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

use image::RgbImage;
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl,
  aggregate::{PlateError, PlateOutcome, PlateReading, aggregate},
  config::PipelineConfig,
  detection::{Detection, DetectionClass},
  filter::filter_violations,
  input::{ImageSource, InputError},
  model::{Detector, DetectorError, DetectorWrapper},
  ocr::{OcrEngine, OcrError, TesseractOcr, reading_order},
  plate::parse_plate,
  preprocess::plate_region,
  report::ViolationReport,
};

static INSTALLED: OnceCell<Pipeline> = OnceCell::new();

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("Model not loaded: {0}")]
  ModelUnavailable(#[source] DetectorError),
  #[error("OCR engine not available: {0}")]
  OcrUnavailable(#[source] OcrError),
  #[error("Failed to decode image: {0}")]
  ImageDecode(#[from] InputError),
  #[error("Detection failed: {0}")]
  Detection(#[source] DetectorError),
  #[error("pipeline already initialized")]
  AlreadyInitialized,
}

/// 单张图像的完整处理结果
#[derive(Debug)]
pub struct Analysis {
  pub report: ViolationReport,
  /// 检测器原始输出
  pub detections: Vec<Detection>,
  /// 每个车牌检测各自的读取结果，按检测顺序
  pub plates: Vec<PlateOutcome>,
}

/// 检测器与 OCR 引擎共享，单次调用内无内部状态
pub struct Pipeline {
  detector: Box<dyn Detector>,
  ocr: Box<dyn OcrEngine>,
  config: PipelineConfig,
}

impl Pipeline {
  pub fn new(
    detector: impl Detector + 'static,
    ocr: impl OcrEngine + 'static,
    config: PipelineConfig,
  ) -> Self {
    Self {
      detector: Box::new(detector),
      ocr: Box::new(ocr),
      config,
    }
  }

  /// 按 URL 方案构建检测器与 OCR 后端
  pub fn from_urls(model: &Url, ocr: &Url, config: PipelineConfig) -> Result<Self, PipelineError> {
    info!("加载检测模型: {}", model);
    let detector = DetectorWrapper::from_url(model).map_err(|e| {
      error!("检测模型加载失败: {}", e);
      PipelineError::ModelUnavailable(e)
    })?;

    info!("初始化 OCR 引擎: {}", ocr);
    let ocr = TesseractOcr::from_url(ocr).map_err(|e| {
      error!("OCR 引擎初始化失败: {}", e);
      PipelineError::OcrUnavailable(e)
    })?;

    Ok(Self::new(detector, ocr, config))
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn run(&self, source: &ImageSource) -> Result<ViolationReport, PipelineError> {
    self.analyze(source).map(|analysis| analysis.report)
  }

  pub fn analyze(&self, source: &ImageSource) -> Result<Analysis, PipelineError> {
    let image = source.decode().inspect_err(|e| error!("图像解码失败: {}", e))?;
    self.analyze_image(&image)
  }

  pub fn analyze_image(&self, image: &RgbImage) -> Result<Analysis, PipelineError> {
    info!("开始检测，图像尺寸 {}x{}", image.width(), image.height());
    let detections = self
      .detector
      .detect(image)
      .map_err(PipelineError::Detection)?;
    info!("检测到 {} 个目标", detections.len());

    let violations = filter_violations(&detections, &self.config.filter);
    info!("违章 {} 条", violations.len());

    let plates: Vec<PlateOutcome> = detections
      .iter()
      .enumerate()
      .filter(|(_, det)| det.is(DetectionClass::NumberPlate))
      .map(|(idx, det)| PlateOutcome {
        detection_index: idx,
        confidence: det.confidence,
        bbox: det.bbox,
        result: self.read_plate(image, det),
      })
      .collect();
    debug!("车牌检测 {} 个", plates.len());

    let report = aggregate(
      violations,
      &detections,
      &plates,
      self.config.plate_selection,
    );
    info!("处理完成，车牌: '{}'", report.license_plate());

    Ok(Analysis {
      report,
      detections,
      plates,
    })
  }

  fn read_plate(&self, image: &RgbImage, plate: &Detection) -> Result<PlateReading, PlateError> {
    let region = plate_region(image, &plate.bbox, self.config.upscale)?;
    let tokens = self.ocr.read_text(&region)?;
    debug!("OCR 返回 {} 个片段", tokens.len());

    let ordered = reading_order(&tokens, self.config.line_tolerance);
    let fields = parse_plate(&ordered);
    let raw = tokens.into_iter().map(|t| t.text).collect();

    Ok(PlateReading::new(raw, ordered, fields))
  }
}

/// 在进程启动时安装全局流水线，只能安装一次
pub fn install(pipeline: Pipeline) -> Result<&'static Pipeline, PipelineError> {
  let mut fresh = false;
  let installed = INSTALLED.get_or_init(|| {
    fresh = true;
    pipeline
  });

  if fresh {
    Ok(installed)
  } else {
    error!("流水线已初始化，拒绝重复安装");
    Err(PipelineError::AlreadyInitialized)
  }
}

pub fn installed() -> Option<&'static Pipeline> {
  INSTALLED.get()
}
