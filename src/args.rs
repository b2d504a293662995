// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/args.rs - 命令行参数
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use url::Url;

use toukui::{aggregate::PlateSelection, config::PipelineConfig};

/// 头盔违章与车牌识别
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测模型地址
  /// - onnx:///path/to/model.onnx?conf=0.25&iou=0.45
  /// - json:///path/to/detections.json
  #[arg(long, value_name = "MODEL", default_value = "onnx:///models/helmet.onnx")]
  pub model: Url,

  /// OCR 引擎地址，例如 tesseract:///usr/bin/tesseract?lang=eng&psm=11
  #[arg(long, value_name = "OCR", default_value = "tesseract:")]
  pub ocr: Url,

  /// 输入图像文件，省略或为 "-" 时从标准输入读取
  #[arg(long, value_name = "SOURCE")]
  pub input: Option<PathBuf>,

  /// 输入为 base64 文本（可带 data:image/...;base64, 前缀）
  #[arg(long)]
  pub base64: bool,

  /// JSON 配置文件
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 参与冲突判定的戴头盔检测最低置信度
  #[arg(long, value_name = "THRESHOLD")]
  pub helmet_confidence: Option<f32>,

  /// 冲突判定 IoU 阈值
  #[arg(long, value_name = "THRESHOLD")]
  pub conflict_iou: Option<f32>,

  /// 违章置信度阈值
  #[arg(long, value_name = "THRESHOLD")]
  pub violation_confidence: Option<f32>,

  /// OCR 行聚类纵向容差（像素）
  #[arg(long, value_name = "PIXELS")]
  pub line_tolerance: Option<f32>,

  /// 车牌裁剪放大倍数
  #[arg(long, value_name = "FACTOR")]
  pub upscale: Option<u32>,

  /// 多块车牌时的选择规则
  #[arg(long, value_enum)]
  pub plate_selection: Option<PlateSelection>,

  /// 保存标注后的图像
  #[arg(long, value_name = "OUTPUT")]
  pub annotate: Option<PathBuf>,

  /// 日志详细程度，可重复（-v, -vv）
  #[arg(short, long, action = ArgAction::Count)]
  pub verbose: u8,
}

impl Args {
  pub fn reads_stdin(&self) -> bool {
    self
      .input
      .as_ref()
      .is_none_or(|path| path.as_os_str() == "-")
  }

  /// 命令行参数覆盖配置文件中的对应项
  pub fn apply_overrides(&self, config: &mut PipelineConfig) {
    if let Some(v) = self.helmet_confidence {
      config.filter.helmet_confidence = v;
    }
    if let Some(v) = self.conflict_iou {
      config.filter.conflict_iou = v;
    }
    if let Some(v) = self.violation_confidence {
      config.filter.violation_confidence = v;
    }
    if let Some(v) = self.line_tolerance {
      config.line_tolerance = v;
    }
    if let Some(v) = self.upscale {
      config.upscale = v;
    }
    if let Some(v) = self.plate_selection {
      config.plate_selection = v;
    }
  }
}
