// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::io::Read;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, info, warn};

use toukui::{
  config::PipelineConfig,
  input::ImageSource,
  output::{Render, SaveImageFileOutput},
  pipeline::{self, Pipeline, PipelineError},
  report::{Invocation, ViolationReport},
};

fn init_tracing(verbose: u8) {
  let level = match verbose {
    0 => Level::WARN,
    1 => Level::INFO,
    2 => Level::DEBUG,
    _ => Level::TRACE,
  };

  // 标准输出只承载 JSON 结果
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_max_level(level)
    .init();
}

fn load_config(args: &args::Args) -> Result<PipelineConfig> {
  let mut config = match &args.config {
    Some(path) => PipelineConfig::from_file(path)?,
    None => PipelineConfig::default(),
  };
  args.apply_overrides(&mut config);
  config.validate()?;
  Ok(config)
}

fn read_source(args: &args::Args) -> Result<ImageSource> {
  if !args.base64
    && !args.reads_stdin()
    && let Some(path) = &args.input
  {
    return Ok(ImageSource::Path(path.clone()));
  }

  let data = match &args.input {
    Some(path) if !args.reads_stdin() => {
      std::fs::read(path).with_context(|| format!("无法读取输入文件 {}", path.display()))?
    }
    _ => {
      let mut buffer = Vec::new();
      std::io::stdin()
        .read_to_end(&mut buffer)
        .context("无法读取标准输入")?;
      buffer
    }
  };

  if args.base64 {
    let text = String::from_utf8(data).context("base64 输入不是有效的 UTF-8 文本")?;
    Ok(ImageSource::from_base64(&text).map_err(PipelineError::from)?)
  } else {
    Ok(ImageSource::Bytes(data))
  }
}

fn run(args: &args::Args) -> Result<ViolationReport> {
  let config = load_config(args)?;
  info!("检测模型: {}", args.model);
  info!("OCR 引擎: {}", args.ocr);
  info!("配置: {:?}", config);

  let pipeline = pipeline::install(Pipeline::from_urls(&args.model, &args.ocr, config)?)?;

  let source = read_source(args)?;
  let image = source.decode().map_err(PipelineError::from)?;

  let now = std::time::Instant::now();
  let analysis = pipeline.analyze_image(&image)?;
  info!("处理完成，耗时: {:.2?}", now.elapsed());

  if let Some(path) = &args.annotate {
    let output = SaveImageFileOutput::new(path);
    if let Err(e) = output.render_result(&image, &analysis.detections, analysis.report.violations()) {
      warn!("标注图像保存失败: {}", e);
    }
  }

  Ok(analysis.report)
}

fn main() -> ExitCode {
  let args = args::Args::parse();
  init_tracing(args.verbose);

  let invocation = Invocation::from_result(run(&args));
  let code = if invocation.is_error() {
    ExitCode::FAILURE
  } else {
    ExitCode::SUCCESS
  };

  match invocation.to_json() {
    Ok(json) => println!("{}", json),
    Err(e) => {
      println!("{{\"error\": \"failed to serialize result\"}}");
      warn!("结果序列化失败: {}", e);
      return ExitCode::FAILURE;
    }
  }

  code
}
