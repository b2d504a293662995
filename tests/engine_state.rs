// 该文件是 Toukui （头盔巡检） 项目的一部分。
// tests/engine_state.rs - 全局流水线安装测试
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

use toukui::{
  config::PipelineConfig,
  model::RecordedDetector,
  ocr::TesseractOcr,
  pipeline::{self, Pipeline, PipelineError},
};

// 全局状态在同一进程内共享，因此只用一个测试覆盖完整流程
#[test]
fn pipeline_installs_once() {
  assert!(pipeline::installed().is_none());

  let first = Pipeline::new(
    RecordedDetector::new(vec![]),
    TesseractOcr::default(),
    PipelineConfig::default(),
  );
  let installed = pipeline::install(first).unwrap();
  assert_eq!(installed.config(), &PipelineConfig::default());
  assert!(pipeline::installed().is_some());

  let second = Pipeline::new(
    RecordedDetector::new(vec![]),
    TesseractOcr::default(),
    PipelineConfig {
      upscale: 2,
      ..PipelineConfig::default()
    },
  );
  assert!(matches!(
    pipeline::install(second),
    Err(PipelineError::AlreadyInitialized)
  ));
  assert_eq!(pipeline::installed().unwrap().config().upscale, 3);
}
