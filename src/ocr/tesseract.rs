// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/ocr/tesseract.rs - Tesseract 命令行 OCR 后端
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

use std::io::{Cursor, Write};
use std::process::{Child, Command, Stdio};

use image::{GrayImage, ImageFormat};
use tracing::{debug, error, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  ocr::{OcrEngine, OcrError, OcrToken},
};

const DEFAULT_BINARY: &str = "tesseract";
const DEFAULT_LANG: &str = "eng";
// 稀疏文本模式，车牌字符常被拆成多块
const DEFAULT_PSM: u8 = 11;
const TSV_WORD_LEVEL: &str = "5";

/// 通过子进程调用 tesseract，解析其 TSV 输出中的单词
#[derive(Debug, Clone)]
pub struct TesseractOcr {
  binary: String,
  lang: String,
  psm: u8,
}

impl Default for TesseractOcr {
  fn default() -> Self {
    Self {
      binary: DEFAULT_BINARY.to_string(),
      lang: DEFAULT_LANG.to_string(),
      psm: DEFAULT_PSM,
    }
  }
}

impl FromUrlWithScheme for TesseractOcr {
  const SCHEME: &'static str = "tesseract";
}

impl FromUrl for TesseractOcr {
  type Error = OcrError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(OcrError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        found: url.scheme().to_string(),
      });
    }

    let mut ocr = TesseractOcr::default();
    let path = url.path();
    if !path.is_empty() && path != "/" {
      ocr.binary = path.to_string();
    }

    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "lang" => ocr.lang = value.to_string(),
        "psm" => {
          ocr.psm = value.parse().map_err(|_| OcrError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
          })?
        }
        other => debug!("忽略未知 OCR 参数: {}", other),
      }
    }

    Ok(ocr)
  }
}

impl OcrEngine for TesseractOcr {
  fn read_text(&self, region: &GrayImage) -> Result<Vec<OcrToken>, OcrError> {
    let mut png = Vec::new();
    region.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    debug!(
      "调用 {} 识别 {}x{} 区域",
      self.binary,
      region.width(),
      region.height()
    );
    let mut child = Command::new(&self.binary)
      .args(["stdin", "stdout", "-l", self.lang.as_str(), "--psm"])
      .arg(self.psm.to_string())
      .arg("tsv")
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()?;

    feed_stdin(&mut child, &png)?;
    let output = child.wait_with_output()?;

    if !output.status.success() {
      return Err(OcrError::Exit {
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    let tsv = String::from_utf8_lossy(&output.stdout);
    parse_tsv(&tsv)
  }
}

/// 写入子进程标准输入，失败时结束并回收子进程
fn feed_stdin(child: &mut Child, data: &[u8]) -> Result<(), OcrError> {
  let Some(mut stdin) = child.stdin.take() else {
    return Ok(());
  };

  if let Err(e) = stdin.write_all(data) {
    drop(stdin);
    warn!("写入 OCR 进程失败: {}", e);
    if let Err(kill_err) = child.kill() {
      debug!("OCR 进程已退出: {}", kill_err);
    }
    child.wait()?;
    return Err(OcrError::Io(e));
  }

  Ok(())
}

/// 解析 tesseract TSV，只保留单词级别且文本非空的行
fn parse_tsv(tsv: &str) -> Result<Vec<OcrToken>, OcrError> {
  let mut lines = tsv.lines();
  let header: Vec<&str> = lines
    .next()
    .ok_or_else(|| OcrError::InvalidOutput("empty TSV output".to_string()))?
    .split('\t')
    .collect();

  let column = |name: &str| {
    header
      .iter()
      .position(|h| *h == name)
      .ok_or_else(|| OcrError::InvalidOutput(format!("missing TSV column '{}'", name)))
  };
  let level_idx = column("level")?;
  let left_idx = column("left")?;
  let top_idx = column("top")?;
  let text_idx = column("text")?;

  let mut tokens = Vec::new();
  for line in lines {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.get(level_idx) != Some(&TSV_WORD_LEVEL) {
      continue;
    }
    let text = fields.get(text_idx).map(|t| t.trim()).unwrap_or_default();
    if text.is_empty() {
      continue;
    }

    let coord = |idx: usize| -> Result<f32, OcrError> {
      fields
        .get(idx)
        .and_then(|v| v.trim().parse::<f32>().ok())
        .ok_or_else(|| OcrError::InvalidOutput(format!("bad coordinate in row '{}'", line)))
    };
    tokens.push(OcrToken::new(text, coord(left_idx)?, coord(top_idx)?));
  }

  Ok(tokens)
}
