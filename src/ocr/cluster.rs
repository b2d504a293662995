// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/ocr/cluster.rs - 文本片段按阅读顺序排列
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

use super::OcrToken;

/// 同一行允许的纵向偏差（像素）
pub const DEFAULT_LINE_TOLERANCE: f32 = 20.0;

/// 按纵坐标把文本片段分成若干行，行内按横坐标排序
///
/// 行的锚点是开启该行的片段的 y 值，之后不再更新。排序均为稳定排序，
/// 坐标相同时保持输入顺序。
pub fn group_lines(tokens: &[OcrToken], tolerance: f32) -> Vec<Vec<&OcrToken>> {
  let mut sorted: Vec<&OcrToken> = tokens.iter().collect();
  sorted.sort_by(|a, b| a.y.total_cmp(&b.y));

  let mut lines: Vec<Vec<&OcrToken>> = Vec::new();
  let mut current: Vec<&OcrToken> = Vec::new();
  let mut anchor: Option<f32> = None;

  for token in sorted {
    match anchor {
      Some(y) if (token.y - y).abs() < tolerance => current.push(token),
      _ => {
        if !current.is_empty() {
          lines.push(std::mem::take(&mut current));
        }
        anchor = Some(token.y);
        current.push(token);
      }
    }
  }
  if !current.is_empty() {
    lines.push(current);
  }

  for line in lines.iter_mut() {
    line.sort_by(|a, b| a.x.total_cmp(&b.x));
  }

  lines
}

/// 返回按阅读顺序（自上而下、自左而右）排列的文本
pub fn reading_order(tokens: &[OcrToken], tolerance: f32) -> Vec<String> {
  group_lines(tokens, tolerance)
    .into_iter()
    .flatten()
    .map(|token| token.text.clone())
    .collect()
}
