// 该文件是 Toukui （头盔巡检） 项目的一部分。
// src/plate.rs - 车牌结构解析
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

use std::collections::{HashMap, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// 合法的邦/地区代码
pub const VALID_STATE_CODES: [&str; 38] = [
  "AN", "AP", "AR", "AS", "BR", "CH", "CG", "DD", "DN", "DL", "GA", "GJ", "HR", "HP", "JK", "JH",
  "KA", "KL", "LA", "LD", "MP", "MH", "MN", "ML", "MZ", "NL", "OD", "PY", "PB", "RJ", "SK", "TN",
  "TS", "TG", "TR", "UP", "UK", "WB",
];

/// 常见的代码误识别及其纠正
pub const STATE_CORRECTIONS: [(&str, &str); 4] =
  [("ME", "WB"), ("MB", "WB"), ("MW", "MH"), ("MD", "MP")];

static STATE_SET: Lazy<HashSet<&'static str>> =
  Lazy::new(|| VALID_STATE_CODES.iter().copied().collect());

static CORRECTION_TABLE: Lazy<HashMap<&'static str, &'static str>> =
  Lazy::new(|| STATE_CORRECTIONS.iter().copied().collect());

// 代码 1-2 字母，区号 2 位数字，系列 1-3 位字母数字，号码 4 位数字
static PLATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"([A-Z]{1,2})[ .]?([0-9]{2})[ .]?([A-Z0-9]{1,3})[ .]?([0-9]{4})")
    .expect("车牌正则无效")
});

/// 解析后的车牌字段
///
/// 要么四个结构字段齐全，要么只有 `raw_fallback`，不存在部分填充。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlateFields {
  Structured {
    state: String,
    district: String,
    series: String,
    number: String,
  },
  Fallback(String),
}

impl PlateFields {
  pub fn state(&self) -> Option<&str> {
    match self {
      PlateFields::Structured { state, .. } => Some(state),
      PlateFields::Fallback(_) => None,
    }
  }

  pub fn district(&self) -> Option<&str> {
    match self {
      PlateFields::Structured { district, .. } => Some(district),
      PlateFields::Fallback(_) => None,
    }
  }

  pub fn series(&self) -> Option<&str> {
    match self {
      PlateFields::Structured { series, .. } => Some(series),
      PlateFields::Fallback(_) => None,
    }
  }

  pub fn number(&self) -> Option<&str> {
    match self {
      PlateFields::Structured { number, .. } => Some(number),
      PlateFields::Fallback(_) => None,
    }
  }

  pub fn raw_fallback(&self) -> Option<&str> {
    match self {
      PlateFields::Fallback(raw) => Some(raw),
      PlateFields::Structured { .. } => None,
    }
  }

  pub fn is_structured(&self) -> bool {
    matches!(self, PlateFields::Structured { .. })
  }
}

impl fmt::Display for PlateFields {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PlateFields::Structured {
        state,
        district,
        series,
        number,
      } => write!(f, "{} {} {} {}", state, district, series, number),
      PlateFields::Fallback(raw) => f.write_str(raw),
    }
  }
}

/// 校验并纠正邦代码，无法纠正时原样返回
pub fn correct_state(code: &str) -> String {
  if STATE_SET.contains(code) {
    return code.to_string();
  }
  match CORRECTION_TABLE.get(code) {
    Some(corrected) => {
      debug!("邦代码 {} 纠正为 {}", code, corrected);
      corrected.to_string()
    }
    None => code.to_string(),
  }
}

/// 拼接、大写并去掉非 `[A-Z0-9]` 字符
pub fn clean_text(tokens: &[String]) -> String {
  tokens
    .concat()
    .to_uppercase()
    .chars()
    .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    .collect()
}

fn fallback_text(tokens: &[String]) -> String {
  tokens
    .join(" ")
    .to_uppercase()
    .chars()
    .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == ' ')
    .collect()
}

/// 从按阅读顺序排列的文本中解析车牌
pub fn parse_plate(tokens: &[String]) -> PlateFields {
  let clean = clean_text(tokens);

  let Some(caps) = PLATE_PATTERN.captures(&clean) else {
    debug!("'{}' 不符合车牌结构，使用原始文本", clean);
    return PlateFields::Fallback(fallback_text(tokens));
  };

  // 系列位上的 0 多为字母 Q 的误识别
  let series = caps[3].replace('0', "Q");

  PlateFields::Structured {
    state: correct_state(&caps[1]),
    district: caps[2].to_string(),
    series,
    number: caps[4].to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tokens(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn well_formed_plate_is_structured() {
    let fields = parse_plate(&tokens(&["MH12AB1234"]));
    assert!(fields.is_structured());
    assert_eq!(fields.state(), Some("MH"));
    assert_eq!(fields.district(), Some("12"));
    assert_eq!(fields.series(), Some("AB"));
    assert_eq!(fields.number(), Some("1234"));
    assert_eq!(fields.to_string(), "MH 12 AB 1234");
  }

  #[test]
  fn split_and_noisy_tokens_are_joined() {
    let fields = parse_plate(&tokens(&["mh-12", "ab.", "1234"]));
    assert_eq!(fields.to_string(), "MH 12 AB 1234");
  }

  #[test]
  fn zero_in_series_becomes_q() {
    let fields = parse_plate(&tokens(&["KA01A01234"]));
    assert_eq!(fields.series(), Some("AQ"));
    assert_eq!(fields.to_string(), "KA 01 AQ 1234");
  }

  #[test]
  fn misread_state_is_corrected() {
    assert_eq!(parse_plate(&tokens(&["MB", "02", "CD", "5678"])).to_string(), "WB 02 CD 5678");
    assert_eq!(correct_state("MW"), "MH");
  }

  #[test]
  fn unknown_state_is_left_alone() {
    assert_eq!(parse_plate(&tokens(&["ZZ34K9876"])).to_string(), "ZZ 34 K 9876");
    assert_eq!(correct_state("Q"), "Q");
  }

  #[test]
  fn match_can_start_mid_string() {
    let fields = parse_plate(&tokens(&["IND", "DL", "03", "CA", "4321"]));
    assert_eq!(fields.to_string(), "DL 03 CA 4321");
  }

  #[test]
  fn unparseable_text_falls_back() {
    let fields = parse_plate(&tokens(&["xxx", "yy-y"]));
    assert!(!fields.is_structured());
    assert_eq!(fields.raw_fallback(), Some("XXX YYY"));
    assert_eq!(fields.to_string(), "XXX YYY");
  }

  #[test]
  fn no_tokens_give_empty_fallback() {
    assert_eq!(parse_plate(&[]).to_string(), "");
  }

  #[test]
  fn plate_pattern_compiles() {
    let caps = PLATE_PATTERN.captures("MH12AB1234").unwrap();
    assert_eq!(&caps[1], "MH");
    assert_eq!(&caps[4], "1234");
  }

  #[test]
  fn tables_are_consistent() {
    assert_eq!(STATE_SET.len(), VALID_STATE_CODES.len());
    for (misread, corrected) in STATE_CORRECTIONS {
      assert!(!STATE_SET.contains(misread));
      assert!(STATE_SET.contains(corrected));
    }
  }
}
