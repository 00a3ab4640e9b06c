// 该文件是 Xunshi （巡视） 项目的一部分。
// src/labels.rs - 类别标签
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

use std::{collections::BTreeMap, path::Path};

use tracing::{info, warn};

pub const UNKNOWN_LABEL: &str = "Unknown";

/// 类别编号到名称的映射，启动时构建，之后只读
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
  labels: BTreeMap<u32, String>,
}

impl LabelMap {
  /// 每行一个标签，行号（从 0 开始）即类别编号
  pub fn parse(text: &str) -> Self {
    let labels = text
      .lines()
      .enumerate()
      .map(|(index, line)| (index as u32, line.trim().to_string()))
      .collect();
    Self { labels }
  }

  pub fn get(&self, class_id: u32) -> Option<&str> {
    self.labels.get(&class_id).map(String::as_str)
  }

  /// 未知类别返回 "Unknown"
  pub fn name(&self, class_id: u32) -> &str {
    self.get(class_id).unwrap_or(UNKNOWN_LABEL)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
    self.labels.iter().map(|(id, name)| (*id, name.as_str()))
  }
}

impl<S: Into<String>> FromIterator<(u32, S)> for LabelMap {
  fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
    Self {
      labels: iter.into_iter().map(|(id, name)| (id, name.into())).collect(),
    }
  }
}

pub fn load_labels(path: &Path) -> Result<LabelMap, std::io::Error> {
  info!("加载标签文件: {}", path.display());
  let now = std::time::Instant::now();
  let text = std::fs::read_to_string(path)?;
  let labels = LabelMap::parse(&text);
  if labels.is_empty() {
    warn!("标签文件为空，所有类别将显示为 {}", UNKNOWN_LABEL);
  }
  info!("已加载 {} 个标签，耗时: {:.2?}", labels.len(), now.elapsed());
  Ok(labels)
}
