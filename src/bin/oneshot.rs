// 该文件是 Xunshi （巡视） 项目的一部分。
// src/bin/oneshot.rs - 单次抓拍检测并发布
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

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use tracing::info;

use xunshi::{
  args::CommonArgs,
  input::InputWrapper,
  labels::load_labels,
  model::load_model,
  output::Draw,
  publish::{MqttSession, Topics},
  task::{OneShotTask, Pipeline, Task},
};

/// 从 HTTP 摄像头抓取一帧，检测后发布结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub common: CommonArgs,

  /// 摄像头快照地址（http/https 或 file）
  #[arg(long, value_name = "URL")]
  pub camera_url: Option<String>,

  /// 标注图像输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<PathBuf>,
}

fn main() -> Result<()> {
  xunshi::init_tracing();

  let args = Args::parse();
  let mut config = args.common.load_config()?;
  if let Some(url) = &args.camera_url {
    config.camera.url = url.clone();
  }
  if let Some(output) = &args.output {
    config.output.image_path = output.clone();
  }
  config.validate()?;

  info!("模型文件路径: {}", config.model.path.display());
  info!("输入来源: {}", config.camera.url);
  info!("输出路径: {}", config.output.image_path.display());
  info!("置信度阈值: {}", config.model.threshold);

  let model = load_model(&config.model)?;
  let labels = load_labels(&config.model.labels)?;
  let draw = Draw::from_font_path(config.output.font_path.as_deref())?;
  let input = InputWrapper::with_timeout(
    &config.camera_url()?,
    Duration::from_secs(config.camera.timeout_secs),
  )?;

  let mut session = MqttSession::connect(&config.mqtt)?;
  let topics = Topics::oneshot(&config.mqtt.topic);
  let pipeline = Pipeline::new(
    model,
    labels,
    draw,
    config.model.threshold,
    session.publisher(),
  );

  let result = OneShotTask {
    output: config.output.image_path.clone(),
    topic: &topics.results,
  }
  .run_task(input, &pipeline);

  if result.is_ok() {
    session.flush()?;
  }
  session.disconnect();

  let result = result?;
  info!("处理完成! 检测到 {} 个目标", result.total_objects);
  Ok(())
}
