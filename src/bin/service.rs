// 该文件是 Xunshi （巡视） 项目的一部分。
// src/bin/service.rs - 按触发消息检测的常驻服务
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

use std::{path::PathBuf, thread, time::Duration};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use xunshi::{
  args::CommonArgs,
  labels::load_labels,
  model::load_model,
  output::Draw,
  publish::{MqttSession, Topics},
  task::{Pipeline, ServiceTask, Task},
};

/// 订阅触发主题，对指定摄像头的快照进行检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub common: CommonArgs,

  /// 快照目录，读取 snapshot_{camera_id}.jpg
  #[arg(long, value_name = "DIR")]
  pub snapshot_dir: Option<PathBuf>,

  /// 标注图像目录，写入 output_with_bboxes_{camera_id}.jpg
  #[arg(long, value_name = "DIR")]
  pub output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
  xunshi::init_tracing();

  let args = Args::parse();
  let mut config = args.common.load_config()?;
  if let Some(dir) = &args.snapshot_dir {
    config.camera.snapshot_dir = dir.clone();
  }
  if let Some(dir) = &args.output_dir {
    config.output.directory = dir.clone();
  }
  config.validate()?;

  info!("模型文件路径: {}", config.model.path.display());
  info!("快照目录: {}", config.camera.snapshot_dir.display());
  info!("置信度阈值: {}", config.model.threshold);

  let model = load_model(&config.model)?;
  let labels = load_labels(&config.model.labels)?;
  let draw = Draw::from_font_path(config.output.font_path.as_deref())?;

  let session = MqttSession::connect(&config.mqtt)?;
  let topics = Topics::service(&config.mqtt.topic);
  session.subscribe(&topics.trigger)?;

  let publisher = session.publisher();
  let stopper = publisher.clone();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    if let Err(e) = stopper.request_disconnect() {
      warn!("断开请求失败: {}", e);
    }
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;

  let pipeline = Pipeline::new(model, labels, draw, config.model.threshold, publisher);
  info!("推理服务运行中，监听 {}", topics.trigger);

  ServiceTask {
    snapshot_dir: config.camera.snapshot_dir.clone(),
    output_dir: config.output.directory.clone(),
    topic: &topics.results,
  }
  .run_task(session.into_triggers(&topics.trigger), &pipeline)?;

  Ok(())
}
