// 该文件是 Xunshi （巡视） 项目的一部分。
// tests/common/mod.rs - 测试共用的桩模型与记录发布器
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

#![allow(dead_code)]

use std::cell::RefCell;

use axum::{
  Router,
  http::{StatusCode, header},
  routing::get,
};
use image::{Rgb, RgbImage};
use thiserror::Error;
use xunshi::{
  frame::Frame,
  labels::LabelMap,
  model::{BBox, DetectItem, DetectResult, Model},
  output::Draw,
  publish::Publish,
  task::Pipeline,
};

#[derive(Error, Debug)]
#[error("accelerator invoke failed")]
pub struct StubError;

/// 总是返回固定候选框的模型
pub struct StubModel {
  pub items: Vec<DetectItem>,
  pub fail: bool,
}

impl StubModel {
  pub fn person() -> Self {
    Self {
      items: vec![DetectItem {
        class_id: 0,
        score: 0.9,
        bbox: BBox::new(10, 10, 50, 50),
      }],
      fail: false,
    }
  }

  pub fn empty() -> Self {
    Self {
      items: Vec::new(),
      fail: false,
    }
  }

  pub fn failing() -> Self {
    Self {
      items: Vec::new(),
      fail: true,
    }
  }
}

impl Model for StubModel {
  type Error = StubError;

  fn input_size(&self) -> (u32, u32) {
    (64, 64)
  }

  fn infer(&self, _frame: &Frame) -> Result<DetectResult, Self::Error> {
    if self.fail {
      return Err(StubError);
    }
    Ok(self.items.clone().into())
  }
}

#[derive(Default)]
pub struct RecordingPublisher {
  pub messages: RefCell<Vec<(String, Vec<u8>)>>,
}

impl RecordingPublisher {
  pub fn payloads(&self) -> Vec<String> {
    self
      .messages
      .borrow()
      .iter()
      .map(|(_, payload)| String::from_utf8(payload.clone()).unwrap())
      .collect()
  }

  pub fn topics(&self) -> Vec<String> {
    self
      .messages
      .borrow()
      .iter()
      .map(|(topic, _)| topic.clone())
      .collect()
  }
}

impl Publish for RecordingPublisher {
  type Error = std::convert::Infallible;

  fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Self::Error> {
    self
      .messages
      .borrow_mut()
      .push((topic.to_string(), payload));
    Ok(())
  }
}

pub fn person_labels() -> LabelMap {
  [(0, "person")].into_iter().collect()
}

pub fn pipeline(model: StubModel) -> Pipeline<StubModel, RecordingPublisher> {
  Pipeline::new(
    model,
    person_labels(),
    Draw::default(),
    0.3,
    RecordingPublisher::default(),
  )
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
  let image = RgbImage::from_pixel(width, height, Rgb([120, 80, 40]));
  let mut buffer = std::io::Cursor::new(Vec::new());
  image
    .write_to(&mut buffer, image::ImageFormat::Jpeg)
    .unwrap();
  buffer.into_inner()
}

/// 在后台线程启动摄像头快照接口，返回 `frame.jpeg` 地址
pub fn serve_frame(status: StatusCode, body: Vec<u8>) -> String {
  let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
  listener.set_nonblocking(true).unwrap();
  let addr = listener.local_addr().unwrap();

  let app = Router::new().route(
    "/api/frame.jpeg",
    get(move || {
      let body = body.clone();
      async move { (status, [(header::CONTENT_TYPE, "image/jpeg")], body) }
    }),
  );

  std::thread::spawn(move || {
    let runtime = tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .unwrap();
    runtime.block_on(async move {
      let listener = tokio::net::TcpListener::from_std(listener).unwrap();
      axum::serve(listener, app).await.unwrap();
    });
  });

  format!("http://{}/api/frame.jpeg?src=cam", addr)
}
