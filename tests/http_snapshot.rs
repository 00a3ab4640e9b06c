// 该文件是 Xunshi （巡视） 项目的一部分。
// tests/http_snapshot.rs - HTTP 摄像头输入测试
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

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use url::Url;
use xunshi::input::{Capture, FetchError, HttpSnapshotInput};

use common::{jpeg_bytes, serve_frame};

fn input(url: &str) -> HttpSnapshotInput {
  HttpSnapshotInput::new(Url::parse(url).unwrap(), Duration::from_secs(5)).unwrap()
}

#[test]
fn ok_response_is_decoded_and_resized() {
  let url = serve_frame(StatusCode::OK, jpeg_bytes(200, 100));
  let frame = input(&url).capture((64, 48)).unwrap();

  assert_eq!(frame.original.dimensions(), (200, 100));
  assert_eq!(frame.resized.dimensions(), (64, 48));
}

#[test]
fn non_ok_status_is_a_fetch_error() {
  let url = serve_frame(StatusCode::NOT_FOUND, Vec::new());
  let err = input(&url).capture((64, 48)).unwrap_err();

  assert!(matches!(err, FetchError::Status(404)));
}

#[test]
fn undecodable_body_is_a_fetch_error() {
  let url = serve_frame(StatusCode::OK, b"<html>camera offline</html>".to_vec());
  let err = input(&url).capture((64, 48)).unwrap_err();

  assert!(matches!(err, FetchError::Decode(_)));
}

#[test]
fn only_http_schemes_are_accepted() {
  let err = HttpSnapshotInput::new(
    Url::parse("file:///tmp/snapshot_cam.jpg").unwrap(),
    Duration::from_secs(1),
  )
  .err()
  .unwrap();
  assert!(matches!(err, FetchError::SchemeMismatch(s) if s == "file"));
}
