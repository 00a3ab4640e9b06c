// 该文件是 Xunshi （巡视） 项目的一部分。
// src/publish.rs - MQTT 发布与触发订阅
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

use std::time::Duration;

use rumqttc::{
  Client, ConnectReturnCode, Connection, Event, MqttOptions, Outgoing, Packet, QoS,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;

// 请求队列容量，发布与订阅共用
const REQUEST_CAPACITY: usize = 16;
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

pub trait Publish {
  type Error: std::error::Error + Send + Sync + 'static;
  /// 非保留、至多一次的发布
  fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum PublishError {
  #[error("MQTT 客户端错误: {0}")]
  Client(#[from] rumqttc::ClientError),
  #[error("MQTT 连接错误: {0}")]
  Connection(#[from] rumqttc::ConnectionError),
  #[error("MQTT 代理拒绝连接: {0:?}")]
  Refused(ConnectReturnCode),
  #[error("MQTT 连接已关闭")]
  Closed,
}

#[derive(Error, Debug)]
pub enum MessageDecodeError {
  #[error("触发消息不是合法的 JSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("触发消息不是 JSON 对象")]
  NotAnObject,
  #[error("触发消息缺少 camera_id")]
  MissingCameraId,
  #[error("camera_id 非法: {0:?}")]
  InvalidCameraId(String),
}

/// 结果与触发主题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
  pub results: String,
  pub trigger: String,
}

impl Topics {
  /// 单次模式直接发布到基础主题
  pub fn oneshot(base: &str) -> Self {
    Self {
      results: base.to_string(),
      trigger: format!("{}/trigger", base),
    }
  }

  pub fn service(base: &str) -> Self {
    Self {
      results: format!("{}/results", base),
      trigger: format!("{}/trigger", base),
    }
  }
}

/// 解析触发消息 `{"camera_id": "..."}`，返回摄像头编号
pub fn parse_trigger(payload: &[u8]) -> Result<String, MessageDecodeError> {
  let serde_json::Value::Object(message) = serde_json::from_slice::<serde_json::Value>(payload)?
  else {
    return Err(MessageDecodeError::NotAnObject);
  };
  let camera_id = message
    .get("camera_id")
    .and_then(serde_json::Value::as_str)
    .filter(|id| !id.is_empty())
    .ok_or(MessageDecodeError::MissingCameraId)?
    .to_string();

  // 摄像头编号会拼进文件路径
  if camera_id.contains(['/', '\\', '\0']) || camera_id.contains("..") {
    return Err(MessageDecodeError::InvalidCameraId(camera_id));
  }
  Ok(camera_id)
}

/// 已完成握手的 MQTT 会话
pub struct MqttSession {
  client: Client,
  connection: Connection,
}

impl MqttSession {
  /// 连接代理并等待 ConnAck，失败即返回错误
  pub fn connect(config: &MqttConfig) -> Result<Self, PublishError> {
    info!("连接 MQTT 代理: {}:{}", config.broker, config.port);
    let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
    options.set_clean_session(true);

    let (client, mut connection) = Client::new(options, REQUEST_CAPACITY);
    wait_connack(&mut connection)?;
    info!("MQTT 连接成功");
    Ok(Self { client, connection })
  }

  pub fn subscribe(&self, topic: &str) -> Result<(), PublishError> {
    info!("订阅主题: {}", topic);
    self.client.subscribe(topic, QoS::AtMostOnce)?;
    Ok(())
  }

  pub fn publisher(&self) -> MqttPublisher {
    MqttPublisher {
      client: self.client.clone(),
    }
  }

  /// 驱动事件循环直到排队的发布被写出
  pub fn flush(&mut self) -> Result<(), PublishError> {
    for notification in self.connection.iter() {
      match notification? {
        Event::Outgoing(Outgoing::Publish(_)) => return Ok(()),
        event => debug!("MQTT 事件: {:?}", event),
      }
    }
    Err(PublishError::Closed)
  }

  pub fn disconnect(mut self) {
    if let Err(e) = self.client.disconnect() {
      warn!("MQTT 断开请求失败: {}", e);
      return;
    }
    for notification in self.connection.iter() {
      match notification {
        Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
        Ok(_) => {}
      }
    }
    info!("MQTT 已断开");
  }

  /// 转为触发消息流，流在收到断开请求后结束
  pub fn into_triggers(self, topic: &str) -> MqttTriggers {
    MqttTriggers {
      client: self.client,
      connection: self.connection,
      topic: topic.to_string(),
    }
  }
}

fn wait_connack(connection: &mut Connection) -> Result<(), PublishError> {
  for notification in connection.iter() {
    match notification? {
      Event::Incoming(Packet::ConnAck(ack)) => {
        return match ack.code {
          ConnectReturnCode::Success => Ok(()),
          code => Err(PublishError::Refused(code)),
        };
      }
      event => debug!("MQTT 事件: {:?}", event),
    }
  }
  Err(PublishError::Closed)
}

#[derive(Clone)]
pub struct MqttPublisher {
  client: Client,
}

impl MqttPublisher {
  /// 请求断开，触发消息流随之结束
  pub fn request_disconnect(&self) -> Result<(), PublishError> {
    self.client.try_disconnect()?;
    Ok(())
  }
}

impl Publish for MqttPublisher {
  type Error = PublishError;

  fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Self::Error> {
    // 与事件循环同线程，阻塞发布在队列满时会卡死
    self
      .client
      .try_publish(topic, QoS::AtMostOnce, false, payload)?;
    Ok(())
  }
}

/// 触发主题上的消息负载，按到达顺序逐条产出
pub struct MqttTriggers {
  client: Client,
  connection: Connection,
  topic: String,
}

impl Iterator for MqttTriggers {
  type Item = Vec<u8>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      match self.connection.iter().next()? {
        Ok(Event::Incoming(Packet::Publish(publish))) => {
          if publish.topic == self.topic {
            debug!("收到触发消息，主题: {}", publish.topic);
            return Some(publish.payload.to_vec());
          }
          debug!("忽略非触发主题消息: {}", publish.topic);
        }
        Ok(Event::Incoming(Packet::ConnAck(_))) => {
          info!("MQTT 重新连接成功，重新订阅: {}", self.topic);
          if let Err(e) = self.client.try_subscribe(&self.topic, QoS::AtMostOnce) {
            error!("重新订阅失败: {}", e);
          }
        }
        Ok(Event::Outgoing(Outgoing::Disconnect)) => {
          info!("MQTT 连接已请求断开，停止监听");
          return None;
        }
        Ok(event) => debug!("MQTT 事件: {:?}", event),
        Err(e) => {
          error!("MQTT 连接错误: {}，稍后重试", e);
          std::thread::sleep(RECONNECT_PAUSE);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn topics_per_mode() {
    let oneshot = Topics::oneshot("object_detection/state");
    assert_eq!(oneshot.results, "object_detection/state");
    let service = Topics::service("object_detection/state");
    assert_eq!(service.results, "object_detection/state/results");
    assert_eq!(service.trigger, "object_detection/state/trigger");
  }

  #[test]
  fn trigger_with_camera_id() {
    assert_eq!(parse_trigger(br#"{"camera_id": "front"}"#).unwrap(), "front");
    assert_eq!(
      parse_trigger(br#"{"camera_id": "back", "extra": 1}"#).unwrap(),
      "back"
    );
  }

  #[test]
  fn trigger_without_camera_id_is_rejected() {
    assert!(matches!(
      parse_trigger(br#"{"camera": "front"}"#),
      Err(MessageDecodeError::MissingCameraId)
    ));
    assert!(matches!(
      parse_trigger(br#"{"camera_id": ""}"#),
      Err(MessageDecodeError::MissingCameraId)
    ));
    assert!(matches!(
      parse_trigger(br#"{"camera_id": null}"#),
      Err(MessageDecodeError::MissingCameraId)
    ));
  }

  #[test]
  fn malformed_trigger_is_a_json_error() {
    assert!(matches!(
      parse_trigger(b"camera_id=front"),
      Err(MessageDecodeError::Json(_))
    ));
  }

  #[test]
  fn non_object_trigger_is_rejected() {
    let payloads: [&[u8]; 4] = [br#"["front"]"#, br#""front""#, b"42", b"null"];
    for payload in payloads {
      assert!(matches!(
        parse_trigger(payload),
        Err(MessageDecodeError::NotAnObject)
      ));
    }
  }

  #[test]
  fn non_string_camera_id_is_missing() {
    assert!(matches!(
      parse_trigger(br#"{"camera_id": 7}"#),
      Err(MessageDecodeError::MissingCameraId)
    ));
  }

  #[test]
  fn path_like_camera_ids_are_rejected() {
    assert!(matches!(
      parse_trigger(br#"{"camera_id": "../etc/passwd"}"#),
      Err(MessageDecodeError::InvalidCameraId(_))
    ));
    assert!(matches!(
      parse_trigger(br#"{"camera_id": "a/b"}"#),
      Err(MessageDecodeError::InvalidCameraId(_))
    ));
  }
}
