// 该文件是 Tujian （图检） 项目的一部分。
// src/config.rs - 模型配置加载
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

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::model::COCO_CLASSES;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("配置文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置文件解析错误: {0}")]
  ParseError(#[from] serde_yaml::Error),
  #[error("配置无效: {0}")]
  Invalid(String),
}

/// 模型配置。
///
/// 从 YAML 配置文件加载，缺省字段回落到内置默认值。加载后经
/// `validate_and_infer` 校验并补全派生字段，此后视为不可变，
/// 显式传递给下游组件。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
  pub model: ModelSection,
  pub runtime: RuntimeSection,
  /// 远程权重的本地缓存目录
  pub download_cache: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSection {
  /// 网络结构名称，仅用于日志
  pub arch: String,
  pub input_width: u32,
  pub input_height: u32,
  /// 前景类别数，不含背景
  pub num_classes: usize,
  /// 类别名称表；提供时输出 JSON 的 classes 字段为名称而非编号
  pub class_names: Option<Vec<String>>,
  /// 使用内置 COCO 名称表
  pub use_coco_names: bool,
  /// ONNX 输入输出张量名称
  pub input_name: String,
  pub label_output: String,
  pub box_output: String,
  pub score_output: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
  /// 计算设备数量
  pub num_devices: u32,
  /// CUDA 设备编号（cuda 特性）
  pub device_id: i32,
  /// 推理引擎线程数
  pub intra_threads: usize,
}

impl Default for ModelConfig {
  fn default() -> Self {
    ModelConfig {
      model: ModelSection::default(),
      runtime: RuntimeSection::default(),
      download_cache: default_download_cache(),
    }
  }
}

impl Default for ModelSection {
  fn default() -> Self {
    ModelSection {
      arch: "generalized_rcnn".to_string(),
      input_width: 640,
      input_height: 640,
      num_classes: 80,
      class_names: None,
      use_coco_names: false,
      input_name: "images".to_string(),
      label_output: "labels".to_string(),
      box_output: "boxes".to_string(),
      score_output: "scores".to_string(),
    }
  }
}

impl Default for RuntimeSection {
  fn default() -> Self {
    RuntimeSection {
      num_devices: 1,
      device_id: 0,
      intra_threads: 4,
    }
  }
}

fn default_download_cache() -> PathBuf {
  std::env::temp_dir().join("tujian-download-cache")
}

impl ModelConfig {
  /// 从 YAML 文件加载配置并校验。
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let mut config: ModelConfig = serde_yaml::from_str(&text)?;
    config.validate_and_infer()?;
    Ok(config)
  }

  /// 校验配置并补全派生字段。
  pub fn validate_and_infer(&mut self) -> Result<(), ConfigError> {
    if self.model.input_width == 0 || self.model.input_height == 0 {
      return Err(ConfigError::Invalid(format!(
        "输入尺寸无效: {}x{}",
        self.model.input_width, self.model.input_height
      )));
    }
    if self.runtime.num_devices == 0 {
      return Err(ConfigError::Invalid(
        "num_devices 必须至少为 1".to_string(),
      ));
    }
    if self.runtime.intra_threads == 0 {
      return Err(ConfigError::Invalid(
        "intra_threads 必须至少为 1".to_string(),
      ));
    }

    if self.model.use_coco_names && self.model.class_names.is_none() {
      self.model.class_names = Some(COCO_CLASSES.iter().map(|s| s.to_string()).collect());
    }

    // 名称表的长度决定类别数
    if let Some(names) = &self.model.class_names {
      if names.is_empty() {
        return Err(ConfigError::Invalid("class_names 为空".to_string()));
      }
      if names.len() != self.model.num_classes {
        info!(
          "根据名称表推导类别数: {} -> {}",
          self.model.num_classes,
          names.len()
        );
        self.model.num_classes = names.len();
      }
    }
    if self.model.num_classes == 0 {
      return Err(ConfigError::Invalid("num_classes 必须至少为 1".to_string()));
    }

    Ok(())
  }
}
