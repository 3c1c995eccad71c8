// 该文件是 Tujian （图检） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;

/// Tujian 批量目标检测推理
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型配置文件路径 (/path/to/model_config.yaml)
  #[arg(long, value_name = "FILE")]
  pub cfg: PathBuf,

  /// 模型权重文件路径或 URL
  #[arg(long, value_name = "FILE")]
  pub wts: String,

  /// 日志与 JSON 输出目录
  #[arg(long, default_value = "/tmp/infer_simple", value_name = "DIR")]
  pub output_dir: PathBuf,

  /// 目录输入时按扩展名过滤图像文件
  #[arg(long, default_value = "jpg", value_name = "EXT")]
  pub image_ext: String,

  /// 单张图像或图像目录
  #[arg(value_name = "IM_OR_FOLDER")]
  pub im_or_folder: PathBuf,
}
