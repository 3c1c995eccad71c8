// 该文件是 Tujian （图检） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tujian::config::ModelConfig;
use tujian::model::OnnxDetector;
use tujian::record::RecordWriter;
use tujian::source::ImageSource;
use tujian::task::{BatchTask, Task};
use tujian::weights;

fn main() -> Result<()> {
  let args = args::Args::parse();

  // 日志与 JSON 文件名取配置文件名首个 '.' 之前的部分
  let base = args
    .cfg
    .file_name()
    .and_then(|name| name.to_str())
    .and_then(|name| name.split('.').next())
    .filter(|stem| !stem.is_empty())
    .map(str::to_string)
    .context("无效的配置文件名")?;

  std::fs::create_dir_all(&args.output_dir)?;
  let log_path = args.output_dir.join(format!("{base}.log"));
  let log_file = File::create(&log_path)?;
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
    .with_writer(Arc::new(log_file))
    .with_ansi(false)
    .init();

  println!("Tujian 批量目标检测");
  println!("==================");
  println!("配置文件: {}", args.cfg.display());
  println!("权重路径: {}", args.wts);
  println!("输入路径: {}", args.im_or_folder.display());
  println!("输出目录: {}", args.output_dir.display());
  println!();

  println!("正在加载配置...");
  let config = ModelConfig::from_file(&args.cfg)?;
  info!(
    "配置加载完成: arch = {}, 类别数 = {}, 设备数 = {}",
    config.model.arch, config.model.num_classes, config.runtime.num_devices
  );

  println!("正在解析权重...");
  let weights_path = weights::resolve(&args.wts, &config.download_cache)?;

  println!("正在加载模型...");
  let detector = OnnxDetector::from_config(&config, &weights_path)?;
  println!("模型加载完成");

  let mut writer = RecordWriter::new(config.model.class_names.clone());

  println!();
  println!("开始处理...");
  let source = ImageSource::open(&args.im_or_folder, &args.image_ext)?;
  let json_path = args.output_dir.join(format!("{base}.json"));
  let task = BatchTask::new(json_path.display().to_string());
  let processed = task.run_task(source, detector, &mut writer)?;

  writer.write_json(&json_path)?;

  println!();
  println!("处理完成!");
  println!("已处理图像: {}", processed);
  println!("输出文件: {}", json_path.display());
  println!("日志文件: {}", log_path.display());

  Ok(())
}
