// 该文件是 Zhuiying （追影） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;

/// Zhuiying 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源（视频文件、图片序列目录或 V4L2 设备路径）
  /// 支持格式:
  /// - 视频: *.mp4, *.avi, *.mkv 等（需要 video_file 特性）
  /// - 图片序列: 目录路径
  /// - V4L2: /dev/video0 或 v4l2:///dev/video0（需要 v4l2_input 特性）
  #[arg(long, value_name = "SOURCE")]
  pub input: String,

  /// 输出路径（视频文件或目录，省略则不写出）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<String>,

  /// 检测记录回放文件（JSON，按帧排列的检测结果）
  #[arg(long, value_name = "FILE", conflicts_with = "model")]
  pub detections: Option<String>,

  /// YOLOv8 ONNX 模型文件路径（需要 model_yolov8 特性）
  #[arg(long, value_name = "FILE")]
  pub model: Option<String>,

  /// 检测置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 检测器 NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 无关联检测时保留轨迹的最大帧数
  #[arg(long, default_value = "30", value_name = "FRAMES")]
  pub max_age: u32,

  /// 确认轨迹所需的连续关联检测数
  #[arg(long, default_value = "3", value_name = "COUNT")]
  pub n_init: u32,

  /// 跟踪器输入非极大值抑制重叠阈值 (0.0 - 1.0)
  #[arg(long, default_value = "1.0", value_name = "THRESHOLD")]
  pub nms_max_overlap: f32,

  /// 外观匹配的最大余弦距离 (0.0 - 1.0)
  #[arg(long, default_value = "0.4", value_name = "THRESHOLD")]
  pub max_cosine_distance: f32,

  /// 最大处理帧数（0 表示无限制）
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_frames: u64,

  /// 截图保存目录
  #[arg(long, default_value = ".", value_name = "DIR")]
  pub snapshot_dir: String,
}
