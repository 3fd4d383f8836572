// 该文件是 Zhuiying （追影） 项目的一部分。
// src/input/mod.rs - 输入源模块
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

mod image_sequence_source;
#[cfg(feature = "v4l2_input")]
mod v4l2_source;
#[cfg(feature = "video_file")]
mod video_source;

pub use image_sequence_source::ImageSequenceSource;
#[cfg(feature = "v4l2_input")]
pub use v4l2_source::V4l2Source;
#[cfg(feature = "video_file")]
pub use video_source::VideoSource;

use anyhow::Result;
use image::RgbImage;
use thiserror::Error;

/// 输入源层错误
#[derive(Error, Debug)]
pub enum InputError {
  #[error("未启用 v4l2_input 特性，无法打开摄像头: {0}")]
  V4l2FeatureDisabled(String),
  #[error("未启用 video_file 特性，无法打开视频文件: {0}")]
  VideoFeatureDisabled(String),
  #[error("目录中没有图片文件: {0}")]
  EmptyDirectory(String),
}

/// 帧数据
///
/// 一次迭代内由主循环独占持有，按引用传递给检测器、渲染器与写入器，
/// 迭代结束后不被任何组件保留。
pub struct Frame {
  /// RGB 图像数据
  pub image: RgbImage,
  /// 帧索引
  pub index: u64,
  /// 时间戳（毫秒）
  pub timestamp_ms: u64,
}

/// 输入源类型
pub enum InputSourceType {
  /// 图片序列目录
  ImageSequence,
  /// 视频文件
  Video,
  /// V4L2 摄像头
  V4l2,
}

/// 输入源 trait
///
/// 迭代产出有序帧；迭代返回 None 表示流结束，
/// 流中途的读取失败同样以结束处理。
pub trait InputSource: Iterator<Item = Result<Frame>> {
  /// 获取输入源类型
  fn source_type(&self) -> InputSourceType;

  /// 获取帧宽度
  fn width(&self) -> u32;

  /// 获取帧高度
  fn height(&self) -> u32;

  /// 获取帧率（如果适用）
  fn fps(&self) -> Option<f64>;
}

/// 从路径创建输入源
///
/// - `/dev/video*` 或 `v4l2://...`: V4L2 摄像头
/// - 目录: 图片序列
/// - 其余: 视频文件
pub fn create_input_source(source: &str) -> Result<Box<dyn InputSource>> {
  if source.starts_with("/dev/video") || source.starts_with("v4l2://") {
    #[cfg(feature = "v4l2_input")]
    {
      let device_path = source.trim_start_matches("v4l2://");
      return Ok(Box::new(V4l2Source::new(device_path)?));
    }
    #[cfg(not(feature = "v4l2_input"))]
    return Err(InputError::V4l2FeatureDisabled(source.to_string()).into());
  }

  if std::path::Path::new(source).is_dir() {
    return Ok(Box::new(ImageSequenceSource::new(source)?));
  }

  #[cfg(feature = "video_file")]
  {
    Ok(Box::new(VideoSource::new(source)?))
  }
  #[cfg(not(feature = "video_file"))]
  Err(InputError::VideoFeatureDisabled(source.to_string()).into())
}
