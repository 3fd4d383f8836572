// 该文件是 Zhuiying （追影） 项目的一部分。
// src/input/image_sequence_source.rs - 图片序列输入源
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

use std::path::PathBuf;

use anyhow::{Context, Result};
use image::ImageReader;

use super::{Frame, InputError, InputSource, InputSourceType};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

/// 图片序列输入源
///
/// 将一个目录下按文件名排序的图片作为有序帧流。
pub struct ImageSequenceSource {
  /// 排序后的图片路径
  paths: Vec<PathBuf>,
  /// 下一帧游标
  cursor: usize,
  /// 帧宽度（以首帧为准）
  width: u32,
  /// 帧高度（以首帧为准）
  height: u32,
}

impl ImageSequenceSource {
  /// 扫描目录并创建图片序列输入源
  pub fn new(directory: &str) -> Result<Self> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(directory)
      .with_context(|| format!("无法读取目录: {}", directory))?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|path| {
        path
          .extension()
          .and_then(|ext| ext.to_str())
          .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
          .unwrap_or(false)
      })
      .collect();
    paths.sort();

    if paths.is_empty() {
      return Err(InputError::EmptyDirectory(directory.to_string()).into());
    }

    // 以首帧探测分辨率
    let first = ImageReader::open(&paths[0])
      .with_context(|| format!("无法打开图片文件: {}", paths[0].display()))?
      .decode()
      .with_context(|| format!("无法解码图片文件: {}", paths[0].display()))?;

    Ok(Self {
      width: first.width(),
      height: first.height(),
      paths,
      cursor: 0,
    })
  }

  fn read_frame(&self, index: usize) -> Result<Frame> {
    let path = &self.paths[index];
    let image = ImageReader::open(path)
      .with_context(|| format!("无法打开图片文件: {}", path.display()))?
      .decode()
      .with_context(|| format!("无法解码图片文件: {}", path.display()))?
      .to_rgb8();

    Ok(Frame {
      image,
      index: index as u64,
      timestamp_ms: 0,
    })
  }
}

impl Iterator for ImageSequenceSource {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.cursor >= self.paths.len() {
      return None;
    }

    let frame = self.read_frame(self.cursor);
    self.cursor += 1;
    Some(frame)
  }
}

impl InputSource for ImageSequenceSource {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::ImageSequence
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  fn fps(&self) -> Option<f64> {
    None
  }
}
