// 该文件是 Zhuiying （追影） 项目的一部分。
// src/detector/replay.rs - 检测结果回放检测器
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

use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;

use super::{COCO_CLASSES, ClassNames, Detection, Detector};

/// 回放检测器
///
/// 从 JSON 文件按帧回放预先记录的检测结果，文件内容为
/// `[[检测结果, ...], ...]`，外层数组按帧索引排列。
/// 回放结束后返回空检测集。用于无推理后端时的演示与确定性测试。
pub struct ReplayDetector {
  /// 按帧排列的检测结果
  frames: Vec<Vec<Detection>>,
  /// 当前帧游标
  cursor: usize,
  /// 置信度阈值
  confidence_threshold: f32,
}

impl ReplayDetector {
  /// 从 JSON 文件创建回放检测器
  pub fn from_file(path: impl AsRef<Path>, confidence_threshold: f32) -> Result<Self> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)
      .with_context(|| format!("无法读取检测记录文件: {}", path.display()))?;
    let frames: Vec<Vec<Detection>> = serde_json::from_str(&data)
      .with_context(|| format!("无法解析检测记录文件: {}", path.display()))?;

    Ok(Self::from_frames(frames, confidence_threshold))
  }

  /// 从内存中的检测序列创建回放检测器
  pub fn from_frames(frames: Vec<Vec<Detection>>, confidence_threshold: f32) -> Self {
    Self {
      frames,
      cursor: 0,
      confidence_threshold,
    }
  }

  /// 记录的帧数
  pub fn len(&self) -> usize {
    self.frames.len()
  }

  /// 是否没有任何记录
  pub fn is_empty(&self) -> bool {
    self.frames.is_empty()
  }
}

impl ClassNames for ReplayDetector {
  fn class_name(&self, class_id: usize) -> Option<&str> {
    COCO_CLASSES.get(class_id).copied()
  }
}

impl Detector for ReplayDetector {
  fn detect(&mut self, _image: &RgbImage) -> Result<Vec<Detection>> {
    let detections = match self.frames.get(self.cursor) {
      Some(frame) => frame
        .iter()
        .filter(|det| det.confidence >= self.confidence_threshold)
        .cloned()
        .collect(),
      None => Vec::new(),
    };

    self.cursor += 1;
    Ok(detections)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(confidence: f32) -> Detection {
    Detection {
      x1: 10.0,
      y1: 10.0,
      x2: 50.0,
      y2: 50.0,
      confidence,
      class_id: 0,
    }
  }

  #[test]
  fn replays_frames_in_order_then_empty() {
    let mut detector =
      ReplayDetector::from_frames(vec![vec![det(0.9)], vec![det(0.8), det(0.7)]], 0.5);
    let image = RgbImage::new(64, 64);

    assert_eq!(detector.detect(&image).unwrap().len(), 1);
    assert_eq!(detector.detect(&image).unwrap().len(), 2);
    assert!(detector.detect(&image).unwrap().is_empty());
  }

  #[test]
  fn applies_confidence_threshold() {
    let mut detector = ReplayDetector::from_frames(vec![vec![det(0.9), det(0.3)]], 0.5);
    let image = RgbImage::new(64, 64);

    let detections = detector.detect(&image).unwrap();
    assert_eq!(detections.len(), 1);
    assert!(detections[0].confidence >= 0.5);
  }

  #[test]
  fn resolves_coco_class_names() {
    let detector = ReplayDetector::from_frames(vec![], 0.5);
    assert_eq!(detector.class_name(0), Some("person"));
    assert_eq!(detector.class_name(2), Some("car"));
    assert_eq!(detector.class_name(300), None);
  }
}
