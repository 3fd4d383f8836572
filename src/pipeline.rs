// 该文件是 Zhuiying （追影） 项目的一部分。
// src/pipeline.rs - 检测到跟踪的逐帧管线
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

use anyhow::Result;
use image::RgbImage;

use crate::detector::{Detection, Detector};
use crate::tracker::{Track, Tracker, TrackerDetection};

/// 将检测器输出的角点坐标转换为跟踪器期望的 `(x, y, w, h)` 形式
///
/// `w = x2 - x1`，`h = y2 - y1`，`(x, y) = (x1, y1)`，保持左上原点约定。
/// 纯转换，不做任何过滤或额外的非极大值抑制。
pub fn adapt_detections(detections: &[Detection]) -> Vec<TrackerDetection> {
  detections
    .iter()
    .map(|det| TrackerDetection {
      bbox: [det.x1, det.y1, det.x2 - det.x1, det.y2 - det.y1],
      confidence: det.confidence,
      class_id: det.class_id,
    })
    .collect()
}

/// 检测 + 跟踪管线
///
/// 将任意检测器与任意跟踪器组合成端到端的逐帧处理：
/// 检测 → 适配 → 跟踪更新，每帧恰好调用跟踪器一次。
pub struct TrackingPipeline<D: Detector, T: Tracker> {
  detector: D,
  tracker: T,
}

impl<D: Detector, T: Tracker> TrackingPipeline<D, T> {
  /// 组合检测器与跟踪器
  pub fn new(detector: D, tracker: T) -> Self {
    Self { detector, tracker }
  }

  /// 处理一帧，返回全部当前轨迹（含各种状态）
  pub fn process_frame(&mut self, image: &RgbImage) -> Result<&[Track]> {
    let detections = self.detector.detect(image)?;
    let adapted = adapt_detections(&detections);
    Ok(self.tracker.update(&adapted, image))
  }

  /// 底层检测器
  pub fn detector(&self) -> &D {
    &self.detector
  }

  /// 底层跟踪器
  pub fn tracker(&self) -> &T {
    &self.tracker
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detector::ReplayDetector;
  use crate::tracker::{IouTracker, TrackState, TrackerConfig};

  #[test]
  fn adapter_preserves_top_left_origin() {
    let detections = [Detection {
      x1: 12.0,
      y1: 8.0,
      x2: 52.0,
      y2: 68.0,
      confidence: 0.9,
      class_id: 2,
    }];

    let adapted = adapt_detections(&detections);
    assert_eq!(adapted.len(), 1);
    assert_eq!(adapted[0].bbox, [12.0, 8.0, 40.0, 60.0]);
    assert_eq!(adapted[0].confidence, 0.9);
    assert_eq!(adapted[0].class_id, 2);
  }

  #[test]
  fn adapter_yields_non_negative_extents() {
    let detections = [
      Detection {
        x1: 0.0,
        y1: 0.0,
        x2: 0.0,
        y2: 0.0,
        confidence: 0.5,
        class_id: 0,
      },
      Detection {
        x1: 3.5,
        y1: 7.25,
        x2: 10.0,
        y2: 7.25,
        confidence: 0.5,
        class_id: 1,
      },
    ];

    for adapted in adapt_detections(&detections) {
      assert!(adapted.bbox[2] >= 0.0);
      assert!(adapted.bbox[3] >= 0.0);
    }
  }

  #[test]
  fn pipeline_runs_detect_adapt_track_per_frame() {
    let detection = Detection {
      x1: 10.0,
      y1: 10.0,
      x2: 50.0,
      y2: 50.0,
      confidence: 0.9,
      class_id: 0,
    };
    let detector = ReplayDetector::from_frames(
      vec![
        vec![detection.clone()],
        vec![detection.clone()],
        vec![detection],
      ],
      0.5,
    );
    let tracker = IouTracker::new(TrackerConfig {
      n_init: 3,
      ..TrackerConfig::default()
    });
    let mut pipeline = TrackingPipeline::new(detector, tracker);
    let image = RgbImage::new(64, 64);

    assert_eq!(
      pipeline.process_frame(&image).unwrap()[0].state,
      TrackState::Tentative
    );
    assert_eq!(
      pipeline.process_frame(&image).unwrap()[0].state,
      TrackState::Tentative
    );
    assert_eq!(
      pipeline.process_frame(&image).unwrap()[0].state,
      TrackState::Confirmed
    );
  }
}
