// 该文件是 Zhuiying （追影） 项目的一部分。
// src/metrics.rs - 处理速率估计
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

use std::time::{Duration, Instant};

/// 滑动窗口帧率估计器
///
/// 每处理一帧调用一次 `tick`；`sample` 仅在一个完整窗口（1 秒）
/// 结束时返回该窗口内的帧率并重置计数，窗口累积期间返回 None。
pub struct RateEstimator {
  /// 窗口长度
  window: Duration,
  /// 窗口内帧计数
  count: u32,
  /// 窗口起始时刻
  window_start: Instant,
}

impl Default for RateEstimator {
  fn default() -> Self {
    Self::new()
  }
}

impl RateEstimator {
  /// 创建 1 秒窗口的估计器
  pub fn new() -> Self {
    Self::with_window(Duration::from_secs(1))
  }

  /// 创建指定窗口长度的估计器
  pub fn with_window(window: Duration) -> Self {
    Self {
      window,
      count: 0,
      window_start: Instant::now(),
    }
  }

  /// 记录一帧
  pub fn tick(&mut self) {
    self.count += 1;
  }

  /// 窗口结束时返回帧率并重置，否则返回 None
  pub fn sample(&mut self) -> Option<f32> {
    self.sample_at(Instant::now())
  }

  fn sample_at(&mut self, now: Instant) -> Option<f32> {
    let elapsed = now.saturating_duration_since(self.window_start);
    if elapsed < self.window {
      return None;
    }

    let fps = self.count as f32 / elapsed.as_secs_f32();
    self.count = 0;
    self.window_start = now;
    Some(fps)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reports_frame_count_over_closed_window() {
    let mut estimator = RateEstimator::new();
    let start = estimator.window_start;

    for _ in 0..25 {
      estimator.tick();
    }

    let fps = estimator
      .sample_at(start + Duration::from_secs(1))
      .expect("窗口结束时应有采样");
    assert!((fps - 25.0).abs() < 0.5);
  }

  #[test]
  fn accumulating_window_yields_none() {
    let mut estimator = RateEstimator::new();
    let start = estimator.window_start;

    estimator.tick();
    assert!(estimator.sample_at(start + Duration::from_millis(500)).is_none());
  }

  #[test]
  fn resets_after_reporting() {
    let mut estimator = RateEstimator::new();
    let start = estimator.window_start;

    for _ in 0..10 {
      estimator.tick();
    }
    estimator.sample_at(start + Duration::from_secs(1)).unwrap();

    // 计数已清零，新窗口内无 tick 时帧率为 0
    let fps = estimator
      .sample_at(start + Duration::from_secs(2))
      .unwrap();
    assert_eq!(fps, 0.0);
  }
}
