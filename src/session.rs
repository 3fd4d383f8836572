// 该文件是 Zhuiying （追影） 项目的一部分。
// src/session.rs - 主循环控制器
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

use anyhow::Result;
use tracing::{info, warn};

use crate::control::{Command, Control};
use crate::detector::Detector;
use crate::input::InputSource;
use crate::metrics::RateEstimator;
use crate::output::{OutputWriter, Visualizer, save_snapshot};
use crate::pipeline::TrackingPipeline;
use crate::tracker::{Track, Tracker};

/// 会话终态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
  /// 流结束、读取失败或用户按键退出
  Stopped,
  /// 外部中断（Ctrl-C）
  Interrupted,
}

/// 会话统计
#[derive(Debug)]
pub struct SessionSummary {
  /// 处理的帧数
  pub frames: u64,
  /// 保存的截图数
  pub snapshots: u64,
  /// 终态
  pub state: SessionState,
}

/// 跟踪会话（主循环控制器）
///
/// 单线程同步管线：逐帧阻塞地执行
/// 读取 → 检测 → 适配 → 跟踪 → 渲染 → 速率统计 → 写出 → 命令轮询。
/// 取消是协作式的，每次迭代只检查一次。
pub struct TrackingSession<D: Detector, T: Tracker> {
  pipeline: TrackingPipeline<D, T>,
  visualizer: Visualizer,
  rate: RateEstimator,
  /// 截图保存目录
  snapshot_dir: PathBuf,
  /// 最大处理帧数（0 表示无限制）
  max_frames: u64,
}

impl<D: Detector, T: Tracker> TrackingSession<D, T> {
  /// 创建会话
  pub fn new(detector: D, tracker: T) -> Self {
    Self {
      pipeline: TrackingPipeline::new(detector, tracker),
      visualizer: Visualizer::new(),
      rate: RateEstimator::new(),
      snapshot_dir: PathBuf::from("."),
      max_frames: 0,
    }
  }

  /// 设置最大处理帧数
  pub fn with_max_frames(mut self, max_frames: u64) -> Self {
    self.max_frames = max_frames;
    self
  }

  /// 设置截图保存目录
  pub fn with_snapshot_dir(mut self, directory: impl Into<PathBuf>) -> Self {
    self.snapshot_dir = directory.into();
    self
  }

  /// 运行主循环直到流结束、退出命令或中断
  ///
  /// 无论从哪条路径退出（含错误），输出写入器都会被关闭。
  pub fn run(
    &mut self,
    input: &mut dyn InputSource,
    mut writer: Option<&mut dyn OutputWriter>,
    control: &Control,
  ) -> Result<SessionSummary> {
    // 显式重借用，使借用在 run_loop 返回时结束
    let reborrowed = match writer {
      Some(ref mut w) => Some::<&mut dyn OutputWriter>(&mut **w),
      None => None,
    };
    let result = self.run_loop(input, reborrowed, control);

    // 所有退出路径统一释放输出资源
    if let Some(writer) = writer {
      if let Err(e) = writer.finish() {
        warn!("关闭输出时出错: {:#}", e);
      }
    }

    result
  }

  fn run_loop(
    &mut self,
    input: &mut dyn InputSource,
    mut writer: Option<&mut dyn OutputWriter>,
    control: &Control,
  ) -> Result<SessionSummary> {
    let mut frame_count = 0u64;
    let mut snapshots = 0u64;

    loop {
      if self.max_frames > 0 && frame_count >= self.max_frames {
        info!("已达到最大帧数限制: {}", self.max_frames);
        return Ok(self.summary(frame_count, snapshots, SessionState::Stopped));
      }

      // 读取失败与流结束同样处理：正常停止
      let frame = match input.next() {
        Some(Ok(frame)) => frame,
        Some(Err(e)) => {
          warn!("读取帧失败，按流结束处理: {:#}", e);
          return Ok(self.summary(frame_count, snapshots, SessionState::Stopped));
        }
        None => {
          info!("视频流结束");
          return Ok(self.summary(frame_count, snapshots, SessionState::Stopped));
        }
      };

      frame_count += 1;

      // 检测 → 适配 → 跟踪，每帧恰好一次
      let tracks: Vec<Track> = self.pipeline.process_frame(&frame.image)?.to_vec();
      let confirmed = tracks.iter().filter(|t| t.is_confirmed()).count();

      // 渲染到帧副本，原始帧不被任何组件保留
      let mut annotated = frame.image.clone();
      self
        .visualizer
        .draw_tracks(&mut annotated, &tracks, self.pipeline.detector());

      self.rate.tick();
      // 窗口累积期间不显示帧率
      let fps = self.rate.sample();
      if let Some(fps) = fps {
        info!("帧 {}: {:.1} fps, {} 个跟踪目标", frame.index, fps, confirmed);
      }
      self.visualizer.draw_overlay(&mut annotated, fps, confirmed);

      if let Some(writer) = writer.as_mut() {
        writer.write_frame(&annotated)?;
      }

      match control.try_poll() {
        Some(Command::Quit) => {
          info!("收到退出命令");
          return Ok(self.summary(frame_count, snapshots, SessionState::Stopped));
        }
        Some(Command::Interrupt) => {
          warn!("会话被中断");
          return Ok(self.summary(frame_count, snapshots, SessionState::Interrupted));
        }
        Some(Command::Snapshot) => {
          let path = save_snapshot(&annotated, &self.snapshot_dir, frame_count)?;
          snapshots += 1;
          info!("截图已保存: {}", path.display());
        }
        None => {}
      }
    }
  }

  fn summary(&self, frames: u64, snapshots: u64, state: SessionState) -> SessionSummary {
    SessionSummary {
      frames,
      snapshots,
      state,
    }
  }
}
