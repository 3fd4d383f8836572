// 该文件是 Zhuiying （追影） 项目的一部分。
// tests/tracking_test.rs - 端到端跟踪测试
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

use std::sync::mpsc::Sender;

use anyhow::Result;
use image::RgbImage;

use zhuiying::control::{Command, Control};
use zhuiying::detector::{ClassNames, Detection, Detector, ReplayDetector};
use zhuiying::input::{Frame, InputSource, InputSourceType};
use zhuiying::output::OutputWriter;
use zhuiying::session::{SessionState, TrackingSession};
use zhuiying::tracker::{IouTracker, TrackerConfig};

/// 固定分辨率的空白帧流，可在产出指定帧时发送命令
struct SyntheticSource {
  total: u64,
  cursor: u64,
  width: u32,
  height: u32,
  send_on_frame: Option<(u64, Sender<Command>, Command)>,
}

impl SyntheticSource {
  fn new(total: u64) -> Self {
    Self {
      total,
      cursor: 0,
      width: 160,
      height: 120,
      send_on_frame: None,
    }
  }

  fn with_command_on_frame(mut self, frame: u64, tx: Sender<Command>, command: Command) -> Self {
    self.send_on_frame = Some((frame, tx, command));
    self
  }
}

impl Iterator for SyntheticSource {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.cursor >= self.total {
      return None;
    }

    let index = self.cursor;
    self.cursor += 1;

    if let Some((at, tx, command)) = &self.send_on_frame {
      if self.cursor == *at {
        tx.send(*command).unwrap();
      }
    }

    Some(Ok(Frame {
      image: RgbImage::new(self.width, self.height),
      index,
      timestamp_ms: 0,
    }))
  }
}

impl InputSource for SyntheticSource {
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

/// 只计数的输出写入器
#[derive(Default)]
struct CountingWriter {
  frames: u64,
  finished: bool,
}

impl OutputWriter for CountingWriter {
  fn write_frame(&mut self, _image: &RgbImage) -> Result<()> {
    self.frames += 1;
    Ok(())
  }

  fn finish(&mut self) -> Result<()> {
    self.finished = true;
    Ok(())
  }
}

/// 始终失败的检测后端
struct FailingDetector;

impl ClassNames for FailingDetector {
  fn class_name(&self, _class_id: usize) -> Option<&str> {
    None
  }
}

impl Detector for FailingDetector {
  fn detect(&mut self, _image: &RgbImage) -> Result<Vec<Detection>> {
    Err(anyhow::anyhow!("检测后端失效"))
  }
}

fn static_detection() -> Detection {
  Detection {
    x1: 10.0,
    y1: 10.0,
    x2: 50.0,
    y2: 50.0,
    confidence: 0.9,
    class_id: 0,
  }
}

fn replay_detector(frames: usize) -> ReplayDetector {
  ReplayDetector::from_frames(vec![vec![static_detection()]; frames], 0.5)
}

fn tracker(n_init: u32) -> IouTracker {
  IouTracker::new(TrackerConfig {
    n_init,
    ..TrackerConfig::default()
  })
}

#[test]
fn static_detection_confirms_at_third_frame_with_n_init_3() {
  use zhuiying::pipeline::TrackingPipeline;
  use zhuiying::tracker::TrackState;

  let mut pipeline = TrackingPipeline::new(replay_detector(3), tracker(3));
  let image = RgbImage::new(160, 120);

  // 第 1、2 帧仍为暂定，第 3 帧起确认
  for expected in [
    TrackState::Tentative,
    TrackState::Tentative,
    TrackState::Confirmed,
  ] {
    let tracks = pipeline.process_frame(&image).unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].state, expected);
  }
}

#[test]
fn session_stops_at_end_of_stream_and_closes_writer() {
  let mut source = SyntheticSource::new(3);
  let mut writer = CountingWriter::default();
  let (control, _tx) = Control::manual();

  let mut session = TrackingSession::new(replay_detector(3), tracker(3));
  let summary = session
    .run(&mut source, Some(&mut writer), &control)
    .unwrap();

  assert_eq!(summary.frames, 3);
  assert_eq!(summary.state, SessionState::Stopped);
  assert_eq!(writer.frames, 3);
  assert!(writer.finished);
}

#[test]
fn writer_is_closed_when_processing_fails() {
  let mut source = SyntheticSource::new(3);
  let mut writer = CountingWriter::default();
  let (control, _tx) = Control::manual();

  let mut session = TrackingSession::new(FailingDetector, tracker(3));
  let result = session.run(&mut source, Some(&mut writer), &control);

  // 错误路径同样关闭输出
  assert!(result.is_err());
  assert!(writer.finished);
}

#[test]
fn quit_command_stops_after_current_frame() {
  let mut source = SyntheticSource::new(100);
  let (control, tx) = Control::manual();
  tx.send(Command::Quit).unwrap();

  let mut session = TrackingSession::new(replay_detector(100), tracker(3));
  let summary = session.run(&mut source, None, &control).unwrap();

  assert_eq!(summary.frames, 1);
  assert_eq!(summary.state, SessionState::Stopped);
}

#[test]
fn interrupt_ends_with_interrupted_state() {
  let mut source = SyntheticSource::new(100);
  let mut writer = CountingWriter::default();
  let (control, tx) = Control::manual();
  tx.send(Command::Interrupt).unwrap();

  let mut session = TrackingSession::new(replay_detector(100), tracker(3));
  let summary = session
    .run(&mut source, Some(&mut writer), &control)
    .unwrap();

  assert_eq!(summary.state, SessionState::Interrupted);
  // 中断路径同样关闭输出
  assert!(writer.finished);
}

#[test]
fn snapshot_on_frame_seven_writes_named_file() {
  let directory = std::env::temp_dir().join(format!("zhuiying-e2e-{}", std::process::id()));
  std::fs::create_dir_all(&directory).unwrap();

  let (control, tx) = Control::manual();
  let mut source = SyntheticSource::new(10).with_command_on_frame(7, tx, Command::Snapshot);

  let mut session = TrackingSession::new(replay_detector(10), tracker(3))
    .with_snapshot_dir(&directory);
  let summary = session.run(&mut source, None, &control).unwrap();

  assert_eq!(summary.frames, 10);
  assert_eq!(summary.snapshots, 1);
  assert!(directory.join("screenshot_7.jpg").exists());

  std::fs::remove_dir_all(&directory).ok();
}

#[test]
fn max_frames_limits_session() {
  let mut source = SyntheticSource::new(100);
  let (control, _tx) = Control::manual();

  let mut session = TrackingSession::new(replay_detector(100), tracker(3)).with_max_frames(5);
  let summary = session.run(&mut source, None, &control).unwrap();

  assert_eq!(summary.frames, 5);
  assert_eq!(summary.state, SessionState::Stopped);
}

#[test]
fn track_identity_is_stable_across_session() {
  use zhuiying::pipeline::TrackingPipeline;

  // 目标缓慢移动，身份保持不变
  let frames: Vec<Vec<Detection>> = (0..10)
    .map(|i| {
      let offset = i as f32 * 2.0;
      vec![Detection {
        x1: 10.0 + offset,
        y1: 10.0,
        x2: 50.0 + offset,
        y2: 50.0,
        confidence: 0.9,
        class_id: 0,
      }]
    })
    .collect();

  let detector = ReplayDetector::from_frames(frames, 0.5);
  let mut pipeline = TrackingPipeline::new(detector, tracker(3));
  let image = RgbImage::new(160, 120);

  let mut ids = Vec::new();
  for _ in 0..10 {
    let tracks = pipeline.process_frame(&image).unwrap();
    ids.push(tracks[0].track_id);
  }

  assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
}
