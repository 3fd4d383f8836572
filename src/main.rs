// 该文件是 Zhuiying （追影） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use zhuiying::control::Control;
use zhuiying::detector::{Detector, ReplayDetector};
use zhuiying::input::{InputSourceType, create_input_source};
use zhuiying::output::{OutputWriter, create_output_writer};
use zhuiying::session::{SessionState, SessionSummary, TrackingSession};
use zhuiying::tracker::{IouTracker, TrackerConfig};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("Zhuiying 目标检测与跟踪");
  info!("会话开始时间: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
  info!("输入来源: {}", args.input);
  info!("置信度阈值: {}", args.confidence);

  // 打开输入源；失败时在进入主循环前中止
  let mut input = create_input_source(&args.input)?;
  info!(
    "输入源已打开: {}x{} {}",
    input.width(),
    input.height(),
    match input.source_type() {
      InputSourceType::ImageSequence => "图片序列",
      InputSourceType::Video => "视频",
      InputSourceType::V4l2 => "V4L2 摄像头",
    }
  );

  let mut writer = match &args.output {
    Some(path) => {
      let writer = create_output_writer(path, input.width(), input.height(), input.fps())?;
      info!("输出已创建: {}", path);
      Some(writer)
    }
    None => None,
  };

  let control = Control::spawn()?;
  info!("输入 q 退出，输入 s 截图（回车确认）");

  let summary = if let Some(model) = &args.model {
    #[cfg(feature = "model_yolov8")]
    {
      info!("正在加载模型: {}", model);
      let detector =
        zhuiying::detector::Yolov8Detector::new(model, args.confidence, args.nms_threshold)?;
      run_session(
        detector,
        &args,
        input.as_mut(),
        match writer {
          Some(ref mut w) => Some::<&mut dyn OutputWriter>(&mut **w),
          None => None,
        },
        &control,
      )?
    }
    #[cfg(not(feature = "model_yolov8"))]
    anyhow::bail!("未启用 model_yolov8 特性，无法加载模型: {}", model)
  } else if let Some(detections) = &args.detections {
    info!("正在读取检测记录: {}", detections);
    let detector = ReplayDetector::from_file(detections, args.confidence)?;
    run_session(
      detector,
      &args,
      input.as_mut(),
      match writer {
        Some(ref mut w) => Some::<&mut dyn OutputWriter>(&mut **w),
        None => None,
      },
      &control,
    )?
  } else {
    anyhow::bail!("需要 --detections 或 --model 指定检测来源")
  };

  info!("处理完成!");
  info!("总帧数: {}", summary.frames);
  info!("截图数: {}", summary.snapshots);
  info!(
    "终态: {}",
    match summary.state {
      SessionState::Stopped => "正常停止",
      SessionState::Interrupted => "被中断",
    }
  );

  Ok(())
}

/// 用给定检测器组装并运行跟踪会话
fn run_session<D: Detector>(
  detector: D,
  args: &args::Args,
  input: &mut dyn zhuiying::input::InputSource,
  writer: Option<&mut dyn zhuiying::output::OutputWriter>,
  control: &Control,
) -> Result<SessionSummary> {
  let tracker = IouTracker::new(TrackerConfig {
    max_age: args.max_age,
    n_init: args.n_init,
    nms_max_overlap: args.nms_max_overlap,
    max_cosine_distance: args.max_cosine_distance,
  });

  let mut session = TrackingSession::new(detector, tracker)
    .with_max_frames(args.max_frames)
    .with_snapshot_dir(&args.snapshot_dir);

  session.run(input, writer, control)
}
