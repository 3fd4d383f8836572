// 该文件是 Zhuiying （追影） 项目的一部分。
// src/control.rs - 协作式取消与按键命令
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

use std::io::BufRead;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

use anyhow::{Context, Result};
use tracing::info;

/// 主循环每次迭代轮询一次的命令
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
  /// 正常退出（按键 q）
  Quit,
  /// 保存当前已标注帧的截图（按键 s）
  Snapshot,
  /// 外部中断（Ctrl-C）
  Interrupt,
}

/// 命令通道
///
/// 标准输入读取线程把 `q` / `s` 映射为命令，Ctrl-C 处理器发送中断；
/// 主循环每帧非阻塞轮询一次，没有迭代中途的取消。
pub struct Control {
  rx: Receiver<Command>,
}

impl Control {
  /// 安装 Ctrl-C 处理器并启动按键读取线程
  pub fn spawn() -> Result<Self> {
    let (tx, rx) = channel();

    let interrupt_tx = tx.clone();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = interrupt_tx.send(Command::Interrupt);
    })
    .context("无法设置 Ctrl-C 处理器")?;

    thread::spawn(move || {
      let stdin = std::io::stdin();
      for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let command = match line.trim() {
          "q" => Some(Command::Quit),
          "s" => Some(Command::Snapshot),
          _ => None,
        };
        if let Some(command) = command {
          if tx.send(command).is_err() {
            break;
          }
        }
      }
    });

    Ok(Self { rx })
  }

  /// 从显式通道构造，用于脚本化驱动主循环
  pub fn manual() -> (Self, Sender<Command>) {
    let (tx, rx) = channel();
    (Self { rx }, tx)
  }

  /// 非阻塞地取出一条待处理命令
  pub fn try_poll(&self) -> Option<Command> {
    self.rx.try_recv().ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn manual_channel_delivers_commands_in_order() {
    let (control, tx) = Control::manual();
    tx.send(Command::Snapshot).unwrap();
    tx.send(Command::Quit).unwrap();

    assert_eq!(control.try_poll(), Some(Command::Snapshot));
    assert_eq!(control.try_poll(), Some(Command::Quit));
    assert_eq!(control.try_poll(), None);
  }
}
