//! 输入处理
//!
//! 解析终端输入的一行命令。走法格式为四个坐标：`from_row from_col to_row to_col`，
//! 也接受逗号分隔，如 `5,2 4,3`。

use thiserror::Error;

use protocol::Move;

/// 终端命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Move),
    /// 重新显示棋盘
    Board,
    /// 进入匹配
    Join,
    /// 离开当前对局
    Leave,
    /// 退出客户端
    Quit,
    Help,
}

/// 输入错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Empty input")]
    Empty,

    #[error("Expected 4 coordinates, got {0}")]
    WrongArity(usize),

    #[error("Not a number: {0}")]
    NotANumber(String),

    #[error("Coordinates must be within 0..=7")]
    OutOfRange,
}

/// 帮助文本
pub const HELP: &str = "Commands: <from_row> <from_col> <to_row> <to_col> | board | join | leave | quit | help";

/// 解析一行输入
pub fn parse_command(line: &str) -> Result<Command, InputError> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "" => return Err(InputError::Empty),
        "board" | "b" => return Ok(Command::Board),
        "join" => return Ok(Command::Join),
        "leave" => return Ok(Command::Leave),
        "quit" | "exit" | "q" => return Ok(Command::Quit),
        "help" | "h" | "?" => return Ok(Command::Help),
        _ => {}
    }

    let parts: Vec<&str> = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != 4 {
        return Err(InputError::WrongArity(parts.len()));
    }

    let mut coords = [0u8; 4];
    for (slot, part) in coords.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| InputError::NotANumber(part.to_string()))?;
    }

    Move::from_coords(coords[0], coords[1], coords[2], coords[3])
        .map(Command::Move)
        .ok_or(InputError::OutOfRange)
}
