//! 交互命令
//!
//! 每一行输入按命令行参数解析

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "izus", no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 待完成的课程
    Lessons,
    /// 可以打开的课程（已有笔记本照片）
    Openable,
    /// 打开课程：在浏览器中打开填写页面并打开照片
    Open {
        /// 课程编号，省略时先列出可以打开的课程
        number: Option<usize>,
    },
    /// 学生列表
    Students,
    /// 为每位学生在云盘中创建文件夹
    Folders {
        /// 不再确认
        #[arg(long, short)]
        yes: bool,
    },
    /// 教师列表
    Teachers,
    /// 单个教师的课堂记录相似度
    Similarity {
        /// 教师编号，省略时先列出教师
        number: Option<usize>,
    },
    /// 所有教师的相似度排名
    Ranking,
    /// 检查登录信息
    Whoami,
    /// 切换登录用户
    Login,
    /// 删除登录信息
    Logout,
    /// 登录历史
    History,
    /// 退出程序
    #[command(alias = "exit")]
    Quit,
}

/// 解析一行输入，空行返回 `None`
pub fn parse_line(line: &str) -> Result<Option<Command>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    Line::try_parse_from(words).map(|line| Some(line.command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("lessons").unwrap(), Some(Command::Lessons));
        assert_eq!(parse_line("open 3").unwrap(), Some(Command::Open { number: Some(3) }));
        assert_eq!(parse_line("folders --yes").unwrap(), Some(Command::Folders { yes: true }));
        assert_eq!(parse_line("exit").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_parse_line_rejects_unknown() {
        assert!(parse_line("dance").is_err());
        assert!(parse_line("open tri").is_err());
    }
}
