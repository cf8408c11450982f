//! 命令行交互
//!
//! 逐行读取标准输入，解析为命令并交给 `App` 执行。
//! 耗时的列表（教师排名、可打开的课程）可以按 Enter 取消：
//! 取消只是不再等待，后台任务仍会完成，结果被丢弃。

pub mod commands;
pub mod format;
pub mod table;

use std::future::Future;
use std::io::Write;
use std::sync::{Arc, OnceLock};

use futures::future::{BoxFuture, FutureExt};
use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use crate::error::{report_error, AppError, AppResult};
use crate::models::Credentials;
use crate::orchestrator::App;

pub use commands::{parse_line, Command};

/// 操作因输入无效而失败时重新执行，其他结果直接返回
pub async fn rerun_on_input_error<S, T, F>(state: &mut S, dev_mode: bool, mut op: F) -> AppResult<T>
where
    F: for<'a> FnMut(&'a mut S) -> BoxFuture<'a, AppResult<T>>,
{
    loop {
        match op(state).await {
            Err(e) if e.is_input_error() => report_error(&e, dev_mode),
            other => return other,
        }
    }
}

/// 解析从 1 开始的编号，返回从 0 开始的序号
pub fn parse_number(input: &str) -> AppResult<usize> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[1-9][0-9]*$").expect("hardcoded number regex"));
    let input = input.trim();
    if !re.is_match(input) {
        return Err(AppError::input(format!("'{}' 不是有效的编号", input)));
    }
    input
        .parse::<usize>()
        .map(|n| n - 1)
        .map_err(|_| AppError::input(format!("'{}' 不是有效的编号", input)))
}

/// 校验门户用户名
pub fn validate_username(input: &str) -> AppResult<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)^[._a-z0-9-]{4,50}$").expect("hardcoded username regex"));
    let input = input.trim();
    if !re.is_match(input) {
        return Err(AppError::input("用户名只能包含字母、数字和 . _ -，长度 4 到 50"));
    }
    Ok(input.to_string())
}

/// 在后台执行任务，同时等待输入一行；先完成的一方获胜
///
/// 输入一行时返回 `None`，后台任务继续运行，结果被丢弃。
/// 输入已关闭时只等待任务完成。
pub async fn race_with_line<R, T, F>(input: &mut Lines<R>, task: F) -> AppResult<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: Send + 'static,
    F: Future<Output = AppResult<T>> + Send + 'static,
{
    let mut handle = tokio::spawn(task);
    let line = async {
        match input.next_line().await {
            Ok(Some(_)) => {}
            _ => std::future::pending().await,
        }
    };
    tokio::select! {
        joined = &mut handle => {
            let result = joined.map_err(|e| AppError::Internal(format!("后台任务失败: {}", e)))?;
            result.map(Some)
        }
        _ = line => {
            info!("已取消");
            Ok(None)
        }
    }
}

/// 交互式命令行
pub struct Cli {
    app: Arc<App>,
    input: Lines<BufReader<Stdin>>,
}

impl Cli {
    pub fn new(app: Arc<App>) -> Self {
        Self {
            app,
            input: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// 运行交互循环，直到输入 quit 或标准输入关闭
    pub async fn run(mut self) -> AppResult<()> {
        info!("💡 输入 help 查看所有命令");
        loop {
            if self.app.is_lesson_changed() {
                info!("📷 有新的笔记本照片，输入 openable 查看");
            }

            let Some(line) = self.prompt("izus> ").await? else {
                break;
            };
            let command = match parse_line(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    let _ = e.print();
                    continue;
                }
            };
            if command == Command::Quit {
                break;
            }
            if let Err(e) = self.execute(command).await {
                report_error(&e, self.app.dev_mode());
            }
        }

        self.app.shutdown();
        info!("👋 再见");
        Ok(())
    }

    async fn execute(&mut self, command: Command) -> AppResult<()> {
        let dev_mode = self.app.dev_mode();
        match command {
            Command::Lessons => {
                let lessons = self.app.lessons().await?;
                if lessons.is_empty() {
                    info!("没有待完成的课程");
                } else {
                    print!("{}", format::format_lessons(&lessons));
                }
            }
            Command::Openable => {
                self.show_openable_lessons().await?;
            }
            Command::Open { number: Some(number) } => {
                let index = number
                    .checked_sub(1)
                    .ok_or_else(|| AppError::input("编号从 1 开始"))?;
                self.app.open_lesson(index).await?;
            }
            Command::Open { number: None } => {
                if !self.show_openable_lessons().await? {
                    return Ok(());
                }
                rerun_on_input_error(self, dev_mode, |cli| {
                    async move {
                        let index = cli.ask_number("要打开第几节课? ").await?;
                        cli.app.open_lesson(index).await.map(|_| ())
                    }
                    .boxed()
                })
                .await?;
            }
            Command::Students => {
                let students = self.app.students().await?;
                println!("{}", format::format_students(&students));
            }
            Command::Folders { yes } => {
                if !yes && !self.confirm("确定要为所有学生创建云盘文件夹吗?").await? {
                    return Ok(());
                }
                self.app.create_folders().await?;
            }
            Command::Teachers => {
                let teachers = self.app.teachers().await?;
                print!("{}", format::format_teachers(&teachers, false));
            }
            Command::Similarity { number } => {
                let teacher = match number {
                    Some(number) => {
                        let index = number
                            .checked_sub(1)
                            .ok_or_else(|| AppError::input("编号从 1 开始"))?;
                        self.app.teacher_similarity(index).await?
                    }
                    None => {
                        let teachers = self.app.teachers().await?;
                        print!("{}", format::format_teachers(&teachers, false));
                        rerun_on_input_error(self, dev_mode, |cli| {
                            async move {
                                let index = cli.ask_number("哪位教师? ").await?;
                                cli.app.teacher_similarity(index).await
                            }
                            .boxed()
                        })
                        .await?
                    }
                };
                info!("{}", format::format_teacher_stats(&teacher));
            }
            Command::Ranking => {
                info!("⏳ 正在统计所有教师，按 Enter 取消");
                let app = self.app.clone();
                if let Some(teachers) = self.race_with_enter(async move { app.teachers_with_similarity().await }).await? {
                    print!("{}", format::format_teachers(&teachers, true));
                }
            }
            Command::Whoami => {
                self.app.check_login().await?;
            }
            Command::Login => {
                let username = rerun_on_input_error(self, dev_mode, |cli| {
                    async move { validate_username(&cli.ask("用户名: ").await?) }.boxed()
                })
                .await?;
                let password = rerun_on_input_error(self, dev_mode, |cli| {
                    async move {
                        let password = cli.ask("密码: ").await?;
                        if password.is_empty() {
                            return Err(AppError::input("密码不能为空"));
                        }
                        Ok(password)
                    }
                    .boxed()
                })
                .await?;
                self.app.change_login(Credentials { username, password }).await?;
            }
            Command::Logout => {
                if self.confirm("确定要删除登录信息吗?").await? {
                    self.app.delete_login().await;
                }
            }
            Command::History => {
                let history = self.app.credentials_history().await;
                if history.is_empty() {
                    info!("没有登录历史");
                } else {
                    print!("{}", format::format_history(&history));
                }
            }
            Command::Quit => {}
        }
        Ok(())
    }

    /// 列出可以打开的课程（可按 Enter 取消），返回是否有课程
    async fn show_openable_lessons(&mut self) -> AppResult<bool> {
        let app = self.app.clone();
        let Some(lessons) = self.race_with_enter(async move { app.lessons_with_image().await }).await? else {
            return Ok(false);
        };
        if lessons.is_empty() {
            info!("没有可以打开的课程");
            return Ok(false);
        }
        print!("{}", format::format_lessons(&lessons));
        Ok(true)
    }

    async fn race_with_enter<T, F>(&mut self, task: F) -> AppResult<Option<T>>
    where
        T: Send + 'static,
        F: Future<Output = AppResult<T>> + Send + 'static,
    {
        race_with_line(&mut self.input, task).await
    }

    async fn prompt(&mut self, message: &str) -> AppResult<Option<String>> {
        print!("{}", message);
        std::io::stdout().flush()?;
        Ok(self.input.next_line().await?)
    }

    /// 读取一行，标准输入关闭时返回错误
    async fn ask(&mut self, message: &str) -> AppResult<String> {
        self.prompt(message)
            .await?
            .map(|line| line.trim().to_string())
            .ok_or_else(|| AppError::User("输入已关闭".to_string()))
    }

    async fn ask_number(&mut self, message: &str) -> AppResult<usize> {
        parse_number(&self.ask(message).await?)
    }

    async fn confirm(&mut self, message: &str) -> AppResult<bool> {
        let answer = self.ask(&format!("{} [y/N] ", message)).await?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes" | "a" | "ano"))
    }
}
