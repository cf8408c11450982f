//! 命令结果的展示格式

use chrono::{Local, NaiveDate};

use crate::cli::table::{Align, SortDir, Table};
use crate::models::{CredentialsHistoryEntry, Lesson, Student, Teacher};
use crate::utils::get_name;

/// 百分比，缺失时为 "-"
pub fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.1} %", v * 100.0),
        _ => "-".to_string(),
    }
}

/// 一位小数，缺失时为 "-"
pub fn number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.1}", v),
        _ => "-".to_string(),
    }
}

pub fn date(date: NaiveDate) -> String {
    date.format("%-d. %-m. %Y").to_string()
}

pub fn format_lessons(lessons: &[Lesson]) -> Table {
    let mut table = Table::new(&["#", "日期", "学生", "照片"])
        .align(0, Align::Right)
        .sorted_by(1, SortDir::Asc);
    for lesson in lessons {
        table.push(vec![
            (lesson.index + 1).to_string(),
            date(lesson.date),
            get_name(&lesson.student),
            if lesson.is_openable() { "✓" } else { "" }.to_string(),
        ]);
    }
    table
}

pub fn format_students(students: &[Student]) -> String {
    students.iter().map(get_name).collect::<Vec<_>>().join("\n")
}

/// 教师列表；带统计时按平均百分位降序
pub fn format_teachers(teachers: &[Teacher], with_stats: bool) -> Table {
    if !with_stats {
        let mut table = Table::new(&["#", "教师"]).align(0, Align::Right).sorted_by(1, SortDir::Asc);
        for teacher in teachers {
            table.push(vec![(teacher.index + 1).to_string(), get_name(teacher)]);
        }
        return table;
    }

    let mut table = Table::new(&["#", "教师", "相似度", "平均长度", "相似度百分位", "长度百分位", "平均百分位"])
        .align(0, Align::Right)
        .align(2, Align::Right)
        .align(3, Align::Right)
        .align(4, Align::Right)
        .align(5, Align::Right)
        .align(6, Align::Right)
        .sorted_by(6, SortDir::Desc);
    for teacher in teachers {
        let stats = teacher.stats.clone().unwrap_or_default();
        table.push(vec![
            (teacher.index + 1).to_string(),
            get_name(teacher),
            percent(stats.similarity),
            number(stats.length),
            percent(stats.similarity_percentile),
            percent(stats.length_percentile),
            percent(stats.avg_percentile),
        ]);
    }
    table
}

pub fn format_teacher_stats(teacher: &Teacher) -> String {
    let stats = teacher.stats.clone().unwrap_or_default();
    format!(
        "{} - 相似度 {}，平均长度 {}（{} 个班级）",
        get_name(teacher),
        percent(stats.similarity),
        number(stats.length),
        teacher.classes().len()
    )
}

/// 登录历史，调用方按最近登录时间排好序
pub fn format_history(entries: &[CredentialsHistoryEntry]) -> Table {
    let mut table = Table::new(&["用户", "姓名", "学校", "角色", "最近登录"]).sorted_by(4, SortDir::Desc);
    for entry in entries {
        table.push(vec![
            entry.whoami.user.clone(),
            entry.whoami.user_name.clone(),
            entry.whoami.school.display_name().to_string(),
            entry.whoami.role_name.clone(),
            entry.last_login.with_timezone(&Local).format("%-d. %-m. %Y %H:%M").to_string(),
        ]);
    }
    table
}
