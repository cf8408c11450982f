//! 门户 HTML 解析器
//!
//! 每个解析器都是纯函数：HTML 字符串 → 结构化列表。
//! 选择器与门户当前的页面结构绑定；解析所依赖的元素不存在时返回
//! [`ParseError::FormatChanged`]，而不是静默返回空列表。
//! 单行数据不完整（例如日期无效）时跳过该行。

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::ParseError;
use crate::models::{Class, ClassStudent, Lesson, Record, Student, Teacher};
use crate::utils::{create_named, normalize_whitespace, parse_portal_date, sort_named};

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("hardcoded selector `{}`: {:?}", css, e))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

fn first_text(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector).next().map(text_of)
}

fn require<'a>(doc: &'a Html, page: &'static str, css: &str) -> Result<ElementRef<'a>, ParseError> {
    doc.select(&selector(css)).next().ok_or_else(|| ParseError::FormatChanged {
        page,
        selector: css.to_string(),
    })
}

fn class_option_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)([a-zá-ž ]+) \(([a-zá-ž0-9 ]+)\)").expect("hardcoded class regex"))
}

fn study_focus_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(.+\)").expect("hardcoded study focus regex"))
}

/// 解析学生列表（`/zaci/`），按姓名排序
pub fn parse_students(html: &str) -> Result<Vec<Student>, ParseError> {
    let doc = Html::parse_document(html);
    require(&doc, "students", "#zarazeni_zaci")?;

    let cells = selector("td.prijmeni, td.prijmeni + td");
    let mut students: Vec<Student> = doc
        .select(&selector("#zarazeni_zaci > table > tbody > tr"))
        .filter_map(|row| {
            let texts: Vec<String> = row.select(&cells).map(|td| text_of(td).trim().to_string()).collect();
            let last_name = texts.first()?.clone();
            let first_name = texts.get(1).cloned().unwrap_or_default();
            Some(Student::new(first_name, last_name))
        })
        .collect();

    students.sort_by(sort_named);
    Ok(students)
}

/// 解析首页中待完成的课程（`/`）
///
/// `date_override` 不为空时所有课程都使用该日期（开发模式下用今天的日期，
/// 以便与当天上传的照片匹配）。
pub fn parse_pending_lessons(html: &str, date_override: Option<NaiveDate>) -> Result<Vec<Lesson>, ParseError> {
    let doc = Html::parse_document(html);
    let table = require(&doc, "index", "table.tridni_kniha")?;

    let date_cell = selector("td.datum_vyuky");
    let name_cell = selector("td.prijmeni");
    let button = selector("td.zapsat button");
    let lessons = table
        .select(&selector("tr"))
        .skip(1)
        .filter_map(|row| {
            let date = match date_override {
                Some(date) => date,
                None => {
                    let raw = first_text(row, &date_cell).unwrap_or_default();
                    match parse_portal_date(&raw) {
                        Ok(date) => date,
                        Err(e) => {
                            debug!("跳过课程行: {}", e);
                            return None;
                        }
                    }
                }
            };

            // 去掉括号中的学习方向
            let whole_name = first_text(row, &name_cell).unwrap_or_default();
            let whole_name = study_focus_regex().replace(&whole_name, "");
            let name = create_named(whole_name.trim());

            let link = row
                .select(&button)
                .next()
                .and_then(|button| button.value().attr("href"))
                .unwrap_or_default()
                .to_string();

            Some((date, Student::new(name.first_name, name.last_name), link))
        })
        .enumerate()
        .map(|(index, (date, student, link))| Lesson {
            index,
            date,
            student,
            link,
            image: None,
        })
        .collect();

    Ok(lessons)
}

/// 解析教职工列表（`/zamestnanci/`），按姓名排序后重新编号
pub fn parse_teachers(html: &str) -> Result<Vec<Teacher>, ParseError> {
    let doc = Html::parse_document(html);
    require(&doc, "staff", "table#tabulka_zamestnancu")?;

    let id_input = selector(r#"td.prijmeni input[name="zamestnanci[]"]"#);
    let last_name_cell = selector("td.prijmeni");
    let first_name_cell = selector("td.prijmeni + td");
    let mut teachers: Vec<Teacher> = doc
        .select(&selector("table#tabulka_zamestnancu tbody tr"))
        .filter_map(|row| {
            let last_name = first_text(row, &last_name_cell)?.trim().to_string();
            let first_name = first_text(row, &first_name_cell).unwrap_or_default().trim().to_string();
            let id = row
                .select(&id_input)
                .next()
                .and_then(|input| input.value().attr("value"))
                .and_then(|v| v.trim().parse::<u64>().ok());
            match id {
                Some(id) => Some(Teacher::new(0, id, first_name, last_name)),
                None => {
                    debug!("跳过没有ID的教师: {} {}", last_name, first_name);
                    None
                }
            }
        })
        .collect();

    teachers.sort_by(sort_named);
    for (index, teacher) in teachers.iter_mut().enumerate() {
        teacher.index = index;
    }
    Ok(teachers)
}

/// 解析教师的班级列表（`/zamestnanci/dokumenty/`）
///
/// 选项的值为 `学生ID_班级ID`，文本为 `姓 名 (科目)`。
/// `max_classes` 限制读取的选项数量。
pub fn parse_classes(html: &str, max_classes: Option<usize>) -> Result<Vec<Class>, ParseError> {
    let doc = Html::parse_document(html);
    require(&doc, "staff documents", "select#zobrazit_tridni_knihu")?;

    let classes = doc
        .select(&selector(r#"select#zobrazit_tridni_knihu option:not([value=""])"#))
        .take(max_classes.unwrap_or(usize::MAX))
        .filter_map(|option| {
            let value = option.value().attr("value")?;
            let (student_id, class_id) = value.split_once('_')?;
            let text = text_of(option);
            let caps = class_option_regex().captures(&text)?;
            let name = create_named(caps[1].trim());

            Some(Class {
                id: class_id.trim().parse().ok()?,
                student: ClassStudent {
                    id: student_id.trim().parse().ok()?,
                    first_name: name.first_name,
                    last_name: name.last_name,
                },
                subject: caps[2].to_string(),
                records: None,
            })
        })
        .collect();

    Ok(classes)
}

/// 解析班级的课堂记录（`/zaci/dokumenty/tridni_kniha/`）
///
/// 只保留出勤（`I`）的行
pub fn parse_records(html: &str) -> Result<Vec<Record>, ParseError> {
    let doc = Html::parse_document(html);
    let table = require(&doc, "class log", "table.latka")?;

    let attendance_cell = selector("td.dochazka");
    let date_cell = selector("td.datum");
    let topic_cell = selector("td.probirana_latka");
    let records = table
        .select(&selector("tbody tr:not(.nevyplneno)"))
        .filter(|row| first_text(*row, &attendance_cell).map(|t| t.trim() == "I").unwrap_or(false))
        .filter_map(|row| {
            let raw = first_text(row, &date_cell).unwrap_or_default();
            let date = match parse_portal_date(&raw) {
                Ok(date) => date,
                Err(e) => {
                    debug!("跳过课堂记录: {}", e);
                    return None;
                }
            };
            let text = normalize_whitespace(first_text(row, &topic_cell).unwrap_or_default().trim());
            Some(Record { date, text })
        })
        .collect();

    Ok(records)
}
