use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::Named;

/// 班级中的学生
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassStudent {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
}

impl Named for ClassStudent {
    fn first_name(&self) -> &str {
        &self.first_name
    }

    fn last_name(&self) -> &str {
        &self.last_name
    }
}

/// 课堂记录（出勤的一节课）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: NaiveDate,
    pub text: String,
}

/// 班级（教师与一名学生的一门课）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: u64,
    pub student: ClassStudent,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<Record>>,
}

impl Class {
    pub fn records(&self) -> &[Record] {
        self.records.as_deref().unwrap_or_default()
    }
}

/// 教师统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// 课堂记录之间的平均相似度（0..1）
    pub similarity: Option<f64>,
    /// 课堂记录的平均长度（字符数）
    pub length: Option<f64>,
    pub similarity_percentile: Option<f64>,
    /// 越短越好
    pub length_percentile: Option<f64>,
    pub avg_percentile: Option<f64>,
}

impl Stats {
    /// 至少有一项指标可以计算
    pub fn is_valid(&self) -> bool {
        self.similarity.is_some() || self.length.is_some()
    }
}

/// 教师
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub index: usize,
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<Class>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
}

impl Teacher {
    pub fn new(index: usize, id: u64, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            index,
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            classes: None,
            stats: None,
        }
    }

    pub fn classes(&self) -> &[Class] {
        self.classes.as_deref().unwrap_or_default()
    }
}

impl Named for Teacher {
    fn first_name(&self) -> &str {
        &self.first_name
    }

    fn last_name(&self) -> &str {
        &self.last_name
    }
}
