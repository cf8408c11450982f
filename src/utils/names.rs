//! 人名工具
//!
//! 门户中的人名统一以"姓 名"的形式显示和比较

use std::cmp::Ordering;

/// 带有姓名的实体（学生、教师等）
pub trait Named {
    fn first_name(&self) -> &str;
    fn last_name(&self) -> &str;
}

/// 简单的人名
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PersonName {
    pub first_name: String,
    pub last_name: String,
}

impl Named for PersonName {
    fn first_name(&self) -> &str {
        &self.first_name
    }

    fn last_name(&self) -> &str {
        &self.last_name
    }
}

/// 获取全名（"姓 名"）
pub fn get_name(named: &impl Named) -> String {
    format!("{} {}", named.last_name(), named.first_name())
}

/// 从"姓 名"形式的全名创建人名
///
/// 只取前两个以空格分隔的部分，缺失的部分为空字符串
pub fn create_named(whole_name: &str) -> PersonName {
    let mut parts = whole_name.split(' ');
    let last_name = parts.next().unwrap_or_default().to_string();
    let first_name = parts.next().unwrap_or_default().to_string();
    PersonName {
        first_name,
        last_name,
    }
}

/// 按姓、再按名排序
pub fn sort_named(a: &impl Named, b: &impl Named) -> Ordering {
    locale_cmp(a.last_name(), b.last_name()).then_with(|| locale_cmp(a.first_name(), b.first_name()))
}

/// 区分重音的字符串比较
///
/// 先忽略大小写和重音比较，相同时重音字母排在后面，最后小写排在大写前面
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let primary = |s: &str| -> String { s.chars().flat_map(char::to_lowercase).map(fold_accent).collect() };
    primary(a)
        .cmp(&primary(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'ä' | 'à' | 'â' => 'a',
        'č' | 'ç' => 'c',
        'ď' => 'd',
        'é' | 'ě' | 'ë' | 'è' => 'e',
        'í' | 'ï' => 'i',
        'ĺ' | 'ľ' => 'l',
        'ň' => 'n',
        'ó' | 'ô' | 'ö' => 'o',
        'ŕ' | 'ř' => 'r',
        'š' => 's',
        'ť' => 't',
        'ú' | 'ů' | 'ü' => 'u',
        'ý' => 'y',
        'ž' => 'z',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(first: &str, last: &str) -> PersonName {
        PersonName {
            first_name: first.to_string(),
            last_name: last.to_string(),
        }
    }

    #[test]
    fn test_get_name() {
        assert_eq!(get_name(&named("Jan", "Novák")), "Novák Jan");
    }

    #[test]
    fn test_create_named() {
        assert_eq!(create_named("Novák Jan"), named("Jan", "Novák"));
        // 第三部分被忽略
        assert_eq!(create_named("Nováková Jana Marie"), named("Jana", "Nováková"));
        assert_eq!(create_named("Novák"), named("", "Novák"));
    }

    #[test]
    fn test_sort_named() {
        let mut people = vec![
            named("Petr", "Svoboda"),
            named("Jan", "Novák"),
            named("Adam", "Novák"),
            named("Eva", "Čermáková"),
            named("Iva", "Dvořák"),
        ];
        people.sort_by(sort_named);
        let names: Vec<String> = people.iter().map(get_name).collect();
        assert_eq!(
            names,
            vec!["Čermáková Eva", "Dvořák Iva", "Novák Adam", "Novák Jan", "Svoboda Petr"]
        );
    }

    #[test]
    fn test_locale_cmp_accents_after_plain() {
        assert_eq!(locale_cmp("Nováka", "Novakb"), Ordering::Less);
        assert_eq!(locale_cmp("Novak", "Novák"), Ordering::Less);
        assert_eq!(locale_cmp("novák", "Novák"), Ordering::Less);
        assert_eq!(locale_cmp("Novák", "Novák"), Ordering::Equal);
    }
}
