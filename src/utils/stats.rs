//! 数值统计工具

use std::cmp::Ordering;

/// 平均值，空列表返回 `None`
pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// 比较两个可能缺失的值，缺失的值排在最前
pub fn cmp_optional(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
    }
}

/// 计算百分位排名
///
/// 只对有效值排名：第 `i` 名的百分位为 `i / (n - 1)`。
/// `descending` 为 `true` 时数值越小排名越高。
/// 有效值少于两个时无法排名，全部返回 `None`。
/// 相同的值保持原有顺序。
pub fn percentile_ranks(values: &[Option<f64>], descending: bool) -> Vec<Option<f64>> {
    let mut ranks = vec![None; values.len()];

    let mut valid: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|v| !v.is_nan()).map(|v| (i, v)))
        .collect();
    if valid.len() <= 1 {
        return ranks;
    }

    valid.sort_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    if descending {
        valid.reverse();
    }

    let last = (valid.len() - 1) as f64;
    for (rank, (i, _)) in valid.into_iter().enumerate() {
        ranks[i] = Some(rank as f64 / last);
    }
    ranks
}
