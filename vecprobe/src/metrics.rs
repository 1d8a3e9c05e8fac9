//! Ranking-fidelity statistics between two result lists.
//!
//! Correlations return `None` when they are undefined (zero variance, too few
//! points). Callers must carry that through rather than substituting a number.

use std::collections::{HashMap, HashSet};

use crate::document::SearchHit;
use crate::error::{ProbeError, Result};

/// Minimum number of shared ids before a score correlation is computed.
pub const MIN_COMMON_IDS: usize = 3;

/// Fraction of ids shared by the first `k` entries of two rankings.
///
/// # Errors
///
/// Returns [`ProbeError::Config`] if `k` is zero or larger than either ranking.
pub fn top_k_overlap(plain: &[&str], encrypted: &[&str], k: usize) -> Result<f64> {
    let available = plain.len().min(encrypted.len());
    if k == 0 || k > available {
        return Err(ProbeError::Config(format!(
            "top_k ({k}) must be between 1 and the number of available results ({available})"
        )));
    }
    let plain_top: HashSet<&str> = plain[..k].iter().copied().collect();
    let encrypted_top: HashSet<&str> = encrypted[..k].iter().copied().collect();
    Ok(plain_top.intersection(&encrypted_top).count() as f64 / k as f64)
}

/// Rank agreement between the encrypted ordering and the plain ordering.
///
/// Walks the encrypted ids in order; each id is mapped to its position in the
/// plain list, or to `plain.len()` if absent. The result is the Spearman
/// correlation between encrypted positions `0..n` and those looked-up ranks.
pub fn rank_correlation(plain: &[&str], encrypted: &[&str]) -> Option<f64> {
    let plain_ranks: HashMap<&str, usize> =
        plain.iter().enumerate().map(|(rank, id)| (*id, rank)).collect();
    let positions: Vec<f64> = (0..encrypted.len()).map(|i| i as f64).collect();
    let looked_up: Vec<f64> = encrypted
        .iter()
        .map(|id| plain_ranks.get(id).copied().unwrap_or(plain.len()) as f64)
        .collect();
    spearman(&positions, &looked_up)
}

/// Pearson correlation of scores for ids present in both result lists.
///
/// Scores are paired by id, not by position. Requires at least
/// [`MIN_COMMON_IDS`] shared ids.
pub fn score_correlation(plain: &[SearchHit], encrypted: &[SearchHit]) -> Option<f64> {
    let encrypted_scores: HashMap<&str, f32> =
        encrypted.iter().map(|h| (h.id.as_str(), h.score)).collect();
    let mut seen = HashSet::new();
    let (xs, ys): (Vec<f64>, Vec<f64>) = plain
        .iter()
        .filter(|h| seen.insert(h.id.as_str()))
        .filter_map(|h| {
            encrypted_scores.get(h.id.as_str()).map(|e| (f64::from(h.score), f64::from(*e)))
        })
        .unzip();
    if xs.len() < MIN_COMMON_IDS {
        return None;
    }
    pearson(&xs, &ys)
}

/// Pearson product-moment correlation. `None` if lengths differ, fewer than
/// two points, or either series has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Spearman rank correlation: Pearson over average ranks (ties share the mean rank).
pub fn spearman(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() {
        return None;
    }
    pearson(&average_ranks(xs), &average_ranks(ys))
}

/// Rank values from 1, giving tied values the mean of the ranks they span.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Ranks start..end (0-based) become the mean of (start+1)..=end.
        let rank = (start + end + 1) as f64 / 2.0;
        for &index in &order[start..end] {
            ranks[index] = rank;
        }
        start = end;
    }
    ranks
}

/// Arithmetic mean over the defined values only. `None` if none are defined.
pub fn mean_defined<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) =
        values.into_iter().flatten().fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}
