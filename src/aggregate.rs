//! Aggregation helpers
//!
//! Ordered group-by, mean, sum-then-rank, (state, year) inner join and Pearson
//! correlation over typed record slices. Group order is always first-seen
//! order of the input so results are reproducible run to run.

use crate::dataset::{CropProductionRecord, TemperatureRecord};
use crate::table::Cell;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Group `rows` by `key`, keeping groups and their members in input order
pub fn group_by<'a, T, K, F>(rows: impl IntoIterator<Item = &'a T>, key: F) -> Vec<(K, Vec<&'a T>)>
where
    T: 'a,
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&'a T>)> = Vec::new();

    for row in rows {
        let k = key(row);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(row),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![row]));
            }
        }
    }

    groups
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Sum `value` per `key`, groups in first-seen order
pub fn sum_by<'a, T, K, F, V>(rows: impl IntoIterator<Item = &'a T>, key: F, value: V) -> Vec<(K, f64)>
where
    T: 'a,
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
    V: Fn(&T) -> f64,
{
    group_by(rows, key)
        .into_iter()
        .map(|(k, members)| {
            let total: f64 = members.into_iter().map(|row| value(row)).sum();
            (k, total)
        })
        .collect()
}

/// Highest `n` totals, descending. The sort is stable, so equal totals keep
/// their input order.
pub fn top_n<K>(mut totals: Vec<(K, f64)>, n: usize) -> Vec<(K, f64)> {
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    totals.truncate(n);
    totals
}

/// One crop-production row matched with the temperature of the same state and year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRow {
    pub state: String,
    pub year: i32,
    pub crop: String,
    pub production_tonnes: f64,
    pub avg_temp_c: f64,
}

/// Inner join on (state, year). Output follows the production rows' order.
pub fn join_production_temperature(
    production: &[&CropProductionRecord],
    temperature: &[&TemperatureRecord],
) -> Vec<JoinedRow> {
    let mut by_key: HashMap<(&str, i32), Vec<&TemperatureRecord>> = HashMap::new();
    for t in temperature {
        by_key.entry((t.state.as_str(), t.year)).or_default().push(t);
    }

    let mut joined = Vec::new();
    for p in production {
        if let Some(matches) = by_key.get(&(p.state.as_str(), p.year)) {
            for t in matches {
                joined.push(JoinedRow {
                    state: p.state.clone(),
                    year: p.year,
                    crop: p.crop.clone(),
                    production_tonnes: p.production_tonnes,
                    avg_temp_c: t.avg_temp_c,
                });
            }
        }
    }
    joined
}

/// Pearson coefficient, or `Undefined` when it cannot be computed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correlation {
    Defined(f64),
    Undefined,
}

impl Correlation {
    pub fn value(&self) -> Option<f64> {
        match self {
            Correlation::Defined(r) => Some(*r),
            Correlation::Undefined => None,
        }
    }

    pub fn to_cell(&self) -> Cell {
        match self {
            Correlation::Defined(r) => Cell::Float(*r),
            Correlation::Undefined => Cell::Undefined,
        }
    }
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Correlation::Defined(r) => write!(f, "{:.2}", r),
            Correlation::Undefined => write!(f, "{}", crate::table::UNDEFINED),
        }
    }
}

/// Needs at least two paired points and non-zero variance in both series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Correlation {
    if xs.len() != ys.len() || xs.len() < 2 {
        return Correlation::Undefined;
    }
    if is_constant(xs) || is_constant(ys) {
        return Correlation::Undefined;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return Correlation::Undefined;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    if r.is_finite() {
        Correlation::Defined(r.clamp(-1.0, 1.0))
    } else {
        Correlation::Undefined
    }
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crop(state: &str, year: i32, name: &str, tonnes: f64) -> CropProductionRecord {
        CropProductionRecord {
            state: state.to_string(),
            year,
            crop: name.to_string(),
            production_tonnes: tonnes,
        }
    }

    fn temp(state: &str, year: i32, c: f64) -> TemperatureRecord {
        TemperatureRecord {
            state: state.to_string(),
            year,
            avg_temp_c: c,
        }
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let rows = vec![("b", 1), ("a", 2), ("b", 3), ("c", 4), ("a", 5)];
        let groups = group_by(&rows, |r| r.0);
        let keys: Vec<&str> = groups.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(groups[0].1, vec![&("b", 1), &("b", 3)]);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(vec![1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(mean(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_sum_then_top_n_is_stable() {
        let rows = vec![
            crop("Punjab", 2020, "Wheat", 10.0),
            crop("Punjab", 2020, "Maize", 4.0),
            crop("Punjab", 2020, "Rice", 7.0),
            crop("Punjab", 2021, "Maize", 3.0),
            crop("Punjab", 2021, "Cotton", 7.0),
        ];
        let totals = sum_by(&rows, |r| r.crop.clone(), |r| r.production_tonnes);
        assert_eq!(totals[1], ("Maize".to_string(), 7.0));

        let ranked = top_n(totals, 3);
        let names: Vec<&str> = ranked.iter().map(|(k, _)| k.as_str()).collect();
        // Maize, Rice and Cotton tie at 7; input order decides
        assert_eq!(names, vec!["Wheat", "Maize", "Rice"]);
    }

    #[test]
    fn test_top_n_larger_than_input() {
        let ranked = top_n(vec![("a", 1.0), ("b", 2.0)], 5);
        assert_eq!(ranked, vec![("b", 2.0), ("a", 1.0)]);
        assert!(top_n(vec![("a", 1.0)], 0).is_empty());
    }

    #[test]
    fn test_inner_join_drops_unmatched_years() {
        let production = vec![
            crop("Karnataka", 2019, "Rice", 100.0),
            crop("Karnataka", 2020, "Rice", 110.0),
            crop("Kerala", 2020, "Rice", 50.0),
        ];
        let temperature = vec![temp("Karnataka", 2020, 24.5), temp("Kerala", 2021, 27.0)];

        let p: Vec<&CropProductionRecord> = production.iter().collect();
        let t: Vec<&TemperatureRecord> = temperature.iter().collect();
        let joined = join_production_temperature(&p, &t);

        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].state, "Karnataka");
        assert_eq!(joined[0].year, 2020);
        assert_eq!(joined[0].avg_temp_c, 24.5);
    }

    #[test]
    fn test_pearson_perfect() {
        let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((r.value().unwrap() - 1.0).abs() < 1e-12);
        let r = pearson(&[1.0, 2.0, 3.0], &[6.0, 4.0, 2.0]);
        assert!((r.value().unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_symmetric_and_bounded() {
        let xs = [3_200_000.0, 3_350_000.0, 3_100_000.0, 3_500_000.0];
        let ys = [24.1, 24.6, 23.9, 25.2];
        let a = pearson(&xs, &ys).value().unwrap();
        let b = pearson(&ys, &xs).value().unwrap();
        assert!((a - b).abs() < 1e-12);
        assert!((-1.0..=1.0).contains(&a));
    }

    #[test]
    fn test_pearson_undefined_cases() {
        assert_eq!(pearson(&[1.0], &[2.0]), Correlation::Undefined);
        assert_eq!(pearson(&[], &[]), Correlation::Undefined);
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), Correlation::Undefined);
        assert_eq!(pearson(&[0.1, 0.1], &[1.0, 2.0]), Correlation::Undefined);
        assert_eq!(pearson(&[1.0, 2.0], &[1.0]), Correlation::Undefined);
    }

    #[test]
    fn test_correlation_display() {
        assert_eq!(Correlation::Defined(0.8765).to_string(), "0.88");
        assert_eq!(Correlation::Defined(-1.0).to_string(), "-1.00");
        assert_eq!(Correlation::Undefined.to_string(), "undefined");
        assert!(Correlation::Undefined.to_cell().is_undefined());
    }
}
