// The aggregation pipeline.
//
// Pure functions from clean records to derived summaries. No I/O, no state:
// calling any of these twice on the same input yields identical output.
// Grouped outputs are Vec-backed and keep first-seen key order, so nothing
// here depends on hash-map iteration order.
use crate::loader::UNSPECIFIED_LABEL;
use crate::types::{
    Contract, ContractSummary, ModalityCount, MonthlyPlanPoint, PeriodWindow, PlanItem,
    PlanSummary, ProcurementCategory, RawExecutionPoint, SeriesPoint, SupplierValue, Totals,
};
use crate::util::{average, month_label, year_month_key, MONTH_LABELS};
use chrono::{Datelike, NaiveDate};
use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;

// The demo panel carries no execution feed, so the plan summary keeps the
// simulated KPI assumptions of the original fixture.
const SIMULATED_EXECUTION_RATE: f64 = 0.72;
const SAVINGS_ASSUMPTION: f64 = 0.07;

fn bucket_key(key: Option<String>) -> String {
    match key {
        Some(k) if !k.trim().is_empty() => k.trim().to_string(),
        _ => UNSPECIFIED_LABEL.to_string(),
    }
}

/// Generic grouping primitive: sum `value_fn` per `key_fn` bucket.
///
/// Absent or blank keys land in the reserved unspecified bucket instead of
/// being dropped. The output preserves the first-seen order of keys.
pub fn group_by_key<T>(
    records: &[T],
    key_fn: impl Fn(&T) -> Option<String>,
    value_fn: impl Fn(&T) -> f64,
) -> Vec<(String, f64)> {
    let mut groups: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for r in records {
        let key = bucket_key(key_fn(r));
        let value = value_fn(r);
        match index.get(&key) {
            Some(&i) => groups[i].1 += value,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, value));
            }
        }
    }
    groups
}

/// Overall sum plus a per-category split of the same value field.
pub fn compute_totals<T>(
    records: &[T],
    value_fn: impl Fn(&T) -> f64,
    category_fn: impl Fn(&T) -> Option<String>,
) -> Totals {
    let total = records.iter().map(&value_fn).sum();
    let by_category = group_by_key(records, category_fn, value_fn);
    Totals { total, by_category }
}

/// Group, sum, sort descending by summed value, keep the first `n`.
///
/// The sort is stable, so ties keep the first-occurrence order of the key.
pub fn top_n<T>(
    records: &[T],
    key_fn: impl Fn(&T) -> Option<String>,
    value_fn: impl Fn(&T) -> f64,
    n: usize,
) -> Vec<(String, f64)> {
    let mut grouped = group_by_key(records, key_fn, value_fn);
    grouped.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    grouped.truncate(n);
    grouped
}

/// Sparse calendar-month series: bucket by `YYYY-MM`, drop records whose
/// year falls outside the window, emit ascending. Months with no records
/// are simply absent.
pub fn time_series<T>(
    records: &[T],
    date_fn: impl Fn(&T) -> Option<NaiveDate>,
    value_fn: impl Fn(&T) -> f64,
    window: PeriodWindow,
) -> Vec<SeriesPoint> {
    let mut buckets: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for r in records {
        let Some(date) = date_fn(r) else { continue };
        if !window.contains(date.year()) {
            continue;
        }
        let key = year_month_key(date);
        let value = value_fn(r);
        match index.get(&key) {
            Some(&i) => buckets[i].1 += value,
            None => {
                index.insert(key.clone(), buckets.len());
                buckets.push((key, value));
            }
        }
    }
    buckets.sort_by(|a, b| a.0.cmp(&b.0));
    buckets
        .into_iter()
        .map(|(period, value)| SeriesPoint { period, value })
        .collect()
}

/// Fixed twelve-month axis for the plan variant: every month of the year
/// appears, zero-filled, split into competitive vs. direct value.
pub fn monthly_fixed_axis(items: &[PlanItem]) -> Vec<MonthlyPlanPoint> {
    (1..=12)
        .map(|m| {
            let sum_for = |cat: ProcurementCategory| {
                items
                    .iter()
                    .filter(|it| it.month == m && it.category == cat)
                    .map(|it| it.estimated)
                    .sum()
            };
            MonthlyPlanPoint {
                month: month_label(m).to_string(),
                competitive: sum_for(ProcurementCategory::Competitive),
                direct: sum_for(ProcurementCategory::Direct),
            }
        })
        .collect()
}

/// The `n` most recent records by `date_fn`, descending. Records without a
/// date are treated as earliest possible and sink to the back; ties keep
/// input order.
pub fn recent<T: Clone>(
    records: &[T],
    date_fn: impl Fn(&T) -> Option<NaiveDate>,
    n: usize,
) -> Vec<T> {
    let mut sorted: Vec<&T> = records.iter().collect();
    sorted.sort_by_key(|&r| Reverse(date_fn(r).unwrap_or(NaiveDate::MIN)));
    sorted.into_iter().take(n).cloned().collect()
}

/// Case-insensitive substring search across the fields the panel's search
/// box covers.
pub fn filter_plan_items(items: &[PlanItem], query: &str) -> Vec<PlanItem> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|it| {
            let haystack = format!(
                "{} {} {} {}",
                it.object, it.sub_unit, it.modality, it.status
            )
            .to_lowercase();
            haystack.contains(&q)
        })
        .cloned()
        .collect()
}

/// Cumulative execution series over the fixed month axis: the curve only
/// ever rises, and months past the end of the feed hold the last value.
pub fn execution_series(curve: &[RawExecutionPoint]) -> Vec<SeriesPoint> {
    let mut pct = 0.0f64;
    MONTH_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            if let Some(point) = curve.get(i) {
                let combined = point.licitado.unwrap_or(0.0) + point.direto.unwrap_or(0.0);
                pct = pct.max((combined * 100.0).round() / 100.0);
            }
            SeriesPoint {
                period: (*label).to_string(),
                value: pct,
            }
        })
        .collect()
}

pub fn plan_summary(items: &[PlanItem]) -> PlanSummary {
    let totals = compute_totals(
        items,
        |it| it.estimated,
        |it| Some(it.category.to_string()),
    );
    let value_for = |cat: ProcurementCategory| {
        items
            .iter()
            .filter(|it| it.category == cat)
            .map(|it| it.estimated)
            .sum()
    };
    PlanSummary {
        total_estimated: totals.total,
        competitive_value: value_for(ProcurementCategory::Competitive),
        direct_value: value_for(ProcurementCategory::Direct),
        execution_rate: SIMULATED_EXECUTION_RATE,
        estimated_savings: totals.total * SAVINGS_ASSUMPTION,
        by_modality: group_by_key(items, |it| Some(it.modality.clone()), |it| it.estimated),
        monthly: monthly_fixed_axis(items),
    }
}

pub fn contract_summary(contracts: &[Contract], window: PeriodWindow) -> ContractSummary {
    let total_value: f64 = contracts.iter().map(|c| c.global_value).sum();
    let largest_value = contracts
        .iter()
        .map(|c| c.global_value)
        .fold(0.0f64, f64::max);
    let values: Vec<f64> = contracts.iter().map(|c| c.global_value).collect();
    let top_suppliers = top_n(
        contracts,
        |c| Some(c.supplier.clone()),
        |c| c.global_value,
        8,
    )
    .into_iter()
    .map(|(name, value)| SupplierValue { name, value })
    .collect();
    let modality_counts = group_by_key(contracts, |c| Some(c.modality.clone()), |_| 1.0)
        .into_iter()
        .map(|(name, count)| ModalityCount {
            name,
            count: count as u64,
        })
        .collect();
    ContractSummary {
        count: contracts.len(),
        total_value,
        largest_value,
        mean_value: average(&values),
        top_suppliers,
        modality_counts,
        monthly_series: time_series(
            contracts,
            |c| c.validity_start,
            |c| c.global_value,
            window,
        ),
        recent: recent(contracts, |c| c.validity_start, 12),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(modality: &str, category: ProcurementCategory, estimated: f64, month: u32) -> PlanItem {
        PlanItem {
            id: 0,
            sub_unit: "PROPLAD".to_string(),
            object: "Objeto".to_string(),
            modality: modality.to_string(),
            category,
            estimated,
            stage: "ETP".to_string(),
            month,
            status: "Em planejamento".to_string(),
        }
    }

    fn contract(supplier: &str, value: f64, start: Option<&str>) -> Contract {
        Contract {
            number: "1/2024".to_string(),
            supplier: supplier.to_string(),
            object: "Objeto".to_string(),
            modality: "Pregão".to_string(),
            global_value: value,
            validity_start: start
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
            validity_end: None,
        }
    }

    #[test]
    fn totals_on_empty_input_are_zero() {
        let totals = compute_totals(&[] as &[PlanItem], |it| it.estimated, |_| None);
        assert_eq!(totals.total, 0.0);
        assert!(totals.by_category.is_empty());
    }

    #[test]
    fn total_covers_every_category_subtotal() {
        let items = vec![
            item("Pregão", ProcurementCategory::Competitive, 100.0, 1),
            item("Dispensa", ProcurementCategory::Direct, 40.0, 2),
            item("Pregão", ProcurementCategory::Unspecified, 10.0, 3),
        ];
        let totals = compute_totals(
            &items,
            |it| it.estimated,
            |it| Some(it.category.to_string()),
        );
        assert_eq!(totals.total, 150.0);
        for (_, subtotal) in &totals.by_category {
            assert!(totals.total >= *subtotal);
        }
    }

    #[test]
    fn single_key_grouping_collapses_to_total() {
        let items = vec![
            item("Pregão", ProcurementCategory::Competitive, 100.0, 1),
            item("Pregão", ProcurementCategory::Competitive, 250.0, 2),
        ];
        let groups = group_by_key(&items, |it| Some(it.modality.clone()), |it| it.estimated);
        assert_eq!(groups, vec![("Pregão".to_string(), 350.0)]);
    }

    #[test]
    fn blank_keys_fall_into_unspecified_bucket() {
        let items = vec![
            item("Pregão", ProcurementCategory::Competitive, 100.0, 1),
            item("  ", ProcurementCategory::Direct, 50.0, 2),
        ];
        let groups = group_by_key(&items, |it| Some(it.modality.clone()), |it| it.estimated);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1], (UNSPECIFIED_LABEL.to_string(), 50.0));
        let sum: f64 = groups.iter().map(|(_, v)| v).sum();
        assert_eq!(sum, 150.0);
    }

    #[test]
    fn top_n_sorts_descending_and_truncates() {
        let contracts = vec![
            contract("Alfa", 10.0, None),
            contract("Beta", 30.0, None),
            contract("Gama", 20.0, None),
            contract("Beta", 5.0, None),
        ];
        let top = top_n(&contracts, |c| Some(c.supplier.clone()), |c| c.global_value, 2);
        assert_eq!(
            top,
            vec![("Beta".to_string(), 35.0), ("Gama".to_string(), 20.0)]
        );
    }

    #[test]
    fn top_n_ties_keep_first_seen_order() {
        let contracts = vec![
            contract("Zeta", 20.0, None),
            contract("Alfa", 20.0, None),
            contract("Omega", 20.0, None),
        ];
        let top = top_n(&contracts, |c| Some(c.supplier.clone()), |c| c.global_value, 3);
        let names: Vec<&str> = top.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alfa", "Omega"]);
    }

    #[test]
    fn time_series_excludes_out_of_window_years() {
        let contracts = vec![
            contract("Alfa", 100.0, Some("2023-03-10")),
            contract("Beta", 50.0, Some("2024-03-10")),
            contract("Gama", 25.0, Some("2024-01-01")),
            contract("Delta", 999.0, None),
        ];
        let window = PeriodWindow {
            start: 2024,
            end: 2024,
        };
        let series = time_series(&contracts, |c| c.validity_start, |c| c.global_value, window);
        assert_eq!(
            series,
            vec![
                SeriesPoint {
                    period: "2024-01".to_string(),
                    value: 25.0
                },
                SeriesPoint {
                    period: "2024-03".to_string(),
                    value: 50.0
                },
            ]
        );
    }

    #[test]
    fn fixed_axis_always_has_twelve_months() {
        let items = vec![item("Pregão", ProcurementCategory::Competitive, 100.0, 3)];
        let monthly = monthly_fixed_axis(&items);
        assert_eq!(monthly.len(), 12);
        assert_eq!(monthly[2].month, "Mar");
        assert_eq!(monthly[2].competitive, 100.0);
        assert_eq!(monthly[0].competitive, 0.0);
        assert_eq!(monthly[11].direct, 0.0);
    }

    #[test]
    fn recent_sorts_descending_with_missing_dates_last() {
        let contracts = vec![
            contract("Alfa", 1.0, Some("2024-01-05")),
            contract("Beta", 2.0, None),
            contract("Gama", 3.0, Some("2024-06-01")),
        ];
        let latest = recent(&contracts, |c| c.validity_start, 3);
        let names: Vec<&str> = latest.iter().map(|c| c.supplier.as_str()).collect();
        assert_eq!(names, vec!["Gama", "Alfa", "Beta"]);
    }

    #[test]
    fn filter_matches_across_fields_case_insensitively() {
        let items = vec![
            item("Pregão", ProcurementCategory::Competitive, 100.0, 1),
            item("Dispensa", ProcurementCategory::Direct, 50.0, 2),
        ];
        assert_eq!(filter_plan_items(&items, "pregão").len(), 1);
        assert_eq!(filter_plan_items(&items, "PROPLAD").len(), 2);
        assert_eq!(filter_plan_items(&items, "").len(), 2);
        assert_eq!(filter_plan_items(&items, "xyz").len(), 0);
    }

    #[test]
    fn execution_series_is_monotonic_and_covers_the_year() {
        let curve: Vec<RawExecutionPoint> = serde_json::from_str(
            r#"[
                { "mes": "Jan", "licitado": 0.15, "direto": 0.05 },
                { "mes": "Fev", "licitado": 0.10, "direto": 0.02 }
            ]"#,
        )
        .unwrap();
        let series = execution_series(&curve);
        assert_eq!(series.len(), 12);
        assert_eq!(series[0].value, 0.2);
        // Second point is below the running maximum, so the curve holds.
        assert_eq!(series[1].value, 0.2);
        assert_eq!(series[11].value, 0.2);
    }

    #[test]
    fn summaries_are_idempotent() {
        let contracts = vec![
            contract("Alfa", 100.0, Some("2024-01-05")),
            contract("Beta", 50.0, Some("2024-02-10")),
        ];
        let window = PeriodWindow {
            start: 2024,
            end: 2024,
        };
        let a = contract_summary(&contracts, window);
        let b = contract_summary(&contracts, window);
        assert_eq!(a, b);

        let items = vec![
            item("Pregão", ProcurementCategory::Competitive, 100.0, 1),
            item("Dispensa", ProcurementCategory::Direct, 50.0, 2),
        ];
        assert_eq!(plan_summary(&items), plan_summary(&items));
    }

    #[test]
    fn plan_summary_splits_categories() {
        let items = vec![
            item("Pregão", ProcurementCategory::Competitive, 100.0, 1),
            item("Pregão", ProcurementCategory::Competitive, 200.0, 2),
            item("Dispensa", ProcurementCategory::Direct, 50.0, 2),
        ];
        let summary = plan_summary(&items);
        assert_eq!(summary.total_estimated, 350.0);
        assert_eq!(summary.competitive_value, 300.0);
        assert_eq!(summary.direct_value, 50.0);
        assert_eq!(summary.estimated_savings, 350.0 * 0.07);
        assert_eq!(summary.by_modality[0], ("Pregão".to_string(), 300.0));
    }

    #[test]
    fn contract_summary_kpis() {
        let contracts = vec![
            contract("Alfa", 100.0, Some("2024-01-05")),
            contract("Beta", 300.0, Some("2024-02-10")),
            contract("Alfa", 50.0, Some("2023-12-01")),
        ];
        let window = PeriodWindow {
            start: 2023,
            end: 2024,
        };
        let summary = contract_summary(&contracts, window);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.total_value, 450.0);
        assert_eq!(summary.largest_value, 300.0);
        assert_eq!(summary.mean_value, 150.0);
        assert_eq!(summary.top_suppliers[0].name, "Beta");
        assert_eq!(summary.top_suppliers[1].value, 150.0);
        assert_eq!(summary.monthly_series.len(), 3);
        assert_eq!(summary.recent[0].supplier, "Beta");
    }
}
