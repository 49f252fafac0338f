use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::models::{
    AbcClass, AbcClassStats, CategoryRecommendation, ClassificationRow, ClassificationSummary,
    GroupKey, SalesRecord, XyzClass, XyzClassStats,
};
use crate::services::statistics::{mean, sample_std_dev};

/// Pareto position of one product
#[derive(Debug, Clone, PartialEq)]
pub struct AbcEntry {
    pub product_id: String,
    pub revenue: f64,
    pub quantity: i64,
    pub revenue_share_pct: f64,
    pub cumulative_share_pct: f64,
    pub class: AbcClass,
}

/// Demand stability of one product over its sales dates
#[derive(Debug, Clone, PartialEq)]
pub struct XyzEntry {
    pub product_id: String,
    pub quantity: i64,
    pub mean_daily_quantity: f64,
    /// `None` when the product sold on a single date only
    pub coefficient_of_variation: Option<f64>,
    pub class: XyzClass,
}

/// Revenue ranking, highest first.
///
/// Products are aggregated in key order; ties in revenue keep that order.
/// With zero total revenue every share is 0 and every product falls in C.
pub fn abc_analysis(records: &[SalesRecord], group_key: GroupKey) -> Vec<AbcEntry> {
    let mut totals: BTreeMap<&str, (f64, i64)> = BTreeMap::new();
    for record in records {
        let entry = totals.entry(group_key.key(record)).or_insert((0.0, 0));
        entry.0 += record.amount_f64();
        entry.1 += record.quantity;
    }

    let mut ranked: Vec<(&str, f64, i64)> = totals
        .into_iter()
        .map(|(product, (revenue, quantity))| (product, revenue, quantity))
        .collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let total_revenue: f64 = ranked.iter().map(|(_, revenue, _)| revenue).sum();
    let mut cumulative = 0.0;

    ranked
        .into_iter()
        .map(|(product, revenue, quantity)| {
            cumulative += revenue;
            let (share, cumulative_share, class) = if total_revenue > 0.0 {
                let cumulative_share = cumulative * 100.0 / total_revenue;
                (
                    revenue * 100.0 / total_revenue,
                    cumulative_share,
                    AbcClass::from_cumulative_share(cumulative_share),
                )
            } else {
                (0.0, 0.0, AbcClass::C)
            };

            AbcEntry {
                product_id: product.to_string(),
                revenue,
                quantity,
                revenue_share_pct: share,
                cumulative_share_pct: cumulative_share,
                class,
            }
        })
        .collect()
}

/// Coefficient of variation of per-date quantity, in key order.
///
/// A zero mean yields CV 0 (class X). A single sales date has no sample
/// deviation, so the CV is undefined and the product lands in Z.
pub fn xyz_analysis(records: &[SalesRecord], group_key: GroupKey) -> Vec<XyzEntry> {
    let mut daily: BTreeMap<&str, BTreeMap<chrono::NaiveDate, i64>> = BTreeMap::new();
    for record in records {
        *daily
            .entry(group_key.key(record))
            .or_default()
            .entry(record.date)
            .or_insert(0) += record.quantity;
    }

    daily
        .into_iter()
        .map(|(product, by_date)| {
            let quantities: Vec<f64> = by_date.values().map(|q| *q as f64).collect();
            let m = mean(&quantities);

            let cv = if m == 0.0 {
                Some(0.0)
            } else {
                sample_std_dev(&quantities).map(|std_dev| std_dev / m * 100.0)
            };
            let class = cv.map_or(XyzClass::Z, XyzClass::from_cv);

            XyzEntry {
                product_id: product.to_string(),
                quantity: by_date.values().sum(),
                mean_daily_quantity: m,
                coefficient_of_variation: cv,
                class,
            }
        })
        .collect()
}

/// Outer join of the ABC and XYZ tables by product.
///
/// Rows follow the ABC ranking; products only known to XYZ are appended in
/// key order with an empty ABC side.
pub fn combine(abc: Vec<AbcEntry>, xyz: Vec<XyzEntry>) -> Vec<ClassificationRow> {
    let mut xyz_by_product: HashMap<String, XyzEntry> = xyz
        .into_iter()
        .map(|entry| (entry.product_id.clone(), entry))
        .collect();
    let mut xyz_only: Vec<String> = xyz_by_product.keys().cloned().collect();

    let mut rows: Vec<ClassificationRow> = abc
        .into_iter()
        .map(|a| {
            let x = xyz_by_product.remove(&a.product_id);
            ClassificationRow {
                combined_class: x.as_ref().map(|x| combined_label(a.class, x.class)),
                coefficient_of_variation: x.as_ref().and_then(|x| x.coefficient_of_variation),
                xyz_class: x.map(|x| x.class),
                product_id: a.product_id,
                revenue: Some(a.revenue),
                revenue_share_pct: Some(a.revenue_share_pct),
                cumulative_share_pct: Some(a.cumulative_share_pct),
                abc_class: Some(a.class),
                quantity: a.quantity,
            }
        })
        .collect();

    xyz_only.retain(|product| xyz_by_product.contains_key(product));
    xyz_only.sort();
    for product in xyz_only {
        if let Some(x) = xyz_by_product.remove(&product) {
            rows.push(ClassificationRow {
                product_id: x.product_id,
                revenue: None,
                revenue_share_pct: None,
                cumulative_share_pct: None,
                abc_class: None,
                quantity: x.quantity,
                coefficient_of_variation: x.coefficient_of_variation,
                xyz_class: Some(x.class),
                combined_class: None,
            });
        }
    }

    rows
}

pub fn combined_label(abc: AbcClass, xyz: XyzClass) -> String {
    format!("{}{}", abc.as_char(), xyz.as_char())
}

/// ABC and XYZ classification of every product in `records`
pub fn classify(records: &[SalesRecord], group_key: GroupKey) -> Vec<ClassificationRow> {
    let abc = abc_analysis(records, group_key);
    let xyz = xyz_analysis(records, group_key);
    let rows = combine(abc, xyz);

    info!(
        "Classified {} products from {} records (group by {:?})",
        rows.len(),
        records.len(),
        group_key
    );

    rows
}

/// Title and guidance for a two-letter combined class
pub fn recommendation(combined_class: &str) -> Option<(&'static str, &'static str)> {
    let text = match combined_class {
        "AX" => (
            "Premium category",
            "High revenue and stable demand. Keep items permanently in stock and minimize shortage risk.",
        ),
        "AY" => (
            "Important category",
            "High revenue and variable demand. Monitor stock levels and manage replenishment flexibly.",
        ),
        "AZ" => (
            "Problem category",
            "High revenue and unstable demand. Investigate the causes of instability and rely on forecasts.",
        ),
        "BX" => (
            "Stable category",
            "Medium revenue and stable demand. Automate stock management.",
        ),
        "BY" => (
            "Standard category",
            "Medium revenue and variable demand. Monitor regularly.",
        ),
        "BZ" => (
            "Unstable category",
            "Medium revenue and unstable demand. Manage stock cautiously.",
        ),
        "CX" => (
            "Background category",
            "Low revenue and stable demand. Keep minimal stock and consider trimming the assortment.",
        ),
        "CY" => (
            "Secondary category",
            "Low revenue and variable demand. Review whether the items belong in the assortment.",
        ),
        "CZ" => (
            "Candidates for removal",
            "Low revenue and unstable demand. Consider removing the items from the assortment.",
        ),
        _ => return None,
    };
    Some(text)
}

/// Per-class totals, the 3x3 matrix and recommendations for occupied cells
pub fn summarize(rows: &[ClassificationRow]) -> ClassificationSummary {
    let total_revenue: f64 = rows.iter().filter_map(|r| r.revenue).sum();

    let abc = AbcClass::ALL
        .iter()
        .map(|class| {
            let members: Vec<&ClassificationRow> =
                rows.iter().filter(|r| r.abc_class == Some(*class)).collect();
            let revenue: f64 = members.iter().filter_map(|r| r.revenue).sum();
            AbcClassStats {
                class: *class,
                products: members.len(),
                revenue,
                revenue_share_pct: if total_revenue > 0.0 {
                    revenue * 100.0 / total_revenue
                } else {
                    0.0
                },
            }
        })
        .collect();

    let xyz = XyzClass::ALL
        .iter()
        .map(|class| {
            let members: Vec<&ClassificationRow> =
                rows.iter().filter(|r| r.xyz_class == Some(*class)).collect();
            let cvs: Vec<f64> = members
                .iter()
                .filter_map(|r| r.coefficient_of_variation)
                .collect();
            XyzClassStats {
                class: *class,
                products: members.len(),
                revenue: members.iter().filter_map(|r| r.revenue).sum(),
                mean_cv: mean(&cvs),
            }
        })
        .collect();

    let mut matrix = vec![vec![0usize; XyzClass::ALL.len()]; AbcClass::ALL.len()];
    let mut recommendations = Vec::new();

    for (i, a) in AbcClass::ALL.iter().enumerate() {
        for (j, x) in XyzClass::ALL.iter().enumerate() {
            let members: Vec<&ClassificationRow> = rows
                .iter()
                .filter(|r| r.abc_class == Some(*a) && r.xyz_class == Some(*x))
                .collect();
            matrix[i][j] = members.len();

            if members.is_empty() {
                continue;
            }

            let label = combined_label(*a, *x);
            if let Some((title, guidance)) = recommendation(&label) {
                recommendations.push(CategoryRecommendation {
                    combined_class: label,
                    title: title.to_string(),
                    guidance: guidance.to_string(),
                    products: members.len(),
                    revenue: members.iter().filter_map(|r| r.revenue).sum(),
                });
            }
        }
    }

    debug!("Summarized {} classification rows", rows.len());

    ClassificationSummary {
        abc,
        xyz,
        matrix,
        recommendations,
    }
}

/// Keeps rows whose classes are in the given sets. An empty set does not
/// restrict its axis; a non-empty set excludes rows missing that axis.
pub fn filter_rows(
    rows: &[ClassificationRow],
    abc_classes: &[AbcClass],
    xyz_classes: &[XyzClass],
) -> Vec<ClassificationRow> {
    rows.iter()
        .filter(|r| {
            abc_classes.is_empty() || r.abc_class.map_or(false, |c| abc_classes.contains(&c))
        })
        .filter(|r| {
            xyz_classes.is_empty() || r.xyz_class.map_or(false, |c| xyz_classes.contains(&c))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn sale(product: &str, day: u32, quantity: i64, amount: i64) -> SalesRecord {
        SalesRecord {
            store: "Central".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            product_id: product.to_string(),
            description: format!("{} description", product),
            model: format!("M-{}", product),
            segment: "Phones".to_string(),
            unit_price: BigDecimal::from(10),
            quantity,
            amount: BigDecimal::from(amount),
        }
    }

    fn pareto_ledger() -> Vec<SalesRecord> {
        let mut records = vec![sale("P01", 1, 45, 450), sale("P02", 1, 35, 350)];
        for i in 3..=12 {
            records.push(sale(&format!("P{:02}", i), 1, 2, 20));
        }
        records
    }

    #[test]
    fn test_heavy_hitters_are_class_a() {
        let entries = abc_analysis(&pareto_ledger(), GroupKey::ProductId);

        assert_eq!(entries[0].product_id, "P01");
        assert_eq!(entries[0].class, AbcClass::A);
        // exactly 80% stays in A
        assert_eq!(entries[1].cumulative_share_pct, 80.0);
        assert_eq!(entries[1].class, AbcClass::A);
        assert_eq!(entries[2].class, AbcClass::B);
        assert_eq!(entries.last().unwrap().class, AbcClass::C);
    }

    #[test]
    fn test_last_cumulative_share_is_100() {
        let entries = abc_analysis(&pareto_ledger(), GroupKey::ProductId);
        let last = entries.last().unwrap().cumulative_share_pct;
        assert!((last - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_revenue_ties_keep_key_order() {
        let records = vec![sale("B", 1, 1, 100), sale("A", 1, 1, 100), sale("C", 1, 1, 300)];
        let entries = abc_analysis(&records, GroupKey::ProductId);
        let order: Vec<&str> = entries.iter().map(|e| e.product_id.as_str()).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_zero_revenue_is_all_c() {
        let records = vec![sale("A", 1, 0, 0), sale("B", 1, 0, 0)];
        let entries = abc_analysis(&records, GroupKey::ProductId);
        assert!(entries.iter().all(|e| e.class == AbcClass::C && e.revenue_share_pct == 0.0));
    }

    #[test]
    fn test_xyz_stable_and_volatile_products() {
        let mut records = Vec::new();
        for day in 1..=4 {
            records.push(sale("STEADY", day, 10, 100));
            records.push(sale("SPIKY", day, if day % 2 == 0 { 10 } else { 1 }, 50));
        }

        let entries = xyz_analysis(&records, GroupKey::ProductId);
        let spiky = entries.iter().find(|e| e.product_id == "SPIKY").unwrap();
        let steady = entries.iter().find(|e| e.product_id == "STEADY").unwrap();

        assert_eq!(steady.coefficient_of_variation, Some(0.0));
        assert_eq!(steady.class, XyzClass::X);
        assert!(spiky.coefficient_of_variation.unwrap() > 25.0);
        assert_eq!(spiky.class, XyzClass::Z);
    }

    #[test]
    fn test_xyz_zero_mean_and_single_date() {
        let records = vec![
            sale("IDLE", 1, 0, 0),
            sale("IDLE", 2, 0, 0),
            sale("ONCE", 3, 7, 70),
        ];
        let entries = xyz_analysis(&records, GroupKey::ProductId);

        assert_eq!(entries[0].product_id, "IDLE");
        assert_eq!(entries[0].coefficient_of_variation, Some(0.0));
        assert_eq!(entries[0].class, XyzClass::X);
        assert_eq!(entries[1].coefficient_of_variation, None);
        assert_eq!(entries[1].class, XyzClass::Z);
    }

    #[test]
    fn test_xyz_sums_same_day_sales() {
        let records = vec![sale("P", 1, 4, 40), sale("P", 1, 6, 60), sale("P", 2, 10, 100)];
        let entries = xyz_analysis(&records, GroupKey::ProductId);
        assert_eq!(entries[0].coefficient_of_variation, Some(0.0));
        assert_eq!(entries[0].quantity, 20);
    }

    #[test]
    fn test_combined_class_is_two_letters() {
        let rows = classify(&pareto_ledger(), GroupKey::ProductId);
        assert_eq!(rows.len(), 12);
        for row in &rows {
            let combined = row.combined_class.as_ref().unwrap();
            assert_eq!(combined.len(), 2);
        }
    }

    #[test]
    fn test_outer_join_keeps_one_sided_products() {
        let abc = vec![AbcEntry {
            product_id: "A1".to_string(),
            revenue: 10.0,
            quantity: 1,
            revenue_share_pct: 100.0,
            cumulative_share_pct: 100.0,
            class: AbcClass::C,
        }];
        let xyz = vec![XyzEntry {
            product_id: "X1".to_string(),
            quantity: 3,
            mean_daily_quantity: 1.5,
            coefficient_of_variation: Some(5.0),
            class: XyzClass::X,
        }];

        let rows = combine(abc, xyz);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].product_id, "A1");
        assert_eq!(rows[0].xyz_class, None);
        assert_eq!(rows[0].combined_class, None);
        assert_eq!(rows[1].product_id, "X1");
        assert_eq!(rows[1].abc_class, None);
        assert_eq!(rows[1].quantity, 3);
    }

    #[test]
    fn test_group_by_model() {
        let mut records = pareto_ledger();
        for r in records.iter_mut() {
            r.model = "SAME".to_string();
        }
        let rows = classify(&records, GroupKey::Model);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_id, "SAME");
    }

    #[test]
    fn test_summary_matrix_and_recommendations() {
        let rows = classify(&pareto_ledger(), GroupKey::ProductId);
        let summary = summarize(&rows);

        let counted: usize = summary.matrix.iter().flatten().sum();
        assert_eq!(counted, rows.len());
        assert_eq!(summary.abc[0].products, 2);
        assert!((summary.abc[0].revenue_share_pct - 80.0).abs() < 1e-9);

        // a single sales date per product: all Z
        assert_eq!(summary.matrix[0][2], 2);
        let codes: Vec<&str> = summary
            .recommendations
            .iter()
            .map(|r| r.combined_class.as_str())
            .collect();
        assert_eq!(codes, vec!["AZ", "BZ", "CZ"]);
        assert_eq!(summary.recommendations[2].title, "Candidates for removal");
    }

    #[test]
    fn test_recommendation_texts_cover_all_cells() {
        for a in AbcClass::ALL {
            for x in XyzClass::ALL {
                assert!(recommendation(&combined_label(a, x)).is_some());
            }
        }
        assert!(recommendation("DX").is_none());
    }

    #[test]
    fn test_filter_rows() {
        let rows = classify(&pareto_ledger(), GroupKey::ProductId);

        let only_a = filter_rows(&rows, &[AbcClass::A], &[]);
        assert_eq!(only_a.len(), 2);

        let none = filter_rows(&rows, &[], &[XyzClass::X]);
        assert!(none.is_empty());

        assert_eq!(filter_rows(&rows, &[], &[]).len(), rows.len());
    }
}
