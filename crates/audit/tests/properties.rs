// Property-based tests for the audit pipeline.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use shipaudit_audit::engine::{analyze, TOLERANCE};
use shipaudit_audit::history::categorize;
use shipaudit_audit::matcher::detect_columns;
use shipaudit_audit::model::{OrderType, RawValue, Shipment, Zone};
use shipaudit_audit::normalize::{normalize_amount, normalize_weight};
use shipaudit_audit::regression::{fit, WeightDataPoint};
use shipaudit_audit::ContractRules;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn contract() -> ContractRules {
    ContractRules {
        zone_a_rate: 40.0,
        zone_b_rate: 55.0,
        zone_c_rate: 75.0,
        cod_fee_percentage: 1.5,
        rto_flat_fee: 0.0,
        fuel_surcharge_percentage: None,
        docket_charge: None,
        gst_percentage: None,
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Header-ish strings: known courier vocabulary mixed with noise.
fn arb_header() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => prop::sample::select(vec![
            "AWB", "AWB No.", "Waybill", "Tracking ID", "Weight", "Billed Weight",
            "Actual Weight", "Charged Weight", "Zone", "Billed Zone", "Actual Zone",
            "Amount", "Total", "Invoice Amount", "Type", "Order Type", "Payment Mode",
            "Pincode", "Origin Pincode", "Dest Pincode", "COD", "COD Amount", "Date",
            "Length", "Width", "Height",
        ])
        .prop_map(|s| s.to_string()),
        1 => r"[A-Za-z ]{1,18}",
    ]
}

fn arb_zone() -> impl Strategy<Value = Zone> {
    prop_oneof![Just(Zone::A), Just(Zone::B), Just(Zone::C)]
}

fn arb_order_type() -> impl Strategy<Value = OrderType> {
    prop_oneof![
        Just(OrderType::Cod),
        Just(OrderType::Prepaid),
        Just(OrderType::Rto),
    ]
}

fn arb_shipment() -> impl Strategy<Value = Shipment> {
    (
        arb_order_type(),
        0.1..20.0f64,
        0.1..20.0f64,
        arb_zone(),
        arb_zone(),
        0.0..3000.0f64,
        prop::option::of(0.0..5000.0f64),
    )
        .prop_map(|(order_type, billed, actual, bz, az, amount, cod)| Shipment {
            awb: "P".into(),
            order_type,
            billed_weight: billed,
            actual_weight: actual,
            billed_zone: Some(bz),
            actual_zone: Some(az),
            total_billed_amount: amount,
            length: None,
            width: None,
            height: None,
            origin_pincode: None,
            dest_pincode: None,
            cod_amount: cod,
            shipment_date: None,
        })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn matcher_never_reuses_a_header(headers in prop::collection::vec(arb_header(), 0..16)) {
        let result = detect_columns(&headers);
        let mapped: Vec<&str> = result.mapping.mapped().map(|(_, h)| h).collect();
        let unique: HashSet<&str> = mapped.iter().copied().collect();
        prop_assert_eq!(mapped.len(), unique.len());
        for h in mapped {
            prop_assert!(headers.iter().any(|x| x == h));
        }
    }

    #[test]
    fn weight_is_idempotent(grams in 0u32..100_000, as_kg in any::<bool>()) {
        let text = if as_kg {
            format!("{}kg", grams as f64 / 1000.0)
        } else {
            format!("{grams}g")
        };
        let once = normalize_weight(&RawValue::Text(text));
        let twice = normalize_weight(&RawValue::Number(once));
        prop_assert_eq!(once, twice);
        prop_assert!(once >= 0.0);
    }

    #[test]
    fn amount_strips_grouping(rupees in 0u64..10_000_000, paise in 0u32..100) {
        let plain: f64 = format!("{rupees}.{paise:02}").parse().unwrap();
        let grouped = format!("₹{}.{paise:02}", group_thousands(rupees));
        prop_assert_eq!(normalize_amount(&RawValue::Text(grouped)), plain);
    }

    #[test]
    fn flagged_rows_exceed_tolerance(rows in prop::collection::vec(arb_shipment(), 0..40)) {
        let result = analyze(&rows, &contract());
        prop_assert_eq!(result.total_rows, rows.len());
        for d in &result.discrepancies {
            prop_assert!(d.billed_amount - d.correct_amount > TOLERANCE - 0.01);
            prop_assert!(d.labels().count() >= 1);
        }
    }

    #[test]
    fn buckets_sum_to_total(rows in prop::collection::vec(arb_shipment(), 1..40)) {
        let result = analyze(&rows, &contract());
        let buckets = categorize(&result);
        // each of six buckets rounds independently
        prop_assert!((buckets.total() - result.total_overcharge).abs() <= 0.031);
    }

    #[test]
    fn exact_linear_inflation_is_recovered(
        n in 30usize..120,
        base in 50.0..500.0f64,
        step in 1.0..50.0f64,
    ) {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points: Vec<WeightDataPoint> = (0..n)
            .map(|i| {
                let declared = base + step * i as f64;
                WeightDataPoint {
                    provider: "P".into(),
                    awb: format!("A{i}"),
                    declared_weight_g: declared,
                    billed_weight_g: 1.1 * declared,
                    timestamp: at,
                }
            })
            .collect();
        let r = fit(&points).unwrap();
        prop_assert!((r.slope - 1.1).abs() < 1e-3);
        prop_assert!(r.intercept.abs() < 0.5);
        prop_assert!(r.r_squared > 0.999);
        prop_assert_eq!(r.point_count, n);
    }

    #[test]
    fn under_thirty_points_never_fit(n in 0usize..30) {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points: Vec<WeightDataPoint> = (0..n)
            .map(|i| WeightDataPoint {
                provider: "P".into(),
                awb: format!("A{i}"),
                declared_weight_g: 100.0 * (i + 1) as f64,
                billed_weight_g: 110.0 * (i + 1) as f64,
                timestamp: at,
            })
            .collect();
        prop_assert!(fit(&points).is_none());
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
