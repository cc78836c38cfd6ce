//! Integration tests for settle-cost with mock export files.

use settle_cost::{
    AppState, AppliedRate, CostQuery, CostRecord, ExchangeRate, Normalizer, NormalizerConfig,
    ReportSnapshot, SourceStream, aggregate, compute_msp_fees, deduplicate, export_to_dir,
    format_krw, process_batch, read_batch, to_krw,
};
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, tempdir};

/// Create a mock export file.
fn create_mock_export(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".csv").unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Vendor invoice export with a summary footer.
const INPUT_EXPORT: &str = "Date,Environment Name,Service Family,Region,Cost\n\
2024-01-01 00:00:00,prd-app,EC2,ap-northeast-2,100\n\
2024-01-01 00:00:00,prd-app,Custom Charge,,20\n\
\n\
Total,,,,120\n";

/// Customer billing export using a different header dialect.
const RESALE_EXPORT: &str = "Usage Date,Environment,Service Name,AWS Region,Unblended Cost\n\
2024-01-01,prd-app,EC2,ap-northeast-2,$40.00\n";

/// Export with noise rows that must be dropped.
const NOISY_EXPORT: &str = "Date,Environment Name,Service Family,Cost\n\
2024-01-02,dev,S3,\"1,200.50\"\n\
2024-01-02,dev,S3,n/a\n\
2024-01-03,dev,,\n\
not-a-date,dev,Lambda,2\n";

async fn load(paths: &[PathBuf], stream: Option<SourceStream>) -> settle_cost::StreamData {
    let files = read_batch(paths).await.unwrap();
    process_batch(&files, stream, &Normalizer::new()).unwrap()
}

#[tokio::test]
async fn test_two_stream_settlement() {
    let input = create_mock_export(INPUT_EXPORT);
    let resale = create_mock_export(RESALE_EXPORT);

    let state = AppState::new()
        .with_stream(load(&[input.path().to_path_buf()], Some(SourceStream::Input)).await)
        .with_stream(load(&[resale.path().to_path_buf()], Some(SourceStream::Resale)).await);

    let input_summary = &state.input.as_ref().unwrap().summary;
    assert_eq!(input_summary.total_cost_usd, 120.0);
    assert_eq!(input_summary.custom_charge_usd, 20.0);
    assert_eq!(input_summary.non_custom_charge_usd, 100.0);

    let resale_summary = &state.resale.as_ref().unwrap().summary;
    assert_eq!(resale_summary.total_cost_usd, 40.0);
    assert_eq!(resale_summary.environments, vec!["prd-app"]);

    let settlement = state.settlement().unwrap();
    assert_eq!(settlement.fees.m2, 20.0);
    assert_eq!(settlement.fees.m1, 1000.0);
    assert_eq!(settlement.fees.entity_usage_amount, -980.0);
    assert_eq!(settlement.cross_stream_delta, 80.0);
}

#[tokio::test]
async fn test_same_file_uploaded_twice() {
    let input = create_mock_export(INPUT_EXPORT);
    let path = input.path().to_path_buf();

    let once = load(std::slice::from_ref(&path), None).await;
    let twice = load(&[path.clone(), path], None).await;

    assert_eq!(twice.dedup.removed, twice.dedup.total_seen / 2);
    assert_eq!(twice.records, once.records);
    assert_eq!(twice.summary.total_cost_usd, once.summary.total_cost_usd);
    assert_eq!(twice.summary.daily_costs, once.summary.daily_costs);
}

#[tokio::test]
async fn test_noisy_rows_are_absorbed() {
    let noisy = create_mock_export(NOISY_EXPORT);
    let data = load(&[noisy.path().to_path_buf()], None).await;

    assert_eq!(data.normalize.rows_seen, 4);
    assert_eq!(data.normalize.dropped_cost, 2);
    assert_eq!(data.normalize.undated, 1);
    assert_eq!(data.records.len(), 2);
    assert_eq!(data.summary.total_cost_usd, 1202.5);
    // The undated Lambda row lands in the undated bucket, not on a day
    assert_eq!(data.summary.daily_costs.values().sum::<f64>(), 1200.5);
    assert_eq!(data.summary.undated_cost_usd, 2.0);
    assert_eq!(data.summary.daily_total(), data.summary.total_cost_usd);
    assert_eq!(data.summary.date_range.start, "2024-01-02");
}

#[tokio::test]
async fn test_unreadable_file_rejects_batch() {
    let good = create_mock_export(INPUT_EXPORT);
    let dir = tempdir().unwrap();
    let missing = dir.path().join("gone.csv");

    let result = read_batch(&[good.path().to_path_buf(), missing]).await;
    let err = result.unwrap_err();
    assert!(err.is_batch_failure());
    assert!(err.to_string().contains("gone.csv"));
}

#[test]
fn test_environment_folding_through_pipeline() {
    let csv = "Environment Name,Service,Cost\n\
dev-smartmobility,EC2,1\n\
prd-smartmobility,EC2,2\n\
dev-smartmobility,VPC,3.6\n\
prd-smartmobility,VPC,3.6\n\
,S3,4\n";
    let config = NormalizerConfig::default()
        .with_alias("dev-smartmobility", "smartmobility")
        .with_alias("prd-smartmobility", "smartmobility")
        .with_default_environment("cielmobility");
    let files = [settle_cost::SourceFile::new("env.csv", csv)];

    let data = process_batch(&files, None, &Normalizer::with_config(config)).unwrap();

    // Lines differing only in an aliased environment are both kept
    assert_eq!(data.dedup.removed, 0);
    assert_eq!(data.summary.environments, vec!["cielmobility", "smartmobility"]);
    assert!((data.summary.environment_costs["smartmobility"] - 10.2).abs() < 1e-9);
}

#[test]
fn test_dedup_idempotence_and_sum_identity() {
    let day = chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let records = vec![
        CostRecord::new("EC2", 3.25).with_environment("prd").with_date(day),
        CostRecord::new("EC2", 3.25).with_environment("prd").with_date(day),
        CostRecord::new("Custom Charge", 9.0).with_environment("prd").with_date(day),
        CostRecord::new("RDS", -1.0).with_environment("dev").with_date(day),
    ];

    let (once, _) = deduplicate(records);
    let (twice, report) = deduplicate(once.clone());
    assert_eq!(once, twice);
    assert_eq!(report.removed, 0);

    let summary = aggregate(&once);
    assert!((summary.custom_charge_usd + summary.non_custom_charge_usd - summary.total_cost_usd).abs() < 1e-9);
    assert!((summary.daily_total() - summary.total_cost_usd).abs() < 1e-9);

    let fees = compute_msp_fees(summary.non_custom_charge_usd);
    assert!((fees.m2 - summary.non_custom_charge_usd * 0.2).abs() < 1e-9);
    assert!((fees.entity_usage_amount - (fees.m2 - fees.m1)).abs() < 1e-9);
}

#[test]
fn test_krw_conversion_round_trip_and_sentinel() {
    let rate = 1320.5;
    let usd = 1234.56;
    let krw = to_krw(usd, rate).unwrap();
    assert!((krw / rate - usd).abs() < 1e-9);

    assert_eq!(to_krw(usd, 0.0), None);
    assert_eq!(format_krw(to_krw(usd, -1.0)), "₩—");
    assert_eq!(format_krw(Some(krw)), "₩1,630,236");
}

#[tokio::test]
async fn test_query_and_export_snapshot() {
    let input = create_mock_export(INPUT_EXPORT);
    let resale = create_mock_export(RESALE_EXPORT);
    let state = AppState::new()
        .with_stream(load(&[input.path().to_path_buf()], Some(SourceStream::Input)).await)
        .with_stream(load(&[resale.path().to_path_buf()], Some(SourceStream::Resale)).await)
        .with_rate(AppliedRate::manual(ExchangeRate::parse("1,300").unwrap()));

    let page = CostQuery::new()
        .with_services(["EC2"])
        .run(&state.converted_records());
    assert_eq!(page.total, 2);
    assert!(page.records.iter().all(|r| r.cost_krw.is_some()));

    let dir = tempdir().unwrap();
    let snapshot = ReportSnapshot::capture(&state);
    let paths = export_to_dir(&snapshot, dir.path()).unwrap();

    assert!(paths.json.exists());
    let csv_text = std::fs::read_to_string(&paths.csv).unwrap();
    assert_eq!(csv_text.lines().count(), 4);
    assert!(csv_text.contains("resale,2024-01-01,prd-app,EC2,ap-northeast-2,40,52000"));
}
