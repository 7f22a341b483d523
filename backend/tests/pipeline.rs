//! End-to-end checks through the public API: file on disk to formatted KPIs.

use std::io::Write;

use kpilens::{
    aggregate, compute_kpis, format_kpi, format_kpi_value, ingest_file, ingest_text,
    parse_formatted, suggest_kpis, CellValue, Dataset, DashboardStore, FormatOptions,
    IngestOptions, IngestResponse, KpiMapping, KpiOperation, NumberSystem, Orientation,
};

const PNL: &str = "Metric,FY2022,FY2023\n\
Revenue,\"₹72,45,000\",\"₹1,23,45,678\"\n\
COGS,\"₹30,00,000\",\"₹50,00,000\"\n";

fn csv_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_row_aligned_file_to_formatted_kpis() {
    let file = csv_file(PNL);
    let output = ingest_file(file.path(), &IngestOptions::default()).unwrap();

    assert_eq!(output.classification.orientation, Orientation::RowAligned);
    assert_eq!(output.dataset.headers, vec!["period", "revenue", "cogs"]);
    assert_eq!(output.dataset.row_count(), 2);

    let definitions = suggest_kpis(&output.dataset, Some("₹"));
    let kpis = compute_kpis(&output.dataset, &definitions);
    assert_eq!(kpis.len(), 2);

    let revenue = &kpis[0];
    assert_eq!(revenue.name, "Revenue");
    assert_eq!(revenue.value, CellValue::Number(19590678.0));
    assert_eq!(revenue.category, "Revenue");

    let series = revenue.time_series.as_ref().unwrap();
    assert!(!series.synthetic);
    assert_eq!(series.values, vec![7245000.0, 12345678.0]);

    let shown = format_kpi(revenue, &FormatOptions::default()).unwrap();
    assert_eq!(shown.formatted, "₹1.96 Cr");
    assert_eq!(shown.full, "₹1,95,90,678");
    assert_eq!(shown.tooltip, "₹1,95,90,678 (1.96 Crore)");
}

#[test]
fn test_mapping_file_drives_kpis() {
    let file = csv_file(PNL);
    let output = ingest_file(file.path(), &IngestOptions::default()).unwrap();

    let mapping = KpiMapping::from_json(
        r#"{
            "version": "1.0",
            "kpis": [
                { "name": "Revenue growth base", "operation": "min", "columnA": "Revenue", "unit": "₹" },
                { "name": "COGS to revenue", "operation": "ratio", "columnA": "COGS", "columnB": "Revenue", "unit": "x" },
                { "name": "Gross margin", "operation": "percent", "columnA": "revenue", "columnB": "cogs", "unit": "%" },
                { "name": "Headcount", "operation": "custom", "columnA": "", "value": "42" }
            ]
        }"#,
    )
    .unwrap();

    let kpis = compute_kpis(&output.dataset, &mapping.kpis);
    assert_eq!(kpis[0].value, CellValue::Number(7245000.0));

    let share = kpis[1].numeric_value().unwrap();
    assert!((share - 8000000.0 / 19590678.0).abs() < 1e-12);
    assert_eq!(kpis[1].time_series.as_ref().unwrap().values.len(), 2);

    let margin = kpis[2].numeric_value().unwrap();
    assert!((margin - 144.883475).abs() < 1e-6);

    // Custom KPIs show their literal value as-is
    assert_eq!(kpis[3].value, CellValue::Text("42".into()));
    assert!(kpis[3].time_series.as_ref().unwrap().synthetic);
}

#[test]
fn test_invalid_mapping_is_rejected() {
    let err = KpiMapping::from_json(r#"{ "kpis": [{ "name": "Margin", "operation": "ratio", "columnA": "a" }] }"#);
    assert!(err.is_err());
}

#[test]
fn test_empty_file_gives_failure_response() {
    let response = IngestResponse::from(ingest_text("\n\n", Some("blank.csv"), &IngestOptions::default()));
    assert!(!response.success);
    assert!(response.data.is_none());
    assert!(response.error.is_some());
}

#[test]
fn test_column_aligned_sum_with_mixed_cells() {
    let output = ingest_text(
        "month,revenue\nJan,100\nFeb,\"₹2,000\"\nMar,\nApr,abc\n",
        Some("monthly.csv"),
        &IngestOptions::default(),
    )
    .unwrap();

    assert_eq!(output.classification.orientation, Orientation::ColumnAligned);
    assert_eq!(
        aggregate(&output.dataset, KpiOperation::Sum, "revenue", None),
        Some(2100.0)
    );
    assert_eq!(
        aggregate(&output.dataset, KpiOperation::Count, "revenue", None),
        Some(2.0)
    );
    assert_eq!(
        aggregate(&output.dataset, KpiOperation::Ratio, "revenue", Some("month")),
        None
    );
}

#[test]
fn test_number_systems() {
    let indian = FormatOptions::default().with_compact(false).with_decimals(0);
    let international = indian.clone().with_system(NumberSystem::International);

    assert_eq!(format_kpi_value(12345678.0, None, &indian).formatted, "1,23,45,678");
    assert_eq!(
        format_kpi_value(12345678.0, None, &international).formatted,
        "12,345,678"
    );

    let compact = format_kpi_value(7245000.0, Some("₹"), &FormatOptions::default());
    assert_eq!(compact.formatted, "₹72.45 L");
    let parsed = parse_formatted(&compact.formatted).unwrap();
    assert!((parsed - 7245000.0).abs() < 1e-6);

    let fixed = format_kpi_value(
        7245000.0,
        Some("₹"),
        &FormatOptions::default().with_compact(false),
    );
    assert_eq!(fixed.formatted, "₹72,45,000.00");
}

#[test]
fn test_dashboard_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let output = ingest_text(PNL, Some("pnl.csv"), &IngestOptions::default()).unwrap();
    let kpis = compute_kpis(&output.dataset, &suggest_kpis(&output.dataset, Some("₹")));

    let id = {
        let mut store = DashboardStore::with_dir(dir.path());
        store.save("pnl.csv", output.dataset, kpis).id.clone()
    };

    let store = DashboardStore::with_dir(dir.path());
    let dashboard = store.get(&id).unwrap();
    let reloaded: &Dataset = &dashboard.dataset;
    assert!(reloaded.is_pivoted());
    assert_eq!(reloaded.headers, vec!["period", "revenue", "cogs"]);
    assert_eq!(dashboard.kpis.len(), 2);
}
