//! End-to-end engine tests: YAML configuration through aggregated result.

use dq_sentinel::config::RunConfig;
use dq_sentinel::engine::{OutcomeStatus, RunStatus, ValidationEngine};
use dq_sentinel::error::SentinelError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_csv(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("create temp csv");
    file.write_all(content.as_bytes()).expect("write temp csv");
    file.flush().expect("flush temp csv");
    file
}

fn config_over(data: &NamedTempFile, checks_yaml: &str) -> RunConfig {
    let yaml = format!(
        "name: integration\ndata_source:\n  kind: csv\n  location: {}\nchecks:\n{}",
        data.path().display(),
        checks_yaml
    );
    RunConfig::from_yaml_str(&yaml).expect("valid config")
}

#[tokio::test]
async fn test_clean_dataset_passes_all_checks() {
    let data = write_csv("order_id,amount,status\n1,10.5,open\n2,99.0,closed\n3,42.0,open\n");
    let config = config_over(
        &data,
        "  - type: not_null\n    column: order_id\n  - type: unique\n    column: order_id\n  - type: range\n    column: amount\n    params: { min: 0, max: 100 }\n",
    );

    let result = ValidationEngine::new().run(&config).await;

    assert_eq!(result.status, RunStatus::Passed);
    assert_eq!(result.summary.total, 3);
    assert_eq!(result.summary.pass_rate, Some(1.0));
    assert!(result.outcomes.iter().all(|o| o.status.is_passed()));
    assert!(result.finished_at >= result.started_at);
}

#[tokio::test]
async fn test_one_failing_check_fails_the_run() {
    let data = write_csv("order_id,amount\n1,10\n,20\n3,30\n4,40\n");
    let config = config_over(
        &data,
        "  - type: not_null\n    column: order_id\n  - type: range\n    column: amount\n    params: { min: 0 }\n",
    );

    let result = ValidationEngine::new().run(&config).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.outcomes[0].status, OutcomeStatus::Failed);
    assert_eq!(result.outcomes[1].status, OutcomeStatus::Passed);
    assert_eq!(result.summary.pass_rate, Some(0.5));
    let detail = result.outcomes[0].detail.as_deref().unwrap();
    assert!(detail.contains("order_id"));
}

#[tokio::test]
async fn test_erroring_check_does_not_block_later_checks() {
    let data = write_csv("id,v\n1,a\n2,b\n");
    let config = config_over(
        &data,
        "  - type: not_null\n    column: missing_column\n  - type: not_null\n    column: id\n",
    );

    let result = ValidationEngine::new().run(&config).await;

    assert_eq!(result.status, RunStatus::Errored);
    assert_eq!(result.outcomes.len(), 2);
    assert_eq!(result.outcomes[0].status, OutcomeStatus::Errored);
    assert_eq!(result.outcomes[1].status, OutcomeStatus::Passed);
    // Errored outcomes are excluded from the pass-rate denominator.
    assert_eq!(result.summary.pass_rate, Some(1.0));
}

#[tokio::test]
async fn test_missing_data_source_skips_all_checks() {
    let yaml = "\
name: integration
data_source:
  kind: csv
  location: /nonexistent/path/data.csv
checks:
  - type: not_null
    column: id
  - type: unique
    column: id
";
    let config = RunConfig::from_yaml_str(yaml).expect("valid config");
    let result = ValidationEngine::new().run(&config).await;

    assert_eq!(result.status, RunStatus::Errored);
    assert_eq!(result.outcomes.len(), 1);
    assert_eq!(result.outcomes[0].check_type, "data_source");
    assert!(result.summary.pass_rate.is_none());
}

#[tokio::test]
async fn test_invalid_config_rejected_before_execution() {
    let yaml = "\
data_source:
  kind: csv
  location: data.csv
checks:
  - type: range
    column: amount
";
    // `range` without min or max never reaches the engine.
    let err = RunConfig::from_yaml_str(yaml).unwrap_err();
    assert!(matches!(err, SentinelError::Configuration { .. }));
}

#[tokio::test]
async fn test_repeated_runs_are_consistent() {
    let data = write_csv("id\n1\n1\n3\n");
    let config = config_over(&data, "  - type: unique\n    column: id\n");

    let engine = ValidationEngine::new();
    let first = engine.run(&config).await;
    let second = engine.run(&config).await;

    assert_eq!(first.status, second.status);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.outcomes[0].metric, second.outcomes[0].metric);
}

#[tokio::test]
async fn test_referential_check_through_yaml() {
    let orders = write_csv("order_id,customer_id\n1,10\n2,99\n");
    let customers = write_csv("id,name\n10,alice\n11,bob\n");
    let yaml = format!(
        "\
name: integration
data_source:
  kind: csv
  location: {orders}
  references:
    - name: customers
      kind: csv
      location: {customers}
checks:
  - type: referential
    column: customer_id
    params:
      reference_table: customers
      reference_column: id
",
        orders = orders.path().display(),
        customers = customers.path().display(),
    );
    let config = RunConfig::from_yaml_str(&yaml).expect("valid config");
    let result = ValidationEngine::new().run(&config).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.outcomes[0].metric, Some(0.5));
}

#[tokio::test]
async fn test_expression_check_through_yaml() {
    let data = write_csv("qty,price\n2,5\n3,0\n");
    let config = config_over(
        &data,
        "  - type: expression\n    params:\n      expression: qty * price > 0\n",
    );
    let result = ValidationEngine::new().run(&config).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.outcomes[0].metric, Some(0.5));
}
