mod common;

use std::fs;

use assert_cmd::Command;
use common::TestWorkspace;
use predicates::{prelude::PredicateBooleanExt, str::contains};

const EVENTS_CSV: &str = "id,created,active,name\n\
1,2024-01-01 10:00:00,true,alpha\n\
2,2024-01-02 11:00:00,false,beta\n\
3,2024-01-03 12:00:00,true,gamma\n";

const ORDERS_SCHEMA: &str = r#"{"schema": {"fields": [
    {"name": "order_id", "type": "INTEGER", "mode": "REQUIRED"},
    {"name": "day", "type": "DATE"},
    {"name": "items", "type": "RECORD", "mode": "REPEATED", "fields": [
        {"name": "sku", "type": "STRING"},
        {"name": "qty", "type": "INTEGER"}
    ]}
]}}"#;

fn ch_ingest() -> Command {
    let mut cmd = Command::cargo_bin("ch-ingest").expect("binary exists");
    cmd.env_remove("CLICKHOUSE_DATABASE").env_remove("RUST_LOG");
    cmd
}

#[test]
fn probe_lists_inferred_dtypes_and_column_types() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write("events.csv", EVENTS_CSV);
    ch_ingest()
        .args(["probe", "-i", csv.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("1    id       int64           Int64"))
        .stdout(contains("2    created  datetime64[ns]  DateTime"))
        .stdout(contains("3    active   bool            UInt8"))
        .stdout(contains("4    name     object          String"));
}

#[test]
fn probe_honours_custom_delimiter() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write("events.txt", &EVENTS_CSV.replace(',', ";"));
    ch_ingest()
        .args(["probe", "-i", csv.to_str().unwrap(), "--delimiter", ";"])
        .assert()
        .success()
        .stdout(contains("datetime64[ns]"));
}

#[test]
fn ddl_from_csv_prints_create_statement() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write("events.csv", EVENTS_CSV);
    let output = ch_ingest()
        .args([
            "ddl",
            "-i",
            csv.to_str().unwrap(),
            "-t",
            "events",
            "--order-by",
            "created",
            "--database",
            "analytics",
        ])
        .output()
        .expect("run ddl");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "CREATE TABLE IF NOT EXISTS analytics.events\n(\nid Int64,\ncreated DateTime,\nactive UInt8,\nname String\n)\nENGINE = MergeTree()\nORDER BY created;\n"
    );
}

#[test]
fn ddl_from_document_schema_uses_partition_as_sort_key() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write("orders.json", ORDERS_SCHEMA);
    ch_ingest()
        .env("CLICKHOUSE_DATABASE", "shop")
        .args([
            "ddl",
            "--document-schema",
            schema.to_str().unwrap(),
            "-t",
            "orders",
            "--order-by",
            "order_id",
            "--partition-by",
            "day",
        ])
        .assert()
        .success()
        .stdout(contains("CREATE TABLE IF NOT EXISTS shop.orders\n"))
        .stdout(contains("day Date,\nitems Array(Nested(sku String,qty Int64))\n"))
        .stdout(contains("PARTITION BY day\nORDER BY day;"));
}

#[test]
fn ddl_rejects_empty_record() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write(
        "bad.json",
        r#"[{"name": "id", "type": "INTEGER"}, {"name": "meta", "type": "RECORD", "fields": []}]"#,
    );
    ch_ingest()
        .args([
            "ddl",
            "--document-schema",
            schema.to_str().unwrap(),
            "-t",
            "bad",
            "--order-by",
            "id",
        ])
        .assert()
        .failure()
        .stderr(contains("invalid schema for table 'bad'"))
        .stderr(contains("nested field 'meta' has no children"));
}

#[test]
fn upload_scripts_create_purge_and_insert_in_order() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write("events.csv", EVENTS_CSV);
    let script = workspace.path().join("load.sql");
    ch_ingest()
        .args([
            "upload",
            "-i",
            csv.to_str().unwrap(),
            "-t",
            "events",
            "--order-by",
            "created",
            "--purge-where",
            "created >= '2024-01-02'",
            "-o",
            script.to_str().unwrap(),
        ])
        .assert()
        .success();

    let contents = fs::read_to_string(&script).expect("read script");
    let create = contents
        .find("CREATE TABLE IF NOT EXISTS default.events")
        .expect("create statement");
    let purge = contents
        .find("ALTER TABLE default.events DELETE WHERE created >= '2024-01-02';")
        .expect("purge statement");
    let insert = contents
        .find("INSERT INTO default.events FORMAT JSONEachRow\n")
        .expect("insert statement");
    assert!(create < purge && purge < insert);
    assert!(contents.contains("\"name\":\"alpha\""));
    assert!(contents.contains("\"active\":0"));
    assert!(contents.contains("\"created\":\"2024-01-03 12:00:00\""));
    assert_eq!(contents.matches("\"id\":").count(), 3);
}

#[test]
fn upload_without_output_writes_script_to_stdout() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write("events.csv", EVENTS_CSV);
    ch_ingest()
        .args([
            "upload",
            "-i",
            csv.to_str().unwrap(),
            "-t",
            "events",
            "--order-by",
            "id",
        ])
        .assert()
        .success()
        .stdout(contains("ORDER BY id;"))
        .stdout(contains("INSERT INTO default.events FORMAT JSONEachRow"))
        .stdout(contains("DELETE").not());
}

#[test]
fn upload_export_scripts_nested_documents() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write("orders.json", ORDERS_SCHEMA);
    let export = workspace.write(
        "orders.ndjson",
        "{\"order_id\": 7, \"day\": \"2024-03-01\", \"items\": [{\"sku\": \"a\", \"qty\": 2}]}\n",
    );
    ch_ingest()
        .args([
            "upload-export",
            "--document-schema",
            schema.to_str().unwrap(),
            "--source",
            export.to_str().unwrap(),
            "-t",
            "orders",
            "--order-by",
            "order_id",
            "--database",
            "shop",
        ])
        .assert()
        .success()
        .stdout(contains("items Array(Nested(sku String,qty Int64))"))
        .stdout(contains("INSERT INTO shop.orders FORMAT JSONEachRow\n"))
        .stdout(contains("\"order_id\":7"));
}

#[test]
fn upload_export_reports_malformed_lines() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write("orders.json", ORDERS_SCHEMA);
    let export = workspace.write("orders.ndjson", "[1, 2, 3]\n");
    ch_ingest()
        .args([
            "upload-export",
            "--document-schema",
            schema.to_str().unwrap(),
            "--source",
            export.to_str().unwrap(),
            "-t",
            "orders",
            "--order-by",
            "order_id",
        ])
        .assert()
        .failure()
        .stderr(contains("failed to read source rows"))
        .stderr(contains("is not a JSON object"));
}

#[test]
fn unknown_encoding_is_rejected() {
    let workspace = TestWorkspace::new();
    let csv = workspace.write("events.csv", EVENTS_CSV);
    ch_ingest()
        .args([
            "probe",
            "-i",
            csv.to_str().unwrap(),
            "--input-encoding",
            "not-a-charset",
        ])
        .assert()
        .failure()
        .stderr(contains("error:"));
}
