use assert_cmd::Command;
use predicates::prelude::*;

fn subline(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("subline").unwrap();
    cmd.env("SUBLINE_DATA_DIR", data_dir);
    // Keep settings.json inside the sandbox too.
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"));
    cmd.env("NO_COLOR", "1");
    cmd
}

fn write_fixtures(dir: &std::path::Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let csv = dir.join("activations.csv");
    std::fs::write(
        &csv,
        "Razon Social,BAN,Status,SUB,Plan,Precio\n\
         Acme Corp,123456789,A,787-555-0001,Business Basic,54.99\n\
         Acme Corp,123456789,A,787-555-0002,Business Plus,74.99\n\
         ,,,787-555-0003,,\n",
    )
    .unwrap();

    let mapping = dir.join("mapping.json");
    std::fs::write(
        &mapping,
        r#"{
            "Client.name": "Razon Social",
            "Account.number": "BAN",
            "Account.status": "Status",
            "Subscriber.phone": "SUB",
            "Subscriber.plan": "Plan",
            "Subscriber.monthly_value": "Precio"
        }"#,
    )
    .unwrap();
    (csv, mapping)
}

#[test]
fn test_init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    subline(&data)
        .args(["init", "--company", "Island Wireless"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized subline"));
    assert!(data.join("subline.db").exists());

    subline(&data)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Island Wireless"));
}

#[test]
fn test_simulate_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    subline(&data).arg("init").assert().success();
    let (csv, mapping) = write_fixtures(dir.path());

    subline(&data)
        .arg("simulate")
        .arg(&csv)
        .arg("--mapping")
        .arg(&mapping)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total:        3"));

    // Nothing written.
    subline(&data)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Clients:      0"));
}

#[test]
fn test_import_then_reimport() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    subline(&data).arg("init").assert().success();
    let (csv, mapping) = write_fixtures(dir.path());

    subline(&data)
        .arg("import")
        .arg(&csv)
        .arg("--mapping")
        .arg(&mapping)
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 3 rows"));

    // Same checksum is refused without --force.
    subline(&data)
        .arg("import")
        .arg(&csv)
        .arg("--mapping")
        .arg(&mapping)
        .assert()
        .success()
        .stdout(predicate::str::contains("duplicate checksum"));

    // Forced re-import updates instead of duplicating.
    subline(&data)
        .arg("import")
        .arg(&csv)
        .arg("--mapping")
        .arg(&mapping)
        .arg("--force")
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 3 rows"));

    subline(&data)
        .arg("status")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Clients:      1")
                .and(predicate::str::contains("Subscribers:  2")),
        );

    subline(&data)
        .arg("deals")
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme Corp"));
}

#[test]
fn test_vendors_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    subline(&data).arg("init").assert().success();

    subline(&data)
        .args(["vendors", "add", "Hernan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added vendor: Hernan"));

    subline(&data)
        .args(["vendors", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hernan"));
}

#[test]
fn test_bad_mapping_fails_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    subline(&data).arg("init").assert().success();
    let (csv, _) = write_fixtures(dir.path());

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"Client.tax_id": "NIT"}"#).unwrap();

    subline(&data)
        .arg("import")
        .arg(&csv)
        .arg("--mapping")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Client.tax_id"));

    subline(&data)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Clients:      0"));
}
