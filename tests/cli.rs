use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const LEDGER: &str = "\
date;categorie;valeur;commentaire
01/01/2025;Chiffre d'affaires;100;a
01/01/2025;Chiffre d'affaires;250;b
01/02/2025;Chiffre d'affaires;1200;
01/02/2025;Chiffre d'affaires;1300;
01/02/2025;Charges;900;loyer
32/13/2025;Chiffre d'affaires;9000;date cassée
";

fn bpsim(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bpsim").unwrap();
    cmd.env("HOME", home.path()).env_remove("RUST_LOG");
    cmd
}

fn write_ledger(home: &TempDir) -> String {
    let path = home.path().join("ledger.csv");
    std::fs::write(&path, LEDGER).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn simulate_prints_table_and_writes_csv() {
    let home = tempfile::tempdir().unwrap();
    let out = home.path().join("out").join("scenario.csv");
    bpsim(&home)
        .args(["simulate", "--revenue-pct=10", "--charges-pct=-20", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Scenario"))
        .stdout(predicate::str::contains("Summary 2028"))
        .stdout(predicate::str::contains("+10%"));

    let text = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "annee,ca,charges,ca_simu,charges_simu,marge_simu,marge_pct_simu");
    assert_eq!(lines.len(), 7);
    assert!(lines[1].starts_with("2023,"));
}

#[test]
fn simulate_is_reproducible_for_a_seed() {
    let home = tempfile::tempdir().unwrap();
    let a = home.path().join("a.csv");
    let b = home.path().join("b.csv");
    for path in [&a, &b] {
        bpsim(&home)
            .args(["simulate", "--seed", "7", "--output"])
            .arg(path)
            .assert()
            .success();
    }
    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

#[test]
fn simulate_rejects_out_of_range_percent() {
    let home = tempfile::tempdir().unwrap();
    bpsim(&home)
        .args(["simulate", "--revenue-pct=250"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between -50 and 200"));
}

#[test]
fn simulate_rejects_out_of_range_slider_under_preset() {
    let home = tempfile::tempdir().unwrap();
    bpsim(&home)
        .args(["simulate", "--revenue-pct=300", "--preset", "revenue_up_10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between -50 and 200"));
}

#[test]
fn simulate_rejects_unknown_preset() {
    let home = tempfile::tempdir().unwrap();
    bpsim(&home)
        .args(["simulate", "--preset", "moonshot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown preset"));
}

#[test]
fn simulate_accepts_preset_and_overrides() {
    let home = tempfile::tempdir().unwrap();
    bpsim(&home)
        .args(["simulate", "--preset", "cost-cut-20", "--override", "2024:5:-5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("per year"));
}

#[test]
fn presets_lists_keys() {
    let home = tempfile::tempdir().unwrap();
    bpsim(&home)
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("cost_cut_20"))
        .stdout(predicate::str::contains("revenue_up_10"));
}

#[test]
fn ledger_categories_come_from_data() {
    let home = tempfile::tempdir().unwrap();
    let file = write_ledger(&home);
    bpsim(&home)
        .args(["ledger", "categories", "--file", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("Chiffre d'affaires"))
        .stdout(predicate::str::contains("Charges"));
}

#[test]
fn ledger_aggregate_consolidates_dates() {
    let home = tempfile::tempdir().unwrap();
    let file = write_ledger(&home);
    bpsim(&home)
        .args(["ledger", "aggregate", "--file", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 K€"))
        .stdout(predicate::str::contains("3 K€"))
        .stdout(predicate::str::contains("9 K€").not());
}

#[test]
fn ledger_missing_file_is_fatal() {
    let home = tempfile::tempdir().unwrap();
    bpsim(&home)
        .args(["ledger", "categories", "--file", "/nonexistent/ledger.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ledger source could not be read"));
}

#[test]
fn ledger_edit_replaces_category_and_exports_everything() {
    let home = tempfile::tempdir().unwrap();
    let file = write_ledger(&home);
    let edits = home.path().join("edits.csv");
    std::fs::write(
        &edits,
        "date,categorie,valeur,commentaire\n\
         01/03/2025,Chiffre d'affaires,4000,nouveau\n\
         n'importe quoi,Chiffre d'affaires,abc,\n",
    )
    .unwrap();
    let out = home.path().join("edited.csv");

    bpsim(&home)
        .args(["ledger", "edit", "--category", "Chiffre d'affaires", "--file", &file, "--edits"])
        .arg(&edits)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("5 row(s) replaced by 2"))
        .stdout(predicate::str::contains("4 K€"));

    let text = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "date,categorie,valeur,commentaire");
    assert_eq!(lines.len(), 4);
    assert!(text.contains("2025-02-01,Charges,900,loyer"));
    assert!(text.contains("2025-03-01,Chiffre d'affaires,4000,nouveau"));
}

#[test]
fn config_set_persists() {
    let home = tempfile::tempdir().unwrap();
    bpsim(&home)
        .args(["config", "--set", "seed=11"])
        .assert()
        .success()
        .stdout(predicate::str::contains("11"));
    let saved = std::fs::read_to_string(home.path().join(".config/bpsim/settings.json")).unwrap();
    assert!(saved.contains("\"seed\": 11"));

    bpsim(&home)
        .args(["config", "--set", "colour=blue"])
        .assert()
        .failure();
}
