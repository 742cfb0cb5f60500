//! CLI and basic command tests

mod common;

use common::{tally, Device};
use predicates::prelude::*;
use std::fs;

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    tally()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("stock export"));
}

#[test]
fn test_version_displays() {
    tally()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tally"));
}

#[test]
fn test_unknown_command_fails() {
    tally()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_completions_bash() {
    tally()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tally"));
}

// ============================================================================
// Load Tests
// ============================================================================

#[test]
fn test_list_before_load_fails() {
    let device = Device::new("ana");
    device
        .cmd()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No catalog loaded"));
}

#[test]
fn test_default_source_is_loaded_on_first_use() {
    let device = Device::new("ana");
    device.write_file("estoque.csv", common::SAMPLE);

    device
        .cmd()
        .args(["list", "-o", "id"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Loaded 5 items from estoque.csv"))
        .stdout(predicate::str::contains("P:100"));

    let summary = device.json(&["summary"]);
    assert_eq!(summary["source"], "estoque.csv");
    assert_eq!(summary["aggregate"]["total"], 5);
}

#[test]
fn test_unloadable_default_source_asks_for_manual_load() {
    let device = Device::new("ana");
    device.write_file("estoque.csv", "Codigo;Nome\n1;x\n");

    device
        .cmd()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Default source not loaded"))
        .stderr(predicate::str::contains("No catalog loaded"));
}

#[test]
fn test_load_missing_file_fails() {
    let device = Device::new("ana");
    device
        .cmd()
        .args(["load", "nope.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read stock export"));
}

#[test]
fn test_load_reports_items_and_skipped_rows() {
    let device = Device::new("ana");
    let path = device.write_file("estoque.csv", common::SAMPLE);
    device
        .cmd()
        .arg("load")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 5 items from estoque.csv"))
        .stdout(predicate::str::contains("1 blank or total rows skipped"));
}

#[test]
fn test_load_from_stdin() {
    let device = Device::new("ana");
    device
        .cmd()
        .args(["load", "-", "--name", "piped.csv"])
        .write_stdin(common::SAMPLE)
        .assert()
        .success()
        .stdout(predicate::str::contains("piped.csv"));

    let summary = device.json(&["summary"]);
    assert_eq!(summary["source"], "piped.csv");
    assert_eq!(summary["aggregate"]["total"], 5);
}

#[test]
fn test_failed_load_keeps_previous_catalog() {
    let device = Device::new("ana");
    device.load_sample();
    device.count("100", "12");

    let broken = device.write_file("broken.csv", "Codigo;Nome\n1;x\n");
    device
        .cmd()
        .arg("load")
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing was changed"));

    let summary = device.json(&["summary"]);
    assert_eq!(summary["source"], "estoque.csv");
    assert_eq!(summary["aggregate"]["total"], 5);
    assert_eq!(summary["aggregate"]["counted"], 1);
}

#[test]
fn test_reload_of_different_file_warns() {
    let device = Device::new("ana");
    device.load_sample();
    device.count("100", "12");

    let other = device.write_file(
        "outro.csv",
        "Produto;Código Produto;Quantidade em Estoque\nArroz Tipo 1 5kg;100;10\n",
    );
    device
        .cmd()
        .arg("load")
        .arg(&other)
        .assert()
        .success()
        .stdout(predicate::str::contains("differs"));
}

// ============================================================================
// List / Show Tests
// ============================================================================

#[test]
fn test_list_piped_is_tsv_with_short_ids() {
    let device = Device::new("ana");
    device.load_sample();
    device
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("short_id\tkey"))
        .stdout(predicate::str::contains("@1\tP:100\t100\tArroz Tipo 1 5kg\t10"))
        .stdout(predicate::str::contains("@3\tA:555"))
        .stdout(predicate::str::contains("TOTAL").not());
}

#[test]
fn test_list_table_output() {
    let device = Device::new("ana");
    device.load_sample();
    device
        .cmd()
        .args(["list", "-o", "table"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Product"))
        .stdout(predicate::str::contains("Feijão Carioca"))
        .stdout(predicate::str::contains("MISSING"));
}

#[test]
fn test_list_search_ignores_accents() {
    let device = Device::new("ana");
    device.load_sample();
    device
        .cmd()
        .args(["list", "--search", "FEIJAO", "-o", "id"])
        .assert()
        .success()
        .stdout(predicate::str::diff("P:200\n"));
}

#[test]
fn test_list_status_filter_and_count() {
    let device = Device::new("ana");
    device.load_sample();
    device.count("100", "10");
    device.count("200", "1");

    let count = |status: &str| {
        let output = device
            .cmd()
            .args(["list", "--status", status, "--count"])
            .output()
            .unwrap();
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    };
    assert_eq!(count("all"), "5");
    assert_eq!(count("ok"), "1");
    assert_eq!(count("under"), "1");
    assert_eq!(count("over"), "0");
    assert_eq!(count("missing"), "3");
}

#[test]
fn test_show_json() {
    let device = Device::new("ana");
    device.load_sample();

    let item = device.json(&["show", "555"]);
    assert_eq!(item["key"], "A:555");
    assert_eq!(item["key_source"], "access_code");
    assert_eq!(item["name"], "Óleo de Soja");
    assert_eq!(item["unit_cost"], 7.25);
    assert_eq!(item["status"], "MISSING");
    assert!(item["counted"].is_null());
}

#[test]
fn test_show_unknown_item_fails() {
    let device = Device::new("ana");
    device.load_sample();
    device
        .cmd()
        .args(["show", "999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ============================================================================
// Count Tests
// ============================================================================

#[test]
fn test_count_lifecycle() {
    let device = Device::new("ana");
    device.load_sample();

    device
        .cmd()
        .args(["count", "100", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("diff +2"))
        .stdout(predicate::str::contains("impact 5,00"))
        .stdout(predicate::str::contains("DIVERGENT"));

    let item = device.json(&["show", "100"]);
    assert_eq!(item["counted"], 12);
    assert_eq!(item["impact"], 5.0);
    assert_eq!(item["category"], "over");
    assert_eq!(item["user"], "ana");

    device.count("100", "10");
    let item = device.json(&["show", "100"]);
    assert_eq!(item["status"], "OK");
    assert_eq!(item["impact"], 0.0);

    device
        .cmd()
        .args(["clear", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared count for P:100"));
    assert_eq!(device.json(&["show", "100"])["status"], "MISSING");
}

#[test]
fn test_count_by_short_id_and_selection() {
    let device = Device::new("ana");
    device.load_sample();
    device.cmd().arg("list").assert().success();

    device.count("@2", "3");
    assert_eq!(device.json(&["show", "200"])["counted"], 3);

    device
        .cmd()
        .args(["count"])
        .write_stdin("5\n")
        .assert()
        .success();
    assert_eq!(device.json(&["show", "200"])["counted"], 5);
}

#[test]
fn test_count_accepts_locale_numbers() {
    let device = Device::new("ana");
    device.load_sample();
    assert_eq!(device.json(&["show", "300"])["system_qty"], 1200);

    device.count("300", "1.200,00");
    let item = device.json(&["show", "300"]);
    assert_eq!(item["counted"], 1200);
    assert_eq!(item["status"], "OK");

    device.count("300", "1.200");
    let item = device.json(&["show", "300"]);
    assert_eq!(item["counted"], 1);
    assert_eq!(item["category"], "under");
}

#[test]
fn test_count_rejects_bad_input() {
    let device = Device::new("ana");
    device.load_sample();

    device
        .cmd()
        .args(["count", "100", "doze"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid quantity"));

    device
        .cmd()
        .args(["count", "100", "-3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid quantity"));

    device
        .cmd()
        .args(["count", "100"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Enter a quantity"));

    device
        .cmd()
        .args(["count", "100", "99999999999999999999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid quantity"));

    assert_eq!(device.json(&["summary"])["aggregate"]["counted"], 0);
}

#[test]
fn test_rejected_count_keeps_selection() {
    let device = Device::new("ana");
    device.load_sample();
    device.cmd().args(["select", "200"]).assert().success();

    device
        .cmd()
        .args(["count", "100", "doze"])
        .assert()
        .failure();
    assert_eq!(device.json(&["show"])["key"], "P:200");

    device.count("100", "12");
    assert_eq!(device.json(&["show"])["key"], "P:100");
}

#[test]
fn test_count_without_selection_fails() {
    let device = Device::new("ana");
    device.load_sample();
    device
        .cmd()
        .args(["count"])
        .write_stdin("4\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No item selected"));
}

#[test]
fn test_reset_requires_confirmation() {
    let device = Device::new("ana");
    device.load_sample();
    for (reference, qty) in [("100", "1"), ("200", "2"), ("555", "3"), ("D:sal grosso", "4"), ("300", "5")] {
        device.count(reference, qty);
    }

    device
        .cmd()
        .arg("reset")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
    assert_eq!(device.json(&["summary"])["aggregate"]["counted"], 5);

    device
        .cmd()
        .args(["reset", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 5 count(s)"));

    let summary = device.json(&["summary"]);
    assert_eq!(summary["aggregate"]["counted"], 0);
    assert_eq!(summary["aggregate"]["missing"], 5);
}

// ============================================================================
// Reporting Tests
// ============================================================================

#[test]
fn test_summary_totals() {
    let device = Device::new("ana");
    device.load_sample();
    device.count("100", "12");
    device.count("200", "2");
    device.count("555", "3");

    let summary = device.json(&["summary"]);
    let agg = &summary["aggregate"];
    assert_eq!(agg["total"], 5);
    assert_eq!(agg["counted"], 3);
    assert_eq!(agg["missing"], 2);
    assert_eq!(agg["ok"], 1);
    assert_eq!(agg["divergent"], 2);
    assert_eq!(agg["net_impact"], -11.0);
    assert_eq!(agg["abs_impact"], 21.0);
}

#[test]
fn test_div_ranks_by_absolute_impact() {
    let device = Device::new("ana");
    device.load_sample();
    device.count("100", "12");
    device.count("200", "2");
    device.count("555", "3");

    device
        .cmd()
        .args(["div", "-o", "id"])
        .assert()
        .success()
        .stdout(predicate::str::diff("P:200\nP:100\n"));

    device
        .cmd()
        .args(["div", "--filter", "over", "-o", "id"])
        .assert()
        .success()
        .stdout(predicate::str::diff("P:100\n"));

    device
        .cmd()
        .args(["div", "-n", "1", "-o", "id"])
        .assert()
        .success()
        .stdout(predicate::str::diff("P:200\n"));
}

#[test]
fn test_users_rollup() {
    let device = Device::new("ana");
    device.load_sample();
    device.count("100", "12");
    device.count("200", "4");

    let users = device.json(&["users"]);
    assert_eq!(users["ana"]["items"], 2);
    assert_eq!(users["ana"]["divergent"], 1);
    assert_eq!(users["ana"]["abs_impact"], 5.0);
}

#[test]
fn test_export_to_stdout_and_file() {
    let device = Device::new("ana");
    device.load_sample();
    device.count("100", "12");

    device
        .cmd()
        .arg("export")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Product Code;Access Code;Product;System Qty;Counted Qty;Diff (Counted-System);Unit Cost;Impact;Status",
        ))
        .stdout(predicate::str::contains("100;7891;Arroz Tipo 1 5kg;10;12;2;2,5;5;DIVERGENT"))
        .stdout(predicate::str::contains(";555;Óleo de Soja;3;;;7,25;;MISSING"));

    let out = device.tmp.path().join("conferencia.csv");
    device
        .cmd()
        .arg("export")
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    let text = fs::read_to_string(&out).unwrap();
    assert_eq!(text.lines().count(), 6);
}

#[test]
fn test_header_and_report() {
    let device = Device::new("ana");
    device.load_sample();
    device.count("100", "12");

    device
        .cmd()
        .args(["header", "--unit", "Loja 3", "--responsible", "Bia"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Header updated"));
    let header = device.json(&["header"]);
    assert_eq!(header["unit"], "Loja 3");
    assert_eq!(header["responsible"], "Bia");

    device
        .cmd()
        .args(["report", "--top", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Inventory count report"))
        .stdout(predicate::str::contains("Loja 3"))
        .stdout(predicate::str::contains("estoque.csv"))
        .stdout(predicate::str::contains("Arroz Tipo 1 5kg"))
        .stdout(predicate::str::contains("5,00"));

    let snapshot = device.json(&["report"]);
    assert_eq!(snapshot["divergences"][0]["code"], "100");
    assert_eq!(snapshot["users"][0]["user"], "ana");
}
