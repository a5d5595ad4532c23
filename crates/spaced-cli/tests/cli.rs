// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use spaced_core::persist::read_npy;
use spaced_core::BatchSummary;
use tempfile::tempdir;

fn spaced(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_spaced"))
        .current_dir(dir)
        .env_remove("SPACED_CONFIG")
        .env_remove("SPACED_THREADS")
        .env_remove("SPACED_SEQUENTIAL")
        .env_remove("SPACED_TRACE_CHROME")
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_words(path: &Path) {
    let words = ["abAB", "abcd", "ABCD", "abcdABCD", "abcdabcd", "abcdcbad", "aadcBAcb"];
    fs::write(path, words.join("\n") + "\n").unwrap();
}

#[test]
fn relation_check_succeeds() {
    let dir = tempdir().unwrap();
    let output = spaced(dir.path(), &["relation"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("relation residual"));
}

#[test]
fn scan_reports_length_groups() {
    let dir = tempdir().unwrap();
    let words = dir.path().join("words.txt");
    write_words(&words);

    let output = spaced(dir.path(), &["scan", "--words", words.to_str().unwrap(), "--json"]);
    assert!(output.status.success());
    let groups: Vec<serde_json::Value> = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["length"], 4);
    assert_eq!(groups[0]["end"], 3);
    assert_eq!(groups[1]["length"], 8);
    assert_eq!(groups[1]["start"], 3);
    assert_eq!(groups[1]["end"], 7);
}

#[test]
fn rank_two_pairs_persist_arrays_and_summary() {
    let dir = tempdir().unwrap();
    let words = dir.path().join("words.txt");
    let out = dir.path().join("out");
    write_words(&words);

    let output = spaced(
        dir.path(),
        &[
            "pairs",
            "--model",
            "rank2",
            "--words",
            words.to_str().unwrap(),
            "--length",
            "8",
            "--out",
            out.to_str().unwrap(),
            "--threads",
            "2",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let summary: BatchSummary =
        serde_json::from_str(&fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary.words, 4);
    assert!(summary.min_cos_secondary.is_some());

    let zeta = read_npy(out.join("cosangleP_pairs.npy")).unwrap();
    let iota_zeta = read_npy(out.join("cosangleM_pairs.npy")).unwrap();
    let spacing = read_npy(out.join("spacing_pairs.npy")).unwrap();
    assert_eq!(zeta.len(), 4);
    assert_eq!(iota_zeta.len(), 4);
    assert_eq!(spacing.len(), 4);
    assert_eq!(summary.spacing, spacing.iter().copied().reduce(f64::min));
}

#[test]
fn hyperbolic_range_run_matches_known_word() {
    let dir = tempdir().unwrap();
    let words = dir.path().join("words.txt");
    let out = dir.path().join("out");
    write_words(&words);

    let output = spaced(
        dir.path(),
        &[
            "pairs",
            "--words",
            words.to_str().unwrap(),
            "--start",
            "0",
            "--end",
            "1",
            "--out",
            out.to_str().unwrap(),
            "--cross-check",
            "--sequential",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let cosines = read_npy(out.join("cosangle_pairs.npy")).unwrap();
    let spacing = read_npy(out.join("spacing_pairs.npy")).unwrap();
    assert_eq!(cosines.len(), 1);
    assert!((cosines[0] - 0.9642676992711171).abs() < 1e-9);
    assert!((spacing[0] - 0.2824274702373586).abs() < 1e-9);
}

#[test]
fn odd_length_words_fail_for_pairs() {
    let dir = tempdir().unwrap();
    let words = dir.path().join("odd.txt");
    fs::write(&words, "abc\n").unwrap();
    let output = spaced(
        dir.path(),
        &["pairs", "--words", words.to_str().unwrap(), "--out", "out"],
    );
    assert!(!output.status.success());
}

#[test]
fn criterion_exit_status_follows_the_verdict() {
    let dir = tempdir().unwrap();
    let passing = spaced(
        dir.path(),
        &[
            "criterion",
            "--min-cos-zeta",
            "0.87",
            "--min-cos-iota-zeta",
            "0.86",
            "--spacing",
            "5.0",
        ],
    );
    assert!(passing.status.success());
    assert!(stdout(&passing).contains("straight-and-spaced check passed"));

    let failing = spaced(
        dir.path(),
        &[
            "criterion",
            "--min-cos-zeta",
            "0.87",
            "--min-cos-iota-zeta",
            "0.86",
            "--spacing",
            "1.0",
        ],
    );
    assert!(!failing.status.success());
    assert!(stdout(&failing).contains("straight-and-spaced check failed"));

    let domain = spaced(
        dir.path(),
        &[
            "criterion",
            "--min-cos-zeta",
            "0.2",
            "--min-cos-iota-zeta",
            "0.1",
            "--spacing",
            "5.0",
        ],
    );
    assert!(!domain.status.success());
    assert!(String::from_utf8_lossy(&domain.stderr).contains("delta1"));
}

#[test]
fn criterion_reads_config_defaults() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("spaced.toml");
    fs::write(&config, "[criterion]\ndim = 3\nparameter = 0.7\n").unwrap();
    let output = spaced(
        dir.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "criterion",
            "--min-cos-zeta",
            "0.87",
            "--min-cos-iota-zeta",
            "0.86",
            "--spacing",
            "5.0",
            "--json",
        ],
    );
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["inputs"]["dim"], 3);
    assert!((report["delta4"].as_f64().unwrap() - 1.3061346984447009).abs() < 1e-12);
}

#[test]
fn criterion_from_missing_directory_fails() {
    let dir = tempdir().unwrap();
    let output = spaced(dir.path(), &["criterion", "--from", "does-not-exist"]);
    assert!(!output.status.success());
}
