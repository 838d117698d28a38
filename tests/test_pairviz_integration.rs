//! End-to-end tests of the pairviz library and binary on a small pairs file

use pairviz::config::{StatsConfig, StatsMode};
use pairviz::json::{read_json_stats, JsonFloat, JsonOutStat};
use pairviz::output::write_win_stats;
use pairviz::stats::win_stats;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const PAIRS: &str = "## pairs format v1.0
#columns: readID chr1 pos1 chr2 pos2 strand1 strand2
r1\t2L_A\t5\t2L_A\t15\t+\t-
r2\t2L_A\t12\t2L_B\t3\t+\t+
r3\t!\t0\t!\t0\t-\t-
";

fn get_pairviz_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pairviz"))
}

fn run_pairviz(work_dir: &Path, args: &[&str]) -> io::Result<Output> {
    Command::new(get_pairviz_binary())
        .current_dir(work_dir)
        .args(args)
        .output()
}

fn write_pairs(dir: &Path, name: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, PAIRS)?;
    Ok(path)
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_library_window_run() -> io::Result<()> {
    let config = StatsConfig {
        win_size: 10,
        win_step: 3,
        separate_genomes: true,
        read_len: 150,
        name: Some("test5".to_string()),
        ..Default::default()
    };
    let StatsMode::Window(windows) = config.mode().unwrap() else {
        panic!("expected window mode");
    };

    let stats = win_stats(PAIRS.as_bytes(), windows, &config)?;
    assert_eq!(stats.totals.total_reads, 3);
    assert_eq!(stats.totals.total_good_reads, 2);
    assert_eq!(stats.totals.total_bad_reads, 1);

    // Position 12 lies in windows 1..=4, position 3 in windows 0..=1
    let list = stats.hits.get("2L").unwrap();
    let pair_hits: Vec<i64> = (0..6).map(|i| list.get(i).unwrap().pair_hits).collect();
    assert_eq!(pair_hits, vec![1, 2, 1, 1, 1, 0]);
    // r1 is a cis self pair 10 bp apart facing in: it overlaps at read length 150
    assert_eq!(list.get(0).unwrap().ovl_hits, 1);

    let mut out = Vec::new();
    write_win_stats(&mut out, &stats, true, config.overlaps(), false)?;
    let text = String::from_utf8(out).unwrap();
    let header = text.lines().next().unwrap();
    assert!(header.contains("\tovl_fpkm\t"));
    assert!(text.lines().skip(1).all(|l| l.ends_with("\ttest5")));
    Ok(())
}

#[test]
fn test_window_table() -> io::Result<()> {
    let temp_dir = TempDir::new()?;
    let pairs = write_pairs(temp_dir.path(), "sample.pairs")?;

    let output = run_pairviz(
        temp_dir.path(),
        &["stats", "-w", "10", "-s", "10", "-f", pairs.to_str().unwrap()],
    )?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("chrom\tstart\tend\thit_type"));
    assert!(lines[0].ends_with("winsize\twinstep"));
    assert_eq!(
        lines[1],
        "2L\t0\t10\tpaired\tself\t1\t1\t0.5\t0.5\t0.33333333\t0.5\t0.33333333\t10\t10"
    );
    assert_eq!(
        lines[2],
        "2L\t10\t20\tpaired\tself\t1\t1\t0.5\t0.5\t0.33333333\t0.5\t0.33333333\t10\t10"
    );
    Ok(())
}

#[test]
fn test_window_table_separate_genomes_with_name() -> io::Result<()> {
    let temp_dir = TempDir::new()?;
    let pairs = write_pairs(temp_dir.path(), "sample.pairs")?;

    let output = run_pairviz(
        temp_dir.path(),
        &[
            "stats",
            "-w",
            "10",
            "-s",
            "10",
            "-f",
            "-G",
            "-n",
            "test5",
            pairs.to_str().unwrap(),
        ],
    )?;
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 4);
    assert!(lines[0].ends_with("\tname"));
    let labels: Vec<&str> = lines[1..]
        .iter()
        .map(|l| l.split('\t').next().unwrap())
        .collect();
    assert_eq!(labels, vec!["2L_A", "2L_A", "2L_B"]);
    assert!(lines[1..].iter().all(|l| l.ends_with("\ttest5")));

    let b_row: Vec<&str> = lines[3].split('\t').collect();
    assert_eq!(&b_row[1..7], &["0", "10", "paired", "self", "1", "0"]);
    Ok(())
}

#[test]
fn test_json_output() -> io::Result<()> {
    let temp_dir = TempDir::new()?;
    let pairs = write_pairs(temp_dir.path(), "sample.pairs")?;

    let output = run_pairviz(
        temp_dir.path(),
        &["stats", "-w", "10", "-s", "10", "-j", pairs.to_str().unwrap()],
    )?;
    assert!(output.status.success());

    let records: Vec<JsonOutStat> =
        read_json_stats(output.stdout.as_slice()).collect::<io::Result<_>>()?;
    assert_eq!(records.len(), 3);

    let keys: Vec<(&str, &str, i64)> = records
        .iter()
        .map(|r| (r.genome.as_str(), r.chr.as_str(), r.start))
        .collect();
    assert_eq!(keys, vec![("A", "2L", 0), ("A", "2L", 10), ("B", "2L", 0)]);

    assert_eq!(records[0].target_hits, JsonFloat(0.0));
    assert_eq!(records[0].alt_hits, JsonFloat(1.0));
    assert_eq!(records[1].target_prop, JsonFloat(0.5));
    assert_eq!(records[2].target_prop_good, JsonFloat(0.5));
    // No read length given: the overlap proportions are 0/0
    assert!(records[2].alt_ovl_prop.0.is_nan());
    Ok(())
}

#[test]
fn test_chromosome_and_region_modes() -> io::Result<()> {
    let temp_dir = TempDir::new()?;
    let pairs = write_pairs(temp_dir.path(), "sample.pairs")?;
    let bed = temp_dir.path().join("regions.bed");
    fs::write(&bed, "track name=test\n2L\t0\t10\n2L\t100\t200\n")?;

    let output = run_pairviz(temp_dir.path(), &["stats", "-c", pairs.to_str().unwrap()])?;
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(
        lines,
        vec![
            "chrom\tself_hits\tpair_hits\tpair_prop\tpair_totgoodprop\tpair_totprop",
            "2L\t1\t1\t0.5\t0.5\t0.33333333",
        ]
    );

    let output = run_pairviz(
        temp_dir.path(),
        &["stats", "-r", bed.to_str().unwrap(), "-f", pairs.to_str().unwrap()],
    )?;
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[1],
        "2L\t0\t10\tpaired\tself\t1\t1\t0.5\t0.5\t0.33333333\t0.5\t0.33333333\t10\t10"
    );
    assert!(lines[2].starts_with("2L\t100\t200\tpaired\tself\t0\t0\tNaN\tNaN\t0\t0\t0\t100\t100"));
    Ok(())
}

#[test]
fn test_multiple_inputs_to_output_dir() -> io::Result<()> {
    let temp_dir = TempDir::new()?;
    let first = write_pairs(temp_dir.path(), "s1.pairs")?;
    let second = write_pairs(temp_dir.path(), "s2.pairs")?;
    let out_dir = temp_dir.path().join("out");

    let output = run_pairviz(
        temp_dir.path(),
        &[
            "stats",
            "-t",
            "2",
            "-w",
            "10",
            "-s",
            "10",
            "--output-dir",
            out_dir.to_str().unwrap(),
            first.to_str().unwrap(),
            second.to_str().unwrap(),
        ],
    )?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let s1 = fs::read_to_string(out_dir.join("s1.pairviz.tsv"))?;
    let s2 = fs::read_to_string(out_dir.join("s2.pairviz.tsv"))?;
    assert_eq!(s1, s2);
    assert_eq!(s1.lines().count(), 3);
    Ok(())
}

#[test]
fn test_subtract_control() -> io::Result<()> {
    let temp_dir = TempDir::new()?;
    let pairs = write_pairs(temp_dir.path(), "sample.pairs")?;
    let jsonl = temp_dir.path().join("sample.jsonl");

    let output = run_pairviz(
        temp_dir.path(),
        &[
            "stats",
            "-w",
            "10",
            "-s",
            "10",
            "-j",
            "-o",
            jsonl.to_str().unwrap(),
            pairs.to_str().unwrap(),
        ],
    )?;
    assert!(output.status.success());

    let output = run_pairviz(
        temp_dir.path(),
        &["subtract-control", "-c", "2L", jsonl.to_str().unwrap()],
    )?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let records: Vec<JsonOutStat> =
        read_json_stats(output.stdout.as_slice()).collect::<io::Result<_>>()?;
    assert_eq!(records.len(), 3);
    // Every window is on the control chromosome, so the hit deltas sum to zero
    let total: f64 = records.iter().map(|r| r.alt_hits.0).sum();
    assert!(total.abs() < 1e-9);

    let output = run_pairviz(
        temp_dir.path(),
        &["subtract-control", "-c", "X", jsonl.to_str().unwrap()],
    )?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn test_invalid_options_exit_with_error() -> io::Result<()> {
    let temp_dir = TempDir::new()?;
    let pairs = write_pairs(temp_dir.path(), "sample.pairs")?;

    let output = run_pairviz(temp_dir.path(), &["stats", pairs.to_str().unwrap()])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());

    let output = run_pairviz(
        temp_dir.path(),
        &["stats", "-c", "-j", pairs.to_str().unwrap()],
    )?;
    assert_eq!(output.status.code(), Some(1));

    let bad = temp_dir.path().join("bad.pairs");
    fs::write(&bad, "r1\t2L_A\tfive\t2L_A\t15\t+\t-\n")?;
    let output = run_pairviz(
        temp_dir.path(),
        &["stats", "-w", "10", "-s", "10", bad.to_str().unwrap()],
    )?;
    assert_eq!(output.status.code(), Some(1));
    Ok(())
}
