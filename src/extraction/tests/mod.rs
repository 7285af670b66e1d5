// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::config::{ExtractionConfig, OutputDirStrategy};
use crate::error::{Error, ExtractError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use ::zip::write::FileOptions;

fn build_zip(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join("results.zip");
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    for (name, body) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(body).unwrap();
    }
    writer.finish().unwrap();
    path
}

fn config_with_patterns(patterns: &[&str]) -> ExtractionConfig {
    ExtractionConfig {
        patterns: patterns.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

#[test]
fn member_names_are_normalized_and_hostile_ones_rejected() {
    assert_eq!(
        safe_member_name("processed-csv/roll.csv").as_deref(),
        Some("processed-csv/roll.csv")
    );
    assert_eq!(
        safe_member_name("dir\\sub\\file.csv").as_deref(),
        Some("dir/sub/file.csv")
    );
    assert_eq!(safe_member_name("./a/./b.csv").as_deref(), Some("a/b.csv"));

    assert_eq!(safe_member_name("../../etc/passwd"), None);
    assert_eq!(safe_member_name("a/../../b.csv"), None);
    assert_eq!(safe_member_name("/etc/passwd"), None);
    assert_eq!(safe_member_name("C:\\Windows\\evil.exe"), None);
    assert_eq!(safe_member_name(""), None);
    assert_eq!(safe_member_name("."), None);
}

#[test]
fn pattern_set_prefix_glob_and_empty_semantics() {
    let all = PatternSet::compile(&[]).unwrap();
    assert!(all.matches("anything/at-all.bin"));

    let prefix = PatternSet::compile(&["processed-csv/**".to_string()]).unwrap();
    assert!(prefix.matches("processed-csv/roll.csv"));
    assert!(prefix.matches("processed-csv/deep/nested.csv"));
    assert!(!prefix.matches("raw/roll.csv"));
    assert!(!prefix.matches("processed-csv")); // the directory itself, not under it

    let glob = PatternSet::compile(&["*.csv".to_string()]).unwrap();
    assert!(glob.matches("roll.csv"));
    assert!(glob.matches("sub/roll.csv"));
    assert!(!glob.matches("roll.xlsx"));

    let star = PatternSet::compile(&["**".to_string()]).unwrap();
    assert!(star.matches("any/path/file.txt"));
}

#[test]
fn malformed_pattern_is_rejected_at_compile_time() {
    let err = PatternSet::compile(&["[".to_string()]).unwrap_err();
    assert!(matches!(err, ExtractError::InvalidPattern { .. }));
}

#[test]
fn extraction_honors_inclusion_patterns() {
    let dir = TempDir::new().unwrap();
    let archive = build_zip(
        dir.path(),
        &[
            ("processed-csv/roll-a.csv", b"unit,rent\n101,950\n"),
            ("processed-csv/roll-b.csv", b"unit,rent\n201,1100\n"),
            ("raw/original.xlsx", b"binary"),
            ("manifest.json", b"{}"),
        ],
    );

    let dest = TempDir::new().unwrap();
    let report = extract_archive(
        &archive,
        dest.path(),
        &config_with_patterns(&["processed-csv/**"]),
    )
    .unwrap();

    assert_eq!(report.extracted.len(), 2);
    assert!(report.skipped.is_empty());
    assert!(dest.path().join("processed-csv/roll-a.csv").exists());
    assert!(!dest.path().join("raw/original.xlsx").exists());
    assert!(!dest.path().join("manifest.json").exists());
}

#[test]
fn manifest_lists_entries_without_extracting() {
    let dir = TempDir::new().unwrap();
    let archive = build_zip(
        dir.path(),
        &[
            ("processed-csv/roll.csv", b"unit,rent\n101,950\n"),
            ("manifest.json", b"{}"),
            ("../../evil.txt", b"escape"),
        ],
    );

    let entries =
        archive_manifest(&archive, &config_with_patterns(&["processed-csv/**"])).unwrap();

    // The hostile entry is omitted entirely
    assert_eq!(entries.len(), 2);
    let roll = entries.iter().find(|e| e.name.ends_with("roll.csv")).unwrap();
    assert!(roll.matched);
    assert_eq!(roll.size_bytes, 18);
    let manifest = entries.iter().find(|e| e.name == "manifest.json").unwrap();
    assert!(!manifest.matched);

    // Listing touched nothing on disk
    assert!(!dir.path().join("processed-csv").exists());
}

#[test]
fn empty_pattern_list_extracts_everything() {
    let dir = TempDir::new().unwrap();
    let archive = build_zip(dir.path(), &[("a.csv", b"x"), ("sub/b.txt", b"y")]);

    let dest = TempDir::new().unwrap();
    let report = extract_archive(&archive, dest.path(), &config_with_patterns(&[])).unwrap();
    assert_eq!(report.extracted.len(), 2);
    assert!(dest.path().join("sub/b.txt").exists());
}

#[test]
fn hostile_entries_are_skipped_but_siblings_survive() {
    let dir = TempDir::new().unwrap();
    let archive = build_zip(
        dir.path(),
        &[
            ("../../evil.txt", b"escape"),
            ("/absolute.txt", b"escape"),
            ("processed-csv/good.csv", b"unit,rent\n101,950\n"),
        ],
    );

    // Nest the destination so an escaping entry would land somewhere we can check
    let root = TempDir::new().unwrap();
    let dest = root.path().join("outer").join("inner");
    std::fs::create_dir_all(&dest).unwrap();

    let report = extract_archive(&archive, &dest, &config_with_patterns(&[])).unwrap();

    assert_eq!(report.extracted.len(), 1);
    assert_eq!(report.skipped.len(), 2);
    assert!(dest.join("processed-csv/good.csv").exists());
    assert!(!root.path().join("evil.txt").exists());
    assert!(!root.path().join("outer/evil.txt").exists());

    // Nothing under the destination except the one legitimate entry
    let files: Vec<_> = walkdir::WalkDir::new(&dest)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .collect();
    assert_eq!(files.len(), 1);
}

#[test]
fn non_zip_file_is_an_invalid_archive() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("not-a-zip.zip");
    std::fs::write(&bogus, b"this is not a zip file").unwrap();

    match extract_archive(&bogus, dir.path(), &config_with_patterns(&[])).unwrap_err() {
        Error::Extract(ExtractError::InvalidArchive { .. }) => {}
        other => panic!("expected InvalidArchive, got {other:?}"),
    }
}

#[test]
fn output_dir_strategy_temp_allocates_fresh_directory() {
    let config = ExtractionConfig::default();
    let dir = resolve_output_dir(&config).unwrap();
    assert!(dir.exists());
    assert!(
        dir.file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("rentroll-batch-")
    );
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn output_dir_strategy_uses_absolute_configured_dir() {
    let root = TempDir::new().unwrap();
    let wanted = root.path().join("results");
    let config = ExtractionConfig {
        output_dir: Some(wanted.clone()),
        output_dir_strategy: OutputDirStrategy::UseOutputDir,
        ..Default::default()
    };

    let dir = resolve_output_dir(&config).unwrap();
    assert_eq!(dir, wanted);
    assert!(dir.exists());
}

#[test]
fn relative_output_dir_falls_back_to_temp() {
    let config = ExtractionConfig {
        output_dir: Some(PathBuf::from("relative/results")),
        output_dir_strategy: OutputDirStrategy::UseOutputDir,
        ..Default::default()
    };

    let dir = resolve_output_dir(&config).unwrap();
    assert!(dir.is_absolute());
    assert!(
        dir.file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("rentroll-batch-")
    );
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn csv_preview_is_bounded_and_marks_truncation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("roll.csv");
    let mut body = String::from("unit,rent\n");
    for i in 0..10 {
        body.push_str(&format!("{i},100\n"));
    }
    std::fs::write(&path, &body).unwrap();

    let config = ExtractionConfig {
        preview_rows: 4,
        ..Default::default()
    };
    let preview = preview_csv(&path, &config).unwrap();

    assert_eq!(preview.headers, vec!["unit", "rent"]);
    assert_eq!(preview.rows.len(), 4);
    assert_eq!(preview.rows[0], vec!["0", "100"]);
    assert!(preview.truncated);
    assert_eq!(preview.inline_text.as_deref(), Some(body.as_str()));
}

#[test]
fn small_file_is_not_marked_truncated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("roll.csv");
    std::fs::write(&path, "unit,rent\n101,950\n").unwrap();

    let preview = preview_csv(&path, &ExtractionConfig::default()).unwrap();
    assert_eq!(preview.rows.len(), 1);
    assert!(!preview.truncated);
}

#[test]
fn oversized_file_gets_preview_but_no_inline_text() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.csv");
    std::fs::write(&path, "unit,rent\n101,950\n202,1200\n").unwrap();

    let config = ExtractionConfig {
        inline_max_bytes: 8,
        ..Default::default()
    };
    let preview = preview_csv(&path, &config).unwrap();
    assert_eq!(preview.rows.len(), 2);
    assert!(preview.inline_text.is_none());
}

#[test]
fn preview_set_only_covers_csv_files() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("roll.csv");
    let json_path = dir.path().join("manifest.json");
    std::fs::write(&csv_path, "unit,rent\n101,950\n").unwrap();
    std::fs::write(&json_path, "{}").unwrap();

    let previews = preview_csvs(
        &[csv_path.clone(), json_path],
        &ExtractionConfig::default(),
    );
    assert_eq!(previews.len(), 1);
    assert_eq!(previews[0].path, csv_path);
}
