//! Integration tests for codegrep
//!
//! These drive the real pipeline end to end: argv assembly, type-option
//! rewriting, clap parsing, configuration, and the parallel search over
//! temp directory trees.

use clap::Parser;
use codegrep::config::{apply_type_arguments, assemble_argv_at, CliArgs, SearchConfig};
use codegrep::coordinator::{SearchCoordinator, SearchSummary};
use codegrep::scanner::FileMatches;
use codegrep::types::TypeManager;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Run codegrep as the CLI would, returning per-file results sorted by
/// path plus the run summary.
fn run_cli(args: &[&str]) -> (Vec<FileMatches>, SearchSummary) {
    let mut argv: Vec<String> = std::iter::once("codegrep".to_string())
        .chain(args.iter().map(|s| s.to_string()))
        .collect();

    let mut types = TypeManager::with_default_types();
    apply_type_arguments(&mut argv, &mut types).expect("type arguments apply");

    let args = CliArgs::try_parse_from(&argv).expect("argv parses");
    let (config, types) = SearchConfig::build(args, types).expect("config builds");

    let mut results = Vec::new();
    let summary = SearchCoordinator::new(config, types)
        .run(|fm| results.push(fm))
        .expect("search runs");

    results.sort_by(|a, b| a.path.cmp(&b.path));
    (results, summary)
}

fn lines(fm: &FileMatches) -> Vec<u64> {
    fm.matches.iter().map(|m| m.line_number).collect()
}

#[test]
fn test_single_file_literal_match() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.c"), "foo\nFOO\nfoo bar\n").unwrap();
    let root = dir.path().to_str().unwrap();

    // Smart case stays case-sensitive here only with the heuristic off;
    // 'foo' is all-lowercase, so disable it to test exact matching.
    let (results, summary) = run_cli(&["--no-smart-case", "foo", root]);
    assert_eq!(summary.lines_matched, 2);
    assert_eq!(lines(&results[0]), vec![1, 3]);

    let (results, summary) = run_cli(&["-i", "foo", root]);
    assert_eq!(summary.lines_matched, 3);
    assert_eq!(lines(&results[0]), vec![1, 2, 3]);
}

#[test]
fn test_word_boundary_match() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("w.c"), "foo foobar barfoo foo!\n").unwrap();

    let (results, _) = run_cli(&[
        "-w",
        "--no-smart-case",
        "foo",
        dir.path().to_str().unwrap(),
    ]);

    // One match per line, at the leftmost standalone 'foo'.
    assert_eq!(results.len(), 1);
    let record = results[0].matches.iter().next().unwrap();
    assert_eq!(record.span_in_line(), (0, 3));
    assert_eq!(results[0].matches.len(), 1);
}

#[test]
fn test_whitespace_never_bridges_lines() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("m.c"), "a\nb\na b\n").unwrap();

    let (results, summary) = run_cli(&[r"a\s+b", dir.path().to_str().unwrap()]);

    assert_eq!(summary.lines_matched, 1);
    assert_eq!(lines(&results[0]), vec![3]);
}

#[test]
fn test_type_filter_and_type_add() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("x.cpp"), "hit\n").unwrap();
    fs::write(dir.path().join("x.txt"), "hit\n").unwrap();
    let root = dir.path().to_str().unwrap();

    // Only the cpp type enabled: the .txt file is invisible.
    let (results, _) = run_cli(&["--cpp", "hit", root]);
    assert_eq!(results.len(), 1);
    assert!(results[0].path.ends_with("x.cpp"));

    // Teaching cpp the txt extension brings it in.
    let (results, _) = run_cli(&["--type-add=cpp:ext:txt", "--cpp", "hit", root]);
    assert_eq!(results.len(), 2);
}

#[test]
fn test_ignore_dir_prunes_subtree() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::create_dir_all(dir.path().join("vendor")).unwrap();
    fs::write(dir.path().join("src/a.c"), "X marks\n").unwrap();
    fs::write(dir.path().join("vendor/a.c"), "X marks\n").unwrap();

    let (results, _) = run_cli(&[
        "--ignore-dir=vendor",
        "X",
        dir.path().to_str().unwrap(),
    ]);

    assert_eq!(results.len(), 1);
    assert!(results[0].path.ends_with("src/a.c"));
}

#[test]
fn test_smart_case_heuristic() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("s.c"), "Foo\nfoo\n").unwrap();
    let root = dir.path().to_str().unwrap();

    // Mixed-case pattern: sensitive.
    let (results, _) = run_cli(&["Foo", root]);
    assert_eq!(lines(&results[0]), vec![1]);

    // Lowercase pattern: the heuristic kicks in, matching both.
    let (results, _) = run_cli(&["foo", root]);
    assert_eq!(lines(&results[0]), vec![1, 2]);

    // Heuristic off: lowercase pattern is sensitive again.
    let (results, _) = run_cli(&["--no-smart-case", "foo", root]);
    assert_eq!(lines(&results[0]), vec![2]);
}

#[test]
fn test_exclude_and_include_globs() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("app.js"), "target\n").unwrap();
    fs::write(dir.path().join("app.min.js"), "target\n").unwrap();
    fs::write(dir.path().join("lib.py"), "target\n").unwrap();
    let root = dir.path().to_str().unwrap();

    let (results, _) = run_cli(&["--exclude=*.min.js", "target", root]);
    let names: Vec<_> = results
        .iter()
        .map(|r| r.path.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["app.js", "lib.py"]);

    let (results, _) = run_cli(&["--include=*.js", "target", root]);
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.path.to_str().unwrap().ends_with("js")));
}

#[test]
fn test_firstlinematch_type() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("tool"), "#!/usr/bin/env python\nneedle\n").unwrap();
    fs::write(dir.path().join("other"), "just text\nneedle\n").unwrap();

    let (results, _) = run_cli(&["needle", dir.path().to_str().unwrap()]);

    // The shebang claims 'tool' for the python type; 'other' stays
    // unrecognized and unscanned.
    assert_eq!(results.len(), 1);
    assert!(results[0].path.ends_with("tool"));
}

#[test]
fn test_deterministic_line_sets_across_runs() {
    let dir = tempdir().unwrap();
    for i in 0..20 {
        let body = format!("pad\nneedle {}\npad\nneedle again\n", i);
        fs::write(dir.path().join(format!("f{}.c", i)), body).unwrap();
    }
    let root = dir.path().to_str().unwrap();

    let collect = || {
        let (results, _) = run_cli(&["needle", root]);
        results
            .iter()
            .flat_map(|fm| {
                let path = fm.path.clone();
                fm.matches
                    .iter()
                    .map(move |m| (path.clone(), m.line_number))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
    };

    let first = collect();
    let second = collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 40);
}

#[test]
fn test_rc_files_feed_the_argv() {
    let home = tempdir().unwrap();
    let project = tempdir().unwrap();
    fs::write(
        home.path().join(".ucgrc"),
        "# user defaults\n--type-set=notes:ext:note\n",
    )
    .unwrap();
    fs::write(project.path().join(".ucgrc"), "--notes\n").unwrap();

    let search_root = tempdir().unwrap();
    fs::write(search_root.path().join("todo.note"), "remember\n").unwrap();
    fs::write(search_root.path().join("todo.c"), "remember\n").unwrap();

    let cli = vec![
        "codegrep".to_string(),
        "remember".to_string(),
        search_root.path().to_str().unwrap().to_string(),
    ];
    let mut argv = assemble_argv_at(
        &cli,
        Some(home.path().to_path_buf()),
        Some(project.path().to_path_buf()),
    )
    .unwrap();

    let mut types = TypeManager::with_default_types();
    apply_type_arguments(&mut argv, &mut types).unwrap();
    let args = CliArgs::try_parse_from(&argv).unwrap();
    let (config, types) = SearchConfig::build(args, types).unwrap();

    let mut results = Vec::new();
    SearchCoordinator::new(config, types)
        .run(|fm| results.push(fm))
        .unwrap();

    // The user rc defined the type, the project rc enabled it (narrowing
    // the selection), so only the .note file is searched.
    assert_eq!(results.len(), 1);
    assert!(results[0].path.ends_with("todo.note"));
}

#[test]
fn test_hard_linked_tree_scanned_once() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("one.c");
    fs::write(&original, "twin\n").unwrap();
    fs::hard_link(&original, dir.path().join("two.c")).unwrap();

    let (results, _) = run_cli(&["twin", dir.path().to_str().unwrap()]);
    assert_eq!(results.len(), 1);
}

#[test]
fn test_symlink_loop_terminates() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("a.c"), "deep\n").unwrap();
    // A directory symlink pointing back up; must not loop (and is not
    // followed under the default policy anyway).
    std::os::unix::fs::symlink(dir.path(), sub.join("loop")).unwrap();

    let (results, summary) = run_cli(&["deep", dir.path().to_str().unwrap()]);
    assert!(summary.completed);
    assert_eq!(results.len(), 1);
}

#[test]
fn test_no_recurse_stays_at_roots() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("top.c"), "here\n").unwrap();
    fs::write(dir.path().join("sub/deep.c"), "here\n").unwrap();

    let (results, _) = run_cli(&["-n", "here", dir.path().to_str().unwrap()]);
    assert_eq!(results.len(), 1);
    assert!(results[0].path.ends_with("top.c"));
}

#[test]
fn test_column_values() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("c.c"), "ab needle\n").unwrap();

    let (results, _) = run_cli(&["needle", dir.path().to_str().unwrap()]);
    let record = results[0].matches.iter().next().unwrap();
    assert_eq!(record.column(), 4);
}

#[test]
fn test_binary_files_are_skipped() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("bin.c"), b"needle\x00needle\n").unwrap();
    fs::write(dir.path().join("text.c"), b"needle\n").unwrap();

    let (results, _) = run_cli(&["needle", dir.path().to_str().unwrap()]);
    assert_eq!(results.len(), 1);
    assert!(results[0].path.ends_with("text.c"));
}

#[test]
fn test_vendor_subtree_results_only() {
    // Ensure an excluded directory produces no records even when deeply
    // nested matches exist inside it.
    let dir = tempdir().unwrap();
    let nested = dir.path().join("vendor/deep/deeper");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("hidden.c"), "X\n").unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/seen.c"), "X\n").unwrap();

    let (results, _) = run_cli(&[
        "--ignore-dir=vendor",
        "X",
        dir.path().to_str().unwrap(),
    ]);
    let paths: Vec<&Path> = results.iter().map(|r| r.path.as_path()).collect();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].ends_with("src/seen.c"));
}
