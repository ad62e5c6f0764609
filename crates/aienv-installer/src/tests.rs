use std::cell::Cell;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use aienv_core::{ArchiveType, InstallLayout, ProcessControl, Termination};
use anyhow::{anyhow, Result};
use semver::Version;

use super::*;
use crate::artifact::{build_expand_archive_command, build_tar_extract_command};
use crate::fs_utils::copy_dir_recursive;

static TEST_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_dir(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let sequence = TEST_ROOT_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "aienv-installer-tests-{label}-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ));
    fs::create_dir_all(&dir).expect("must create test dir");
    dir
}

fn test_layout() -> InstallLayout {
    let layout = InstallLayout::new(unique_dir("root"));
    layout.ensure_base_dirs().expect("must create dirs");
    layout
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("must create parent dir");
    }
    fs::write(path, contents).expect("must write file");
}

fn seed_installation(layout: &InstallLayout) {
    let root = layout.root();
    write_file(&root.join("src/main.py"), "print('old')\n");
    write_file(&root.join("src/lib/util.py"), "OLD = True\n");
    write_file(&root.join("config/settings.json"), "{\"theme\":\"old\"}");
    write_file(
        &root.join("version_config.json"),
        r#"{"metadata":{"version":"3.0.0"}}"#,
    );
    write_file(&root.join("run_ai_env.bat"), "@echo old launcher\r\n");
    write_file(&root.join("README.md"), "# old\n");
    write_file(&root.join("Projects/notes.txt"), "keep me\n");
}

/// Builds an unpacked archive tree and returns its directory.
fn staged_archive(dist_root: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = unique_dir("archive");
    for (rel, contents) in files {
        write_file(&dir.join(dist_root).join(rel), contents);
    }
    dir
}

fn drop_archive(layout: &InstallLayout, name: &str) -> UpdateCandidate {
    write_file(&layout.drop_dir().join(name), "archive bytes");
    let candidates = scan_for_updates(layout).expect("must scan");
    find_candidate(&candidates, name)
        .expect("candidate must be found")
        .clone()
}

fn copy_tree_extractor(tree: PathBuf) -> impl FnMut(&Path, &Path) -> Result<()> {
    move |_archive: &Path, dst: &Path| copy_dir_recursive(&tree, dst)
}

/// Every file and directory under `root` keyed by relative path; directories
/// end with `/` and map to no bytes.
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(base: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
        for entry in fs::read_dir(dir).expect("must read dir") {
            let path = entry.expect("must read entry").path();
            let rel = path
                .strip_prefix(base)
                .expect("must be under base")
                .to_string_lossy()
                .replace('\\', "/");
            if path.is_dir() {
                out.insert(format!("{rel}/"), Vec::new());
                walk(base, &path, out);
            } else {
                out.insert(rel, fs::read(&path).expect("must read file"));
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

fn without_backup(snapshot: BTreeMap<String, Vec<u8>>) -> BTreeMap<String, Vec<u8>> {
    snapshot
        .into_iter()
        .filter(|(path, _)| !path.starts_with("backup/"))
        .collect()
}

#[derive(Default)]
struct FakeControl {
    running: HashSet<u32>,
}

impl ProcessControl for FakeControl {
    fn terminate(&self, _pid: u32) -> Result<Termination> {
        Ok(Termination::NotFound)
    }

    fn is_running(&self, pid: u32) -> bool {
        self.running.contains(&pid)
    }
}

#[test]
fn scan_orders_unversioned_first_then_by_version_string() {
    let layout = test_layout();
    for name in ["AI_Environment_v3.0.21.zip", "setup_v2.1.0.zip", "tool.zip"] {
        write_file(&layout.drop_dir().join(name), "bytes");
    }

    let candidates = scan_for_updates(&layout).expect("must scan");
    let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["tool.zip", "setup_v2.1.0.zip", "AI_Environment_v3.0.21.zip"]
    );
    assert_eq!(candidates[0].version, None);
    assert_eq!(candidates[1].version.as_deref(), Some("2.1.0"));
    assert_eq!(candidates[2].version.as_deref(), Some("3.0.21"));
    assert_eq!(candidates[2].size, 5);

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn scan_ignores_directories_and_unknown_extensions() {
    let layout = test_layout();
    write_file(&layout.drop_dir().join("notes.txt"), "x");
    write_file(&layout.drop_dir().join("nested.zip/inner.txt"), "x");
    write_file(&layout.drop_dir().join("bundle_v1.2.3.tar.gz"), "x");

    let candidates = scan_for_updates(&layout).expect("must scan");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].name, "bundle_v1.2.3.tar.gz");
    assert_eq!(candidates[0].kind, ArchiveType::TarGz);

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn scan_of_missing_drop_dir_is_empty() {
    let layout = InstallLayout::new(unique_dir("no-drop"));
    assert!(scan_for_updates(&layout).expect("must scan").is_empty());
    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn find_candidate_ignores_case() {
    let layout = test_layout();
    write_file(&layout.drop_dir().join("Setup_v2.1.0.zip"), "x");
    let candidates = scan_for_updates(&layout).expect("must scan");

    assert!(find_candidate(&candidates, "setup_v2.1.0.ZIP").is_some());
    assert!(find_candidate(&candidates, "other.zip").is_none());

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn latest_candidate_compares_semantic_versions() {
    let layout = test_layout();
    for name in [
        "AI_Environment_v9.0.0.zip",
        "AI_Environment_v10.0.0.zip",
        "tool.zip",
    ] {
        write_file(&layout.drop_dir().join(name), "bytes");
    }

    let candidates = scan_for_updates(&layout).expect("must scan");
    assert_eq!(
        candidates.last().map(|c| c.name.as_str()),
        Some("AI_Environment_v9.0.0.zip")
    );
    let latest = latest_candidate(&candidates).expect("must pick a versioned archive");
    assert_eq!(latest.name, "AI_Environment_v10.0.0.zip");

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn latest_candidate_requires_a_parsable_version() {
    let layout = test_layout();
    for name in ["tool.zip", "bundle.tar.gz"] {
        write_file(&layout.drop_dir().join(name), "bytes");
    }

    let candidates = scan_for_updates(&layout).expect("must scan");
    assert_eq!(candidates.len(), 2);
    assert!(latest_candidate(&candidates).is_none());

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn selection_accepts_only_listed_numbers() {
    assert_eq!(parse_selection("1", 3), Some(0));
    assert_eq!(parse_selection(" 3 \n", 3), Some(2));
    assert_eq!(parse_selection("0", 3), None);
    assert_eq!(parse_selection("4", 3), None);
    assert_eq!(parse_selection("-1", 3), None);
    assert_eq!(parse_selection("two", 3), None);
    assert_eq!(parse_selection("", 3), None);
}

#[test]
fn confirmation_requires_explicit_yes() {
    assert!(parse_confirmation("y"));
    assert!(parse_confirmation(" YES \n"));
    assert!(!parse_confirmation(""));
    assert!(!parse_confirmation("n"));
    assert!(!parse_confirmation("yep"));
}

#[test]
fn backup_copies_existing_critical_paths_and_skips_absent_ones() {
    let layout = test_layout();
    seed_installation(&layout);
    write_file(&layout.backup_dir().join("stale.txt"), "from last run");

    let report = create_backup(&layout).expect("must back up");
    assert_eq!(
        report.copied,
        vec![
            "src",
            "config",
            "version_config.json",
            "run_ai_env.bat",
            "README.md"
        ]
    );
    assert_eq!(
        report.absent,
        vec![
            "setup_python_env.bat",
            "check_versions.bat",
            "PACKAGE_INFO.txt"
        ]
    );
    assert!(layout.backup_dir().join("src/lib/util.py").is_file());
    assert!(!layout.backup_dir().join("stale.txt").exists());
    assert!(!layout.backup_dir().join("Projects").exists());

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn restore_without_backup_fails() {
    let layout = test_layout();
    let err = restore_backup(&layout).expect_err("must fail without backup");
    assert!(err.to_string().contains("no backup available"));
    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn archive_without_distribution_root_leaves_tree_unchanged() {
    let layout = test_layout();
    seed_installation(&layout);
    let candidate = drop_archive(&layout, "AI_Environment_v3.0.21.zip");
    let tree = staged_archive("Wrong_Folder", &[("src/main.py", "print('new')\n")]);
    let before = snapshot(layout.root());

    let outcome = apply_update_with_hooks(
        &layout,
        &candidate,
        &FakeControl::default(),
        copy_tree_extractor(tree.clone()),
        replace_entry,
    );

    match outcome {
        UpdateOutcome::Failed {
            stage,
            message,
            rollback,
        } => {
            assert_eq!(stage, UpdateStage::Extract);
            assert!(message.contains("AI_Environment folder not found"));
            assert_eq!(rollback, RollbackStatus::NotNeeded);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(snapshot(layout.root()), before);

    let _ = fs::remove_dir_all(layout.root());
    let _ = fs::remove_dir_all(tree);
}

#[test]
fn failed_install_rolls_back_critical_paths_byte_for_byte() {
    let layout = test_layout();
    seed_installation(&layout);
    let candidate = drop_archive(&layout, "AI_Environment_v3.0.21.zip");
    let tree = staged_archive(
        "AI_Environment",
        &[
            ("README.md", "# new\n"),
            ("config/settings.json", "{\"theme\":\"new\"}"),
            ("setup_python_env.bat", "@echo setup\r\n"),
            ("src/main.py", "print('new')\n"),
            ("version_config.json", r#"{"metadata":{"version":"3.0.21"}}"#),
        ],
    );
    let before = snapshot(layout.root());

    let outcome = apply_update_with_hooks(
        &layout,
        &candidate,
        &FakeControl::default(),
        copy_tree_extractor(tree.clone()),
        |src: &Path, dest: &Path| {
            if dest.ends_with("src") {
                fs::remove_dir_all(dest)?;
                return Err(anyhow!("disk full"));
            }
            replace_entry(src, dest)
        },
    );

    match outcome {
        UpdateOutcome::Failed {
            stage,
            message,
            rollback,
        } => {
            assert_eq!(stage, UpdateStage::Install);
            assert!(message.contains("failed to install src"));
            assert!(message.contains("disk full"));
            assert!(matches!(rollback, RollbackStatus::Restored(_)));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert_eq!(without_backup(snapshot(layout.root())), before);
    assert!(layout.backup_dir().is_dir());
    assert!(!layout.root().join("setup_python_env.bat").exists());
    assert!(!layout.update_lock_path().exists());

    let _ = fs::remove_dir_all(layout.root());
    let _ = fs::remove_dir_all(tree);
}

#[test]
fn successful_update_replaces_entries_and_removes_backup() {
    let layout = test_layout();
    seed_installation(&layout);
    let candidate = drop_archive(&layout, "AI_Environment_v3.0.21.zip");
    let tree = staged_archive(
        "AI_Environment",
        &[
            ("src/app.py", "print('new')\n"),
            ("run_ai_env.bat", "@echo new launcher\r\n"),
            ("backup/ignored.txt", "x"),
            ("new_versions/ignored.zip", "x"),
        ],
    );

    let outcome = apply_update_with_hooks(
        &layout,
        &candidate,
        &FakeControl::default(),
        copy_tree_extractor(tree.clone()),
        replace_entry,
    );

    let UpdateOutcome::Installed {
        candidate: installed,
        report,
    } = outcome
    else {
        panic!("update must succeed");
    };
    assert_eq!(installed, "AI_Environment_v3.0.21.zip");
    assert!(report.launcher_replaced);
    let replaced: Vec<&str> = report.replaced.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(replaced, vec!["run_ai_env.bat", "src"]);

    let root = layout.root();
    assert!(!layout.backup_dir().exists());
    assert!(!layout.update_lock_path().exists());
    assert!(root.join("src/app.py").is_file());
    assert!(!root.join("src/main.py").exists(), "directories replace wholesale");
    assert_eq!(
        fs::read_to_string(root.join("run_ai_env.bat")).expect("must read launcher"),
        "@echo new launcher\r\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("README.md")).expect("must read readme"),
        "# old\n"
    );
    assert!(root.join("Projects/notes.txt").is_file());
    assert!(!layout.drop_dir().join("ignored.zip").exists());
    assert!(layout.drop_dir().join("AI_Environment_v3.0.21.zip").is_file());

    let _ = fs::remove_dir_all(root);
    let _ = fs::remove_dir_all(tree);
}

#[test]
fn reserved_names_are_skipped_regardless_of_case() {
    let layout = test_layout();
    seed_installation(&layout);
    write_file(&layout.backup_dir().join("src/main.py"), "print('old')\n");
    let candidate = drop_archive(&layout, "AI_Environment_v3.0.21.zip");
    let tree = staged_archive(
        "AI_Environment",
        &[
            ("Backup/evil.txt", "x"),
            ("NEW_VERSIONS/evil.zip", "x"),
            ("README.md", "# new\n"),
        ],
    );
    let staged = stage_update(&layout, &candidate, copy_tree_extractor(tree.clone()))
        .expect("must stage");
    let mut touched = Vec::new();

    let report = install_staged(&layout, &staged, |src: &Path, dest: &Path| {
        touched.push(dest.file_name().map(|name| name.to_string_lossy().into_owned()));
        replace_entry(src, dest)
    })
    .expect("must install");

    assert_eq!(touched, vec![Some("README.md".to_string())]);
    assert_eq!(report.replaced.len(), 1);
    assert!(layout.backup_dir().join("src/main.py").is_file());

    let _ = fs::remove_dir_all(layout.root());
    let _ = fs::remove_dir_all(tree);
}

#[cfg(unix)]
#[test]
fn backup_failure_aborts_before_extraction() {
    let layout = test_layout();
    seed_installation(&layout);
    fs::remove_file(layout.root().join("README.md")).expect("must remove readme");
    std::os::unix::fs::symlink(
        layout.root().join("missing-target.md"),
        layout.root().join("README.md"),
    )
    .expect("must create dangling symlink");
    let candidate = drop_archive(&layout, "AI_Environment_v3.0.21.zip");
    let extracted = Cell::new(false);

    let outcome = apply_update_with_hooks(
        &layout,
        &candidate,
        &FakeControl::default(),
        |_: &Path, _: &Path| {
            extracted.set(true);
            Ok(())
        },
        replace_entry,
    );

    match outcome {
        UpdateOutcome::Failed {
            stage,
            message,
            rollback,
        } => {
            assert_eq!(stage, UpdateStage::Backup);
            assert!(message.contains("failed to back up README.md"), "{message}");
            assert_eq!(rollback, RollbackStatus::NotNeeded);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!extracted.get());
    assert_eq!(
        fs::read_to_string(layout.root().join("src/main.py")).expect("must read src"),
        "print('old')\n"
    );
    assert!(!layout.update_lock_path().exists());

    let _ = fs::remove_dir_all(layout.root());
}

#[cfg(unix)]
#[test]
fn failed_rollback_is_reported_and_keeps_backup() {
    let layout = test_layout();
    seed_installation(&layout);
    let candidate = drop_archive(&layout, "AI_Environment_v3.0.21.zip");
    let tree = staged_archive(
        "AI_Environment",
        &[("README.md", "# new\n"), ("src/main.py", "print('new')\n")],
    );
    let backup_src = layout.backup_dir().join("src");

    let outcome = apply_update_with_hooks(
        &layout,
        &candidate,
        &FakeControl::default(),
        copy_tree_extractor(tree.clone()),
        |src: &Path, dest: &Path| {
            if dest.ends_with("src") {
                fs::remove_dir_all(&backup_src)?;
                std::os::unix::fs::symlink(layout.root().join("gone"), &backup_src)?;
                return Err(anyhow!("disk full"));
            }
            replace_entry(src, dest)
        },
    );

    match outcome {
        UpdateOutcome::Failed {
            stage, rollback, ..
        } => {
            assert_eq!(stage, UpdateStage::Install);
            match rollback {
                RollbackStatus::Failed(reason) => {
                    assert!(reason.contains("failed to restore src"), "{reason}");
                }
                other => panic!("rollback must fail, got {other:?}"),
            }
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(layout.backup_dir().is_dir());
    assert!(layout.backup_dir().join("config/settings.json").is_file());
    assert!(!layout.update_lock_path().exists());

    let _ = fs::remove_dir_all(layout.root());
    let _ = fs::remove_dir_all(tree);
}

#[test]
fn update_is_refused_while_another_installer_holds_the_lock() {
    let layout = test_layout();
    seed_installation(&layout);
    let candidate = drop_archive(&layout, "AI_Environment_v3.0.21.zip");
    write_file(&layout.update_lock_path(), "424242\n");
    let control = FakeControl {
        running: HashSet::from([424242]),
    };
    let extracted = Cell::new(false);

    let outcome = apply_update_with_hooks(
        &layout,
        &candidate,
        &control,
        |_: &Path, _: &Path| {
            extracted.set(true);
            Ok(())
        },
        replace_entry,
    );

    match outcome {
        UpdateOutcome::Failed { stage, message, .. } => {
            assert_eq!(stage, UpdateStage::Lock);
            assert!(message.contains("another update is already in progress"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!extracted.get());
    assert!(!layout.backup_dir().exists());
    assert!(layout.update_lock_path().is_file());

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn stale_lock_is_reclaimed_and_released_on_drop() {
    let layout = test_layout();
    write_file(&layout.update_lock_path(), "424242\n");

    {
        let lock = UpdateLock::acquire(&layout, &FakeControl::default())
            .expect("stale lock must be reclaimed");
        let owner = fs::read_to_string(lock.path()).expect("must read lock");
        assert_eq!(owner.trim(), std::process::id().to_string());
    }
    assert!(!layout.update_lock_path().exists());

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn fresh_lock_without_owner_pid_is_treated_as_held() {
    let layout = test_layout();
    write_file(&layout.update_lock_path(), "");

    let err = UpdateLock::acquire(&layout, &FakeControl::default())
        .expect_err("a lock being written must not be stolen");
    assert!(err.to_string().contains("another update is claiming the lock"));
    assert!(layout.update_lock_path().is_file());

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn old_lock_without_owner_pid_is_reclaimed() {
    let layout = test_layout();
    write_file(&layout.update_lock_path(), "garbage");
    fs::File::options()
        .write(true)
        .open(layout.update_lock_path())
        .expect("must open lock")
        .set_modified(SystemTime::now() - LOCK_WRITE_GRACE * 2)
        .expect("must backdate lock");

    let lock = UpdateLock::acquire(&layout, &FakeControl::default())
        .expect("old unreadable lock must be reclaimed");
    let owner = fs::read_to_string(lock.path()).expect("must read lock");
    assert_eq!(owner.trim(), std::process::id().to_string());
    drop(lock);

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn session_installs_after_selection_and_confirmation() {
    let layout = test_layout();
    for name in ["AI_Environment_v3.0.21.zip", "setup_v2.1.0.zip", "tool.zip"] {
        write_file(&layout.drop_dir().join(name), "bytes");
    }
    let mut input = Cursor::new("3\ny\n");
    let mut output = Vec::new();

    let outcome = run_update_session(&layout, &mut input, &mut output, |candidate| {
        UpdateOutcome::Installed {
            candidate: candidate.name.clone(),
            report: InstallReport::default(),
        }
    })
    .expect("session must run");

    assert_eq!(
        outcome,
        UpdateOutcome::Installed {
            candidate: "AI_Environment_v3.0.21.zip".to_string(),
            report: InstallReport::default(),
        }
    );
    let transcript = String::from_utf8(output).expect("utf8 output");
    assert!(transcript.contains("Select update to install (0-3): "));
    assert!(transcript.contains("Continue with installation? (y/N): "));

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn declined_confirmation_touches_nothing() {
    let layout = test_layout();
    seed_installation(&layout);
    write_file(&layout.drop_dir().join("AI_Environment_v3.0.21.zip"), "bytes");
    let before = snapshot(layout.root());

    for answers in ["1\nn\n", "1\n\n", "1\n", "0\n", "9\n", ""] {
        let mut input = Cursor::new(answers);
        let mut output = Vec::new();
        let outcome = run_update_session(&layout, &mut input, &mut output, |_| {
            panic!("must not apply for input {answers:?}")
        })
        .expect("session must run");
        assert_eq!(outcome, UpdateOutcome::Cancelled, "input {answers:?}");
    }
    assert_eq!(snapshot(layout.root()), before);

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn session_without_archives_reports_no_updates() {
    let layout = test_layout();
    let mut output = Vec::new();
    let outcome = run_update_session(&layout, &mut Cursor::new("1\n"), &mut output, |_| {
        panic!("nothing to apply")
    })
    .expect("session must run");

    assert_eq!(outcome, UpdateOutcome::NoUpdates);
    assert!(String::from_utf8(output)
        .expect("utf8 output")
        .contains("No update archives found"));

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn candidate_lines_flag_versions_newer_than_installed() {
    let candidates = vec![
        UpdateCandidate {
            path: PathBuf::from("tool.zip"),
            name: "tool.zip".to_string(),
            version: None,
            size: 0,
            kind: ArchiveType::Zip,
        },
        UpdateCandidate {
            path: PathBuf::from("setup_v2.1.0.zip"),
            name: "setup_v2.1.0.zip".to_string(),
            version: Some("2.1.0".to_string()),
            size: 3 * 1024 * 1024,
            kind: ArchiveType::Zip,
        },
        UpdateCandidate {
            path: PathBuf::from("AI_Environment_v3.0.21.zip"),
            name: "AI_Environment_v3.0.21.zip".to_string(),
            version: Some("3.0.21".to_string()),
            size: 0,
            kind: ArchiveType::Zip,
        },
    ];

    let lines = render_candidate_lines(&candidates, Some(&Version::new(3, 0, 0)));
    assert_eq!(
        lines,
        vec![
            "  1. tool.zip (unknown version, 0.0 MB)",
            "  2. setup_v2.1.0.zip (v2.1.0, 3.0 MB)",
            "  3. AI_Environment_v3.0.21.zip (v3.0.21, 0.0 MB) [newer]",
        ]
    );
    assert!(!render_candidate_lines(&candidates, None)
        .iter()
        .any(|line| line.ends_with("[newer]")));
}

#[test]
fn update_info_reports_installed_version_and_candidates() {
    let layout = test_layout();
    seed_installation(&layout);
    write_file(&layout.drop_dir().join("AI_Environment_v3.0.21.zip"), "bytes");

    let lines = update_info_lines(&layout);
    assert!(lines.iter().any(|line| line == "Installed version: 3.0.0"));
    assert!(lines.iter().any(|line| line == "Available updates: 1"));
    assert!(lines.iter().any(|line| line.ends_with("[newer]")));

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn tar_extract_command_targets_destination() {
    let command = build_tar_extract_command(Path::new("/drop/a.tar.gz"), Path::new("/tmp/x"));
    assert_eq!(command.get_program(), "tar");
    let args: Vec<String> = command
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    assert_eq!(args, vec!["-xf", "/drop/a.tar.gz", "-C", "/tmp/x"]);
}

#[test]
fn expand_archive_command_escapes_single_quotes() {
    let command =
        build_expand_archive_command(Path::new("C:/drop/it's.zip"), Path::new("C:/tmp/x"));
    assert_eq!(command.get_program(), "powershell");
    let args: Vec<String> = command
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    assert_eq!(args[0], "-NoProfile");
    assert_eq!(args[1], "-Command");
    assert_eq!(
        args[2],
        "Expand-Archive -LiteralPath 'C:/drop/it''s.zip' -DestinationPath 'C:/tmp/x' -Force"
    );
}
