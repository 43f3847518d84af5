use {
    rotalog::{Compression, LogError, RotatingFileSinkBuilder, RotationSize, Severity, Sink},
    std::{
        collections::HashSet,
        fs,
        io::{Read, Write},
        path::{Path, PathBuf},
        sync::Arc,
        thread,
    },
};

fn generation(path: &Path, index: usize) -> PathBuf {
    PathBuf::from(format!("{}.{index}", path.display()))
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

fn file_count(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().flatten().count()
}

#[test]
fn rollover_shifts_every_generation_up_by_one() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    fs::write(&path, "aaaaaaaaaa").unwrap();
    fs::write(generation(&path, 1), "bbbbbbbbbb").unwrap();
    fs::write(generation(&path, 2), "cccccccccc").unwrap();

    let sink = RotatingFileSinkBuilder::new(&path)
        .max_backup_count(3)
        .rollover_on_start(false)
        .build()
        .unwrap();
    assert_eq!(sink.current_size(), 10);

    sink.rollover().unwrap();

    assert_eq!(read(&generation(&path, 1)), "aaaaaaaaaa");
    assert_eq!(read(&generation(&path, 2)), "bbbbbbbbbb");
    assert_eq!(read(&generation(&path, 3)), "cccccccccc");
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    assert_eq!(sink.current_size(), 0);
}

#[test]
fn existing_file_is_archived_when_sink_is_built() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    fs::write(&path, "previous run\n").unwrap();

    let sink = RotatingFileSinkBuilder::new(&path).max_backup_count(5).build().unwrap();

    assert_eq!(read(&generation(&path, 1)), "previous run\n");
    assert_eq!(read(&path), "");
    assert_eq!(sink.current_size(), 0);
    assert_eq!(sink.generations().unwrap(), vec![generation(&path, 1)]);
}

#[test]
fn existing_file_is_continued_when_start_rollover_is_disabled() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    fs::write(&path, "previous run\n").unwrap();

    let sink = RotatingFileSinkBuilder::new(&path).rollover_on_start(false).build().unwrap();
    sink.append(Severity::Info, "this run").unwrap();

    assert_eq!(read(&path), "previous run\nthis run\n");
    assert!(!generation(&path, 1).exists());
}

#[test]
fn retention_keeps_exactly_max_backup_count_generations() {
    for max in [0usize, 1, 2, 4] {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("app.log");
        let sink = RotatingFileSinkBuilder::new(&path).max_backup_count(max).build().unwrap();

        let rollovers = max + 3;
        for k in 0..rollovers {
            sink.append(Severity::Info, &format!("run{k}")).unwrap();
            sink.rollover().unwrap();
        }

        assert_eq!(file_count(tmp.path()), max + 1, "max_backup_count = {max}");
        assert_eq!(read(&path), "");
        for i in 1..=max {
            assert_eq!(read(&generation(&path, i)), format!("run{}\n", rollovers - i));
        }
        assert!(!generation(&path, max + 1).exists());
    }
}

#[test]
fn crossing_the_size_bound_rotates_once_before_writing() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    let sink = RotatingFileSinkBuilder::new(&path)
        .max_file_size(RotationSize::Bytes(100))
        .max_backup_count(3)
        .build()
        .unwrap();

    // 29 characters plus the newline: 30 bytes per record.
    let line = "x".repeat(29);
    for _ in 0..3 {
        sink.append(Severity::Info, &line).unwrap();
    }
    assert_eq!(sink.current_size(), 90);
    assert!(!generation(&path, 1).exists());

    sink.append(Severity::Info, &line).unwrap();
    assert_eq!(fs::metadata(generation(&path, 1)).unwrap().len(), 90);
    assert_eq!(fs::metadata(&path).unwrap().len(), 30);
    assert!(!generation(&path, 2).exists());

    for _ in 0..20 {
        sink.append(Severity::Info, &line).unwrap();
        assert!(fs::metadata(&path).unwrap().len() <= 100);
    }
}

#[test]
fn oversized_record_goes_into_an_empty_file_without_an_empty_generation() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    let sink = RotatingFileSinkBuilder::new(&path)
        .max_file_size(RotationSize::Bytes(10))
        .build()
        .unwrap();

    let big = "y".repeat(50);
    sink.append(Severity::Info, &big).unwrap();
    assert_eq!(sink.current_size(), 51);
    assert!(!generation(&path, 1).exists());

    sink.append(Severity::Info, &big).unwrap();
    assert_eq!(fs::metadata(generation(&path, 1)).unwrap().len(), 51);
    assert_eq!(fs::metadata(&path).unwrap().len(), 51);
}

#[test]
fn zero_backups_discards_the_active_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    let sink = RotatingFileSinkBuilder::new(&path)
        .max_file_size(RotationSize::Bytes(20))
        .max_backup_count(0)
        .build()
        .unwrap();

    sink.append(Severity::Info, "first record..").unwrap();
    sink.append(Severity::Info, "second record.").unwrap();

    assert_eq!(read(&path), "second record.\n");
    assert_eq!(file_count(tmp.path()), 1);
}

#[test]
fn restart_without_backups_continues_the_previous_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    fs::write(&path, "previous run\n").unwrap();

    let sink = RotatingFileSinkBuilder::new(&path).max_backup_count(0).build().unwrap();
    assert_eq!(sink.current_size(), 13);
    sink.append(Severity::Info, "this run").unwrap();

    assert_eq!(read(&path), "previous run\nthis run\n");
    assert_eq!(file_count(tmp.path()), 1);
}

#[test]
fn stale_generations_beyond_retention_are_removed() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    fs::write(&path, "current").unwrap();
    fs::write(generation(&path, 7), "from a run with more backups").unwrap();
    fs::write(tmp.path().join("unrelated.txt"), "keep me").unwrap();

    let sink = RotatingFileSinkBuilder::new(&path).max_backup_count(2).build().unwrap();

    assert!(!generation(&path, 7).exists());
    assert_eq!(read(&generation(&path, 1)), "current");
    assert!(tmp.path().join("unrelated.txt").exists());
    assert_eq!(sink.generations().unwrap().len(), 1);
}

#[test]
fn sink_floor_filters_appends() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    let sink = RotatingFileSinkBuilder::new(&path)
        .min_severity(Severity::Warning)
        .build()
        .unwrap();

    sink.append(Severity::Debug, "debug").unwrap();
    sink.append(Severity::Info, "info").unwrap();
    sink.append(Severity::Warning, "warning").unwrap();
    sink.append(Severity::Critical, "critical").unwrap();

    assert_eq!(read(&path), "warning\ncritical\n");
}

#[test]
fn missing_directories_are_created() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("deeper").join("app.log");

    let sink = RotatingFileSinkBuilder::new(&path).build().unwrap();
    sink.append(Severity::Info, "hello").unwrap();

    assert_eq!(read(&path), "hello\n");
}

#[test]
fn directory_collision_fails_the_build() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("logs"), "a regular file").unwrap();

    let err = RotatingFileSinkBuilder::new(tmp.path().join("logs").join("app.log"))
        .build()
        .unwrap_err();
    assert!(matches!(err, LogError::DirectoryCreation { .. }), "{err:?}");
}

#[test]
fn invalid_policies_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");

    let err = RotatingFileSinkBuilder::new(&path)
        .max_file_size(RotationSize::Bytes(0))
        .build()
        .unwrap_err();
    assert!(matches!(err, LogError::InvalidConfiguration(_)));
    assert!(!path.exists());

    let err = RotatingFileSinkBuilder::new("").build().unwrap_err();
    assert!(matches!(err, LogError::InvalidConfiguration(_)));
}

#[test]
fn gzip_compresses_rotated_generations() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    let compressed = |index: usize| PathBuf::from(format!("{}.{index}.gz", path.display()));
    fs::write(&path, "old run\n").unwrap();
    fs::write(compressed(7), "left by a run with more backups").unwrap();

    let sink = RotatingFileSinkBuilder::new(&path)
        .max_backup_count(2)
        .compression(Compression::Gzip)
        .build()
        .unwrap();
    assert!(!compressed(7).exists());
    sink.append(Severity::Info, "newer run").unwrap();
    sink.rollover().unwrap();

    let gunzip = |p: PathBuf| {
        let mut text = String::new();
        flate2::read::GzDecoder::new(fs::File::open(p).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        text
    };
    assert_eq!(gunzip(compressed(1)), "newer run\n");
    assert_eq!(gunzip(compressed(2)), "old run\n");
    assert!(!generation(&path, 1).exists());
    assert_eq!(sink.generations().unwrap(), vec![compressed(1), compressed(2)]);

    // Keep rotating past the retention bound: the oldest archive is evicted.
    for k in 0..3 {
        sink.append(Severity::Info, &format!("run{k}")).unwrap();
        sink.rollover().unwrap();
    }
    assert_eq!(gunzip(compressed(1)), "run2\n");
    assert_eq!(gunzip(compressed(2)), "run1\n");
    assert!(!compressed(3).exists());
    assert_eq!(sink.generations().unwrap(), vec![compressed(1), compressed(2)]);
    assert_eq!(file_count(tmp.path()), 3);
}

#[cfg(unix)]
#[test]
fn failed_compression_still_writes_the_record() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    let sink = RotatingFileSinkBuilder::new(&path)
        .max_file_size(RotationSize::Bytes(20))
        .max_backup_count(2)
        .compression(Compression::Gzip)
        .build()
        .unwrap();
    // A dangling link where the archive should go makes compression fail.
    std::os::unix::fs::symlink(
        tmp.path().join("missing").join("target"),
        format!("{}.1.gz", path.display()),
    )
    .unwrap();

    sink.append(Severity::Info, "first record..").unwrap();
    let err = sink.append(Severity::Info, "second record.").unwrap_err();

    assert!(matches!(err, LogError::SinkWrite { .. }), "{err:?}");
    assert_eq!(read(&path), "second record.\n");
    assert_eq!(sink.current_size(), 15);
    assert_eq!(read(&generation(&path, 1)), "first record..\n");
}

#[cfg(unix)]
#[test]
fn file_mode_is_applied_to_new_active_files() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    let sink = RotatingFileSinkBuilder::new(&path).file_mode(0o600).build().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);

    sink.rollover().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);
}

#[test]
fn writer_interface_applies_the_same_bound() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("raw.log");
    let mut sink = RotatingFileSinkBuilder::new(&path)
        .max_file_size(RotationSize::Bytes(16))
        .build()
        .unwrap();

    writeln!(sink, "0123456789").unwrap();
    writeln!(sink, "abcdefghij").unwrap();
    sink.flush().unwrap();

    assert_eq!(read(&generation(&path, 1)), "0123456789\n");
    assert_eq!(read(&path), "abcdefghij\n");
}

#[test]
fn concurrent_appends_never_overfill_a_generation() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("app.log");
    let sink = Arc::new(
        RotatingFileSinkBuilder::new(&path)
            .max_file_size(RotationSize::Bytes(200))
            .max_backup_count(1000)
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for i in 0..100 {
                    sink.append(Severity::Info, &format!("thread-{t}-record-{i:04}")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut files = sink.generations().unwrap();
    files.push(path.clone());
    let mut lines = HashSet::new();
    for file in files {
        let text = read(&file);
        assert!(text.len() <= 200, "{} holds {} bytes", file.display(), text.len());
        for line in text.lines() {
            assert!(lines.insert(line.to_string()), "duplicate line {line}");
        }
    }
    assert_eq!(lines.len(), 400);
}
