//! Contract tests run against every backend.
//!
//! Each test executes the same steps on:
//! 1. `MemoryFs`
//! 2. `OsFs` confined to a temporary directory with `BasePathFs`
//! 3. `CopyOnWriteFs` with a read-only disk base and an in-memory layer
//!
//! and checks the backends agree.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use swapfs::*;
use tempfile::TempDir;

// =============================================================================
// Harness
// =============================================================================

/// The backends under test. Holds the temp dirs so they outlive the tests.
struct Backends {
    _dirs: Vec<TempDir>,
    list: Vec<(&'static str, Box<dyn Fs>)>,
}

impl Backends {
    fn new() -> Self {
        let disk = TempDir::new().unwrap();
        let base = TempDir::new().unwrap();

        let os: Box<dyn Fs> = Box::new(BasePathFs::new(OsFs::new(), disk.path()));
        let cow: Box<dyn Fs> = Box::new(
            OsFs::new()
                .layer(BasePathLayer::new(base.path()))
                .layer(ReadOnlyLayer)
                .layer(CopyOnWriteLayer::new(MemoryFs::new())),
        );

        Self {
            _dirs: vec![disk, base],
            list: vec![
                ("memory", Box::new(MemoryFs::new()) as Box<dyn Fs>),
                ("os", os),
                ("cow", cow),
            ],
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&'static str, &(dyn Fs + 'static))> {
        self.list.iter().map(|(name, fs)| (*name, &**fs))
    }
}

fn p(s: &str) -> &Path {
    Path::new(s)
}

fn create_with(fs: &dyn Fs, path: &str, content: &str) -> Box<dyn File> {
    let mut file = fs.create(p(path)).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Builds `<root>/more/subdirectories/for/testing/we` holding four small
/// files, and returns the path of `we`.
fn setup_test_files(fs: &dyn Fs, root: &str) -> String {
    let sub = format!("{root}/more/subdirectories/for/testing/we");
    fs.create_dir_all(p(&sub), Permissions::from_mode(0o700))
        .unwrap();
    for n in 1..=4 {
        let mut file = create_with(fs, &format!("{sub}/testfile{n}"), "");
        file.write_string(&format!("Testfile {n} content")).unwrap();
        file.close().unwrap();
    }
    sub
}

const HELLO: &str = "hello, world\n";

// =============================================================================
// Tests: Files
// =============================================================================

#[test]
fn create_then_stat() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        let mut file = create_with(fs, "/test.txt", HELLO);
        assert_eq!(file.name(), "/test.txt", "{name}");
        file.close().unwrap();

        let meta = fs.metadata(p("/test.txt")).unwrap();
        assert!(meta.is_file(), "{name}");
        assert_eq!(meta.name, "test.txt", "{name}");
        assert_eq!(meta.size, HELLO.len() as u64, "{name}");
    }
}

#[test]
fn create_replaces_content() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        create_with(fs, "/twice", "initial").close().unwrap();
        create_with(fs, "/twice", "second create").close().unwrap();
        assert_eq!(
            fs.read_to_string(p("/twice")).unwrap(),
            "second create",
            "{name}"
        );
    }
}

#[test]
fn zero_length_read_is_not_eof() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        let mut file = create_with(fs, "/lorem", "Lorem ipsum dolor sit amet, consectetur adipisicing elit");
        assert_eq!(file.read(&mut []).unwrap(), 0, "{name}");

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut buf = [0u8; 100];
        assert!(file.read(&mut buf).unwrap() > 0, "{name}");
        file.close().unwrap();
    }
}

#[test]
fn open_flags_append_and_truncate() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        let path = p("/flags");
        let mut file = fs
            .open_file(path, OpenFlags::CREATE, Permissions::from_mode(0o600))
            .unwrap();
        file.write_all(b"initial").unwrap();
        file.close().unwrap();

        let mut file = fs
            .open_file(path, OpenFlags::APPEND, Permissions::from_mode(0o600))
            .unwrap();
        file.write_all(b"|append").unwrap();
        file.close().unwrap();

        let mut file = fs.open(path).unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "initial|append", "{name}");
        file.close().unwrap();

        let truncating = OpenFlags {
            truncate: true,
            ..OpenFlags::READ_WRITE
        };
        let mut file = fs
            .open_file(path, truncating, Permissions::from_mode(0o600))
            .unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        assert!(contents.is_empty(), "{name}");
        file.close().unwrap();
    }
}

#[test]
fn exclusive_create_rejects_existing() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        create_with(fs, "/once", "x").close().unwrap();
        let err = fs
            .open_file(p("/once"), OpenFlags::CREATE_NEW, Permissions::default_file())
            .unwrap_err();
        assert!(err.is_already_exists(), "{name}: {err}");
    }
}

#[test]
fn open_missing_is_not_found() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        assert!(fs.open(p("/nope")).unwrap_err().is_not_found(), "{name}");
        assert!(fs.metadata(p("/nope")).unwrap_err().is_not_found(), "{name}");
    }
}

#[test]
fn rename_moves_and_replaces() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        fs.create_dir(p("/dir"), Permissions::default_dir()).unwrap();
        create_with(fs, "/dir/renamefrom", "from").close().unwrap();
        create_with(fs, "/dir/renameexists", "exists").close().unwrap();

        fs.rename(p("/dir/renamefrom"), p("/dir/renameto")).unwrap();
        create_with(fs, "/dir/renamefrom", "again").close().unwrap();
        fs.rename(p("/dir/renamefrom"), p("/dir/renameexists"))
            .unwrap();

        let names: Vec<_> = fs
            .read_dir(p("/dir"))
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, ["renameexists", "renameto"], "{name}");
        assert_eq!(fs.read_file(p("/dir/renameto")).unwrap(), b"from", "{name}");
        assert_eq!(
            fs.read_file(p("/dir/renameexists")).unwrap(),
            b"again",
            "{name}"
        );
    }
}

#[test]
fn rename_into_missing_directory_blames_destination() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        create_with(fs, "/src", "x").close().unwrap();
        let err = fs.rename(p("/src"), p("/nodir/dst")).unwrap_err();
        assert!(err.is_not_found(), "{name}: {err:?}");
        assert!(
            err.path().is_some_and(|path| path.starts_with("/nodir")),
            "{name}: {err:?}"
        );
        assert!(fs.exists(p("/src")).unwrap(), "{name}");
    }
}

#[test]
fn remove_file_and_directories() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        fs.create_dir(p("/tmp"), Permissions::default_dir()).unwrap();
        let mut names = TempNames::new();
        let mut file = fs.temp_file(p("/tmp"), "swapfs", &mut names).unwrap();
        let path = file.name().to_owned();
        file.close().unwrap();

        fs.remove(p(&path)).unwrap();
        assert!(fs.metadata(p(&path)).unwrap_err().is_not_found(), "{name}");
        assert!(fs.remove(p(&path)).unwrap_err().is_not_found(), "{name}");
        assert!(fs.read_dir(p("/tmp")).unwrap().is_empty(), "{name}");

        create_with(fs, "/tmp/keep", "x").close().unwrap();
        assert!(
            matches!(
                fs.remove(p("/tmp")),
                Err(FsError::DirectoryNotEmpty { .. })
            ),
            "{name}"
        );
        fs.remove_all(p("/tmp")).unwrap();
        assert!(!fs.exists(p("/tmp")).unwrap(), "{name}");
        fs.remove_all(p("/tmp")).unwrap();
    }
}

#[test]
fn truncate_changes_size_not_cursor() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        let mut file = fs.create(p("/trunc")).unwrap();
        let size = |file: &Box<dyn File>| file.metadata().unwrap().size;

        assert_eq!(size(&file), 0, "{name}");
        file.write_all(HELLO.as_bytes()).unwrap();
        assert_eq!(size(&file), 13, "{name}");
        file.truncate(10).unwrap();
        assert_eq!(size(&file), 10, "{name}");
        file.truncate(1024).unwrap();
        assert_eq!(size(&file), 1024, "{name}");
        file.truncate(0).unwrap();
        assert_eq!(size(&file), 0, "{name}");
        // The cursor is still past the old content.
        file.write_all(b"surprise!").unwrap();
        assert_eq!(size(&file), 13 + 9, "{name}");
        file.close().unwrap();
    }
}

#[test]
fn seek_table() {
    let backends = Backends::new();
    let end = HELLO.len() as u64;
    let table = [
        (SeekFrom::Current(0), end),
        (SeekFrom::Start(0), 0),
        (SeekFrom::Start(5), 5),
        (SeekFrom::End(0), end),
        (SeekFrom::End(-1), end - 1),
        (SeekFrom::Start(1 << 33), 1 << 33),
        (SeekFrom::End(1 << 33), (1 << 33) + end),
    ];
    for (name, fs) in backends.iter() {
        let mut file = create_with(fs, "/seek", HELLO);
        for (whence, expected) in table {
            assert_eq!(file.seek(whence).unwrap(), expected, "{name}: {whence:?}");
        }
        file.seek(SeekFrom::Start(3)).unwrap();
        assert!(file.seek(SeekFrom::Current(-4)).is_err(), "{name}");
        file.close().unwrap();
    }
}

#[test]
fn positioned_read_and_write() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        let mut file = create_with(fs, "/at", HELLO);
        let mut word = [0u8; 5];
        assert_eq!(file.read_at(&mut word, 7).unwrap(), 5, "{name}");
        assert_eq!(&word, b"world", "{name}");

        assert_eq!(file.write_at(b"WORLD", 7).unwrap(), 5, "{name}");
        file.close().unwrap();
        assert_eq!(
            fs.read_to_string(p("/at")).unwrap(),
            "hello, WORLD\n",
            "{name}"
        );
    }
}

#[test]
fn closed_handle_rejects_use() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        let mut file = create_with(fs, "/closed", "x");
        file.close().unwrap();
        assert!(
            matches!(file.close(), Err(FsError::FileClosed { .. })),
            "{name}"
        );
    }
}

#[test]
fn handle_access_follows_open_mode() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        create_with(fs, "/mode", "data").close().unwrap();

        let mut reader = fs.open(p("/mode")).unwrap();
        let err = FsError::from(reader.write(b"x").unwrap_err());
        assert!(
            matches!(
                &err,
                FsError::PermissionDenied { path, operation: "write" } if path == p("/mode")
            ),
            "{name}: {err:?}"
        );
        assert!(
            matches!(
                reader.write_at(b"x", 0),
                Err(FsError::PermissionDenied { .. })
            ),
            "{name}"
        );
        assert!(
            matches!(reader.truncate(0), Err(FsError::PermissionDenied { .. })),
            "{name}"
        );
        reader.close().unwrap();

        let mut writer = fs
            .open_file(p("/mode"), OpenFlags::APPEND, Permissions::default_file())
            .unwrap();
        let mut buf = [0u8; 4];
        let err = FsError::from(writer.read(&mut buf).unwrap_err());
        assert!(
            matches!(
                &err,
                FsError::PermissionDenied { path, operation: "read" } if path == p("/mode")
            ),
            "{name}: {err:?}"
        );
        assert!(
            matches!(
                writer.read_at(&mut buf, 0),
                Err(FsError::PermissionDenied { .. })
            ),
            "{name}"
        );
        writer.close().unwrap();

        assert_eq!(fs.read_file(p("/mode")).unwrap(), b"data", "{name}");
    }
}

#[test]
fn write_past_end_zero_fills_gap() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        let mut file = create_with(fs, "/gap", "abc");
        assert_eq!(file.seek(SeekFrom::Start(10)).unwrap(), 10, "{name}");
        file.write_all(b"xy").unwrap();
        file.close().unwrap();
        assert_eq!(
            fs.read_file(p("/gap")).unwrap(),
            b"abc\0\0\0\0\0\0\0xy",
            "{name}"
        );

        let file = create_with(fs, "/grown", "ab");
        file.truncate(6).unwrap();
        let mut tail = [0xffu8; 4];
        assert_eq!(file.read_at(&mut tail, 2).unwrap(), 4, "{name}");
        assert_eq!(tail, [0u8; 4], "{name}");
        drop(file);
        assert_eq!(fs.read_file(p("/grown")).unwrap(), b"ab\0\0\0\0", "{name}");
    }
}

// =============================================================================
// Tests: Directories
// =============================================================================

#[test]
fn readdir_names_in_test_tree() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        let sub = setup_test_files(fs, "/names");
        let parent = "/names/more/subdirectories/for/testing";

        let mut root = fs.open(p(parent)).unwrap();
        assert_eq!(root.read_dir_names(0).unwrap(), ["we"], "{name}");
        root.close().unwrap();

        let mut dir = fs.open(p(&sub)).unwrap();
        let mut names = dir.read_dir_names(0).unwrap();
        names.sort();
        assert_eq!(
            names,
            ["testfile1", "testfile2", "testfile3", "testfile4"],
            "{name}"
        );
        dir.close().unwrap();
    }
}

#[test]
fn readdir_pages_until_end() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        let sub = setup_test_files(fs, "/paging");
        let parent = "/paging/more/subdirectories/for/testing";

        let mut root = fs.open(p(parent)).unwrap();
        assert_eq!(root.read_dir(1).unwrap().len(), 1, "{name}");
        assert!(
            matches!(root.read_dir(5), Err(FsError::EndOfDirectory { .. })),
            "{name}"
        );
        root.close().unwrap();

        let mut dir = fs.open(p(&sub)).unwrap();
        assert_eq!(dir.read_dir(5).unwrap().len(), 4, "{name}");
        dir.close().unwrap();
    }
}

#[test]
fn readdir_paging_agrees_across_backends() {
    for count in 0..6 {
        let backends = Backends::new();
        let mut transcripts = Vec::new();
        for (_, fs) in backends.iter() {
            let sub = setup_test_files(fs, "/agree");
            let mut dir = fs.open(p(&sub)).unwrap();
            let transcript: Vec<_> = (0..6)
                .map(|_| match dir.read_dir(count) {
                    Ok(page) => format!("{} ok", page.len()),
                    Err(FsError::EndOfDirectory { .. }) => "end".to_owned(),
                    Err(e) => format!("error: {e}"),
                })
                .collect();
            dir.close().unwrap();
            transcripts.push(transcript);
        }
        assert!(
            transcripts.windows(2).all(|pair| pair[0] == pair[1]),
            "count {count}: {transcripts:?}"
        );
    }
}

#[test]
fn readdir_on_regular_file_fails() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        let mut file = create_with(fs, "/plain", "x");
        assert!(file.read_dir_names(0).is_err(), "{name}");
        assert!(file.read_dir(0).is_err(), "{name}");
        file.close().unwrap();
    }
}

#[test]
fn walk_output_agrees_across_backends() {
    let backends = Backends::new();
    let mut outputs = Vec::new();
    for (_, fs) in backends.iter() {
        setup_test_files(fs, "/walk");
        create_with(fs, "/walk/more/top", "top level").close().unwrap();

        let mut out = Vec::new();
        fs.walk(p("/walk"), |path, meta| {
            let size = if meta.is_dir() { 0 } else { meta.size };
            out.push(format!("{} {} {}", path.display(), meta.is_dir(), size));
            Ok(Walk::Continue)
        })
        .unwrap();
        outputs.push(out);
    }
    assert_eq!(outputs[0].len(), 11);
    assert_eq!(outputs[0][0], "/walk true 0");
    assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]), "{outputs:?}");
}

// =============================================================================
// Tests: Helpers
// =============================================================================

#[test]
fn dir_exists_and_kind_checks() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        fs.create_dir_all(p("/foo/bar"), Permissions::from_mode(0o777))
            .unwrap();
        for dir in ["/", "/foo", "/foo/", "/foo/bar", "/foo/bar/"] {
            assert!(fs.dir_exists(p(dir)).unwrap(), "{name}: {dir}");
            assert!(fs.is_dir(p(dir)).unwrap(), "{name}: {dir}");
        }
        for missing in ["/some-really-random-directory-name", "/some/really/random/name"] {
            assert!(!fs.dir_exists(p(missing)).unwrap(), "{name}: {missing}");
            assert!(fs.is_dir(p(missing)).unwrap_err().is_not_found(), "{name}");
        }
    }
}

#[test]
fn is_empty_for_files_and_dirs() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        fs.create_dir(p("/empty"), Permissions::default_dir()).unwrap();
        fs.create_dir(p("/zeros"), Permissions::default_dir()).unwrap();
        create_with(fs, "/zeros/a", "").close().unwrap();
        create_with(fs, "/full", "content").close().unwrap();

        assert!(fs.is_empty(p("/empty")).unwrap(), "{name}");
        assert!(!fs.is_empty(p("/zeros")).unwrap(), "{name}");
        assert!(fs.is_empty(p("/zeros/a")).unwrap(), "{name}");
        assert!(!fs.is_empty(p("/full")).unwrap(), "{name}");
        assert!(fs.is_empty(p("/missing")).unwrap_err().is_not_found(), "{name}");
    }
}

#[test]
fn exists_checks() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        create_with(fs, "/here", "").close().unwrap();
        fs.create_dir(p("/there"), Permissions::default_dir()).unwrap();
        assert!(fs.exists(p("/here")).unwrap(), "{name}");
        assert!(fs.exists(p("/there")).unwrap(), "{name}");
        assert!(!fs.exists(p("/nowhere")).unwrap(), "{name}");
    }
}

#[test]
fn write_reader_variants() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        fs.write_reader(p("/out/deep/data"), &mut &b"Testfile 1 content"[..])
            .unwrap();
        assert_eq!(
            fs.read_to_string(p("/out/deep/data")).unwrap(),
            "Testfile 1 content",
            "{name}"
        );
        fs.write_reader(p("/out/deep/data"), &mut &b"replaced"[..])
            .unwrap();
        assert_eq!(fs.read_file(p("/out/deep/data")).unwrap(), b"replaced");

        let err = fs
            .safe_write_reader(p("/out/deep/data"), &mut &b"nope"[..])
            .unwrap_err();
        assert!(err.is_already_exists(), "{name}");
        fs.safe_write_reader(p("/out/other/data"), &mut &b"fresh"[..])
            .unwrap();
        assert_eq!(fs.read_file(p("/out/other/data")).unwrap(), b"fresh");
    }
}

#[test]
fn content_search() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        let sub = setup_test_files(fs, "/search");
        let file = format!("{sub}/testfile3");
        assert!(fs.file_contains_bytes(p(&file), b"3 cont").unwrap(), "{name}");
        assert!(!fs.file_contains_bytes(p(&file), b"4 cont").unwrap(), "{name}");
        assert!(
            fs.file_contains_any_bytes(p(&file), &[&b"4"[..], &b"3"[..]])
                .unwrap(),
            "{name}"
        );
    }
}

#[test]
fn temp_dirs_are_unique() {
    let backends = Backends::new();
    for (name, fs) in backends.iter() {
        fs.create_dir(p("/tmp"), Permissions::default_dir()).unwrap();
        let mut names = TempNames::new();
        let a = fs.temp_dir(p("/tmp"), "felix", &mut names).unwrap();
        let b = fs.temp_dir(p("/tmp"), "felix", &mut names).unwrap();
        assert_ne!(a, b, "{name}");
        assert!(fs.dir_exists(&a).unwrap(), "{name}");
        assert!(fs.dir_exists(&b).unwrap(), "{name}");
    }
}

// =============================================================================
// Tests: Sharing
// =============================================================================

#[test]
fn shared_backend_across_threads() {
    use std::sync::Arc;

    let fs = Arc::new(MemoryFs::new());
    fs.create_dir(p("/shared"), Permissions::default_dir())
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let fs = Arc::clone(&fs);
            std::thread::spawn(move || {
                let path = format!("/shared/{i}");
                fs.write_file(p(&path), path.as_bytes(), Permissions::default_file())
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let fs: Arc<dyn Fs> = fs;
    assert_eq!(fs.read_dir(p("/shared")).unwrap().len(), 8);
    assert_eq!(fs.read_file(p("/shared/3")).unwrap(), b"/shared/3");
}
