//! Symlink-aware stat through every wrapper combination.
#![cfg(unix)]

use std::path::{Path, PathBuf};

use swapfs::*;
use tempfile::TempDir;

fn p(s: &str) -> &Path {
    Path::new(s)
}

/// Stats `file` and `link` through `fs`. With `link` set, the filesystem must
/// use the symlink-aware call and report the link itself.
fn check(label: &str, fs: &dyn Fs, file: &Path, link: Option<&Path>) {
    let expect_lstat = link.is_some();

    let (meta, used) = fs.lstat(file).unwrap();
    assert_eq!(used, expect_lstat, "{label}: {}", file.display());
    assert!(meta.is_file(), "{label}");

    if let Some(link) = link {
        let (meta, used) = fs.lstat(link).unwrap();
        assert!(used, "{label}");
        assert!(meta.is_symlink(), "{label}: expected the link itself");
    }

    let missing = file.with_file_name("this-should-not-exist.txt");
    assert!(fs.lstat(&missing).unwrap_err().is_not_found(), "{label}");
}

struct Fixture {
    dir: TempDir,
    mem: MemoryFs,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("felix.txt"), b"Hi, Felix!").unwrap();
        std::os::unix::fs::symlink("felix.txt", dir.path().join("symfelix.txt")).unwrap();

        let mem = MemoryFs::new();
        mem.create_dir(p("/lstate"), Permissions::default_dir())
            .unwrap();
        mem.write_file(p("/lstate/felixm.txt"), b"Hi, Felix!", Permissions::from_mode(0o777))
            .unwrap();

        Self { dir, mem }
    }

    fn file(&self) -> PathBuf {
        self.dir.path().join("felix.txt")
    }

    fn link(&self) -> PathBuf {
        self.dir.path().join("symfelix.txt")
    }
}

#[test]
fn os_backend_reports_links() {
    let fx = Fixture::new();
    check("os", &OsFs::new(), &fx.file(), Some(&fx.link()));
}

#[test]
fn overlay_over_disk_falls_through_to_base() {
    let fx = Fixture::new();
    let fs = CopyOnWriteFs::new(OsFs::new(), &fx.mem);
    check("cow(os, mem)", &fs, &fx.file(), Some(&fx.link()));
}

#[test]
fn overlay_with_disk_layer_uses_layer() {
    let fx = Fixture::new();
    let fs = CopyOnWriteFs::new(&fx.mem, OsFs::new());
    check("cow(mem, os)", &fs, &fx.file(), Some(&fx.link()));
}

#[test]
fn memory_only_overlay_never_lstats() {
    let fx = Fixture::new();
    let fs = CopyOnWriteFs::new(&fx.mem, MemoryFs::new());
    check("cow(mem, mem)", &fs, p("/lstate/felixm.txt"), None);
}

#[test]
fn base_path_over_disk_reports_links() {
    let fx = Fixture::new();
    let fs = BasePathFs::new(OsFs::new(), fx.dir.path());
    check("base(os)", &fs, p("felix.txt"), Some(p("symfelix.txt")));
}

#[test]
fn base_path_over_memory_never_lstats() {
    let fx = Fixture::new();
    let fs = BasePathFs::new(&fx.mem, "/lstate");
    check("base(mem)", &fs, p("felixm.txt"), None);
}

#[test]
fn read_only_forwards_capability() {
    let fx = Fixture::new();
    check("ro(os)", &ReadOnlyFs::new(OsFs::new()), &fx.file(), Some(&fx.link()));
    check("ro(mem)", &ReadOnlyFs::new(&fx.mem), p("/lstate/felixm.txt"), None);
}

#[test]
fn whiteout_hides_base_link() {
    let fx = Fixture::new();
    let fs = CopyOnWriteFs::new(OsFs::new(), MemoryFs::new());
    fs.remove(&fx.link()).unwrap();
    assert!(fs.lstat(&fx.link()).unwrap_err().is_not_found());
    assert!(fx.link().symlink_metadata().is_ok());
}

#[test]
fn walk_does_not_follow_links() {
    let fx = Fixture::new();
    let fs = BasePathFs::new(OsFs::new(), fx.dir.path());
    let mut seen = Vec::new();
    fs.walk(p("/"), |path, meta| {
        seen.push((path.to_path_buf(), meta.is_symlink()));
        Ok(Walk::Continue)
    })
    .unwrap();
    assert_eq!(
        seen,
        [
            (PathBuf::from("/"), false),
            (PathBuf::from("/felix.txt"), false),
            (PathBuf::from("/symfelix.txt"), true),
        ]
    );
}
