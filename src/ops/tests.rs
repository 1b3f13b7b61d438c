// src/ops/tests.rs

use super::paste::{paste, PasteRequest};
use super::*;
use crate::config::{ConnectorOptions, PermRule};
use crate::connector::request::RequestParams;
use std::path::PathBuf;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    connector: Connector,
}

impl Fixture {
    fn new(configure: impl FnOnce(&mut ConnectorOptions)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut options = ConnectorOptions::with_root(dir.path());
        options.tmb_dir = None;
        configure(&mut options);
        let connector = Connector::new(options).unwrap();
        Self {
            _dir: dir,
            connector,
        }
    }

    fn root(&self) -> PathBuf {
        self.connector.root().to_path_buf()
    }

    fn id(&self, rel: &str) -> String {
        if rel.is_empty() {
            codec::encode(&self.root())
        } else {
            codec::encode(&self.root().join(rel))
        }
    }

    fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn dir(&self, rel: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }
}

fn ctx() -> RequestContext {
    RequestContext::new(RequestParams::default(), true)
}

fn protect(pattern: &str) -> PermRule {
    PermRule {
        pattern: pattern.to_string(),
        read: None,
        write: None,
        rm: Some(false),
    }
}

// ============================================================================
// rename
// ============================================================================

#[test]
fn test_rename_selects_new_identifier() {
    let fx = Fixture::new(|_| {});
    fx.file("docs/old.txt", "x");
    let mut ctx = ctx();

    rename::rename(&fx.connector, &mut ctx, &fx.id("docs"), &fx.id("docs/old.txt"), "new.txt").unwrap();

    assert!(fx.root().join("docs/new.txt").is_file());
    assert!(!fx.root().join("docs/old.txt").exists());
    assert_eq!(ctx.response.select, Some(vec![fx.id("docs/new.txt")]));
    assert!(ctx.response.cdc.is_some());
    // Files do not trigger a tree
    assert!(ctx.response.tree.is_none());
}

#[test]
fn test_rename_directory_includes_tree() {
    let fx = Fixture::new(|_| {});
    fx.dir("a");
    let mut ctx = ctx();

    rename::rename(&fx.connector, &mut ctx, &fx.id(""), &fx.id("a"), "b").unwrap();
    assert!(ctx.response.tree.is_some());
}

#[test]
fn test_rename_rejections() {
    let fx = Fixture::new(|o| o.perms = vec![protect("^/locked\\.txt$")]);
    fx.file("a.txt", "a");
    fx.file("b.txt", "b");
    fx.file("locked.txt", "l");
    let root = fx.id("");

    let bad_name = rename::rename(&fx.connector, &mut ctx(), &root, &fx.id("a.txt"), "x/y");
    assert!(matches!(bad_name, Err(ConnectorError::InvalidName)));

    let hidden = rename::rename(&fx.connector, &mut ctx(), &root, &fx.id("a.txt"), ".a");
    assert!(matches!(hidden, Err(ConnectorError::InvalidName)));

    let taken = rename::rename(&fx.connector, &mut ctx(), &root, &fx.id("a.txt"), "b.txt");
    assert!(matches!(taken, Err(ConnectorError::AlreadyExists)));

    let locked = rename::rename(&fx.connector, &mut ctx(), &root, &fx.id("locked.txt"), "c.txt");
    assert!(matches!(locked, Err(ConnectorError::AccessDenied)));

    let missing = rename::rename(&fx.connector, &mut ctx(), &root, "deadbeef", "c.txt");
    assert!(matches!(missing, Err(ConnectorError::NotFound)));

    assert!(fx.root().join("a.txt").exists());
}

// ============================================================================
// mkdir / mkfile
// ============================================================================

#[test]
fn test_mkdir_and_mkfile() {
    let fx = Fixture::new(|_| {});
    let root = fx.id("");

    let mut dir_ctx = ctx();
    create::mkdir(&fx.connector, &mut dir_ctx, &root, "photos").unwrap();
    assert!(fx.root().join("photos").is_dir());
    assert_eq!(dir_ctx.response.select, Some(vec![fx.id("photos")]));
    assert!(dir_ctx.response.tree.is_some());

    let mut file_ctx = ctx();
    create::mkfile(&fx.connector, &mut file_ctx, &root, "notes.txt").unwrap();
    assert!(fx.root().join("notes.txt").is_file());
    assert_eq!(file_ctx.response.select, Some(vec![fx.id("notes.txt")]));
    assert!(file_ctx.response.tree.is_none());

    let again = create::mkfile(&fx.connector, &mut ctx(), &root, "photos");
    assert!(matches!(again, Err(ConnectorError::AlreadyExists)));
}

#[cfg(unix)]
#[test]
fn test_created_entries_use_configured_modes() {
    use std::os::unix::fs::PermissionsExt;

    let fx = Fixture::new(|o| {
        o.dir_mode = 0o700;
        o.file_mode = 0o600;
    });
    create::mkdir(&fx.connector, &mut ctx(), &fx.id(""), "private").unwrap();
    create::mkfile(&fx.connector, &mut ctx(), &fx.id(""), "secret.txt").unwrap();

    let dir_mode = fs::metadata(fx.root().join("private")).unwrap().permissions().mode();
    let file_mode = fs::metadata(fx.root().join("secret.txt")).unwrap().permissions().mode();
    assert_eq!(dir_mode & 0o777, 0o700);
    assert_eq!(file_mode & 0o777, 0o600);
}

#[test]
fn test_mkdir_needs_write_on_parent() {
    let fx = Fixture::new(|o| o.defaults.write = false);
    let result = create::mkdir(&fx.connector, &mut ctx(), &fx.id(""), "x");
    assert!(matches!(result, Err(ConnectorError::AccessDenied)));

    let fx = Fixture::new(|_| {});
    let result = create::mkdir(&fx.connector, &mut ctx(), "nope", "x");
    assert!(matches!(result, Err(ConnectorError::InvalidParameters)));
}

// ============================================================================
// rm
// ============================================================================

#[test]
fn test_rm_partial_failure() {
    let fx = Fixture::new(|o| o.perms = vec![protect("^/docs/protected\\.txt$")]);
    fx.file("docs/a.txt", "a");
    fx.file("docs/b.txt", "b");
    fx.file("docs/protected.txt", "p");
    let targets = vec![fx.id("docs/a.txt"), fx.id("docs/protected.txt"), fx.id("docs/b.txt")];

    let mut ctx = ctx();
    let result = remove::rm(&fx.connector, &mut ctx, &fx.id("docs"), &targets);

    match result {
        Err(e) => assert_eq!(e.to_string(), "Some files were not removed"),
        Ok(()) => panic!("Expected a partial failure"),
    }
    assert!(!fx.root().join("docs/a.txt").exists());
    assert!(!fx.root().join("docs/b.txt").exists());
    assert!(fx.root().join("docs/protected.txt").exists());
    assert_eq!(ctx.errors.len(), 1);
    assert!(matches!(
        ctx.errors.get(&fx.root().join("docs/protected.txt")),
        Some(ConnectorError::AccessDenied)
    ));
    assert!(ctx.response.tree.is_some());
}

#[test]
fn test_rm_all_failed() {
    let fx = Fixture::new(|o| o.defaults.rm = false);
    fx.file("a.txt", "a");

    let result = remove::rm(&fx.connector, &mut ctx(), &fx.id(""), &[fx.id("a.txt")]);
    assert_eq!(result.unwrap_err().to_string(), "Unable to remove files");
}

#[test]
fn test_rm_directory_recursively() {
    let fx = Fixture::new(|_| {});
    fx.file("tree/a/b/c.txt", "c");
    fx.file("tree/d.txt", "d");

    remove::rm(&fx.connector, &mut ctx(), &fx.id(""), &[fx.id("tree")]).unwrap();
    assert!(!fx.root().join("tree").exists());
}

#[test]
fn test_rm_refuses_directory_with_hidden_entries() {
    let fx = Fixture::new(|_| {});
    fx.file("tree/visible.txt", "v");
    fx.file("tree/deep/.secret", "s");

    let mut ctx = ctx();
    let result = remove::rm(&fx.connector, &mut ctx, &fx.id(""), &[fx.id("tree")]);

    assert!(result.is_err());
    assert!(fx.root().join("tree/visible.txt").exists());
    assert!(fx.root().join("tree/deep/.secret").exists());
    assert!(matches!(
        ctx.errors.get(&fx.root().join("tree")),
        Some(ConnectorError::HiddenEntries)
    ));
}

#[cfg(unix)]
#[test]
fn test_rm_symlink_does_not_touch_target() {
    let fx = Fixture::new(|_| {});
    let target = fx.file("keep/data.txt", "d");
    std::os::unix::fs::symlink(fx.root().join("keep"), fx.root().join("link")).unwrap();

    remove::rm(&fx.connector, &mut ctx(), &fx.id(""), &[fx.id("link")]).unwrap();
    assert!(fx.root().join("link").symlink_metadata().is_err());
    assert!(target.exists());
}

// ============================================================================
// paste
// ============================================================================

fn paste_request<'a>(
    current: &'a str,
    src: &'a str,
    dst: &'a str,
    targets: &'a [String],
    cut: bool,
) -> PasteRequest<'a> {
    PasteRequest {
        current,
        src,
        dst,
        targets,
        cut,
    }
}

#[test]
fn test_paste_copy_files_and_directories() {
    let fx = Fixture::new(|_| {});
    fx.file("src/a.txt", "a");
    fx.file("src/folder/nested.txt", "n");
    fx.dir("dst");
    let (src, dst) = (fx.id("src"), fx.id("dst"));
    let targets = vec![fx.id("src/a.txt"), fx.id("src/folder")];

    let mut ctx = ctx();
    paste(&fx.connector, &mut ctx, paste_request(&src, &src, &dst, &targets, false)).unwrap();

    assert_eq!(fs::read_to_string(fx.root().join("dst/a.txt")).unwrap(), "a");
    assert_eq!(fs::read_to_string(fx.root().join("dst/folder/nested.txt")).unwrap(), "n");
    assert!(fx.root().join("src/a.txt").exists());
    assert!(ctx.response.tree.is_some());
}

#[test]
fn test_paste_cut_moves() {
    let fx = Fixture::new(|_| {});
    fx.file("src/a.txt", "a");
    fx.dir("dst");
    let (src, dst) = (fx.id("src"), fx.id("dst"));
    let targets = vec![fx.id("src/a.txt")];

    paste(&fx.connector, &mut ctx(), paste_request(&src, &src, &dst, &targets, true)).unwrap();
    assert!(fx.root().join("dst/a.txt").exists());
    assert!(!fx.root().join("src/a.txt").exists());
}

#[test]
fn test_paste_into_itself_is_refused_before_anything_moves() {
    let fx = Fixture::new(|_| {});
    fx.file("a.txt", "a");
    fx.dir("folder/inner");
    let (root, inner) = (fx.id(""), fx.id("folder/inner"));
    let targets = vec![fx.id("a.txt"), fx.id("folder")];

    let result = paste(&fx.connector, &mut ctx(), paste_request(&root, &root, &inner, &targets, true));
    assert!(matches!(result, Err(ConnectorError::CopyIntoItself)));
    assert!(fx.root().join("a.txt").exists());
}

#[test]
fn test_paste_cut_stops_at_first_conflict() {
    let fx = Fixture::new(|_| {});
    fx.file("src/a.txt", "new");
    fx.file("src/b.txt", "b");
    fx.file("dst/a.txt", "old");
    let (src, dst) = (fx.id("src"), fx.id("dst"));
    let targets = vec![fx.id("src/a.txt"), fx.id("src/b.txt")];

    let mut ctx = ctx();
    let result = paste(&fx.connector, &mut ctx, paste_request(&src, &src, &dst, &targets, true));

    assert_eq!(result.unwrap_err().to_string(), "Unable to move files");
    assert_eq!(fs::read_to_string(fx.root().join("dst/a.txt")).unwrap(), "old");
    assert!(fx.root().join("src/b.txt").exists());
    assert!(matches!(
        ctx.errors.get(&fx.root().join("src/a.txt")),
        Some(ConnectorError::AlreadyExists)
    ));
    assert!(ctx.response.cdc.is_some());
}

#[test]
fn test_paste_copy_continues_past_failures() {
    let fx = Fixture::new(|_| {});
    fx.file("src/a.txt", "new");
    fx.file("src/b.txt", "b");
    fx.file("dst/a.txt", "old");
    let (src, dst) = (fx.id("src"), fx.id("dst"));
    let targets = vec![fx.id("src/a.txt"), fx.id("src/b.txt")];

    let mut ctx = ctx();
    let result = paste(&fx.connector, &mut ctx, paste_request(&src, &src, &dst, &targets, false));

    assert_eq!(result.unwrap_err().to_string(), "Unable to copy files");
    assert_eq!(fs::read_to_string(fx.root().join("dst/a.txt")).unwrap(), "old");
    assert!(fx.root().join("dst/b.txt").exists());
    assert_eq!(ctx.errors.len(), 1);
}

#[test]
fn test_paste_cut_requires_rm_permission() {
    let fx = Fixture::new(|o| o.perms = vec![protect("^/src/a\\.txt$")]);
    fx.file("src/a.txt", "a");
    fx.dir("dst");
    let (src, dst) = (fx.id("src"), fx.id("dst"));
    let targets = vec![fx.id("src/a.txt")];

    let result = paste(&fx.connector, &mut ctx(), paste_request(&src, &src, &dst, &targets, true));
    assert_eq!(result.unwrap_err().to_string(), "Move failed");
    assert!(fx.root().join("src/a.txt").exists());
}

#[test]
fn test_paste_unknown_target() {
    let fx = Fixture::new(|_| {});
    fx.dir("src");
    fx.dir("dst");
    let (src, dst) = (fx.id("src"), fx.id("dst"));
    let targets = vec!["0123".to_string()];

    let result = paste(&fx.connector, &mut ctx(), paste_request(&src, &src, &dst, &targets, false));
    assert!(matches!(result, Err(ConnectorError::NotFound)));
}

// ============================================================================
// duplicate
// ============================================================================

#[test]
fn test_duplicate_tarball_twice() {
    let fx = Fixture::new(|_| {});
    fx.file("report.tar.gz", "gz");
    let root = fx.id("");

    let mut first = ctx();
    duplicate::duplicate(&fx.connector, &mut first, &root, &fx.id("report.tar.gz")).unwrap();
    assert_eq!(first.response.select, Some(vec![fx.id("report copy.tar.gz")]));

    let mut second = ctx();
    duplicate::duplicate(&fx.connector, &mut second, &root, &fx.id("report.tar.gz")).unwrap();
    assert_eq!(second.response.select, Some(vec![fx.id("report copy 2.tar.gz")]));
    assert_eq!(
        fs::read_to_string(fx.root().join("report copy 2.tar.gz")).unwrap(),
        "gz"
    );
}

#[test]
fn test_duplicate_directory() {
    let fx = Fixture::new(|_| {});
    fx.file("album/one.txt", "1");

    duplicate::duplicate(&fx.connector, &mut ctx(), &fx.id(""), &fx.id("album")).unwrap();
    assert!(fx.root().join("album copy/one.txt").is_file());
}

// ============================================================================
// read / edit
// ============================================================================

#[test]
fn test_edit_then_read() {
    let fx = Fixture::new(|_| {});
    fx.file("docs/note.txt", "old");
    let (docs, note) = (fx.id("docs"), fx.id("docs/note.txt"));

    let mut edit_ctx = ctx();
    edit::edit(&fx.connector, &mut edit_ctx, &docs, &note, "brand new").unwrap();
    let target = edit_ctx.response.target.unwrap();
    assert_eq!(target.hash, note);
    assert_eq!(target.size, 9);

    let mut read_ctx = ctx();
    edit::read(&fx.connector, &mut read_ctx, &docs, &note).unwrap();
    assert_eq!(read_ctx.response.content.as_deref(), Some("brand new"));
}

#[test]
fn test_edit_requires_write() {
    let fx = Fixture::new(|o| o.defaults.write = false);
    fx.file("note.txt", "old");

    let result = edit::edit(&fx.connector, &mut ctx(), &fx.id(""), &fx.id("note.txt"), "x");
    assert!(matches!(result, Err(ConnectorError::AccessDenied)));
    assert_eq!(fs::read_to_string(fx.root().join("note.txt")).unwrap(), "old");
}

#[test]
fn test_read_is_lossy_for_binary() {
    let fx = Fixture::new(|_| {});
    let path = fx.root().join("blob.bin");
    fs::write(&path, [0x66, 0xff, 0x6f]).unwrap();

    let mut ctx = ctx();
    edit::read(&fx.connector, &mut ctx, &fx.id(""), &fx.id("blob.bin")).unwrap();
    assert_eq!(ctx.response.content.as_deref(), Some("f\u{fffd}o"));
}

#[test]
fn test_batch_summary() {
    assert!(batch_summary(0, 3, "all", "some").is_none());
    assert_eq!(batch_summary(1, 3, "all", "some").unwrap().to_string(), "some");
    assert_eq!(batch_summary(3, 3, "all", "some").unwrap().to_string(), "all");
}

#[test]
fn test_rm_unknown_target_is_recorded() {
    let fx = Fixture::new(|_| {});
    fx.file("a.txt", "a");

    let mut ctx = ctx();
    let result = remove::rm(&fx.connector, &mut ctx, &fx.id(""), &[fx.id("a.txt"), "ffff".to_string()]);

    assert_eq!(result.unwrap_err().to_string(), "Some files were not removed");
    assert_eq!(ctx.errors.len(), 1);
    assert!(matches!(
        ctx.errors.get(Path::new("ffff")),
        Some(ConnectorError::NotFound)
    ));
}

#[test]
fn test_edit_drops_stale_thumbnail() {
    let dir = TempDir::new().unwrap();
    let connector = Connector::new(ConnectorOptions::with_root(dir.path())).unwrap();
    let photo = connector.root().join("pic.png");
    image::RgbImage::new(20, 20).save(&photo).unwrap();
    let tmb = connector.thumbnails().ensure(&photo).unwrap().unwrap();

    edit::edit(
        &connector,
        &mut ctx(),
        &codec::encode(connector.root()),
        &codec::encode(&photo),
        "replaced",
    )
    .unwrap();
    assert!(!tmb.exists());
}

// ============================================================================
// Symlinks leaving the root
// ============================================================================

#[cfg(unix)]
struct Escape {
    fx: Fixture,
    _outside: TempDir,
    secret: PathBuf,
}

/// Root with `leak.txt` pointing at a file outside of it
#[cfg(unix)]
fn escape() -> Escape {
    let outside = TempDir::new().unwrap();
    let secret = outside.path().join("secret.txt");
    fs::write(&secret, "TOP SECRET").unwrap();
    let fx = Fixture::new(|_| {});
    std::os::unix::fs::symlink(&secret, fx.root().join("leak.txt")).unwrap();
    Escape {
        fx,
        _outside: outside,
        secret,
    }
}

#[cfg(unix)]
#[test]
fn test_read_does_not_follow_escaping_symlink() {
    let e = escape();
    let mut ctx = ctx();
    let result = edit::read(&e.fx.connector, &mut ctx, &e.fx.id(""), &e.fx.id("leak.txt"));

    assert!(matches!(result, Err(ConnectorError::AccessDenied)));
    assert!(ctx.response.content.is_none());
}

#[cfg(unix)]
#[test]
fn test_edit_does_not_write_through_escaping_symlink() {
    let e = escape();
    let result = edit::edit(&e.fx.connector, &mut ctx(), &e.fx.id(""), &e.fx.id("leak.txt"), "PWNED");

    assert!(matches!(result, Err(ConnectorError::AccessDenied)));
    assert_eq!(fs::read_to_string(&e.secret).unwrap(), "TOP SECRET");
}

#[cfg(unix)]
#[test]
fn test_duplicate_does_not_copy_outside_content() {
    let e = escape();
    let result = duplicate::duplicate(&e.fx.connector, &mut ctx(), &e.fx.id(""), &e.fx.id("leak.txt"));

    assert!(result.is_err());
    assert!(e.fx.root().join("leak copy.txt").symlink_metadata().is_err());
}

#[cfg(unix)]
#[test]
fn test_paste_copy_does_not_copy_outside_content() {
    let e = escape();
    e.fx.dir("dst");

    let mut ctx = ctx();
    let targets = [e.fx.id("leak.txt")];
    let result = paste(
        &e.fx.connector,
        &mut ctx,
        PasteRequest {
            current: &e.fx.id(""),
            src: &e.fx.id(""),
            dst: &e.fx.id("dst"),
            targets: &targets,
            cut: false,
        },
    );

    assert!(result.is_err());
    assert!(e.fx.root().join("dst/leak.txt").symlink_metadata().is_err());
}

#[cfg(unix)]
#[test]
fn test_edit_and_read_follow_symlink_inside_root() {
    let fx = Fixture::new(|_| {});
    let note = fx.file("docs/note.txt", "old");
    std::os::unix::fs::symlink(&note, fx.root().join("shortcut.txt")).unwrap();
    let (root, link) = (fx.id(""), fx.id("shortcut.txt"));

    let mut edit_ctx = ctx();
    edit::edit(&fx.connector, &mut edit_ctx, &root, &link, "new").unwrap();
    assert_eq!(fs::read_to_string(&note).unwrap(), "new");
    assert_eq!(edit_ctx.response.target.unwrap().hash, link);

    let mut read_ctx = ctx();
    edit::read(&fx.connector, &mut read_ctx, &root, &link).unwrap();
    assert_eq!(read_ctx.response.content.as_deref(), Some("new"));

    duplicate::duplicate(&fx.connector, &mut ctx(), &root, &link).unwrap();
    let copy = fx.root().join("shortcut copy.txt");
    assert!(!copy.symlink_metadata().unwrap().file_type().is_symlink());
    assert_eq!(fs::read_to_string(copy).unwrap(), "new");
}
