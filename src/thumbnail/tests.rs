// src/thumbnail/tests.rs

use super::backend::centred_square;
use super::*;
use crate::connector::request::RequestParams;
use image::GenericImageView;
use tempfile::TempDir;

fn options(dir: &TempDir) -> ConnectorOptions {
    let mut options = ConnectorOptions::with_root(dir.path().canonicalize().unwrap());
    options.url = "http://files.local".to_string();
    options
}

fn ctx() -> RequestContext {
    RequestContext::new(RequestParams::default(), true)
}

fn png(path: &Path, width: u32, height: u32) {
    image::RgbImage::new(width, height).save(path).unwrap();
}

#[test]
fn test_centred_square() {
    assert_eq!(centred_square(40, 20), (10, 0, 20));
    assert_eq!(centred_square(20, 40), (0, 10, 20));
    assert_eq!(centred_square(30, 30), (0, 0, 30));
}

#[test]
fn test_cache_dir_created_on_construction() {
    let dir = TempDir::new().unwrap();
    let cache = ThumbnailCache::new(&options(&dir));
    assert!(cache.is_enabled());
    assert!(dir.path().join(".tmb").is_dir());
}

#[test]
fn test_disabled_without_backend_or_dir() {
    let dir = TempDir::new().unwrap();

    let mut no_lib = options(&dir);
    no_lib.img_lib = ImageLibrary::None;
    let cache = ThumbnailCache::new(&no_lib);
    assert!(!cache.is_enabled());
    assert!(!cache.can_thumbnail(Path::new("a.png")));

    let mut no_dir = options(&dir);
    no_dir.tmb_dir = None;
    let cache = ThumbnailCache::new(&no_dir);
    assert!(!cache.is_enabled());
    assert!(cache.cache_path(Path::new("/x/a.png")).is_none());
}

#[test]
fn test_uncreatable_dir_disables_thumbnails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("blocker"), "file, not a directory").unwrap();

    let mut opts = options(&dir);
    opts.tmb_dir = Some("blocker/.tmb".into());
    let cache = ThumbnailCache::new(&opts);
    assert!(cache.dir().is_none());
    assert!(!cache.is_enabled());
}

#[test]
fn test_only_images_are_eligible() {
    let dir = TempDir::new().unwrap();
    let cache = ThumbnailCache::new(&options(&dir));
    assert!(cache.can_thumbnail(Path::new("photo.jpg")));
    assert!(!cache.can_thumbnail(Path::new("notes.txt")));

    let text = dir.path().join("notes.txt");
    std::fs::write(&text, "not an image").unwrap();
    assert_eq!(cache.ensure(&text).unwrap(), None);
}

#[test]
fn test_ensure_generates_square_png_once() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir);
    let cache = ThumbnailCache::new(&opts);
    let photo = opts.root.join("wide.png");
    png(&photo, 120, 60);

    let tmb = cache.ensure(&photo).unwrap().unwrap();
    assert_eq!(tmb, cache.cache_path(&photo).unwrap());
    assert_eq!(image::open(&tmb).unwrap().dimensions(), (48, 48));

    // Second call reuses the file
    let before = std::fs::metadata(&tmb).unwrap().modified().unwrap();
    assert_eq!(cache.ensure(&photo).unwrap(), Some(tmb.clone()));
    assert_eq!(std::fs::metadata(&tmb).unwrap().modified().unwrap(), before);
}

#[test]
fn test_undecodable_image_is_an_error() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir);
    let cache = ThumbnailCache::new(&opts);
    let fake = opts.root.join("fake.png");
    std::fs::write(&fake, "definitely not a png").unwrap();

    assert!(matches!(cache.ensure(&fake), Err(ImageBackendError::Decode { .. })));
    assert!(cache.cached(&fake).is_none());
}

#[test]
fn test_invalidate_removes_cached_thumbnail() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir);
    let cache = ThumbnailCache::new(&opts);
    let photo = opts.root.join("p.png");
    png(&photo, 10, 10);

    let tmb = cache.ensure(&photo).unwrap().unwrap();
    cache.invalidate(&photo);
    assert!(!tmb.exists());

    // Nothing cached: no-op
    cache.invalidate(&photo);
}

#[test]
fn test_files_in_cache_dir_are_their_own_thumbnails() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir);
    let cache = ThumbnailCache::new(&opts);
    let inside = cache.dir().unwrap().join("abc.png");
    assert!(cache.is_thumbnail(&inside));
    assert!(cache.cache_path(&inside).is_none());
    assert!(!cache.is_thumbnail(&opts.root.join("abc.png")));
}

#[test]
fn test_disabled_backend_refuses_everything() {
    let backend = DisabledBackend;
    assert!(!backend.is_available());
    assert!(matches!(backend.measure(Path::new("a.png")), Err(ImageBackendError::Disabled)));
    assert!(matches!(
        backend.resize(Path::new("a.png"), 1, 1),
        Err(ImageBackendError::Disabled)
    ));
}

// ============================================================================
// Commands
// ============================================================================

fn images_dir(opts: &ConnectorOptions, count: usize) -> PathBuf {
    let gallery = opts.root.join("gallery");
    std::fs::create_dir(&gallery).unwrap();
    for i in 0..count {
        png(&gallery.join(format!("img{}.png", i)), 8, 8);
    }
    std::fs::write(gallery.join("readme.txt"), "text").unwrap();
    gallery
}

#[test]
fn test_batch_respects_limit_and_reports_pending() {
    let dir = TempDir::new().unwrap();
    let mut opts = options(&dir);
    opts.tmb_at_once = 2;
    let gallery = images_dir(&opts, 3);
    let connector = Connector::new(opts).unwrap();

    let mut first = ctx();
    generate_batch(&connector, &mut first, &codec::encode(&gallery)).unwrap();
    assert_eq!(first.response.images.as_ref().unwrap().len(), 2);
    assert_eq!(first.response.current, Some(codec::encode(&gallery)));
    assert_eq!(first.response.tmb, Some(true));

    let mut second = ctx();
    generate_batch(&connector, &mut second, &codec::encode(&gallery)).unwrap();
    let images = second.response.images.unwrap();
    assert_eq!(images.len(), 1);
    assert!(images.contains_key(&codec::encode(&gallery.join("img2.png"))));
    assert!(second.response.tmb.is_none());
}

#[test]
fn test_batch_zero_means_unlimited() {
    let dir = TempDir::new().unwrap();
    let mut opts = options(&dir);
    opts.tmb_at_once = 0;
    let gallery = images_dir(&opts, 4);
    let connector = Connector::new(opts).unwrap();

    let mut ctx = ctx();
    generate_batch(&connector, &mut ctx, &codec::encode(&gallery)).unwrap();
    assert_eq!(ctx.response.images.unwrap().len(), 4);
    assert!(ctx.response.tmb.is_none());
}

#[test]
fn test_batch_ignores_cache_dir_and_unknown_dirs() {
    let dir = TempDir::new().unwrap();
    let mut opts = options(&dir);
    opts.dot_files = true;
    let connector = Connector::new(opts).unwrap();
    let tmb_dir = connector.thumbnails().dir().unwrap().to_path_buf();

    let mut ctx = ctx();
    generate_batch(&connector, &mut ctx, &codec::encode(&tmb_dir)).unwrap();
    generate_batch(&connector, &mut ctx, "0000").unwrap();
    assert!(ctx.response.images.is_none());
    assert!(ctx.response.current.is_none());
}

#[test]
fn test_resize_in_place() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir);
    let photo = opts.root.join("p.png");
    png(&photo, 30, 30);
    let connector = Connector::new(opts).unwrap();
    let root = connector.root().to_path_buf();
    let tmb = connector.thumbnails().ensure(&photo).unwrap().unwrap();

    let mut ctx = ctx();
    resize(&connector, &mut ctx, &codec::encode(&root), &codec::encode(&photo), 12, 7).unwrap();

    assert_eq!(image::open(&photo).unwrap().dimensions(), (12, 7));
    assert!(!tmb.exists());
    assert_eq!(ctx.response.select, Some(vec![codec::encode(&photo)]));
    assert!(ctx.response.tree.is_some());
}

#[test]
fn test_resize_rejects_non_images_and_disabled_backend() {
    let dir = TempDir::new().unwrap();
    let mut opts = options(&dir);
    let text = opts.root.join("notes.txt");
    std::fs::write(&text, "x").unwrap();
    let photo = opts.root.join("p.png");
    png(&photo, 4, 4);
    let root_id = codec::encode(&opts.root);

    let connector = Connector::new(opts.clone()).unwrap();
    let result = resize(&connector, &mut ctx(), &root_id, &codec::encode(&text), 2, 2);
    assert!(matches!(result, Err(ConnectorError::InvalidParameters)));

    opts.img_lib = ImageLibrary::None;
    let connector = Connector::new(opts).unwrap();
    let result = resize(&connector, &mut ctx(), &root_id, &codec::encode(&photo), 2, 2);
    assert!(matches!(result, Err(ConnectorError::UnsupportedOperation { .. })));
}

#[test]
fn test_cache_dir_outside_root_disables_thumbnails() {
    let dir = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();

    let mut absolute = options(&dir);
    absolute.tmb_dir = Some(elsewhere.path().join("tmb"));
    let cache = ThumbnailCache::new(&absolute);
    assert!(!cache.is_enabled());
    assert!(!elsewhere.path().join("tmb").exists());

    let mut relative = options(&dir);
    relative.tmb_dir = Some("../tmb".into());
    assert!(!ThumbnailCache::new(&relative).is_enabled());
}

#[cfg(unix)]
#[test]
fn test_escaping_symlinks_are_not_resized_or_thumbnailed() {
    let outside = TempDir::new().unwrap();
    let secret = outside.path().join("secret.png");
    png(&secret, 16, 16);
    let dir = TempDir::new().unwrap();
    let opts = options(&dir);
    let link = opts.root.join("leak.png");
    std::os::unix::fs::symlink(&secret, &link).unwrap();
    let connector = Connector::new(opts).unwrap();
    let root_id = codec::encode(connector.root());

    let result = resize(&connector, &mut ctx(), &root_id, &codec::encode(&link), 4, 4);
    assert!(matches!(result, Err(ConnectorError::AccessDenied)));
    assert_eq!(image::image_dimensions(&secret).unwrap(), (16, 16));

    let mut batch = ctx();
    generate_batch(&connector, &mut batch, &root_id).unwrap();
    assert!(batch.response.images.unwrap().is_empty());
    assert!(connector.thumbnails().cached(&link).is_none());
}
