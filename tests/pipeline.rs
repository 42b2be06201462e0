use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use axum::Router;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::get;
use termcolor::Buffer;
use zip::write::SimpleFileOptions;

use hsa_patcher::config::PatcherConfig;
use hsa_patcher::patch::PatchError;
use hsa_patcher::patch::download::{Channel, Source};
use hsa_patcher::patch::orchestration::{PatchJob, apply_patch};
use hsa_patcher::patch::progress::Step;
use hsa_patcher::patch::report::Reporter;

fn zip_bytes(entries: &[(&str, &[u8])]) -> Bytes {
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(contents).unwrap();
    }
    Bytes::from(zip.finish().unwrap().into_inner())
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn game_folder(root: &Path) -> std::path::PathBuf {
    let game = root.join("Hearthstone");
    fs::create_dir_all(game.join("Data")).unwrap();
    fs::write(game.join("Hearthstone.exe"), b"MZ").unwrap();
    fs::write(game.join("Data/file1.bin"), b"old").unwrap();
    fs::write(game.join("Data/untouched.bin"), b"keep").unwrap();
    game
}

fn channel(url: String) -> Channel {
    Channel {
        name: "Default".to_string(),
        source: Source::Direct { url },
    }
}

#[tokio::test]
async fn full_run_patches_the_game_and_tidies_up() {
    let body = zip_bytes(&[
        ("patch/Data/file1.bin", b"new"),
        ("patch/Data/Accessibility/voice.dll", b"dll"),
        ("patch/prepatch_readme.txt", b"what changed"),
        ("README-outside.txt", b"ignored"),
    ]);
    let base = serve(Router::new().route(
        "/pre_patch.zip",
        get(move || {
            let body = body.clone();
            async move { body }
        }),
    ))
    .await;

    let root = tempfile::tempdir().unwrap();
    let game = game_folder(root.path());
    let desktop = root.path().join("Desktop");
    fs::create_dir_all(&desktop).unwrap();

    let config = PatcherConfig::default();
    let channel = channel(format!("{base}/pre_patch.zip"));
    let job = PatchJob {
        config: &config,
        channel: &channel,
        install_dir: game.clone(),
        show_progress: false,
    };
    let mut reporter = Reporter::new(Buffer::no_color());

    let desktop_target = desktop.clone();
    let outcome = apply_patch(job, &mut reporter, move || Ok(Some(desktop_target))).await;

    let summary = outcome.as_ref().unwrap();
    assert_eq!(summary.merge.files_replaced, 1);
    assert_eq!(summary.merge.files_added, 2);
    assert_eq!(summary.readme.as_deref(), Some(desktop.join("prepatch_readme.txt").as_path()));

    assert_eq!(fs::read(game.join("Data/file1.bin")).unwrap(), b"new");
    assert_eq!(fs::read(game.join("Data/Accessibility/voice.dll")).unwrap(), b"dll");
    assert_eq!(fs::read(game.join("Data/untouched.bin")).unwrap(), b"keep");
    assert_eq!(fs::read(desktop.join("prepatch_readme.txt")).unwrap(), b"what changed");
    assert!(!game.join("README-outside.txt").exists());
    assert!(!game.join("patch.zip").exists());
    assert!(!game.join("patch").exists());
    assert!(!game.join("prepatch_readme.txt").exists());

    assert!(reporter.warnings().is_empty());
    assert_eq!(reporter.finish(&outcome), 0);
}

#[tokio::test]
async fn discarded_readme_is_removed_with_the_temporary_files() {
    let body = zip_bytes(&[
        ("patch/Data/file1.bin", b"new"),
        ("patch/prepatch_readme.txt", b"notes"),
    ]);
    let base = serve(Router::new().route(
        "/pre_patch.zip",
        get(move || {
            let body = body.clone();
            async move { body }
        }),
    ))
    .await;

    let root = tempfile::tempdir().unwrap();
    let game = game_folder(root.path());
    let config = PatcherConfig::default();
    let channel = channel(format!("{base}/pre_patch.zip"));
    let job = PatchJob {
        config: &config,
        channel: &channel,
        install_dir: game.clone(),
        show_progress: false,
    };
    let mut reporter = Reporter::new(Buffer::no_color());

    let summary = apply_patch(job, &mut reporter, || Ok(None)).await.unwrap();

    assert_eq!(summary.readme, None);
    assert!(!game.join("prepatch_readme.txt").exists());
    assert_eq!(fs::read(game.join("Data/file1.bin")).unwrap(), b"new");
}

#[tokio::test]
async fn readme_failure_is_only_a_warning() {
    let body = zip_bytes(&[
        ("patch/Data/file1.bin", b"new"),
        ("patch/prepatch_readme.txt", b"notes"),
    ]);
    let base = serve(Router::new().route(
        "/pre_patch.zip",
        get(move || {
            let body = body.clone();
            async move { body }
        }),
    ))
    .await;

    let root = tempfile::tempdir().unwrap();
    let game = game_folder(root.path());
    let config = PatcherConfig::default();
    let channel = channel(format!("{base}/pre_patch.zip"));
    let job = PatchJob {
        config: &config,
        channel: &channel,
        install_dir: game.clone(),
        show_progress: false,
    };
    let mut reporter = Reporter::new(Buffer::no_color());

    let outcome = apply_patch(job, &mut reporter, || {
        Err(PatchError::MissingSource {
            path: "Desktop".into(),
        })
    })
    .await;

    assert!(outcome.is_ok());
    assert_eq!(reporter.warnings().len(), 1);
    assert_eq!(reporter.warnings()[0].step, Step::Readme);
    // not relocated, so the cleaner deleted it
    assert!(!game.join("prepatch_readme.txt").exists());
    assert_eq!(reporter.finish(&outcome), 0);
}

#[tokio::test]
async fn cancelled_readme_question_still_tidies_up() {
    let body = zip_bytes(&[
        ("patch/Data/file1.bin", b"new"),
        ("patch/prepatch_readme.txt", b"notes"),
    ]);
    let base = serve(Router::new().route(
        "/pre_patch.zip",
        get(move || {
            let body = body.clone();
            async move { body }
        }),
    ))
    .await;

    let root = tempfile::tempdir().unwrap();
    let game = game_folder(root.path());
    let config = PatcherConfig::default();
    let channel = channel(format!("{base}/pre_patch.zip"));
    let job = PatchJob {
        config: &config,
        channel: &channel,
        install_dir: game.clone(),
        show_progress: false,
    };
    let mut reporter = Reporter::new(Buffer::no_color());

    let outcome = apply_patch(job, &mut reporter, || Err(PatchError::Cancelled)).await;

    assert!(outcome.is_ok());
    assert_eq!(reporter.warnings().len(), 1);
    assert_eq!(reporter.warnings()[0].step, Step::Readme);
    assert_eq!(fs::read(game.join("Data/file1.bin")).unwrap(), b"new");
    assert!(!game.join("patch.zip").exists());
    assert!(!game.join("patch").exists());
    assert!(!game.join("prepatch_readme.txt").exists());
    assert_eq!(reporter.finish(&outcome), 0);
}

/// Whether this user is stopped by a read-only folder (root is not)
#[cfg(unix)]
fn permissions_enforced(root: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    let dir = root.join("read-only-check");
    fs::create_dir(&dir).unwrap();
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();
    let enforced = fs::write(dir.join("file"), b"x").is_err();
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
    fs::remove_dir_all(&dir).unwrap();
    enforced
}

#[cfg(unix)]
#[tokio::test]
async fn staging_folder_that_cannot_be_removed_is_only_a_warning() {
    use std::os::unix::fs::PermissionsExt;

    let root = tempfile::tempdir().unwrap();
    if !permissions_enforced(root.path()) {
        eprintln!("skipping: read-only folders are writable for this user");
        return;
    }

    let body = zip_bytes(&[
        ("patch/Data/file1.bin", b"new"),
        ("patch/Data/Locked/inner.bin", b"inner"),
        ("patch/prepatch_readme.txt", b"notes"),
    ]);
    let base = serve(Router::new().route(
        "/pre_patch.zip",
        get(move || {
            let body = body.clone();
            async move { body }
        }),
    ))
    .await;

    let game = game_folder(root.path());
    let config = PatcherConfig::default();
    let channel = channel(format!("{base}/pre_patch.zip"));
    let job = PatchJob {
        config: &config,
        channel: &channel,
        install_dir: game.clone(),
        show_progress: false,
    };
    let mut reporter = Reporter::new(Buffer::no_color());

    // runs after the merge, so only empty folders are left below patch/Data
    let staged_data = game.join("patch/Data");
    let lock = staged_data.clone();
    let outcome = apply_patch(job, &mut reporter, move || {
        fs::set_permissions(&lock, fs::Permissions::from_mode(0o555)).unwrap();
        Ok(None)
    })
    .await;
    fs::set_permissions(&staged_data, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(outcome.is_ok());
    assert_eq!(reporter.warnings().len(), 1);
    assert_eq!(reporter.warnings()[0].step, Step::Cleanup);
    assert_eq!(fs::read(game.join("Data/Locked/inner.bin")).unwrap(), b"inner");
    assert!(!game.join("patch.zip").exists());
    assert!(!game.join("prepatch_readme.txt").exists());
    assert_eq!(reporter.finish(&outcome), 0);
}

#[tokio::test]
async fn failed_download_stops_before_anything_is_unpacked() {
    let base = serve(Router::new().route(
        "/pre_patch.zip",
        get(|| async { (StatusCode::NOT_FOUND, "gone") }),
    ))
    .await;

    let root = tempfile::tempdir().unwrap();
    let game = game_folder(root.path());
    let config = PatcherConfig::default();
    let channel = channel(format!("{base}/pre_patch.zip"));
    let job = PatchJob {
        config: &config,
        channel: &channel,
        install_dir: game.clone(),
        show_progress: false,
    };
    let mut reporter = Reporter::new(Buffer::no_color());

    let outcome = apply_patch(job, &mut reporter, || panic!("readme must not be asked")).await;

    let failure = outcome.as_ref().unwrap_err();
    assert_eq!(failure.step, Step::Download);
    assert!(matches!(failure.error, PatchError::Status { status: 404, .. }));
    assert!(!game.join("patch.zip").exists());
    assert!(!game.join("patch").exists());
    assert_eq!(fs::read(game.join("Data/file1.bin")).unwrap(), b"old");
    assert_eq!(reporter.finish(&outcome), 1);
}

#[tokio::test]
async fn corrupt_archive_is_fatal_and_leaves_the_game_alone() {
    let base = serve(Router::new().route(
        "/pre_patch.zip",
        get(|| async { "<html>this is an error page</html>" }),
    ))
    .await;

    let root = tempfile::tempdir().unwrap();
    let game = game_folder(root.path());
    let config = PatcherConfig::default();
    let channel = channel(format!("{base}/pre_patch.zip"));
    let job = PatchJob {
        config: &config,
        channel: &channel,
        install_dir: game.clone(),
        show_progress: false,
    };
    let mut reporter = Reporter::new(Buffer::no_color());

    let outcome = apply_patch(job, &mut reporter, || Ok(None)).await;

    let failure = outcome.as_ref().unwrap_err();
    assert_eq!(failure.step, Step::Extract);
    assert!(matches!(failure.error, PatchError::Archive { .. }));
    assert_eq!(fs::read(game.join("Data/file1.bin")).unwrap(), b"old");
}
