//! Replay resolver tests: cached-HTML serving, name fallbacks, and offline
//! re-analysis of a finished crawl.

use filetime::{FileTime, set_file_mtime};
use gallerist_core::crawl::{CrawlConfig, crawl};
use gallerist_core::resolver::{PageResolver, ReplayResolver, ResolverPaths};
use tempfile::TempDir;

const PINNED_MTIME: i64 = 1_600_000_000;

fn replay_paths(root: &std::path::Path) -> ResolverPaths {
    ResolverPaths::with_root(root, "https://www.example.com", "nature", "", "", false)
}

fn write_cached(paths: &ResolverPaths, filename: &str, content: &[u8]) -> std::path::PathBuf {
    std::fs::create_dir_all(&paths.dest_html).unwrap();
    let path = paths.dest_html.join(filename);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_main_page_served_from_exact_cache_file() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let paths = replay_paths(temp_dir.path());
    write_cached(&paths, "nature.html", b"<html>cached overview</html>");

    let mut resolver = ReplayResolver::new(paths);
    let page = resolver.main_page().await.expect("replay never errors");
    assert_eq!(page, b"<html>cached overview</html>");
}

#[tokio::test]
async fn test_main_page_falls_back_to_first_paginated_file() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let paths = replay_paths(temp_dir.path());
    write_cached(&paths, "nature_p01.html", b"<html>page one</html>");

    let mut resolver = ReplayResolver::new(paths);
    let page = resolver.main_page().await.expect("replay never errors");
    assert_eq!(page, b"<html>page one</html>");
}

#[tokio::test]
async fn test_missing_cache_yields_empty_bytes() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let paths = replay_paths(temp_dir.path());
    std::fs::create_dir_all(&paths.dest_html).unwrap();

    let mut resolver = ReplayResolver::new(paths);
    assert!(resolver.main_page().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_falls_back_to_hyphenated_lowercase_variant() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let paths = replay_paths(temp_dir.path());
    let cached = write_cached(&paths, "002_summer-set.html", b"<html>summer</html>");
    set_file_mtime(&cached, FileTime::from_unix_time(PINNED_MTIME, 0)).unwrap();

    let dest = paths.dest_html.clone();
    let mut resolver = ReplayResolver::new(paths);
    let page = resolver
        .file("https://www.example.com/g/summer", &dest, "002_Summer Set.html")
        .await
        .expect("replay never errors");

    assert_eq!(page, b"<html>summer</html>");
    // The served file's modification time becomes the audit date.
    assert_eq!(resolver.last_date().timestamp(), PINNED_MTIME);
}

#[tokio::test]
async fn test_download_is_a_no_op() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let paths = replay_paths(temp_dir.path());
    std::fs::create_dir_all(&paths.dest_content).unwrap();
    let dest = paths.dest_content.clone();

    let mut resolver = ReplayResolver::new(paths);
    let written = resolver
        .download(
            "https://www.example.com/files/a.jpg",
            &dest,
            "a.jpg",
            gallerist_core::NameSource::Url,
            None,
        )
        .await
        .expect("replay never errors");

    assert!(written.is_none());
    assert!(std::fs::read_dir(&dest).unwrap().next().is_none(), "no file written");
}

#[tokio::test]
async fn test_replay_crawl_reanalyzes_cached_pages_offline() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let paths = replay_paths(temp_dir.path());
    write_cached(
        &paths,
        "nature.html",
        br#"<html><head><title>Cached</title></head><body>
        <div class="galleries"><a href="/g/two">Two</a><a href="/g/one">One</a></div>
        </body></html>"#,
    );
    write_cached(
        &paths,
        "001_one.html",
        br#"<html><body><a href="/files/a.jpg">a</a></body></html>"#,
    );
    write_cached(
        &paths,
        "002_two.html",
        br#"<html><body><a href="/files/b.jpg">b</a><a href="/files/c.jpg">c</a></body></html>"#,
    );

    let config = CrawlConfig {
        gallery_selector: "div.galleries a".to_string(),
        gallery_contains: "/g/".to_string(),
        file_contains: "/files/".to_string(),
        statistic_only: true,
        replay: true,
        root: Some(temp_dir.path().to_path_buf()),
        ..CrawlConfig::new("https://www.example.com", "nature")
    };
    let report = crawl(&config).await.expect("replay crawl should succeed");

    assert_eq!(report.galleries, 2);
    assert_eq!(report.files, 3);
    assert_eq!(report.downloaded, 0);

    let galleries_log =
        std::fs::read_to_string(temp_dir.path().join("download2_galleries.csv")).unwrap();
    assert!(galleries_log.contains("001_one;a.jpg;1;/g/one;"));
    assert!(galleries_log.contains("002_two;b.jpg;2;/g/two;"));
}
