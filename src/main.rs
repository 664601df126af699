//! CLI entry point for the gallerist tool.

use anyhow::Result;
use clap::Parser;
use gallerist_core::crawl::{self, CrawlConfig, GalleryDownload};
use gallerist_core::fetch::CookieInput;
use gallerist_core::{compare, playlist, transcode};
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    match args.command {
        Command::Crawl(crawl_args) => {
            let config = CrawlConfig {
                mainpage: crawl_args.mainpage,
                sub_side: crawl_args.sub_side,
                query: crawl_args.query,
                gallery_selector: crawl_args.gallery_selector,
                gallery_contains: crawl_args.gallery_contains,
                file_selector: crawl_args.file_selector,
                file_contains: crawl_args.file_contains,
                gallery_part: crawl_args.gallery_part,
                file_part: crawl_args.file_part,
                ext: crawl_args.ext,
                cookies: crawl_args.cookie.map(CookieInput::Header),
                paginator: crawl_args.paginator,
                name_source: crawl_args.name_source.into(),
                start_after: crawl_args.start_after,
                pretty: crawl_args.pretty,
                description_selector: crawl_args.description_selector,
                gallery_description_selector: crawl_args.gallery_description_selector,
                gallery_tags_selector: crawl_args.gallery_tags_selector,
                overview_info_selector: crawl_args.overview_info_selector,
                statistic_only: crawl_args.stats,
                replay: crawl_args.replay,
                root: crawl_args.root,
                ..CrawlConfig::new("", "")
            };
            // crawl_many processes names in sorted order; report them the same way.
            let mut names = crawl_args.names.clone();
            names.sort();
            let reports = crawl::crawl_many(&config, &names).await?;
            for (name, report) in names.iter().zip(&reports) {
                info!(
                    name,
                    galleries = report.galleries,
                    skipped = report.galleries_skipped,
                    files = report.files,
                    downloaded = report.downloaded,
                    "crawl complete"
                );
            }
        }
        Command::Gallery(gallery_args) => {
            let config = GalleryDownload {
                selector: gallery_args.selector,
                contains: gallery_args.contains,
                part: gallery_args.part,
                ext: gallery_args.ext,
                cookies: gallery_args.cookie.map(CookieInput::Header),
                name_source: gallery_args.name_source.into(),
                root: gallery_args.root,
                ..GalleryDownload::new(gallery_args.mainpage, gallery_args.subpage)
            };
            let downloaded = crawl::download_gallery(&config).await?;
            info!(downloaded, "gallery complete");
        }
        Command::Similar {
            image_a,
            image_b,
            threshold,
        } => {
            let score = compare::similarity(&image_a, &image_b)?;
            info!(
                a = %image_a.display(),
                b = %image_b.display(),
                score,
                similar = score > threshold,
                "similarity"
            );
        }
        Command::Blurry { image, threshold } => {
            let blurry = compare::is_blurry(&image, threshold)?;
            if blurry {
                warn!(image = %image.display(), "image is blurry");
            } else {
                info!(image = %image.display(), "image is sharp");
            }
        }
        Command::Playlists { root } => {
            let written = playlist::folders_to_playlist(&root)?;
            info!(written, "playlists complete");
        }
        Command::Normalize { root } => {
            let normalized = transcode::normalize_tree(&root)?;
            info!(normalized, "normalization complete");
        }
        Command::Replace {
            mapping,
            reverse,
            root,
        } => {
            playlist::replace_in_tree(&root, &mapping, reverse)?;
            info!("replacement complete");
        }
    }

    Ok(())
}
