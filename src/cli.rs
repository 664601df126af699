//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use gallerist_core::NameSource;
use gallerist_core::compare::{DEFAULT_BLUR_THRESHOLD, DEFAULT_SIMILARITY_THRESHOLD};

/// Crawl and download image galleries, compare images, and maintain
/// playlists.
#[derive(Parser, Debug)]
#[command(name = "gallerist")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// File naming strategy, as exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum NameSourceArg {
    /// Derive the name from the file URL
    #[default]
    Url,
    /// Derive the name from the Content-Disposition response header
    Content,
    /// Derive the name from the content name plus gallery counter
    Name,
    /// Derive the name from the gallery index and title
    Gallery,
}

impl From<NameSourceArg> for NameSource {
    fn from(arg: NameSourceArg) -> Self {
        match arg {
            NameSourceArg::Url => Self::Url,
            NameSourceArg::Content => Self::Content,
            NameSourceArg::Name => Self::Name,
            NameSourceArg::Gallery => Self::Gallery,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl overview pages and download their galleries
    Crawl(CrawlArgs),
    /// Download every matched file of a single gallery page
    Gallery(GalleryArgs),
    /// Score two images for structural similarity
    Similar {
        /// First image
        image_a: PathBuf,
        /// Second image
        image_b: PathBuf,
        /// Images scoring above this are reported as similar
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f64,
    },
    /// Check an image for blurriness via Laplacian variance
    Blurry {
        /// Image to check
        image: PathBuf,
        /// Variance below this flags the image as blurry
        #[arg(long, default_value_t = DEFAULT_BLUR_THRESHOLD)]
        threshold: f64,
    },
    /// Build one playlist per directory of audio files
    Playlists {
        /// Tree to scan
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Normalize audio loudness into an output tree
    Normalize {
        /// Tree to normalize
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Apply mapping-driven text replacement across a tree
    Replace {
        /// Mapping CSV with old/new columns
        #[arg(long, default_value = "mapping.csv")]
        mapping: PathBuf,
        /// Swap the mapping columns
        #[arg(long)]
        reverse: bool,
        /// Tree to rewrite
        #[arg(default_value = ".")]
        root: PathBuf,
    },
}

/// Arguments of the `crawl` subcommand; mirrors `CrawlConfig`.
#[derive(clap::Args, Debug)]
pub struct CrawlArgs {
    /// Absolute root of the site, e.g. https://example.com
    pub mainpage: String,

    /// Content name(s); each runs its own crawl, in sorted order
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Sub-section between the root and the content name
    #[arg(long, default_value = "")]
    pub sub_side: String,

    /// Ready-made query string appended to the overview request path
    #[arg(long, default_value = "")]
    pub query: String,

    /// Selector for gallery links on overview pages
    #[arg(long, default_value = "a")]
    pub gallery_selector: String,

    /// Substring a gallery link must contain
    #[arg(long, default_value = "")]
    pub gallery_contains: String,

    /// Selector for file links on gallery pages
    #[arg(long, default_value = "a")]
    pub file_selector: String,

    /// Substring a file link must contain
    #[arg(long, default_value = "")]
    pub file_contains: String,

    /// URL segment index for gallery titles (negative counts from the end)
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub gallery_part: isize,

    /// URL segment index for file names (negative counts from the end)
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub file_part: isize,

    /// Extension override for derived file names
    #[arg(long, default_value = "")]
    pub ext: String,

    /// Raw cookie header string attached to every request
    #[arg(long)]
    pub cookie: Option<String>,

    /// Selector for additional overview page links (pagination)
    #[arg(long, default_value = "")]
    pub paginator: String,

    /// File naming strategy
    #[arg(long, value_enum, default_value_t = NameSourceArg::Url)]
    pub name_source: NameSourceArg,

    /// Resume marker: skip galleries until this title was seen
    #[arg(long, default_value = "")]
    pub start_after: String,

    /// Prettify the content directory name
    #[arg(long)]
    pub pretty: bool,

    /// Selector for the overview description text
    #[arg(long, default_value = "")]
    pub description_selector: String,

    /// Selector for per-gallery description text
    #[arg(long, default_value = "")]
    pub gallery_description_selector: String,

    /// Selector for per-gallery tag text
    #[arg(long, default_value = "")]
    pub gallery_tags_selector: String,

    /// Selector for per-gallery metadata on the overview page
    #[arg(long, default_value = "")]
    pub overview_info_selector: String,

    /// Dry run: compute and log counts without downloading
    #[arg(long)]
    pub stats: bool,

    /// Serve pages from the cached HTML of a previous crawl
    #[arg(long)]
    pub replay: bool,

    /// Base directory (defaults to the working directory)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

/// Arguments of the `gallery` subcommand.
#[derive(clap::Args, Debug)]
pub struct GalleryArgs {
    /// Absolute root of the site
    pub mainpage: String,

    /// Sub-page holding the file links
    pub subpage: String,

    /// Selector for file links
    #[arg(long, default_value = "a")]
    pub selector: String,

    /// Substring a file link must contain
    #[arg(long, default_value = "")]
    pub contains: String,

    /// URL segment index for file names (negative counts from the end)
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub part: isize,

    /// Extension override for derived file names
    #[arg(long, default_value = "")]
    pub ext: String,

    /// Raw cookie header string attached to every request
    #[arg(long)]
    pub cookie: Option<String>,

    /// File naming strategy
    #[arg(long, value_enum, default_value_t = NameSourceArg::Url)]
    pub name_source: NameSourceArg,

    /// Base directory (defaults to the working directory)
    #[arg(long)]
    pub root: Option<PathBuf>,
}
