//! Webmention counts for a static site.
//!
//! A sync pass reads the site's sitemap, asks the mentions API about every
//! spelling of each page URL (scheme, `www.`/`blog.` host aliases, trailing
//! slash, `index.html`), merges and de-duplicates the results, and writes one
//! JSON cache file per page plus an `index.json` of totals for templates.

pub mod api;
pub mod config;
pub mod error;
pub mod mentions;
pub mod sitemap;
pub mod sync;
pub mod target;

pub use api::{MentionApi, PER_PAGE, WebmentionIo, fetch_all};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use mentions::{MentionCounts, MentionKind, dedup, summarize};
pub use sync::{CacheEntry, INDEX_FILE, SyncReport, Syncer, run};
