//! Post-write normalization.
//!
//! After the endpoint creates a post, the stored file is read back, its
//! `type` is repaired or inferred, `layout` is forced to match, and
//! `collectionType: post` is ensured. The result is written back with the
//! revision handle that was read, so a concurrent edit surfaces as a conflict
//! instead of being overwritten.

use quillpub_store::{ContentStore, StoreError};
use tracing::{debug, info};

use crate::frontmatter::{Document, FrontMatter};
use crate::post_type::PostType;

/// Commit message used when a document had no front matter at all.
pub const DEFAULTS_COMMIT_MESSAGE: &str = "chore(micropub): add front matter defaults";

/// Commit message used when existing front matter was repaired.
pub const NORMALIZE_COMMIT_MESSAGE: &str = "chore(micropub): normalize front matter";

/// Errors from post-write normalization.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// The content store rejected a read or the write-back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A document after classification repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDocument {
    /// Rendered document text.
    pub text: String,
    /// Final post type.
    pub post_type: PostType,
    /// Whether the input had a front matter block.
    pub had_front_matter: bool,
}

/// What [`normalize_post`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOutcome {
    /// Repository path of the normalized file.
    pub path: String,
    /// Final post type.
    pub post_type: PostType,
    /// Whether the file was rewritten. `false` when it was already normalized.
    pub rewritten: bool,
}

/// Candidate repository paths for a slug, in probe order.
#[must_use]
pub fn candidate_paths(content_dir: &str, slug: &str) -> [String; 4] {
    let dir = content_dir.trim_matches('/');
    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    };
    [
        format!("{prefix}{slug}.md"),
        format!("{prefix}{slug}.mdx"),
        format!("{prefix}{slug}.markdown"),
        format!("{prefix}{slug}/index.md"),
    ]
}

/// Repair a document's classification fields.
#[must_use]
pub fn normalize_document(text: &str) -> NormalizedDocument {
    let mut doc = Document::parse(text);
    let had_front_matter = doc.front_matter.is_some();
    let front_matter = doc.front_matter.get_or_insert_with(FrontMatter::default);

    let post_type = PostType::classify(front_matter);
    if !had_front_matter {
        front_matter.set("collectionType", "post");
    }
    if front_matter.get("type").as_deref() != Some(post_type.as_str()) {
        front_matter.set("type", post_type.as_str());
    }
    if front_matter.get("layout").as_deref() != Some(post_type.layout()) {
        front_matter.set("layout", post_type.layout());
    }
    if front_matter.get("collectionType").as_deref() != Some("post") {
        front_matter.set("collectionType", "post");
    }

    NormalizedDocument {
        text: doc.render(),
        post_type,
        had_front_matter,
    }
}

/// Normalize the stored file for a freshly created slug.
///
/// Returns `Ok(None)` when no candidate path exists. Unchanged documents are
/// not rewritten.
pub async fn normalize_post(
    store: &dyn ContentStore,
    content_dir: &str,
    slug: &str,
) -> Result<Option<NormalizeOutcome>, NormalizeError> {
    let mut found = None;
    for path in candidate_paths(content_dir, slug) {
        if let Some(file) = store.get_file(&path).await? {
            found = Some(file);
            break;
        }
    }
    let Some(file) = found else {
        info!(%slug, "no stored file found for created slug");
        return Ok(None);
    };

    let original = file.text();
    let normalized = normalize_document(&original);

    if normalized.text == original {
        debug!(path = %file.path, post_type = %normalized.post_type, "front matter already normalized");
        return Ok(Some(NormalizeOutcome {
            path: file.path,
            post_type: normalized.post_type,
            rewritten: false,
        }));
    }

    let message = if normalized.had_front_matter {
        NORMALIZE_COMMIT_MESSAGE
    } else {
        DEFAULTS_COMMIT_MESSAGE
    };
    store
        .update_file(&file.path, normalized.text.as_bytes(), &file.sha, message)
        .await?;
    info!(path = %file.path, post_type = %normalized.post_type, "normalized front matter");

    Ok(Some(NormalizeOutcome {
        path: file.path,
        post_type: normalized.post_type,
        rewritten: true,
    }))
}
