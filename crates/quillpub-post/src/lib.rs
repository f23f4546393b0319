//! Post records for quillpub.
//!
//! Posts are Markdown files that open with a `---`-fenced front matter block.
//! This crate models that block ([`frontmatter`]), classifies posts into a
//! fixed set of types ([`post_type`]), and repairs the classification fields
//! of freshly written posts in the content store ([`normalize`]).

pub mod frontmatter;
pub mod normalize;
pub mod post_type;

pub use frontmatter::{Document, FrontMatter, is_valid_key, scalar_text};
pub use normalize::{
    NormalizeError, NormalizeOutcome, NormalizedDocument, candidate_paths, normalize_document,
    normalize_post,
};
pub use post_type::{AMBIGUOUS_TYPES, PostType, UnknownPostType, is_ambiguous};
