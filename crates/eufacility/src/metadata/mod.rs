//! Metadata records describing raw source datasets.

mod persistence;
mod record;

pub use record::{AliasRecord, CodeName, METADATA_KEYS, MetadataRecord, OutputIndex, is_url};
