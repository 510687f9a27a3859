//! Internal implementation details.
//!
//! These are pub(crate) and not intended for external use.

pub(crate) mod markable_link;

pub(crate) use markable_link::MarkableLink;
