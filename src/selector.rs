//! Response selection
//!
//! Picks one canned response for a tag, uniformly at random.

use crate::catalog::IntentCatalog;
use crate::models::FALLBACK_RESPONSE;
use rand::seq::SliceRandom;
use rand::Rng;

/// Choose a response for `tag`, or the fallback when the catalog has no such tag
pub fn select_response<R: Rng + ?Sized>(tag: &str, catalog: &IntentCatalog, rng: &mut R) -> String {
    catalog
        .get(tag)
        .and_then(|intent| intent.responses.choose(rng))
        .cloned()
        .unwrap_or_else(|| FALLBACK_RESPONSE.to_string())
}
