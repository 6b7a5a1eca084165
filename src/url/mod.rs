//! URL handling module for Kumo-Index
//!
//! Decides which URLs may enter the crawl frontier and in what form. Every
//! admitted URL is an absolute `http`/`https` URL in canonical serialization
//! with no fragment, so the frontier's seen-set compares like with like.

mod normalize;

pub use normalize::{admission_url, strip_fragment};
