//! Detail-page extraction
//!
//! Labels on a detail page are folded into [`Attribute`]s, each of which names a
//! typed destination in the [`Record`](crate::record::Record). The
//! [`HandlerRegistry`] decides how each attribute's value is parsed.

pub mod attribute;
pub mod engine;
pub mod handlers;
pub mod interactions;
pub mod text;

pub use attribute::{Attribute, Slot, TextTransform};
pub use engine::{Extraction, ExtractionEngine};
pub use handlers::{parse_molecular_weight, FieldHandler, Handler, HandlerRegistry};
pub use interactions::{interactions_url, parse_interactions, InteractionPage};
