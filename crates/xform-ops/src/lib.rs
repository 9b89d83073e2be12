//! xform operations - per-operation validators and normalizers
//!
//! Each operation owns a closed field set, a context-sensitive constraint
//! set, and a normalization into the delivery service's short-key grammar.
//!
//! # Operations
//!
//! - **resize_and_crop**: dimensions, crop strategy, focus and offsets
//! - **ai_transform**: chained AI steps (background removal, generative fill, ...)
//! - **image_overlay**: image layers with at most one nested child layer
//! - **text_overlay**: text layers, with custom fonts checked via [`FontCatalog`]
//! - **effects_and_enhancement**: visual effects rendered as one directive
//!
//! # Example
//!
//! ```rust,ignore
//! use xform_ops::{normalize_step, OperationKind};
//!
//! # async fn example(fonts: &dyn xform_ops::FontCatalog) -> Result<(), Box<dyn std::error::Error>> {
//! let raw = serde_json::json!({"width": 300, "crop_mode": "pad_resize", "focus": "left"});
//! let directives = normalize_step(
//!     OperationKind::ResizeAndCrop,
//!     raw.as_object().unwrap(),
//!     fonts,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod ai;
pub mod effect;
pub mod effects;
pub mod error;
pub mod font;
pub mod image_overlay;
pub mod kind;
pub mod operation;
pub mod params;
pub mod resize_crop;
pub mod short_keys;
pub mod text_overlay;
pub mod values;

pub use error::{OperationError, ValidationError};
pub use font::{Font, FontCatalog, FontLookupError};
pub use kind::{OperationKind, UnknownOperation};
pub use operation::{normalize_step, Operation};
pub use params::{Choice, RawParams};
pub use short_keys::{normalize_long_name, short_key};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for validating plan steps
    pub use crate::error::{OperationError, ValidationError};
    pub use crate::font::FontCatalog;
    pub use crate::kind::OperationKind;
    pub use crate::operation::{normalize_step, Operation};
    pub use xform_grammar::{Directive, DirectiveValue};
}
