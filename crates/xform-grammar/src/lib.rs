//! xform grammar - value types shared by every transformation
//!
//! Provides:
//! - [`Scalar`]: signed number or arithmetic expression over dimension variables
//! - [`Color`] and [`Background`]: validated fill values
//! - [`Directive`]: one validated, ordered short-key mapping
//!
//! # Example
//!
//! ```rust,ignore
//! use xform_grammar::{Directive, Scalar};
//!
//! let width = Scalar::parse("iw_div_2")?;
//! let directive = Directive::new().with("w", &width);
//! assert_eq!(serde_json::to_string(&directive)?, r#"{"w":"iw_div_2"}"#);
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod background;
pub mod color;
pub mod directive;
pub mod error;
pub mod scalar;

pub use background::{Background, BlurIntensity};
pub use color::Color;
pub use directive::{Directive, DirectiveValue, CHILD_LAYER_KEY, LAYER_KEY};
pub use error::{json_kind, GrammarError};
pub use scalar::{Expression, Operand, Operator, Scalar, Variable, NEGATIVE_MARKER};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with xform values
    pub use crate::{Background, Color, Directive, DirectiveValue, GrammarError, Scalar};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
