#![allow(non_snake_case)]
//! Fragments and the render projector for data states.
//!
//! ```rust
//! use chainscope_core::Root;
//! use chainscope_ui::*;
//!
//! let config = RenderConfig::<u64>::new().display().loading_message("fetching");
//! assert_eq!(project(&Root::Loading, &config, None).to_plain_text(), "fetching...");
//! assert_eq!(project(&Root::Value(42), &config, None).to_plain_text(), "42");
//! ```

pub mod boundary;
pub mod fragment;
pub mod render;

pub use boundary::guard;
pub use fragment::*;
pub use render::*;
