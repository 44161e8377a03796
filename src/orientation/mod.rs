//! Orientation policy and pixel normalization.
//!
//! The policy decides what each connection is asked to do; normalization
//! makes sure captured pixels end up upright and unmirrored no matter what
//! the hardware actually did.

mod normalize;
mod policy;

pub use normalize::{downscale, normalize, reorient, Orientation};
pub use policy::{connection_settings, ConnectionKind, ConnectionSettings};
