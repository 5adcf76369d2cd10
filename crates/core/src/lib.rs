//! `accord-core`: collection kernel shared by the reconciliation engine.
//!
//! Two map flavours with different key equality:
//! - [`ValueMap`] compares keys by value (strings, numbers, tuples of those).
//! - [`IdentityMap`] only accepts [`Identity`] keys: arena handles that stand
//!   for one owned object. Two structurally equal objects stored twice get two
//!   handles, so they are two keys.
//!
//! [`OrderedSet`] and [`Queue`] round out the kernel.

pub mod arena;
pub mod error;
pub mod map;
pub mod queue;
pub mod set;

pub use arena::{Arena, Handle, Identity};
pub use error::KernelError;
pub use map::{IdentityMap, ValueMap};
pub use queue::Queue;
pub use set::OrderedSet;
