#![allow(dead_code)]
#![allow(clippy::needless_return, clippy::too_many_arguments, clippy::collapsible_if,
         clippy::collapsible_else_if, clippy::field_reassign_with_default,
         clippy::manual_range_contains, clippy::comparison_chain,
         clippy::identity_op, clippy::float_cmp, clippy::needless_range_loop,
         clippy::manual_clamp, clippy::type_complexity)]

// Shared engine core: map data, collision hulls, visibility.

pub mod q_shared;
pub mod qfiles;
pub mod error;
pub mod common;
pub mod cvar;
pub mod md4;
pub mod model;
pub mod cmodel;
pub mod pvs;
