#![allow(dead_code)]
#![allow(clippy::too_many_arguments, clippy::collapsible_if, clippy::collapsible_else_if,
         clippy::field_reassign_with_default, clippy::manual_range_contains,
         clippy::comparison_chain, clippy::float_cmp, clippy::needless_range_loop)]

// Server module: entities, the area tree, and movement against the world

pub mod server;
pub mod sv_move;
pub mod sv_world;
