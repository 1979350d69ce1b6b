pub mod expand;
pub mod graph;
pub mod mirror;
pub mod target;

pub use expand::{DEFAULT_DEPTH, GraphExpander};
pub use graph::TypeGraph;
pub use mirror::{GraphMirror, MirrorStats};
pub use target::{DISAMBIGUATION_PAGE, TARGET_TYPES, is_target_type, target_label};
