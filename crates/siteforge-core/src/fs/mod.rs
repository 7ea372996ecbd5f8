//! Filesystem primitives shared across pipeline steps.

pub mod tree;

pub use tree::{
    copy_then_remove, copy_tree, create_dir_with_mode, dir_is_writable, file_is_writable,
    move_tree, remove_path, set_mode,
};
