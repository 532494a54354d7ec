pub mod bindings;
pub mod keymap;
