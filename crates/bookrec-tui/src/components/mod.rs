pub mod help_overlay;
pub mod history_panel;
pub mod select_field;
pub mod submit_button;
