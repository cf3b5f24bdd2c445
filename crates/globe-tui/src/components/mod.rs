pub mod globe_view;
pub mod player_bar;
pub mod region_picker;
pub mod sidebar;
