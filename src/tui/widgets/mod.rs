pub mod confirm;
pub mod days;
pub mod header;
pub mod heatmap;
pub mod stats;
pub mod statusbar;
