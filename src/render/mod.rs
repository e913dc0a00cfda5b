pub mod skeleton;

pub use skeleton::{character_color, visible_bones, Segment, Viewport, CHARACTER_COLORS, SKELETON_CONNECTIONS};
