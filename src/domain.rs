pub mod geometry;
pub mod mesh2d;
