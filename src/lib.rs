//! Stonebridge library - procedural stone-bridge river diorama

pub mod camera;
pub mod cli;
pub mod interaction;
pub mod objects;
pub mod params;
pub mod rendering;
pub mod scene;
pub mod textures;
pub mod water;
