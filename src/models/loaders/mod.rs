pub mod image_loader;

pub use image_loader::{load_image, load_image_pair};
