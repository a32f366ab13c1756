pub mod bill;
pub mod image;

pub use bill::{Bill, Category, CategoryKind};
pub use image::{ImageUri, PhotoDescriptor};
