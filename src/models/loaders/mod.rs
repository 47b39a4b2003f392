pub mod folder_scanner;

pub use folder_scanner::{mime_type_for, require_images, scan_folder};
