pub mod classify_types;
pub mod photo_types;
pub mod pipeline_types;
pub mod view_types;
