mod storage;

pub use storage::{ImageFormat, ImageStorage, MAX_IMAGE_BYTES, decode_payload};
