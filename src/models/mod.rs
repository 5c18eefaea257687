pub mod image;
pub mod job;
pub mod loaders;
pub mod session;

pub use image::UploadImage;
pub use job::{ErrorBody, FaceSwapStatus, JobId, PublishResponse, RemoteJobStatus, StatusResponse};
pub use loaders::{load_image, load_image_pair};
pub use session::SessionToken;
