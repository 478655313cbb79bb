pub mod model;
pub mod multipart;
pub mod request;
pub mod transport;

pub use model::{FileList, RemoteFile};
pub use multipart::MultipartBody;
pub use request::{
    ApiRequest, ContentEncoding, DEFAULT_MIME_TYPE, FILES_PATH, HttpMethod, UPLOAD_PREFIX,
    UploadContent,
};
pub use transport::DriveTransport;
