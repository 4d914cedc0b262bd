use crate::routes::{api, download, health};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "ytconv-server",
    description = "YouTube to audio/video conversion API",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(api::ConvertApi::openapi());
    root.merge(download::DownloadApi::openapi());
    root.merge(health::HealthApi::openapi());
    root
}
