use serde::Deserialize;

/// One entry of the listing endpoint.
/// `GET {base}/fileinfo`
#[derive(Debug, Deserialize)]
pub struct FileInfo {
    pub web_path: String,
}
