use url::Url;

/// Sub-path of the listing endpoint.
pub const FILE_INFO_PATH: &str = "/fileinfo";

/// Join `web_path` onto the path of `base`.
///
/// Empty and `.` segments are dropped and `..` removes the previous segment,
/// but never one belonging to `base` itself. Each segment is percent-encoded,
/// so a literal `%` in a file name stays literal. Query and fragment of
/// `base` are kept.
pub fn join(base: &Url, web_path: &str) -> Url {
    let mut segments: Vec<&str> = Vec::new();
    for segment in web_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
