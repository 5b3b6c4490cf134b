use super::{Category, PortfolioError, PortfolioStore, ensure_file_name, ensure_folder_name};
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::time::UNIX_EPOCH;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

impl PortfolioStore {
    /// Streams one stored file. `request_headers` is only consulted for
    /// conditional requests.
    pub async fn serve_file(
        &self,
        category: &str,
        folder: &str,
        filename: &str,
        request_headers: &HeaderMap,
    ) -> Result<Response, PortfolioError> {
        let not_found = || PortfolioError::NotFound("File not found");

        let category = Category::parse(category).ok_or_else(not_found)?;
        let folder = ensure_folder_name(folder)?;
        let filename = ensure_file_name(filename)?;
        if filename.starts_with('.') {
            return Err(not_found());
        }

        let file_path = self.item_dir(category, folder).join(filename);
        debug!("Attempting to serve upload: {:?}", file_path);

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(not_found()),
            Err(e) => {
                debug!("Failed to get metadata for {:?}: {}", file_path, e);
                return Err(not_found());
            }
        };

        let mut headers = HeaderMap::new();
        let content_type = mime_guess::from_path(&file_path)
            .first_or_octet_stream()
            .to_string();
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=3600"),
        );

        if let Ok(modified) = metadata.modified()
            && let Ok(duration) = modified.duration_since(UNIX_EPOCH)
        {
            if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(modified)) {
                headers.insert(header::LAST_MODIFIED, value);
            }

            let etag = format!("\"{}-{}\"", duration.as_secs(), metadata.len());
            let matches = request_headers
                .get(header::IF_NONE_MATCH)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == etag);
            if let Ok(value) = HeaderValue::from_str(&etag) {
                headers.insert(header::ETAG, value);
            }
            if matches {
                headers.remove(header::CONTENT_LENGTH);
                return Ok((StatusCode::NOT_MODIFIED, headers).into_response());
            }
        }

        let file = File::open(&file_path).await.map_err(|e| {
            debug!("Failed to open file {:?}: {}", file_path, e);
            not_found()
        })?;
        let body = Body::from_stream(ReaderStream::new(file));

        Ok((StatusCode::OK, headers, body).into_response())
    }
}
