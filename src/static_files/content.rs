//! Content serving for a resolved file: content type, `Last-Modified`,
//! conditional requests and single byte ranges.

use crate::static_files::StaticResource;
use crate::static_files::range::{ByteRange, RangeOutcome, parse_range};
use anyhow::Result;
use chrono::{DateTime, Utc};
use hyper::{Body, Method, Request, Response, StatusCode, header};
use std::io::SeekFrom;
use std::time::SystemTime;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`)
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date into whole seconds since the epoch
pub fn parse_http_date(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(value.trim()).ok().map(|dt| dt.timestamp())
}

/// Content type from the file extension; text types are served as UTF-8
pub fn content_type_for(path: &std::path::Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT && mime.get_param(mime_guess::mime::CHARSET).is_none() {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.to_string()
    }
}

/// Serve an opened file for a GET or HEAD request
pub async fn serve_content(req: &Request<Body>, mut resource: StaticResource) -> Result<Response<Body>> {
    let size = resource.metadata.len();
    let modified = resource.metadata.modified().ok().filter(|t| *t > SystemTime::UNIX_EPOCH);
    let modified_secs = modified.map(|t| DateTime::<Utc>::from(t).timestamp());

    if let Some(response) = check_preconditions(req, modified, modified_secs) {
        return Ok(response);
    }

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type_for(&resource.path))
        .header(header::ACCEPT_RANGES, "bytes");
    if let Some(modified) = modified {
        builder = builder.header(header::LAST_MODIFIED, http_date(modified));
    }

    let range_header = header_str(req, header::RANGE).filter(|_| if_range_matches(req, modified_secs));
    let span = match parse_range(range_header, size) {
        RangeOutcome::Full => None,
        RangeOutcome::Partial(range) => Some(range),
        RangeOutcome::Unsatisfiable => {
            return Ok(Response::builder()
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(header::CONTENT_RANGE, format!("bytes */{}", size))
                .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(Body::from("invalid range: failed to overlap\n"))?);
        }
    };

    let (status, send) = match span {
        Some(range) => {
            builder = builder.header(header::CONTENT_RANGE, range.content_range(size));
            (StatusCode::PARTIAL_CONTENT, range)
        }
        None => (StatusCode::OK, ByteRange { start: 0, end: size.saturating_sub(1) }),
    };
    let length = if size == 0 { 0 } else { send.len() };
    builder = builder.status(status).header(header::CONTENT_LENGTH, length);

    if req.method() == Method::HEAD || length == 0 {
        return Ok(builder.body(Body::empty())?);
    }

    let mut buffer = Vec::with_capacity(length as usize);
    resource.file.seek(SeekFrom::Start(send.start)).await?;
    (&mut resource.file).take(length).read_to_end(&mut buffer).await?;
    Ok(builder.body(Body::from(buffer))?)
}

/// `If-Unmodified-Since` and `If-Modified-Since` handling
fn check_preconditions(req: &Request<Body>, modified: Option<SystemTime>, modified_secs: Option<i64>) -> Option<Response<Body>> {
    let modified_secs = modified_secs?;

    if let Some(since) = header_str(req, header::IF_UNMODIFIED_SINCE).and_then(parse_http_date) {
        if modified_secs > since {
            return Some(empty_with_status(StatusCode::PRECONDITION_FAILED));
        }
    }

    if req.headers().contains_key(header::IF_NONE_MATCH) {
        return None;
    }
    if let Some(since) = header_str(req, header::IF_MODIFIED_SINCE).and_then(parse_http_date) {
        if modified_secs <= since {
            let mut response = empty_with_status(StatusCode::NOT_MODIFIED);
            if let Some(Ok(value)) = modified.map(|t| http_date(t).parse()) {
                response.headers_mut().insert(header::LAST_MODIFIED, value);
            }
            return Some(response);
        }
    }
    None
}

/// A date-valued `If-Range` keeps the range only while the file is unchanged.
/// Entity tags never match because no `ETag` is emitted.
fn if_range_matches(req: &Request<Body>, modified_secs: Option<i64>) -> bool {
    match header_str(req, header::IF_RANGE) {
        None => true,
        Some(value) => match (parse_http_date(value), modified_secs) {
            (Some(since), Some(modified)) => since == modified,
            _ => false,
        },
    }
}

fn header_str(req: &Request<Body>, name: header::HeaderName) -> Option<&str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn empty_with_status(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
