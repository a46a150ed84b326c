use hyper::{Body, Response, StatusCode, header};
use log::error;

/// Redirect with the short HTML body browsers display for GET requests
pub fn redirect_response(status: StatusCode, location: &str, is_head: bool) -> Response<Body> {
    let body = if is_head {
        Body::empty()
    } else {
        let reason = status.canonical_reason().unwrap_or("Redirect");
        Body::from(format!("<a href=\"{}\">{}</a>.\n\n", html_escape(location), reason))
    };
    Response::builder()
        .status(status)
        .header(header::LOCATION, location)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(body)
        .unwrap_or_else(|e| {
            error!("Failed to build redirect to {}: {}", location, e);
            Response::default()
        })
}

/// Response with a status and nothing else
pub fn status_only(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

pub fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
