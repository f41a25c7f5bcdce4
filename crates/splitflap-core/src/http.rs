//! Minimal HTTP/1.0 framing shared by the data client and the web server.
//!
//! Requests are sent with `Connection: close`, so a response body is simply
//! everything after the header block until the peer closes.

use core::fmt::Write;

use heapless::String as HeaplessString;

pub const REQUEST_HEAD_BYTES: usize = 512;
pub const RESPONSE_HEAD_BYTES: usize = 192;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HttpError {
    RequestTooLarge,
    IncompleteHead,
    BadStatusLine,
}

/// Failure of one outbound request, from name lookup to the parsed reply.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestError {
    Dns,
    Connect,
    Write,
    Read,
    Timeout,
    ResponseTooLarge,
    Http(HttpError),
}

impl From<HttpError> for RequestError {
    fn from(value: HttpError) -> Self {
        Self::Http(value)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HttpResponse<'a> {
    pub status: u16,
    pub body: &'a [u8],
}

impl HttpResponse<'_> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub fn get_request(host: &str, path: &str) -> Result<HeaplessString<REQUEST_HEAD_BYTES>, HttpError> {
    let mut request = HeaplessString::new();
    write!(
        request,
        "GET {} HTTP/1.0\r\n\
         Host: {}\r\n\
         User-Agent: splitflap\r\n\
         Accept: application/json\r\n\
         Connection: close\r\n\
         \r\n",
        path, host
    )
    .map_err(|_| HttpError::RequestTooLarge)?;
    Ok(request)
}

/// Offset of the first body byte, once the full header block is buffered.
pub fn head_len(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
        .map(|index| index + HEADER_TERMINATOR.len())
}

pub fn parse_response(buf: &[u8]) -> Result<HttpResponse<'_>, HttpError> {
    let body_start = head_len(buf).ok_or(HttpError::IncompleteHead)?;
    let head = core::str::from_utf8(&buf[..body_start]).map_err(|_| HttpError::BadStatusLine)?;
    let status_line = head.lines().next().ok_or(HttpError::BadStatusLine)?;

    let mut parts = status_line.split_whitespace();
    let version = parts.next().ok_or(HttpError::BadStatusLine)?;
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::BadStatusLine);
    }
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .filter(|code| (100..600).contains(code))
        .ok_or(HttpError::BadStatusLine)?;

    Ok(HttpResponse {
        status,
        body: &buf[body_start..],
    })
}

/// Header block for a server reply whose body length is known up front.
pub fn response_head(
    status: u16,
    reason: &str,
    content_type: &str,
    content_length: usize,
) -> HeaplessString<RESPONSE_HEAD_BYTES> {
    let mut head = HeaplessString::new();
    let _ = write!(
        head,
        "HTTP/1.0 {} {}\r\n\
         Content-Type: {}\r\n\
         Connection: close\r\n\
         Content-Length: {}\r\n\
         \r\n",
        status, reason, content_type, content_length
    );
    head
}

#[cfg(test)]
mod tests;
