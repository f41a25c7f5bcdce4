use super::*;

#[test]
fn get_request_is_http10_with_close() {
    let request = get_request("api.synopticdata.com", "/v2/stations/latest?limit=5").unwrap();
    assert!(request.starts_with("GET /v2/stations/latest?limit=5 HTTP/1.0\r\n"));
    assert!(request.contains("\r\nHost: api.synopticdata.com\r\n"));
    assert!(request.contains("\r\nConnection: close\r\n"));
    assert!(request.ends_with("\r\n\r\n"));
}

#[test]
fn oversized_request_is_rejected() {
    let path = "/x".repeat(REQUEST_HEAD_BYTES);
    assert_eq!(
        get_request("example.com", &path),
        Err(HttpError::RequestTooLarge)
    );
}

#[test]
fn response_splits_status_and_body() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{\"STATION\":[]}";
    let response = parse_response(raw).unwrap();
    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert_eq!(response.body, b"{\"STATION\":[]}");
}

#[test]
fn error_status_is_returned_not_rejected() {
    let response = parse_response(b"HTTP/1.0 503 Service Unavailable\r\n\r\n").unwrap();
    assert_eq!(response.status, 503);
    assert!(!response.is_success());
    assert!(response.body.is_empty());
}

#[test]
fn truncated_or_garbled_heads_fail() {
    assert_eq!(
        parse_response(b"HTTP/1.1 200 OK\r\nContent-Type: text"),
        Err(HttpError::IncompleteHead)
    );
    assert_eq!(
        parse_response(b"SSH-2.0-OpenSSH\r\n\r\n"),
        Err(HttpError::BadStatusLine)
    );
    assert_eq!(
        parse_response(b"HTTP/1.1 OK\r\n\r\n"),
        Err(HttpError::BadStatusLine)
    );
}

#[test]
fn head_len_points_past_terminator() {
    assert_eq!(head_len(b"GET / HTTP/1.0\r\n\r\nrest"), Some(18));
    assert_eq!(head_len(b"GET / HTTP/1.0\r\n"), None);
}

#[test]
fn response_head_carries_length() {
    let head = response_head(404, "Not Found", "text/plain", 17);
    assert!(head.starts_with("HTTP/1.0 404 Not Found\r\n"));
    assert!(head.contains("Content-Type: text/plain\r\n"));
    assert!(head.contains("Content-Length: 17\r\n"));
}

#[test]
fn http_errors_convert_into_request_errors() {
    let err: RequestError = HttpError::BadStatusLine.into();
    assert_eq!(err, RequestError::Http(HttpError::BadStatusLine));
}
