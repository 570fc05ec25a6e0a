use bytes::{Buf, BytesMut};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::time::Duration;

use crate::common::{Error, ErrorKind, Result};

const HEADER_END: &[u8] = b"\r\n\r\n";
// Requests with a larger head are rejected.
const MAX_HEAD_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Request {
    pub(crate) method: String,
    // Request target without the query string.
    pub(crate) path: String,
}

impl Request {
    // Ok(None) while the head is incomplete.
    fn parse(buf: &[u8]) -> Result<Option<(Request, usize)>> {
        let end = match buf.windows(HEADER_END.len()).position(|w| w == HEADER_END) {
            Some(pos) => pos + HEADER_END.len(),
            None if buf.len() > MAX_HEAD_BYTES => {
                return Err(invalid("request head too large"));
            }
            None => return Ok(None),
        };

        let head = std::str::from_utf8(&buf[..end]).map_err(|_| invalid("request head is not utf8"))?;
        let line = head.lines().next().unwrap_or_default();
        let mut parts = line.split_whitespace();
        let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(target), Some(version)) => (method, target, version),
            _ => return Err(invalid("malformed request line")),
        };
        if parts.next().is_some() || !version.starts_with("HTTP/1.") {
            return Err(invalid("malformed request line"));
        }
        if !target.starts_with('/') {
            return Err(invalid("request target must be an absolute path"));
        }

        let path = target.split('?').next().unwrap_or(target);
        Ok(Some((
            Request {
                method: method.to_owned(),
                path: path.to_owned(),
            },
            end,
        )))
    }
}

fn invalid(description: &str) -> Error {
    ErrorKind::InvalidRequest(description.to_owned()).into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Ok,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl Status {
    pub(crate) fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::InternalServerError => 500,
        }
    }

    fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Response {
    pub(crate) status: Status,
    pub(crate) content_type: &'static str,
    pub(crate) body: Vec<u8>,
}

impl Response {
    pub(crate) fn html(body: String) -> Self {
        Self {
            status: Status::Ok,
            content_type: "text/html; charset=utf-8",
            body: body.into_bytes(),
        }
    }

    pub(crate) fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status: Status::Ok,
                content_type: "application/json",
                body,
            },
            Err(_) => Response::error(Status::InternalServerError),
        }
    }

    pub(crate) fn error(status: Status) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: format!("{} {}\n", status.code(), status.reason()).into_bytes(),
        }
    }
}

/// One http/1.1 connection serving a single request.
pub(crate) struct Connection<T = TcpStream> {
    stream: BufWriter<T>,
    // The buffer for reading the request head.
    buffer: BytesMut,
}

impl<T> Connection<T>
where
    T: AsyncWrite + AsyncRead + Unpin,
{
    pub(crate) fn new(stream: T, buffer_size: Option<usize>) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(buffer_size.unwrap_or(4 * 1024)),
        }
    }

    pub(crate) async fn read_request_with_timeout(
        &mut self,
        duration: Duration,
    ) -> Result<Option<Request>> {
        match tokio::time::timeout(duration, self.read_request()).await {
            Ok(read_result) => read_result,
            Err(elapsed) => Err(Error::from(elapsed)),
        }
    }

    pub(crate) async fn read_request(&mut self) -> Result<Option<Request>> {
        loop {
            if let Some((request, len)) = Request::parse(&self.buffer[..])? {
                self.buffer.advance(len);
                return Ok(Some(request));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(invalid("connection closed inside the request head"))
                };
            }
        }
    }

    pub(crate) async fn write_response(&mut self, response: &Response) -> Result<()> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            response.status.code(),
            response.status.reason(),
            response.content_type,
            response.body.len(),
        );
        if response.status == Status::MethodNotAllowed {
            head.push_str("Allow: GET\r\n");
        }
        head.push_str("\r\n");

        self.stream.write_all(head.as_bytes()).await?;
        self.stream.write_all(&response.body).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
