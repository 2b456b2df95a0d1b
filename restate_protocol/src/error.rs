use std::{error::Error as StdError, fmt};

use serde_json::Value;
use strum_macros::{Display, EnumIter, EnumString};

/// the five ways an invocation can fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum ErrorKind {
    /// the client could not be constructed from its config.
    Configuration,
    /// the payload could not be encoded. Raised before any I/O.
    Serialization,
    /// DNS, connect, timeout or any other failure to exchange a request.
    Transport,
    /// a success response whose body could not be decoded.
    Decoding,
    /// the server answered with a non-success status.
    Remote,
}

/// error detail returned by the ingress with a non-success status.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    pub status: u16,
    pub code: Option<String>,
    pub message: Option<String>,
    /// the response body, verbatim.
    pub body: String,
}

impl RemoteError {
    /// Builds the detail from a status and a raw body.
    ///
    /// The body is expected to be a structured descriptor such as
    /// `{"code":"NOT_FOUND","message":"unknown handler"}`. Numeric codes are
    /// kept in their decimal form. A body that is not such an object leaves
    /// `code` and `message` empty and is still available through `body`.
    pub fn from_body(status: u16, body: &[u8]) -> RemoteError {
        let text = String::from_utf8_lossy(body).into_owned();
        let (code, message) = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => {
                let code = map.get("code").and_then(|c| match c {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                });
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                (code, message)
            }
            _ => (None, None),
        };

        RemoteError {
            status,
            code,
            message,
            body: text,
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.status)?;
        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }
        match &self.message {
            Some(message) => write!(f, ": {}", message),
            None if !self.body.is_empty() => write!(f, ": {}", self.body),
            None => Ok(()),
        }
    }
}

enum Repr {
    Simple(String),
    Custom(Box<dyn StdError + Send + Sync>),
    Timeout(String),
    Remote(RemoteError),
}

pub struct Error {
    kind: ErrorKind,
    repr: Repr,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates an error of `kind` wrapping an underlying cause.
    pub fn new<E>(kind: ErrorKind, error: E) -> Error
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error {
            kind,
            repr: Repr::Custom(error.into()),
        }
    }

    pub fn simple(kind: ErrorKind, msg: impl Into<String>) -> Error {
        Error {
            kind,
            repr: Repr::Simple(msg.into()),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Error {
        Error::simple(ErrorKind::Configuration, msg)
    }

    /// a transport failure caused by an elapsed deadline.
    pub fn timeout(msg: impl Into<String>) -> Error {
        Error {
            kind: ErrorKind::Transport,
            repr: Repr::Timeout(msg.into()),
        }
    }

    pub fn remote(detail: RemoteError) -> Error {
        Error {
            kind: ErrorKind::Remote,
            repr: Repr::Remote(detail),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.repr, Repr::Timeout(_))
    }

    /// Returns the server's error detail if this is a `Remote` error.
    pub fn remote_detail(&self) -> Option<&RemoteError> {
        match &self.repr {
            Repr::Remote(detail) => Some(detail),
            _ => None,
        }
    }

    /// the HTTP status for `Remote` errors.
    pub fn status(&self) -> Option<u16> {
        self.remote_detail().map(|d| d.status)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Error");
        d.field("kind", &self.kind);
        match &self.repr {
            Repr::Simple(msg) => d.field("message", msg),
            Repr::Custom(err) => d.field("error", err),
            Repr::Timeout(msg) => d.field("timeout", msg),
            Repr::Remote(detail) => d.field("remote", detail),
        };
        d.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Simple(msg) => write!(f, "{} error: {}", self.kind, msg),
            Repr::Custom(err) => write!(f, "{} error: {}", self.kind, err),
            Repr::Timeout(msg) => write!(f, "{} error: timed out: {}", self.kind, msg),
            Repr::Remote(detail) => write!(f, "{} error: {}", self.kind, detail),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.repr {
            Repr::Custom(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
