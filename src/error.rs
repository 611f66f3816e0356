//! Fleet error types.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

/// Fleet error carrying a kind and a key/value payload for reporting.
#[derive(Debug)]
pub struct FleetError {
    payload: HashMap<String, String>,
    kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or duplicate instance configuration
    Config,
    /// Unknown or ambiguous instance name
    InvalidInstance,
    /// Operation name outside the supported set
    UnknownOperation,
    /// Identity record present but not readable or removable
    FileAccess,
    /// Control program missing or not spawnable
    Launch,
    /// Instance did not stop within the retry budget
    ServerStop,
    /// File system error
    Io,
}

impl ErrorKind {
    pub fn code(&self) -> u32 {
        match self {
            Self::Config => 1001,
            Self::InvalidInstance => 1002,
            Self::UnknownOperation => 1003,
            Self::FileAccess => 2001,
            Self::Io => 2002,
            Self::Launch => 3001,
            Self::ServerStop => 3002,
        }
    }
}

impl FleetError {
    pub fn new(kind: ErrorKind, payload: HashMap<String, String>) -> Self {
        Self { payload, kind }
    }

    /// Create an error with a single "detail" key from a non-empty string,
    /// or an empty payload if the string is empty.
    fn with_detail(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let payload = if detail.is_empty() {
            HashMap::new()
        } else {
            HashMap::from([("detail".to_string(), detail)])
        };
        Self::new(kind, payload)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Config, message)
    }

    pub fn invalid_instance(name: &str) -> Self {
        Self::new(
            ErrorKind::InvalidInstance,
            HashMap::from([("instance".to_string(), name.to_string())]),
        )
    }

    /// Several unknown names reported at once, in the order given.
    pub fn invalid_instances(names: &[String]) -> Self {
        Self::new(
            ErrorKind::InvalidInstance,
            HashMap::from([("instances".to_string(), names.join(","))]),
        )
    }

    pub fn unknown_operation(name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownOperation,
            HashMap::from([("operation".to_string(), name.to_string())]),
        )
    }

    pub fn file_access(path: &Path, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::FileAccess,
            HashMap::from([
                ("path".to_string(), path.display().to_string()),
                ("detail".to_string(), detail.into()),
            ]),
        )
    }

    pub fn launch(program: &Path, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Launch,
            HashMap::from([
                ("program".to_string(), program.display().to_string()),
                ("detail".to_string(), detail.into()),
            ]),
        )
    }

    pub fn server_stop(instance: &str, pid: u32) -> Self {
        Self::new(
            ErrorKind::ServerStop,
            HashMap::from([
                ("instance".to_string(), instance.to_string()),
                ("pid".to_string(), pid.to_string()),
            ]),
        )
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Io, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Look up a payload value, e.g. `"pid"` on a server stop error.
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.payload.get(key).map(String::as_str)
    }
}

impl fmt::Display for FleetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            let mut pairs: Vec<String> = self
                .payload
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            pairs.sort();
            write!(f, "{:?}: {}", self.kind, pairs.join(", "))
        }
    }
}

impl std::error::Error for FleetError {}

impl Serialize for FleetError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct as _;
        let mut s = serializer.serialize_struct("FleetError", 3)?;
        s.serialize_field("code", &self.kind.code())?;
        s.serialize_field("kind", &self.kind)?;
        s.serialize_field("payload", &self.payload)?;
        s.end()
    }
}

impl From<std::io::Error> for FleetError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for FleetError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<serde_json::Error> for FleetError {
    fn from(err: serde_json::Error) -> Self {
        Self::io(err.to_string())
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, FleetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_stop_carries_instance_and_pid() {
        let err = FleetError::server_stop("main", 4242);
        assert_eq!(err.kind(), ErrorKind::ServerStop);
        assert_eq!(err.detail("instance"), Some("main"));
        assert_eq!(err.detail("pid"), Some("4242"));
        assert_eq!(err.to_string(), "ServerStop: instance=main, pid=4242");
    }

    #[test]
    fn empty_detail_leaves_payload_empty() {
        let err = FleetError::config("");
        assert_eq!(err.to_string(), "Config");
    }

    #[test]
    fn serializes_code_and_payload() {
        let err = FleetError::invalid_instance("ghost");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], 1002);
        assert_eq!(json["kind"], "invalid_instance");
        assert_eq!(json["payload"]["instance"], "ghost");
    }
}
