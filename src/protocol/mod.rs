//! Wire-level types for the Remote In protocol.
//!
//! One request frame is answered by exactly one response frame:
//!
//! ```text
//! ?<ReqID> <Command> [Key:Value ...]\n
//! <ReqID> OK [Key:Value ...]\n
//! <ReqID> ERROR:<tag> [Key:Value ...]\n
//! ```
//!
//! The request ID is an opaque token chosen by the client and echoed back
//! verbatim. Clients in the wild use a 4-hex-digit counter, but the engine
//! assigns no meaning to the format.

use std::collections::HashMap;

pub mod codec;

/// Protocol version reported by `Connect`.
pub const PROTOCOL_VERSION: &str = "1.2";

/// Default TCP port of the Remote In interface.
pub const DEFAULT_PORT: u16 = 7010;

/// Commands understood by the protocol engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Connect,
    Disconnect,
    GetAnalyzerVisibleName,
    GetAllAnalyzerParameterNames,
    GetAnalyzerParameterValue,
    GetAnalyzerParameterInfo,
    SetAnalyzerParameterValue,
    DefineSpectrumFat,
    ValidateSpectrum,
    Start,
    GetAcquisitionStatus,
    GetAcquisitionData,
    ClearSpectrum,
}

impl CommandKind {
    /// Parses a command name as it appears on the wire.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Connect" => Some(Self::Connect),
            "Disconnect" => Some(Self::Disconnect),
            "GetAnalyzerVisibleName" => Some(Self::GetAnalyzerVisibleName),
            "GetAllAnalyzerParameterNames" => Some(Self::GetAllAnalyzerParameterNames),
            "GetAnalyzerParameterValue" => Some(Self::GetAnalyzerParameterValue),
            "GetAnalyzerParameterInfo" => Some(Self::GetAnalyzerParameterInfo),
            "SetAnalyzerParameterValue" => Some(Self::SetAnalyzerParameterValue),
            "DefineSpectrumFAT" => Some(Self::DefineSpectrumFat),
            "ValidateSpectrum" => Some(Self::ValidateSpectrum),
            "Start" => Some(Self::Start),
            "GetAcquisitionStatus" => Some(Self::GetAcquisitionStatus),
            "GetAcquisitionData" => Some(Self::GetAcquisitionData),
            "ClearSpectrum" => Some(Self::ClearSpectrum),
            _ => None,
        }
    }

    /// Wire spelling of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect => "Connect",
            Self::Disconnect => "Disconnect",
            Self::GetAnalyzerVisibleName => "GetAnalyzerVisibleName",
            Self::GetAllAnalyzerParameterNames => "GetAllAnalyzerParameterNames",
            Self::GetAnalyzerParameterValue => "GetAnalyzerParameterValue",
            Self::GetAnalyzerParameterInfo => "GetAnalyzerParameterInfo",
            Self::SetAnalyzerParameterValue => "SetAnalyzerParameterValue",
            Self::DefineSpectrumFat => "DefineSpectrumFAT",
            Self::ValidateSpectrum => "ValidateSpectrum",
            Self::Start => "Start",
            Self::GetAcquisitionStatus => "GetAcquisitionStatus",
            Self::GetAcquisitionData => "GetAcquisitionData",
            Self::ClearSpectrum => "ClearSpectrum",
        }
    }
}

/// Machine-readable error tags carried by `ERROR:<tag>` responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTag {
    DecodeError,
    UnknownCommand,
    InvalidState,
    MissingOrInvalidField,
    OutOfRange,
    NotYetAvailable,
    OutOfBounds,
    IoError,
}

impl ErrorTag {
    /// Wire spelling of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecodeError => "decode_error",
            Self::UnknownCommand => "unknown_command",
            Self::InvalidState => "invalid_state",
            Self::MissingOrInvalidField => "missing_or_invalid_field",
            Self::OutOfRange => "out_of_range",
            Self::NotYetAvailable => "not_yet_available",
            Self::OutOfBounds => "out_of_bounds",
            Self::IoError => "io_error",
        }
    }

    /// Parses a wire tag.
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "decode_error" => Some(Self::DecodeError),
            "unknown_command" => Some(Self::UnknownCommand),
            "invalid_state" => Some(Self::InvalidState),
            "missing_or_invalid_field" => Some(Self::MissingOrInvalidField),
            "out_of_range" => Some(Self::OutOfRange),
            "not_yet_available" => Some(Self::NotYetAvailable),
            "out_of_bounds" => Some(Self::OutOfBounds),
            "io_error" => Some(Self::IoError),
            _ => None,
        }
    }
}

/// One decoded request frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Client-chosen correlation token, echoed in the response.
    pub req_id: String,
    /// The requested operation.
    pub command: CommandKind,
    /// Key/value parameters, unquoted.
    pub params: HashMap<String, String>,
}

impl Request {
    /// Looks up a parameter by key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error(ErrorTag),
}

/// One response frame.
///
/// Parameters keep their insertion order so replies read the same way the
/// handlers built them.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Correlation token echoed from the request.
    pub req_id: String,
    /// `OK` or `ERROR:<tag>`.
    pub status: Status,
    /// Key/value parameters, unquoted.
    pub params: Vec<(String, String)>,
}

impl Response {
    /// A successful response with no parameters yet.
    pub fn ok(req_id: impl Into<String>) -> Self {
        Self {
            req_id: req_id.into(),
            status: Status::Ok,
            params: Vec::new(),
        }
    }

    /// An error response carrying `tag`.
    pub fn error(req_id: impl Into<String>, tag: ErrorTag) -> Self {
        Self {
            req_id: req_id.into(),
            status: Status::Error(tag),
            params: Vec::new(),
        }
    }

    /// Appends one key/value parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// True when the status is `OK`.
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// The error tag, if this is an error response.
    pub fn error_tag(&self) -> Option<ErrorTag> {
        match self.status {
            Status::Ok => None,
            Status::Error(tag) => Some(tag),
        }
    }

    /// Looks up a parameter by key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
