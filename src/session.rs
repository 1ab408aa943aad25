//! Per-connection protocol session.
//!
//! One [`Session`] exists per client connection and owns everything that
//! connection can see: the acquisition workflow state, the raw and validated
//! spectrum definitions, the running job and a private copy of the device
//! parameter table. A command arriving outside its legal source state is
//! answered with `ERROR:invalid_state` and leaves the session untouched;
//! state is never coerced to make a command fit.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::analyzer::acquisition::{AcquisitionJob, JobState, RangeError};
use crate::analyzer::spectrum::{SpectrumDefinition, ValidationError};
use crate::analyzer::ParameterTable;
use crate::clock::Clock;
use crate::config::AnalyzerSettings;
use crate::protocol::{CommandKind, ErrorTag, Request, Response, PROTOCOL_VERSION};

/// Server identity reported by `Connect`.
const SERVER_NAME: &str = "SpecsLab Prodigy Simulator";

/// Acquisition workflow states of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Initial state; only `Connect` and `Disconnect` are legal.
    Disconnected,
    /// Handshake done, no spectrum defined.
    Connected,
    /// A definition was submitted but not validated yet.
    SpectrumDefined,
    /// The definition passed validation and may be started.
    Validated,
    /// An acquisition is in flight.
    Acquiring,
    /// All samples of the current acquisition are ready.
    Completed,
}

impl SessionState {
    /// Diagnostic spelling used in `invalid_state` replies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
            Self::SpectrumDefined => "SpectrumDefined",
            Self::Validated => "Validated",
            Self::Acquiring => "Acquiring",
            Self::Completed => "Completed",
        }
    }
}

/// What the dispatcher should do with the connection after a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Close,
}

/// State machine for one client connection.
pub struct Session {
    peer: String,
    state: SessionState,
    last_req_id: Option<String>,
    raw_definition: Option<HashMap<String, String>>,
    definition: Option<SpectrumDefinition>,
    job: Option<AcquisitionJob>,
    visible_name: String,
    parameters: ParameterTable,
    clock: Arc<dyn Clock>,
}

impl Session {
    /// Creates a session for `peer` with its own copy of the analyzer state.
    pub fn new(peer: impl Into<String>, analyzer: AnalyzerSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            peer: peer.into(),
            state: SessionState::Disconnected,
            last_req_id: None,
            raw_definition: None,
            definition: None,
            job: None,
            visible_name: analyzer.visible_name,
            parameters: analyzer.parameters,
            clock,
        }
    }

    /// Current workflow state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Request ID of the most recent command, kept for diagnostics only.
    pub fn last_req_id(&self) -> Option<&str> {
        self.last_req_id.as_deref()
    }

    /// Handles one decoded request and produces exactly one response.
    pub fn handle(&mut self, request: &Request) -> (Response, ControlFlow) {
        self.last_req_id = Some(request.req_id.clone());
        debug!(
            "{}: {} in state {}",
            self.peer,
            request.command.name(),
            self.state.as_str()
        );

        match request.command {
            CommandKind::Connect => (self.cmd_connect(request), ControlFlow::Continue),
            CommandKind::Disconnect => {
                self.state = SessionState::Disconnected;
                (Response::ok(&request.req_id), ControlFlow::Close)
            }
            _ if self.state == SessionState::Disconnected => {
                (self.invalid_state(request), ControlFlow::Continue)
            }
            CommandKind::GetAnalyzerVisibleName => (
                Response::ok(&request.req_id).with_param("VisibleName", self.visible_name.clone()),
                ControlFlow::Continue,
            ),
            CommandKind::GetAllAnalyzerParameterNames => {
                (self.cmd_parameter_names(request), ControlFlow::Continue)
            }
            CommandKind::GetAnalyzerParameterValue => {
                (self.cmd_parameter_value(request), ControlFlow::Continue)
            }
            CommandKind::GetAnalyzerParameterInfo => {
                (self.cmd_parameter_info(request), ControlFlow::Continue)
            }
            CommandKind::SetAnalyzerParameterValue => {
                (self.cmd_set_parameter(request), ControlFlow::Continue)
            }
            CommandKind::DefineSpectrumFat => (self.cmd_define_fat(request), ControlFlow::Continue),
            CommandKind::ValidateSpectrum => (self.cmd_validate(request), ControlFlow::Continue),
            CommandKind::Start => (self.cmd_start(request), ControlFlow::Continue),
            CommandKind::GetAcquisitionStatus => (self.cmd_status(request), ControlFlow::Continue),
            CommandKind::GetAcquisitionData => (self.cmd_data(request), ControlFlow::Continue),
            CommandKind::ClearSpectrum => (self.cmd_clear(request), ControlFlow::Continue),
        }
    }

    fn invalid_state(&self, request: &Request) -> Response {
        Response::error(&request.req_id, ErrorTag::InvalidState)
            .with_param("Command", request.command.name())
            .with_param("State", self.state.as_str())
    }

    fn missing_field(&self, request: &Request, key: &str) -> Response {
        Response::error(&request.req_id, ErrorTag::MissingOrInvalidField).with_param("field", key)
    }

    fn unknown_parameter(&self, request: &Request, name: &str) -> Response {
        Response::error(&request.req_id, ErrorTag::MissingOrInvalidField)
            .with_param("ParameterName", name)
    }

    fn cmd_connect(&mut self, request: &Request) -> Response {
        if self.state != SessionState::Disconnected {
            return self.invalid_state(request);
        }
        self.state = SessionState::Connected;
        Response::ok(&request.req_id)
            .with_param("ServerName", SERVER_NAME)
            .with_param("ProtocolVersion", PROTOCOL_VERSION)
    }

    fn cmd_parameter_names(&self, request: &Request) -> Response {
        let names = self
            .parameters
            .names()
            .map(|name| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(",");
        Response::ok(&request.req_id).with_param("ParameterNames", format!("[{names}]"))
    }

    fn cmd_parameter_value(&self, request: &Request) -> Response {
        let name = match request.param("ParameterName") {
            Some(name) => name,
            None => return self.missing_field(request, "ParameterName"),
        };
        match self.parameters.get(name) {
            Some(entry) => Response::ok(&request.req_id)
                .with_param("Name", name)
                .with_param("Value", entry.value.clone()),
            None => self.unknown_parameter(request, name),
        }
    }

    fn cmd_parameter_info(&self, request: &Request) -> Response {
        let name = match request.param("ParameterName") {
            Some(name) => name,
            None => return self.missing_field(request, "ParameterName"),
        };
        match self.parameters.get(name) {
            Some(entry) => {
                Response::ok(&request.req_id).with_param("ValueType", entry.value_type.clone())
            }
            None => self.unknown_parameter(request, name),
        }
    }

    fn cmd_set_parameter(&mut self, request: &Request) -> Response {
        let name = match request.param("ParameterName") {
            Some(name) => name.to_string(),
            None => return self.missing_field(request, "ParameterName"),
        };
        let value = match request.param("Value") {
            Some(value) => value.to_string(),
            None => return self.missing_field(request, "Value"),
        };
        if self.parameters.set(&name, &value) {
            Response::ok(&request.req_id)
        } else {
            self.unknown_parameter(request, &name)
        }
    }

    fn cmd_define_fat(&mut self, request: &Request) -> Response {
        match self.state {
            SessionState::Connected
            | SessionState::SpectrumDefined
            | SessionState::Validated
            | SessionState::Completed => {}
            _ => return self.invalid_state(request),
        }
        // A new definition supersedes whatever came before it, including a
        // finished job still holding data.
        self.raw_definition = Some(request.params.clone());
        self.definition = None;
        self.job = None;
        self.state = SessionState::SpectrumDefined;
        Response::ok(&request.req_id)
    }

    fn cmd_validate(&mut self, request: &Request) -> Response {
        if self.state != SessionState::SpectrumDefined {
            return self.invalid_state(request);
        }
        let raw = match &self.raw_definition {
            Some(raw) => raw,
            None => return self.invalid_state(request),
        };
        match SpectrumDefinition::validate(raw) {
            Ok(definition) => {
                let mut response = Response::ok(&request.req_id)
                    .with_param("StartEnergy", definition.start_energy.to_string())
                    .with_param("EndEnergy", definition.end_energy.to_string())
                    .with_param("StepWidth", definition.step_width.to_string())
                    .with_param("Samples", definition.sample_count().to_string())
                    .with_param("DwellTime", definition.dwell_time.to_string())
                    .with_param("PassEnergy", definition.pass_energy.to_string());
                if let Some(lens_mode) = &definition.lens_mode {
                    response = response.with_param("LensMode", lens_mode.clone());
                }
                if let Some(scan_range) = &definition.scan_range {
                    response = response.with_param("ScanRange", scan_range.clone());
                }
                self.definition = Some(definition);
                self.state = SessionState::Validated;
                response
            }
            Err(err) => {
                let tag = match err {
                    ValidationError::MissingOrInvalidField(_) => ErrorTag::MissingOrInvalidField,
                    ValidationError::OutOfRange(_) => ErrorTag::OutOfRange,
                };
                Response::error(&request.req_id, tag).with_param("field", err.field())
            }
        }
    }

    fn cmd_start(&mut self, request: &Request) -> Response {
        if self.state != SessionState::Validated {
            return self.invalid_state(request);
        }
        let definition = match &self.definition {
            Some(definition) => definition.clone(),
            None => return self.invalid_state(request),
        };
        self.job = Some(AcquisitionJob::start(definition, self.clock.now()));
        self.state = SessionState::Acquiring;
        Response::ok(&request.req_id)
    }

    fn cmd_status(&mut self, request: &Request) -> Response {
        if !matches!(
            self.state,
            SessionState::Acquiring | SessionState::Completed
        ) {
            return self.invalid_state(request);
        }
        let now = self.clock.now();
        let (progress, elapsed) = match self.job.as_mut() {
            Some(job) => (job.poll(now), job.elapsed_secs(now)),
            None => return self.invalid_state(request),
        };
        if progress.state == JobState::Completed {
            self.state = SessionState::Completed;
        }
        Response::ok(&request.req_id)
            .with_param("ControllerState", progress.state.as_str())
            .with_param(
                "NumberOfAcquiredPoints",
                progress.samples_ready.to_string(),
            )
            .with_param("ElapsedTime", format!("{elapsed:.2}"))
    }

    fn cmd_data(&mut self, request: &Request) -> Response {
        if !matches!(
            self.state,
            SessionState::Acquiring | SessionState::Completed
        ) {
            return self.invalid_state(request);
        }
        let from = match self.index_param(request, "FromIndex") {
            Ok(index) => index,
            Err(response) => return response,
        };
        let to = match self.index_param(request, "ToIndex") {
            Ok(index) => index,
            Err(response) => return response,
        };

        let now = self.clock.now();
        let (progress, result) = match self.job.as_mut() {
            Some(job) => (job.poll(now), job.read(from, to, now)),
            None => return self.invalid_state(request),
        };
        if progress.state == JobState::Completed {
            self.state = SessionState::Completed;
        }

        match result {
            Ok(values) => {
                let data = values
                    .iter()
                    .map(|value| format!("{value:.6}"))
                    .collect::<Vec<_>>()
                    .join(",");
                Response::ok(&request.req_id)
                    .with_param("FromIndex", from.to_string())
                    .with_param("ToIndex", to.to_string())
                    .with_param("Data", format!("[{data}]"))
            }
            Err(RangeError::OutOfBounds { sample_count, .. }) => {
                Response::error(&request.req_id, ErrorTag::OutOfBounds)
                    .with_param("FromIndex", from.to_string())
                    .with_param("ToIndex", to.to_string())
                    .with_param("Samples", sample_count.to_string())
            }
            Err(RangeError::NotYetAvailable { samples_ready, .. }) => {
                Response::error(&request.req_id, ErrorTag::NotYetAvailable)
                    .with_param("ToIndex", to.to_string())
                    .with_param("NumberOfAcquiredPoints", samples_ready.to_string())
            }
        }
    }

    fn cmd_clear(&mut self, request: &Request) -> Response {
        match self.state {
            SessionState::SpectrumDefined
            | SessionState::Validated
            | SessionState::Acquiring
            | SessionState::Completed => {}
            _ => return self.invalid_state(request),
        }
        self.raw_definition = None;
        self.definition = None;
        self.job = None;
        self.state = SessionState::Connected;
        Response::ok(&request.req_id)
    }

    fn index_param(&self, request: &Request, key: &str) -> Result<usize, Response> {
        let value = request
            .param(key)
            .ok_or_else(|| self.missing_field(request, key))?;
        value
            .trim()
            .parse()
            .map_err(|_| self.missing_field(request, key))
    }
}
