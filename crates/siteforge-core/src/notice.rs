//! Run-scoped accumulation of messages, warnings and errors.

use serde::Serialize;

use crate::error::PipelineError;

/// Protocol that reached the new site's pre-install callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackProtocol {
    Secure,
    Insecure,
}

impl CallbackProtocol {
    pub fn scheme(self) -> &'static str {
        match self {
            CallbackProtocol::Secure => "https",
            CallbackProtocol::Insecure => "http",
        }
    }
}

/// Named outcomes later steps or the caller consult.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcomes {
    pub connection_ok: bool,
    pub schema_created: bool,
    pub schema_imported: bool,
    pub callback_protocol: Option<CallbackProtocol>,
    pub installed_marker_written: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NoticeLog {
    pub messages: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<PipelineError>,
    pub outcomes: Outcomes,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!("{}", text);
        self.messages.push(text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!("{}", text);
        self.warnings.push(text);
    }

    pub fn error(&mut self, err: PipelineError) {
        tracing::error!(kind = err.kind().as_str(), "{}", err);
        self.errors.push(err);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
