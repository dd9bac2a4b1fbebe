//! UI <-> controller message shapes (§6 of the spec). Wire format is irrelevant -- this module
//! defines only the semantic content, mirroring `main_controller.py`'s `msg_code`-tagged dicts as
//! a tagged `enum` per this crate's dispatch-table-to-match-arm convention.

use uuid::Uuid;

use crate::core::screen::view::{ScrollRequest, Projection};

pub type SessionId = Uuid;

/// A message the UI sends to the controller.
#[derive(Debug, Clone)]
pub enum UiToController {
    Login {
        session_id: SessionId,
        hostname: String,
        port: u16,
        username: String,
        password: String,
        page_line_count: usize,
    },
    /// `command` is a key sequence already translated to bytes via [`super::keys::Key`].
    UserCommand { session_id: SessionId, command: Vec<u8> },
    RemoveSession { session_id: SessionId },
    ScrollWindow { session_id: SessionId, request: ScrollRequest },
    /// Triggered by the user pressing `r` while a session is inactive.
    ReconnectShell { session_id: SessionId },
}

/// The outcome of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginResult {
    Success,
    Error(String),
}

/// A message the controller sends back to the UI.
#[derive(Debug, Clone)]
pub enum ControllerToUi {
    LoginRsp { session_id: SessionId, result: LoginResult, page_line_count: usize },
    /// One entry per session whose content changed since the last flush.
    SessionViewContent(Vec<SessionViewUpdate>),
    SessionInactive { session_id: SessionId },
    ReconnectShellFail { session_id: SessionId },
}

#[derive(Debug, Clone)]
pub struct SessionViewUpdate {
    pub session_id: SessionId,
    pub view: Projection,
}
