//! `MessageRouter`: owns the `session_id -> ScreenDocument` map and the
//! `session_id -> mpsc::Sender<ControllerToTransport>` map described in §5/§6, and translates
//! keystrokes to wire bytes. Grounded on `main_controller.py`'s `RemoteAgentRouter` +
//! `MainController` (process-per-agent + queue-per-session routing, translated to
//! task-per-agent + `mpsc`-channel-per-session routing).

pub mod keys;
pub mod messages;

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::core::screen::document::ScreenDocument;
use crate::core::screen::view::ViewProjector;
use messages::{ControllerToUi, LoginResult, SessionId, SessionViewUpdate, UiToController};

/// A message routed from the controller down to the transport reader task owning a session's
/// shell.
#[derive(Debug, Clone)]
pub enum ControllerToTransport {
    Write { session_id: SessionId, bytes: Vec<u8> },
    RemoveSession { session_id: SessionId },
    Reconnect { session_id: SessionId },
}

/// Maps each live session to the document it feeds and the transport-reader inbox that owns its
/// shell. A session's `ScreenDocument` is owned by exactly one task (the transport reader); the
/// router only ever posts to it from here, never mutates it directly, per the spec's
/// shared-resource discipline -- except `ScreenDocument`'s own interior-mutable scroll-request
/// queue and `stick_to_bottom` flag, which the UI is allowed to touch straight through.
#[derive(Default)]
pub struct MessageRouter {
    documents: HashMap<SessionId, ScreenDocument>,
    transport_inboxes: HashMap<SessionId, mpsc::UnboundedSender<ControllerToTransport>>,
    last_sent: HashMap<SessionId, Vec<u8>>,
}

impl MessageRouter {
    pub fn new() -> Self { Self::default() }

    pub fn register_session(
        &mut self,
        session_id: SessionId,
        page_line_count: usize,
        inbox: mpsc::UnboundedSender<ControllerToTransport>,
    ) {
        self.documents.insert(session_id, ScreenDocument::new(page_line_count.max(1)));
        self.transport_inboxes.insert(session_id, inbox);
    }

    pub fn document_mut(&mut self, session_id: &SessionId) -> Option<&mut ScreenDocument> {
        self.documents.get_mut(session_id)
    }

    /// Handle a message from the UI, producing zero or more replies to send back immediately
    /// (e.g. a login failure). Session-string delivery from the transport side goes through
    /// [`Self::apply_remote_tokens`] instead.
    pub fn handle_ui_message(&mut self, msg: UiToController) -> Vec<ControllerToUi> {
        match msg {
            UiToController::Login { session_id, page_line_count, .. } => {
                // The actual SSH connect happens in the transport layer; this just ensures a
                // document exists so view flushes have somewhere to land once login succeeds.
                if !self.documents.contains_key(&session_id) {
                    self.documents.insert(session_id, ScreenDocument::new(page_line_count.max(1)));
                }
                Vec::new()
            }
            UiToController::UserCommand { session_id, command } => {
                self.last_sent.insert(session_id, command.clone());
                if let Some(doc) = self.documents.get(&session_id) {
                    doc.set_stick_to_bottom(true);
                }
                self.send_to_transport(session_id, ControllerToTransport::Write { session_id, bytes: command });
                Vec::new()
            }
            UiToController::RemoveSession { session_id } => {
                self.send_to_transport(session_id, ControllerToTransport::RemoveSession { session_id });
                self.documents.remove(&session_id);
                self.transport_inboxes.remove(&session_id);
                self.last_sent.remove(&session_id);
                Vec::new()
            }
            UiToController::ScrollWindow { session_id, request } => {
                if let Some(doc) = self.documents.get(&session_id) {
                    doc.add_scroll_request(request);
                }
                Vec::new()
            }
            UiToController::ReconnectShell { session_id } => {
                self.send_to_transport(session_id, ControllerToTransport::Reconnect { session_id });
                Vec::new()
            }
        }
    }

    pub fn last_sent(&self, session_id: &SessionId) -> Option<&[u8]> {
        self.last_sent.get(session_id).map(Vec::as_slice)
    }

    pub fn finish_login(&mut self, session_id: SessionId, result: LoginResult, page_line_count: usize) -> ControllerToUi {
        ControllerToUi::LoginRsp { session_id, result, page_line_count }
    }

    pub fn session_inactive(&mut self, session_id: SessionId) -> ControllerToUi {
        if let Some(doc) = self.documents.get_mut(&session_id) {
            doc.insert_session_fail_msg("session is disconnected. Press 'r' to reconnect.");
        }
        ControllerToUi::SessionInactive { session_id }
    }

    pub fn reconnect_shell_fail(&mut self, session_id: SessionId) -> ControllerToUi {
        if let Some(doc) = self.documents.get_mut(&session_id) {
            doc.insert_session_fail_msg(
                "reconnect shell failed. Please check network or server status, and Press 'r' to retry.",
            );
        }
        ControllerToUi::ReconnectShellFail { session_id }
    }

    /// Run the projector over every document that changed and bundle the result, mirroring
    /// `MainController.flush_view_update_contents`.
    pub fn flush_view_updates(&mut self) -> Option<ControllerToUi> {
        let mut updates = Vec::new();
        for (session_id, doc) in self.documents.iter_mut() {
            if let Some(view) = ViewProjector::project(doc) {
                updates.push(SessionViewUpdate { session_id: *session_id, view });
            }
        }
        if updates.is_empty() { None } else { Some(ControllerToUi::SessionViewContent(updates)) }
    }

    fn send_to_transport(&self, session_id: SessionId, msg: ControllerToTransport) {
        if let Some(tx) = self.transport_inboxes.get(&session_id) {
            if tx.send(msg).is_err() {
                tracing::debug!(%session_id, "transport inbox closed, dropping message");
            }
        }
    }
}
