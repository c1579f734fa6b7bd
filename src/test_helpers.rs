use crate::config::{MAX_SOCKETS, NUM_PDN_CONTEXTS};
use crate::pdn::{ContextId, PdnState};
use crate::registration::{RegistrationParams, RegistrationState};
use crate::socket::{DataAccessMode, SocketHandle, SocketSession};
use crate::urc::{Callbacks, Notification, SimCardState, UrcContext};

/// Route `log` output of the crate to the test harness. Safe to call from
/// every test.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Plain-struct `UrcContext` used to drive handlers in isolation. Nothing is
/// locked, so notifications fire as soon as they are raised.
pub struct RecordingContext<'a> {
    pub sessions: [Option<SocketSession<'a>>; MAX_SOCKETS],
    pub callbacks: Callbacks<'a>,
    pub registration: RegistrationState,
    pub pdn: [PdnState; NUM_PDN_CONTEXTS],
    pub sim: SimCardState,
}

impl<'a> RecordingContext<'a> {
    pub fn new() -> Self {
        init_logger();
        Self {
            sessions: core::array::from_fn(|_| None),
            callbacks: Callbacks::default(),
            registration: RegistrationState::new(),
            pdn: [PdnState::Unknown; NUM_PDN_CONTEXTS],
            sim: SimCardState::Unknown,
        }
    }

    pub fn add_session(&mut self, index: u8, mode: DataAccessMode) -> &mut SocketSession<'a> {
        let handle = SocketHandle::new(index).unwrap();
        self.sessions[handle.index()].insert(SocketSession::new(handle, mode))
    }

    pub fn session(&self, index: usize) -> &SocketSession<'a> {
        self.sessions[index].as_ref().unwrap()
    }

    pub fn session_mut(&mut self, index: usize) -> &mut SocketSession<'a> {
        self.sessions[index].as_mut().unwrap()
    }
}

impl<'a> UrcContext<'a> for RecordingContext<'a> {
    fn socket_session(&mut self, socket: SocketHandle) -> Option<&mut SocketSession<'a>> {
        self.sessions[socket.index()].as_mut()
    }

    fn pdn_deactivated(&mut self, cid: ContextId) {
        self.pdn[cid.slot()] = PdnState::Deactivated;
    }

    fn update_registration(&mut self, params: RegistrationParams) -> bool {
        self.registration.compare_and_set(params)
    }

    fn set_sim_card_state(&mut self, state: SimCardState) {
        self.sim = state;
    }

    fn callbacks(&self) -> &Callbacks<'a> {
        &self.callbacks
    }

    fn notify(&mut self, notification: Notification<'a>) {
        notification.fire();
    }
}
