//! URC dispatch table and the context handlers run against.
//!
//! A table is an ordered list of `(prefix, handler)` pairs supplied by the
//! module in use. Lines are matched on their identifying token (`+QIURC: ...`
//! is identified by `QIURC`, marker lines such as `RDY` by the whole line),
//! case-sensitively, first hit wins.

use heapless::{String, Vec};

use crate::config::MAX_URC_LINE_LEN;
use crate::error::{log_status, AtError, PacketStatus};
use crate::pdn::{ContextId, PdnEvent};
use crate::registration::{RegType, RegistrationParams, Status};
use crate::signal::SignalInfo;
use crate::socket::{
    ClosedCallback, DataReadyCallback, OpenCallback, SocketHandle, SocketOpenEvent, SocketSession,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemEvent {
    /// `RDY`: the module finished booting.
    BootUp,
    /// `POWERED DOWN`
    PoweredDown,
    /// `PSM POWER DOWN`: entering power saving mode.
    PsmEnter,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimCardState {
    Removed = 0,
    Inserted = 1,
    #[default]
    Unknown = 2,
}

impl TryFrom<i32> for SimCardState {
    type Error = AtError;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Removed),
            1 => Ok(Self::Inserted),
            2 => Ok(Self::Unknown),
            _ => Err(AtError::Error),
        }
    }
}

pub type SignalCallback<'a> = &'a dyn Fn(&SignalInfo);
pub type ModemEventCallback<'a> = &'a dyn Fn(ModemEvent);
pub type PdnEventCallback<'a> = &'a dyn Fn(PdnEvent, ContextId);
pub type DnsCallback<'a> = &'a dyn Fn(&str);
pub type RegistrationCallback<'a> = &'a dyn Fn(RegType, Status);

/// Module level upward notifications. Every slot is optional.
#[derive(Default, Clone, Copy)]
pub struct Callbacks<'a> {
    pub signal_changed: Option<SignalCallback<'a>>,
    pub modem_event: Option<ModemEventCallback<'a>>,
    pub pdn_event: Option<PdnEventCallback<'a>>,
    pub dns_event: Option<DnsCallback<'a>>,
    pub registration: Option<RegistrationCallback<'a>>,
}

/// An upward call a handler wants made, with its arguments.
///
/// Handlers never call out themselves. The owner of the context fires the
/// notifications once it no longer holds any lock, so a callback is free to
/// look at or modify the engine.
pub enum Notification<'a> {
    SocketOpen(OpenCallback<'a>, SocketOpenEvent, SocketHandle),
    SocketClosed(ClosedCallback<'a>, SocketHandle),
    DataReady(DataReadyCallback<'a>, SocketHandle),
    SignalChanged(SignalCallback<'a>, SignalInfo),
    ModemEvent(ModemEventCallback<'a>, ModemEvent),
    PdnEvent(PdnEventCallback<'a>, PdnEvent, ContextId),
    /// `dnsgip` result, the line after the keyword.
    Dns(DnsCallback<'a>, String<MAX_URC_LINE_LEN>),
    Registration(RegistrationCallback<'a>, RegType, Status),
}

impl Notification<'_> {
    pub fn fire(self) {
        match self {
            Self::SocketOpen(cb, event, socket) => cb(event, socket),
            Self::SocketClosed(cb, socket) => cb(socket),
            Self::DataReady(cb, socket) => cb(socket),
            Self::SignalChanged(cb, info) => cb(&info),
            Self::ModemEvent(cb, event) => cb(event),
            Self::PdnEvent(cb, event, cid) => cb(event, cid),
            Self::Dns(cb, line) => cb(line.as_str()),
            Self::Registration(cb, reg_type, status) => cb(reg_type, status),
        }
    }
}

/// Every handler queues at most one notification per URC.
pub const MAX_PENDING_NOTIFICATIONS: usize = 2;

/// Notifications queued while processing, in the order they were raised.
#[derive(Default)]
pub struct Notifications<'a> {
    queue: Vec<Notification<'a>, MAX_PENDING_NOTIFICATIONS>,
}

impl<'a> Notifications<'a> {
    pub(crate) fn push(&mut self, notification: Notification<'a>) {
        if self.queue.push(notification).is_err() {
            error!("Notification queue full, dropping notification");
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Invoke every queued callback, oldest first.
    pub fn fire(self) {
        for notification in self.queue {
            notification.fire();
        }
    }
}

/// Everything a URC handler may look up or mutate.
///
/// Implemented by the engine; handlers only ever see this trait so they can
/// be driven against a recording context in tests.
pub trait UrcContext<'a> {
    /// Session allocated for `socket`, if any.
    fn socket_session(&mut self, socket: SocketHandle) -> Option<&mut SocketSession<'a>>;

    /// Record that the network deactivated `cid`.
    fn pdn_deactivated(&mut self, cid: ContextId);

    /// Feed a parsed registration URC into the registration state. Returns
    /// `true` when the status of that domain changed.
    fn update_registration(&mut self, params: RegistrationParams) -> bool;

    fn set_sim_card_state(&mut self, state: SimCardState);

    fn callbacks(&self) -> &Callbacks<'a>;

    /// Queue an upward call.
    fn notify(&mut self, notification: Notification<'a>);
}

pub type UrcHandler<C> = fn(&mut C, &str) -> PacketStatus;

pub struct UrcEntry<C> {
    pub prefix: &'static str,
    pub handler: UrcHandler<C>,
}

impl<C> UrcEntry<C> {
    pub const fn new(prefix: &'static str, handler: UrcHandler<C>) -> Self {
        Self { prefix, handler }
    }
}

impl<C> Clone for UrcEntry<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for UrcEntry<C> {}

pub const MAX_URC_ENTRIES: usize = 16;

pub type UrcTable<C> = Vec<UrcEntry<C>, MAX_URC_ENTRIES>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch {
    /// A table entry claimed the line; the handler's status.
    Handled(PacketStatus),
    /// No entry matched. Not an error, modems emit plenty of informational
    /// lines nobody registered for.
    Unhandled,
}

/// Split a URC line into its identifying token and the payload handed to the
/// handler. `+QIOPEN: 0,0` gives `("QIOPEN", " 0,0")`; a marker line without
/// a `:` gives the whole line for both.
pub fn split_urc(line: &str) -> (&str, &str) {
    let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
    let body = line.strip_prefix('+').unwrap_or(line);
    match body.split_once(':') {
        Some((key, payload)) => (key, payload),
        None => (body, body),
    }
}

/// First table entry whose prefix equals the identifying token of `line`.
pub fn lookup<'t, C>(table: &'t [UrcEntry<C>], line: &str) -> Option<&'t UrcEntry<C>> {
    let (key, _) = split_urc(line);
    table.iter().find(|entry| entry.prefix == key)
}

/// Run the handler `lookup` found for `line` and log the outcome.
///
/// The entry is taken by value so `ctx` may own the table it came from.
pub fn dispatch<C>(entry: Option<UrcEntry<C>>, ctx: &mut C, line: &str) -> Dispatch {
    match entry {
        Some(entry) => {
            let (_, payload) = split_urc(line);
            let status = (entry.handler)(ctx, payload);
            log_status(entry.prefix, status);
            Dispatch::Handled(status)
        }
        None => {
            debug!("Unhandled URC: {:?}", line);
            Dispatch::Unhandled
        }
    }
}
