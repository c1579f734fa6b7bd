use crate::config::MAX_SOCKETS;
use crate::error::AtError;

/// Modem-side socket index (`connectID`), always `< MAX_SOCKETS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SocketHandle(u8);

impl SocketHandle {
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < MAX_SOCKETS {
            Some(Self(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Range-checked conversion from a parsed URC field.
impl TryFrom<i32> for SocketHandle {
    type Error = AtError;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        u8::try_from(v)
            .ok()
            .and_then(Self::new)
            .ok_or(AtError::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketState {
    /// Session created by the upper layer, no open issued yet.
    Allocated,
    /// Open issued, waiting for `+QIOPEN`.
    Connecting,
    Connected,
    Disconnected,
}

/// How received data reaches the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataAccessMode {
    /// The modem buffers data and announces it with `+QIURC: "recv",<id>`;
    /// the host fetches it with a read command.
    Buffer,
    /// The modem pushes data inline: `+QIURC: "recv",<id>,<len>\r\n<data>`.
    DirectPush,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketOpenEvent {
    Opened,
    OpenFailed,
}

pub type OpenCallback<'a> = &'a dyn Fn(SocketOpenEvent, SocketHandle);
pub type ClosedCallback<'a> = &'a dyn Fn(SocketHandle);
pub type DataReadyCallback<'a> = &'a dyn Fn(SocketHandle);

/// Per-socket record. State transitions come from URC handlers or from
/// explicit calls of the upper layer through the engine.
pub struct SocketSession<'a> {
    handle: SocketHandle,
    pub(crate) state: SocketState,
    access_mode: DataAccessMode,
    pub(crate) open_callback: Option<OpenCallback<'a>>,
    pub(crate) closed_callback: Option<ClosedCallback<'a>>,
    pub(crate) data_ready_callback: Option<DataReadyCallback<'a>>,
}

impl<'a> SocketSession<'a> {
    pub fn new(handle: SocketHandle, access_mode: DataAccessMode) -> Self {
        Self {
            handle,
            state: SocketState::Allocated,
            access_mode,
            open_callback: None,
            closed_callback: None,
            data_ready_callback: None,
        }
    }

    pub fn handle(&self) -> SocketHandle {
        self.handle
    }

    pub fn state(&self) -> SocketState {
        self.state
    }

    pub fn access_mode(&self) -> DataAccessMode {
        self.access_mode
    }

    pub fn set_access_mode(&mut self, mode: DataAccessMode) {
        self.access_mode = mode;
    }

    /// Mark the session as waiting for the open result.
    pub fn set_connecting(&mut self) {
        self.state = SocketState::Connecting;
    }

    pub fn on_open(&mut self, cb: OpenCallback<'a>) -> &mut Self {
        self.open_callback = Some(cb);
        self
    }

    pub fn on_closed(&mut self, cb: ClosedCallback<'a>) -> &mut Self {
        self.closed_callback = Some(cb);
        self
    }

    pub fn on_data_ready(&mut self, cb: DataReadyCallback<'a>) -> &mut Self {
        self.data_ready_callback = Some(cb);
        self
    }
}
