use crate::socket::DataAccessMode;

/// Number of socket sessions a module can hold (BG96 connect ids `0..=11`).
pub const MAX_SOCKETS: usize = 12;

/// Lowest valid PDN context id.
pub const MIN_PDN_CONTEXT_ID: u8 = 1;
/// Highest valid PDN context id.
pub const MAX_PDN_CONTEXT_ID: u8 = 16;
pub(crate) const NUM_PDN_CONTEXTS: usize = (MAX_PDN_CONTEXT_ID - MIN_PDN_CONTEXT_ID + 1) as usize;

/// Capacity of the line buffer a URC is normalised in.
pub const MAX_URC_LINE_LEN: usize = 256;

/// Default per-socket capacity of the direct-push buffer.
pub const DEFAULT_SOCKET_BUFFER_SIZE: usize = 1500;

#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub(crate) access_mode: DataAccessMode,
    pub(crate) direct_push: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Config {
            access_mode: DataAccessMode::Buffer,
            direct_push: true,
        }
    }

    /// Create new sockets in direct-push access mode.
    pub const fn with_direct_push(self) -> Self {
        Config {
            access_mode: DataAccessMode::DirectPush,
            direct_push: true,
        }
    }

    /// Never run the direct-push extractor; every `recv` URC goes through
    /// the textual handler.
    pub const fn without_direct_push(self) -> Self {
        Config {
            access_mode: DataAccessMode::Buffer,
            direct_push: false,
        }
    }

    pub fn access_mode(&self) -> DataAccessMode {
        self.access_mode
    }

    pub fn direct_push(&self) -> bool {
        self.direct_push
    }
}
