/// Status of the AT-core tokenizer layer.
///
/// Success is expressed as `Ok(())`; only the failing cases need a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtError {
    /// Generic tokenizing/parsing failure (missing token, non-numeric field,
    /// value out of range).
    Error,
    /// The caller handed the tokenizer something it cannot work with, e.g. a
    /// line longer than the line buffer or an invalid radix.
    BadParameter,
}

/// Outcome of processing one candidate URC, as seen by the packet I/O layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketStatus {
    Ok,
    /// Generic failure, the line is consumed.
    Failure,
    BadParameter,
    /// A context, module or socket session lookup failed.
    InvalidHandle,
    /// Well-formed framing, but the content makes no sense in the current
    /// state (e.g. an unmatched DNS response).
    InvalidData,
    /// This handler does not own the line, try another candidate.
    PrefixMismatch,
    /// More bytes are needed before the line can be judged.
    SizeMismatch,
}

impl PacketStatus {
    /// Collapse a handler body result into the status reported upwards.
    pub fn from_result(res: Result<(), PacketStatus>) -> Self {
        match res {
            Ok(()) => Self::Ok,
            Err(status) => status,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// `PrefixMismatch` and `SizeMismatch` are control flow signals to the
    /// caller, not faults.
    pub fn is_control_flow(self) -> bool {
        matches!(self, Self::PrefixMismatch | Self::SizeMismatch)
    }
}

/// Status translator from the AT-core layer to the packet layer.
impl From<AtError> for PacketStatus {
    fn from(e: AtError) -> Self {
        match e {
            AtError::Error => Self::Failure,
            AtError::BadParameter => Self::BadParameter,
        }
    }
}

/// Translate a terminal AT-core status.
pub fn translate(status: Result<(), AtError>) -> PacketStatus {
    match status {
        Ok(()) => PacketStatus::Ok,
        Err(e) => e.into(),
    }
}

/// Log a handler outcome with a severity matching what it means for the
/// link: control flow signals are not faults, `InvalidData` is an expected
/// race, everything else is a real error.
pub(crate) fn log_status(urc: &str, status: PacketStatus) {
    match status {
        PacketStatus::Ok => trace!("{} handled", urc),
        PacketStatus::PrefixMismatch | PacketStatus::SizeMismatch => {
            trace!("{} deferred: {:?}", urc, status)
        }
        PacketStatus::InvalidData => debug!("{} ignored: {:?}", urc, status),
        PacketStatus::Failure | PacketStatus::BadParameter | PacketStatus::InvalidHandle => {
            error!("{} failed: {:?}", urc, status)
        }
    }
}

/// Errors returned by the upper-layer API of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Socket index outside `0..MAX_SOCKETS`.
    InvalidSocket,
    /// A session is already allocated for this socket index.
    SocketInUse,
    /// No session is allocated for this socket index.
    SocketNotAllocated,
    /// PDN context id outside the supported range.
    InvalidContext,
}
