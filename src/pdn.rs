use crate::config::{MAX_PDN_CONTEXT_ID, MIN_PDN_CONTEXT_ID};
use crate::error::AtError;

/// PDN (packet data network) context id, `MIN_PDN_CONTEXT_ID..=MAX_PDN_CONTEXT_ID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContextId(u8);

impl ContextId {
    pub const fn new(id: u8) -> Option<Self> {
        if id >= MIN_PDN_CONTEXT_ID && id <= MAX_PDN_CONTEXT_ID {
            Some(Self(id))
        } else {
            None
        }
    }

    pub const fn id(self) -> u8 {
        self.0
    }

    pub(crate) const fn slot(self) -> usize {
        (self.0 - MIN_PDN_CONTEXT_ID) as usize
    }
}

impl TryFrom<i32> for ContextId {
    type Error = AtError;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        u8::try_from(v).ok().and_then(Self::new).ok_or(AtError::Error)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PdnState {
    #[default]
    Unknown,
    Active,
    Deactivated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PdnEvent {
    /// The network deactivated the context (`+QIURC: "pdpdeact"`).
    Deactivated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_id_range() {
        assert_eq!(ContextId::try_from(0), Err(AtError::Error));
        assert_eq!(ContextId::try_from(1).map(ContextId::id), Ok(1));
        assert_eq!(ContextId::try_from(16).map(ContextId::slot), Ok(15));
        assert_eq!(ContextId::try_from(17), Err(AtError::Error));
    }
}
