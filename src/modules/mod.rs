#[cfg(feature = "bg96")]
pub mod bg96;

use crate::registration::{on_cereg, on_cgreg, on_creg};
use crate::urc::{UrcContext, UrcEntry, UrcTable};

/// Direct-push receive prefix shared by the Quectel modules.
pub const QIURC_RECV_PREFIX: &[u8] = b"+QIURC: \"recv\",";

pub trait ModuleParams: Copy {
    /// URC table, tried in order, first match wins.
    fn urc_table<'a, C: UrcContext<'a>>(&self) -> UrcTable<C>;

    /// Prefix of the direct-push receive URC, up to and including the comma
    /// before the socket index.
    fn push_prefix(&self) -> &'static [u8] {
        QIURC_RECV_PREFIX
    }

    /// Longest acceptable direct-push header line: the prefix, a two digit
    /// socket index, a comma and a five digit length.
    fn max_header_len(&self) -> usize {
        self.push_prefix().len() + 2 + 1 + 5
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Module {
    #[cfg(feature = "bg96")]
    Bg96(bg96::Bg96),
    Generic(Generic),
}

impl Module {
    /// Pick module parameters from the `AT+GMM` model identification.
    pub fn from_model_id(model_id: &[u8]) -> Self {
        match model_id {
            #[cfg(feature = "bg96")]
            b"BG96" => Self::Bg96(bg96::Bg96),
            id => {
                warn!(
                    "Attempting to run {:?} using generic module parameters! This may or may not work.",
                    crate::fmt::LossyStr(id)
                );
                Self::Generic(Generic)
            }
        }
    }
}

macro_rules! inner {
    ($self: ident, $fn: ident) => {
        match $self {
            #[cfg(feature = "bg96")]
            Self::Bg96(inner) => inner.$fn(),
            Self::Generic(inner) => inner.$fn(),
        }
    };
}

impl ModuleParams for Module {
    fn urc_table<'a, C: UrcContext<'a>>(&self) -> UrcTable<C> {
        inner!(self, urc_table)
    }

    fn push_prefix(&self) -> &'static [u8] {
        inner!(self, push_prefix)
    }

    fn max_header_len(&self) -> usize {
        inner!(self, max_header_len)
    }
}

/// 3GPP registration URCs only.
#[derive(Debug, Clone, Copy)]
pub struct Generic;

impl ModuleParams for Generic {
    fn urc_table<'a, C: UrcContext<'a>>(&self) -> UrcTable<C> {
        UrcTable::from_slice(&[
            UrcEntry::new("CEREG", on_cereg),
            UrcEntry::new("CGREG", on_cgreg),
            UrcEntry::new("CREG", on_creg),
        ])
        .unwrap_or_default()
    }
}
