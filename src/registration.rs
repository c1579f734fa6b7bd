use heapless::String;

use crate::error::{AtError, PacketStatus};
use crate::tokenizer::AtLine;
use crate::urc::{Notification, UrcContext};

#[derive(Debug, Clone, Default)]
pub struct CellularRegistrationStatus {
    status: Status,
}

impl CellularRegistrationStatus {
    pub const fn new() -> Self {
        Self {
            status: Status::None,
        }
    }

    pub fn reset(&mut self) {
        self.status = Status::None;
    }

    pub fn get_status(&self) -> Status {
        self.status
    }

    /// Returns `true` if the status changed.
    pub fn set_status(&mut self, stat: Status) -> bool {
        if self.status != stat {
            self.status = stat;
            return true;
        }
        false
    }

    pub fn registered(&self) -> bool {
        matches!(self.status, Status::Home | Status::Roaming)
    }
}

impl From<u8> for Status {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::NotRegistering,
            1 => Self::Home,
            2 => Self::Searching,
            3 => Self::Denied,
            4 => Self::OutOfCoverage,
            5 => Self::Roaming,
            _ => Self::None,
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    #[default]
    None,
    NotRegistering,
    Home,
    Searching,
    Denied,
    OutOfCoverage,
    Roaming,
}

/// Access technology reported in the optional `<AcT>` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RatAct {
    Gsm,
    Utran,
    GsmEgprs,
    Lte,
    LteCatM1,
    NbIot,
    Unknown,
}

impl From<i32> for RatAct {
    fn from(v: i32) -> Self {
        match v {
            0 => Self::Gsm,
            2 => Self::Utran,
            3 => Self::GsmEgprs,
            7 => Self::Lte,
            8 => Self::LteCatM1,
            9 => Self::NbIot,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegType {
    /// Circuit switched, `+CREG`.
    Creg,
    /// GPRS packet switched, `+CGREG`.
    Cgreg,
    /// EPS packet switched, `+CEREG`.
    Cereg,
    #[default]
    Unknown,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistrationParams {
    pub(crate) reg_type: RegType,
    pub(crate) status: Status,
    pub(crate) act: Option<RatAct>,

    pub(crate) cell_id: Option<String<8>>,
    pub(crate) lac: Option<String<4>>,
}

impl RegistrationParams {
    /// Parse the unsolicited form `<stat>[,<lac>,<ci>[,<AcT>]]`, with quotes
    /// and whitespace already stripped.
    pub fn parse(reg_type: RegType, payload: &str) -> Result<Self, AtError> {
        let mut tokens = crate::tokenizer::Tokens::new(payload);

        let stat = u8::try_from(tokens.next_int()?).map_err(|_| AtError::Error)?;
        let mut params = Self {
            reg_type,
            status: Status::from(stat),
            ..Default::default()
        };

        if tokens.is_exhausted() {
            return Ok(params);
        }

        let lac = tokens.next_token()?;
        let ci = tokens.next_token()?;
        if !lac.is_empty() {
            params.lac = Some(String::try_from(lac).map_err(|_| AtError::Error)?);
        }
        if !ci.is_empty() {
            params.cell_id = Some(String::try_from(ci).map_err(|_| AtError::Error)?);
        }

        if !tokens.is_exhausted() {
            params.act = Some(RatAct::from(tokens.next_int()?));
        }

        Ok(params)
    }

    pub fn reg_type(&self) -> RegType {
        self.reg_type
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn act(&self) -> Option<RatAct> {
        self.act
    }
}

#[derive(Debug, Clone, Default)]
pub struct CellularGlobalIdentity {
    /// Registered network operator cell Id.
    cell_id: Option<String<8>>,
    /// Registered network operator Location Area Code.
    lac: Option<String<4>>,
}

impl CellularGlobalIdentity {
    pub const fn new() -> Self {
        Self {
            cell_id: None,
            lac: None,
        }
    }

    pub fn cell_id(&self) -> Option<&str> {
        self.cell_id.as_deref()
    }

    pub fn lac(&self) -> Option<&str> {
        self.lac.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationState {
    /// CSD (Circuit Switched Data) registration status (registered/searching/roaming etc.).
    pub(crate) csd: CellularRegistrationStatus,
    /// PSD (Packet Switched Data) registration status (registered/searching/roaming etc.).
    pub(crate) psd: CellularRegistrationStatus,
    /// EPS (Evolved Packet Switched) registration status (registered/searching/roaming etc.).
    pub(crate) eps: CellularRegistrationStatus,

    pub(crate) cgi: CellularGlobalIdentity,
}

impl RegistrationState {
    pub const fn new() -> Self {
        Self {
            csd: CellularRegistrationStatus::new(),
            psd: CellularRegistrationStatus::new(),
            eps: CellularRegistrationStatus::new(),
            cgi: CellularGlobalIdentity::new(),
        }
    }

    /// Determine if a given cellular network status value means that we're
    /// registered with the network.
    pub fn is_registered(&self) -> bool {
        // If PSD or EPS are registered, we are connected!
        self.psd.registered() || self.eps.registered()
    }

    pub fn status(&self, reg_type: RegType) -> Status {
        match reg_type {
            RegType::Creg => self.csd.get_status(),
            RegType::Cgreg => self.psd.get_status(),
            RegType::Cereg => self.eps.get_status(),
            RegType::Unknown => Status::None,
        }
    }

    pub fn cgi(&self) -> &CellularGlobalIdentity {
        &self.cgi
    }

    pub fn reset(&mut self) {
        self.csd.reset();
        self.psd.reset();
        self.eps.reset();
        self.cgi = CellularGlobalIdentity::new();
    }

    /// Apply a parsed registration URC. Returns `true` if the status of that
    /// domain changed.
    pub fn compare_and_set(&mut self, new_params: RegistrationParams) -> bool {
        let changed = match new_params.reg_type {
            RegType::Creg => self.csd.set_status(new_params.status),
            RegType::Cgreg => self.psd.set_status(new_params.status),
            RegType::Cereg => self.eps.set_status(new_params.status),
            RegType::Unknown => {
                error!("unknown reg type");
                return false;
            }
        };

        // Update Cellular Global Identity
        if new_params.cell_id.is_some() && self.cgi.cell_id != new_params.cell_id {
            self.cgi.cell_id = new_params.cell_id;
            self.cgi.lac = new_params.lac;
        }

        changed
    }
}

fn handle_registration<'a, C: UrcContext<'a>>(
    ctx: &mut C,
    reg_type: RegType,
    payload: &str,
) -> Result<(), PacketStatus> {
    let mut line = AtLine::<64>::new(payload)?;
    line.remove_all_whitespace();
    line.remove_all_double_quotes();

    let params = RegistrationParams::parse(reg_type, line.as_str())?;
    let status = params.status;
    debug!("{:?}: {:?}", reg_type, status);

    if ctx.update_registration(params) {
        let registration = ctx.callbacks().registration;
        if let Some(cb) = registration {
            ctx.notify(Notification::Registration(cb, reg_type, status));
        }
    }
    Ok(())
}

/// `+CREG: <stat>[,<lac>,<ci>[,<AcT>]]`
pub fn on_creg<'a, C: UrcContext<'a>>(ctx: &mut C, payload: &str) -> PacketStatus {
    PacketStatus::from_result(handle_registration(ctx, RegType::Creg, payload))
}

/// `+CGREG: <stat>[,<lac>,<ci>[,<AcT>]]`
pub fn on_cgreg<'a, C: UrcContext<'a>>(ctx: &mut C, payload: &str) -> PacketStatus {
    PacketStatus::from_result(handle_registration(ctx, RegType::Cgreg, payload))
}

/// `+CEREG: <stat>[,<tac>,<ci>[,<AcT>]]`
pub fn on_cereg<'a, C: UrcContext<'a>>(ctx: &mut C, payload: &str) -> PacketStatus {
    PacketStatus::from_result(handle_registration(ctx, RegType::Cereg, payload))
}
