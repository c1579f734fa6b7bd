//! Quectel BG96 URC handlers.

use heapless::String;

use super::ModuleParams;
use crate::error::{AtError, PacketStatus};
use crate::pdn::{ContextId, PdnEvent};
use crate::registration::{on_cereg, on_cgreg, on_creg};
use crate::signal::{csq_ber_to_ber, csq_rssi_to_dbm, to_i16, SignalInfo};
use crate::socket::{DataAccessMode, SocketHandle, SocketOpenEvent, SocketState};
use crate::tokenizer::{AtLine, Tokens};
use crate::urc::{ModemEvent, Notification, SimCardState, UrcContext, UrcEntry, UrcTable};

#[derive(Debug, Clone, Copy)]
pub struct Bg96;

impl ModuleParams for Bg96 {
    fn urc_table<'a, C: UrcContext<'a>>(&self) -> UrcTable<C> {
        UrcTable::from_slice(&[
            UrcEntry::new("CEREG", on_cereg),
            UrcEntry::new("CGREG", on_cgreg),
            UrcEntry::new("CREG", on_creg),
            UrcEntry::new("POWERED DOWN", on_powered_down),
            UrcEntry::new("PSM POWER DOWN", on_psm_power_down),
            UrcEntry::new("QIND", on_qind),
            UrcEntry::new("QIOPEN", on_qiopen),
            UrcEntry::new("QIURC", on_qiurc),
            UrcEntry::new("QSIMSTAT", on_qsimstat),
            UrcEntry::new("RDY", on_rdy),
        ])
        .unwrap_or_default()
    }
}

/// `+QIOPEN: <connectID>,<err>`
pub fn on_qiopen<'a, C: UrcContext<'a>>(ctx: &mut C, payload: &str) -> PacketStatus {
    PacketStatus::from_result(handle_qiopen(ctx, payload))
}

fn handle_qiopen<'a, C: UrcContext<'a>>(ctx: &mut C, payload: &str) -> Result<(), PacketStatus> {
    let mut line: AtLine = AtLine::new(payload)?;
    line.remove_all_whitespace();

    let mut tokens = line.tokens();
    let socket = SocketHandle::try_from(tokens.next_int()?)?;
    let err = tokens.next_int()?;

    let session = ctx
        .socket_session(socket)
        .ok_or(PacketStatus::InvalidHandle)?;

    let event = if err == 0 {
        session.state = SocketState::Connected;
        SocketOpenEvent::Opened
    } else {
        warn!("Socket {} open failed: {}", socket.index(), err);
        session.state = SocketState::Disconnected;
        SocketOpenEvent::OpenFailed
    };

    let open_callback = session.open_callback;
    match open_callback {
        Some(cb) => ctx.notify(Notification::SocketOpen(cb, event, socket)),
        None => error!("No open callback for socket {}", socket.index()),
    }
    Ok(())
}

/// `+QIURC: "<keyword>",...`, with `recv`, `closed`, `pdpdeact` and
/// `dnsgip` handled.
pub fn on_qiurc<'a, C: UrcContext<'a>>(ctx: &mut C, payload: &str) -> PacketStatus {
    PacketStatus::from_result(handle_qiurc(ctx, payload))
}

fn handle_qiurc<'a, C: UrcContext<'a>>(ctx: &mut C, payload: &str) -> Result<(), PacketStatus> {
    let mut line: AtLine = AtLine::new(payload)?;
    line.remove_all_whitespace();
    line.remove_all_double_quotes();

    let mut tokens = line.tokens();
    match tokens.next_token()? {
        "recv" => qiurc_recv(ctx, &mut tokens),
        "closed" => qiurc_closed(ctx, &mut tokens),
        "pdpdeact" => qiurc_pdpdeact(ctx, &mut tokens),
        "dnsgip" => qiurc_dnsgip(ctx, tokens.remainder()),
        other => {
            debug!("Unhandled +QIURC: {:?}", other);
            Ok(())
        }
    }
}

fn qiurc_recv<'a, C: UrcContext<'a>>(ctx: &mut C, tokens: &mut Tokens) -> Result<(), PacketStatus> {
    let socket = SocketHandle::try_from(tokens.next_int()?)?;
    let session = ctx
        .socket_session(socket)
        .ok_or(PacketStatus::InvalidHandle)?;

    let (mode, data_ready) = (session.access_mode(), session.data_ready_callback);
    match mode {
        DataAccessMode::Buffer => match data_ready {
            Some(cb) => ctx.notify(Notification::DataReady(cb, socket)),
            None => error!("No data ready callback for socket {}", socket.index()),
        },
        DataAccessMode::DirectPush => {
            trace!("recv on direct push socket {}", socket.index());
        }
    }
    Ok(())
}

fn qiurc_closed<'a, C: UrcContext<'a>>(
    ctx: &mut C,
    tokens: &mut Tokens,
) -> Result<(), PacketStatus> {
    let socket = SocketHandle::try_from(tokens.next_int()?)?;
    let session = ctx
        .socket_session(socket)
        .ok_or(PacketStatus::InvalidHandle)?;

    session.state = SocketState::Disconnected;
    let closed_callback = session.closed_callback;
    info!("Socket {} closed by remote", socket.index());

    if let Some(cb) = closed_callback {
        ctx.notify(Notification::SocketClosed(cb, socket));
    }
    Ok(())
}

fn qiurc_pdpdeact<'a, C: UrcContext<'a>>(
    ctx: &mut C,
    tokens: &mut Tokens,
) -> Result<(), PacketStatus> {
    let cid = ContextId::try_from(tokens.next_int()?)?;
    ctx.pdn_deactivated(cid);
    warn!("PDN context {} deactivated", cid.id());

    let pdn_event = ctx.callbacks().pdn_event;
    match pdn_event {
        Some(cb) => ctx.notify(Notification::PdnEvent(cb, PdnEvent::Deactivated, cid)),
        None => error!("No PDN event callback"),
    }
    Ok(())
}

fn qiurc_dnsgip<'a, C: UrcContext<'a>>(ctx: &mut C, rest: &str) -> Result<(), PacketStatus> {
    let dns_event = ctx.callbacks().dns_event;
    match dns_event {
        Some(cb) => {
            let rest = String::try_from(rest).map_err(|_| AtError::BadParameter)?;
            ctx.notify(Notification::Dns(cb, rest));
            Ok(())
        }
        None => {
            debug!("DNS response without a pending query: {:?}", rest);
            Err(PacketStatus::InvalidData)
        }
    }
}

/// `+QIND: "<kind>",...`; only `csq` is acted upon.
pub fn on_qind<'a, C: UrcContext<'a>>(ctx: &mut C, payload: &str) -> PacketStatus {
    PacketStatus::from_result(handle_qind(ctx, payload))
}

fn handle_qind<'a, C: UrcContext<'a>>(ctx: &mut C, payload: &str) -> Result<(), PacketStatus> {
    let mut line: AtLine = AtLine::new(payload)?;
    line.remove_leading_whitespace();
    line.remove_all_double_quotes();

    let mut tokens = line.tokens();
    match tokens.next_token()? {
        "csq" => qind_csq(ctx, &mut tokens),
        other => {
            debug!("Unhandled +QIND: {:?}", other);
            Ok(())
        }
    }
}

fn qind_csq<'a, C: UrcContext<'a>>(ctx: &mut C, tokens: &mut Tokens) -> Result<(), PacketStatus> {
    let rssi = to_i16(tokens.next_int()?)?;
    let ber = to_i16(tokens.next_int()?)?;

    let info = SignalInfo {
        rssi: csq_rssi_to_dbm(rssi)?,
        ber: csq_ber_to_ber(ber)?,
        ..Default::default()
    };
    debug!("Signal changed: {:?}", info);

    let signal_changed = ctx.callbacks().signal_changed;
    match signal_changed {
        Some(cb) => ctx.notify(Notification::SignalChanged(cb, info)),
        None => error!("No signal changed callback"),
    }
    Ok(())
}

/// Parse `<enable>,<inserted_status>` as carried by both the `+QSIMSTAT`
/// URC and the `AT+QSIMSTAT?` response.
pub fn parse_simstat(payload: &str) -> Result<SimCardState, AtError> {
    let mut line: AtLine = AtLine::new(payload)?;
    line.remove_all_whitespace();

    let mut tokens = line.tokens();
    let enable = tokens.next_int()?;
    trace!("SIM hot-plug detection enabled: {}", enable);

    SimCardState::try_from(tokens.next_int()?)
}

/// `+QSIMSTAT: <enable>,<inserted_status>`
pub fn on_qsimstat<'a, C: UrcContext<'a>>(ctx: &mut C, payload: &str) -> PacketStatus {
    match parse_simstat(payload) {
        Ok(state) => {
            info!("SIM card state: {:?}", state);
            ctx.set_sim_card_state(state);
            PacketStatus::Ok
        }
        Err(e) => e.into(),
    }
}

fn modem_event<'a, C: UrcContext<'a>>(ctx: &mut C, event: ModemEvent) -> PacketStatus {
    info!("Modem event: {:?}", event);
    let modem_event = ctx.callbacks().modem_event;
    match modem_event {
        Some(cb) => ctx.notify(Notification::ModemEvent(cb, event)),
        None => error!("No modem event callback"),
    }
    PacketStatus::Ok
}

/// `RDY`
pub fn on_rdy<'a, C: UrcContext<'a>>(ctx: &mut C, _line: &str) -> PacketStatus {
    modem_event(ctx, ModemEvent::BootUp)
}

/// `POWERED DOWN`
pub fn on_powered_down<'a, C: UrcContext<'a>>(ctx: &mut C, _line: &str) -> PacketStatus {
    modem_event(ctx, ModemEvent::PoweredDown)
}

/// `PSM POWER DOWN`
pub fn on_psm_power_down<'a, C: UrcContext<'a>>(ctx: &mut C, _line: &str) -> PacketStatus {
    modem_event(ctx, ModemEvent::PsmEnter)
}
