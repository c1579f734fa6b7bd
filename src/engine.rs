use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config::{Config, DEFAULT_SOCKET_BUFFER_SIZE, MAX_SOCKETS, NUM_PDN_CONTEXTS};
use crate::context::{BufferFull, ModuleContext};
use crate::error::{log_status, Error, PacketStatus};
use crate::fmt::LossyStr;
use crate::modules::ModuleParams;
use crate::pdn::{ContextId, PdnState};
use crate::push;
use crate::registration::{RegistrationParams, RegistrationState};
use crate::socket::{SocketHandle, SocketSession};
use crate::urc::{
    self, Callbacks, DnsCallback, ModemEventCallback, Notification, Notifications,
    PdnEventCallback, RegistrationCallback, SignalCallback, SimCardState, UrcContext, UrcTable,
};

/// Outcome of one [`Engine::ingest`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ingested {
    /// The engine claimed the bytes; the handler's status.
    Handled(PacketStatus),
    /// Not a URC the engine knows. Left to whoever parses command responses.
    Unhandled,
    /// A URC the engine owns has only partially arrived.
    Incomplete,
}

fn is_line_end(b: &u8) -> bool {
    *b == b'\r' || *b == b'\n'
}

/// URC engine of one modem.
///
/// Owns the socket sessions and the module level state URC handlers update,
/// and borrows the [`ModuleContext`] shared with the socket read path. All
/// entry points are expected to run on the single ingestion task.
///
/// Upward callbacks are queued while a URC is processed and fired once it
/// is done, see [`Engine::ingest_deferred`].
pub struct Engine<'a, M: RawMutex, const BUF: usize = DEFAULT_SOCKET_BUFFER_SIZE> {
    config: Config,
    context: &'a ModuleContext<M, BUF>,
    urc_table: UrcTable<Self>,
    push_prefix: &'static [u8],
    max_header_len: usize,

    sessions: [Option<SocketSession<'a>>; MAX_SOCKETS],
    pdn: [PdnState; NUM_PDN_CONTEXTS],
    registration: RegistrationState,
    sim: SimCardState,
    callbacks: Callbacks<'a>,
    pending: Notifications<'a>,
}

impl<'a, M: RawMutex, const BUF: usize> Engine<'a, M, BUF> {
    pub fn new<P: ModuleParams>(
        module: &P,
        context: &'a ModuleContext<M, BUF>,
        config: Config,
    ) -> Self {
        let urc_table = module.urc_table::<Self>();
        debug!("URC table with {} entries", urc_table.len());

        Self {
            config,
            context,
            urc_table,
            push_prefix: module.push_prefix(),
            max_header_len: module.max_header_len(),

            sessions: core::array::from_fn(|_| None),
            pdn: [PdnState::Unknown; NUM_PDN_CONTEXTS],
            registration: RegistrationState::new(),
            sim: SimCardState::Unknown,
            callbacks: Callbacks::default(),
            pending: Notifications::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context(&self) -> &'a ModuleContext<M, BUF> {
        self.context
    }

    /// Allocate a session for socket `index`, in the configured access mode.
    pub fn create_socket(&mut self, index: u8) -> Result<&mut SocketSession<'a>, Error> {
        let handle = SocketHandle::new(index).ok_or(Error::InvalidSocket)?;
        let slot = &mut self.sessions[handle.index()];
        if slot.is_some() {
            return Err(Error::SocketInUse);
        }
        debug!("Allocated socket {}", index);
        Ok(slot.insert(SocketSession::new(handle, self.config.access_mode)))
    }

    pub fn socket(&self, handle: SocketHandle) -> Result<&SocketSession<'a>, Error> {
        self.sessions[handle.index()]
            .as_ref()
            .ok_or(Error::SocketNotAllocated)
    }

    pub fn socket_mut(&mut self, handle: SocketHandle) -> Result<&mut SocketSession<'a>, Error> {
        self.sessions[handle.index()]
            .as_mut()
            .ok_or(Error::SocketNotAllocated)
    }

    /// Release the session of `handle` and drop any data still buffered for
    /// it.
    pub fn close_socket(&mut self, handle: SocketHandle) -> Result<(), Error> {
        self.sessions[handle.index()]
            .take()
            .ok_or(Error::SocketNotAllocated)?;
        self.context.clear(handle);
        debug!("Released socket {}", handle.index());
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_registered()
    }

    pub fn registration(&self) -> &RegistrationState {
        &self.registration
    }

    pub fn sim_card_state(&self) -> SimCardState {
        self.sim
    }

    pub fn pdn_state(&self, cid: u8) -> Result<PdnState, Error> {
        let cid = ContextId::new(cid).ok_or(Error::InvalidContext)?;
        Ok(self.pdn[cid.slot()])
    }

    /// Record that the upper layer activated PDN context `cid`.
    pub fn set_pdn_active(&mut self, cid: u8) -> Result<(), Error> {
        let cid = ContextId::new(cid).ok_or(Error::InvalidContext)?;
        self.pdn[cid.slot()] = PdnState::Active;
        Ok(())
    }

    pub fn on_signal_changed(&mut self, cb: SignalCallback<'a>) {
        self.callbacks.signal_changed = Some(cb);
    }

    pub fn on_modem_event(&mut self, cb: ModemEventCallback<'a>) {
        self.callbacks.modem_event = Some(cb);
    }

    pub fn on_pdn_event(&mut self, cb: PdnEventCallback<'a>) {
        self.callbacks.pdn_event = Some(cb);
    }

    /// Register the receiver of `dnsgip` results. Cleared again with
    /// [`Engine::clear_dns_event`] once the lookup is done.
    pub fn on_dns_event(&mut self, cb: DnsCallback<'a>) {
        self.callbacks.dns_event = Some(cb);
    }

    pub fn clear_dns_event(&mut self) {
        self.callbacks.dns_event = None;
    }

    pub fn on_registration(&mut self, cb: RegistrationCallback<'a>) {
        self.callbacks.registration = Some(cb);
    }

    /// Take the notifications queued so far, to be fired by the caller.
    pub fn take_notifications(&mut self) -> Notifications<'a> {
        core::mem::take(&mut self.pending)
    }

    fn fire_pending(&mut self) {
        self.take_notifications().fire();
    }

    /// Run the textual handler registered for one complete line, then fire
    /// its notifications.
    pub fn handle_urc(&mut self, line: &str) -> urc::Dispatch {
        let res = self.dispatch_line(line);
        self.fire_pending();
        res
    }

    fn dispatch_line(&mut self, line: &str) -> urc::Dispatch {
        let entry = urc::lookup(&self.urc_table, line).copied();
        urc::dispatch(entry, self, line)
    }

    /// Extract one direct-push receive URC from the start of `buf` into the
    /// socket's buffer, then fire the data ready notification.
    ///
    /// Returns the status and the number of bytes the URC occupied. Nothing
    /// is consumed unless the frame was complete; a complete frame that could
    /// not be stored (bad socket index, no session, buffer full) is still
    /// consumed whole.
    pub fn handle_direct_push(&mut self, buf: &[u8]) -> (PacketStatus, usize) {
        let res = self.extract_push(buf);
        self.fire_pending();
        res
    }

    fn extract_push(&mut self, buf: &[u8]) -> (PacketStatus, usize) {
        let (header, payload) = match push::frame(buf, self.push_prefix, self.max_header_len) {
            Ok(frame) => frame,
            Err(status) => {
                log_status("direct push", status);
                return (status, 0);
            }
        };
        let consumed = header.frame_len();
        let Some(socket) = header.socket else {
            error!(
                "Direct push for an invalid socket index, dropping {} bytes",
                header.len
            );
            return (PacketStatus::Failure, consumed);
        };

        let data_ready = match &self.sessions[socket.index()] {
            Some(session) => session.data_ready_callback,
            None => {
                error!(
                    "Direct push for socket {} without a session, dropping {} bytes",
                    socket.index(),
                    header.len
                );
                return (PacketStatus::InvalidHandle, consumed);
            }
        };

        match self.context.append(socket, payload) {
            Ok(fill) => trace!(
                "Socket {}: buffered {} bytes, {} pending",
                socket.index(),
                header.len,
                fill
            ),
            Err(BufferFull { fill, incoming }) => {
                error!(
                    "Socket {} buffer full: {} + {} exceeds {}",
                    socket.index(),
                    fill,
                    incoming,
                    BUF
                );
                return (PacketStatus::Failure, consumed);
            }
        }

        match data_ready {
            Some(cb) => self.notify(Notification::DataReady(cb, socket)),
            None => error!("No data ready callback for socket {}", socket.index()),
        }
        (PacketStatus::Ok, consumed)
    }

    /// Process at most one URC from the start of `buf` and fire its
    /// notifications.
    ///
    /// Returns what happened and how many bytes to drop from the front of
    /// `buf`. Leading line terminators are always consumed. Call again on the
    /// remainder until nothing more is consumed.
    pub fn ingest(&mut self, buf: &[u8]) -> (Ingested, usize) {
        let (res, consumed, pending) = self.ingest_deferred(buf);
        pending.fire();
        (res, consumed)
    }

    /// Like [`Engine::ingest`], but hands the notifications back instead of
    /// firing them. Used when the engine sits behind a lock the callbacks
    /// must be free to take.
    pub fn ingest_deferred(&mut self, buf: &[u8]) -> (Ingested, usize, Notifications<'a>) {
        let (res, consumed) = self.step(buf);
        (res, consumed, self.take_notifications())
    }

    fn step(&mut self, buf: &[u8]) -> (Ingested, usize) {
        let skip = buf.iter().take_while(|b| is_line_end(b)).count();
        let rest = &buf[skip..];
        if rest.is_empty() {
            return (Ingested::Incomplete, skip);
        }

        if self.config.direct_push {
            match self.extract_push(rest) {
                (PacketStatus::PrefixMismatch, _) => {}
                (PacketStatus::SizeMismatch, _) => return (Ingested::Incomplete, skip),
                (status, consumed) if consumed > 0 => {
                    return (Ingested::Handled(status), skip + consumed)
                }
                // Broken header, drop the line it sits on
                (status, _) => {
                    let consumed = Self::line_span(rest).unwrap_or(rest.len());
                    return (Ingested::Handled(status), skip + consumed);
                }
            }
        }

        let Some(line_len) = rest.iter().position(is_line_end) else {
            // Could still grow into a direct-push header
            let n = rest.len().min(self.push_prefix.len());
            if self.config.direct_push && rest[..n] == self.push_prefix[..n] {
                return (Ingested::Incomplete, skip);
            }
            return (Ingested::Unhandled, 0);
        };
        let consumed = skip + Self::line_span(rest).unwrap_or(rest.len());

        let line = match core::str::from_utf8(&rest[..line_len]) {
            Ok(line) => line,
            Err(_) => {
                debug!("Skipping non UTF-8 line: {:?}", LossyStr(&rest[..line_len]));
                return (Ingested::Unhandled, consumed);
            }
        };

        match self.dispatch_line(line) {
            urc::Dispatch::Handled(status) => (Ingested::Handled(status), consumed),
            urc::Dispatch::Unhandled => (Ingested::Unhandled, consumed),
        }
    }

    /// Length of the first line of `buf` including its terminators.
    fn line_span(buf: &[u8]) -> Option<usize> {
        let end = buf.iter().position(is_line_end)?;
        let terminators = buf[end..].iter().take_while(|b| is_line_end(b)).count();
        Some(end + terminators)
    }
}

impl<'a, M: RawMutex, const BUF: usize> UrcContext<'a> for Engine<'a, M, BUF> {
    fn socket_session(&mut self, socket: SocketHandle) -> Option<&mut SocketSession<'a>> {
        self.sessions[socket.index()].as_mut()
    }

    fn pdn_deactivated(&mut self, cid: ContextId) {
        self.pdn[cid.slot()] = PdnState::Deactivated;
    }

    fn update_registration(&mut self, params: RegistrationParams) -> bool {
        let changed = self.registration.compare_and_set(params);
        if changed {
            info!(
                "Registration status changed! Registered: {:?}",
                self.registration.is_registered()
            );
        }
        changed
    }

    fn set_sim_card_state(&mut self, state: SimCardState) {
        self.sim = state;
    }

    fn callbacks(&self) -> &Callbacks<'a> {
        &self.callbacks
    }

    fn notify(&mut self, notification: Notification<'a>) {
        self.pending.push(notification);
    }
}

#[cfg(all(test, feature = "bg96"))]
mod tests {
    use super::*;
    use crate::modules::bg96::Bg96;
    use crate::pdn::PdnEvent;
    use crate::registration::{RegType, Status};
    use crate::signal::SignalInfo;
    use crate::socket::{DataAccessMode, SocketOpenEvent, SocketState};
    use crate::test_helpers::init_logger;
    use crate::urc::ModemEvent;
    use core::cell::{Cell, RefCell};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    type Context<const N: usize = DEFAULT_SOCKET_BUFFER_SIZE> = ModuleContext<NoopRawMutex, N>;

    fn socket(i: u8) -> SocketHandle {
        SocketHandle::new(i).unwrap()
    }

    /// Feed `buf` through `ingest` until it stops consuming.
    fn ingest_all<const N: usize>(
        engine: &mut Engine<'_, NoopRawMutex, N>,
        mut buf: &[u8],
    ) -> Vec<Ingested> {
        let mut out = Vec::new();
        loop {
            let (res, consumed) = engine.ingest(buf);
            out.push(res);
            if consumed == 0 {
                return out;
            }
            buf = &buf[consumed..];
        }
    }

    #[test]
    fn direct_push_into_buffer_mode_session() {
        init_logger();
        let ready = Cell::new(0);
        let cb = |s: SocketHandle| {
            assert_eq!(s, socket(0));
            ready.set(ready.get() + 1);
        };

        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());
        engine.create_socket(0).unwrap().on_data_ready(&cb);
        assert_eq!(
            engine.socket(socket(0)).unwrap().access_mode(),
            DataAccessMode::Buffer
        );

        let buf = b"+QIURC: \"recv\",0,4\r\ntest\r\n";
        assert_eq!(
            engine.ingest(buf),
            (Ingested::Handled(PacketStatus::Ok), 26)
        );
        assert_eq!(context.available(socket(0)), 4);
        context.peek(socket(0), |data| assert_eq!(data, b"test"));
        assert_eq!(ready.get(), 1);
    }

    #[test]
    fn direct_push_consumes_exact_frame() {
        init_logger();
        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new().with_direct_push());
        engine.create_socket(3).unwrap();

        // Payload carries line ends and something that looks like a URC
        let buf = b"+QIURC: \"recv\",3,12\r\n\r\nRDY\r\nabc\r\n\r\n+QIURC: \"closed\",3\r\n";
        let (res, consumed) = engine.handle_direct_push(buf);
        assert_eq!(res, PacketStatus::Ok);
        assert_eq!(consumed, 19 + 2 + 12 + 2);
        context.peek(socket(3), |data| assert_eq!(data, b"\r\nRDY\r\nabc\r\n"));

        assert_eq!(
            engine.ingest(&buf[consumed..]),
            (Ingested::Handled(PacketStatus::Ok), 20)
        );
        assert_eq!(
            engine.socket(socket(3)).unwrap().state(),
            SocketState::Disconnected
        );
    }

    #[test]
    fn direct_push_waits_for_complete_frame() {
        init_logger();
        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());
        engine.create_socket(1).unwrap();

        let full = b"+QIURC: \"recv\",1,5\r\nhello\r\n";
        for end in 1..full.len() {
            assert_eq!(
                engine.ingest(&full[..end]),
                (Ingested::Incomplete, 0),
                "prefix of {} bytes",
                end
            );
            assert_eq!(context.available(socket(1)), 0);
        }
        assert_eq!(
            engine.ingest(full),
            (Ingested::Handled(PacketStatus::Ok), full.len())
        );
        assert_eq!(context.available(socket(1)), 5);
    }

    #[test]
    fn direct_push_without_session() {
        init_logger();
        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());

        assert_eq!(
            engine.handle_direct_push(b"+QIURC: \"recv\",2,4\r\ntest\r\n"),
            (PacketStatus::InvalidHandle, 26)
        );
        assert_eq!(context.available(socket(2)), 0);
    }

    #[test]
    fn direct_push_overflow_rejects_whole_payload() {
        init_logger();
        let ready = Cell::new(0);
        let cb = |_: SocketHandle| ready.set(ready.get() + 1);

        let context = Context::<8>::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());
        engine.create_socket(0).unwrap().on_data_ready(&cb);

        assert_eq!(
            engine.handle_direct_push(b"+QIURC: \"recv\",0,6\r\n123456\r\n"),
            (PacketStatus::Ok, 28)
        );
        assert_eq!(
            engine.handle_direct_push(b"+QIURC: \"recv\",0,3\r\nabc\r\n"),
            (PacketStatus::Failure, 25)
        );
        assert_eq!(context.available(socket(0)), 6);
        context.peek(socket(0), |data| assert_eq!(data, b"123456"));
        assert_eq!(ready.get(), 1);

        // Draining makes room again
        let mut out = [0u8; 4];
        assert_eq!(context.read(socket(0), &mut out), 4);
        assert_eq!(
            engine.handle_direct_push(b"+QIURC: \"recv\",0,3\r\nabc\r\n"),
            (PacketStatus::Ok, 25)
        );
        context.peek(socket(0), |data| assert_eq!(data, b"56abc"));
    }

    #[test]
    fn buffer_mode_notification_reaches_textual_handler() {
        init_logger();
        let ready = Cell::new(0);
        let cb = |_: SocketHandle| ready.set(ready.get() + 1);

        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());
        engine.create_socket(5).unwrap().on_data_ready(&cb);

        assert_eq!(
            engine.ingest(b"+QIURC: \"recv\",5\r\n"),
            (Ingested::Handled(PacketStatus::Ok), 18)
        );
        assert_eq!(ready.get(), 1);
        assert_eq!(context.available(socket(5)), 0);
    }

    #[test]
    fn unarmed_extractor_leaves_recv_to_textual_handler() {
        init_logger();
        let ready = Cell::new(0);
        let cb = |_: SocketHandle| ready.set(ready.get() + 1);

        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new().without_direct_push());
        engine.create_socket(0).unwrap().on_data_ready(&cb);

        assert_eq!(
            engine.ingest(b"+QIURC: \"recv\",0,4\r\n"),
            (Ingested::Handled(PacketStatus::Ok), 20)
        );
        assert_eq!(ready.get(), 1);
        assert_eq!(context.available(socket(0)), 0);
    }

    #[test]
    fn broken_push_header_drops_its_line() {
        init_logger();
        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());

        let buf = b"+QIURC: \"recv\",0,0000000004\r\ntest\r\n";
        assert_eq!(
            engine.ingest(buf),
            (Ingested::Handled(PacketStatus::InvalidData), 29)
        );
        assert_eq!(engine.ingest(&buf[29..]), (Ingested::Unhandled, 6));

        // Extra fields, the header alone is dropped
        assert_eq!(
            engine.ingest(b"+QIURC: \"recv\",0,4,1\r\ntest\r\n"),
            (Ingested::Handled(PacketStatus::Failure), 22)
        );
    }

    #[test]
    fn push_to_invalid_socket_skips_its_payload() {
        init_logger();
        let events = RefCell::new(Vec::new());
        let on_modem = |ev: ModemEvent| events.borrow_mut().push(ev);

        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());
        engine.on_modem_event(&on_modem);

        let buf = b"+QIURC: \"recv\",12,5\r\nRDY\r\n\r\n";
        // Nothing is dropped until the whole frame is there
        assert_eq!(engine.ingest(&buf[..buf.len() - 1]), (Ingested::Incomplete, 0));

        assert_eq!(
            ingest_all(&mut engine, buf),
            [Ingested::Handled(PacketStatus::Failure), Ingested::Incomplete]
        );
        assert!(events.borrow().is_empty());
        assert_eq!(
            engine.ingest(buf),
            (Ingested::Handled(PacketStatus::Failure), buf.len())
        );
    }

    #[test]
    fn signal_indication() {
        init_logger();
        let seen = Cell::new(None);
        let cb = |info: &SignalInfo| seen.set(Some(*info));

        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());
        engine.on_signal_changed(&cb);

        assert_eq!(
            engine.ingest(b"+QIND: \"csq\",15,99\r\n"),
            (Ingested::Handled(PacketStatus::Ok), 20)
        );
        let info = seen.get().unwrap();
        assert_eq!(info.rssi, Some(-83));
        assert_eq!(info.ber, None);
        assert_eq!(info.rsrp, None);
        assert_eq!(info.rsrq, None);
        assert_eq!(info.bars, None);
    }

    #[test]
    fn unknown_lines_are_left_alone() {
        init_logger();
        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());

        assert_eq!(engine.ingest(b"+QNTP: 0\r\n"), (Ingested::Unhandled, 10));
        assert_eq!(engine.ingest(b"\r\nOK\r\n"), (Ingested::Unhandled, 6));
        // Incomplete lines and prompts are not framed here
        assert_eq!(engine.ingest(b"OK"), (Ingested::Unhandled, 0));
        assert_eq!(engine.ingest(b"> "), (Ingested::Unhandled, 0));
        assert_eq!(engine.ingest(b"\r\n"), (Ingested::Incomplete, 2));
        assert_eq!(engine.ingest(b""), (Ingested::Incomplete, 0));
    }

    #[test]
    fn mixed_stream() {
        init_logger();
        let events = RefCell::new(Vec::new());
        let on_modem = |ev: ModemEvent| events.borrow_mut().push(ev);
        let opened = Cell::new(false);
        let on_open = |_: SocketOpenEvent, _: SocketHandle| opened.set(true);

        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());
        engine.on_modem_event(&on_modem);
        engine.create_socket(0).unwrap().on_open(&on_open).set_connecting();

        let stream = b"\r\nRDY\r\n\r\n+QIOPEN: 0,0\r\n\r\n+QIURC: \"recv\",0,2\r\nhi\r\n\r\nPOWERED DOWN\r\n";
        let results = ingest_all(&mut engine, stream);

        assert_eq!(
            results,
            [
                Ingested::Handled(PacketStatus::Ok),
                Ingested::Handled(PacketStatus::Ok),
                Ingested::Handled(PacketStatus::Ok),
                Ingested::Handled(PacketStatus::Ok),
                Ingested::Incomplete,
            ]
        );
        assert!(opened.get());
        assert_eq!(
            engine.socket(socket(0)).unwrap().state(),
            SocketState::Connected
        );
        assert_eq!(context.available(socket(0)), 2);
        assert_eq!(
            *events.borrow(),
            [ModemEvent::BootUp, ModemEvent::PoweredDown]
        );
    }

    #[test]
    fn socket_lifecycle() {
        init_logger();
        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new().with_direct_push());

        let session = engine.create_socket(11).unwrap();
        assert_eq!(session.state(), SocketState::Allocated);
        assert_eq!(session.access_mode(), DataAccessMode::DirectPush);

        assert_eq!(engine.create_socket(11).err(), Some(Error::SocketInUse));
        assert_eq!(engine.create_socket(12).err(), Some(Error::InvalidSocket));

        engine.handle_direct_push(b"+QIURC: \"recv\",11,3\r\nabc\r\n");
        assert_eq!(context.available(socket(11)), 3);

        engine.close_socket(socket(11)).unwrap();
        assert_eq!(context.available(socket(11)), 0);
        assert_eq!(
            engine.close_socket(socket(11)),
            Err(Error::SocketNotAllocated)
        );
        assert_eq!(
            engine.socket(socket(11)).err(),
            Some(Error::SocketNotAllocated)
        );
        assert!(engine.create_socket(11).is_ok());
    }

    #[test]
    fn pdn_deactivation() {
        init_logger();
        let seen = Cell::new(None);
        let cb = |ev: PdnEvent, cid: ContextId| seen.set(Some((ev, cid.id())));

        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());
        engine.on_pdn_event(&cb);
        engine.set_pdn_active(1).unwrap();
        assert_eq!(engine.pdn_state(1), Ok(PdnState::Active));

        engine.ingest(b"+QIURC: \"pdpdeact\",1\r\n");
        assert_eq!(engine.pdn_state(1), Ok(PdnState::Deactivated));
        assert_eq!(seen.get(), Some((PdnEvent::Deactivated, 1)));

        assert_eq!(engine.pdn_state(0), Err(Error::InvalidContext));
        assert_eq!(engine.set_pdn_active(17), Err(Error::InvalidContext));
    }

    #[test]
    fn dns_result_only_with_pending_query() {
        init_logger();
        let seen = RefCell::new(String::new());
        let cb = |rest: &str| seen.borrow_mut().push_str(rest);

        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());

        assert_eq!(
            engine.ingest(b"+QIURC: \"dnsgip\",0,1,600\r\n"),
            (Ingested::Handled(PacketStatus::InvalidData), 26)
        );

        engine.on_dns_event(&cb);
        engine.ingest(b"+QIURC: \"dnsgip\",0,1,600\r\n");
        assert_eq!(seen.borrow().as_str(), "0,1,600");

        engine.clear_dns_event();
        assert_eq!(
            engine.ingest(b"+QIURC: \"dnsgip\",\"10.0.0.1\"\r\n").0,
            Ingested::Handled(PacketStatus::InvalidData)
        );
    }

    #[test]
    fn registration_and_sim_state() {
        init_logger();
        let changes = RefCell::new(Vec::new());
        let cb = |reg: RegType, stat: Status| changes.borrow_mut().push((reg, stat));

        let context: Context = Context::new();
        let mut engine = Engine::new(&Bg96, &context, Config::new());
        engine.on_registration(&cb);

        ingest_all(&mut engine, b"+CREG: 1\r\n+CEREG: 2\r\n+CEREG: 2\r\n");
        assert!(!engine.is_registered());

        ingest_all(&mut engine, b"+CEREG: 5,\"00C3\",\"0A1B2C3\",8\r\n");
        assert!(engine.is_registered());
        assert_eq!(engine.registration().cgi().cell_id(), Some("0A1B2C3"));
        assert_eq!(
            *changes.borrow(),
            [
                (RegType::Creg, Status::Home),
                (RegType::Cereg, Status::Searching),
                (RegType::Cereg, Status::Roaming),
            ]
        );

        assert_eq!(engine.sim_card_state(), SimCardState::Unknown);
        engine.ingest(b"+QSIMSTAT: 1,0\r\n");
        assert_eq!(engine.sim_card_state(), SimCardState::Removed);
    }
}
