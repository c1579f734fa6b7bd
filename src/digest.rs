//! Glue between the [`Engine`] and an [`atat::Ingress`].
//!
//! [`UrcDigester`] gets the first look at every ingress buffer. Whatever the
//! engine claims is dropped from the buffer; everything else, command
//! responses, prompts, URCs nobody registered, goes to the wrapped digester.

use core::cell::RefCell;

use atat::digest::{ParseError, Parser};
use atat::{AtDigester, DigestResult, Digester};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::config::DEFAULT_SOCKET_BUFFER_SIZE;
use crate::engine::{Engine, Ingested};

/// Engine shared between the ingress task and the upper layer.
pub type SharedEngine<'a, M, const BUF: usize = DEFAULT_SOCKET_BUFFER_SIZE> =
    Mutex<M, RefCell<Engine<'a, M, BUF>>>;

/// URC parser for the inner digester that never matches, since every URC
/// the modem sends is either claimed by the engine or of no interest.
pub struct NoUrc;

impl Parser for NoUrc {
    fn parse(_buf: &[u8]) -> Result<(&[u8], usize), ParseError> {
        Err(ParseError::NoMatch)
    }
}

/// `atat::Digester` running the engine ahead of `D`.
///
/// The engine is locked for the duration of one ingest step. Upward callbacks
/// fire after the lock is released and may lock the engine themselves.
pub struct UrcDigester<
    'e,
    'a,
    M: RawMutex,
    D: Digester = AtDigester<NoUrc>,
    const BUF: usize = DEFAULT_SOCKET_BUFFER_SIZE,
> {
    engine: &'e SharedEngine<'a, M, BUF>,
    inner: D,
}

impl<'e, 'a, M: RawMutex, const BUF: usize> UrcDigester<'e, 'a, M, AtDigester<NoUrc>, BUF> {
    pub fn new(engine: &'e SharedEngine<'a, M, BUF>) -> Self {
        Self::with_inner(engine, AtDigester::new())
    }
}

impl<'e, 'a, M: RawMutex, D: Digester, const BUF: usize> UrcDigester<'e, 'a, M, D, BUF> {
    pub fn with_inner(engine: &'e SharedEngine<'a, M, BUF>, inner: D) -> Self {
        Self { engine, inner }
    }
}

impl<'e, 'a, M: RawMutex, D: Digester, const BUF: usize> Digester
    for UrcDigester<'e, 'a, M, D, BUF>
{
    fn digest<'b>(&mut self, buf: &'b [u8]) -> (DigestResult<'b>, usize) {
        let (res, consumed, pending) = self.engine.lock(|e| e.borrow_mut().ingest_deferred(buf));
        pending.fire();

        match res {
            Ingested::Handled(status) => {
                trace!("URC consumed {} bytes: {:?}", consumed, status);
                (DigestResult::None, consumed)
            }
            Ingested::Incomplete => (DigestResult::None, consumed),
            Ingested::Unhandled => self.inner.digest(buf),
        }
    }
}
