//! The injected S7 server backend contract.
//!
//! The simulator does not speak the S7 wire protocol itself; it hands each
//! DB an externally visible buffer and delegates serving to an
//! [`AreaServer`] implementation. A native snap7-style library slots in
//! behind this trait; the crate ships [`LoopbackServer`], an in-process
//! implementation whose handle lets tests and demos emulate remote
//! clients by mutating the external buffers directly.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::SimError;

/// An externally visible DB buffer, shared between the synchronizer and
/// the server backend. It must stay valid and mutable for the server's
/// lifetime; the `Arc` guarantees that.
pub type SharedArea = Arc<Mutex<Vec<u8>>>;

/// Callback invoked by the backend for connection and area traffic.
pub type EventCallback = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// Events reported by a server backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerEvent {
    ClientConnected,
    ClientDisconnected,
    AreaRead { db_number: u32 },
    AreaWrite { db_number: u32 },
}

/// Contract between the simulator core and the embedded S7 server.
pub trait AreaServer: Send {
    /// Register the external buffer for a DB. Called once per DB before
    /// `start`.
    fn register_area(&mut self, db_number: u32, area: SharedArea) -> Result<(), SimError>;

    /// Start serving on the given TCP port.
    fn start(&mut self, tcp_port: u16) -> Result<(), SimError>;

    /// Stop serving. Idempotent.
    fn stop(&mut self);

    /// Install the event callback. Backends without event support may
    /// ignore this.
    fn set_event_callback(&mut self, callback: EventCallback) {
        let _ = callback;
    }
}

#[derive(Default)]
struct LoopbackInner {
    areas: BTreeMap<u32, SharedArea>,
    callback: Option<EventCallback>,
    started: bool,
}

impl LoopbackInner {
    fn emit(&self, event: ServerEvent) {
        if let Some(cb) = &self.callback {
            cb(&event);
        }
    }
}

/// In-process [`AreaServer`] implementation.
///
/// Serves no TCP traffic; instead, [`LoopbackHandle`] emulates what a
/// remote S7 client would do: read and write the registered external
/// buffers directly, firing the corresponding events.
pub struct LoopbackServer {
    inner: Arc<Mutex<LoopbackInner>>,
}

impl LoopbackServer {
    pub fn new() -> LoopbackServer {
        LoopbackServer {
            inner: Arc::new(Mutex::new(LoopbackInner::default())),
        }
    }

    /// A handle for emulating remote clients, valid after the server has
    /// been moved into the simulator.
    pub fn handle(&self) -> LoopbackHandle {
        LoopbackHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for LoopbackServer {
    fn default() -> Self {
        Self::new()
    }
}

impl AreaServer for LoopbackServer {
    fn register_area(&mut self, db_number: u32, area: SharedArea) -> Result<(), SimError> {
        let mut inner = self.inner.lock().expect("loopback lock");
        if inner.areas.insert(db_number, area).is_some() {
            return Err(SimError::ServerStart(format!(
                "DB {} registered twice",
                db_number
            )));
        }
        Ok(())
    }

    fn start(&mut self, tcp_port: u16) -> Result<(), SimError> {
        let mut inner = self.inner.lock().expect("loopback lock");
        inner.started = true;
        tracing::info!(tcp_port, areas = inner.areas.len(), "loopback server started");
        Ok(())
    }

    fn stop(&mut self) {
        let mut inner = self.inner.lock().expect("loopback lock");
        inner.started = false;
    }

    fn set_event_callback(&mut self, callback: EventCallback) {
        self.inner.lock().expect("loopback lock").callback = Some(callback);
    }
}

/// Emulated remote-client access to a [`LoopbackServer`]'s areas.
#[derive(Clone)]
pub struct LoopbackHandle {
    inner: Arc<Mutex<LoopbackInner>>,
}

impl LoopbackHandle {
    /// Write raw bytes into an external buffer, as a remote S7 client
    /// would. The synchronizer picks the change up on its next tick.
    pub fn remote_write(&self, db_number: u32, offset: usize, bytes: &[u8]) -> Result<(), SimError> {
        let inner = self.inner.lock().expect("loopback lock");
        let area = inner
            .areas
            .get(&db_number)
            .ok_or_else(|| SimError::OutOfRange(format!("DB {} is not registered", db_number)))?;
        {
            let mut buf = area.lock().expect("area lock");
            if offset + bytes.len() > buf.len() {
                return Err(SimError::OutOfRange(format!(
                    "write of {} bytes at offset {} exceeds DB {} ({} bytes)",
                    bytes.len(),
                    offset,
                    db_number,
                    buf.len()
                )));
            }
            buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        inner.emit(ServerEvent::AreaWrite { db_number });
        Ok(())
    }

    /// Read raw bytes from an external buffer, as a remote S7 client would.
    pub fn remote_read(
        &self,
        db_number: u32,
        offset: usize,
        len: usize,
    ) -> Result<Vec<u8>, SimError> {
        let inner = self.inner.lock().expect("loopback lock");
        let area = inner
            .areas
            .get(&db_number)
            .ok_or_else(|| SimError::OutOfRange(format!("DB {} is not registered", db_number)))?;
        let out = {
            let buf = area.lock().expect("area lock");
            if offset + len > buf.len() {
                return Err(SimError::OutOfRange(format!(
                    "read of {} bytes at offset {} exceeds DB {} ({} bytes)",
                    len,
                    offset,
                    db_number,
                    buf.len()
                )));
            }
            buf[offset..offset + len].to_vec()
        };
        inner.emit(ServerEvent::AreaRead { db_number });
        Ok(out)
    }

    /// Emulate a client connecting.
    pub fn connect_client(&self) {
        self.inner
            .lock()
            .expect("loopback lock")
            .emit(ServerEvent::ClientConnected);
    }

    /// Emulate a client disconnecting.
    pub fn disconnect_client(&self) {
        self.inner
            .lock()
            .expect("loopback lock")
            .emit(ServerEvent::ClientDisconnected);
    }
}
