//! Simulator construction and lifecycle.
//!
//! [`Simulator::start`] brings the PLC up from a validated configuration:
//! it allocates and zeroes the internal DB buffers, applies initial
//! values, clones an external buffer per DB and registers it with the
//! injected [`AreaServer`] backend, spawns the synchronizer, and starts
//! the server. Per-field runtime errors are logged and recovered locally;
//! a failure to start the server aborts construction.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::s7::config::{Config, DbDef, FieldDef};
use crate::s7::server::{AreaServer, ServerEvent, SharedArea};
use crate::s7::store::DbMemory;
use crate::s7::sync::{Synchronizer, DEFAULT_SYNC_INTERVAL};
use crate::s7::types::S7Type;
use crate::s7::value::Value;
use crate::SimError;

/// Display-boundary sentinel for unreadable fields.
pub const READ_ERR_SENTINEL: &str = "<err>";

/// Tunables for [`Simulator::start`].
#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    /// TCP port handed to the server backend.
    pub tcp_port: u16,
    /// Synchronizer period, clamped to 10 ms ..= 5 s.
    pub sync_interval: Duration,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        SimulatorOptions {
            tcp_port: 102,
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }
}

/// A running PLC simulator.
pub struct Simulator {
    defs: Vec<DbDef>,
    store: Arc<DbMemory>,
    server: Mutex<Box<dyn AreaServer>>,
    sync: Mutex<Option<Synchronizer>>,
    clients: Arc<AtomicUsize>,
    stopped: AtomicBool,
}

impl Simulator {
    /// Construct and start the simulator.
    ///
    /// The configuration is assumed validated (see
    /// [`Config::from_yaml_str`](crate::s7::config::Config::from_yaml_str));
    /// initial values that still fail to pack are logged and skipped
    /// rather than aborting construction.
    pub fn start(
        config: Config,
        mut server: Box<dyn AreaServer>,
        options: SimulatorOptions,
    ) -> Result<Arc<Simulator>, SimError> {
        let defs = config.dbs;
        let store = Arc::new(DbMemory::new(&defs));

        for db in &defs {
            for field in &db.fields {
                if let Some(value) = &field.value {
                    tracing::info!(
                        db_number = db.db_number,
                        field = %field.name,
                        %value,
                        "applying initial value"
                    );
                    if let Err(e) =
                        store.write(db.db_number, field.offset, &field.ty, value, field.bit)
                    {
                        tracing::error!(
                            db_number = db.db_number,
                            field = %field.name,
                            error = %e,
                            "initial value dropped"
                        );
                    }
                }
            }
        }

        // The external image starts as a copy of the initialized internal
        // buffers, so clients see initial values before the first tick.
        let mut areas: Vec<(u32, SharedArea)> = Vec::with_capacity(defs.len());
        for db in &defs {
            let image = store
                .snapshot(db.db_number)
                .expect("buffer allocated for every configured DB");
            let area: SharedArea = Arc::new(Mutex::new(image));
            server.register_area(db.db_number, Arc::clone(&area))?;
            tracing::info!(db_number = db.db_number, "registered DB with server");
            areas.push((db.db_number, area));
        }

        let clients = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&clients);
        server.set_event_callback(Arc::new(move |event| match event {
            ServerEvent::ClientConnected => {
                counter.fetch_add(1, Ordering::SeqCst);
                tracing::info!("client connected");
            }
            ServerEvent::ClientDisconnected => {
                // Saturating: a disconnect for a connection the callback
                // never saw must not wrap the counter.
                let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    n.checked_sub(1)
                });
                tracing::info!("client disconnected");
            }
            ServerEvent::AreaRead { db_number } => {
                tracing::debug!(db_number, "client read");
            }
            ServerEvent::AreaWrite { db_number } => {
                tracing::debug!(db_number, "client write");
            }
        }));

        let mut sync = Synchronizer::spawn(Arc::clone(&store), areas, options.sync_interval);

        if let Err(e) = server.start(options.tcp_port) {
            tracing::error!(error = %e, "failed to start server");
            sync.stop();
            return Err(SimError::ServerStart(e.to_string()));
        }
        tracing::info!(tcp_port = options.tcp_port, "PLC server started");

        Ok(Arc::new(Simulator {
            defs,
            store,
            server: Mutex::new(server),
            sync: Mutex::new(Some(sync)),
            clients,
            stopped: AtomicBool::new(false),
        }))
    }

    /// The DB definitions the simulator was built from.
    pub fn db_definitions(&self) -> &[DbDef] {
        &self.defs
    }

    /// Look up a field definition by DB number and name.
    pub fn field(&self, db_number: u32, name: &str) -> Option<&FieldDef> {
        self.defs
            .iter()
            .find(|d| d.db_number == db_number)
            .and_then(|d| d.field(name))
    }

    /// Read a typed value; failures are logged and returned to the caller.
    pub fn read_value(
        &self,
        db_number: u32,
        offset: u32,
        ty: &S7Type,
        bit: Option<u8>,
    ) -> Result<Value, SimError> {
        self.store.read(db_number, offset, ty, bit).map_err(|e| {
            tracing::error!(db_number, offset, %ty, error = %e, "read error");
            e
        })
    }

    /// Read for display: the formatted value, or `"<err>"` when the read
    /// fails. This is the only place the sentinel exists.
    pub fn read_display(&self, db_number: u32, offset: u32, ty: &S7Type, bit: Option<u8>) -> String {
        match self.read_value(db_number, offset, ty, bit) {
            Ok(value) => value.to_string(),
            Err(_) => READ_ERR_SENTINEL.to_string(),
        }
    }

    /// Write a typed value. Failures (bad value, out-of-range target) are
    /// logged and dropped so one bad field never takes the simulator down.
    pub fn write_value(
        &self,
        db_number: u32,
        offset: u32,
        ty: &S7Type,
        value: &Value,
        bit: Option<u8>,
    ) {
        match self.store.write(db_number, offset, ty, value, bit) {
            Ok(()) => {
                tracing::debug!(db_number, offset, %ty, %value, "written");
            }
            Err(e) => {
                tracing::error!(db_number, offset, %ty, error = %e, "write dropped");
            }
        }
    }

    /// Number of currently connected clients, per backend events.
    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::SeqCst)
    }

    /// Copy of a DB's internal buffer.
    pub fn snapshot(&self, db_number: u32) -> Option<Vec<u8>> {
        self.store.snapshot(db_number)
    }

    /// Stop the synchronizer (draining one period) and then the server.
    /// Idempotent.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(mut sync) = self.sync.lock().expect("sync lock").take() {
            sync.stop();
        }
        self.server.lock().expect("server lock").stop();
        tracing::info!("simulator stopped");
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.stop();
    }
}
