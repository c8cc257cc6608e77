//! Mutex-guarded DB byte buffers with typed field access.
//!
//! [`DbMemory`] owns one contiguous byte buffer per configured DB number.
//! Buffers are sized from the field layout at construction, zeroed, and
//! never resized. All typed access goes through [`read`](DbMemory::read)
//! and [`write`](DbMemory::write) under a single `std::sync::Mutex`; the
//! bit read-modify-write for BOOL fields mutates the byte under the same
//! lock acquisition instead of re-entering the public API, so the mutex
//! does not need to be reentrant.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::s7::codec;
use crate::s7::config::{DbDef, FieldDef};
use crate::s7::types::S7Type;
use crate::s7::value::Value;
use crate::SimError;

/// The DB memory store: `{db_number -> byte buffer}`.
pub struct DbMemory {
    buffers: Mutex<BTreeMap<u32, Vec<u8>>>,
}

impl DbMemory {
    /// Allocate a zeroed buffer per DB, sized by [`DbMemory::size_of`].
    pub fn new(defs: &[DbDef]) -> DbMemory {
        let mut buffers = BTreeMap::new();
        for def in defs {
            let size = Self::size_of(&def.fields);
            tracing::info!(db_number = def.db_number, size, "created DB buffer");
            buffers.insert(def.db_number, vec![0u8; size]);
        }
        DbMemory {
            buffers: Mutex::new(buffers),
        }
    }

    /// Required buffer length for a field layout:
    /// `max(offset + sizeof(type))` over all fields.
    pub fn size_of(fields: &[FieldDef]) -> usize {
        fields
            .iter()
            .map(|f| f.offset as usize + f.ty.size())
            .max()
            .unwrap_or(0)
    }

    /// Read a typed value at `(db, offset)`.
    ///
    /// A BOOL read with `bit` returns the single bit; any other read
    /// slices `sizeof(type)` bytes and unpacks them.
    pub fn read(
        &self,
        db_number: u32,
        offset: u32,
        ty: &S7Type,
        bit: Option<u8>,
    ) -> Result<Value, SimError> {
        let buffers = self.lock();
        let buf = Self::buffer(&buffers, db_number)?;
        let offset = offset as usize;

        if *ty == S7Type::Bool {
            if let Some(bit) = bit {
                Self::check_bit(bit)?;
                Self::check_range(buf, db_number, offset, 1)?;
                return Ok(Value::Bool((buf[offset] >> bit) & 0x01 != 0));
            }
        }

        let size = ty.size();
        Self::check_range(buf, db_number, offset, size)?;
        codec::unpack(&buf[offset..offset + size], ty)
    }

    /// Write a typed value at `(db, offset)`.
    ///
    /// A BOOL write with `bit` sets or clears the single bit, preserving
    /// the other bits of the byte; any other write packs the value and
    /// copies the resulting bytes into the buffer.
    pub fn write(
        &self,
        db_number: u32,
        offset: u32,
        ty: &S7Type,
        value: &Value,
        bit: Option<u8>,
    ) -> Result<(), SimError> {
        let mut buffers = self.lock();
        let offset = offset as usize;

        if *ty == S7Type::Bool {
            if let Some(bit) = bit {
                Self::check_bit(bit)?;
                let set = value.as_bool()?;
                let buf = Self::buffer_mut(&mut buffers, db_number)?;
                Self::check_range(buf, db_number, offset, 1)?;
                if set {
                    buf[offset] |= 1 << bit;
                } else {
                    buf[offset] &= !(1 << bit);
                }
                return Ok(());
            }
        }

        let packed = codec::pack(value, ty)?;
        let buf = Self::buffer_mut(&mut buffers, db_number)?;
        Self::check_range(buf, db_number, offset, packed.len())?;
        buf[offset..offset + packed.len()].copy_from_slice(&packed);
        Ok(())
    }

    /// Copy of a DB buffer, for inspection and tests.
    pub fn snapshot(&self, db_number: u32) -> Option<Vec<u8>> {
        self.lock().get(&db_number).cloned()
    }

    /// Buffer lengths per DB number.
    pub fn sizes(&self) -> BTreeMap<u32, usize> {
        self.lock().iter().map(|(k, v)| (*k, v.len())).collect()
    }

    /// Non-blocking access for the synchronizer's full pass; `None` when
    /// the store is busy.
    pub(crate) fn try_lock_buffers(&self) -> Option<MutexGuard<'_, BTreeMap<u32, Vec<u8>>>> {
        self.buffers.try_lock().ok()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u32, Vec<u8>>> {
        // A poisoned store mutex means a codec panic mid-write; the
        // buffers themselves are still structurally valid bytes.
        self.buffers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn buffer<'a>(
        buffers: &'a MutexGuard<'_, BTreeMap<u32, Vec<u8>>>,
        db_number: u32,
    ) -> Result<&'a Vec<u8>, SimError> {
        buffers
            .get(&db_number)
            .ok_or_else(|| SimError::OutOfRange(format!("DB {} is not defined", db_number)))
    }

    fn buffer_mut<'a>(
        buffers: &'a mut MutexGuard<'_, BTreeMap<u32, Vec<u8>>>,
        db_number: u32,
    ) -> Result<&'a mut Vec<u8>, SimError> {
        buffers
            .get_mut(&db_number)
            .ok_or_else(|| SimError::OutOfRange(format!("DB {} is not defined", db_number)))
    }

    fn check_bit(bit: u8) -> Result<(), SimError> {
        if bit > 7 {
            return Err(SimError::InvalidValue(format!(
                "bit {} out of range 0..=7",
                bit
            )));
        }
        Ok(())
    }

    fn check_range(
        buf: &[u8],
        db_number: u32,
        offset: usize,
        size: usize,
    ) -> Result<(), SimError> {
        if offset + size > buf.len() {
            return Err(SimError::OutOfRange(format!(
                "need {} bytes at offset {} but DB {} has {} bytes",
                size,
                offset,
                db_number,
                buf.len()
            )));
        }
        Ok(())
    }
}
