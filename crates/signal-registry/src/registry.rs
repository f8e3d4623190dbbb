use crate::{
    Direction, RegistryError, Result, SignalCell, SignalHandle, SignalInfo, SignalKind,
    SignalValue,
};
use core::fmt;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug)]
struct Signal {
    name: String,
    kind: SignalKind,
    direction: Direction,
    storage: Weak<SignalCell>,
}

/// Catalog of named signals bound to caller-owned [`SignalCell`]s.
///
/// Registration needs `&mut self` and therefore happens during single-threaded
/// setup; afterwards the registry is usually shared as `Arc<SignalRegistry>`
/// and only the `&self` accessors are used. Accessors take no lock.
///
/// The typed accessors are permissive: a kind mismatch, a stale or
/// unknown handle, or storage that was dropped reads as the zero value and
/// ignores writes. Use [`SignalRegistry::read`] / [`SignalRegistry::write`] to
/// see why an access did nothing.
#[derive(Debug)]
pub struct SignalRegistry {
    id: u32,
    signals: Vec<Signal>,
    by_name: HashMap<String, u32>,
    generation: u32,
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            signals: Vec::new(),
            by_name: HashMap::new(),
            generation: 0,
        }
    }

    /// Process-unique id carried by every handle this registry issues.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Reset to empty. Handles issued before the reset become stale.
    pub fn initialize(&mut self) {
        tracing::info!(
            previous = self.signals.len(),
            "initializing signal registry"
        );
        self.signals.clear();
        self.by_name.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn register(
        &mut self,
        name: &str,
        kind: SignalKind,
        storage: Weak<SignalCell>,
        direction: Direction,
    ) -> Result<SignalHandle> {
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidArgument("signal name is empty"));
        }
        if storage.upgrade().is_none() {
            return Err(RegistryError::InvalidArgument(
                "signal storage is null or already dropped",
            ));
        }
        if self.by_name.contains_key(name) {
            tracing::error!(name, "signal already exists");
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        let index = u32::try_from(self.signals.len()).map_err(|_| RegistryError::OutOfMemory)?;

        self.signals.try_reserve(1)?;
        self.by_name.try_reserve(1)?;
        let mut owned = String::new();
        owned.try_reserve_exact(name.len())?;
        owned.push_str(name);
        let mut key = String::new();
        key.try_reserve_exact(name.len())?;
        key.push_str(name);

        self.by_name.insert(key, index);
        self.signals.push(Signal {
            name: owned,
            kind,
            direction,
            storage,
        });

        tracing::info!(name, %kind, %direction, "created signal");
        Ok(SignalHandle {
            registry: self.id,
            index,
            generation: self.generation,
        })
    }

    pub fn find(&self, name: &str) -> Option<SignalHandle> {
        self.by_name.get(name).map(|&index| SignalHandle {
            registry: self.id,
            index,
            generation: self.generation,
        })
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn info(&self, handle: SignalHandle) -> Option<SignalInfo> {
        self.entry(handle).ok().map(Self::describe)
    }

    pub fn kind(&self, handle: SignalHandle) -> Option<SignalKind> {
        self.entry(handle).ok().map(|s| s.kind)
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = SignalInfo> + '_ {
        self.signals.iter().map(Self::describe)
    }

    // --- typed accessors (never fail, never panic) ---

    pub fn get_bit(&self, handle: SignalHandle) -> bool {
        self.cell(handle, SignalKind::Bit)
            .map(|c| c.load_bit())
            .unwrap_or(false)
    }

    pub fn set_bit(&self, handle: SignalHandle, value: bool) {
        if let Some(cell) = self.cell(handle, SignalKind::Bit) {
            cell.store(SignalValue::Bit(value));
        }
    }

    pub fn get_float(&self, handle: SignalHandle) -> f32 {
        self.cell(handle, SignalKind::Float)
            .map(|c| c.load_float())
            .unwrap_or(0.0)
    }

    pub fn set_float(&self, handle: SignalHandle, value: f32) {
        if let Some(cell) = self.cell(handle, SignalKind::Float) {
            cell.store(SignalValue::Float(value));
        }
    }

    pub fn get_s32(&self, handle: SignalHandle) -> i32 {
        self.cell(handle, SignalKind::S32)
            .map(|c| c.load_s32())
            .unwrap_or(0)
    }

    pub fn set_s32(&self, handle: SignalHandle, value: i32) {
        if let Some(cell) = self.cell(handle, SignalKind::S32) {
            cell.store(SignalValue::S32(value));
        }
    }

    pub fn get_u32(&self, handle: SignalHandle) -> u32 {
        self.cell(handle, SignalKind::U32)
            .map(|c| c.load_u32())
            .unwrap_or(0)
    }

    pub fn set_u32(&self, handle: SignalHandle, value: u32) {
        if let Some(cell) = self.cell(handle, SignalKind::U32) {
            cell.store(SignalValue::U32(value));
        }
    }

    // --- fallible accessors for configuration and tooling ---

    pub fn read(&self, handle: SignalHandle) -> Result<SignalValue> {
        let signal = self.entry(handle)?;
        let cell = signal
            .storage
            .upgrade()
            .ok_or(RegistryError::StorageDropped)?;
        Ok(cell.load(signal.kind))
    }

    pub fn write(&self, handle: SignalHandle, value: SignalValue) -> Result<()> {
        let signal = self.entry(handle)?;
        if signal.kind != value.kind() {
            return Err(RegistryError::KindMismatch {
                expected: value.kind(),
                actual: signal.kind,
            });
        }
        let cell = signal
            .storage
            .upgrade()
            .ok_or(RegistryError::StorageDropped)?;
        cell.store(value);
        Ok(())
    }

    /// Human-readable listing of every signal and its current value.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "--- Signal Dump ---");
        for (i, info) in self.iter().enumerate() {
            let value = match info.value {
                Some(v) => v.to_string(),
                None => "<dropped>".to_string(),
            };
            let _ = writeln!(
                out,
                "[{i:03}] {:<30} | {:<5} | {:<3} | {value}",
                info.name,
                info.kind.to_string(),
                info.direction.to_string(),
            );
        }
        let _ = writeln!(out, "-------------------");
        out
    }

    fn entry(&self, handle: SignalHandle) -> Result<&Signal> {
        if handle.registry != self.id {
            return Err(RegistryError::UnknownHandle);
        }
        if handle.generation != self.generation {
            return Err(RegistryError::StaleHandle);
        }
        self.signals
            .get(handle.index as usize)
            .ok_or(RegistryError::UnknownHandle)
    }

    fn cell(&self, handle: SignalHandle, kind: SignalKind) -> Option<Arc<SignalCell>> {
        let signal = self.entry(handle).ok()?;
        if signal.kind != kind {
            return None;
        }
        signal.storage.upgrade()
    }

    fn describe(signal: &Signal) -> SignalInfo {
        SignalInfo {
            name: signal.name.clone(),
            kind: signal.kind,
            direction: signal.direction,
            value: signal.storage.upgrade().map(|c| c.load(signal.kind)),
        }
    }
}

impl fmt::Display for SignalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}
