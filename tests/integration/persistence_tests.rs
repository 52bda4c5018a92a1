//! Integration tests: config persistence across ticks and restarts.

use std::cell::Cell;

use tankguard::adapters::kv_store::{KvConfigStore, MemoryStorage};
use tankguard::app::commands::Command;
use tankguard::app::ports::{ConfigError, ConfigPort};
use tankguard::config::{self, ConfigPatch, ControllerConfig};
use tankguard::modes::SystemMode;
use tankguard::sensors::level::TankLevel;
use tankguard::supervisor::PumpId;

use crate::mock_hw::{MockHardware, Rig};

/// Config port whose saves fail until `healthy` is set.
struct FlakyStore {
    healthy: Cell<bool>,
    saves: Cell<u32>,
}

impl FlakyStore {
    fn broken() -> Self {
        Self {
            healthy: Cell::new(false),
            saves: Cell::new(0),
        }
    }
}

impl ConfigPort for FlakyStore {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        Err(ConfigError::NotFound)
    }

    fn save(&self, _config: &ControllerConfig) -> Result<(), ConfigError> {
        if self.healthy.get() {
            self.saves.set(self.saves.get() + 1);
            Ok(())
        } else {
            Err(ConfigError::IoError)
        }
    }
}

fn patch_runtime(minutes: u32) -> Command {
    Command::SetConfig(ConfigPatch {
        max_runtime_minutes: Some(minutes),
        ..ConfigPatch::default()
    })
}

#[test]
fn first_boot_installs_defaults() {
    let store = KvConfigStore::new(MemoryStorage::new());
    assert_eq!(store.load(), Err(ConfigError::NotFound));

    let cfg = config::load_or_install(&store);
    assert_eq!(cfg, ControllerConfig::default());
    assert_eq!(store.load(), Ok(ControllerConfig::default()));
}

#[test]
fn set_config_is_persisted_once() {
    let store = KvConfigStore::new(MemoryStorage::new());
    let mut rig = Rig::auto(MockHardware::new());

    assert_eq!(rig.cl.persist_if_dirty(&store), Ok(false));
    assert!(rig.apply(patch_runtime(45)).is_ok());
    assert_eq!(rig.cl.persist_if_dirty(&store), Ok(true));
    assert_eq!(rig.cl.persist_if_dirty(&store), Ok(false));

    let stored = store.load().unwrap();
    assert_eq!(stored.max_runtime_minutes, 45);
}

#[test]
fn unchanged_patch_does_not_dirty() {
    let mut rig = Rig::auto(MockHardware::new());
    let current = rig.cl.config().max_runtime_minutes;
    assert!(rig.apply(patch_runtime(current)).is_ok());
    assert!(!rig.cl.is_config_dirty());
}

#[test]
fn rejected_patch_leaves_config_alone() {
    let mut rig = Rig::auto(MockHardware::new());
    let outcome = rig.apply(patch_runtime(0));
    assert!(!outcome.is_ok());
    assert_eq!(rig.cl.config(), &ControllerConfig::default());
    assert!(!rig.cl.is_config_dirty());
}

#[test]
fn reset_persists_defaults() {
    let store = KvConfigStore::new(MemoryStorage::new());
    let mut rig = Rig::auto(MockHardware::new());
    rig.apply(patch_runtime(30));
    rig.cl.persist_if_dirty(&store).unwrap();

    rig.apply(Command::Reset);
    assert_eq!(rig.cl.persist_if_dirty(&store), Ok(true));
    assert_eq!(store.load(), Ok(ControllerConfig::default()));
}

#[test]
fn failed_save_is_retried() {
    let store = FlakyStore::broken();
    let mut rig = Rig::auto(MockHardware::new());
    rig.apply(patch_runtime(20));

    assert_eq!(rig.cl.persist_if_dirty(&store), Err(ConfigError::IoError));
    assert!(rig.cl.is_config_dirty());

    // The loop keeps running with the new value while storage is down.
    rig.tick();
    assert_eq!(rig.cl.config().max_runtime_minutes, 20);

    store.healthy.set(true);
    assert_eq!(rig.cl.persist_if_dirty(&store), Ok(true));
    assert_eq!(store.saves.get(), 1);
    assert!(!rig.cl.is_config_dirty());
}

#[test]
fn restart_keeps_config_but_not_counters() {
    let store = KvConfigStore::new(MemoryStorage::new());
    let cfg = config::load_or_install(&store);
    let mut rig = Rig::new(cfg, MockHardware::new());

    rig.apply(Command::StartPump(PumpId::Primary));
    for _ in 0..5 {
        rig.tick();
    }
    rig.apply(patch_runtime(15));
    rig.cl.persist_if_dirty(&store).unwrap();
    assert!(rig.cl.ledger().pump(PumpId::Primary).daily_secs() > 0);

    // Power cycle: only the config store survives.
    let cfg = config::load_or_install(&store);
    let rig = Rig::new(cfg, MockHardware::new());
    assert_eq!(rig.cl.config().max_runtime_minutes, 15);
    assert_eq!(rig.cl.ledger().pump(PumpId::Primary).total_secs(), 0);
    assert!(rig.cl.alerts().is_empty());
    assert_eq!(rig.cl.mode(), SystemMode::Auto);
}

#[test]
fn manual_default_survives_restart() {
    let store = KvConfigStore::new(MemoryStorage::new());
    let mut rig = Rig::auto(MockHardware::with_levels(TankLevel::Medium, TankLevel::Medium));
    rig.apply(Command::SetConfig(ConfigPatch {
        auto_mode_default: Some(false),
        ..ConfigPatch::default()
    }));
    // Only the boot mode changes, not the running one.
    assert_eq!(rig.cl.mode(), SystemMode::Auto);
    rig.cl.persist_if_dirty(&store).unwrap();

    let mut rig = Rig::new(
        config::load_or_install(&store),
        MockHardware::with_levels(TankLevel::Low, TankLevel::High),
    );
    assert_eq!(rig.cl.mode(), SystemMode::Manual);
    rig.tick();
    assert!(!rig.hw.relay(PumpId::Primary));
}

#[test]
fn corrupted_blob_falls_back_to_defaults() {
    use tankguard::app::ports::StoragePort;

    let store = KvConfigStore::new(MemoryStorage::new());
    store
        .storage()
        .write("tankguard", "ctlcfg", &[0xff; 3])
        .unwrap();
    assert_eq!(store.load(), Err(ConfigError::Corrupted));

    assert_eq!(config::load_or_install(&store), ControllerConfig::default());
    assert_eq!(store.load(), Ok(ControllerConfig::default()));
}
