//! # Line card chassis simulator
//!
//! Drives a simulated modular chassis through a hot-plug scenario: cards
//! are seated, powered up, activated and pulled again while the line card
//! registry tracks them and observers react.
//!
//! # Usage
//!
//! ```bash
//! # Four slots, default settings
//! linecard-sim --slots 4
//!
//! # Registry settings from a file, verbose
//! linecard-sim --config linecards.toml --log-level debug
//! ```

use anyhow::{Context, Result, bail};
use clap::Parser;
use linecard_core::{CardType, SlotIndex};
use linecard_hardware::devices::default_device_table;
use linecard_hardware::mock::{MockFirmware, MockFirmwareHandle};
use linecard_hardware::{
    DeviceBinder, EventContext, LineCardEventOps, LineCardSnapshot, LineCards, LineCardsConfig,
    RegisterTransport, SensorMapResolver, SlotState,
};
use linecard_protocol::{SensorBitmap, SensorCapability};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Line card chassis simulator
#[derive(Parser, Debug)]
#[command(name = "linecard-sim")]
#[command(version)]
#[command(about = "Simulate line card hot-plug on a modular chassis")]
#[command(long_about = None)]
struct Args {
    /// Path to a TOML registry configuration
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of slots in the simulated chassis
    #[arg(short, long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(0..=15))]
    slots: u8,

    /// Log filter, e.g. "info" or "linecard_hardware=debug"
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Observer logging every activation edge and resolving the sensor map of
/// newly active cards.
struct ThermalMonitor<T> {
    resolver: SensorMapResolver<T>,
}

impl<T: RegisterTransport> LineCardEventOps for ThermalMonitor<T> {
    fn got_active(&self, slot: SlotIndex, linecard: &LineCardSnapshot, _: &(dyn Any + Send + Sync)) {
        let label = linecard
            .card
            .and_then(|card| card.card_type().ok())
            .map_or("unknown card", |card_type| card_type.label());
        info!("[thermal] {} active ({})", slot, label);

        let resolver = self.resolver.clone();
        tokio::spawn(async move {
            match resolver.resolve(slot).await {
                Ok(map) => info!("[thermal] {} sensors {:?}", slot, map.sensors()),
                Err(e) => warn!("[thermal] {} sensor discovery failed: {}", slot, e),
            }
        });
    }

    fn got_inactive(&self, slot: SlotIndex, _: &LineCardSnapshot, _: &(dyn Any + Send + Sync)) {
        info!("[thermal] {} inactive, sensors released", slot);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(&args.log_level)?;

    let config = match &args.config {
        Some(path) => LineCardsConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LineCardsConfig::default(),
    };

    info!("linecard-sim v{} starting", env!("CARGO_PKG_VERSION"));
    run(args.slots, config).await
}

fn setup_tracing(filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter).context("invalid --log-level")?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

async fn run(slot_count: u8, config: LineCardsConfig) -> Result<()> {
    let (firmware, chassis) = MockFirmware::new(slot_count);
    for index in SlotIndex::all(slot_count) {
        chassis.set_sensor_capability(SensorCapability {
            slot_index: index.as_u8(),
            sensor_count: 3,
            last_sensor: 16,
            internal_sensor_count: 1,
            sensor_map: SensorBitmap::from_indices([1, 3, 4]),
        });
    }

    let Some(linecards) = LineCards::initialize(Arc::new(firmware), config).await? else {
        info!("Chassis has no line card slots, nothing to simulate");
        return Ok(());
    };
    chassis.attach_event_sink(linecards.event_sender());

    let context: EventContext = Arc::new(());
    let thermal: Arc<dyn LineCardEventOps> = Arc::new(ThermalMonitor {
        resolver: linecards.sensor_resolver(),
    });
    let binder = Arc::new(DeviceBinder::new(
        Arc::clone(linecards.transport()),
        default_device_table,
    ));
    let devices: Arc<dyn LineCardEventOps> = binder.clone();
    linecards.event_ops_register(Arc::clone(&thermal), Arc::clone(&context))?;
    linecards.event_ops_register(Arc::clone(&devices), Arc::clone(&context))?;

    linecards.post_init().await?;

    let catalogue = [CardType::Qsfp28x16, CardType::Qsfp56x8, CardType::QsfpDdx4];
    let slots: Vec<SlotIndex> = linecards.slot_indices().collect();

    for (slot, card_type) in slots.iter().zip(catalogue.iter().cycle()) {
        info!("Seating {} card in {}", card_type.label(), slot);
        chassis.insert_card(slot.as_u8(), card_type.code());
        wait_for(&linecards, *slot, SlotState::Provisioned).await?;

        chassis.set_ready(slot.as_u8(), true);
        wait_for(&linecards, *slot, SlotState::Active).await?;
    }
    info!("{} devices bound", binder.device_count());

    for slot in &slots {
        info!("Pulling card from {}", slot);
        chassis.remove_card(slot.as_u8());
        wait_for(&linecards, *slot, SlotState::Empty).await?;
    }

    report(&linecards, &chassis).await?;

    linecards.pre_fini().await;
    linecards.event_ops_unregister(&devices, &context);
    linecards.event_ops_unregister(&thermal, &context);
    linecards.fini();
    Ok(())
}

async fn wait_for<T: RegisterTransport>(
    linecards: &LineCards<T>,
    slot: SlotIndex,
    state: SlotState,
) -> Result<()> {
    for _ in 0..200 {
        if linecards.snapshot(slot).await?.state() == state {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bail!("{slot} did not reach {state}");
}

async fn report<T: RegisterTransport>(
    linecards: &LineCards<T>,
    chassis: &MockFirmwareHandle,
) -> Result<()> {
    let snapshots = linecards.snapshots().await;
    info!("Final state: {}", serde_json::to_string(&snapshots)?);
    for slot in linecards.slot_indices() {
        info!(
            "{}: {} activation commands",
            slot,
            chassis.activation_count(slot.as_u8())
        );
    }
    Ok(())
}
