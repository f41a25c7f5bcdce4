use embassy_time::Timer;
use log::info;
use splitflap_core::{
    connectivity::ConnectivityHandle,
    status::{SLOT_COUNT, SlotId, StatusBoard},
};

const REFRESH_INTERVAL_MS: u64 = 250;

/// Mirrors the status slots to the console whenever one of them changes.
#[embassy_executor::task]
pub async fn display_task(
    connectivity: &'static ConnectivityHandle,
    status: &'static StatusBoard,
) -> ! {
    let mut seen_slots = [0u32; SLOT_COUNT];
    let mut seen_connectivity = u32::MAX;

    loop {
        let snapshot = connectivity.snapshot();
        if snapshot.revision != seen_connectivity {
            seen_connectivity = snapshot.revision;
            info!(
                "display: link={} ready={}",
                snapshot.state.label(),
                snapshot.ready
            );
        }

        for slot in SlotId::ALL {
            let revision = status.revision(slot);
            if revision != seen_slots[slot.index()] {
                seen_slots[slot.index()] = revision;
                info!("display: [{}] {}", slot.label(), status.message(slot).as_str());
            }
        }

        Timer::after_millis(REFRESH_INTERVAL_MS).await;
    }
}
