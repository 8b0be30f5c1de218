//! Published chassis status

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use super::{ChassisMode, ChassisStatus, StatusReport, INDEX_NONE};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Latest chassis status, mode and target index, readable from any task.
///
/// Only the chassis task publishes. Each field is updated atomically on its own, so a reader may
/// see a status from one cycle and an index from the next.
#[derive(Debug, Clone)]
pub struct StatusCell {
    status: Arc<AtomicU8>,
    mode: Arc<AtomicU8>,
    target_index: Arc<AtomicU8>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StatusCell {
    pub fn new(mode: ChassisMode) -> Self {
        Self {
            status: Arc::new(AtomicU8::new(ChassisStatus::Arrived as u8)),
            mode: Arc::new(AtomicU8::new(mode as u8)),
            target_index: Arc::new(AtomicU8::new(INDEX_NONE)),
        }
    }

    pub fn publish(&self, report: &StatusReport) {
        self.status.store(report.status as u8, Ordering::Release);
        self.mode.store(report.mode as u8, Ordering::Release);
        self.target_index
            .store(report.target_index, Ordering::Release);
    }

    pub fn status(&self) -> ChassisStatus {
        ChassisStatus::from_u8(self.status.load(Ordering::Acquire))
            .unwrap_or(ChassisStatus::PeerFault)
    }

    pub fn mode(&self) -> ChassisMode {
        ChassisMode::from_u8(self.mode.load(Ordering::Acquire)).unwrap_or(ChassisMode::Manual)
    }

    pub fn target_index(&self) -> u8 {
        self.target_index.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_cell() {
        let cell = StatusCell::new(ChassisMode::Auto);
        let reader = cell.clone();

        assert_eq!(reader.status(), ChassisStatus::Arrived);
        assert_eq!(reader.mode(), ChassisMode::Auto);
        assert_eq!(reader.target_index(), INDEX_NONE);

        cell.publish(&StatusReport {
            status: ChassisStatus::GoingToStorage,
            mode: ChassisMode::Manual,
            target_index: 2,
            centering: false,
            route_not_implemented: false,
        });

        assert_eq!(reader.status(), ChassisStatus::GoingToStorage);
        assert_eq!(reader.mode(), ChassisMode::Manual);
        assert_eq!(reader.target_index(), 2);
    }
}
