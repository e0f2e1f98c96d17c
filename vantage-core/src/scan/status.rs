use tokio::sync::watch;
use vantage_model::ScanStatus;

/// Single-writer, many-reader publication of a scan's status.
///
/// Transitions are validated against the lifecycle inside the channel's own
/// lock, so a rejected transition leaves the published value untouched.
#[derive(Debug)]
pub(crate) struct StatusCell {
    tx: watch::Sender<ScanStatus>,
}

impl StatusCell {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(ScanStatus::Idle);
        Self { tx }
    }

    pub(crate) fn get(&self) -> ScanStatus {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.tx.subscribe()
    }

    /// Returns the previous status when the move was applied.
    pub(crate) fn transition(&self, next: ScanStatus) -> Option<ScanStatus> {
        let mut previous = None;
        self.tx.send_if_modified(|current| {
            if current.can_transition_to(next) {
                previous = Some(*current);
                *current = next;
                true
            } else {
                false
            }
        });
        previous
    }
}
