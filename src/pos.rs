use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::db::SnapshotStore;
use crate::draft::DraftOrder;
use crate::error::{Error, Result};
use crate::models::{Settings, Snapshot};

pub const DEFAULT_RECENT_WINDOW_DAYS: u32 = 7;

/// The running till: the persisted snapshot, the drafts being rung up, and
/// the collaborators that store and timestamp them.
///
/// Every mutation of the snapshot goes through [`Pos::commit`], so the store
/// always holds what the till last accepted. Commands take `&mut Pos`; wrap it
/// in `Arc<Mutex<_>>` to share it between threads.
pub struct Pos {
    store: Box<dyn SnapshotStore>,
    clock: Box<dyn Clock>,
    state: Snapshot,
    drafts: Vec<DraftOrder>,
    signed_in: bool,
    recent_window_days: u32,
}

impl Pos {
    pub fn open(store: Box<dyn SnapshotStore>) -> Result<Self> {
        Self::open_with_clock(store, Box::new(SystemClock))
    }

    pub fn open_with_clock(store: Box<dyn SnapshotStore>, clock: Box<dyn Clock>) -> Result<Self> {
        let state = match store.load()? {
            Some(state) => {
                info!(
                    products = state.products.len(),
                    orders = state.orders.len(),
                    sessions = state.cash_flows.len(),
                    "Snapshot restored"
                );
                state
            }
            None => {
                info!("Starting with an empty till");
                let state = Snapshot::default();
                store.save(&state)?;
                state
            }
        };

        Ok(Pos {
            store,
            clock,
            state,
            drafts: Vec::new(),
            signed_in: false,
            recent_window_days: DEFAULT_RECENT_WINDOW_DAYS,
        })
    }

    pub fn with_recent_window(mut self, days: u32) -> Self {
        self.recent_window_days = days.max(1);
        self
    }

    pub fn state(&self) -> &Snapshot {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn recent_window_days(&self) -> u32 {
        self.recent_window_days
    }

    pub fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    pub(crate) fn set_signed_in(&mut self, signed_in: bool) {
        self.signed_in = signed_in;
    }

    /// Every command except the sign-in ones starts here.
    pub fn require_signed_in(&self) -> Result<()> {
        if !self.signed_in {
            warn!("Command refused: till is locked");
            return Err(Error::NotSignedIn);
        }
        Ok(())
    }

    /// Applies `mutation` to a copy of the snapshot, saves the copy, then adopts it.
    ///
    /// A rejected mutation or a failed save leaves both memory and store as they were.
    pub fn commit<T>(
        &mut self,
        mutation: impl FnOnce(&mut Snapshot, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let now = self.now();
        let mut next = self.state.clone();
        let value = mutation(&mut next, now)?;
        self.store.save(&next)?;
        self.state = next;
        debug!("Snapshot committed");
        Ok(value)
    }

    pub fn drafts(&self) -> &[DraftOrder] {
        &self.drafts
    }

    pub fn draft(&self, id: &str) -> Result<&DraftOrder> {
        self.drafts
            .iter()
            .find(|d| d.id() == id)
            .ok_or_else(|| Error::not_found("Draft order", id))
    }

    pub(crate) fn draft_mut(&mut self, id: &str) -> Result<&mut DraftOrder> {
        self.drafts
            .iter_mut()
            .find(|d| d.id() == id)
            .ok_or_else(|| Error::not_found("Draft order", id))
    }

    pub(crate) fn insert_draft(&mut self, draft: DraftOrder) {
        self.drafts.push(draft);
    }

    pub(crate) fn replace_draft(&mut self, draft: DraftOrder) {
        if draft.state().is_finished() {
            self.drafts.retain(|d| d.id() != draft.id());
        } else if let Some(slot) = self.drafts.iter_mut().find(|d| d.id() == draft.id()) {
            *slot = draft;
        }
    }
}
