//! The inventory ledger: vials, dose logs and the rules tying them together.
//!
//! All mutation goes through four operations:
//! - [`Ledger::create_vial`]
//! - [`Ledger::log_dose`]
//! - [`Ledger::remove_log`]
//! - [`Ledger::remove_vial`]
//!
//! None of them can fail. Unknown ids are silent no-ops and over-draws
//! clamp the remaining balance at zero. Rejecting bad input is the caller's
//! job (see [`crate::validation`]).
//!
//! Log creation and log removal are exact inverses on `remaining_mg`
//! unless the clamp kicked in on the way down.

use crate::{math, DoseLog, Id, LedgerSnapshot, Vial};
use chrono::Utc;
use std::fmt;
use std::sync::mpsc::Sender;

/// A change applied to the ledger.
///
/// Only emitted when state actually changed; no-ops are silent.
#[derive(Clone, Debug, PartialEq)]
pub enum LedgerEvent {
    VialCreated(Vial),
    VialRemoved(Vial),
    DoseLogged {
        log: DoseLog,
        remaining_mg: f64,
    },
    LogRemoved {
        log: DoseLog,
        /// New balance of the originating vial, if it still exists
        restored_to: Option<f64>,
    },
}

/// Observer trait for ledger change notification
pub trait LedgerObserver {
    fn notify(&mut self, event: &LedgerEvent);
}

impl<F> LedgerObserver for F
where
    F: FnMut(&LedgerEvent),
{
    fn notify(&mut self, event: &LedgerEvent) {
        self(event)
    }
}

impl LedgerObserver for Sender<LedgerEvent> {
    fn notify(&mut self, event: &LedgerEvent) {
        // A hung-up receiver just stops listening
        let _ = self.send(event.clone());
    }
}

/// Aggregate root owning all vials and dose logs.
///
/// Both collections are ordered newest-first by insertion.
#[derive(Default)]
pub struct Ledger {
    vials: Vec<Vial>,
    logs: Vec<DoseLog>,
    observers: Vec<Box<dyn LedgerObserver>>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("vials", &self.vials)
            .field("logs", &self.logs)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl From<LedgerSnapshot> for Ledger {
    fn from(snapshot: LedgerSnapshot) -> Self {
        Self::from_snapshot(snapshot)
    }
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a ledger from its persisted document
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            vials: snapshot.vials,
            logs: snapshot.logs,
            observers: Vec::new(),
        }
    }

    /// Capture the full state for persistence
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            vials: self.vials.clone(),
            logs: self.logs.clone(),
        }
    }

    /// Register an observer for all subsequent changes
    pub fn subscribe(&mut self, observer: Box<dyn LedgerObserver>) {
        self.observers.push(observer);
    }

    fn emit(&mut self, event: LedgerEvent) {
        for observer in &mut self.observers {
            observer.notify(&event);
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// All vials, newest first
    pub fn vials(&self) -> &[Vial] {
        &self.vials
    }

    /// All dose logs, newest first
    pub fn logs(&self) -> &[DoseLog] {
        &self.logs
    }

    pub fn get_vial(&self, id: &Id) -> Option<&Vial> {
        self.vials.iter().find(|v| &v.id == id)
    }

    pub fn get_log(&self, id: &Id) -> Option<&DoseLog> {
        self.logs.iter().find(|l| &l.id == id)
    }

    /// Logs drawn from the given vial, newest first
    pub fn logs_for_vial(&self, vial_id: &Id) -> Vec<&DoseLog> {
        self.logs.iter().filter(|l| &l.vial_id == vial_id).collect()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Add a freshly reconstituted vial.
    ///
    /// Input is not validated. A non-positive `water_ml` yields a
    /// concentration of 0.
    pub fn create_vial(&mut self, name: impl Into<String>, total_mg: f64, water_ml: f64) -> Vial {
        let vial = Vial {
            id: Id::generate(),
            name: name.into(),
            total_mg,
            water_ml,
            concentration: math::concentration(total_mg, water_ml),
            remaining_mg: total_mg,
            date_added: Utc::now(),
        };

        tracing::debug!(
            "Created vial {} ({}: {}mg in {}mL = {}mg/mL)",
            vial.id,
            vial.name,
            vial.total_mg,
            vial.water_ml,
            vial.concentration
        );

        self.vials.insert(0, vial.clone());
        self.emit(LedgerEvent::VialCreated(vial.clone()));
        vial
    }

    /// Remove a vial. Its logs are left in place.
    ///
    /// Returns the removed vial, or `None` if no vial had that id.
    pub fn remove_vial(&mut self, id: &Id) -> Option<Vial> {
        let index = self.vials.iter().position(|v| &v.id == id)?;
        let vial = self.vials.remove(index);

        tracing::debug!("Removed vial {} ({})", vial.id, vial.name);

        self.emit(LedgerEvent::VialRemoved(vial.clone()));
        Some(vial)
    }

    /// Record a dose drawn from a vial.
    ///
    /// The vial's balance is floor-clamped at zero. Returns `None` without
    /// touching anything if the vial does not exist.
    pub fn log_dose(&mut self, vial_id: &Id, dose_mg: f64, units_used: f64) -> Option<DoseLog> {
        let Some(vial) = self.vials.iter_mut().find(|v| &v.id == vial_id) else {
            tracing::debug!("Ignoring dose for unknown vial {}", vial_id);
            return None;
        };

        vial.remaining_mg = (vial.remaining_mg - dose_mg).max(0.0);
        let remaining_mg = vial.remaining_mg;

        let log = DoseLog {
            id: Id::generate(),
            vial_id: vial_id.clone(),
            peptide_name: vial.name.clone(),
            date: Utc::now(),
            dose_mg,
            units_used,
        };

        tracing::debug!(
            "Logged {}mg ({} units) from vial {}, {}mg remaining",
            dose_mg,
            units_used,
            vial_id,
            remaining_mg
        );

        self.logs.insert(0, log.clone());
        self.emit(LedgerEvent::DoseLogged {
            log: log.clone(),
            remaining_mg,
        });
        Some(log)
    }

    /// Delete a log and give its dose back to the originating vial.
    ///
    /// The restore is skipped when the vial has been removed. No ceiling is
    /// applied to the restored balance.
    pub fn remove_log(&mut self, log_id: &Id) -> Option<DoseLog> {
        let index = self.logs.iter().position(|l| &l.id == log_id)?;
        let log = self.logs.remove(index);

        let restored_to = match self.vials.iter_mut().find(|v| v.id == log.vial_id) {
            Some(vial) => {
                vial.remaining_mg += log.dose_mg;
                Some(vial.remaining_mg)
            }
            None => {
                tracing::debug!(
                    "Vial {} no longer exists, nothing to restore for log {}",
                    log.vial_id,
                    log.id
                );
                None
            }
        };

        tracing::debug!("Removed log {} ({}mg)", log.id, log.dose_mg);

        self.emit(LedgerEvent::LogRemoved {
            log: log.clone(),
            restored_to,
        });
        Some(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(ledger: &mut Ledger) -> Rc<RefCell<Vec<LedgerEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        ledger.subscribe(Box::new(move |event: &LedgerEvent| {
            sink.borrow_mut().push(event.clone());
        }));
        events
    }

    #[test]
    fn test_create_vial() {
        crate::logging::init_test();
        let mut ledger = Ledger::new();
        let vial = ledger.create_vial("X", 10.0, 2.0);

        assert_eq!(vial.concentration, 5.0);
        assert_eq!(vial.remaining_mg, 10.0);
        assert_eq!(vial.total_mg, 10.0);
        assert_eq!(ledger.get_vial(&vial.id), Some(&vial));
    }

    #[test]
    fn test_vials_are_newest_first() {
        let mut ledger = Ledger::new();
        let first = ledger.create_vial("first", 5.0, 1.0);
        let second = ledger.create_vial("second", 5.0, 1.0);

        assert_eq!(ledger.vials()[0].id, second.id);
        assert_eq!(ledger.vials()[1].id, first.id);
    }

    #[test]
    fn test_create_vial_with_no_water() {
        let mut ledger = Ledger::new();
        let vial = ledger.create_vial("dry", 5.0, 0.0);
        assert_eq!(vial.concentration, 0.0);
        assert_eq!(vial.remaining_mg, 5.0);
    }

    #[test]
    fn test_log_dose_decrements_and_prepends() {
        let mut ledger = Ledger::new();
        let vial = ledger.create_vial("X", 10.0, 2.0);

        let first = ledger.log_dose(&vial.id, 1.0, 20.0).unwrap();
        let second = ledger.log_dose(&vial.id, 2.0, 40.0).unwrap();

        assert_eq!(ledger.get_vial(&vial.id).unwrap().remaining_mg, 7.0);
        assert_eq!(ledger.logs().len(), 2);
        assert_eq!(ledger.logs()[0].id, second.id);
        assert_eq!(ledger.logs()[1].id, first.id);
        assert_eq!(second.dose_mg, 2.0);
        assert_eq!(second.peptide_name, "X");
    }

    #[test]
    fn test_log_dose_unknown_vial_is_noop() {
        let mut ledger = Ledger::new();
        let vial = ledger.create_vial("X", 10.0, 2.0);
        let events = recording(&mut ledger);
        let before = ledger.snapshot();

        assert!(ledger.log_dose(&Id::generate(), 3.0, 60.0).is_none());

        assert_eq!(ledger.snapshot(), before);
        assert_eq!(ledger.get_vial(&vial.id).unwrap().remaining_mg, 10.0);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_over_draw_clamps_at_zero() {
        let mut ledger = Ledger::new();
        let vial = ledger.create_vial("X", 5.0, 1.0);

        ledger.log_dose(&vial.id, 3.0, 60.0);
        ledger.log_dose(&vial.id, 3.0, 60.0);
        assert_eq!(ledger.get_vial(&vial.id).unwrap().remaining_mg, 0.0);

        ledger.log_dose(&vial.id, 100.0, 2000.0);
        assert_eq!(ledger.get_vial(&vial.id).unwrap().remaining_mg, 0.0);
        assert_eq!(ledger.logs().len(), 3);
    }

    #[test]
    fn test_zero_and_negative_doses_are_recorded() {
        let mut ledger = Ledger::new();
        let vial = ledger.create_vial("X", 5.0, 1.0);

        let zero = ledger.log_dose(&vial.id, 0.0, 0.0).unwrap();
        assert_eq!(zero.dose_mg, 0.0);
        assert_eq!(ledger.get_vial(&vial.id).unwrap().remaining_mg, 5.0);

        let negative = ledger.log_dose(&vial.id, -1.0, -20.0).unwrap();
        assert_eq!(negative.dose_mg, -1.0);
        assert_eq!(ledger.get_vial(&vial.id).unwrap().remaining_mg, 6.0);
        assert_eq!(ledger.logs().len(), 2);
    }

    #[test]
    fn test_remove_log_restores_dose_exactly() {
        let mut ledger = Ledger::new();
        let vial = ledger.create_vial("X", 10.0, 2.0);
        ledger.log_dose(&vial.id, 1.5, 30.0);
        let before = ledger.get_vial(&vial.id).unwrap().remaining_mg;

        let log = ledger.log_dose(&vial.id, 3.0, 60.0).unwrap();
        assert_eq!(ledger.get_vial(&vial.id).unwrap().remaining_mg, 5.5);

        let removed = ledger.remove_log(&log.id).unwrap();
        assert_eq!(removed.id, log.id);
        assert_eq!(ledger.get_vial(&vial.id).unwrap().remaining_mg, before);
        assert!(ledger.get_log(&log.id).is_none());
        assert_eq!(ledger.logs().len(), 1);
    }

    #[test]
    fn test_remove_log_after_clamp_can_exceed_total() {
        let mut ledger = Ledger::new();
        let vial = ledger.create_vial("X", 2.0, 1.0);
        let log = ledger.log_dose(&vial.id, 5.0, 500.0).unwrap();
        assert_eq!(ledger.get_vial(&vial.id).unwrap().remaining_mg, 0.0);

        ledger.remove_log(&log.id);
        assert_eq!(ledger.get_vial(&vial.id).unwrap().remaining_mg, 5.0);
    }

    #[test]
    fn test_remove_unknown_log_is_noop() {
        let mut ledger = Ledger::new();
        let vial = ledger.create_vial("X", 10.0, 2.0);
        ledger.log_dose(&vial.id, 1.0, 20.0);
        let before = ledger.snapshot();

        assert!(ledger.remove_log(&Id::generate()).is_none());
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_remove_vial_keeps_orphaned_logs() {
        let mut ledger = Ledger::new();
        let vial = ledger.create_vial("TB-500", 10.0, 2.0);
        let log = ledger.log_dose(&vial.id, 2.0, 40.0).unwrap();

        let removed = ledger.remove_vial(&vial.id).unwrap();
        assert_eq!(removed.id, vial.id);
        assert!(ledger.get_vial(&vial.id).is_none());

        let orphan = ledger.get_log(&log.id).unwrap();
        assert_eq!(orphan.peptide_name, "TB-500");
        assert_eq!(orphan.vial_id, vial.id);

        // Deleting the orphan still works, there is just nothing to restore
        assert!(ledger.remove_log(&log.id).is_some());
        assert!(ledger.logs().is_empty());
    }

    #[test]
    fn test_remove_unknown_vial_is_noop() {
        let mut ledger = Ledger::new();
        ledger.create_vial("X", 10.0, 2.0);
        let before = ledger.snapshot();

        assert!(ledger.remove_vial(&Id::generate()).is_none());
        assert!(ledger.remove_vial(&Id::generate()).is_none());
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_reconstitution_scenario() {
        let mut ledger = Ledger::new();
        let vial = ledger.create_vial("BPC-157", 5.0, 2.0);
        assert_eq!(vial.concentration, 2.5);

        let log = ledger.log_dose(&vial.id, 1.25, 50.0).unwrap();
        assert_eq!(ledger.get_vial(&vial.id).unwrap().remaining_mg, 3.75);
        assert_eq!(log.units_used, 50.0);

        ledger.remove_log(&log.id);
        assert_eq!(ledger.get_vial(&vial.id).unwrap().remaining_mg, 5.0);
    }

    #[test]
    fn test_logs_for_vial() {
        let mut ledger = Ledger::new();
        let a = ledger.create_vial("A", 10.0, 2.0);
        let b = ledger.create_vial("B", 10.0, 2.0);
        ledger.log_dose(&a.id, 1.0, 20.0);
        ledger.log_dose(&b.id, 1.0, 20.0);
        ledger.log_dose(&a.id, 2.0, 40.0);

        let logs = ledger.logs_for_vial(&a.id);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].dose_mg, 2.0);
        assert!(logs.iter().all(|l| l.vial_id == a.id));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut ledger = Ledger::new();
        let vial = ledger.create_vial("X", 10.0, 2.0);
        ledger.log_dose(&vial.id, 3.0, 60.0);

        let json = serde_json::to_string(&ledger.snapshot()).unwrap();
        let restored = Ledger::from(serde_json::from_str::<LedgerSnapshot>(&json).unwrap());

        assert_eq!(restored.snapshot(), ledger.snapshot());
        assert_eq!(restored.get_vial(&vial.id).unwrap().remaining_mg, 7.0);
    }

    #[test]
    fn test_observers_see_each_change() {
        let mut ledger = Ledger::new();
        let events = recording(&mut ledger);

        let vial = ledger.create_vial("X", 10.0, 2.0);
        let log = ledger.log_dose(&vial.id, 3.0, 60.0).unwrap();
        ledger.remove_log(&log.id);
        ledger.remove_vial(&vial.id);

        let events = events.borrow();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], LedgerEvent::VialCreated(ref v) if v.id == vial.id));
        assert!(matches!(
            events[1],
            LedgerEvent::DoseLogged { remaining_mg, .. } if remaining_mg == 7.0
        ));
        assert!(matches!(
            events[2],
            LedgerEvent::LogRemoved { restored_to: Some(r), .. } if r == 10.0
        ));
        assert!(matches!(events[3], LedgerEvent::VialRemoved(_)));
    }

    #[test]
    fn test_channel_observer() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut ledger = Ledger::new();
        ledger.subscribe(Box::new(tx));

        let vial = ledger.create_vial("X", 10.0, 2.0);
        ledger.log_dose(&Id::generate(), 1.0, 20.0);

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received, vec![LedgerEvent::VialCreated(vial)]);
    }
}
