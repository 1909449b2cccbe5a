//! CoAP Observe relationships and their WriteAttributes-negotiated
//! notification gating.
//!
//! An [`Observation`] tracks one server-side Observe relationship: the
//! notification attributes negotiated by `WriteAttributes`, and enough state
//! (`last_value`, `last_notified_at`) to decide whether a given change is
//! worth a notification under `pmin`/`pmax`/`gt`/`lt`/`step`.

use lwm2m_core::{Path, Value};

/// Notification attributes a `WriteAttributes` request may set on a path.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NotificationAttributes {
    /// Minimum seconds between notifications.
    pub minimum_period: Option<u32>,
    /// Maximum seconds before a notification is sent even without a change.
    pub maximum_period: Option<u32>,
    pub greater_than: Option<f64>,
    pub less_than: Option<f64>,
    pub step: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservationId(pub u64);

#[derive(Debug, Clone)]
pub struct Observation {
    pub id: ObservationId,
    pub path: Path,
    pub client_id: u32,
    pub token: Vec<u8>,
    pub attributes: NotificationAttributes,
    last_value: Option<Value>,
    seconds_since_last_notify: u32,
}

impl Observation {
    #[must_use]
    pub fn new(id: ObservationId, path: Path, client_id: u32, token: Vec<u8>) -> Self {
        Self {
            id,
            path,
            client_id,
            token,
            attributes: NotificationAttributes::default(),
            last_value: None,
            seconds_since_last_notify: 0,
        }
    }

    /// Advance the observation's internal clock by `elapsed_seconds` and
    /// decide whether `candidate` warrants a notification.
    ///
    /// `pmin` suppresses a notification that would otherwise fire too soon;
    /// `pmax` forces one even without a qualifying change; `gt`/`lt`/`step`
    /// gate numeric changes.
    pub fn should_notify(&mut self, candidate: &Value, elapsed_seconds: u32) -> bool {
        self.seconds_since_last_notify = self.seconds_since_last_notify.saturating_add(elapsed_seconds);

        let min_elapsed = self
            .attributes
            .minimum_period
            .map(|pmin| self.seconds_since_last_notify >= pmin)
            .unwrap_or(true);

        if let Some(pmax) = self.attributes.maximum_period {
            if self.seconds_since_last_notify >= pmax {
                return min_elapsed;
            }
        }

        if !min_elapsed {
            return false;
        }

        let changed = self.last_value.as_ref() != Some(candidate);
        if !changed {
            return false;
        }

        if let (Some(a), Some(b)) = (candidate.as_float(), self.last_value.as_ref().and_then(Value::as_float)) {
            if let Some(step) = self.attributes.step {
                if (a - b).abs() < step {
                    return false;
                }
            }
            if let Some(gt) = self.attributes.greater_than {
                if a <= gt {
                    return false;
                }
            }
            if let Some(lt) = self.attributes.less_than {
                if a >= lt {
                    return false;
                }
            }
        }

        true
    }

    pub fn record_notified(&mut self, value: Value) {
        self.last_value = Some(value);
        self.seconds_since_last_notify = 0;
    }
}

/// A notification a successful Write produced, queued for delivery by
/// whichever layer owns the transport to `client_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub path: Path,
    pub client_id: u32,
    pub value: Value,
}

/// All live Observe relationships, server-side.
#[derive(Debug, Default)]
pub struct ObservationTable {
    next_id: u64,
    observations: Vec<Observation>,
    pending: Vec<Notification>,
}

impl ObservationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, path: Path, client_id: u32, token: Vec<u8>) -> ObservationId {
        let id = ObservationId(self.next_id);
        self.next_id += 1;
        self.observations.push(Observation::new(id, path, client_id, token));
        id
    }

    pub fn cancel(&mut self, id: ObservationId) -> Option<Observation> {
        let idx = self.observations.iter().position(|o| o.id == id)?;
        Some(self.observations.remove(idx))
    }

    pub fn get_mut(&mut self, id: ObservationId) -> Option<&mut Observation> {
        self.observations.iter_mut().find(|o| o.id == id)
    }

    pub fn for_client(&self, client_id: u32) -> impl Iterator<Item = &Observation> {
        self.observations.iter().filter(move |o| o.client_id == client_id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Observation> {
        self.observations.iter_mut()
    }

    /// Evaluate every observation held for `client_id` on `path` against a
    /// just-written `value`, queuing a [`Notification`] for any that clears
    /// its gate. Called after a Write that touches an observed path.
    pub fn evaluate_write(&mut self, client_id: u32, path: &Path, value: &Value, elapsed_seconds: u32) {
        for obs in self.observations.iter_mut().filter(|o| o.client_id == client_id && o.path == *path) {
            if obs.should_notify(value, elapsed_seconds) {
                obs.record_notified(value.clone());
                self.pending.push(Notification { path: *path, client_id, value: value.clone() });
            }
        }
    }

    /// Drain and return every notification queued since the last call.
    pub fn take_pending(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> Path {
        Path::parse("/1000/0/104").unwrap()
    }

    #[test]
    fn first_read_after_creation_always_notifies() {
        let mut obs = Observation::new(ObservationId(0), path(), 1, vec![1]);
        assert!(obs.should_notify(&Value::Float(20.0), 0));
    }

    #[test]
    fn pmin_suppresses_too_soon_notifications() {
        let mut obs = Observation::new(ObservationId(0), path(), 1, vec![1]);
        obs.attributes.minimum_period = Some(10);
        obs.should_notify(&Value::Float(20.0), 0);
        obs.record_notified(Value::Float(20.0));
        assert!(!obs.should_notify(&Value::Float(25.0), 2));
    }

    #[test]
    fn pmax_forces_notification_without_change() {
        let mut obs = Observation::new(ObservationId(0), path(), 1, vec![1]);
        obs.attributes.maximum_period = Some(5);
        obs.should_notify(&Value::Float(20.0), 0);
        obs.record_notified(Value::Float(20.0));
        assert!(obs.should_notify(&Value::Float(20.0), 6));
    }

    #[test]
    fn step_gates_small_changes() {
        let mut obs = Observation::new(ObservationId(0), path(), 1, vec![1]);
        obs.attributes.step = Some(1.0);
        obs.should_notify(&Value::Float(20.0), 0);
        obs.record_notified(Value::Float(20.0));
        assert!(!obs.should_notify(&Value::Float(20.5), 1));
        assert!(obs.should_notify(&Value::Float(21.5), 1));
    }

    #[test]
    fn evaluate_write_queues_notification_for_matching_observation() {
        let mut table = ObservationTable::new();
        table.create(path(), 1, vec![1]);
        table.evaluate_write(1, &path(), &Value::Float(22.0), 0);
        let pending = table.take_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].path, path());
        assert_eq!(pending[0].value, Value::Float(22.0));
        assert!(table.take_pending().is_empty());
    }

    #[test]
    fn evaluate_write_ignores_other_clients_and_paths() {
        let mut table = ObservationTable::new();
        table.create(path(), 1, vec![1]);
        table.evaluate_write(2, &path(), &Value::Float(22.0), 0);
        table.evaluate_write(1, &Path::parse("/1000/0/105").unwrap(), &Value::Float(22.0), 0);
        assert!(table.take_pending().is_empty());
    }
}
