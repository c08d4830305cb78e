use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

type SlotKey = (Uuid, NaiveDate);

/// Serializes booking writes per (doctor, date) so the read of existing
/// bookings and the write of a new one cannot interleave with another
/// request for the same day.
#[derive(Default)]
pub struct SlotLocks {
    locks: Mutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, doctor_id: Uuid, date: NaiveDate) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only referenced by the map are idle
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((doctor_id, date))
                .or_default()
                .clone()
        };

        debug!("Waiting for slot lock on doctor {} / {}", doctor_id, date);
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_same_day_is_exclusive() {
        let locks = Arc::new(SlotLocks::new());
        let doctor_id = Uuid::new_v4();

        let guard = locks.acquire(doctor_id, day(7)).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(doctor_id, day(7)).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should acquire after release")
            .unwrap();
    }

    #[tokio::test]
    async fn test_other_days_and_doctors_do_not_block() {
        let locks = SlotLocks::new();
        let doctor_id = Uuid::new_v4();

        let _monday = locks.acquire(doctor_id, day(7)).await;
        let _tuesday = tokio::time::timeout(Duration::from_secs(1), locks.acquire(doctor_id, day(8)))
            .await
            .expect("different date must not block");
        let _other = tokio::time::timeout(Duration::from_secs(1), locks.acquire(Uuid::new_v4(), day(7)))
            .await
            .expect("different doctor must not block");
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = SlotLocks::new();

        for d in 1..=5 {
            let _guard = locks.acquire(Uuid::new_v4(), day(d)).await;
        }

        let _guard = locks.acquire(Uuid::new_v4(), day(20)).await;
        assert_eq!(locks.tracked(), 1);
    }
}
