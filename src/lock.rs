//! In-process keyed locks serializing writers of the same license or member.

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lock {
  License(String),
  Member(i64),
}

#[derive(Default)]
pub struct Locks {
  inner: DashMap<Lock, Arc<Mutex<()>>>,
}

impl Locks {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn acquire(&self, lock: Lock) -> OwnedMutexGuard<()> {
    let mutex = self.inner.entry(lock).or_default().clone();
    mutex.lock_owned().await
  }

  /// Drops mutexes nobody holds or waits for.
  pub fn gc(&self) {
    self.inner.retain(|_, mutex| Arc::strong_count(mutex) > 1);
  }

  pub fn len(&self) -> usize {
    self.inner.len()
  }
}
