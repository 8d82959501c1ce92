//! The process-wide world lock.
//!
//! A single [`tokio::sync::RwLock`] guards the whole [`World`] tree. Every
//! mutation (player commands, the tick engine) holds the write guard for its
//! full read-modify-write. Reads (API queries, snapshot encoding) hold the
//! read guard. There is no finer-grained locking.

use std::sync::Arc;

use stronghold_world::World;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::balance::BalanceLookup;
use crate::tick::{self, TickReport};

/// Cloneable handle to the shared world.
#[derive(Debug, Clone, Default)]
pub struct SharedWorld {
    inner: Arc<RwLock<World>>,
}

impl SharedWorld {
    /// Wrap a world for sharing between tasks.
    pub fn new(world: World) -> Self {
        Self {
            inner: Arc::new(RwLock::new(world)),
        }
    }

    /// Acquire the shared read guard.
    pub async fn read(&self) -> RwLockReadGuard<'_, World> {
        self.inner.read().await
    }

    /// Acquire the exclusive write guard.
    pub async fn write(&self) -> RwLockWriteGuard<'_, World> {
        self.inner.write().await
    }

    /// Run the tick engine under the write guard.
    pub async fn advance<B>(&self, delta_seconds: f64, balance: &B) -> TickReport
    where
        B: BalanceLookup + ?Sized,
    {
        let mut world = self.inner.write().await;
        tick::advance(&mut world, delta_seconds, balance)
    }
}
