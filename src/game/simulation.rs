use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::game::entity::{lock, EntityStore};

/// Shared client-side movement interpolation.
///
/// One background thread advances every registered [`EntityStore`] at a
/// fixed cadence. Stores are held weakly: dropping the last `Arc` to a
/// character's store unregisters it on the next tick.
#[derive(Debug)]
pub struct Interpolator {
    stores: Arc<Mutex<Vec<Weak<EntityStore>>>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Interpolator {
    /// Start the interpolation thread ticking every `tick`.
    pub fn spawn(tick: Duration) -> std::io::Result<Self> {
        let stores: Arc<Mutex<Vec<Weak<EntityStore>>>> = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));

        let thread_stores = Arc::clone(&stores);
        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("interpolator".into())
            .spawn(move || run(thread_stores, thread_running, tick))?;

        info!("[SIM] Interpolator started ({} ms tick)", tick.as_millis());
        Ok(Self { stores, running, handle: Some(handle) })
    }

    pub fn register(&self, store: &Arc<EntityStore>) {
        lock(&self.stores).push(Arc::downgrade(store));
    }

    pub fn registered(&self) -> usize {
        lock(&self.stores).iter().filter(|s| s.strong_count() > 0).count()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Signal the thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("[SIM] Interpolator thread panicked");
            }
            info!("[SIM] Interpolator stopped");
        }
    }
}

impl Drop for Interpolator {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(stores: Arc<Mutex<Vec<Weak<EntityStore>>>>, running: Arc<AtomicBool>, tick: Duration) {
    let mut last = Instant::now();
    let mut ticks: u64 = 0;

    while running.load(Ordering::Acquire) {
        thread::sleep(tick);
        let now = Instant::now();
        let delta_ms = now.duration_since(last).as_secs_f64() * 1000.0;
        last = now;

        // Upgrade under the lock, advance outside it so `register` never waits on a tick
        let live: Vec<Arc<EntityStore>> = {
            let mut guard = lock(&stores);
            guard.retain(|s| s.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };
        for store in &live {
            store.advance(delta_ms);
        }

        ticks += 1;
        crate::profile_log!(ticks, 1000, "[SIM] tick {} advanced {} stores ({:.1} ms)", ticks, live.len(), delta_ms);
    }
    debug!("[SIM] Interpolator exiting after {} ticks", ticks);
}
