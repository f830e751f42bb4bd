//! Dispatch Core
//!
//! Hands accepted connections to idle workers. Three pieces:
//!
//! - [`IdleQueue`]: FIFO of idle worker ids; enqueue is idempotent.
//! - [`AdmissionGate`]: counting gate initialized to the pool size.
//!   `submit` blocks on it while every worker is busy, which is the
//!   deliberate backpressure: excess connections wait in the OS accept
//!   backlog rather than being dispatched.
//! - [`Dispatcher`]: the handoff mutex over the idle queue and the
//!   per-worker connection slots, with one wakeup condvar per worker.
//!
//! Invariants: no two workers are ever assigned the same connection,
//! and a worker id never sits in the idle queue while its slot holds a
//! connection. The handoff mutex is held only for the queue/slot
//! updates, never across store operations.

use std::collections::VecDeque;
use std::net::TcpStream;

use parking_lot::{Condvar, Mutex};

// =============================================================================
// Idle Worker Queue
// =============================================================================

/// FIFO of idle worker ids. Enqueueing an id already present is a
/// no-op.
pub struct IdleQueue {
    items: VecDeque<usize>,
}

impl IdleQueue {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, id: usize) {
        if !self.items.contains(&id) {
            self.items.push_back(id);
        }
    }

    pub fn dequeue(&mut self) -> Option<usize> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for IdleQueue {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Admission Gate
// =============================================================================

/// Counting gate bounding concurrently-busy workers.
pub struct AdmissionGate {
    permits: Mutex<usize>,
    available: Condvar,
}

impl AdmissionGate {
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Take one permit, blocking while none are available.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Return one permit and wake one blocked acquirer.
    pub fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        self.available.notify_one();
    }

    /// Current permit count (snapshot, for tests and logging).
    pub fn permits(&self) -> usize {
        *self.permits.lock()
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

struct HandoffState {
    idle: IdleQueue,
    slots: Vec<Option<TcpStream>>,
}

/// Assigns accepted connections to idle workers.
pub struct Dispatcher {
    handoff: Mutex<HandoffState>,
    wakeups: Vec<Condvar>,
    gate: AdmissionGate,
    pool_size: usize,
}

impl Dispatcher {
    /// Create a dispatcher for a pool of `pool_size` workers, all
    /// initially idle.
    pub fn new(pool_size: usize) -> Self {
        let mut idle = IdleQueue::new();
        for id in 0..pool_size {
            idle.enqueue(id);
        }

        Self {
            handoff: Mutex::new(HandoffState {
                idle,
                slots: (0..pool_size).map(|_| None).collect(),
            }),
            wakeups: (0..pool_size).map(|_| Condvar::new()).collect(),
            gate: AdmissionGate::new(pool_size),
            pool_size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of currently idle workers (snapshot, for tests).
    pub fn idle_count(&self) -> usize {
        self.handoff.lock().idle.len()
    }

    /// Assign a connection to an idle worker, blocking until one is
    /// available.
    pub fn submit(&self, conn: TcpStream) {
        self.gate.acquire();

        let mut state = self.handoff.lock();
        let id = match state.idle.dequeue() {
            Some(id) => id,
            None => {
                // Unreachable while the gate invariant holds.
                tracing::error!("admission gate passed with no idle worker; dropping connection");
                drop(state);
                self.gate.release();
                return;
            }
        };

        state.slots[id] = Some(conn);
        self.wakeups[id].notify_one();
    }

    /// Block until this worker's slot is populated, then take the
    /// connection out of it.
    pub fn wait_for_connection(&self, worker_id: usize) -> TcpStream {
        let mut state = self.handoff.lock();
        loop {
            if let Some(conn) = state.slots[worker_id].take() {
                return conn;
            }
            self.wakeups[worker_id].wait(&mut state);
        }
    }

    /// Mark this worker idle again and return its admission permit.
    pub fn release(&self, worker_id: usize) {
        {
            let mut state = self.handoff.lock();
            state.idle.enqueue(worker_id);
        }
        self.gate.release();
    }
}
