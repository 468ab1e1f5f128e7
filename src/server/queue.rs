//! # Cola acotada de conexiones
//! src/server/queue.rs
//!
//! Cola FIFO thread-safe con capacidad fija. El accept loop es el único
//! productor; los workers son los consumidores.
//!
//! - `push` bloquea mientras la cola está llena (backpressure)
//! - `pop` bloquea mientras la cola está vacía
//! - `task_done` / `join` llevan la cuenta del trabajo sin terminar, para
//!   esperar a que los workers procesen todo lo encolado

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Estado protegido por el mutex
struct QueueState<T> {
    items: VecDeque<T>,

    /// Items encolados cuyo `task_done` todavía no llegó
    unfinished: usize,
}

/// Cola FIFO acotada y bloqueante
pub struct ConnectionQueue<T> {
    state: Arc<Mutex<QueueState<T>>>,

    /// Se notifica cuando entra un item
    not_empty: Arc<Condvar>,

    /// Se notifica cuando sale un item
    not_full: Arc<Condvar>,

    /// Se notifica cuando `unfinished` llega a cero
    all_done: Arc<Condvar>,

    capacity: usize,
}

impl<T> ConnectionQueue<T> {
    /// Crea una nueva cola con capacidad máxima
    ///
    /// # Panics
    ///
    /// Si `capacity` es cero: la cola nunca aceptaría items.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be >= 1");

        Self {
            state: Arc::new(Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                unfinished: 0,
            })),
            not_empty: Arc::new(Condvar::new()),
            not_full: Arc::new(Condvar::new()),
            all_done: Arc::new(Condvar::new()),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        // Un worker que entró en pánico no invalida la cola
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Encola un item, bloqueando mientras la cola esté llena
    pub fn push(&self, item: T) {
        let mut state = self.lock();
        while state.items.len() >= self.capacity {
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }

        state.items.push_back(item);
        state.unfinished += 1;
        self.not_empty.notify_one();
    }

    /// Intenta encolar sin bloquear
    ///
    /// Retorna el item de vuelta si la cola está llena.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if state.items.len() >= self.capacity {
            return Err(item);
        }

        state.items.push_back(item);
        state.unfinished += 1;
        self.not_empty.notify_one();
        Ok(())
    }

    /// Desencola el item más antiguo
    ///
    /// Bloquea hasta que haya un item disponible
    pub fn pop(&self) -> T {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                self.not_full.notify_one();
                return item;
            }

            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Marca como terminado un item obtenido con `pop`
    pub fn task_done(&self) {
        let mut state = self.lock();
        state.unfinished = state.unfinished.saturating_sub(1);
        if state.unfinished == 0 {
            self.all_done.notify_all();
        }
    }

    /// Bloquea hasta que todos los items encolados fueron procesados
    pub fn join(&self) {
        let mut state = self.lock();
        while state.unfinished > 0 {
            state = self
                .all_done
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Retorna el tamaño actual de la cola
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Verifica si la cola está vacía
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retorna la capacidad máxima
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Clone for ConnectionQueue<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            not_empty: Arc::clone(&self.not_empty),
            not_full: Arc::clone(&self.not_full),
            all_done: Arc::clone(&self.all_done),
            capacity: self.capacity,
        }
    }
}
