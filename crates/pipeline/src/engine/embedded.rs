//! In-process engine for the statements the compiler generates.
//!
//! Events are queued on a flume channel and routed by a single dispatcher
//! thread, so every listener runs on that thread, one call at a time.
//! Listener calls happen outside the state lock: a listener may feed events
//! back into the engine, they are queued behind the ones already waiting.

use cep_types::Event;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error, info, warn};

use super::parse::{parse, Query};
use super::{EngineConfiguration, QueryEngine, ResultRow, StatementId, StatementListener};
use crate::error::EngineError;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const DESTROYED: u8 = 2;

enum Command {
    Event { event_name: String, event: Event },
    Stop,
}

struct Statement {
    text: String,
    query: Query,
    windows: Vec<VecDeque<Event>>,
    listeners: Vec<Arc<dyn StatementListener>>,
}

impl Statement {
    fn new(text: &str, query: Query) -> Self {
        let windows = query
            .streams
            .iter()
            .map(|s| VecDeque::with_capacity(s.length))
            .collect();
        Self {
            text: text.to_string(),
            query,
            windows,
            listeners: Vec::new(),
        }
    }

    /// Pushes `event` into every window reading `event_name` and returns the
    /// rows it produces. Nothing fires until every window holds an event.
    fn on_event(&mut self, event_name: &str, event: &Event) -> Vec<ResultRow> {
        let mut touched = Vec::new();
        for (i, stream) in self.query.streams.iter().enumerate() {
            if stream.event_name == event_name {
                let window = &mut self.windows[i];
                if window.len() == stream.length {
                    window.pop_front();
                }
                window.push_back(event.clone());
                touched.push(i);
            }
        }
        if touched.is_empty() || self.windows.iter().any(VecDeque::is_empty) {
            return Vec::new();
        }

        let lengths: Vec<usize> = self.windows.iter().map(VecDeque::len).collect();
        combinations(&lengths)
            .into_iter()
            // Only combinations containing the new event are new rows.
            .filter(|combo| touched.iter().any(|&i| combo[i] == lengths[i] - 1))
            .filter(|combo| self.matches(combo))
            .map(|combo| self.row(&combo))
            .collect()
    }

    fn matches(&self, combo: &[usize]) -> bool {
        self.query.predicates.iter().all(|p| {
            let left = self.windows[p.left.stream][combo[p.left.stream]].get(&p.left.attribute);
            let right = self.windows[p.right.stream][combo[p.right.stream]].get(&p.right.attribute);
            match (left, right) {
                (Some(l), Some(r)) => l.loose_eq(r),
                _ => false,
            }
        })
    }

    fn row(&self, combo: &[usize]) -> ResultRow {
        let mut row = ResultRow::new();
        for column in &self.query.columns {
            let event = &self.windows[column.stream][combo[column.stream]];
            row.insert(column.name.clone(), event.clone());
        }
        row
    }
}

/// Every index tuple `t` with `t[i] < lengths[i]`, in row-major order.
fn combinations(lengths: &[usize]) -> Vec<Vec<usize>> {
    let mut result = vec![Vec::with_capacity(lengths.len())];
    for &len in lengths {
        result = result
            .into_iter()
            .flat_map(|prefix| {
                (0..len).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect();
    }
    result
}

#[derive(Default)]
struct EngineState {
    statements: Vec<Statement>,
}

type Delivery = (Vec<Arc<dyn StatementListener>>, Vec<ResultRow>);

fn dispatch(state: &Mutex<EngineState>, event_name: &str, event: &Event) {
    let deliveries: Vec<Delivery> = {
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .statements
            .iter_mut()
            .filter_map(|statement| {
                let rows = statement.on_event(event_name, event);
                if rows.is_empty() || statement.listeners.is_empty() {
                    None
                } else {
                    debug!(statement = %statement.text, rows = rows.len(), "statement fired");
                    Some((statement.listeners.clone(), rows))
                }
            })
            .collect()
    };
    for (listeners, rows) in deliveries {
        for listener in listeners {
            listener.update(&rows);
        }
    }
}

fn run_dispatcher(uri: String, receiver: flume::Receiver<Command>, state: Arc<Mutex<EngineState>>) {
    debug!(%uri, "dispatcher started");
    while let Ok(command) = receiver.recv() {
        match command {
            Command::Event { event_name, event } => dispatch(&state, &event_name, &event),
            Command::Stop => break,
        }
    }
    // Drain what was queued before the stop, plus anything listeners emit
    // while draining.
    let mut drained = 0usize;
    while let Ok(command) = receiver.try_recv() {
        if let Command::Event { event_name, event } = command {
            dispatch(&state, &event_name, &event);
            drained += 1;
        }
    }
    debug!(%uri, drained, "dispatcher stopped");
}

pub struct EmbeddedEngine {
    uri: String,
    configuration: EngineConfiguration,
    state: Arc<Mutex<EngineState>>,
    sender: flume::Sender<Command>,
    receiver: flume::Receiver<Command>,
    status: AtomicU8,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    dispatcher_thread: OnceLock<ThreadId>,
}

impl EmbeddedEngine {
    pub fn new(uri: impl Into<String>, configuration: EngineConfiguration) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            uri: uri.into(),
            configuration,
            state: Arc::new(Mutex::new(EngineState::default())),
            sender,
            receiver,
            status: AtomicU8::new(IDLE),
            dispatcher: Mutex::new(None),
            dispatcher_thread: OnceLock::new(),
        }
    }

    pub fn statement_count(&self) -> usize {
        self.lock_state().statements.len()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_dispatcher_thread(&self) -> bool {
        self.dispatcher_thread.get() == Some(&thread::current().id())
    }
}

impl QueryEngine for EmbeddedEngine {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn configuration(&self) -> &EngineConfiguration {
        &self.configuration
    }

    fn create_statement(&self, text: &str) -> Result<StatementId, EngineError> {
        if self.is_destroyed() {
            return Err(EngineError::NotRunning);
        }
        let query = parse(text, &self.configuration)?;
        let mut state = self.lock_state();
        state.statements.push(Statement::new(text, query));
        let id = StatementId(state.statements.len() - 1);
        debug!(uri = %self.uri, %id, statement = text, "statement created");
        Ok(id)
    }

    fn add_listener(
        &self,
        statement: StatementId,
        listener: Arc<dyn StatementListener>,
    ) -> Result<(), EngineError> {
        let mut state = self.lock_state();
        let registered = state
            .statements
            .get_mut(statement.0)
            .ok_or(EngineError::UnknownStatement(statement))?;
        registered.listeners.push(listener);
        Ok(())
    }

    fn send_event(&self, event: Event, event_name: &str) -> Result<(), EngineError> {
        if !self.configuration.contains(event_name) {
            warn!(uri = %self.uri, event_name, "rejected event of unknown type");
            return Err(EngineError::UnknownEventType(event_name.to_string()));
        }
        // Held until the event is queued so destroy cannot drain in between.
        let _dispatcher = self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner);
        match self.status.load(Ordering::SeqCst) {
            RUNNING => {}
            // Listeners keep feeding the drain after destroy.
            DESTROYED if self.on_dispatcher_thread() => {}
            _ => return Err(EngineError::NotRunning),
        }
        self.sender
            .send(Command::Event {
                event_name: event_name.to_string(),
                event,
            })
            .map_err(|_| EngineError::NotRunning)
    }

    fn start(&self) -> Result<(), EngineError> {
        let mut dispatcher = self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner);
        match self.status.load(Ordering::SeqCst) {
            RUNNING => return Ok(()),
            DESTROYED => return Err(EngineError::NotRunning),
            _ => {}
        }

        let uri = self.uri.clone();
        let receiver = self.receiver.clone();
        let state = Arc::clone(&self.state);
        let handle = thread::Builder::new()
            .name(format!("cep-engine-{}", self.uri))
            .spawn(move || run_dispatcher(uri, receiver, state))
            .map_err(|e| EngineError::Spawn(e.to_string()))?;
        let _ = self.dispatcher_thread.set(handle.thread().id());
        *dispatcher = Some(handle);
        self.status.store(RUNNING, Ordering::SeqCst);
        info!(uri = %self.uri, statements = self.statement_count(), "engine started");
        Ok(())
    }

    fn destroy(&self) {
        let handle = {
            let mut dispatcher = self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner);
            if self.status.swap(DESTROYED, Ordering::SeqCst) == DESTROYED {
                return;
            }
            dispatcher.take()
        };
        if let Some(handle) = handle {
            let _ = self.sender.send(Command::Stop);
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                error!(uri = %self.uri, "engine dispatcher panicked");
            }
        }
        info!(uri = %self.uri, "engine destroyed");
    }

    fn is_destroyed(&self) -> bool {
        self.status.load(Ordering::SeqCst) == DESTROYED
    }
}

impl Drop for EmbeddedEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cep_types::{EventDefinition, ValueType};

    #[derive(Default)]
    struct Collect {
        rows: Mutex<Vec<ResultRow>>,
    }

    impl StatementListener for Collect {
        fn update(&self, rows: &[ResultRow]) {
            self.rows.lock().unwrap().extend_from_slice(rows);
        }
    }

    fn engine() -> EmbeddedEngine {
        let definition: EventDefinition = [
            ("key".to_string(), ValueType::Long),
            ("v".to_string(), ValueType::Double),
        ]
        .into_iter()
        .collect();
        let mut config = EngineConfiguration::new();
        config.add_event_type("_a", definition.clone());
        config.add_event_type("_b", definition);
        EmbeddedEngine::new("test", config)
    }

    fn event(key: i64, v: f64) -> Event {
        Event::new().with("key", key).with("v", v)
    }

    #[test]
    fn test_combinations() {
        assert_eq!(
            combinations(&[2, 1, 2]),
            vec![vec![0, 0, 0], vec![0, 0, 1], vec![1, 0, 0], vec![1, 0, 1]]
        );
        assert!(combinations(&[1, 0]).is_empty());
    }

    #[test]
    fn test_send_requires_running_engine() {
        let engine = engine();
        assert_eq!(engine.send_event(event(1, 1.0), "_a"), Err(EngineError::NotRunning));
        engine.start().unwrap();
        assert_eq!(
            engine.send_event(event(1, 1.0), "_zz"),
            Err(EngineError::UnknownEventType("_zz".to_string()))
        );
        engine.destroy();
        engine.destroy();
        assert!(engine.is_destroyed());
        assert_eq!(engine.send_event(event(1, 1.0), "_a"), Err(EngineError::NotRunning));
        assert_eq!(engine.start(), Err(EngineError::NotRunning));
    }

    #[test]
    fn test_single_stream_fires_per_event() {
        let engine = engine();
        let stmt = engine
            .create_statement("SELECT _0.* as _0_properties FROM _a.win:length(1) as _0")
            .unwrap();
        let collect = Arc::new(Collect::default());
        engine.add_listener(stmt, collect.clone()).unwrap();
        engine.start().unwrap();
        for i in 0..3 {
            engine.send_event(event(i, i as f64), "_a").unwrap();
        }
        engine.send_event(event(9, 9.0), "_b").unwrap();
        engine.destroy();

        let rows = collect.rows.lock().unwrap();
        let keys: Vec<i64> = rows
            .iter()
            .filter_map(|r| r.get("_0_properties").and_then(|e| e.get_long("key")))
            .collect();
        assert_eq!(keys, vec![0, 1, 2]);
    }

    #[test]
    fn test_join_filters_rows() {
        let engine = engine();
        let stmt = engine
            .create_statement("SELECT _0.*, _1.* FROM _a.win:length(1) as _0, _b.win:length(1) as _1 WHERE _0.key = _1.key")
            .unwrap();
        let collect = Arc::new(Collect::default());
        engine.add_listener(stmt, collect.clone()).unwrap();
        engine.start().unwrap();
        engine.send_event(event(1, 1.0), "_a").unwrap();
        engine.send_event(event(2, 2.0), "_b").unwrap();
        engine.send_event(event(2, 3.0), "_a").unwrap();
        engine.send_event(event(3, 4.0), "_b").unwrap();
        engine.destroy();

        let rows = collect.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("_0").and_then(|e| e.get_double("v")), Some(3.0));
        assert_eq!(rows[0].get("_1").and_then(|e| e.get_double("v")), Some(2.0));
    }

    #[test]
    fn test_accepted_events_survive_concurrent_destroy() {
        let engine = Arc::new(engine());
        let stmt = engine
            .create_statement("SELECT _0.* FROM _a.win:length(1) as _0")
            .unwrap();
        let collect = Arc::new(Collect::default());
        engine.add_listener(stmt, collect.clone()).unwrap();
        engine.start().unwrap();

        let senders: Vec<_> = (0..4)
            .map(|t| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let mut accepted = 0usize;
                    while accepted < 10_000 && engine.send_event(event(t, 0.0), "_a").is_ok() {
                        accepted += 1;
                    }
                    accepted
                })
            })
            .collect();
        thread::sleep(std::time::Duration::from_millis(1));
        engine.destroy();
        let accepted: usize = senders.into_iter().map(|h| h.join().unwrap()).sum();

        assert!(accepted > 0);
        assert_eq!(collect.rows.lock().unwrap().len(), accepted);
    }

    #[test]
    fn test_statement_after_destroy_rejected() {
        let engine = engine();
        engine.destroy();
        assert_eq!(
            engine.create_statement("SELECT _0.* FROM _a.win:length(1) as _0"),
            Err(EngineError::NotRunning)
        );
        assert_eq!(
            engine.add_listener(StatementId(7), Arc::new(Collect::default())),
            Err(EngineError::UnknownStatement(StatementId(7)))
        );
    }
}
