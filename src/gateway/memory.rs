//! In-memory reference gateway
//!
//! A [`MemoryGateway`] keeps all five tables in a single mutex-guarded
//! store, assigns identifiers from one monotone sequence, and fans
//! change events out to subscribers over channels. It is the single
//! point of write serialization the core relies on, and it is what the
//! test suite drives end to end.

use std::sync::{Mutex, mpsc};

use enum_map::EnumMap;
use uuid::Uuid;

use super::{
    ChangeEvent, ChangeKind, Error, Gateway, Order, Record, RowData, Selector, Subscription, Table,
};

/// A subscriber registered on one table
#[derive(Debug)]
struct Subscriber {
    token: Uuid,
    kind: ChangeKind,
    selector: Selector,
    sender: mpsc::Sender<ChangeEvent>,
}

/// Mutable gateway state behind the lock
#[derive(Debug, Default)]
struct Store {
    /// Next identifier to assign; shared across tables so identifiers
    /// are globally unique and strictly increasing
    next_id: u64,
    /// Rows per table in insertion order
    tables: EnumMap<Table, Vec<RowData>>,
    /// Registered subscribers per table
    subscribers: EnumMap<Table, Vec<Subscriber>>,
}

impl Store {
    /// Delivers an event to matching subscribers, pruning dead channels.
    fn notify(&mut self, table: Table, kind: ChangeKind, row: RowData) {
        let event = ChangeEvent { table, kind, row };
        self.subscribers[table].retain(|subscriber| {
            if subscriber.kind != kind || !event.row.matches(&subscriber.selector) {
                return true;
            }
            subscriber.sender.send(event.clone()).is_ok()
        });
    }
}

/// An in-memory [`Gateway`] implementation
///
/// All operations are safe to call from multiple threads; writes are
/// serialized by the internal lock. Identifiers start at 1.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    store: Mutex<Store>,
}

impl MemoryGateway {
    /// Creates an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store, mapping a poisoned lock to a gateway failure.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Store>, Error> {
        self.store
            .lock()
            .map_err(|_| Error::Unavailable("store lock poisoned".to_owned()))
    }
}

impl Gateway for MemoryGateway {
    fn insert<R: Record>(&self, draft: R::Draft) -> Result<R, Error> {
        let mut store = self.lock()?;

        store.next_id += 1;
        let record = R::assemble(store.next_id, draft);

        store.tables[R::TABLE].push(record.clone().into());
        store.notify(R::TABLE, ChangeKind::Insert, record.clone().into());

        Ok(record)
    }

    fn update<R: Record>(&self, selector: &Selector, patch: R::Patch) -> Result<R, Error> {
        let mut store = self.lock()?;

        let mut updated: Vec<R> = Vec::new();
        for row in &mut store.tables[R::TABLE] {
            let Some(mut record) = R::from_row(row) else {
                continue;
            };
            if !record.matches(selector) {
                continue;
            }
            record.apply(patch.clone());
            *row = record.clone().into();
            updated.push(record);
        }

        let first = updated.first().cloned().ok_or(Error::NotFound)?;
        for record in updated {
            store.notify(R::TABLE, ChangeKind::Update, record.into());
        }

        Ok(first)
    }

    fn query<R: Record>(
        &self,
        selector: &Selector,
        order: Order,
        limit: Option<usize>,
    ) -> Result<Vec<R>, Error> {
        let store = self.lock()?;

        // Rows are stored in insertion order, which is ascending id.
        let rows = store.tables[R::TABLE]
            .iter()
            .filter_map(R::from_row)
            .filter(|record| record.matches(selector));

        let mut records: Vec<R> = rows.collect();
        if matches!(order, Order::IdDescending) {
            records.reverse();
        }
        if let Some(limit) = limit {
            records.truncate(limit);
        }

        Ok(records)
    }

    fn subscribe(
        &self,
        table: Table,
        kind: ChangeKind,
        selector: Selector,
    ) -> Result<Subscription, Error> {
        let mut store = self.lock()?;

        let token = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel();
        store.subscribers[table].push(Subscriber {
            token,
            kind,
            selector,
            sender,
        });

        Ok(Subscription::new(token, receiver))
    }

    fn unsubscribe(&self, token: Uuid) {
        let Ok(mut store) = self.lock() else {
            return;
        };
        for (_, subscribers) in &mut store.subscribers {
            subscribers.retain(|subscriber| subscriber.token != token);
        }
    }
}
