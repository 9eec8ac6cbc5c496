//! Change notifications
//!
//! Services publish a [`LedgerChange`] after every successful commit, naming the
//! entity id and the grouping keys (month, owning booker, ...) whose cached
//! reads are now stale.

use chrono::NaiveDate;
use serde::Serialize;
use shared::YearMonth;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Company,
    Product,
    OrderBooker,
    DailyEntry,
    Order,
    MonthlyTarget,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LedgerChange {
    pub entity: EntityKind,
    pub kind: ChangeKind,
    pub id: String,
    pub keys: Vec<String>,
}

impl LedgerChange {
    pub fn new(entity: EntityKind, kind: ChangeKind, id: impl Into<String>) -> Self {
        Self {
            entity,
            kind,
            id: id.into(),
            keys: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: String) -> Self {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
        self
    }

    pub fn with_month(self, date: NaiveDate) -> Self {
        self.with_key(month_key(YearMonth::of(date)))
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

pub fn month_key(month: YearMonth) -> String {
    format!("month:{}", month)
}

pub fn order_booker_key(id: &str) -> String {
    format!("order_booker:{}", id)
}

pub fn company_key(id: &str) -> String {
    format!("company:{}", id)
}

pub fn order_key(id: &str) -> String {
    format!("order:{}", id)
}

/// Fan-out of ledger changes to any number of subscribers
#[derive(Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<LedgerChange>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.sender.subscribe()
    }

    pub fn publish(&self, change: LedgerChange) {
        debug!(
            entity = ?change.entity,
            kind = ?change.kind,
            id = %change.id,
            keys = ?change.keys,
            "Ledger changed"
        );
        // No subscribers is fine
        let _ = self.sender.send(change);
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_changes() {
        let notifier = ChangeNotifier::new(8);
        let mut rx = notifier.subscribe();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        notifier.publish(
            LedgerChange::new(EntityKind::DailyEntry, ChangeKind::Created, "e-1")
                .with_month(date)
                .with_key(order_booker_key("ob-1"))
                .with_month(date),
        );

        let change = rx.recv().await.unwrap();
        assert_eq!(change.id, "e-1");
        assert_eq!(change.keys, vec!["month:2024-03", "order_booker:ob-1"]);
        assert!(change.has_key("month:2024-03"));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let notifier = ChangeNotifier::default();
        notifier.publish(LedgerChange::new(EntityKind::Company, ChangeKind::Deleted, "c-1"));
    }
}
