use billflow_core::{Bill, BillId, ValidatedBill};
use chrono::Utc;
use tokio::sync::RwLock;

/// Process-lifetime bill list. Ids start at 1.
pub struct BillStore {
    inner: RwLock<Inner>,
}

struct Inner {
    bills: Vec<Bill>,
    next_id: u64,
}

impl Default for BillStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BillStore {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner { bills: Vec::new(), next_id: 1 }) }
    }

    pub async fn insert(&self, bill: ValidatedBill) -> BillId {
        let mut inner = self.inner.write().await;
        let id = BillId(inner.next_id);
        inner.next_id += 1;
        inner.bills.push(bill.into_bill(id, Utc::now()));
        id
    }

    /// All bills in insertion order.
    pub async fn list(&self) -> Vec<Bill> {
        self.inner.read().await.bills.clone()
    }

    pub async fn get(&self, id: BillId) -> Option<Bill> {
        self.inner.read().await.bills.iter().find(|b| b.id == id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billflow_core::Money;
    use chrono::NaiveDate;

    fn bill(merchant: &str) -> ValidatedBill {
        ValidatedBill {
            merchant_name: merchant.to_string(),
            amount: Money::from_cents(4567),
            date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            category: "Groceries".to_string(),
            notes: None,
            raw_text: None,
        }
    }

    #[tokio::test]
    async fn ids_are_sequential_from_one() {
        let store = BillStore::new();
        assert_eq!(store.insert(bill("Walmart")).await, BillId(1));
        assert_eq!(store.insert(bill("Target")).await, BillId(2));

        let all = store.list().await;
        assert_eq!(all.iter().map(|b| b.merchant_name.as_str()).collect::<Vec<_>>(), ["Walmart", "Target"]);
    }

    #[tokio::test]
    async fn get_by_id() {
        let store = BillStore::new();
        store.insert(bill("Walmart")).await;
        assert_eq!(store.get(BillId(1)).await.unwrap().merchant_name, "Walmart");
        assert!(store.get(BillId(2)).await.is_none());
    }
}
