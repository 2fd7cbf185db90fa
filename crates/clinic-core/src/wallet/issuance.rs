//! Prescription issuance paid for from the wallet.

use serde::Serialize;

use super::debit;
use crate::db::{SqlitePrescriptionRepository, SqliteWalletRepository};
use crate::error::{Error, Result};
use crate::models::RecordId;
use crate::services::LocalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IssuanceOutcome {
    /// The debit and the deducted flag were committed together
    Issued { balance: i64 },
    /// The prescription was already paid for; nothing changed
    AlreadyDeducted { balance: i64 },
}

impl IssuanceOutcome {
    pub const fn balance(self) -> i64 {
        match self {
            Self::Issued { balance } | Self::AlreadyDeducted { balance } => balance,
        }
    }
}

/// Finalize a prescription and charge `cost` for it.
///
/// Checking the balance, writing the new balance and marking the
/// prescription deducted happen in one transaction. A prescription is
/// charged at most once.
pub fn finalize_prescription(
    store: &LocalStore,
    id: &RecordId,
    cost: i64,
) -> Result<IssuanceOutcome> {
    let outcome = store.with_transaction(|conn| {
        let prescriptions = SqlitePrescriptionRepository::new(conn);
        let wallet = SqliteWalletRepository::new(conn);

        let deducted = prescriptions
            .wallet_deducted(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let balance = wallet.load()?.balance;
        if deducted {
            return Ok(IssuanceOutcome::AlreadyDeducted { balance });
        }
        // The flag can be reset by a pulled row; the local ledger cannot.
        if wallet.has_debit_for(id.as_str())? {
            prescriptions.mark_deducted(id)?;
            return Ok(IssuanceOutcome::AlreadyDeducted { balance });
        }
        if balance < cost {
            return Err(Error::InsufficientBalance { balance, cost });
        }

        let balance = debit(conn, cost, "Prescription issued", Some(id.as_str()))?;
        prescriptions.mark_deducted(id)?;
        Ok(IssuanceOutcome::Issued { balance })
    })?;

    match outcome {
        IssuanceOutcome::Issued { balance } => {
            tracing::info!("Issued prescription {id} for {cost}, balance {balance}");
        }
        IssuanceOutcome::AlreadyDeducted { .. } => {
            tracing::debug!("Prescription {id} already paid for");
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PrescriptionItems;
    use crate::models::{EntityKind, Patient, Prescription, TransactionKind};
    use crate::sync::{apply_changes, RemoteChanges, WireRecord};
    use crate::wallet::WalletLedger;
    use pretty_assertions::assert_eq;

    fn setup(balance: i64) -> (LocalStore, Prescription) {
        let store = LocalStore::open_in_memory().unwrap();
        let mut patient = Patient::new("Asha");
        store.save(&mut patient).unwrap();
        let mut prescription = Prescription::new(patient.id.clone());
        store
            .save_prescription(&mut prescription, &mut PrescriptionItems::default())
            .unwrap();
        if balance > 0 {
            WalletLedger::new(store.clone()).recharge(balance).unwrap();
        }
        (store, prescription)
    }

    #[test]
    fn issuing_debits_once_and_flags_prescription() {
        let (store, prescription) = setup(5);
        let ledger = WalletLedger::new(store.clone());
        assert!(ledger.can_afford(1).unwrap());

        let first = finalize_prescription(&store, &prescription.id, 1).unwrap();
        assert_eq!(first, IssuanceOutcome::Issued { balance: 4 });

        let stored: Prescription = store.get(&prescription.id).unwrap().unwrap();
        assert!(stored.wallet_deducted);
        assert!(stored.is_finalized());

        let second = finalize_prescription(&store, &prescription.id, 1).unwrap();
        assert_eq!(second, IssuanceOutcome::AlreadyDeducted { balance: 4 });
        assert_eq!(ledger.balance().unwrap().balance, 4);

        let debits = ledger
            .transactions(10)
            .unwrap()
            .into_iter()
            .filter(|entry| entry.reference_id.as_deref() == Some(prescription.id.as_str()))
            .count();
        assert_eq!(debits, 1);
    }

    #[test]
    fn pulled_row_resetting_flag_does_not_charge_again() {
        let (store, prescription) = setup(5);
        let ledger = WalletLedger::new(store.clone());
        finalize_prescription(&store, &prescription.id, 1).unwrap();

        let mut incoming: Prescription = store.get(&prescription.id).unwrap().unwrap();
        incoming.wallet_deducted = false;
        incoming.finalized_at = None;
        incoming.updated_at += 1_000;
        let changes = RemoteChanges {
            success: true,
            server_time: incoming.updated_at,
            prescriptions: vec![serde_json::to_value(incoming.to_wire()).unwrap()],
            ..RemoteChanges::default()
        };
        store
            .with_transaction(|conn| apply_changes(conn, &changes))
            .unwrap();
        let reset: Prescription = store.get(&prescription.id).unwrap().unwrap();
        assert!(!reset.wallet_deducted);

        let second = finalize_prescription(&store, &prescription.id, 1).unwrap();
        assert_eq!(second, IssuanceOutcome::AlreadyDeducted { balance: 4 });
        assert_eq!(ledger.balance().unwrap().balance, 4);

        let debits = ledger
            .transactions(10)
            .unwrap()
            .into_iter()
            .filter(|entry| entry.kind == TransactionKind::Debit)
            .count();
        assert_eq!(debits, 1);

        let restored: Prescription = store.get(&prescription.id).unwrap().unwrap();
        assert!(restored.wallet_deducted);
        assert_eq!(
            store
                .is_dirty(EntityKind::Prescriptions, &prescription.id)
                .unwrap(),
            Some(true)
        );
    }

    #[test]
    fn insufficient_balance_changes_nothing() {
        let (store, prescription) = setup(0);
        let ledger = WalletLedger::new(store.clone());

        let error = finalize_prescription(&store, &prescription.id, 2).unwrap_err();
        assert!(matches!(error, Error::InsufficientBalance { balance: 0, cost: 2 }));

        let stored: Prescription = store.get(&prescription.id).unwrap().unwrap();
        assert!(!stored.wallet_deducted);
        assert!(stored.finalized_at.is_none());
        assert_eq!(ledger.balance().unwrap().balance, 0);
        assert!(ledger.transactions(10).unwrap().is_empty());
    }

    #[test]
    fn issuing_re_dirties_prescription() {
        let (store, prescription) = setup(3);
        let dirty = store.query_dirty::<Prescription>().unwrap();
        let acks = dirty
            .iter()
            .map(|entry| crate::db::SyncAck {
                id: entry.record.id.clone(),
                local_version: entry.local_version,
            })
            .collect::<Vec<_>>();
        store.mark_synced(EntityKind::Prescriptions, &acks).unwrap();
        assert_eq!(
            store
                .is_dirty(EntityKind::Prescriptions, &prescription.id)
                .unwrap(),
            Some(false)
        );

        finalize_prescription(&store, &prescription.id, 1).unwrap();
        assert_eq!(
            store
                .is_dirty(EntityKind::Prescriptions, &prescription.id)
                .unwrap(),
            Some(true)
        );
    }

    #[test]
    fn unknown_prescription_is_not_found() {
        let (store, _) = setup(5);
        let error = finalize_prescription(&store, &RecordId::new(), 1).unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
        assert_eq!(WalletLedger::new(store).balance().unwrap().balance, 5);
    }
}
