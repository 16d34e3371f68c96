use super::*;
use crate::imports::*;
use crate::signer::AddressKind;
use crate::tx::TransactionDraft;
use crate::wallet::Wallet;
use cat_covenants::TransactionValidator;

#[tokio::test]
async fn test_finalize_pays_exact_fee() {
    let chain = MockChain::new();
    for kind in [AddressKind::P2wpkh, AddressKind::P2tr] {
        let alice = signer(6, kind);
        let receiver = signer(7, AddressKind::P2wpkh).script();
        let first = chain.fund(&alice.script(), 10_000);
        let second = chain.fund(&alice.script(), 5_000);

        let mut draft = TransactionDraft::new();
        draft.add_key_spend(first).add_key_spend(second).add_output(TransactionOutput::new(1_000, receiver)).set_change(alice.script());
        assert_eq!(draft.input_count(), 2);
        assert_eq!(draft.output_count(), 2);
        let finalized = draft.finalize(alice.as_ref(), 3, 330).await.unwrap();

        // placeholder signatures have the final length, so the measured size is the real one
        assert_eq!(finalized.fee, finalized.tx.vsize() * 3);
        assert_eq!(finalized.change, Some(15_000 - 1_000 - finalized.fee));
        let change = finalized.change_utxo().unwrap();
        assert_eq!(change.output_index, 1);
        assert_eq!(change.script, alice.script());
        TransactionValidator::default().verify(&finalized.tx, &finalized.entries).unwrap();

        assert!(matches!(draft.finalize(alice.as_ref(), 3, 330).await, Err(Error::AlreadyFinalized)));
    }
}

#[tokio::test]
async fn test_finalize_insufficient_funds() {
    let chain = MockChain::new();
    let alice = signer(8, AddressKind::P2wpkh);
    let utxo = chain.fund(&alice.script(), 1_200);

    let mut draft = TransactionDraft::new();
    draft.add_key_spend(utxo.clone()).add_output(TransactionOutput::new(1_000, alice.script())).set_change(alice.script());
    // the change would fall below the dust limit
    assert!(matches!(draft.finalize(alice.as_ref(), 1, 330).await, Err(Error::InsufficientFunds { available: 1_200, .. })));

    // without change the remainder is left as fee
    let mut draft = TransactionDraft::new();
    draft.add_key_spend(utxo).add_output(TransactionOutput::new(1_000, alice.script()));
    let finalized = draft.finalize(alice.as_ref(), 1, 330).await.unwrap();
    assert_eq!(finalized.fee, 200);
    assert_eq!(finalized.change, None);
    assert!(finalized.change_utxo().is_none());
}

#[tokio::test]
async fn test_foreign_input_is_not_signed() {
    let chain = MockChain::new();
    let alice = signer(9, AddressKind::P2tr);
    let bob = signer(10, AddressKind::P2tr);
    let mut draft = TransactionDraft::new();
    draft.add_key_spend(chain.fund(&bob.script(), 50_000)).set_change(alice.script());
    assert!(matches!(draft.finalize(alice.as_ref(), 1, 330).await, Err(Error::MissingSignature(0))));
}

#[tokio::test]
async fn test_wallet_fee_utxo() {
    let chain = MockChain::new();
    let alice = signer(11, AddressKind::P2wpkh);
    let wallet = funded_wallet(&chain, alice.clone());
    let largest = chain.fund(&alice.script(), 2 * FUND_SATOSHIS);
    assert_eq!(wallet.fee_utxo().await.unwrap(), largest);

    let empty = Wallet::new(signer(12, AddressKind::P2tr), chain.clone(), chain.clone(), test_settings(), CovenantRegistry::try_new().unwrap());
    assert!(matches!(empty.fee_utxo().await, Err(Error::NoFeeUtxo)));
}
