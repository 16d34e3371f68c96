use super::*;
use crate::error::CovenantError;

fn nft(collection: &Cat721Collection, owner: &Keypair, local_id: i32) -> Planned<Cat721State> {
    Planned::Asset { script: collection.nft_script.clone(), state: Cat721State::new(user_owner_addr(&p2tr(owner)), local_id) }
}

fn guard_error(transfer: &Transfer<Cat721GuardConstState, Cat721GuardUnlock>) -> CovenantError {
    let tx = transfer.seal();
    transfer.verify_input(&tx, transfer.guard_index()).unwrap_err().root_cause().clone()
}

#[test]
fn test_swap_and_burn() {
    let mut collection = Cat721Collection::deploy(20, 10);
    let (alice, bob) = (keypair(11), keypair(12));
    let first = collection.mint(&p2tr(&alice));
    let second = collection.mint(&p2tr(&bob));
    assert_eq!((first.state.local_id, second.state.local_id), (0, 1));
    let inputs = [Owned { utxo: &first, owner: &alice }, Owned { utxo: &second, owner: &bob }];

    let outputs = [nft(&collection, &bob, 0), nft(&collection, &alice, 1)];
    let transfer = cat721_transfer(&mut collection.funder, &inputs, &outputs, &[]);
    TransactionValidator::default().verify(&transfer.seal(), &transfer.entries).unwrap();

    let outputs = [nft(&collection, &bob, 0)];
    let transfer = cat721_transfer(&mut collection.funder, &inputs, &outputs, &[1]);
    TransactionValidator::default().verify(&transfer.seal(), &transfer.entries).unwrap();

    let transfer = cat721_transfer(&mut collection.funder, &inputs, &[], &[0, 1]);
    TransactionValidator::default().verify(&transfer.seal(), &transfer.entries).unwrap();
}

#[test]
fn test_input_and_output_sets_must_match() {
    let mut collection = Cat721Collection::deploy(21, 10);
    let alice = keypair(11);
    let first = collection.mint(&p2tr(&alice));
    let second = collection.mint(&p2tr(&alice));
    let inputs = [Owned { utxo: &first, owner: &alice }, Owned { utxo: &second, owner: &alice }];

    let outputs = [nft(&collection, &alice, 0), nft(&collection, &alice, 2)];
    assert_eq!(guard_error(&cat721_transfer(&mut collection.funder, &inputs, &outputs, &[])), CovenantError::NftNotFound(1));

    let outputs = [nft(&collection, &alice, 0), nft(&collection, &alice, 0)];
    assert_eq!(guard_error(&cat721_transfer(&mut collection.funder, &inputs, &outputs, &[])), CovenantError::NftNotFound(1));

    let outputs = [nft(&collection, &alice, 1)];
    assert_eq!(
        guard_error(&cat721_transfer(&mut collection.funder, &inputs, &outputs, &[])),
        CovenantError::NftCountMismatch { inputs: 2, outputs: 1 }
    );

    // a burned nft cannot reappear
    let outputs = [nft(&collection, &alice, 0), nft(&collection, &alice, 1)];
    assert_eq!(guard_error(&cat721_transfer(&mut collection.funder, &inputs, &outputs, &[1])), CovenantError::NftNotFound(1));

    let outputs = [nft(&collection, &alice, 0), nft(&collection, &alice, -1)];
    let mut transfer = cat721_transfer(&mut collection.funder, &inputs, &outputs[..1], &[1]);
    transfer.guard_call.output_count = 2;
    transfer.guard_call.owner_addr_or_scripts[1] = user_owner_addr(&p2tr(&alice));
    transfer.guard_call.output_local_ids[1] = -1;
    transfer.guard_call.output_type_indexes[1] = 0;
    assert_eq!(guard_error(&transfer), CovenantError::InvalidState("nft local id must not be negative"));
}

#[test]
fn test_two_collections() {
    let (mut c1, mut c2) = (Cat721Collection::deploy(22, 5), Cat721Collection::deploy(23, 5));
    let (alice, bob) = (keypair(11), keypair(12));
    let a = c1.mint(&p2tr(&alice));
    let b = c2.mint(&p2tr(&bob));
    // both carry local id 0
    let inputs = [Owned { utxo: &a, owner: &alice }, Owned { utxo: &b, owner: &bob }];

    let outputs = [nft(&c1, &bob, 0), nft(&c2, &alice, 0)];
    let transfer = cat721_transfer(&mut c1.funder, &inputs, &outputs, &[]);
    TransactionValidator::default().verify(&transfer.seal(), &transfer.entries).unwrap();

    let outputs = [nft(&c2, &bob, 0), nft(&c2, &alice, 0)];
    let transfer = cat721_transfer(&mut c1.funder, &inputs, &outputs, &[]);
    assert_eq!(guard_error(&transfer), CovenantError::NftNotFound(1));
}

#[test]
fn test_last_mint_leaves_no_minter() {
    let mut collection = Cat721Collection::deploy(24, 2);
    let alice = keypair(11);
    let first = collection.mint(&p2tr(&alice));
    assert_eq!(first.tx.outputs.len(), 3);
    let last = collection.mint(&p2tr(&alice));
    assert_eq!(last.state.local_id, 1);
    assert_eq!(last.tx.outputs.len(), 2);
    assert_eq!(last.outpoint.index, 1);
}
