use super::*;
use crate::{
    error::CovenantError,
    minter::{
        cat20_open::{Cat20OpenMinterMint, Cat20OpenMinterParams, Cat20OpenMinterState, token_script_for},
        cat721_closed::nft_script_for,
        cat721_open::{Cat721MerkleLeaf, Cat721OpenMinterMint, Cat721OpenMinterParams, Cat721OpenMinterState},
    },
};
use cat_merkle::MerkleTree;

/// Spends `minter` at input 0 with a fee input at 1. `call` sees the unsigned transaction.
fn spend_minter<S>(
    funder: &mut Funder,
    minter: &Utxo<S>,
    outputs: Vec<TransactionOutput>,
    call: impl FnOnce(&Transaction, &[UtxoEntry]) -> CovenantCall,
) -> (Transaction, Vec<UtxoEntry>) {
    let (fee_input, fee_entry) = funder.take();
    let tx = Transaction::new(Transaction::DEFAULT_VERSION, vec![minter.input(), fee_input], outputs, 0);
    let entries = vec![minter.entry(), fee_entry];
    let call = call(&tx, &entries);
    let mut tx = funder.sign(tx, &entries, &[1]);
    tx.inputs[0].witness = call.to_witness(&minter.descriptor).unwrap();
    (tx, entries)
}

fn child<P, S>(parent: &Utxo<P>, tx: &Transaction, index: u32, state: S) -> Utxo<S> {
    Utxo {
        outpoint: TransactionOutpoint::new(tx.id(), index),
        output: tx.outputs[index as usize].clone(),
        descriptor: parent.descriptor.clone(),
        state,
        tx: tx.clone(),
        trace_input: 0,
        trace_tx: parent.tx.clone(),
    }
}

fn verify(tx: &Transaction, entries: &[UtxoEntry]) -> CovenantResult<()> {
    TransactionValidator::default().verify(tx, entries)
}

fn root_cause(result: CovenantResult<()>) -> CovenantError {
    result.unwrap_err().root_cause().clone()
}

struct OpenToken {
    funder: Funder,
    premine_key: Keypair,
    token_script: ScriptPublicKey,
    genesis_minter: Utxo<Cat20OpenMinterState>,
}

impl OpenToken {
    fn deploy(seed: u8, max_count: i32, premine_count: i32, limit: i32) -> Self {
        Self::deploy_with(seed, max_count, premine_count, limit, |_| {})
    }

    fn deploy_with(seed: u8, max_count: i32, premine_count: i32, limit: i32, tamper: impl FnOnce(&mut Cat20OpenMinterState)) -> Self {
        let mut funder = Funder::new(seed);
        let premine_key = keypair(seed.wrapping_add(100));
        let params = Cat20OpenMinterParams {
            genesis_outpoint: funder.next_outpoint(),
            max_count,
            premine_count,
            limit,
            premine_addr: user_owner_addr(&p2wpkh(&premine_key)),
        };
        let descriptor = CovenantDescriptor::Cat20OpenMinter(params.clone());
        let token_script = token_script_for(&descriptor.locking_script().unwrap()).unwrap();
        let mut state = Cat20OpenMinterState::initial(&params, token_script.clone());
        tamper(&mut state);
        let genesis_minter = deploy(&mut funder, descriptor, state);
        Self { funder, premine_key, token_script, genesis_minter }
    }

    fn params(&self) -> &Cat20OpenMinterParams {
        match &self.genesis_minter.descriptor {
            CovenantDescriptor::Cat20OpenMinter(params) => params,
            _ => unreachable!(),
        }
    }

    /// Mints `amount` to `owner` from `minter`, splitting the rest over `next_counts`.
    fn build_mint(
        &mut self,
        minter: &Utxo<Cat20OpenMinterState>,
        owner: &ScriptPublicKey,
        amount: i32,
        next_counts: [i32; 2],
        premine_signed: bool,
    ) -> (Transaction, Vec<UtxoEntry>) {
        let token = Cat20State::new(user_owner_addr(owner), amount);
        let next_states = next_counts
            .iter()
            .filter(|count| **count > 0)
            .map(|count| Cat20OpenMinterState { token_script: self.token_script.clone(), has_minted_before: true, remaining_count: *count })
            .collect::<Vec<_>>();
        let mut hashes = next_states.iter().map(|state| Some(state.state_hash())).collect::<Vec<_>>();
        hashes.push(Some(token.state_hash()));
        let outputs = std::iter::once(state_output(&hashes))
            .chain(next_states.iter().map(|_| TransactionOutput::new(COVENANT_SATOSHIS, minter.output.script_public_key.clone())))
            .chain([TransactionOutput::new(ASSET_SATOSHIS, self.token_script.clone())])
            .collect();
        let premine_key = self.premine_key;
        spend_minter(&mut self.funder, minter, outputs, |tx, entries| {
            let premine_args =
                if premine_signed { user_args(tx, entries, 0, &premine_key, &p2wpkh(&premine_key)) } else { ContractUnlockArgs::default() };
            CovenantCall::Cat20OpenMinterMint(Box::new(Cat20OpenMinterMint {
                state: minter.state.clone(),
                next_remaining_counts: next_counts,
                token,
                premine_args,
                minter_satoshis: COVENANT_SATOSHIS,
                token_satoshis: ASSET_SATOSHIS,
                backtrace: minter.backtrace(),
            }))
        })
    }
}

#[test]
fn test_open_minter_premine_then_parallel_mints() {
    let mut token = OpenToken::deploy(30, 10, 2, 500);
    let alice = p2tr(&keypair(11));
    let genesis = token.genesis_minter.clone();
    assert_eq!(genesis.state.remaining_count, 8);

    let (tx, entries) = token.build_mint(&genesis, &alice, 1000, [8, 0], true);
    verify(&tx, &entries).unwrap();
    let minter = child(&genesis, &tx, 1, Cat20OpenMinterState { has_minted_before: true, ..genesis.state.clone() });

    let (tx, entries) = token.build_mint(&minter, &alice, 500, [4, 3], false);
    verify(&tx, &entries).unwrap();
    assert_eq!(tx.outputs.len(), 4);
    let second = child(&minter, &tx, 2, Cat20OpenMinterState { remaining_count: 3, ..minter.state.clone() });

    let (tx, entries) = token.build_mint(&second, &alice, 500, [0, 2], false);
    verify(&tx, &entries).unwrap();
    assert_eq!(token.params().limit, 500);
}

#[test]
fn test_open_minter_rejections() {
    let mut token = OpenToken::deploy(31, 10, 2, 500);
    let alice = p2tr(&keypair(11));
    let genesis = token.genesis_minter.clone();

    let (tx, entries) = token.build_mint(&genesis, &alice, 1000, [8, 0], false);
    assert!(matches!(root_cause(verify(&tx, &entries)), CovenantError::Signature(_)));

    let (tx, entries) = token.build_mint(&genesis, &alice, 500, [8, 0], true);
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::MintAmountMismatch { expected: 1000, actual: 500 });

    let (tx, entries) = token.build_mint(&genesis, &alice, 1000, [9, 0], true);
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::RemainingCountMismatch);

    let (tx, entries) = token.build_mint(&genesis, &alice, 1000, [8, 0], true);
    verify(&tx, &entries).unwrap();
    let minter = child(&genesis, &tx, 1, Cat20OpenMinterState { has_minted_before: true, ..genesis.state.clone() });

    let (tx, entries) = token.build_mint(&minter, &alice, 501, [7, 0], false);
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::MintAmountMismatch { expected: 500, actual: 501 });

    let (tx, entries) = token.build_mint(&minter, &alice, 500, [8, 0], false);
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::RemainingCountMismatch);

    let (tx, entries) = token.build_mint(&minter, &alice, 500, [-1, 8], false);
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::RemainingCountMismatch);
}

#[test]
fn test_open_minter_genesis_checks() {
    let mut exhausted = OpenToken::deploy(32, 0, 0, 10);
    let genesis = exhausted.genesis_minter.clone();
    let (tx, entries) = exhausted.build_mint(&genesis, &p2tr(&keypair(11)), 10, [0, 0], false);
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::SupplyExhausted);

    let mut inflated = OpenToken::deploy_with(33, 10, 0, 10, |state| state.remaining_count = 1000);
    let genesis = inflated.genesis_minter.clone();
    let (tx, entries) = inflated.build_mint(&genesis, &p2tr(&keypair(11)), 10, [999, 0], false);
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::NotInitialState);

    let mut foreign = OpenToken::deploy_with(34, 10, 0, 10, |state| state.token_script = ScriptPublicKey::from_vec(vec![0x51]));
    let genesis = foreign.genesis_minter.clone();
    let (tx, entries) = foreign.build_mint(&genesis, &p2tr(&keypair(11)), 10, [9, 0], false);
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::TokenScriptMismatch);
}

#[test]
fn test_genesis_minter_must_be_output_one() {
    let mut funder = Funder::new(35);
    let params = Cat20OpenMinterParams {
        genesis_outpoint: funder.next_outpoint(),
        max_count: 10,
        premine_count: 0,
        limit: 10,
        premine_addr: user_owner_addr(&p2wpkh(&keypair(135))),
    };
    let descriptor = CovenantDescriptor::Cat20OpenMinter(params.clone());
    let script = descriptor.locking_script().unwrap();
    let state = Cat20OpenMinterState::initial(&params, token_script_for(&script).unwrap());

    let (input, entry) = funder.take();
    let outputs = vec![
        state_output(&[None, Some(state.state_hash())]),
        TransactionOutput::new(COVENANT_SATOSHIS, p2wpkh(&funder.key)),
        TransactionOutput::new(COVENANT_SATOSHIS, script),
    ];
    let tx = funder.sign(Transaction::new(Transaction::DEFAULT_VERSION, vec![input], outputs, 0), &[entry], &[0]);
    let minter = Utxo {
        outpoint: TransactionOutpoint::new(tx.id(), 2),
        output: tx.outputs[2].clone(),
        descriptor,
        state,
        tx,
        trace_input: 0,
        trace_tx: funder.tx.clone(),
    };
    let mut token = OpenToken { funder, premine_key: keypair(135), token_script: minter.state.token_script.clone(), genesis_minter: minter };
    let genesis = token.genesis_minter.clone();
    let (tx, entries) = token.build_mint(&genesis, &p2tr(&keypair(11)), 10, [9, 0], false);
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::GenesisOutputIndex(2));
}

#[test]
fn test_closed_cat20_minter() {
    let mut token = Cat20Token::deploy(36);
    let alice = p2tr(&keypair(11));
    token.mint(&alice, 7);

    let (tx, entries) = token.build_mint(&alice, -1, |_| {});
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::InvalidState("token amount must be positive"));

    let mallory = keypair(66);
    let (tx, entries) = token.build_mint(&alice, 5, |call| {
        let signature = call.issuer_args.user_sig.clone();
        call.issuer_args = ContractUnlockArgs::user(mallory.public_key().serialize().to_vec(), signature);
    });
    assert!(matches!(root_cause(verify(&tx, &entries)), CovenantError::Signature(_)));

    let (tx, entries) = token.build_mint(&alice, 5, |call| call.state.remaining_count += 1);
    assert!(matches!(root_cause(verify(&tx, &entries)), CovenantError::StateHashMismatch(_)));

    let (tx, entries) = token.build_mint(&alice, 5, |call| call.state.token_script = ScriptPublicKey::from_vec(vec![0x51]));
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::TokenScriptMismatch);
}

#[test]
fn test_open_cat721_minter() {
    let mut funder = Funder::new(37);
    let premine_key = keypair(137);
    let params = Cat721OpenMinterParams {
        genesis_outpoint: funder.next_outpoint(),
        max_count: 3,
        premine_count: 1,
        premine_addr: user_owner_addr(&p2tr(&premine_key)),
    };
    let descriptor = CovenantDescriptor::Cat721OpenMinter(params.clone());
    let nft_script = nft_script_for(&descriptor.locking_script().unwrap()).unwrap();
    let leaves = (0..3).map(|local_id| Cat721MerkleLeaf::new(vec![0xc0, local_id as u8], local_id)).collect::<Vec<_>>();
    let mut tree = MerkleTree::new(&leaves.iter().map(|leaf| leaf.state_hash()).collect::<Vec<_>>()).unwrap();
    let state = Cat721OpenMinterState { nft_script: nft_script.clone(), merkle_root: tree.root(), next_local_id: 0 };
    let mut minter = deploy(&mut funder, descriptor, state);
    let alice = p2tr(&keypair(11));

    let build = |funder: &mut Funder,
                     minter: &Utxo<Cat721OpenMinterState>,
                     tree: &MerkleTree,
                     leaf: Cat721MerkleLeaf,
                     proof_index: usize,
                     signed: bool| {
        let local_id = minter.state.next_local_id;
        let nft = Cat721State::new(user_owner_addr(&alice), local_id);
        let mut mined_tree = tree.clone();
        let merkle_root = mined_tree.update_leaf(local_id as usize, leaf.mined().state_hash()).unwrap();
        let next = Cat721OpenMinterState { merkle_root, next_local_id: local_id + 1, ..minter.state.clone() };
        let has_next = next.next_local_id < params.max_count;
        let mut hashes = vec![];
        let mut outputs = vec![];
        if has_next {
            hashes.push(Some(next.state_hash()));
            outputs.push(TransactionOutput::new(COVENANT_SATOSHIS, minter.output.script_public_key.clone()));
        }
        hashes.push(Some(nft.state_hash()));
        outputs.push(TransactionOutput::new(ASSET_SATOSHIS, nft_script.clone()));
        outputs.insert(0, state_output(&hashes));
        let proof = tree.merkle_path(proof_index).unwrap();
        let (tx, entries) = spend_minter(funder, minter, outputs, |tx, entries| {
            let premine_args =
                if signed { user_args(tx, entries, 0, &premine_key, &p2tr(&premine_key)) } else { ContractUnlockArgs::default() };
            CovenantCall::Cat721OpenMinterMint(Box::new(Cat721OpenMinterMint {
                state: minter.state.clone(),
                nft,
                leaf,
                proof,
                premine_args,
                minter_satoshis: COVENANT_SATOSHIS,
                nft_satoshis: ASSET_SATOSHIS,
                backtrace: minter.backtrace(),
            }))
        });
        (tx, entries, next)
    };

    // local id 0 is premined
    let (tx, entries, _) = build(&mut funder, &minter, &tree, leaves[0].clone(), 0, false);
    assert!(matches!(root_cause(verify(&tx, &entries)), CovenantError::Signature(_)));
    let (tx, entries, _) = build(&mut funder, &minter, &tree, leaves[0].clone(), 1, true);
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::LeafMismatch);
    let forged = Cat721MerkleLeaf::new(vec![0xde, 0xad], 0);
    let (tx, entries, _) = build(&mut funder, &minter, &tree, forged, 0, true);
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::MerkleProofInvalid);

    let (tx, entries, next) = build(&mut funder, &minter, &tree, leaves[0].clone(), 0, true);
    verify(&tx, &entries).unwrap();
    tree.update_leaf(0, leaves[0].mined().state_hash()).unwrap();
    minter = child(&minter, &tx, 1, next);

    // a mined leaf cannot be minted twice
    let (tx, entries, _) = build(&mut funder, &minter, &tree, leaves[0].mined(), 0, false);
    assert_eq!(root_cause(verify(&tx, &entries)), CovenantError::LeafMismatch);

    let (tx, entries, next) = build(&mut funder, &minter, &tree, leaves[1].clone(), 1, false);
    verify(&tx, &entries).unwrap();
    tree.update_leaf(1, leaves[1].mined().state_hash()).unwrap();
    minter = child(&minter, &tx, 1, next);

    let (tx, entries, _) = build(&mut funder, &minter, &tree, leaves[2].clone(), 2, false);
    verify(&tx, &entries).unwrap();
    assert_eq!(tx.outputs.len(), 2);
}
