//!
//! [`TransactionDraft`] collects the inputs and outputs of a transaction and
//! turns them into a signed transaction paying an exact fee.
//!
//! Signatures and covenant witnesses change the size of the transaction, the
//! size sets the fee, and the fee sets the change output that every
//! signature commits to. Finalization therefore runs in two phases:
//!
//! 1. every witness is built with placeholder signatures of the final length
//!    and a zero change, the virtual size is measured and the change is
//!    derived from `vsize * fee_rate`;
//! 2. the transaction with its final change is handed to the signer, and the
//!    witnesses are rebuilt from the real signatures.
//!
//! Covenant witnesses are produced by a [`CallBuilder`] so the same code runs
//! in both phases.
//!

use crate::imports::*;
use crate::psbt::{Psbt, SignOptions, ToSignInput, dummy_unlock_args};
use cat_consensus_core::sign::dummy_key_spend_witness;
use cat_covenants::owner::ContractUnlockArgs;

/// The transaction as seen by a covenant call while its witness is built.
pub struct UnlockContext<'a> {
    /// The transaction without witnesses, with its final outputs.
    pub tx: &'a Transaction,
    pub entries: &'a [UtxoEntry],
    pub input_index: usize,
    psbt: Option<&'a Psbt>,
}

impl UnlockContext<'_> {
    /// True while the transaction is being measured.
    pub fn is_measuring(&self) -> bool {
        self.psbt.is_none()
    }

    /// Owner argument proving the signer controls the asset spent by this input.
    pub fn owner_args(&self) -> Result<ContractUnlockArgs> {
        match self.psbt {
            Some(psbt) => Ok(psbt.partial_sig(self.input_index)?.unlock_args()),
            None => Ok(dummy_unlock_args()),
        }
    }
}

pub type CallBuilder = Box<dyn Fn(&UnlockContext<'_>) -> Result<CovenantCall> + Send + Sync>;

pub enum InputUnlock {
    /// Signed by the signer's key.
    KeySpend,
    /// Unlocked by a covenant call. `sign` asks the signer for a signature the call embeds.
    Covenant { descriptor: CovenantDescriptor, sign: bool, call: CallBuilder },
}

struct DraftInput {
    utxo: Utxo,
    unlock: InputUnlock,
}

#[derive(Debug, Clone)]
pub struct FinalizedTransaction {
    pub tx: Transaction,
    pub entries: Vec<UtxoEntry>,
    pub fee: u64,
    /// Value of the change output, always the last output.
    pub change: Option<u64>,
}

impl FinalizedTransaction {
    pub fn id(&self) -> TransactionId {
        self.tx.id()
    }

    pub fn change_utxo(&self) -> Option<Utxo> {
        self.change?;
        let index = self.tx.outputs.len().checked_sub(1)?;
        Utxo::from_tx(&self.tx, index as u32)
    }
}

#[derive(Default)]
pub struct TransactionDraft {
    inputs: Vec<DraftInput>,
    outputs: Vec<TransactionOutput>,
    change_script: Option<ScriptPublicKey>,
    finalized: bool,
}

impl TransactionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_key_spend(&mut self, utxo: Utxo) -> &mut Self {
        self.inputs.push(DraftInput { utxo, unlock: InputUnlock::KeySpend });
        self
    }

    pub fn add_covenant(&mut self, utxo: Utxo, descriptor: CovenantDescriptor, sign: bool, call: CallBuilder) -> &mut Self {
        self.inputs.push(DraftInput { utxo, unlock: InputUnlock::Covenant { descriptor, sign, call } });
        self
    }

    pub fn add_output(&mut self, output: TransactionOutput) -> &mut Self {
        self.outputs.push(output);
        self
    }

    /// Sends what is left after the fee to `script`, as the last output.
    pub fn set_change(&mut self, script: ScriptPublicKey) -> &mut Self {
        self.change_script = Some(script);
        self
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of outputs, the change included.
    pub fn output_count(&self) -> usize {
        self.outputs.len() + self.change_script.is_some() as usize
    }

    fn assemble(&self, change: Option<u64>) -> (Transaction, Vec<UtxoEntry>) {
        let inputs = self.inputs.iter().map(|input| TransactionInput::new(input.utxo.outpoint(), vec![], 0)).collect();
        let mut outputs = self.outputs.clone();
        if let (Some(script), Some(value)) = (&self.change_script, change) {
            outputs.push(TransactionOutput::new(value, script.clone()));
        }
        let entries = self.inputs.iter().map(|input| input.utxo.entry()).collect();
        (Transaction::new(Transaction::DEFAULT_VERSION, inputs, outputs, 0), entries)
    }

    fn apply_witnesses(&self, tx: &mut Transaction, entries: &[UtxoEntry], psbt: Option<&Psbt>) -> Result<()> {
        let unsigned = tx.clone();
        for (index, input) in self.inputs.iter().enumerate() {
            let witness = match (&input.unlock, psbt) {
                (InputUnlock::KeySpend, None) => dummy_key_spend_witness(&entries[index].script_public_key),
                (InputUnlock::KeySpend, Some(psbt)) => psbt.key_spend_witness(index)?,
                (InputUnlock::Covenant { descriptor, call, .. }, psbt) => {
                    let ctx = UnlockContext { tx: &unsigned, entries, input_index: index, psbt };
                    call(&ctx)?.to_witness(descriptor)?
                }
            };
            tx.inputs[index].witness = witness;
        }
        Ok(())
    }

    async fn sign_options(&self, signer: &dyn Signer, entries: &[UtxoEntry]) -> Result<SignOptions> {
        let needs_public_key = self.inputs.iter().any(|input| matches!(input.unlock, InputUnlock::Covenant { sign: true, .. }));
        let public_key = if needs_public_key { Some(signer.get_public_key().await?) } else { None };
        let requests = self
            .inputs
            .iter()
            .enumerate()
            .filter_map(|(index, input)| match (&input.unlock, &public_key) {
                (InputUnlock::KeySpend, _) => {
                    Some(ToSignInput { index, address: Some(entries[index].script_public_key.to_hex()), ..ToSignInput::default() })
                }
                (InputUnlock::Covenant { sign: true, .. }, Some(public_key)) => Some(ToSignInput::with_public_key(index, public_key.clone())),
                _ => None,
            })
            .collect();
        Ok(SignOptions::new(requests))
    }

    pub async fn finalize(&mut self, signer: &dyn Signer, fee_rate: u64, dust_limit: u64) -> Result<FinalizedTransaction> {
        if self.finalized {
            return Err(Error::AlreadyFinalized);
        }
        let input_total: u64 = self.inputs.iter().map(|input| input.utxo.satoshis).sum();
        let output_total: u64 = self.outputs.iter().map(|output| output.value).sum();

        // phase 1: measure
        let placeholder_change = self.change_script.as_ref().map(|_| 0);
        let (mut tx, entries) = self.assemble(placeholder_change);
        self.apply_witnesses(&mut tx, &entries, None)?;
        let vsize = tx.vsize();
        let fee = vsize.saturating_mul(fee_rate);
        let required = output_total.saturating_add(fee);
        let change = match self.change_script {
            Some(_) => {
                let change = input_total.checked_sub(required).filter(|change| *change >= dust_limit);
                let change = change
                    .ok_or(Error::InsufficientFunds { required: required.saturating_add(dust_limit), available: input_total })?;
                Some(change)
            }
            None if input_total < required => return Err(Error::InsufficientFunds { required, available: input_total }),
            None => None,
        };

        // phase 2: sign the final transaction
        let (mut tx, entries) = self.assemble(change);
        let options = self.sign_options(signer, &entries).await?;
        let psbt = Psbt::new(tx.clone(), entries.clone())?;
        let psbt = if options.to_sign_inputs.is_empty() {
            psbt
        } else {
            Psbt::from_hex(&signer.sign_psbt(&psbt.to_hex()?, &options).await?)?
        };
        if psbt.tx != tx || psbt.entries() != entries {
            return Err(Error::custom("the signer altered the transaction"));
        }
        self.apply_witnesses(&mut tx, &entries, Some(&psbt))?;

        if tx.vsize() != vsize {
            warn!("transaction {} measured {vsize} vbytes but signed to {}", tx.id(), tx.vsize());
        }
        let fee = input_total - output_total - change.unwrap_or(0);
        debug!("finalized {}: {} inputs, {} outputs, {vsize} vbytes, fee {fee}", tx.id(), tx.inputs.len(), tx.outputs.len());
        self.finalized = true;
        Ok(FinalizedTransaction { tx, entries, fee, change })
    }
}
