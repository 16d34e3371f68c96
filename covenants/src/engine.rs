//!
//! Transaction verification. Every input is executed against the transaction:
//! covenant spends run the covenant named by their witness, all other inputs
//! are key spends.
//!

use crate::{
    cat20, cat721,
    constants::{TX_INPUT_COUNT_MAX, TX_OUTPUT_COUNT_MAX},
    context::SpendContext,
    descriptor::{COVENANT_WITNESS_ITEMS, CovenantCall, CovenantDescriptor},
    error::CovenantError,
    guard,
    minter::{cat20_closed, cat20_open, cat721_closed, cat721_open},
    result::CovenantResult,
};
use cat_consensus_core::{
    hashing::sighash::SigHashReusedValues,
    sign,
    tx::{PopulatedTransaction, Transaction, TransactionInput, UtxoEntry},
};
use cat_core::{debug, trace};

#[derive(Clone, Debug)]
pub struct TransactionValidator {
    max_tx_inputs: usize,
    max_tx_outputs: usize,
}

impl Default for TransactionValidator {
    fn default() -> Self {
        Self::new(TX_INPUT_COUNT_MAX, TX_OUTPUT_COUNT_MAX)
    }
}

impl TransactionValidator {
    /// Limits apply to transactions spending at least one covenant.
    pub fn new(max_tx_inputs: usize, max_tx_outputs: usize) -> Self {
        Self { max_tx_inputs, max_tx_outputs }
    }

    /// Verifies all inputs of `tx`, `entries` being the outputs they spend. The first
    /// failure is returned, wrapped with the index of the failing input.
    pub fn verify(&self, tx: &Transaction, entries: &[UtxoEntry]) -> CovenantResult<()> {
        if tx.inputs.len() != entries.len() {
            return Err(CovenantError::EntriesLengthMismatch(entries.len(), tx.inputs.len()));
        }
        Self::check_output_values(tx, entries)?;

        let covenant_inputs = tx.inputs.iter().zip(entries).filter(|(input, entry)| is_covenant_spend(input, entry)).count();
        if covenant_inputs > 0 {
            self.check_covenant_limits(tx)?;
        }

        let populated = PopulatedTransaction::new(tx, entries);
        let mut reused_values = SigHashReusedValues::new();
        for index in 0..tx.inputs.len() {
            if let Err(err) = verify_input(&populated, index, &mut reused_values) {
                debug!("transaction {} rejected at input {}: {}", tx.id(), index, err);
                return Err(err.at_input(index));
            }
        }
        trace!("transaction {} verified ({} covenant inputs)", tx.id(), covenant_inputs);
        Ok(())
    }

    fn check_covenant_limits(&self, tx: &Transaction) -> CovenantResult<()> {
        if tx.inputs.len() > self.max_tx_inputs {
            return Err(CovenantError::TooManyInputs(tx.inputs.len()));
        }
        if tx.outputs.len() > self.max_tx_outputs {
            return Err(CovenantError::TooManyOutputs(tx.outputs.len()));
        }
        Ok(())
    }

    fn check_output_values(tx: &Transaction, entries: &[UtxoEntry]) -> CovenantResult<()> {
        let inputs = entries.iter().try_fold(0u64, |total, entry| total.checked_add(entry.amount)).ok_or(CovenantError::AmountOverflow)?;
        let outputs =
            tx.outputs.iter().try_fold(0u64, |total, output| total.checked_add(output.value)).ok_or(CovenantError::AmountOverflow)?;
        if outputs > inputs {
            return Err(CovenantError::OutputValueExceedsInputs { inputs, outputs });
        }
        Ok(())
    }
}

/// Executes input `index` alone, without the transaction-wide checks of [`TransactionValidator::verify`].
pub fn verify_input(tx: &PopulatedTransaction, index: usize, reused_values: &mut SigHashReusedValues) -> CovenantResult<()> {
    let (input, entry) = tx.populated_input(index).ok_or(CovenantError::IndexOutOfRange(index, "inputs"))?;
    if is_covenant_spend(input, entry) {
        verify_covenant_input(&SpendContext::new(tx.tx, tx.entries, index)?)
    } else {
        Ok(sign::verify_key_spend(tx, index, reused_values)?)
    }
}

/// Whether `input` spends `entry` through a covenant rather than with a key.
pub fn is_covenant_spend(input: &TransactionInput, entry: &UtxoEntry) -> bool {
    entry.script_public_key.is_p2tr() && input.witness.len() == COVENANT_WITNESS_ITEMS
}

fn verify_covenant_input(ctx: &SpendContext) -> CovenantResult<()> {
    let witness = &ctx.self_input().witness;
    let descriptor = CovenantDescriptor::from_bytes(&witness[1])?;
    if Some(descriptor.program()?) != ctx.self_script().taproot_program() {
        return Err(CovenantError::ProgramMismatch);
    }
    let call = CovenantCall::from_bytes(&witness[0])?;
    trace!("input {}: {} on {}", ctx.input_index, call.name(), descriptor.kind());
    execute(ctx, &descriptor, &call)
}

/// Runs `call` against the covenant `descriptor` describes.
pub fn execute(ctx: &SpendContext, descriptor: &CovenantDescriptor, call: &CovenantCall) -> CovenantResult<()> {
    use CovenantCall as Call;
    use CovenantDescriptor as Desc;
    match (descriptor, call) {
        (Desc::Cat20OpenMinter(params), Call::Cat20OpenMinterMint(call)) => cat20_open::mint(ctx, params, call),
        (Desc::Cat20ClosedMinter(params), Call::Cat20ClosedMinterMint(call)) => cat20_closed::mint(ctx, params, call),
        (Desc::Cat20(params), Call::Cat20Unlock(call)) => cat20::unlock(ctx, &params.minter_script, &params.guard_script, call),
        (Desc::Cat20Guard, Call::Cat20GuardUnlock(call)) => guard::cat20::unlock(ctx, call),
        (Desc::Cat721OpenMinter(params), Call::Cat721OpenMinterMint(call)) => cat721_open::mint(ctx, params, call),
        (Desc::Cat721ClosedMinter(params), Call::Cat721ClosedMinterMint(call)) => cat721_closed::mint(ctx, params, call),
        (Desc::Cat721(params), Call::Cat721Unlock(call)) => cat721::unlock(ctx, &params.minter_script, &params.guard_script, call),
        (Desc::Cat721Guard, Call::Cat721GuardUnlock(call)) => guard::cat721::unlock(ctx, call),
        (descriptor, call) => Err(CovenantError::CallMismatch { call: call.name(), descriptor: descriptor.kind() }),
    }
}
