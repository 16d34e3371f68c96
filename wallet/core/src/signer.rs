//!
//! Signing capability. A [`Signer`] controls one key and signs the inputs
//! it is asked to sign in a [`Psbt`], leaving the witnesses to the caller.
//!

use crate::imports::*;
use crate::psbt::{PartialSig, Psbt, SignOptions};
use cat_consensus_core::{
    hashing::sighash::SigHashReusedValues,
    script::{pay_to_taproot_key, pay_to_witness_pubkey},
    sign::sign_message,
};
use secp256k1::{Keypair, SECP256K1, SecretKey};

#[async_trait]
pub trait Signer: Send + Sync {
    /// Locking script of the signer's key. Assets are sent to and owned by it.
    async fn get_address(&self) -> Result<ScriptPublicKey>;

    /// Hex of the compressed public key.
    async fn get_public_key(&self) -> Result<String>;

    async fn sign_psbt(&self, psbt_hex: &str, options: &SignOptions) -> Result<String>;

    async fn sign_psbts(&self, batch: &[(String, SignOptions)]) -> Result<Vec<String>> {
        let mut signed = Vec::with_capacity(batch.len());
        for (psbt_hex, options) in batch {
            signed.push(self.sign_psbt(psbt_hex, options).await?);
        }
        Ok(signed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    P2wpkh,
    P2tr,
}

/// Signs with an in-memory key. Taproot keys are used untweaked.
#[derive(Clone)]
pub struct KeypairSigner {
    keypair: Keypair,
    kind: AddressKind,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair, kind: AddressKind) -> Self {
        Self { keypair, kind }
    }

    pub fn from_secret_key(secret_key: &SecretKey, kind: AddressKind) -> Self {
        Self::new(Keypair::from_secret_key(SECP256K1, secret_key), kind)
    }

    pub fn script(&self) -> ScriptPublicKey {
        let public_key = self.keypair.public_key();
        match self.kind {
            AddressKind::P2wpkh => pay_to_witness_pubkey(&public_key),
            AddressKind::P2tr => pay_to_taproot_key(&public_key.x_only_public_key().0),
        }
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.keypair.public_key().serialize())
    }

    fn sign(&self, mut psbt: Psbt, options: &SignOptions) -> Result<Psbt> {
        let script = self.script();
        let public_key = self.public_key_hex();
        let mut reused_values = SigHashReusedValues::new();
        for request in options.to_sign_inputs.iter() {
            if request.address.as_ref().is_some_and(|address| *address != script.to_hex()) {
                continue;
            }
            if request.public_key.as_ref().is_some_and(|key| *key != public_key) {
                continue;
            }
            let hash_type = request.sighash_type()?;
            let sig_hash = psbt.sighash(request.index, hash_type, &mut reused_values)?;
            // the scheme follows the signer's own script, which for covenant inputs differs from the spent one
            let signature = sign_message(sig_hash, &self.keypair, &script, hash_type)?;
            psbt.inputs[request.index].partial_sig =
                Some(PartialSig { public_key: self.keypair.public_key().serialize().to_vec(), signature: signature.to_vec() });
        }
        Ok(psbt)
    }
}

#[async_trait]
impl Signer for KeypairSigner {
    async fn get_address(&self) -> Result<ScriptPublicKey> {
        Ok(self.script())
    }

    async fn get_public_key(&self) -> Result<String> {
        Ok(self.public_key_hex())
    }

    async fn sign_psbt(&self, psbt_hex: &str, options: &SignOptions) -> Result<String> {
        let psbt = Psbt::from_hex(psbt_hex)?;
        self.sign(psbt, options)?.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psbt::ToSignInput;
    use cat_consensus_core::{
        sign::verify_key_spend,
        tx::{PopulatedTransaction, Transaction},
    };
    use cat_hashes::ZERO_HASH;

    #[tokio::test]
    async fn test_keypair_signer() {
        for kind in [AddressKind::P2wpkh, AddressKind::P2tr] {
            let signer = KeypairSigner::from_secret_key(&SecretKey::from_slice(&[9; 32]).unwrap(), kind);
            let script = signer.get_address().await.unwrap();
            let inputs = (0..2).map(|index| TransactionInput::new(TransactionOutpoint::new(ZERO_HASH, index), vec![], 0)).collect();
            let tx = Transaction::new(Transaction::DEFAULT_VERSION, inputs, vec![TransactionOutput::new(900, script.clone())], 0);
            let psbt = Psbt::new(tx, vec![UtxoEntry::new(500, script.clone()), UtxoEntry::new(500, script.clone())]).unwrap();

            // the second request names another key and is skipped
            let options = SignOptions::new(vec![ToSignInput::new(0), ToSignInput::with_public_key(1, "02".repeat(33))]);
            let signed = Psbt::from_hex(&signer.sign_psbt(&psbt.to_hex().unwrap(), &options).await.unwrap()).unwrap();
            assert!(signed.partial_sig(0).is_ok());
            assert!(matches!(signed.partial_sig(1), Err(Error::MissingSignature(1))));

            let mut tx = signed.tx.clone();
            tx.inputs[0].witness = signed.key_spend_witness(0).unwrap();
            let entries = signed.entries();
            verify_key_spend(&PopulatedTransaction::new(&tx, &entries), 0, &mut SigHashReusedValues::new()).unwrap();
        }
    }
}
