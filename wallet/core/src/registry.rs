//!
//! Known covenants. Spending a covenant output reveals its descriptor, so
//! the wallet must map every covenant script it spends back to the
//! descriptor that produced it. The registry is an explicit value handed to
//! the wallet; guards are always known, minters and assets are added as
//! tokens are deployed or looked up.
//!

use crate::imports::*;
use cat_covenants::minter::GENESIS_MINTER_OUTPUT_INDEX;

/// Token id of the asset whose deploy transaction spent `outpoint`.
pub fn token_id(outpoint: &TransactionOutpoint) -> String {
    format!("{}_{}", outpoint.transaction_id, outpoint.index)
}

pub fn parse_token_id(token_id: &str) -> Result<TransactionOutpoint> {
    let (tx_id, index) = token_id.split_once('_').ok_or_else(|| Error::InvalidTokenId(token_id.to_string()))?;
    let tx_id = TransactionId::from_str(tx_id).map_err(|_| Error::InvalidTokenId(token_id.to_string()))?;
    let index = index.parse::<u32>().map_err(|_| Error::InvalidTokenId(token_id.to_string()))?;
    Ok(TransactionOutpoint::new(tx_id, index))
}

/// A deployed CAT20 token or CAT721 collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub token_id: String,
    pub name: String,
    pub symbol: String,
    /// Display precision of a CAT20 amount, zero for collections.
    pub decimals: u8,
    pub minter: CovenantDescriptor,
    /// Transaction that created the first minter, at output
    /// [`GENESIS_MINTER_OUTPUT_INDEX`].
    pub reveal_tx_id: TransactionId,
}

impl TokenInfo {
    pub fn genesis_outpoint(&self) -> Result<TransactionOutpoint> {
        match &self.minter {
            CovenantDescriptor::Cat20OpenMinter(params) => Ok(params.genesis_outpoint),
            CovenantDescriptor::Cat20ClosedMinter(params) => Ok(params.genesis_outpoint),
            CovenantDescriptor::Cat721OpenMinter(params) => Ok(params.genesis_outpoint),
            CovenantDescriptor::Cat721ClosedMinter(params) => Ok(params.genesis_outpoint),
            other => Err(Error::custom(format!("{} is not a minter", other.kind()))),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.minter, CovenantDescriptor::Cat721OpenMinter(_) | CovenantDescriptor::Cat721ClosedMinter(_))
    }

    pub fn minter_script(&self) -> Result<ScriptPublicKey> {
        Ok(self.minter.locking_script()?)
    }

    /// Descriptor of the token or NFT contract issued by the minter.
    pub fn asset_descriptor(&self) -> Result<CovenantDescriptor> {
        let minter_script = self.minter_script()?;
        if self.is_collection() {
            Ok(CovenantDescriptor::cat721(minter_script)?)
        } else {
            Ok(CovenantDescriptor::cat20(minter_script)?)
        }
    }

    pub fn asset_script(&self) -> Result<ScriptPublicKey> {
        Ok(self.asset_descriptor()?.locking_script()?)
    }

    pub fn first_minter_outpoint(&self) -> TransactionOutpoint {
        TransactionOutpoint::new(self.reveal_tx_id, GENESIS_MINTER_OUTPUT_INDEX)
    }
}

#[derive(Debug, Clone)]
pub struct CovenantRegistry {
    descriptors: HashMap<ScriptPublicKey, CovenantDescriptor>,
    tokens: HashMap<String, TokenInfo>,
}

impl CovenantRegistry {
    pub fn try_new() -> Result<Self> {
        let mut registry = Self { descriptors: HashMap::new(), tokens: HashMap::new() };
        registry.register(CovenantDescriptor::Cat20Guard)?;
        registry.register(CovenantDescriptor::Cat721Guard)?;
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: CovenantDescriptor) -> Result<ScriptPublicKey> {
        let script = descriptor.locking_script()?;
        self.descriptors.insert(script.clone(), descriptor);
        Ok(script)
    }

    /// Registers the minter and asset contract of `info`.
    pub fn register_token(&mut self, info: TokenInfo) -> Result<()> {
        self.register(info.minter.clone())?;
        self.register(info.asset_descriptor()?)?;
        self.tokens.insert(info.token_id.clone(), info);
        Ok(())
    }

    pub fn descriptor(&self, script: &ScriptPublicKey) -> Result<&CovenantDescriptor> {
        self.descriptors.get(script).ok_or_else(|| Error::UnknownCovenant(script.to_hex()))
    }

    pub fn token(&self, token_id: &str) -> Result<&TokenInfo> {
        self.tokens.get(token_id).ok_or_else(|| Error::UnknownToken(token_id.to_string()))
    }

    /// The token whose asset contract is locked with `script`.
    pub fn token_by_asset_script(&self, script: &ScriptPublicKey) -> Option<&TokenInfo> {
        self.tokens.values().find(|info| info.asset_script().is_ok_and(|asset_script| &asset_script == script))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cat_covenants::minter::cat20_closed::Cat20ClosedMinterParams;
    use cat_hashes::Hash;

    #[test]
    fn test_token_id_and_registry() {
        let genesis = TransactionOutpoint::new(Hash::from_bytes([0xab; 32]), 7);
        let id = token_id(&genesis);
        assert_eq!(id, format!("{}_7", "ab".repeat(32)));
        assert_eq!(parse_token_id(&id).unwrap(), genesis);
        assert!(parse_token_id("abc").is_err());
        assert!(parse_token_id(&format!("{}_x", "ab".repeat(32))).is_err());

        let minter =
            CovenantDescriptor::Cat20ClosedMinter(Cat20ClosedMinterParams { genesis_outpoint: genesis, issuer_addr: vec![], max_count: 5 });
        let info = TokenInfo {
            token_id: id.clone(),
            name: "cat".into(),
            symbol: "CAT".into(),
            decimals: 2,
            minter: minter.clone(),
            reveal_tx_id: Hash::from_bytes([1; 32]),
        };
        let mut registry = CovenantRegistry::try_new().unwrap();
        assert!(registry.descriptor(&CovenantDescriptor::Cat20Guard.locking_script().unwrap()).is_ok());
        assert!(matches!(registry.token(&id), Err(Error::UnknownToken(_))));

        registry.register_token(info.clone()).unwrap();
        assert_eq!(registry.descriptor(&info.minter_script().unwrap()).unwrap(), &minter);
        assert_eq!(registry.descriptor(&info.asset_script().unwrap()).unwrap(), &info.asset_descriptor().unwrap());
        assert_eq!(registry.token_by_asset_script(&info.asset_script().unwrap()), Some(&info));
        assert!(!info.is_collection());
        assert_eq!(info.genesis_outpoint().unwrap(), genesis);
    }
}
