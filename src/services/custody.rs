use ethers::types::{Address, H256, U256};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    constants::DEFAULT_RECEIPT_TIMEOUT_SECS,
    error::Result,
    services::onchain::{encode_transfer_from, ChainClient},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustodyOutcome {
    /// Owner was a valid signer and the account NFT moved to custody.
    Transferred {
        token_contract: Address,
        token_id: U256,
        tx_hash: H256,
    },
    /// Owner is not a valid signer for the account; nothing was sent.
    Skipped,
}

/// Moves the NFT backing a token-bound account into the custody address
/// before a swap, if the connected wallet is a valid signer for it.
pub struct CustodyGuard {
    chain: Arc<dyn ChainClient>,
    custody: Address,
}

impl CustodyGuard {
    pub fn new(chain: Arc<dyn ChainClient>, custody: Address) -> Self {
        Self { chain, custody }
    }

    pub async fn reclaim(&self, account: Address, owner: Address) -> Result<CustodyOutcome> {
        let valid = self.chain.is_valid_signer(account, owner).await?;
        tracing::info!("Valid signer for {:?}: {}", account, valid);
        if !valid {
            return Ok(CustodyOutcome::Skipped);
        }

        let nft = self.chain.bound_nft(account).await?;
        let tx_hash = self
            .chain
            .send_call(
                nft.token_contract,
                U256::zero(),
                encode_transfer_from(owner, self.custody, nft.token_id),
            )
            .await?;
        self.chain
            .wait_for_receipt(
                tx_hash,
                Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
                "Custody transfer",
            )
            .await?;

        tracing::info!(
            "Account NFT {} of {:?} moved to custody in {:?}",
            nft.token_id,
            nft.token_contract,
            tx_hash
        );
        Ok(CustodyOutcome::Transferred {
            token_contract: nft.token_contract,
            token_id: nft.token_id,
            tx_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockChain;

    #[tokio::test]
    async fn invalid_signer_skips_without_transfer() {
        let chain = Arc::new(MockChain::default().with_valid_signer(false));
        let guard = CustodyGuard::new(chain.clone(), Address::repeat_byte(0xcc));

        let outcome = guard
            .reclaim(Address::repeat_byte(0x01), Address::repeat_byte(0x02))
            .await
            .expect("reclaim");

        assert_eq!(outcome, CustodyOutcome::Skipped);
        assert!(chain.sent_calls().is_empty());
    }

    #[tokio::test]
    async fn valid_signer_moves_bound_nft_to_custody() {
        let chain = Arc::new(MockChain::default().with_valid_signer(true));
        let guard = CustodyGuard::new(chain.clone(), Address::repeat_byte(0xcc));

        let outcome = guard
            .reclaim(Address::repeat_byte(0x01), Address::repeat_byte(0x02))
            .await
            .expect("reclaim");

        let CustodyOutcome::Transferred {
            token_contract,
            token_id,
            ..
        } = outcome
        else {
            panic!("expected transfer");
        };
        assert_eq!(token_contract, MockChain::NFT_CONTRACT);
        assert_eq!(token_id, U256::from(MockChain::BOUND_TOKEN_ID));

        let sent = chain.sent_calls();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, MockChain::NFT_CONTRACT);
        assert_eq!(
            sent[0].data,
            encode_transfer_from(
                Address::repeat_byte(0x02),
                Address::repeat_byte(0xcc),
                U256::from(MockChain::BOUND_TOKEN_ID)
            )
        );
    }
}
