// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

//! Contract surfaces the bots touch. Only the functions actually called are declared.

use alloy::primitives::{B256, keccak256};
use alloy::sol;
use alloy::sol_types::SolValue;

sol! {
    #[derive(Debug, Default, PartialEq, Eq)]
    struct MarketParams {
        address loanToken;
        address collateralToken;
        address oracle;
        address irm;
        uint256 lltv;
    }

    #[sol(rpc)]
    interface IMorpho {
        function market(bytes32 id) external view returns (
            uint128 totalSupplyAssets,
            uint128 totalSupplyShares,
            uint128 totalBorrowAssets,
            uint128 totalBorrowShares,
            uint128 lastUpdate,
            uint128 fee
        );
        function position(bytes32 id, address user) external view returns (
            uint256 supplyShares,
            uint128 borrowShares,
            uint128 collateral
        );
        function supply(MarketParams memory marketParams, uint256 assets, uint256 shares, address onBehalf, bytes memory data)
            external returns (uint256 assetsSupplied, uint256 sharesSupplied);
        function withdraw(MarketParams memory marketParams, uint256 assets, uint256 shares, address onBehalf, address receiver)
            external returns (uint256 assetsWithdrawn, uint256 sharesWithdrawn);
        function borrow(MarketParams memory marketParams, uint256 assets, uint256 shares, address onBehalf, address receiver)
            external returns (uint256 assetsBorrowed, uint256 sharesBorrowed);
        function repay(MarketParams memory marketParams, uint256 assets, uint256 shares, address onBehalf, bytes memory data)
            external returns (uint256 assetsRepaid, uint256 sharesRepaid);
        function supplyCollateral(MarketParams memory marketParams, uint256 assets, address onBehalf, bytes memory data) external;
        function liquidate(MarketParams memory marketParams, address borrower, uint256 seizedAssets, uint256 repaidShares, bytes memory data)
            external returns (uint256 seizedAssetsOut, uint256 repaidAssetsOut);
    }

    #[sol(rpc)]
    interface IMetaMorpho {
        function balanceOf(address owner) external view returns (uint256);
        function convertToAssets(uint256 shares) external view returns (uint256);
        function maxDeposit(address receiver) external view returns (uint256);
        function deposit(uint256 assets, address receiver) external returns (uint256 shares);
        function redeem(uint256 shares, address receiver, address owner) external returns (uint256 assets);
    }

    /// Test-network ERC-20 with a rate-limited public mint.
    #[sol(rpc)]
    interface IFaucetToken {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function mint(address to, uint256 amount) external;
        function lastMintTime(address account) external view returns (uint256);
        function MINT_COOLDOWN() external view returns (uint256);
    }

    /// Morpho-style oracle used by the demo market; settable on test networks.
    #[sol(rpc)]
    interface IOracle {
        function price() external view returns (uint256);
        function setPrice(uint256 newPrice) external;
    }

    #[sol(rpc)]
    interface IAggregator {
        function decimals() external view returns (uint8);
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );
        function updateAnswer(int256 answer) external;
    }
}

impl MarketParams {
    /// `keccak256(abi.encode(marketParams))`, the id Morpho Blue keys markets by.
    pub fn id(&self) -> B256 {
        keccak256(self.abi_encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    #[test]
    fn market_id_hashes_five_static_words() {
        let params = MarketParams {
            loanToken: Address::repeat_byte(1),
            collateralToken: Address::repeat_byte(2),
            oracle: Address::repeat_byte(3),
            irm: Address::repeat_byte(4),
            lltv: U256::from(860_000_000_000_000_000u64),
        };
        let encoded = params.abi_encode();
        assert_eq!(encoded.len(), 5 * 32);
        assert_eq!(params.id(), keccak256(&encoded));

        let mut other = params.clone();
        other.lltv = U256::from(1u8);
        assert_ne!(params.id(), other.id());
    }
}
