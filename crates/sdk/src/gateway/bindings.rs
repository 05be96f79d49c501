//! Typed contract bindings
//!
//! Only the functions the provisioning stages call are declared. The
//! position manager and router take struct parameters, so their fragments
//! are JSON ABI with tuple components; the generated methods take plain
//! Rust tuples in component order.

use ethers::contract::abigen;

abigen!(
    PermitToken,
    r#"[
        function name() external view returns (string)
        function decimals() external view returns (uint8)
        function balanceOf(address owner) external view returns (uint256)
        function allowance(address owner, address spender) external view returns (uint256)
        function nonces(address owner) external view returns (uint256)
        function approve(address spender, uint256 value) external returns (bool)
        function transfer(address to, uint256 value) external returns (bool)
        function permit(address owner, address spender, uint256 value, uint256 deadline, uint8 v, bytes32 r, bytes32 s) external
    ]"#
);

abigen!(
    WrappedNative,
    r#"[
        function deposit() external payable
    ]"#
);

abigen!(
    PoolFactory,
    r#"[
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool)
    ]"#
);

abigen!(
    ConcentratedPool,
    r#"[
        function liquidity() external view returns (uint128)
        function slot0() external view returns (uint160 sqrtPriceX96, int24 tick, uint16 observationIndex, uint16 observationCardinality, uint16 observationCardinalityNext, uint8 feeProtocol, bool unlocked)
    ]"#,
    methods {
        slot0() as pool_slot;
    }
);

abigen!(
    PositionManager,
    r#"[
        {
            "type": "function",
            "name": "createAndInitializePoolIfNecessary",
            "stateMutability": "payable",
            "inputs": [
                { "name": "token0", "type": "address" },
                { "name": "token1", "type": "address" },
                { "name": "fee", "type": "uint24" },
                { "name": "sqrtPriceX96", "type": "uint160" }
            ],
            "outputs": [{ "name": "pool", "type": "address" }]
        },
        {
            "type": "function",
            "name": "mint",
            "stateMutability": "payable",
            "inputs": [
                {
                    "name": "params",
                    "type": "tuple",
                    "components": [
                        { "name": "token0", "type": "address" },
                        { "name": "token1", "type": "address" },
                        { "name": "fee", "type": "uint24" },
                        { "name": "tickLower", "type": "int24" },
                        { "name": "tickUpper", "type": "int24" },
                        { "name": "amount0Desired", "type": "uint256" },
                        { "name": "amount1Desired", "type": "uint256" },
                        { "name": "amount0Min", "type": "uint256" },
                        { "name": "amount1Min", "type": "uint256" },
                        { "name": "recipient", "type": "address" },
                        { "name": "deadline", "type": "uint256" }
                    ]
                }
            ],
            "outputs": [
                { "name": "tokenId", "type": "uint256" },
                { "name": "liquidity", "type": "uint128" },
                { "name": "amount0", "type": "uint256" },
                { "name": "amount1", "type": "uint256" }
            ]
        }
    ]"#
);

abigen!(
    SwapRouter,
    r#"[
        {
            "type": "function",
            "name": "exactInputSingle",
            "stateMutability": "payable",
            "inputs": [
                {
                    "name": "params",
                    "type": "tuple",
                    "components": [
                        { "name": "tokenIn", "type": "address" },
                        { "name": "tokenOut", "type": "address" },
                        { "name": "fee", "type": "uint24" },
                        { "name": "recipient", "type": "address" },
                        { "name": "deadline", "type": "uint256" },
                        { "name": "amountIn", "type": "uint256" },
                        { "name": "amountOutMinimum", "type": "uint256" },
                        { "name": "sqrtPriceLimitX96", "type": "uint160" }
                    ]
                }
            ],
            "outputs": [{ "name": "amountOut", "type": "uint256" }]
        }
    ]"#
);

abigen!(
    LendingPoolMock,
    r#"[
        function aUSDT() external view returns (address)
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external
    ]"#,
    methods {
        aUSDT() as receipt_token;
    }
);
