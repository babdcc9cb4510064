mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use common::{amount, utxo, MockChain};
use market_scout::api::TxDetails;
use market_scout::cardano::{volume_statistics, DexCollector, DEX_CONTRACTS};
use market_scout::config::{CardanoConfig, Config};

const USER: &str = "addr1qxuser000000000000000000000000000000000000000000000000";
const TOKEN: &str = "29d222ce763455e3d7a09a665ce554f00ac89d2e99a1a83d267170c64d494e";

fn contract(name: &str) -> &'static str {
    DEX_CONTRACTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, addr)| *addr)
        .unwrap()
}

fn config() -> CardanoConfig {
    let mut config = Config::default().cardano;
    config.tx_delay_ms = 0;
    config.contract_delay_ms = 0;
    config
}

fn now() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_100_000, 0).unwrap()
}

fn ts(ago: Duration) -> i64 {
    (now() - ago).timestamp()
}

/// User trades 10 ADA for 500 MIN through the given pools.
fn swap_tx(hash: &str, block_time: i64, pools: &[&str]) -> TxDetails {
    let mut inputs = vec![utxo(USER, vec![amount("lovelace", 10_000_000)])];
    let mut outputs = vec![utxo(USER, vec![amount("lovelace", 1_500_000), amount(TOKEN, 500)])];
    for pool in pools {
        inputs.push(utxo(pool, vec![amount("lovelace", 900_000_000), amount(TOKEN, 100_000)]));
        outputs.push(utxo(pool, vec![amount("lovelace", 908_500_000), amount(TOKEN, 99_500)]));
    }
    TxDetails {
        hash: hash.to_string(),
        block_time,
        fee: 200_000,
        inputs,
        outputs,
        metadata: Vec::new(),
    }
}

fn plain_transfer(hash: &str, block_time: i64) -> TxDetails {
    TxDetails {
        hash: hash.to_string(),
        block_time,
        fee: 170_000,
        inputs: vec![utxo(USER, vec![amount("lovelace", 5_000_000)])],
        outputs: vec![utxo("addr1qxfriend", vec![amount("lovelace", 4_830_000)])],
        metadata: Vec::new(),
    }
}

#[tokio::test]
async fn collects_recent_dex_swaps_once() {
    let pool = contract("minswap_pool");
    let sundae = contract("sundaeswap");

    let chain = MockChain::default()
        .with_page(
            pool,
            1,
            &[
                ("tx_a", ts(Duration::minutes(5))),
                ("tx_shared", ts(Duration::minutes(10))),
                ("tx_plain", ts(Duration::minutes(20))),
                ("tx_old", ts(Duration::hours(30))),
            ],
        )
        // Never reached: page 1 already ran past the cutoff
        .with_page(pool, 2, &[("tx_page2", ts(Duration::minutes(1)))])
        .with_page(sundae, 1, &[("tx_shared", ts(Duration::minutes(10)))])
        .with_tx(swap_tx("tx_a", ts(Duration::minutes(5)), &[pool]))
        .with_tx(swap_tx("tx_shared", ts(Duration::minutes(10)), &[pool, sundae]))
        .with_tx(plain_transfer("tx_plain", ts(Duration::minutes(20))))
        .with_tx(swap_tx("tx_old", ts(Duration::hours(30)), &[pool]))
        .with_tx(swap_tx("tx_page2", ts(Duration::minutes(1)), &[pool]));
    let chain = Arc::new(chain);

    let collector = DexCollector::new(chain.clone(), &config());
    let swaps = collector.collect_recent(24, now()).await;

    let hashes: Vec<&str> = swaps.iter().map(|s| s.tx_hash.as_str()).collect();
    assert_eq!(hashes, vec!["tx_a", "tx_shared"]);

    let requested = chain.requested();
    assert!(!requested.contains(&"tx_old".to_string()));
    assert!(!requested.contains(&"tx_page2".to_string()));

    let a = &swaps[0];
    assert_eq!(a.dex_name, "minswap");
    assert_eq!(a.token_in.as_deref(), Some("lovelace"));
    assert_eq!(a.amount_in, 8_500_000);
    assert_eq!(a.token_out.as_deref(), Some(TOKEN));
    assert_eq!(a.amount_out, 500);
    assert!(!a.arbitrage);

    let shared = &swaps[1];
    assert_eq!(shared.dexes_touched, vec!["minswap", "sundaeswap"]);
    assert!(shared.arbitrage);

    let stats = volume_statistics(&swaps).unwrap();
    assert_eq!(stats.total_transactions, 2);
    assert_eq!(stats.unique_dexes, 1);
    assert_eq!(stats.arbitrage_candidates, 1);
    assert_eq!(stats.total_ada_volume, rust_decimal::Decimal::from(17));
}

#[tokio::test]
async fn failed_detail_fetch_is_skipped() {
    let pool = contract("minswap_pool");
    let chain = MockChain::default()
        .with_page(pool, 1, &[("tx_missing", ts(Duration::minutes(1))), ("tx_a", ts(Duration::minutes(2)))])
        .with_tx(swap_tx("tx_a", ts(Duration::minutes(2)), &[pool]));

    let collector = DexCollector::new(Arc::new(chain), &config());
    let swaps = collector.collect_from_address(pool, None).await;
    assert_eq!(swaps.len(), 1);
    assert_eq!(swaps[0].tx_hash, "tx_a");
}
