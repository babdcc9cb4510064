//! DEX activity on Cardano, read from a chain indexer.
//!
//! Transactions are classified by the contract addresses they touch and by
//! their metadata. For DEX transactions the user's net token movement is
//! turned into a single swap leg, and transactions that route through more
//! than one DEX (or are large multi-asset round trips) are flagged as
//! arbitrage candidates.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, info, warn};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use crate::api::blockfrost::{AssetAmount, TxMetadata, Utxo};
use crate::api::{ChainSource, TxDetails};
use crate::config::CardanoConfig;

pub const LOVELACE: &str = "lovelace";
const LOVELACE_PER_ADA: i64 = 1_000_000;
const POLICY_ID_HEX_LEN: usize = 56;

pub const DEX_CONTRACTS: &[(&str, &str)] = &[
    ("minswap_order", "addr1w9qzpelu9hn45pefc0xr4ac4kdxeswq7pndul2vuj59u8tqaxdznu"),
    ("minswap_pool", "addr1wxn9efv2f6w82hagxqtn62ju4m293tqvw0uhmdl64ch8uwc5rd65d"),
    ("sundaeswap", "addr1w9xu5tge2s0l8zz5gy6m4fnp6vqlw3qsklcyfqpqhv67hgqv3rlv4"),
    ("wingRiders", "addr1w8qmxkacjdffxah0l3qg8hq2pmvs58q8lcy42zy9kda2ylc6dy5r4"),
];

const DEX_METADATA_LABELS: &[&str] = &["674", "1967"];
const DEX_KEYWORDS: &[&str] = &["swap", "minswap", "sundaeswap", "dex", "pool"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapRecord {
    pub tx_hash: String,
    pub timestamp: i64,
    pub fee: u64,
    pub token_in: Option<String>,
    pub token_out: Option<String>,
    pub amount_in: u128,
    pub amount_out: u128,
    pub dex_name: String,
    pub dexes_touched: Vec<String>,
    pub arbitrage: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenChanges {
    pub token_in: Option<String>,
    pub token_out: Option<String>,
    pub amount_in: u128,
    pub amount_out: u128,
}

/// `minswap_order` -> `minswap`
fn dex_family(contract_name: &str) -> &str {
    contract_name.split('_').next().unwrap_or(contract_name)
}

fn parse_quantity(amount: &AssetAmount) -> i128 {
    amount.quantity.parse::<i128>().unwrap_or_else(|_| {
        debug!("Skipping unparsable quantity {} {}", amount.quantity, amount.unit);
        0
    })
}

fn sum_by_unit<'a>(amounts: impl Iterator<Item = &'a AssetAmount>) -> BTreeMap<String, i128> {
    let mut totals = BTreeMap::new();
    for amount in amounts {
        *totals.entry(amount.unit.clone()).or_insert(0) += parse_quantity(amount);
    }
    totals
}

/// Net user-side movement per unit. A decrease is what the user sent in,
/// an increase what they got out; with several of either the last unit in
/// sort order wins.
pub fn calculate_token_changes(inputs: &[AssetAmount], outputs: &[AssetAmount]) -> TokenChanges {
    let input_tokens = sum_by_unit(inputs.iter());
    let output_tokens = sum_by_unit(outputs.iter());

    let units: BTreeSet<&String> = input_tokens.keys().chain(output_tokens.keys()).collect();

    let mut changes = TokenChanges::default();
    for unit in units {
        let change = output_tokens.get(unit).copied().unwrap_or(0) - input_tokens.get(unit).copied().unwrap_or(0);
        if change < 0 {
            changes.token_in = Some(unit.clone());
            changes.amount_in = change.unsigned_abs();
        } else if change > 0 {
            changes.token_out = Some(unit.clone());
            changes.amount_out = change.unsigned_abs();
        }
    }
    changes
}

/// Human-readable unit: native assets are `policy_id ++ hex(asset_name)`.
pub fn display_unit(unit: &str) -> String {
    if unit == LOVELACE || unit.len() <= POLICY_ID_HEX_LEN {
        return unit.to_string();
    }
    let (policy, name_hex) = unit.split_at(POLICY_ID_HEX_LEN);
    match hex::decode(name_hex).ok().and_then(|b| String::from_utf8(b).ok()) {
        Some(name) if !name.is_empty() && name.chars().all(|c| !c.is_control()) => {
            format!("{name} ({}…)", &policy[..8])
        }
        _ => unit.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct DexAnalyzer {
    contracts: Vec<(String, String)>,
    complex_min_utxos: usize,
    complex_min_assets: usize,
}

impl DexAnalyzer {
    pub fn new(complex_min_utxos: usize, complex_min_assets: usize) -> Self {
        Self {
            contracts: DEX_CONTRACTS
                .iter()
                .map(|(name, addr)| (name.to_string(), addr.to_string()))
                .collect(),
            complex_min_utxos,
            complex_min_assets,
        }
    }

    pub fn from_config(config: &CardanoConfig) -> Self {
        Self::new(config.complex_min_utxos, config.complex_min_assets)
    }

    pub fn contracts(&self) -> &[(String, String)] {
        &self.contracts
    }

    fn is_contract(&self, address: &str) -> bool {
        self.contracts.iter().any(|(_, addr)| addr == address)
    }

    fn all_utxos<'a>(tx: &'a TxDetails) -> impl Iterator<Item = &'a Utxo> {
        tx.inputs.iter().chain(tx.outputs.iter())
    }

    pub fn is_dex_transaction(&self, tx: &TxDetails) -> bool {
        Self::all_utxos(tx).any(|u| self.is_contract(&u.address))
            || tx.metadata.iter().any(Self::is_dex_metadata)
    }

    fn is_dex_metadata(metadata: &TxMetadata) -> bool {
        if DEX_METADATA_LABELS.contains(&metadata.label.as_str()) {
            return true;
        }
        let text = metadata.json_metadata.to_string().to_lowercase();
        DEX_KEYWORDS.iter().any(|kw| text.contains(*kw))
    }

    /// DEX families whose contracts the transaction touches, in table order.
    pub fn dexes_touched(&self, tx: &TxDetails) -> Vec<String> {
        let mut touched: Vec<String> = Vec::new();
        for (name, address) in &self.contracts {
            if Self::all_utxos(tx).any(|u| &u.address == address) {
                let family = dex_family(name).to_string();
                if !touched.contains(&family) {
                    touched.push(family);
                }
            }
        }
        touched
    }

    pub fn identify_dex(&self, tx: &TxDetails) -> String {
        self.dexes_touched(tx)
            .into_iter()
            .next()
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn user_amounts<'a>(&'a self, utxos: &'a [Utxo]) -> impl Iterator<Item = &'a AssetAmount> + 'a {
        utxos
            .iter()
            .filter(move |u| !self.is_contract(&u.address))
            .flat_map(|u| u.amount.iter())
    }

    /// Cross-DEX routing, or a large multi-asset transaction where the user
    /// ends up with more ADA than they put in.
    pub fn is_arbitrage_candidate(&self, tx: &TxDetails) -> bool {
        if self.dexes_touched(tx).len() >= 2 {
            return true;
        }

        let utxo_count = tx.inputs.len() + tx.outputs.len();
        let distinct_units: BTreeSet<&str> = Self::all_utxos(tx)
            .flat_map(|u| u.amount.iter().map(|a| a.unit.as_str()))
            .collect();
        if utxo_count < self.complex_min_utxos || distinct_units.len() < self.complex_min_assets {
            return false;
        }

        let lovelace_in: i128 = self
            .user_amounts(&tx.inputs)
            .filter(|a| a.unit == LOVELACE)
            .map(parse_quantity)
            .sum();
        let lovelace_out: i128 = self
            .user_amounts(&tx.outputs)
            .filter(|a| a.unit == LOVELACE)
            .map(parse_quantity)
            .sum();
        lovelace_out > lovelace_in
    }

    pub fn parse_swap(&self, tx: &TxDetails) -> SwapRecord {
        let inputs: Vec<AssetAmount> = self.user_amounts(&tx.inputs).cloned().collect();
        let outputs: Vec<AssetAmount> = self.user_amounts(&tx.outputs).cloned().collect();
        let changes = calculate_token_changes(&inputs, &outputs);
        let dexes_touched = self.dexes_touched(tx);

        SwapRecord {
            tx_hash: tx.hash.clone(),
            timestamp: tx.block_time,
            fee: tx.fee,
            token_in: changes.token_in,
            token_out: changes.token_out,
            amount_in: changes.amount_in,
            amount_out: changes.amount_out,
            dex_name: self.identify_dex(tx),
            arbitrage: self.is_arbitrage_candidate(tx),
            dexes_touched,
        }
    }
}

pub struct DexCollector {
    source: Arc<dyn ChainSource>,
    analyzer: DexAnalyzer,
    page_size: u32,
    pages: u32,
    tx_delay: Duration,
    contract_delay: Duration,
}

impl DexCollector {
    pub fn new(source: Arc<dyn ChainSource>, config: &CardanoConfig) -> Self {
        Self {
            source,
            analyzer: DexAnalyzer::from_config(config),
            page_size: config.page_size,
            pages: config.pages,
            tx_delay: Duration::from_millis(config.tx_delay_ms),
            contract_delay: Duration::from_millis(config.contract_delay_ms),
        }
    }

    pub fn analyzer(&self) -> &DexAnalyzer {
        &self.analyzer
    }

    /// DEX transactions from an address's history, newest first. Paging
    /// stops at an empty page, at `pages`, or once transactions are older
    /// than `cutoff`.
    pub async fn collect_from_address(&self, address: &str, cutoff: Option<DateTime<Utc>>) -> Vec<SwapRecord> {
        let cutoff_secs = cutoff.map(|c| c.timestamp());
        let mut swaps = Vec::new();

        for page in 1..=self.pages {
            info!("Processing page {page}...");

            let transactions = match self
                .source
                .address_transactions(address, self.page_size, page)
                .await
            {
                Ok(txs) => txs,
                Err(e) => {
                    warn!("Failed to fetch transactions for {address}: {e}");
                    break;
                }
            };
            if transactions.is_empty() {
                break;
            }

            let mut reached_cutoff = false;
            for tx in &transactions {
                if cutoff_secs.is_some_and(|c| tx.block_time <= c) {
                    reached_cutoff = true;
                    continue;
                }

                // Rate limiting
                tokio::time::sleep(self.tx_delay).await;

                let details = match self.source.transaction_details(&tx.tx_hash).await {
                    Ok(details) => details,
                    Err(e) => {
                        warn!("Failed to fetch transaction {}: {e}", tx.tx_hash);
                        continue;
                    }
                };

                if self.analyzer.is_dex_transaction(&details) {
                    let swap = self.analyzer.parse_swap(&details);
                    info!("DEX transaction found: {}", tx.tx_hash);
                    swaps.push(swap);
                }
            }

            if reached_cutoff {
                break;
            }
        }

        swaps
    }

    /// DEX transactions within `hours_back` of `now` across every known contract.
    pub async fn collect_recent(&self, hours_back: i64, now: DateTime<Utc>) -> Vec<SwapRecord> {
        let cutoff = now - ChronoDuration::hours(hours_back);
        let mut all = Vec::new();

        let contracts = self.analyzer.contracts().to_vec();
        for (i, (name, address)) in contracts.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.contract_delay).await;
            }
            info!("Collecting {name} transactions...");

            let swaps = self.collect_from_address(address, Some(cutoff)).await;
            all.extend(swaps.into_iter().filter(|s| s.timestamp > cutoff.timestamp()));
        }

        // The same transaction often touches more than one known contract
        let mut seen = BTreeSet::new();
        all.retain(|s| seen.insert(s.tx_hash.clone()));
        all
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeStatistics {
    pub total_transactions: usize,
    pub unique_dexes: usize,
    pub total_ada_volume: Decimal,
    pub average_fee_ada: Decimal,
    /// Most active first
    pub transactions_by_dex: Vec<(String, usize)>,
    pub arbitrage_candidates: usize,
}

pub fn volume_statistics(swaps: &[SwapRecord]) -> Option<VolumeStatistics> {
    if swaps.is_empty() {
        return None;
    }

    let mut by_dex: BTreeMap<&str, usize> = BTreeMap::new();
    for swap in swaps {
        *by_dex.entry(swap.dex_name.as_str()).or_insert(0) += 1;
    }
    let mut transactions_by_dex: Vec<(String, usize)> =
        by_dex.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    transactions_by_dex.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let lovelace_in: u128 = swaps
        .iter()
        .filter(|s| s.token_in.as_deref() == Some(LOVELACE))
        .map(|s| s.amount_in)
        .sum();
    let total_fees: u128 = swaps.iter().map(|s| u128::from(s.fee)).sum();

    let per_ada = Decimal::from(LOVELACE_PER_ADA);
    Some(VolumeStatistics {
        total_transactions: swaps.len(),
        unique_dexes: transactions_by_dex.len(),
        total_ada_volume: Decimal::from_u128(lovelace_in).unwrap_or(Decimal::MAX) / per_ada,
        average_fee_ada: Decimal::from_u128(total_fees).unwrap_or(Decimal::MAX) / Decimal::from(swaps.len()) / per_ada,
        transactions_by_dex,
        arbitrage_candidates: swaps.iter().filter(|s| s.arbitrage).count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MINSWAP_POOL: &str = "addr1wxn9efv2f6w82hagxqtn62ju4m293tqvw0uhmdl64ch8uwc5rd65d";
    const SUNDAE: &str = "addr1w9xu5tge2s0l8zz5gy6m4fnp6vqlw3qsklcyfqpqhv67hgqv3rlv4";
    const TOKEN: &str = "29d222ce763455e3d7a09a665ce554f00ac89d2e99a1a83d267170c64d494e";

    fn amount(unit: &str, quantity: i64) -> AssetAmount {
        AssetAmount {
            unit: unit.to_string(),
            quantity: quantity.to_string(),
        }
    }

    fn utxo(address: &str, amounts: Vec<AssetAmount>) -> Utxo {
        Utxo {
            address: address.to_string(),
            amount: amounts,
        }
    }

    fn tx(inputs: Vec<Utxo>, outputs: Vec<Utxo>, metadata: Vec<TxMetadata>) -> TxDetails {
        TxDetails {
            hash: "tx1".to_string(),
            block_time: 1_700_000_000,
            fee: 200_000,
            inputs,
            outputs,
            metadata,
        }
    }

    fn swap_tx() -> TxDetails {
        // User sends 100 ADA to the pool and receives 500 MIN back
        tx(
            vec![
                utxo("addr1user", vec![amount(LOVELACE, 102_000_000)]),
                utxo(MINSWAP_POOL, vec![amount(LOVELACE, 1_000_000_000), amount(TOKEN, 9_000)]),
            ],
            vec![
                utxo("addr1user", vec![amount(LOVELACE, 1_800_000), amount(TOKEN, 500)]),
                utxo(MINSWAP_POOL, vec![amount(LOVELACE, 1_100_000_000), amount(TOKEN, 8_500)]),
            ],
            vec![],
        )
    }

    #[test]
    fn token_changes_split_in_and_out() {
        let changes = calculate_token_changes(
            &[amount(LOVELACE, 102_000_000)],
            &[amount(LOVELACE, 1_800_000), amount(TOKEN, 500)],
        );
        assert_eq!(changes.token_in.as_deref(), Some(LOVELACE));
        assert_eq!(changes.amount_in, 100_200_000);
        assert_eq!(changes.token_out.as_deref(), Some(TOKEN));
        assert_eq!(changes.amount_out, 500);
    }

    #[test]
    fn contract_address_marks_dex() {
        let analyzer = DexAnalyzer::new(6, 3);
        let tx = swap_tx();
        assert!(analyzer.is_dex_transaction(&tx));
        assert_eq!(analyzer.identify_dex(&tx), "minswap");

        let swap = analyzer.parse_swap(&tx);
        assert_eq!(swap.dex_name, "minswap");
        assert_eq!(swap.token_out.as_deref(), Some(TOKEN));
        assert_eq!(swap.amount_in, 100_200_000);
        assert!(!swap.arbitrage);
    }

    #[test]
    fn metadata_marks_dex() {
        let analyzer = DexAnalyzer::new(6, 3);
        let by_label = tx(
            vec![],
            vec![],
            vec![TxMetadata { label: "674".to_string(), json_metadata: json!({"msg": ["hi"]}) }],
        );
        assert!(analyzer.is_dex_transaction(&by_label));
        assert_eq!(analyzer.identify_dex(&by_label), "unknown");

        let by_keyword = tx(
            vec![],
            vec![],
            vec![TxMetadata { label: "42".to_string(), json_metadata: json!({"Action": "SundaeSwap Order"}) }],
        );
        assert!(analyzer.is_dex_transaction(&by_keyword));

        let plain = tx(
            vec![utxo("addr1a", vec![amount(LOVELACE, 5)])],
            vec![utxo("addr1b", vec![amount(LOVELACE, 4)])],
            vec![TxMetadata { label: "721".to_string(), json_metadata: json!({"name": "NFT"}) }],
        );
        assert!(!analyzer.is_dex_transaction(&plain));
    }

    #[test]
    fn two_dexes_is_arbitrage() {
        let analyzer = DexAnalyzer::new(6, 3);
        let routed = tx(
            vec![utxo("addr1user", vec![amount(LOVELACE, 50_000_000)])],
            vec![
                utxo(MINSWAP_POOL, vec![amount(LOVELACE, 25_000_000)]),
                utxo(SUNDAE, vec![amount(LOVELACE, 24_000_000)]),
            ],
            vec![],
        );
        assert_eq!(analyzer.dexes_touched(&routed), vec!["minswap", "sundaeswap"]);
        assert!(analyzer.is_arbitrage_candidate(&routed));
    }

    #[test]
    fn complex_round_trip_with_ada_gain_is_arbitrage() {
        let analyzer = DexAnalyzer::new(4, 3);
        let other = "f66d78b4a3cb3d37afa0ec36461e51ecbde00f26c8f0a68f94b6988069555344";
        let round_trip = tx(
            vec![
                utxo("addr1bot", vec![amount(LOVELACE, 10_000_000), amount(TOKEN, 100)]),
                utxo(MINSWAP_POOL, vec![amount(LOVELACE, 500_000_000), amount(other, 1_000)]),
            ],
            vec![
                utxo("addr1bot", vec![amount(LOVELACE, 10_400_000), amount(TOKEN, 100)]),
                utxo(MINSWAP_POOL, vec![amount(LOVELACE, 499_400_000), amount(other, 1_000)]),
            ],
            vec![],
        );
        assert!(analyzer.is_arbitrage_candidate(&round_trip));

        // Same shape but the bot loses ADA
        let losing = tx(
            round_trip.inputs.clone(),
            vec![
                utxo("addr1bot", vec![amount(LOVELACE, 9_000_000), amount(TOKEN, 100)]),
                utxo(MINSWAP_POOL, vec![amount(LOVELACE, 500_800_000), amount(other, 1_000)]),
            ],
            vec![],
        );
        assert!(!analyzer.is_arbitrage_candidate(&losing));
    }

    #[test]
    fn display_unit_decodes_asset_name() {
        assert_eq!(display_unit(LOVELACE), "lovelace");
        assert_eq!(display_unit(TOKEN), "MIN (29d222ce…)");
        let binary = format!("{}{}", &TOKEN[..56], "00ff");
        assert_eq!(display_unit(&binary), binary);
    }

    #[test]
    fn statistics_summarise_swaps() {
        let mk = |dex: &str, token_in: &str, amount_in: u128, fee: u64, arbitrage: bool| SwapRecord {
            tx_hash: format!("{dex}-{amount_in}"),
            timestamp: 1,
            fee,
            token_in: Some(token_in.to_string()),
            token_out: None,
            amount_in,
            amount_out: 0,
            dex_name: dex.to_string(),
            dexes_touched: vec![dex.to_string()],
            arbitrage,
        };
        let swaps = vec![
            mk("minswap", LOVELACE, 100_000_000, 200_000, false),
            mk("minswap", TOKEN, 500, 300_000, true),
            mk("sundaeswap", LOVELACE, 50_000_000, 100_000, false),
        ];
        let stats = volume_statistics(&swaps).unwrap();
        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.unique_dexes, 2);
        assert_eq!(stats.total_ada_volume, Decimal::from(150));
        assert_eq!(stats.average_fee_ada, Decimal::new(2, 1));
        assert_eq!(stats.transactions_by_dex[0], ("minswap".to_string(), 2));
        assert_eq!(stats.arbitrage_candidates, 1);

        assert!(volume_statistics(&[]).is_none());
    }
}
