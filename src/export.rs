use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::cardano::{display_unit, SwapRecord};
use crate::kline::KlineRow;

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_row<W: Write>(out: &mut W, fields: &[String]) -> Result<()> {
    let line = fields.iter().map(|f| escape(f)).collect::<Vec<_>>().join(",");
    writeln!(out, "{line}")?;
    Ok(())
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

pub fn write_klines<W: Write>(out: &mut W, rows: &[KlineRow]) -> Result<()> {
    writeln!(out, "symbol,timestamp_jst,open,high,low,close,volume,quote_volume,rsi,atr")?;
    for row in rows {
        write_row(
            out,
            &[
                row.symbol.clone(),
                row.open_time_jst().format("%Y-%m-%d %H:%M:%S").to_string(),
                row.open.to_string(),
                row.high.to_string(),
                row.low.to_string(),
                row.close.to_string(),
                row.volume.to_string(),
                row.quote_volume.to_string(),
                opt(&row.rsi.map(|v| v.round_dp(4))),
                opt(&row.atr.map(|v| v.round_dp(8))),
            ],
        )?;
    }
    Ok(())
}

pub fn write_swaps<W: Write>(out: &mut W, swaps: &[SwapRecord]) -> Result<()> {
    writeln!(
        out,
        "tx_hash,timestamp,fee,token_in,token_in_name,token_out,token_out_name,amount_in,amount_out,dex_name,dexes_touched,arbitrage"
    )?;
    for swap in swaps {
        let time = Utc
            .timestamp_opt(swap.timestamp, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| swap.timestamp.to_string());
        write_row(
            out,
            &[
                swap.tx_hash.clone(),
                time,
                swap.fee.to_string(),
                opt(&swap.token_in),
                opt(&swap.token_in.as_deref().map(display_unit)),
                opt(&swap.token_out),
                opt(&swap.token_out.as_deref().map(display_unit)),
                swap.amount_in.to_string(),
                swap.amount_out.to_string(),
                swap.dex_name.clone(),
                swap.dexes_touched.join(";"),
                swap.arbitrage.to_string(),
            ],
        )?;
    }
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn export_klines(path: impl AsRef<Path>, rows: &[KlineRow]) -> Result<()> {
    let mut out = create(path.as_ref())?;
    write_klines(&mut out, rows)?;
    out.flush()?;
    Ok(())
}

pub fn export_swaps(path: impl AsRef<Path>, swaps: &[SwapRecord]) -> Result<()> {
    let mut out = create(path.as_ref())?;
    write_swaps(&mut out, swaps)?;
    out.flush()?;
    Ok(())
}

/// `cardano_dex_transactions_20240101_120000.csv`
pub fn default_swaps_filename(now: DateTime<Local>) -> String {
    format!("cardano_dex_transactions_{}.csv", now.format("%Y%m%d_%H%M%S"))
}
