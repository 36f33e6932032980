use rust_decimal::Decimal;

use crate::engine::{ThresholdLevels, ThresholdStrategy};
use crate::market::QuoteProvider;
use crate::models::{currency_symbol, Position};
use crate::telegram::escape_markdown_v2;

/// `1234567.891` -> `1,234,567.89`.
pub fn format_number(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

/// Magnitude of a percentage without trailing zeros: `12.50` -> `12.5`.
pub fn format_pct(pct: Decimal) -> String {
    pct.abs().round_dp(2).normalize().to_string()
}

/// Numbered tactical map for one position, MarkdownV2-escaped.
pub fn format_position_report(
    idx: usize,
    position: &Position,
    current_price: Option<Decimal>,
    levels: &ThresholdLevels,
) -> String {
    let Some(current) = current_price else {
        return analysis_failed(position, "price data unavailable");
    };
    let Some(change) = position.percent_change(current) else {
        return analysis_failed(position, "price out of range");
    };

    let sym = currency_symbol(&position.ticker);
    let change = change.round_dp(2);
    let change_sign = if change.is_sign_negative() && !change.is_zero() { "-" } else { "+" };

    let title = format!("#{} [{}] tactical map", idx, position.name.to_uppercase());
    let body = format!(
        "- Purchase: {sym}{}\n\
         - Current: {sym}{} ({change_sign}{}%)\n\
         - Add-buy: {sym}{} (-{}%)\n\
         - Target sell: {sym}{} (+{}%)\n\
         - Take-profit: {sym}{} (+{}%)",
        format_number(position.purchase_price),
        format_number(current),
        format_pct(change),
        format_number(levels.add_buy),
        format_pct(levels.add_buy_pct),
        format_number(levels.target),
        format_pct(levels.target_pct),
        format_number(levels.take_profit),
        format_pct(levels.take_profit_pct),
    );

    format!("*{}*\n{}", escape_markdown_v2(&title), escape_markdown_v2(&body))
}

fn analysis_failed(position: &Position, reason: &str) -> String {
    escape_markdown_v2(&format!(
        "⚠️ {}({}) analysis failed: {reason}",
        position.name, position.ticker
    ))
}

/// Header plus per-position reports separated by blank lines.
pub fn format_full_report(reports: &[String]) -> String {
    let header = "🏛️ *Full tactical report*";
    if reports.is_empty() {
        return format!("{}\n{}", header, escape_markdown_v2("No positions are being tracked."));
    }
    format!("{}\n{}", header, reports.join("\n\n"))
}

/// Fetch a quote and render the report for one position. Quote failures
/// and levels that cannot be computed render as the "analysis failed" line.
pub async fn build_position_report(
    idx: usize,
    position: &Position,
    quotes: &dyn QuoteProvider,
    strategy: &ThresholdStrategy,
) -> String {
    let snap = match quotes.snapshot(&position.ticker).await {
        Ok(snap) => snap,
        Err(e) => {
            tracing::warn!(error = %e, ticker = %position.ticker, "Report: quote unavailable");
            return analysis_failed(position, "price data unavailable");
        }
    };

    match strategy.levels_for(position.purchase_price, &snap.bars) {
        Some(levels) => format_position_report(idx, position, Some(snap.last_close), &levels),
        None => {
            tracing::warn!(
                ticker = %position.ticker,
                purchase = %position.purchase_price,
                "Report: threshold levels overflow"
            );
            analysis_failed(position, "price out of range")
        }
    }
}

pub async fn build_full_report(
    positions: &[Position],
    quotes: &dyn QuoteProvider,
    strategy: &ThresholdStrategy,
) -> String {
    let mut reports = Vec::with_capacity(positions.len());
    for (i, position) in positions.iter().enumerate() {
        reports.push(build_position_report(i + 1, position, quotes, strategy).await);
    }
    format_full_report(&reports)
}
