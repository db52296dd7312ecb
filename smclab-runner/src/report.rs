//! Markdown report generator.

use std::collections::BTreeMap;

use smclab_core::domain::TradeOutcome;

use crate::runner::BacktestResult;

fn outcome_label(outcome: TradeOutcome) -> &'static str {
    match outcome {
        TradeOutcome::Win => "win",
        TradeOutcome::Loss => "loss",
        TradeOutcome::PartialThenWin => "partial_then_win",
        TradeOutcome::PartialThenLoss => "partial_then_loss",
        TradeOutcome::Unresolved => "unresolved",
    }
}

pub fn markdown_report(result: &BacktestResult) -> String {
    let s = &result.summary;
    let mut report = format!(
        "# SMCLab Run Report\n\n\
Run ID: `{}`\n\n\
Symbol: {} ({} reference, {} bars, warmup {})\n\n\
## Summary\n\
- Trades: {} ({} wins, {} losses)\n\
- Unresolved: {}\n\
- Win Rate: {:.1}%\n\
- Total PnL: {:+.2}\n\
- Avg Weekly PnL: {:+.2} over {} weeks\n",
        result.run_id,
        result.symbol,
        result.reference,
        result.bar_count,
        result.warmup_bars,
        s.trades,
        s.wins,
        s.losses,
        s.unresolved,
        s.win_rate * 100.0,
        s.total_pnl,
        s.avg_weekly_pnl,
        s.weeks
    );

    if !result.trades.is_empty() {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for trade in &result.trades {
            *counts.entry(outcome_label(trade.outcome)).or_default() += 1;
        }
        report.push_str("\n## Outcomes\n\n");
        report.push_str("| Outcome | Count |\n");
        report.push_str("|---------|-------|\n");
        for (label, count) in &counts {
            report.push_str(&format!("| {label} | {count} |\n"));
        }
    }

    if !result.by_kind.is_empty() {
        report.push_str("\n## By Pattern\n\n");
        report.push_str("| Pattern | Trades | Wins | Losses | Unresolved | Win Rate | PnL |\n");
        report.push_str("|---------|--------|------|--------|------------|----------|-----|\n");
        for stats in &result.by_kind {
            report.push_str(&format!(
                "| {} | {} | {} | {} | {} | {:.1}% | {:+.2} |\n",
                stats.kind.name(),
                stats.trades,
                stats.wins,
                stats.losses,
                stats.unresolved,
                stats.win_rate * 100.0,
                stats.pnl
            ));
        }
    }

    if !result.weekly.is_empty() {
        report.push_str("\n## Weekly PnL\n\n");
        report.push_str("| Week | Exits | PnL |\n");
        report.push_str("|------|-------|-----|\n");
        for bucket in &result.weekly {
            report.push_str(&format!(
                "| {} | {} | {:+.2} |\n",
                bucket.week_start, bucket.events, bucket.pnl
            ));
        }
    }

    report
}
