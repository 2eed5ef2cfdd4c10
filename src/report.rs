//! Presentation of an allocation: console/file text through the Logger,
//! CSV export of the channel table and JSON export of the whole result.
//!
//! Nothing here computes; every number comes from the Allocation.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::allocator::Allocation;
use crate::error::Result;
use crate::logger::{Logger, LogEvent};
use crate::logln;
use crate::warnln;

/// Print the resolved price/rating of every allocated channel, grouped by sales house
pub fn printout_merge(allocation: &Allocation, logger: &mut Logger) -> io::Result<()> {
    for split in &allocation.sales_houses {
        let channels: Vec<_> = allocation.channels.iter().filter(|c| c.sales_house == split.sales_house).collect();
        let audience = channels.first().map(|c| c.buying_audience.label()).unwrap_or("-");

        logln!(logger, LogEvent::Merge, "\nSales house {} (buying audience {})", split.sales_house, audience)?;
        logln!(logger, LogEvent::Merge, "  {:<14} {:>10} {:>8} {:>8}", "Channel", "Price", "TRP", "Aff")?;
        for channel in channels {
            logln!(logger, LogEvent::Merge, "  {:<14} {:>10.2} {:>8.2} {:>8.2}",
                     channel.channel, channel.price, channel.rating, channel.affinity)?;
        }
    }

    for miss in &allocation.join_misses {
        warnln!(logger, LogEvent::Merge, "{} / {} has no affinity and was excluded", miss.sales_house, miss.channel)?;
    }
    Ok(())
}

/// Print the per channel table: slots, optimized budget and the shares
pub fn printout_channels(allocation: &Allocation, logger: &mut Logger) -> io::Result<()> {
    logln!(logger, LogEvent::Allocation, "\n=== Channel Split ===")?;
    logln!(logger, LogEvent::Allocation, "{:<14} {:<8} {:>6} {:>12} {:>10} {:>10} {:>10}  {}",
             "Channel", "House", "Slots", "Budget", "Std %", "Opt %", "House %", "Corridor")?;
    for channel in &allocation.channels {
        let corridor = if channel.corridor.within {
            format!("ok (±{:.0}%)", channel.corridor.tolerance * 100.0)
        } else {
            format!("OUT (±{:.0}%, target {:.2})", channel.corridor.tolerance * 100.0, channel.target_budget)
        };
        logln!(logger, LogEvent::Allocation, "{:<14} {:<8} {:>6} {:>12.2} {:>10.2} {:>10.2} {:>10.2}  {}",
                 channel.channel,
                 channel.sales_house,
                 channel.allocated_slots,
                 channel.allocated_budget,
                 channel.baseline_share_pct,
                 channel.allocated_share_pct,
                 channel.house_allocated_share_pct,
                 corridor)?;
    }
    Ok(())
}

/// Print per sales house totals
pub fn printout_sales_houses(allocation: &Allocation, logger: &mut Logger) -> io::Result<()> {
    logln!(logger, LogEvent::Allocation, "\n=== Sales Houses ===")?;
    for split in &allocation.sales_houses {
        logln!(logger, LogEvent::Allocation, "\n{} ({} channels)", split.sales_house, split.channel_count)?;
        logln!(logger, LogEvent::Allocation, "  Baseline: {:.2} ({:.2}% of campaign)", split.baseline_budget, split.baseline_share_pct)?;
        logln!(logger, LogEvent::Allocation, "  Budget (target/allocated): {:.2} / {:.2}", split.target_budget, split.allocated_budget)?;
        logln!(logger, LogEvent::Allocation, "  Slots: {} ({:.2}% of allocated budget)", split.allocated_slots, split.allocated_share_pct)?;
    }
    Ok(())
}

/// Print campaign totals
pub fn printout_summary(allocation: &Allocation, logger: &mut Logger) -> io::Result<()> {
    let totals = &allocation.totals;
    logln!(logger, LogEvent::Summary, "\n=== Campaign Totals (optimization by {}) ===", allocation.optimization_goal)?;
    logln!(logger, LogEvent::Summary, "Budget (planned/used): {:.2} / {:.2}", allocation.total_budget, totals.allocated_budget)?;
    logln!(logger, LogEvent::Summary, "Total Aff: {:.2}", totals.allocated_affinity)?;
    logln!(logger, LogEvent::Summary, "Total TRP: {:.2}", totals.allocated_rating)?;
    logln!(logger, LogEvent::Summary, "Slots: {}", totals.allocated_slots)?;
    if !allocation.join_misses.is_empty() {
        logln!(logger, LogEvent::Summary, "Channels excluded (no affinity): {}", allocation.join_misses.len())?;
    }
    Ok(())
}

/// Output the complete report
pub fn printout(allocation: &Allocation, logger: &mut Logger) -> io::Result<()> {
    printout_merge(allocation, logger)?;
    printout_channels(allocation, logger)?;
    printout_sales_houses(allocation, logger)?;
    printout_summary(allocation, logger)?;
    logger.flush()
}

/// One line of the CSV export
#[derive(Debug, Serialize)]
struct ChannelCsvRow<'a> {
    channel: &'a str,
    sales_house: &'a str,
    buying_audience: &'a str,
    price: f64,
    rating: f64,
    affinity: f64,
    baseline_budget: f64,
    baseline_share_pct: f64,
    allocated_slots: u64,
    allocated_budget: f64,
    allocated_share_pct: f64,
    house_allocated_share_pct: f64,
    within_corridor: bool,
}

/// Write the channel table to a CSV file, creating parent directories as needed
pub fn write_csv(allocation: &Allocation, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for channel in &allocation.channels {
        writer.serialize(ChannelCsvRow {
            channel: &channel.channel,
            sales_house: &channel.sales_house,
            buying_audience: channel.buying_audience.label(),
            price: channel.price,
            rating: channel.rating,
            affinity: channel.affinity,
            baseline_budget: channel.baseline_budget,
            baseline_share_pct: channel.baseline_share_pct,
            allocated_slots: channel.allocated_slots,
            allocated_budget: channel.allocated_budget,
            allocated_share_pct: channel.allocated_share_pct,
            house_allocated_share_pct: channel.house_allocated_share_pct,
            within_corridor: channel.corridor.within,
        })?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = allocation.channels.len(), "split saved to CSV");
    Ok(())
}

/// Write the whole allocation as pretty JSON
pub fn write_json<W: Write>(allocation: &Allocation, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, allocation)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::BufferReceiver;
    use crate::logger::LogReceiver;
    use crate::test_fixtures::{sample_allocation, sample_campaign};

    fn capture(events: Vec<LogEvent>) -> (Logger, std::sync::Arc<std::sync::Mutex<String>>) {
        let mut logger = Logger::new();
        let (receiver, buffer) = BufferReceiver::new(events);
        logger.add_receiver(receiver);
        (logger, buffer)
    }

    #[test]
    fn test_summary_lists_campaign_totals() {
        let allocation = sample_allocation();
        let (mut logger, buffer) = capture(vec![LogEvent::Summary]);
        printout_summary(&allocation, &mut logger).unwrap();

        let text = buffer.lock().unwrap().clone();
        assert!(text.contains("optimization by Aff"));
        assert!(text.contains("Budget (planned/used): 500000.00 / 503000.00"));
        assert!(text.contains("Total Aff: 4019.40"));
        assert!(text.contains("Total TRP: 681.50"));
        assert!(!text.contains("excluded"));
    }

    #[test]
    fn test_channel_table_marks_corridor_breach() {
        let allocation = sample_allocation();
        let (mut logger, buffer) = capture(vec![LogEvent::Allocation]);
        printout_channels(&allocation, &mut logger).unwrap();

        let text = buffer.lock().unwrap().clone();
        let unian_line = text.lines().find(|l| l.starts_with("УНІАН")).unwrap();
        assert!(unian_line.contains("OUT"));
        let ictv_line = text.lines().find(|l| l.starts_with("ICTV ")).unwrap();
        assert!(ictv_line.contains("162000.00"));
        assert!(ictv_line.contains("ok"));
        // 162000 of Sirius' 465000
        assert!(ictv_line.contains("34.84"));
    }

    #[test]
    fn test_merge_printout_warns_about_join_misses() {
        let mut campaign = sample_campaign();
        campaign.affinity_tables.get_mut("Sirius").unwrap().rows.retain(|r| r.channel != "МЕГА");
        let allocation = campaign.run().unwrap();

        let (mut logger, buffer) = capture(vec![LogEvent::Summary]);
        printout_merge(&allocation, &mut logger).unwrap();

        // Merge tables only reach Merge receivers, the warning climbs up to Summary
        let text = buffer.lock().unwrap().clone();
        assert_eq!(text, "WARNING Sirius / МЕГА has no affinity and was excluded\n");
    }

    #[test]
    fn test_write_csv_one_row_per_channel() {
        let allocation = sample_allocation();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("split.csv");
        write_csv(&allocation, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "channel");
        assert_eq!(&headers[9], "allocated_budget");

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), allocation.channels.len());
        assert_eq!(&records[0][0], "ICTV");
        assert_eq!(&records[0][8], "9");
    }

    #[test]
    fn test_write_json_round_trips_totals() {
        let allocation = sample_allocation();
        let mut out = Vec::new();
        write_json(&allocation, &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["optimization_goal"], "Aff");
        assert_eq!(value["totals"]["allocated_budget"], 503000.0);
        assert_eq!(value["channels"][0]["buying_audience"], "All 18-60");
        assert_eq!(value["channels"].as_array().unwrap().len(), 11);
    }

    /// Accepts Summary text only until it has seen `capacity` bytes
    struct FullDiskReceiver {
        capacity: usize,
        written: usize,
    }

    impl LogReceiver for FullDiskReceiver {
        fn should_log(&self, event: LogEvent) -> bool {
            event == LogEvent::Summary
        }

        fn write(&mut self, s: &str) -> io::Result<()> {
            self.written += s.len();
            if self.written > self.capacity {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
            }
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_printout_reports_receiver_write_failure() {
        let allocation = sample_allocation();
        let mut logger = Logger::new();
        logger.add_receiver(Box::new(FullDiskReceiver { capacity: 64, written: 0 }));

        let err = printout(&allocation, &mut logger).unwrap_err();
        assert_eq!(err.to_string(), "no space left on device");
    }

    #[test]
    fn test_full_printout_succeeds() {
        let allocation = sample_allocation();
        let (mut logger, buffer) = capture(vec![LogEvent::Merge, LogEvent::Allocation, LogEvent::Summary]);
        printout(&allocation, &mut logger).unwrap();

        let text = buffer.lock().unwrap().clone();
        assert!(text.contains("Sales house Space (buying audience W 30+)"));
        assert!(text.contains("=== Sales Houses ==="));
        assert!(text.contains("Slots: 46"));
    }
}
