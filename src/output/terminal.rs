//! Terminal output: per-modulus timing tables.

use colored::Colorize;

use crate::dispatch::theoretical_block_width;
use crate::tables::BitlenTable;

/// Width of every column.
const COLUMN: usize = 6;

/// Format the timings of one modulus bit-length.
///
/// One row per exponent bit-length, one column per block width. Times
/// within display tolerance of the row minimum are starred. The last two
/// columns compare the measured best width with the analytic estimate.
pub fn format_bitlen_table(table: &BitlenTable) -> String {
    let widths = table.max_block_width();
    let mut output = String::new();

    let mut header = format!("{:>COLUMN$}", "ebl");
    for w in 1..=widths {
        header.push_str(&format!(" {:>COLUMN$}", w));
    }
    header.push_str(&format!(" {:>COLUMN$} {:>COLUMN$}", "best", "est"));
    output.push_str(&format!("{}\n", header.bold()));

    for (ebl, timings) in table.iter() {
        output.push_str(&format!("{:>COLUMN$}", ebl));

        let minima = timings.minima();
        for (i, &time) in timings.times().iter().enumerate() {
            if minima.contains(&(i + 1)) {
                let cell = format!("{:>COLUMN$}", format!("*{:.2}", time));
                output.push_str(&format!(" {}", cell.green().bold()));
            } else {
                output.push_str(&format!(" {:>COLUMN$.2}", time));
            }
        }
        // Short vectors leave the trailing columns blank.
        for _ in timings.len()..widths {
            output.push_str(&format!(" {:>COLUMN$}", ""));
        }

        let estimate = theoretical_block_width(ebl);
        match timings.best_block_width() {
            Ok(best) => {
                let best_cell = format!("{:>COLUMN$}", best);
                let best_cell = if best == estimate {
                    best_cell.normal()
                } else {
                    best_cell.yellow()
                };
                output.push_str(&format!(" {}", best_cell));
            }
            Err(_) => output.push_str(&format!(" {:>COLUMN$}", "-")),
        }
        output.push_str(&format!(
            " {}\n",
            format!("{:>COLUMN$}", estimate).dimmed()
        ));
    }

    output
}

/// Format one modulus bit-length under its `mbl:` heading.
pub fn format_modulus_table(modulus_bitlen: usize, table: &BitlenTable) -> String {
    format!(
        "{} {:>COLUMN$}\n{}\n",
        "mbl:".bold(),
        modulus_bitlen,
        format_bitlen_table(table)
    )
}
