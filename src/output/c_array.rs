//! Array-literal rendering of a [`ThresholdTable`].
//!
//! The C layout is consumed verbatim by the exponentiation library:
//!
//! ```text
//! int modulus_bitlens[2] = {256, 512};
//! int best_block_widths[2][5] = 
//! {
//! {100, 150, 250, 250, 0},
//! {100, 150, 200, 400, 0}
//! };
//! ```
//!
//! Row `i` of the threshold array belongs to entry `i` of the modulus array;
//! both are rendered from the same ordered rows.

use crate::tables::ThresholdTable;

fn join(values: &[usize]) -> String {
    values
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `int name[R] = {m0, m1, ...};`
pub fn modulus_array(table: &ThresholdTable, name: &str) -> String {
    format!(
        "int {}[{}] = {{{}}};",
        name,
        table.rows().len(),
        join(&table.modulus_bitlens())
    )
}

/// `int name[R][C] = ` followed by one brace-enclosed row per line.
pub fn threshold_array(table: &ThresholdTable, name: &str) -> String {
    let rows = table
        .rows()
        .iter()
        .map(|row| format!("{{{}}}", join(&row.thresholds)))
        .collect::<Vec<_>>();
    format!(
        "int {}[{}][{}] = \n{{\n{}\n}};",
        name,
        rows.len(),
        table.columns(),
        rows.join(",\n")
    )
}

/// `pub const NAME: [usize; R] = [...];`
pub fn rust_modulus_const(table: &ThresholdTable, name: &str) -> String {
    format!(
        "pub const {}: [usize; {}] = [{}];",
        name.to_uppercase(),
        table.rows().len(),
        join(&table.modulus_bitlens())
    )
}

/// `pub const NAME: [[usize; C]; R] = [...];` with one row per line.
pub fn rust_threshold_const(table: &ThresholdTable, name: &str) -> String {
    let mut out = format!(
        "pub const {}: [[usize; {}]; {}] = [\n",
        name.to_uppercase(),
        table.columns(),
        table.rows().len()
    );
    for row in table.rows() {
        out.push_str(&format!("    [{}],\n", join(&row.thresholds)));
    }
    out.push_str("];");
    out
}
