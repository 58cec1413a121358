//! Label linearization and assembly text emission.
//!
//! Labels live on their own pseudo-lines in the emission stream; the
//! assembler column format wants them attached to the next instruction.
//! This pass resolves that with a single pending-label slot: a label is
//! held until the next instruction claims it. If a second label arrives
//! while one is already pending, the newer one silently replaces it, a
//! known sharp edge of the format that is kept as-is.

use crate::codegen::Unit;

/// Width of the label column.
const LABEL_WIDTH: usize = 20;
/// Width of the instruction column in front of an annotation.
const CODE_WIDTH: usize = 40;
/// Width of a data line in front of its annotation.
const DATA_WIDTH: usize = 60;

/// Resolve pending labels, terminate the program, and append the data
/// section. Returns the final assembly text.
pub fn assemble(mut units: Vec<Unit>, data: &[(String, i32)]) -> String {
    // Every program ends deterministically; a trailing pending label
    // (e.g. the done label of the last statement) attaches here.
    units.push(Unit::Instr {
        text: "trap R0,R0,R0".to_string(),
        note: Some("stop program".to_string()),
    });

    let mut lines = Vec::new();
    let mut pending: Option<String> = None;
    for unit in units {
        match unit {
            Unit::Label(name) => pending = Some(name),
            Unit::Instr { text, note } => {
                let body = match note {
                    Some(note) => format!("{text:<width$}; {note}", width = CODE_WIDTH),
                    None => text,
                };
                let label = pending.take().unwrap_or_default();
                lines.push(format!("{label:<width$}{body}", width = LABEL_WIDTH));
            }
        }
    }

    lines.push(String::new());
    for (name, value) in data {
        let entry = format!("{name} data {value}");
        lines.push(format!("{entry:<width$}; initial value", width = DATA_WIDTH));
    }
    lines.join("\n")
}
