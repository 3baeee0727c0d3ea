// used to print out readable forms of a binding table
use std::fmt;

use crate::binding::Bindings;
use crate::column::{BlockId, RID_NULL};

/// Tables longer than this are shown with their middle rows elided.
const ELIDE_ABOVE: usize = 25;

fn flag(set: bool, c: char) -> char {
    if set { c } else { '-' }
}

fn block(b: Option<BlockId>) -> i64 {
    b.map_or(-1, |b| b as i64)
}

/// A fixed-width grid: one header line of names, one line of flags
/// (`p`rojected, `u`sed, `n`eed value, `b`ound, `A`ppears, `D`epends) and a
/// line per row with the union tag and value of each cell in hex.
impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let length = self.len();
        for c in self.columns() {
            if c.bound() {
                write!(f, " {:>20.20}", c.name())?;
            } else {
                write!(f, " {:>13.13}", c.name())?;
            }
        }
        writeln!(f)?;
        for c in self.columns() {
            let flags: String = [
                flag(c.projected(), 'p'),
                flag(c.used(), 'u'),
                flag(c.need_val(), 'n'),
            ]
            .iter()
            .collect();
            if c.bound() {
                write!(
                    f,
                    " u       {}{} A{:02} D{:02}",
                    flags,
                    flag(c.bound(), 'b'),
                    block(c.appears()),
                    block(c.depends())
                )?;
            } else {
                write!(f, "   {} A{:02} D{:02}", flags, block(c.appears()), block(c.depends()))?;
            }
        }
        writeln!(f)?;
        let mut r = 0;
        while r < length {
            for c in self.columns() {
                if !c.bound() {
                    write!(f, "{:>14}", "null")?;
                } else if r < c.len() && c.value(r) == RID_NULL {
                    write!(f, " 0{:>19}", "null")?;
                } else {
                    let val = c.vals().get(r).copied().unwrap_or(u64::MAX);
                    write!(f, "{:2x} {:18x}", c.tag(r), val)?;
                }
            }
            writeln!(f)?;
            if length > ELIDE_ABOVE && r > 20 && length - r > 2 {
                writeln!(f, "...")?;
                r = length - 3;
            }
            r += 1;
        }
        Ok(())
    }
}
