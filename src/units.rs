//! Conversions between `genpdf` millimetres and typographic points.

use genpdf::Mm;

const MM_PER_INCH: f64 = 25.4;
const PT_PER_INCH: f64 = 72.0;

/// Creates a `genpdf` length from a raw millimetre value.
pub fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

/// Extracts the raw millimetre value of a `genpdf` length.
pub fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

pub fn pt_to_mm(pt: f64) -> f64 {
    pt * MM_PER_INCH / PT_PER_INCH
}

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_INCH / MM_PER_INCH
}

/// Converts a point length straight into a `genpdf` length.
pub fn mm_from_pt(pt: f64) -> Mm {
    mm_from_f64(pt_to_mm(pt))
}

/// Converts a `genpdf` length into points.
pub fn pt_from_mm(value: Mm) -> f64 {
    mm_to_pt(mm_to_f64(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_inch_round_trips() {
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-9);
        assert!((pt_to_mm(72.0) - 25.4).abs() < 1e-9);
    }
}
