//! Data line decoding.
//!
//! A line looks like `;  225 ;  84 ; 10570 ; 52.37 ; 47.02 ; ... ;\r\n`:
//! three integer pulse counters followed by seven temperatures. Headers,
//! lines cut mid-frame and binary noise are all rejected; no partial
//! sample is ever produced.

use crate::error::ParseError;
use crate::sample::{FIELD_COUNT, RawSample};

const TRIM: &[char] = &[';', ' ', '\r', '\n'];

/// Decode one raw line. Pure: no I/O, no logging.
pub fn parse_line(bytes: &[u8]) -> Result<RawSample, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidEncoding)?;
    let fields: Vec<&str> = text.trim_matches(TRIM).split(';').collect();
    if fields.len() != FIELD_COUNT {
        return Err(ParseError::FieldCountMismatch);
    }

    let int = |i: usize| -> Result<u64, ParseError> {
        fields[i]
            .trim()
            .parse::<u64>()
            .map_err(|_| ParseError::FieldTypeMismatch)
    };
    let real = |i: usize| -> Result<f64, ParseError> {
        fields[i]
            .trim()
            .parse::<f64>()
            .ok()
            // `nan` and `inf` are what the firmware prints for a faulty probe.
            .filter(|v| v.is_finite())
            .ok_or(ParseError::FieldTypeMismatch)
    };

    Ok(RawSample {
        used_water_ticks: int(0)?,
        solar_loop_ticks: int(1)?,
        aux_heater_ticks: int(2)?,
        tank_top_c: real(3)?,
        tank_bottom_c: real(4)?,
        hot_water_c: real(5)?,
        cold_water_c: real(6)?,
        panel_out_c: real(7)?,
        exchanger_in_c: real(8)?,
        exchanger_out_c: real(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_padded_line() {
        let line = b";    225   ;   84    ;    10570  ;       52.37   ;     47.02   ;     43.94   ;     37.66   ;     18.15   ;     48.62   ;     47.08   ;       \r\n";
        let s = parse_line(line).expect("valid line");
        assert_eq!(s.pulses(), [225, 84, 10570]);
        assert_eq!(s.tank_top_c, 52.37);
        assert_eq!(s.exchanger_out_c, 47.08);
    }

    #[test]
    fn interior_empty_field_is_a_type_error() {
        let line = b"1;2;3;;5;6;7;8;9;10\n";
        assert_eq!(parse_line(line), Err(ParseError::FieldTypeMismatch));
    }

    #[test]
    fn faulty_probe_reading_is_a_type_error() {
        let line = b";0;0;0;52;47;44;15;18;nan;47;\r\n";
        assert_eq!(parse_line(line), Err(ParseError::FieldTypeMismatch));
    }
}
