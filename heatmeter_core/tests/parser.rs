use heatmeter_core::{ParseError, RawSample, parse_line};
use proptest::prelude::*;
use rstest::rstest;

const HEADER: &[u8] = b";  D1 Impuls et Volume (L)  ;    D2 Impuls et Volume (l)  ;  S1 H ballon (\xc2\xb0C) ; S2 B ballon (\xc2\xb0C) ;  S3 Sortie ballon(\xc2\xb0C) ;  S4 Eau froide (\xc2\xb0C) ;  S5 sortie Panneaux(\xc2\xb0C) ; Entrer Echang (\xc2\xb0C) ; Sortie Echang(\xc2\xb0C)\r\n";

// Typical line read when connecting mid-frame
const CORRUPTED: &[u8] = b";     52.37   ;     46.52   ;     22.83   ;     58.89   ;     57.05   ;       6478  ;  3239       ;       63.20   ;     56.12   ;     52.37   ;     46.52   ;     22.83   ;     58.89   ;     57.05   ;\r\n";

#[test]
fn returns_parsed_data_in_schema_order() {
    let line = b";    225   ;   84    ;    10570  ;       52.37   ;     47.02   ;     43.94   ;     37.66   ;     18.15   ;     48.62   ;     47.08   ;       \r\n";
    let expected = RawSample {
        used_water_ticks: 225,
        solar_loop_ticks: 84,
        aux_heater_ticks: 10570,
        tank_top_c: 52.37,
        tank_bottom_c: 47.02,
        hot_water_c: 43.94,
        cold_water_c: 37.66,
        panel_out_c: 18.15,
        exchanger_in_c: 48.62,
        exchanger_out_c: 47.08,
    };
    assert_eq!(parse_line(line), Ok(expected));
}

#[rstest]
#[case::header(HEADER, ParseError::FieldCountMismatch)]
#[case::corrupted(CORRUPTED, ParseError::FieldCountMismatch)]
#[case::invalid_unicode(b"\x80\x81", ParseError::InvalidEncoding)]
#[case::text(b"Invalid data\r\n", ParseError::FieldCountMismatch)]
#[case::empty(b"", ParseError::FieldCountMismatch)]
#[case::truncated(b";  225 ; 84 ; 10570 ; 52.37 ; 47.02 ;", ParseError::FieldCountMismatch)]
#[case::float_pulse(b"1.5;2;3;4;5;6;7;8;9;10\r\n", ParseError::FieldTypeMismatch)]
#[case::negative_pulse(b"-1;2;3;4;5;6;7;8;9;10\r\n", ParseError::FieldTypeMismatch)]
#[case::text_temperature(b"1;2;3;4;5;6;7;8;9;hot\r\n", ParseError::FieldTypeMismatch)]
#[case::nan_temperature(b";0;0;0;52;47;44;15;18;nan;47;\r\n", ParseError::FieldTypeMismatch)]
#[case::inf_temperature(b";0;0;0;52;47;44;15;18;inf;47;\r\n", ParseError::FieldTypeMismatch)]
#[case::negative_inf_temperature(b";0;0;0;-inf;47;44;15;18;40;47;\r\n", ParseError::FieldTypeMismatch)]
#[case::infinity_temperature(b";0;0;0;52;47;44;15;infinity;40;47;\r\n", ParseError::FieldTypeMismatch)]
fn rejects_malformed_lines(#[case] line: &[u8], #[case] expected: ParseError) {
    assert_eq!(parse_line(line), Err(expected));
}

#[test]
fn failure_labels_are_stable() {
    assert_eq!(ParseError::InvalidEncoding.to_string(), "invalid-encoding");
    assert_eq!(ParseError::FieldCountMismatch.to_string(), "field-count-mismatch");
    assert_eq!(ParseError::FieldTypeMismatch.to_string(), "field-type-mismatch");
}

fn format_line(pulses: &[u64; 3], temps: &[f64; 7]) -> String {
    let mut out = String::from(";");
    for p in pulses {
        out.push_str(&format!("  {p}  ;"));
    }
    for t in temps {
        out.push_str(&format!("  {t}  ;"));
    }
    out.push_str("\r\n");
    out
}

proptest! {
    #[test]
    fn well_formed_lines_round_trip(
        pulses in proptest::array::uniform3(0u64..10_000_000),
        temps in proptest::array::uniform7(-40.0f64..150.0),
    ) {
        let line = format_line(&pulses, &temps);
        let s = parse_line(line.as_bytes()).expect("well-formed line");
        prop_assert_eq!(s.pulses(), pulses);
        let got = [
            s.tank_top_c, s.tank_bottom_c, s.hot_water_c, s.cold_water_c,
            s.panel_out_c, s.exchanger_in_c, s.exchanger_out_c,
        ];
        prop_assert_eq!(got, temps);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = parse_line(&bytes);
    }

    #[test]
    fn wrong_field_count_is_rejected(n in 0usize..30) {
        prop_assume!(n != 10);
        let line = vec!["1"; n].join(";");
        let got = parse_line(line.as_bytes());
        prop_assert_eq!(got, Err(ParseError::FieldCountMismatch));
    }
}
