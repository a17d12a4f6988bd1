//! Integration tests for pattern parsing

use blink_sequencer::pattern::element_count;
use blink_sequencer::{LedError, Pattern, parse_light_mode};

#[test]
fn parses_alternating_durations() {
    let steps = parse_light_mode::<8>("100,200,100,200").unwrap();
    assert_eq!(steps.as_slice(), &[100, 200, 100, 200]);
}

#[test]
fn trailing_comma_adds_no_element() {
    let steps = parse_light_mode::<8>("100,200,").unwrap();
    assert_eq!(steps.as_slice(), &[100, 200]);
}

#[test]
fn count_matches_separators_for_any_text() {
    for text in ["5", "5,6", "5,6,7", "5,,7", "5,6,7,", ",", ",,", "a,b,c"] {
        let separators = text.matches(',').count();
        let expected = if text.ends_with(',') { separators } else { separators + 1 };
        assert_eq!(element_count(text), expected, "{text:?}");
        assert_eq!(parse_light_mode::<8>(text).unwrap().len(), expected, "{text:?}");
    }
}

#[test]
fn empty_text_is_invalid() {
    assert_eq!(parse_light_mode::<8>(""), Err(LedError::InvalidPattern));
}

#[test]
fn lone_comma_is_a_single_zero() {
    let steps = parse_light_mode::<8>(",").unwrap();
    assert_eq!(steps.as_slice(), &[0]);
}

#[test]
fn non_numeric_segments_become_zero() {
    let steps = parse_light_mode::<8>("100,off,,-20, 50").unwrap();
    assert_eq!(steps.as_slice(), &[100, 0, 0, 0, 50]);
}

#[test]
fn too_many_elements_is_out_of_memory() {
    assert_eq!(parse_light_mode::<2>("1,2,3"), Err(LedError::OutOfMemory));
    assert!(parse_light_mode::<3>("1,2,3,").is_ok());
}

#[test]
fn parsed_pattern_is_owned() {
    let pattern = Pattern::<4>::parse("10,20").unwrap();
    assert!(pattern.is_owned());
    assert_eq!(pattern.len(), 2);
    assert_eq!(pattern.as_slice(), &[10, 20]);
}
