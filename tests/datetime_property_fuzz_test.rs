use chrono::{NaiveDate, NaiveDateTime, Timelike};
use parking_forms::{format_local, next_full_hour, parse_local, plus_one_hour};
use proptest::prelude::*;

fn local_datetime_strategy() -> BoxedStrategy<NaiveDateTime> {
    (1990i32..=2099, 1u32..=12, 1u32..=28, 0u32..=23, 0u32..=59)
        .prop_map(|(year, month, day, hour, minute)| {
            NaiveDate::from_ymd_opt(year, month, day)
                .and_then(|date| date.and_hms_opt(hour, minute, 0))
                .expect("strategy yields valid timestamps")
        })
        .boxed()
}

proptest! {
    #[test]
    fn next_full_hour_lands_on_a_whole_hour_strictly_ahead(now in local_datetime_strategy()) {
        let default_start = next_full_hour(now);
        prop_assert_eq!(default_start.minute(), 0);
        prop_assert_eq!(default_start.second(), 0);
        prop_assert!(default_start > now);
        prop_assert!((default_start - now).num_minutes() <= 60);
    }

    #[test]
    fn end_default_is_strictly_after_any_start(start in local_datetime_strategy()) {
        let end = plus_one_hour(start);
        prop_assert!(end > start);
        prop_assert_eq!((end - start).num_minutes(), 60);
    }

    #[test]
    fn formatted_values_have_the_datetime_local_shape(value in local_datetime_strategy()) {
        let formatted = format_local(value);
        prop_assert_eq!(formatted.len(), 16);
        prop_assert_eq!(&formatted[10..11], "T");
        prop_assert_eq!(parse_local(&formatted), Some(value));
    }

    #[test]
    fn arbitrary_text_never_panics_the_parser(raw in ".{0,40}") {
        let _ = parse_local(&raw);
    }
}
