//! Timestamp helpers for mutation bookkeeping.

use jiff::{Span, Timestamp};

/// Returns the `updated_at` value for a mutation happening now.
///
/// `updated_at` must strictly increase on every mutation even if the wall
/// clock stalls or retreats, so the result is never at or before `previous`.
pub fn next_update_timestamp(previous: Timestamp) -> Timestamp {
    let now = Timestamp::now();
    if now > previous {
        now
    } else {
        previous
            .checked_add(Span::new().microseconds(1))
            .unwrap_or(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_past_a_future_previous_value() {
        let future = Timestamp::now()
            .checked_add(Span::new().seconds(60))
            .unwrap();
        let next = next_update_timestamp(future);
        assert!(next > future);
    }

    #[test]
    fn uses_wall_clock_when_it_moved_on() {
        let past = Timestamp::now()
            .checked_sub(Span::new().seconds(60))
            .unwrap();
        let next = next_update_timestamp(past);
        assert!(next > past);
    }
}
