use time::OffsetDateTime;

const MINUTES_IN_DAY: i64 = 1440;
const MINUTES_IN_MONTH: i64 = 43_200;
const MINUTES_IN_TWO_MONTHS: i64 = 86_400;

/// Up to two upper-cased initials, one per word: "sarah jane johnson" -> "SJ".
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}

/// Relative time with a suffix, bucketed like date-fns `formatDistanceToNow`.
pub fn time_ago(then: OffsetDateTime, now: OffsetDateTime) -> String {
    let elapsed = now - then;
    let distance = distance(elapsed.whole_seconds().abs());

    if elapsed.is_negative() {
        format!("in {distance}")
    } else {
        format!("{distance} ago")
    }
}

fn distance(seconds: i64) -> String {
    let minutes = (seconds + 30) / 60;

    match minutes {
        0 => "less than a minute".to_owned(),
        1 => "1 minute".to_owned(),
        m if m < 45 => format!("{m} minutes"),
        m if m < 90 => "about 1 hour".to_owned(),
        m if m < MINUTES_IN_DAY => format!("about {} hours", rounded(m, 60)),
        m if m < 2520 => "1 day".to_owned(),
        m if m < MINUTES_IN_MONTH => format!("{} days", rounded(m, MINUTES_IN_DAY)),
        m if m < MINUTES_IN_TWO_MONTHS => plural("about", rounded(m, MINUTES_IN_MONTH), "month"),
        m => {
            let months = m / MINUTES_IN_MONTH;
            if months < 12 {
                return format!("{} months", rounded(m, MINUTES_IN_MONTH));
            }

            let years = months / 12;
            match months % 12 {
                0..3 => plural("about", years, "year"),
                3..9 => plural("over", years, "year"),
                _ => plural("almost", years + 1, "year"),
            }
        }
    }
}

fn rounded(value: i64, unit: i64) -> i64 {
    (value + unit / 2) / unit
}

fn plural(prefix: &str, n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{prefix} 1 {unit}")
    } else {
        format!("{prefix} {n} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use time::{macros::datetime, Duration};

    use super::*;

    #[test]
    fn initials_take_first_two_words() {
        assert_eq!(initials("Sarah Johnson"), "SJ");
        assert_eq!(initials("priya"), "P");
        assert_eq!(initials("raj kumar patel"), "RK");
        assert_eq!(initials("  spaced   out  "), "SO");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn time_ago_buckets() {
        let now = datetime!(2025-03-01 12:00 UTC);

        assert_eq!(time_ago(now - Duration::seconds(10), now), "less than a minute ago");
        assert_eq!(time_ago(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(time_ago(now - Duration::minutes(20), now), "20 minutes ago");
        assert_eq!(time_ago(now - Duration::minutes(60), now), "about 1 hour ago");
        assert_eq!(time_ago(now - Duration::hours(5), now), "about 5 hours ago");
        assert_eq!(time_ago(now - Duration::hours(30), now), "1 day ago");
        assert_eq!(time_ago(now - Duration::days(3), now), "3 days ago");
        assert_eq!(time_ago(now - Duration::days(40), now), "about 1 month ago");
        assert_eq!(time_ago(now - Duration::days(100), now), "3 months ago");
        assert_eq!(time_ago(now - Duration::days(370), now), "about 1 year ago");
        assert_eq!(time_ago(now - Duration::days(365 * 2 + 150), now), "over 2 years ago");
    }

    #[test]
    fn future_timestamps_read_forward() {
        let now = datetime!(2025-03-01 12:00 UTC);
        assert_eq!(time_ago(now + Duration::hours(2), now), "in about 2 hours");
    }
}
