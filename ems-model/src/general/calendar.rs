/// Number of calendar days in a modelled year (leap days are not modelled)
pub const DAYS_PER_YEAR: usize = 365;
/// Number of hourly slots in a day
pub const HOURS_PER_DAY: usize = 24;
/// Number of hourly slots in a modelled year
pub const HOURS_PER_YEAR: usize = DAYS_PER_YEAR * HOURS_PER_DAY;

/// Calendar day (1..=365) containing the given hour of the year (1..=8760)
pub fn day_of_hour(hour_of_year: usize) -> usize {
    hour_of_year.div_ceil(HOURS_PER_DAY)
}

/// Hour of the day (1..=24) of the given hour of the year (1..=8760)
pub fn hour_of_day(hour_of_year: usize) -> usize {
    (hour_of_year - 1) % HOURS_PER_DAY + 1
}

/// Month names and lengths, used for human readable day labels
const MONTHS: [(&str, usize); 12] = [
    ("Jan", 31),
    ("Feb", 28),
    ("Mar", 31),
    ("Apr", 30),
    ("May", 31),
    ("Jun", 30),
    ("Jul", 31),
    ("Aug", 31),
    ("Sep", 30),
    ("Oct", 31),
    ("Nov", 30),
    ("Dec", 31),
];

/// Converts a calendar day (1..=365) to a label like "Feb 3"
pub fn date_label(day: usize) -> String {
    let mut remaining = day.saturating_sub(1);
    for (name, days) in MONTHS {
        if remaining < days {
            return format!("{} {}", name, remaining + 1);
        }
        remaining -= days;
    }
    format!("Day {}", day)
}
