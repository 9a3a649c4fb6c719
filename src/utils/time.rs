/// Splits a total time budget evenly; never less than one second.
pub fn seconds_per_question(total_minutes: u32, question_count: u32) -> u32 {
    if question_count == 0 {
        return total_minutes.saturating_mul(60).max(1);
    }
    (total_minutes.saturating_mul(60) / question_count).max(1)
}

/// `MM:SS`, or `H:MM:SS` from one hour up.
pub fn format_clock(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
