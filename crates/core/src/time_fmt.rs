// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duration formatting for timing-log records.

use chrono::Duration;

/// Format a duration as `DD:HH:MM:SS.micros`, with a leading `-` for
/// negative values (a dispatch delay can go negative under clock skew).
pub fn format_delta(delta: Duration) -> String {
    let negative = delta < Duration::zero();
    let abs = if negative { -delta } else { delta };

    let total_seconds = abs.num_seconds();
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;
    let micros = abs.subsec_nanos() / 1_000;

    format!(
        "{}{:02}:{:02}:{:02}:{:02}.{:06}",
        if negative { "-" } else { "" },
        days,
        hours,
        minutes,
        seconds,
        micros,
    )
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
