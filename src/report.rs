use std::fmt::Write;

use crate::models::ArtistCrossings;

pub fn build_report(threshold: i64, results: &[ArtistCrossings]) -> String {
    let mut output = String::new();

    let crossed: Vec<&ArtistCrossings> = results
        .iter()
        .filter(|result| !result.crossings.is_empty())
        .collect();
    let total: usize = crossed.iter().map(|result| result.crossings.len()).sum();

    let _ = writeln!(output, "# Metric Crossings Report");
    let _ = writeln!(output, "Threshold: {threshold}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(
        output,
        "- {} of {} artists crossed the threshold ({} crossings in total)",
        crossed.len(),
        results.len(),
        total
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Crossings by Artist");

    if crossed.is_empty() {
        let _ = writeln!(output, "No artist crossed this threshold.");
    } else {
        for result in crossed {
            let dates: Vec<String> = result.crossings.iter().map(|d| d.to_string()).collect();
            let _ = writeln!(output, "- artist {}: {}", result.artist_id, dates.join(", "));
        }
    }

    output
}
