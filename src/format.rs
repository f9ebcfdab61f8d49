use route_search::journey::Journey;
use route_search::time::Duration;

use crate::gtfs::UNKNOWN_ROUTE_NAME;

const RULE: &str = "==================================================";
const THIN_RULE: &str = "--------------------------------------------------";
const TRANSFER_RULE: &str = "  ------------------------------------------------";

/// Render itineraries in the fixed console layout, one block per itinerary
pub fn format_journeys(journeys: &[Journey], start_name: &str, end_name: &str) -> String {
    if journeys.is_empty() {
        return "Keine Route gefunden.".to_owned();
    }
    let mut out: Vec<String> = Vec::new();
    for (index, journey) in journeys.iter().enumerate() {
        let number = index + 1;
        if number > 1 {
            out.push(String::new());
            out.push(RULE.to_owned());
        }
        out.push(RULE.to_owned());
        if journeys.len() > 1 {
            out.push(format!(
                " OptimalRoute.CH | Route {} von {}",
                number,
                journeys.len()
            ));
        } else {
            out.push(" OptimalRoute.CH | Verbindung gefunden".to_owned());
        }
        out.push(RULE.to_owned());
        out.push(format!(
            "Startpunkt: {} ({})",
            start_name,
            journey.departure().hhmm()
        ));
        out.push(format!(
            "Zielpunkt:  {} ({})",
            end_name,
            journey.arrival().hhmm()
        ));
        out.push(format!("GESAMTREISEZEIT: {}", format_total(journey.duration())));
        out.push(THIN_RULE.to_owned());
        let segments = &journey.segments;
        for (position, segment) in segments.iter().enumerate() {
            out.push(format!("  {}. FAHRT", position + 1));
            out.push(format!(
                "     > Abfahrt: {}  | {}",
                segment.board_time.hhmm(),
                segment.board_stop_name
            ));
            out.push(format!(
                "     > Ankunft: {}  | {}",
                segment.alight_time.hhmm(),
                segment.alight_stop_name
            ));
            let line = if segment.route_name.is_empty() {
                UNKNOWN_ROUTE_NAME
            } else {
                segment.route_name.as_str()
            };
            out.push(format!("     > Linie:   {}", line));
            if let Some(next) = segments.get(position + 1) {
                out.push(TRANSFER_RULE.to_owned());
                out.push(format!(
                    "  UMSTIEG: {} ({} Minuten Wartezeit)",
                    segment.alight_stop_name,
                    next.wait.to_mins()
                ));
                out.push(TRANSFER_RULE.to_owned());
            }
        }
        out.push(RULE.to_owned());
    }
    out.join("\n")
}

fn format_total(duration: Duration) -> String {
    let total_minutes = duration.to_mins().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!(
            "{} Stunde{}, {} Minute{}",
            hours,
            if hours > 1 { "n" } else { "" },
            minutes,
            if minutes != 1 { "n" } else { "" }
        )
    } else {
        format!("{} Minute{}", minutes, if minutes != 1 { "n" } else { "" })
    }
}
