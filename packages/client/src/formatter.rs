//! Message formatting utilities for client display.

use tourwatch_server::domain::{Coordinates, EmergencyEvent};
use tourwatch_shared::time::timestamp_to_clock_time;

use crate::relevance::NearbyUser;

/// Average city driving speed used for travel estimates
const TRAVEL_SPEED_KMH: f64 = 50.0;

const RULE: &str = "============================================================";

/// `850m`, `4.2km`, `51km`
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.round())
    } else if meters < 10_000.0 {
        format!("{:.1}km", meters / 1000.0)
    } else {
        format!("{}km", (meters / 1000.0).round())
    }
}

/// Driving time at 50 km/h: `5 min`, `1h 12min`, `2h`
pub fn format_travel_time(meters: f64) -> String {
    let minutes = (meters / 1000.0 / TRAVEL_SPEED_KMH * 60.0).round() as u64;
    if minutes < 60 {
        return format!("{} min", minutes);
    }
    let (hours, rest) = (minutes / 60, minutes % 60);
    if rest > 0 {
        format!("{}h {}min", hours, rest)
    } else {
        format!("{}h", hours)
    }
}

/// Google Maps driving directions from `origin` to `destination`
pub fn directions_url(origin: &Coordinates, destination: &Coordinates) -> String {
    format!(
        "https://www.google.com/maps/dir/?api=1&origin={},{}&destination={},{}&travelmode=driving",
        origin.lat(),
        origin.lng(),
        destination.lat(),
        destination.lng()
    )
}

/// The one-line notification for a surfaced SOS; also the dedup key
pub fn sos_notification(sender: &str, distance_meters: f64) -> String {
    format!(
        "EMERGENCY! {} needs help - {} away!",
        sender,
        format_distance(distance_meters)
    )
}

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    pub fn format_connected(connection_id: &str, online: usize, user_name: &str) -> String {
        format!(
            "\n{}\nConnected as '{}' (connection {}), {} online\n{}\n",
            RULE, user_name, connection_id, online, RULE
        )
    }

    /// Format a surfaced SOS alert
    ///
    /// # Arguments
    ///
    /// * `event` - The relayed SOS
    /// * `distance_meters` - Distance from own position
    /// * `own` - Own position, origin of the directions link
    pub fn format_sos_alert(event: &EmergencyEvent, distance_meters: f64, own: &Coordinates) -> String {
        let mut output = String::new();
        output.push_str("\n\n");
        output.push_str(RULE);
        output.push('\n');
        output.push_str(&format!(
            "!!! {}\n",
            sos_notification(event.source_display_name.as_str(), distance_meters)
        ));
        output.push_str(&format!("{}\n", event.message.as_str()));
        output.push_str(&format!(
            "Distance: {} (about {} by car)\n",
            format_distance(distance_meters),
            format_travel_time(distance_meters)
        ));
        if let Some(accuracy) = event.accuracy {
            output.push_str(&format!("Location accuracy: ±{}m\n", accuracy.meters().round()));
        }
        if let Some(phone) = &event.contact.phone {
            output.push_str(&format!("Phone: {}\n", phone));
        }
        if let Some(email) = &event.contact.email {
            output.push_str(&format!("Email: {}\n", email));
        }
        if let Some(at) = event.emitted_at {
            output.push_str(&format!("Raised at {}\n", timestamp_to_clock_time(at.value())));
        }
        output.push_str(&format!("Navigate: {}\n", directions_url(own, &event.position)));
        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format the nearby-user list
    pub fn format_nearby(users: &[NearbyUser], radius_meters: f64) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "\nNearby users (within {}):\n",
            format_distance(radius_meters)
        ));

        if users.is_empty() {
            output.push_str("(No one nearby)\n");
        } else {
            for user in users {
                output.push_str(&format!(
                    "  {} - {} away, last seen {}\n",
                    user.display_name.as_str(),
                    format_distance(user.distance_meters),
                    timestamp_to_clock_time(user.last_seen)
                ));
            }
        }
        output
    }

    /// Format a notice from the client itself (alert flow, errors, hints)
    pub fn format_notice(text: &str) -> String {
        format!("\n* {}\n", text)
    }
}
