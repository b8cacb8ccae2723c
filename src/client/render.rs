//! Plain-text rendering of each screen

use crate::app::{HomeView, LocationGroup, MySessions, Profile, SessionDetails};
use crate::error::AppError;
use crate::session::{initials, Location, Session};

/// One-glance summary used in every list
pub fn session_card(session: &Session) -> String {
    let joined = match session.attendee_limit {
        Some(limit) => format!("{}/{} joined", session.attendees.len(), limit),
        None => format!("{} joined", session.attendees.len()),
    };
    format!(
        "[{}] {}\n    {} | {}\n    Host: {} | {}",
        session.id,
        session.title(),
        session.location,
        session.when(),
        session.host_display(),
        joined
    )
}

fn session_list(heading: &str, sessions: &[Session], empty: &str) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", heading, sessions.len())];
    if sessions.is_empty() {
        lines.push(format!("  {}", empty));
    }
    for session in sessions {
        lines.push(indent(&session_card(session)));
    }
    lines
}

fn indent(block: &str) -> String {
    block
        .lines()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn sessions(sessions: &[Session]) -> String {
    if sessions.is_empty() {
        return "No sessions found.".to_string();
    }
    sessions
        .iter()
        .map(session_card)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn details(view: &SessionDetails) -> String {
    let session = &view.session;
    let mut lines = vec![
        session.title(),
        format!("Location:    {}", session.location),
        format!("When:        {}", session.when()),
        format!(
            "Host:        [{}] {}{}",
            initials(Some(session.host_display())),
            session.host_display(),
            if view.is_host { " (you)" } else { "" }
        ),
    ];

    if !session.description.is_empty() {
        lines.push(format!("Description: {}", session.description));
    }

    lines.push(match (session.attendee_limit, session.spots_left()) {
        (Some(limit), Some(left)) => format!("Spots:       {} of {} left", left, limit),
        _ => "Spots:       unlimited".to_string(),
    });

    let attending: Vec<_> = session.attending().collect();
    lines.push(format!("Attendees ({}):", attending.len()));
    if attending.is_empty() {
        lines.push("  Nobody has joined yet.".to_string());
    }
    for (n, uid) in attending.iter().enumerate() {
        lines.push(format!("  Attendee {}: [{}] {}", n + 1, initials(Some(uid.as_str())), uid));
    }

    let status = if view.is_host {
        "You are hosting this session."
    } else if view.has_joined {
        "You have joined. Use `leave` to drop out."
    } else if view.is_full {
        "Session full."
    } else {
        "Open. Use `join` to take a spot."
    };
    lines.push(status.to_string());
    lines.join("\n")
}

pub fn home(view: &HomeView) -> String {
    let mut lines = vec![format!("Hi, {}!", view.user.profile_name()), String::new()];
    lines.extend(session_list(
        "Recent sessions",
        &view.recent,
        "No sessions yet.",
    ));
    lines.push(String::new());
    lines.extend(session_list(
        "Hosting",
        &view.hosting,
        "You are not hosting any sessions.",
    ));
    lines.join("\n")
}

pub fn my_sessions(view: &MySessions, attending: bool) -> String {
    let lines = if attending {
        session_list(
            "Attending",
            &view.attending,
            "You have not joined any sessions.",
        )
    } else {
        session_list(
            "Hosting",
            &view.hosting,
            "You are not hosting any sessions.",
        )
    };
    lines.join("\n")
}

pub fn profile(profile: &Profile) -> String {
    format!(
        "[{}] {}\n{}\nHosting: {} | Attending: {}",
        profile.initials, profile.name, profile.email, profile.hosting, profile.attending
    )
}

pub fn campus_map(groups: &[LocationGroup]) -> String {
    let mut lines = Vec::new();
    for group in groups {
        lines.push(format!("{} ({})", group.location, group.sessions.len()));
        for session in &group.sessions {
            lines.push(format!(
                "  [{}] {} | {}",
                session.id,
                session.subject,
                session.when()
            ));
        }
    }
    lines.join("\n")
}

pub fn locations() -> String {
    Location::ALL
        .iter()
        .map(|loc| format!("{:<10} {}", loc.alias(), loc.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The single message shown for a failed operation
pub fn error(err: &AppError) -> String {
    format!("{}: {}", err.title(), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::sample;
    use crate::session::UserId;

    #[test]
    fn test_card_shows_capacity() {
        let card = session_card(&sample(Some(4), &["u1", "u2"]));
        assert!(card.contains("[s1]"));
        assert!(card.contains("2/4 joined"));
        assert!(card.contains("Host: Ada"));
    }

    #[test]
    fn test_details_numbers_attendees_without_host() {
        let session = sample(None, &["host", "u2"]);
        let view = SessionDetails::new(session, Some(&UserId::new("u2")));
        let text = details(&view);
        assert!(text.contains("Attendees (1):"));
        assert!(text.contains("Attendee 1: [U] u2\n"));
        assert!(!text.contains("Attendee 2"));
        assert!(text.contains("You have joined"));
        assert!(text.contains("Spots:       unlimited"));
    }

    #[test]
    fn test_details_full() {
        let view = SessionDetails::new(sample(Some(1), &["u1"]), Some(&UserId::new("u9")));
        let text = details(&view);
        assert!(text.contains("0 of 1 left"));
        assert!(text.ends_with("Session full."));
    }

    #[test]
    fn test_error_line() {
        assert_eq!(
            error(&AppError::MissingFields),
            "Missing Fields: Please fill in all required fields."
        );
    }

    #[test]
    fn test_locations_lists_aliases() {
        let text = locations();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("tlc"));
    }
}
