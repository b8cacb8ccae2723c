//! Subcommands of the `studygroup` client and their handlers

use super::render;
use crate::app::App;
use crate::backend::Backend;
use crate::error::AppResult;
use crate::session::{
    format_date_input, format_time_input, DateFilter, Location, SessionFilter, SessionForm,
    SessionId,
};
use clap::{Args, Subcommand};
use std::num::NonZeroU32;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account and sign in
    Signup {
        email: String,
        password: String,
        /// Display name shown as host
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign in to an existing account
    Login { email: String, password: String },
    /// Sign out
    Logout,
    /// Show your profile
    #[command(alias = "profile")]
    Whoami,
    /// Change your display name
    SetName { name: String },
    /// Recent sessions and the ones you host
    Home,
    /// Host a new study session
    Create(SessionArgs),
    /// Browse sessions
    Find {
        /// Match subject, course name or location
        #[arg(short, long, default_value = "")]
        search: String,
        /// all, today, tomorrow, or a DD/MM/YYYY date
        #[arg(short, long, default_value = "all")]
        when: DateFilter,
    },
    /// Sessions you host, or with --attending the ones you joined
    Mine {
        #[arg(short, long)]
        attending: bool,
    },
    /// Show one session
    Show { id: String },
    /// Take a spot in a session
    Join { id: String },
    /// Give up your spot in a session
    Leave { id: String },
    /// Change a session you host
    Edit {
        id: String,
        #[command(flatten)]
        fields: SessionArgs,
    },
    /// Delete a session you host
    Delete {
        id: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Sessions grouped by campus location
    Map,
    /// List campus locations and their short names
    Locations,
}

/// Form fields as command-line flags
#[derive(Debug, Clone, Default, Args)]
pub struct SessionArgs {
    /// Course code, e.g. CSE3MAD
    #[arg(long)]
    pub subject: Option<String>,
    /// Course name
    #[arg(long)]
    pub subject_name: Option<String>,
    /// Location label or short name (see `locations`)
    #[arg(long)]
    pub location: Option<Location>,
    /// Date; digits are grouped as DD/MM/YYYY
    #[arg(long)]
    pub date: Option<String>,
    /// Time; digits are grouped as HH:MM, with AM/PM kept
    #[arg(long)]
    pub time: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Maximum attendees, 0 for unlimited
    #[arg(long)]
    pub limit: Option<u32>,
}

impl SessionArgs {
    /// Overwrite the form fields that were given on the command line
    pub fn apply_to(self, form: &mut SessionForm) {
        if let Some(subject) = self.subject {
            form.subject = subject;
        }
        if let Some(subject_name) = self.subject_name {
            form.subject_name = subject_name;
        }
        if let Some(location) = self.location {
            form.location = Some(location);
        }
        if let Some(date) = self.date {
            form.date = format_date_input(&date);
        }
        if let Some(time) = self.time {
            form.time = format_time_input(&time);
        }
        if let Some(description) = self.description {
            form.description = description;
        }
        if let Some(limit) = self.limit {
            form.attendee_limit = NonZeroU32::new(limit);
        }
    }

    pub fn into_form(self) -> SessionForm {
        let mut form = SessionForm::default();
        self.apply_to(&mut form);
        form
    }
}

fn with_welcome<B: Backend>(app: &mut App<B>, text: String) -> String {
    match app.take_welcome() {
        Some(welcome) => format!("{}\n\n{}", welcome, text),
        None => text,
    }
}

/// Run one command and return what to print
pub async fn run<B: Backend>(app: &mut App<B>, command: Command) -> AppResult<String> {
    match command {
        Command::Signup {
            email,
            password,
            name,
        } => {
            let user = app.sign_up(&email, &password, name.as_deref()).await?;
            let text = format!("Signed up as {}.", user.host_name());
            Ok(with_welcome(app, text))
        }
        Command::Login { email, password } => {
            let user = app.sign_in(&email, &password).await?;
            let text = format!("Signed in as {}.", user.host_name());
            Ok(with_welcome(app, text))
        }
        Command::Logout => {
            app.sign_out().await?;
            Ok("Signed out.".to_string())
        }
        Command::Whoami => Ok(render::profile(&app.profile().await?)),
        Command::SetName { name } => {
            let user = app.update_display_name(&name).await?;
            Ok(format!("Display name set to {}.", user.profile_name()))
        }
        Command::Home => {
            let text = render::home(&app.home().await?);
            Ok(with_welcome(app, text))
        }
        Command::Create(fields) => {
            let created = app.create_session(fields.into_form()).await?;
            let mut text = format!("Created session {}.", created.id);
            if let Some(milestone) = created.milestone {
                text.push('\n');
                text.push_str(milestone);
            }
            Ok(text)
        }
        Command::Find { search, when } => {
            let found = app.find_sessions(&SessionFilter::new(search, when)).await?;
            Ok(render::sessions(&found))
        }
        Command::Mine { attending } => {
            Ok(render::my_sessions(&app.my_sessions().await?, attending))
        }
        Command::Show { id } => {
            let view = app.session_details(&SessionId::new(id)).await?;
            Ok(render::details(&view))
        }
        Command::Join { id } => {
            let current = app.session_details(&SessionId::new(id)).await?;
            let view = app.join_session(&current.session).await?;
            Ok(render::details(&view))
        }
        Command::Leave { id } => {
            let current = app.session_details(&SessionId::new(id)).await?;
            let view = app.leave_session(&current.session).await?;
            Ok(render::details(&view))
        }
        Command::Edit { id, fields } => {
            let id = SessionId::new(id);
            let current = app.session_details(&id).await?;
            let mut form = SessionForm::from_session(&current.session);
            fields.apply_to(&mut form);
            let session = app.edit_session(&id, form).await?;
            Ok(format!("Updated session {}.", session.id))
        }
        Command::Delete { id, yes } => {
            if !yes {
                return Ok(format!(
                    "Not deleted. Run `delete {} --yes` to delete this session.",
                    id
                ));
            }
            let id = SessionId::new(id);
            app.delete_session(&id).await?;
            Ok(format!("Deleted session {}.", id))
        }
        Command::Map => Ok(render::campus_map(&app.campus_map().await?)),
        Command::Locations => Ok(render::locations()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_format_date_and_time() {
        let form = SessionArgs {
            subject: Some("CSE3MAD".to_string()),
            date: Some("12122025".to_string()),
            time: Some("0500pm".to_string()),
            limit: Some(0),
            ..Default::default()
        }
        .into_form();

        assert_eq!(form.subject, "CSE3MAD");
        assert_eq!(form.date, "12/12/2025");
        assert_eq!(form.time, "05:00 PM");
        assert_eq!(form.attendee_limit, None);
        assert_eq!(form.location, None);
    }

    #[test]
    fn test_args_overlay_keeps_unset_fields() {
        let mut form = SessionForm {
            subject: "CSE3MAD".to_string(),
            location: Some(Location::Agora),
            attendee_limit: NonZeroU32::new(4),
            ..Default::default()
        };
        SessionArgs {
            location: Some(Location::LearningCommons),
            ..Default::default()
        }
        .apply_to(&mut form);

        assert_eq!(form.subject, "CSE3MAD");
        assert_eq!(form.location, Some(Location::LearningCommons));
        assert_eq!(form.attendee_limit, NonZeroU32::new(4));
    }
}
