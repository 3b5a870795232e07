use prettytable::{Cell, Row, Table};
use std::fmt::Write as _;
use std::str::FromStr;

use crate::models::{ModerationStatus, Video};
use crate::permissions::{backup_link_visible, RoleTable};
use crate::user_models::{MemberApplication, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Card,
    List,
    Table,
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "card" => Ok(ViewMode::Card),
            "list" => Ok(ViewMode::List),
            "table" => Ok(ViewMode::Table),
            other => Err(format!("Unknown view '{}'. Use card, list or table", other)),
        }
    }
}

fn featured_mark(video: &Video) -> &'static str {
    if video.status == ModerationStatus::Featured {
        "⭐ "
    } else {
        ""
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

/// Renders a public listing. Backup links appear only for sessions that may
/// download.
pub fn render_videos(
    videos: &[Video],
    mode: ViewMode,
    roles: &RoleTable,
    session: Option<&Session>,
) -> String {
    match mode {
        ViewMode::Card => render_cards(videos, roles, session),
        ViewMode::List => render_list(videos, roles, session),
        ViewMode::Table => render_table(videos, roles, session),
    }
}

fn render_cards(videos: &[Video], roles: &RoleTable, session: Option<&Session>) -> String {
    let mut out = String::new();
    for (i, video) in videos.iter().enumerate() {
        let c = &video.content;
        let _ = writeln!(out, "{}. {}🎬 {}", i + 1, featured_mark(video), c.title);
        let _ = writeln!(out, "   🆔 ID: {}", video.id);
        let _ = writeln!(out, "   🏷️  {}", or_dash(&c.categories.to_field_string()));
        if let Some(minutes) = c.duration_minutes {
            let _ = writeln!(out, "   ⏱️  {} min", minutes);
        }
        if !c.grades.is_empty() {
            let _ = writeln!(out, "   🎓 {}", c.grades);
        }
        if !c.summary.is_empty() {
            let _ = writeln!(out, "   📝 {}", c.summary);
        }
        let _ = writeln!(out, "   ▶️  {}", or_dash(c.watch_link()));
        if let Some(backup) = backup_link_visible(roles, session, video) {
            let _ = writeln!(out, "   💾 {}", backup);
        }
        out.push('\n');
    }
    out
}

fn render_list(videos: &[Video], roles: &RoleTable, session: Option<&Session>) -> String {
    let mut out = String::new();
    for video in videos {
        let c = &video.content;
        let _ = write!(
            out,
            "[{}] {}{} | {} | {}",
            video.id,
            featured_mark(video),
            c.title,
            or_dash(&c.categories.to_field_string()),
            or_dash(c.watch_link()),
        );
        if let Some(backup) = backup_link_visible(roles, session, video) {
            let _ = write!(out, " | 💾 {}", backup);
        }
        out.push('\n');
    }
    out
}

fn render_table(videos: &[Video], roles: &RoleTable, session: Option<&Session>) -> String {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Title"),
        Cell::new("Categories"),
        Cell::new("Minutes"),
        Cell::new("Grades"),
        Cell::new("Link"),
        Cell::new("Download"),
    ]));

    for video in videos {
        let c = &video.content;
        let title = format!("{}{}", featured_mark(video), c.title);
        let minutes = c
            .duration_minutes
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());
        let backup = backup_link_visible(roles, session, video).unwrap_or("-");
        table.add_row(Row::new(vec![
            Cell::new(&video.id.to_string()),
            Cell::new(&title),
            Cell::new(or_dash(&c.categories.to_field_string())),
            Cell::new(&minutes),
            Cell::new(or_dash(&c.grades.to_field_string())),
            Cell::new(or_dash(c.watch_link())),
            Cell::new(backup),
        ]));
    }

    table.to_string()
}

pub fn render_admin(videos: &[Video]) -> String {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Title"),
        Cell::new("Status"),
        Cell::new("Uploader"),
        Cell::new("Backup"),
        Cell::new("Next"),
    ]));

    for video in videos {
        let next: Vec<&str> = video
            .status
            .available_transitions()
            .iter()
            .map(|s| s.as_wire())
            .collect();
        table.add_row(Row::new(vec![
            Cell::new(&video.id.to_string()),
            Cell::new(&video.content.title),
            Cell::new(video.status.as_wire()),
            Cell::new(video.uploader_email.as_deref().unwrap_or("-")),
            Cell::new(video.content.backup_link.as_deref().unwrap_or("-")),
            Cell::new(&next.join(" / ")),
        ]));
    }

    table.to_string()
}

pub fn render_applications(applications: &[MemberApplication]) -> String {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Name"),
        Cell::new("Email"),
        Cell::new("School"),
        Cell::new("Requested role"),
        Cell::new("Applied"),
    ]));

    for app in applications {
        let applied = app
            .applied_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(Row::new(vec![
            Cell::new(&app.name),
            Cell::new(&app.email),
            Cell::new(app.school.as_deref().unwrap_or("-")),
            Cell::new(app.role.as_wire()),
            Cell::new(&applied),
        ]));
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MultiValue, VideoContent};
    use crate::user_models::{Role, User};

    fn video() -> Video {
        Video {
            id: 5,
            content: VideoContent {
                title: "網路交友停看聽".into(),
                link: "https://youtu.be/a".into(),
                backup_link: Some("https://drive.example/a".into()),
                categories: MultiValue::parse("網路交友,街頭訪問"),
                duration_minutes: Some(8),
                ..Default::default()
            },
            uploader_email: None,
            status: ModerationStatus::Featured,
        }
    }

    fn member() -> Session {
        Session {
            token: "t".into(),
            user: User {
                name: "n".into(),
                email: "d@x.com".into(),
                school: None,
                role: Role::DownloadMember,
            },
        }
    }

    #[test]
    fn anonymous_views_hide_backup_link() {
        let roles = RoleTable::default();
        for mode in [ViewMode::Card, ViewMode::List, ViewMode::Table] {
            let out = render_videos(&[video()], mode, &roles, None);
            assert!(out.contains("網路交友停看聽"));
            assert!(!out.contains("drive.example"), "{:?} leaked backup link", mode);
        }
    }

    #[test]
    fn members_see_backup_link() {
        let out = render_videos(&[video()], ViewMode::List, &RoleTable::default(), Some(&member()));
        assert!(out.contains("https://drive.example/a"));
        assert!(out.starts_with("[5] ⭐ "));
    }

    #[test]
    fn admin_view_lists_next_moves() {
        let out = render_admin(&[video()]);
        assert!(out.contains("精選"));
        assert!(out.contains("待審"));
    }

    #[test]
    fn view_mode_parses() {
        assert_eq!("TABLE".parse::<ViewMode>().unwrap(), ViewMode::Table);
        assert!("grid".parse::<ViewMode>().is_err());
    }
}
