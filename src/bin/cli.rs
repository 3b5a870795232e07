use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_library::catalog::{Catalog, CatalogQuery};
use media_library::members::Membership;
use media_library::models::{ModerationStatus, VideoForm};
use media_library::moderation::{filter_tab, AdminTab, ModerationDesk};
use media_library::permissions::Route;
use media_library::render::{render_admin, render_applications, render_videos, ViewMode};
use media_library::session::SessionManager;
use media_library::storage::SessionStore;
use media_library::user_models::{Credentials, RegistrationForm, Role};
use media_library::videos::VideoLibrary;
use media_library::{CatalogClient, Config, Error};

#[derive(Parser)]
#[command(name = "medialib")]
#[command(about = "Browse and manage the media-literacy video library", long_about = None)]
struct Cli {
    #[arg(long, global = true, help = "Catalog service URL (overrides MEDIALIB_API_URL)")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Log in as a member")]
    Login {
        #[arg(short, long, help = "Account email")]
        email: String,

        #[arg(short, long, help = "Password")]
        password: String,
    },

    #[command(about = "Log out")]
    Logout,

    #[command(about = "Show the current member and their permissions")]
    Whoami,

    #[command(about = "Apply for a download-member account")]
    Register {
        #[arg(short, long, help = "Your name")]
        name: String,

        #[arg(short, long, help = "School (optional)")]
        school: Option<String>,

        #[arg(short, long, help = "Email, used to log in")]
        email: String,

        #[arg(short, long, help = "Password, at least 6 characters")]
        password: String,

        #[arg(short, long, help = "Repeat the password")]
        confirm: String,
    },

    #[command(about = "List topic categories")]
    Categories,

    #[command(about = "Browse published videos")]
    Browse {
        #[arg(short, long, help = "Only show this category")]
        category: Option<String>,

        #[arg(short, long, help = "Search titles and content")]
        keyword: Option<String>,

        #[arg(short, long, default_value = "card", help = "card, list or table")]
        view: ViewMode,
    },

    #[command(about = "List videos for moderation")]
    AdminVideos {
        #[arg(short, long, default_value = "pending", help = "pending or all")]
        tab: AdminTab,
    },

    #[command(about = "Submit a new video for review")]
    AddVideo {
        #[command(flatten)]
        fields: VideoFields,
    },

    #[command(about = "Edit a video you uploaded (moderators may edit any)")]
    EditVideo {
        #[arg(long, help = "Video ID")]
        id: i64,

        #[command(flatten)]
        fields: VideoFields,
    },

    #[command(about = "Delete a video you uploaded (moderators may delete any)")]
    DeleteVideo {
        #[arg(long, help = "Video ID")]
        id: i64,
    },

    #[command(about = "Change a video's review status")]
    Moderate {
        #[arg(long, help = "Video ID")]
        id: i64,

        #[arg(long, help = "Target status: approved, featured or pending")]
        to: ModerationStatus,
    },

    #[command(about = "List pending membership applications")]
    Members,

    #[command(about = "Approve a membership application")]
    ApproveMember {
        #[arg(short, long, help = "Applicant email")]
        email: String,

        #[arg(short, long, help = "Role to grant (defaults to the requested role)")]
        role: Option<Role>,
    },

    #[command(about = "Reject a membership application")]
    RejectMember {
        #[arg(short, long, help = "Applicant email")]
        email: String,
    },
}

/// Video form fields. Multi-value fields take `,` `、` or `;` separated
/// values.
#[derive(Args)]
struct VideoFields {
    #[arg(long, help = "影片標題")]
    title: Option<String>,
    #[arg(long, help = "影片連結")]
    link: Option<String>,
    #[arg(long, help = "Drive備份連結 (optional)")]
    backup_link: Option<String>,
    #[arg(long, help = "主題分類")]
    categories: Option<String>,
    #[arg(long, help = "次要標籤 (optional)")]
    tags: Option<String>,
    #[arg(long, help = "時長(分鐘)")]
    duration: Option<String>,
    #[arg(long, help = "適用年級")]
    grades: Option<String>,
    #[arg(long, help = "內容摘要")]
    summary: Option<String>,
    #[arg(long, help = "教學重點")]
    teaching_points: Option<String>,
    #[arg(long, help = "討論問題")]
    discussion: Option<String>,
    #[arg(long, help = "推薦老師 (optional)")]
    recommender: Option<String>,
    #[arg(long, help = "評分 1-5 (optional)")]
    rating: Option<String>,
    #[arg(long, help = "備註 (optional)")]
    notes: Option<String>,
}

impl VideoFields {
    fn apply(self, form: &mut VideoForm) {
        let pairs = [
            (self.title, &mut form.title),
            (self.link, &mut form.link),
            (self.backup_link, &mut form.backup_link),
            (self.categories, &mut form.categories),
            (self.tags, &mut form.tags),
            (self.duration, &mut form.duration_minutes),
            (self.grades, &mut form.grades),
            (self.summary, &mut form.summary),
            (self.teaching_points, &mut form.teaching_points),
            (self.discussion, &mut form.discussion_questions),
            (self.recommender, &mut form.recommender),
            (self.rating, &mut form.rating),
            (self.notes, &mut form.notes),
        ];
        for (value, slot) in pairs {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

struct App {
    config: Config,
    sessions: SessionManager,
}

impl App {
    fn client(&self) -> &CatalogClient {
        self.sessions.client()
    }

    fn videos(&self) -> VideoLibrary {
        VideoLibrary::new(
            self.client().clone(),
            self.config.roles.clone(),
            self.config.features,
        )
    }

    fn membership(&self) -> Membership {
        Membership::new(
            self.client().clone(),
            self.config.roles.clone(),
            self.config.features,
        )
    }

    /// Prints the notice shown to members who open an admin surface without
    /// the moderate capability. Returns false in that case.
    fn admin_allowed(&self) -> bool {
        match self.sessions.current() {
            None => {
                println!("❌ Not logged in");
                println!("💡 Use 'medialib login -e <email> -p <password>' to log in");
                false
            }
            Some(session) if !self.sessions.capabilities().can_moderate => {
                println!("⚠️  Insufficient permissions");
                println!(
                    "   Your account is 「{}」 and can browse and download videos, but cannot open the admin tools.",
                    session.user.role
                );
                false
            }
            Some(_) => true,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(url) = &cli.api_url {
        std::env::set_var("MEDIALIB_API_URL", url);
    }
    let config = Config::from_env().context("Failed to load configuration")?;
    let client = CatalogClient::from_config(&config)?;
    let store = SessionStore::new(&config.session_dir);
    let mut sessions = SessionManager::new(client, store, config.roles.clone());
    sessions.rehydrate();

    let mut app = App { config, sessions };

    match cli.command {
        Commands::Login { email, password } => login(&mut app, email, password).await?,
        Commands::Logout => {
            app.sessions.logout();
            println!("✅ Logged out successfully!");
        }
        Commands::Whoami => whoami(&app),
        Commands::Register {
            name,
            school,
            email,
            password,
            confirm,
        } => {
            let form = RegistrationForm {
                name,
                school: school.unwrap_or_default(),
                email,
                password,
                confirm,
            };
            register(&app, form).await?
        }
        Commands::Categories => categories(&app).await?,
        Commands::Browse {
            category,
            keyword,
            view,
        } => {
            let query = CatalogQuery::new(category.unwrap_or_default(), keyword.unwrap_or_default());
            browse(&app, query, view).await?
        }
        Commands::AdminVideos { tab } => admin_videos(&app, tab).await?,
        Commands::AddVideo { fields } => add_video(&app, fields).await?,
        Commands::EditVideo { id, fields } => edit_video(&app, id, fields).await?,
        Commands::DeleteVideo { id } => delete_video(&app, id).await?,
        Commands::Moderate { id, to } => moderate(&app, id, to).await?,
        Commands::Members => members(&app).await?,
        Commands::ApproveMember { email, role } => approve_member(&app, email, role).await?,
        Commands::RejectMember { email } => reject_member(&app, email).await?,
    }

    Ok(())
}

async fn login(app: &mut App, email: String, password: String) -> Result<()> {
    let credentials = Credentials { email, password };
    let (session, route) = app.sessions.login(&credentials).await?;

    println!("✅ Login successful!");
    println!("👤 Welcome back, {}! ({})", session.user.name, session.user.role);

    match route {
        Route::Admin => println!("\n💡 Use 'medialib admin-videos' to review submissions"),
        Route::Public => println!("\n💡 Use 'medialib browse' to explore the library"),
    }
    Ok(())
}

fn whoami(app: &App) {
    match app.sessions.current() {
        Some(session) => {
            let caps = app.sessions.capabilities();
            let yes_no = |b: bool| if b { "✅" } else { "❌" };
            println!("👤 Logged in as: {} <{}>", session.user.name, session.user.email);
            println!("🎫 Role: {}", session.user.role);
            if let Some(school) = &session.user.school {
                println!("🏫 School: {}", school);
            }
            println!(
                "🔑 Upload {}  Download {}  Moderate {}",
                yes_no(caps.can_upload),
                yes_no(caps.can_download),
                yes_no(caps.can_moderate)
            );
        }
        None => {
            println!("❌ Not logged in");
            println!("💡 Use 'medialib login -e <email> -p <password>' to log in");
        }
    }
}

async fn register(app: &App, form: RegistrationForm) -> Result<()> {
    let message = app.membership().register(&form).await?;
    println!("✅ {}", message);
    println!("📨 Your application for 「{}」 is waiting for approval.", Role::SELF_REGISTERED);
    println!("\n💡 You can log in once a core member approves it");
    Ok(())
}

async fn categories(app: &App) -> Result<()> {
    let categories = app.client().get_categories().await?;
    if categories.is_empty() {
        println!("📭 No categories yet.");
        return Ok(());
    }
    println!("🏷️  Categories:\n");
    for category in categories {
        println!("   • {}", category);
    }
    Ok(())
}

async fn browse(app: &App, query: CatalogQuery, view: ViewMode) -> Result<()> {
    let catalog = Catalog::load(app.client()).await?;
    let videos = catalog.displayed(app.client(), &query).await?;

    if videos.is_empty() {
        println!("📭 No videos match your filters.");
        return Ok(());
    }

    let view = if app.config.features.view_modes {
        view
    } else {
        ViewMode::Card
    };

    println!("\n📚 {} video(s)\n", videos.len());
    print!(
        "{}",
        render_videos(&videos, view, &app.config.roles, app.sessions.current())
    );
    Ok(())
}

async fn admin_videos(app: &App, tab: AdminTab) -> Result<()> {
    if !app.admin_allowed() {
        return Ok(());
    }
    let all = app.client().get_videos(true, None).await?;
    let videos = filter_tab(&all, tab);

    if videos.is_empty() {
        match tab {
            AdminTab::Pending => println!("📭 No videos waiting for review."),
            AdminTab::All => println!("📭 No videos yet."),
        }
        return Ok(());
    }

    println!("\n🛠️  {} video(s)\n", videos.len());
    print!("{}", render_admin(&videos));
    Ok(())
}

async fn add_video(app: &App, fields: VideoFields) -> Result<()> {
    let mut form = VideoForm::default();
    fields.apply(&mut form);

    let video = app.videos().create(app.sessions.current(), &form).await?;

    println!("✅ Video submitted!");
    println!("🎬 Title: {}", video.content.title);
    println!("📊 Status: {}", video.status);
    println!("\n💡 A core member will review it before it is published");
    Ok(())
}

async fn edit_video(app: &App, id: i64, fields: VideoFields) -> Result<()> {
    let library = app.videos();
    let stored = library.find(id).await?;
    let mut form = VideoForm::from_video(&stored);
    fields.apply(&mut form);

    let video = library.update(app.sessions.current(), &stored, &form).await?;
    println!("✅ Video {} updated!", video.id);
    println!("🎬 Title: {}", video.content.title);
    Ok(())
}

async fn delete_video(app: &App, id: i64) -> Result<()> {
    let library = app.videos();
    let video = library.find(id).await?;
    library.delete(app.sessions.current(), &video).await?;
    println!("✅ Deleted 「{}」", video.content.title);
    Ok(())
}

async fn moderate(app: &App, id: i64, target: ModerationStatus) -> Result<()> {
    if !app.admin_allowed() {
        return Ok(());
    }
    let video = app.videos().find(id).await?;
    let desk = ModerationDesk::new(app.client().clone(), app.config.roles.clone());

    match desk.change_status(app.sessions.current(), &video, target).await {
        Ok(reloaded) => {
            println!("✅ 「{}」 is now {}", video.content.title, target);
            let waiting = filter_tab(&reloaded, AdminTab::Pending).len();
            println!("📋 {} video(s) still waiting for review", waiting);
            Ok(())
        }
        Err(Error::ReloadFailed { applied, source, .. }) => {
            println!("✅ 「{}」 is now {}", video.content.title, applied);
            println!("⚠️  The video list could not be refreshed: {}", source);
            Ok(())
        }
        Err(Error::InvalidTransition { from, .. }) => {
            let options: Vec<&str> = from
                .available_transitions()
                .iter()
                .map(|s| s.as_wire())
                .collect();
            anyhow::bail!(
                "Cannot move 「{}」 from {} to {}. Allowed: {}",
                video.content.title,
                from,
                target,
                options.join(", ")
            )
        }
        Err(e) => Err(e.into()),
    }
}

async fn members(app: &App) -> Result<()> {
    if !app.admin_allowed() {
        return Ok(());
    }
    let applications = app.membership().pending(app.sessions.current()).await?;
    if applications.is_empty() {
        println!("📭 No pending applications.");
        return Ok(());
    }
    println!("\n👥 {} pending application(s)\n", applications.len());
    print!("{}", render_applications(&applications));
    Ok(())
}

async fn approve_member(app: &App, email: String, role: Option<Role>) -> Result<()> {
    if !app.admin_allowed() {
        return Ok(());
    }
    let membership = app.membership();
    let session = app.sessions.current();
    let application = membership.find_pending(session, &email).await?;
    let granted = membership.approve(session, &application, role).await?;
    println!("✅ Approved {} <{}> as 「{}」", application.name, application.email, granted);
    Ok(())
}

async fn reject_member(app: &App, email: String) -> Result<()> {
    if !app.admin_allowed() {
        return Ok(());
    }
    let membership = app.membership();
    let session = app.sessions.current();
    let application = membership.find_pending(session, &email).await?;
    membership.reject(session, &application).await?;
    println!("✅ Rejected the application from {} <{}>", application.name, application.email);
    Ok(())
}
