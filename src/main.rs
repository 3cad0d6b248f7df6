use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Write};
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;

use droplet_console::api::DropletClient;
use droplet_console::config::Config;
use droplet_console::session::{self, SessionData};
use droplet_console::tui::{self, App, ExitReason};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--init") {
        let path = Config::generate_default()?;
        println!("Generated config file at: {}", path.display());
        println!("Edit it with your Droplet server URL, then run `droplet-console --login <email>`.");
        return Ok(());
    }

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = Config::load().with_context(|| {
        "Failed to load configuration.\n\
         Run `droplet-console --init` to generate a config file,\n\
         or set the DROPLET_URL environment variable."
    })?;

    let _log_guard = init_logging(&config.log_level)?;
    tracing::info!(concat!("Starting droplet-console v", env!("CARGO_PKG_VERSION")));

    if let Some(pos) = args.iter().position(|a| a == "--login") {
        let Some(email) = args.get(pos + 1) else {
            bail!("Usage: droplet-console --login <email>");
        };
        return login(&config, email).await;
    }

    let Some(stored) = session::load_session() else {
        eprintln!("Not logged in. Run `droplet-console --login <email>` first.");
        return Ok(());
    };

    let client = DropletClient::new(&config.server_url)?.with_token(&stored.access_token);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, client.clone(), &stored).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match result {
        Ok(ExitReason::Quit) => {}
        Ok(ExitReason::LoggedOut) => {
            if let Some(refresh) = stored.refresh_token.as_deref() {
                if let Err(e) = client.revoke_token(refresh).await {
                    tracing::warn!("token revoke failed: {e}");
                }
            }
            session::clear_session()?;
            println!("Logged out.");
        }
        Ok(ExitReason::SessionExpired) => {
            session::clear_session()?;
            eprintln!("Session expired. Run `droplet-console --login <email>` to sign in again.");
        }
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
        }
    }

    Ok(())
}

fn print_help() {
    println!("droplet-console - Author and target Droplet announcements from the terminal");
    println!();
    println!("USAGE:");
    println!("  droplet-console                  Start the console");
    println!("  droplet-console --login <email>  Sign in and store the session");
    println!("  droplet-console --init           Generate a default config file");
    println!();
    println!("CONFIG:");
    println!("  File: ~/.config/droplet-console/config.toml");
    println!("  Or set env vars: DROPLET_URL (and optionally DROPLET_LOG)");
    println!();
    println!("KEYBINDINGS:");
    println!("  1 / 2 / Tab       My drops / all drops");
    println!("  j / k / Up / Down Navigate the list");
    println!("  n                 New drop");
    println!("  e / Enter         Edit selected drop");
    println!("  d / Delete        Delete selected drop");
    println!("  r                 Refresh");
    println!("  L                 Log out");
    println!("  q / Ctrl+C        Quit");
    println!();
    println!("EDITOR:");
    println!("  Tab / Shift+Tab   Next / previous field");
    println!("  Left / Right      Choose target type or target");
    println!("  Enter             Add the chosen target");
    println!("  x                 Remove the highlighted target");
    println!("  Ctrl+E            Edit content in $EDITOR");
    println!("  Ctrl+S            Save");
    println!("  Esc               Cancel");
}

/// The terminal belongs to the UI, so logs go to a daily file under the
/// cache directory. The guard must live until exit to flush.
fn init_logging(level: &str) -> Result<Option<WorkerGuard>> {
    let level = Level::from_str(level).with_context(|| format!("Invalid log level '{level}'"))?;
    let Some(dir) = dirs::cache_dir().map(|d| d.join("droplet-console").join("logs")) else {
        return Ok(None);
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(&dir, "droplet-console.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

// ─── Login ──────────────────────────────────────────────────────────────────

async fn login(config: &Config, email: &str) -> Result<()> {
    let password = prompt_password(&format!("Password for {email}: "))?;
    let client = DropletClient::new(&config.server_url)?;
    let response = client
        .login(email, &password)
        .await
        .with_context(|| "Login failed")?;

    let data = SessionData::from(response);
    session::save_session(&data)?;
    tracing::info!(user = %data.user.id, "logged in");
    println!("Logged in as {}.", tui::display_user(&data.user));
    Ok(())
}

fn prompt_password(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    enable_raw_mode()?;
    let result = read_hidden_line();
    disable_raw_mode()?;
    eprintln!();
    result
}

fn read_hidden_line() -> Result<String> {
    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent { code, modifiers, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }
        match code {
            KeyCode::Enter => return Ok(buf),
            KeyCode::Esc => bail!("Login cancelled"),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                bail!("Login cancelled")
            }
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Char(c) => buf.push(c),
            _ => {}
        }
    }
}

// ─── Console loop ───────────────────────────────────────────────────────────

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    client: DropletClient,
    stored: &SessionData,
) -> Result<ExitReason> {
    let mut app = App::new(client, stored.user.clone());
    app.refresh();

    loop {
        app.frame_count = app.frame_count.wrapping_add(1);
        terminal.draw(|f| tui::ui::render(f, &mut app))?;

        if let Some(Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        })) = tui::event::poll_event(Duration::from_millis(100))?
        {
            tui::event::handle_key(&mut app, code, modifiers);
        }

        if !app.running {
            break;
        }

        // ── $EDITOR launch for the content field ──────────────────────
        if app.launch_editor {
            app.launch_editor = false;
            let content = edit_externally(terminal, &app.editor.content)?;
            app.editor.content = content;
        }

        // Apply completed background results without blocking.
        app.poll_tasks();

        if !app.running {
            break;
        }
    }

    Ok(app.exit_reason)
}

/// Suspend the console, open `$VISUAL`/`$EDITOR` on `initial`, and return the
/// edited text. `initial` is returned as-is if the editor fails.
fn edit_externally(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    initial: &str,
) -> Result<String> {
    let tmp_path = std::env::temp_dir().join(format!("droplet-console-{}.txt", std::process::id()));
    std::fs::write(&tmp_path, initial)?;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let editor = std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .unwrap_or_else(|_| "nano".into());

    let status = std::process::Command::new(&editor).arg(&tmp_path).status();
    let edited = match status {
        Ok(s) if s.success() => std::fs::read_to_string(&tmp_path).ok(),
        Ok(s) => {
            tracing::warn!(%editor, "editor exited with {s}");
            None
        }
        Err(e) => {
            tracing::warn!(%editor, "could not launch editor: {e}");
            None
        }
    };
    let _ = std::fs::remove_file(&tmp_path);

    enable_raw_mode()?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    terminal.clear()?;

    Ok(edited
        .map(|text| text.trim_end_matches('\n').to_string())
        .unwrap_or_else(|| initial.to_string()))
}
