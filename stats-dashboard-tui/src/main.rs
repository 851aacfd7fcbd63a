/// Stats Dashboard TUI
///
/// Polls the processing service and the anomaly detector, then draws the
/// latest stats and the latest buy/sell anomalies. Set `DASHBOARD_HEADLESS=1`
/// to log every view change instead of drawing.
use std::{
    error::Error,
    fs::OpenOptions,
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use stats_dashboard::{
    project, DashboardConfig, HttpSource, IntervalTicker, PollScheduler, ViewModel, ViewState,
};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod widget;

use widget::{render_dashboard, Header};

/// How long to wait for keyboard input before checking the view again
const INPUT_POLL: Duration = Duration::from_millis(250);

/// Get headless mode from DASHBOARD_HEADLESS env var (default: off)
fn is_headless() -> bool {
    std::env::var("DASHBOARD_HEADLESS")
        .map(|value| matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Get log file from DASHBOARD_LOG_FILE env var (default: stats-dashboard.log)
fn get_log_file() -> String {
    std::env::var("DASHBOARD_LOG_FILE").unwrap_or_else(|_| "stats-dashboard.log".to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let headless = is_headless();
    init_logging(headless)?;

    let config = DashboardConfig::from_env();
    let source = Arc::new(HttpSource::new(&config)?);
    info!(
        stats_url = %source.stats_url(),
        anomalies_url = %config.anomalies_url,
        poll_period_ms = config.poll_period.as_millis() as u64,
        first_tick = ?config.first_tick,
        "starting stats dashboard"
    );

    let view = ViewModel::new(config.monitored.clone());
    let view_rx = view.subscribe();
    let ticker = IntervalTicker::new(config.poll_period, config.first_tick);
    let handle = PollScheduler::new(source, view, ticker).start();

    let result = if headless {
        run_headless(view_rx).await
    } else {
        let header = Header {
            stats_url: config.stats_url.clone(),
            anomalies_url: config.anomalies_url.clone(),
            poll_period: config.poll_period,
        };
        tokio::task::block_in_place(|| run_terminal(view_rx, &header))
    };

    handle.stop().await;
    info!("stats dashboard stopped");
    result
}

/// Restores the terminal when dropped, on both the `Ok` and `Err` paths
struct TerminalGuard<B: Backend> {
    terminal: Terminal<B>,
    restore: fn(),
}

impl TerminalGuard<CrosstermBackend<io::Stdout>> {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(error) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            let _ = disable_raw_mode();
            return Err(error);
        }

        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self {
                terminal,
                restore: restore_terminal,
            }),
            Err(error) => {
                restore_terminal();
                Err(error)
            }
        }
    }
}

impl<B: Backend> Drop for TerminalGuard<B> {
    fn drop(&mut self) {
        (self.restore)();
        let _ = self.terminal.show_cursor();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

fn run_terminal(
    mut view_rx: watch::Receiver<ViewState>,
    header: &Header,
) -> Result<(), Box<dyn Error>> {
    // Setup panic hook to restore terminal on crash
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        original_hook(panic_info);
    }));

    let mut guard = TerminalGuard::enter()?;

    let mut dirty = true;
    loop {
        if view_rx.has_changed().unwrap_or(false) {
            dirty = true;
        }

        if dirty {
            let view = project(&view_rx.borrow_and_update());
            guard
                .terminal
                .draw(|f| render_dashboard(f, &view, header))?;
            dirty = false;
        }

        if event::poll(INPUT_POLL)? {
            match event::read()? {
                Event::Key(key) => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    _ => {}
                },
                Event::Resize(..) => dirty = true,
                _ => {}
            }
        }
    }

    Ok(())
}

async fn run_headless(mut view_rx: watch::Receiver<ViewState>) -> Result<(), Box<dyn Error>> {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let lines = project(&view_rx.borrow_and_update()).lines();
                info!(view = %lines.join(" | "), "view updated");
            }
            _ = &mut shutdown => {
                info!("received Ctrl-C, shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Initialize logging
///
/// The TUI owns the terminal, so logs go to a file unless running headless.
fn init_logging(headless: bool) -> io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if headless {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(get_log_file())?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static RESTORED: AtomicUsize = AtomicUsize::new(0);

    fn count_restore() {
        RESTORED.fetch_add(1, Ordering::SeqCst);
    }

    fn failing_draw_loop(mut guard: TerminalGuard<TestBackend>) -> io::Result<()> {
        guard.terminal.draw(|_| {})?;
        Err(io::Error::other("terminal went away"))
    }

    #[test]
    fn test_terminal_restored_when_loop_errors() {
        let guard = TerminalGuard {
            terminal: Terminal::new(TestBackend::new(20, 5)).unwrap(),
            restore: count_restore,
        };

        let before = RESTORED.load(Ordering::SeqCst);
        assert!(failing_draw_loop(guard).is_err());
        assert_eq!(RESTORED.load(Ordering::SeqCst), before + 1);
    }
}
