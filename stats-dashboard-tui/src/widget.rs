//! Ratatui layout for the dashboard view

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};
use stats_dashboard::render::{AnomalyBody, AnomalyPanel, DashboardView, ReadyView};
use std::time::Duration;

const C_BUY: Color = Color::Rgb(100, 220, 100);
const C_SELL: Color = Color::Rgb(220, 100, 100);
const C_DIM: Color = Color::Rgb(120, 120, 120);
const C_BRIGHT: Color = Color::Rgb(220, 220, 220);
const C_ACCENT: Color = Color::Rgb(100, 180, 220);

/// Static facts shown in the frame title
#[derive(Debug, Clone)]
pub struct Header {
    pub stats_url: String,
    pub anomalies_url: String,
    pub poll_period: Duration,
}

pub fn render_dashboard(f: &mut Frame, view: &DashboardView, header: &Header) {
    let block = Block::default()
        .title(" STATS DASHBOARD ")
        .title_bottom(Line::from(vec![
            Span::styled(" stats ", Style::default().fg(C_DIM)),
            Span::styled(header.stats_url.as_str(), Style::default().fg(C_ACCENT)),
            Span::styled("  anomalies ", Style::default().fg(C_DIM)),
            Span::styled(header.anomalies_url.as_str(), Style::default().fg(C_ACCENT)),
            Span::styled(
                format!("  every {}ms  q to quit ", header.poll_period.as_millis()),
                Style::default().fg(C_DIM),
            ),
        ]))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));

    let area = f.area();
    let inner = block.inner(area);
    f.render_widget(block, area);

    match view {
        DashboardView::Error { message } => {
            let paragraph = Paragraph::new(Line::from(Span::styled(
                *message,
                Style::default().fg(C_SELL).add_modifier(Modifier::BOLD),
            )))
            .alignment(Alignment::Center);
            f.render_widget(paragraph, inner);
        }
        DashboardView::Loading { message } => {
            let paragraph = Paragraph::new(Line::from(Span::styled(
                *message,
                Style::default().fg(C_DIM),
            )))
            .alignment(Alignment::Center);
            f.render_widget(paragraph, inner);
        }
        DashboardView::Ready(ready) => render_ready(f, inner, ready),
    }
}

fn render_ready(f: &mut Frame, area: Rect, ready: &ReadyView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(6)])
        .split(area);

    render_stats(f, chunks[0], ready);
    render_anomalies(f, chunks[1], &ready.anomalies);
}

fn render_stats(f: &mut Frame, area: Rect, ready: &ReadyView) {
    let stats = &ready.stats;

    let header = Row::new(["Book Buy", "Book Sell"].map(|title| {
        Cell::from(title).style(Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD))
    }));

    let rows = vec![
        Row::new(vec![
            Cell::from(stats.num_buy.as_str()).style(Style::default().fg(C_BUY)),
            Cell::from(stats.num_sell.as_str()).style(Style::default().fg(C_SELL)),
        ]),
        Row::new(vec![Cell::from(stats.max_buy_price.as_str())
            .style(Style::default().fg(C_BRIGHT))]),
        Row::new(vec![Cell::from(stats.max_sell_price.as_str())
            .style(Style::default().fg(C_BRIGHT))]),
        Row::new(vec![Cell::from(stats.last_updated.as_str())
            .style(Style::default().fg(C_DIM))]),
    ];

    let table = Table::new(rows, [Constraint::Percentage(50), Constraint::Percentage(50)])
        .header(header)
        .block(
            Block::default()
                .title(" LATEST STATS ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White)),
        );

    f.render_widget(table, area);
}

fn render_anomalies(f: &mut Frame, area: Rect, panels: &[AnomalyPanel]) {
    if panels.is_empty() {
        return;
    }

    let share = 100 / panels.len() as u16;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(panels.iter().map(|_| Constraint::Percentage(share)))
        .split(area);

    for (panel, column) in panels.iter().zip(columns.iter()) {
        render_anomaly_panel(f, *column, panel);
    }
}

fn render_anomaly_panel(f: &mut Frame, area: Rect, panel: &AnomalyPanel) {
    let block = Block::default()
        .title(format!(" {} ", panel.title.to_uppercase()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    let lines = match &panel.body {
        AnomalyBody::Latest {
            uuid,
            description,
            detected,
        } => vec![
            Line::from(Span::styled(uuid.as_str(), Style::default().fg(C_BRIGHT))),
            Line::from(Span::styled(
                description.as_str(),
                Style::default().fg(C_SELL).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(detected.as_str(), Style::default().fg(C_DIM))),
        ],
        AnomalyBody::Empty(message) => vec![Line::from(Span::styled(
            message.as_str(),
            Style::default().fg(C_DIM),
        ))],
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use stats_dashboard::{project, AnomalyKind, StatsSnapshot, Tick, ViewState};

    fn header() -> Header {
        Header {
            stats_url: "http://localhost:8100/stats".to_string(),
            anomalies_url: "http://localhost:8120/anomaly_detector/anomalies".to_string(),
            poll_period: Duration::from_millis(5000),
        }
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_ready_view_draws_stats_and_empty_slots() {
        let mut state = ViewState::new(AnomalyKind::monitored());
        state.apply_stats(
            Tick(1),
            Ok(StatsSnapshot {
                num_buy_events: 5,
                num_sell_events: 3,
                max_buy_price: 10.5,
                max_sell_price: 9.0,
                last_updated: "2024-01-01T00:00:00Z".to_string(),
            }),
        );

        let mut terminal = Terminal::new(TestBackend::new(120, 24)).unwrap();
        terminal
            .draw(|f| render_dashboard(f, &project(&state), &header()))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("# Buy: 5"));
        assert!(text.contains("# Sell: 3"));
        assert!(text.contains("Max Buy Price: 10.5"));
        assert!(text.contains("Max Sell Price: 9.0"));
        assert!(text.contains("No recent low buy anomalies detected."));
    }

    #[test]
    fn test_loading_view_draws_placeholder() {
        let state = ViewState::new(AnomalyKind::monitored());

        let mut terminal = Terminal::new(TestBackend::new(80, 10)).unwrap();
        terminal
            .draw(|f| render_dashboard(f, &project(&state), &header()))
            .unwrap();

        assert!(buffer_text(&terminal).contains("Loading..."));
    }
}
