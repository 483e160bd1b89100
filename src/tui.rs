use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use haulsim::model::kpi::Kpis;
use haulsim::model::mine_simulation::{Simulation, Snapshot};
use haulsim::model::time::SimulationTime;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};

struct App {
    playing: bool,
    tick_rate: Duration,
    last_tick: Instant,
    title: String,
    status_tab: usize,
    step: SimulationTime,
    horizon: SimulationTime,
    fuel_price: f64,
}

impl App {
    fn finished(&self, sim: &Simulation) -> bool {
        sim.now() >= self.horizon
    }
}

/// Watch a run from time zero to `hours`, advancing `step_hours` per tick
pub fn run(
    sim: &mut Simulation,
    hours: f64,
    step_hours: f64,
    title: String,
) -> Result<(), Box<dyn std::error::Error>> {
    sim.reset();
    sim.start();
    let mut app = App {
        playing: true,
        tick_rate: Duration::from_millis(50),
        last_tick: Instant::now(),
        title,
        status_tab: 0,
        step: SimulationTime::from_hours(step_hours).max(SimulationTime::new(1)),
        horizon: SimulationTime::from_hours(hours),
        fuel_price: sim.config().fuel_price,
    };

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, sim);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    sim: &mut Simulation,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let snapshot = sim.snapshot();
        let kpis = Kpis::compute(sim.log(), &snapshot, app.fuel_price);
        terminal.draw(|f| draw_ui(f, app, &snapshot, &kpis))?;

        let timeout = app
            .tick_rate
            .checked_sub(app.last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let CEvent::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) = event::read()? {
                match code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Char(' ') => app.playing = !app.playing,
                    KeyCode::Char('n') => step_simulation(app, sim),
                    KeyCode::Tab | KeyCode::BackTab => app.status_tab = next_tab(app.status_tab),
                    _ => {}
                }
            }
        }

        if app.last_tick.elapsed() >= app.tick_rate {
            if app.playing {
                step_simulation(app, sim);
                if app.finished(sim) {
                    app.playing = false;
                }
            }
            app.last_tick = Instant::now();
        }
    }
}

fn step_simulation(app: &App, sim: &mut Simulation) {
    if app.finished(sim) {
        return;
    }
    sim.advance_until(step_target(sim.now(), app.step, app.horizon));
}

/// Two tabs, so forward and backward cycling land on the same one
fn next_tab(tab: usize) -> usize {
    (tab + 1) % 2
}

fn step_target(now: SimulationTime, step: SimulationTime, horizon: SimulationTime) -> SimulationTime {
    now.add_secs(step.as_secs()).min(horizon)
}

fn draw_ui(f: &mut ratatui::Frame, app: &App, snapshot: &Snapshot, kpis: &Kpis) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(f.size());

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(14), Constraint::Min(0)].as_ref())
        .split(chunks[0]);

    draw_metrics(f, left[0], app, snapshot, kpis);
    draw_status_tabs(f, left[1], app, snapshot);
    draw_excavator_queues(f, chunks[1], snapshot);
}

fn draw_metrics(f: &mut ratatui::Frame, area: Rect, app: &App, snapshot: &Snapshot, kpis: &Kpis) {
    let playing_text = if app.playing { "Playing" } else { "Paused" };

    let lines = vec![
        Line::from(app.title.clone()),
        Line::from(format!("Mode: {}", playing_text)),
        Line::from(format!(
            "Elapsed: {:.2} / {:.2} h",
            snapshot.time_hours,
            app.horizon.as_hours()
        )),
        Line::from(format!(
            "Weather: {} | Road: {:.2}",
            snapshot.weather, snapshot.mean_road_condition
        )),
        Line::from(format!(
            "Queuing share: {:.1}%",
            kpis.queuing_fraction * 100.0
        )),
        Line::from(format!("Fuel cost: {:.2}/km", kpis.fuel_cost_per_km)),
        Line::from(format!("Utilization: {:.1}%", kpis.utilization * 100.0)),
        Line::from(format!(
            "Hauled: {:.0} t in {} cycles",
            kpis.tonnes_hauled, kpis.cycles_completed
        )),
        Line::from("Controls:"),
        Line::from("  space - play/pause"),
        Line::from("  n     - step once"),
        Line::from("  tab   - switch status tab"),
        Line::from("  q     - quit"),
    ];

    let metrics = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Metrics"))
        .wrap(Wrap { trim: true });

    f.render_widget(metrics, area);
}

fn draw_status_tabs(f: &mut ratatui::Frame, area: Rect, app: &App, snapshot: &Snapshot) {
    let tabs_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let titles = vec![Line::from("Trucks"), Line::from("Excavators")];
    let tabs = Tabs::new(titles)
        .select(app.status_tab)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, tabs_area[0]);

    let lines: Vec<Line> = match app.status_tab {
        0 => snapshot
            .trucks
            .iter()
            .map(|truck| {
                Line::from(format!(
                    "{} -> {}: {} | load {:.0}/{:.0} t | cycles {} | breakdowns {}",
                    truck.id,
                    truck.assigned_excavator,
                    truck.phase.as_str(),
                    truck.current_load,
                    truck.capacity,
                    truck.cycles_completed,
                    truck.breakdowns
                ))
            })
            .collect(),
        _ => snapshot
            .excavators
            .iter()
            .map(|excavator| {
                Line::from(format!(
                    "{}: {} / {} loading | waiting {} | loads {}",
                    excavator.id,
                    excavator.in_service,
                    excavator.capacity,
                    excavator.queue_depth,
                    excavator.admissions
                ))
            })
            .collect(),
    };
    let para = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(para, tabs_area[1]);
}

fn draw_excavator_queues(f: &mut ratatui::Frame, area: Rect, snapshot: &Snapshot) {
    let rows = snapshot.excavators.len().max(1);
    let constraints: Vec<Constraint> = (0..rows).map(|_| Constraint::Length(5)).collect();
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (idx, excavator) in snapshot.excavators.iter().enumerate() {
        if idx >= areas.len() {
            break;
        }
        let assigned = snapshot
            .trucks
            .iter()
            .filter(|truck| truck.assigned_excavator == excavator.id)
            .count();
        let text = vec![
            Line::from(format!("Queue: {} (peak {})", excavator.queue_depth, excavator.peak_queue)),
            Line::from(format!(
                "Loading: {} / {} | trucks assigned: {}",
                excavator.in_service, excavator.capacity, assigned
            )),
            Line::from(format!("Loads started: {}", excavator.admissions)),
        ];
        let block = Block::default()
            .borders(Borders::ALL)
            .title(excavator.id.to_string())
            .style(Style::default().fg(Color::White));
        let para = Paragraph::new(text)
            .style(Style::default().fg(Color::White))
            .block(block);
        f.render_widget(para, areas[idx]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_target_stops_at_horizon() {
        let step = SimulationTime::from_hours(0.05);
        let horizon = SimulationTime::from_hours(1.0);
        assert_eq!(step_target(SimulationTime::ZERO, step, horizon).as_secs(), 180);
        assert_eq!(step_target(SimulationTime::new(3500), step, horizon), horizon);
    }

    #[test]
    fn test_tab_keys_toggle_between_two_tabs() {
        assert_eq!(next_tab(0), 1);
        assert_eq!(next_tab(1), 0);
    }
}
