//! Bots (fleet status board)
//! Queue (pending tasks in dispatch order)
//! History (dispatcher events and notifications)
//! Analytics (fleet metrics)

use std::{
  io,
  sync::mpsc,
  thread,
  time::{Duration, Instant},
};

use crossterm::{
  event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode},
  execute,
  terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
  backend::{Backend, CrosstermBackend},
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Span, Spans},
  widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, Tabs},
  Terminal,
};
use tokio::runtime::Runtime;
use fleetsim::analytics::FleetAnalytics;
use fleetsim::config::Config;
use fleetsim::dispatcher::{dispatch_order, AssignOutcome};
use fleetsim::engine::{spawn_engine, FleetHandle};
use fleetsim::error::FleetError;
use fleetsim::fleet::Fleet;
use fleetsim::models::{AssignmentEvent, BotStatus, EventKind, FleetSnapshot};

#[derive(Clone, Copy)]
enum DashboardTab {
  Bots,
  Queue,
  History,
  Analytics,
}

struct View {
  snapshot: FleetSnapshot,
  history: Vec<AssignmentEvent>,
  analytics: FleetAnalytics,
}

struct App {
  current_tab: DashboardTab,
  view: Option<View>,
  status: String,
}

impl App {
  fn new() -> Self {
    Self {
      current_tab: DashboardTab::Bots,
      view: None,
      status: "Starting fleet engine...".into(),
    }
  }

  fn next_tab(&mut self) {
    self.current_tab = match self.current_tab {
      DashboardTab::Bots => DashboardTab::Queue,
      DashboardTab::Queue => DashboardTab::History,
      DashboardTab::History => DashboardTab::Analytics,
      DashboardTab::Analytics => DashboardTab::Bots,
    }
  }

  fn previous_tab(&mut self) {
    self.current_tab = match self.current_tab {
      DashboardTab::Bots => DashboardTab::Analytics,
      DashboardTab::Queue => DashboardTab::Bots,
      DashboardTab::History => DashboardTab::Queue,
      DashboardTab::Analytics => DashboardTab::History,
    }
  }
}

async fn fetch_view(handle: &FleetHandle) -> Result<View, FleetError> {
  Ok(View {
    snapshot: handle.snapshot().await?,
    history: handle.history().await?,
    analytics: handle.analytics().await?,
  })
}

/// Hands the head of the dispatch queue to the first available bot.
async fn assign_top(handle: &FleetHandle) -> Result<String, FleetError> {
  let snapshot = handle.snapshot().await?;
  let Some(task_id) = dispatch_order(&snapshot.tasks).first().map(|t| t.id) else {
    return Ok("Queue is empty".into());
  };
  Ok(match handle.assign_manually(task_id).await? {
    AssignOutcome::Assigned { task_id, bot_id } => format!("Task {} assigned to bot {}", task_id, bot_id),
    AssignOutcome::NoAvailableBots => "No available bots at the moment".into(),
    other => format!("Assignment skipped: {:?}", other),
  })
}

fn main() -> anyhow::Result<()> {
  let config = Config::from_env()?;
  let rt = Runtime::new()?;
  let handle = {
    let _guard = rt.enter();
    let (handle, _engine) = spawn_engine(Fleet::from_config(&config), config.timings);
    handle
  };

  enable_raw_mode()?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend)?;

  let (tx, rx) = mpsc::channel::<View>();
  {
    let handle = handle.clone();
    let rt_handle = rt.handle().clone();
    thread::spawn(move || loop {
      match rt_handle.block_on(fetch_view(&handle)) {
        Ok(view) => {
          if tx.send(view).is_err() {
            break;
          }
        }
        Err(_) => break,
      }
      thread::sleep(Duration::from_millis(500));
    });
  }

  let mut app = App::new();
  let tick_rate = Duration::from_millis(250);
  let mut last_tick = Instant::now();

  loop {
    if let Ok(view) = rx.try_recv() {
      app.view = Some(view);
    }
    terminal.draw(|f| ui(f, &app))?;

    let timeout = tick_rate
      .checked_sub(last_tick.elapsed())
      .unwrap_or_else(|| Duration::from_secs(0));
    if event::poll(timeout)? {
      if let CEvent::Key(key) = event::read()? {
        let result = match key.code {
          KeyCode::Char('q') => break,
          KeyCode::Right => {
            app.next_tab();
            None
          }
          KeyCode::Left => {
            app.previous_tab();
            None
          }
          KeyCode::Char('a') => Some(rt.block_on(handle.toggle_auto_assign()).map(|on| {
            format!("Auto-assign {}", if on { "ON" } else { "OFF" })
          })),
          KeyCode::Char('r') => Some(rt.block_on(handle.refresh_now()).map(|_| "Bot data refreshed".to_string())),
          KeyCode::Char('m') => Some(rt.block_on(assign_top(&handle))),
          KeyCode::Char('f') => Some(rt.block_on(handle.free_bot()).map(|freed| match freed {
            Some(id) => format!("Freed bot {}", id),
            None => "No busy bot with charge to free".to_string(),
          })),
          _ => None,
        };
        if let Some(result) = result {
          app.status = result.unwrap_or_else(|e| format!("Error: {}", e));
        }
      }
    }
    if last_tick.elapsed() >= tick_rate {
      last_tick = Instant::now();
    }
  }

  rt.block_on(handle.shutdown());
  disable_raw_mode()?;
  execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
  terminal.show_cursor()?;
  Ok(())
}

fn status_color(status: BotStatus) -> Color {
  match status {
    BotStatus::Idle => Color::Yellow,
    BotStatus::Busy => Color::Green,
    BotStatus::Charging => Color::Blue,
    BotStatus::Error => Color::Red,
  }
}

fn kind_color(kind: EventKind) -> Color {
  match kind {
    EventKind::Success => Color::Green,
    EventKind::Warning => Color::Yellow,
    EventKind::Info => Color::Cyan,
  }
}

fn ui<B: Backend>(f: &mut tui::Frame<B>, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .margin(1)
    .constraints([
      Constraint::Length(3),
      Constraint::Min(0),
      Constraint::Length(3),
    ].as_ref())
    .split(f.size());

  let tab_titles = vec!["Bots", "Queue", "History", "Analytics"];
  let title = match &app.view {
    Some(view) => format!(
      "Fleet | auto-assign {} | updated {}",
      if view.snapshot.auto_assign { "ON" } else { "OFF" },
      view.snapshot.last_update.format("%H:%M:%S")
    ),
    None => "Fleet".to_string(),
  };
  let tabs = Tabs::new(
    tab_titles
      .iter()
      .map(|t| Spans::from(Span::styled(*t, Style::default().fg(Color::Yellow))))
      .collect(),
  )
    .block(Block::default().borders(Borders::ALL).title(title))
    .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    .select(match app.current_tab {
      DashboardTab::Bots => 0,
      DashboardTab::Queue => 1,
      DashboardTab::History => 2,
      DashboardTab::Analytics => 3,
    });
  f.render_widget(tabs, chunks[0]);

  match &app.view {
    None => {
      let waiting = Paragraph::new("Waiting for first snapshot...").block(Block::default().borders(Borders::ALL));
      f.render_widget(waiting, chunks[1]);
    }
    Some(view) => match app.current_tab {
      DashboardTab::Bots => render_bots(f, view, chunks[1]),
      DashboardTab::Queue => render_queue(f, view, chunks[1]),
      DashboardTab::History => render_history(f, view, chunks[1]),
      DashboardTab::Analytics => render_analytics(f, view, chunks[1]),
    },
  }

  let footer = Paragraph::new(format!(
    "←/→: Tabs | a: Auto-assign | r: Refresh | m: Assign top task | f: Free bot | q: Quit    {}",
    app.status
  ))
    .style(Style::default().fg(Color::White))
    .block(Block::default().borders(Borders::ALL));
  f.render_widget(footer, chunks[2]);
}

fn render_bots<B: Backend>(f: &mut tui::Frame<B>, view: &View, area: Rect) {
  let rows = view.snapshot.bots.iter().map(|b| {
    Row::new(vec![
      Cell::from(b.id.to_string()),
      Cell::from(b.name.clone()),
      Cell::from(b.status.as_str()).style(Style::default().fg(status_color(b.status))),
      Cell::from(format!("{}%", b.battery)),
      Cell::from(format!("{:.1}", b.speed)),
      Cell::from(b.current_task.clone()),
      Cell::from(b.last_updated.format("%H:%M:%S").to_string()),
    ])
  });
  let table = Table::new(rows)
    .header(
      Row::new(vec!["ID", "Name", "Status", "Battery", "Speed", "Current Task", "Updated"])
        .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title("Bot Status"))
    .widths(&[
      Constraint::Length(4),
      Constraint::Length(10),
      Constraint::Length(10),
      Constraint::Length(8),
      Constraint::Length(6),
      Constraint::Min(20),
      Constraint::Length(9),
    ]);
  f.render_widget(table, area);
}

fn render_queue<B: Backend>(f: &mut tui::Frame<B>, view: &View, area: Rect) {
  let task_items: Vec<ListItem> = dispatch_order(&view.snapshot.tasks).iter().map(|t| {
    ListItem::new(Spans::from(vec![
      Span::styled(format!("TASK-{:04} ", t.id % 10_000), Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
      Span::raw(format!("{:?} | {} | {} min | {}", t.priority, t.route(), t.estimated_time, t.comments)),
    ]))
  }).collect();
  let header = format!(
    "Pending Tasks in Dispatch Order ({} pending, {} bots available)",
    view.analytics.pending_tasks, view.analytics.available_bots
  );
  let tasks_list = List::new(if task_items.is_empty() { vec![ListItem::new(Spans::from(Span::raw("No pending tasks")))] } else { task_items })
    .block(Block::default().borders(Borders::ALL).title(header));
  f.render_widget(tasks_list, area);
}

fn render_history<B: Backend>(f: &mut tui::Frame<B>, view: &View, area: Rect) {
  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
    .split(area);

  let history_items: Vec<ListItem> = view.history.iter().map(|e| {
    ListItem::new(vec![
      Spans::from(vec![
        Span::styled(e.timestamp.format("%H:%M:%S").to_string(), Style::default().fg(kind_color(e.kind))),
        Span::raw(" - "),
        Span::raw(e.message.as_str()),
      ]),
      Spans::from(Span::raw(format!("  bots available: {}, tasks pending: {}", e.bots_available, e.tasks_pending))),
    ])
  }).collect();
  let history_list = List::new(history_items)
    .block(Block::default().borders(Borders::ALL).title("Assignment History"));
  f.render_widget(history_list, chunks[0]);

  let note_items: Vec<ListItem> = view.snapshot.notifications.iter().map(|n| {
    ListItem::new(Spans::from(vec![
      Span::styled(n.timestamp.format("%H:%M:%S").to_string(), Style::default().fg(kind_color(n.kind))),
      Span::raw(" - "),
      Span::raw(n.message.as_str()),
    ]))
  }).collect();
  let notes_list = List::new(note_items)
    .block(Block::default().borders(Borders::ALL).title("Notifications"));
  f.render_widget(notes_list, chunks[1]);
}

fn render_analytics<B: Backend>(f: &mut tui::Frame<B>, view: &View, area: Rect) {
  let a = &view.analytics;
  let lines = vec![
    Spans::from(Span::styled("Fleet", Style::default().add_modifier(Modifier::BOLD))),
    Spans::from(Span::raw(format!(
      "Bots: {} total | {} busy | {} idle | {} charging | {} error | {} low battery",
      a.total_bots, a.busy_bots, a.idle_bots, a.charging_bots, a.error_bots, a.low_battery_bots
    ))),
    Spans::from(Span::raw(format!(
      "Avg battery: {}% | Utilization: {}% | Error rate: {}%",
      a.avg_battery, a.bot_utilization, a.error_rate
    ))),
    Spans::from(Span::raw(format!("Avg speed: {:.2} | Avg task time: {} min", a.avg_speed, a.avg_task_time))),
    Spans::from(Span::raw("")),
    Spans::from(Span::styled("Tasks", Style::default().add_modifier(Modifier::BOLD))),
    Spans::from(Span::raw(format!(
      "Queued: {} (High {}, Medium {}, Low {}) | Processed: {} | Completion rate: {}%",
      a.total_tasks, a.priorities.high, a.priorities.medium, a.priorities.low, a.tasks_processed, a.task_completion_rate
    ))),
    Spans::from(Span::raw("")),
    Spans::from(Span::styled("Health", Style::default().add_modifier(Modifier::BOLD))),
  ];
  let health = a.health.iter().map(|h| Spans::from(Span::raw(format!("{:>10}: {:>3}", h.name, h.health_score))));
  let paragraph = Paragraph::new(lines.into_iter().chain(health).collect::<Vec<_>>())
    .block(Block::default().borders(Borders::ALL).title("Analytics"));
  f.render_widget(paragraph, area);
}
