use crate::app::{App, Focus};
use crate::braille;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 24;

/// Max scroll for help content (generous to account for text wrapping on small screens)
pub const HELP_CONTENT_LINES: u16 = 50;

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.fullscreen_mode {
        render_canvas(frame, area, app);
    } else {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(area);

        render_sidebar(frame, layout[0], app);
        render_canvas(frame, layout[1], app);
    }

    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

/// Calculate the canvas size (excluding borders)
pub fn get_canvas_size(frame_area: Rect, fullscreen: bool) -> (u16, u16) {
    if fullscreen {
        (frame_area.width.saturating_sub(2), frame_area.height.saturating_sub(2))
    } else {
        let canvas_width = frame_area.width.saturating_sub(SIDEBAR_WIDTH + 2);
        let canvas_height = frame_area.height.saturating_sub(2);
        (canvas_width, canvas_height)
    }
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),  // Status
            Constraint::Length(12), // Parameters
            Constraint::Min(6),     // Controls
        ])
        .split(area);

    render_status_box(frame, sections[0], app);
    render_params_box(frame, sections[1], app);
    render_controls_box(frame, sections[2], app);
}

fn render_status_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" DLA Lattice ");
    let sim = &app.simulation;

    let (status_text, status_color) = if app.is_busy() {
        ("SIMULATING", Color::Magenta)
    } else if sim.is_finished() {
        ("IDLE", Color::Green)
    } else if app.running {
        ("RUNNING", BORDER_COLOR)
    } else {
        ("PAUSED", HIGHLIGHT_COLOR)
    };

    let (steps, walkers) = match &app.bulk {
        Some(run) => (run.steps, run.walker_count),
        None => (sim.steps(), sim.walkers().len()),
    };
    let stats = sim.cluster().distance_stats();
    let depth = match stats.max {
        Some(max) => format!("{} (mean {:.1})", max, stats.mean),
        None => "-".to_string(),
    };

    let dim = Style::default().fg(DIM_TEXT_COLOR);
    let text = Style::default().fg(TEXT_COLOR);
    let content = vec![
        Line::from(Span::styled(status_text, Style::default().fg(status_color))),
        Line::from(vec![
            Span::styled("Cluster ", dim),
            Span::styled(stats.count.to_string(), text),
        ]),
        Line::from(vec![
            Span::styled("Walkers ", dim),
            Span::styled(walkers.to_string(), text),
        ]),
        Line::from(vec![
            Span::styled("Steps   ", dim),
            Span::styled(steps.to_string(), text),
        ]),
        Line::from(vec![
            Span::styled("Depth   ", dim),
            Span::styled(depth, text),
        ]),
        Line::from(Span::styled(app.status.clone(), dim)),
    ];

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn render_params_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Parameters ");

    let make_line = |label: &str, value: String, focused: bool| {
        let prefix = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(HIGHLIGHT_COLOR)
        } else {
            Style::default().fg(TEXT_COLOR)
        };
        Line::from(Span::styled(format!("{}{}: {}", prefix, label, value), style))
    };

    let settings = &app.settings;

    let content = vec![
        make_line(
            "Brush",
            format!("{}", settings.brush_radius),
            app.focus == Focus::Brush,
        ),
        make_line(
            "Eraser",
            format!("{}", settings.eraser_radius),
            app.focus == Focus::Eraser,
        ),
        make_line(
            "Nbhd",
            settings.neighborhood.name().to_string(),
            app.focus == Focus::Neighborhood,
        ),
        make_line(
            "Rotation",
            format!("{:.0}", settings.square.rotation_degrees),
            app.focus == Focus::Rotation,
        ),
        make_line(
            "Size",
            format!("{}", settings.square.size),
            app.focus == Focus::Size,
        ),
        make_line(
            "Spawn",
            settings.spawn_mode.name().to_string(),
            app.focus == Focus::Spawn,
        ),
        make_line(
            "Speed",
            format!("{}", app.steps_per_frame),
            app.focus == Focus::Speed,
        ),
        make_line(
            "Walkers",
            format!("{}", settings.num_walkers),
            app.focus == Focus::Walkers,
        ),
        make_line(
            "X Off",
            format!("{}", settings.square.x_offset),
            app.focus == Focus::XOffset,
        ),
        make_line(
            "Y Off",
            format!("{}", settings.square.y_offset),
            app.focus == Focus::YOffset,
        ),
    ];

    // Calculate scroll to keep focused item visible based on actual area
    let focus_line = app.focus.line_index();
    let visible_height = area.height.saturating_sub(2); // minus borders
    let content_height = content.len() as u16;

    let scroll = if visible_height == 0 || visible_height >= content_height {
        0 // No scrolling needed
    } else if focus_line >= visible_height {
        // Scroll to show focused line at bottom of visible area
        focus_line.saturating_sub(visible_height - 1)
    } else {
        0 // Focus is within first visible lines
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_controls_box(frame: &mut Frame, area: Rect, app: &App) {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    // Helper to create a control line
    let make_control = |key: &str, desc: String| -> Line<'_> {
        Line::from(vec![
            Span::styled(format!("{:>5}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let mut content = vec![
        make_control("Space", "start/stop".to_string()),
        make_control("S", "spawn walkers".to_string()),
        make_control("F", "run to end".to_string()),
        make_control("B/X", "brush/erase".to_string()),
        make_control("R", "reset".to_string()),
        make_control("H/?", "help".to_string()),
        make_control("Q", "quit".to_string()),
    ];
    if app.is_busy() {
        content.insert(0, make_control("Esc", "cancel run".to_string()));
    }

    let paragraph = Paragraph::new(content).block(styled_block(" Controls "));
    frame.render_widget(paragraph, area);
}

fn render_canvas(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block("");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cursor = (!app.is_busy()).then_some(app.cursor);
    let cells = braille::render_to_braille(
        &app.simulation,
        app.visible_walkers(),
        cursor,
        inner.width,
        inner.height,
    );

    for cell in cells {
        let x = inner.x + cell.x;
        let y = inner.y + cell.y;

        if x < inner.x + inner.width && y < inner.y + inner.height {
            let cell_rect = Rect {
                x,
                y,
                width: 1,
                height: 1,
            };
            let span = Span::styled(cell.char.to_string(), Style::default().fg(cell.color));
            let paragraph = Paragraph::new(Line::from(span));
            frame.render_widget(paragraph, cell_rect);
        }
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    // Calculate the canvas area (exclude sidebar unless fullscreen)
    let canvas_x = if app.fullscreen_mode { 0 } else { SIDEBAR_WIDTH };
    let canvas_width = if app.fullscreen_mode {
        area.width
    } else {
        area.width.saturating_sub(SIDEBAR_WIDTH)
    };

    // Center the help dialog within the canvas
    let help_width = 56.min(canvas_width.saturating_sub(4));
    let help_height = area.height.saturating_sub(4).min(40);
    let x = canvas_x + (canvas_width.saturating_sub(help_width)) / 2;
    let y = (area.height.saturating_sub(help_height)) / 2;

    let help_area = Rect {
        x: area.x + x,
        y: area.y + y,
        width: help_width,
        height: help_height,
    };

    // Clear the background
    frame.render_widget(Clear, help_area);

    let heading = Style::default().fg(HIGHLIGHT_COLOR);
    let item = Style::default().fg(TEXT_COLOR);
    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "DIFFUSION-LIMITED AGGREGATION",
            Style::default().fg(BORDER_COLOR),
        )),
        Line::from(""),
        Line::from(
            "Walkers move one cell per tick until they touch the cluster, then stick to \
             the cell they touched. Colors show distance from the seed along the tree.",
        ),
        Line::from(""),
        Line::from(Span::styled("SIMULATION:", heading)),
        Line::from("Space=Start/stop, S=Spawn walkers, R=Reset to seed"),
        Line::from("F=Run to completion in the background, Esc=Cancel"),
        Line::from(""),
        Line::from(Span::styled("TOOLS:", heading)),
        Line::from("Arrows move the cursor (Shift for 10 cells)"),
        Line::from("B=Brush walkers at the cursor"),
        Line::from("X=Erase branches and walkers at the cursor"),
        Line::from(""),
        Line::from(Span::styled("PARAMETERS:", heading)),
        Line::from("Tab/Shift+Tab select, Up/Down adjust, Esc back to cursor"),
        Line::from(""),
        Line::from(Span::styled("N - Neighborhood", item)),
        Line::from("VonNeumann (4): angular branches"),
        Line::from("Moore (8): natural fractals"),
        Line::from(""),
        Line::from(Span::styled("M - Spawn Mode", item)),
        Line::from("Border: along the lattice edges"),
        Line::from("Square: inside an offset, rotated square"),
        Line::from(""),
        Line::from(Span::styled("OTHER:", heading)),
        Line::from("+/-=Speed, V=Fullscreen, W=Save config, Q=Quit"),
        Line::from(""),
    ];

    let content_height = content.len() as u16;
    let visible_height = help_height.saturating_sub(2); // minus borders
    let max_scroll = content_height.saturating_sub(visible_height);
    let is_scrollable = max_scroll > 0;

    // Update title to show scroll hint if scrollable
    let title = if is_scrollable {
        " Help (J/K scroll, H to close) "
    } else {
        " Help (H to close) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(title);

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}
