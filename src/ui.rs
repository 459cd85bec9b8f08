use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Cell, Gauge, Paragraph, Row, Table, Widget, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use quizzle::{
    question::Difficulty,
    session::{LiveQuestion, SessionState},
    summary::ResultSummary,
};

use crate::{App, Field, Screen};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

/// Cuts `text` to at most `max` terminal columns, marking the cut with an ellipsis.
fn fit(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([Constraint::Min(1), Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        match self.screen {
            Screen::Setup => render_setup(self, chunks[0], buf),
            Screen::Quiz => match self.machine.state() {
                Some(state) => render_quiz(self, state, chunks[0], buf),
                None => Paragraph::new("Starting…").render(chunks[0], buf),
            },
            Screen::Results => {
                if let Some(summary) = &self.summary {
                    render_results(summary, chunks[0], buf);
                }
            }
        }

        if let Some(notice) = &self.notice {
            Paragraph::new(Span::styled(
                fit(notice, chunks[1].width as usize),
                bold().fg(Color::Red),
            ))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
        }

        Paragraph::new(Span::styled(legend(self), Style::default().fg(Color::Gray)))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }
}

fn legend(app: &App) -> &'static str {
    match app.screen {
        Screen::Setup => "(tab) next field  (←/→) change  (enter) start  (f5) reload categories  (esc) quit",
        Screen::Quiz => {
            let resolved = app
                .machine
                .state()
                .and_then(SessionState::current)
                .is_some_and(|q| !q.is_pending());
            let failed = app
                .machine
                .state()
                .is_some_and(|s| s.fetch_error().is_some());
            if failed {
                "(r)etry  (esc) stop"
            } else if resolved {
                "(enter) next  (esc) stop"
            } else {
                "(1-9) or (↑/↓ enter) answer  (esc) stop"
            }
        }
        Screen::Results => "(r)estart  (q)uit",
    }
}

fn render_setup(app: &App, area: Rect, buf: &mut Buffer) {
    let form = &app.form;
    let categories = app.machine.categories();

    let category = if app.categories_loading {
        "loading…".to_string()
    } else {
        form.category
            .and_then(|idx| categories.get(idx))
            .map(|c| format!("‹ {c} ›"))
            .unwrap_or_else(|| "(none available)".to_string())
    };
    let difficulty = Difficulty::ALL
        .iter()
        .map(|d| {
            if *d == form.difficulty {
                format!("[{d}]")
            } else {
                format!(" {d} ")
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    let row = |field: Field, label: &str, value: String| {
        let focused = form.focus == field;
        let label_style = if focused {
            bold().fg(Color::Yellow)
        } else {
            bold()
        };
        let cursor = if focused && matches!(field, Field::Name | Field::Count) {
            "_"
        } else {
            ""
        };
        Line::from(vec![
            Span::styled(format!("{label:>12}  "), label_style),
            Span::raw(value),
            Span::styled(cursor, dim()),
        ])
    };

    let lines = vec![
        Line::from(Span::styled("quizzle", bold().fg(Color::Magenta))),
        Line::default(),
        row(Field::Name, "Name", form.name.clone()),
        row(Field::Category, "Category", category),
        row(Field::Difficulty, "Difficulty", difficulty),
        row(Field::Count, "Questions", form.count.clone()),
    ];

    let height = lines.len() as u16;
    let [_, body, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(area);

    Paragraph::new(lines)
        .alignment(Alignment::Left)
        .render(body, buf);
}

fn render_quiz(app: &App, state: &SessionState, area: Rect, buf: &mut Buffer) {
    let config = state.config();
    let header = Line::from(vec![
        Span::styled(config.player_name().to_string(), bold()),
        Span::raw(format!(
            "  {} · {}  question {}/{}",
            config.category(),
            config.difficulty(),
            (state.questions_answered() + 1).min(config.question_count()),
            config.question_count()
        )),
        Span::styled(format!("  score {}", state.total_score()), bold().fg(Color::Cyan)),
    ]);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(area);

    Paragraph::new(header).render(chunks[0], buf);

    match state.current() {
        Some(live) => {
            render_countdown(live, state.settings().seconds_per_question, chunks[1], buf);
            render_question(app, state, live, chunks[2], buf);
        }
        None => {
            let text = match state.fetch_error() {
                Some(e) => Span::styled(format!("Could not load the next question: {e}"), bold().fg(Color::Red)),
                None => Span::styled("Loading question…", dim()),
            };
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(chunks[2], buf);
        }
    }
}

fn render_countdown(live: &LiveQuestion, total: u32, area: Rect, buf: &mut Buffer) {
    let remaining = live.remaining_secs();
    let ratio = if total == 0 {
        0.0
    } else {
        (remaining as f64 / total as f64).clamp(0.0, 1.0)
    };
    let color = match remaining {
        0..=3 => Color::Red,
        4..=6 => Color::Yellow,
        _ => Color::Green,
    };
    Gauge::default()
        .block(Block::bordered().title(" time "))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio)
        .label(format!("{remaining}s"))
        .render(area, buf);
}

fn render_question(app: &App, state: &SessionState, live: &LiveQuestion, area: Rect, buf: &mut Buffer) {
    let presented = live.presented();
    let question = presented.question();
    let pending = live.is_pending();
    let outcome = state.log().last().filter(|_| !pending);

    let mut lines = vec![
        Line::from(Span::styled(question.text().to_string(), bold())),
        Line::default(),
    ];

    for (idx, option) in presented.options().iter().enumerate() {
        let marker = format!("{:>3}. ", idx + 1);
        let style = if pending {
            if idx == app.highlighted {
                bold().fg(Color::Yellow)
            } else {
                Style::default()
            }
        } else if question.is_correct(option) {
            bold().fg(Color::Green)
        } else if outcome.and_then(|r| r.selected.as_option()) == Some(option.as_str()) {
            bold().fg(Color::Red)
        } else {
            dim()
        };
        lines.push(Line::from(vec![
            Span::styled(marker, dim()),
            Span::styled(option.clone(), style),
        ]));
    }

    if let Some(record) = outcome {
        lines.push(Line::default());
        let verdict = match (record.is_correct, record.selected.as_option()) {
            (true, _) => Span::styled(
                format!("Correct! +{} points", record.points_awarded),
                bold().fg(Color::Green),
            ),
            (false, None) => Span::styled(
                format!("Time's up. The answer was {}", record.correct_answer),
                bold().fg(Color::Red),
            ),
            (false, Some(_)) => Span::styled(
                format!("Wrong. The answer was {}", record.correct_answer),
                bold().fg(Color::Red),
            ),
        };
        lines.push(Line::from(verdict));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

fn render_results(summary: &ResultSummary, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(3)])
        .split(area);

    let mut heading = vec![
        Line::from(Span::styled(summary.remark.to_string(), bold().fg(Color::Magenta))),
        Line::from(vec![
            Span::styled(summary.player_name.clone(), bold()),
            Span::raw(format!(
                " scored {} of {} ({}%)",
                summary.total_score,
                summary.max_possible_score,
                summary.percentage()
            )),
        ]),
        Line::from(Span::styled(
            format!(
                "{} · {} · {}/{} correct",
                summary.category, summary.difficulty, summary.correct_count, summary.question_count
            ),
            dim(),
        )),
    ];
    if summary.ended_early {
        heading.push(Line::from(Span::styled(
            format!(
                "stopped after {} of {} questions",
                summary.questions_played, summary.question_count
            ),
            Style::default().fg(Color::Yellow),
        )));
    }
    Paragraph::new(heading)
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let question_width = (area.width as usize).saturating_sub(48).max(12);
    let rows = summary.log.iter().enumerate().map(|(idx, record)| {
        let style = if record.is_correct {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Red)
        };
        Row::new(vec![
            Cell::from(format!("{}", idx + 1)),
            Cell::from(fit(&record.question_text, question_width)),
            Cell::from(fit(&record.selected.to_string(), 16)).style(style),
            Cell::from(fit(&record.correct_answer, 16)),
            Cell::from(format!("{}s", record.seconds_taken)),
            Cell::from(record.points_awarded.to_string()),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Length(4),
            Constraint::Length(5),
        ],
    )
    .header(Row::new(vec!["#", "Question", "Your answer", "Answer", "Time", "Pts"]).style(bold()))
    .block(Block::bordered().title(" answers "));

    Widget::render(table, chunks[1], buf);
}
