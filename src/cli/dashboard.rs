use std::path::Path;

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs},
    Frame,
};
use tracing::warn;

use crate::cli::ledger_source;
use crate::error::Result;
use crate::export::{ledger_to_csv, scenario_to_csv, write_export, LEDGER_FILE_NAME, SCENARIO_FILE_NAME};
use crate::fmt::{amount, compact, ratio_pct, signed_pct};
use crate::generator::{generate_base_series, year_range};
use crate::ledger::{aggregate_category, apply_user_edits, load_ledger_file, Ledger};
use crate::models::{AggregatedPoint, LedgerEntry, SimulatedRow, TimeSeriesRow};
use crate::scenario::{apply_scenario, clamp_pct, Preset, ScenarioParameters};
use crate::settings::{load_settings, Settings};
use crate::tui::{
    self, amount_span, run_screen, Screen, ScreenAction, BASE_STYLE, FOOTER_STYLE, HEADER_STYLE,
    SELECTED_STYLE, SIM_STYLE,
};

/// Step of the amount editor, in euros.
const VALUE_STEP: f64 = 100.0;
const PCT_PAGE_STEP: i32 = 10;

const TAB_TITLES: &[&str] = &["Simulation", "Édition"];

#[derive(Clone, Copy, PartialEq, Debug)]
enum Tab {
    Simulation,
    Ledger,
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Control {
    GlobalRevenue,
    GlobalCharges,
    YearRevenue(i32),
    YearCharges(i32),
}

// ---------------------------------------------------------------------------
// Simulation tab
// ---------------------------------------------------------------------------

struct SimulationPanel {
    base: Vec<TimeSeriesRow>,
    sliders: ScenarioParameters,
    /// One-shot preset: laid over the sliders until the next slider move.
    preset: Option<Preset>,
    selected: usize,
    rows: Vec<SimulatedRow>,
}

impl SimulationPanel {
    fn new(base: Vec<TimeSeriesRow>) -> Self {
        let mut panel = Self {
            base,
            sliders: ScenarioParameters::default(),
            preset: None,
            selected: 0,
            rows: Vec::new(),
        };
        panel.recompute();
        panel
    }

    fn effective(&self) -> ScenarioParameters {
        self.sliders.resolve(self.preset)
    }

    fn recompute(&mut self) {
        self.rows = apply_scenario(&self.base, &self.effective());
    }

    /// Global sliders have no effect in per-year mode, so only the year rows
    /// are offered there.
    fn controls(&self) -> Vec<Control> {
        if self.sliders.per_year_enabled {
            self.base
                .iter()
                .flat_map(|row| [Control::YearRevenue(row.year), Control::YearCharges(row.year)])
                .collect()
        } else {
            vec![Control::GlobalRevenue, Control::GlobalCharges]
        }
    }

    fn control_value(&self, control: Control) -> i32 {
        let eff = self.effective();
        let year = |y: i32| eff.per_year_overrides.get(&y).copied().unwrap_or_default();
        match control {
            Control::GlobalRevenue => eff.global_revenue_pct,
            Control::GlobalCharges => eff.global_charges_pct,
            Control::YearRevenue(y) => year(y).revenue_pct,
            Control::YearCharges(y) => year(y).charges_pct,
        }
    }

    fn control_label(control: Control) -> String {
        match control {
            Control::GlobalRevenue => "Revenue (all years)".to_string(),
            Control::GlobalCharges => "Charges (all years)".to_string(),
            Control::YearRevenue(y) => format!("  Revenue {y}"),
            Control::YearCharges(y) => format!("  Charges {y}"),
        }
    }

    fn select(&mut self, delta: isize) {
        let len = self.controls().len();
        let next = self.selected as isize + delta;
        self.selected = next.clamp(0, len.saturating_sub(1) as isize) as usize;
    }

    fn nudge(&mut self, delta: i32) {
        let Some(control) = self.controls().get(self.selected).copied() else {
            return;
        };
        // Moving a slider ends the preset's run; the slider keeps its own value.
        self.preset = None;
        let s = &mut self.sliders;
        match control {
            Control::GlobalRevenue => s.global_revenue_pct = clamp_pct(s.global_revenue_pct + delta),
            Control::GlobalCharges => s.global_charges_pct = clamp_pct(s.global_charges_pct + delta),
            Control::YearRevenue(y) => {
                let o = s.per_year_overrides.entry(y).or_default();
                o.revenue_pct = clamp_pct(o.revenue_pct + delta);
            }
            Control::YearCharges(y) => {
                let o = s.per_year_overrides.entry(y).or_default();
                o.charges_pct = clamp_pct(o.charges_pct + delta);
            }
        }
        self.recompute();
    }

    fn toggle_per_year(&mut self) {
        self.sliders.per_year_enabled = !self.sliders.per_year_enabled;
        self.selected = 0;
        self.recompute();
    }

    fn apply_preset(&mut self, preset: Preset) {
        self.preset = Some(preset);
        self.recompute();
    }

    fn reset(&mut self) {
        self.sliders = ScenarioParameters::default();
        self.preset = None;
        self.selected = 0;
        self.recompute();
    }

    /// Returns a status message when the key produced one.
    fn handle_key(&mut self, code: KeyCode, settings: &Settings) -> Option<String> {
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.select(-1),
            KeyCode::Down | KeyCode::Char('j') => self.select(1),
            KeyCode::Left | KeyCode::Char('h') => self.nudge(-1),
            KeyCode::Right | KeyCode::Char('l') => self.nudge(1),
            KeyCode::PageDown => self.nudge(-PCT_PAGE_STEP),
            KeyCode::PageUp => self.nudge(PCT_PAGE_STEP),
            KeyCode::Char('p') => {
                self.toggle_per_year();
                let state = if self.sliders.per_year_enabled { "on" } else { "off" };
                return Some(format!("Per-year changes {state}"));
            }
            KeyCode::Char('1') => {
                self.apply_preset(Preset::CostCut20);
                return Some(format!("Preset: {}", Preset::CostCut20.label()));
            }
            KeyCode::Char('2') => {
                self.apply_preset(Preset::RevenueUp10);
                return Some(format!("Preset: {}", Preset::RevenueUp10.label()));
            }
            KeyCode::Char('0') => {
                self.reset();
                return Some("Scenario reset".to_string());
            }
            KeyCode::Char('e') => {
                let path = settings.exports_dir().join(SCENARIO_FILE_NAME);
                return Some(export_message(scenario_to_csv(&self.rows), &path));
            }
            _ => {}
        }
        None
    }

    fn draw(&self, frame: &mut Frame, area: Rect) {
        let [left, right] =
            Layout::horizontal([Constraint::Length(36), Constraint::Fill(1)]).areas(area);
        self.draw_controls(frame, left);

        let table_height = self.rows.len() as u16 + 3;
        let [charts, table] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(table_height)]).areas(right);
        let [rev_area, chg_area] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(charts);

        let revenue: Vec<(i32, f64, f64)> = self
            .rows
            .iter()
            .map(|r| (r.year(), r.base.revenue, r.revenue_sim))
            .collect();
        let charges: Vec<(i32, f64, f64)> = self
            .rows
            .iter()
            .map(|r| (r.year(), r.base.charges, r.charges_sim))
            .collect();
        draw_comparison(frame, rev_area, "Revenue: actual vs simulated", &revenue);
        draw_comparison(frame, chg_area, "Charges: actual vs simulated", &charges);
        self.draw_table(frame, table);
    }

    fn draw_controls(&self, frame: &mut Frame, area: Rect) {
        let eff = self.effective();
        let mut lines = vec![Line::from(Span::styled(
            " Controls",
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        for (i, control) in self.controls().into_iter().enumerate() {
            let text = format!(
                " {:<22}{:>5} %",
                Self::control_label(control),
                signed_pct(self.control_value(control))
            );
            let style = if i == self.selected { SELECTED_STYLE } else { Style::default() };
            lines.push(Line::from(Span::styled(text, style)));
        }
        let per_year = if eff.per_year_enabled { "on" } else { "off" };
        lines.push(Line::from(format!(" Per-year changes     {per_year}")));
        if let Some(p) = self.preset {
            lines.push(Line::from(Span::styled(format!(" Preset: {}", p.label()), SIM_STYLE)));
        }

        if let Some(last) = self.rows.last() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!(" Summary {}", last.year()),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            let pairs = [
                (" Revenue          ", last.base.revenue),
                (" Revenue (sim)    ", last.revenue_sim),
                (" Charges          ", last.base.charges),
                (" Charges (sim)    ", last.charges_sim),
                (" Margin           ", last.base.margin()),
                (" Margin (sim)     ", last.margin_sim),
            ];
            for (label, value) in pairs {
                lines.push(Line::from(vec![Span::raw(label), amount_span(value)]));
            }
            lines.push(Line::from(format!(
                " Margin % (sim)   {}",
                ratio_pct(last.margin_ratio_sim)
            )));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_table(&self, frame: &mut Frame, area: Rect) {
        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|r| {
                Row::new(vec![
                    Cell::from(r.year().to_string()),
                    Cell::from(amount(r.base.revenue)),
                    Cell::from(amount(r.base.charges)),
                    Cell::from(amount(r.revenue_sim)),
                    Cell::from(amount(r.charges_sim)),
                    Cell::from(amount(r.margin_sim)),
                    Cell::from(ratio_pct(r.margin_ratio_sim)),
                ])
            })
            .collect();
        let widths = [
            Constraint::Length(6),
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Length(9),
        ];
        let header = Row::new(vec!["Year", "Revenue", "Charges", "Rev. sim", "Chg. sim", "Margin sim", "Margin %"])
            .style(HEADER_STYLE)
            .bottom_margin(1);
        frame.render_widget(Table::new(rows, widths).header(header).column_spacing(1), area);
    }
}

/// Grouped bars per year: base then simulated.
fn draw_comparison(frame: &mut Frame, area: Rect, title: &str, series: &[(i32, f64, f64)]) {
    let groups: Vec<BarGroup> = series
        .iter()
        .map(|(year, base, sim)| {
            let bars = vec![
                Bar::default()
                    .value(base.max(0.0) as u64)
                    .text_value(compact(*base))
                    .style(BASE_STYLE),
                Bar::default()
                    .value(sim.max(0.0) as u64)
                    .text_value(compact(*sim))
                    .style(SIM_STYLE),
            ];
            BarGroup::default()
                .label(Line::from(year.to_string()))
                .bars(&bars)
        })
        .collect();

    let block = Block::default()
        .title(title.to_string())
        .title_style(Style::default().add_modifier(Modifier::BOLD))
        .borders(Borders::NONE);
    let mut chart = BarChart::default()
        .block(block)
        .bar_width(5)
        .bar_gap(0)
        .group_gap(2);
    for group in &groups {
        chart = chart.data(group.clone());
    }
    frame.render_widget(chart, area);
}

// ---------------------------------------------------------------------------
// Ledger tab
// ---------------------------------------------------------------------------

struct LedgerPanel {
    ledger: Ledger,
    /// Fixed at load so the selector does not shift while rows are edited.
    categories: Vec<String>,
    category_idx: usize,
    selected: usize,
    target: String,
    points: Vec<AggregatedPoint>,
    table_state: TableState,
}

enum LedgerState {
    Ready(LedgerPanel),
    Failed(String),
}

impl LedgerPanel {
    fn new(ledger: Ledger, target: String) -> Self {
        let categories = ledger.categories();
        let mut panel = Self {
            ledger,
            categories,
            category_idx: 0,
            selected: 0,
            target,
            points: Vec::new(),
            table_state: TableState::default(),
        };
        panel.refresh();
        panel
    }

    fn category(&self) -> &str {
        self.categories
            .get(self.category_idx)
            .map(String::as_str)
            .unwrap_or("")
    }

    fn subset(&self) -> Vec<LedgerEntry> {
        self.ledger.filter_by_category(self.category())
    }

    fn refresh(&mut self) {
        self.points = aggregate_category(&self.ledger.entries, &self.target);
        let n = self.subset().len();
        if self.selected >= n {
            self.selected = n.saturating_sub(1);
        }
    }

    /// Hand the edited subset back to the ledger and re-aggregate.
    fn commit(&mut self, edited: Vec<LedgerEntry>) {
        let category = self.category().to_string();
        self.ledger = apply_user_edits(&self.ledger, &category, edited);
        self.refresh();
    }

    fn adjust_value(&mut self, delta: f64) {
        let mut rows = self.subset();
        let Some(row) = rows.get_mut(self.selected) else {
            return;
        };
        row.value = Some(row.value.unwrap_or(0.0) + delta);
        self.commit(rows);
    }

    fn duplicate_row(&mut self) {
        let mut rows = self.subset();
        let Some(row) = rows.get(self.selected).cloned() else {
            return;
        };
        rows.insert(self.selected + 1, row);
        self.commit(rows);
        self.selected += 1;
    }

    fn delete_row(&mut self) {
        let mut rows = self.subset();
        if self.selected < rows.len() {
            rows.remove(self.selected);
            self.commit(rows);
        }
    }

    fn cycle_category(&mut self, forward: bool) {
        let n = self.categories.len();
        if n == 0 {
            return;
        }
        self.category_idx = if forward {
            (self.category_idx + 1) % n
        } else {
            (self.category_idx + n - 1) % n
        };
        self.selected = 0;
        self.refresh();
    }

    fn handle_key(&mut self, code: KeyCode, settings: &Settings) -> Option<String> {
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                let n = self.subset().len();
                if self.selected + 1 < n {
                    self.selected += 1;
                }
            }
            KeyCode::Left | KeyCode::Char('[') => self.cycle_category(false),
            KeyCode::Right | KeyCode::Char(']') => self.cycle_category(true),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_value(VALUE_STEP),
            KeyCode::Char('-') => self.adjust_value(-VALUE_STEP),
            KeyCode::Char('a') => self.duplicate_row(),
            KeyCode::Char('d') => self.delete_row(),
            KeyCode::Char('e') => {
                let path = settings.exports_dir().join(LEDGER_FILE_NAME);
                return Some(export_message(ledger_to_csv(&self.ledger), &path));
            }
            _ => {}
        }
        None
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) {
        let [selector, body] =
            Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(area);
        let [table_area, chart_area] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(body);

        let selector_spans: Vec<Span> = self
            .categories
            .iter()
            .enumerate()
            .flat_map(|(i, c)| {
                let style = if i == self.category_idx { SELECTED_STYLE } else { FOOTER_STYLE };
                [Span::styled(format!(" {c} "), style), Span::raw(" ")]
            })
            .collect();
        frame.render_widget(Paragraph::new(Line::from(selector_spans)), selector);

        let extras = self.ledger.extra_columns();
        let mut header = vec!["Date", "Amount (€)"];
        header.extend(extras.iter().copied());
        let mut widths = vec![Constraint::Length(10), Constraint::Length(12)];
        widths.extend(extras.iter().map(|_| Constraint::Fill(1)));

        let rows: Vec<Row> = self
            .subset()
            .iter()
            .map(|e| {
                let date = e
                    .date
                    .map(|d| d.format("%d/%m/%Y").to_string())
                    .unwrap_or_else(|| "\u{2014}".to_string());
                let value = match e.value {
                    Some(v) => Cell::from(amount_span(v)),
                    None => Cell::from("\u{2014}"),
                };
                let mut cells = vec![Cell::from(date), value];
                cells.extend(e.extra.iter().map(|x| Cell::from(x.clone())));
                Row::new(cells)
            })
            .collect();

        self.table_state.select(Some(self.selected));
        let table = Table::new(rows, widths)
            .header(Row::new(header).style(HEADER_STYLE).bottom_margin(1))
            .column_spacing(1)
            .row_highlight_style(SELECTED_STYLE);
        frame.render_stateful_widget(table, table_area, &mut self.table_state);

        let bars: Vec<Bar> = self
            .points
            .iter()
            .map(|p| {
                Bar::default()
                    .value(p.value_k.max(0) as u64)
                    .text_value(p.label.clone())
                    .label(Line::from(p.date.format("%m/%y").to_string()))
                    .style(SIM_STYLE)
            })
            .collect();
        let block = Block::default()
            .title(format!("{} (K€)", self.target))
            .title_style(Style::default().add_modifier(Modifier::BOLD))
            .borders(Borders::NONE);
        let chart = BarChart::default()
            .block(block)
            .bar_width(6)
            .bar_gap(1)
            .data(BarGroup::default().bars(&bars));
        frame.render_widget(chart, chart_area);
    }
}

fn export_message(bytes: Result<Vec<u8>>, path: &Path) -> String {
    match bytes.and_then(|b| write_export(&b, path)) {
        Ok(written) => format!("Wrote {written}"),
        Err(e) => {
            warn!(error = %e, "export failed");
            format!("Export failed: {e}")
        }
    }
}

// ---------------------------------------------------------------------------
// Shell
// ---------------------------------------------------------------------------

struct Dashboard {
    tab: Tab,
    sim: SimulationPanel,
    ledger: LedgerState,
    settings: Settings,
    status_message: Option<String>,
}

impl Dashboard {
    fn new(settings: Settings, base: Vec<TimeSeriesRow>, ledger: Result<Ledger>) -> Self {
        let ledger = match ledger {
            Ok(l) => LedgerState::Ready(LedgerPanel::new(l, settings.target_category.clone())),
            Err(e) => {
                warn!(error = %e, "ledger unavailable");
                LedgerState::Failed(e.to_string())
            }
        };
        Self {
            tab: Tab::Simulation,
            sim: SimulationPanel::new(base),
            ledger,
            settings,
            status_message: None,
        }
    }

    fn keys_hint(&self) -> &'static str {
        match self.tab {
            Tab::Simulation => "\u{2191}/\u{2193}:select  \u{2190}/\u{2192}:\u{00b1}1%  PgUp/PgDn:\u{00b1}10%  p:per-year  1/2:preset  0:reset  e:export  Tab:switch  q:quit",
            Tab::Ledger => "\u{2191}/\u{2193}:row  \u{2190}/\u{2192}:category  +/-:\u{00b1}100  a:duplicate  d:delete  e:export  Tab:switch  q:quit",
        }
    }
}

impl Screen for Dashboard {
    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header, tabs, body, status, keys] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(
            Paragraph::new(" Revenue & charges simulator").style(HEADER_STYLE),
            header,
        );
        let selected = match self.tab {
            Tab::Simulation => 0,
            Tab::Ledger => 1,
        };
        frame.render_widget(
            Tabs::new(TAB_TITLES.to_vec())
                .select(selected)
                .highlight_style(SELECTED_STYLE),
            tabs,
        );

        match self.tab {
            Tab::Simulation => self.sim.draw(frame, body),
            Tab::Ledger => match &mut self.ledger {
                LedgerState::Ready(panel) => panel.draw(frame, body),
                LedgerState::Failed(msg) => {
                    let (wrapped, _) = tui::wrap_text(
                        &format!("Ledger unavailable: {msg}"),
                        body.width.saturating_sub(2) as usize,
                    );
                    frame.render_widget(Paragraph::new(wrapped).style(tui::AMOUNT_NEG_STYLE), body);
                }
            },
        }

        let status_text = self.status_message.clone().unwrap_or_default();
        frame.render_widget(Paragraph::new(status_text).style(FOOTER_STYLE), status);
        frame.render_widget(Paragraph::new(self.keys_hint()).style(FOOTER_STYLE), keys);
    }

    fn handle_key(&mut self, code: KeyCode) -> ScreenAction {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return ScreenAction::Close,
            KeyCode::Tab | KeyCode::BackTab => {
                self.tab = match self.tab {
                    Tab::Simulation => Tab::Ledger,
                    Tab::Ledger => Tab::Simulation,
                };
                self.status_message = None;
                return ScreenAction::Continue;
            }
            _ => {}
        }
        let message = match self.tab {
            Tab::Simulation => self.sim.handle_key(code, &self.settings),
            Tab::Ledger => match &mut self.ledger {
                LedgerState::Ready(panel) => panel.handle_key(code, &self.settings),
                LedgerState::Failed(_) => None,
            },
        };
        if message.is_some() {
            self.status_message = message;
        }
        ScreenAction::Continue
    }
}

pub fn run(file: Option<String>) -> Result<()> {
    let settings = load_settings();
    let base = generate_base_series(
        &year_range(settings.first_year, settings.last_year),
        settings.seed,
    );
    let ledger = load_ledger_file(&ledger_source(file, &settings));
    let mut dashboard = Dashboard::new(settings, base, ledger);
    run_screen(&mut dashboard)
}
