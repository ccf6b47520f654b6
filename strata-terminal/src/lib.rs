/// Terminal drilling demo for the strata engine
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use nalgebra::{Point3, Vector3};
use std::fmt::Write as _;
use std::io::{self, stdout, Write};
use std::time::Duration;
use strata_core::{drill, DrillOutcome, DrillParams, SharedStratigraphy, StratigraphyModel};
use tracing::debug;

pub mod renderer;
pub mod scene;
pub mod stl;

pub use renderer::CoreColumnRenderer;
pub use scene::{load_config, PatchSource, PatchSpec, Scene, SceneError};

const MOVE_STEP: f64 = 1.0;
const LENGTH_STEP: f64 = 5.0;
const MIN_LENGTH: f64 = 1.0;

/// Named drill tolerance sets selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DrillPreset {
    #[default]
    Default,
    /// Tight tolerances for analytically placed stacks
    Precise,
    /// Loose tolerances for hand-placed patches with visible seams
    Forgiving,
}

impl DrillPreset {
    pub fn params(self) -> DrillParams {
        match self {
            DrillPreset::Default => DrillParams::default(),
            DrillPreset::Precise => DrillParams::precise(),
            DrillPreset::Forgiving => DrillParams::forgiving(),
        }
    }
}

/// Where and how deep to drill
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrillSite {
    pub x: f64,
    pub z: f64,
    pub length: f64,
}

impl DrillSite {
    pub fn new(x: f64, z: f64, length: f64) -> Self {
        Self { x, z, length }
    }
}

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Move { dx: f64, dz: f64 },
    ChangeLength(f64),
    Drill,
    Quit,
    Ignore,
}

pub fn action_for(code: KeyCode) -> Action {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('w') | KeyCode::Up => Action::Move { dx: 0.0, dz: -MOVE_STEP },
        KeyCode::Char('s') | KeyCode::Down => Action::Move { dx: 0.0, dz: MOVE_STEP },
        KeyCode::Char('a') | KeyCode::Left => Action::Move { dx: -MOVE_STEP, dz: 0.0 },
        KeyCode::Char('d') | KeyCode::Right => Action::Move { dx: MOVE_STEP, dz: 0.0 },
        KeyCode::Char('+') | KeyCode::Char('=') => Action::ChangeLength(LENGTH_STEP),
        KeyCode::Char('-') => Action::ChangeLength(-LENGTH_STEP),
        KeyCode::Char(' ') | KeyCode::Enter => Action::Drill,
        _ => Action::Ignore,
    }
}

/// Elevation of the highest layer top, or 0 for an empty model
pub fn surface_elevation(model: &StratigraphyModel) -> f64 {
    model
        .all()
        .iter()
        .map(|layer| layer.center().y + layer.thickness() / 2.0)
        .reduce(f64::max)
        .unwrap_or(0.0)
}

/// Drill straight down at `site`, starting from the model's surface
pub fn drill_site(model: &StratigraphyModel, site: &DrillSite, params: &DrillParams) -> DrillOutcome {
    let origin = Point3::new(site.x, surface_elevation(model), site.z);
    drill(model, origin, -Vector3::y(), site.length, params)
}

/// Plain-text report of a drill outcome
pub fn describe_outcome(site: &DrillSite, outcome: &DrillOutcome) -> String {
    let mut text = String::new();
    match outcome {
        DrillOutcome::Empty(reason) => {
            let _ = writeln!(text, "({:.1}, {:.1}): {reason}", site.x, site.z);
        }
        DrillOutcome::Sample { sample, warnings } => {
            let _ = writeln!(
                text,
                "Core sample at ({:.1}, {:.1}): {} segments, {:.2} m",
                site.x,
                site.z,
                sample.len(),
                sample.penetrated_depth()
            );
            for segment in sample.segments() {
                let label = segment.rock_type().map_or("void", |rock| rock.label());
                let layers: Vec<&str> = segment
                    .sources()
                    .iter()
                    .map(|source| source.layer_name.as_str())
                    .collect();
                let _ = writeln!(
                    text,
                    "  {:<11} {:>7.2} - {:>7.2} m  {}",
                    label,
                    segment.start_depth(),
                    segment.end_depth(),
                    layers.join(", ")
                );
            }
            for warning in warnings {
                let _ = writeln!(text, "  warning: {warning}");
            }
        }
    }
    text
}

/// Interactive drilling session
pub struct TerminalApp {
    stratigraphy: SharedStratigraphy,
    params: DrillParams,
    site: DrillSite,
    renderer: CoreColumnRenderer,
    outcome: Option<DrillOutcome>,
    running: bool,
    dirty: bool,
}

impl TerminalApp {
    pub fn new(stratigraphy: SharedStratigraphy, params: DrillParams, site: DrillSite) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_size(
            stratigraphy,
            params,
            site,
            width as usize,
            height as usize,
        ))
    }

    pub fn with_size(
        stratigraphy: SharedStratigraphy,
        params: DrillParams,
        site: DrillSite,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            stratigraphy,
            params,
            site,
            renderer: CoreColumnRenderer::new(width, height),
            outcome: None,
            running: true,
            dirty: true,
        }
    }

    pub fn site(&self) -> &DrillSite {
        &self.site
    }

    pub fn outcome(&self) -> Option<&DrillOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Swap in a rebuilt stratigraphy; the current sample is kept
    pub fn replace_model(&self, model: StratigraphyModel) {
        self.stratigraphy.replace(model);
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        while self.running {
            if self.dirty {
                self.render()?;
                self.dirty = false;
            }

            if event::poll(Duration::from_millis(100))? {
                self.handle_event(event::read()?)?;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> io::Result<()> {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => self.apply(action_for(code)),
            Event::Resize(width, height) => {
                self.renderer.resize(width as usize, height as usize);
                self.dirty = true;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::Move { dx, dz } => {
                self.site.x += dx;
                self.site.z += dz;
            }
            Action::ChangeLength(delta) => {
                self.site.length = (self.site.length + delta).max(MIN_LENGTH);
            }
            Action::Drill => {
                self.drill();
            }
            Action::Ignore => return,
        }
        self.dirty = true;
    }

    /// Drill at the current site against the latest model
    pub fn drill(&mut self) -> &DrillOutcome {
        let model = self.stratigraphy.snapshot();
        let outcome = drill_site(&model, &self.site, &self.params);
        debug!(x = self.site.x, z = self.site.z, empty = outcome.is_empty(), "Drilled");
        self.outcome.insert(outcome)
    }

    fn render(&mut self) -> io::Result<()> {
        self.renderer.clear();
        match &self.outcome {
            Some(DrillOutcome::Sample { sample, .. }) => self.renderer.render_sample(sample),
            Some(DrillOutcome::Empty(reason)) => self.renderer.render_message(&reason.to_string()),
            None => self.renderer.render_message("press space to drill"),
        }

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0), terminal::Clear(ClearType::All))?;
        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "Strata | site ({:.1}, {:.1}) | length {:.0} m | WASD/Arrows=Move +/-=Length Space=Drill Q=Quit",
                self.site.x, self.site.z, self.site.length
            )),
            ResetColor
        )?;

        if let Some(DrillOutcome::Sample { warnings, .. }) = &self.outcome {
            if let Some(warning) = warnings.first() {
                let (_, height) = terminal::size()?;
                queue!(
                    stdout,
                    cursor::MoveTo(0, height.saturating_sub(1)),
                    SetForegroundColor(Color::DarkYellow),
                    Print(format!("{} warning(s): {warning}", warnings.len())),
                    ResetColor
                )?;
            }
        }

        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{build_stratigraphy, RockType, StrataConfig};

    fn demo_model() -> StratigraphyModel {
        let geometries = Scene::demo().sub_geometries().unwrap();
        build_stratigraphy(&geometries, &StrataConfig::default())
            .into_result()
            .unwrap()
    }

    fn app() -> TerminalApp {
        TerminalApp::with_size(
            SharedStratigraphy::new(demo_model()),
            DrillParams::default(),
            DrillSite::new(0.0, 0.0, 20.0),
            80,
            24,
        )
    }

    #[test]
    fn test_demo_drill_at_center() {
        let outcome = drill_site(&demo_model(), &DrillSite::new(0.0, 0.0, 20.0), &DrillParams::default());
        let sample = outcome.sample().unwrap();

        assert_eq!(
            sample.rock_types(),
            [RockType::Soil, RockType::Sedimentary, RockType::Bedrock]
        );
        assert!((sample.penetrated_depth() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_surface_elevation() {
        assert!((surface_elevation(&demo_model()) - 0.0).abs() < 1e-12);
        assert_eq!(surface_elevation(&StratigraphyModel::default()), 0.0);
    }

    #[test]
    fn test_key_actions() {
        assert_eq!(action_for(KeyCode::Char('q')), Action::Quit);
        assert_eq!(action_for(KeyCode::Left), Action::Move { dx: -MOVE_STEP, dz: 0.0 });
        assert_eq!(action_for(KeyCode::Char(' ')), Action::Drill);
        assert_eq!(action_for(KeyCode::Char('x')), Action::Ignore);
    }

    #[test]
    fn test_app_moves_and_drills() {
        let mut app = app();
        app.apply(Action::Move { dx: 2.0, dz: -1.0 });
        app.apply(Action::ChangeLength(-100.0));
        assert_eq!(*app.site(), DrillSite::new(2.0, -1.0, MIN_LENGTH));

        app.apply(Action::Drill);
        let sample = app.outcome().and_then(DrillOutcome::sample).unwrap();
        assert_eq!(sample.rock_types(), [RockType::Soil]);

        app.apply(Action::Move { dx: 500.0, dz: 0.0 });
        assert!(app.drill().is_empty());

        app.apply(Action::Quit);
        assert!(!app.is_running());
    }

    #[test]
    fn test_replace_model_affects_next_drill() {
        let mut app = app();
        app.replace_model(StratigraphyModel::default());
        assert_eq!(
            app.drill().empty_reason(),
            Some(strata_core::EmptyReason::NoLayers)
        );
    }

    #[test]
    fn test_presets_decide_seam_handling() {
        let layer = |name: &str, y: f64| {
            strata_core::Layer::builder(name)
                .thickness(2.0)
                .center(Point3::new(0.0, y, 0.0))
                .footprint(strata_core::Footprint::centered(0.0, 0.0, 10.0))
                .build()
        };
        // 3 cm seam between two clay patches
        let model = StratigraphyModel::build(vec![layer("Clay_A", -1.0), layer("Clay_B", -3.03)]).model;
        let site = DrillSite::new(0.0, 0.0, 5.0);

        let strict = drill_site(&model, &site, &DrillPreset::Default.params());
        assert_eq!(strict.sample().unwrap().len(), 3);

        let loose = drill_site(&model, &site, &DrillPreset::Forgiving.params());
        assert_eq!(loose.sample().unwrap().len(), 1);

        for preset in [DrillPreset::Default, DrillPreset::Precise, DrillPreset::Forgiving] {
            assert!(preset.params().validate().is_ok());
        }
        assert!(DrillPreset::Precise.params().gap_tolerance < DrillParams::default().gap_tolerance);
    }

    #[test]
    fn test_describe_outcome() {
        let site = DrillSite::new(0.0, 0.0, 20.0);
        let outcome = drill_site(&demo_model(), &site, &DrillParams::default());
        let text = describe_outcome(&site, &outcome);
        assert!(text.contains("3 segments"));
        assert!(text.contains("Sandstone_Layer"));

        let empty = describe_outcome(&site, &DrillOutcome::Empty(strata_core::EmptyReason::NothingPenetrated));
        assert!(empty.contains("nothing found here"));
    }
}
